//! Prompt construction and reply extraction for table refinement.

/// System preamble sent with every generate call.
pub fn system_prompt() -> &'static str {
    "You are a spreadsheet cleaning assistant. You receive a table as CSV \
     (first line is the header) and an instruction. Apply the instruction to \
     the table and answer with the resulting table as CSV only: a header line \
     followed by data lines, comma separated, values containing commas or \
     quotes quoted. Do not add explanations, notes or Markdown."
}

/// User prompt: data context followed by the instruction.
pub fn build_prompt(instruction: &str, csv: &str) -> String {
    format!(
        "Data:\n{}\n\nInstruction:\n{}\nRespond in CSV format only.",
        csv.trim_end(),
        instruction.trim()
    )
}

/// Pull the CSV body out of a model reply.
///
/// Handles replies wrapped in a Markdown code block (with or without a
/// language tag). The body is split into blocks of non-blank lines; the
/// largest block is kept, after dropping its leading lines of prose such
/// as "Sure, here is the cleaned table:". Notes set apart by a blank line
/// before or after the table are discarded.
pub fn extract_csv(reply: &str) -> String {
    let body = fenced_block(reply).unwrap_or(reply);

    let blocks = line_blocks(body);
    let mut best: &[&str] = &[];
    for block in &blocks {
        let start = block
            .iter()
            .position(|line| !is_preamble(line))
            .unwrap_or(block.len());
        let candidate = &block[start..];
        if candidate.len() > best.len() {
            best = candidate;
        }
    }

    best.join("\n")
}

/// Runs of consecutive non-blank lines.
fn line_blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Contents of the first ``` block, if the reply has one.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = open + 3;
    // Skip the language tag line
    let content_start = text[after_fence..]
        .find('\n')
        .map(|i| after_fence + i + 1)?;
    let close = text[content_start..]
        .find("```")
        .map(|i| content_start + i)
        .unwrap_or(text.len());
    Some(&text[content_start..close])
}

/// A line introducing the table ("Here is the result:").
pub fn is_preamble(line: &str) -> bool {
    line.trim().ends_with(':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_layout() {
        let prompt = build_prompt("  Remove empty rows ", "Name,Age\nalice,30\n");
        assert_eq!(
            prompt,
            "Data:\nName,Age\nalice,30\n\nInstruction:\nRemove empty rows\nRespond in CSV format only."
        );
    }

    #[test]
    fn test_extract_from_code_block() {
        let reply = "Here is the result:\n\n```csv\nName,Age\nALICE,30\n```\n\nLet me know!";
        assert_eq!(extract_csv(reply), "Name,Age\nALICE,30");
    }

    #[test]
    fn test_extract_from_untagged_block() {
        let reply = "```\nName,Age\nBOB,25\n```";
        assert_eq!(extract_csv(reply), "Name,Age\nBOB,25");
    }

    #[test]
    fn test_extract_strips_leading_prose() {
        let reply = "Sure! Here is the cleaned table:\nName,Age\nalice,30\n\n";
        assert_eq!(extract_csv(reply), "Name,Age\nalice,30");
    }

    #[test]
    fn test_extract_strips_preamble_with_comma() {
        let reply = "Sure, here is the cleaned table:\nName,Age\nALICE,30\nBOB,25";
        assert_eq!(extract_csv(reply), "Name,Age\nALICE,30\nBOB,25");
    }

    #[test]
    fn test_extract_drops_trailing_note() {
        let reply = "Name,Age\nALICE,30\n\nNote, I uppercased the names.";
        assert_eq!(extract_csv(reply), "Name,Age\nALICE,30");

        let reply = "Done, see below.\n\nName,Age\nALICE,30\nBOB,25\n\nLet me know, if needed.";
        assert_eq!(extract_csv(reply), "Name,Age\nALICE,30\nBOB,25");
    }

    #[test]
    fn test_extract_plain_csv_unchanged() {
        assert_eq!(extract_csv("a,b\n1,2"), "a,b\n1,2");
    }

    #[test]
    fn test_extract_empty_reply() {
        assert_eq!(extract_csv("   \n\n"), "");
        assert_eq!(extract_csv("Result:"), "");
    }
}
