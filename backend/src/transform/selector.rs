//! Operation selection.
//!
//! Turns the user's choice (operation name, case rule, free-text
//! instruction) into an [`Operation`], and maps instructions onto a
//! deterministic operation when the model cannot be used.

use once_cell::sync::Lazy;
use regex::Regex;

use super::operations::{Operation, TextCase};
use crate::error::{TransformError, TransformResult};

static REMOVE_EMPTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(remove|drop|delete)\s+(the\s+)?(blank|empty)|\b(blank|empty)\s+rows?\b").unwrap());
static SUMMARIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)summar|describe|statistic").unwrap());
static UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)upper[\s_-]?case").unwrap());
static LOWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)lower[\s_-]?case").unwrap());
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)title[\s_-]?case").unwrap());

/// Map a free-text instruction to a deterministic operation.
///
/// Returns `None` when no keyword matches.
pub fn from_instruction(instruction: &str) -> Option<Operation> {
    if REMOVE_EMPTY.is_match(instruction) {
        Some(Operation::RemoveEmptyRows)
    } else if SUMMARIZE.is_match(instruction) {
        Some(Operation::Summarize)
    } else if UPPER.is_match(instruction) {
        Some(Operation::NormalizeTextCase { case: TextCase::Upper })
    } else if LOWER.is_match(instruction) {
        Some(Operation::NormalizeTextCase { case: TextCase::Lower })
    } else if TITLE.is_match(instruction) {
        Some(Operation::NormalizeTextCase { case: TextCase::Title })
    } else {
        None
    }
}

/// Resolve request parameters into an operation.
///
/// - an operation name wins; `case` overrides the case of `normalize-text-case`
/// - `ai-custom` needs a non-blank instruction
/// - no operation but an instruction means `ai-custom`
pub fn resolve(
    operation: Option<&str>,
    case: Option<&str>,
    instruction: Option<&str>,
) -> TransformResult<Operation> {
    let instruction = instruction.map(str::trim).filter(|s| !s.is_empty());
    let operation = operation.map(str::trim).filter(|s| !s.is_empty());

    let Some(name) = operation else {
        return match instruction {
            Some(text) => Ok(Operation::AiCustom {
                instruction: text.to_string(),
            }),
            None => Err(TransformError::MissingOperation),
        };
    };

    match name.parse::<Operation>()? {
        Operation::AiCustom { .. } => {
            let text = instruction.ok_or(TransformError::MissingInstruction)?;
            Ok(Operation::AiCustom {
                instruction: text.to_string(),
            })
        }
        Operation::NormalizeTextCase { case: parsed } => {
            let case = match case.map(str::trim).filter(|s| !s.is_empty()) {
                Some(c) => c.parse()?,
                None => parsed,
            };
            Ok(Operation::NormalizeTextCase { case })
        }
        other => Ok(other),
    }
}
