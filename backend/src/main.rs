//! Refiner CLI - clean spreadsheets with a local model or tabular operations
//!
//! # Main Commands
//!
//! ```bash
//! refiner serve                                   # Start HTTP server (port 3000)
//! refiner refine sales.xlsx --op remove-empty-rows
//! refiner refine sales.xlsx --instruction "merge first and last name" --ai
//! ```
//!
//! # Other Commands
//!
//! ```bash
//! refiner inspect sales.xlsx       # Show columns and the first rows
//! refiner summarize sales.xlsx     # Descriptive statistics
//! refiner operations               # List available operations
//! refiner ai-status                # Check the Ollama service
//! ```

use clap::{Parser, Subcommand};
use refiner::{
    load_file, operations_description, preview_text, refine_file, write_file, OllamaClient,
    Operation, RefineMode, RefineOptions, RefinerConfig,
};
use std::path::{Path, PathBuf};

use refiner::config::DEFAULT_PREVIEW_ROWS;
use refiner::render::DEFAULT_DOWNLOAD_NAME;
use refiner::transform::selector;

#[derive(Parser)]
#[command(name = "refiner")]
#[command(about = "Clean and transform spreadsheets with local AI (Ollama) or basic tabular operations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply an operation or instruction and write the result
    Refine {
        /// Input spreadsheet (xlsx, xls, xlsb, ods, csv)
        input: PathBuf,

        /// Output file, xlsx or csv by extension
        #[arg(short, long, default_value = DEFAULT_DOWNLOAD_NAME)]
        output: PathBuf,

        /// Operation name (see `refiner operations`)
        #[arg(long = "op")]
        operation: Option<String>,

        /// Case for normalize-text-case: upper, lower, title
        #[arg(long)]
        case: Option<String>,

        /// Free-text instruction (implies ai-custom when no --op is given)
        #[arg(short, long)]
        instruction: Option<String>,

        /// Enable AI processing (requires Ollama)
        #[arg(long)]
        ai: bool,

        /// Ollama model (overrides REFINER_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        /// Worksheet to read (default: first)
        #[arg(long)]
        sheet: Option<String>,

        /// Fail instead of falling back when AI cannot be used
        #[arg(long)]
        strict: bool,

        /// Rows to print
        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        preview_rows: usize,
    },

    /// Show format, columns and the first rows of a file
    Inspect {
        /// Input spreadsheet
        input: PathBuf,

        /// Worksheet to read (default: first)
        #[arg(long)]
        sheet: Option<String>,

        /// Rows to print
        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        preview_rows: usize,
    },

    /// Descriptive statistics of the numeric columns
    Summarize {
        /// Input spreadsheet
        input: PathBuf,

        /// Also write the summary to a file (xlsx or csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show available operations
    Operations,

    /// Check whether Ollama is reachable
    AiStatus {
        /// Ollama model (overrides REFINER_MODEL)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides REFINER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = RefinerConfig::from_env();

    let result = match cli.command {
        Commands::Refine {
            input,
            output,
            operation,
            case,
            instruction,
            ai,
            model,
            sheet,
            strict,
            preview_rows,
        } => {
            let config = match model {
                Some(m) => config.with_model(m),
                None => config,
            };
            let options = RefineOptions {
                use_ai: ai,
                strict_ai: strict,
                sheet,
                preview_rows,
            };
            cmd_refine(
                &config,
                &input,
                &output,
                operation.as_deref(),
                case.as_deref(),
                instruction.as_deref(),
                &options,
            )
            .await
        }

        Commands::Inspect {
            input,
            sheet,
            preview_rows,
        } => cmd_inspect(&input, sheet.as_deref(), preview_rows),

        Commands::Summarize { input, output } => cmd_summarize(&config, &input, output.as_deref()).await,

        Commands::Operations => cmd_operations(),

        Commands::AiStatus { model } => {
            let config = match model {
                Some(m) => config.with_model(m),
                None => config,
            };
            cmd_ai_status(&config).await
        }

        Commands::Serve { port } => {
            let mut config = config;
            if let Some(p) = port {
                config.port = p;
            }
            refiner::server::start_server(config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_refine(
    config: &RefinerConfig,
    input: &Path,
    output: &Path,
    operation: Option<&str>,
    case: Option<&str>,
    instruction: Option<&str>,
    options: &RefineOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let op = selector::resolve(operation, case, instruction)?;
    eprintln!("📄 Processing: {} → {}", input.display(), op);

    let client = OllamaClient::from_config(config);
    let result = refine_file(input, &op, options, &client).await?;
    let outcome = &result.outcome;

    eprintln!();
    match outcome.mode {
        RefineMode::Ai => eprintln!("✅ AI processing complete"),
        RefineMode::Tabular => eprintln!(
            "✅ Applied {}",
            outcome.applied.as_ref().map(|op| op.name()).unwrap_or("-")
        ),
        RefineMode::Passthrough => eprintln!("⚠️  Data returned unchanged"),
    }
    if let Some(reason) = &outcome.fallback {
        eprintln!("   Fallback: {}", reason);
    }
    eprintln!(
        "   Rows: {} → {}",
        result.source.row_count,
        outcome.table.height()
    );

    println!("{}", preview_text(&outcome.table, options.preview_rows));

    write_file(&outcome.table, output)?;
    eprintln!("\n💾 Output written to: {}", output.display());
    Ok(())
}

fn cmd_inspect(input: &Path, sheet: Option<&str>, preview_rows: usize) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Inspecting: {}", input.display());

    let loaded = load_file(input, sheet)?;
    eprintln!("   Format: {}", loaded.format);
    if let Some(ref name) = loaded.sheet_name {
        eprintln!("   Sheet: {}", name);
    }
    if let Some(ref encoding) = loaded.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = loaded.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    }
    eprintln!("   Rows: {}", loaded.table.height());
    eprintln!("   Columns: {}", loaded.table.columns().join(", "));
    eprintln!();

    println!("{}", preview_text(&loaded.table, preview_rows));
    Ok(())
}

async fn cmd_summarize(
    config: &RefinerConfig,
    input: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📊 Summarizing: {}", input.display());

    let client = OllamaClient::from_config(config);
    let result = refine_file(input, &Operation::Summarize, &RefineOptions::default(), &client).await?;
    let summary = &result.outcome.table;

    if summary.is_empty() {
        eprintln!("⚠️  No numeric columns found");
    }
    println!("{}", preview_text(summary, usize::MAX));

    if let Some(path) = output {
        write_file(summary, path)?;
        eprintln!("💾 Output written to: {}", path.display());
    }
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("Available operations:\n");
    println!("{}", operations_description());
    Ok(())
}

async fn cmd_ai_status(config: &RefinerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let client = OllamaClient::from_config(config);
    let status = client.status().await;

    if !status.available {
        eprintln!("❌ Ollama is not reachable at {}", status.host);
        eprintln!("   Start it with `ollama serve` or set OLLAMA_HOST.");
        return Err("Ollama unavailable".into());
    }

    eprintln!("✅ Ollama is running at {}", status.host);
    if status.models.is_empty() {
        eprintln!("   No models installed");
    } else {
        eprintln!("   Models: {}", status.models.join(", "));
    }
    if status.model_installed {
        eprintln!("   ✓ Model '{}' is installed", status.model);
    } else {
        eprintln!("   ⚠️  Model '{}' is not installed (ollama pull {})", status.model, status.model);
    }
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
