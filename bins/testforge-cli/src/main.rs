mod commands;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use testforge_common::FileFormat;

#[derive(Parser)]
#[command(name = "testforge-cli")]
#[command(about = "testforge CLI - Ingest test case files, validate questions, and gate test publication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a test case file (.txt or .json) and print the bundle
    Parse {
        /// Path to the uploaded test case file
        file: String,

        /// Force the format (text or json) instead of guessing from the extension
        #[arg(short, long)]
        format: Option<FileFormat>,
    },

    /// Convert a test case file between the text and JSON formats
    Convert {
        /// Path to the source test case file
        file: String,

        /// Target format (text or json)
        #[arg(short, long)]
        to: FileFormat,

        /// Source format, guessed from the extension when omitted
        #[arg(long)]
        from: Option<FileFormat>,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Validate a question draft (JSON)
    Validate {
        /// Path to the question draft
        file: String,

        /// Reject test cases with a blank input or output (manual entry mode)
        #[arg(long)]
        strict: bool,
    },

    /// Publish a draft test (JSON) if every question is complete
    Publish {
        /// Path to the test
        file: String,

        /// Write the published test here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Apply a patch (JSON) to a test, honoring the publication freeze
    Edit {
        /// Path to the test
        test: String,

        /// Path to the patch
        patch: String,

        /// Write the edited test here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Check whether a test may be deleted
    CanDelete {
        /// Path to the test
        file: String,

        /// Evaluate at this RFC 3339 instant instead of now
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },

    /// Check the settings of a test (title, duration, marks, dates)
    Check {
        /// Path to the test
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, format } => {
            commands::parse_file(&file, format).await?;
        }
        Commands::Convert { file, to, from, output } => {
            commands::convert_file(&file, from, to, output.as_deref()).await?;
        }
        Commands::Validate { file, strict } => {
            commands::validate_question(&file, strict).await?;
        }
        Commands::Publish { file, output } => {
            commands::publish_test(&file, output.as_deref()).await?;
        }
        Commands::Edit { test, patch, output } => {
            commands::edit_test(&test, &patch, output.as_deref()).await?;
        }
        Commands::CanDelete { file, now } => {
            commands::can_delete_test(&file, now.unwrap_or_else(Utc::now)).await?;
        }
        Commands::Check { file } => {
            commands::check_test(&file).await?;
        }
    }

    Ok(())
}
