use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use deepnote_core::VERSION;

/// Deepnote - inspect and manage SQL integration credentials
#[derive(Parser)]
#[command(name = "deepnote")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Credential store directory
    #[arg(short, long, global = true, env = "DEEPNOTE_STORE")]
    pub store: Option<PathBuf>,

    /// Config file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List stored integrations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one integration with secrets redacted
    Show {
        /// Integration id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Save an integration config read from a JSON file (`-` for stdin)
    Add {
        #[arg(value_name = "FILE")]
        file: String,
    },

    /// Remove an integration
    Remove {
        /// Integration id
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Remove every stored integration
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show the integrations a project uses and whether they are configured
    Detect {
        /// Path to a .deepnote project file
        #[arg(value_name = "PROJECT_FILE")]
        project: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the SQL environment variables for a project
    Env {
        /// Path to a .deepnote project file
        #[arg(value_name = "PROJECT_FILE")]
        project: PathBuf,

        /// Output as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Print the kernel startup code for a project
    StartupCode {
        /// Path to a .deepnote project file
        #[arg(value_name = "PROJECT_FILE")]
        project: PathBuf,

        /// Kernel language
        #[arg(long, default_value = "python")]
        language: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_name = "SHELL")]
        shell: Shell,
    },
}
