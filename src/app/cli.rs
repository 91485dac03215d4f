use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Bundle a directory into one text file and replay bundles back onto it"
)]
pub struct Cli {
    /// Project configuration file
    #[arg(long, global = true, default_value = "cflconf.json")]
    pub config: PathBuf,

    /// Use a named preset from ~/.config/cfl/presets.toml
    #[arg(long, global = true)]
    pub preset: Option<String>,

    /// Extra path fragments to exclude for this run
    #[arg(long, global = true, num_args = 1..)]
    pub exclude: Option<Vec<String>>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Write the input directory into the bundle file
    Scan {
        /// Skip files listed in .gitignore
        #[arg(long)]
        gitignore: bool,
    },
    /// Replay a bundle onto the input directory
    Apply {
        /// Bundle to read instead of the configured output file ("-" for stdin)
        #[arg(long)]
        from: Option<PathBuf>,

        /// Fail on unterminated blocks, duplicate or nested files
        #[arg(long)]
        strict: bool,
    },
    /// Paste bundles interactively, DONE applies, EXIT quits
    Repl {
        /// Parse each pasted bundle in strict mode
        #[arg(long)]
        strict: bool,
    },
    /// Create or overwrite the project configuration
    Init,
}
