//! CLI module for S.A.G.E.
//!
//! Provides command-line interface parsing and handling for the sage
//! binary. Uses clap for argument parsing and owo-colors for colored
//! terminal output.

pub mod output;

use clap::{Parser, Subcommand};

/// S.A.G.E. - Scholarly Agent for Gathering Evidence
///
/// A multi-agent research assistant: parallel search across paper sources,
/// relevance scoring, finding extraction, synthesis and gap identification.
#[derive(Parser, Debug)]
#[command(
    name = "sage",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "S.A.G.E. - Scholarly Agent for Gathering Evidence",
    long_about = "A multi-agent research assistant that fans a query out across paper\n\
                  sources in parallel, then runs a sequential analysis pipeline:\n\
                  relevance scoring, finding extraction, synthesis and gap identification.",
    after_help = "EXAMPLES:\n    \
                  sage research \"transformer efficiency\"        # Run a research query\n    \
                  sage research \"llm agents\" --max-results 20  # More results per source\n    \
                  sage memory list                             # List long-term memory keys\n    \
                  sage memory show run:transformer_efficiency  # Show one memory record"
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a research query end to end
    ///
    /// Plans the query, fans out across the configured search sources,
    /// runs the analysis pipeline and prints the results.
    Research {
        /// The research question
        query: String,

        /// Maximum results requested per source
        #[arg(short, long, default_value = "10")]
        max_results: usize,

        /// Write the synthesis to a report file in the output directory
        #[arg(long)]
        report: bool,
    },

    /// Inspect long-term memory
    #[command(subcommand)]
    Memory(MemoryCommands),
}

/// Memory inspection subcommands
#[derive(Subcommand, Debug)]
pub enum MemoryCommands {
    /// List all stored memory keys
    List,

    /// Show the record stored under a key
    Show {
        /// Key of the record
        key: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
