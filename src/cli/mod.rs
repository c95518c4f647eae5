//! CLI module for ragline
//!
//! Provides command-line interface parsing for the ragline-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::utils::config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ragline - document question answering over a vector index
///
/// Upload PDF, DOCX, TXT and XLSX files, then ask questions answered from
/// their contents.
#[derive(Parser, Debug)]
#[command(
    name = "ragline-server",
    version,
    about = "ragline - retrieval-augmented question answering over uploaded documents",
    long_about = "Indexes uploaded documents into a Pinecone vector index using OpenAI embeddings,\n\
                  and answers questions with an OpenAI chat model using the best-matching chunks.\n\n\
                  Run without arguments to start the HTTP server.",
    after_help = "EXAMPLES:\n    \
                  ragline-server                          # Start the server\n    \
                  ragline-server --port 9000 serve        # Start on another port\n    \
                  ragline-server ingest report.pdf a.txt  # Index local files\n    \
                  ragline-server ask \"What is due?\"       # Ask a question\n    \
                  ragline-server files                    # List indexed files"
)]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "HOST", global = true)]
    pub host: Option<String>,

    /// Port to bind the HTTP server to
    #[arg(short, long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Directory holding the upload log
    #[arg(long, env = "DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Index local documents
    Ingest {
        /// Files to index (.pdf, .docx, .txt, .xlsx)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a question against the indexed documents
    Ask {
        /// The question
        question: String,

        /// Print the answer as it is generated
        #[arg(long)]
        stream: bool,
    },

    /// List uploaded files and their chunk counts
    Files,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Override configuration values given on the command line.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.data_dir {
            config.rag.data_dir = dir.clone();
        }
    }
}
