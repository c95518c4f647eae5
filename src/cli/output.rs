//! Colored output helpers for CLI
//!
//! Provides consistent terminal output for the ragline-server subcommands.

use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Width of the filename column in file listings.
const NAME_WIDTH: usize = 40;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the startup banner
    pub fn banner(&self, addr: &str) {
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            println!(
                "\n   {} {}",
                "ragline".bright_cyan().bold(),
                version.dimmed()
            );
            println!(
                "   {} {}\n",
                "listening on".dimmed(),
                format!("http://{}", addr).bright_white()
            );
        } else {
            println!("\n   ragline {}", version);
            println!("   listening on http://{}\n", addr);
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Report one ingested file
    pub fn indexed(&self, filename: &str, chunks: usize) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                filename.bright_white(),
                format!("({} chunks)", chunks).dimmed()
            );
        } else {
            println!("  [INDEXED] {} ({} chunks)", filename, chunks);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print part of a streamed answer without a trailing newline
    pub fn fragment(&self, text: &str) {
        print!("{}", text);
        io::stdout().flush().ok();
    }

    /// Print the header of the file listing
    pub fn file_table_header(&self) {
        let header = file_row("FILE", "CHUNKS");
        let rule = "─".repeat(NAME_WIDTH + 8);
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", rule.dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(NAME_WIDTH + 8));
        }
    }

    /// Print one file of the listing
    pub fn file_table_row(&self, filename: &str, chunks: usize) {
        println!("    {}", file_row(filename, &chunks.to_string()));
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

fn file_row(name: &str, chunks: &str) -> String {
    format!("{:<width$} {:>7}", name, chunks, width = NAME_WIDTH)
}
