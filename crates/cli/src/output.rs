//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Render a split as `v1:80 / v2:20`
pub fn format_split(v1: &str, w1: u32, v2: &str, w2: u32) -> String {
    format!("{}:{} / {}:{}", v1, w1, v2, w2)
}

/// Color a deploy stamp: green when deployed, yellow placeholder otherwise
pub fn color_deployed(deployed_at: Option<&str>) -> String {
    match deployed_at {
        Some(at) => at.green().to_string(),
        None => "never".yellow().to_string(),
    }
}
