//! CLI console utilities
//!
//! Answers go to stdout; everything else goes to stderr so the output of a
//! query can be piped.

use colored::*;
use conduit_core::{ConduitError, ExecutedToolCall, ToolCallResult, ToolDescriptor};

/// Lines of a tool result echoed in verbose mode
const RESULT_PREVIEW_LINES: usize = 10;

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            eprintln!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn print_header(&self, title: &str) {
        eprintln!();
        eprintln!("{}", title.bold().underline());
        eprintln!("{}", "=".repeat(title.chars().count()).dimmed());
    }

    /// The final answer
    pub fn answer(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a tool result as the answer, flagging tool-reported failures
    pub fn tool_result(&self, tool_name: &str, result: &ToolCallResult) {
        if result.is_error {
            self.warn(&format!("{} reported an error", tool_name));
        }
        self.answer(&result.text());
    }

    /// Echo the tools the completion loop ran (verbose only)
    pub fn print_tool_calls(&self, calls: &[ExecutedToolCall]) {
        if !self.verbose {
            return;
        }
        for (round, executed) in calls.iter().enumerate() {
            let status = if executed.result.is_error {
                "✗".red()
            } else {
                "✓".green()
            };
            eprintln!(
                "{} {} {} {}",
                format!("Round {}:", round + 1).cyan().bold(),
                status,
                executed.call.name.magenta().bold(),
                executed.call.arguments.to_string().dimmed()
            );

            let text = executed.result.text();
            for line in text.lines().take(RESULT_PREVIEW_LINES) {
                eprintln!("    {}", line.dimmed());
            }
            if text.lines().count() > RESULT_PREVIEW_LINES {
                eprintln!("    {} (output truncated)", "...".dimmed());
            }
        }
    }

    /// Table of tools with their parameters, on stdout
    pub fn print_tools(&self, tools: &[ToolDescriptor]) {
        let width = tools.iter().map(|t| t.name.len()).max().unwrap_or(0);
        for tool in tools {
            println!("{:<width$}  {}", tool.name.bold(), tool.description, width = width);
            for param in &tool.parameters {
                let required = if param.required { "required" } else { "optional" };
                println!(
                    "{:<width$}    {} ({}, {}) {}",
                    "",
                    param.name.cyan(),
                    param.param_type,
                    required,
                    param.description.dimmed(),
                    width = width
                );
            }
        }
    }
}

/// Report a failure on stderr; startup failures include the worker's stderr
pub fn report_error(err: &anyhow::Error) {
    eprintln!("{} {:#}", "error:".red().bold(), err);

    if let Some(conduit) = err.downcast_ref::<ConduitError>() {
        if let Some(context) = conduit.context() {
            eprintln!("  {} {}", "context:".dimmed(), context);
        }
        let diagnostics = conduit.diagnostics();
        if !diagnostics.is_empty() {
            eprintln!("  {}", "worker stderr:".dimmed());
            for line in diagnostics {
                eprintln!("    {}", line);
            }
        }
    }
}
