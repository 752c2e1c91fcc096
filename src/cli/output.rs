//! Output formatting utilities for the CLI.

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use crate::domain::models::{Severity, ValidationIssue, ValidationReport};

const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";

/// Command result renderable as text or JSON.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

/// Print `result` in the selected mode
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// Truncate a string to at most `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Spinner on stderr; hidden in JSON mode so stdout stays parseable.
pub fn create_spinner(message: impl Into<String>, json_mode: bool) -> ProgressBar {
    if json_mode || !console::Term::stderr().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
        pb.set_style(spinner_style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|n| Cell::new(n).add_attribute(Attribute::Bold))
        .collect()
}

/// Table of validation issues
pub fn issues_table(issues: &[ValidationIssue]) -> String {
    let mut table = base_table();
    table.set_header(header(&["Severity", "Code", "Location", "Message"]));
    for issue in issues {
        let color = match issue.severity {
            Severity::Error => Color::Red,
            Severity::Warning => Color::Yellow,
        };
        table.add_row(vec![
            Cell::new(issue.severity.as_str()).fg(color),
            Cell::new(issue.code.as_str()),
            Cell::new(&issue.location),
            Cell::new(truncate(&issue.message, 80)),
        ]);
    }
    table.to_string()
}

/// Table of per-example results
pub fn report_table(report: &ValidationReport) -> String {
    let mut table = base_table();
    table.set_header(header(&["Test", "Result", "Input", "Detail"]));
    for test in &report.test_results {
        let (label, color) = if test.passed {
            ("PASS", Color::Green)
        } else {
            ("FAIL", Color::Red)
        };
        table.add_row(vec![
            Cell::new(&test.test_name),
            Cell::new(label).fg(color),
            Cell::new(truncate(&test.input_values.to_string(), 40)),
            Cell::new(truncate(test.error.as_deref().unwrap_or(""), 60)),
        ]);
    }
    table.to_string()
}

/// One-line pass summary, e.g. `3/4 examples passing`.
pub fn report_summary(report: &ValidationReport) -> String {
    let text = format!("{}/{} examples passing", report.passed_count, report.total_tests);
    if report.is_valid {
        style(text).green().to_string()
    } else {
        style(text).red().to_string()
    }
}
