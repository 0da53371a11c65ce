//! CLI presentation: result trees, summaries, validation and module listings.

use crate::config::{RiggingConfig, ValidationError};
use crate::error::KernelError;
use crate::execution::{ExecutionState, ResultReport, MSG_ERROR_MESSAGE, MSG_MESSAGE};
use comfy_table::Table;
use owo_colors::OwoColorize;

fn state_label(state: ExecutionState, color: bool) -> String {
    let label = format!("{:<9}", state.as_str());
    if !color {
        return label;
    }
    match state {
        ExecutionState::Success => label.green().to_string(),
        ExecutionState::Failure => label.yellow().to_string(),
        ExecutionState::Error => label.red().bold().to_string(),
        ExecutionState::Executing => label.cyan().to_string(),
    }
}

/// Render a result tree as an indented outline. Failed and errored results
/// show the first line of their error message.
pub fn format_result_tree_text(report: &ResultReport, color: bool) -> String {
    let mut out = String::new();
    render_node(report, "", true, true, color, &mut out);
    out
}

fn render_node(
    report: &ResultReport,
    prefix: &str,
    last: bool,
    root: bool,
    color: bool,
    out: &mut String,
) {
    let (branch, child_prefix) = if root {
        (String::new(), String::new())
    } else if last {
        (format!("{}└─ ", prefix), format!("{}   ", prefix))
    } else {
        (format!("{}├─ ", prefix), format!("{}│  ", prefix))
    };

    out.push_str(&format!(
        "{}{} {} ({} ms)\n",
        branch,
        state_label(report.state, color),
        report.description,
        report.elapsed_ms
    ));

    let detail = match report.state {
        ExecutionState::Success => None,
        _ => report
            .messages
            .get(MSG_ERROR_MESSAGE)
            .or_else(|| report.messages.get(MSG_MESSAGE)),
    };
    if let Some(detail) = detail.and_then(|d| d.lines().next()) {
        let detail_prefix = if root { "  " } else { child_prefix.as_str() };
        let text = if color {
            detail.dimmed().to_string()
        } else {
            detail.to_string()
        };
        out.push_str(&format!("{}  {}\n", detail_prefix, text));
    }

    let count = report.children.len();
    for (index, child) in report.children.iter().enumerate() {
        render_node(child, &child_prefix, index + 1 == count, false, color, out);
    }
}

/// Summary table with result counts per state.
pub fn format_summary_table(report: &ResultReport) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["State", "Results"]);
    for state in [
        ExecutionState::Success,
        ExecutionState::Failure,
        ExecutionState::Error,
        ExecutionState::Executing,
    ] {
        table.add_row(vec![
            state.as_str().to_string(),
            report.count_state(state).to_string(),
        ]);
    }
    table.add_row(vec!["TOTAL".to_string(), report.count().to_string()]);
    table.to_string()
}

pub fn format_report_json(report: &ResultReport) -> Result<String, KernelError> {
    serde_json::to_string_pretty(report)
        .map_err(|e| KernelError::ConfigError(format!("Failed to serialize report: {}", e)))
}

pub fn format_validation_text(errors: &[ValidationError], warnings: &[String]) -> String {
    if errors.is_empty() && warnings.is_empty() {
        return "Validation passed: all checks passed".to_string();
    }
    let mut s = if errors.is_empty() {
        "Validation passed with warnings:".to_string()
    } else {
        "Validation failed:".to_string()
    };
    if !errors.is_empty() {
        s.push_str(&format!("\n\nErrors ({}):", errors.len()));
        for e in errors {
            s.push_str(&format!("\n  - {}", e));
        }
    }
    if !warnings.is_empty() {
        s.push_str(&format!("\n\nWarnings ({}):", warnings.len()));
        for w in warnings {
            s.push_str(&format!("\n  - {}", w));
        }
    }
    s
}

pub fn format_modules_text(config: &RiggingConfig) -> String {
    if config.modules.is_empty() {
        return "No modules declared.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Module", "Models", "Triggers", "Continue on failure", "Description"]);
    for module in &config.modules {
        let triggers: usize = module.models.iter().map(|m| m.triggers.len()).sum();
        table.add_row(vec![
            module.id.clone(),
            module.models.len().to_string(),
            triggers.to_string(),
            module.continue_on_failure.to_string(),
            module.description.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}

pub fn format_modules_json(config: &RiggingConfig) -> Result<String, KernelError> {
    let modules: Vec<serde_json::Value> = config
        .modules
        .iter()
        .map(|m| {
            serde_json::json!({
                "id": m.id,
                "description": m.description,
                "continue_on_failure": m.continue_on_failure,
                "models": m.models.len(),
                "triggers": m.models.iter().map(|model| model.triggers.len()).sum::<usize>(),
            })
        })
        .collect();
    serde_json::to_string_pretty(&modules)
        .map_err(|e| KernelError::ConfigError(format!("Failed to serialize modules: {}", e)))
}
