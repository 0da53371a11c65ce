//! CLI domain: parse, route, output, and presentation only.
//! No kernel logic; the route table dispatches to the task runner and config.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{map_error, CommandOutput};
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_modules_json, format_modules_text, format_report_json, format_result_tree_text,
    format_summary_table, format_validation_text,
};
pub use route::RunContext;
