//! Message catalog: templated, human-readable texts stored on execution results.

use crate::error::KernelError;
use std::collections::HashMap;
use std::fmt::Display;

const BUNDLED_MESSAGES: &str = include_str!("messages.toml");

/// Source of message texts for result completion.
pub trait MessageCatalog: Send + Sync {
    /// Resolve `key` and substitute positional `{n}` placeholders with `args`.
    fn message(&self, key: &str, args: &[&dyn Display]) -> String;
}

/// Catalog backed by the templates bundled with the crate.
#[derive(Debug, Clone)]
pub struct BundledCatalog {
    templates: HashMap<String, String>,
}

impl BundledCatalog {
    pub fn new() -> Result<Self, KernelError> {
        Self::from_toml(BUNDLED_MESSAGES)
    }

    /// Build a catalog from a TOML document of `"key" = "template"` pairs.
    pub fn from_toml(source: &str) -> Result<Self, KernelError> {
        let templates: HashMap<String, String> = toml::from_str(source)?;
        Ok(Self { templates })
    }

    /// Override or add templates, e.g. for localisation.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.templates.extend(overrides);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }
}

impl MessageCatalog for BundledCatalog {
    fn message(&self, key: &str, args: &[&dyn Display]) -> String {
        match self.templates.get(key) {
            Some(template) => format_template(template, args),
            None => {
                tracing::warn!(key, "Message key not found in catalog");
                let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                if rendered.is_empty() {
                    format!("??{}??", key)
                } else {
                    format!("??{}?? [{}]", key, rendered.join(", "))
                }
            }
        }
    }
}

/// Substitute `{0}`, `{1}`, ... in `template`. Placeholders without a matching
/// argument are left untouched.
pub fn format_template(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let index = &after[..close];
                match index.parse::<usize>().ok().and_then(|i| args.get(i)) {
                    Some(arg) => out.push_str(&arg.to_string()),
                    None => {
                        out.push('{');
                        out.push_str(index);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
