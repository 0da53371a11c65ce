//! Directive grammar shared by trigger result/operation directives and the
//! model operation restriction.
//!
//! - `*`, empty or absent: matches anything
//! - `token`: matches exactly that token (surrounding whitespace ignored)
//! - `{a, b, c}`: matches any listed token; `{}` matches nothing and a `*`
//!   inside the list matches anything

use crate::error::KernelError;
use std::fmt;
use std::str::FromStr;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Any,
    Token(String),
    List(Vec<String>),
}

impl Directive {
    /// Parse a directive. Unbalanced braces are rejected.
    pub fn parse(raw: &str) -> Result<Self, KernelError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == WILDCARD {
            return Ok(Directive::Any);
        }

        let opens = trimmed.starts_with('{');
        let closes = trimmed.ends_with('}');
        if opens != closes {
            return Err(invalid(raw, "unbalanced braces"));
        }

        if opens {
            let inner = &trimmed[1..trimmed.len() - 1];
            if inner.contains('{') || inner.contains('}') {
                return Err(invalid(raw, "nested braces are not supported"));
            }
            let tokens = inner
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(Directive::List(tokens));
        }

        if trimmed.contains('{') || trimmed.contains('}') || trimmed.contains(',') {
            return Err(invalid(raw, "tokens must not contain braces or commas"));
        }
        Ok(Directive::Token(trimmed.to_string()))
    }

    /// Parse an optional directive; `None` behaves like the wildcard.
    pub fn parse_optional(raw: Option<&str>) -> Result<Self, KernelError> {
        raw.map_or(Ok(Directive::Any), Directive::parse)
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        match self {
            Directive::Any => true,
            Directive::Token(token) => token == candidate,
            Directive::List(tokens) => tokens.iter().any(|t| t == WILDCARD || t == candidate),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        match self {
            Directive::Any => true,
            Directive::Token(_) => false,
            Directive::List(tokens) => tokens.iter().any(|t| t == WILDCARD),
        }
    }
}

impl FromStr for Directive {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Directive::parse(s)
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Directive::Any => f.write_str(WILDCARD),
            Directive::Token(token) => f.write_str(token),
            Directive::List(tokens) => write!(f, "{{{}}}", tokens.join(",")),
        }
    }
}

fn invalid(raw: &str, reason: &str) -> KernelError {
    KernelError::InvalidDirective {
        directive: raw.to_string(),
        reason: reason.to_string(),
    }
}
