//! Environments, target resources and the resolution of target directives.

use crate::error::KernelError;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

const REGEX_PREFIX: &str = "regex:";

/// A named endpoint within an environment which a plugin acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    /// Plugin handling operations on this resource.
    pub plugin_id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(id: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plugin_id: plugin_id.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A named set of resources, e.g. "production".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Environment {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            resources: Vec::new(),
        }
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Look up a resource by id
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }
}

/// Resource lookup used by the kernel. Implementations must be safe for
/// concurrent reads.
pub trait ResourceRepository: Send + Sync {
    fn resolve_environment(&self, environment: &str) -> Result<Arc<Environment>, KernelError>;

    fn resolve_resource(&self, environment: &str, resource: &str) -> Result<Resource, KernelError> {
        let env = self.resolve_environment(environment)?;
        env.resource(resource)
            .cloned()
            .ok_or_else(|| KernelError::ResourceNotFound {
                environment: environment.to_string(),
                resource: resource.to_string(),
            })
    }

    /// Resource ids of an environment in declaration order.
    fn resource_ids(&self, environment: &str) -> Result<Vec<String>, KernelError> {
        let env = self.resolve_environment(environment)?;
        Ok(env.resources.iter().map(|r| r.id.clone()).collect())
    }
}

/// In-memory resource repository
#[derive(Debug, Default)]
pub struct InMemoryResourceRepository {
    environments: RwLock<HashMap<String, Arc<Environment>>>,
}

impl InMemoryResourceRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an environment, replacing any environment with the same id
    pub fn register(&self, environment: Environment) {
        self.environments
            .write()
            .insert(environment.id.clone(), Arc::new(environment));
    }

    /// Environment ids, sorted
    pub fn environment_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.environments.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl ResourceRepository for InMemoryResourceRepository {
    fn resolve_environment(&self, environment: &str) -> Result<Arc<Environment>, KernelError> {
        self.environments
            .read()
            .get(environment)
            .cloned()
            .ok_or_else(|| KernelError::EnvironmentNotFound(environment.to_string()))
    }
}

/// Parsed form of a model's target resource directive.
#[derive(Debug, Clone)]
pub enum TargetDirective {
    /// Blank: no specific target, nothing is executed.
    None,
    Single(String),
    List(Vec<String>),
    /// Every resource id of the environment fully matching the pattern.
    Pattern(Regex),
}

impl TargetDirective {
    pub fn parse(raw: &str) -> Result<Self, KernelError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(TargetDirective::None);
        }
        if let Some(pattern) = trimmed.strip_prefix(REGEX_PREFIX) {
            let anchored = format!("^(?:{})$", pattern.trim());
            let regex = Regex::new(&anchored).map_err(|e| KernelError::InvalidDirective {
                directive: raw.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(TargetDirective::Pattern(regex));
        }
        if let Some(inner) = trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let ids = inner
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
            return Ok(TargetDirective::List(ids));
        }
        Ok(TargetDirective::Single(trimmed.to_string()))
    }

    /// Resolve to resource ids. Only patterns consult the repository.
    pub fn resolve(
        &self,
        repository: &dyn ResourceRepository,
        environment: &str,
    ) -> Result<Vec<String>, KernelError> {
        match self {
            TargetDirective::None => Ok(Vec::new()),
            TargetDirective::Single(id) => Ok(vec![id.clone()]),
            TargetDirective::List(ids) => Ok(ids.clone()),
            TargetDirective::Pattern(regex) => Ok(repository
                .resource_ids(environment)?
                .into_iter()
                .filter(|id| regex.is_match(id))
                .collect()),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, TargetDirective::None)
    }
}

impl fmt::Display for TargetDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetDirective::None => f.write_str(""),
            TargetDirective::Single(id) => f.write_str(id),
            TargetDirective::List(ids) => write!(f, "{{{}}}", ids.join(", ")),
            TargetDirective::Pattern(regex) => {
                let pattern = regex.as_str();
                let inner = pattern
                    .strip_prefix("^(?:")
                    .and_then(|p| p.strip_suffix(")$"))
                    .unwrap_or(pattern);
                write!(f, "{}{}", REGEX_PREFIX, inner)
            }
        }
    }
}
