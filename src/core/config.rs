//! Pipeline document loading and pipeline selection

use crate::core::step::minutes;
use glob_match::glob_match;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the target directory when none is given
pub const DEFAULT_DOCUMENT: &str = "bitbucket-pipelines.yml";

/// Step time budget used when neither the document nor the step sets one
pub const DEFAULT_MAX_TIME_MINUTES: f64 = 120.0;

/// Errors raised while loading the document or selecting a pipeline
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read pipeline document: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse pipeline document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Pipeline document must be a mapping")]
    NotAMapping,

    #[error("Missing required property 'pipelines'")]
    MissingPipelines,

    #[error("Missing '{section}' section in 'pipelines'")]
    MissingSection { section: &'static str },

    #[error("No pipeline named '{name}' in '{section}'")]
    MissingPipeline { section: &'static str, name: String },

    #[error("Invalid selector '{0}'")]
    InvalidSelector(String),
}

/// Which pipeline of the document to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "kebab-case")]
pub enum PipelineSelector {
    Default,
    Branch(String),
    Tag(String),
    PullRequest(String),
    Custom(String),
}

impl PipelineSelector {
    /// Key of this selector's section under `pipelines`
    pub fn section(&self) -> &'static str {
        match self {
            PipelineSelector::Default => "default",
            PipelineSelector::Branch(_) => "branches",
            PipelineSelector::Tag(_) => "tags",
            PipelineSelector::PullRequest(_) => "pull-requests",
            PipelineSelector::Custom(_) => "custom",
        }
    }

    /// Requested name within the section, if the section is named
    pub fn name(&self) -> Option<&str> {
        match self {
            PipelineSelector::Default => None,
            PipelineSelector::Branch(name)
            | PipelineSelector::Tag(name)
            | PipelineSelector::PullRequest(name)
            | PipelineSelector::Custom(name) => Some(name),
        }
    }

    /// Whether keys in this section may be glob patterns
    fn allows_patterns(&self) -> bool {
        matches!(
            self,
            PipelineSelector::Branch(_) | PipelineSelector::Tag(_) | PipelineSelector::PullRequest(_)
        )
    }
}

impl fmt::Display for PipelineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}:{}", self.section(), name),
            None => f.write_str(self.section()),
        }
    }
}

impl std::str::FromStr for PipelineSelector {
    type Err = ConfigError;

    /// Parse `default`, `branches:<name>`, `tags:<name>`,
    /// `pull-requests:<name>` or `custom:<name>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "default" {
            return Ok(PipelineSelector::Default);
        }
        let (section, name) = s
            .split_once(':')
            .filter(|(_, name)| !name.is_empty())
            .ok_or_else(|| ConfigError::InvalidSelector(s.to_string()))?;
        let name = name.to_string();
        match section {
            "branches" | "branch" => Ok(PipelineSelector::Branch(name)),
            "tags" | "tag" => Ok(PipelineSelector::Tag(name)),
            "pull-requests" | "pull-request" => Ok(PipelineSelector::PullRequest(name)),
            "custom" => Ok(PipelineSelector::Custom(name)),
            _ => Err(ConfigError::InvalidSelector(s.to_string())),
        }
    }
}

/// Run-wide step options
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExecutionOptions {
    /// Step time budget in minutes
    pub max_time: f64,
}

impl ExecutionOptions {
    /// Read the `options` block; a missing or malformed `max-time` falls back
    /// to [`DEFAULT_MAX_TIME_MINUTES`].
    pub fn from_value(options: Option<&Value>) -> Self {
        let max_time = options
            .and_then(|o| o.get("max-time"))
            .and_then(minutes)
            .unwrap_or(DEFAULT_MAX_TIME_MINUTES);
        Self { max_time }
    }
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_time: DEFAULT_MAX_TIME_MINUTES,
        }
    }
}

/// A loaded pipeline document
#[derive(Debug, Clone)]
pub struct PipelineDocument {
    image: Option<Value>,
    options: Option<Value>,
    pipelines: Mapping,
}

impl PipelineDocument {
    /// Load a document from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a document from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let root: Value = serde_yaml::from_str(yaml)?;
        let Value::Mapping(mut root) = root else {
            return Err(ConfigError::NotAMapping);
        };

        let pipelines = match root.remove("pipelines") {
            Some(Value::Mapping(pipelines)) => pipelines,
            _ => return Err(ConfigError::MissingPipelines),
        };

        Ok(Self {
            image: root.remove("image"),
            options: root.remove("options"),
            pipelines,
        })
    }

    /// The document-level `image` value
    pub fn image(&self) -> Option<&Value> {
        self.image.as_ref()
    }

    /// The document-level `options` block
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    /// Find the steps array of the selected pipeline.
    ///
    /// Named sections match an exact key first. Branch, tag and pull-request
    /// sections then try glob keys (`feature/*`, `release/**`) in document
    /// order.
    pub fn select(&self, selector: &PipelineSelector) -> Result<&Value, ConfigError> {
        let section_key = selector.section();
        let section = self
            .pipelines
            .get(section_key)
            .filter(|v| !v.is_null())
            .ok_or(ConfigError::MissingSection {
                section: section_key,
            })?;

        let Some(name) = selector.name() else {
            return Ok(section);
        };

        let missing = || ConfigError::MissingPipeline {
            section: section_key,
            name: name.to_string(),
        };
        let entries = section.as_mapping().ok_or_else(missing)?;

        if let Some(body) = entries.get(name) {
            return Ok(body);
        }

        if selector.allows_patterns() {
            for (key, body) in entries {
                if let Some(pattern) = key.as_str() {
                    if glob_match(pattern, name) {
                        return Ok(body);
                    }
                }
            }
        }

        Err(missing())
    }

    /// All selectors the document defines, in document order
    pub fn selectors(&self) -> Vec<PipelineSelector> {
        let mut selectors = Vec::new();
        for (key, value) in &self.pipelines {
            let names = || {
                value
                    .as_mapping()
                    .into_iter()
                    .flat_map(|m| m.keys())
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            };
            match key.as_str() {
                Some("default") => selectors.push(PipelineSelector::Default),
                Some("branches") => selectors.extend(names().into_iter().map(PipelineSelector::Branch)),
                Some("tags") => selectors.extend(names().into_iter().map(PipelineSelector::Tag)),
                Some("pull-requests") => {
                    selectors.extend(names().into_iter().map(PipelineSelector::PullRequest))
                }
                Some("custom") => selectors.extend(names().into_iter().map(PipelineSelector::Custom)),
                _ => {}
            }
        }
        selectors
    }
}
