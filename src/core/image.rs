//! Container image configuration and per-step resolution

use crate::core::expand::{expand_value, expand_with};
use serde::Serialize;
use serde_yaml::Value;

/// Image used when neither the document nor a step names one
pub const DEFAULT_IMAGE: &str = "atlassian/default-image:latest";

/// Effective image for a step: name plus optional registry credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Never serialized
    #[serde(skip_serializing)]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<String>,
}

impl ImageConfig {
    /// A bare image with no credentials
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            username: None,
            password: None,
            run_as_user: None,
        }
    }

    /// The system default image
    pub fn system_default() -> Self {
        Self::named(DEFAULT_IMAGE)
    }

    /// Username and password, when both are present and non-empty
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Registry host embedded in the image name, if any.
    ///
    /// `registry.example.com/team/app:1` yields `registry.example.com`;
    /// Docker Hub names like `python:3.12` or `team/app` yield `None`.
    pub fn registry(&self) -> Option<&str> {
        let (first, rest) = self.name.split_once('/')?;
        if rest.is_empty() {
            return None;
        }
        if first.contains('.') || first.contains(':') || first == "localhost" {
            Some(first)
        } else {
            None
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self::system_default()
    }
}

/// Image declaration as written in the document, before expansion
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    /// `image: python:3.12`
    Name(String),
    /// `image: { name: ..., username: ..., password: ..., run-as-user: ... }`
    Detailed {
        name: Option<Value>,
        username: Option<Value>,
        password: Option<Value>,
        run_as_user: Option<Value>,
    },
}

impl ImageRef {
    /// Read an `image` value. Shapes other than a string or mapping are
    /// treated as if no image was declared.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(ImageRef::Name(name.clone())),
            Value::Mapping(map) => Some(ImageRef::Detailed {
                name: map.get("name").cloned(),
                username: map.get("username").cloned(),
                password: map.get("password").cloned(),
                run_as_user: map.get("run-as-user").cloned(),
            }),
            _ => None,
        }
    }
}

/// Compute the effective image for a step using the process environment.
pub fn resolve_image(declared: Option<&ImageRef>, fallback: &ImageConfig) -> ImageConfig {
    resolve_image_with(declared, fallback, |name| std::env::var(name).ok())
}

/// Compute the effective image for a step.
///
/// - no declaration: the fallback, unchanged
/// - bare name: that name, with no credentials (nothing is inherited)
/// - mapping: each field expanded; a missing name becomes [`DEFAULT_IMAGE`]
pub fn resolve_image_with<F>(
    declared: Option<&ImageRef>,
    fallback: &ImageConfig,
    lookup: F,
) -> ImageConfig
where
    F: Fn(&str) -> Option<String>,
{
    match declared {
        None => fallback.clone(),
        Some(ImageRef::Name(name)) => ImageConfig::named(expand_with(name, &lookup)),
        Some(ImageRef::Detailed {
            name,
            username,
            password,
            run_as_user,
        }) => ImageConfig {
            name: expand_value(name.as_ref(), &lookup).unwrap_or_else(|| DEFAULT_IMAGE.to_string()),
            username: expand_value(username.as_ref(), &lookup),
            password: expand_value(password.as_ref(), &lookup),
            run_as_user: expand_value(run_as_user.as_ref(), &lookup),
        },
    }
}
