//! Version registry: derives generation names from a release tag.
//!
//! Every name is `{prefix}-{role}-{version}`. A missing or malformed tag
//! leaves no generation current, so activation deletes everything.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical role of a cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Application shell documents, manifest, icons, offline page.
    Shell,
    /// Code chunks, images, fonts, stylesheets.
    Static,
    /// Raw data-endpoint responses.
    Data,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Shell, Role::Static, Role::Data];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Shell => "shell",
            Role::Static => "static",
            Role::Data => "data",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of generation names for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generations {
    prefix: String,
    version: String,
}

impl Generations {
    pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), version: version.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the generation holding `role` for this release.
    pub fn name(&self, role: Role) -> String {
        generation_name(&self.prefix, role, &self.version)
    }

    /// Names considered current. Empty when the version tag is malformed.
    pub fn current(&self) -> Vec<String> {
        if !is_valid_tag(&self.version) {
            return Vec::new();
        }
        Role::ALL.iter().map(|role| self.name(*role)).collect()
    }

    pub fn is_current(&self, name: &str) -> bool {
        is_valid_tag(&self.version) && Role::ALL.iter().any(|role| self.name(*role) == name)
    }

    /// Whether `name` was created by an engine using this prefix.
    pub fn is_owned(&self, name: &str) -> bool {
        name.strip_prefix(&self.prefix).is_some_and(|rest| rest.starts_with('-'))
    }
}

pub fn generation_name(prefix: &str, role: Role, version: &str) -> String {
    format!("{prefix}-{role}-{version}")
}

/// A tag is valid when it is non-empty and limited to `[A-Za-z0-9._-]`.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
