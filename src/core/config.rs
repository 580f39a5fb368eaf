use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Marker token prefixed to a linkId that collides with one already claimed.
pub const DEFAULT_LINK_ID_PREFIX: &str = "linkIdPrefix";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssembleConfig {
    pub link_id_prefix: String,
    pub missing_version: MissingVersionPolicy,
}

/// What `version` becomes on an assembled Questionnaire that had none.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MissingVersionPolicy {
    /// `"undefined-assembled"`, matching existing `$assemble` servers.
    #[default]
    Legacy,
    /// Leave `version` absent.
    KeepAbsent,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            link_id_prefix: DEFAULT_LINK_ID_PREFIX.to_string(),
            missing_version: MissingVersionPolicy::default(),
        }
    }
}

impl AssembleConfig {
    pub fn with_link_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.link_id_prefix = prefix.into();
        self
    }

    pub fn with_missing_version(mut self, policy: MissingVersionPolicy) -> Self {
        self.missing_version = policy;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl MissingVersionPolicy {
    pub fn assembled_version(&self, version: Option<&str>) -> Option<String> {
        match (self, version) {
            (_, Some(version)) => Some(format!("{version}-assembled")),
            (MissingVersionPolicy::Legacy, None) => Some("undefined-assembled".to_string()),
            (MissingVersionPolicy::KeepAbsent, None) => None,
        }
    }
}

impl std::fmt::Display for MissingVersionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingVersionPolicy::Legacy => write!(f, "legacy"),
            MissingVersionPolicy::KeepAbsent => write!(f, "keep-absent"),
        }
    }
}
