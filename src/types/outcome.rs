use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

fn outcome_resource_type() -> String {
    "OperationOutcome".to_string()
}

/// FHIR issue-type codes produced by assembly.
pub mod issue_code {
    pub const INVALID: &str = "invalid";
    pub const STRUCTURE: &str = "structure";
    pub const NOT_FOUND: &str = "not-found";
    pub const EXCEPTION: &str = "exception";
    pub const INFORMATIONAL: &str = "informational";
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    #[serde(default = "outcome_resource_type")]
    pub resource_type: String,

    #[serde(default)]
    pub issue: Vec<OperationOutcomeIssue>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcomeIssue {
    pub severity: IssueSeverity,

    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<IssueDetails>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// The `details` CodeableConcept of an issue; assembly only ever sets `text`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IssueDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl OperationOutcome {
    pub fn new(issue: Vec<OperationOutcomeIssue>) -> Self {
        Self {
            resource_type: outcome_resource_type(),
            issue,
            other: Map::new(),
        }
    }

    /// A single `error` issue.
    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(vec![OperationOutcomeIssue::error(code, text)])
    }

    pub fn has_errors(&self) -> bool {
        self.issue
            .iter()
            .any(|issue| matches!(issue.severity, IssueSeverity::Fatal | IssueSeverity::Error))
    }
}

impl OperationOutcomeIssue {
    pub fn new(severity: IssueSeverity, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            details: Some(IssueDetails {
                text: Some(text.into()),
                other: Map::new(),
            }),
            diagnostics: None,
            other: Map::new(),
        }
    }

    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, code, text)
    }

    pub fn warning(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, code, text)
    }

    pub fn information(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Information, code, text)
    }

    pub fn text(&self) -> Option<&str> {
        self.details.as_ref()?.text.as_deref()
    }
}

impl fmt::Display for OperationOutcomeIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            IssueSeverity::Fatal => "fatal",
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Information => "information",
        };
        write!(f, "[{severity}] {}", self.code)?;
        if let Some(text) = self.text().or(self.diagnostics.as_deref()) {
            write!(f, ": {text}")?;
        }
        Ok(())
    }
}
