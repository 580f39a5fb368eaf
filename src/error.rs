use thiserror::Error;

use crate::types::{OperationOutcome, issue_code};

/// Attribute a sub-questionnaire may not carry into an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProhibitedAttribute {
    ImplicitRules,
    ModifierExtension,
}

impl std::fmt::Display for ProhibitedAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProhibitedAttribute::ImplicitRules => write!(f, "implicitRules"),
            ProhibitedAttribute::ModifierExtension => write!(f, "a modifierExtension"),
        }
    }
}

/// Fatal assembly failures. Each one aborts the whole `$assemble` call and is
/// reported as an `OperationOutcome`.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Root questionnaire does not have a valid item.")]
    InvalidStructure,

    #[error("{questionnaire} contains a circular dependency on the questionnaire {canonical}")]
    CircularDependency {
        questionnaire: String,
        canonical: String,
    },

    #[error("Unable to fetch questionnaire with canonical url '{canonical}'")]
    NotFound { canonical: String },

    #[error("The questionnaire fetched for '{canonical}' is malformed: {source}")]
    MalformedQuestionnaire {
        canonical: String,
        #[source]
        source: serde_json::Error,
    },

    /// An OperationOutcome answered by the fetcher; returned verbatim.
    #[error("Fetching a subquestionnaire returned an OperationOutcome")]
    RemoteOutcome(OperationOutcome),

    #[error("The subquestionnaire {url} contains {attribute}, which is prohibited.")]
    ProhibitedAttribute {
        url: String,
        attribute: ProhibitedAttribute,
    },

    #[error(
        "The subquestionnaire {url} contains a language property but its parent questionnaire {parent_url} doesn't."
    )]
    MissingParentLanguage { url: String, parent_url: String },

    #[error("The subquestionnaire {url} has a different language from its parent questionnaire {parent_url}")]
    LanguageMismatch { url: String, parent_url: String },

    #[error("The variable '{name}' is duplicated.")]
    DuplicateVariable { name: String },

    #[error("The subquestionnaire {url} is trying to propagate more than one {context}.")]
    MultipleContexts { url: String, context: &'static str },

    #[error("Invalid input parameters: {message}")]
    InvalidInput { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssembleError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// FHIR issue-type code reported for this failure.
    pub fn issue_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => issue_code::NOT_FOUND,
            Self::MalformedQuestionnaire { .. } => issue_code::STRUCTURE,
            Self::Serialization(_) | Self::Io(_) => issue_code::EXCEPTION,
            Self::RemoteOutcome(_)
            | Self::InvalidStructure
            | Self::CircularDependency { .. }
            | Self::ProhibitedAttribute { .. }
            | Self::MissingParentLanguage { .. }
            | Self::LanguageMismatch { .. }
            | Self::DuplicateVariable { .. }
            | Self::MultipleContexts { .. }
            | Self::InvalidInput { .. } => issue_code::INVALID,
        }
    }

    /// Converts into the OperationOutcome returned to callers. An outcome
    /// received from the fetcher is passed through unchanged.
    pub fn into_outcome(self) -> OperationOutcome {
        match self {
            Self::RemoteOutcome(outcome) => outcome,
            other => OperationOutcome::error(other.issue_code(), other.to_string()),
        }
    }
}

impl From<AssembleError> for OperationOutcome {
    fn from(error: AssembleError) -> Self {
        error.into_outcome()
    }
}

/// A fetch that failed at the transport level. Non-fatal: the
/// sub-questionnaire is skipped and the message becomes a warning issue.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct FetchError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssembleError>;
