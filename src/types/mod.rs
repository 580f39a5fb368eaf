pub mod bundle;
pub mod extension;
pub mod outcome;
pub mod parameters;
pub mod questionnaire;
pub mod urls;

pub use bundle::{Bundle, BundleEntry};
pub use extension::{Coding, Expression, Extension};
pub use outcome::{IssueDetails, IssueSeverity, OperationOutcome, OperationOutcomeIssue, issue_code};
pub use parameters::{AssembleOutput, InputParameters, OutputParameters, Parameters, ParametersParameter};
pub use questionnaire::{EnableWhen, Meta, Questionnaire, QuestionnaireItem};
