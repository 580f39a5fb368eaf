use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{OperationOutcome, OperationOutcomeIssue, Questionnaire};
use crate::error::{AssembleError, Result};

fn parameters_resource_type() -> String {
    "Parameters".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    #[serde(default = "parameters_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<Vec<ParametersParameter>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParametersParameter {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Parameters {
    pub fn new(parameter: Vec<ParametersParameter>) -> Self {
        Self {
            resource_type: parameters_resource_type(),
            parameter: Some(parameter),
            other: Map::new(),
        }
    }
}

impl ParametersParameter {
    pub fn resource(name: impl Into<String>, resource: Value) -> Self {
        Self {
            name: name.into(),
            resource: Some(resource),
            other: Map::new(),
        }
    }
}

/// Validated `$assemble` input: the root Questionnaire.
#[derive(Debug, Clone, PartialEq)]
pub struct InputParameters {
    pub questionnaire: Questionnaire,
}

impl InputParameters {
    pub fn from_questionnaire(questionnaire: Questionnaire) -> Self {
        Self { questionnaire }
    }

    /// Picks the root Questionnaire out of a Parameters resource.
    ///
    /// The root is the resource of the first parameter, whatever its name. It
    /// must be a Questionnaire.
    pub fn from_parameters(parameters: Parameters) -> Result<Self> {
        if parameters.resource_type != "Parameters" {
            return Err(AssembleError::invalid_input(format!(
                "expected a Parameters resource, found {}",
                parameters.resource_type
            )));
        }

        let Some(chosen) = parameters.parameter.unwrap_or_default().into_iter().next() else {
            return Err(AssembleError::invalid_input(
                "Parameters resource does not contain any parameter",
            ));
        };

        let resource = match chosen.resource {
            Some(resource) if resource.get("resourceType").and_then(Value::as_str) == Some("Questionnaire") => resource,
            _ => {
                return Err(AssembleError::invalid_input(format!(
                    "parameter '{}' does not contain a Questionnaire resource",
                    chosen.name
                )));
            }
        };

        let questionnaire = serde_json::from_value(resource).map_err(|e| {
            AssembleError::invalid_input(format!("root Questionnaire is malformed: {e}"))
        })?;

        Ok(Self { questionnaire })
    }

    /// Accepts either a Parameters resource or a bare Questionnaire.
    pub fn from_value(value: Value) -> Result<Self> {
        match value.get("resourceType").and_then(Value::as_str) {
            Some("Parameters") => {
                let parameters: Parameters = serde_json::from_value(value).map_err(|e| {
                    AssembleError::invalid_input(format!("Parameters resource is malformed: {e}"))
                })?;
                Self::from_parameters(parameters)
            }
            Some("Questionnaire") => {
                let questionnaire = serde_json::from_value(value).map_err(|e| {
                    AssembleError::invalid_input(format!("root Questionnaire is malformed: {e}"))
                })?;
                Ok(Self::from_questionnaire(questionnaire))
            }
            other => Err(AssembleError::invalid_input(format!(
                "expected a Parameters or Questionnaire resource, found {}",
                other.unwrap_or("no resourceType")
            ))),
        }
    }
}

impl TryFrom<Parameters> for InputParameters {
    type Error = AssembleError;

    fn try_from(parameters: Parameters) -> Result<Self> {
        Self::from_parameters(parameters)
    }
}

/// Successful assembly that produced warnings: serialized as a Parameters
/// resource with a `return` and an `outcome` parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputParameters {
    pub questionnaire: Questionnaire,
    pub outcome: OperationOutcome,
}

impl OutputParameters {
    pub fn new(questionnaire: Questionnaire, issues: Vec<OperationOutcomeIssue>) -> Self {
        Self {
            questionnaire,
            outcome: OperationOutcome::new(issues),
        }
    }

    pub fn to_parameters(&self) -> serde_json::Result<Parameters> {
        Ok(Parameters::new(vec![
            ParametersParameter::resource("return", serde_json::to_value(&self.questionnaire)?),
            ParametersParameter::resource("outcome", serde_json::to_value(&self.outcome)?),
        ]))
    }
}

impl Serialize for OutputParameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_parameters()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

/// The three possible results of `$assemble`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AssembleOutput {
    /// Fully assembled, no warnings.
    Questionnaire(Questionnaire),
    /// Fatal failure.
    OperationOutcome(OperationOutcome),
    /// Assembled, with warning or information issues.
    Parameters(OutputParameters),
}

impl AssembleOutput {
    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Questionnaire(_) => "Questionnaire",
            Self::OperationOutcome(_) => "OperationOutcome",
            Self::Parameters(_) => "Parameters",
        }
    }

    /// The assembled Questionnaire, with or without warnings.
    pub fn questionnaire(&self) -> Option<&Questionnaire> {
        match self {
            Self::Questionnaire(questionnaire) => Some(questionnaire),
            Self::Parameters(output) => Some(&output.questionnaire),
            Self::OperationOutcome(_) => None,
        }
    }

    /// The fatal outcome, or the warnings outcome.
    pub fn outcome(&self) -> Option<&OperationOutcome> {
        match self {
            Self::OperationOutcome(outcome) => Some(outcome),
            Self::Parameters(output) => Some(&output.outcome),
            Self::Questionnaire(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::OperationOutcome(_))
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
