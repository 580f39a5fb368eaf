use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::urls;

/// A FHIR Extension.
///
/// Only the value types that assembly inspects are typed; every other
/// `value[x]` (and any unknown member) is carried through `other` untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_canonical: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_coding: Option<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_expression: Option<Expression>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Expression {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Extension {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_value_canonical(mut self, canonical: impl Into<String>) -> Self {
        self.value_canonical = Some(canonical.into());
        self
    }

    pub fn with_value_code(mut self, code: impl Into<String>) -> Self {
        self.value_code = Some(code.into());
        self
    }

    pub fn with_value_expression(mut self, expression: Expression) -> Self {
        self.value_expression = Some(expression);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension.get_or_insert_with(Vec::new).push(extension);
        self
    }

    /// Shorthand for an `sdc-questionnaire-assembledFrom` extension.
    pub fn assembled_from(canonical: impl Into<String>) -> Self {
        Self::new(urls::ASSEMBLED_FROM).with_value_canonical(canonical)
    }

    /// Shorthand for a `variable` extension with a FHIRPath expression.
    pub fn variable(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(urls::VARIABLE).with_value_expression(Expression {
            name: Some(name.into()),
            language: Some("text/fhirpath".to_string()),
            expression: Some(expression.into()),
            other: Map::new(),
        })
    }

    /// Shorthand for a launchContext extension whose `name` coding carries `code`.
    pub fn launch_context(code: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let mut name = Extension::new("name");
        name.value_coding = Some(Coding {
            system: Some("http://hl7.org/fhir/uv/sdc/CodeSystem/launchContext".to_string()),
            code: Some(code.into()),
            display: None,
            other: Map::new(),
        });

        let mut type_ext = Extension::new("type");
        type_ext.value_code = Some(resource_type.into());

        Self::new(urls::LAUNCH_CONTEXT)
            .with_extension(name)
            .with_extension(type_ext)
    }

    pub fn is(&self, url: &str) -> bool {
        self.url == url
    }

    /// Name of a `variable` extension, if this is one and it is named.
    pub fn variable_name(&self) -> Option<&str> {
        if !self.is(urls::VARIABLE) {
            return None;
        }
        self.value_expression.as_ref()?.name.as_deref()
    }

    /// The code a launchContext is keyed by: the `valueCoding.code` of its
    /// first nested `name` extension that has one.
    pub fn launch_context_code(&self) -> Option<&str> {
        if !self.is(urls::LAUNCH_CONTEXT) {
            return None;
        }
        self.extension
            .iter()
            .flatten()
            .filter(|ext| ext.url == "name")
            .find_map(|ext| ext.value_coding.as_ref()?.code.as_deref())
    }

    pub fn is_assemble_root_expectation(&self) -> bool {
        self.is(urls::ASSEMBLE_EXPECTATION) && self.value_code.as_deref() == Some(urls::ASSEMBLE_ROOT)
    }
}
