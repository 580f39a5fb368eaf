use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::{Extension, urls};

fn questionnaire_resource_type() -> String {
    "Questionnaire".to_string()
}

/// A FHIR Questionnaire.
///
/// The elements assembly reads or rewrites are typed. Everything else
/// (`status`, `title`, `name`, ...) lives in `other` and is emitted unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    #[serde(default = "questionnaire_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit_rules: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contained: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifier_extension: Option<Vec<Extension>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<QuestionnaireItem>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireItem {
    pub link_id: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_when: Option<Vec<EnableWhen>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<QuestionnaireItem>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One `enableWhen` condition. The `answer[x]` choice stays in `other`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EnableWhen {
    pub question: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Questionnaire {
    pub fn new() -> Self {
        Self {
            resource_type: questionnaire_resource_type(),
            id: None,
            meta: None,
            implicit_rules: None,
            language: None,
            text: None,
            contained: None,
            extension: None,
            modifier_extension: None,
            url: None,
            version: None,
            item: None,
            other: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_item(mut self, item: QuestionnaireItem) -> Self {
        self.item.get_or_insert_with(Vec::new).push(item);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension.get_or_insert_with(Vec::new).push(extension);
        self
    }

    pub fn with_contained(mut self, resource: Value) -> Self {
        self.contained.get_or_insert_with(Vec::new).push(resource);
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.meta
            .get_or_insert_with(Meta::default)
            .profile
            .get_or_insert_with(Vec::new)
            .push(profile.into());
        self
    }

    /// The form body: the first top-level item, provided it has children.
    ///
    /// Sub-questionnaire references are only honoured on the direct children
    /// of this item.
    pub fn form_body(&self) -> Option<&QuestionnaireItem> {
        self.item
            .as_deref()?
            .first()
            .filter(|form| form.item.as_ref().is_some_and(|children| !children.is_empty()))
    }

    pub fn form_body_mut(&mut self) -> Option<&mut QuestionnaireItem> {
        self.item
            .as_deref_mut()?
            .first_mut()
            .filter(|form| form.item.as_ref().is_some_and(|children| !children.is_empty()))
    }

    /// `url|version`, or just `url` when unversioned. `None` without a url.
    pub fn versioned_url(&self) -> Option<String> {
        let url = self.url.as_deref()?;
        Some(match self.version.as_deref() {
            Some(version) => format!("{url}|{version}"),
            None => url.to_string(),
        })
    }

    /// Label used in diagnostics: the id, falling back to the url.
    pub fn label(&self) -> &str {
        self.id
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("(anonymous questionnaire)")
    }
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Questionnaire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Questionnaire({})", self.label())?;
        if let Some(version) = &self.version {
            write!(f, " v{version}")?;
        }
        Ok(())
    }
}

impl QuestionnaireItem {
    pub fn new(link_id: impl Into<String>, item_type: impl Into<String>) -> Self {
        Self {
            link_id: link_id.into(),
            item_type: Some(item_type.into()),
            ..Default::default()
        }
    }

    pub fn with_item(mut self, item: QuestionnaireItem) -> Self {
        self.item.get_or_insert_with(Vec::new).push(item);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extension.get_or_insert_with(Vec::new).push(extension);
        self
    }

    pub fn with_enable_when(mut self, question: impl Into<String>, operator: impl Into<String>) -> Self {
        self.enable_when.get_or_insert_with(Vec::new).push(EnableWhen {
            question: question.into(),
            operator: Some(operator.into()),
            other: Map::new(),
        });
        self
    }

    /// A display placeholder that pulls in the sub-questionnaire at `canonical`.
    pub fn sub_questionnaire_ref(link_id: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self::new(link_id, "display")
            .with_extension(Extension::new(urls::SUB_QUESTIONNAIRE).with_value_canonical(canonical))
    }

    /// The canonical of this item's subQuestionnaire extension, if it has one
    /// with a `valueCanonical`.
    pub fn sub_questionnaire_canonical(&self) -> Option<&str> {
        self.extension
            .iter()
            .flatten()
            .filter(|ext| ext.is(urls::SUB_QUESTIONNAIRE))
            .find_map(|ext| ext.value_canonical.as_deref())
    }

    pub fn children(&self) -> &[QuestionnaireItem] {
        self.item.as_deref().unwrap_or_default()
    }

    /// A copy of this item without its children, for rebuilding a subtree
    /// without cloning it twice.
    pub(crate) fn clone_without_children(&self) -> QuestionnaireItem {
        QuestionnaireItem {
            link_id: self.link_id.clone(),
            item_type: self.item_type.clone(),
            extension: self.extension.clone(),
            enable_when: self.enable_when.clone(),
            item: None,
            other: self.other.clone(),
        }
    }
}
