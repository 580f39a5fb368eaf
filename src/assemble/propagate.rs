use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;

use crate::core::AssembleConfig;
use crate::error::{AssembleError, Result};
use crate::types::{Extension, Questionnaire, QuestionnaireItem, urls};

/// What a sub-questionnaire reference on the form body turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedReference {
    /// The fetch failed with a warning; the placeholder item is dropped.
    Unavailable,
    /// The sub-questionnaire has no items; the placeholder item is kept.
    NoItems,
    /// The placeholder item is replaced by these items.
    Items(Vec<QuestionnaireItem>),
}

/// Everything collected from the sub-questionnaires of one level.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropagatedProperties {
    /// `url|version` of each propagated sub-questionnaire.
    pub urls: Vec<String>,
    /// One entry per referencing form-body child, in document order.
    pub references: Vec<ResolvedReference>,
    pub contained: IndexMap<String, Value>,
    pub root_level_extensions: Vec<Extension>,
    pub item_level_extensions: Vec<Option<Vec<Extension>>>,
}

/// Merges the collected properties into `parent` and marks it assembled.
///
/// A parent without a form body is returned unchanged.
pub fn propagate_properties(
    mut parent: Questionnaire,
    properties: PropagatedProperties,
    config: &AssembleConfig,
) -> Result<Questionnaire> {
    let PropagatedProperties {
        urls: assembled_from,
        references,
        contained,
        root_level_extensions,
        item_level_extensions,
    } = properties;

    let Some(form) = parent.form_body_mut() else {
        return Ok(parent);
    };

    form.item = Some(replace_references(form.children(), references));

    let mut form_extensions = form.extension.take().unwrap_or_default();
    form_extensions.extend(item_level_extensions.into_iter().flatten().flatten());
    check_duplicate_variables(&form_extensions)?;
    form.extension = (!form_extensions.is_empty()).then_some(form_extensions);

    parent.contained = merge_contained(parent.contained.take(), contained);

    let mut extensions = match parent.extension.take() {
        None => root_level_extensions,
        Some(existing) => merge_root_extensions(existing, root_level_extensions),
    };
    extensions.extend(assembled_from.into_iter().map(Extension::assembled_from));
    parent.extension = (!extensions.is_empty()).then_some(extensions);

    parent.version = config
        .missing_version
        .assembled_version(parent.version.as_deref());

    if let Some(profiles) = parent.meta.as_mut().and_then(|meta| meta.profile.as_mut()) {
        profiles.retain(|profile| profile != urls::MODULAR_PROFILE);
    }

    parent.text = None;

    Ok(parent)
}

fn replace_references(
    children: &[QuestionnaireItem],
    references: Vec<ResolvedReference>,
) -> Vec<QuestionnaireItem> {
    let mut references = references.into_iter();
    let mut merged = Vec::with_capacity(children.len());

    for child in children {
        if child.sub_questionnaire_canonical().is_none() {
            merged.push(child.clone());
            continue;
        }

        match references.next() {
            Some(ResolvedReference::Items(items)) => merged.extend(items),
            Some(ResolvedReference::Unavailable) => {}
            Some(ResolvedReference::NoItems) | None => merged.push(child.clone()),
        }
    }

    merged
}

/// Variable names must be unique across the combined form-body extensions.
pub fn check_duplicate_variables(extensions: &[Extension]) -> Result<()> {
    let mut names = HashSet::new();
    for name in extensions.iter().filter_map(Extension::variable_name) {
        if !names.insert(name) {
            return Err(AssembleError::DuplicateVariable {
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

// Parent resources come first and win on id; new ids are appended.
fn merge_contained(
    parent: Option<Vec<Value>>,
    mut propagated: IndexMap<String, Value>,
) -> Option<Vec<Value>> {
    let mut merged = parent.unwrap_or_default();
    for resource in &merged {
        if let Some(id) = resource.get("id").and_then(Value::as_str) {
            propagated.shift_remove(id);
        }
    }
    merged.extend(propagated.into_values());

    (!merged.is_empty()).then_some(merged)
}

fn merge_root_extensions(existing: Vec<Extension>, propagated: Vec<Extension>) -> Vec<Extension> {
    let cqf_library = existing
        .iter()
        .chain(&propagated)
        .find(|extension| extension.is(urls::CQF_LIBRARY))
        .cloned();

    let mut launch_contexts: IndexMap<String, Extension> = IndexMap::new();
    for extension in existing.iter().chain(&propagated) {
        if let Some(code) = extension.launch_context_code() {
            launch_contexts
                .entry(code.to_string())
                .or_insert_with(|| extension.clone());
        }
    }

    let mut merged: Vec<Extension> = existing
        .into_iter()
        .filter(|extension| {
            !(extension.is(urls::CQF_LIBRARY)
                || extension.is(urls::LAUNCH_CONTEXT)
                || extension.is_assemble_root_expectation())
        })
        .collect();
    merged.extend(cqf_library);
    merged.extend(launch_contexts.into_values());
    merged
}
