//! Checks and extractors run over the fully assembled sub-questionnaires of
//! one level before they are merged into their parent.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;

use super::link_ids::LinkIdResolver;
use crate::error::{AssembleError, ProhibitedAttribute, Result};
use crate::types::{Extension, Questionnaire, QuestionnaireItem, urls};

/// Extensions lifted out of the sub-questionnaires.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropagatedExtensions {
    /// Destined for the assembled Questionnaire itself: at most one
    /// `cqf-library`, then launch contexts unique by code.
    pub root_level: Vec<Extension>,
    /// Destined for the form body, one slot per sub-questionnaire. `None`
    /// when that sub-questionnaire has no extensions at all.
    pub item_level: Vec<Option<Vec<Extension>>>,
}

fn display_url(questionnaire: &Questionnaire) -> String {
    questionnaire
        .url
        .clone()
        .unwrap_or_else(|| questionnaire.label().to_string())
}

pub fn check_prohibited_attributes(subquestionnaires: &[Questionnaire]) -> Result<()> {
    for sub in subquestionnaires {
        let attribute = if sub.implicit_rules.is_some() {
            ProhibitedAttribute::ImplicitRules
        } else if sub.modifier_extension.is_some() {
            ProhibitedAttribute::ModifierExtension
        } else {
            continue;
        };

        return Err(AssembleError::ProhibitedAttribute {
            url: display_url(sub),
            attribute,
        });
    }
    Ok(())
}

/// A sub-questionnaire with a `language` requires its parent to declare the
/// same one.
pub fn check_matching_language(subquestionnaires: &[Questionnaire], parent: &Questionnaire) -> Result<()> {
    for sub in subquestionnaires {
        let Some(language) = sub.language.as_deref() else {
            continue;
        };

        match parent.language.as_deref() {
            None => {
                return Err(AssembleError::MissingParentLanguage {
                    url: display_url(sub),
                    parent_url: display_url(parent),
                });
            }
            Some(parent_language) if parent_language != language => {
                return Err(AssembleError::LanguageMismatch {
                    url: display_url(sub),
                    parent_url: display_url(parent),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Contained resources keyed by id. The first occurrence of an id wins;
/// resources without an id are dropped.
pub fn get_contained_resources(subquestionnaires: &[Questionnaire]) -> IndexMap<String, Value> {
    let mut contained = IndexMap::new();
    for resource in subquestionnaires
        .iter()
        .flat_map(|sub| sub.contained.iter().flatten())
    {
        if let Some(id) = resource.get("id").and_then(Value::as_str) {
            contained
                .entry(id.to_string())
                .or_insert_with(|| resource.clone());
        }
    }
    contained
}

/// Buckets each sub-questionnaire's own extensions into root-level and
/// item-level ones. Extensions of any other kind are not propagated.
pub fn get_extensions(subquestionnaires: &[Questionnaire]) -> Result<PropagatedExtensions> {
    let mut cqf_library: Option<&Extension> = None;
    let mut launch_contexts: IndexMap<&str, &Extension> = IndexMap::new();
    let mut variable_names: HashSet<&str> = HashSet::new();
    let mut item_level = Vec::with_capacity(subquestionnaires.len());

    for sub in subquestionnaires {
        let Some(extensions) = sub.extension.as_ref() else {
            item_level.push(None);
            continue;
        };

        let mut constraints = Vec::new();
        let mut variables = Vec::new();
        let mut population_context: Option<&Extension> = None;
        let mut extraction_context: Option<&Extension> = None;

        for extension in extensions {
            match extension.url.as_str() {
                urls::CQF_LIBRARY => {
                    cqf_library.get_or_insert(extension);
                }
                urls::LAUNCH_CONTEXT => {
                    if let Some(code) = extension.launch_context_code() {
                        launch_contexts.insert(code, extension);
                    }
                }
                urls::QUESTIONNAIRE_CONSTRAINT => constraints.push(extension.clone()),
                urls::VARIABLE => {
                    let Some(name) = extension.variable_name() else {
                        continue;
                    };
                    if !variable_names.insert(name) {
                        return Err(AssembleError::DuplicateVariable {
                            name: name.to_string(),
                        });
                    }
                    variables.push(extension.clone());
                }
                urls::ITEM_POPULATION_CONTEXT => {
                    single_context(&mut population_context, extension, sub, "itemPopulationContext")?;
                }
                urls::ITEM_EXTRACTION_CONTEXT => {
                    single_context(&mut extraction_context, extension, sub, "itemExtractionContext")?;
                }
                _ => {}
            }
        }

        let mut collected = constraints;
        collected.extend(variables);
        collected.extend(population_context.cloned());
        collected.extend(extraction_context.cloned());
        item_level.push(Some(collected));
    }

    let mut root_level: Vec<Extension> = cqf_library.into_iter().cloned().collect();
    root_level.extend(launch_contexts.into_values().cloned());

    Ok(PropagatedExtensions {
        root_level,
        item_level,
    })
}

fn single_context<'a>(
    slot: &mut Option<&'a Extension>,
    extension: &'a Extension,
    sub: &Questionnaire,
    context: &'static str,
) -> Result<()> {
    if slot.is_some() {
        return Err(AssembleError::MultipleContexts {
            url: display_url(sub),
            context,
        });
    }
    *slot = Some(extension);
    Ok(())
}

/// Each sub-questionnaire's top-level items with linkIds made unique across
/// the batch, or `None` when it has no items.
pub fn get_items(
    subquestionnaires: &[Questionnaire],
    resolver: &mut LinkIdResolver,
) -> Vec<Option<Vec<QuestionnaireItem>>> {
    subquestionnaires
        .iter()
        .map(|sub| {
            sub.item
                .as_deref()
                .map(|items| resolver.resolve(items).items)
        })
        .collect()
}

/// `url|version` of every sub-questionnaire that has a url.
pub fn get_urls<'a>(subquestionnaires: impl IntoIterator<Item = &'a Questionnaire>) -> Vec<String> {
    subquestionnaires
        .into_iter()
        .filter_map(Questionnaire::versioned_url)
        .collect()
}
