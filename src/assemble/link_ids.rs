//! Duplicate linkId resolution for one merge batch.
//!
//! Items are never modified in place: resolving borrows the incoming forest
//! and returns a renamed copy together with the rename map, which is then
//! used to rewrite `enableWhen.question` references.

use std::collections::{HashMap, HashSet};

use crate::types::{Questionnaire, QuestionnaireItem};

/// Items of one sub-questionnaire after linkId resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedItems {
    pub items: Vec<QuestionnaireItem>,
    /// Original linkId to its replacement.
    pub renamed: HashMap<String, String>,
}

/// Renames colliding linkIds against the set of ids already claimed in the
/// current merge batch. The claimed set grows as forests are resolved.
#[derive(Debug, Clone)]
pub struct LinkIdResolver {
    prefix: String,
    claimed: HashSet<String>,
}

impl LinkIdResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            claimed: HashSet::new(),
        }
    }

    pub fn with_claimed(mut self, claimed: impl IntoIterator<Item = String>) -> Self {
        self.claimed.extend(claimed);
        self
    }

    pub fn is_claimed(&self, link_id: &str) -> bool {
        self.claimed.contains(link_id)
    }

    /// Resolves one sub-questionnaire's item forest, then rewrites its
    /// `enableWhen` references to any renamed item.
    pub fn resolve(&mut self, items: &[QuestionnaireItem]) -> ResolvedItems {
        let mut renamed = HashMap::new();
        let items: Vec<QuestionnaireItem> = items
            .iter()
            .map(|item| self.rename_item(item, &mut renamed))
            .collect();

        if renamed.is_empty() {
            return ResolvedItems { items, renamed };
        }

        ResolvedItems {
            items: rewrite_enable_when(&items, &renamed),
            renamed,
        }
    }

    // Post-order: children claim their ids before the parent is checked.
    fn rename_item(
        &mut self,
        item: &QuestionnaireItem,
        renamed: &mut HashMap<String, String>,
    ) -> QuestionnaireItem {
        let children = item.item.as_ref().map(|children| {
            children
                .iter()
                .map(|child| self.rename_item(child, renamed))
                .collect()
        });

        let link_id = if self.claimed.contains(&item.link_id) {
            let unique = self.unique_link_id(&item.link_id);
            tracing::debug!(from = %item.link_id, to = %unique, "renamed duplicate linkId");
            renamed.insert(item.link_id.clone(), unique.clone());
            unique
        } else {
            item.link_id.clone()
        };
        self.claimed.insert(link_id.clone());

        QuestionnaireItem {
            link_id,
            item: children,
            ..item.clone_without_children()
        }
    }

    fn unique_link_id(&self, link_id: &str) -> String {
        let mut candidate = format!("{}-{link_id}", self.prefix);
        let mut count = 0;
        while self.claimed.contains(&candidate) {
            count += 1;
            candidate = format!("{}-{count}-{link_id}", self.prefix);
        }
        candidate
    }
}

/// Points every `enableWhen.question` that names a renamed linkId at its
/// replacement, anywhere in the forest.
pub fn rewrite_enable_when(
    items: &[QuestionnaireItem],
    renamed: &HashMap<String, String>,
) -> Vec<QuestionnaireItem> {
    items
        .iter()
        .map(|item| {
            let children = item
                .item
                .as_ref()
                .map(|children| rewrite_enable_when(children, renamed));

            let enable_when = item.enable_when.as_ref().map(|conditions| {
                conditions
                    .iter()
                    .map(|condition| {
                        let mut condition = condition.clone();
                        if let Some(replacement) = renamed.get(&condition.question) {
                            condition.question = replacement.clone();
                        }
                        condition
                    })
                    .collect()
            });

            QuestionnaireItem {
                enable_when,
                item: children,
                ..item.clone_without_children()
            }
        })
        .collect()
}

/// The linkIds a parent keeps after merging: its top-level items and every
/// descendant, except the form-body references that sub-questionnaire content
/// replaces or that are dropped.
///
/// `kept_placeholders[n]` tells whether the n-th referencing child of the form
/// body stays in the merged form. A reference past the end of the slice stays.
pub fn claimed_by_parent(parent: &Questionnaire, kept_placeholders: &[bool]) -> HashSet<String> {
    let mut claimed = HashSet::new();
    for (index, item) in parent.item.iter().flatten().enumerate() {
        claimed.insert(item.link_id.clone());
        let mut reference = 0;
        for child in item.children() {
            if index == 0 && child.sub_questionnaire_canonical().is_some() {
                let kept = kept_placeholders.get(reference).copied().unwrap_or(true);
                reference += 1;
                if !kept {
                    continue;
                }
            }
            collect_link_ids(child, &mut claimed);
        }
    }
    claimed
}

fn collect_link_ids(item: &QuestionnaireItem, claimed: &mut HashSet<String>) {
    claimed.insert(item.link_id.clone());
    for child in item.children() {
        collect_link_ids(child, claimed);
    }
}
