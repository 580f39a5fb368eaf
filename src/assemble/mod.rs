//! Recursive `$assemble` orchestration.
//!
//! Each level extracts the sub-questionnaire canonicals of its form body,
//! fetches them concurrently, assembles every fetched sub-questionnaire in
//! turn (depth-first), validates and extracts their properties, and merges
//! them into the parent. The first fatal error aborts the whole call.

pub mod canonical;
pub mod link_ids;
pub mod properties;
pub mod propagate;

pub use canonical::extract_canonicals;
pub use link_ids::{LinkIdResolver, ResolvedItems, claimed_by_parent, rewrite_enable_when};
pub use properties::{
    PropagatedExtensions, check_matching_language, check_prohibited_attributes,
    get_contained_resources, get_extensions, get_items, get_urls,
};
pub use propagate::{PropagatedProperties, ResolvedReference, propagate_properties};

use futures::future::BoxFuture;
use indexmap::IndexSet;
use serde_json::Value;

use crate::core::AssembleConfig;
use crate::error::Result;
use crate::fetch::{QuestionnaireFetcher, fetch_subquestionnaires};
use crate::types::{AssembleOutput, InputParameters, OperationOutcomeIssue, OutputParameters, Questionnaire};

/// Assembles modular Questionnaires using a caller-supplied fetcher.
///
/// ```no_run
/// use octofhir_sdc_assemble::{InputParameters, MemoryQuestionnaireSource, QuestionnaireAssembler};
/// # async fn example(root: octofhir_sdc_assemble::Questionnaire) {
/// let source = MemoryQuestionnaireSource::from_dir("questionnaires").await.unwrap();
/// let assembler = QuestionnaireAssembler::new(source);
/// let output = assembler
///     .assemble(InputParameters::from_questionnaire(root), None)
///     .await;
/// println!("{}", output.resource_type());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct QuestionnaireAssembler<F> {
    fetcher: F,
    config: AssembleConfig,
}

impl<F: QuestionnaireFetcher> QuestionnaireAssembler<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            config: AssembleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AssembleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AssembleConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Runs `$assemble`. `request_config` is handed to every fetch unchanged.
    pub async fn assemble(&self, input: InputParameters, request_config: Option<&Value>) -> AssembleOutput {
        assemble_with_config(input, &self.fetcher, request_config, &self.config).await
    }

    /// Like [`assemble`](Self::assemble), starting from raw JSON: a
    /// Parameters resource or a bare Questionnaire.
    pub async fn assemble_value(&self, input: Value, request_config: Option<&Value>) -> AssembleOutput {
        match InputParameters::from_value(input) {
            Ok(input) => self.assemble(input, request_config).await,
            Err(error) => AssembleOutput::OperationOutcome(error.into_outcome()),
        }
    }
}

/// Runs `$assemble` with the default configuration.
pub async fn assemble<F>(input: InputParameters, fetcher: &F, request_config: Option<&Value>) -> AssembleOutput
where
    F: QuestionnaireFetcher + ?Sized,
{
    assemble_with_config(input, fetcher, request_config, &AssembleConfig::default()).await
}

pub async fn assemble_with_config<F>(
    input: InputParameters,
    fetcher: &F,
    request_config: Option<&Value>,
    config: &AssembleConfig,
) -> AssembleOutput
where
    F: QuestionnaireFetcher + ?Sized,
{
    let root = input.questionnaire;
    let root_label = root.label().to_string();
    let mut session = AssemblySession {
        fetcher,
        request_config,
        config,
        visited: IndexSet::new(),
        warnings: Vec::new(),
    };

    match session.assemble_level(root, true).await {
        Ok(questionnaire) => {
            tracing::info!(
                questionnaire = %root_label,
                canonicals = session.visited.len(),
                warnings = session.warnings.len(),
                "assembly completed"
            );
            if session.warnings.is_empty() {
                AssembleOutput::Questionnaire(questionnaire)
            } else {
                AssembleOutput::Parameters(OutputParameters::new(questionnaire, session.warnings))
            }
        }
        Err(error) => {
            tracing::info!(questionnaire = %root_label, error = %error, "assembly failed");
            AssembleOutput::OperationOutcome(error.into_outcome())
        }
    }
}

/// State threaded through one `$assemble` call.
struct AssemblySession<'a, F: ?Sized> {
    fetcher: &'a F,
    request_config: Option<&'a Value>,
    config: &'a AssembleConfig,
    /// Every canonical seen so far, across all branches.
    visited: IndexSet<String>,
    warnings: Vec<OperationOutcomeIssue>,
}

impl<'a, F> AssemblySession<'a, F>
where
    F: QuestionnaireFetcher + ?Sized,
{
    fn assemble_level<'s>(&'s mut self, questionnaire: Questionnaire, is_root: bool) -> BoxFuture<'s, Result<Questionnaire>> {
        Box::pin(async move {
            // Only the root must be modular; a nested leaf is used as is.
            if !is_root && questionnaire.form_body().is_none() {
                return Ok(questionnaire);
            }

            let canonicals = extract_canonicals(&questionnaire, &self.visited)?;
            tracing::debug!(
                questionnaire = %questionnaire.label(),
                canonicals = ?canonicals,
                "assembling level"
            );
            if canonicals.is_empty() {
                return Ok(questionnaire);
            }
            self.visited.extend(canonicals.iter().cloned());

            let batch = fetch_subquestionnaires(&canonicals, self.fetcher, self.request_config).await?;
            self.warnings.extend(batch.warnings);
            // assembledFrom names the sources as fetched.
            let urls = get_urls(batch.slots.iter().flatten());

            let mut fetched = Vec::with_capacity(batch.slots.len());
            for slot in batch.slots {
                match slot {
                    Some(sub) => fetched.push(Some(self.assemble_level(sub, false).await?)),
                    None => fetched.push(None),
                }
            }

            let available: Vec<bool> = fetched.iter().map(Option::is_some).collect();
            // A reference to a sub-questionnaire without items keeps its placeholder.
            let kept_placeholders: Vec<bool> = fetched
                .iter()
                .map(|slot| slot.as_ref().is_some_and(|sub| sub.item.is_none()))
                .collect();
            let subquestionnaires: Vec<Questionnaire> = fetched.into_iter().flatten().collect();

            check_prohibited_attributes(&subquestionnaires)?;
            check_matching_language(&subquestionnaires, &questionnaire)?;

            let contained = get_contained_resources(&subquestionnaires);
            let extensions = get_extensions(&subquestionnaires)?;
            let mut resolver = LinkIdResolver::new(self.config.link_id_prefix.clone())
                .with_claimed(claimed_by_parent(&questionnaire, &kept_placeholders));
            let mut items = get_items(&subquestionnaires, &mut resolver).into_iter();

            let references = available
                .into_iter()
                .map(|available| {
                    if !available {
                        return ResolvedReference::Unavailable;
                    }
                    match items.next() {
                        Some(Some(items)) => ResolvedReference::Items(items),
                        _ => ResolvedReference::NoItems,
                    }
                })
                .collect();

            propagate_properties(
                questionnaire,
                PropagatedProperties {
                    urls,
                    references,
                    contained,
                    root_level_extensions: extensions.root_level,
                    item_level_extensions: extensions.item_level,
                },
                self.config,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::types::QuestionnaireItem;
    use serde_json::json;

    fn root(children: Vec<QuestionnaireItem>) -> Questionnaire {
        let form = children
            .into_iter()
            .fold(QuestionnaireItem::new("root", "group"), |form, child| form.with_item(child));
        Questionnaire::new()
            .with_id("root-questionnaire")
            .with_url("http://x/root")
            .with_version("1.0.0")
            .with_item(form)
    }

    fn searchset(questionnaire: &Questionnaire) -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "searchset",
            "entry": [{ "resource": serde_json::to_value(questionnaire).unwrap() }]
        })
    }

    #[tokio::test]
    async fn questionnaire_without_references_is_returned_unchanged() {
        let input = root(vec![QuestionnaireItem::new("q", "string")]);
        let fetcher = |_url: String, _config: Option<Value>| async move {
            Err::<Value, _>(FetchError::new("must not be called"))
        };

        let output = assemble(InputParameters::from_questionnaire(input.clone()), &fetcher, None).await;
        assert_eq!(output, AssembleOutput::Questionnaire(input));
    }

    #[tokio::test]
    async fn invalid_root_structure_is_fatal() {
        let fetcher = |_url: String, _config: Option<Value>| async move { Ok::<_, FetchError>(json!({})) };
        let output = assemble(InputParameters::from_questionnaire(Questionnaire::new()), &fetcher, None).await;

        let outcome = output.outcome().unwrap();
        assert!(output.is_error());
        assert_eq!(outcome.issue[0].text(), Some("Root questionnaire does not have a valid item."));
    }

    #[tokio::test]
    async fn nested_sub_questionnaires_resolve_bottom_up() {
        let leaf = Questionnaire::new()
            .with_url("http://x/B")
            .with_version("1")
            .with_item(QuestionnaireItem::new("leaf-question", "string"));
        let middle = Questionnaire::new()
            .with_url("http://x/A")
            .with_version("1")
            .with_item(
                QuestionnaireItem::new("middle", "group")
                    .with_item(QuestionnaireItem::sub_questionnaire_ref("ref-b", "http://x/B|1")),
            );

        let leaf_body = searchset(&leaf);
        let middle_body = searchset(&middle);
        let fetcher = move |url: String, _config: Option<Value>| {
            let body = if url.starts_with("http://x/A") {
                middle_body.clone()
            } else {
                leaf_body.clone()
            };
            async move { Ok::<_, FetchError>(body) }
        };

        let input = root(vec![QuestionnaireItem::sub_questionnaire_ref("ref-a", "http://x/A|1")]);
        let output = assemble(InputParameters::from_questionnaire(input), &fetcher, None).await;

        let assembled = output.questionnaire().unwrap();
        let middle_item = &assembled.form_body().unwrap().children()[0];
        assert_eq!(middle_item.link_id, "middle");
        assert_eq!(middle_item.children()[0].link_id, "leaf-question");

        let assembled_from: Vec<_> = assembled
            .extension
            .iter()
            .flatten()
            .filter(|e| e.is(crate::types::urls::ASSEMBLED_FROM))
            .filter_map(|e| e.value_canonical.as_deref())
            .collect();
        assert_eq!(assembled_from, vec!["http://x/A|1"]);
    }

    #[tokio::test]
    async fn reference_back_to_an_ancestor_is_circular() {
        let looping = Questionnaire::new()
            .with_id("looping")
            .with_url("http://x/A")
            .with_version("1")
            .with_item(
                QuestionnaireItem::new("middle", "group")
                    .with_item(QuestionnaireItem::sub_questionnaire_ref("ref-a", "http://x/A|1")),
            );
        let body = searchset(&looping);
        let fetcher = move |_url: String, _config: Option<Value>| {
            let body = body.clone();
            async move { Ok::<_, FetchError>(body) }
        };

        let input = root(vec![QuestionnaireItem::sub_questionnaire_ref("ref", "http://x/A|1")]);
        let output = assemble(InputParameters::from_questionnaire(input), &fetcher, None).await;

        assert!(output.is_error());
        assert_eq!(
            output.outcome().unwrap().issue[0].text(),
            Some("looping contains a circular dependency on the questionnaire http://x/A|1")
        );
    }

    #[tokio::test]
    async fn configured_prefix_is_used_for_renames() {
        let sub = Questionnaire::new()
            .with_url("http://x/A")
            .with_item(QuestionnaireItem::new("kept", "string"));
        let body = searchset(&sub);
        let fetcher = move |_url: String, _config: Option<Value>| {
            let body = body.clone();
            async move { Ok::<_, FetchError>(body) }
        };

        let assembler = QuestionnaireAssembler::new(fetcher)
            .with_config(AssembleConfig::default().with_link_id_prefix("dup"));
        let input = root(vec![
            QuestionnaireItem::new("kept", "string"),
            QuestionnaireItem::sub_questionnaire_ref("ref", "http://x/A"),
        ]);
        let output = assembler.assemble(InputParameters::from_questionnaire(input), None).await;

        let form = output.questionnaire().unwrap().form_body().unwrap().clone();
        let ids: Vec<_> = form.children().iter().map(|c| c.link_id.as_str()).collect();
        assert_eq!(ids, vec!["kept", "dup-kept"]);
    }
}
