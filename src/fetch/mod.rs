//! Sub-questionnaire retrieval.
//!
//! A [`QuestionnaireFetcher`] answers one canonical lookup with the raw
//! response body. [`fetch_subquestionnaires`] issues every lookup of one
//! assembly level concurrently and normalizes the responses.

pub mod memory;

pub use memory::MemoryQuestionnaireSource;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::future::Future;

use crate::error::{AssembleError, FetchError, Result};
use crate::types::{Bundle, OperationOutcome, OperationOutcomeIssue, Questionnaire, issue_code};

/// Looks up a Questionnaire by canonical url.
///
/// `canonical_url` arrives already rewritten to the search form
/// (`url&version=v`). `request_config` is whatever the caller handed to
/// `assemble`, passed through untouched.
///
/// `Ok` carries the response body: a search Bundle, an OperationOutcome, or
/// either of them wrapped in a `{ "data": ... }` envelope. `Err` means the
/// lookup itself failed; assembly continues without that sub-questionnaire.
#[async_trait]
pub trait QuestionnaireFetcher: Send + Sync {
    async fn fetch(
        &self,
        canonical_url: &str,
        request_config: Option<&Value>,
    ) -> std::result::Result<Value, FetchError>;
}

#[async_trait]
impl<F, Fut> QuestionnaireFetcher for F
where
    F: Fn(String, Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<Value, FetchError>> + Send + 'static,
{
    async fn fetch(
        &self,
        canonical_url: &str,
        request_config: Option<&Value>,
    ) -> std::result::Result<Value, FetchError> {
        (self)(canonical_url.to_string(), request_config.cloned()).await
    }
}

/// Outcome of one fetch batch.
///
/// `slots` lines up with the requested canonicals; a slot is `None` when the
/// lookup failed and a warning was recorded for it instead.
#[derive(Debug, Default)]
pub struct FetchedBatch {
    pub slots: Vec<Option<Questionnaire>>,
    pub warnings: Vec<OperationOutcomeIssue>,
}

impl FetchedBatch {
    /// The successfully fetched sub-questionnaires, in request order.
    pub fn questionnaires(&self) -> impl Iterator<Item = &Questionnaire> {
        self.slots.iter().flatten()
    }
}

/// Rewrites `url|version` into the search form `url&version=version`.
pub fn search_url(canonical: &str) -> String {
    canonical.replacen('|', "&version=", 1)
}

/// Fetches every canonical concurrently.
///
/// Fails on the first (in request order) response that is an
/// OperationOutcome or that does not contain a Questionnaire.
pub async fn fetch_subquestionnaires<F>(
    canonicals: &[String],
    fetcher: &F,
    request_config: Option<&Value>,
) -> Result<FetchedBatch>
where
    F: QuestionnaireFetcher + ?Sized,
{
    let lookups: Vec<String> = canonicals.iter().map(|c| search_url(c)).collect();
    let responses = join_all(
        lookups
            .iter()
            .map(|url| fetcher.fetch(url.as_str(), request_config)),
    )
    .await;

    let mut batch = FetchedBatch::default();
    for (canonical, response) in canonicals.iter().zip(responses) {
        match response {
            Ok(body) => {
                let questionnaire = normalize_response(canonical, body)?;
                batch.slots.push(Some(questionnaire));
            }
            Err(error) => {
                tracing::warn!(canonical = %canonical, error = %error, "sub-questionnaire fetch failed");
                batch
                    .warnings
                    .push(OperationOutcomeIssue::warning(issue_code::NOT_FOUND, error.message));
                batch.slots.push(None);
            }
        }
    }

    Ok(batch)
}

/// Turns one response body into the Questionnaire it carries.
pub fn normalize_response(canonical: &str, response: Value) -> Result<Questionnaire> {
    let response = unwrap_envelope(response);
    let not_found = || AssembleError::NotFound {
        canonical: canonical.to_string(),
    };

    match response.get("resourceType").and_then(Value::as_str) {
        Some("OperationOutcome") => {
            let outcome: OperationOutcome = serde_json::from_value(response)?;
            Err(AssembleError::RemoteOutcome(outcome))
        }
        Some("Bundle") => {
            let bundle: Bundle = serde_json::from_value(response).map_err(|_| not_found())?;
            let resource = bundle
                .first_resource()
                .filter(|r| r.get("resourceType").and_then(Value::as_str) == Some("Questionnaire"))
                .cloned()
                .ok_or_else(not_found)?;

            serde_json::from_value(resource).map_err(|source| AssembleError::MalformedQuestionnaire {
                canonical: canonical.to_string(),
                source,
            })
        }
        _ => Err(not_found()),
    }
}

fn unwrap_envelope(response: Value) -> Value {
    match response {
        Value::Object(mut map) if !map.contains_key("resourceType") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn bundle_of(resource: Value) -> Value {
        json!({ "resourceType": "Bundle", "type": "searchset", "entry": [{ "resource": resource }] })
    }

    fn questionnaire(id: &str) -> Value {
        json!({ "resourceType": "Questionnaire", "id": id, "status": "draft" })
    }

    #[test]
    fn search_url_rewrites_only_the_first_separator() {
        assert_eq!(search_url("http://x/A|1.0.0"), "http://x/A&version=1.0.0");
        assert_eq!(search_url("http://x/A"), "http://x/A");
    }

    #[test]
    fn data_envelope_is_unwrapped() {
        let wrapped = json!({ "data": bundle_of(questionnaire("q1")), "status": 200 });
        let q = normalize_response("http://x/A|1", wrapped).unwrap();
        assert_eq!(q.id.as_deref(), Some("q1"));

        let outcome = json!({
            "data": { "resourceType": "OperationOutcome", "issue": [] },
            "status": 404
        });
        assert!(matches!(
            normalize_response("http://x/A|1", outcome),
            Err(AssembleError::RemoteOutcome(_))
        ));
    }

    #[test]
    fn bundle_without_a_questionnaire_is_not_found() {
        let empty = json!({ "resourceType": "Bundle", "type": "searchset" });
        let error = normalize_response("http://example.com/questionnaire1|1.0.0", empty).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unable to fetch questionnaire with canonical url 'http://example.com/questionnaire1|1.0.0'"
        );
        assert_eq!(error.issue_code(), "not-found");

        let patient = bundle_of(json!({ "resourceType": "Patient", "id": "patient1" }));
        assert!(matches!(
            normalize_response("http://x/A", patient),
            Err(AssembleError::NotFound { .. })
        ));

        let questionnaire_directly = questionnaire("q");
        assert!(matches!(
            normalize_response("http://x/A", questionnaire_directly),
            Err(AssembleError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn fetches_pass_rewritten_urls_and_request_config() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let fetcher = move |url: String, config: Option<Value>| {
            let recorder = Arc::clone(&recorder);
            async move {
                recorder.lock().unwrap().push((url.clone(), config));
                Ok::<_, FetchError>(bundle_of(questionnaire(&url)))
            }
        };

        let canonicals = vec![
            "http://example.com/questionnaire1|1.0.0".to_string(),
            "http://example.com/questionnaire2|2.0.0".to_string(),
        ];
        let config = json!({ "headers": { "Authorization": "Bearer token" } });
        let batch = fetch_subquestionnaires(&canonicals, &fetcher, Some(&config))
            .await
            .unwrap();

        let ids: Vec<_> = batch.questionnaires().filter_map(|q| q.id.clone()).collect();
        assert_eq!(
            ids,
            vec![
                "http://example.com/questionnaire1&version=1.0.0",
                "http://example.com/questionnaire2&version=2.0.0"
            ]
        );
        assert!(batch.warnings.is_empty());

        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|(_, c)| c.as_ref() == Some(&config)));
    }

    #[tokio::test]
    async fn rejected_fetch_becomes_a_warning_slot() {
        let fetcher = |url: String, _config: Option<Value>| async move {
            if url.contains("questionnaire2") {
                Err(FetchError::new("Failed to fetch"))
            } else {
                Ok(bundle_of(questionnaire("q1")))
            }
        };

        let canonicals = vec![
            "http://example.com/questionnaire1|1.0.0".to_string(),
            "http://example.com/questionnaire2|2.0.0".to_string(),
        ];
        let batch = fetch_subquestionnaires(&canonicals, &fetcher, None).await.unwrap();

        assert_eq!(batch.slots.len(), 2);
        assert!(batch.slots[0].is_some());
        assert!(batch.slots[1].is_none());
        assert_eq!(batch.warnings.len(), 1);
        assert_eq!(batch.warnings[0].code, "not-found");
        assert_eq!(batch.warnings[0].text(), Some("Failed to fetch"));
    }

    #[tokio::test]
    async fn operation_outcome_fails_the_batch() {
        let remote = json!({
            "resourceType": "OperationOutcome",
            "issue": [{ "severity": "error", "code": "not-found", "details": { "text": "Questionnaire not found" } }]
        });
        let body = remote.clone();
        let fetcher = move |_url: String, _config: Option<Value>| {
            let body = body.clone();
            async move { Ok::<_, FetchError>(body) }
        };

        let error = fetch_subquestionnaires(&["http://x/A|1".to_string()], &fetcher, None)
            .await
            .unwrap_err();
        let outcome = error.into_outcome();
        assert_eq!(serde_json::to_value(outcome).unwrap(), remote);
    }
}
