use octofhir_sdc_assemble::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Root questionnaire whose form body is `root` holding `children`.
#[allow(dead_code)]
pub fn create_root_questionnaire(children: Vec<QuestionnaireItem>) -> Questionnaire {
    let form = children
        .into_iter()
        .fold(QuestionnaireItem::new("root", "group"), |form, child| form.with_item(child));

    Questionnaire::new()
        .with_id("parent-questionnaire")
        .with_url("http://example.com/parent-questionnaire")
        .with_version("0.1.0")
        .with_profile(urls::MODULAR_PROFILE)
        .with_item(form)
}

#[allow(dead_code)]
pub fn create_sub_questionnaire(url: &str, version: &str, items: Vec<QuestionnaireItem>) -> Questionnaire {
    let id = url.rsplit('/').next().unwrap_or(url).to_string();
    items.into_iter().fold(
        Questionnaire::new().with_id(id).with_url(url).with_version(version),
        |questionnaire, item| questionnaire.with_item(item),
    )
}

#[allow(dead_code)]
pub fn create_search_bundle(questionnaire: &Questionnaire) -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "searchset",
        "entry": [{ "resource": serde_json::to_value(questionnaire).unwrap() }]
    })
}

#[allow(dead_code)]
pub fn create_parameters(questionnaire: &Questionnaire) -> Value {
    json!({
        "resourceType": "Parameters",
        "parameter": [{
            "name": "questionnaire",
            "resource": serde_json::to_value(questionnaire).unwrap()
        }]
    })
}

/// What the mock answers for one search url.
#[allow(dead_code)]
#[derive(Clone)]
pub enum MockResponse {
    Body(Value),
    Reject(String),
}

/// Fetcher answering from a fixed table and recording every call.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: HashMap<String, MockResponse>,
    calls: Arc<Mutex<Vec<(String, Option<Value>)>>>,
}

#[allow(dead_code)]
impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `questionnaire` for the search form of `canonical`.
    pub fn with_questionnaire(mut self, canonical: &str, questionnaire: &Questionnaire) -> Self {
        self.responses.insert(
            canonical.replacen('|', "&version=", 1),
            MockResponse::Body(create_search_bundle(questionnaire)),
        );
        self
    }

    pub fn with_body(mut self, canonical: &str, body: Value) -> Self {
        self.responses
            .insert(canonical.replacen('|', "&version=", 1), MockResponse::Body(body));
        self
    }

    pub fn with_rejection(mut self, canonical: &str, message: &str) -> Self {
        self.responses.insert(
            canonical.replacen('|', "&version=", 1),
            MockResponse::Reject(message.to_string()),
        );
        self
    }

    pub fn calls(&self) -> Vec<(String, Option<Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl QuestionnaireFetcher for MockFetcher {
    async fn fetch(
        &self,
        canonical_url: &str,
        request_config: Option<&Value>,
    ) -> std::result::Result<Value, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((canonical_url.to_string(), request_config.cloned()));

        match self.responses.get(canonical_url) {
            Some(MockResponse::Body(body)) => Ok(body.clone()),
            Some(MockResponse::Reject(message)) => Err(FetchError::new(message.clone())),
            None => Ok(json!({ "resourceType": "Bundle", "type": "searchset" })),
        }
    }
}

/// Every linkId in the forest, depth-first.
#[allow(dead_code)]
pub fn collect_link_ids(items: &[QuestionnaireItem], out: &mut Vec<String>) {
    for item in items {
        out.push(item.link_id.clone());
        collect_link_ids(item.children(), out);
    }
}

/// Every `enableWhen.question` in the forest.
#[allow(dead_code)]
pub fn collect_enable_when_questions(items: &[QuestionnaireItem], out: &mut Vec<String>) {
    for item in items {
        out.extend(item.enable_when.iter().flatten().map(|c| c.question.clone()));
        collect_enable_when_questions(item.children(), out);
    }
}
