use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::QuestionnaireFetcher;
use crate::error::{FetchError, Result};
use crate::types::{Bundle, Questionnaire};

/// In-memory Questionnaire repository answering canonical searches.
///
/// Each Questionnaire is indexed by its `url` and, when versioned, by
/// `url&version=version`. A search with no match yields an empty searchset
/// Bundle, like a FHIR server would.
#[derive(Debug)]
pub struct MemoryQuestionnaireSource {
    questionnaires: Arc<RwLock<HashMap<String, Questionnaire>>>,
}

impl MemoryQuestionnaireSource {
    pub fn new() -> Self {
        Self {
            questionnaires: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Loads every `*.json` file in `dir` that holds a Questionnaire with a url.
    /// Other resources are skipped.
    pub async fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let source = Self::new();
        source.load_dir(dir).await?;
        Ok(source)
    }

    pub async fn insert(&self, questionnaire: Questionnaire) {
        let Some(url) = questionnaire.url.clone() else {
            tracing::debug!(questionnaire = %questionnaire, "skipping questionnaire without url");
            return;
        };

        let mut questionnaires = self.questionnaires.write().await;
        if let Some(version) = &questionnaire.version {
            questionnaires.insert(format!("{url}&version={version}"), questionnaire.clone());
        }
        questionnaires.insert(url, questionnaire);
    }

    pub async fn load_dir(&self, dir: impl AsRef<Path>) -> Result<usize> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)?;

        let mut loaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = std::fs::read_to_string(&path)?;
            let value: Value = serde_json::from_str(&content)?;
            if value.get("resourceType").and_then(Value::as_str) != Some("Questionnaire") {
                continue;
            }

            let questionnaire: Questionnaire = serde_json::from_value(value)?;
            if questionnaire.url.is_some() {
                self.insert(questionnaire).await;
                loaded += 1;
            }
        }

        tracing::debug!(dir = %dir.display(), loaded, "loaded questionnaires");
        Ok(loaded)
    }

    pub async fn get(&self, search_url: &str) -> Option<Questionnaire> {
        self.questionnaires.read().await.get(search_url).cloned()
    }

    pub async fn len(&self) -> usize {
        self.questionnaires.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.questionnaires.read().await.is_empty()
    }
}

#[async_trait]
impl QuestionnaireFetcher for MemoryQuestionnaireSource {
    async fn fetch(
        &self,
        canonical_url: &str,
        _request_config: Option<&Value>,
    ) -> std::result::Result<Value, FetchError> {
        let matches = match self.get(canonical_url).await {
            Some(questionnaire) => vec![
                serde_json::to_value(questionnaire)
                    .map_err(|e| FetchError::with_source("cannot encode questionnaire", e))?,
            ],
            None => Vec::new(),
        };

        serde_json::to_value(Bundle::searchset(matches))
            .map_err(|e| FetchError::with_source("cannot encode search bundle", e))
    }
}

impl Default for MemoryQuestionnaireSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryQuestionnaireSource {
    fn clone(&self) -> Self {
        Self {
            questionnaires: Arc::clone(&self.questionnaires),
        }
    }
}
