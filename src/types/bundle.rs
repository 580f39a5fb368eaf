use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

fn bundle_resource_type() -> String {
    "Bundle".to_string()
}

/// A search Bundle as returned by a Questionnaire lookup. Entries stay raw
/// JSON so that a wrongly typed resource can be reported instead of failing
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default = "bundle_resource_type")]
    pub resource_type: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Vec<BundleEntry>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Bundle {
    /// A `searchset` Bundle with one entry per resource.
    pub fn searchset(resources: impl IntoIterator<Item = Value>) -> Self {
        let entry: Vec<BundleEntry> = resources
            .into_iter()
            .map(|resource| BundleEntry {
                resource: Some(resource),
                other: Map::new(),
            })
            .collect();

        let mut other = Map::new();
        other.insert("total".to_string(), json!(entry.len()));

        Self {
            resource_type: bundle_resource_type(),
            bundle_type: Some("searchset".to_string()),
            entry: if entry.is_empty() { None } else { Some(entry) },
            other,
        }
    }

    /// The resource of the first entry, if any.
    pub fn first_resource(&self) -> Option<&Value> {
        self.entry.as_deref()?.first()?.resource.as_ref()
    }
}
