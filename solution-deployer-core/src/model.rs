//! # model: templates, precis summaries and the deployment dictionary
//!
//! Plain serde data shared by every pipeline in the crate.
//!
//! - [`ItemTemplate`]: a portable capture of one platform item.
//! - [`SolutionItemPrecis`] / [`SolutionPrecis`]: lightweight summaries used by
//!   the deletion pipeline.
//! - [`TemplateDictionary`]: scratch facts for one deployment run, read when
//!   resolving `{{...}}` placeholders.
//! - [`ItemProgressStatus`]: the per-item outcome reported to progress channels.
//!
//! Templates serialize with camelCase keys so they round-trip the platform's
//! Solution item JSON unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::templatization::get_prop;

/// A serializable record describing one platform item as it existed at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTemplate {
    /// Source id of the item; after deployment, the id in the destination.
    pub item_id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub key: String,
    /// Item metadata (title, snippet, typeKeywords, properties, ...).
    #[serde(default)]
    pub item: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub resources: Vec<String>,
    /// Ids of other templates this one references.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub properties: Value,
    #[serde(default)]
    pub estimated_deployment_cost_factor: f64,
}

impl ItemTemplate {
    /// An empty template for an item id and type.
    pub fn skeleton(item_id: impl Into<String>, item_type: impl Into<String>) -> Self {
        let item_id = item_id.into();
        let item_type = item_type.into();
        let key = format!("{}_{}", item_type.to_lowercase().replace(' ', "_"), item_id);
        ItemTemplate {
            item: serde_json::json!({ "id": item_id, "type": item_type }),
            item_id,
            item_type,
            key,
            data: Value::Null,
            resources: Vec::new(),
            dependencies: Vec::new(),
            groups: Vec::new(),
            properties: Value::Object(Map::new()),
            estimated_deployment_cost_factor: 3.0,
        }
    }

    pub fn type_keywords(&self) -> Vec<&str> {
        self.item
            .get("typeKeywords")
            .and_then(Value::as_array)
            .map(|keywords| keywords.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_type_keyword(&self, keyword: &str) -> bool {
        self.type_keywords().contains(&keyword)
    }

    pub fn title(&self) -> &str {
        self.item
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Adds a dependency unless it is already listed or names this template.
    pub fn add_dependency(&mut self, id: &str) {
        if id != self.item_id && !self.dependencies.iter().any(|d| d == id) {
            self.dependencies.push(id.to_string());
        }
    }
}

/// Summary of one item belonging to a deployed Solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionItemPrecis {
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub title: String,
    pub modified: i64,
    pub owner: String,
}

/// Summary of a deployed Solution: its items in build order and its groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolutionPrecis {
    pub id: String,
    pub title: String,
    pub folder: String,
    pub items: Vec<SolutionItemPrecis>,
    pub groups: Vec<String>,
}

impl SolutionPrecis {
    /// A precis for the same Solution with no items and no groups.
    pub fn empty_like(&self) -> Self {
        SolutionPrecis {
            id: self.id.clone(),
            title: self.title.clone(),
            folder: self.folder.clone(),
            items: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.groups.is_empty()
    }
}

/// Outcome/phase of one item as reported to progress channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ItemProgressStatus {
    #[default]
    Started,
    Active,
    Created,
    Cancelled,
    Finished,
    Failed,
    Ignored,
}

impl ItemProgressStatus {
    /// Console label: phase ordinal followed by the status name.
    pub fn label(&self) -> &'static str {
        match self {
            ItemProgressStatus::Started => "1 Started",
            ItemProgressStatus::Active => "2 Active",
            ItemProgressStatus::Created => "2 Created",
            ItemProgressStatus::Cancelled => "3 Cancelled",
            ItemProgressStatus::Finished => "3 Finished",
            ItemProgressStatus::Failed => "3 Failed",
            ItemProgressStatus::Ignored => "3 Ignored",
        }
    }
}

/// Facts collected during one deployment, keyed by template id.
///
/// Entries look like `{"<tplId>": {"itemId": "...", "url": "...", "layer0": {"url": "..."}}}`
/// next to top-level facts such as `folderId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateDictionary {
    values: Value,
}

impl Default for TemplateDictionary {
    fn default() -> Self {
        TemplateDictionary {
            values: Value::Object(Map::new()),
        }
    }
}

impl TemplateDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON object; any other JSON value yields an empty dictionary.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => TemplateDictionary { values: value },
            _ => Self::default(),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.values
    }

    /// Looks up a dotted path such as `abc123.layer0.url`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_prop(&self.values, path)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        if let Value::Object(map) = &mut self.values {
            map.insert(key.into(), value);
        }
    }

    pub fn folder_id(&self) -> Option<&str> {
        self.get_str("folderId").filter(|id| !id.is_empty())
    }

    pub fn set_folder_id(&mut self, folder_id: &str) {
        self.insert("folderId", Value::String(folder_id.to_string()));
    }

    /// Records the item created for a template.
    pub fn record_item(&mut self, template_id: &str, item_id: &str, url: Option<&str>) {
        let mut entry = self.entry_object(template_id);
        entry.insert("itemId".to_string(), Value::String(item_id.to_string()));
        if let Some(url) = url {
            entry.insert("url".to_string(), Value::String(url.to_string()));
        }
        self.insert(template_id, Value::Object(entry));
    }

    /// Records the url of one layer of a created service.
    pub fn record_layer_url(&mut self, template_id: &str, layer_id: u32, url: &str) {
        let mut entry = self.entry_object(template_id);
        entry.insert(
            format!("layer{layer_id}"),
            serde_json::json!({ "url": url }),
        );
        self.insert(template_id, Value::Object(entry));
    }

    /// Deployed id recorded for a template, if any.
    pub fn item_id_for(&self, template_id: &str) -> Option<&str> {
        self.values
            .get(template_id)
            .and_then(|entry| entry.get("itemId"))
            .and_then(Value::as_str)
    }

    /// Template id whose recorded deployed id is `item_id`.
    pub fn template_id_for(&self, item_id: &str) -> Option<&str> {
        self.values.as_object().and_then(|map| {
            map.iter().find_map(|(key, entry)| {
                (entry.get("itemId").and_then(Value::as_str) == Some(item_id))
                    .then_some(key.as_str())
            })
        })
    }

    fn entry_object(&self, template_id: &str) -> Map<String, Value> {
        self.values
            .get(template_id)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}
