//! # item_types: per-type capture and creation of platform items
//!
//! Every supported item type has an [`ItemProcessor`] that knows how to turn
//! a live item into an [`ItemTemplate`] and back. Which processor handles a
//! type string is decided by the [`registry::ProcessorRegistry`].
//!
//! The helpers at this level are shared by the processors: building the
//! initial template from item metadata, verifying candidate ids against the
//! platform, and creating an item from a resolved template.

pub mod file;
pub mod group;
pub mod notebook;
pub mod registry;
pub mod simple;
pub mod workforce;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info};

use crate::contract::{is_group, is_item, ItemBase, NewItem, Portal};
use crate::error::{SolutionError, SolutionResult};
use crate::model::{ItemTemplate, TemplateDictionary};
use crate::templatization::{
    delete_props, has_placeholders, replace_in_template, templatize_ids, templatize_term,
};

pub use registry::{Handler, ProcessorRegistry};

/// An item created in the destination from a template.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedItem {
    /// Source id of the template the item was created from.
    pub template_id: String,
    /// Id of the new item or group.
    pub id: String,
    pub item_type: String,
    /// The item still references ids created later in the run.
    pub post_process: bool,
}

/// Type-specific template handling.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    fn name(&self) -> &str;

    /// Captures an item as a template with its references replaced by placeholders.
    async fn convert_item_to_template(
        &self,
        item: &ItemBase,
        portal: &dyn Portal,
    ) -> SolutionResult<ItemTemplate>;

    /// Creates the item described by `template` and records it in the dictionary.
    async fn create_item_from_template(
        &self,
        template: &ItemTemplate,
        dictionary: &mut TemplateDictionary,
        portal: &dyn Portal,
    ) -> SolutionResult<CreatedItem>;

    /// Runs once every template of the deployment has been created.
    async fn post_process(
        &self,
        _item_id: &str,
        _template: &ItemTemplate,
        _templates: &[ItemTemplate],
        _dictionary: &TemplateDictionary,
        _portal: &dyn Portal,
    ) -> SolutionResult<()> {
        Ok(())
    }
}

/// Item metadata fields that describe the source copy rather than the item.
const SOURCE_ONLY_FIELDS: &[&str] = &[
    "owner",
    "ownerFolder",
    "modified",
    "created",
    "protected",
    "numViews",
    "size",
    "orgId",
];

/// A template seeded from item metadata, with the item's own id templatized.
pub fn template_from_item(item: &ItemBase) -> SolutionResult<ItemTemplate> {
    let mut template = ItemTemplate::skeleton(&item.id, &item.item_type);
    let mut metadata = serde_json::to_value(item)?;
    delete_props(&mut metadata, SOURCE_ONLY_FIELDS);
    if let Value::Object(map) = &mut metadata {
        map.insert(
            "id".to_string(),
            Value::String(templatize_term(&item.id, &item.id, ".itemId")),
        );
    }
    template.item = metadata;
    Ok(template)
}

/// Keeps the candidates that name an item or group visible to the session,
/// templatizes them in the template's data and adds them as dependencies.
///
/// Candidates are verified concurrently; the template's own id is skipped.
pub async fn templatize_verified_ids(
    template: &mut ItemTemplate,
    candidates: Vec<String>,
    portal: &dyn Portal,
) -> SolutionResult<()> {
    let candidates: Vec<String> = candidates
        .into_iter()
        .filter(|id| id != &template.item_id)
        .collect();
    if candidates.is_empty() {
        return Ok(());
    }

    let checks = candidates.iter().map(|id| async move {
        is_item(portal, id).await || is_group(portal, id).await
    });
    let results = join_all(checks).await;

    let verified: Vec<String> = candidates
        .into_iter()
        .zip(results)
        .filter_map(|(id, valid)| valid.then_some(id))
        .collect();
    debug!(
        item_id = %template.item_id,
        verified = ?verified,
        "[CAPTURE] Verified referenced ids"
    );

    template.data = templatize_ids(&template.data, &verified)?;
    for id in &verified {
        template.add_dependency(id);
    }
    Ok(())
}

/// Creates the item of a template in the deployment folder.
///
/// Placeholders in item and data are resolved from the dictionary first; the
/// new id (and url, if any) is recorded under the template's id.
pub async fn create_item_in_folder(
    template: &ItemTemplate,
    dictionary: &mut TemplateDictionary,
    portal: &dyn Portal,
) -> SolutionResult<CreatedItem> {
    let mut item = template.item.clone();
    replace_in_template(&mut item, dictionary);
    if let Value::Object(map) = &mut item {
        map.remove("id");
    }
    let mut data = template.data.clone();
    replace_in_template(&mut data, dictionary);
    let unresolved = has_placeholders(&item) || has_placeholders(&data);

    let response = portal
        .create_item(NewItem {
            item: item.clone(),
            data,
            folder_id: dictionary.folder_id().map(str::to_string),
        })
        .await?;
    let new_id = match (response.success, response.id) {
        (true, Some(id)) => id,
        _ => {
            return Err(SolutionError::CreateFailed {
                item_id: template.item_id.clone(),
                message: "platform did not return a new item id".to_string(),
            })
        }
    };

    let url = item
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(|url| url.replace(&template.item_id, &new_id));
    dictionary.record_item(&template.item_id, &new_id, url.as_deref());
    info!(
        template_id = %template.item_id,
        item_id = %new_id,
        item_type = %template.item_type,
        "[DEPLOY] Created item"
    );

    Ok(CreatedItem {
        template_id: template.item_id.clone(),
        id: new_id,
        item_type: template.item_type.clone(),
        post_process: unresolved,
    })
}
