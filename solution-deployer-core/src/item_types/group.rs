//! Groups: captured with their content as dependencies, recreated and refilled on deploy.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::contract::{ItemBase, NewGroup, Portal, PortalError};
use crate::error::{SolutionError, SolutionResult};
use crate::item_types::{CreatedItem, ItemProcessor};
use crate::model::{ItemTemplate, TemplateDictionary};
use crate::templatization::{replace_in_template, templatize_term};

/// Page size for group content listings.
pub const GROUP_CONTENT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Clone, Copy)]
pub struct GroupProcessor;

/// Ids of everything shared into a group, across all pages.
pub async fn get_group_content_ids(
    group_id: &str,
    portal: &dyn Portal,
) -> Result<Vec<String>, PortalError> {
    let mut ids = Vec::new();
    let mut start = 1;
    loop {
        let page = portal
            .get_group_content(group_id, start, GROUP_CONTENT_PAGE_SIZE)
            .await?;
        let page_len = page.items.len();
        ids.extend(page.items.into_iter().map(|item| item.id));
        // Stop on the last page, and on pages that would not move the cursor forward.
        if page.next_start <= 0 || page_len == 0 || page.next_start <= start {
            break;
        }
        start = page.next_start;
    }
    Ok(ids)
}

#[async_trait]
impl ItemProcessor for GroupProcessor {
    fn name(&self) -> &str {
        "group"
    }

    async fn convert_item_to_template(
        &self,
        item: &ItemBase,
        portal: &dyn Portal,
    ) -> SolutionResult<ItemTemplate> {
        let group = portal.get_group(&item.id).await?;

        let mut template = ItemTemplate::skeleton(&group.id, "Group");
        template.item = json!({
            "id": templatize_term(&group.id, &group.id, ".itemId"),
            "type": "Group",
            "title": group.title,
            "description": group.description,
            "snippet": group.snippet,
            "tags": group.tags,
            "thumbnail": group.thumbnail,
            "access": group.access,
        });
        template.estimated_deployment_cost_factor = 2.0;

        match get_group_content_ids(&group.id, portal).await {
            Ok(ids) => {
                for id in &ids {
                    template.add_dependency(id);
                }
            }
            Err(e) => {
                warn!(group_id = %group.id, error = %e, "[CAPTURE] Could not list group content");
            }
        }
        Ok(template)
    }

    async fn create_item_from_template(
        &self,
        template: &ItemTemplate,
        dictionary: &mut TemplateDictionary,
        portal: &dyn Portal,
    ) -> SolutionResult<CreatedItem> {
        let mut item = template.item.clone();
        replace_in_template(&mut item, dictionary);

        let text = |key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
        let new_group = NewGroup {
            title: text("title").unwrap_or_default(),
            description: text("description"),
            snippet: text("snippet"),
            tags: item
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            access: text("access").unwrap_or_else(|| "private".to_string()),
        };

        let response = portal.create_group(new_group).await?;
        let new_id = match (response.success, response.id) {
            (true, Some(id)) => id,
            _ => {
                return Err(SolutionError::CreateFailed {
                    item_id: template.item_id.clone(),
                    message: "platform did not return a new group id".to_string(),
                })
            }
        };
        dictionary.record_item(&template.item_id, &new_id, None);
        info!(template_id = %template.item_id, group_id = %new_id, "[DEPLOY] Created group");

        Ok(CreatedItem {
            template_id: template.item_id.clone(),
            id: new_id,
            item_type: "Group".to_string(),
            post_process: !template.dependencies.is_empty(),
        })
    }

    /// Shares each deployed dependency into the new group.
    async fn post_process(
        &self,
        item_id: &str,
        template: &ItemTemplate,
        _templates: &[ItemTemplate],
        dictionary: &TemplateDictionary,
        portal: &dyn Portal,
    ) -> SolutionResult<()> {
        for dependency in &template.dependencies {
            let Some(deployed_id) = dictionary.item_id_for(dependency) else {
                warn!(group_id = item_id, dependency = %dependency, "[DEPLOY] Group member was not deployed");
                continue;
            };
            let response = portal.share_item_with_group(deployed_id, item_id).await?;
            if !response.success {
                warn!(group_id = item_id, item_id = deployed_id, "[DEPLOY] Sharing into group failed");
            }
        }
        Ok(())
    }
}
