//! Workforce projects.
//!
//! Version 1 projects keep their references in item data: a handful of key
//! properties holding ids or `{serviceItemId, url}` objects, plus app
//! integration url templates with ids and feature service urls in their query
//! strings. Version 2 projects have no data and reference their maps and group
//! through item properties instead; those are handled at the end of capture by
//! [`post_process_workforce_templates`], once all templates are known.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::contract::{Feature, ItemBase, Portal, User};
use crate::error::{SolutionError, SolutionResult};
use crate::id_scanner::{
    layer_id, replace_value, scan_feature_service_urls, scan_ids, scan_query_ids,
};
use crate::item_types::{create_item_in_folder, template_from_item, CreatedItem, ItemProcessor};
use crate::model::{ItemTemplate, TemplateDictionary};
use crate::templatization::{
    get_prop, get_prop_mut, replace_in_template, templatize_term,
    update_item_template_from_dictionary,
};

/// Data properties of a version 1 project that reference other items.
pub const KEY_PROPERTIES: &[&str] = &[
    "groupId",
    "workerWebMapId",
    "dispatcherWebMapId",
    "dispatchers",
    "assignments",
    "workers",
    "tracks",
];

/// Item properties of a version 2 project that reference other items.
pub const V2_KEY_PROPERTIES: &[&str] = &[
    "workforceDispatcherMapId",
    "workforceProjectGroupId",
    "workforceWorkerMapId",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct WorkforceProcessor;

/// References found in version 1 project data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkforceDependencies {
    pub dependencies: Vec<String>,
    /// Feature service url found in an integration url template, to its service item id.
    pub url_hash: HashMap<String, String>,
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

/// Url templates of every assignment type of every app integration.
fn assignment_url_templates(data: &Value) -> Vec<String> {
    let Some(Value::Array(integrations)) = data.get("assignmentIntegrations") else {
        return Vec::new();
    };
    integrations
        .iter()
        .filter_map(|integration| integration.get("assignmentTypes").and_then(Value::as_object))
        .flat_map(|types| types.values())
        .filter_map(|assignment_type| assignment_type.get("urlTemplate").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// Collects the items a version 1 project depends on.
///
/// Feature service urls in integration url templates are resolved to their
/// service item through the platform.
pub async fn extract_workforce_dependencies(
    data: &Value,
    portal: &dyn Portal,
) -> SolutionResult<WorkforceDependencies> {
    let mut found = WorkforceDependencies::default();

    for property in KEY_PROPERTIES {
        let service_item_id =
            get_prop(data, &format!("{property}.serviceItemId")).and_then(Value::as_str);
        match (service_item_id, data.get(*property)) {
            (Some(id), _) => push_unique(&mut found.dependencies, id),
            (None, Some(Value::String(value))) => {
                for id in scan_ids(value) {
                    push_unique(&mut found.dependencies, &id);
                }
            }
            _ => {}
        }
    }

    for url_template in assignment_url_templates(data) {
        for id in scan_query_ids(&url_template) {
            push_unique(&mut found.dependencies, &id);
        }
        for url in scan_feature_service_urls(&url_template) {
            if found.url_hash.contains_key(&url) {
                continue;
            }
            let service = portal.request_json(&url).await?;
            if let Some(service_item_id) = service.get("serviceItemId").and_then(Value::as_str) {
                push_unique(&mut found.dependencies, service_item_id);
                found.url_hash.insert(url, service_item_id.to_string());
            }
        }
    }

    debug!(dependencies = ?found.dependencies, "[CAPTURE] Workforce dependencies");
    Ok(found)
}

/// Replaces the ids and service urls inside one integration url template.
pub fn templatize_url_template(url_template: &str, url_hash: &HashMap<String, String>) -> String {
    let mut templatized = url_template.to_string();
    for id in scan_query_ids(url_template) {
        templatized = templatized.replace(&id, &templatize_term(&id, &id, ".itemId"));
    }
    for url in scan_feature_service_urls(&templatized) {
        if let Some(service_item_id) = url_hash.get(&url) {
            let suffix = replace_value(layer_id(&url), ".url");
            templatized = templatized.replace(
                &url,
                &templatize_term(service_item_id, service_item_id, &suffix),
            );
        }
    }
    templatized
}

fn templatize_url_templates_in(value: &mut Value, url_hash: &HashMap<String, String>) {
    for key in ["urlTemplate", "urltemplate"] {
        if let Some(Value::String(url_template)) = value.get_mut(key) {
            *url_template = templatize_url_template(url_template, url_hash);
        }
    }
}

/// Templatizes the key properties and integrations of version 1 project data.
pub fn templatize_workforce(mut data: Value, url_hash: &HashMap<String, String>) -> Value {
    for property in KEY_PROPERTIES {
        match data.get_mut(*property) {
            Some(Value::Object(entry)) => {
                let Some(id) = entry
                    .get("serviceItemId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                else {
                    continue;
                };
                let mut suffix = ".itemId".to_string();
                if let Some(url) = entry.get("url").and_then(Value::as_str).map(str::to_string) {
                    let layer = layer_id(&url);
                    entry.insert(
                        "url".to_string(),
                        Value::String(templatize_term(&id, &id, &replace_value(layer, ".url"))),
                    );
                    suffix = replace_value(layer, ".itemId");
                }
                entry.insert(
                    "serviceItemId".to_string(),
                    Value::String(templatize_term(&id, &id, &suffix)),
                );
            }
            Some(Value::String(id)) if !id.is_empty() => {
                let templatized = templatize_term(id, id, ".itemId");
                *id = templatized;
            }
            _ => {}
        }
    }

    if let Value::Object(map) = &mut data {
        map.insert("folderId".to_string(), Value::String("{{folderId}}".to_string()));
    }

    if let Some(Value::Array(integrations)) = data.get_mut("assignmentIntegrations") {
        for integration in integrations {
            templatize_url_templates_in(integration, url_hash);
            if let Some(Value::Object(types)) = integration.get_mut("assignmentTypes") {
                for assignment_type in types.values_mut() {
                    templatize_url_templates_in(assignment_type, url_hash);
                }
            }
        }
    }
    data
}

/// Adds the user to the project's dispatchers layer unless already listed.
///
/// Returns `false` when the data has no dispatchers layer.
pub async fn update_dispatchers(
    dispatchers: Option<&Value>,
    user: &User,
    portal: &dyn Portal,
) -> SolutionResult<bool> {
    let Some(url) = dispatchers.and_then(|d| d.get("url")).and_then(Value::as_str) else {
        return Ok(false);
    };

    let existing = portal
        .query_features(url, &format!("userId = '{}'", user.username))
        .await?;
    if !existing.features.is_empty() {
        return Ok(true);
    }

    let mut attributes = Map::new();
    attributes.insert("name".to_string(), Value::String(user.full_name.clone()));
    attributes.insert("userId".to_string(), Value::String(user.username.clone()));
    let result = portal.add_features(url, vec![Feature { attributes }]).await?;
    if result.add_results.iter().any(|r| r.success) {
        info!(username = %user.username, "[DEPLOY] Added user as Workforce dispatcher");
        Ok(true)
    } else {
        Err(SolutionError::CreateFailed {
            item_id: url.to_string(),
            message: "Failed to add dispatch record.".to_string(),
        })
    }
}

fn is_version_one(data: &Value) -> bool {
    data.is_object()
}

#[async_trait]
impl ItemProcessor for WorkforceProcessor {
    fn name(&self) -> &str {
        "workforce"
    }

    async fn convert_item_to_template(
        &self,
        item: &ItemBase,
        portal: &dyn Portal,
    ) -> SolutionResult<ItemTemplate> {
        let mut template = template_from_item(item)?;
        let data = portal.get_item_data(&item.id).await?;

        if is_version_one(&data) {
            let found = extract_workforce_dependencies(&data, portal).await?;
            template.data = templatize_workforce(data, &found.url_hash);
            for id in &found.dependencies {
                template.add_dependency(id);
            }
        } else {
            for property in V2_KEY_PROPERTIES {
                let id = get_prop(&template.item, &format!("properties.{property}"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some(id) = id {
                    template.add_dependency(&id);
                }
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
        let created = create_item_in_folder(template, dictionary, portal).await?;

        if is_version_one(&template.data) {
            let mut data = template.data.clone();
            replace_in_template(&mut data, dictionary);
            let updated = match portal.current_user().await {
                Ok(user) => update_dispatchers(data.get("dispatchers"), &user, portal).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = updated {
                warn!(item_id = %created.id, error = %e, "[DEPLOY] Could not update Workforce dispatchers");
            }
        }
        Ok(created)
    }

    async fn post_process(
        &self,
        item_id: &str,
        _template: &ItemTemplate,
        _templates: &[ItemTemplate],
        dictionary: &TemplateDictionary,
        portal: &dyn Portal,
    ) -> SolutionResult<()> {
        update_item_template_from_dictionary(item_id, dictionary, portal).await?;
        Ok(())
    }
}

/// Capture-time pass over all templates for version 2 Workforce projects.
///
/// Project item properties become placeholders and the project's references
/// move onto its group's template, so the group is created (and filled) before
/// the project. Dispatcher and worker apps get their feature service id
/// templatized.
pub fn post_process_workforce_templates(mut templates: Vec<ItemTemplate>) -> Vec<ItemTemplate> {
    let mut group_updates: HashMap<String, Vec<String>> = HashMap::new();

    for template in templates.iter_mut() {
        templatize_workforce_project(template, &mut group_updates);
        templatize_feature_service_id(template, "Workforce Dispatcher");
        templatize_feature_service_id(template, "Workforce Worker");
    }

    for template in templates.iter_mut() {
        if let Some(ids) = group_updates.get(&template.item_id) {
            for id in ids {
                template.add_dependency(id);
            }
        }
    }
    templates
}

fn templatize_workforce_project(
    template: &mut ItemTemplate,
    group_updates: &mut HashMap<String, Vec<String>>,
) {
    if !template.has_type_keyword("Workforce Project") {
        return;
    }
    let Some(Value::Object(properties)) = template.item.get_mut("properties") else {
        return;
    };

    let group_id = properties
        .get("workforceProjectGroupId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default();
    let mut shuffle_ids: Vec<String> = Vec::new();
    for property in V2_KEY_PROPERTIES {
        if let Some(Value::String(id)) = properties.get_mut(*property) {
            if *id != group_id {
                shuffle_ids.push(id.clone());
            }
            let templatized = templatize_term(id, id, ".itemId");
            *id = templatized;
        }
    }
    if group_id.is_empty() {
        return;
    }

    template
        .dependencies
        .retain(|d| d != &group_id && !shuffle_ids.contains(d));

    if let Some(Value::Object(infos)) = get_prop_mut(&mut template.properties, "workforceInfos") {
        for entries in infos.values_mut() {
            let Value::Array(entries) = entries else {
                continue;
            };
            for info in entries.iter_mut() {
                let Some(Value::Array(dependencies)) =
                    info.as_object_mut().and_then(|info| info.remove("dependencies"))
                else {
                    continue;
                };
                for id in dependencies.iter().filter_map(Value::as_str) {
                    push_unique(&mut shuffle_ids, id);
                    template.dependencies.retain(|d| d != id);
                }
            }
        }
    }

    debug!(group_id = %group_id, moved = ?shuffle_ids, "[CAPTURE] Moved Workforce dependencies to project group");
    group_updates.insert(group_id, shuffle_ids);
}

fn templatize_feature_service_id(template: &mut ItemTemplate, keyword: &str) {
    if !template.has_type_keyword(keyword) {
        return;
    }
    if let Some(Value::String(id)) =
        get_prop_mut(&mut template.item, "properties.workforceFeatureServiceId")
    {
        let templatized = templatize_term(id, id, ".itemId");
        *id = templatized;
    }
}
