//! High-level pipelines: capture items as templates, deploy templates as items.
//!
//! # Capture
//! [`create_solution_templates`] converts each requested id, and transitively
//! every dependency its processor reports, into an [`ItemTemplate`]. Each id is
//! converted once. Types without a processor are skipped with a warning so a
//! single exotic item does not block the rest of the Solution.
//!
//! # Deployment
//! [`deploy_templates`] creates items in build order (see
//! [`crate::build_order`]), recording every new id in the
//! [`TemplateDictionary`] so later templates can resolve their placeholders.
//! Once all items exist, processors that asked for it get a post-processing
//! pass to resolve references to items created after them.
//!
//! # Cancellation
//! The progress callback is asked before each item; returning `false` stops
//! the run between items. Items already created are reported back so the
//! caller can remove them with
//! [`crate::delete::delete_solution_by_components`].
//!
//! # Error Handling
//! A creation or post-processing error stops the run and comes back as a
//! [`DeployFailure`] carrying the items created so far.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::build_order::sort_templates_by_build_order;
use crate::contract::{ItemBase, Portal};
use crate::error::{SolutionError, SolutionResult};
use crate::item_types::workforce::post_process_workforce_templates;
use crate::item_types::{CreatedItem, Handler, ProcessorRegistry};
use crate::model::{ItemProgressStatus, ItemTemplate, TemplateDictionary};

/// Per-item deployment callback: template id and status. Returning `false` cancels.
pub type DeployProgressCallback = Arc<dyn Fn(&str, ItemProgressStatus) -> bool + Send + Sync>;

/// Result of a deployment that ran to completion or was cancelled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployOutcome {
    /// Created items in creation order.
    pub created: Vec<CreatedItem>,
    pub cancelled: bool,
}

/// A deployment that stopped on an error.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployFailure {
    pub created: Vec<CreatedItem>,
    pub error: SolutionError,
}

impl DeployFailure {
    /// Deployed ids created before the failure, in creation order.
    pub fn created_ids(&self) -> Vec<String> {
        self.created.iter().map(|item| item.id.clone()).collect()
    }
}

/// Item metadata for an id that may name an item or a group.
async fn resolve_item(id: &str, portal: &dyn Portal) -> SolutionResult<ItemBase> {
    match portal.get_item_base(id).await {
        Ok(item) => Ok(item),
        Err(e) if e.is_not_found() => {
            let group = portal.get_group(id).await?;
            Ok(ItemBase {
                id: group.id,
                item_type: "Group".to_string(),
                title: group.title,
                owner: group.owner,
                ..ItemBase::default()
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Captures the items `ids` and everything they depend on as templates.
pub async fn create_solution_templates(
    ids: &[String],
    portal: &dyn Portal,
    registry: &ProcessorRegistry,
) -> SolutionResult<Vec<ItemTemplate>> {
    info!(ids = ?ids, "[CAPTURE] Starting template capture");

    let mut templates: Vec<ItemTemplate> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = ids.iter().cloned().collect();

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id.clone()) {
            continue;
        }
        let item = resolve_item(&id, portal).await?;

        match registry.handler_for(&item.item_type) {
            Handler::Processor(processor) => {
                let template = processor.convert_item_to_template(&item, portal).await?;
                info!(
                    item_id = %id,
                    item_type = %item.item_type,
                    dependencies = template.dependencies.len(),
                    "[CAPTURE] Converted item"
                );
                queue.extend(
                    template
                        .dependencies
                        .iter()
                        .filter(|d| !seen.contains(*d))
                        .cloned(),
                );
                templates.push(template);
            }
            Handler::Unsupported => {
                warn!(item_id = %id, item_type = %item.item_type, "[CAPTURE] Item type is not supported, skipping");
            }
            Handler::NotImplemented => {
                warn!(item_id = %id, item_type = %item.item_type, "[CAPTURE] Item type has no processor, skipping");
            }
        }
    }

    let templates = post_process_workforce_templates(templates);
    info!(templates = templates.len(), "[CAPTURE] Template capture finished");
    Ok(templates)
}

fn notify(callback: Option<&DeployProgressCallback>, template_id: &str, status: ItemProgressStatus) -> bool {
    callback.map_or(true, |callback| callback(template_id, status))
}

/// Creates an item for every template, in build order.
pub async fn deploy_templates(
    templates: &[ItemTemplate],
    dictionary: &mut TemplateDictionary,
    portal: &dyn Portal,
    registry: &ProcessorRegistry,
    progress_callback: Option<&DeployProgressCallback>,
) -> Result<DeployOutcome, DeployFailure> {
    let ordered = sort_templates_by_build_order(templates).map_err(|error| DeployFailure {
        created: Vec::new(),
        error,
    })?;
    info!(templates = ordered.len(), "[DEPLOY] Starting deployment");

    let mut created: Vec<CreatedItem> = Vec::new();
    for template in &ordered {
        if !notify(progress_callback, &template.item_id, ItemProgressStatus::Started) {
            info!(template_id = %template.item_id, created = created.len(), "[DEPLOY] Deployment cancelled");
            notify(progress_callback, &template.item_id, ItemProgressStatus::Cancelled);
            return Ok(DeployOutcome {
                created,
                cancelled: true,
            });
        }

        let processor = match registry.processor_for(&template.item_type) {
            Ok(processor) => processor,
            Err(_) => {
                notify(progress_callback, &template.item_id, ItemProgressStatus::Ignored);
                continue;
            }
        };

        match processor
            .create_item_from_template(template, dictionary, portal)
            .await
        {
            Ok(item) => {
                notify(progress_callback, &template.item_id, ItemProgressStatus::Finished);
                created.push(item);
            }
            Err(error) => {
                error!(template_id = %template.item_id, error = %error, "[DEPLOY][ERROR] Item creation failed");
                notify(progress_callback, &template.item_id, ItemProgressStatus::Failed);
                return Err(DeployFailure { created, error });
            }
        }
    }

    for item in created.iter().filter(|item| item.post_process) {
        let Some(template) = ordered.iter().find(|t| t.item_id == item.template_id) else {
            continue;
        };
        let result = match registry.processor_for(&template.item_type) {
            Ok(processor) => {
                processor
                    .post_process(&item.id, template, &ordered, dictionary, portal)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(error) = result {
            error!(item_id = %item.id, error = %error, "[DEPLOY][ERROR] Post-processing failed");
            return Err(DeployFailure {
                created: created.clone(),
                error,
            });
        }
    }

    info!(created = created.len(), "[DEPLOY] Deployment finished");
    Ok(DeployOutcome {
        created,
        cancelled: false,
    })
}
