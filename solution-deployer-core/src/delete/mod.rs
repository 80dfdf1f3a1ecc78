//! # delete: removing a deployed Solution from an organization
//!
//! Deletion is best effort. Items are removed one at a time in reverse build
//! order so dependents go before what they reference, and a failing item never
//! stops the batch. The Solution item and its folder are only removed once
//! every item is gone.
//!
//! Entry points:
//! - [`delete_solution`]: look up a deployed Solution and delete it.
//! - [`delete_solution_by_components`]: clean up after a partial deployment
//!   from the ids that were created.
//! - [`delete_solution_contents`]: the shared pipeline both use.

pub mod deletable;
pub mod folder;
pub mod groups;
pub mod remove_items;
pub mod site;
pub mod summary;

use tracing::{info, warn};

use crate::contract::{Portal, SiteRemover};
use crate::error::SolutionResult;
use crate::model::{
    ItemProgressStatus, ItemTemplate, SolutionItemPrecis, SolutionPrecis, TemplateDictionary,
};
use crate::progress::{report_progress, DeleteOptions};

pub use deletable::get_deletable_solution_info;
pub use folder::delete_solution_folder;
pub use groups::{delete_empty_groups, delete_group_if_empty};
pub use remove_items::{remove_items, RemovalOutcome};
pub use site::create_hub_request_options;
pub use summary::get_solution_summary;

/// Deletes a deployed Solution and everything it deployed that no other Solution uses.
///
/// Returns `(deleted, failed)`. Fails before touching anything when the id does
/// not name a deployed Solution.
pub async fn delete_solution(
    solution_id: &str,
    portal: &dyn Portal,
    site_remover: &dyn SiteRemover,
    options: &DeleteOptions,
) -> SolutionResult<(SolutionPrecis, SolutionPrecis)> {
    info!(solution_id, "[DELETE] Deleting Solution");
    let summary = get_deletable_solution_info(solution_id, portal).await?;
    Ok(delete_solution_contents(solution_id, summary, portal, site_remover, options).await)
}

/// Deletes the items and groups created by a (possibly partial) deployment.
///
/// `item_ids` are deployed ids in creation order. Each is matched to its
/// template through the dictionary; ids of group templates are deleted as
/// groups, the rest as items.
pub async fn delete_solution_by_components(
    solution_id: &str,
    item_ids: &[String],
    templates: &[ItemTemplate],
    dictionary: &TemplateDictionary,
    portal: &dyn Portal,
    site_remover: &dyn SiteRemover,
    options: &DeleteOptions,
) -> (SolutionPrecis, SolutionPrecis) {
    let mut precis = SolutionPrecis {
        id: solution_id.to_string(),
        folder: dictionary.folder_id().unwrap_or_default().to_string(),
        ..SolutionPrecis::default()
    };

    for item_id in item_ids {
        let template = dictionary
            .template_id_for(item_id)
            .and_then(|template_id| templates.iter().find(|t| t.item_id == template_id));
        match template {
            Some(template) if template.item_type == "Group" => precis.groups.push(item_id.clone()),
            Some(template) => precis.items.push(SolutionItemPrecis {
                id: item_id.clone(),
                item_type: template.item_type.clone(),
                title: template.title().to_string(),
                modified: 0,
                owner: String::new(),
            }),
            None => {
                warn!(item_id = %item_id, "[DELETE] No template recorded for item, deleting it anyway");
                precis.items.push(SolutionItemPrecis {
                    id: item_id.clone(),
                    item_type: String::new(),
                    title: String::new(),
                    modified: 0,
                    owner: String::new(),
                });
            }
        }
    }

    delete_solution_contents(solution_id, precis, portal, site_remover, options).await
}

/// Removes a Solution's items, its empty groups, then the Solution item and its folder.
///
/// `deleted.groups` lists the groups removed and `failed.groups` the groups kept.
/// The Solution item and folder are left alone when any item failed.
pub async fn delete_solution_contents(
    solution_id: &str,
    summary: SolutionPrecis,
    portal: &dyn Portal,
    site_remover: &dyn SiteRemover,
    options: &DeleteOptions,
) -> (SolutionPrecis, SolutionPrecis) {
    let step = 100.0 / (summary.items.len() as f64 + 3.0);
    let mut percent_done = step;
    report_progress(percent_done, options, None, Some(ItemProgressStatus::Started));

    let site_ids = site::site_item_ids(&summary.items);
    let (mut deleted, mut failed) = remove_items(
        &summary,
        &site_ids,
        portal,
        site_remover,
        &mut percent_done,
        step,
        options,
    )
    .await;

    let deleted_groups = delete_empty_groups(&summary.groups, portal).await;
    failed.groups = summary
        .groups
        .iter()
        .filter(|id| !deleted_groups.contains(id))
        .cloned()
        .collect();
    deleted.groups = deleted_groups;

    if failed.items.is_empty() {
        let removed = remove_solution_item(solution_id, portal).await;
        percent_done += step;
        report_progress(percent_done, options, Some(solution_id), Some(status_of(removed)));

        if removed {
            let mut deleted_ids = deleted.item_ids();
            deleted_ids.push(solution_id.to_string());
            let folder_removed =
                delete_solution_folder(&deleted_ids, &summary.folder, portal).await;
            percent_done += step;
            report_progress(
                percent_done,
                options,
                Some(&summary.folder),
                Some(status_of(folder_removed)),
            );
        }
    } else {
        warn!(
            solution_id,
            failed = failed.items.len(),
            "[DELETE] Some items could not be removed, keeping Solution item and folder"
        );
    }

    report_progress(100.0, options, None, Some(status_of(failed.items.is_empty())));
    info!(
        solution_id,
        deleted_items = deleted.items.len(),
        failed_items = failed.items.len(),
        deleted_groups = deleted.groups.len(),
        "[DELETE] Solution deletion finished"
    );
    (deleted, failed)
}

/// Unprotects and removes the Solution item itself.
async fn remove_solution_item(solution_id: &str, portal: &dyn Portal) -> bool {
    match portal.unprotect_item(solution_id).await {
        Ok(response) if response.success => {}
        Ok(_) => {
            warn!(solution_id, "[DELETE] Solution item could not be unprotected");
            return false;
        }
        Err(e) => {
            warn!(solution_id, error = %e, "[DELETE] Solution item could not be unprotected");
            return false;
        }
    }
    match portal.remove_item(solution_id).await {
        Ok(response) => response.success,
        Err(e) => {
            warn!(solution_id, error = %e, "[DELETE] Failed to remove Solution item");
            false
        }
    }
}

fn status_of(succeeded: bool) -> ItemProgressStatus {
    if succeeded {
        ItemProgressStatus::Finished
    } else {
        ItemProgressStatus::Failed
    }
}
