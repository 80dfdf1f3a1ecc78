//! Best-effort sequential removal of a Solution's items.

use tracing::{error, info, warn};

use crate::contract::{HubRequestOptions, Portal, PortalError, SiteRemover};
use crate::delete::site::create_hub_request_options;
use crate::model::{ItemProgressStatus, SolutionItemPrecis, SolutionPrecis};
use crate::progress::{report_progress, DeleteOptions};

/// What happened to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Finished,
    Failed,
    /// The item was already gone.
    Ignored,
}

impl From<RemovalOutcome> for ItemProgressStatus {
    fn from(outcome: RemovalOutcome) -> Self {
        match outcome {
            RemovalOutcome::Finished => ItemProgressStatus::Finished,
            RemovalOutcome::Failed => ItemProgressStatus::Failed,
            RemovalOutcome::Ignored => ItemProgressStatus::Ignored,
        }
    }
}

/// Removes every item of `solution_summary`, last item first.
///
/// Each item is unprotected and then removed, through the site remover when
/// its id is in `site_item_ids`. A failing item never stops the batch. Items
/// that no longer exist are dropped from both results.
///
/// `percent_done` is advanced by `progress_percent_step` per item and reported
/// after each outcome. Returns `(deleted, failed)`.
pub async fn remove_items(
    solution_summary: &SolutionPrecis,
    site_item_ids: &[String],
    portal: &dyn Portal,
    site_remover: &dyn SiteRemover,
    percent_done: &mut f64,
    progress_percent_step: f64,
    options: &DeleteOptions,
) -> (SolutionPrecis, SolutionPrecis) {
    let mut deleted = solution_summary.empty_like();
    let mut failed = solution_summary.empty_like();
    let mut hub_options: Option<HubRequestOptions> = None;

    for item in solution_summary.items.iter().rev() {
        let is_site = site_item_ids.iter().any(|id| id == &item.id);
        let outcome = remove_one(item, is_site, portal, site_remover, &mut hub_options).await;

        match outcome {
            RemovalOutcome::Finished => deleted.items.push(item.clone()),
            RemovalOutcome::Failed => failed.items.push(item.clone()),
            RemovalOutcome::Ignored => {}
        }

        *percent_done += progress_percent_step;
        report_progress(*percent_done, options, Some(&item.id), Some(outcome.into()));
    }

    info!(
        solution_id = %solution_summary.id,
        deleted = deleted.items.len(),
        failed = failed.items.len(),
        "[DELETE] Item removal finished"
    );
    (deleted, failed)
}

async fn remove_one(
    item: &SolutionItemPrecis,
    is_site: bool,
    portal: &dyn Portal,
    site_remover: &dyn SiteRemover,
    hub_options: &mut Option<HubRequestOptions>,
) -> RemovalOutcome {
    match unprotect_and_remove(item, is_site, portal, site_remover, hub_options).await {
        Ok(true) => {
            info!(item_id = %item.id, item_type = %item.item_type, "[DELETE] Removed item");
            RemovalOutcome::Finished
        }
        Ok(false) => {
            error!(item_id = %item.id, "[DELETE][ERROR] Platform refused to remove item");
            RemovalOutcome::Failed
        }
        Err(e) if e.is_not_found() => {
            warn!(item_id = %item.id, "[DELETE] Item no longer exists, skipping");
            RemovalOutcome::Ignored
        }
        Err(e) => {
            error!(item_id = %item.id, error = %e, "[DELETE][ERROR] Failed to remove item");
            RemovalOutcome::Failed
        }
    }
}

async fn unprotect_and_remove(
    item: &SolutionItemPrecis,
    is_site: bool,
    portal: &dyn Portal,
    site_remover: &dyn SiteRemover,
    hub_options: &mut Option<HubRequestOptions>,
) -> Result<bool, PortalError> {
    if !portal.unprotect_item(&item.id).await?.success {
        return Ok(false);
    }

    let response = if is_site {
        let options = match hub_options {
            Some(options) => options.clone(),
            None => match create_hub_request_options(portal).await {
                Ok(created) => {
                    *hub_options = Some(created.clone());
                    created
                }
                // A failed lookup says nothing about the site itself.
                Err(e) => {
                    error!(item_id = %item.id, error = %e, "[DELETE][ERROR] Could not read hub request options");
                    return Ok(false);
                }
            },
        };
        site_remover.remove_site(&item.id, options).await?
    } else {
        portal.remove_item(&item.id).await?
    };
    Ok(response.success)
}
