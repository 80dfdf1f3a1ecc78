//! Removal of the folder a Solution was deployed into.

use tracing::{info, warn};

use crate::contract::{Portal, SearchQuery};

/// Deletes the Solution's folder unless something not deleted by the Solution remains.
///
/// Returns `true` without any call for an empty folder id, and `true` without
/// removal when the folder still holds other items. Otherwise returns the
/// removal's success; lookup or removal errors yield `false`.
pub async fn delete_solution_folder(
    deleted_ids: &[String],
    folder_id: &str,
    portal: &dyn Portal,
) -> bool {
    if folder_id.is_empty() {
        return true;
    }

    let user = match portal.current_user().await {
        Ok(user) => user,
        Err(e) => {
            warn!(folder_id, error = %e, "[DELETE] Could not read current user");
            return false;
        }
    };

    let mut query = SearchQuery::folder_contents(&user.username, folder_id);
    let mut remaining: Vec<String> = Vec::new();
    loop {
        let page = match portal.search_items(query.clone()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(folder_id, error = %e, "[DELETE] Could not list folder content");
                return false;
            }
        };
        let page_len = page.results.len();
        remaining.extend(page.results.into_iter().map(|item| item.id));
        if page.next_start <= 0 || page_len == 0 || page.next_start <= query.start {
            break;
        }
        query.start = page.next_start;
    }

    if let Some(foreign) = remaining.iter().find(|id| !deleted_ids.contains(id)) {
        info!(folder_id, item_id = %foreign, "[DELETE] Folder holds other items, keeping it");
        return true;
    }

    match portal.remove_folder(folder_id).await {
        Ok(response) => {
            info!(folder_id, success = response.success, "[DELETE] Removed Solution folder");
            response.success
        }
        Err(e) => {
            warn!(folder_id, error = %e, "[DELETE] Failed to remove folder");
            false
        }
    }
}
