//! Removal of groups left empty by a Solution deletion.

use tracing::{debug, info, warn};

use crate::contract::Portal;

/// Deletes a group when it is empty and owned by the session user.
///
/// Returns `false` without deleting when the group cannot be read, belongs to
/// someone else, still has content, or cannot be unprotected. Errors from the
/// removal itself also yield `false`.
pub async fn delete_group_if_empty(group_id: &str, portal: &dyn Portal) -> bool {
    let group = match portal.get_group(group_id).await {
        Ok(group) => group,
        Err(e) => {
            warn!(group_id, error = %e, "[DELETE] Could not read group, leaving it");
            return false;
        }
    };

    let username = portal.session().username;
    if group.owner != username {
        debug!(group_id, owner = %group.owner, "[DELETE] Group is not ours, leaving it");
        return false;
    }

    match portal.get_group_content(group_id, 1, 1).await {
        Ok(page) if page.total == 0 && page.items.is_empty() => {}
        Ok(page) => {
            debug!(group_id, total = page.total, "[DELETE] Group still has content, leaving it");
            return false;
        }
        Err(e) => {
            warn!(group_id, error = %e, "[DELETE] Could not list group content, leaving it");
            return false;
        }
    }

    if group.protected {
        match portal.unprotect_group(group_id).await {
            Ok(response) if response.success => {}
            Ok(_) => {
                warn!(group_id, "[DELETE] Group could not be unprotected");
                return false;
            }
            Err(e) => {
                warn!(group_id, error = %e, "[DELETE] Group could not be unprotected");
                return false;
            }
        }
    }

    match portal.remove_group(group_id).await {
        Ok(response) => {
            info!(group_id, success = response.success, "[DELETE] Removed empty group");
            response.success
        }
        Err(e) => {
            warn!(group_id, error = %e, "[DELETE] Failed to remove group");
            false
        }
    }
}

/// Runs [`delete_group_if_empty`] for each group in turn; returns the ids deleted.
pub async fn delete_empty_groups(group_ids: &[String], portal: &dyn Portal) -> Vec<String> {
    let mut deleted = Vec::new();
    for group_id in group_ids {
        if delete_group_if_empty(group_id, portal).await {
            deleted.push(group_id.clone());
        }
    }
    deleted
}
