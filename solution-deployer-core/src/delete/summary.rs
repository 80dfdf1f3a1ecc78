//! Precis of a deployed Solution: which items and groups it owns, in build order.

use serde_json::Value;
use tracing::{debug, info};

use crate::build_order::reconstruct_build_order_ids;
use crate::contract::Portal;
use crate::error::{SolutionError, SolutionResult};
use crate::model::{ItemTemplate, SolutionItemPrecis, SolutionPrecis};
use crate::templatization::get_prop;

/// Reads a deployed Solution and summarizes its items and groups.
///
/// Fails with [`SolutionError::NotASolution`] for any other item type and with
/// [`SolutionError::NotDeployed`] for a Solution template.
pub async fn get_solution_summary(
    solution_id: &str,
    portal: &dyn Portal,
) -> SolutionResult<SolutionPrecis> {
    let base = portal.get_item_base(solution_id).await?;
    if base.item_type != "Solution" {
        return Err(SolutionError::NotASolution(solution_id.to_string()));
    }
    if !base.has_type_keyword("Deployed") || base.has_type_keyword("Template") {
        return Err(SolutionError::NotDeployed(solution_id.to_string()));
    }

    let data = portal.get_item_data(solution_id).await?;
    let templates: Vec<ItemTemplate> = match data.get("templates") {
        Some(templates) => serde_json::from_value(templates.clone())?,
        None => Vec::new(),
    };

    let build_order = if data_version(&data) < 1 {
        reconstruct_build_order_ids(&templates)?
    } else {
        templates.iter().map(|t| t.item_id.clone()).collect()
    };

    let related = portal.get_items_related_to_solution(solution_id).await?;
    let mut items: Vec<SolutionItemPrecis> = related
        .into_iter()
        .map(|item| SolutionItemPrecis {
            id: item.id,
            item_type: item.item_type,
            title: item.title,
            modified: item.modified,
            owner: item.owner,
        })
        .collect();
    // Stable: items missing from the build order keep their returned order at the end.
    items.sort_by_key(|item| {
        build_order
            .iter()
            .position(|id| id == &item.id)
            .unwrap_or(usize::MAX)
    });

    let summary = SolutionPrecis {
        id: base.id,
        title: base.title,
        folder: base.owner_folder.unwrap_or_default(),
        items,
        groups: solution_groups(&templates),
    };
    info!(
        solution_id,
        items = summary.items.len(),
        groups = summary.groups.len(),
        "[SUMMARY] Read Solution summary"
    );
    Ok(summary)
}

/// `metadata.version` of Solution data; missing or unreadable means 0.
fn data_version(data: &Value) -> i64 {
    let version = match get_prop(data, "metadata.version") {
        Some(Value::Number(n)) => n.as_f64().map(|v| v as i64).unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|v| v as i64).unwrap_or_default(),
        _ => 0,
    };
    debug!(version, "[SUMMARY] Solution data version");
    version
}

fn solution_groups(templates: &[ItemTemplate]) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    let from_templates = templates.iter().flat_map(|t| {
        let own = (t.item_type == "Group").then_some(&t.item_id);
        t.groups.iter().chain(own)
    });
    for id in from_templates {
        if !groups.contains(id) {
            groups.push(id.clone());
        }
    }
    groups
}
