//! Dependency-respecting build order for a list of templates.
//!
//! Creation follows the returned order; deletion walks it backwards so that
//! dependents are removed before the items they reference.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::error::{SolutionError, SolutionResult};
use crate::model::ItemTemplate;

/// Orders template ids so each id comes after every id it depends on.
///
/// The order is stable: an id moves only as far as its dependencies require,
/// and unconstrained ids keep their captured relative order. Dependencies on
/// ids outside the list and self-references are ignored. A cycle fails with
/// [`SolutionError::CyclicDependency`] naming every id that could not be placed.
pub fn reconstruct_build_order_ids(templates: &[ItemTemplate]) -> SolutionResult<Vec<String>> {
    let known: HashSet<&str> = templates.iter().map(|t| t.item_id.as_str()).collect();

    // Dependencies restricted to ids present in the list.
    let pending_deps: Vec<Vec<&str>> = templates
        .iter()
        .map(|t| {
            t.dependencies
                .iter()
                .map(String::as_str)
                .filter(|d| *d != t.item_id && known.contains(d))
                .collect()
        })
        .collect();

    let mut placed: HashSet<&str> = HashSet::with_capacity(templates.len());
    let mut done = vec![false; templates.len()];
    let mut order: Vec<String> = Vec::with_capacity(templates.len());

    while done.iter().any(|d| !d) {
        // Earliest unplaced template whose dependencies are all placed.
        let next = (0..templates.len())
            .find(|&i| !done[i] && pending_deps[i].iter().all(|d| placed.contains(d)));

        match next {
            Some(i) => {
                done[i] = true;
                let id = templates[i].item_id.as_str();
                // Duplicate captures of one id are emitted once.
                if placed.insert(id) {
                    order.push(id.to_string());
                }
            }
            None => {
                let unplaced: Vec<String> = templates
                    .iter()
                    .zip(&done)
                    .filter(|(_, d)| !**d)
                    .map(|(t, _)| t.item_id.clone())
                    .collect();
                error!(ids = ?unplaced, "[BUILD ORDER] Cyclic dependency detected");
                return Err(SolutionError::CyclicDependency(unplaced));
            }
        }
    }

    debug!(order = ?order, "[BUILD ORDER] Reconstructed build order");
    Ok(order)
}

/// Templates reordered to match [`reconstruct_build_order_ids`].
pub fn sort_templates_by_build_order(
    templates: &[ItemTemplate],
) -> SolutionResult<Vec<ItemTemplate>> {
    let order = reconstruct_build_order_ids(templates)?;
    Ok(order
        .iter()
        .filter_map(|id| templates.iter().find(|t| &t.item_id == id).cloned())
        .collect())
}
