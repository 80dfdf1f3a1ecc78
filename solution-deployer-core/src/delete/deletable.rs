use tracing::info;

use crate::contract::Portal;
use crate::delete::summary::get_solution_summary;
use crate::error::SolutionResult;
use crate::model::SolutionPrecis;

/// The Solution's summary minus every item shared with another Solution.
///
/// Lookup errors propagate; nothing is mutated.
pub async fn get_deletable_solution_info(
    solution_id: &str,
    portal: &dyn Portal,
) -> SolutionResult<SolutionPrecis> {
    let mut summary = get_solution_summary(solution_id, portal).await?;

    let mut deletable = Vec::with_capacity(summary.items.len());
    for item in std::mem::take(&mut summary.items) {
        let solutions = portal.get_solutions_related_to_item(&item.id).await?;
        if solutions.len() > 1 {
            info!(
                item_id = %item.id,
                solutions = solutions.len(),
                "[SUMMARY] Item is shared with another Solution, keeping it"
            );
        } else {
            deletable.push(item);
        }
    }
    summary.items = deletable;
    Ok(summary)
}
