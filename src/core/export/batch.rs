//! Predicate batching
//!
//! Packs a table's predicates into `WHERE` clauses of the form
//! `` `a`=1 and `b`=2 or `a`=3 and `b`=4 ``, each no longer than a byte
//! budget.

use crate::domain::Predicate;

/// Default clause budget in bytes (256 × 50)
pub const DEFAULT_CLAUSE_BUDGET: usize = 12_800;

const DISJUNCTION: &str = " or ";

/// Greedily packs `predicates` into clauses of at most `budget` bytes
///
/// Input order is preserved and every predicate lands in exactly one
/// clause. A single predicate longer than `budget` forms a clause of its
/// own rather than being split. An empty input yields no clauses.
pub fn batch_clauses(predicates: &[Predicate], budget: usize) -> Vec<String> {
    let mut batches = Vec::new();
    let mut current = String::new();

    for predicate in predicates {
        let conjunction = predicate.conjunction();
        let candidate_len = if current.is_empty() {
            conjunction.len()
        } else {
            current.len() + DISJUNCTION.len() + conjunction.len()
        };

        if candidate_len > budget && !current.is_empty() {
            batches.push(std::mem::take(&mut current));
        }

        if !current.is_empty() {
            current.push_str(DISJUNCTION);
        }
        current.push_str(&conjunction);
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}
