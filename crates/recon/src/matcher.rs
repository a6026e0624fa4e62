use std::collections::HashMap;

use crate::model::{CanonicalRow, ReconciledRow};

/// Full outer join of inventory and reception rows on article code.
///
/// Ordering is deterministic: inventory rows in input order (each expanded
/// into one row per matching reception row, in reception order), then the
/// reception rows that never matched, in reception order.
pub fn outer_join(inventory: &[CanonicalRow], reception: &[CanonicalRow]) -> Vec<ReconciledRow> {
    let mut by_code: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, row) in reception.iter().enumerate() {
        by_code.entry(row.code.as_str()).or_default().push(i);
    }

    let mut reception_used = vec![false; reception.len()];
    let mut out = Vec::with_capacity(inventory.len().max(reception.len()));

    for inv in inventory {
        match by_code.get(inv.code.as_str()) {
            Some(indices) => {
                for &ri in indices {
                    reception_used[ri] = true;
                    out.push(ReconciledRow::new(inv.code.clone(), Some(inv), Some(&reception[ri])));
                }
            }
            None => out.push(ReconciledRow::new(inv.code.clone(), Some(inv), None)),
        }
    }

    for (ri, rec) in reception.iter().enumerate() {
        if !reception_used[ri] {
            out.push(ReconciledRow::new(rec.code.clone(), None, Some(rec)));
        }
    }

    out
}
