use crate::model::{Partitions, ReconciledRow};

/// Group rows by membership, keeping their relative order.
pub fn partition(rows: Vec<ReconciledRow>) -> Partitions {
    let mut out = Partitions::default();
    for row in rows {
        out.get_mut(row.membership).push(row);
    }
    out
}
