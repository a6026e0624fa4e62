use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Membership, Partitions};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionCounts {
    pub rows: usize,
    /// Rows with a non-zero delta.
    pub highlighted: usize,
    pub inventory_quantity: i64,
    pub reception_quantity: i64,
    pub net_delta: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_rows: usize,
    pub highlighted: usize,
    pub partitions: BTreeMap<String, PartitionCounts>,
}

impl ReconSummary {
    pub fn counts(&self, membership: Membership) -> Option<&PartitionCounts> {
        self.partitions.get(&membership.to_string())
    }

    pub fn has_differences(&self) -> bool {
        self.highlighted > 0
    }
}

/// Compute summary statistics over the (filtered) partitions.
pub fn compute_summary(partitions: &Partitions) -> ReconSummary {
    let mut summary = ReconSummary::default();

    for (membership, rows) in partitions.iter() {
        let mut counts = PartitionCounts::default();
        for row in rows {
            counts.rows += 1;
            if row.is_highlighted() {
                counts.highlighted += 1;
            }
            counts.inventory_quantity = counts.inventory_quantity.saturating_add(row.inventory_quantity);
            counts.reception_quantity = counts.reception_quantity.saturating_add(row.reception_quantity);
            counts.net_delta = counts.net_delta.saturating_add(row.delta);
        }
        summary.total_rows += counts.rows;
        summary.highlighted += counts.highlighted;
        summary.partitions.insert(membership.to_string(), counts);
    }

    summary
}
