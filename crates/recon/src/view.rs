//! Display-ready tables for interactive front ends.
//!
//! Each partition becomes a [`ViewTable`] whose rows carry the same
//! highlight flag the export's conditional-format rule evaluates.

use serde::Serialize;

use crate::model::{Membership, Partitions, ReconciledRow};

/// Header row shared by the interactive view and the export.
pub const COLUMNS: [&str; 7] = [
    "Code article",
    "Libelle_Inv",
    "Libelle_Rec",
    "Qty_Inv",
    "Qty_Rec",
    "Appartenance",
    "Diff",
];

/// Zero-based index of the delta column in [`COLUMNS`].
pub const DELTA_COLUMN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRow {
    pub cells: Vec<String>,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewTable {
    pub membership: Membership,
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<ViewRow>,
}

impl ViewTable {
    pub fn highlighted_count(&self) -> usize {
        self.rows.iter().filter(|r| r.highlighted).count()
    }
}

/// Cell strings for one row, in [`COLUMNS`] order.
pub fn row_cells(row: &ReconciledRow) -> Vec<String> {
    vec![
        row.code.clone(),
        row.inventory_label.clone(),
        row.reception_label.clone(),
        row.inventory_quantity.to_string(),
        row.reception_quantity.to_string(),
        row.membership.label().to_string(),
        row.delta.to_string(),
    ]
}

pub fn render_table(membership: Membership, rows: &[ReconciledRow]) -> ViewTable {
    ViewTable {
        membership,
        title: membership.title().to_string(),
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| ViewRow { cells: row_cells(r), highlighted: r.is_highlighted() })
            .collect(),
    }
}

/// One table per partition, in tab order.
pub fn render_views(partitions: &Partitions) -> Vec<ViewTable> {
    partitions.iter().map(|(m, rows)| render_table(m, rows)).collect()
}
