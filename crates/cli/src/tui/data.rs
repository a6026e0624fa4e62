use stockcheck_recon::view::DELTA_COLUMN;
use stockcheck_recon::{Evaluation, Membership, ViewTable};

use crate::util::{self, Align};

pub struct TableData {
    /// Row-major cell data (already display-ready strings)
    pub rows: Vec<Vec<String>>,
    /// Per-row highlight flag (quantities differ)
    pub highlighted: Vec<bool>,
    pub num_rows: usize,
    pub num_cols: usize,
    /// Pre-computed column widths (display columns, clamped to [3, 40])
    pub col_widths: Vec<usize>,
    pub col_names: Vec<String>,
    /// Row count before `max_rows` capping
    pub total_rows: usize,
}

impl TableData {
    /// Build from a rendered partition table, keeping at most `max_rows`
    /// rows (0 = unlimited).
    pub fn from_view(view: &ViewTable, max_rows: usize) -> Self {
        let cap = if max_rows == 0 { usize::MAX } else { max_rows };
        let kept: Vec<_> = view.rows.iter().take(cap).collect();
        let rows: Vec<Vec<String>> = kept.iter().map(|r| r.cells.clone()).collect();
        let highlighted = kept.iter().map(|r| r.highlighted).collect();
        let num_cols = view.columns.len();
        let col_widths = Self::compute_widths(&view.columns, &rows, num_cols);
        Self {
            num_rows: rows.len(),
            rows,
            highlighted,
            num_cols,
            col_widths,
            col_names: view.columns.clone(),
            total_rows: view.rows.len(),
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.num_rows < self.total_rows
    }

    pub fn highlighted_count(&self) -> usize {
        self.highlighted.iter().filter(|h| **h).count()
    }

    /// Widest of header and every cell, per column.
    fn compute_widths(col_names: &[String], rows: &[Vec<String>], num_cols: usize) -> Vec<usize> {
        (0..num_cols)
            .map(|c| {
                let header_w = col_names.get(c).map(|s| util::display_width(s)).unwrap_or(0);
                let max_cell = rows
                    .iter()
                    .map(|row| row.get(c).map(|s| util::display_width(s)).unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                header_w.max(max_cell).clamp(3, 40)
            })
            .collect()
    }
}

/// Quantity and Diff columns are right-aligned
pub(crate) fn column_align(col: usize) -> Align {
    if matches!(col, 3 | 4) || col == DELTA_COLUMN {
        Align::Right
    } else {
        Align::Left
    }
}

/// One partition as a tab
pub struct PartitionTab {
    pub membership: Membership,
    pub title: String,
    pub data: TableData,
}

/// Tabs for every partition of an evaluation, in tab order.
pub fn partition_tabs(evaluation: &Evaluation, max_rows: usize) -> Vec<PartitionTab> {
    evaluation
        .views()
        .iter()
        .map(|view| PartitionTab {
            membership: view.membership,
            title: view.title.clone(),
            data: TableData::from_view(view, max_rows),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockcheck_recon::view::COLUMNS;
    use stockcheck_recon::ViewRow;

    fn view(n: usize) -> ViewTable {
        ViewTable {
            membership: Membership::Both,
            title: "Articles communs".into(),
            columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: (0..n)
                .map(|i| ViewRow {
                    cells: vec![
                        format!("{}", 1000 + i),
                        "Un libelle particulierement long pour tester la largeur maximale".into(),
                        "".into(),
                        "1".into(),
                        "0".into(),
                        "Commun".into(),
                        "1".into(),
                    ],
                    highlighted: i % 2 == 0,
                })
                .collect(),
        }
    }

    #[test]
    fn widths_clamped() {
        let data = TableData::from_view(&view(2), 0);
        assert_eq!(data.col_widths[0], "Code article".len());
        assert_eq!(data.col_widths[1], 40);
        assert_eq!(data.col_widths[2], "Libelle_Rec".len());
    }

    #[test]
    fn quantity_columns_right_aligned() {
        let aligns: Vec<Align> = (0..COLUMNS.len()).map(column_align).collect();
        assert_eq!(
            aligns,
            [Align::Left, Align::Left, Align::Left, Align::Right, Align::Right, Align::Left, Align::Right]
        );
    }

    #[test]
    fn max_rows_caps() {
        let data = TableData::from_view(&view(5), 2);
        assert_eq!(data.num_rows, 2);
        assert_eq!(data.total_rows, 5);
        assert!(data.is_truncated());
        assert_eq!(data.highlighted, vec![true, false]);
        assert_eq!(data.highlighted_count(), 1);
    }
}
