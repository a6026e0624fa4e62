use serde::Serialize;

use crate::error::{FilterError, ReconError};
use crate::evidence::{compute_summary, ReconSummary};
use crate::filter::filter_rows;
use crate::loader::load_role;
use crate::matcher::outer_join;
use crate::model::{LoadStats, LoadedTable, Partitions, RawWorkbook, ReconciledRow, Role};
use crate::partition::partition;
use crate::view::{render_views, ViewTable};

/// Load statistics for both sheets of one upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub inventory: LoadStats,
    pub reception: LoadStats,
}

/// One upload: both sheets projected and reconciled once.
///
/// Filter changes go through [`ReconSession::evaluate`], which recomputes
/// filter, partition and summary from the reconciled rows every time.
#[derive(Debug, Clone)]
pub struct ReconSession {
    load: LoadSummary,
    reconciled: Vec<ReconciledRow>,
}

impl ReconSession {
    /// Project both sheets and reconcile. Fails on the first load error.
    pub fn from_workbook(workbook: &RawWorkbook) -> Result<Self, ReconError> {
        let inventory = load_role(workbook, Role::Inventory)?;
        let reception = load_role(workbook, Role::Reception)?;
        Ok(Self::from_tables(inventory, reception))
    }

    pub fn from_tables(inventory: LoadedTable, reception: LoadedTable) -> Self {
        let reconciled = outer_join(&inventory.rows, &reception.rows);
        log::debug!(
            "reconciled {} inventory row(s) and {} reception row(s) into {} row(s)",
            inventory.rows.len(),
            reception.rows.len(),
            reconciled.len()
        );
        Self {
            load: LoadSummary { inventory: inventory.stats, reception: reception.stats },
            reconciled,
        }
    }

    pub fn reconciled(&self) -> &[ReconciledRow] {
        &self.reconciled
    }

    pub fn load_summary(&self) -> &LoadSummary {
        &self.load
    }

    /// Filter, partition and summarize the reconciled rows.
    pub fn evaluate(&self, filter: &str) -> Evaluation {
        let filtered = filter_rows(filter, &self.reconciled);
        let partitions = partition(filtered.rows);
        let summary = compute_summary(&partitions);
        log::debug!(
            "filter {:?}: {} of {} row(s) kept, {} with differences",
            filter,
            summary.total_rows,
            self.reconciled.len(),
            summary.highlighted
        );
        Evaluation {
            filter: filter.to_string(),
            partitions,
            summary,
            warning: filtered.warning,
        }
    }
}

/// Result of evaluating one filter string against a session.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub filter: String,
    pub partitions: Partitions,
    pub summary: ReconSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<FilterError>,
}

impl Evaluation {
    pub fn views(&self) -> Vec<ViewTable> {
        render_views(&self.partitions)
    }
}

/// Load, reconcile and evaluate in one call.
pub fn run(workbook: &RawWorkbook, filter: &str) -> Result<Evaluation, ReconError> {
    Ok(ReconSession::from_workbook(workbook)?.evaluate(filter))
}
