//! `stockcheck-recon` - inventory ↔ reception reconciliation engine.
//!
//! Pure engine crate: receives parsed sheets, returns classified, filtered
//! partitions and their display tables. No file or terminal IO.

pub mod engine;
pub mod error;
pub mod evidence;
pub mod filter;
pub mod label;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod partition;
pub mod view;

pub use engine::{run, Evaluation, LoadSummary, ReconSession};
pub use error::{FilterError, ReconError};
pub use evidence::ReconSummary;
pub use model::{
    Membership, Partitions, RawCell, RawSheet, RawWorkbook, ReconciledRow, Role,
    DEFAULT_EXPORT_FILE_NAME, DEFAULT_HIGHLIGHT_RGB, MAX_QUANTITY,
};
pub use view::{ViewRow, ViewTable};
