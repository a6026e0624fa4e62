use serde::{Deserialize, Serialize};

/// Column holding the join key, identical on both sheets.
pub const CODE_COLUMN: &str = "Code article";
/// Optional free-text label column, identical on both sheets.
pub const LABEL_COLUMN: &str = "Libelle";

/// Default highlight fill for rows whose delta is non-zero (0xRRGGBB).
pub const DEFAULT_HIGHLIGHT_RGB: u32 = 0xFFF2AC;

/// File name offered for the downloaded report.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "Comparaison_Inventaire_Reception.xlsx";

/// Largest accepted quantity magnitude (2^52). Any difference of two
/// quantities stays within 2^53, so it survives the f64 cells of the export.
pub const MAX_QUANTITY: i64 = 1 << 52;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A single cell as read from the source workbook, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// String rendering used for codes and labels. Integral numbers drop
    /// their fractional part so `1001.0` reads back as `"1001"`.
    pub fn display_string(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Self::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        }
    }
}

/// One worksheet: trimmed header names plus the data rows beneath them.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawSheet {
    /// Build a sheet from a header row and data rows. Header names are
    /// trimmed here, so lookups match exactly afterwards.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<RawCell>>) -> Self {
        Self {
            name: name.into(),
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows,
        }
    }

    /// Index of the first column whose trimmed name equals `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// All sheets of an uploaded workbook, in workbook order.
#[derive(Debug, Clone, Default)]
pub struct RawWorkbook {
    pub sheets: Vec<RawSheet>,
}

impl RawWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

/// Borrowed view of one source row, resolved against a role's columns.
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    pub code: &'a RawCell,
    pub label: Option<&'a RawCell>,
    pub quantity: Option<&'a RawCell>,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Inventory,
    Reception,
}

impl Role {
    /// Sheet name in the uploaded workbook. Fixed contract.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Inventory => "Inventaire",
            Self::Reception => "Reception",
        }
    }

    pub fn quantity_column(&self) -> &'static str {
        match self {
            Self::Inventory => "Qte inventaire",
            Self::Reception => "Qte recue (UVC)",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inventory => write!(f, "inventory"),
            Self::Reception => write!(f, "reception"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical + reconciled rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalRow {
    pub code: String,
    pub label: String,
    pub quantity: i64,
}

/// Per-sheet counters collected while projecting a raw sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub blank_codes_dropped: usize,
    /// Quantity cells that were present but not numeric, coerced to 0.
    pub quantities_coerced: usize,
    pub has_label_column: bool,
}

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub role: Role,
    pub rows: Vec<CanonicalRow>,
    pub stats: LoadStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    Both,
    InventoryOnly,
    ReceptionOnly,
}

impl Membership {
    pub const ALL: [Membership; 3] = [Self::Both, Self::InventoryOnly, Self::ReceptionOnly];

    /// Label written in the membership column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Both => "Commun",
            Self::InventoryOnly => "Seulement Inventaire",
            Self::ReceptionOnly => "Seulement Réception",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }

    /// Export sheet name for this partition.
    pub fn sheet_name(&self) -> &'static str {
        match self {
            Self::Both => "Articles_communs",
            Self::InventoryOnly => "Inventaire_uniquement",
            Self::ReceptionOnly => "Reception_uniquement",
        }
    }

    /// Tab title in the interactive view.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Both => "Articles communs",
            Self::InventoryOnly => "Uniquement Inventaire",
            Self::ReceptionOnly => "Uniquement Réception",
        }
    }
}

impl std::fmt::Display for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Both => write!(f, "both"),
            Self::InventoryOnly => write!(f, "inventory_only"),
            Self::ReceptionOnly => write!(f, "reception_only"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRow {
    pub code: String,
    pub inventory_label: String,
    pub reception_label: String,
    pub inventory_quantity: i64,
    pub reception_quantity: i64,
    pub membership: Membership,
    pub delta: i64,
}

impl ReconciledRow {
    pub fn new(
        code: String,
        inventory: Option<&CanonicalRow>,
        reception: Option<&CanonicalRow>,
    ) -> Self {
        let membership = match (inventory.is_some(), reception.is_some()) {
            (true, true) => Membership::Both,
            (true, false) => Membership::InventoryOnly,
            _ => Membership::ReceptionOnly,
        };
        let inventory_quantity = inventory.map(|r| r.quantity).unwrap_or(0);
        let reception_quantity = reception.map(|r| r.quantity).unwrap_or(0);
        Self {
            code,
            inventory_label: inventory.map(|r| r.label.clone()).unwrap_or_default(),
            reception_label: reception.map(|r| r.label.clone()).unwrap_or_default(),
            inventory_quantity,
            reception_quantity,
            membership,
            // Loaded quantities are bounded by MAX_QUANTITY; hand-built rows saturate
            delta: inventory_quantity.saturating_sub(reception_quantity),
        }
    }

    /// Highlight predicate shared by the interactive view and the export.
    pub fn is_highlighted(&self) -> bool {
        self.delta != 0
    }
}

// ---------------------------------------------------------------------------
// Partitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partitions {
    pub both: Vec<ReconciledRow>,
    pub inventory_only: Vec<ReconciledRow>,
    pub reception_only: Vec<ReconciledRow>,
}

impl Partitions {
    pub fn get(&self, membership: Membership) -> &[ReconciledRow] {
        match membership {
            Membership::Both => &self.both,
            Membership::InventoryOnly => &self.inventory_only,
            Membership::ReceptionOnly => &self.reception_only,
        }
    }

    pub(crate) fn get_mut(&mut self, membership: Membership) -> &mut Vec<ReconciledRow> {
        match membership {
            Membership::Both => &mut self.both,
            Membership::InventoryOnly => &mut self.inventory_only,
            Membership::ReceptionOnly => &mut self.reception_only,
        }
    }

    /// Partitions in export/tab order.
    pub fn iter(&self) -> impl Iterator<Item = (Membership, &[ReconciledRow])> {
        Membership::ALL.into_iter().map(move |m| (m, self.get(m)))
    }

    pub fn len(&self) -> usize {
        self.both.len() + self.inventory_only.len() + self.reception_only.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(code: &str, label: &str, qty: i64) -> CanonicalRow {
        CanonicalRow { code: code.into(), label: label.into(), quantity: qty }
    }

    #[test]
    fn display_string_integral_number() {
        assert_eq!(RawCell::Number(1001.0).display_string(), "1001");
        assert_eq!(RawCell::Number(2.5).display_string(), "2.5");
        assert_eq!(RawCell::Empty.display_string(), "");
    }

    #[test]
    fn headers_trimmed_on_construction() {
        let sheet = RawSheet::new("Inventaire", vec!["  Code article ".into(), "Libelle".into()], vec![]);
        assert_eq!(sheet.column(CODE_COLUMN), Some(0));
        assert_eq!(sheet.column(LABEL_COLUMN), Some(1));
        assert_eq!(sheet.column("libelle"), None);
    }

    #[test]
    fn reconciled_row_one_sided_defaults() {
        let inv = canon("2002", "Widget", 5);
        let row = ReconciledRow::new("2002".into(), Some(&inv), None);
        assert_eq!(row.membership, Membership::InventoryOnly);
        assert_eq!(row.reception_quantity, 0);
        assert_eq!(row.reception_label, "");
        assert_eq!(row.delta, 5);
        assert!(row.is_highlighted());

        let rec = canon("4004", "Gadget", 3);
        let row = ReconciledRow::new("4004".into(), None, Some(&rec));
        assert_eq!(row.membership, Membership::ReceptionOnly);
        assert_eq!(row.delta, -3);
    }

    #[test]
    fn membership_labels_roundtrip() {
        for m in Membership::ALL {
            assert_eq!(Membership::from_label(m.label()), Some(m));
        }
        assert_eq!(Membership::from_label("Commun "), None);
    }
}
