// Application settings
// Loaded from ~/.config/stockcheck/settings.json (STOCKCHECK_CONFIG overrides)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use stockcheck_recon::{DEFAULT_EXPORT_FILE_NAME, DEFAULT_HIGHLIGHT_RGB};

use crate::Color;

/// Environment variable naming an alternative settings file
pub const CONFIG_ENV: &str = "STOCKCHECK_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Report
    #[serde(rename = "report.highlightColor")]
    pub highlight_color: String,

    // Export
    #[serde(rename = "export.fileName")]
    pub export_file_name: String,

    #[serde(rename = "export.freezeHeader")]
    pub freeze_header: bool,

    #[serde(rename = "export.autofilter")]
    pub autofilter: bool,

    // Terminal output
    #[serde(rename = "view.maxRows")]
    pub max_rows: Option<usize>, // per partition, None = all
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            highlight_color: Color::from_hex(DEFAULT_HIGHLIGHT_RGB).to_css(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            freeze_header: true,
            autofilter: true,
            max_rows: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stockcheck");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`; a missing file is created with defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(path);
            return settings;
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Highlight color as 0xRRGGBB. Unparseable values fall back to the default.
    pub fn highlight_rgb(&self) -> u32 {
        match Color::parse(&self.highlight_color) {
            Some(color) => color.to_hex(),
            None => {
                log::warn!(
                    "invalid report.highlightColor {:?}, using {}",
                    self.highlight_color,
                    Color::from_hex(DEFAULT_HIGHLIGHT_RGB).to_css()
                );
                DEFAULT_HIGHLIGHT_RGB
            }
        }
    }

    /// Export file name, or the default when blank
    pub fn export_file_name(&self) -> &str {
        let name = self.export_file_name.trim();
        if name.is_empty() {
            DEFAULT_EXPORT_FILE_NAME
        } else {
            name
        }
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {}", e);
                return;
            }
        }

        let default_config = format!(
            r#"{{
    // Fill color for rows whose quantities differ (#RRGGBB)
    "report.highlightColor": "{}",

    // Report workbook
    "export.fileName": "{}",
    "export.freezeHeader": true,
    "export.autofilter": true,

    // Rows printed per partition by `stockcheck compare` (null = all)
    "view.maxRows": null
}}
"#,
            Color::from_hex(DEFAULT_HIGHLIGHT_RGB).to_css(),
            DEFAULT_EXPORT_FILE_NAME
        );

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("error writing default settings.json: {}", e);
        }
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}
