// Application settings
// Loaded from ~/.config/csvdb/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use csvdb_engine::column::ColumnType;

/// How `view` prints a projection when no `--format` is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned text table
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // New columns
    #[serde(rename = "columns.newColumnName")]
    pub new_column_name: String,

    #[serde(rename = "columns.newColumnType")]
    pub new_column_type: ColumnType,

    // New views
    #[serde(rename = "views.newViewName")]
    pub new_view_name: String,

    // Output
    #[serde(rename = "output.maxCellWidth")]
    pub max_cell_width: usize,

    #[serde(rename = "output.format")]
    pub output_format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            new_column_name: "New Column".to_string(),
            new_column_type: ColumnType::Text,
            new_view_name: "View".to_string(),
            max_cell_width: 24,
            output_format: OutputFormat::Table,
        }
    }
}

const DEFAULT_CONFIG: &str = r#"{
    // Name and type given to columns added without one
    "columns.newColumnName": "New Column",
    // One of: "text", "number", "date", "checkbox", "select", "multiselect"
    "columns.newColumnType": "text",

    // Base name for new views ("View", "View 2", ...)
    "views.newViewName": "View",

    // Table output: cells wider than this are truncated with an ellipsis
    "output.maxCellWidth": 24,
    // Default for `csvdb view`: "table", "csv" or "json"
    "output.format": "table"
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("csvdb");
        config_dir.join("settings.json")
    }

    /// Load settings from the user config dir, creating a commented default file on first run
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit path. Never writes; falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Error parsing {}: {}. Using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings text. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    /// Save current settings to the user config dir
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }
}
