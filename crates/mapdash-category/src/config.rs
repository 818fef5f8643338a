use mapdash_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryWidgetConfig {
    /// Dataview endpoint; empty until the map has been instantiated.
    pub url: String,
    pub column: String,
    #[serde(default = "default_aggregation")]
    pub aggregation: String,
    pub aggregation_column: Option<String>,
    pub bounding_box: String,
    /// Refetch when the map viewport moves.
    #[serde(default = "default_true")]
    pub bbox: bool,
    /// Refetch when the dataview url changes.
    #[serde(default = "default_true")]
    pub sync: bool,
    pub collapsed: bool,
    pub locked: bool,
    pub category_colors: bool,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
}

fn default_aggregation() -> String {
    "count".to_string()
}
fn default_true() -> bool {
    true
}
fn default_items_per_page() -> usize {
    6
}

impl Default for CategoryWidgetConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            column: String::new(),
            aggregation: default_aggregation(),
            aggregation_column: None,
            bounding_box: String::new(),
            bbox: true,
            sync: true,
            collapsed: false,
            locked: false,
            category_colors: false,
            items_per_page: default_items_per_page(),
        }
    }
}

impl CategoryWidgetConfig {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_bounding_box(mut self, bounding_box: impl Into<String>) -> Self {
        self.bounding_box = bounding_box.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::require([
            ("column", !self.column.trim().is_empty()),
            ("aggregation", !self.aggregation.trim().is_empty()),
        ])?;
        if self.items_per_page == 0 {
            return Err(ConfigError::Invalid(
                "itemsPerPage must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let config = CategoryWidgetConfig::from_json_str(r#"{"column":"city"}"#).expect("config");
        assert_eq!(config.aggregation, "count");
        assert!(config.bbox);
        assert!(config.sync);
        assert!(!config.locked);
        assert_eq!(config.items_per_page, 6);
    }

    #[test]
    fn camel_case_keys_are_read() {
        let config = CategoryWidgetConfig::from_json_str(
            r#"{
                "column": "city",
                "aggregationColumn": "pop",
                "boundingBox": "0,0,1,1",
                "itemsPerPage": 3
            }"#,
        )
        .expect("config");
        assert_eq!(config.aggregation_column.as_deref(), Some("pop"));
        assert_eq!(config.bounding_box, "0,0,1,1");
        assert_eq!(config.items_per_page, 3);
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let err = CategoryWidgetConfig::from_json_str(r#"{"aggregation":""}"#).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingOptions(vec!["column".to_string(), "aggregation".to_string()])
        );
    }

    #[test]
    fn zero_items_per_page_is_rejected() {
        let err = CategoryWidgetConfig::from_json_str(r#"{"column":"c","itemsPerPage":0}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
