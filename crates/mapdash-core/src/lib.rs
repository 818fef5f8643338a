use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub mod error;

pub use error::{ConfigError, FetchFailure, ABORT_STATUS};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub String);

impl Color {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One category as rendered by a widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub name: String,
    pub value: f64,
    /// Set when the server folded the long tail into this entry ("Other").
    pub agg: bool,
    pub selected: bool,
    pub color: Color,
}

/// Ordered category records keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryDataset {
    records: Vec<CategoryRecord>,
}

impl CategoryDataset {
    pub fn new(records: Vec<CategoryRecord>) -> Self {
        Self { records }
    }

    /// Replace every record at once.
    pub fn reset(&mut self, records: Vec<CategoryRecord>) {
        self.records = records;
    }

    pub fn records(&self) -> &[CategoryRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut CategoryRecord> {
        self.records.iter_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CategoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CategoryRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.name.as_str()).collect()
    }

    pub fn is_other_available(&self) -> bool {
        self.records.iter().any(|record| record.agg)
    }
}

impl<'a> IntoIterator for &'a CategoryDataset {
    type Item = &'a CategoryRecord;
    type IntoIter = std::slice::Iter<'a, CategoryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Category entry exactly as the aggregation endpoint returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCategory {
    #[serde(deserialize_with = "category_name")]
    pub category: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub agg: bool,
}

impl RawCategory {
    pub fn new(category: impl Into<String>, value: f64) -> Self {
        Self {
            category: category.into(),
            value,
            agg: false,
        }
    }

    pub fn aggregated(category: impl Into<String>, value: f64) -> Self {
        Self {
            agg: true,
            ..Self::new(category, value)
        }
    }
}

/// Body of an aggregation response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPayload {
    #[serde(default)]
    pub categories: Vec<RawCategory>,
    #[serde(default)]
    pub nulls: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub count: Option<f64>,
    #[serde(default, rename = "categoriesCount")]
    pub categories_count: Option<u64>,
}

// Category columns may be numeric or boolean; names are always compared as text.
fn category_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NameRepr {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(match NameRepr::deserialize(deserializer)? {
        NameRepr::Text(text) => text,
        NameRepr::Int(value) => value.to_string(),
        NameRepr::Float(value) => value.to_string(),
        NameRepr::Bool(value) => value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_accepts_numeric_category_names() {
        let payload: CategoryPayload = serde_json::from_str(
            r#"{
                "categories": [
                    {"category": 2010, "value": 4},
                    {"category": "Other", "value": 9, "agg": true}
                ],
                "categoriesCount": 12
            }"#,
        )
        .expect("parse payload");

        assert_eq!(payload.categories[0].category, "2010");
        assert!(!payload.categories[0].agg);
        assert!(payload.categories[1].agg);
        assert_eq!(payload.categories_count, Some(12));
        assert_eq!(payload.nulls, None);
    }

    #[test]
    fn dataset_reports_other_bucket() {
        let record = |name: &str, agg| CategoryRecord {
            name: name.to_string(),
            value: 1.0,
            agg,
            selected: true,
            color: Color::new("#000"),
        };
        let mut dataset = CategoryDataset::new(vec![record("a", false)]);
        assert!(!dataset.is_other_available());

        dataset.reset(vec![record("a", false), record("Other", true)]);
        assert!(dataset.is_other_available());
        assert_eq!(dataset.names(), vec!["a", "Other"]);
        assert!(dataset.contains("Other"));
    }
}
