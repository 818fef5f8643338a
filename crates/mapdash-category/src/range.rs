use mapdash_core::CategoryPayload;

/// Total of all category values for the widget's column, fetched from the
/// unfiltered endpoint on its own schedule.
#[derive(Debug, Clone, Default)]
pub struct RangeAggregator {
    url: String,
    total_count: f64,
    categories_count: Option<u64>,
}

impl RangeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the url changed and a fetch is due.
    pub fn set_url(&mut self, url: &str) -> bool {
        if self.url == url {
            return false;
        }
        self.url = url.to_string();
        !self.url.is_empty()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns true when `total_count` changed.
    pub fn apply_payload(&mut self, payload: &CategoryPayload) -> bool {
        let total = payload
            .count
            .unwrap_or_else(|| payload.categories.iter().map(|c| c.value).sum());
        self.categories_count = payload.categories_count;

        if total == self.total_count {
            return false;
        }
        self.total_count = total;
        true
    }

    pub fn total_count(&self) -> f64 {
        self.total_count
    }

    pub fn categories_count(&self) -> Option<u64> {
        self.categories_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapdash_core::RawCategory;

    #[test]
    fn empty_or_unchanged_url_needs_no_fetch() {
        let mut range = RangeAggregator::new();
        assert!(!range.set_url(""));
        assert!(range.set_url("http://host/dataview"));
        assert!(!range.set_url("http://host/dataview"));
    }

    #[test]
    fn total_prefers_server_count() {
        let mut range = RangeAggregator::new();
        let payload = CategoryPayload {
            categories: vec![RawCategory::new("a", 2.0), RawCategory::new("b", 3.0)],
            count: Some(40.0),
            categories_count: Some(7),
            ..Default::default()
        };
        assert!(range.apply_payload(&payload));
        assert_eq!(range.total_count(), 40.0);
        assert_eq!(range.categories_count(), Some(7));
        assert!(!range.apply_payload(&payload));
    }

    #[test]
    fn total_falls_back_to_sum_of_values() {
        let mut range = RangeAggregator::new();
        let payload = CategoryPayload {
            categories: vec![RawCategory::new("a", 2.0), RawCategory::new("b", 3.0)],
            ..Default::default()
        };
        range.apply_payload(&payload);
        assert_eq!(range.total_count(), 5.0);
    }
}
