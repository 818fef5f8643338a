use mapdash_core::{CategoryDataset, CategoryRecord, RawCategory};

use crate::colors::ColorAssigner;
use crate::locked::LockedSet;

/// What a result list should show once the search page is rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRender<'a> {
    /// Nothing matched; the placeholder echoes the query.
    Placeholder { query: &'a str },
    /// Results grouped into pages of `items_per_page` records.
    Pages(Vec<&'a [CategoryRecord]>),
}

/// Query plus the result view it produced.
///
/// Results start as a snapshot of the widget data taken by [`set_data`] and
/// are replaced by the server's answer to each committed query. Later
/// refetches of the widget do not touch them.
///
/// [`set_data`]: SearchState::set_data
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    query: String,
    url: String,
    bounding_box: String,
    results: CategoryDataset,
    search_applied: bool,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn is_valid(&self) -> bool {
        !self.query.trim().is_empty()
    }

    pub fn set_endpoint(&mut self, url: impl Into<String>, bounding_box: impl Into<String>) {
        self.url = url.into();
        self.bounding_box = bounding_box.into();
    }

    pub fn url(&self) -> String {
        format!(
            "{}/search?q={}&bbox={}",
            self.url,
            urlencoding::encode(&self.query),
            self.bounding_box
        )
    }

    pub fn set_data(&mut self, snapshot: CategoryDataset) {
        self.results = snapshot;
    }

    pub fn reset_data(&mut self) {
        self.query.clear();
        self.results = CategoryDataset::default();
        self.search_applied = false;
    }

    /// Replace the results with a server answer. Locked names come back
    /// selected so they can be toggled from the result list.
    pub fn apply_results(
        &mut self,
        categories: &[RawCategory],
        locked: &LockedSet,
        colors: &ColorAssigner,
    ) {
        let records = categories
            .iter()
            .map(|raw| CategoryRecord {
                name: raw.category.clone(),
                value: raw.value,
                agg: raw.agg,
                selected: locked.is_item_locked(&raw.category).is_some(),
                color: colors.color_by_category(&raw.category),
            })
            .collect();
        self.results.reset(records);
        self.search_applied = true;
    }

    /// Re-derive `selected` after the locked set changed.
    pub fn sync_selection(&mut self, locked: &LockedSet) {
        for record in self.results.records_mut() {
            record.selected = locked.is_item_locked(&record.name).is_some();
        }
    }

    pub fn results(&self) -> &CategoryDataset {
        &self.results
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    pub fn is_search_applied(&self) -> bool {
        self.search_applied
    }

    pub fn pages(&self, items_per_page: usize) -> Vec<&[CategoryRecord]> {
        self.results
            .records()
            .chunks(items_per_page.max(1))
            .collect()
    }

    pub fn render_plan(&self, items_per_page: usize) -> SearchRender<'_> {
        if self.result_count() == 0 {
            SearchRender::Placeholder { query: &self.query }
        } else {
            SearchRender::Pages(self.pages(items_per_page))
        }
    }
}
