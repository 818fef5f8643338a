use mapdash_core::{
    CategoryDataset, CategoryPayload, CategoryRecord, Color, ConfigError, FetchFailure, RawCategory,
};
use mapdash_events::telemetry::{
    fetch_aborted, fetch_failure, fetch_stale, fetch_start, fetch_success,
};
use mapdash_events::{
    EventBus, FetchBoundary, FetchRequest, FetchResponse, FetchTarget, RequestId, ResponseStream,
    Subscription, WidgetEvent,
};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::colors::ColorAssigner;
use crate::config::CategoryWidgetConfig;
use crate::filter::FilterState;
use crate::locked::LockedSet;
use crate::range::RangeAggregator;
use crate::search::{SearchRender, SearchState};

/// Attributes whose change while collapsed makes the data stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSnapshot {
    pub url: String,
    pub bounding_box: String,
}

impl AttrSnapshot {
    pub fn changed_since(&self, earlier: &AttrSnapshot) -> bool {
        self != earlier
    }
}

/// Summary fields that travel with an aggregation response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySummary {
    pub nulls: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: Option<f64>,
    pub categories_count: Option<u64>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: RequestId,
    issued_at: Instant,
}

/// State of one category widget: data, filter, locked selection, search and
/// colors, kept consistent across asynchronous fetches.
///
/// Requests go out through a [`FetchBoundary`]; answers come back through
/// [`handle_response`](Self::handle_response) or
/// [`process_responses`](Self::process_responses). Only the latest request per
/// [`FetchTarget`] is honored, older answers are dropped.
pub struct CategoryWidgetModel {
    config: CategoryWidgetConfig,
    data: CategoryDataset,
    summary: CategorySummary,
    filter: FilterState,
    locked: LockedSet,
    search: SearchState,
    colors: ColorAssigner,
    range: RangeAggregator,
    previous_attrs: Option<AttrSnapshot>,
    boundary: Box<dyn FetchBoundary>,
    responses: ResponseStream,
    in_flight: HashMap<FetchTarget, InFlight>,
    events: EventBus,
}

impl CategoryWidgetModel {
    pub fn new(
        config: CategoryWidgetConfig,
        boundary: impl FetchBoundary + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let responses = boundary.subscribe_responses();

        let mut model = Self {
            config,
            data: CategoryDataset::default(),
            summary: CategorySummary::default(),
            filter: FilterState::new(),
            locked: LockedSet::new(),
            search: SearchState::new(),
            colors: ColorAssigner::new(),
            range: RangeAggregator::new(),
            previous_attrs: None,
            boundary: Box::new(boundary),
            responses,
            in_flight: HashMap::new(),
            events: EventBus::new(),
        };
        model.sync_internal_models();
        Ok(model)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    pub fn config(&self) -> &CategoryWidgetConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Dataview url with viewport and own-filter parameters.
    pub fn url(&self) -> String {
        format!(
            "{}?bbox={}&own_filter={}",
            self.config.url,
            self.config.bounding_box,
            if self.config.locked { 1 } else { 0 }
        )
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if self.config.url == url {
            return;
        }
        self.config.url = url;
        self.sync_internal_models();

        if self.config.sync && !self.config.collapsed {
            self.fetch();
        }
    }

    pub fn bounding_box(&self) -> &str {
        &self.config.bounding_box
    }

    pub fn set_bounding_box(&mut self, bounding_box: impl Into<String>) {
        let bounding_box = bounding_box.into();
        if self.config.bounding_box == bounding_box {
            return;
        }
        self.config.bounding_box = bounding_box;
        self.search
            .set_endpoint(self.config.url.clone(), self.config.bounding_box.clone());

        // A viewport pan must not throw away an applied search.
        if self.config.bbox && !self.is_search_applied() && !self.config.collapsed {
            self.fetch();
        }
    }

    pub fn set_sync(&mut self, sync: bool) {
        self.config.sync = sync;
    }

    pub fn is_collapsed(&self) -> bool {
        self.config.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        if self.config.collapsed == collapsed {
            return;
        }
        self.config.collapsed = collapsed;

        if collapsed {
            self.previous_attrs = Some(self.attr_snapshot());
            return;
        }

        let stale = match self.previous_attrs.take() {
            Some(previous) => self.attr_snapshot().changed_since(&previous),
            // Created collapsed: nothing was ever fetched.
            None => true,
        };
        if stale {
            self.fetch();
        } else {
            debug!(column = %self.config.column, "expanded without attribute changes");
        }
    }

    pub fn attr_snapshot(&self) -> AttrSnapshot {
        AttrSnapshot {
            url: self.config.url.clone(),
            bounding_box: self.config.bounding_box.clone(),
        }
    }

    fn sync_internal_models(&mut self) {
        self.search
            .set_endpoint(self.config.url.clone(), self.config.bounding_box.clone());
        if self.range.set_url(&self.config.url) {
            let url = self.range.url().to_string();
            self.issue(FetchTarget::Range, url);
        }
    }

    // ------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------

    pub fn fetch(&mut self) {
        let url = self.url();
        self.issue(FetchTarget::Main, url);
    }

    /// Re-run the search when one is applied, the main fetch otherwise.
    pub fn refresh(&mut self) {
        if self.is_search_applied() {
            let url = self.search.url();
            self.issue(FetchTarget::Search, url);
        } else {
            self.fetch();
        }
    }

    pub fn is_fetching(&self, target: FetchTarget) -> bool {
        self.in_flight.contains_key(&target)
    }

    fn issue(&mut self, target: FetchTarget, url: String) {
        let request = FetchRequest::new(target, url);
        fetch_start(target, request.id, &request.url);
        // A newer request supersedes whatever is outstanding for the target.
        self.in_flight.insert(
            target,
            InFlight {
                id: request.id,
                issued_at: Instant::now(),
            },
        );
        if target != FetchTarget::Range {
            self.events.publish(WidgetEvent::Loading { target });
        }

        let id = request.id;
        if let Err(error) = self.boundary.publish_request(request) {
            warn!(fetch_target = %target, error = %error, "failed to publish fetch request");
            self.in_flight.remove(&target);
            self.fail(target, id, FetchFailure::new(None, "error", error.to_string()));
        }
    }

    /// Handle every response the boundary has queued. Returns how many were
    /// taken off the queue, stale ones included.
    pub fn process_responses(&mut self) -> usize {
        let pending: Vec<FetchResponse> = self.responses.try_iter().collect();
        let count = pending.len();
        for response in pending {
            self.handle_response(response);
        }
        count
    }

    pub fn handle_response(&mut self, response: FetchResponse) {
        let target = response.target;
        let current = match self.in_flight.get(&target) {
            Some(in_flight) if in_flight.id == response.id => *in_flight,
            _ => {
                fetch_stale(target, response.id);
                return;
            }
        };
        self.in_flight.remove(&target);

        let payload = response.result.and_then(|body| {
            serde_json::from_value::<CategoryPayload>(body)
                .map_err(|e| FetchFailure::new(None, "parsererror", e.to_string()))
        });
        let payload = match payload {
            Ok(payload) => payload,
            Err(failure) => {
                self.fail(target, response.id, failure);
                return;
            }
        };

        fetch_success(
            target,
            response.id,
            Some(current.issued_at.elapsed().as_millis()),
        );
        match target {
            FetchTarget::Main => {
                self.parse(payload);
                self.events.publish(WidgetEvent::Sync { target });
            }
            FetchTarget::Search => {
                self.search
                    .apply_results(&payload.categories, &self.locked, &self.colors);
                self.publish_search_data();
                self.events.publish(WidgetEvent::Sync { target });
            }
            FetchTarget::Range => {
                if self.range.apply_payload(&payload) {
                    self.events.publish(WidgetEvent::TotalCountChanged {
                        total_count: self.range.total_count(),
                    });
                }
            }
        }
    }

    fn fail(&mut self, target: FetchTarget, id: RequestId, failure: FetchFailure) {
        if failure.is_abort() {
            fetch_aborted(target, id);
            return;
        }
        fetch_failure(target, id, Some(failure.to_string()));
        if target != FetchTarget::Range {
            self.events.publish(WidgetEvent::Error {
                target,
                detail: failure,
            });
        }
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    pub fn set_categories(&mut self, categories: &[RawCategory]) {
        let records = self.parse_data(categories);
        self.replace_data(records);
    }

    /// Take in a full aggregation response.
    pub fn parse(&mut self, payload: CategoryPayload) {
        let records = self.parse_data(&payload.categories);
        self.summary = CategorySummary {
            nulls: payload.nulls,
            min: payload.min,
            max: payload.max,
            count: payload.count,
            categories_count: payload.categories_count,
        };
        self.replace_data(records);
    }

    fn parse_data(&mut self, categories: &[RawCategory]) -> Vec<CategoryRecord> {
        let accepted = self.filter.accepted().to_vec();

        let mut seen = HashSet::new();
        let names: Vec<&str> = categories
            .iter()
            .map(|raw| raw.category.as_str())
            .chain(accepted.iter().map(String::as_str))
            .filter(|name| seen.insert(*name))
            .collect();
        self.colors.update_data(&names);

        let mut present = HashSet::new();
        let mut records: Vec<CategoryRecord> = categories
            .iter()
            .map(|raw| {
                present.insert(raw.category.as_str());
                CategoryRecord {
                    name: raw.category.clone(),
                    value: raw.value,
                    agg: raw.agg,
                    selected: !self.filter.is_rejected(&raw.category),
                    color: self.colors.color_by_category(&raw.category),
                }
            })
            .collect();

        if self.config.locked {
            // Locked names stay visible even when the server window drops them.
            for name in accepted.iter().filter(|name| !present.contains(name.as_str())) {
                records.push(CategoryRecord {
                    name: name.clone(),
                    value: 0.0,
                    agg: false,
                    selected: true,
                    color: self.colors.color_by_category(name),
                });
            }
        }
        records
    }

    fn replace_data(&mut self, records: Vec<CategoryRecord>) {
        self.data.reset(records);
        self.events.publish(WidgetEvent::DataChanged {
            size: self.data.len(),
        });
        if self.is_color_applied() {
            self.apply_category_colors();
        }
    }

    pub fn data(&self) -> &CategoryDataset {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of distinct categories the server reported.
    pub fn count(&self) -> Option<u64> {
        self.summary.categories_count
    }

    pub fn summary(&self) -> &CategorySummary {
        &self.summary
    }

    pub fn total_count(&self) -> f64 {
        self.range.total_count()
    }

    /// Distinct categories in the whole dataset, as reported by the
    /// unfiltered range fetch.
    pub fn total_categories_count(&self) -> Option<u64> {
        self.range.categories_count()
    }

    pub fn is_other_available(&self) -> bool {
        self.data.is_other_available()
    }

    // ------------------------------------------------------------------
    // Colors
    // ------------------------------------------------------------------

    pub fn apply_category_colors(&mut self) {
        self.config.category_colors = true;
        let colors: Vec<(String, Color)> = self
            .data
            .iter()
            .map(|record| (record.name.clone(), record.color.clone()))
            .collect();
        info!(column = %self.config.column, categories = colors.len(), "applying category colors");
        self.events
            .publish(WidgetEvent::ApplyCategoryColors { colors });
    }

    pub fn cancel_category_colors(&mut self) {
        self.config.category_colors = false;
        self.events.publish(WidgetEvent::CancelCategoryColors);
    }

    pub fn is_color_applied(&self) -> bool {
        self.config.category_colors
    }

    // ------------------------------------------------------------------
    // Locked collection
    // ------------------------------------------------------------------

    pub fn locked(&self) -> &LockedSet {
        &self.locked
    }

    pub fn locked_size(&self) -> usize {
        self.locked.len()
    }

    pub fn is_locked(&self) -> bool {
        self.config.locked
    }

    pub fn add_locked_item(&mut self, name: impl Into<String>) {
        if self.locked.add_item(name) {
            self.publish_lock_collection();
        }
    }

    pub fn remove_locked_item(&mut self, name: &str) {
        if self.locked.remove_item(name) {
            self.publish_lock_collection();
        }
    }

    pub fn can_be_locked(&self) -> bool {
        self.is_locked() || self.accepted_count() > 0
    }

    pub fn can_apply_locked(&self) -> bool {
        if self.filter.accepted_count() != self.locked.len() {
            return true;
        }
        self.filter
            .accepted()
            .iter()
            .any(|name| self.locked.is_item_locked(name).is_none())
    }

    /// Make the locked names the whole filter. Returns false, after unlocking,
    /// when nothing is locked.
    pub fn apply_locked(&mut self) -> bool {
        let current_locked = self.locked.items_name().to_vec();
        if current_locked.is_empty() {
            self.unlock_categories();
            return false;
        }
        info!(
            column = %self.config.column,
            locked = current_locked.len(),
            "applying locked categories"
        );
        self.set_locked(true);
        self.filter.clean_filter();
        self.filter.accept(current_locked);
        self.apply_filter();
        self.clean_search();
        true
    }

    pub fn lock_categories(&mut self) {
        self.set_locked(true);
        self.fetch();
    }

    pub fn unlock_categories(&mut self) {
        self.set_locked(false);
        self.accept_all();
    }

    fn set_locked(&mut self, locked: bool) {
        if self.config.locked != locked {
            self.config.locked = locked;
            self.events.publish(WidgetEvent::LockedChanged { locked });
        }
    }

    fn publish_lock_collection(&mut self) {
        self.search.sync_selection(&self.locked);
        self.events.publish(WidgetEvent::LockCollectionChanged {
            names: self.locked.items_name().to_vec(),
        });
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    pub fn search_query(&self) -> &str {
        self.search.query()
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search.set_query(query);
    }

    pub fn is_search_valid(&self) -> bool {
        self.search.is_valid()
    }

    pub fn search_result(&self) -> &CategoryDataset {
        self.search.results()
    }

    pub fn search_count(&self) -> usize {
        self.search.result_count()
    }

    pub fn search_render_plan(&self) -> SearchRender<'_> {
        self.search.render_plan(self.config.items_per_page)
    }

    /// Send the current query to the search endpoint. Blank queries are not sent.
    pub fn apply_search(&mut self) -> bool {
        if !self.search.is_valid() {
            debug!(column = %self.config.column, "ignoring blank search query");
            return false;
        }
        let url = self.search.url();
        self.issue(FetchTarget::Search, url);
        true
    }

    pub fn is_search_applied(&self) -> bool {
        self.search.is_search_applied()
    }

    pub fn clean_search(&mut self) {
        if self.locked.remove_items() {
            self.publish_lock_collection();
        }
        self.in_flight.remove(&FetchTarget::Search);
        self.search.reset_data();
        self.publish_search_data();
    }

    /// Seed the locked set with the accepted names and snapshot the current
    /// data for the search panel.
    pub fn setup_search(&mut self) {
        if self.is_search_applied() {
            return;
        }
        let accepted = self.filter.accepted().to_vec();
        if self.locked.add_items(accepted) {
            self.publish_lock_collection();
        }
        self.search.set_data(self.data.clone());
        self.publish_search_data();
    }

    fn publish_search_data(&self) {
        self.events.publish(WidgetEvent::SearchDataChanged {
            result_count: self.search.result_count(),
        });
    }

    // ------------------------------------------------------------------
    // Filter
    // ------------------------------------------------------------------

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn accepted_count(&self) -> usize {
        self.filter.accepted_count()
    }

    pub fn rejected_count(&self) -> usize {
        self.filter.rejected_count()
    }

    pub fn accept_filters<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.accept(names);
        self.apply_filter();
    }

    pub fn reject_filters<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.reject(names);
        self.apply_filter();
    }

    pub fn accept_all(&mut self) {
        self.filter.accept_all();
        self.apply_filter();
    }

    pub fn reject_all(&mut self) {
        self.filter.reject_all();
        self.apply_filter();
    }

    pub fn is_all_filters_rejected(&self) -> bool {
        self.filter.is_reject_all()
    }

    fn apply_filter(&mut self) {
        for record in self.data.records_mut() {
            record.selected = !self.filter.is_rejected(&record.name);
        }
        self.events.publish(WidgetEvent::FilterChanged {
            accepted: self.filter.accepted().to_vec(),
            rejected: self.filter.rejected().to_vec(),
            reject_all: self.filter.is_reject_all(),
        });
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Dataview definition sent with the map configuration.
    pub fn to_widget_json(&self) -> Value {
        json!({
            "type": "aggregation",
            "options": {
                "column": self.config.column,
                "aggregation": self.config.aggregation,
                "aggregationColumn": self.config.aggregation_column,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapdash_events::InMemoryBoundary;

    fn model() -> (CategoryWidgetModel, InMemoryBoundary) {
        let boundary = InMemoryBoundary::new();
        let model = CategoryWidgetModel::new(CategoryWidgetConfig::new("city"), boundary.clone())
            .expect("valid config");
        (model, boundary)
    }

    #[test]
    fn url_carries_bbox_and_own_filter() {
        let (mut model, _boundary) = model();
        model.config.url = "http://host/dv".to_string();
        model.config.bounding_box = "1,2,3,4".to_string();
        assert_eq!(model.url(), "http://host/dv?bbox=1,2,3,4&own_filter=0");

        model.config.locked = true;
        assert_eq!(model.url(), "http://host/dv?bbox=1,2,3,4&own_filter=1");
    }

    #[test]
    fn attr_snapshot_detects_changes() {
        let before = AttrSnapshot {
            url: "a".to_string(),
            bounding_box: "b".to_string(),
        };
        let mut after = before.clone();
        assert!(!after.changed_since(&before));
        after.bounding_box = "c".to_string();
        assert!(after.changed_since(&before));
    }

    #[test]
    fn invalid_config_fails_fast() {
        let result =
            CategoryWidgetModel::new(CategoryWidgetConfig::default(), InMemoryBoundary::new());
        assert!(matches!(
            result,
            Err(ConfigError::MissingOptions(fields)) if fields == vec!["column".to_string()]
        ));
    }

    #[test]
    fn widget_json_describes_aggregation() {
        let (model, _boundary) = model();
        let value = model.to_widget_json();
        assert_eq!(value["type"], "aggregation");
        assert_eq!(value["options"]["column"], "city");
        assert_eq!(value["options"]["aggregation"], "count");
        assert!(value["options"]["aggregationColumn"].is_null());
    }

    #[test]
    fn filter_changes_refresh_selected_flags() {
        let (mut model, _boundary) = model();
        model.set_categories(&[RawCategory::new("a", 1.0), RawCategory::new("b", 2.0)]);
        model.reject_filters(["a"]);
        let selected: Vec<bool> = model.data().iter().map(|r| r.selected).collect();
        assert_eq!(selected, vec![false, true]);

        model.accept_all();
        assert!(model.data().iter().all(|r| r.selected));
    }
}
