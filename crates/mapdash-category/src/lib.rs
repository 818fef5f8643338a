//! Category widget state: the data model behind a dashboard category list,
//! with accept/reject filtering, locked selections, search and per-category
//! colors.

pub mod colors;
pub mod config;
pub mod filter;
pub mod locked;
pub mod model;
pub mod range;
pub mod search;

pub use colors::{ColorAssigner, DEFAULT_PALETTE, OTHER_CATEGORY, OTHER_COLOR};
pub use config::CategoryWidgetConfig;
pub use filter::FilterState;
pub use locked::LockedSet;
pub use model::{AttrSnapshot, CategorySummary, CategoryWidgetModel};
pub use range::RangeAggregator;
pub use search::{SearchRender, SearchState};
