//! Read-only views over the loaded exports.
//!
//! Every view is a plain function of the [`Dataset`] and the caller's
//! current selection. Callers re-invoke them when the selection changes.

pub mod explorer;
pub mod trends;
pub mod world;

pub use explorer::{explore, ExploreMode, ExplorerRows, ExplorerView};
pub use trends::{artist_choices, trends, TrendsView};
pub use world::{world_view, WorldMetric, WorldView};

use crate::store::Dataset;
use std::collections::BTreeSet;

/// Distinct years in the summary table, ascending.
pub fn years(dataset: &Dataset) -> Vec<i32> {
    dataset
        .country_year
        .iter()
        .map(|s| s.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The year views open on: the latest one available.
pub fn default_year(dataset: &Dataset) -> Option<i32> {
    years(dataset).last().copied()
}
