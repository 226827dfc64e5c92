//! Shared fixtures for the integration tests.

use std::path::PathBuf;

use geo::Coord;
use geojson::JsonObject;
use waymark_lib::{
    read_network, GraphOptions, LineFeature, Network, PathFinder, PathFinderBuilder, Weight,
};

/// Path to the fixtures directory shared with the CLI tests.
#[allow(dead_code)]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../docs/fixtures")
}

#[allow(dead_code)]
pub fn fixture_network() -> Network<JsonObject> {
    read_network(&fixtures_dir().join("network.geojson")).expect("fixture network loads")
}

#[allow(dead_code)]
pub fn c(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

/// Planar length, forward only when the line is tagged `oneway`.
#[allow(dead_code)]
pub fn oneway_weight(from: Coord<f64>, to: Coord<f64>, properties: &JsonObject) -> Option<Weight> {
    let length = (to.x - from.x).hypot(to.y - from.y);
    let oneway = properties
        .get("oneway")
        .and_then(|value| value.as_bool())
        .unwrap_or(false);
    Some(if oneway {
        Weight::forward(length)
    } else {
        Weight::Symmetric(length)
    })
}

/// Feature ids folded without consecutive repeats.
#[allow(dead_code)]
pub fn fixture_finder_with_ids() -> PathFinder<Vec<u64>> {
    PathFinderBuilder::new(GraphOptions::default())
        .weight(oneway_weight)
        .edge_data(
            |properties: &JsonObject| {
                properties
                    .get("id")
                    .and_then(|id| id.as_u64())
                    .into_iter()
                    .collect::<Vec<u64>>()
            },
            |accumulated: &Vec<u64>, next: &Vec<u64>| {
                let mut merged = accumulated.clone();
                for id in next {
                    if merged.last() != Some(id) {
                        merged.push(*id);
                    }
                }
                merged
            },
        )
        .build(&fixture_network())
        .expect("fixture builds")
}

#[allow(dead_code)]
pub fn fixture_finder() -> PathFinder<()> {
    PathFinderBuilder::new(GraphOptions::default())
        .weight(oneway_weight)
        .build(&fixture_network())
        .expect("fixture builds")
}

/// Square grid of unit segments, `size` vertices per side.
#[allow(dead_code)]
pub fn grid_network(size: usize) -> Network<()> {
    let mut features = Vec::new();
    for row in 0..size {
        let y = row as f64;
        let horizontal = (0..size).map(|col| c(col as f64, y));
        features.push(LineFeature::new(horizontal, ()));
        let x = row as f64;
        let vertical = (0..size).map(|r| c(x, r as f64));
        features.push(LineFeature::new(vertical, ()));
    }
    Network::new(features)
}

#[allow(dead_code)]
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
