use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use geo::Coord;
use geojson::JsonObject;
use waymark_lib::{euclidean_weight, haversine_weight, load_graph, RoutingGraph, Weight};

/// How the length of a line segment is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Metric {
    /// Great-circle kilometres between lon/lat coordinates.
    #[default]
    Haversine,
    /// Straight-line length in coordinate units.
    Euclidean,
}

/// Travel direction allowed along a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Both,
    Forward,
    Backward,
}

/// Read the `oneway` tag of a line.
///
/// `true`, `"yes"` and `1` allow travel in digitising direction only; `-1` and
/// `"-1"` allow the opposite direction only.
pub fn direction(properties: &JsonObject) -> Direction {
    use serde_json::Value;

    match properties.get("oneway") {
        Some(Value::Bool(true)) => Direction::Forward,
        Some(Value::String(tag)) if tag == "yes" || tag == "1" => Direction::Forward,
        Some(Value::String(tag)) if tag == "-1" => Direction::Backward,
        Some(Value::Number(n)) if n.as_i64() == Some(1) => Direction::Forward,
        Some(Value::Number(n)) if n.as_i64() == Some(-1) => Direction::Backward,
        _ => Direction::Both,
    }
}

/// Weight function for GeoJSON lines honouring their `oneway` tag.
pub fn line_weight(
    metric: Metric,
) -> impl Fn(Coord<f64>, Coord<f64>, &JsonObject) -> Option<Weight> + Send + Sync + 'static {
    move |from, to, properties| {
        let length = match metric {
            Metric::Haversine => haversine_weight(from, to, properties),
            Metric::Euclidean => euclidean_weight(from, to, properties),
        }?;
        let Weight::Symmetric(cost) = length else {
            return Some(length);
        };

        Some(match direction(properties) {
            Direction::Both => length,
            Direction::Forward => Weight::forward(cost),
            Direction::Backward => Weight::Directional {
                forward: None,
                backward: Some(cost),
            },
        })
    }
}

/// Parse a `lon,lat` (or `x,y`) pair.
pub fn parse_coord(value: &str) -> std::result::Result<Coord<f64>, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{value}`"))?;
    let x: f64 = x
        .trim()
        .parse()
        .map_err(|e| format!("invalid x ordinate `{x}`: {e}"))?;
    let y: f64 = y
        .trim()
        .parse()
        .map_err(|e| format!("invalid y ordinate `{y}`: {e}"))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("coordinate `{value}` is not finite"));
    }
    Ok(Coord { x, y })
}

/// Load a stored graph, as JSON when the file ends in `.json`.
pub fn load_stored_graph(path: &Path) -> Result<RoutingGraph<()>> {
    if !path.exists() {
        bail!("graph file {} does not exist", path.display());
    }

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        RoutingGraph::from_json(&contents)
            .with_context(|| format!("failed to parse graph JSON from {}", path.display()))
    } else {
        load_graph(path).with_context(|| format!("failed to load graph from {}", path.display()))
    }
}
