//! Reading line networks from GeoJSON.

use std::path::Path;

use geo::Coord;
use geojson::{Feature, GeoJson, JsonObject, Value};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::topology::{LineFeature, Network};

/// Collect the line features of a GeoJSON document.
///
/// `LineString` features become one line each; every part of a
/// `MultiLineString` becomes its own line sharing the feature's properties.
/// Features with other geometries are skipped.
pub fn network_from_geojson(geojson: GeoJson) -> Result<Network<JsonObject>> {
    let features = match geojson {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(Error::UnsupportedGeometry {
                kind: "bare geometry without properties".to_string(),
            })
        }
    };

    let mut lines = Vec::with_capacity(features.len());
    let mut skipped = 0usize;
    for (index, feature) in features.into_iter().enumerate() {
        let Feature {
            geometry,
            properties,
            ..
        } = feature;
        let properties = properties.unwrap_or_default();
        let Some(geometry) = geometry else {
            skipped += 1;
            continue;
        };

        match geometry.value {
            Value::LineString(positions) => {
                lines.push(LineFeature::new(to_coords(&positions)?, properties));
            }
            Value::MultiLineString(parts) => {
                for positions in &parts {
                    lines.push(LineFeature::new(to_coords(positions)?, properties.clone()));
                }
            }
            other => {
                warn!(feature = index, geometry = geometry_kind(&other), "skipping non-line feature");
                skipped += 1;
            }
        }
    }

    info!(lines = lines.len(), skipped, "read line network");
    Ok(Network::new(lines))
}

/// Read a GeoJSON file and collect its line features.
pub fn read_network(path: &Path) -> Result<Network<JsonObject>> {
    let contents = std::fs::read_to_string(path)?;
    let geojson: GeoJson = contents.parse()?;
    network_from_geojson(geojson)
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn to_coords(positions: &[Vec<f64>]) -> Result<Vec<Coord<f64>>> {
    positions
        .iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(Error::UnsupportedGeometry {
                kind: format!("position with {} ordinates", position.len()),
            }),
        })
        .collect()
}
