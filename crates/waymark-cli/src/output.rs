use anyhow::Result;
use clap::ValueEnum;
use waymark_lib::Path;

/// Output format for a computed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary followed by one coordinate per line.
    #[default]
    Text,
    /// The route as a JSON object.
    Json,
    /// The route as a GeoJSON `LineString` feature.
    Geojson,
}

pub fn render_path(path: &Path<()>, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(path)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(path)?),
        OutputFormat::Geojson => Ok(path.to_feature()?.to_string()),
    }
}

fn render_text(path: &Path<()>) -> String {
    let mut lines = Vec::with_capacity(path.coordinates.len() + 2);
    lines.push(format!("Route weight: {}", path.weight));
    lines.push(format!(
        "Coordinates: {} ({} graph vertices)",
        path.coordinates.len(),
        path.vertices.len()
    ));
    for coord in &path.coordinates {
        lines.push(format!("- {},{}", coord.x, coord.y));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use waymark_lib::VertexKey;

    fn sample() -> Path<()> {
        Path {
            coordinates: vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.5, y: 0.0 }],
            weight: 1.5,
            edge_data: None,
            vertices: vec![VertexKey::from("0,0"), VertexKey::from("1.5,0")],
        }
    }

    #[test]
    fn text_lists_every_coordinate() {
        let text = render_path(&sample(), OutputFormat::Text).expect("renders");
        assert!(text.starts_with("Route weight: 1.5"));
        assert!(text.contains("- 0,0"));
        assert!(text.ends_with("- 1.5,0"));
    }

    #[test]
    fn geojson_is_a_line_feature() {
        let rendered = render_path(&sample(), OutputFormat::Geojson).expect("renders");
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "LineString");
        assert_eq!(value["properties"]["weight"], 1.5);
    }

    #[test]
    fn json_carries_weight() {
        let rendered = render_path(&sample(), OutputFormat::Json).expect("renders");
        let value: serde_json::Value = serde_json::from_str(&rendered).expect("valid json");
        assert_eq!(value["weight"], 1.5);
        assert_eq!(value["vertices"][1], "1.5,0");
    }
}
