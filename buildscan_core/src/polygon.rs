//! Parses the client-facing GeoJSON `Feature` / `FeatureCollection` / `Geometry` variants
//! once at the edge into a core-only ring representation. Downstream code never sees GeoJSON.

use anyhow::{Result, bail};
use serde::Deserialize;

/// A simple polygon: the exterior ring as `[lon, lat]` pairs. Holes are not represented;
/// only the outer boundary is kept, per scope.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPolygon {
	pub exterior_ring: Vec<(f64, f64)>,
}

impl RequestPolygon {
	pub fn from_geojson_str(raw: &str) -> Result<RequestPolygon> {
		let doc: GeoJson = serde_json::from_str(raw)?;
		RequestPolygon::from_geojson(&doc)
	}

	pub fn from_geojson(doc: &GeoJson) -> Result<RequestPolygon> {
		let geometry = match doc {
			GeoJson::Feature { geometry } => geometry,
			GeoJson::FeatureCollection { features } => {
				let first = features
					.first()
					.ok_or_else(|| anyhow::anyhow!("FeatureCollection has no features"))?;
				&first.geometry
			}
			GeoJson::Geometry(g) => g,
		};

		let ring = match geometry {
			Geometry::Polygon { coordinates } => coordinates
				.first()
				.ok_or_else(|| anyhow::anyhow!("Polygon has no exterior ring"))?
				.clone(),
			Geometry::MultiPolygon { coordinates } => coordinates
				.first()
				.and_then(|poly| poly.first())
				.ok_or_else(|| anyhow::anyhow!("MultiPolygon has no polygons"))?
				.clone(),
		};

		let exterior_ring: Vec<(f64, f64)> = ring.into_iter().map(|p| (p[0], p[1])).collect();
		if exterior_ring.len() < 4 {
			bail!("polygon exterior ring must have at least 4 points, got {}", exterior_ring.len());
		}
		Ok(RequestPolygon { exterior_ring })
	}
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum GeoJson {
	Feature {
		geometry: Geometry,
	},
	FeatureCollection {
		features: Vec<GeoJsonFeature>,
	},
	#[serde(untagged)]
	Geometry(Geometry),
}

#[derive(Deserialize, Debug)]
pub struct GeoJsonFeature {
	pub geometry: Geometry,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
pub enum Geometry {
	Polygon { coordinates: Vec<Vec<[f64; 2]>> },
	MultiPolygon { coordinates: Vec<Vec<Vec<[f64; 2]>>> },
}

#[cfg(test)]
mod tests {
	use super::*;

	fn square_json() -> &'static str {
		r#"{"type":"Polygon","coordinates":[[[0,0],[0,1],[1,1],[1,0],[0,0]]]}"#
	}

	#[test]
	fn parses_bare_geometry() {
		let p = RequestPolygon::from_geojson_str(square_json()).unwrap();
		assert_eq!(p.exterior_ring.len(), 5);
	}

	#[test]
	fn parses_feature_wrapper() {
		let raw = format!(r#"{{"type":"Feature","geometry":{square_json}}}"#, square_json = square_json());
		let p = RequestPolygon::from_geojson_str(&raw).unwrap();
		assert_eq!(p.exterior_ring[0], (0.0, 0.0));
	}

	#[test]
	fn parses_feature_collection_uses_first_feature() {
		let raw = format!(
			r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","geometry":{square_json}}}]}}"#,
			square_json = square_json()
		);
		let p = RequestPolygon::from_geojson_str(&raw).unwrap();
		assert_eq!(p.exterior_ring.len(), 5);
	}

	#[test]
	fn rejects_too_few_points() {
		let raw = r#"{"type":"Polygon","coordinates":[[[0,0],[1,1]]]}"#;
		assert!(RequestPolygon::from_geojson_str(raw).is_err());
	}

	#[test]
	fn multipolygon_uses_first_polygon() {
		let raw = r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[0,1],[1,1],[1,0],[0,0]]]]}"#;
		let p = RequestPolygon::from_geojson_str(raw).unwrap();
		assert_eq!(p.exterior_ring.len(), 5);
	}
}
