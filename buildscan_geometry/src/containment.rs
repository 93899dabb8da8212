//! Drops merged buildings outside the request polygon and assigns stable,
//! top-left-first ordinal ids to the survivors.

use buildscan_core::FinalBuilding;
use geo::{Contains, Coord, Polygon};

use crate::merge::MergedBuilding;

/// Filters `buildings` to those whose centroid lies inside `polygon`, then sorts by
/// centroid latitude descending, longitude ascending, and assigns ids `1..=N`.
pub fn filter_and_number(buildings: Vec<MergedBuilding>, polygon: &Polygon<f64>) -> Vec<FinalBuilding> {
	let mut kept: Vec<(f64, f64)> = buildings
		.into_iter()
		.map(|b| b.envelope.centroid())
		.filter(|&(lon, lat)| polygon.contains(&Coord { x: lon, y: lat }))
		.collect();

	kept.sort_by(|a, b| {
		b.1.partial_cmp(&a.1)
			.unwrap()
			.then_with(|| a.0.partial_cmp(&b.0).unwrap())
	});

	kept.into_iter()
		.enumerate()
		.map(|(i, (lon, lat))| FinalBuilding { id: (i + 1) as u32, longitude: lon, latitude: lat })
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::rect::GeoRect;

	fn mb(west: f64, south: f64, east: f64, north: f64) -> MergedBuilding {
		MergedBuilding {
			envelope: GeoRect::new(west, south, east, north),
			score: 0.9,
			original_ids: vec!["0_0_0_0".to_string()],
		}
	}

	fn big_square() -> Polygon<f64> {
		use geo::LineString;
		Polygon::new(
			LineString::from(vec![(-10.0, -10.0), (-10.0, 10.0), (10.0, 10.0), (10.0, -10.0), (-10.0, -10.0)]),
			vec![],
		)
	}

	#[test]
	fn drops_centroid_outside_polygon() {
		let buildings = vec![mb(0.0, 0.0, 1.0, 1.0), mb(100.0, 100.0, 101.0, 101.0)];
		let out = filter_and_number(buildings, &big_square());
		assert_eq!(out.len(), 1);
		assert_eq!(out[0].id, 1);
	}

	#[test]
	fn orders_north_first_then_west() {
		let buildings = vec![
			mb(0.0, 0.0, 1.0, 1.0),   // centroid (0.5, 0.5)
			mb(0.0, 5.0, 1.0, 6.0),   // centroid (0.5, 5.5) - north of the first
			mb(-2.0, 5.0, -1.0, 6.0), // centroid (-1.5, 5.5) - same latitude band, west of the second
		];
		let out = filter_and_number(buildings, &big_square());
		assert_eq!(out.len(), 3);
		// the two northern buildings (lat 5.5) come first, west one before east one
		assert!((out[0].latitude - out[1].latitude).abs() < 1e-9);
		assert!(out[0].longitude <= out[1].longitude);
		// the southern building (lat 0.5) comes last
		assert!(out[1].latitude > out[2].latitude);
	}
}
