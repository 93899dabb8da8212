//! Converts a request polygon into the ordered set of tiles covering it at a given zoom.

use anyhow::{Result, bail};
use buildscan_core::{RequestPolygon, Tile, tile_of};
use geo::{BoundingRect, Contains, Coord, LineString, Polygon, Rect};

use crate::rect::GeoRect;

pub fn build_polygon(req: &RequestPolygon) -> Result<Polygon<f64>> {
	if req.exterior_ring.len() < 4 {
		bail!("polygon exterior ring must have at least 4 points");
	}
	let coords: Vec<Coord<f64>> = req.exterior_ring.iter().map(|&(lon, lat)| Coord { x: lon, y: lat }).collect();
	Ok(Polygon::new(LineString::new(coords), vec![]))
}

/// Enumerates, in a deterministic row-major order, every tile at zoom `z` whose
/// geographic bounds intersect `polygon`.
pub fn plan_tiles(polygon: &Polygon<f64>, z: u8) -> Result<Vec<Tile>> {
	let bbox: Rect<f64> = polygon
		.bounding_rect()
		.ok_or_else(|| anyhow::anyhow!("polygon has no bounding rect"))?;

	let nw = tile_of(bbox.min().x, bbox.max().y, z)?;
	let se = tile_of(bbox.max().x, bbox.min().y, z)?;

	let poly_rect = GeoRect::new(bbox.min().x, bbox.min().y, bbox.max().x, bbox.max().y);

	let mut tiles = Vec::new();
	for y in nw.y..=se.y {
		for x in nw.x..=se.x {
			let tile = Tile::new(z, x, y)?;
			let b = tile.bounds();
			let tile_rect = GeoRect::new(b.west, b.south, b.east, b.north);
			if tile_rect.area() > 0.0 && poly_rect_intersects(&tile_rect, &poly_rect, polygon) {
				tiles.push(tile);
			}
		}
	}
	Ok(tiles)
}

fn poly_rect_intersects(tile_rect: &GeoRect, poly_envelope: &GeoRect, polygon: &Polygon<f64>) -> bool {
	if !rect_overlap(tile_rect, poly_envelope) {
		return false;
	}
	// Envelope-intersect passed; confirm against the actual polygon using its corners
	// and centroid, cheap enough since tile counts per job stay small.
	let corners = [
		(tile_rect.west, tile_rect.south),
		(tile_rect.west, tile_rect.north),
		(tile_rect.east, tile_rect.south),
		(tile_rect.east, tile_rect.north),
	];
	if corners.iter().any(|&(x, y)| polygon.contains(&Coord { x, y })) {
		return true;
	}
	let (cx, cy) = tile_rect.centroid();
	polygon.contains(&Coord { x: cx, y: cy })
		|| polygon.exterior().coords().any(|c| tile_rect.contains_point(c.x, c.y))
}

fn rect_overlap(a: &GeoRect, b: &GeoRect) -> bool {
	a.west < b.east && b.west < a.east && a.south < b.north && b.south < a.north
}

impl GeoRect {
	fn contains_point(&self, x: f64, y: f64) -> bool {
		x >= self.west && x <= self.east && y >= self.south && y <= self.north
	}
}
