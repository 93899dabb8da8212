//! Web-Mercator XYZ tile coordinates and the pure geographic conversions built on them.

use anyhow::{Result, ensure};
use std::f64::consts::PI;
use std::fmt;

pub const TILE_PIXELS: u32 = 256;

/// A single Web-Mercator XYZ tile reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
	pub z: u8,
	pub x: u32,
	pub y: u32,
}

impl Tile {
	pub fn new(z: u8, x: u32, y: u32) -> Result<Tile> {
		ensure!(z <= 30, "zoom ({z}) must be <= 30");
		let max = 2u32.pow(z as u32);
		ensure!(x < max && y < max, "tile ({z}, {x}, {y}) out of range for zoom {z}");
		Ok(Tile { z, x, y })
	}

	/// Geographic bounds of this tile as `(west, south, east, north)`.
	pub fn bounds(&self) -> GeoBounds {
		let (w, n) = pixel_to_lonlat_raw(0.0, 0.0, self.z, self.x, self.y);
		let (e, s) = pixel_to_lonlat_raw(TILE_PIXELS as f64, TILE_PIXELS as f64, self.z, self.x, self.y);
		GeoBounds { west: w, south: s, east: e, north: n }
	}

	/// Converts a pixel coordinate within this tile to `(lon, lat)`.
	///
	/// `px`/`py` run `0..=256`; `py` grows southward while latitude grows northward,
	/// so the y axis is inverted here.
	pub fn pixel_to_lonlat(&self, px: f64, py: f64) -> (f64, f64) {
		pixel_to_lonlat_raw(px, py, self.z, self.x, self.y)
	}

	pub fn id(&self) -> String {
		format!("{}_{}_{}", self.z, self.x, self.y)
	}

	/// True if `other` is one of the 8 neighbors of this tile at the same zoom.
	pub fn is_adjacent(&self, other: &Tile) -> bool {
		if self.z != other.z || (self.x == other.x && self.y == other.y) {
			return false;
		}
		let dx = (self.x as i64 - other.x as i64).abs();
		let dy = (self.y as i64 - other.y as i64).abs();
		dx <= 1 && dy <= 1
	}
}

impl fmt::Debug for Tile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("Tile({}, {}, {})", self.z, self.x, self.y))
	}
}

/// Which Web-Mercator tile contains `(lon, lat)` at zoom `z`.
pub fn tile_of(lon: f64, lat: f64, z: u8) -> Result<Tile> {
	let n = 2f64.powi(z as i32);
	let lat_rad = lat.to_radians();
	let x = ((lon + 180.0) / 360.0 * n).floor() as i64;
	let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor() as i64;
	let max = n as i64 - 1;
	Tile::new(z, x.clamp(0, max) as u32, y.clamp(0, max) as u32)
}

fn pixel_to_lonlat_raw(px: f64, py: f64, z: u8, x: u32, y: u32) -> (f64, f64) {
	let n = 2f64.powi(z as i32);
	let gx = (x as f64) + px / TILE_PIXELS as f64;
	let gy = (y as f64) + py / TILE_PIXELS as f64;
	let lon = gx / n * 360.0 - 180.0;
	let lat = (PI * (1.0 - 2.0 * gy / n)).sinh().atan().to_degrees();
	(lon, lat)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoBounds {
	pub west: f64,
	pub south: f64,
	pub east: f64,
	pub north: f64,
}

impl GeoBounds {
	pub fn intersects(&self, other: &GeoBounds) -> bool {
		self.west < other.east && other.west < self.east && self.south < other.north && other.south < self.north
	}
}
