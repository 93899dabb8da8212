//! Reads and writes the per-tile JSON files that make a job resumable.

use anyhow::{Context, Result};
use buildscan_core::{SimpleDetection, Tile, TileResult};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub struct TileStore {
	dir: PathBuf,
}

impl TileStore {
	pub fn new(dir: impl Into<PathBuf>) -> Result<TileStore> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir).with_context(|| format!("creating tile store directory {dir:?}"))?;
		Ok(TileStore { dir })
	}

	fn detailed_path(&self, tile: Tile) -> PathBuf {
		self.dir.join(format!("tile_{}_{}_{}.json", tile.z, tile.x, tile.y))
	}

	fn simple_path(&self, tile: Tile) -> PathBuf {
		self.dir.join(format!("tile_{}_{}_{}_simple.json", tile.z, tile.x, tile.y))
	}

	/// Persists both the detailed and simple files for one completed tile.
	pub fn save(&self, result: &TileResult) -> Result<()> {
		let tile = result.tile();
		let detailed = serde_json::to_vec_pretty(result)?;
		std::fs::write(self.detailed_path(tile), detailed)
			.with_context(|| format!("writing detailed tile file for {tile:?}"))?;

		let simple: Vec<SimpleDetection> = result
			.detections
			.iter()
			.enumerate()
			.map(|(i, det)| {
				let cx = (det.x1 + det.x2) / 2.0;
				let cy = (det.y1 + det.y2) / 2.0;
				let (lon, lat) = tile.pixel_to_lonlat(cx as f64, cy as f64);
				SimpleDetection { id: format!("{}_{}", tile.id(), i), longitude: lon, latitude: lat }
			})
			.collect();
		std::fs::write(self.simple_path(tile), serde_json::to_vec_pretty(&simple)?)
			.with_context(|| format!("writing simple tile file for {tile:?}"))?;

		Ok(())
	}

	/// True if a detailed tile file already exists on disk for `tile`.
	pub fn has(&self, tile: Tile) -> bool {
		self.detailed_path(tile).exists()
	}

	/// Loads every detailed tile file present in the store directory.
	pub fn load_all(&self) -> Result<Vec<TileResult>> {
		let mut out = Vec::new();
		if !self.dir.exists() {
			return Ok(out);
		}
		for entry in std::fs::read_dir(&self.dir)? {
			let entry = entry?;
			let path = entry.path();
			if is_detailed_file(&path) {
				let data = std::fs::read(&path).with_context(|| format!("reading {path:?}"))?;
				out.push(serde_json::from_slice(&data).with_context(|| format!("parsing {path:?}"))?);
			}
		}
		Ok(out)
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}
}

fn is_detailed_file(path: &Path) -> bool {
	let name = match path.file_name().and_then(|n| n.to_str()) {
		Some(n) => n,
		None => return false,
	};
	name.starts_with("tile_") && name.ends_with(".json") && !name.ends_with("_simple.json")
}

pub fn now_rfc3339() -> String {
	OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}
