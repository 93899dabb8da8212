//! Shared types, tile math, configuration and error handling for buildscan.

pub mod config;
pub mod error;
pub mod polygon;
pub mod tile;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
pub use polygon::RequestPolygon;
pub use tile::{GeoBounds, Tile, tile_of};
pub use types::{DetectionParams, FinalBuilding, RawDetection, SimpleDetection, TileResult};
