//! Geometry operations for the buildscan merger: rectangle arithmetic, Union-Find
//! transitive merging, tile planning, and polygon containment.

pub mod containment;
pub mod merge;
pub mod planner;
pub mod rect;
pub mod unionfind;

pub use containment::filter_and_number;
pub use merge::{MergeConfig, MergedBuilding, merge};
pub use planner::{build_polygon, plan_tiles};
pub use rect::GeoRect;
pub use unionfind::UnionFind;
