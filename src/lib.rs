//! Irregular-shape nesting: pack part polygons into a container polygon
//! using no-fit polygons for collision-free placement and a genetic
//! algorithm over placement orders and rotations.

pub mod cache;
pub mod clipper;
pub mod ga;
pub mod geometry;
pub mod nest;
pub mod nfp;
pub mod part;
pub mod placement;

pub use geometry::{Point, Polygon};
pub use nest::{FitnessRecord, NestConfig, NestResult, Nester};
pub use placement::PlacedPart;
