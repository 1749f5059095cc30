pub mod rings;

pub use rings::{JoinedRing, Ring, assemble_polygons, is_closed, join_rings};
