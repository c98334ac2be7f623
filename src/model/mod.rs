pub mod detection;
pub mod geometry;
pub mod params;
pub mod sequence;
