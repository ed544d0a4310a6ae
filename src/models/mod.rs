//! Core data models shared by every stage of the pipeline.

pub mod district;
pub mod region;

pub use district::{DistrictResponse, ProviderDistrict};
pub use region::{forest_size, node_at_path_mut, Center, RegionLevel, RegionNode};
