//! xzqh - Chinese administrative divisions with geographic centers
//!
//! This library provides the region tree model, the Amap district client and
//! the coordinate reconciliation engine shared by the binaries.

pub mod amap;
pub mod center;
pub mod config;
pub mod export;
pub mod models;
pub mod source;

pub use models::{Center, ProviderDistrict, RegionLevel, RegionNode};
