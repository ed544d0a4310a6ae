//! Amap district API client.

mod client;
mod throttle;

pub use client::{AmapClient, DistrictProvider, QueryError, AMAP_DISTRICT_URL};
pub use throttle::Throttle;
