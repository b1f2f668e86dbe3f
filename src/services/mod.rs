// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod cache;
pub mod catalog_service;
pub mod geo;
pub mod maintenance_service;
pub mod map_service;
pub mod normalize;
pub mod opening_hours;
pub mod place_service;

pub use cache::*;
pub use catalog_service::*;
pub use maintenance_service::*;
pub use map_service::*;
pub use place_service::*;
