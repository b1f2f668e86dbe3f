// src/models/mod.rs
// DOCUMENTATION: Models module organization
// PURPOSE: Re-export model components

pub mod hours;
pub mod place;
pub mod place_type;
pub mod specialty;

pub use hours::*;
pub use place::*;
pub use place_type::*;
pub use specialty::*;
