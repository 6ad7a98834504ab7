//! Operations exposed to the request and worker layers

pub mod artifacts;
pub mod imports;
pub mod tags;
