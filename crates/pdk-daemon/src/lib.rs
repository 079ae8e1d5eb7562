//! pdk-daemon library surface.
//!
//! Exposed so scenario tests can compose the router in-process.

pub mod api_types;
pub mod routes;
pub mod state;
