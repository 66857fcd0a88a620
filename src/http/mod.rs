//! HTTP surface of the relay

pub mod routes;

pub use routes::build_router;
