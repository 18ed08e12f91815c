//! Riada backend: flood-relief coordination over HTTP.
//!
//! The crate is a hexagon: `domain` holds the aggregates, services, and
//! ports; `outbound` holds the MongoDB and Mapbox adapters; `api` is the
//! inbound HTTP adapter; `server` assembles them.

pub mod api;
pub mod doc;
pub mod domain;
pub mod middleware;
pub mod outbound;
pub mod server;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
