//! Driven adapters: persistence and geocoding.

pub mod geocoding;
pub mod persistence;

pub use geocoding::MapboxGeocoder;
pub use persistence::{MongoCarpoolStore, MongoUserStore};
