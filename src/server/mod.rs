//! Application assembly: shared state and the route table.
//!
//! `configure` is the single source of truth for routing so the binary and
//! the integration tests mount the exact same surface.

pub mod config;

use std::sync::Arc;

use actix_web::web;

use crate::api::{carpools, health, users};
use crate::domain::ports::Geocoder;
use crate::domain::{CarpoolService, UserService};

pub use config::{Config, ConfigError};

/// Services shared across workers.
///
/// The geocoder is optional: without a Mapbox token the server still runs,
/// and carpool creation requires explicit coordinates.
#[derive(Clone)]
pub struct AppState {
    pub carpools: CarpoolService,
    pub users: UserService,
    pub geocoder: Option<Arc<dyn Geocoder>>,
}

/// Mount every route under the given service config.
///
/// Literal paths (`/users/profile`) are registered before their
/// parameterised siblings so they are not captured by `{id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/users/register", web::post().to(users::register))
            .route("/users/login", web::post().to(users::login))
            .route("/users/logout", web::post().to(users::logout))
            .route("/users/profile", web::get().to(users::profile))
            .route("/users", web::get().to(users::list))
            .route("/users/{id}", web::patch().to(users::update))
            .route("/users/{id}/skills", web::post().to(users::add_skills))
            .route("/users/{id}/assistance", web::post().to(users::add_assistance))
            .route("/users/{id}/housing", web::post().to(users::add_housing))
            .route("/carpools", web::post().to(carpools::create))
            .route("/carpools", web::get().to(carpools::list))
            .route("/carpools/{id}", web::get().to(carpools::get))
            .route("/carpools/{id}", web::delete().to(carpools::delete))
            .route("/carpools/{id}/join", web::post().to(carpools::join))
            .route("/carpools/{id}/leave", web::post().to(carpools::leave)),
    )
    .route("/health/ready", web::get().to(health::ready))
    .route("/health/live", web::get().to(health::live));
}
