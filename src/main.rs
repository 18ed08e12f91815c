//! Server entry-point: wires configuration, MongoDB, Mapbox, sessions,
//! and the REST surface.

use std::sync::Arc;

use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::SameSite;
use actix_web::{web, App, HttpServer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

use riada_backend::api::health::HealthState;
#[cfg(debug_assertions)]
use riada_backend::doc::ApiDoc;
use riada_backend::domain::ports::Geocoder;
use riada_backend::domain::{CarpoolService, UserService};
use riada_backend::middleware::RequestTrace;
use riada_backend::outbound::persistence::{connect_with_retry, ensure_indexes};
use riada_backend::outbound::{MapboxGeocoder, MongoCarpoolStore, MongoUserStore};
use riada_backend::server::{configure, AppState, Config};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let key = config.session_key().map_err(std::io::Error::other)?;

    let database = connect_with_retry(&config.mongodb_uri, &config.database_name)
        .await
        .map_err(std::io::Error::other)?;
    ensure_indexes(&database)
        .await
        .map_err(std::io::Error::other)?;

    let geocoder: Option<Arc<dyn Geocoder>> = match &config.mapbox_token {
        Some(token) => {
            let mapbox = MapboxGeocoder::new(token.clone(), config.geocoding_country.clone())
                .map_err(std::io::Error::other)?;
            Some(Arc::new(mapbox))
        }
        None => {
            warn!("MAPBOX_TOKEN unset; carpool creation requires explicit coordinates");
            None
        }
    };

    let state = AppState {
        carpools: CarpoolService::new(Arc::new(MongoCarpoolStore::new(&database))),
        users: UserService::new(Arc::new(MongoUserStore::new(&database))),
        geocoder,
    };

    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let cookie_secure = config.session_cookie_secure;
    let bind_addr = config.bind_addr;

    let server = HttpServer::new(move || {
        let session = SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
            .cookie_name("session".into())
            .cookie_path("/".into())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .cookie_same_site(SameSite::Lax)
            .build();

        #[cfg_attr(not(debug_assertions), expect(unused_mut))]
        let mut app = App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(server_health_state.clone())
            .wrap(RequestTrace)
            .wrap(session)
            .configure(configure);

        #[cfg(debug_assertions)]
        {
            app = app
                .service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));
        }

        app
    })
    .bind(bind_addr)?;

    info!(%bind_addr, "server starting");
    health_state.mark_ready();
    server.run().await
}
