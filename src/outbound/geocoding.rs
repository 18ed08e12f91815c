//! Mapbox geocoding adapter.
//!
//! Wraps the forward-geocoding endpoint with a bounded retry loop:
//! transport failures and 5xx responses are retried with a doubling delay
//! plus jitter, other failures surface immediately. An address with no
//! match is not a failure; the port returns `Ok(None)`.

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::domain::ports::{Geocoder, GeocodingError};
use crate::domain::GeoPoint;

const ENDPOINT: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const JITTER_CEILING_MS: u64 = 250;

/// Forward geocoder backed by the Mapbox places API.
#[derive(Clone)]
pub struct MapboxGeocoder {
    http: reqwest::Client,
    access_token: String,
    country: String,
}

enum Attempt {
    /// Worth retrying: transport failure or upstream 5xx.
    Retryable(String),
    /// Not worth retrying: client error or malformed response.
    Fatal(String),
}

impl MapboxGeocoder {
    /// Build a geocoder restricted to the given country code.
    pub fn new(access_token: String, country: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            access_token,
            country,
        })
    }

    fn request_url(&self, address: &str) -> Result<Url, Attempt> {
        let mut url = Url::parse(ENDPOINT)
            .map_err(|err| Attempt::Fatal(format!("bad geocoding endpoint: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| Attempt::Fatal("geocoding endpoint cannot carry a path".to_owned()))?
            .pop_if_empty()
            .push(&format!("{address}.json"));
        url.query_pairs_mut()
            .append_pair("access_token", &self.access_token)
            .append_pair("country", &self.country)
            .append_pair("limit", "1");
        Ok(url)
    }

    async fn fetch(&self, address: &str) -> Result<Option<GeoPoint>, Attempt> {
        let url = self.request_url(address)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| Attempt::Retryable(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Attempt::Retryable(format!("upstream returned {status}")));
        }
        if !status.is_success() {
            return Err(Attempt::Fatal(format!("upstream returned {status}")));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|err| Attempt::Fatal(format!("malformed geocoding response: {err}")))?;
        Ok(body.features.into_iter().next().and_then(feature_point))
    }

    fn jitter() -> Duration {
        Duration::from_millis(SmallRng::from_entropy().gen_range(0..JITTER_CEILING_MS))
    }
}

#[async_trait]
impl Geocoder for MapboxGeocoder {
    async fn resolve_address(&self, address: &str) -> Result<Option<GeoPoint>, GeocodingError> {
        let mut delay = INITIAL_BACKOFF;
        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch(address).await {
                Ok(resolved) => {
                    debug!(address, resolved = resolved.is_some(), "geocoding finished");
                    return Ok(resolved);
                }
                Err(Attempt::Fatal(message)) => {
                    return Err(GeocodingError::upstream(message));
                }
                Err(Attempt::Retryable(message)) => {
                    warn!(attempt, address, error = %message, "geocoding attempt failed");
                    last_error = message;
                }
            }
            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay + Self::jitter()).await;
                delay *= 2;
            }
        }
        Err(GeocodingError::upstream(last_error))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<GeocodeFeature>,
}

#[derive(Debug, Deserialize)]
struct GeocodeFeature {
    /// `[longitude, latitude]`, per the GeoJSON convention.
    center: Vec<f64>,
    place_name: String,
}

fn feature_point(feature: GeocodeFeature) -> Option<GeoPoint> {
    let longitude = *feature.center.first()?;
    let latitude = *feature.center.get(1)?;
    Some(GeoPoint {
        latitude,
        longitude,
        address: feature.place_name,
    })
}
