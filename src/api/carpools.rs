//! Carpool endpoints: offer creation, listings, and the seat lifecycle.
//!
//! Responses embed the people on a carpool with their contact fields run
//! through the role-scoped visibility policy: passengers see the driver's
//! details, the driver sees the passengers', everyone else sees names only.

use std::collections::HashMap;

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::Geocoder;
use crate::domain::visibility::{driver_contact, passenger_contact};
use crate::domain::{
    Carpool, CarpoolDraft, CarpoolFilter, CarpoolId, CarpoolStatus, DomainError, GeoPoint, User,
    UserId, Viewer,
};
use crate::server::AppState;

use super::{current_user_id, viewer, ApiError, ApiResult};

/// A trip endpoint as submitted: an address, optionally pre-resolved.
///
/// When coordinates are absent the address is forward-geocoded before the
/// offer reaches the domain.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationInput {
    #[schema(example = "Carrer de Colón 1, València")]
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Carpool offer payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarpoolRequest {
    pub origin: LocationInput,
    pub destination: LocationInput,
    pub departure_time: DateTime<Utc>,
    #[schema(minimum = 1, maximum = 8)]
    pub max_passengers: u32,
    pub description: Option<String>,
}

/// Listing filters, all optional.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<CarpoolStatus>,
    pub departing_after: Option<DateTime<Utc>>,
    pub departing_before: Option<DateTime<Utc>>,
}

/// A person on a carpool, contact fields subject to the visibility policy.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarpoolUserView {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A carpool as rendered for one viewer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarpoolView {
    pub id: CarpoolId,
    pub driver: CarpoolUserView,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub departure_time: DateTime<Utc>,
    pub max_passengers: u32,
    pub current_passengers: Vec<CarpoolUserView>,
    pub status: CarpoolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Render a carpool for the viewer, applying the contact policy.
///
/// Users missing from the index (a stale reference) render with an empty
/// name and no contact fields rather than failing the whole response.
pub(crate) fn carpool_view(
    carpool: &Carpool,
    users: &HashMap<UserId, User>,
    viewer: &Viewer,
) -> CarpoolView {
    let driver = match users.get(&carpool.driver_id) {
        Some(record) => {
            let contact = driver_contact(carpool, record, viewer);
            CarpoolUserView {
                id: record.id,
                name: record.name.clone(),
                phone: contact.as_ref().and_then(|c| c.phone.clone()),
                email: contact.map(|c| c.email),
            }
        }
        None => CarpoolUserView {
            id: carpool.driver_id,
            name: String::new(),
            phone: None,
            email: None,
        },
    };
    let current_passengers = carpool
        .current_passengers
        .iter()
        .map(|id| match users.get(id) {
            Some(record) => {
                let contact = passenger_contact(carpool, record, viewer);
                CarpoolUserView {
                    id: record.id,
                    name: record.name.clone(),
                    phone: contact.as_ref().and_then(|c| c.phone.clone()),
                    email: contact.map(|c| c.email),
                }
            }
            None => CarpoolUserView {
                id: *id,
                name: String::new(),
                phone: None,
                email: None,
            },
        })
        .collect();
    CarpoolView {
        id: carpool.id,
        driver,
        origin: carpool.origin.clone(),
        destination: carpool.destination.clone(),
        departure_time: carpool.departure_time,
        max_passengers: carpool.max_passengers,
        current_passengers,
        status: carpool.status,
        description: carpool.description.clone(),
        created_at: carpool.created_at,
        updated_at: carpool.updated_at,
    }
}

async fn user_index(state: &AppState) -> ApiResult<HashMap<UserId, User>> {
    let users = state.users.list().await?;
    Ok(users.into_iter().map(|user| (user.id, user)).collect())
}

async fn rendered(
    state: &AppState,
    carpool: &Carpool,
    viewer: &Viewer,
) -> ApiResult<CarpoolView> {
    let users = user_index(state).await?;
    Ok(carpool_view(carpool, &users, viewer))
}

/// Turn a location input into a validated point, geocoding when needed.
///
/// Inputs carrying both coordinates never touch the geocoder.
async fn resolve_location(
    geocoder: Option<&dyn Geocoder>,
    input: LocationInput,
) -> ApiResult<GeoPoint> {
    if let (Some(latitude), Some(longitude)) = (input.latitude, input.longitude) {
        return Ok(GeoPoint {
            latitude,
            longitude,
            address: input.address,
        });
    }
    let Some(geocoder) = geocoder else {
        return Err(ApiError::from(DomainError::invalid_request(
            "coordinates are required when geocoding is not configured",
        )));
    };
    let resolved = geocoder
        .resolve_address(&input.address)
        .await
        .map_err(|err| ApiError::from(DomainError::internal(err.to_string())))?;
    resolved.ok_or_else(|| {
        ApiError::from(
            DomainError::invalid_request("address could not be resolved to a location")
                .with_details(serde_json::json!({ "address": input.address })),
        )
    })
}

/// Offer a carpool; the caller becomes its driver.
#[utoipa::path(
    post,
    path = "/api/carpools",
    tag = "carpools",
    request_body = CreateCarpoolRequest,
    responses(
        (status = 201, description = "Carpool created", body = CarpoolView),
        (status = 400, description = "Invalid payload or unresolvable address"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn create(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<CreateCarpoolRequest>,
) -> ApiResult<HttpResponse> {
    let driver_id = current_user_id(&session)?;
    let body = body.into_inner();
    let origin = resolve_location(state.geocoder.as_deref(), body.origin).await?;
    let destination = resolve_location(state.geocoder.as_deref(), body.destination).await?;
    let carpool = state
        .carpools
        .create(CarpoolDraft {
            driver_id,
            origin,
            destination,
            departure_time: body.departure_time,
            max_passengers: body.max_passengers,
            description: body.description,
        })
        .await?;
    let view = rendered(&state, &carpool, &Viewer::User(driver_id)).await?;
    Ok(HttpResponse::Created().json(view))
}

/// List carpools, soonest departure first.
#[utoipa::path(
    get,
    path = "/api/carpools",
    tag = "carpools",
    params(ListQuery),
    responses((status = 200, description = "Carpool listing", body = [CarpoolView]))
)]
pub async fn list(
    state: web::Data<AppState>,
    session: Session,
    query: web::Query<ListQuery>,
) -> ApiResult<HttpResponse> {
    let viewer = viewer(&session);
    let query = query.into_inner();
    let filter = CarpoolFilter {
        status: query.status,
        departing_after: query.departing_after,
        departing_before: query.departing_before,
    };
    let carpools = state.carpools.list(&filter).await?;
    let users = user_index(&state).await?;
    let listing: Vec<CarpoolView> = carpools
        .iter()
        .map(|carpool| carpool_view(carpool, &users, &viewer))
        .collect();
    Ok(HttpResponse::Ok().json(listing))
}

/// Fetch one carpool.
#[utoipa::path(
    get,
    path = "/api/carpools/{id}",
    tag = "carpools",
    params(("id" = CarpoolId, Path, description = "Carpool identifier")),
    responses(
        (status = 200, description = "The carpool", body = CarpoolView),
        (status = 404, description = "No such carpool")
    )
)]
pub async fn get(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<CarpoolId>,
) -> ApiResult<HttpResponse> {
    let viewer = viewer(&session);
    let carpool = state.carpools.get(&path).await?;
    let view = rendered(&state, &carpool, &viewer).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Take a seat on the carpool.
#[utoipa::path(
    post,
    path = "/api/carpools/{id}/join",
    tag = "carpools",
    params(("id" = CarpoolId, Path, description = "Carpool identifier")),
    responses(
        (status = 200, description = "Seat taken", body = CarpoolView),
        (status = 400, description = "Join refused by the lifecycle rules"),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such carpool"),
        (status = 409, description = "Carpool is full")
    )
)]
pub async fn join(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<CarpoolId>,
) -> ApiResult<HttpResponse> {
    let user_id = current_user_id(&session)?;
    let carpool = state.carpools.join(&path, &user_id).await?;
    let view = rendered(&state, &carpool, &Viewer::User(user_id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Give up a seat on the carpool.
#[utoipa::path(
    post,
    path = "/api/carpools/{id}/leave",
    tag = "carpools",
    params(("id" = CarpoolId, Path, description = "Carpool identifier")),
    responses(
        (status = 200, description = "Seat released", body = CarpoolView),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "No such carpool")
    )
)]
pub async fn leave(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<CarpoolId>,
) -> ApiResult<HttpResponse> {
    let user_id = current_user_id(&session)?;
    let carpool = state.carpools.leave(&path, &user_id).await?;
    let view = rendered(&state, &carpool, &Viewer::User(user_id)).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// Delete the carpool; drivers only.
#[utoipa::path(
    delete,
    path = "/api/carpools/{id}",
    tag = "carpools",
    params(("id" = CarpoolId, Path, description = "Carpool identifier")),
    responses(
        (status = 204, description = "Carpool deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not the driver"),
        (status = 404, description = "No such carpool")
    )
)]
pub async fn delete(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<CarpoolId>,
) -> ApiResult<HttpResponse> {
    let user_id = current_user_id(&session)?;
    state.carpools.delete(&path, &user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::PasswordDigest;
    use rstest::{fixture, rstest};

    fn person(name: &str) -> User {
        User {
            id: UserId::generate(),
            name: name.into(),
            email: format!("{name}@example.org"),
            password_digest: PasswordDigest::hash("pw"),
            phone: Some("+34 600 111 222".into()),
            roles: vec![],
            location: None,
            skills: vec![],
            assistance_requests: vec![],
            temporary_housing: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn geo(address: &str) -> GeoPoint {
        GeoPoint {
            latitude: 39.47,
            longitude: -0.38,
            address: address.into(),
        }
    }

    struct Fixture {
        carpool: Carpool,
        users: HashMap<UserId, User>,
        driver: UserId,
        passenger: UserId,
        outsider: UserId,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let driver = person("driver");
        let passenger = person("passenger");
        let outsider = person("outsider");
        let mut carpool = CarpoolDraft {
            driver_id: driver.id,
            origin: geo("Valencia"),
            destination: geo("Paiporta"),
            departure_time: Utc::now(),
            max_passengers: 3,
            description: None,
        }
        .into_carpool()
        .expect("valid carpool");
        carpool.join(passenger.id).expect("seat passenger");
        let (driver_id, passenger_id, outsider_id) = (driver.id, passenger.id, outsider.id);
        let users = [driver, passenger, outsider]
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        Fixture {
            carpool,
            users,
            driver: driver_id,
            passenger: passenger_id,
            outsider: outsider_id,
        }
    }

    #[rstest]
    fn passengers_see_the_drivers_contact(fixture: Fixture) {
        let view = carpool_view(&fixture.carpool, &fixture.users, &Viewer::User(fixture.passenger));
        assert!(view.driver.email.is_some());
        assert!(view.driver.phone.is_some());
        // But not each other's.
        assert!(view.current_passengers[0].email.is_none());
    }

    #[rstest]
    fn the_driver_sees_passenger_contacts_but_not_their_own_echo(fixture: Fixture) {
        let view = carpool_view(&fixture.carpool, &fixture.users, &Viewer::User(fixture.driver));
        assert!(view.driver.email.is_none());
        assert!(view.current_passengers[0].email.is_some());
    }

    #[rstest]
    fn outsiders_and_anonymous_viewers_see_names_only(fixture: Fixture) {
        for viewer in [Viewer::User(fixture.outsider), Viewer::Anonymous] {
            let view = carpool_view(&fixture.carpool, &fixture.users, &viewer);
            assert!(view.driver.email.is_none());
            assert!(view.driver.phone.is_none());
            assert!(view.current_passengers[0].email.is_none());
            assert_eq!(view.driver.name, "driver");
            assert_eq!(view.current_passengers[0].name, "passenger");
        }
    }

    #[rstest]
    fn joining_flips_the_drivers_contact_visible(fixture: Fixture) {
        let Fixture {
            mut carpool,
            users,
            outsider,
            ..
        } = fixture;
        let viewer = Viewer::User(outsider);
        assert!(carpool_view(&carpool, &users, &viewer).driver.email.is_none());

        carpool.join(outsider).expect("join");
        assert!(carpool_view(&carpool, &users, &viewer).driver.email.is_some());
    }

    #[rstest]
    fn redacted_views_serialise_without_contact_keys(fixture: Fixture) {
        let view = carpool_view(&fixture.carpool, &fixture.users, &Viewer::Anonymous);
        let json = serde_json::to_value(&view).expect("serialise");
        assert!(json["driver"].get("email").is_none());
        assert!(json["driver"].get("phone").is_none());
    }

    #[rstest]
    fn stale_user_references_render_as_placeholders(fixture: Fixture) {
        let Fixture {
            carpool,
            mut users,
            passenger,
            ..
        } = fixture;
        users.remove(&passenger);
        let view = carpool_view(&carpool, &users, &Viewer::User(carpool.driver_id));
        assert_eq!(view.current_passengers[0].id, passenger);
        assert!(view.current_passengers[0].name.is_empty());
        assert!(view.current_passengers[0].email.is_none());
    }

    mod location_resolution {
        use super::*;
        use crate::domain::ports::MockGeocoder;
        use crate::domain::ErrorCode;

        fn input(address: &str, coords: Option<(f64, f64)>) -> LocationInput {
            LocationInput {
                address: address.into(),
                latitude: coords.map(|(lat, _)| lat),
                longitude: coords.map(|(_, lon)| lon),
            }
        }

        #[rstest]
        #[tokio::test]
        async fn supplied_coordinates_skip_the_geocoder() {
            let mut geocoder = MockGeocoder::new();
            geocoder.expect_resolve_address().times(0);

            let point = resolve_location(Some(&geocoder), input("Valencia", Some((39.47, -0.38))))
                .await
                .expect("resolved without geocoding");
            assert_eq!(point.latitude, 39.47);
            assert_eq!(point.longitude, -0.38);
            assert_eq!(point.address, "Valencia");
        }

        #[rstest]
        #[tokio::test]
        async fn bare_addresses_are_forwarded_to_the_geocoder() {
            let mut geocoder = MockGeocoder::new();
            geocoder
                .expect_resolve_address()
                .withf(|address| address == "Paiporta")
                .times(1)
                .returning(|address| {
                    Ok(Some(GeoPoint {
                        latitude: 39.4284,
                        longitude: -0.4176,
                        address: address.to_owned(),
                    }))
                });

            let point = resolve_location(Some(&geocoder), input("Paiporta", None))
                .await
                .expect("resolved");
            assert_eq!(point.latitude, 39.4284);
        }

        #[rstest]
        #[tokio::test]
        async fn unresolvable_addresses_are_a_client_error() {
            let mut geocoder = MockGeocoder::new();
            geocoder
                .expect_resolve_address()
                .times(1)
                .returning(|_| Ok(None));

            let err = resolve_location(Some(&geocoder), input("nowhere", None))
                .await
                .expect_err("no match");
            assert_eq!(err.inner().code(), ErrorCode::InvalidRequest);
        }

        #[rstest]
        #[tokio::test]
        async fn a_missing_geocoder_requires_coordinates() {
            let err = resolve_location(None, input("Valencia", None))
                .await
                .expect_err("no geocoder configured");
            assert_eq!(err.inner().code(), ErrorCode::InvalidRequest);
        }
    }
}
