//! Visibility policy: which contact fields are revealed to which viewer.
//!
//! Two deliberately different rule sets coexist and must not be unified:
//! carpool contact details are role-scoped (driver sees passengers,
//! passengers see the driver), while assistance, housing, and directory
//! records reveal contact details to any authenticated viewer. Anonymous
//! viewers never see phone or email anywhere.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::carpools::Carpool;
use super::users::{User, UserId};

/// The identity a redaction decision is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// Unauthenticated visitor.
    Anonymous,
    /// Authenticated user.
    User(UserId),
}

impl Viewer {
    /// The viewer's user id, when authenticated.
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Anonymous => None,
            Self::User(id) => Some(id),
        }
    }

    /// Whether the viewer is authenticated at all.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User(_))
    }
}

/// Contact fields released by a redaction decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub email: String,
}

impl ContactDetails {
    fn of(user: &User) -> Self {
        Self {
            phone: user.phone.clone(),
            email: user.email.clone(),
        }
    }
}

/// Driver contact details, visible only to that carpool's passengers.
///
/// The driver never appears in the passenger list, so this also withholds
/// the details from the driver's own (redundant) view.
pub fn driver_contact(carpool: &Carpool, driver: &User, viewer: &Viewer) -> Option<ContactDetails> {
    let id = viewer.user_id()?;
    carpool.has_passenger(id).then(|| ContactDetails::of(driver))
}

/// Passenger contact details, visible only to that carpool's driver.
pub fn passenger_contact(
    carpool: &Carpool,
    passenger: &User,
    viewer: &Viewer,
) -> Option<ContactDetails> {
    let id = viewer.user_id()?;
    (*id == carpool.driver_id).then(|| ContactDetails::of(passenger))
}

/// Directory, assistance, and housing contact details: visible to any
/// authenticated viewer, hidden from anonymous ones.
pub fn directory_contact(record: &User, viewer: &Viewer) -> Option<ContactDetails> {
    viewer
        .is_authenticated()
        .then(|| ContactDetails::of(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::PasswordDigest;
    use crate::domain::carpools::{CarpoolDraft, CarpoolStatus};
    use crate::domain::geo::GeoPoint;
    use chrono::Utc;
    use rstest::{fixture, rstest};

    fn user(name: &str) -> User {
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

    fn geo() -> GeoPoint {
        GeoPoint {
            latitude: 39.47,
            longitude: -0.38,
            address: "Valencia".into(),
        }
    }

    struct Fixture {
        carpool: Carpool,
        driver: User,
        passenger: User,
        outsider: User,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let driver = user("driver");
        let passenger = user("passenger");
        let outsider = user("outsider");
        let mut carpool = CarpoolDraft {
            driver_id: driver.id,
            origin: geo(),
            destination: geo(),
            departure_time: Utc::now(),
            max_passengers: 3,
            description: None,
        }
        .into_carpool()
        .expect("valid carpool");
        carpool.join(passenger.id).expect("seat passenger");
        Fixture {
            carpool,
            driver,
            passenger,
            outsider,
        }
    }

    #[rstest]
    fn driver_contact_visible_to_passengers_only(fixture: Fixture) {
        let as_passenger = Viewer::User(fixture.passenger.id);
        let as_outsider = Viewer::User(fixture.outsider.id);
        let as_driver = Viewer::User(fixture.driver.id);

        let released = driver_contact(&fixture.carpool, &fixture.driver, &as_passenger)
            .expect("passenger sees driver");
        assert_eq!(released.email, fixture.driver.email);
        assert!(driver_contact(&fixture.carpool, &fixture.driver, &as_outsider).is_none());
        assert!(driver_contact(&fixture.carpool, &fixture.driver, &as_driver).is_none());
        assert!(driver_contact(&fixture.carpool, &fixture.driver, &Viewer::Anonymous).is_none());
    }

    #[rstest]
    fn driver_contact_becomes_visible_after_joining(fixture: Fixture) {
        let Fixture {
            mut carpool,
            driver,
            outsider,
            ..
        } = fixture;
        let viewer = Viewer::User(outsider.id);
        assert!(driver_contact(&carpool, &driver, &viewer).is_none());

        carpool.join(outsider.id).expect("join");
        assert!(driver_contact(&carpool, &driver, &viewer).is_some());
    }

    #[rstest]
    fn passenger_contact_visible_to_driver_only(fixture: Fixture) {
        let as_driver = Viewer::User(fixture.driver.id);
        let as_outsider = Viewer::User(fixture.outsider.id);

        let released = passenger_contact(&fixture.carpool, &fixture.passenger, &as_driver)
            .expect("driver sees passenger");
        assert_eq!(released.email, fixture.passenger.email);
        assert!(passenger_contact(&fixture.carpool, &fixture.passenger, &as_outsider).is_none());
        assert!(
            passenger_contact(&fixture.carpool, &fixture.passenger, &Viewer::Anonymous).is_none()
        );
    }

    #[rstest]
    fn directory_contact_requires_authentication_only(fixture: Fixture) {
        let record = &fixture.outsider;
        let any_user = Viewer::User(fixture.passenger.id);

        let released = directory_contact(record, &any_user).expect("authenticated viewer");
        assert_eq!(released.phone, record.phone);
        assert!(directory_contact(record, &Viewer::Anonymous).is_none());
    }

    #[rstest]
    fn carpool_rules_stay_role_scoped_even_when_status_changes(fixture: Fixture) {
        // Cancelling does not widen visibility.
        let Fixture {
            mut carpool,
            driver,
            outsider,
            ..
        } = fixture;
        carpool.status = CarpoolStatus::Cancelled;
        assert!(driver_contact(&carpool, &driver, &Viewer::User(outsider.id)).is_none());
    }
}
