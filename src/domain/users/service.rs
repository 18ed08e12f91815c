//! Account service: registration, login, profile updates, and the intake
//! operations that append relief records to a user document.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::auth::{Credentials, PasswordDigest};
use crate::domain::geo::GeoPoint;
use crate::domain::ports::{UserStore, UserStoreError};
use crate::domain::{AssistanceRequest, DomainError, HousingOffer, Role, User, UserId, VolunteerSkill};

/// Inputs for registering an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub credentials: Credentials,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Owner-initiated field updates. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Inputs for a housing offer before the service assigns id and status.
#[derive(Debug, Clone)]
pub struct HousingOfferDraft {
    pub address: String,
    pub location: Option<GeoPoint>,
    pub start_date: chrono::DateTime<Utc>,
    pub end_date: chrono::DateTime<Utc>,
    pub max_occupancy: u32,
    pub is_shared: bool,
    pub description: Option<String>,
}

/// Service implementing the user-facing account operations.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    /// Create a service over the given store adapter.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    fn map_store_error(error: UserStoreError) -> DomainError {
        match error {
            UserStoreError::Connection { message } => {
                DomainError::internal(format!("user store unavailable: {message}"))
            }
            UserStoreError::Query { message } => {
                DomainError::internal(format!("user store error: {message}"))
            }
            UserStoreError::DuplicateEmail { email } => {
                DomainError::conflict("email is already registered")
                    .with_details(json!({ "email": email }))
            }
        }
    }

    /// Register an account and return the stored user.
    pub async fn register(&self, account: NewAccount) -> Result<User, DomainError> {
        let name = account.name.trim();
        if name.is_empty() {
            return Err(DomainError::invalid_request("name must not be empty"));
        }
        if let Some(location) = &account.location {
            location
                .validate()
                .map_err(|err| DomainError::invalid_request(err.to_string()))?;
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name: name.to_owned(),
            email: account.credentials.email().to_owned(),
            password_digest: PasswordDigest::hash(account.credentials.password()),
            phone: account.phone,
            roles: Vec::new(),
            location: account.location,
            skills: Vec::new(),
            assistance_requests: Vec::new(),
            temporary_housing: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert(&user)
            .await
            .map_err(Self::map_store_error)?;
        info!(user_id = %user.id, "account registered");
        Ok(user)
    }

    /// Verify credentials and return the account.
    ///
    /// A missing account and a wrong password produce the same error so the
    /// response does not disclose which addresses are registered.
    pub async fn login(&self, credentials: &Credentials) -> Result<User, DomainError> {
        let rejected = || DomainError::unauthorized("invalid login credentials");
        let user = self
            .store
            .find_by_email(credentials.email())
            .await
            .map_err(Self::map_store_error)?
            .ok_or_else(rejected)?;
        if !user.password_digest.verify(credentials.password()) {
            warn!(user_id = %user.id, "login rejected: wrong password");
            return Err(rejected());
        }
        info!(user_id = %user.id, "login succeeded");
        Ok(user)
    }

    /// Fetch a user by identifier.
    pub async fn get(&self, id: &UserId) -> Result<User, DomainError> {
        self.store
            .find_by_id(id)
            .await
            .map_err(Self::map_store_error)?
            .ok_or_else(|| {
                DomainError::not_found("user not found").with_details(json!({ "userId": id }))
            })
    }

    /// List every user record. Redaction is the caller's responsibility,
    /// via the visibility policy.
    pub async fn list(&self) -> Result<Vec<User>, DomainError> {
        self.store.list().await.map_err(Self::map_store_error)
    }

    /// Apply owner-initiated field updates.
    pub async fn update(
        &self,
        requester: &UserId,
        id: &UserId,
        patch: UserPatch,
    ) -> Result<User, DomainError> {
        let mut user = self.owned_record(requester, id).await?;
        if let Some(name) = patch.name {
            let name = name.trim().to_owned();
            if name.is_empty() {
                return Err(DomainError::invalid_request("name must not be empty"));
            }
            user.name = name;
        }
        if let Some(phone) = patch.phone {
            user.phone = Some(phone);
        }
        if let Some(location) = patch.location {
            location
                .validate()
                .map_err(|err| DomainError::invalid_request(err.to_string()))?;
            user.location = Some(location);
        }
        self.persist(user).await
    }

    /// Append volunteer skills and grant the `voluntario` role.
    pub async fn add_skills(
        &self,
        requester: &UserId,
        id: &UserId,
        skills: Vec<VolunteerSkill>,
    ) -> Result<User, DomainError> {
        let mut user = self.owned_record(requester, id).await?;
        user.skills.extend(skills);
        user.grant_role(Role::Voluntario);
        self.persist(user).await
    }

    /// Append an assistance request and grant the `solicitante` role.
    pub async fn add_assistance_request(
        &self,
        requester: &UserId,
        id: &UserId,
        request: AssistanceRequest,
    ) -> Result<User, DomainError> {
        let mut user = self.owned_record(requester, id).await?;
        user.assistance_requests.push(request);
        user.grant_role(Role::Solicitante);
        self.persist(user).await
    }

    /// Append a temporary-housing offer.
    pub async fn add_housing_offer(
        &self,
        requester: &UserId,
        id: &UserId,
        draft: HousingOfferDraft,
    ) -> Result<User, DomainError> {
        if draft.end_date < draft.start_date {
            return Err(DomainError::invalid_request(
                "housing end date precedes its start date",
            ));
        }
        if let Some(location) = &draft.location {
            location
                .validate()
                .map_err(|err| DomainError::invalid_request(err.to_string()))?;
        }
        let mut user = self.owned_record(requester, id).await?;
        user.temporary_housing.push(HousingOffer {
            id: Uuid::new_v4(),
            address: draft.address,
            location: draft.location,
            start_date: draft.start_date,
            end_date: draft.end_date,
            max_occupancy: draft.max_occupancy,
            is_shared: draft.is_shared,
            description: draft.description,
            status: "active".to_owned(),
        });
        self.persist(user).await
    }

    async fn owned_record(&self, requester: &UserId, id: &UserId) -> Result<User, DomainError> {
        if requester != id {
            warn!(requester = %requester, target = %id, "mutation refused: not the owner");
            return Err(DomainError::forbidden("users may only modify their own record"));
        }
        self.get(id).await
    }

    async fn persist(&self, mut user: User) -> Result<User, DomainError> {
        user.updated_at = Utc::now();
        self.store
            .update(&user)
            .await
            .map_err(Self::map_store_error)?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        users: Mutex<HashMap<String, User>>,
    }

    #[async_trait]
    impl UserStore for MemoryStore {
        async fn insert(&self, user: &User) -> Result<(), UserStoreError> {
            let mut guard = self.users.lock().expect("store poisoned");
            if guard.values().any(|u| u.email == user.email) {
                return Err(UserStoreError::DuplicateEmail {
                    email: user.email.clone(),
                });
            }
            guard.insert(user.id.to_string(), user.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
            let guard = self.users.lock().expect("store poisoned");
            Ok(guard.get(&id.to_string()).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError> {
            let guard = self.users.lock().expect("store poisoned");
            Ok(guard.values().find(|u| u.email == email).cloned())
        }

        async fn update(&self, user: &User) -> Result<(), UserStoreError> {
            let mut guard = self.users.lock().expect("store poisoned");
            guard.insert(user.id.to_string(), user.clone());
            Ok(())
        }

        async fn list(&self) -> Result<Vec<User>, UserStoreError> {
            let guard = self.users.lock().expect("store poisoned");
            Ok(guard.values().cloned().collect())
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::default()))
    }

    fn account(email: &str) -> NewAccount {
        NewAccount {
            name: "Ana".into(),
            credentials: Credentials::try_from_parts(email, "secret").expect("valid"),
            phone: Some("+34 600 000 000".into()),
            location: None,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn register_then_login_round_trips() {
        let svc = service();
        let registered = svc.register(account("ana@example.org")).await.expect("register");
        assert!(registered.roles.is_empty());

        let creds = Credentials::try_from_parts("ana@example.org", "secret").expect("valid");
        let logged_in = svc.login(&creds).await.expect("login");
        assert_eq!(logged_in.id, registered.id);
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let svc = service();
        svc.register(account("ana@example.org")).await.expect("first");
        let err = svc
            .register(account("ana@example.org"))
            .await
            .expect_err("duplicate");
        assert_eq!(err.code(), crate::domain::ErrorCode::Conflict);
    }

    #[rstest]
    #[case("ana@example.org", "wrong")]
    #[case("nobody@example.org", "secret")]
    #[tokio::test]
    async fn bad_logins_share_one_error(#[case] email: &str, #[case] password: &str) {
        let svc = service();
        svc.register(account("ana@example.org")).await.expect("register");

        let creds = Credentials::try_from_parts(email, password).expect("valid shape");
        let err = svc.login(&creds).await.expect_err("rejected");
        assert_eq!(err.code(), crate::domain::ErrorCode::Unauthorized);
        assert_eq!(err.message(), "invalid login credentials");
    }

    #[rstest]
    #[tokio::test]
    async fn adding_skills_grants_the_volunteer_role() {
        let svc = service();
        let user = svc.register(account("ana@example.org")).await.expect("register");
        let updated = svc
            .add_skills(
                &user.id,
                &user.id,
                vec![VolunteerSkill {
                    category: "limpieza".into(),
                    subcategories: vec!["achique".into()],
                    has_experience: true,
                }],
            )
            .await
            .expect("add skills");
        assert!(updated.has_role(Role::Voluntario));
        assert_eq!(updated.skills.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn adding_an_assistance_request_grants_the_requester_role() {
        let svc = service();
        let user = svc.register(account("ana@example.org")).await.expect("register");
        let updated = svc
            .add_assistance_request(
                &user.id,
                &user.id,
                AssistanceRequest {
                    category: "alimentos".into(),
                    subcategories: vec![],
                    description: "supplies for three people".into(),
                    urgency: "alta".into(),
                    created_at: Utc::now(),
                },
            )
            .await
            .expect("add request");
        assert!(updated.has_role(Role::Solicitante));
    }

    #[rstest]
    #[tokio::test]
    async fn mutating_someone_elses_record_is_forbidden() {
        let svc = service();
        let ana = svc.register(account("ana@example.org")).await.expect("ana");
        let eva = svc.register(account("eva@example.org")).await.expect("eva");

        let err = svc
            .update(&ana.id, &eva.id, UserPatch::default())
            .await
            .expect_err("not the owner");
        assert_eq!(err.code(), crate::domain::ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn housing_offer_dates_must_be_ordered() {
        let svc = service();
        let user = svc.register(account("ana@example.org")).await.expect("register");
        let now = Utc::now();
        let err = svc
            .add_housing_offer(
                &user.id,
                &user.id,
                HousingOfferDraft {
                    address: "Calle Mayor 1".into(),
                    location: None,
                    start_date: now,
                    end_date: now - chrono::Duration::days(1),
                    max_occupancy: 2,
                    is_shared: true,
                    description: None,
                },
            )
            .await
            .expect_err("inverted dates");
        assert_eq!(err.code(), crate::domain::ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn housing_offers_start_active_with_an_id() {
        let svc = service();
        let user = svc.register(account("ana@example.org")).await.expect("register");
        let now = Utc::now();
        let updated = svc
            .add_housing_offer(
                &user.id,
                &user.id,
                HousingOfferDraft {
                    address: "Calle Mayor 1".into(),
                    location: None,
                    start_date: now,
                    end_date: now + chrono::Duration::days(14),
                    max_occupancy: 2,
                    is_shared: true,
                    description: Some("ground floor".into()),
                },
            )
            .await
            .expect("add offer");
        let offer = updated.temporary_housing.first().expect("offer stored");
        assert_eq!(offer.status, "active");
    }
}
