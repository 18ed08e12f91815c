//! Account endpoints: registration, login, the member directory, and the
//! intake operations appending relief records to a profile.
//!
//! Directory responses run through the visibility policy: phone and email
//! appear only for authenticated viewers. A user's own profile view is
//! never redacted.

use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::auth::Credentials;
use crate::domain::visibility::directory_contact;
use crate::domain::{
    AssistanceRequest, DomainError, GeoPoint, HousingOffer, HousingOfferDraft, NewAccount, Role,
    User, UserId, UserPatch, Viewer, VolunteerSkill,
};
use crate::server::AppState;

use super::{current_user_id, establish_session, viewer, ApiError, ApiResult};

/// Registration payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[schema(example = "Ana García")]
    pub name: String,
    #[schema(example = "ana@example.org")]
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Login payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ana@example.org")]
    pub email: String,
    pub password: String,
}

/// Owner-initiated profile updates; absent fields are left untouched.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Volunteer-skills intake payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SkillsRequest {
    pub skills: Vec<VolunteerSkill>,
}

/// Assistance-request intake payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssistanceRequestInput {
    #[schema(example = "alimentos")]
    pub category: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub description: String,
    #[schema(example = "alta")]
    pub urgency: String,
}

/// Temporary-housing intake payload.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HousingOfferRequest {
    pub address: String,
    pub location: Option<GeoPoint>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_occupancy: u32,
    #[serde(default)]
    pub is_shared: bool,
    pub description: Option<String>,
}

/// A user's own profile: every field except the credential digest.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub roles: Vec<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub skills: Vec<VolunteerSkill>,
    pub assistance_requests: Vec<AssistanceRequest>,
    pub temporary_housing: Vec<HousingOffer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            roles: user.roles,
            location: user.location,
            skills: user.skills,
            assistance_requests: user.assistance_requests,
            temporary_housing: user.temporary_housing,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A directory entry with viewer-dependent contact fields.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUserView {
    pub id: UserId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub roles: Vec<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    pub skills: Vec<VolunteerSkill>,
    pub assistance_requests: Vec<AssistanceRequest>,
    pub temporary_housing: Vec<HousingOffer>,
}

/// Build a directory entry for the given viewer.
pub(crate) fn directory_user_view(user: User, viewer: &Viewer) -> DirectoryUserView {
    let contact = directory_contact(&user, viewer);
    let (phone, email) = match contact {
        Some(contact) => (contact.phone, Some(contact.email)),
        None => (None, None),
    };
    DirectoryUserView {
        id: user.id,
        name: user.name,
        email,
        phone,
        roles: user.roles,
        location: user.location,
        skills: user.skills,
        assistance_requests: user.assistance_requests,
        temporary_housing: user.temporary_housing,
    }
}

fn credentials(email: &str, password: &str) -> ApiResult<Credentials> {
    Credentials::try_from_parts(email, password)
        .map_err(|err| ApiError::from(DomainError::invalid_request(err.to_string())))
}

/// Register an account and start its session.
#[utoipa::path(
    post,
    path = "/api/users/register",
    tag = "users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ProfileView),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let account = NewAccount {
        name: body.name,
        credentials: credentials(&body.email, &body.password)?,
        phone: body.phone,
        location: body.location,
    };
    let user = state.users.register(account).await?;
    establish_session(&session, &user.id)?;
    Ok(HttpResponse::Created().json(ProfileView::from(user)))
}

/// Verify credentials and start a session.
#[utoipa::path(
    post,
    path = "/api/users/login",
    tag = "users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session established", body = ProfileView),
        (status = 401, description = "Invalid login credentials")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    session: Session,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let creds = credentials(&body.email, &body.password)?;
    let user = state.users.login(&creds).await?;
    establish_session(&session, &user.id)?;
    Ok(HttpResponse::Ok().json(ProfileView::from(user)))
}

/// Drop the session.
#[utoipa::path(
    post,
    path = "/api/users/logout",
    tag = "users",
    responses((status = 204, description = "Session cleared"))
)]
pub async fn logout(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// List the member directory, redacted for the viewer.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses((status = 200, description = "Directory listing", body = [DirectoryUserView]))
)]
pub async fn list(state: web::Data<AppState>, session: Session) -> ApiResult<HttpResponse> {
    let viewer = viewer(&session);
    let users = state.users.list().await?;
    let listing: Vec<DirectoryUserView> = users
        .into_iter()
        .map(|user| directory_user_view(user, &viewer))
        .collect();
    Ok(HttpResponse::Ok().json(listing))
}

/// The authenticated user's own profile.
#[utoipa::path(
    get,
    path = "/api/users/profile",
    tag = "users",
    responses(
        (status = 200, description = "Own profile", body = ProfileView),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn profile(state: web::Data<AppState>, session: Session) -> ApiResult<HttpResponse> {
    let user_id = current_user_id(&session)?;
    let user = state.users.get(&user_id).await?;
    Ok(HttpResponse::Ok().json(ProfileView::from(user)))
}

/// Update the caller's own profile fields.
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = UserId, Path, description = "User identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the record owner")
    )
)]
pub async fn update(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<UserId>,
    body: web::Json<UpdateUserRequest>,
) -> ApiResult<HttpResponse> {
    let requester = current_user_id(&session)?;
    let body = body.into_inner();
    let patch = UserPatch {
        name: body.name,
        phone: body.phone,
        location: body.location,
    };
    let user = state.users.update(&requester, &path, patch).await?;
    Ok(HttpResponse::Ok().json(ProfileView::from(user)))
}

/// Append volunteer skills, granting the `voluntario` role.
#[utoipa::path(
    post,
    path = "/api/users/{id}/skills",
    tag = "users",
    params(("id" = UserId, Path, description = "User identifier")),
    request_body = SkillsRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the record owner")
    )
)]
pub async fn add_skills(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<UserId>,
    body: web::Json<SkillsRequest>,
) -> ApiResult<HttpResponse> {
    let requester = current_user_id(&session)?;
    let user = state
        .users
        .add_skills(&requester, &path, body.into_inner().skills)
        .await?;
    Ok(HttpResponse::Ok().json(ProfileView::from(user)))
}

/// Append an assistance request, granting the `solicitante` role.
#[utoipa::path(
    post,
    path = "/api/users/{id}/assistance",
    tag = "users",
    params(("id" = UserId, Path, description = "User identifier")),
    request_body = AssistanceRequestInput,
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the record owner")
    )
)]
pub async fn add_assistance(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<UserId>,
    body: web::Json<AssistanceRequestInput>,
) -> ApiResult<HttpResponse> {
    let requester = current_user_id(&session)?;
    let body = body.into_inner();
    let request = AssistanceRequest {
        category: body.category,
        subcategories: body.subcategories,
        description: body.description,
        urgency: body.urgency,
        created_at: Utc::now(),
    };
    let user = state
        .users
        .add_assistance_request(&requester, &path, request)
        .await?;
    Ok(HttpResponse::Ok().json(ProfileView::from(user)))
}

/// Append a temporary-housing offer.
#[utoipa::path(
    post,
    path = "/api/users/{id}/housing",
    tag = "users",
    params(("id" = UserId, Path, description = "User identifier")),
    request_body = HousingOfferRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileView),
        (status = 400, description = "Invalid offer dates"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the record owner")
    )
)]
pub async fn add_housing(
    state: web::Data<AppState>,
    session: Session,
    path: web::Path<UserId>,
    body: web::Json<HousingOfferRequest>,
) -> ApiResult<HttpResponse> {
    let requester = current_user_id(&session)?;
    let body = body.into_inner();
    let draft = HousingOfferDraft {
        address: body.address,
        location: body.location,
        start_date: body.start_date,
        end_date: body.end_date,
        max_occupancy: body.max_occupancy,
        is_shared: body.is_shared,
        description: body.description,
    };
    let user = state
        .users
        .add_housing_offer(&requester, &path, draft)
        .await?;
    Ok(HttpResponse::Ok().json(ProfileView::from(user)))
}
