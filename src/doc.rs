//! OpenAPI documentation configuration.
//!
//! Registers every HTTP endpoint and the schemas their payloads reference.
//! The generated document backs Swagger UI, which is mounted in debug
//! builds only.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::{carpools, health, users};
use crate::domain::error::{DomainError, ErrorCode};
use crate::domain::{
    AssistanceRequest, CarpoolId, CarpoolStatus, ContactDetails, GeoPoint, HousingOffer, Role,
    UserId, VolunteerSkill,
};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/users/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Riada backend API",
        description = "Flood-relief coordination: accounts, relief intake, and carpools."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        users::register,
        users::login,
        users::logout,
        users::list,
        users::profile,
        users::update,
        users::add_skills,
        users::add_assistance,
        users::add_housing,
        carpools::create,
        carpools::list,
        carpools::get,
        carpools::join,
        carpools::leave,
        carpools::delete,
        health::ready,
        health::live,
    ),
    components(schemas(
        users::RegisterRequest,
        users::LoginRequest,
        users::UpdateUserRequest,
        users::SkillsRequest,
        users::AssistanceRequestInput,
        users::HousingOfferRequest,
        users::ProfileView,
        users::DirectoryUserView,
        carpools::LocationInput,
        carpools::CreateCarpoolRequest,
        carpools::CarpoolUserView,
        carpools::CarpoolView,
        health::HealthReport,
        DomainError,
        ErrorCode,
        ContactDetails,
        GeoPoint,
        UserId,
        CarpoolId,
        CarpoolStatus,
        Role,
        VolunteerSkill,
        AssistanceRequest,
        HousingOffer,
    )),
    tags(
        (name = "users", description = "Accounts, sessions, and relief intake"),
        (name = "carpools", description = "Carpool offers and the seat lifecycle"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_registers_the_carpool_lifecycle_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/carpools",
            "/api/carpools/{id}",
            "/api/carpools/{id}/join",
            "/api/carpools/{id}/leave",
            "/api/users/register",
            "/health/ready",
        ] {
            assert!(
                doc.paths.paths.contains_key(path),
                "missing path {path} in the OpenAPI document"
            );
        }
    }

    #[test]
    fn document_registers_the_error_schema() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        assert!(schemas.keys().any(|name| name.ends_with("DomainError")));
    }
}
