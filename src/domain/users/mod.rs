//! User aggregate: account identity, roles, and the embedded relief records
//! (volunteer skills, assistance requests, temporary-housing offers).

pub mod service;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::PasswordDigest;
use super::geo::GeoPoint;

/// Stable user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Mint a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Relief roles a user can hold. Role names are kept in the source data's
/// original Spanish because every stored document already uses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Offers help: skills, rides, housing.
    Voluntario,
    /// Seeks assistance.
    Solicitante,
}

impl Role {
    /// Stable string form used in stored documents.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voluntario => "voluntario",
            Self::Solicitante => "solicitante",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voluntario" => Ok(Self::Voluntario),
            "solicitante" => Ok(Self::Solicitante),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A skill a volunteer offers, grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerSkill {
    #[schema(example = "limpieza")]
    pub category: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
    #[serde(default)]
    pub has_experience: bool,
}

/// A request for help embedded in the requesting user's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssistanceRequest {
    #[schema(example = "alimentos")]
    pub category: String,
    #[serde(default)]
    pub subcategories: Vec<String>,
    pub description: String,
    /// Free-text urgency level as captured by the intake form.
    #[schema(example = "alta")]
    pub urgency: String,
    pub created_at: DateTime<Utc>,
}

/// A temporary-housing offer embedded in the host's record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HousingOffer {
    /// Offer identifier, assigned when the offer is added.
    pub id: Uuid,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_occupancy: u32,
    pub is_shared: bool,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-text status, `active` when first offered.
    #[schema(example = "active")]
    pub status: String,
}

/// Application user.
///
/// ## Ownership
/// A user record is mutated only by that user; handlers enforce the
/// requester/target match before calling the service.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique, normalised (trimmed, lowercased) email address.
    pub email: String,
    /// Never serialised outward; see [`PasswordDigest`].
    pub password_digest: PasswordDigest,
    pub phone: Option<String>,
    pub roles: Vec<Role>,
    pub location: Option<GeoPoint>,
    pub skills: Vec<VolunteerSkill>,
    pub assistance_requests: Vec<AssistanceRequest>,
    pub temporary_housing: Vec<HousingOffer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Grant a role, keeping the role list free of duplicates.
    ///
    /// The original intake flows appended roles unconditionally and relied
    /// on consumers to de-duplicate; the set semantics live here instead.
    pub fn grant_role(&mut self, role: Role) {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
    }

    /// Whether the user currently holds the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}
