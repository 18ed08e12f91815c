//! Domain layer: aggregates, the carpool lifecycle state machine, the
//! visibility policy, and the ports driven adapters implement.
//!
//! Nothing in this module knows about HTTP, sessions, or MongoDB. Inbound
//! adapters translate [`DomainError`] into transport envelopes; outbound
//! adapters implement the traits in [`ports`].

pub mod auth;
pub mod carpools;
pub mod error;
pub mod geo;
pub mod ports;
pub mod users;
pub mod visibility;

pub use self::carpools::service::CarpoolService;
pub use self::carpools::{
    Carpool, CarpoolDraft, CarpoolFilter, CarpoolId, CarpoolStatus, CarpoolValidationError,
    JoinRejection, MAX_PASSENGERS, MIN_PASSENGERS,
};
pub use self::error::{DomainError, ErrorCode};
pub use self::geo::GeoPoint;
pub use self::users::service::{HousingOfferDraft, NewAccount, UserPatch, UserService};
pub use self::users::{AssistanceRequest, HousingOffer, Role, User, UserId, VolunteerSkill};
pub use self::visibility::{ContactDetails, Viewer};
