pub mod claims;
pub mod factory;
pub mod guard;
pub mod id_token;
pub mod identity;
pub mod mapper;
pub mod resolver;
pub mod store;
pub mod verifier;

pub use guard::{AuthGuard, AuthSettings};
pub use identity::IdentityRecord;
