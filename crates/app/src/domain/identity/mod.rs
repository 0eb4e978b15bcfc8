//! Identity claims and the authenticated session.

pub mod claims;
pub mod errors;
pub mod session;

pub use claims::{ClaimsSource, DecodedToken, IdentityClaims, MockClaimsSource, Role};
pub use errors::ClaimsError;
pub use session::AuthSessionManager;
