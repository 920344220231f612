//! Bearer-token verification. Tokens are issued by the external auth provider.

mod claims;
pub mod extractors;
pub mod jwt;

pub use extractors::{AuthUser, Session};
