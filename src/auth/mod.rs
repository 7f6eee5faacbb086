//! Bearer credential handling for the session endpoints.

mod bearer;
mod extractors;

pub use bearer::get_bearer;
pub use extractors::BearerToken;
