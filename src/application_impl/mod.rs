mod account_service_fake;
mod auth_service_impl;
mod claims_codec_jwt;
mod session_validator_impl;
mod token_authority_impl;

pub use account_service_fake::*;
pub use auth_service_impl::*;
pub use claims_codec_jwt::*;
pub use session_validator_impl::*;
pub use token_authority_impl::*;
