mod account_service;
mod auth_service;
mod session_service;
mod token_service;

pub use account_service::*;
pub use auth_service::*;
pub use session_service::*;
pub use token_service::*;
