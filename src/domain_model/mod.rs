mod account;
mod token;
mod user;

pub use account::*;
pub use token::*;
pub use user::*;
