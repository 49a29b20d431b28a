pub mod quiz;
pub mod revoked_token;
pub mod user;

pub use quiz::Quiz;
pub use revoked_token::RevokedToken;
pub use user::{User, UserRole};
