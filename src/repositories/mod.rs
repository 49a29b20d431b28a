pub mod quiz_repository;
pub mod revoked_token_repository;
pub mod user_repository;

pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use revoked_token_repository::{MongoRevokedTokenRepository, RevokedTokenRepository};
pub use user_repository::{MongoUserRepository, UserRepository};
