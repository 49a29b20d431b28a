pub mod oauth_service;
pub mod quiz_service;
pub mod user_service;

pub use oauth_service::GithubOAuthService;
pub use quiz_service::QuizService;
pub use user_service::UserService;
