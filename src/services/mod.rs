pub mod auth;
pub mod feed;
pub mod lifecycle;
pub mod notifier;
pub mod user_context;

pub use auth::AuthService;
pub use feed::ShiftFeed;
pub use notifier::NotificationDispatcher;
