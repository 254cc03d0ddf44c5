pub mod fallback;
pub mod health;
pub mod notifications;
pub mod users;
pub mod view;
