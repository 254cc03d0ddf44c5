pub mod api;
pub mod core;
pub mod dashboard;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod stores;
pub mod validation;
