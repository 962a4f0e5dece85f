// Library exports for the Memories client
// The binary and the integration tests both build on these modules

pub mod api;
pub mod app;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod forms;
pub mod models;
pub mod render;
pub mod session;
pub mod store;
