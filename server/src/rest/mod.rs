// server/src/rest/mod.rs

pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::api_routes;
