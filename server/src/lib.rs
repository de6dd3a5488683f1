// server/src/lib.rs

pub mod rest;
pub mod state;

pub use rest::routes::api_routes;
pub use state::AppState;
