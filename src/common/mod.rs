pub mod auth;
pub mod dates;
pub mod errors;
pub mod models;
pub mod state;
pub mod views;
