pub mod incubation;
pub mod models;
pub mod readings;
pub mod services;
pub mod views;
