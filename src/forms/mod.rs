pub mod export;
pub mod lifecycle;
pub mod models;
pub mod services;
pub mod views;

#[cfg(test)]
mod tests;
