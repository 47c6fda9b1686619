pub mod conformity;
pub mod models;
pub mod services;
pub mod views;

#[cfg(test)]
pub mod test_support;
