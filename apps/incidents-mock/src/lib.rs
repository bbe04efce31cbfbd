pub mod cli;
pub mod config;
pub mod definitions;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod time;

#[cfg(test)]
pub mod test_support;
