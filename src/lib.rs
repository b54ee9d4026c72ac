//! Lead intake, pricing and approval service for real-estate flip deals.

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod routes;
pub mod util;

#[cfg(test)]
mod test_support;
