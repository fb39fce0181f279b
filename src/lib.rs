// Library root: the binary and the integration tests both build on these
// modules.

pub mod clock;
pub mod config;
pub mod dto;
pub mod engine;
pub mod error;
pub mod routes;
pub mod services;
pub mod store;
