pub mod async_helpers;
pub mod authentication;
pub mod configuration;
pub mod domain;
pub mod email_client;
mod error_handling;
pub mod routes;
pub mod routing_helpers;
pub mod session_state;
pub mod startup;
pub mod telemetry;
pub mod views;
