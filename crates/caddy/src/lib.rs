//! Caddy integration: Caddyfile import parsing, JSON config generation,
//! and the admin API client used to push configuration to a running
//! Caddy instance.

pub mod admin;
pub mod caddyfile;
pub mod config;
