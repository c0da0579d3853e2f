//! Caddyfile import, reconciliation and live-apply pipeline.
//!
//! Services in this crate talk to their collaborators (host store,
//! session store, Caddyfile parser, live config applier) only through the
//! traits in [`store`]. PostgreSQL and Caddy implementations live in
//! [`pg`] and [`caddy`]; [`memory`] provides in-process fakes.

pub mod caddy;
pub mod convert;
pub mod error;
pub mod hosts;
pub mod import;
pub mod memory;
pub mod pg;
pub mod store;
