//! Pure domain logic for the Gatehouse proxy control plane.
//!
//! Nothing in this crate touches the database, the network, or the
//! filesystem. The pipeline crate wires these functions to real
//! collaborators.

pub mod advanced_config;
pub mod caddy_import;
pub mod error;
pub mod import_session;
pub mod reconcile;
pub mod resolution;
pub mod types;
pub mod upload_path;
