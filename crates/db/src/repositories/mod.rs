//! Repository layer: one zero-sized struct per table with async
//! associated functions taking the pool.

pub mod import_session_repo;
pub mod proxy_host_repo;

pub use import_session_repo::ImportSessionRepo;
pub use proxy_host_repo::ProxyHostRepo;
