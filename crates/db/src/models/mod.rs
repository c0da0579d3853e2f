pub mod import_session;
pub mod proxy_host;
