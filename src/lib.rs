pub mod composer;
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;

#[cfg(feature = "proxy-server")]
pub mod proxy;
