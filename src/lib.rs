//! dstls - checks where a 389 Directory Server instance keeps its TLS material.

pub mod cert;
pub mod checks;
pub mod cli;
pub mod config;
pub mod error;
pub mod instance;
pub mod layout;
pub mod logging;
pub mod platform;
pub mod systemd;
pub mod trust;
pub mod version;
