pub mod dns_cache;
pub mod engine;
pub mod host;
pub mod listener;
pub mod registry;
pub mod stats;
