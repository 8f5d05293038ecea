//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod redis_cache;
pub mod telemetry;
