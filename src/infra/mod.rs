pub mod db;
pub mod error;
pub mod http;
pub mod page_cache;
pub mod telemetry;
