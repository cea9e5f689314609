pub mod config;
pub mod error;
pub mod extractors;
pub mod identity;
pub mod middleware;
pub mod rejection;
pub mod response;
