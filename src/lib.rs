pub mod browser;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod ordering;
pub mod schema;
pub mod session;
pub mod value;
pub mod web;
