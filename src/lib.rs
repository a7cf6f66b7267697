pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod monitoring;
pub mod property;
pub mod valuation;
