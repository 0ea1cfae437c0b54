//! Carebase - patient record REST API
//!
//! Patient records with demographics, credentials and a set of embedded
//! sub-collections (vitals, medications, billing, ...), plus a bed
//! inventory. Storage sits behind [`db::RecordStore`] with PostgreSQL and
//! in-memory backends; the typed record model lives in `carebase-records`.

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod logging;
pub mod mail;
pub mod metrics;
pub mod models;
pub mod request_context;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
