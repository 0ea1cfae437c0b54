//! Request handlers for API endpoints
//!
//! Handlers extract the request, call one service method and wrap the
//! result in the response envelope. Errors propagate with `?`.

pub mod accounts;
pub mod beds;
pub mod entries;
pub mod metrics;
pub mod patients;
