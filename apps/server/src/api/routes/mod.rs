//! Route tables, one module per resource.

pub mod accounts;
pub mod beds;
pub mod metrics;
pub mod patients;
