//! hiddb-client: client and scenario driver for the hiddb vector index service.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod request;
pub mod response;
pub mod scenario;
pub mod settle;
pub mod types;

pub use client::{IndexClient, IndexService};
pub use error::{ClientError, Result};
pub use response::ApiResponse;
