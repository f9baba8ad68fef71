//! MongoDB Atlas Administration API v2 client
//!
//! [`Client`] owns the HTTP connection pool, authentication and retry policy.
//! Each feature area is reached through a borrowed accessor such as
//! `client.flex_clusters()`.

pub mod alert_configs;
pub mod auth;
pub mod backup_snapshots;
pub mod client;
pub mod clusters;
pub mod common;
pub mod database_users;
pub mod encryption_at_rest;
pub mod error;
pub mod flex_clusters;
pub mod pool;
pub mod private_endpoints;

pub use auth::Credentials;
pub use client::{Client, RetryConfig, API_PREFIX};
pub use common::{PageRequest, Paginated};
pub use error::ApiError;
