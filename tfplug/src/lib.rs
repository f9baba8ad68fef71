//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust: schemas, dynamic
//! values, resource and data source traits, a status poller for long-running
//! remote operations, and an in-process server that drives a provider on
//! msgpack-encoded values.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod retry;
pub mod timeouts;
pub mod validator;

pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use retry::{StateChangeConf, WaitError, WaitOutcome};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{init_logging, LogLevel, ProviderServer, ServerConfig};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
