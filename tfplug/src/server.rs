//! Server module for driving Terraform providers
//!
//! [`ProviderServer`] implements the plugin protocol's provider operations on
//! msgpack-encoded values: schema discovery, validation, configuration,
//! planning, apply, read, import and data source reads. The wire transport
//! carrying these bytes lives outside this crate.
//!
//! Every call instantiates a fresh resource or data source from the
//! provider's factories and configures it with the provider data returned by
//! the last successful `configure_provider`.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceWithConfigure, ReadDataSourceRequest,
    ValidateDataSourceConfigRequest,
};
use crate::plan_modifier::values_equal;
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderSchemaRequest, StopProviderRequest,
    ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ResourceSchemaRequest, ResourceWithConfigure, UpdateResourceRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::{
    Block, DefaultRequest, NestingMode, PlanModifierRequest, Schema, ValidatorRequest,
};
use crate::types::{
    has_errors, AttributePath, ClientCapabilities, Diagnostic, Dynamic, DynamicValue,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::Instrument;

/// Log level for the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Read `TF_LOG` the way Terraform spells its levels
    pub fn from_env() -> Option<Self> {
        std::env::var("TF_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
    }

    fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" | "JSON" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Install a stderr fmt subscriber; stdout is reserved for the plugin handshake.
/// `RUST_LOG` overrides `level`. Does nothing if a subscriber is already set.
pub fn init_logging(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Whether to enable logging
    pub enable_logging: bool,
    /// Log level
    pub log_level: LogLevel,
    /// Terraform version reported to the provider
    pub terraform_version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            log_level: LogLevel::from_env().unwrap_or(LogLevel::Info),
            terraform_version: "1.9.0".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable logging
    pub fn without_logging(mut self) -> Self {
        self.enable_logging = false;
        self
    }

    pub fn with_terraform_version(mut self, version: impl Into<String>) -> Self {
        self.terraform_version = version.into();
        self
    }
}

pub struct GetProviderSchemaResponse {
    pub provider: Schema,
    pub resource_schemas: HashMap<String, Schema>,
    pub data_source_schemas: HashMap<String, Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct PlanResponse {
    pub planned_state: Vec<u8>,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ApplyResponse {
    pub new_state: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResponse {
    /// Empty when the resource no longer exists
    pub new_state: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportedState {
    pub type_name: String,
    pub state: Vec<u8>,
}

pub struct ImportResponse {
    pub imported_resources: Vec<ImportedState>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DataSourceResponse {
    pub state: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: RwLock<Option<Arc<dyn Any + Send + Sync>>>,
    root: Context,
    config: ServerConfig,
}

impl<P: Provider + 'static> ProviderServer<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, ServerConfig::default())
    }

    pub fn with_config(provider: P, config: ServerConfig) -> Self {
        if config.enable_logging {
            init_logging(config.log_level);
        }

        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: RwLock::new(None),
            root: Context::new(),
            config,
        }
    }

    /// Context for one operation; cancelled by `stop_provider`
    fn operation_context(&self) -> Context {
        self.root.child()
    }

    pub async fn get_provider_schema(&self) -> GetProviderSchemaResponse {
        let ctx = self.operation_context();
        let provider = self.provider.read().await;
        let mut diagnostics = vec![];

        let provider_schema = provider
            .schema(ctx.clone(), ProviderSchemaRequest)
            .await;
        diagnostics.extend(provider_schema.diagnostics);

        let mut resource_schemas = HashMap::new();
        for (name, factory) in provider.resources() {
            let resource = factory();
            let response = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resource_schemas.insert(name, response.schema);
        }

        let mut data_source_schemas = HashMap::new();
        for (name, factory) in provider.data_sources() {
            let data_source = factory();
            let response = data_source
                .schema(ctx.clone(), crate::data_source::DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(name, response.schema);
        }

        GetProviderSchemaResponse {
            provider: provider_schema.schema,
            resource_schemas,
            data_source_schemas,
            diagnostics,
        }
    }

    pub async fn validate_provider_config(&self, config: &[u8]) -> Vec<Diagnostic> {
        let config = match decode(config, "config") {
            Ok(config) => config,
            Err(diag) => return vec![diag],
        };
        let ctx = self.operation_context();
        let provider = self.provider.read().await;

        let schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        let mut diagnostics = validate_against_schema(&schema.schema.block, &config.value, None);
        diagnostics.extend(
            provider
                .validate(ctx, ValidateProviderConfigRequest { config })
                .await
                .diagnostics,
        );
        diagnostics
    }

    pub async fn configure_provider(&self, config: &[u8]) -> Vec<Diagnostic> {
        let config = match decode(config, "config") {
            Ok(config) => config,
            Err(diag) => return vec![diag],
        };
        let ctx = self.operation_context();

        async {
            let mut provider = self.provider.write().await;
            let response = provider
                .configure(
                    ctx,
                    ConfigureProviderRequest {
                        terraform_version: self.config.terraform_version.clone(),
                        config,
                        client_capabilities: ClientCapabilities::default(),
                    },
                )
                .await;

            if !has_errors(&response.diagnostics) {
                *self.provider_data.write().await = response.provider_data;
                tracing::info!("provider configured");
            }
            response.diagnostics
        }
        .instrument(tracing::info_span!("configure_provider"))
        .await
    }

    pub async fn stop_provider(&self) -> Option<String> {
        self.root.cancel();
        let provider = self.provider.read().await;
        provider
            .stop(Context::new(), StopProviderRequest)
            .await
            .error
    }

    pub async fn validate_resource_config(&self, type_name: &str, config: &[u8]) -> Vec<Diagnostic> {
        let config = match decode(config, "config") {
            Ok(config) => config,
            Err(diag) => return vec![diag],
        };
        let ctx = self.operation_context();
        let resource = match self.new_resource(type_name).await {
            Ok(resource) => resource,
            Err(diags) => return diags,
        };

        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await.schema;
        let mut diagnostics = validate_against_schema(&schema.block, &config.value, None);
        diagnostics.extend(
            resource
                .validate(
                    ctx,
                    ValidateResourceConfigRequest {
                        type_name: type_name.to_string(),
                        config,
                        client_capabilities: ClientCapabilities::default(),
                    },
                )
                .await
                .diagnostics,
        );
        diagnostics
    }

    pub async fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &[u8],
    ) -> Vec<Diagnostic> {
        let config = match decode(config, "config") {
            Ok(config) => config,
            Err(diag) => return vec![diag],
        };
        let ctx = self.operation_context();
        let data_source = match self.new_data_source(type_name).await {
            Ok(data_source) => data_source,
            Err(diags) => return diags,
        };

        let schema = data_source
            .schema(ctx.clone(), crate::data_source::DataSourceSchemaRequest)
            .await
            .schema;
        let mut diagnostics = validate_against_schema(&schema.block, &config.value, None);
        diagnostics.extend(
            data_source
                .validate(
                    ctx,
                    ValidateDataSourceConfigRequest {
                        type_name: type_name.to_string(),
                        config,
                    },
                )
                .await
                .diagnostics,
        );
        diagnostics
    }

    /// Compute the planned state: computed attributes the config leaves null
    /// become unknown when anything changes, defaults fill unset optionals, then
    /// plan modifiers run and collect requires-replace paths.
    pub async fn plan_resource_change(
        &self,
        type_name: &str,
        prior_state: &[u8],
        proposed_new_state: &[u8],
        config: &[u8],
    ) -> PlanResponse {
        let decoded = decode(prior_state, "prior state").and_then(|prior| {
            Ok((
                prior,
                decode(proposed_new_state, "proposed new state")?,
                decode(config, "config")?,
            ))
        });
        let (prior, proposed, config) = match decoded {
            Ok(values) => values,
            Err(diag) => return PlanResponse::failed(vec![diag]),
        };

        if proposed.is_null() {
            return PlanResponse {
                planned_state: Vec::new(),
                requires_replace: vec![],
                diagnostics: vec![],
            };
        }

        let ctx = self.operation_context();
        let resource = match self.new_resource(type_name).await {
            Ok(resource) => resource,
            Err(diags) => return PlanResponse::failed(diags),
        };
        let schema = resource.schema(ctx, ResourceSchemaRequest).await.schema;

        let is_create = prior.is_null();
        let has_changes = is_create || !values_equal(&prior.value, &proposed.value);
        let mut planned = proposed.clone();
        let mut requires_replace = vec![];
        let mut diagnostics = vec![];

        for attribute in &schema.block.attributes {
            let path = AttributePath::new(&attribute.name);
            let config_value = config.get(&path);

            if attribute.computed && config_value.is_null() {
                let value = match &attribute.default {
                    Some(default) => {
                        default
                            .default_value(DefaultRequest { path: path.clone() })
                            .value
                    }
                    None if has_changes => Dynamic::Unknown,
                    None => prior.get(&path),
                };
                let _ = planned.set(&path, value);
            }

            for modifier in &attribute.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: config_value.clone(),
                    state_value: prior.get(&path),
                    plan_value: planned.get(&path),
                    path: path.clone(),
                    prior_state: prior.clone(),
                });
                let _ = planned.set(&path, response.plan_value);
                if response.requires_replace {
                    requires_replace.push(path.clone());
                }
                diagnostics.extend(response.diagnostics);
            }
        }

        if !requires_replace.is_empty() {
            tracing::debug!(type_name, ?requires_replace, "plan requires replacement");
        }

        match planned.encode_msgpack() {
            Ok(planned_state) => PlanResponse {
                planned_state,
                requires_replace,
                diagnostics,
            },
            Err(e) => PlanResponse::failed(vec![Diagnostic::error(
                "Failed to encode planned state",
                e.to_string(),
            )]),
        }
    }

    /// Create when prior state is null, delete when planned state is null,
    /// update otherwise
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior_state: &[u8],
        planned_state: &[u8],
        config: &[u8],
    ) -> ApplyResponse {
        let decoded = decode(prior_state, "prior state").and_then(|prior| {
            Ok((
                prior,
                decode(planned_state, "planned state")?,
                decode(config, "config")?,
            ))
        });
        let (prior, planned, config) = match decoded {
            Ok(values) => values,
            Err(diag) => return ApplyResponse::failed(vec![diag], &DynamicValue::null()),
        };

        let ctx = self.operation_context();
        let resource = match self.new_resource(type_name).await {
            Ok(resource) => resource,
            Err(diags) => return ApplyResponse::failed(diags, &prior),
        };

        if prior.is_null() {
            let span = tracing::info_span!("create", type_name);
            let response = resource
                .create(
                    ctx,
                    CreateResourceRequest {
                        type_name: type_name.to_string(),
                        planned_state: planned,
                        config,
                        planned_private: vec![],
                        provider_meta: None,
                    },
                )
                .instrument(span)
                .await;

            if has_errors(&response.diagnostics) {
                // Partial state is kept when the resource reports one (e.g. an
                // id after a timed-out wait) so it can be tainted and cleaned up.
                let keep = !response.new_state.value.contains_unknown();
                let state = if keep {
                    response.new_state
                } else {
                    DynamicValue::null()
                };
                return ApplyResponse::failed(response.diagnostics, &state);
            }
            ApplyResponse::applied(response.new_state, response.diagnostics)
        } else if planned.is_null() {
            let span = tracing::info_span!("delete", type_name);
            let response = resource
                .delete(
                    ctx,
                    DeleteResourceRequest {
                        type_name: type_name.to_string(),
                        prior_state: prior.clone(),
                        planned_private: vec![],
                        provider_meta: None,
                    },
                )
                .instrument(span)
                .await;

            if has_errors(&response.diagnostics) {
                return ApplyResponse::failed(response.diagnostics, &prior);
            }
            ApplyResponse {
                new_state: Vec::new(),
                diagnostics: response.diagnostics,
            }
        } else {
            let span = tracing::info_span!("update", type_name);
            let response = resource
                .update(
                    ctx,
                    UpdateResourceRequest {
                        type_name: type_name.to_string(),
                        prior_state: prior.clone(),
                        planned_state: planned,
                        config,
                        planned_private: vec![],
                        provider_meta: None,
                    },
                )
                .instrument(span)
                .await;

            if has_errors(&response.diagnostics) {
                return ApplyResponse::failed(response.diagnostics, &prior);
            }
            ApplyResponse::applied(response.new_state, response.diagnostics)
        }
    }

    pub async fn read_resource(&self, type_name: &str, current_state: &[u8]) -> ReadResponse {
        let current = match decode(current_state, "current state") {
            Ok(current) => current,
            Err(diag) => {
                return ReadResponse {
                    new_state: current_state.to_vec(),
                    diagnostics: vec![diag],
                }
            }
        };

        let ctx = self.operation_context();
        let resource = match self.new_resource(type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ReadResponse {
                    new_state: current_state.to_vec(),
                    diagnostics,
                }
            }
        };

        let response = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state: current,
                    private: vec![],
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .instrument(tracing::debug_span!("read", type_name))
            .await;

        let mut diagnostics = response.diagnostics;
        let new_state = match response.new_state {
            Some(state) => match state.encode_msgpack() {
                Ok(bytes) => bytes,
                Err(e) => {
                    diagnostics.push(Diagnostic::error("Failed to encode state", e.to_string()));
                    current_state.to_vec()
                }
            },
            None => {
                tracing::info!(type_name, "resource no longer exists, removing from state");
                Vec::new()
            }
        };

        ReadResponse {
            new_state,
            diagnostics,
        }
    }

    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> ImportResponse {
        let ctx = self.operation_context();
        let resource = match self.new_resource(type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ImportResponse {
                    imported_resources: vec![],
                    diagnostics,
                }
            }
        };

        let Some(importer) = resource.as_import_state() else {
            return ImportResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Resource import not supported",
                    format!("{} does not support import", type_name),
                )],
            };
        };

        let ImportResourceStateResponse {
            imported_resources,
            mut diagnostics,
        } = importer
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .instrument(tracing::info_span!("import", type_name, id))
            .await;

        if has_errors(&diagnostics) {
            return ImportResponse {
                imported_resources: vec![],
                diagnostics,
            };
        }

        // Imported states are partial; a read fills in the rest
        let mut imported = vec![];
        for partial in imported_resources {
            let response = resource
                .read(
                    self.operation_context(),
                    ReadResourceRequest {
                        type_name: partial.type_name.clone(),
                        current_state: partial.state,
                        private: partial.private,
                        provider_meta: None,
                        client_capabilities: ClientCapabilities::default(),
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);

            let Some(state) = response.new_state else {
                diagnostics.push(Diagnostic::error(
                    "Cannot import non-existent remote object",
                    format!(
                        "While attempting to import an existing object to {}, the provider \
                         detected that no object exists with the given id {:?}.",
                        partial.type_name, id
                    ),
                ));
                continue;
            };
            match state.encode_msgpack() {
                Ok(state) => imported.push(ImportedState {
                    type_name: partial.type_name,
                    state,
                }),
                Err(e) => diagnostics.push(Diagnostic::error(
                    "Failed to encode imported state",
                    e.to_string(),
                )),
            }
        }

        ImportResponse {
            imported_resources: imported,
            diagnostics,
        }
    }

    pub async fn read_data_source(&self, type_name: &str, config: &[u8]) -> DataSourceResponse {
        let config = match decode(config, "config") {
            Ok(config) => config,
            Err(diag) => {
                return DataSourceResponse {
                    state: Vec::new(),
                    diagnostics: vec![diag],
                }
            }
        };

        let ctx = self.operation_context();
        let data_source = match self.new_data_source(type_name).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => {
                return DataSourceResponse {
                    state: Vec::new(),
                    diagnostics,
                }
            }
        };

        let response = data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config,
                    provider_meta: None,
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .instrument(tracing::debug_span!("read_data_source", type_name))
            .await;

        let mut diagnostics = response.diagnostics;
        let state = if has_errors(&diagnostics) {
            Vec::new()
        } else {
            match response.state.encode_msgpack() {
                Ok(bytes) => bytes,
                Err(e) => {
                    diagnostics.push(Diagnostic::error("Failed to encode state", e.to_string()));
                    Vec::new()
                }
            }
        };

        DataSourceResponse { state, diagnostics }
    }

    async fn provider_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.provider_data.read().await.clone()
    }

    async fn new_resource(
        &self,
        type_name: &str,
    ) -> Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let mut resource = {
            let provider = self.provider.read().await;
            let factories = provider.resources();
            let factory = factories.get(type_name).ok_or_else(|| {
                vec![Diagnostic::error(
                    "Unknown resource type",
                    format!("The provider does not support resource type {}", type_name),
                )]
            })?;
            factory()
        };

        let response = resource
            .configure(
                self.operation_context(),
                ConfigureResourceRequest {
                    provider_data: self.provider_data().await,
                },
            )
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(resource)
    }

    async fn new_data_source(
        &self,
        type_name: &str,
    ) -> Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let mut data_source = {
            let provider = self.provider.read().await;
            let factories = provider.data_sources();
            let factory = factories.get(type_name).ok_or_else(|| {
                vec![Diagnostic::error(
                    "Unknown data source type",
                    format!("The provider does not support data source {}", type_name),
                )]
            })?;
            factory()
        };

        let response = data_source
            .configure(
                self.operation_context(),
                ConfigureDataSourceRequest {
                    provider_data: self.provider_data().await,
                },
            )
            .await;
        if has_errors(&response.diagnostics) {
            return Err(response.diagnostics);
        }
        Ok(data_source)
    }
}

impl PlanResponse {
    fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            planned_state: Vec::new(),
            requires_replace: vec![],
            diagnostics,
        }
    }
}

impl ApplyResponse {
    fn applied(state: DynamicValue, mut diagnostics: Vec<Diagnostic>) -> Self {
        if state.value.contains_unknown() {
            diagnostics.push(Diagnostic::error(
                "Provider returned invalid result object after apply",
                "After the apply operation, the provider still indicated an unknown value. \
                 All values must be known after apply.",
            ));
        }
        match state.encode_msgpack() {
            Ok(new_state) => Self {
                new_state,
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(Diagnostic::error("Failed to encode state", e.to_string()));
                Self {
                    new_state: Vec::new(),
                    diagnostics,
                }
            }
        }
    }

    fn failed(diagnostics: Vec<Diagnostic>, state: &DynamicValue) -> Self {
        Self {
            new_state: state.encode_msgpack().unwrap_or_default(),
            diagnostics,
        }
    }
}

fn decode(bytes: &[u8], what: &str) -> Result<DynamicValue, Diagnostic> {
    DynamicValue::decode_msgpack(bytes)
        .map_err(|e| Diagnostic::error(format!("Failed to decode {}", what), e.to_string()))
}

/// Required, unsupported-argument and attribute validator checks for one block
fn validate_against_schema(
    block: &Block,
    value: &Dynamic,
    parent: Option<&AttributePath>,
) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    let empty = HashMap::new();
    let values = match value {
        Dynamic::Map(values) => values,
        Dynamic::Null => &empty,
        _ => return diagnostics,
    };
    let path_of = |name: &str| match parent {
        Some(parent) => parent.clone().attribute(name),
        None => AttributePath::new(name),
    };

    for name in values.keys() {
        if block.attribute(name).is_none() && block.nested_block(name).is_none() {
            diagnostics.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("An argument named {:?} is not expected here.", name),
                )
                .with_attribute(path_of(name)),
            );
        }
    }

    for attribute in &block.attributes {
        let path = path_of(&attribute.name);
        let value = values.get(&attribute.name).cloned().unwrap_or(Dynamic::Null);

        if attribute.required && value.is_null() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("The argument {:?} is required, but no definition was found.", attribute.name),
                )
                .with_attribute(path.clone()),
            );
            continue;
        }
        if value.is_null() || value.is_unknown() {
            continue;
        }
        for validator in &attribute.validators {
            diagnostics.extend(
                validator
                    .validate(ValidatorRequest {
                        config_value: value.clone(),
                        path: path.clone(),
                    })
                    .diagnostics,
            );
        }
    }

    for nested in &block.block_types {
        let path = path_of(&nested.type_name);
        let value = values.get(&nested.type_name).cloned().unwrap_or(Dynamic::Null);
        let items: Vec<Dynamic> = match (&value, nested.nesting) {
            (Dynamic::List(items), _) => items.clone(),
            (Dynamic::Null, _) => vec![],
            (Dynamic::Unknown, _) => continue,
            (other, NestingMode::Single) | (other, NestingMode::Group) => vec![other.clone()],
            _ => vec![],
        };

        if nested.min_items > 0 && (items.len() as i64) < nested.min_items {
            diagnostics.push(
                Diagnostic::error(
                    "Insufficient blocks",
                    format!(
                        "At least {} {:?} blocks are required.",
                        nested.min_items, nested.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }
        if nested.max_items > 0 && (items.len() as i64) > nested.max_items {
            diagnostics.push(
                Diagnostic::error(
                    "Too many blocks",
                    format!(
                        "No more than {} {:?} blocks are allowed.",
                        nested.max_items, nested.type_name
                    ),
                )
                .with_attribute(path.clone()),
            );
        }
        for (idx, item) in items.iter().enumerate() {
            let item_path = path.clone().index(idx as i64);
            diagnostics.extend(validate_against_schema(&nested.block, item, Some(&item_path)));
        }
    }

    diagnostics
}
