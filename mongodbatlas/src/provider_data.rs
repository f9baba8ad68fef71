//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct MongoDbAtlasProviderData {
    pub client: Arc<Client>,
}

impl MongoDbAtlasProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Downcast the data handed to `configure` by the server
    pub fn from_any(data: Option<Arc<dyn Any + Send + Sync>>) -> Result<Self, Diagnostic> {
        let data = data.ok_or_else(|| {
            Diagnostic::error(
                "No provider data",
                "Provider data was not supplied; was the provider configured?",
            )
        })?;
        data.downcast_ref::<MongoDbAtlasProviderData>()
            .cloned()
            .ok_or_else(|| {
                Diagnostic::error(
                    "Invalid provider data",
                    "Provider data is not of the expected type MongoDbAtlasProviderData",
                )
            })
    }
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}
