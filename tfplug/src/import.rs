//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use std::collections::HashMap;

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state.
///
/// Example: ID "5d0f1f73cf09a29120e173cf" -> state.project_id = "5d0f1f73cf09a29120e173cf"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let mut state = DynamicValue::new(Dynamic::Map(HashMap::new()));

    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!(
                    "Could not set attribute '{}' to value '{}'",
                    attr_path, request.id
                ),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    push_imported(request, response, state);
}

/// Record an imported partial state for the requested type
pub fn push_imported(
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
    state: DynamicValue,
) {
    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
        private: Vec::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientCapabilities;

    #[test]
    fn passthrough_sets_attribute() {
        let request = ImportResourceStateRequest {
            type_name: "mongodbatlas_encryption_at_rest".to_string(),
            id: "5d0f1f73cf09a29120e173cf".to_string(),
            client_capabilities: ClientCapabilities::default(),
        };
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("project_id"),
            &request,
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_string(&AttributePath::new("project_id"))
                .unwrap(),
            "5d0f1f73cf09a29120e173cf"
        );
    }
}
