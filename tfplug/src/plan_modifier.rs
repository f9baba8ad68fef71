//! Plan modifiers applied by the server after computed attributes are marked unknown

use crate::schema::{PlanModifier, PlanModifierRequest, PlanModifierResponse};
use crate::types::{Diagnostic, Dynamic};

/// Marks an attribute as requiring replacement when it changes
///
/// Creates (null prior state) and unknown plan values never trigger replacement.
pub struct RequiresReplace;

impl PlanModifier for RequiresReplace {
    fn description(&self) -> String {
        "changing this attribute forces a new resource".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let requires_replace = !request.prior_state.is_null()
            && !request.plan_value.contains_unknown()
            && !values_equal(&request.state_value, &request.plan_value);

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

/// A plan modifier that uses the current state value when the planned value is unknown
///
/// Useful for computed attributes that never change after create, such as ids.
pub struct UseStateForUnknown;

impl PlanModifier for UseStateForUnknown {
    fn description(&self) -> String {
        "once set, the value of this attribute in state will not change".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let plan_value = match (&request.plan_value, &request.state_value) {
            (Dynamic::Unknown, Dynamic::Null) => request.plan_value,
            (Dynamic::Unknown, state) => state.clone(),
            _ => request.plan_value,
        };

        PlanModifierResponse {
            plan_value,
            requires_replace: false,
            diagnostics: vec![],
        }
    }
}

/// Rejects any change to the attribute once the resource exists
///
/// For attributes the remote API cannot update in place and that must not
/// silently force a replacement either.
pub struct CreateOnly;

impl PlanModifier for CreateOnly {
    fn description(&self) -> String {
        "this attribute can only be set at creation".to_string()
    }

    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse {
        let mut diagnostics = vec![];
        if !request.prior_state.is_null()
            && !request.plan_value.contains_unknown()
            && !values_equal(&request.state_value, &request.plan_value)
        {
            diagnostics.push(
                Diagnostic::error(
                    format!("{} cannot be updated", request.path),
                    format!(
                        "Attribute {} can only be set at creation, it cannot be changed afterwards",
                        request.path
                    ),
                )
                .with_attribute(request.path.clone()),
            );
        }

        PlanModifierResponse {
            plan_value: request.plan_value,
            requires_replace: false,
            diagnostics,
        }
    }
}

/// Helper function to compare two Dynamic values for equality
pub(crate) fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Unknown, Dynamic::Unknown) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};
    use std::collections::HashMap;

    fn request(state: Dynamic, plan: Dynamic, prior_state: DynamicValue) -> PlanModifierRequest {
        PlanModifierRequest {
            config_value: plan.clone(),
            state_value: state,
            plan_value: plan,
            path: AttributePath::new("project_id"),
            prior_state,
        }
    }

    fn existing() -> DynamicValue {
        DynamicValue::new(Dynamic::Map(HashMap::new()))
    }

    #[test]
    fn requires_replace_on_change() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("a".into()),
            Dynamic::String("b".into()),
            existing(),
        ));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_not_on_create() {
        let response = RequiresReplace.modify(request(
            Dynamic::Null,
            Dynamic::String("b".into()),
            DynamicValue::null(),
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn requires_replace_not_when_equal() {
        let response = RequiresReplace.modify(request(
            Dynamic::String("a".into()),
            Dynamic::String("a".into()),
            existing(),
        ));
        assert!(!response.requires_replace);
    }

    #[test]
    fn use_state_for_unknown_copies_prior_value() {
        let response = UseStateForUnknown.modify(request(
            Dynamic::String("abc".into()),
            Dynamic::Unknown,
            existing(),
        ));
        assert_eq!(response.plan_value, Dynamic::String("abc".into()));
    }

    #[test]
    fn use_state_for_unknown_keeps_unknown_on_create() {
        let response =
            UseStateForUnknown.modify(request(Dynamic::Null, Dynamic::Unknown, DynamicValue::null()));
        assert_eq!(response.plan_value, Dynamic::Unknown);
    }

    #[test]
    fn create_only_rejects_change_after_create() {
        let response = CreateOnly.modify(request(
            Dynamic::String("aws".into()),
            Dynamic::String("gcp".into()),
            existing(),
        ));
        assert!(!response.requires_replace);
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].summary.contains("project_id"));
    }

    #[test]
    fn create_only_allows_create_and_unchanged() {
        let on_create = CreateOnly.modify(request(
            Dynamic::Null,
            Dynamic::String("aws".into()),
            DynamicValue::null(),
        ));
        assert!(on_create.diagnostics.is_empty());

        let unchanged = CreateOnly.modify(request(
            Dynamic::String("aws".into()),
            Dynamic::String("aws".into()),
            existing(),
        ));
        assert!(unchanged.diagnostics.is_empty());
    }
}
