//! Data sources
//!
//! Unlike resources, a data source that cannot find its object fails the
//! read with an error diagnostic.

pub mod cloud_backup_snapshot;
pub mod cloud_backup_snapshots;
pub mod database_user;
pub mod database_users;
pub mod flex_cluster;

pub use cloud_backup_snapshot::CloudBackupSnapshotDataSource;
pub use cloud_backup_snapshots::CloudBackupSnapshotsDataSource;
pub use database_user::DatabaseUserDataSource;
pub use database_users::DatabaseUsersDataSource;
pub use flex_cluster::FlexClusterDataSource;

use crate::api::common::PageRequest;
use crate::api::ApiError;
use std::collections::HashMap;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberAtLeast, NumberAtMost};

const MAX_ITEMS_PER_PAGE: f64 = 500.0;

/// Error diagnostic for a failed lookup, naming the object when it is missing
pub(crate) fn lookup_error(what: &str, error: ApiError) -> Diagnostic {
    if error.is_not_found() {
        Diagnostic::error(format!("{} not found", what), error.to_string())
    } else {
        Diagnostic::error(
            format!("error getting {} information", what),
            format!("API error: {}", error),
        )
    }
}

/// A single page when the practitioner asked for one, otherwise `None` for all
pub(crate) fn requested_page(config: &DynamicValue) -> Option<PageRequest> {
    let page_num = config.get_optional_number(&AttributePath::new("page_num"));
    let items_per_page = config.get_optional_number(&AttributePath::new("items_per_page"));
    if page_num.is_none() && items_per_page.is_none() {
        return None;
    }
    let default = PageRequest::default();
    Some(PageRequest::new(
        page_num.map_or(default.page_num, |n| n as u32),
        items_per_page.map_or(default.items_per_page, |n| n as u32),
    ))
}

/// `page_num`, `items_per_page` and `total_count`
pub(crate) fn pagination_schema(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .attribute(
            AttributeBuilder::new("page_num", AttributeType::Number)
                .description("Page to return, starting at 1; every page is read when unset")
                .optional()
                .validator(Box::new(NumberAtLeast::new(1.0)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("items_per_page", AttributeType::Number)
                .description("Number of items per page, at most 500")
                .optional()
                .validator(Box::new(NumberAtLeast::new(1.0)))
                .validator(Box::new(NumberAtMost::new(MAX_ITEMS_PER_PAGE)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("total_count", AttributeType::Number)
                .description("Total number of items Atlas reports")
                .computed()
                .build(),
        )
}

pub(crate) fn object_type(fields: impl IntoIterator<Item = (&'static str, AttributeType)>) -> AttributeType {
    AttributeType::Object(
        fields
            .into_iter()
            .map(|(name, attribute_type)| (name.to_string(), attribute_type))
            .collect::<HashMap<_, _>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::types::Dynamic;

    #[test]
    fn requested_page_defaults_missing_half() {
        let config = DynamicValue::new(Dynamic::object([
            ("page_num", Dynamic::Number(3.0)),
            ("items_per_page", Dynamic::Null),
        ]));
        let page = requested_page(&config).unwrap();
        assert_eq!(page.page_num, 3);
        assert_eq!(page.items_per_page, PageRequest::default().items_per_page);

        let unset = DynamicValue::new(Dynamic::object([("page_num", Dynamic::Null)]));
        assert!(requested_page(&unset).is_none());
    }

    #[test]
    fn not_found_is_named() {
        let error = ApiError::Api {
            method: "GET".into(),
            path: "/groups/p/flexClusters/c".into(),
            status: 404,
            error_code: "RESOURCE_NOT_FOUND".into(),
            detail: String::new(),
            reason: "Not Found".into(),
        };
        assert_eq!(lookup_error("flex cluster", error).summary, "flex cluster not found");
    }
}
