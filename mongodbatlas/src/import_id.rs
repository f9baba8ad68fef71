//! Parsing of the human-typed IDs accepted by `terraform import`

use crate::conversion::ImportIdError;
use regex::Regex;

const SNAPSHOT_IMPORT_PATTERN: &str = r"(?s)^([0-9a-fA-F]{24})-(.*)-([0-9a-fA-F]{24})$";
const DATABASE_USER_IMPORT_PATTERN: &str = r"(?s)^([0-9a-fA-F]{24})-(.*)-([$a-z]{1,15})$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotImportId {
    pub project_id: String,
    pub cluster_name: String,
    pub snapshot_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUserImportId {
    pub project_id: String,
    pub username: String,
    pub auth_database_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateLinkImportId {
    pub project_id: String,
    pub private_link_id: String,
    pub provider_name: String,
    pub region: String,
}

/// `{project_id}-{cluster_name}-{snapshot_id}`
pub fn parse_snapshot_import_id(id: &str) -> Result<SnapshotImportId, ImportIdError> {
    let err = ImportIdError::Format {
        resource: "a snapshot",
        format: "{project_id}-{cluster_name}-{snapshot_id}",
    };
    let re = Regex::new(SNAPSHOT_IMPORT_PATTERN).map_err(|_| err.clone())?;
    let caps = re.captures(id).ok_or_else(|| err.clone())?;

    let cluster_name = caps[2].to_string();
    if cluster_name.is_empty() {
        return Err(err);
    }
    Ok(SnapshotImportId {
        project_id: caps[1].to_string(),
        cluster_name,
        snapshot_id: caps[3].to_string(),
    })
}

/// `{project_id}-{username}-{auth_database_name}`
///
/// The username may contain dashes; the auth database is the trailing
/// lowercase segment (`admin`, `$external`).
pub fn parse_database_user_import_id(id: &str) -> Result<DatabaseUserImportId, ImportIdError> {
    let err = ImportIdError::Format {
        resource: "a Database User",
        format: "{project_id}-{username}-{auth_database_name}",
    };
    let re = Regex::new(DATABASE_USER_IMPORT_PATTERN).map_err(|_| err.clone())?;
    let caps = re.captures(id).ok_or_else(|| err.clone())?;

    let username = caps[2].to_string();
    if username.is_empty() {
        return Err(err);
    }
    Ok(DatabaseUserImportId {
        project_id: caps[1].to_string(),
        username,
        auth_database_name: caps[3].to_string(),
    })
}

/// `{project_id}-{private_link_id}-{provider_name}-{region}`
///
/// Region names such as `us-east-1` or `US_EAST_1` may add up to two more
/// dash-separated parts, which are joined back together.
pub fn parse_privatelink_import_id(id: &str) -> Result<PrivateLinkImportId, ImportIdError> {
    let err = ImportIdError::Format {
        resource: "a privatelink endpoint",
        format: "{project_id}-{private_link_id}-{provider_name}-{region}",
    };
    let parts: Vec<&str> = id.split('-').collect();
    if !(4..=6).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
        return Err(err);
    }

    Ok(PrivateLinkImportId {
        project_id: parts[0].to_string(),
        private_link_id: parts[1].to_string(),
        provider_name: parts[2].to_string(),
        region: parts[3..].join("-"),
    })
}

/// `{project_id}-{rest}` where the project id contains no dash
fn split_project_prefixed(
    id: &str,
    err: ImportIdError,
) -> Result<(String, String), ImportIdError> {
    match id.split_once('-') {
        Some((project_id, rest)) if !project_id.is_empty() && !rest.is_empty() => {
            Ok((project_id.to_string(), rest.to_string()))
        }
        _ => Err(err),
    }
}

/// `{project_id}-{name}`; returns `(project_id, name)`
pub fn parse_flex_cluster_import_id(id: &str) -> Result<(String, String), ImportIdError> {
    split_project_prefixed(
        id,
        ImportIdError::Format {
            resource: "a flex cluster",
            format: "{project_id}-{name}",
        },
    )
}

/// `{project_id}-{alert_configuration_id}`; returns `(project_id, alert_configuration_id)`
pub fn parse_alert_configuration_import_id(id: &str) -> Result<(String, String), ImportIdError> {
    split_project_prefixed(
        id,
        ImportIdError::Format {
            resource: "an alert configuration",
            format: "{project_id}-{alert_configuration_id}",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = "5d0f1f73cf09a29120e173cf";
    const SNAPSHOT: &str = "5d1285acd5ec13b6c2d1726a";

    #[test]
    fn snapshot_import_accepts_dashed_cluster_names() {
        let parsed = parse_snapshot_import_id(&format!("{PROJECT}-my-cluster-1-{SNAPSHOT}")).unwrap();
        assert_eq!(parsed.project_id, PROJECT);
        assert_eq!(parsed.cluster_name, "my-cluster-1");
        assert_eq!(parsed.snapshot_id, SNAPSHOT);
    }

    #[test]
    fn snapshot_import_rejects_bad_ids() {
        assert!(parse_snapshot_import_id("").is_err());
        assert!(parse_snapshot_import_id(&format!("{PROJECT}-{SNAPSHOT}")).is_err());
        assert!(parse_snapshot_import_id(&format!("{PROJECT}--{SNAPSHOT}")).is_err());
        assert!(parse_snapshot_import_id(&format!("nothex-Cluster0-{SNAPSHOT}")).is_err());
        assert!(parse_snapshot_import_id(&format!("{PROJECT}-Cluster0-1234")).is_err());

        let err = parse_snapshot_import_id("bogus").unwrap_err();
        assert_eq!(
            err.to_string(),
            "import format error: to import a snapshot, use the format {project_id}-{cluster_name}-{snapshot_id}"
        );
    }

    #[test]
    fn database_user_import_splits_on_last_segment() {
        let parsed = parse_database_user_import_id(&format!("{PROJECT}-app-user-admin")).unwrap();
        assert_eq!(parsed.username, "app-user");
        assert_eq!(parsed.auth_database_name, "admin");

        let external =
            parse_database_user_import_id(&format!("{PROJECT}-CN=app,OU=x-$external")).unwrap();
        assert_eq!(external.username, "CN=app,OU=x");
        assert_eq!(external.auth_database_name, "$external");
    }

    #[test]
    fn database_user_import_rejects_bad_ids() {
        assert!(parse_database_user_import_id(&format!("{PROJECT}-admin")).is_err());
        assert!(parse_database_user_import_id("abc-user-admin").is_err());
        assert!(parse_database_user_import_id(&format!("{PROJECT}-user-ADMIN")).is_err());
    }

    #[test]
    fn privatelink_import_rejoins_region() {
        let simple = parse_privatelink_import_id("p1-pl1-AWS-useast1").unwrap();
        assert_eq!(simple.region, "useast1");

        let dashed = parse_privatelink_import_id("p1-pl1-AWS-us-east-1").unwrap();
        assert_eq!(dashed.project_id, "p1");
        assert_eq!(dashed.private_link_id, "pl1");
        assert_eq!(dashed.provider_name, "AWS");
        assert_eq!(dashed.region, "us-east-1");

        let two = parse_privatelink_import_id("p1-pl1-AZURE-east-us").unwrap();
        assert_eq!(two.region, "east-us");
    }

    #[test]
    fn privatelink_import_rejects_wrong_part_counts() {
        assert!(parse_privatelink_import_id("p1-pl1-AWS").is_err());
        assert!(parse_privatelink_import_id("p1-pl1-AWS-a-b-c-d").is_err());
        assert!(parse_privatelink_import_id("p1--AWS-us").is_err());
    }

    #[test]
    fn project_prefixed_ids_keep_dashes_in_the_rest() {
        let (project, name) = parse_flex_cluster_import_id(&format!("{PROJECT}-flex-one")).unwrap();
        assert_eq!(project, PROJECT);
        assert_eq!(name, "flex-one");

        let (project, alert) =
            parse_alert_configuration_import_id(&format!("{PROJECT}-{SNAPSHOT}")).unwrap();
        assert_eq!(project, PROJECT);
        assert_eq!(alert, SNAPSHOT);

        assert!(parse_flex_cluster_import_id("no_dash").is_err());
        assert!(parse_alert_configuration_import_id(&format!("{PROJECT}-")).is_err());
        assert!(parse_alert_configuration_import_id(&format!("-{SNAPSHOT}")).is_err());
    }
}
