//! User records stored as custom objects.
//!
//! Values are written as JSON-encoded strings. Reads accept either a string
//! or an object; decoding happens in `vip_admin_core::parse_user_value`.

use serde::Serialize;
use tracing::instrument;
use vip_admin_core::projection::UserDraft;
use vip_admin_core::query::UserQuery;
use vip_admin_core::{CustomObjectId, PagedResult, StoredUser, UserKey};

use super::CommercetoolsError;
use super::client::CommercetoolsClient;
use super::queries::{
    FETCH_CUSTOM_OBJECT_BY_ID, FETCH_CUSTOM_OBJECT_BY_KEY, FETCH_CUSTOM_OBJECTS,
    SAVE_CUSTOM_OBJECT,
};
use super::types::{CustomObjectData, CustomObjectsData, SaveCustomObjectData};
use crate::store::{StoreError, UserStore};

#[derive(Debug, Serialize)]
struct CustomObjectsVariables<'a> {
    container: &'a str,
    #[serde(rename = "where")]
    where_clause: Option<String>,
    sort: Vec<String>,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Serialize)]
struct ByKeyVariables<'a> {
    container: &'a str,
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct ByIdVariables<'a> {
    container: &'a str,
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct SaveVariables<'a> {
    draft: CustomObjectDraft<'a>,
}

/// `CustomObjectDraft` input. `value` is the JSON-encoded user value.
#[derive(Debug, Serialize)]
struct CustomObjectDraft<'a> {
    container: &'a str,
    key: &'a str,
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<i64>,
}

impl<'a> CustomObjectDraft<'a> {
    fn from_user(container: &'a str, draft: &'a UserDraft) -> Result<Self, serde_json::Error> {
        Ok(Self {
            container,
            key: draft.key.as_str(),
            value: draft.value.to_wire()?,
            version: draft.version,
        })
    }
}

/// Map a platform error for an operation on `key` to a store error.
fn store_error(err: CommercetoolsError, key: &UserKey, expected: Option<i64>) -> StoreError {
    match err {
        CommercetoolsError::ConcurrentModification { current_version } => StoreError::Conflict {
            key: key.clone(),
            expected,
            current: current_version,
        },
        CommercetoolsError::DuplicateField(_) => StoreError::Duplicate(key.clone()),
        CommercetoolsError::NotFound(message) => StoreError::NotFound(message),
        other => StoreError::Backend(other),
    }
}

impl From<CommercetoolsError> for StoreError {
    fn from(err: CommercetoolsError) -> Self {
        match err {
            CommercetoolsError::NotFound(message) => Self::NotFound(message),
            other => Self::Backend(other),
        }
    }
}

impl UserStore for CommercetoolsClient {
    #[instrument(skip(self, query), fields(container = %query.container, offset = query.offset, limit = query.limit))]
    async fn query_users(&self, query: &UserQuery) -> Result<PagedResult<StoredUser>, StoreError> {
        let variables = CustomObjectsVariables {
            container: &query.container,
            where_clause: query.where_clause(),
            sort: query.sort_strings(),
            limit: query.limit,
            offset: query.offset,
        };

        let data: CustomObjectsData = self
            .execute("FetchCustomObjects", FETCH_CUSTOM_OBJECTS, variables)
            .await?;

        Ok(PagedResult::from(data.custom_objects).map(StoredUser::from))
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get_user(
        &self,
        container: &str,
        id: &CustomObjectId,
    ) -> Result<Option<StoredUser>, StoreError> {
        let variables = ByIdVariables {
            container,
            id: id.as_str(),
        };

        let result: Result<CustomObjectData, _> = self
            .execute("FetchCustomObjectById", FETCH_CUSTOM_OBJECT_BY_ID, variables)
            .await;

        match result {
            Ok(data) => Ok(data.custom_object.map(StoredUser::from)),
            Err(CommercetoolsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn get_user_by_key(
        &self,
        container: &str,
        key: &UserKey,
    ) -> Result<Option<StoredUser>, StoreError> {
        let variables = ByKeyVariables {
            container,
            key: key.as_str(),
        };

        let result: Result<CustomObjectData, _> = self
            .execute("FetchCustomObjectByKey", FETCH_CUSTOM_OBJECT_BY_KEY, variables)
            .await;

        match result {
            Ok(data) => Ok(data.custom_object.map(StoredUser::from)),
            Err(CommercetoolsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, draft), fields(key = %draft.key, version = ?draft.version))]
    async fn save_user(&self, container: &str, draft: &UserDraft) -> Result<StoredUser, StoreError> {
        let variables = SaveVariables {
            draft: CustomObjectDraft::from_user(container, draft)?,
        };

        let data: SaveCustomObjectData = self
            .execute("SaveCustomObject", SAVE_CUSTOM_OBJECT, variables)
            .await
            .map_err(|e| store_error(e, &draft.key, draft.version))?;

        let saved = data
            .create_or_update_custom_object
            .map(StoredUser::from)
            .ok_or_else(|| StoreError::Unexpected("save returned no custom object".to_string()))?;

        tracing::info!(key = %saved.key, version = saved.version, "saved user");
        Ok(saved)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use vip_admin_core::{Role, UserValue};

    use super::*;

    fn draft(version: Option<i64>) -> UserDraft {
        UserDraft {
            key: UserKey::new("user-1"),
            version,
            value: UserValue {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                roles: [Role::user()].into_iter().collect(),
                active: true,
                created_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                ..UserValue::default()
            },
        }
    }

    #[test]
    fn test_draft_value_is_json_string() {
        let user = draft(Some(4));
        let variables = SaveVariables {
            draft: CustomObjectDraft::from_user("app-users", &user).unwrap(),
        };
        let json = serde_json::to_value(&variables).unwrap();

        assert_eq!(json["draft"]["container"], "app-users");
        assert_eq!(json["draft"]["key"], "user-1");
        assert_eq!(json["draft"]["version"], 4);
        let value = json["draft"]["value"].as_str().unwrap();
        let decoded: serde_json::Value = serde_json::from_str(value).unwrap();
        assert_eq!(decoded["email"], "ana@example.com");
    }

    #[test]
    fn test_new_draft_omits_version() {
        let user = draft(None);
        let json = serde_json::to_value(CustomObjectDraft::from_user("app-users", &user).unwrap())
            .unwrap();
        assert!(json.get("version").is_none());
    }

    #[test]
    fn test_query_variables_rename_where() {
        let variables = CustomObjectsVariables {
            container: "app-users",
            where_clause: Some("value(active = true)".to_string()),
            sort: vec!["key asc".to_string()],
            limit: 10,
            offset: 20,
        };
        let json = serde_json::to_value(&variables).unwrap();
        assert_eq!(json["where"], "value(active = true)");
        assert_eq!(json["sort"][0], "key asc");
        assert_eq!(json["offset"], 20);
    }

    #[test]
    fn test_concurrent_modification_maps_to_conflict() {
        let key = UserKey::new("user-1");
        let err = store_error(
            CommercetoolsError::ConcurrentModification {
                current_version: Some(7),
            },
            &key,
            Some(6),
        );
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: Some(6),
                current: Some(7),
                ..
            }
        ));
    }

    #[test]
    fn test_other_errors_stay_distinct_from_conflict() {
        let key = UserKey::new("user-1");
        assert!(matches!(
            store_error(CommercetoolsError::DuplicateField("user-1".to_string()), &key, None),
            StoreError::Duplicate(_)
        ));
        assert!(matches!(
            store_error(CommercetoolsError::NotFound("gone".to_string()), &key, Some(1)),
            StoreError::NotFound(_)
        ));
        assert!(!store_error(CommercetoolsError::Unauthorized, &key, Some(1)).is_conflict());
    }
}
