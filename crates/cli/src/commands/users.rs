//! User record commands.
//!
//! # Usage
//!
//! ```bash
//! vip-cli users list --status inactive
//! vip-cli users show 5e1c0b9a-...
//! vip-cli users set-active 5e1c0b9a-... true
//! ```

use std::io::Write;

use vip_admin::services::UserPage;
use vip_admin_core::listing::UserListController;
use vip_admin_core::query::{RoleFilter, StatusFilter, UserListState};
use vip_admin_core::{CustomObjectId, UserRecord};

use super::{CommandError, load_state};

/// Filters of `users list`.
#[derive(Debug, Clone)]
pub struct ListFilters {
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl ListFilters {
    /// List state for these filters; the page goes last since filters
    /// reset it.
    fn to_state(&self) -> Result<UserListState, CommandError> {
        let mut state = UserListState::new();
        if let Some(search) = &self.search {
            state.set_search(search.as_str());
        }
        if let Some(role) = &self.role {
            state.set_role(role.parse::<RoleFilter>().unwrap_or_default());
        }
        if let Some(status) = &self.status {
            let status: StatusFilter = status.parse().map_err(CommandError::InvalidArgument)?;
            state.set_status(status);
        }
        state.set_per_page(self.per_page);
        state.set_page(self.page);
        Ok(state)
    }
}

/// Print one page of users, with labels resolved like the admin table.
///
/// The query goes through the same list controller as the admin screen, so
/// the page is the one the filters resolve to after their resets.
pub async fn list(filters: &ListFilters) -> Result<(), CommandError> {
    let list_state = filters.to_state()?;
    let state = load_state()?;

    let mut controller = UserListController::<UserPage>::new(state.users().container());
    let pending = match controller.update(|current| {
        let changed = *current != list_state;
        *current = list_state;
        changed
    }) {
        Some(pending) => pending,
        None => controller.refresh(),
    };

    tracing::info!(
        container = state.users().container(),
        page = controller.state().page(),
        per_page = controller.state().per_page(),
        "Listing users..."
    );
    let page = state.users().list_query(&pending.query).await?;
    if !controller.receive(pending.ticket, page) {
        return Ok(());
    }
    let Some(page) = controller.current() else {
        return Ok(());
    };

    let mut out = std::io::stdout().lock();
    for row in &page.rows {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            row.id,
            row.email,
            row.name,
            row.roles,
            row.providers,
            if row.active { "active" } else { "inactive" },
            row.created_at,
        )?;
    }
    writeln!(
        out,
        "page {} of {} ({} users)",
        page.page, page.total_pages, page.total
    )?;
    Ok(())
}

/// Print one user record.
pub async fn show(id: &str) -> Result<(), CommandError> {
    let state = load_state()?;
    let record = find(&state, id).await?;

    let mut out = std::io::stdout().lock();
    write_record(&mut out, &record)?;
    Ok(())
}

/// Activate or deactivate a user at its current version.
pub async fn set_active(id: &str, active: bool) -> Result<(), CommandError> {
    let state = load_state()?;
    let record = find(&state, id).await?;

    if record.value.active == active {
        tracing::info!(key = %record.key, active, "User already in requested state");
        return Ok(());
    }

    let saved = state
        .users()
        .set_active(&record.id, record.version, active)
        .await?;
    tracing::info!(key = %saved.key, version = saved.version, active, "User updated");
    Ok(())
}

async fn find(state: &vip_admin::state::AppState, id: &str) -> Result<UserRecord, CommandError> {
    let id = CustomObjectId::new(id);
    state
        .users()
        .find(&id)
        .await?
        .ok_or_else(|| CommandError::NotFound(format!("user {id}")))
}

fn write_record(out: &mut impl Write, record: &UserRecord) -> std::io::Result<()> {
    let value = &record.value;
    let roles: Vec<&str> = value.roles.iter().map(|r| r.as_str()).collect();

    writeln!(out, "id:                 {}", record.id)?;
    writeln!(out, "key:                {}", record.key)?;
    writeln!(out, "version:            {}", record.version)?;
    writeln!(out, "email:              {}", value.email)?;
    writeln!(out, "name:               {}", value.name)?;
    writeln!(out, "roles:              {}", roles.join(", "))?;
    writeln!(out, "providers:          {}", value.provider_ids.join(", "))?;
    writeln!(out, "categories:         {}", value.category_ids.join(", "))?;
    writeln!(out, "product selections: {}", value.product_selection_ids.join(", "))?;
    writeln!(out, "element types:      {}", value.element_type_ids.join(", "))?;
    writeln!(out, "active:             {}", value.active)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vip_admin_core::{Role, UserKey, UserValue};

    use super::*;

    fn filters() -> ListFilters {
        ListFilters {
            search: None,
            role: None,
            status: None,
            page: 1,
            per_page: 10,
        }
    }

    #[test]
    fn test_filters_to_state() {
        let state = ListFilters {
            search: Some("ana".to_string()),
            role: Some("admin".to_string()),
            status: Some("active".to_string()),
            page: 2,
            per_page: 50,
        }
        .to_state()
        .unwrap();

        assert_eq!(state.search(), "ana");
        assert_eq!(state.role(), &RoleFilter::Role(Role::admin()));
        assert_eq!(state.status(), StatusFilter::Active);
        assert_eq!(state.page(), 2);
        assert_eq!(state.per_page(), 50);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let result = ListFilters {
            status: Some("paused".to_string()),
            ..filters()
        }
        .to_state();
        assert!(matches!(result, Err(CommandError::InvalidArgument(_))));
    }

    #[test]
    fn test_write_record() {
        let record = UserRecord {
            id: CustomObjectId::new("co-1"),
            key: UserKey::new("user-1"),
            version: 3,
            value: UserValue {
                email: "ana@example.com".to_string(),
                name: "Ana".to_string(),
                roles: [Role::admin()].into_iter().collect(),
                provider_ids: vec!["c1".to_string(), "c2".to_string()],
                active: true,
                ..UserValue::default()
            },
        };

        let mut out = Vec::new();
        write_record(&mut out, &record).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("key:                user-1"));
        assert!(text.contains("roles:              admin"));
        assert!(text.contains("providers:          c1, c2"));
    }
}
