//! List state and the query predicates sent to the platform.
//!
//! [`UserListState`] holds what the user list screen lets an operator change
//! (search text, role, status, page, page size) and turns it into a
//! [`UserQuery`]. Predicates use the platform's query predicate language;
//! every string literal goes through [`quote`].

use core::fmt;

use crate::types::{CategoryId, Role, UserKey, UserValue};

/// Page sizes offered by the list screen.
pub const PER_PAGE_OPTIONS: [u32; 4] = [10, 20, 50, 100];

/// Page size used when none (or an unsupported one) is requested.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Attribute name holding the provider reference on product variants.
pub const PROVIDER_ATTRIBUTE: &str = "provider-key";

// =============================================================================
// Filters
// =============================================================================

/// Role filter of the user list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoleFilter {
    #[default]
    All,
    Role(Role),
}

impl std::str::FromStr for RoleFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "all" {
            Ok(Self::All)
        } else {
            Ok(Self::Role(Role::new(s)))
        }
    }
}

impl fmt::Display for RoleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Role(role) => f.write_str(role.as_str()),
        }
    }
}

/// Active/inactive filter of the user list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    /// The `active` value this filter requires, if any.
    #[must_use]
    pub const fn as_active(self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Active => Some(true),
            Self::Inactive => Some(false),
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "all" => Ok(Self::All),
            "active" | "true" => Ok(Self::Active),
            "inactive" | "false" => Ok(Self::Inactive),
            other => Err(format!("unknown status filter: {other}")),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
        })
    }
}

// =============================================================================
// Sorting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// The other direction, for clickable column headers.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// One sort expression, rendered as `<field> asc|desc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Default ordering of user lists.
    #[must_use]
    pub fn by_key() -> Self {
        Self::asc("key")
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{} {direction}", self.field)
    }
}

// =============================================================================
// User predicate
// =============================================================================

/// Conjunction of the non-empty user list filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserPredicate {
    /// Search text as typed (trimmed).
    pub search: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

impl UserPredicate {
    /// Whether no filter is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.search.is_none() && self.role.is_none() && self.active.is_none()
    }

    /// Render as a `where` clause; `None` when no filter is set.
    ///
    /// The platform compares strings exactly, so case-insensitive search is
    /// approximated: the lower-cased term is matched against key and email
    /// (both stored lower-case), and the name is matched in each of the
    /// casings returned by [`name_casings`].
    #[must_use]
    pub fn to_where_clause(&self) -> Option<String> {
        let mut clauses = Vec::new();

        if let Some(term) = &self.search {
            let lower_q = quote(&term.to_lowercase());
            let mut search = format!("key = {lower_q} or value(email = {lower_q})");
            for name in name_casings(term) {
                search.push_str(&format!(" or value(name = {})", quote(&name)));
            }
            clauses.push(search);
        }
        if let Some(role) = &self.role {
            clauses.push(format!("value(roles contains {})", quote(role.as_str())));
        }
        if let Some(active) = self.active {
            clauses.push(format!("value(active = {active})"));
        }

        match clauses.len() {
            0 => None,
            1 => clauses.pop(),
            _ => Some(
                clauses
                    .iter()
                    .map(|clause| format!("({clause})"))
                    .collect::<Vec<_>>()
                    .join(" and "),
            ),
        }
    }

    /// Evaluate the predicate against a stored record.
    #[must_use]
    pub fn matches(&self, key: &UserKey, value: &UserValue) -> bool {
        if let Some(term) = &self.search {
            let lower = term.to_lowercase();
            let hit = key.as_str() == lower
                || value.email == lower
                || name_casings(term).contains(&value.name);
            if !hit {
                return false;
            }
        }
        let role_ok = self.role.as_ref().is_none_or(|role| value.roles.contains(role));
        let active_ok = self.active.is_none_or(|active| value.active == active);
        role_ok && active_ok
    }
}

/// Casings a name search is tried in: as typed, lower-case and title case
/// (`"ANA LOPEZ"` also finds `"Ana Lopez"`). Duplicates are dropped.
#[must_use]
pub fn name_casings(term: &str) -> Vec<String> {
    let lower = term.to_lowercase();
    let title = lower
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut casings = Vec::with_capacity(3);
    for casing in [term.to_string(), lower, title] {
        if !casings.contains(&casing) {
            casings.push(casing);
        }
    }
    casings
}

// =============================================================================
// User list state
// =============================================================================

/// Query parameters for one page of users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub container: String,
    pub predicate: UserPredicate,
    pub sort: Vec<SortSpec>,
    pub limit: u32,
    pub offset: u32,
}

impl UserQuery {
    /// The predicate as a `where` clause.
    #[must_use]
    pub fn where_clause(&self) -> Option<String> {
        self.predicate.to_where_clause()
    }

    /// Sort expressions as strings.
    #[must_use]
    pub fn sort_strings(&self) -> Vec<String> {
        self.sort.iter().map(ToString::to_string).collect()
    }
}

/// Inputs of the user list screen.
///
/// Changing any filter or the page size sends the operator back to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserListState {
    search: String,
    role: RoleFilter,
    status: StatusFilter,
    page: u32,
    per_page: u32,
    sort: SortSpec,
}

impl Default for UserListState {
    fn default() -> Self {
        Self {
            search: String::new(),
            role: RoleFilter::All,
            status: StatusFilter::All,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            sort: SortSpec::by_key(),
        }
    }
}

impl UserListState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[must_use]
    pub const fn role(&self) -> &RoleFilter {
        &self.role
    }

    #[must_use]
    pub const fn status(&self) -> StatusFilter {
        self.status
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub const fn sort(&self) -> &SortSpec {
        &self.sort
    }

    /// Set the search text. Returns whether the state changed.
    pub fn set_search(&mut self, term: impl Into<String>) -> bool {
        let term = term.into();
        if term == self.search {
            return false;
        }
        self.search = term;
        self.page = 1;
        true
    }

    pub fn set_role(&mut self, role: RoleFilter) -> bool {
        if role == self.role {
            return false;
        }
        self.role = role;
        self.page = 1;
        true
    }

    pub fn set_status(&mut self, status: StatusFilter) -> bool {
        if status == self.status {
            return false;
        }
        self.status = status;
        self.page = 1;
        true
    }

    /// Set the page size; unsupported sizes fall back to the default.
    pub fn set_per_page(&mut self, per_page: u32) -> bool {
        let per_page = normalize_per_page(per_page);
        if per_page == self.per_page {
            return false;
        }
        self.per_page = per_page;
        self.page = 1;
        true
    }

    /// Set the 1-based page; zero is treated as 1.
    pub fn set_page(&mut self, page: u32) -> bool {
        let page = page.max(1);
        if page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    pub fn set_sort(&mut self, sort: SortSpec) -> bool {
        if sort == self.sort {
            return false;
        }
        self.sort = sort;
        self.page = 1;
        true
    }

    /// The predicate built from the non-empty filters.
    #[must_use]
    pub fn predicate(&self) -> UserPredicate {
        let search = self.search.trim();
        UserPredicate {
            search: (!search.is_empty()).then(|| search.to_string()),
            role: match &self.role {
                RoleFilter::All => None,
                RoleFilter::Role(role) => Some(role.clone()),
            },
            active: self.status.as_active(),
        }
    }

    /// Backend query for the current page.
    #[must_use]
    pub fn to_query(&self, container: &str) -> UserQuery {
        UserQuery {
            container: container.to_string(),
            predicate: self.predicate(),
            sort: vec![self.sort.clone()],
            limit: self.per_page,
            offset: (self.page - 1).saturating_mul(self.per_page),
        }
    }
}

/// Clamp a requested page size to one of [`PER_PAGE_OPTIONS`].
#[must_use]
pub fn normalize_per_page(per_page: u32) -> u32 {
    if PER_PAGE_OPTIONS.contains(&per_page) {
        per_page
    } else {
        DEFAULT_PER_PAGE
    }
}

/// Number of pages needed for `total` entries; at least 1.
#[must_use]
pub fn total_pages(total: u64, per_page: u32) -> u64 {
    let per_page = u64::from(per_page.max(1));
    total.div_ceil(per_page).max(1)
}

/// One page of a product or order table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PER_PAGE)
    }
}

impl PageRequest {
    /// Page is clamped to at least 1 and the size to a supported option.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: normalize_per_page(per_page),
        }
    }

    #[must_use]
    pub const fn page(self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn per_page(self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub const fn limit(self) -> u32 {
        self.per_page
    }

    #[must_use]
    pub const fn offset(self) -> u32 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

// =============================================================================
// Product and order predicates
// =============================================================================

/// Quote a string literal for a query predicate.
#[must_use]
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Products in any of the given categories. `None` for an empty list.
#[must_use]
pub fn products_in_categories(ids: &[CategoryId]) -> Option<String> {
    match ids {
        [] => None,
        [single] => Some(format!(
            "masterData(current(categories(id={})))",
            quote(single.as_str())
        )),
        many => {
            let list = many
                .iter()
                .map(|id| quote(id.as_str()))
                .collect::<Vec<_>>()
                .join(", ");
            Some(format!("masterData(current(categories(id in ({list}))))"))
        }
    }
}

/// Products whose master variant names `provider_key` as provider.
#[must_use]
pub fn products_by_provider(provider_key: &str) -> String {
    format!(
        "masterData(current(masterVariant(attributes(name={} and value(key={})))))",
        quote(PROVIDER_ATTRIBUTE),
        quote(provider_key)
    )
}

/// Orders with a line item in `channel_id`. `None` or `all` means every order.
#[must_use]
pub fn orders_by_channel(channel_id: Option<&str>) -> Option<String> {
    channel_id
        .map(str::trim)
        .filter(|id| !id.is_empty() && *id != "all")
        .map(|id| format!("lineItems(distributionChannel(id={}))", quote(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_has_no_predicate() {
        let query = UserListState::new().to_query("app-users");
        assert_eq!(query.where_clause(), None);
        assert_eq!(query.limit, 10);
        assert_eq!(query.offset, 0);
        assert_eq!(query.sort_strings(), vec!["key asc"]);
    }

    #[test]
    fn test_offset_from_page() {
        let mut state = UserListState::new();
        state.set_per_page(20);
        state.set_page(3);
        let query = state.to_query("app-users");
        assert_eq!(query.offset, 40);
        assert_eq!(query.limit, 20);
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut state = UserListState::new();

        state.set_page(3);
        assert!(state.set_search("ana"));
        assert_eq!(state.page(), 1);

        state.set_page(3);
        state.set_role(RoleFilter::Role(Role::admin()));
        assert_eq!(state.page(), 1);

        state.set_page(3);
        state.set_status(StatusFilter::Inactive);
        assert_eq!(state.page(), 1);

        state.set_page(3);
        state.set_per_page(50);
        assert_eq!(state.page(), 1);
    }

    #[test]
    fn test_unchanged_filter_keeps_page() {
        let mut state = UserListState::new();
        state.set_search("ana");
        state.set_page(2);
        assert!(!state.set_search("ana"));
        assert_eq!(state.page(), 2);
    }

    #[test]
    fn test_page_and_per_page_clamped() {
        let mut state = UserListState::new();
        state.set_page(0);
        assert_eq!(state.page(), 1);
        state.set_per_page(37);
        assert_eq!(state.per_page(), DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_search_predicate() {
        let mut state = UserListState::new();
        state.set_search("  Ana ");
        assert_eq!(
            state.predicate().to_where_clause().as_deref(),
            Some(
                r#"key = "ana" or value(email = "ana") or value(name = "Ana") or value(name = "ana")"#
            )
        );
    }

    #[test]
    fn test_search_predicate_tries_title_case_name() {
        let mut state = UserListState::new();
        state.set_search("ANA LOPEZ");
        assert_eq!(
            state.predicate().to_where_clause().as_deref(),
            Some(concat!(
                r#"key = "ana lopez" or value(email = "ana lopez") or value(name = "ANA LOPEZ")"#,
                r#" or value(name = "ana lopez") or value(name = "Ana Lopez")"#,
            ))
        );
    }

    #[test]
    fn test_name_casings() {
        assert_eq!(name_casings("Ana"), vec!["Ana", "ana"]);
        assert_eq!(
            name_casings("mARIA del mar"),
            vec!["mARIA del mar", "maria del mar", "Maria Del Mar"]
        );
        assert_eq!(name_casings("ñu"), vec!["ñu", "Ñu"]);
    }

    #[test]
    fn test_combined_predicate_is_conjunction() {
        let mut state = UserListState::new();
        state.set_search("x");
        state.set_role(RoleFilter::Role(Role::admin()));
        state.set_status(StatusFilter::Active);
        let clause = state.predicate().to_where_clause().unwrap_or_default();
        assert!(clause.starts_with(r#"(key = "x""#));
        assert!(clause.contains(r#") and (value(roles contains "admin"))"#));
        assert!(clause.ends_with("and (value(active = true))"));
    }

    #[test]
    fn test_single_filter_is_not_parenthesized() {
        let mut state = UserListState::new();
        state.set_status(StatusFilter::Inactive);
        assert_eq!(
            state.predicate().to_where_clause().as_deref(),
            Some("value(active = false)")
        );
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_matches_local_evaluation() {
        let key = UserKey::new("user-1");
        let value = UserValue {
            email: "ana@example.com".to_string(),
            name: "Ana".to_string(),
            roles: [Role::user()].into_iter().collect(),
            active: true,
            ..UserValue::default()
        };

        let by_email = UserPredicate {
            search: Some("ANA@example.com".to_string()),
            ..UserPredicate::default()
        };
        assert!(by_email.matches(&key, &value));

        let by_name = UserPredicate {
            search: Some("Ana".to_string()),
            ..UserPredicate::default()
        };
        assert!(by_name.matches(&key, &value));

        let full_name = UserValue {
            name: "Ana Lopez".to_string(),
            ..value.clone()
        };
        let shouted = UserPredicate {
            search: Some("ANA LOPEZ".to_string()),
            ..UserPredicate::default()
        };
        assert!(shouted.matches(&key, &full_name));

        let admin_only = UserPredicate {
            role: Some(Role::admin()),
            ..UserPredicate::default()
        };
        assert!(!admin_only.matches(&key, &value));

        let inactive = UserPredicate {
            active: Some(false),
            ..UserPredicate::default()
        };
        assert!(!inactive.matches(&key, &value));
        assert!(UserPredicate::default().matches(&key, &value));
    }

    #[test]
    fn test_filter_parsing() {
        assert_eq!("".parse::<RoleFilter>(), Ok(RoleFilter::All));
        assert_eq!(
            "admin".parse::<RoleFilter>(),
            Ok(RoleFilter::Role(Role::admin()))
        );
        assert_eq!("active".parse::<StatusFilter>(), Ok(StatusFilter::Active));
        assert_eq!("false".parse::<StatusFilter>(), Ok(StatusFilter::Inactive));
        assert!("maybe".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn test_category_predicates() {
        assert_eq!(products_in_categories(&[]), None);
        assert_eq!(
            products_in_categories(&[CategoryId::new("a")]).as_deref(),
            Some(r#"masterData(current(categories(id="a")))"#)
        );
        assert_eq!(
            products_in_categories(&[CategoryId::new("a"), CategoryId::new("b")]).as_deref(),
            Some(r#"masterData(current(categories(id in ("a", "b"))))"#)
        );
    }

    #[test]
    fn test_provider_and_order_predicates() {
        assert_eq!(
            products_by_provider("acme"),
            r#"masterData(current(masterVariant(attributes(name="provider-key" and value(key="acme")))))"#
        );
        assert_eq!(orders_by_channel(None), None);
        assert_eq!(orders_by_channel(Some("all")), None);
        assert_eq!(
            orders_by_channel(Some("ch-1")).as_deref(),
            Some(r#"lineItems(distributionChannel(id="ch-1"))"#)
        );
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn test_sort_spec_display() {
        assert_eq!(SortSpec::desc("createdAt").to_string(), "createdAt desc");
        assert_eq!(SortDirection::Asc.toggled(), SortDirection::Desc);
    }

    #[test]
    fn test_page_request_offsets() {
        let request = PageRequest::new(3, 20);
        assert_eq!(request.offset(), 40);
        assert_eq!(request.limit(), 20);

        let clamped = PageRequest::new(0, 7);
        assert_eq!(clamped.page(), 1);
        assert_eq!(clamped.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(clamped.offset(), 0);
    }
}
