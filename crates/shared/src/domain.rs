use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(SessionId);

/// Which kind of principal drives the dashboard. Decided once from the stored
/// tokens; everything role-dependent hangs off this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalKind {
    Admin,
    Employee,
}

impl PrincipalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
        }
    }

    pub fn portal_label(self) -> &'static str {
        match self {
            Self::Admin => "Admin Dashboard",
            Self::Employee => "Employee Portal",
        }
    }

    pub fn default_tab(self) -> SessionTab {
        match self {
            Self::Admin => SessionTab::All,
            Self::Employee => SessionTab::MySessions,
        }
    }

    pub fn tabs(self) -> [SessionTab; 3] {
        [self.default_tab(), SessionTab::Active, SessionTab::Completed]
    }

    pub fn views(self) -> &'static [ActiveView] {
        match self {
            Self::Admin => &[
                ActiveView::Sessions,
                ActiveView::Analytics,
                ActiveView::Users,
                ActiveView::Settings,
            ],
            Self::Employee => &[ActiveView::Sessions, ActiveView::Settings],
        }
    }

    pub fn can_open(self, view: ActiveView) -> bool {
        self.views().contains(&view)
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl Principal {
    /// First eight characters of the id, as shown in the footer.
    pub fn short_id(&self) -> Option<&str> {
        let id = self.id.as_ref()?.0.as_str();
        Some(match id.char_indices().nth(8) {
            Some((end, _)) => &id[..end],
            None => id,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    ClockedIn,
    Completed,
}

impl SessionStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::ClockedIn => "Clocked In",
            Self::Completed => "Completed",
        }
    }
}

/// One attendance entry. Every display field is computed by the server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(default)]
    pub id: Option<SessionId>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub login_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_clocked_in: bool,
    #[serde(default, deserialize_with = "null_as_false")]
    pub is_clocked_out: bool,
    #[serde(default)]
    pub formatted_clock_in: Option<String>,
    #[serde(default)]
    pub formatted_clock_out: Option<String>,
    #[serde(default)]
    pub formatted_duration: Option<String>,
    #[serde(default)]
    pub formatted_total_hours: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub auto_logout: bool,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn is_blank_id(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(id)) => id.is_empty(),
        Some(_) => false,
    }
}

impl<'de> Deserialize<'de> for SessionRecord {
    /// Documents carry `id`, `_id` or both; a blank `id` falls back to `_id`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        if let Some(object_id) = fields.remove("_id") {
            if is_blank_id(fields.get("id")) {
                fields.insert("id".to_string(), object_id);
            }
        }
        SessionRecord::deserialize(Value::Object(fields)).map_err(de::Error::custom)
    }
}

impl SessionRecord {
    pub fn display_status(&self) -> SessionStatus {
        if self.is_active {
            SessionStatus::Active
        } else if self.is_clocked_in {
            SessionStatus::ClockedIn
        } else {
            SessionStatus::Completed
        }
    }

    pub fn is_active_session(&self) -> bool {
        self.is_active || self.status.as_deref() == Some("active")
    }

    pub fn is_completed_session(&self) -> bool {
        self.is_clocked_out || self.status.as_deref() == Some("completed")
    }

    pub fn is_mobile_device(&self) -> bool {
        self.device
            .as_deref()
            .is_some_and(|device| device.to_ascii_lowercase().contains("mobile"))
    }

    /// `loginAt`, falling back to `createdAt`.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.login_at
            .as_deref()
            .or(self.created_at.as_deref())
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionTab {
    All,
    MySessions,
    Active,
    Completed,
}

impl SessionTab {
    pub fn id(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::MySessions => "my-sessions",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Sessions",
            Self::MySessions => "My Sessions",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }

    pub fn shows_everything(self) -> bool {
        matches!(self, Self::All | Self::MySessions)
    }

    pub fn matches(self, session: &SessionRecord) -> bool {
        match self {
            Self::All | Self::MySessions => true,
            Self::Active => session.is_active_session(),
            Self::Completed => session.is_completed_session(),
        }
    }
}

impl FromStr for SessionTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "my-sessions" | "mine" => Ok(Self::MySessions),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown tab '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActiveView {
    Sessions,
    Analytics,
    Users,
    Settings,
}

impl ActiveView {
    pub fn label(self) -> &'static str {
        match self {
            Self::Sessions => "Sessions",
            Self::Analytics => "Analytics",
            Self::Users => "Users",
            Self::Settings => "Settings",
        }
    }
}

impl FromStr for ActiveView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sessions" => Ok(Self::Sessions),
            "analytics" => Ok(Self::Analytics),
            "users" => Ok(Self::Users),
            "settings" => Ok(Self::Settings),
            other => Err(format!("unknown view '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Any,
    Active,
    Completed,
    ClockedIn,
    ClockedOut,
}

impl StatusFilter {
    pub fn as_query(self) -> Option<&'static str> {
        match self {
            Self::Any => None,
            Self::Active => Some("active"),
            Self::Completed => Some("completed"),
            Self::ClockedIn => Some("clocked-in"),
            Self::ClockedOut => Some("clocked-out"),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(Self::Any),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "clocked-in" => Ok(Self::ClockedIn),
            "clocked-out" => Ok(Self::ClockedOut),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// A single user edit to the filter bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEdit {
    UserId(String),
    Status(StatusFilter),
    StartDate(Option<NaiveDate>),
    EndDate(Option<NaiveDate>),
    Search(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilters {
    pub user_id: String,
    pub status: StatusFilter,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search_query: String,
}

impl SessionFilters {
    pub fn apply(&mut self, edit: FilterEdit) {
        match edit {
            FilterEdit::UserId(value) => self.user_id = value,
            FilterEdit::Status(value) => self.status = value,
            FilterEdit::StartDate(value) => self.start_date = value,
            FilterEdit::EndDate(value) => self.end_date = value,
            FilterEdit::Search(value) => self.search_query = value,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Query parameters for the admin session list. Blank fields are omitted
    /// and the search text travels as `search`.
    pub fn list_query(&self) -> Vec<(&'static str, String)> {
        self.query_with_search_key("search")
    }

    /// Query parameters for the export endpoints, which name the search text
    /// `searchQuery`.
    pub fn export_query(&self) -> Vec<(&'static str, String)> {
        self.query_with_search_key("searchQuery")
    }

    fn query_with_search_key(&self, search_key: &'static str) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.user_id.trim().is_empty() {
            pairs.push(("userId", self.user_id.trim().to_string()));
        }
        if let Some(status) = self.status.as_query() {
            pairs.push(("status", status.to_string()));
        }
        if let Some(date) = self.start_date {
            pairs.push(("startDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.end_date {
            pairs.push(("endDate", date.format("%Y-%m-%d").to_string()));
        }
        if !self.search_query.trim().is_empty() {
            pairs.push((search_key, self.search_query.trim().to_string()));
        }
        pairs
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
const PAGE_WINDOW: u32 = 5;

/// Server-authoritative pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::with_limit(DEFAULT_PAGE_LIMIT)
    }
}

impl Pagination {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total: 0,
            pages: 0,
        }
    }

    pub fn shows_controls(&self) -> bool {
        self.total > u64::from(self.limit)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    pub fn clamp_page(&self, page: u32) -> u32 {
        page.clamp(1, self.pages.max(1))
    }

    /// 1-based index range of the rows on the current page.
    pub fn showing_range(&self) -> (u64, u64) {
        let limit = u64::from(self.limit);
        let first = u64::from(self.page.saturating_sub(1)) * limit + 1;
        let last = (u64::from(self.page) * limit).min(self.total);
        (first, last)
    }

    /// Up to five page numbers around the current page.
    pub fn page_window(&self) -> Vec<u32> {
        let count = self.pages.min(PAGE_WINDOW);
        let first = if self.pages <= PAGE_WINDOW || self.page <= 3 {
            1
        } else if self.page + 2 >= self.pages {
            self.pages - (PAGE_WINDOW - 1)
        } else {
            self.page - 2
        };
        (first..first + count).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_sessions: u64,
    pub active_sessions: u64,
    pub avg_duration: String,
    pub attendance_rate: String,
    pub total_hours: String,
    pub days_clocked_in: u64,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        Self {
            total_sessions: 0,
            active_sessions: 0,
            avg_duration: "0h".to_string(),
            attendance_rate: "0%".to_string(),
            total_hours: "0h".to_string(),
            days_clocked_in: 0,
        }
    }
}
