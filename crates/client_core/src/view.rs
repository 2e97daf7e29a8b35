//! Render-ready description of the dashboard, derived from
//! [`DashboardState`] and nothing else. Front ends only lay this out.

use chrono::{DateTime, Local, TimeZone, Utc};
use shared::domain::{
    ActiveView, Pagination, Principal, PrincipalKind, SessionId, SessionRecord, SessionTab,
    StatsSnapshot,
};

use crate::dashboard::{AuthState, DashboardState};

pub const APP_VERSION_LABEL: &str = "Session Management System v2.0";
const NO_TIME: &str = "--:--";
const NO_DURATION: &str = "0m";
const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardView {
    Loading,
    AuthRequired(AuthRequiredView),
    Ready(Box<ReadyView>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequiredView {
    pub title: &'static str,
    pub message: &'static str,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadyView {
    pub header: HeaderView,
    pub body: BodyView,
    pub footer: FooterView,
    pub modal: Option<SessionDetailsView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub portal: &'static str,
    pub name: String,
    pub role: String,
    pub profile_image: Option<String>,
    pub nav: Vec<NavItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub view: ActiveView,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyView {
    Sessions(Box<SessionsPanel>),
    Placeholder {
        title: &'static str,
        message: &'static str,
    },
    Settings {
        title: &'static str,
        message: &'static str,
        principal: Principal,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionsPanel {
    pub subtitle: &'static str,
    pub clock_button: Option<ClockButton>,
    pub current: Option<CurrentSessionBanner>,
    pub show_filters: bool,
    pub exporting: bool,
    pub stats: StatsSnapshot,
    pub tabs: Vec<TabView>,
    pub summary: SummaryCounts,
    pub cards: Vec<SessionCard>,
    pub empty: Option<EmptyState>,
    pub pagination: Option<PaginationBar>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockAction {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockButton {
    pub action: ClockAction,
    pub label: &'static str,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSessionBanner {
    pub badge: &'static str,
    pub detail: String,
    pub working: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabView {
    pub tab: SessionTab,
    pub label: &'static str,
    /// Hidden by front ends when zero.
    pub count: u64,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryCounts {
    pub active: usize,
    pub clocked_in: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLine {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCard {
    pub id: Option<SessionId>,
    pub user: Option<UserLine>,
    pub status: &'static str,
    pub date: Option<String>,
    pub time: Option<String>,
    pub clock_in: String,
    pub clock_out: String,
    pub duration: String,
    pub total_hours: Option<String>,
    pub device: String,
    pub mobile: bool,
    pub ip: Option<String>,
    pub auto_logout: bool,
    pub deletable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyState {
    pub title: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationBar {
    pub summary: String,
    pub pages: Vec<PageButton>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageButton {
    pub number: u32,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

impl Field {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDetailsView {
    pub title: &'static str,
    pub date: Option<String>,
    pub user: Option<Vec<Field>>,
    pub session: Vec<Field>,
    pub device: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FooterView {
    pub version: &'static str,
    pub role: String,
    pub short_id: Option<String>,
}

impl DashboardView {
    /// Builds the view with timestamps shown in the local time zone.
    pub fn from_state(state: &DashboardState) -> Self {
        Self::build(state, &Local)
    }

    pub fn build<Tz>(state: &DashboardState, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        match (&state.auth, state.kind, &state.principal) {
            (AuthState::Authenticated, Some(kind), Some(principal)) => {
                Self::Ready(Box::new(ReadyView {
                    header: header(kind, principal, state.view),
                    body: body(state, kind, principal, tz),
                    footer: FooterView {
                        version: APP_VERSION_LABEL,
                        role: principal.role.clone(),
                        short_id: principal.short_id().map(str::to_string),
                    },
                    modal: state
                        .selected
                        .as_ref()
                        .map(|session| details(session, kind, tz)),
                }))
            }
            (AuthState::Pending, ..) => Self::Loading,
            (AuthState::Required(failure), ..) => Self::AuthRequired(AuthRequiredView {
                title: "Authentication Required",
                message: "Your session has expired or you need to login first.",
                reason: Some(failure.to_string()),
            }),
            _ => Self::AuthRequired(AuthRequiredView {
                title: "Authentication Required",
                message: "Your session has expired or you need to login first.",
                reason: None,
            }),
        }
    }
}

fn header(kind: PrincipalKind, principal: &Principal, current: ActiveView) -> HeaderView {
    HeaderView {
        portal: kind.portal_label(),
        name: principal.name.clone(),
        role: principal.role.clone(),
        profile_image: principal.profile_image.clone(),
        nav: kind
            .views()
            .iter()
            .map(|&view| NavItem {
                view,
                label: view.label(),
                active: view == current,
            })
            .collect(),
    }
}

fn body<Tz>(state: &DashboardState, kind: PrincipalKind, principal: &Principal, tz: &Tz) -> BodyView
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match state.view {
        ActiveView::Sessions => BodyView::Sessions(Box::new(sessions_panel(state, kind, tz))),
        ActiveView::Analytics => BodyView::Placeholder {
            title: "Analytics Dashboard",
            message: "Analytics features coming soon...",
        },
        ActiveView::Users => BodyView::Placeholder {
            title: "User Management",
            message: "User management features coming soon...",
        },
        ActiveView::Settings => BodyView::Settings {
            title: "Settings",
            message: "Settings features coming soon...",
            principal: principal.clone(),
        },
    }
}

fn sessions_panel<Tz>(state: &DashboardState, kind: PrincipalKind, tz: &Tz) -> SessionsPanel
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let is_admin = kind == PrincipalKind::Admin;
    let cards: Vec<SessionCard> = state
        .visible_sessions()
        .into_iter()
        .map(|session| card(session, is_admin, tz))
        .collect();

    let empty = cards.is_empty().then(|| empty_state(state.tab));
    let pagination = (!cards.is_empty() && state.pagination.shows_controls())
        .then(|| pagination_bar(&state.pagination));

    SessionsPanel {
        subtitle: if is_admin {
            "Monitor and manage all user sessions"
        } else {
            "View and manage your work sessions and attendance"
        },
        clock_button: (!is_admin).then(|| clock_button(state)),
        current: if is_admin {
            None
        } else {
            state.current_session.as_ref().map(current_banner)
        },
        show_filters: is_admin,
        exporting: state.exporting,
        stats: state.stats.clone(),
        tabs: tabs(state, kind),
        summary: summary(&state.sessions),
        cards,
        empty,
        pagination,
    }
}

fn clock_button(state: &DashboardState) -> ClockButton {
    if state.is_clocked_in() {
        ClockButton {
            action: ClockAction::Out,
            label: if state.clocking_out {
                "Processing..."
            } else {
                "Clock Out"
            },
            disabled: state.clocking_out,
        }
    } else {
        ClockButton {
            action: ClockAction::In,
            label: if state.clocking_in {
                "Processing..."
            } else {
                "Clock In"
            },
            disabled: state.clocking_in,
        }
    }
}

fn current_banner(session: &SessionRecord) -> CurrentSessionBanner {
    if session.is_clocked_in {
        CurrentSessionBanner {
            badge: "Working",
            detail: format!(
                "Clocked in at {} • Duration: {}",
                or_default(&session.formatted_clock_in, NO_TIME),
                or_default(&session.formatted_duration, NO_DURATION),
            ),
            working: true,
        }
    } else {
        CurrentSessionBanner {
            badge: "Not Clocked In",
            detail: "No active session".to_string(),
            working: false,
        }
    }
}

fn tabs(state: &DashboardState, kind: PrincipalKind) -> Vec<TabView> {
    kind.tabs()
        .into_iter()
        .map(|tab| {
            let count = match tab {
                SessionTab::All => state.pagination.total,
                SessionTab::MySessions => state.sessions.len() as u64,
                SessionTab::Active | SessionTab::Completed => {
                    state.sessions.iter().filter(|s| tab.matches(s)).count() as u64
                }
            };
            TabView {
                tab,
                label: tab.label(),
                count,
                active: tab == state.tab,
            }
        })
        .collect()
}

fn summary(sessions: &[SessionRecord]) -> SummaryCounts {
    sessions.iter().fold(SummaryCounts::default(), |mut acc, s| {
        acc.active += usize::from(s.is_active);
        acc.clocked_in += usize::from(s.is_clocked_in);
        acc.completed += usize::from(s.is_clocked_out);
        acc
    })
}

fn local_start<Tz: TimeZone>(session: &SessionRecord, tz: &Tz) -> Option<DateTime<Tz>> {
    session
        .started_at()
        .map(|at: DateTime<Utc>| at.with_timezone(tz))
}

fn card<Tz>(session: &SessionRecord, is_admin: bool, tz: &Tz) -> SessionCard
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let started = local_start(session, tz);
    SessionCard {
        id: session.id.clone(),
        user: is_admin.then(|| UserLine {
            name: or_default(&session.user_name, "Unknown User"),
            email: or_default(&session.user_email, "No email"),
        }),
        status: session.display_status().label(),
        date: started.as_ref().map(|at| at.format("%a, %b %-d").to_string()),
        time: started.as_ref().map(|at| at.format("%H:%M").to_string()),
        clock_in: or_default(&session.formatted_clock_in, NO_TIME),
        clock_out: or_default(&session.formatted_clock_out, NO_TIME),
        duration: or_default(&session.formatted_duration, NO_DURATION),
        total_hours: non_blank(&session.formatted_total_hours),
        device: or_default(&session.device, UNKNOWN),
        mobile: session.is_mobile_device(),
        ip: non_blank(&session.ip),
        auto_logout: session.auto_logout,
        deletable: is_admin,
    }
}

fn empty_state(tab: SessionTab) -> EmptyState {
    EmptyState {
        title: "No sessions found",
        message: if tab.shows_everything() {
            "No sessions match your current filters. Try adjusting your search or filters."
                .to_string()
        } else {
            format!("There are no {} sessions available", tab.id())
        },
    }
}

fn pagination_bar(pagination: &Pagination) -> PaginationBar {
    let (first, last) = pagination.showing_range();
    PaginationBar {
        summary: format!(
            "Showing {first} to {last} of {} sessions",
            pagination.total
        ),
        pages: pagination
            .page_window()
            .into_iter()
            .map(|number| PageButton {
                number,
                current: number == pagination.page,
            })
            .collect(),
        prev_enabled: pagination.has_prev(),
        next_enabled: pagination.has_next(),
    }
}

fn details<Tz>(session: &SessionRecord, kind: PrincipalKind, tz: &Tz) -> SessionDetailsView
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let started = local_start(session, tz);
    let user = (kind == PrincipalKind::Admin).then(|| {
        [
            ("Name", &session.user_name),
            ("Email", &session.user_email),
            ("Role", &session.user_role),
        ]
        .into_iter()
        .filter_map(|(label, value)| non_blank(value).map(|value| Field::new(label, value)))
        .collect()
    });

    SessionDetailsView {
        title: "Session Details",
        date: started.as_ref().map(|at| at.format("%Y-%m-%d").to_string()),
        user,
        session: vec![
            Field::new(
                "Login Time",
                started
                    .as_ref()
                    .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| UNKNOWN.to_string()),
            ),
            Field::new("Duration", or_default(&session.formatted_duration, NO_DURATION)),
            Field::new("Clock In", or_default(&session.formatted_clock_in, NO_TIME)),
            Field::new("Clock Out", or_default(&session.formatted_clock_out, NO_TIME)),
            Field::new(
                "Total Hours",
                or_default(&session.formatted_total_hours, "0 hours"),
            ),
            Field::new("Status", session.display_status().label()),
        ],
        device: vec![
            Field::new("Device", or_default(&session.device, UNKNOWN)),
            Field::new("Browser", or_default(&session.browser, UNKNOWN)),
            Field::new("OS", or_default(&session.os, UNKNOWN)),
            Field::new("IP Address", or_default(&session.ip, UNKNOWN)),
        ],
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

fn or_default(value: &Option<String>, fallback: &str) -> String {
    non_blank(value).unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
