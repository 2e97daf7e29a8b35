use shared::domain::{PrincipalKind, SessionId};

pub const CLOCK_IN: &str = "/sessions/clock-in";
pub const CLOCK_OUT: &str = "/sessions/clock-out";

/// Per-principal read endpoints. Picking the table is the only place the API
/// layer branches on the principal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub profile: &'static str,
    pub sessions: &'static str,
    pub stats: &'static str,
    pub export: &'static str,
    pub current_session: Option<&'static str>,
}

const ADMIN: Endpoints = Endpoints {
    profile: "/admin/getAdminProfile",
    sessions: "/allSession",
    stats: "/admin/statistics",
    export: "/sessions/admin/export",
    current_session: None,
};

const EMPLOYEE: Endpoints = Endpoints {
    profile: "/users/getProfile",
    sessions: "/sessions/my-sessions",
    stats: "/sessions/sessions/stats/attendance",
    export: "/sessions/export",
    current_session: Some("/sessions/my-current-session"),
};

impl Endpoints {
    pub fn for_kind(kind: PrincipalKind) -> &'static Endpoints {
        match kind {
            PrincipalKind::Admin => &ADMIN,
            PrincipalKind::Employee => &EMPLOYEE,
        }
    }
}

pub fn delete_session(id: &SessionId) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(id.0.as_bytes()).collect();
    format!("/sessions/admin/session/{encoded}")
}
