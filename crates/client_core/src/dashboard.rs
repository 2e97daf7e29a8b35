//! Dashboard view state and the pure transitions applied to it.

use shared::{
    domain::{
        ActiveView, FilterEdit, Pagination, Principal, PrincipalKind, SessionFilters, SessionId,
        SessionRecord, SessionTab, StatsSnapshot,
    },
    protocol::SessionPage,
};
use tracing::{error, warn};

use crate::{auth::AuthFailure, error::ClientError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Pending,
    Authenticated,
    Required(AuthFailure),
    SignedOut,
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub auth: AuthState,
    pub kind: Option<PrincipalKind>,
    pub principal: Option<Principal>,
    pub view: ActiveView,
    pub tab: SessionTab,
    pub filters: SessionFilters,
    pub pagination: Pagination,
    pub sessions: Vec<SessionRecord>,
    pub stats: StatsSnapshot,
    pub current_session: Option<SessionRecord>,
    pub clocking_in: bool,
    pub clocking_out: bool,
    pub exporting: bool,
    pub selected: Option<SessionRecord>,
    pub pending_delete: Option<SessionId>,
}

impl DashboardState {
    pub fn new(page_limit: u32) -> Self {
        Self {
            auth: AuthState::Pending,
            kind: None,
            principal: None,
            view: ActiveView::Sessions,
            tab: SessionTab::All,
            filters: SessionFilters::default(),
            pagination: Pagination::with_limit(page_limit),
            sessions: Vec::new(),
            stats: StatsSnapshot::default(),
            current_session: None,
            clocking_in: false,
            clocking_out: false,
            exporting: false,
            selected: None,
            pending_delete: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.kind == Some(PrincipalKind::Admin)
    }

    pub fn is_clocked_in(&self) -> bool {
        self.current_session
            .as_ref()
            .is_some_and(|session| session.is_clocked_in)
    }

    pub fn begin_auth(&mut self) {
        self.auth = AuthState::Pending;
    }

    pub fn authenticated(&mut self, kind: PrincipalKind, principal: Principal) {
        self.auth = AuthState::Authenticated;
        self.kind = Some(kind);
        self.principal = Some(principal);
        self.tab = kind.default_tab();
        self.view = ActiveView::Sessions;
    }

    /// Drops everything tied to the old principal.
    pub fn require_auth(&mut self, failure: AuthFailure) {
        self.reset_principal_state();
        self.auth = AuthState::Required(failure);
    }

    pub fn sign_out(&mut self) {
        self.reset_principal_state();
        self.auth = AuthState::SignedOut;
    }

    fn reset_principal_state(&mut self) {
        *self = Self {
            filters: std::mem::take(&mut self.filters),
            ..Self::new(self.pagination.limit)
        };
    }

    pub fn select_tab(&mut self, tab: SessionTab) -> bool {
        let allowed = self.kind.is_some_and(|kind| kind.tabs().contains(&tab));
        if allowed {
            self.tab = tab;
        } else {
            warn!(tab = tab.id(), "tab not available for this principal");
        }
        allowed
    }

    pub fn set_view(&mut self, view: ActiveView) -> bool {
        let allowed = self.kind.is_some_and(|kind| kind.can_open(view));
        if allowed {
            self.view = view;
        } else {
            warn!(view = view.label(), "view not available for this principal");
        }
        allowed
    }

    /// Returns whether the filter set actually changed.
    pub fn edit_filter(&mut self, edit: FilterEdit) -> bool {
        let before = self.filters.clone();
        self.filters.apply(edit);
        self.filters != before
    }

    pub fn clear_filters(&mut self) -> bool {
        let changed = !self.filters.is_empty();
        self.filters = SessionFilters::default();
        changed
    }

    /// Client-side tab predicate over the fetched list. Never touches the
    /// network.
    pub fn visible_sessions(&self) -> Vec<&SessionRecord> {
        self.sessions
            .iter()
            .filter(|session| self.tab.matches(session))
            .collect()
    }

    pub fn apply_session_page(
        &mut self,
        kind: PrincipalKind,
        requested_page: u32,
        result: Result<SessionPage, ClientError>,
    ) {
        match result {
            Ok(page) => {
                let listed = page.sessions.len();
                self.sessions = page.sessions;
                match kind {
                    PrincipalKind::Admin => {
                        let requested = Pagination {
                            page: requested_page,
                            ..self.pagination
                        };
                        self.pagination = match page.pagination {
                            Some(server) => server.replace(requested),
                            None => requested,
                        };
                    }
                    PrincipalKind::Employee => {
                        if let Some(server) = page.pagination {
                            self.pagination = server.merge_totals(self.pagination, listed);
                        }
                    }
                }
            }
            Err(err) => {
                error!("failed to fetch sessions: {err}");
                self.sessions.clear();
            }
        }
    }

    pub fn apply_stats(&mut self, result: Result<StatsSnapshot, ClientError>) {
        self.stats = result.unwrap_or_else(|err| {
            error!("failed to fetch stats: {err}");
            StatsSnapshot::default()
        });
    }

    pub fn apply_current_session(&mut self, result: Result<Option<SessionRecord>, ClientError>) {
        self.current_session = result.unwrap_or_else(|err| {
            error!("failed to fetch current session: {err}");
            None
        });
    }

    pub fn open_details(&mut self, id: &SessionId) -> bool {
        self.selected = self
            .sessions
            .iter()
            .find(|session| session.id.as_ref() == Some(id))
            .cloned();
        self.selected.is_some()
    }

    pub fn close_details(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use shared::protocol::PaginationPayload;

    use super::*;

    fn record(id: &str, active: bool, clocked_out: bool) -> SessionRecord {
        SessionRecord {
            id: Some(SessionId::from(id)),
            is_active: active,
            is_clocked_in: active,
            is_clocked_out: clocked_out,
            ..SessionRecord::default()
        }
    }

    fn admin_state() -> DashboardState {
        let mut state = DashboardState::new(20);
        state.authenticated(
            PrincipalKind::Admin,
            shared::protocol::ProfilePayload::default().into_principal(PrincipalKind::Admin),
        );
        state
    }

    #[test]
    fn tabs_partition_fetched_sessions() {
        let mut state = admin_state();
        state.sessions = vec![
            record("a", true, false),
            record("b", false, true),
            record("c", false, true),
        ];

        assert_eq!(state.visible_sessions().len(), 3);
        assert!(state.select_tab(SessionTab::Active));
        assert_eq!(state.visible_sessions().len(), 1);
        assert!(state.select_tab(SessionTab::Completed));
        assert_eq!(state.visible_sessions().len(), 2);
        assert!(!state.select_tab(SessionTab::MySessions));
        assert_eq!(state.tab, SessionTab::Completed);
    }

    #[test]
    fn failed_fetches_degrade_to_neutral_values() {
        let mut state = admin_state();
        state.sessions = vec![record("a", true, false)];
        state.stats.total_sessions = 9;
        state.current_session = Some(record("a", true, false));

        let err = || ClientError::Malformed {
            endpoint: "/x".into(),
            reason: "bad".into(),
        };
        state.apply_session_page(PrincipalKind::Admin, 1, Err(err()));
        state.apply_stats(Err(err()));
        state.apply_current_session(Err(err()));

        assert!(state.sessions.is_empty());
        assert_eq!(state.stats, StatsSnapshot::default());
        assert!(state.current_session.is_none());
    }

    #[test]
    fn admin_page_without_pagination_keeps_cursor_but_moves_page() {
        let mut state = admin_state();
        state.pagination.total = 60;
        state.pagination.pages = 3;
        state.apply_session_page(
            PrincipalKind::Admin,
            2,
            Ok(SessionPage {
                sessions: vec![record("a", false, true)],
                pagination: None,
            }),
        );
        assert_eq!(state.pagination.page, 2);
        assert_eq!(state.pagination.total, 60);
    }

    #[test]
    fn admin_page_takes_server_cursor() {
        let mut state = admin_state();
        state.apply_session_page(
            PrincipalKind::Admin,
            1,
            Ok(SessionPage {
                sessions: Vec::new(),
                pagination: Some(PaginationPayload {
                    page: Some(1),
                    limit: Some(20),
                    total: Some(41),
                    pages: Some(3),
                }),
            }),
        );
        assert_eq!(state.pagination.total, 41);
        assert_eq!(state.pagination.pages, 3);
    }

    #[test]
    fn filter_edits_report_changes() {
        let mut state = admin_state();
        assert!(state.edit_filter(FilterEdit::Search("ada".into())));
        assert!(!state.edit_filter(FilterEdit::Search("ada".into())));
        assert!(state.clear_filters());
        assert!(!state.clear_filters());
    }

    #[test]
    fn require_auth_forgets_principal_data() {
        let mut state = admin_state();
        state.sessions = vec![record("a", true, false)];
        state.require_auth(AuthFailure::MissingToken);
        assert!(state.principal.is_none());
        assert!(state.kind.is_none());
        assert!(state.sessions.is_empty());
        assert_eq!(state.auth, AuthState::Required(AuthFailure::MissingToken));
    }

    #[test]
    fn details_open_only_for_known_sessions() {
        let mut state = admin_state();
        state.sessions = vec![record("a", true, false)];
        assert!(state.open_details(&SessionId::from("a")));
        assert!(!state.open_details(&SessionId::from("zzz")));
        assert!(state.selected.is_none());
    }
}
