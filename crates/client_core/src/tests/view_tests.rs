use super::*;
use crate::auth::AuthFailure;
use shared::protocol::ProfilePayload;

fn principal(kind: PrincipalKind) -> Principal {
    ProfilePayload {
        id: Some("65f1c0ffee1234".into()),
        name: Some("Ada Lovelace".into()),
        ..ProfilePayload::default()
    }
    .into_principal(kind)
}

fn state_for(kind: PrincipalKind) -> DashboardState {
    let mut state = DashboardState::new(20);
    state.authenticated(kind, principal(kind));
    state
}

fn session(id: &str) -> SessionRecord {
    SessionRecord {
        id: Some(SessionId::from(id)),
        login_at: Some("2024-03-04T09:15:00Z".into()),
        ..SessionRecord::default()
    }
}

fn ready(view: DashboardView) -> ReadyView {
    match view {
        DashboardView::Ready(ready) => *ready,
        other => panic!("expected ready view, got {other:?}"),
    }
}

fn sessions_panel(view: DashboardView) -> SessionsPanel {
    match ready(view).body {
        BodyView::Sessions(panel) => *panel,
        other => panic!("expected sessions body, got {other:?}"),
    }
}

#[test]
fn pending_and_failed_auth_have_dedicated_screens() {
    let state = DashboardState::new(20);
    assert_eq!(DashboardView::build(&state, &Utc), DashboardView::Loading);

    let mut state = state_for(PrincipalKind::Admin);
    state.require_auth(AuthFailure::MissingToken);
    match DashboardView::build(&state, &Utc) {
        DashboardView::AuthRequired(view) => {
            assert_eq!(view.title, "Authentication Required");
            assert_eq!(view.reason.as_deref(), Some("no authentication token found"));
        }
        other => panic!("unexpected view {other:?}"),
    }
}

#[test]
fn admin_card_falls_back_for_missing_fields() {
    let mut state = state_for(PrincipalKind::Admin);
    state.sessions = vec![session("s1")];

    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    let card = &panel.cards[0];
    let user = card.user.as_ref().expect("admin cards show the user");
    assert_eq!(user.name, "Unknown User");
    assert_eq!(user.email, "No email");
    assert_eq!(card.clock_in, "--:--");
    assert_eq!(card.clock_out, "--:--");
    assert_eq!(card.duration, "0m");
    assert_eq!(card.device, "Unknown");
    assert_eq!(card.date.as_deref(), Some("Mon, Mar 4"));
    assert_eq!(card.time.as_deref(), Some("09:15"));
    assert!(card.deletable);
    assert!(card.total_hours.is_none());
    assert!(panel.show_filters);
    assert!(panel.clock_button.is_none());
}

#[test]
fn employee_cards_hide_user_and_delete() {
    let mut state = state_for(PrincipalKind::Employee);
    let mut record = session("s1");
    record.device = Some("Mobile Safari".into());
    state.sessions = vec![record];

    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    let card = &panel.cards[0];
    assert!(card.user.is_none());
    assert!(!card.deletable);
    assert!(card.mobile);
    assert!(!panel.show_filters);
}

#[test]
fn admin_all_tab_counts_server_total() {
    let mut state = state_for(PrincipalKind::Admin);
    let mut active = session("a");
    active.is_active = true;
    let mut done = session("b");
    done.is_clocked_out = true;
    state.sessions = vec![active, done];
    state.pagination.total = 57;

    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    let counts: Vec<_> = panel.tabs.iter().map(|t| (t.label, t.count)).collect();
    assert_eq!(
        counts,
        vec![("All Sessions", 57), ("Active", 1), ("Completed", 1)]
    );
    assert_eq!(panel.summary.active, 1);
    assert_eq!(panel.summary.completed, 1);
}

#[test]
fn employee_first_tab_counts_list_length() {
    let mut state = state_for(PrincipalKind::Employee);
    state.sessions = vec![session("a"), session("b")];
    state.pagination.total = 99;

    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    assert_eq!(panel.tabs[0].label, "My Sessions");
    assert_eq!(panel.tabs[0].count, 2);
    assert!(panel.tabs[0].active);
}

#[test]
fn pagination_bar_hidden_when_everything_fits() {
    let mut state = state_for(PrincipalKind::Admin);
    state.sessions = vec![session("a"), session("b"), session("c")];
    state.pagination.total = 3;
    state.pagination.pages = 1;

    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    assert_eq!(panel.cards.len(), 3);
    assert!(panel.pagination.is_none());
}

#[test]
fn pagination_bar_describes_window() {
    let mut state = state_for(PrincipalKind::Admin);
    state.sessions = vec![session("a")];
    state.pagination.page = 2;
    state.pagination.total = 45;
    state.pagination.pages = 3;

    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    let bar = panel.pagination.expect("bar shown when total exceeds limit");
    assert_eq!(bar.summary, "Showing 21 to 40 of 45 sessions");
    assert_eq!(
        bar.pages.iter().map(|p| p.number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(bar.pages[1].current);
    assert!(bar.prev_enabled);
    assert!(bar.next_enabled);
}

#[test]
fn empty_state_depends_on_tab() {
    let mut state = state_for(PrincipalKind::Admin);
    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    assert_eq!(
        panel.empty.expect("empty").message,
        "No sessions match your current filters. Try adjusting your search or filters."
    );

    state.select_tab(SessionTab::Active);
    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    assert_eq!(
        panel.empty.expect("empty").message,
        "There are no active sessions available"
    );
}

#[test]
fn clock_button_tracks_current_session_and_flight() {
    let mut state = state_for(PrincipalKind::Employee);
    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    let button = panel.clock_button.expect("employees get a clock button");
    assert_eq!(button.action, ClockAction::In);
    assert_eq!(button.label, "Clock In");
    assert!(panel.current.is_none());

    let mut current = session("now");
    current.is_clocked_in = true;
    current.formatted_clock_in = Some("09:15".into());
    state.current_session = Some(current);
    state.clocking_out = true;

    let panel = sessions_panel(DashboardView::build(&state, &Utc));
    let button = panel.clock_button.expect("clock button");
    assert_eq!(button.action, ClockAction::Out);
    assert_eq!(button.label, "Processing...");
    assert!(button.disabled);
    let banner = panel.current.expect("banner");
    assert_eq!(banner.badge, "Working");
    assert_eq!(banner.detail, "Clocked in at 09:15 • Duration: 0m");
}

#[test]
fn stub_views_and_footer() {
    let mut state = state_for(PrincipalKind::Admin);
    state.set_view(ActiveView::Analytics);
    let view = ready(DashboardView::build(&state, &Utc));
    assert_eq!(
        view.body,
        BodyView::Placeholder {
            title: "Analytics Dashboard",
            message: "Analytics features coming soon...",
        }
    );
    assert_eq!(view.footer.version, "Session Management System v2.0");
    assert_eq!(view.footer.role, "admin");
    assert_eq!(view.footer.short_id.as_deref(), Some("65f1c0ff"));
    assert_eq!(view.header.portal, "Admin Dashboard");
    assert_eq!(view.header.nav.len(), 4);
    assert!(view.header.nav[1].active);
}

#[test]
fn details_modal_sections() {
    let mut state = state_for(PrincipalKind::Admin);
    let mut record = session("s1");
    record.user_name = Some("Grace".into());
    record.browser = Some("Firefox".into());
    state.sessions = vec![record];
    assert!(state.open_details(&SessionId::from("s1")));

    let modal = ready(DashboardView::build(&state, &Utc))
        .modal
        .expect("modal open");
    let user = modal.user.expect("admin sees user section");
    assert_eq!(user, vec![Field::new("Name", "Grace")]);
    assert!(modal
        .session
        .contains(&Field::new("Total Hours", "0 hours")));
    assert!(modal.device.contains(&Field::new("Browser", "Firefox")));
    assert!(modal.device.contains(&Field::new("OS", "Unknown")));

    state.close_details();
    assert!(ready(DashboardView::build(&state, &Utc)).modal.is_none());
}
