//! Plain-text layout of [`DashboardView`].

use std::fmt::Write;

use client_core::view::{
    AuthRequiredView, BodyView, DashboardView, Field, FooterView, HeaderView, PaginationBar,
    ReadyView, SessionCard, SessionDetailsView, SessionsPanel,
};
use shared::domain::Principal;

const RULE: &str = "------------------------------------------------------------";

pub fn render(view: &DashboardView) -> String {
    let mut out = String::new();
    match view {
        DashboardView::Loading => out.push_str("Loading session data...\n"),
        DashboardView::AuthRequired(view) => auth_required(&mut out, view),
        DashboardView::Ready(view) => ready(&mut out, view),
    }
    out
}

fn auth_required(out: &mut String, view: &AuthRequiredView) {
    let _ = writeln!(out, "{}", view.title);
    let _ = writeln!(out, "{}", view.message);
    if let Some(reason) = &view.reason {
        let _ = writeln!(out, "  ({reason})");
    }
    let _ = writeln!(out, "Run `session-desk login` to sign in.");
}

fn ready(out: &mut String, view: &ReadyView) {
    header(out, &view.header);
    match &view.body {
        BodyView::Sessions(panel) => sessions(out, panel),
        BodyView::Placeholder { title, message } => {
            let _ = writeln!(out, "{title}\n{message}");
        }
        BodyView::Settings {
            title,
            message,
            principal,
        } => {
            let _ = writeln!(out, "{title}\n{message}");
            profile(out, principal);
        }
    }
    if let Some(modal) = &view.modal {
        details(out, modal);
    }
    footer(out, &view.footer);
}

fn header(out: &mut String, header: &HeaderView) {
    let _ = writeln!(out, "Session Management | {}", header.portal);
    let _ = writeln!(out, "{} ({})", header.name, header.role);
    let nav: Vec<String> = header
        .nav
        .iter()
        .map(|item| {
            if item.active {
                format!("[{}]", item.label)
            } else {
                item.label.to_string()
            }
        })
        .collect();
    let _ = writeln!(out, "{}\n{RULE}", nav.join("  "));
}

fn sessions(out: &mut String, panel: &SessionsPanel) {
    let _ = writeln!(out, "{}", panel.subtitle);
    if let Some(button) = &panel.clock_button {
        let state = if button.disabled { " (disabled)" } else { "" };
        let _ = writeln!(out, "Action: {}{state}", button.label);
    }
    if let Some(banner) = &panel.current {
        let _ = writeln!(out, "Current session: {} | {}", banner.badge, banner.detail);
    }
    let stats = &panel.stats;
    if panel.show_filters {
        let _ = writeln!(
            out,
            "Stats: {} sessions, {} active, avg {}, attendance {}",
            stats.total_sessions, stats.active_sessions, stats.avg_duration, stats.attendance_rate
        );
    } else {
        let _ = writeln!(
            out,
            "Stats: {} sessions, {} worked, {} days, attendance {}",
            stats.total_sessions, stats.total_hours, stats.days_clocked_in, stats.attendance_rate
        );
    }

    let tabs: Vec<String> = panel
        .tabs
        .iter()
        .map(|tab| {
            let label = if tab.count > 0 {
                format!("{} {}", tab.label, tab.count)
            } else {
                tab.label.to_string()
            };
            if tab.active {
                format!("[{label}]")
            } else {
                label
            }
        })
        .collect();
    let _ = writeln!(out, "{}", tabs.join("  "));
    let _ = writeln!(
        out,
        "{} Active  {} Clocked In  {} Completed\n{RULE}",
        panel.summary.active, panel.summary.clocked_in, panel.summary.completed
    );

    for card in &panel.cards {
        session_card(out, card);
    }
    if let Some(empty) = &panel.empty {
        let _ = writeln!(out, "{}\n{}", empty.title, empty.message);
    }
    if let Some(bar) = &panel.pagination {
        pagination(out, bar);
    }
}

fn session_card(out: &mut String, card: &SessionCard) {
    let id = card
        .id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!("#{id} [{}]", card.status);
    if let Some(user) = &card.user {
        let _ = write!(line, " {} <{}>", user.name, user.email);
    }
    if let (Some(date), Some(time)) = (&card.date, &card.time) {
        let _ = write!(line, " {date} {time}");
    }
    let _ = writeln!(out, "{line}");

    let mut line = format!(
        "    in {}  out {}  duration {}",
        card.clock_in, card.clock_out, card.duration
    );
    if let Some(total) = &card.total_hours {
        let _ = write!(line, " ({total})");
    }
    let device_kind = if card.mobile { "mobile" } else { "desktop" };
    let _ = write!(line, "  {} [{device_kind}]", card.device);
    if let Some(ip) = &card.ip {
        let _ = write!(line, "  IP: {ip}");
    }
    if card.auto_logout {
        line.push_str("  Auto logout");
    }
    let _ = writeln!(out, "{line}");
}

fn pagination(out: &mut String, bar: &PaginationBar) {
    let pages: Vec<String> = bar
        .pages
        .iter()
        .map(|page| {
            if page.current {
                format!("[{}]", page.number)
            } else {
                page.number.to_string()
            }
        })
        .collect();
    let prev = if bar.prev_enabled { "<" } else { " " };
    let next = if bar.next_enabled { ">" } else { " " };
    let _ = writeln!(
        out,
        "{RULE}\n{}  {prev} {} {next}",
        bar.summary,
        pages.join(" ")
    );
}

fn fields(out: &mut String, title: &str, fields: &[Field]) {
    let _ = writeln!(out, "  {title}");
    for field in fields {
        let _ = writeln!(out, "    {:<12} {}", field.label, field.value);
    }
}

fn details(out: &mut String, modal: &SessionDetailsView) {
    let _ = writeln!(out, "{RULE}\n{}", modal.title);
    if let Some(date) = &modal.date {
        let _ = writeln!(out, "  {date}");
    }
    if let Some(user) = &modal.user {
        fields(out, "User Information", user);
    }
    fields(out, "Session Information", &modal.session);
    fields(out, "Device Information", &modal.device);
}

fn profile(out: &mut String, principal: &Principal) {
    let rows = [
        ("Name", Some(principal.name.as_str())),
        ("Email", principal.email.as_deref()),
        ("Role", Some(principal.role.as_str())),
        ("Department", principal.department.as_deref()),
        ("Designation", principal.designation.as_deref()),
        ("Phone", principal.phone.as_deref()),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            let _ = writeln!(out, "  {label:<12} {value}");
        }
    }
}

fn footer(out: &mut String, footer: &FooterView) {
    let mut line = format!("{RULE}\n{} | Role: {}", footer.version, footer.role);
    if let Some(id) = &footer.short_id {
        let _ = write!(line, " | User ID: {id}...");
    }
    let _ = writeln!(out, "{line}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_required_points_at_login() {
        let text = render(&DashboardView::AuthRequired(AuthRequiredView {
            title: "Authentication Required",
            message: "Your session has expired or you need to login first.",
            reason: Some("no authentication token found".into()),
        }));
        assert!(text.contains("Authentication Required"));
        assert!(text.contains("(no authentication token found)"));
        assert!(text.contains("session-desk login"));
    }

    #[test]
    fn loading_screen() {
        assert_eq!(render(&DashboardView::Loading), "Loading session data...\n");
    }
}
