//! Single-actor controller: owns [`DashboardState`], turns front-end commands
//! into fetches and actions, and publishes state and notices back.
//!
//! Network work runs on spawned tasks that report through a completion
//! channel. Every read carries a per-slot sequence number; a completion whose
//! number is no longer the latest for its slot is dropped instead of
//! overwriting fresher data.

use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use shared::{
    domain::{ActiveView, FilterEdit, PrincipalKind, SessionId, SessionRecord, SessionTab, StatsSnapshot},
    protocol::SessionPage,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
    actions::{self, ExportFile},
    auth::{AuthOutcome, AuthResolver},
    config::ClientSettings,
    credentials::{CredentialStore, SessionContext},
    dashboard::{AuthState, DashboardState},
    debounce::{self, Debouncer},
    error::ClientError,
    ActionReceipt, SessionQuery, SessionsApi,
};

const COMMAND_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub filter_debounce: Duration,
    pub login_redirect_delay: Duration,
    pub page_limit: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&ClientSettings::default())
    }
}

impl From<&ClientSettings> for ControllerSettings {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            filter_debounce: settings.filter_debounce,
            login_redirect_delay: settings.login_redirect_delay,
            page_limit: settings.page_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetView(ActiveView),
    SelectTab(SessionTab),
    EditFilter(FilterEdit),
    ClearFilters,
    GoToPage(u32),
    NextPage,
    PrevPage,
    Refresh,
    ClockIn,
    ClockOut,
    RequestDelete(SessionId),
    ConfirmDelete(bool),
    Export,
    OpenDetails(SessionId),
    CloseDetails,
    RetryAuth,
    Logout,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Blocking notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    State(Box<DashboardState>),
    Notice(Notice),
    /// The front end must answer with [`Command::ConfirmDelete`].
    ConfirmDelete(SessionId),
    ExportReady(ExportFile),
    RedirectToLogin,
    /// Nothing in flight and no debounced refetch pending.
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Slot {
    Sessions,
    Stats,
    CurrentSession,
}

#[derive(Debug, Default)]
struct Sequencer {
    next: u64,
    latest: HashMap<Slot, u64>,
}

impl Sequencer {
    fn issue(&mut self, slot: Slot) -> u64 {
        self.next += 1;
        self.latest.insert(slot, self.next);
        self.next
    }

    fn is_latest(&self, slot: Slot, seq: u64) -> bool {
        self.latest.get(&slot) == Some(&seq)
    }

    /// Everything issued so far becomes stale. Numbers keep increasing.
    fn invalidate(&mut self) {
        self.latest.clear();
    }
}

enum Completion {
    Auth {
        generation: u64,
        outcome: AuthOutcome,
    },
    Sessions {
        seq: u64,
        kind: PrincipalKind,
        page: u32,
        result: Result<SessionPage, ClientError>,
    },
    Stats {
        seq: u64,
        result: Result<StatsSnapshot, ClientError>,
    },
    CurrentSession {
        seq: u64,
        result: Result<Option<SessionRecord>, ClientError>,
    },
    ClockIn(Result<ActionReceipt, ClientError>),
    ClockOut(Result<ActionReceipt, ClientError>),
    Deleted(Result<ActionReceipt, ClientError>),
    Exported(Result<ExportFile, ClientError>),
    RedirectDue {
        generation: u64,
    },
}

pub struct DashboardHandle {
    pub commands: mpsc::Sender<Command>,
    pub events: mpsc::UnboundedReceiver<Event>,
    pub task: JoinHandle<()>,
}

/// Starts the controller on the current runtime. It authenticates right away
/// and then serves commands until [`Command::Shutdown`] or the command sender
/// is dropped.
pub fn spawn_dashboard(
    api: Arc<dyn SessionsApi>,
    store: Arc<dyn CredentialStore>,
    settings: ControllerSettings,
) -> DashboardHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (completion_tx, completion_rx) = mpsc::unbounded_channel();

    let controller = Controller {
        api,
        store,
        state: DashboardState::new(settings.page_limit),
        debouncer: Debouncer::new(settings.filter_debounce),
        settings,
        context: None,
        sequencer: Sequencer::default(),
        in_flight: 0,
        auth_generation: 0,
        events: event_tx,
        completions: completion_tx,
    };
    let task = tokio::spawn(controller.run(command_rx, completion_rx));

    DashboardHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

struct Controller {
    api: Arc<dyn SessionsApi>,
    store: Arc<dyn CredentialStore>,
    settings: ControllerSettings,
    state: DashboardState,
    context: Option<SessionContext>,
    sequencer: Sequencer,
    debouncer: Debouncer,
    in_flight: usize,
    auth_generation: u64,
    events: mpsc::UnboundedSender<Event>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl Controller {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        self.start_auth();
        self.publish();

        loop {
            let deadline = self.debouncer.deadline();
            tokio::select! {
                command = commands.recv() => match command {
                    None | Some(Command::Shutdown) => break,
                    Some(command) => self.handle_command(command),
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                _ = debounce::sleep_until(deadline), if deadline.is_some() => {
                    if self.debouncer.fire_if_due() {
                        debug!("filter edits settled, refetching sessions");
                        self.fetch_sessions(1);
                    }
                }
            }
            self.publish();
        }
        info!("dashboard controller stopped");
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!("{}", notice.message),
            NoticeLevel::Error => warn!("{}", notice.message),
        }
        self.emit(Event::Notice(notice));
    }

    fn publish(&self) {
        self.emit(Event::State(Box::new(self.state.clone())));
        if self.in_flight == 0 && !self.debouncer.is_armed() {
            self.emit(Event::Settled);
        }
    }

    fn spawn_task<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let _ = completions.send(task.await);
        });
    }

    fn start_auth(&mut self) {
        self.auth_generation += 1;
        let generation = self.auth_generation;
        self.context = None;
        self.sequencer.invalidate();
        self.state.begin_auth();

        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let redirect_delay = self.settings.login_redirect_delay;
        self.spawn_task(async move {
            let outcome = AuthResolver::new(store.as_ref(), api.as_ref(), redirect_delay)
                .resolve()
                .await;
            Completion::Auth {
                generation,
                outcome,
            }
        });
    }

    fn kind(&self) -> Option<PrincipalKind> {
        self.context.as_ref().map(|ctx| ctx.kind)
    }

    fn fetch_sessions(&mut self, page: u32) {
        let Some(ctx) = self.context.clone() else {
            return;
        };
        let seq = self.sequencer.issue(Slot::Sessions);
        let query = SessionQuery {
            page,
            limit: self.state.pagination.limit,
            filters: self.state.filters.clone(),
        };
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let result = api.list_sessions(&ctx, &query).await;
            Completion::Sessions {
                seq,
                kind: ctx.kind,
                page,
                result,
            }
        });
    }

    fn fetch_stats(&mut self) {
        let Some(ctx) = self.context.clone() else {
            return;
        };
        let seq = self.sequencer.issue(Slot::Stats);
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let result = api.fetch_stats(&ctx).await;
            Completion::Stats { seq, result }
        });
    }

    fn fetch_current_session(&mut self) {
        let Some(ctx) = self.context.clone() else {
            return;
        };
        if ctx.kind != PrincipalKind::Employee {
            return;
        }
        let seq = self.sequencer.issue(Slot::CurrentSession);
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            let result = api.current_session(&ctx).await;
            Completion::CurrentSession { seq, result }
        });
    }

    fn refresh_all(&mut self) {
        self.fetch_sessions(self.state.pagination.page);
        self.fetch_stats();
        self.fetch_current_session();
    }

    fn handle_command(&mut self, command: Command) {
        debug!(?command, "dashboard command");
        match command {
            Command::SetView(view) => {
                self.state.set_view(view);
            }
            Command::SelectTab(tab) => {
                self.state.select_tab(tab);
            }
            Command::EditFilter(edit) => {
                // The user id is sent with the next refetch but does not start one.
                let rearm = !matches!(edit, FilterEdit::UserId(_));
                if self.state.edit_filter(edit)
                    && rearm
                    && self.kind() == Some(PrincipalKind::Admin)
                {
                    self.debouncer.touch();
                }
            }
            Command::ClearFilters => {
                if self.state.clear_filters() && self.kind() == Some(PrincipalKind::Admin) {
                    self.debouncer.touch();
                }
            }
            Command::GoToPage(page) => self.go_to_page(page),
            Command::NextPage => {
                if self.state.pagination.has_next() {
                    self.go_to_page(self.state.pagination.page + 1);
                }
            }
            Command::PrevPage => {
                if self.state.pagination.has_prev() {
                    self.go_to_page(self.state.pagination.page - 1);
                }
            }
            Command::Refresh => self.refresh_all(),
            Command::ClockIn => self.clock_in(),
            Command::ClockOut => self.clock_out(),
            Command::RequestDelete(id) => {
                if self.kind() == Some(PrincipalKind::Admin) {
                    self.state.pending_delete = Some(id.clone());
                    self.emit(Event::ConfirmDelete(id));
                } else {
                    self.notify(Notice::error(actions::DELETE_FAILURE));
                }
            }
            Command::ConfirmDelete(confirmed) => self.confirm_delete(confirmed),
            Command::Export => self.export(),
            Command::OpenDetails(id) => {
                if !self.state.open_details(&id) {
                    warn!(session_id = %id, "no such session on this page");
                }
            }
            Command::CloseDetails => self.state.close_details(),
            Command::RetryAuth => self.start_auth(),
            Command::Logout => {
                if let Err(err) = self.store.clear() {
                    warn!("failed to clear stored credentials: {err}");
                }
                self.auth_generation += 1;
                self.context = None;
                self.sequencer.invalidate();
                self.debouncer.cancel();
                self.state.sign_out();
                info!("signed out");
                self.emit(Event::RedirectToLogin);
            }
            Command::Shutdown => {}
        }
    }

    fn go_to_page(&mut self, page: u32) {
        match self.kind() {
            Some(PrincipalKind::Admin) => {
                let page = self.state.pagination.clamp_page(page);
                self.fetch_sessions(page);
            }
            Some(PrincipalKind::Employee) => {
                self.fetch_sessions(self.state.pagination.page);
            }
            None => {}
        }
    }

    fn clock_in(&mut self) {
        let Some(ctx) = self.context.clone() else {
            return;
        };
        if self.state.clocking_in {
            debug!("clock-in already in flight");
            return;
        }
        self.state.clocking_in = true;
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            Completion::ClockIn(actions::clock_in(api.as_ref(), &ctx).await)
        });
    }

    fn clock_out(&mut self) {
        let Some(ctx) = self.context.clone() else {
            return;
        };
        if self.state.clocking_out {
            debug!("clock-out already in flight");
            return;
        }
        self.state.clocking_out = true;
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            Completion::ClockOut(actions::clock_out(api.as_ref(), &ctx).await)
        });
    }

    fn confirm_delete(&mut self, confirmed: bool) {
        let Some(id) = self.state.pending_delete.take() else {
            return;
        };
        if !confirmed {
            debug!(session_id = %id, "delete cancelled");
            return;
        }
        let Some(ctx) = self.context.clone() else {
            return;
        };
        let api = Arc::clone(&self.api);
        self.spawn_task(async move {
            Completion::Deleted(actions::delete_session(api.as_ref(), &ctx, &id).await)
        });
    }

    fn export(&mut self) {
        let Some(ctx) = self.context.clone() else {
            return;
        };
        if self.state.exporting {
            return;
        }
        self.state.exporting = true;
        let api = Arc::clone(&self.api);
        let filters = self.state.filters.clone();
        self.spawn_task(async move {
            let today = Utc::now().date_naive();
            Completion::Exported(actions::export_sessions(api.as_ref(), &ctx, &filters, today).await)
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        if !matches!(completion, Completion::RedirectDue { .. }) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }

        match completion {
            Completion::Auth {
                generation,
                outcome,
            } => {
                if generation != self.auth_generation {
                    debug!(generation, "dropping superseded auth result");
                    return;
                }
                self.finish_auth(generation, outcome);
            }
            Completion::Sessions {
                seq,
                kind,
                page,
                result,
            } => {
                if self.is_stale(Slot::Sessions, seq) {
                    return;
                }
                self.state.apply_session_page(kind, page, result);
            }
            Completion::Stats { seq, result } => {
                if self.is_stale(Slot::Stats, seq) {
                    return;
                }
                self.state.apply_stats(result);
            }
            Completion::CurrentSession { seq, result } => {
                if self.is_stale(Slot::CurrentSession, seq) {
                    return;
                }
                self.state.apply_current_session(result);
            }
            Completion::ClockIn(result) => {
                self.state.clocking_in = false;
                self.finish_clock(result, actions::CLOCK_IN_SUCCESS, actions::CLOCK_IN_FAILURE);
            }
            Completion::ClockOut(result) => {
                self.state.clocking_out = false;
                self.finish_clock(result, actions::CLOCK_OUT_SUCCESS, actions::CLOCK_OUT_FAILURE);
            }
            Completion::Deleted(result) => match result {
                Ok(_) => {
                    self.notify(Notice::success(actions::DELETE_SUCCESS));
                    self.fetch_sessions(self.state.pagination.page);
                }
                Err(err) => {
                    error!("delete session error: {err}");
                    self.notify(Notice::error(actions::DELETE_FAILURE));
                }
            },
            Completion::Exported(result) => {
                self.state.exporting = false;
                match result {
                    Ok(file) => self.emit(Event::ExportReady(file)),
                    Err(err) => {
                        error!("export error: {err}");
                        self.notify(Notice::error(actions::EXPORT_FAILURE));
                    }
                }
            }
            Completion::RedirectDue { generation } => {
                if generation == self.auth_generation
                    && matches!(self.state.auth, AuthState::Required(_))
                {
                    self.emit(Event::RedirectToLogin);
                }
            }
        }
    }

    fn is_stale(&self, slot: Slot, seq: u64) -> bool {
        let stale = !self.sequencer.is_latest(slot, seq);
        if stale {
            debug!(?slot, seq, "dropping stale response");
        }
        stale
    }

    fn finish_auth(&mut self, generation: u64, outcome: AuthOutcome) {
        match outcome {
            AuthOutcome::Authenticated { context, principal } => {
                self.state.authenticated(context.kind, principal);
                self.context = Some(context);
                self.refresh_all();
            }
            AuthOutcome::Required {
                failure,
                redirect_after,
            } => {
                self.state.require_auth(failure);
                let completions = self.completions.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(redirect_after).await;
                    let _ = completions.send(Completion::RedirectDue { generation });
                });
            }
        }
    }

    fn finish_clock(
        &mut self,
        result: Result<ActionReceipt, ClientError>,
        success: &str,
        failure: &str,
    ) {
        match result {
            Ok(_) => {
                self.notify(Notice::success(success));
                self.fetch_current_session();
                self.fetch_sessions(self.state.pagination.page);
            }
            Err(err) => {
                error!("{failure}: {err}");
                self.notify(Notice::error(err.user_message(failure)));
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
