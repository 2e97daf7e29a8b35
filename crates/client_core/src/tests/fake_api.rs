use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{Principal, PrincipalKind, SessionFilters, SessionId, SessionRecord, StatsSnapshot},
    error::ApiError,
    protocol::{ProfilePayload, SessionPage},
};

use crate::{credentials::SessionContext, error::ClientError, ActionReceipt, SessionQuery, SessionsApi};

#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Status(u16, Option<&'static str>),
    Rejected(Option<&'static str>),
    Malformed,
}

impl Failure {
    fn into_error(self, endpoint: &str) -> ClientError {
        match self {
            Self::Status(status, message) => ClientError::Api {
                endpoint: endpoint.to_string(),
                source: ApiError::new(status, message.map(str::to_string)),
            },
            Self::Rejected(message) => ClientError::Rejected {
                endpoint: endpoint.to_string(),
                message: message.map(str::to_string),
            },
            Self::Malformed => ClientError::Malformed {
                endpoint: endpoint.to_string(),
                reason: "unexpected payload".to_string(),
            },
        }
    }
}

/// Canned answers for [`FakeApi`]. List pages are consumed front to back;
/// once empty every list call answers with an empty page immediately.
pub(crate) struct Script {
    pub profile: Result<Principal, Failure>,
    pub pages: VecDeque<(Duration, Result<SessionPage, Failure>)>,
    pub stats: Result<StatsSnapshot, Failure>,
    pub current: Option<SessionRecord>,
    pub action_delay: Duration,
    pub clock_failure: Option<Failure>,
    pub delete_failure: Option<Failure>,
    pub export: Result<Vec<u8>, Failure>,
}

pub(crate) fn principal(kind: PrincipalKind) -> Principal {
    ProfilePayload {
        id: Some("65f1c0ffee1234".into()),
        name: Some("Ada Lovelace".into()),
        ..ProfilePayload::default()
    }
    .into_principal(kind)
}

impl Script {
    pub fn for_kind(kind: PrincipalKind) -> Self {
        Self {
            profile: Ok(principal(kind)),
            pages: VecDeque::new(),
            stats: Ok(StatsSnapshot::default()),
            current: None,
            action_delay: Duration::ZERO,
            clock_failure: None,
            delete_failure: None,
            export: Ok(b"xlsx".to_vec()),
        }
    }
}

pub(crate) struct FakeApi {
    pub script: Mutex<Script>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn push_page(&self, delay: Duration, sessions: Vec<SessionRecord>) {
        self.script.lock().unwrap().pages.push_back((
            delay,
            Ok(SessionPage {
                sessions,
                pagination: None,
            }),
        ));
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn action_delay(&self) -> Duration {
        self.script.lock().unwrap().action_delay
    }
}

#[async_trait]
impl SessionsApi for FakeApi {
    async fn fetch_profile(&self, ctx: &SessionContext) -> Result<Principal, ClientError> {
        self.record(format!("profile:{}", ctx.kind));
        self.script
            .lock()
            .unwrap()
            .profile
            .clone()
            .map_err(|f| f.into_error("profile"))
    }

    async fn list_sessions(
        &self,
        _ctx: &SessionContext,
        query: &SessionQuery,
    ) -> Result<SessionPage, ClientError> {
        self.record(format!("list:{}", query.page));
        let next = self.script.lock().unwrap().pages.pop_front();
        match next {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result.map_err(|f| f.into_error("list"))
            }
            None => Ok(SessionPage::default()),
        }
    }

    async fn fetch_stats(&self, _ctx: &SessionContext) -> Result<StatsSnapshot, ClientError> {
        self.record("stats");
        self.script
            .lock()
            .unwrap()
            .stats
            .clone()
            .map_err(|f| f.into_error("stats"))
    }

    async fn current_session(
        &self,
        _ctx: &SessionContext,
    ) -> Result<Option<SessionRecord>, ClientError> {
        self.record("current");
        Ok(self.script.lock().unwrap().current.clone())
    }

    async fn clock_in(&self, _ctx: &SessionContext) -> Result<ActionReceipt, ClientError> {
        self.record("clock_in");
        tokio::time::sleep(self.action_delay()).await;
        match self.script.lock().unwrap().clock_failure {
            Some(failure) => Err(failure.into_error("clock-in")),
            None => Ok(ActionReceipt::default()),
        }
    }

    async fn clock_out(&self, _ctx: &SessionContext) -> Result<ActionReceipt, ClientError> {
        self.record("clock_out");
        tokio::time::sleep(self.action_delay()).await;
        match self.script.lock().unwrap().clock_failure {
            Some(failure) => Err(failure.into_error("clock-out")),
            None => Ok(ActionReceipt::default()),
        }
    }

    async fn delete_session(
        &self,
        _ctx: &SessionContext,
        id: &SessionId,
    ) -> Result<ActionReceipt, ClientError> {
        self.record(format!("delete:{id}"));
        match self.script.lock().unwrap().delete_failure {
            Some(failure) => Err(failure.into_error("delete")),
            None => Ok(ActionReceipt::default()),
        }
    }

    async fn export_sessions(
        &self,
        _ctx: &SessionContext,
        _filters: &SessionFilters,
    ) -> Result<Vec<u8>, ClientError> {
        self.record("export");
        self.script
            .lock()
            .unwrap()
            .export
            .clone()
            .map_err(|f| f.into_error("export"))
    }
}
