use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use shared::{
    domain::{Principal, PrincipalKind, SessionFilters, SessionId, SessionRecord, StatsSnapshot},
    error::{extract_message, ApiError},
    protocol::{
        AdminStatsPayload, ApiOutcome, EmployeeStatsPayload, Envelope, EnvelopeShape,
        PaginationPayload, SessionPage,
    },
};
use tracing::{debug, warn};

pub mod actions;
pub mod auth;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod dashboard;
pub mod debounce;
pub mod endpoints;
pub mod error;
pub mod view;

pub use auth::{AuthFailure, AuthOutcome, AuthResolver};
pub use config::{load_settings, load_settings_from, ClientSettings};
pub use controller::{
    spawn_dashboard, Command, ControllerSettings, DashboardHandle, Event, Notice, NoticeLevel,
};
pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionContext, StoredCredentials,
};
pub use dashboard::DashboardState;
pub use endpoints::Endpoints;
pub use error::ClientError;
pub use view::DashboardView;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionQuery {
    pub page: u32,
    pub limit: u32,
    pub filters: SessionFilters,
}

impl SessionQuery {
    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        pairs.extend(self.filters.list_query());
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionReceipt {
    pub message: Option<String>,
}

/// The remote sessions API as the dashboard sees it. Every call carries the
/// explicit [`SessionContext`]; nothing reads ambient credentials.
#[async_trait]
pub trait SessionsApi: Send + Sync {
    async fn fetch_profile(&self, ctx: &SessionContext) -> Result<Principal, ClientError>;
    async fn list_sessions(
        &self,
        ctx: &SessionContext,
        query: &SessionQuery,
    ) -> Result<SessionPage, ClientError>;
    async fn fetch_stats(&self, ctx: &SessionContext) -> Result<StatsSnapshot, ClientError>;
    /// `None` means "not clocked in". Admins have no current session.
    async fn current_session(
        &self,
        ctx: &SessionContext,
    ) -> Result<Option<SessionRecord>, ClientError>;
    async fn clock_in(&self, ctx: &SessionContext) -> Result<ActionReceipt, ClientError>;
    async fn clock_out(&self, ctx: &SessionContext) -> Result<ActionReceipt, ClientError>;
    async fn delete_session(
        &self,
        ctx: &SessionContext,
        id: &SessionId,
    ) -> Result<ActionReceipt, ClientError>;
    async fn export_sessions(
        &self,
        ctx: &SessionContext,
        filters: &SessionFilters,
    ) -> Result<Vec<u8>, ClientError>;
}

struct Accepted<T> {
    data: T,
    pagination: Option<PaginationPayload>,
    message: Option<String>,
}

fn accept<T>(endpoint: &str, outcome: ApiOutcome<T>) -> Result<Accepted<T>, ClientError> {
    match outcome {
        ApiOutcome::Success {
            data,
            pagination,
            message,
            ..
        } => Ok(Accepted {
            data,
            pagination,
            message,
        }),
        ApiOutcome::Rejected { message } => Err(ClientError::Rejected {
            endpoint: endpoint.to_string(),
            message,
        }),
        ApiOutcome::Malformed { reason } => Err(ClientError::Malformed {
            endpoint: endpoint.to_string(),
            reason,
        }),
    }
}

pub struct HttpSessionsApi {
    http: Client,
    base_url: String,
}

impl HttpSessionsApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                endpoint: "client builder".to_string(),
                source,
            })?;
        Self::with_client(http, &settings.api_base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base_url: config::normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, ctx: &SessionContext) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(ctx.token())
    }

    async fn send(&self, request: RequestBuilder, endpoint: &str) -> Result<Response, ClientError> {
        debug!(endpoint, "sessions api request");
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        warn!(endpoint, status = status.as_u16(), "sessions api returned error status");
        Err(ClientError::Api {
            endpoint: endpoint.to_string(),
            source: ApiError::from_response(status.as_u16(), &body),
        })
    }

    async fn envelope(
        &self,
        request: RequestBuilder,
        endpoint: &str,
    ) -> Result<Envelope, ClientError> {
        let bytes = self
            .send(request, endpoint)
            .await?
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Envelope::parse(Value::Null));
        }
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| ClientError::Malformed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Envelope::parse(body))
    }

    async fn write(
        &self,
        method: Method,
        path: &str,
        ctx: &SessionContext,
    ) -> Result<ActionReceipt, ClientError> {
        let envelope = self
            .envelope(self.request(method, path, ctx), path)
            .await?;
        // Writes only count when the server says so explicitly.
        if let Envelope::Success {
            shape: EnvelopeShape::Raw,
            data,
            ..
        } = &envelope
        {
            warn!(endpoint = path, "write response carried no success marker");
            return Err(ClientError::Rejected {
                endpoint: path.to_string(),
                message: extract_message(data),
            });
        }
        let accepted = accept(path, envelope.decode::<Value>())?;
        Ok(ActionReceipt {
            message: accepted.message,
        })
    }
}

#[async_trait]
impl SessionsApi for HttpSessionsApi {
    async fn fetch_profile(&self, ctx: &SessionContext) -> Result<Principal, ClientError> {
        let path = Endpoints::for_kind(ctx.kind).profile;
        let envelope = self
            .envelope(self.request(Method::GET, path, ctx), path)
            .await?;
        Ok(accept(path, envelope.decode_profile(ctx.kind))?.data)
    }

    async fn list_sessions(
        &self,
        ctx: &SessionContext,
        query: &SessionQuery,
    ) -> Result<SessionPage, ClientError> {
        let path = Endpoints::for_kind(ctx.kind).sessions;
        let mut request = self.request(Method::GET, path, ctx);
        if ctx.kind == PrincipalKind::Admin {
            request = request.query(&query.to_pairs());
        }
        let envelope = self.envelope(request, path).await?;
        let accepted = accept(path, envelope.decode_list::<SessionRecord>())?;
        Ok(SessionPage {
            sessions: accepted.data,
            pagination: accepted.pagination,
        })
    }

    async fn fetch_stats(&self, ctx: &SessionContext) -> Result<StatsSnapshot, ClientError> {
        let path = Endpoints::for_kind(ctx.kind).stats;
        let envelope = self
            .envelope(self.request(Method::GET, path, ctx), path)
            .await?;
        let snapshot = match ctx.kind {
            PrincipalKind::Admin => accept(path, envelope.decode::<Option<AdminStatsPayload>>())?
                .data
                .unwrap_or_default()
                .into_snapshot(),
            PrincipalKind::Employee => {
                accept(path, envelope.decode::<Option<EmployeeStatsPayload>>())?
                    .data
                    .unwrap_or_default()
                    .into_snapshot()
            }
        };
        Ok(snapshot)
    }

    async fn current_session(
        &self,
        ctx: &SessionContext,
    ) -> Result<Option<SessionRecord>, ClientError> {
        let Some(path) = Endpoints::for_kind(ctx.kind).current_session else {
            return Ok(None);
        };
        let envelope = self
            .envelope(self.request(Method::GET, path, ctx), path)
            .await?;
        Ok(accept(path, envelope.decode::<Option<SessionRecord>>())?.data)
    }

    async fn clock_in(&self, ctx: &SessionContext) -> Result<ActionReceipt, ClientError> {
        self.write(Method::POST, endpoints::CLOCK_IN, ctx).await
    }

    async fn clock_out(&self, ctx: &SessionContext) -> Result<ActionReceipt, ClientError> {
        self.write(Method::POST, endpoints::CLOCK_OUT, ctx).await
    }

    async fn delete_session(
        &self,
        ctx: &SessionContext,
        id: &SessionId,
    ) -> Result<ActionReceipt, ClientError> {
        self.write(Method::DELETE, &endpoints::delete_session(id), ctx)
            .await
    }

    async fn export_sessions(
        &self,
        ctx: &SessionContext,
        filters: &SessionFilters,
    ) -> Result<Vec<u8>, ClientError> {
        let path = Endpoints::for_kind(ctx.kind).export;
        let request = self
            .request(Method::GET, path, ctx)
            .query(&filters.export_query());
        let bytes = self
            .send(request, path)
            .await?
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: path.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/fake_api.rs"]
mod fake_api;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
