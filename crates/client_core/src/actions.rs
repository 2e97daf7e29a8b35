//! Write actions. Each is one request; callers refetch afterwards.
//!
//! None of these consult local state: clocking in while already clocked in
//! still reaches the server, and it is up to the caller to keep duplicate
//! submissions out.

use chrono::NaiveDate;
use shared::domain::{PrincipalKind, SessionFilters, SessionId};
use tracing::info;

use crate::{
    credentials::SessionContext, error::ClientError, ActionReceipt, SessionsApi,
};

pub const CLOCK_IN_SUCCESS: &str = "Successfully clocked in!";
pub const CLOCK_IN_FAILURE: &str = "Failed to clock in";
pub const CLOCK_OUT_SUCCESS: &str = "Successfully clocked out!";
pub const CLOCK_OUT_FAILURE: &str = "Failed to clock out";
pub const DELETE_SUCCESS: &str = "Session deleted successfully!";
pub const DELETE_FAILURE: &str = "Failed to delete session";
pub const EXPORT_FAILURE: &str = "Failed to export sessions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

fn require(
    ctx: &SessionContext,
    kind: PrincipalKind,
    action: &'static str,
) -> Result<(), ClientError> {
    if ctx.kind == kind {
        Ok(())
    } else {
        Err(ClientError::NotPermitted {
            action,
            kind: ctx.kind,
        })
    }
}

pub async fn clock_in(
    api: &dyn SessionsApi,
    ctx: &SessionContext,
) -> Result<ActionReceipt, ClientError> {
    require(ctx, PrincipalKind::Employee, "clock-in")?;
    let receipt = api.clock_in(ctx).await?;
    info!("clocked in");
    Ok(receipt)
}

pub async fn clock_out(
    api: &dyn SessionsApi,
    ctx: &SessionContext,
) -> Result<ActionReceipt, ClientError> {
    require(ctx, PrincipalKind::Employee, "clock-out")?;
    let receipt = api.clock_out(ctx).await?;
    info!("clocked out");
    Ok(receipt)
}

pub async fn delete_session(
    api: &dyn SessionsApi,
    ctx: &SessionContext,
    id: &SessionId,
) -> Result<ActionReceipt, ClientError> {
    require(ctx, PrincipalKind::Admin, "delete session")?;
    let receipt = api.delete_session(ctx, id).await?;
    info!(session_id = %id, "session deleted");
    Ok(receipt)
}

pub async fn export_sessions(
    api: &dyn SessionsApi,
    ctx: &SessionContext,
    filters: &SessionFilters,
    today: NaiveDate,
) -> Result<ExportFile, ClientError> {
    let bytes = api.export_sessions(ctx, filters).await?;
    info!(bytes = bytes.len(), "sessions exported");
    Ok(ExportFile {
        filename: export_filename(today),
        bytes,
    })
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("sessions-export-{}.xlsx", date.format("%Y-%m-%d"))
}
