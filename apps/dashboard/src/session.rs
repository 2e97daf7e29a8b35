//! Thin driver over the dashboard controller for one-shot and interactive use.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use client_core::{
    actions::ExportFile, spawn_dashboard, ClientSettings, Command, ControllerSettings,
    CredentialStore, DashboardHandle, DashboardState, Event, HttpSessionsApi, Notice, NoticeLevel,
    SessionsApi,
};
use tracing::{debug, info};

pub struct DashboardSession {
    handle: DashboardHandle,
    state: Option<DashboardState>,
}

impl DashboardSession {
    pub fn start(settings: &ClientSettings, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let api = HttpSessionsApi::from_settings(settings).context("invalid API settings")?;
        debug!(base_url = api.base_url(), "starting dashboard controller");
        Ok(Self::with_api(
            Arc::new(api),
            store,
            ControllerSettings::from(settings),
        ))
    }

    pub fn with_api(
        api: Arc<dyn SessionsApi>,
        store: Arc<dyn CredentialStore>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            handle: spawn_dashboard(api, store, settings),
            state: None,
        }
    }

    pub fn state(&self) -> Option<&DashboardState> {
        self.state.as_ref()
    }

    pub async fn send(&self, command: Command) -> Result<()> {
        self.handle
            .commands
            .send(command)
            .await
            .map_err(|_| anyhow!("dashboard controller stopped"))
    }

    /// Next controller event; published states are remembered. `None` once
    /// the controller is gone.
    pub async fn next_event(&mut self) -> Option<Event> {
        let event = self.handle.events.recv().await?;
        if let Event::State(state) = &event {
            self.state = Some(state.as_ref().clone());
        }
        Some(event)
    }

    /// Waits for the controller to go idle and returns every non-state event
    /// seen on the way.
    pub async fn settle(&mut self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        loop {
            match self.next_event().await {
                Some(Event::Settled) => return Ok(events),
                Some(Event::State(_)) => {}
                Some(other) => events.push(other),
                None => return Err(anyhow!("dashboard controller stopped")),
            }
        }
    }

    /// Sends the commands one at a time, settling after each. Every command
    /// ends in its own `Settled`, so batching them would stop early.
    pub async fn apply(&mut self, commands: Vec<Command>) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for command in commands {
            self.send(command).await?;
            events.extend(self.settle().await?);
        }
        Ok(events)
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.handle.commands.send(Command::Shutdown).await;
        self.handle
            .task
            .await
            .context("dashboard controller panicked")
    }
}

pub fn print_notice(notice: &Notice) {
    match notice.level {
        NoticeLevel::Success => println!("[ok] {}", notice.message),
        NoticeLevel::Error => eprintln!("[error] {}", notice.message),
    }
}

/// Directory exports land in: explicit flag, then settings, then the user's
/// download folder, then the working directory.
pub fn export_dir(flag: Option<PathBuf>, settings: &ClientSettings) -> PathBuf {
    flag.or_else(|| settings.export_dir.clone())
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub async fn save_export(dir: &Path, file: &ExportFile) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(&file.filename);
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = file.bytes.len(), "export saved");
    Ok(path)
}
