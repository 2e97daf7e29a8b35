mod interactive;
mod render;
mod session;

use std::{io::Write as _, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use client_core::{
    credentials::default_credentials_path, load_settings, AuthOutcome, AuthResolver, ClientSettings,
    Command, CredentialStore, DashboardView, Event, FileCredentialStore, HttpSessionsApi,
    StoredCredentials,
};
use shared::domain::{ActiveView, FilterEdit, SessionId, SessionTab, StatusFilter};
use tracing_subscriber::EnvFilter;

use crate::{
    render::render,
    session::{export_dir, print_notice, save_export, DashboardSession},
};

#[derive(Parser, Debug)]
#[command(name = "session-desk", about = "Work session attendance dashboard")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Overrides where tokens are stored.
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Stores tokens and verifies them against the profile endpoint.
    #[command(group(ArgGroup::new("token").required(true).multiple(true)))]
    Login {
        #[arg(long, group = "token")]
        admin_token: Option<String>,
        #[arg(long, group = "token")]
        employee_token: Option<String>,
        #[arg(long, group = "token")]
        user_token: Option<String>,
    },
    Logout,
    /// Prints the dashboard once.
    Show(ShowArgs),
    ClockIn,
    ClockOut,
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Interactive {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ShowArgs {
    #[arg(long)]
    tab: Option<SessionTab>,
    #[arg(long)]
    view: Option<ActiveView>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    status: Option<StatusFilter>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    page: Option<u32>,
    /// Opens the details view for one session.
    #[arg(long)]
    details: Option<String>,
}

impl ShowArgs {
    fn filter_edits(&self) -> Vec<FilterEdit> {
        let mut edits = Vec::new();
        if let Some(search) = &self.search {
            edits.push(FilterEdit::Search(search.clone()));
        }
        if let Some(status) = self.status {
            edits.push(FilterEdit::Status(status));
        }
        if self.from.is_some() {
            edits.push(FilterEdit::StartDate(self.from));
        }
        if self.to.is_some() {
            edits.push(FilterEdit::EndDate(self.to));
        }
        if let Some(user) = &self.user {
            edits.push(FilterEdit::UserId(user.clone()));
        }
        edits
    }
}

fn credential_store(cli: &Cli, settings: &ClientSettings) -> Result<Arc<FileCredentialStore>> {
    let path = cli
        .credentials
        .clone()
        .or_else(|| settings.credentials_path.clone())
        .or_else(default_credentials_path)
        .context("no local data directory for credentials; pass --credentials")?;
    Ok(Arc::new(FileCredentialStore::new(path)))
}

fn print_state(session: &DashboardSession) {
    if let Some(state) = session.state() {
        print!("{}", render(&DashboardView::from_state(state)));
    }
}

/// Starts the controller and waits until the first round of fetches is in.
/// Fails when no usable credentials are stored.
async fn open_dashboard(
    settings: &ClientSettings,
    store: Arc<dyn CredentialStore>,
) -> Result<DashboardSession> {
    let mut session = DashboardSession::start(settings, store)?;
    session.settle().await?;
    let authenticated = session
        .state()
        .is_some_and(|state| state.principal.is_some());
    if !authenticated {
        print_state(&session);
        session.shutdown().await?;
        bail!("authentication required");
    }
    Ok(session)
}

fn report(events: &[Event]) {
    for event in events {
        if let Event::Notice(notice) = event {
            print_notice(notice);
        }
    }
}

async fn login(
    settings: &ClientSettings,
    store: &FileCredentialStore,
    credentials: StoredCredentials,
) -> Result<()> {
    store.store(&credentials).context("failed to save credentials")?;
    let api = HttpSessionsApi::from_settings(settings)?;
    match AuthResolver::new(store, &api, settings.login_redirect_delay)
        .resolve()
        .await
    {
        AuthOutcome::Authenticated { context, principal } => {
            println!(
                "Signed in to the {} as {} ({})",
                context.kind.portal_label(),
                principal.name,
                principal.role
            );
            Ok(())
        }
        AuthOutcome::Required { failure, .. } => bail!("login failed: {failure}"),
    }
}

async fn show(mut session: DashboardSession, args: ShowArgs) -> Result<()> {
    let mut commands: Vec<Command> = args
        .filter_edits()
        .into_iter()
        .map(Command::EditFilter)
        .collect();
    commands.extend(args.page.map(Command::GoToPage));
    commands.extend(args.view.map(Command::SetView));
    commands.extend(args.tab.map(Command::SelectTab));
    commands.extend(args.details.map(|id| Command::OpenDetails(SessionId(id))));

    report(&session.apply(commands).await?);
    print_state(&session);
    session.shutdown().await
}

async fn single_action(mut session: DashboardSession, command: Command) -> Result<()> {
    session.send(command).await?;
    let events = session.settle().await?;
    report(&events);
    let failed = events.iter().any(|event| {
        matches!(event, Event::Notice(notice) if notice.level == client_core::NoticeLevel::Error)
    });
    print_state(&session);
    session.shutdown().await?;
    if failed {
        bail!("action failed");
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

async fn delete(mut session: DashboardSession, id: String, yes: bool) -> Result<()> {
    let id = SessionId(id);
    session.send(Command::RequestDelete(id.clone())).await?;
    let events = session.settle().await?;
    report(&events);
    let asked = events
        .iter()
        .any(|event| matches!(event, Event::ConfirmDelete(asked) if *asked == id));
    if !asked {
        session.shutdown().await?;
        bail!("delete not available");
    }

    let confirmed = yes || confirm(&format!("Are you sure you want to delete session {id}?"))?;
    single_action(session, Command::ConfirmDelete(confirmed)).await
}

async fn export(mut session: DashboardSession, dir: PathBuf) -> Result<()> {
    session.send(Command::Export).await?;
    let events = session.settle().await?;
    report(&events);
    let mut saved = false;
    for event in &events {
        if let Event::ExportReady(file) = event {
            let path = save_export(&dir, file).await?;
            println!("Exported to {}", path.display());
            saved = true;
        }
    }
    session.shutdown().await?;
    if !saved {
        bail!("export failed");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = &cli.api_url {
        settings.api_base_url = url.clone();
    }
    let store = credential_store(&cli, &settings)?;

    match cli.command {
        CliCommand::Login {
            admin_token,
            employee_token,
            user_token,
        } => {
            let credentials = StoredCredentials {
                admin_token,
                employee_token,
                user_token,
                user_data: None,
            };
            login(&settings, &store, credentials).await
        }
        CliCommand::Logout => {
            store.clear().context("failed to clear credentials")?;
            println!("Signed out.");
            Ok(())
        }
        CliCommand::Show(args) => show(open_dashboard(&settings, store).await?, args).await,
        CliCommand::ClockIn => {
            single_action(open_dashboard(&settings, store).await?, Command::ClockIn).await
        }
        CliCommand::ClockOut => {
            single_action(open_dashboard(&settings, store).await?, Command::ClockOut).await
        }
        CliCommand::Delete { id, yes } => {
            delete(open_dashboard(&settings, store).await?, id, yes).await
        }
        CliCommand::Export { out } => {
            let dir = export_dir(out, &settings);
            export(open_dashboard(&settings, store).await?, dir).await
        }
        CliCommand::Interactive { out } => {
            let dir = export_dir(out, &settings);
            let mut session = open_dashboard(&settings, store).await?;
            print_state(&session);
            interactive::run(&mut session, &dir).await?;
            session.shutdown().await
        }
    }
}
