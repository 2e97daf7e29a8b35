use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use client_core::{Command, DashboardView, Event};
use shared::domain::{FilterEdit, SessionId};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    render::render,
    session::{print_notice, save_export, DashboardSession},
};

const HELP: &str = "\
commands:
  tab <all|my-sessions|active|completed>   view <sessions|analytics|users|settings>
  search [text]   status <any|active|completed|clocked-in|clocked-out>
  from <YYYY-MM-DD|->   to <YYYY-MM-DD|->   user <id|->   clear
  page <n>   next   prev   refresh
  clock-in   clock-out   delete <id>   export
  details <id>   close   retry   logout   help   quit";

#[derive(Debug, PartialEq, Eq)]
pub enum LineCommand {
    Dispatch(Command),
    Help,
    Quit,
}

fn date_arg(arg: &str) -> Result<Option<NaiveDate>, String> {
    match arg {
        "" | "-" => Ok(None),
        raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| format!("invalid date '{raw}': {e}")),
    }
}

fn blank_or(arg: &str) -> String {
    if arg == "-" {
        String::new()
    } else {
        arg.to_string()
    }
}

fn required<'a>(arg: &'a str, what: &str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!("missing {what}"))
    } else {
        Ok(arg)
    }
}

pub fn parse_line(line: &str) -> Result<LineCommand, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match word.to_ascii_lowercase().as_str() {
        "" | "help" | "?" => return Ok(LineCommand::Help),
        "quit" | "exit" | "q" => return Ok(LineCommand::Quit),
        "tab" => Command::SelectTab(required(rest, "tab")?.parse()?),
        "view" => Command::SetView(required(rest, "view")?.parse()?),
        "search" => Command::EditFilter(FilterEdit::Search(rest.to_string())),
        "status" => Command::EditFilter(FilterEdit::Status(rest.parse()?)),
        "from" => Command::EditFilter(FilterEdit::StartDate(date_arg(rest)?)),
        "to" => Command::EditFilter(FilterEdit::EndDate(date_arg(rest)?)),
        "user" => Command::EditFilter(FilterEdit::UserId(blank_or(rest))),
        "clear" => Command::ClearFilters,
        "page" => {
            let page = required(rest, "page number")?
                .parse::<u32>()
                .map_err(|e| format!("invalid page '{rest}': {e}"))?;
            Command::GoToPage(page)
        }
        "next" => Command::NextPage,
        "prev" => Command::PrevPage,
        "refresh" => Command::Refresh,
        "clock-in" => Command::ClockIn,
        "clock-out" => Command::ClockOut,
        "delete" => Command::RequestDelete(SessionId::from(required(rest, "session id")?)),
        "export" => Command::Export,
        "details" => Command::OpenDetails(SessionId::from(required(rest, "session id")?)),
        "close" => Command::CloseDetails,
        "retry" => Command::RetryAuth,
        "logout" => Command::Logout,
        other => return Err(format!("unknown command '{other}', try 'help'")),
    };
    Ok(LineCommand::Dispatch(command))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Tracks whether the screen is behind the controller. Any command sent marks
/// it stale; the next `Settled` redraws once.
#[derive(Debug)]
struct Redraw {
    dirty: bool,
}

impl Redraw {
    fn new() -> Self {
        Self { dirty: true }
    }

    async fn dispatch(&mut self, session: &DashboardSession, command: Command) -> Result<()> {
        session.send(command).await?;
        self.dirty = true;
        Ok(())
    }

    fn take_on_settled(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

pub async fn run(session: &mut DashboardSession, export_dir: &Path) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = Redraw::new();
    println!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(LineCommand::Quit) => break,
                    Ok(LineCommand::Help) => println!("{HELP}"),
                    Ok(LineCommand::Dispatch(command)) => redraw.dispatch(session, command).await?,
                    Err(message) => eprintln!("{message}"),
                }
            }
            event = session.next_event() => {
                let Some(event) = event else { break };
                match event {
                    Event::State(_) => {}
                    Event::Settled => {
                        if redraw.take_on_settled() {
                            if let Some(state) = session.state() {
                                print!("{}", render(&DashboardView::from_state(state)));
                            }
                        }
                    }
                    Event::Notice(notice) => print_notice(&notice),
                    Event::ConfirmDelete(id) => {
                        println!("Are you sure you want to delete session {id}? [y/N]");
                        let answer = lines.next_line().await?.unwrap_or_default();
                        redraw
                            .dispatch(session, Command::ConfirmDelete(is_yes(&answer)))
                            .await?;
                    }
                    Event::ExportReady(file) => match save_export(export_dir, &file).await {
                        Ok(path) => println!("Exported to {}", path.display()),
                        Err(err) => eprintln!("[error] {err:#}"),
                    },
                    Event::RedirectToLogin => {
                        println!("Signed out. Run `session-desk login` to continue.");
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}
