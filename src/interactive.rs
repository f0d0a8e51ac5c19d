//! Line-oriented interactive session.
//!
//! Reads commands from stdin and applies them to the dashboard, re-rendering
//! after every command that changes what is displayed.

use crate::dashboard::{self, Dashboard};
use crate::models::SearchField;
use crate::report::ViewTarget;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP: &str = "\
Commands:
  field <name>            set the search field (all, id, sector, region, country, topics, pest, source)
  term <text>             set the search term (empty clears it)
  search                  submit the current search
  search <field> <text>   set both and submit
  toggle <key>            expand or collapse a row by id, #position or \"string id\"
  ping                    check that the backend is alive
  show                    render the dashboard again
  help                    show this message
  quit                    leave the session";

/// A parsed session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Field(SearchField),
    Term(String),
    Search(Option<(SearchField, String)>),
    Toggle(String),
    Ping,
    Show,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_lowercase().as_str() {
            "field" => {
                if rest.is_empty() {
                    return Err("Usage: field <name>".to_string());
                }
                Command::Field(rest.parse()?)
            }
            "term" => Command::Term(rest.to_string()),
            "search" if rest.is_empty() => Command::Search(None),
            "search" => {
                let (field, term) = match rest.split_once(char::is_whitespace) {
                    Some((field, term)) => (field, term.trim()),
                    None => (rest, ""),
                };
                Command::Search(Some((field.parse()?, term.to_string())))
            }
            "toggle" => {
                if rest.is_empty() {
                    return Err("Usage: toggle <key>".to_string());
                }
                Command::Toggle(rest.to_string())
            }
            "ping" => Command::Ping,
            "show" => Command::Show,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command '{}'", other)),
        };

        Ok(Some(command))
    }
}

/// Apply a command. Returns whether the view should be rendered again.
pub async fn apply(dashboard: &mut Dashboard, command: Command) -> bool {
    match command {
        Command::Field(field) => {
            dashboard.state_mut().set_field(field);
            true
        }
        Command::Term(term) => {
            dashboard.state_mut().set_term(term);
            true
        }
        Command::Search(Some((field, term))) => {
            dashboard.state_mut().set_field(field);
            dashboard.state_mut().set_term(term);
            dashboard.submit_search().await;
            true
        }
        Command::Search(None) => {
            dashboard.submit_search().await;
            true
        }
        Command::Toggle(input) => {
            let key = dashboard.state().resolve_row_key(&input);
            debug!("Toggling row {}", key);
            dashboard.state_mut().toggle_expand(key);
            true
        }
        Command::Ping => {
            dashboard::ping(dashboard.client()).await;
            false
        }
        Command::Show => true,
        Command::Help => {
            println!("{}", HELP);
            false
        }
        Command::Quit => false,
    }
}

/// Run the session until `quit` or end of input.
pub async fn run(dashboard: &mut Dashboard, view: &ViewTarget) -> Result<()> {
    println!("Interactive mode. Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Ok(None) => {}
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => {
                if apply(dashboard, command).await {
                    view.emit(dashboard.state())?;
                }
            }
            Err(message) => {
                println!("{}", message);
                println!("{}", HELP);
            }
        }
    }

    Ok(())
}
