//! Terminal chat client.
//!
//! ```text
//! cargo run -p chat-client -- ws://127.0.0.1:3000/session
//! ```
//!
//! Type a line to chat. Commands:
//!
//! - `/name <new name>`: ask the server for a new display name
//! - `/buttons on|off`: change the input state the heartbeat reports
//! - `/quit` (or Ctrl-C): say goodbye and exit
//!
//! Set `RUST_LOG=peerchat_session=debug` to watch the session internals.

use peerchat::prelude::*;
use peerchat::DEFAULT_URL;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// What woke up the main loop.
enum Action {
    Input(std::io::Result<Option<String>>),
    Transport(bool),
    Present(PresenterEvent),
    Interrupt,
}

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Say(&'a str),
    Name(&'a str),
    Buttons(bool),
    Quit,
    Invalid(&'static str),
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line);
    };
    let (cmd, arg) = rest.split_once(' ').unwrap_or((rest, ""));
    let arg = arg.trim();
    match cmd {
        "quit" | "exit" => Command::Quit,
        "name" if !arg.is_empty() => Command::Name(arg),
        "name" => Command::Invalid("usage: /name <new name>"),
        "buttons" => match arg {
            "on" => Command::Buttons(true),
            "off" => Command::Buttons(false),
            _ => Command::Invalid("usage: /buttons on|off"),
        },
        _ => Command::Invalid("unknown command"),
    }
}

/// Prints presenter notifications as plain text lines.
///
/// The session reports into an mpsc channel; the main loop replays each
/// event onto this with [`PresenterEvent::apply_to`].
struct Terminal<W> {
    out: W,
}

impl<W: Write> Terminal<W> {
    fn line(&mut self, text: std::fmt::Arguments<'_>) {
        if let Err(e) = writeln!(self.out, "{text}") {
            tracing::warn!(error = %e, "terminal write failed");
        }
    }
}

impl<W: Write> Presenter for Terminal<W> {
    fn connection_state(&mut self, state: ConnectionState) {
        self.line(format_args!("* {state}"));
    }

    fn username(&mut self, name: &str) {
        self.line(format_args!("* you are {name}"));
    }

    fn roster(&mut self, names: &[String]) {
        self.line(format_args!("* online: {}", names.join(", ")));
    }

    fn log_line(&mut self, line: &str) {
        self.line(format_args!("{line}"));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    eprintln!("connecting to {url}");

    let (presenter, mut presented) = mpsc::unbounded_channel();
    let mut client = PeerchatClientBuilder::new()
        .url(url)
        .connect(presenter)
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut terminal = Terminal {
        out: std::io::stdout(),
    };

    loop {
        let action = tokio::select! {
            line = lines.next_line() => Action::Input(line),
            alive = client.process_next_event() => Action::Transport(alive),
            Some(event) = presented.recv() => Action::Present(event),
            _ = tokio::signal::ctrl_c() => Action::Interrupt,
        };

        match action {
            Action::Present(event) => event.apply_to(&mut terminal),
            Action::Transport(alive) => {
                if !alive || client.state().is_closed() {
                    break;
                }
            }
            Action::Interrupt | Action::Input(Ok(None)) => break,
            Action::Input(Err(e)) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
            Action::Input(Ok(Some(line))) => {
                let result = match parse_command(&line) {
                    Command::Say("") => Ok(()),
                    Command::Say(text) => client.send_message(text),
                    Command::Name(name) => client.send_name_change(name),
                    Command::Buttons(pressed) => {
                        client.set_buttons(pressed);
                        Ok(())
                    }
                    Command::Quit => break,
                    Command::Invalid(usage) => {
                        eprintln!("{usage}");
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    eprintln!("! {e}");
                }
            }
        }
    }

    client.shutdown().await;
    while let Ok(event) = presented.try_recv() {
        event.apply_to(&mut terminal);
    }
    Ok(())
}
