//! Entry points for both run modes: the chat TUI and `play`.

use std::{
    collections::VecDeque,
    error::Error,
    fs, io,
    path::Path,
    sync::Arc,
    time::Duration,
};

use clap::ArgMatches;
use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use dotenv::dotenv;
use hubbub_lib::chat::protocol::{self, ClientMessage, ServerMessage};
use hubbub_lib::chat::roster::Roster;
use hubbub_lib::mixer::Mixer;
use log::info;
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::client::{self, Connection, NetEvent};
use crate::commands::{self, Command};
use crate::config::{self, Config};
use crate::controls::{self, Action, ChatState};
use crate::logging::{self, LogBuffer};
use crate::ui::{self, ChatLine};

const MESSAGE_CAPACITY: usize = 500;

pub fn run(args: &ArgMatches) -> Result<i32, Box<dyn Error>> {
    dotenv().ok();
    let level = logging::level_from(args.get_one::<String>("log-level").map(String::as_str));

    if let Some(("play", play_args)) = args.subcommand() {
        // No TUI in play mode, so records can go straight to stderr.
        logging::init(level, true);
        return run_play(play_args);
    }

    let log_buffer = logging::init(level, false);
    run_chat(args, log_buffer)
}

/// Queue the given WAV files and block until the mixer drains.
fn run_play(args: &ArgMatches) -> Result<i32, Box<dyn Error>> {
    let mixer = Mixer::new();

    let mut queued = 0usize;
    for path in args.get_many::<String>("FILE").into_iter().flatten() {
        let bytes =
            fs::read(path).map_err(|err| format!("could not read {}: {}", path, err))?;
        let owner = Path::new(path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("local");
        mixer
            .submit(owner, &bytes)
            .map_err(|err| format!("{}: {}", path, err))?;
        queued += 1;
    }
    info!("queued {} clip(s)", queued);

    while !mixer.wait_idle(Duration::from_millis(500)) {}
    mixer.shutdown();
    Ok(0)
}

fn run_chat(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32, Box<dyn Error>> {
    let config = config::resolve(args)?;

    let mixer = Arc::new(Mixer::new());
    mixer.set_volume(config.volume)?;

    info!("joining {}", client::endpoint_url(&config));
    let connection = Connection::open(&config, Arc::clone(&mixer))?;

    let _raw_mode = RawModeGuard::enable().ok();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, EnterAlternateScreen, cursor::Hide);
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let _stderr_capture = logging::redirect_stderr(Arc::clone(&log_buffer));

    let mut state = ChatState::new();
    let mut roster = Roster::new();
    let mut lines: VecDeque<ChatLine> = VecDeque::new();
    let mut connected = true;

    // UI / input loop.
    loop {
        while let Some(event) = connection.poll_event() {
            apply_event(event, &mut roster, &mut lines, &mixer, &mut connected);
        }
        state.clamp_scroll(lines.len());

        let view = ui::View {
            lines: &lines,
            roster: roster.rows(),
            input: &state.input,
            status: status_line(&config, connected, &mixer),
            log_lines: state
                .show_log
                .then(|| logging::snapshot(&log_buffer)),
            scroll: state.scroll,
        };
        ui::draw(&mut terminal, &view);

        match controls::poll_key(&mut state) {
            Action::Quit => break,
            Action::Submit(line) => {
                if !handle_line(&line, &config, &connection, &mixer, &roster, &mut lines) {
                    break;
                }
            }
            Action::None => {}
        }
    }

    mixer.shutdown();
    drop(connection);

    // Restore the terminal state before exiting.
    let _ = terminal.show_cursor();
    let stdout = terminal.backend_mut();
    let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);

    Ok(0)
}

fn status_line(config: &Config, connected: bool, mixer: &Mixer) -> String {
    let state = if connected { "connected" } else { "disconnected" };
    format!(
        "{}:{}/{} | {} | device: {} | volume: {}%",
        config.server,
        config.port,
        config.channel,
        state,
        mixer.device_phase(),
        mixer.volume()
    )
}

fn apply_event(
    event: NetEvent,
    roster: &mut Roster,
    lines: &mut VecDeque<ChatLine>,
    mixer: &Mixer,
    connected: &mut bool,
) {
    match event {
        NetEvent::Message(ServerMessage::Userlist { users }) => {
            roster.replace_all(users);
            push_info(lines, format!("{} user(s) in the channel", roster.len()));
        }
        NetEvent::Message(ServerMessage::Connect { userid, params }) => {
            roster.add(userid.clone(), params);
            if let Some(name) = roster.display_name(&userid) {
                push_info(lines, format!("{} joined", name));
            }
        }
        NetEvent::Message(ServerMessage::Disconnect { userid }) => {
            if let Some(name) = roster.display_name(&userid) {
                push_info(lines, format!("{} left", name));
            }
            // Whatever they queued should not keep playing behind them.
            mixer.cancel(&userid);
            roster.remove(&userid);
        }
        NetEvent::Message(ServerMessage::Chat { userid, msg }) => {
            let name = roster
                .display_name(&userid)
                .unwrap_or_else(|| userid.clone());
            let color = roster.color(&userid);
            push_chat(lines, name, color, protocol::unescape_text(&msg));
        }
        NetEvent::Closed(reason) => {
            *connected = false;
            push_info(lines, format!("connection closed: {}", reason));
        }
    }
}

/// Dispatch one submitted input line. Returns `false` on `/quit`.
fn handle_line(
    line: &str,
    config: &Config,
    connection: &Connection,
    mixer: &Mixer,
    roster: &Roster,
    lines: &mut VecDeque<ChatLine>,
) -> bool {
    let command = match commands::parse(line) {
        Ok(command) => command,
        Err(reason) => {
            push_info(lines, reason);
            return true;
        }
    };

    if let Some(message) = wire_message(&command, &config.lang) {
        connection.send(message);
        return true;
    }

    match command {
        Command::Volume(percent) => match mixer.set_volume(percent) {
            Ok(()) => push_info(lines, format!("volume set to {}%", percent)),
            Err(err) => push_info(lines, err.to_string()),
        },
        Command::Shut { name, order } => match roster.resolve(&name, order) {
            Some(owner) => {
                mixer.cancel(owner);
                push_info(lines, format!("dropped pending audio from {}", name));
            }
            None => push_info(lines, format!("no user named {}", name)),
        },
        Command::Quit => return false,
        Command::Help => {
            push_info(
                lines,
                "commands: /attack <name> [order], /volume <0-100>, /shut <name> [order], /quit"
                    .to_string(),
            );
            push_info(
                lines,
                "keys: Enter sends, Up/Down scroll, Tab toggles logs, Esc quits".to_string(),
            );
        }
        Command::Say(_) | Command::Attack { .. } => {}
    }

    true
}

/// Wire message for a command, `None` for the ones handled locally.
fn wire_message(command: &Command, lang: &str) -> Option<ClientMessage> {
    match command {
        Command::Say(text) => Some(ClientMessage::Msg {
            msg: text.clone(),
            lang: lang.to_string(),
        }),
        Command::Attack { target, order } => Some(ClientMessage::Attack {
            target: target.clone(),
            order: *order,
        }),
        _ => None,
    }
}

fn push_info(lines: &mut VecDeque<ChatLine>, text: String) {
    push(lines, ChatLine { author: None, text });
}

fn push_chat(lines: &mut VecDeque<ChatLine>, name: String, color: (u8, u8, u8), text: String) {
    push(
        lines,
        ChatLine {
            author: Some((name, color)),
            text,
        },
    );
}

fn push(lines: &mut VecDeque<ChatLine>, line: ChatLine) {
    if lines.len() >= MESSAGE_CAPACITY {
        lines.pop_front();
    }
    lines.push_back(line);
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
