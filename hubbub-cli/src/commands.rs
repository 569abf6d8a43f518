//! Slash-command parsing for the input line.
//!
//! Anything not starting with `/` is a plain chat message. Orders pick
//! between users sharing a name and are typed 1-based, matching what the
//! roster pane shows.

/// What an input line asks for once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send the line as a chat message.
    Say(String),
    /// Ask the server to attack a user. `order` is 0-based on the wire.
    Attack { target: String, order: u32 },
    /// Change the local playback volume.
    Volume(u8),
    /// Drop the pending audio of one user locally.
    Shut { name: String, order: usize },
    Quit,
    Help,
}

/// Parse one submitted input line. The error is the text to show the
/// user in the message pane.
pub fn parse(line: &str) -> Result<Command, String> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return Ok(Command::Say(trimmed.to_string()));
    }

    let mut words = trimmed.split_whitespace();
    let head = words.next().unwrap_or("/");
    match head {
        "/quit" | "/q" => Ok(Command::Quit),
        "/help" => Ok(Command::Help),
        "/volume" => {
            let value = words
                .next()
                .ok_or_else(|| "usage: /volume <0-100>".to_string())?;
            let percent = value
                .parse::<u8>()
                .map_err(|_| format!("not a volume: {}", value))?;
            Ok(Command::Volume(percent))
        }
        "/attack" => {
            let target = words
                .next()
                .ok_or_else(|| "usage: /attack <name> [order]".to_string())?
                .to_string();
            let order = parse_order(words.next())?;
            Ok(Command::Attack {
                target,
                order: order.saturating_sub(1) as u32,
            })
        }
        "/shut" => {
            let name = words
                .next()
                .ok_or_else(|| "usage: /shut <name> [order]".to_string())?
                .to_string();
            let order = parse_order(words.next())?;
            Ok(Command::Shut { name, order })
        }
        other => Err(format!("unknown command: {}", other)),
    }
}

fn parse_order(word: Option<&str>) -> Result<usize, String> {
    match word {
        None => Ok(1),
        Some(text) => text
            .parse::<usize>()
            .map_err(|_| format!("not an order: {}", text)),
    }
}
