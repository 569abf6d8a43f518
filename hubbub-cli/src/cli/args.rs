//! CLI argument definitions for `hubbub`.

use clap::{Arg, ArgAction, Command};

/// Build the CLI argument parser and command definitions.
pub fn build_cli() -> Command {
    // Flags deliberately carry no clap defaults; absence means "let the
    // config file or the built-in default decide".
    Command::new("hubbub")
        .version("0.2.0")
        .about("Chat on a loult server with live voice playback")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a YAML configuration file"),
        )
        .arg(
            Arg::new("server")
                .long("server")
                .short('s')
                .value_name("HOST")
                .help("Server to connect to"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("PORT")
                .help("Port of the websocket server"),
        )
        .arg(
            Arg::new("channel")
                .long("channel")
                .short('c')
                .value_name("NAME")
                .help("Channel to join; empty joins the main channel"),
        )
        .arg(
            Arg::new("cookie")
                .long("cookie")
                .short('k')
                .value_name("ID")
                .help("Identity cookie sent in the websocket handshake"),
        )
        .arg(
            Arg::new("insecure")
                .long("insecure")
                .action(ArgAction::SetTrue)
                .help("Connect over ws:// instead of wss://"),
        )
        .arg(
            Arg::new("volume")
                .long("volume")
                .short('v')
                .value_name("PERCENT")
                .help("Initial playback volume (0-100)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log verbosity: error, warn, info, debug or trace"),
        )
        .subcommand(
            Command::new("play")
                .about("Play WAV files through the notification mixer, then exit")
                .arg(
                    Arg::new("FILE")
                        .help("WAV files to queue, mixed when they overlap")
                        .required(true)
                        .num_args(1..)
                        .index(1),
                ),
        )
}
