//! # hubbub
//!
//! A terminal chat client for loult servers with live voice playback.

mod cli;
mod client;
mod commands;
mod config;
mod controls;
mod logging;
mod runner;
mod ui;

fn main() {
    let args = cli::args::build_cli().get_matches();

    let code = match runner::run(&args) {
        Ok(code) => code,
        Err(err) => {
            // The logger feeds an in-memory ring, so startup failures
            // print straight to the console instead.
            eprintln!("error: {}", err.to_string().to_lowercase());
            -1
        }
    };

    std::process::exit(code)
}
