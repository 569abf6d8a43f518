//! Websocket transport.
//!
//! One thread owns the socket. A short read timeout on the TCP stream
//! lets the loop alternate between flushing queued outgoing messages and
//! reading frames. Text frames become events for the UI thread; binary
//! frames are voice clips and go straight into the mixer, tagged with
//! the userid of the most recent chat line.

use std::fmt;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hubbub_lib::chat::protocol::{ClientMessage, ServerMessage};
use hubbub_lib::error::MixerError;
use hubbub_lib::mixer::Mixer;
use log::{debug, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::http::{header, HeaderValue};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Error as WsError, Message, WebSocket};

use crate::config::Config;

const READ_TIMEOUT_MS: u64 = 250;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Something the socket thread tells the UI thread.
#[derive(Debug)]
pub enum NetEvent {
    Message(ServerMessage),
    Closed(String),
}

#[derive(Debug)]
pub enum ClientError {
    InvalidEndpoint(String),
    InvalidCookie(String),
    Connect { url: String, reason: String },
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidEndpoint(reason) => {
                write!(f, "invalid server endpoint: {}", reason)
            }
            ClientError::InvalidCookie(reason) => write!(f, "invalid cookie: {}", reason),
            ClientError::Connect { url, reason } => {
                write!(f, "could not connect to {}: {}", url, reason)
            }
        }
    }
}

impl std::error::Error for ClientError {}

pub fn endpoint_url(config: &Config) -> String {
    let scheme = if config.secure { "wss" } else { "ws" };
    format!(
        "{}://{}:{}/socket/{}",
        scheme, config.server, config.port, config.channel
    )
}

/// A live connection. Dropping it stops the socket thread.
pub struct Connection {
    outgoing: Sender<ClientMessage>,
    events: Receiver<NetEvent>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Connection {
    /// Connect and hand the socket to its own thread.
    pub fn open(config: &Config, mixer: Arc<Mixer>) -> Result<Self, ClientError> {
        let url = endpoint_url(config);
        let mut request = url
            .clone()
            .into_client_request()
            .map_err(|err| ClientError::InvalidEndpoint(err.to_string()))?;
        if let Some(cookie) = &config.cookie {
            let value = HeaderValue::from_str(&format!("id={}", cookie))
                .map_err(|err| ClientError::InvalidCookie(err.to_string()))?;
            request.headers_mut().insert(header::COOKIE, value);
        }

        let (mut socket, _response) = tungstenite::connect(request).map_err(|err| {
            ClientError::Connect {
                url: url.clone(),
                reason: err.to_string(),
            }
        })?;
        set_read_timeout(&mut socket);
        debug!("connected to {}", url);

        let (outgoing, outgoing_rx) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            socket_loop(socket, outgoing_rx, event_tx, mixer, thread_stop);
        });

        Ok(Self {
            outgoing,
            events,
            stop,
            handle: Some(handle),
        })
    }

    /// Queue a message for the socket thread.
    pub fn send(&self, message: ClientMessage) {
        let _ = self.outgoing.send(message);
    }

    /// Next pending event, if any. Never blocks.
    pub fn poll_event(&self) -> Option<NetEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("socket thread panicked during join");
            }
        }
    }
}

fn set_read_timeout(socket: &mut Socket) {
    let timeout = Some(Duration::from_millis(READ_TIMEOUT_MS));
    let result = match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(timeout),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(timeout),
        _ => Ok(()),
    };
    if let Err(err) = result {
        warn!("could not set the socket read timeout: {}", err);
    }
}

fn socket_loop(
    mut socket: Socket,
    outgoing: Receiver<ClientMessage>,
    events: Sender<NetEvent>,
    mixer: Arc<Mixer>,
    stop: Arc<AtomicBool>,
) {
    // Voice clips arrive as bare binary frames; the server sends the
    // matching chat line first, so its userid names the speaker.
    let mut speaker: Option<String> = None;

    loop {
        if stop.load(Ordering::SeqCst) {
            let _ = socket.close(None);
            return;
        }

        loop {
            match outgoing.try_recv() {
                Ok(message) => match serde_json::to_string(&message) {
                    Ok(text) => {
                        if let Err(err) = socket.send(Message::Text(text)) {
                            let _ = events.send(NetEvent::Closed(err.to_string()));
                            return;
                        }
                    }
                    Err(err) => warn!("could not encode an outgoing message: {}", err),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    let _ = socket.close(None);
                    return;
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                if let Some(message) = ServerMessage::parse(&text) {
                    if let ServerMessage::Chat { userid, .. } = &message {
                        speaker = Some(userid.clone());
                    }
                    if events.send(NetEvent::Message(message)).is_err() {
                        return;
                    }
                }
            }
            Ok(Message::Binary(payload)) => {
                let Some(owner) = speaker.as_deref() else {
                    debug!("dropping a voice clip with no speaker attached");
                    continue;
                };
                match mixer.submit(owner, &payload) {
                    Ok(()) => {}
                    Err(MixerError::Format(reason)) => {
                        warn!("rejecting a voice clip from {}: {}", owner, reason)
                    }
                    Err(err) => debug!("voice clip from {} not queued: {}", owner, err),
                }
            }
            Ok(Message::Close(_)) => {
                let _ = events.send(NetEvent::Closed("server closed the connection".to_string()));
                return;
            }
            Ok(_) => {}
            Err(WsError::Io(err))
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(err) => {
                let _ = events.send(NetEvent::Closed(err.to_string()));
                return;
            }
        }
    }
}
