// STOMP 1.2 over a WebSocket: the message broker protocol the game server speaks.
//
// Only the client side of what we need is implemented: CONNECT, SUBSCRIBE, UNSUBSCRIBE, SEND and
// DISCONNECT go out; CONNECTED, MESSAGE, RECEIPT and ERROR come in. Bodies are UTF-8 text.

use std::collections::HashMap;
use std::fmt;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use anyhow::Context;
use tungstenite::protocol::Role;
use tungstenite::{Message, WebSocket};
use url::Url;

use live_chess::subscription::{InboundFrame, SubscriptionId, Transport, TransportEvent};


const SUBSCRIPTION_PREFIX: &str = "sub-";

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum StompError {
    MissingCommand,
    BadHeader(String),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StompFrame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl fmt::Display for StompError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StompError::MissingCommand => write!(f, "frame without a command"),
            StompError::BadHeader(line) => write!(f, "malformed header line: {line:?}"),
        }
    }
}

impl std::error::Error for StompError {}

impl StompFrame {
    pub fn new(command: &str) -> Self {
        StompFrame { command: command.to_owned(), headers: Vec::new(), body: String::new() }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn body(mut self, body: String) -> Self {
        self.body = body;
        self
    }

    // If a header is repeated, the first occurrence wins.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    pub fn encode(&self) -> String {
        let escape = escapes_headers(&self.command);
        let mut out = format!("{}\n", self.command);
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&format!("{}:{}\n", escape_header(name), escape_header(value)));
            } else {
                out.push_str(&format!("{name}:{value}\n"));
            }
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    // Decodes one frame. Leading end-of-lines (heart-beats) are skipped. Returns `None` if there
    // is nothing but heart-beats.
    pub fn decode(text: &str) -> Result<Option<StompFrame>, StompError> {
        let text = text.trim_start_matches(['\r', '\n']);
        let text = text.strip_suffix('\0').unwrap_or(text);
        if text.is_empty() {
            return Ok(None);
        }
        let (head, body) = match text.split_once("\n\n") {
            Some(split) => split,
            None => text.split_once("\r\n\r\n").unwrap_or((text, "")),
        };
        let mut lines = head.lines();
        let command = lines.next().map(str::trim_end).filter(|c| !c.is_empty());
        let command = command.ok_or(StompError::MissingCommand)?;
        let unescape = escapes_headers(command);
        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let (name, value) =
                line.split_once(':').ok_or_else(|| StompError::BadHeader(line.to_owned()))?;
            if unescape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_owned(), value.to_owned()));
            }
        }
        Ok(Some(StompFrame { command: command.to_owned(), headers, body: body.to_owned() }))
    }
}

// One WebSocket message may carry several frames.
pub fn decode_frames(text: &str) -> Vec<Result<StompFrame, StompError>> {
    text.split_inclusive('\0').filter_map(|chunk| StompFrame::decode(chunk).transpose()).collect()
}

// CONNECT and CONNECTED frames are exempt from escaping.
fn escapes_headers(command: &str) -> bool { command != "CONNECT" && command != "CONNECTED" }

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            ch => out.push(ch),
        }
    }
    out
}

fn unescape_header(s: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::BadHeader(s.to_owned())),
        }
    }
    Ok(out)
}

pub fn subscription_header(subscription: SubscriptionId) -> String {
    format!("{SUBSCRIPTION_PREFIX}{subscription}")
}

pub fn parse_subscription_header(value: &str) -> Option<SubscriptionId> {
    value.strip_prefix(SUBSCRIPTION_PREFIX)?.parse().ok()
}

type TopicMap = Arc<Mutex<HashMap<SubscriptionId, String>>>;

// Blocking WebSocket transport. Writes happen on the caller's thread; a reader thread turns
// incoming frames into `TransportEvent`s and forwards them to `events_tx`.
pub struct StompTransport<E> {
    server_url: String,
    auth_token: Option<String>,
    events_tx: mpsc::Sender<E>,
    socket: Option<WebSocket<TcpStream>>,
    connected: Arc<AtomicBool>,
    // Cleared by the reader thread when the connection is gone.
    reader_running: Arc<AtomicBool>,
    topics: TopicMap,
    next_subscription: SubscriptionId,
}

impl<E: From<TransportEvent> + Send + 'static> StompTransport<E> {
    pub fn new(server_url: String, auth_token: Option<String>, events_tx: mpsc::Sender<E>) -> Self {
        StompTransport {
            server_url,
            auth_token,
            events_tx,
            socket: None,
            connected: Arc::new(AtomicBool::new(false)),
            reader_running: Arc::new(AtomicBool::new(false)),
            topics: Arc::new(Mutex::new(HashMap::new())),
            next_subscription: 0,
        }
    }

    fn open(&mut self) -> anyhow::Result<()> {
        let url = Url::parse(&self.server_url).context("Invalid server URL")?;
        let addrs = url.socket_addrs(|| None).context("Cannot resolve server address")?;
        let stream = TcpStream::connect(&*addrs).context("Cannot connect to server")?;
        let (mut socket, _) = tungstenite::client(url.as_str(), stream)
            .map_err(|err| anyhow::anyhow!("WebSocket handshake failed: {err}"))?;
        let host = url.host_str().unwrap_or("localhost");
        let mut connect =
            StompFrame::new("CONNECT").header("accept-version", "1.2").header("host", host);
        if let Some(token) = &self.auth_token {
            connect = connect.header("Authorization", &format!("Bearer {token}"));
        }
        socket.send(Message::text(connect.encode())).context("Cannot send CONNECT")?;
        let reader_stream = socket.get_ref().try_clone().context("Cannot clone socket")?;
        let reader = WebSocket::from_raw_socket(reader_stream, Role::Client, None);
        let connected = Arc::clone(&self.connected);
        let reader_running = Arc::clone(&self.reader_running);
        let topics = Arc::clone(&self.topics);
        let events_tx = self.events_tx.clone();
        reader_running.store(true, Ordering::SeqCst);
        thread::spawn(move || read_loop(reader, connected, reader_running, topics, events_tx));
        self.socket = Some(socket);
        Ok(())
    }

    fn write(&mut self, frame: StompFrame) {
        let Some(socket) = self.socket.as_mut() else {
            log::warn!("Dropping {} frame: no connection", frame.command);
            return;
        };
        if let Err(err) = socket.send(Message::text(frame.encode())) {
            log::warn!("Cannot send {} frame: {err}", frame.command);
        }
    }
}

impl<E: From<TransportEvent> + Send + 'static> Transport for StompTransport<E> {
    fn connect(&mut self) {
        if self.socket.is_some() {
            if self.reader_running.load(Ordering::SeqCst) {
                return;
            }
            // The reader has seen the connection die. Drop what is left of it and start over.
            self.socket = None;
            lock_topics(&self.topics).clear();
        }
        log::info!("Connecting to {}", self.server_url);
        if let Err(err) = self.open() {
            log::error!("{err:#}");
        }
    }

    fn disconnect(&mut self) {
        self.write(StompFrame::new("DISCONNECT"));
        if let Some(mut socket) = self.socket.take() {
            if let Err(err) = socket.close(None) {
                log::debug!("Error while closing socket: {err}");
            }
        }
        self.connected.store(false, Ordering::SeqCst);
        lock_topics(&self.topics).clear();
    }

    fn is_active(&self) -> bool { self.connected.load(Ordering::SeqCst) }

    fn subscribe(&mut self, topic: &str) -> SubscriptionId {
        let subscription = self.next_subscription;
        self.next_subscription += 1;
        lock_topics(&self.topics).insert(subscription, topic.to_owned());
        self.write(
            StompFrame::new("SUBSCRIBE")
                .header("id", &subscription_header(subscription))
                .header("destination", topic),
        );
        subscription
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        lock_topics(&self.topics).remove(&subscription);
        self.write(StompFrame::new("UNSUBSCRIBE").header("id", &subscription_header(subscription)));
    }

    fn send(&mut self, destination: &str, body: String) {
        self.write(
            StompFrame::new("SEND")
                .header("destination", destination)
                .header("content-type", "application/json")
                .body(body),
        );
    }
}

fn lock_topics(topics: &TopicMap) -> std::sync::MutexGuard<'_, HashMap<SubscriptionId, String>> {
    // A panic while holding the lock cannot leave the map in an inconsistent state.
    topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_loop<E: From<TransportEvent>>(
    mut socket: WebSocket<TcpStream>, connected: Arc<AtomicBool>, reader_running: Arc<AtomicBool>,
    topics: TopicMap, events_tx: mpsc::Sender<E>,
) {
    'read: loop {
        let text = match socket.read() {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break 'read,
            Ok(_) => continue,
            Err(err) => {
                log::info!("Connection closed: {err}");
                break 'read;
            }
        };
        for frame in decode_frames(text.as_str()) {
            let event = match frame {
                Ok(frame) => inbound_event(frame, &connected, &topics),
                Err(err) => {
                    log::warn!("Cannot parse STOMP frame: {err}");
                    None
                }
            };
            if let Some(event) = event {
                if events_tx.send(event.into()).is_err() {
                    break 'read;
                }
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
    reader_running.store(false, Ordering::SeqCst);
    // The receiver is gone if the app is shutting down.
    let _ = events_tx.send(TransportEvent::Disconnected.into());
}

fn inbound_event(
    frame: StompFrame, connected: &AtomicBool, topics: &TopicMap,
) -> Option<TransportEvent> {
    match frame.command.as_str() {
        "CONNECTED" => {
            connected.store(true, Ordering::SeqCst);
            Some(TransportEvent::Connected)
        }
        "MESSAGE" => {
            let Some(subscription) =
                frame.get_header("subscription").and_then(parse_subscription_header)
            else {
                log::warn!("MESSAGE without a known subscription header");
                return None;
            };
            let topic = lock_topics(topics)
                .get(&subscription)
                .cloned()
                .or_else(|| frame.get_header("destination").map(str::to_owned))?;
            Some(TransportEvent::Frame(InboundFrame { subscription, topic, body: frame.body }))
        }
        "ERROR" => {
            let message = frame.get_header("message").unwrap_or("unknown error");
            log::error!("Broker error: {message} {}", frame.body.trim());
            None
        }
        "RECEIPT" => None,
        other => {
            log::debug!("Ignoring {other} frame");
            None
        }
    }
}
