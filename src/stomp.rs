//! Minimal STOMP 1.2 text framing.
//!
//! Only what the game channel needs: CONNECT, SUBSCRIBE, SEND and
//! DISCONNECT outbound; CONNECTED, MESSAGE, RECEIPT and ERROR inbound.
//! Frames travel one per WebSocket text message.

use derive_more::{Display, Error};
use std::fmt::Write as _;
use tracing::instrument;

const NULL: char = '\0';

/// Accepted STOMP protocol versions advertised on CONNECT.
pub const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// Frame decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum StompError {
    /// Frame had no command line.
    #[display("Frame is missing a command")]
    MissingCommand,
    /// Header line without a colon.
    #[display("Malformed header line: {_0}")]
    MalformedHeader(#[error(not(source))] String),
    /// Header value contains an undefined escape sequence.
    #[display("Invalid escape sequence in header: {_0}")]
    InvalidEscape(#[error(not(source))] String),
    /// Frame ended before the blank line separating headers from body.
    #[display("Frame ended inside the header block")]
    Truncated,
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Frame {
    /// Creates a frame with no headers and an empty body.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// CONNECT frame for `host`.
    pub fn connect(host: &str) -> Self {
        Self::new("CONNECT")
            .header("accept-version", ACCEPT_VERSION)
            .header("host", host)
            .header("heart-beat", "0,0")
    }

    /// SUBSCRIBE frame.
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new("SUBSCRIBE")
            .header("id", id)
            .header("destination", destination)
    }

    /// SEND frame carrying a JSON body.
    pub fn send(destination: &str, json: impl Into<String>) -> Self {
        Self::new("SEND")
            .header("destination", destination)
            .header("content-type", "application/json")
            .body(json)
    }

    /// DISCONNECT frame.
    pub fn disconnect() -> Self {
        Self::new("DISCONNECT")
    }

    /// Returns the command.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns the first value of header `name`. Later repeats are ignored.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body.
    pub fn body_text(&self) -> &str {
        &self.body
    }

    /// CONNECT and CONNECTED headers are never escaped.
    fn escapes_headers(&self) -> bool {
        !matches!(self.command.as_str(), "CONNECT" | "CONNECTED")
    }

    /// Serializes the frame, NUL terminator included.
    pub fn encode(&self) -> String {
        let escape = self.escapes_headers();
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                let _ = writeln!(out, "{}:{}", escape_header(name), escape_header(value));
            } else {
                let _ = writeln!(out, "{}:{}", name, value);
            }
        }
        if !self.body.is_empty() {
            let _ = writeln!(out, "content-length:{}", self.body.len());
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push(NULL);
        out
    }

    /// Parses one frame. Heart-beats (bare end-of-line) decode to `None`.
    #[instrument(skip(text), fields(len = text.len()))]
    pub fn decode(text: &str) -> Result<Option<Self>, StompError> {
        let text = text.trim_start_matches(['\r', '\n']);
        if text.is_empty() || text.chars().all(|c| c == NULL) {
            return Ok(None);
        }

        let (head, rest) = split_head(text).ok_or(StompError::Truncated)?;
        let mut lines = head.lines();
        let command = lines
            .next()
            .map(str::trim_end)
            .filter(|c| !c.is_empty())
            .ok_or(StompError::MissingCommand)?
            .to_string();

        let escape = !matches!(command.as_str(), "CONNECT" | "CONNECTED");
        let mut headers = Vec::new();
        for line in lines {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| StompError::MalformedHeader(line.to_string()))?;
            if escape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let frame = Self {
            command,
            headers,
            body: String::new(),
        };
        let body = match frame
            .header_value("content-length")
            .and_then(|l| l.parse::<usize>().ok())
        {
            Some(len) if rest.is_char_boundary(len.min(rest.len())) => &rest[..len.min(rest.len())],
            _ => rest.split(NULL).next().unwrap_or_default(),
        };
        Ok(Some(frame.body(body)))
    }
}

/// Splits at the blank line ending the header block.
fn split_head(text: &str) -> Option<(&str, &str)> {
    if let Some(idx) = text.find("\n\n") {
        return Some((&text[..idx], &text[idx + 2..]));
    }
    text.find("\r\n\r\n")
        .map(|idx| (&text[..idx], &text[idx + 4..]))
}

fn escape_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    out
}

fn unescape_header(raw: &str) -> Result<String, StompError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(StompError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
