//! Events emitted by a document session to the surrounding application.

use gd_core::BrowserError;
use gd_core::BrowserResult;
use std::sync::mpsc;
use std::time::Duration;

pub const DEFAULT_MAX_EVENT_BYTES: usize = 64 * 1024;
const FRAME_PREFIX_BYTES: usize = 4;

const EVENT_TAG_REQUEST_STARTED: u8 = 1;
const EVENT_TAG_REQUEST_UPDATED: u8 = 2;
const EVENT_TAG_REQUEST_FINISHED: u8 = 3;
const EVENT_TAG_REQUEST_CANCELLED: u8 = 4;
const EVENT_TAG_DOCUMENT_CHANGED: u8 = 5;
const EVENT_TAG_PAGE_INFO: u8 = 6;
const EVENT_TAG_NAVIGATE_BACK: u8 = 7;
const EVENT_TAG_NAVIGATE_FORWARD: u8 = 8;
const EVENT_TAG_NAVIGATE_PARENT: u8 = 9;
const EVENT_TAG_NAVIGATE_ROOT: u8 = 10;
const EVENT_TAG_OPEN: u8 = 11;
const EVENT_TAG_OPEN_EXTERNAL: u8 = 12;
const EVENT_TAG_INPUT_REQUESTED: u8 = 13;
const EVENT_TAG_MESSAGE: u8 = 14;

/// Where an opened link should appear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TabMode {
    #[default]
    Current,
    NewTab,
    Background,
}

impl TabMode {
    fn encode(self) -> u8 {
        match self {
            Self::Current => 0,
            Self::NewTab => 1,
            Self::Background => 2,
        }
    }

    fn decode(raw: u8) -> BrowserResult<Self> {
        match raw {
            0 => Ok(Self::Current),
            1 => Ok(Self::NewTab),
            2 => Ok(Self::Background),
            _ => Err(BrowserError::new(
                "ipc.event_tab_mode_invalid",
                format!("invalid tab mode `{raw}` in session event"),
            )),
        }
    }
}

/// Notification from a session; payloads are typed per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    RequestStarted {
        url: String,
    },
    RequestUpdated {
        url: String,
        bytes: u64,
    },
    RequestFinished {
        url: String,
        status: i32,
    },
    RequestCancelled {
        url: String,
    },
    DocumentChanged {
        url: String,
    },
    PageInfoRequested {
        text: String,
        can_trust: bool,
        have_fingerprint: bool,
    },
    NavigateBack,
    NavigateForward,
    NavigateParent {
        url: String,
    },
    NavigateRoot {
        url: String,
    },
    Open {
        url: String,
        tab: TabMode,
        redirects: u8,
    },
    /// Non-native scheme; the application confirms before handing it to the
    /// system browser.
    OpenExternal {
        url: String,
    },
    InputRequested {
        host: String,
        prompt: String,
        sensitive: bool,
    },
    Message {
        title: String,
        text: String,
    },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestStarted { .. } => "document.request.started",
            Self::RequestUpdated { .. } => "document.request.updated",
            Self::RequestFinished { .. } => "document.request.finished",
            Self::RequestCancelled { .. } => "document.request.cancelled",
            Self::DocumentChanged { .. } => "document.changed",
            Self::PageInfoRequested { .. } => "document.info",
            Self::NavigateBack => "navigate.back",
            Self::NavigateForward => "navigate.forward",
            Self::NavigateParent { .. } => "navigate.parent",
            Self::NavigateRoot { .. } => "navigate.root",
            Self::Open { .. } => "open",
            Self::OpenExternal { .. } => "open.external",
            Self::InputRequested { .. } => "input.request",
            Self::Message { .. } => "message",
        }
    }
}

/// Sending half of a framed event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Vec<u8>>,
    max_event_bytes: usize,
}

impl EventSender {
    pub fn send(&self, event: &SessionEvent) -> BrowserResult<()> {
        let frame = encode_event(event, self.max_event_bytes)?;
        self.tx.send(frame).map_err(|error| {
            BrowserError::new(
                "ipc.send_failed",
                format!("failed to send `{}` event: {error}", event.name()),
            )
        })
    }
}

/// Receiving half of a framed event channel.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Vec<u8>>,
    max_event_bytes: usize,
}

impl EventReceiver {
    /// Next queued event, or `None` when the queue is empty.
    pub fn try_recv(&self) -> BrowserResult<Option<SessionEvent>> {
        match self.rx.try_recv() {
            Ok(frame) => decode_event(&frame, self.max_event_bytes).map(Some),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(BrowserError::new(
                "ipc.recv_failed",
                "session event channel disconnected",
            )),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> BrowserResult<SessionEvent> {
        let frame = self.rx.recv_timeout(timeout).map_err(|error| {
            BrowserError::new(
                "ipc.recv_failed",
                format!("failed to receive session event: {error}"),
            )
        })?;
        decode_event(&frame, self.max_event_bytes)
    }

    /// Decodes everything queued; undecodable frames are skipped.
    pub fn drain(&self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            match decode_event(&frame, self.max_event_bytes) {
                Ok(event) => out.push(event),
                Err(error) => tracing::warn!(%error, "dropping malformed session event"),
            }
        }
        out
    }
}

/// Creates a connected in-memory event channel.
pub fn local_event_channel(max_event_bytes: usize) -> BrowserResult<(EventSender, EventReceiver)> {
    if max_event_bytes == 0 {
        return Err(BrowserError::new(
            "ipc.max_event_bytes_invalid",
            "event channel max_event_bytes must be greater than zero",
        ));
    }
    if max_event_bytes > (16 * 1024 * 1024) {
        return Err(BrowserError::new(
            "ipc.max_event_bytes_too_large",
            "event channel max_event_bytes exceeds hard limit (16 MiB)",
        ));
    }

    let (tx, rx) = mpsc::channel();
    Ok((
        EventSender {
            tx,
            max_event_bytes,
        },
        EventReceiver {
            rx,
            max_event_bytes,
        },
    ))
}

/// Encodes a payload as a length-prefixed frame.
pub fn encode_frame(payload: &[u8], max_event_bytes: usize) -> BrowserResult<Vec<u8>> {
    if payload.len() > max_event_bytes {
        return Err(BrowserError::new(
            "ipc.event_too_large",
            format!(
                "payload exceeds max_event_bytes ({} > {})",
                payload.len(),
                max_event_bytes
            ),
        ));
    }

    let len_u32 = u32::try_from(payload.len()).map_err(|_| {
        BrowserError::new(
            "ipc.event_too_large",
            "payload length does not fit in 32-bit frame prefix",
        )
    })?;

    let mut out = Vec::with_capacity(FRAME_PREFIX_BYTES + payload.len());
    out.extend_from_slice(&len_u32.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Decodes a length-prefixed frame and validates payload size.
pub fn decode_frame(frame: &[u8], max_event_bytes: usize) -> BrowserResult<Vec<u8>> {
    if frame.len() < FRAME_PREFIX_BYTES {
        return Err(BrowserError::new(
            "ipc.frame_too_short",
            "frame is shorter than the 4-byte length prefix",
        ));
    }

    let mut len_bytes = [0_u8; FRAME_PREFIX_BYTES];
    len_bytes.copy_from_slice(&frame[..FRAME_PREFIX_BYTES]);
    let payload_len = u32::from_be_bytes(len_bytes) as usize;
    if payload_len > max_event_bytes {
        return Err(BrowserError::new(
            "ipc.event_too_large",
            format!("decoded payload exceeds max_event_bytes ({payload_len} > {max_event_bytes})"),
        ));
    }

    let expected = FRAME_PREFIX_BYTES + payload_len;
    if frame.len() != expected {
        return Err(BrowserError::new(
            "ipc.frame_length_mismatch",
            format!(
                "frame length mismatch: expected {expected} bytes, got {}",
                frame.len()
            ),
        ));
    }

    Ok(frame[FRAME_PREFIX_BYTES..].to_vec())
}

pub fn encode_event(event: &SessionEvent, max_event_bytes: usize) -> BrowserResult<Vec<u8>> {
    let payload = encode_event_payload(event)?;
    encode_frame(&payload, max_event_bytes)
}

pub fn decode_event(frame: &[u8], max_event_bytes: usize) -> BrowserResult<SessionEvent> {
    let payload = decode_frame(frame, max_event_bytes)?;
    decode_event_payload(&payload)
}

fn encode_event_payload(event: &SessionEvent) -> BrowserResult<Vec<u8>> {
    let mut out = Vec::new();
    match event {
        SessionEvent::RequestStarted { url } => {
            out.push(EVENT_TAG_REQUEST_STARTED);
            write_string_u16(&mut out, url, "url")?;
        }
        SessionEvent::RequestUpdated { url, bytes } => {
            out.push(EVENT_TAG_REQUEST_UPDATED);
            write_string_u16(&mut out, url, "url")?;
            out.extend_from_slice(&bytes.to_be_bytes());
        }
        SessionEvent::RequestFinished { url, status } => {
            out.push(EVENT_TAG_REQUEST_FINISHED);
            write_string_u16(&mut out, url, "url")?;
            out.extend_from_slice(&status.to_be_bytes());
        }
        SessionEvent::RequestCancelled { url } => {
            out.push(EVENT_TAG_REQUEST_CANCELLED);
            write_string_u16(&mut out, url, "url")?;
        }
        SessionEvent::DocumentChanged { url } => {
            out.push(EVENT_TAG_DOCUMENT_CHANGED);
            write_string_u16(&mut out, url, "url")?;
        }
        SessionEvent::PageInfoRequested {
            text,
            can_trust,
            have_fingerprint,
        } => {
            out.push(EVENT_TAG_PAGE_INFO);
            write_string_u16(&mut out, text, "text")?;
            out.push(u8::from(*can_trust));
            out.push(u8::from(*have_fingerprint));
        }
        SessionEvent::NavigateBack => out.push(EVENT_TAG_NAVIGATE_BACK),
        SessionEvent::NavigateForward => out.push(EVENT_TAG_NAVIGATE_FORWARD),
        SessionEvent::NavigateParent { url } => {
            out.push(EVENT_TAG_NAVIGATE_PARENT);
            write_string_u16(&mut out, url, "url")?;
        }
        SessionEvent::NavigateRoot { url } => {
            out.push(EVENT_TAG_NAVIGATE_ROOT);
            write_string_u16(&mut out, url, "url")?;
        }
        SessionEvent::Open {
            url,
            tab,
            redirects,
        } => {
            out.push(EVENT_TAG_OPEN);
            write_string_u16(&mut out, url, "url")?;
            out.push(tab.encode());
            out.push(*redirects);
        }
        SessionEvent::OpenExternal { url } => {
            out.push(EVENT_TAG_OPEN_EXTERNAL);
            write_string_u16(&mut out, url, "url")?;
        }
        SessionEvent::InputRequested {
            host,
            prompt,
            sensitive,
        } => {
            out.push(EVENT_TAG_INPUT_REQUESTED);
            write_string_u16(&mut out, host, "host")?;
            write_string_u16(&mut out, prompt, "prompt")?;
            out.push(u8::from(*sensitive));
        }
        SessionEvent::Message { title, text } => {
            out.push(EVENT_TAG_MESSAGE);
            write_string_u16(&mut out, title, "title")?;
            write_string_u16(&mut out, text, "text")?;
        }
    }
    Ok(out)
}

fn decode_event_payload(payload: &[u8]) -> BrowserResult<SessionEvent> {
    if payload.is_empty() {
        return Err(BrowserError::new(
            "ipc.event_empty",
            "session event payload is empty",
        ));
    }

    let mut offset = 0_usize;
    let tag = read_u8(payload, &mut offset, "tag")?;
    let event = match tag {
        EVENT_TAG_REQUEST_STARTED => SessionEvent::RequestStarted {
            url: read_string_u16(payload, &mut offset, "url")?,
        },
        EVENT_TAG_REQUEST_UPDATED => SessionEvent::RequestUpdated {
            url: read_string_u16(payload, &mut offset, "url")?,
            bytes: read_u64(payload, &mut offset, "bytes")?,
        },
        EVENT_TAG_REQUEST_FINISHED => SessionEvent::RequestFinished {
            url: read_string_u16(payload, &mut offset, "url")?,
            status: read_i32(payload, &mut offset, "status")?,
        },
        EVENT_TAG_REQUEST_CANCELLED => SessionEvent::RequestCancelled {
            url: read_string_u16(payload, &mut offset, "url")?,
        },
        EVENT_TAG_DOCUMENT_CHANGED => SessionEvent::DocumentChanged {
            url: read_string_u16(payload, &mut offset, "url")?,
        },
        EVENT_TAG_PAGE_INFO => SessionEvent::PageInfoRequested {
            text: read_string_u16(payload, &mut offset, "text")?,
            can_trust: read_bool(payload, &mut offset, "can_trust")?,
            have_fingerprint: read_bool(payload, &mut offset, "have_fingerprint")?,
        },
        EVENT_TAG_NAVIGATE_BACK => SessionEvent::NavigateBack,
        EVENT_TAG_NAVIGATE_FORWARD => SessionEvent::NavigateForward,
        EVENT_TAG_NAVIGATE_PARENT => SessionEvent::NavigateParent {
            url: read_string_u16(payload, &mut offset, "url")?,
        },
        EVENT_TAG_NAVIGATE_ROOT => SessionEvent::NavigateRoot {
            url: read_string_u16(payload, &mut offset, "url")?,
        },
        EVENT_TAG_OPEN => SessionEvent::Open {
            url: read_string_u16(payload, &mut offset, "url")?,
            tab: TabMode::decode(read_u8(payload, &mut offset, "tab")?)?,
            redirects: read_u8(payload, &mut offset, "redirects")?,
        },
        EVENT_TAG_OPEN_EXTERNAL => SessionEvent::OpenExternal {
            url: read_string_u16(payload, &mut offset, "url")?,
        },
        EVENT_TAG_INPUT_REQUESTED => SessionEvent::InputRequested {
            host: read_string_u16(payload, &mut offset, "host")?,
            prompt: read_string_u16(payload, &mut offset, "prompt")?,
            sensitive: read_bool(payload, &mut offset, "sensitive")?,
        },
        EVENT_TAG_MESSAGE => SessionEvent::Message {
            title: read_string_u16(payload, &mut offset, "title")?,
            text: read_string_u16(payload, &mut offset, "text")?,
        },
        other => {
            return Err(BrowserError::new(
                "ipc.event_tag_unknown",
                format!("unknown session event tag `{other}`"),
            ));
        }
    };

    if offset != payload.len() {
        return Err(BrowserError::new(
            "ipc.event_trailing_bytes",
            format!(
                "session event payload has trailing bytes (decoded {offset} of {})",
                payload.len()
            ),
        ));
    }

    Ok(event)
}

fn write_string_u16(out: &mut Vec<u8>, value: &str, field: &str) -> BrowserResult<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        BrowserError::new(
            "ipc.event_field_too_large",
            format!(
                "session event field `{field}` exceeds 16-bit size limit ({} bytes)",
                value.len()
            ),
        )
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn read_u8(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<u8> {
    if *offset >= payload.len() {
        return Err(BrowserError::new(
            "ipc.event_truncated",
            format!("missing `{field}` in session event"),
        ));
    }

    let value = payload[*offset];
    *offset += 1;
    Ok(value)
}

fn read_bool(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<bool> {
    match read_u8(payload, offset, field)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(BrowserError::new(
            "ipc.event_field_invalid",
            format!("invalid `{field}` flag `{other}`; expected 0 or 1"),
        )),
    }
}

fn read_u16(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<u16> {
    let bytes = read_exact(payload, offset, 2, field)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

fn read_i32(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<i32> {
    let bytes = read_exact(payload, offset, 4, field)?;
    Ok(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_u64(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<u64> {
    let bytes = read_exact(payload, offset, 8, field)?;
    Ok(u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

fn read_string_u16(payload: &[u8], offset: &mut usize, field: &str) -> BrowserResult<String> {
    let len = usize::from(read_u16(payload, offset, field)?);
    let bytes = read_exact(payload, offset, len, field)?;
    String::from_utf8(bytes.to_vec()).map_err(|error| {
        BrowserError::new(
            "ipc.event_utf8_invalid",
            format!("session event field `{field}` is not valid UTF-8: {error}"),
        )
    })
}

fn read_exact<'a>(
    payload: &'a [u8],
    offset: &mut usize,
    len: usize,
    field: &str,
) -> BrowserResult<&'a [u8]> {
    let end = offset.saturating_add(len);
    if end > payload.len() {
        return Err(BrowserError::new(
            "ipc.event_truncated",
            format!("session event ended while reading `{field}` (need {len} bytes)"),
        ));
    }

    let out = &payload[*offset..end];
    *offset = end;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::DEFAULT_MAX_EVENT_BYTES;
    use super::SessionEvent;
    use super::TabMode;
    use super::decode_event;
    use super::encode_event;
    use super::encode_frame;
    use super::local_event_channel;

    #[test]
    fn channel_delivers_events_in_order() {
        let channel = local_event_channel(DEFAULT_MAX_EVENT_BYTES);
        assert!(channel.is_ok());
        let (sender, receiver) = channel.unwrap_or_else(|_| unreachable!());

        assert!(
            sender
                .send(&SessionEvent::RequestStarted {
                    url: "gemini://example/".to_owned(),
                })
                .is_ok()
        );
        assert!(sender.send(&SessionEvent::NavigateBack).is_ok());

        assert_eq!(
            receiver.try_recv(),
            Ok(Some(SessionEvent::RequestStarted {
                url: "gemini://example/".to_owned(),
            }))
        );
        assert_eq!(receiver.drain(), vec![SessionEvent::NavigateBack]);
        assert_eq!(receiver.try_recv(), Ok(None));
    }

    #[test]
    fn open_event_keeps_tab_mode_and_redirects() {
        let event = SessionEvent::Open {
            url: "gemini://example/b".to_owned(),
            tab: TabMode::Background,
            redirects: 3,
        };
        let encoded = encode_event(&event, 256);
        assert!(encoded.is_ok());
        let decoded = decode_event(&encoded.unwrap_or_else(|_| unreachable!()), 256);
        assert_eq!(decoded, Ok(event));
    }

    #[test]
    fn negative_status_survives_encoding() {
        let event = SessionEvent::RequestFinished {
            url: String::new(),
            status: -5,
        };
        let encoded = encode_event(&event, 64).unwrap_or_else(|_| unreachable!());
        assert_eq!(decode_event(&encoded, 64), Ok(event));
    }

    #[test]
    fn rejects_unknown_tag_and_bad_flags() {
        let frame = encode_frame(&[99], 64).unwrap_or_else(|_| unreachable!());
        let decoded = decode_event(&frame, 64);
        assert!(decoded.is_err());
        if let Err(error) = decoded {
            assert_eq!(error.code, "ipc.event_tag_unknown");
        }

        let frame = encode_frame(&[6, 0, 0, 7, 0], 64).unwrap_or_else(|_| unreachable!());
        let decoded = decode_event(&frame, 64);
        if let Err(error) = decoded {
            assert_eq!(error.code, "ipc.event_field_invalid");
        } else {
            panic!("flag 7 must be rejected");
        }
    }

    #[test]
    fn oversized_events_are_refused() {
        let (sender, _receiver) = local_event_channel(16).unwrap_or_else(|_| unreachable!());
        let sent = sender.send(&SessionEvent::Message {
            title: "a long title".to_owned(),
            text: "and a long body".to_owned(),
        });
        assert!(sent.is_err());
        if let Err(error) = sent {
            assert_eq!(error.code, "ipc.event_too_large");
        }
        assert!(local_event_channel(0).is_err());
    }
}
