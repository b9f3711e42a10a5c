//! Framing of engine replies.
//!
//! With `int-output-mode-wellformed` every return value arrives as
//!
//! ```text
//! 256 <length> <tag>\r\n<payload>\r\n\r\n<prompt>
//! ```
//!
//! Two strategies locate the payload. [`expanded`] needs the blank-line
//! terminator and takes everything up to the last `\r\n\r\n`, so payloads
//! that contain their own `256 ...` text or blank lines stay intact.
//! [`loose`] takes the rest of the blob and is only used when the terminator
//! never arrived. Either way the declared length must match the payload.

use std::borrow::Cow;

use super::PROMPT_SUFFIX;

/// Log level the engine uses for return values.
const RETURN_VALUE_MARKER: &[u8] = b"256 ";
const MAX_LENGTH_DIGITS: usize = 5;
const CRLF: &[u8] = b"\r\n";
const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Payload of the error reply produced for a length mismatch.
pub const LENGTH_ERROR: &str = "Response length error.";

/// Payload of the error reply produced when nothing looks like a reply.
pub const PARSE_ERROR: &str = "Malformed response from the processing engine.";

/// A parsed reply before coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub tag: String,
    pub payload: String,
}

impl RawResponse {
    fn error(message: &str) -> Self {
        Self {
            tag: "e".to_string(),
            payload: message.to_string(),
        }
    }

    /// Check if this is an `e` reply.
    pub fn is_error(&self) -> bool {
        self.tag == "e"
    }
}

/// A frame header: `256 <length> <tag>\r\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header<'a> {
    /// Offset of the `256` marker.
    start: usize,
    declared: usize,
    tag: &'a [u8],
    /// Offset of the first payload byte in the blob.
    body: usize,
}

/// A payload located by one of the strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame<'a> {
    header: Header<'a>,
    payload: &'a [u8],
}

/// Parse an accumulated blob into a tagged reply.
///
/// Framing problems never fail: they come back as an `e` reply.
pub fn parse_response(blob: &[u8]) -> RawResponse {
    let Some(frame) = expanded(blob).or_else(|| loose(blob)) else {
        tracing::debug!("no reply header in {} bytes of engine output", blob.len());
        return RawResponse::error(PARSE_ERROR);
    };

    if frame.payload.len() != frame.header.declared {
        tracing::warn!(
            "response length error: received {}, expected {}",
            frame.payload.len(),
            frame.header.declared
        );
        return RawResponse::error(LENGTH_ERROR);
    }

    RawResponse {
        tag: decode(frame.header.tag).into_owned(),
        payload: decode(frame.payload).into_owned(),
    }
}

/// True while a header has been read but its payload has not fully arrived.
pub fn awaiting_payload(blob: &[u8]) -> bool {
    headers(blob)
        .next()
        .is_some_and(|h| blob.len() < h.body + h.declared + TERMINATOR.len())
}

/// Length of the first complete reply in `blob`, up to and including the
/// prompt that ends it.
///
/// A prompt before any header ends a reply whose header was already
/// consumed. Otherwise the prompt is searched for after the declared payload
/// and its terminator, so `"> "` inside a payload does not end the reply.
pub fn reply_len(blob: &[u8]) -> Option<usize> {
    let first_prompt = find(blob, PROMPT_SUFFIX)?;
    let from = match headers(blob).next() {
        Some(header) if header.start < first_prompt + PROMPT_SUFFIX.len() => {
            header.body + header.declared + TERMINATOR.len()
        }
        _ => 0,
    };
    let rest = blob.get(from..)?;
    find(rest, PROMPT_SUFFIX).map(|at| from + at + PROMPT_SUFFIX.len())
}

/// Strict strategy: header, payload, blank-line terminator, prompt text.
fn expanded(blob: &[u8]) -> Option<Frame<'_>> {
    headers(blob).find_map(|header| {
        let rest = &blob[header.body..];
        let end = rfind(rest, TERMINATOR)?;
        Some(Frame {
            header,
            payload: &rest[..end],
        })
    })
}

/// Fallback strategy: header followed by whatever has arrived.
fn loose(blob: &[u8]) -> Option<Frame<'_>> {
    headers(blob).next().map(|header| Frame {
        header,
        payload: &blob[header.body..],
    })
}

/// All well-formed headers in the blob, in order.
fn headers(blob: &[u8]) -> impl Iterator<Item = Header<'_>> {
    (0..blob.len())
        .filter(move |&i| blob[i..].starts_with(RETURN_VALUE_MARKER))
        .filter_map(move |i| parse_header(blob, i))
}

fn parse_header(blob: &[u8], at: usize) -> Option<Header<'_>> {
    let start = at + RETURN_VALUE_MARKER.len();
    let rest = &blob[start..];

    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits > MAX_LENGTH_DIGITS || rest.get(digits) != Some(&b' ') {
        return None;
    }
    let declared = std::str::from_utf8(&rest[..digits]).ok()?.parse().ok()?;

    let tag_start = digits + 1;
    let tag_len = find(&rest[tag_start..], CRLF)?;
    let tag = &rest[tag_start..tag_start + tag_len];
    if tag.is_empty() || tag.contains(&b'\n') {
        return None;
    }

    Some(Header {
        start: at,
        declared,
        tag,
        body: start + tag_start + tag_len + CRLF.len(),
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn decode(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROMPT: &str = "ecasound ('h' for help)> ";

    fn frame(declared: usize, tag: &str, payload: &str) -> Vec<u8> {
        format!("256 {} {}\r\n{}\r\n\r\n{}", declared, tag, payload, PROMPT).into_bytes()
    }

    #[test]
    fn well_formed_reply() {
        let response = parse_response(&frame(8, "S", "12,ao,34"));
        assert_eq!(response.tag, "S");
        assert_eq!(response.payload, "12,ao,34");
    }

    #[test]
    fn empty_payload() {
        let response = parse_response(&frame(0, "-", ""));
        assert_eq!(response.tag, "-");
        assert_eq!(response.payload, "");
    }

    #[test]
    fn length_mismatch_is_error() {
        for declared in [2, 5, 100] {
            let response = parse_response(&frame(declared, "s", "abc"));
            assert!(response.is_error());
            assert_eq!(response.payload, LENGTH_ERROR);
        }
    }

    #[test]
    fn payload_with_embedded_header() {
        let payload = "256 2 s\r\nhi";
        let response = parse_response(&frame(payload.len(), "s", payload));
        assert_eq!(response.tag, "s");
        assert_eq!(response.payload, payload);
    }

    #[test]
    fn payload_with_blank_line() {
        let payload = "first\r\n\r\nsecond";
        let response = parse_response(&frame(payload.len(), "s", payload));
        assert_eq!(response.payload, payload);
    }

    #[test]
    fn multibyte_length_counts_bytes() {
        let payload = "h\u{e4}ppaa";
        assert_eq!(payload.len(), 7);
        let response = parse_response(&frame(7, "s", payload));
        assert_eq!(response.payload, payload);
    }

    #[test]
    fn leading_log_output_is_skipped() {
        let mut blob = b"1 12\r\nhello there!\r\n\r\n".to_vec();
        blob.extend(frame(2, "i", "42"));
        let response = parse_response(&blob);
        assert_eq!(response.tag, "i");
        assert_eq!(response.payload, "42");
    }

    #[test]
    fn loose_fallback_without_terminator() {
        let response = parse_response(b"256 3 s\r\nabc");
        assert_eq!(response.tag, "s");
        assert_eq!(response.payload, "abc");
    }

    #[test]
    fn no_header_is_parse_error() {
        let blobs: [&[u8]; 4] = [
            b"",
            b"ecasound ('h' for help)> ",
            b"256 x s\r\nabc",
            b"256 123456 s\r\n",
        ];
        for blob in blobs {
            let response = parse_response(blob);
            assert!(response.is_error());
            assert_eq!(response.payload, PARSE_ERROR);
        }
    }

    #[test]
    fn awaiting_payload_tracks_declared_length() {
        assert!(!awaiting_payload(b"no header here> "));
        assert!(awaiting_payload(b"256 10 s\r\nabc> "));
        assert!(!awaiting_payload(&frame(3, "s", "abc")));
    }

    #[test]
    fn reply_len_splits_back_to_back_replies() {
        let first = frame(8, "f", "3.140000");
        let second = frame(5, "S", "a,b,c");
        let mut blob = first.clone();
        blob.extend(&second);

        assert_eq!(reply_len(&blob), Some(first.len()));
        assert_eq!(reply_len(&blob[first.len()..]), Some(second.len()));
    }

    #[test]
    fn reply_len_ignores_prompt_inside_payload() {
        let payload = "a> b";
        let blob = frame(payload.len(), "s", payload);
        assert_eq!(reply_len(&blob), Some(blob.len()));
    }

    #[test]
    fn reply_len_of_headerless_tail() {
        let mut blob = format!("0000\r\n\r\n{}", PROMPT).into_bytes();
        let tail = blob.len();
        blob.extend(frame(2, "i", "42"));
        assert_eq!(reply_len(&blob), Some(tail));
    }

    #[test]
    fn reply_len_incomplete() {
        assert_eq!(reply_len(b"256 10 s\r\nabc> "), None);
        assert_eq!(reply_len(b"256 3 s\r\nabc\r\n\r\n"), None);
        assert_eq!(reply_len(b""), None);
    }
}
