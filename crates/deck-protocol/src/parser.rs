//! Frame parser for record-separated JSON

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::HubMessage;
use crate::RECORD_SEPARATOR;
use bytes::BytesMut;

/// Maximum size of a single frame (1MB)
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Splits an incoming byte stream into frames
pub struct Parser {
    buffer: BytesMut,
    /// Dropping the rest of an oversized frame until its separator shows up
    discarding: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            discarding: false,
        }
    }

    /// Add data to the parser buffer.
    ///
    /// Complete frames already buffered are kept when the trailing partial
    /// frame grows past [`MAX_MESSAGE_SIZE`]; only that frame is dropped.
    pub fn feed(&mut self, mut data: &[u8]) -> ProtocolResult<()> {
        if self.discarding {
            match data.iter().position(|&b| b == RECORD_SEPARATOR) {
                Some(pos) => {
                    self.discarding = false;
                    data = &data[pos + 1..];
                }
                None => return Ok(()),
            }
        }

        self.buffer.extend_from_slice(data);

        let partial = match self.buffer.iter().rposition(|&b| b == RECORD_SEPARATOR) {
            Some(pos) => self.buffer.len() - pos - 1,
            None => self.buffer.len(),
        };
        if partial > MAX_MESSAGE_SIZE {
            let keep = self.buffer.len() - partial;
            self.buffer.truncate(keep);
            self.discarding = true;
            return Err(ProtocolError::MessageTooLarge {
                size: partial,
                max: MAX_MESSAGE_SIZE,
            });
        }
        Ok(())
    }

    /// Take the next complete frame (without separator) from the buffer.
    ///
    /// An oversized frame is consumed and reported as an error, so callers
    /// can skip it and keep reading.
    pub fn next_frame(&mut self) -> ProtocolResult<Option<String>> {
        let end = match self.buffer.iter().position(|&b| b == RECORD_SEPARATOR) {
            Some(pos) => pos,
            None => return Ok(None), // Incomplete
        };

        let frame = self.buffer.split_to(end + 1);
        if end > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: end,
                max: MAX_MESSAGE_SIZE,
            });
        }
        let text = std::str::from_utf8(&frame[..end]).map_err(|_| ProtocolError::InvalidUtf8)?;

        Ok(Some(text.to_string()))
    }

    /// Try to parse the next complete hub message from the buffer
    pub fn parse(&mut self) -> ProtocolResult<Option<HubMessage>> {
        match self.next_frame()? {
            Some(frame) => HubMessage::decode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Bytes buffered but not yet parsed
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_frame() {
        let mut parser = Parser::new();
        parser.feed(b"{\"type\":6}\x1e").unwrap();

        let msg = parser.parse().unwrap().unwrap();
        assert_eq!(msg, HubMessage::Ping);
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_parse_batched_frames() {
        let mut parser = Parser::new();
        parser
            .feed(b"{\"type\":6}\x1e{\"type\":3,\"invocationId\":\"1\"}\x1e")
            .unwrap();

        assert_eq!(parser.parse().unwrap(), Some(HubMessage::Ping));
        assert!(matches!(
            parser.parse().unwrap(),
            Some(HubMessage::Completion { ref invocation_id, .. }) if invocation_id == "1"
        ));
        assert!(parser.parse().unwrap().is_none());
    }

    #[test]
    fn test_incomplete_frame() {
        let mut parser = Parser::new();
        parser.feed(b"{\"type\":").unwrap();

        assert!(parser.parse().unwrap().is_none());

        parser.feed(b"6}\x1e").unwrap();
        assert!(parser.parse().unwrap().is_some());
    }

    #[test]
    fn test_handshake_frame_is_raw() {
        let mut parser = Parser::new();
        parser.feed(b"{}\x1e").unwrap();
        assert_eq!(parser.next_frame().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_oversized_input_rejected() {
        let mut parser = Parser::new();
        let big = vec![b'a'; MAX_MESSAGE_SIZE + 1];

        assert!(matches!(
            parser.feed(&big),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
        assert_eq!(parser.pending(), 0);
    }

    /// A frame of roughly `size` bytes carrying a `UserLeft` event
    fn big_frame(size: usize) -> Vec<u8> {
        let name = "x".repeat(size);
        let mut frame = format!(
            r#"{{"type":1,"target":"UserLeft","arguments":["{}"]}}"#,
            name
        )
        .into_bytes();
        frame.push(RECORD_SEPARATOR);
        frame
    }

    #[test]
    fn test_batched_large_frames_within_limit() {
        let mut parser = Parser::new();
        let mut chunk = big_frame(600 * 1024);
        chunk.extend(big_frame(600 * 1024));
        chunk.extend_from_slice(b"{\"type\":3,\"invocationId\":\"1\"}\x1e");

        parser.feed(&chunk).unwrap();

        for _ in 0..2 {
            assert!(matches!(
                parser.parse().unwrap(),
                Some(HubMessage::Invocation { ref target, .. }) if target == "UserLeft"
            ));
        }
        assert!(matches!(
            parser.parse().unwrap(),
            Some(HubMessage::Completion { ref invocation_id, .. }) if invocation_id == "1"
        ));
        assert_eq!(parser.pending(), 0);
    }

    #[test]
    fn test_oversized_frame_skipped() {
        let mut parser = Parser::new();
        let mut chunk = big_frame(MAX_MESSAGE_SIZE + 10);
        chunk.extend_from_slice(b"{\"type\":6}\x1e");

        parser.feed(&chunk).unwrap();

        assert!(matches!(
            parser.parse(),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
        assert_eq!(parser.parse().unwrap(), Some(HubMessage::Ping));
    }

    #[test]
    fn test_oversized_partial_keeps_complete_frames() {
        let mut parser = Parser::new();
        let mut chunk = b"{\"type\":6}\x1e".to_vec();
        chunk.extend(vec![b'a'; MAX_MESSAGE_SIZE + 1]);

        assert!(matches!(
            parser.feed(&chunk),
            Err(ProtocolError::MessageTooLarge { .. })
        ));
        assert_eq!(parser.parse().unwrap(), Some(HubMessage::Ping));
        assert!(parser.parse().unwrap().is_none());

        // The tail of the dropped frame is ignored up to its separator
        parser.feed(b"aaaa\x1e{\"type\":6}\x1e").unwrap();
        assert_eq!(parser.parse().unwrap(), Some(HubMessage::Ping));
        assert_eq!(parser.pending(), 0);
    }
}
