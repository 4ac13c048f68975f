use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec};

use super::error::CodecError;

/// Newline-delimited frames. Unlike a bare `LinesCodec`, bytes left without a
/// terminator when the peer hangs up are an error rather than a last line.
#[derive(Debug, Clone)]
pub struct CommandCodec {
    lines: LinesCodec,
}

impl CommandCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            lines: LinesCodec::new_with_max_length(max_length),
        }
    }
}

impl Decoder for CommandCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        Ok(self.lines.decode(buf)?)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        match self.lines.decode(buf)? {
            Some(line) => Ok(Some(line)),
            None if buf.is_empty() => Ok(None),
            None => {
                let pending = buf.len();
                buf.clear();
                Err(CodecError::PartialFrame(pending))
            }
        }
    }
}

impl Encoder<String> for CommandCodec {
    type Error = CodecError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), CodecError> {
        self.lines.encode(line, dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_lines_and_strips_carriage_return() {
        let mut codec = CommandCodec::new(64);
        let mut buf = BytesMut::from("status\r\ngoto,a=1\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("status"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("goto,a=1"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_partial_frame_at_eof_is_an_error() {
        let mut codec = CommandCodec::new(64);
        let mut buf = BytesMut::from("goto,a=");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(CodecError::PartialFrame(7))
        ));
    }

    #[test]
    fn test_clean_eof() {
        let mut codec = CommandCodec::new(64);
        let mut buf = BytesMut::new();
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = CommandCodec::new(64);
        let mut buf = BytesMut::new();
        codec.encode("OK\na=OK".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"OK\na=OK\n");
    }
}
