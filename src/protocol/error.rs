use std::num::ParseFloatError;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use super::client_command::Verb;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0}")]
    UnknownCommand(String),
    #[error("invalid stage selection '{0}'")]
    InvalidSlot(String),
    #[error("unknown axis '{0}'")]
    UnknownAxis(char),
    #[error("expected <axis>=<value>, got '{0}'")]
    MissingValue(String),
    #[error("unexpected value in '{0}'")]
    UnexpectedValue(String),
    #[error("expected args float or int = {source} in '{arg}'")]
    InvalidNumber {
        arg: String,
        source: ParseFloatError,
    },
    #[error("expected a finite number in '{0}'")]
    NonFinite(String),
    #[error("no axes given for {0}")]
    NoTargets(Verb),
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line exceeds the maximum length")]
    LineTooLong,
    #[error("peer disconnected mid-line ({0} bytes unterminated)")]
    PartialFrame(usize),
}

impl From<LinesCodecError> for CodecError {
    fn from(err: LinesCodecError) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => CodecError::LineTooLong,
            LinesCodecError::Io(e) => CodecError::Io(e),
        }
    }
}
