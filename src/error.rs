use thiserror::Error;

use crate::ast::Segment;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single source line could not be turned into a command.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParseErrorKind {
    #[error("unrecognized mnemonic `{0}`")]
    UnrecognizedMnemonic(String),
    #[error("malformed operands for `{mnemonic}` in `{text}`")]
    MalformedOperands { mnemonic: String, text: String },
    #[error("unknown segment `{0}`")]
    UnknownSegment(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number in the unit's source text.
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// A command that parsed fine but has no valid translation.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CodegenError {
    #[error("cannot {operation} the {segment} segment")]
    InvalidSegmentForOperation {
        segment: Segment,
        operation: &'static str,
    },
    #[error("index {index} is out of range for the {segment} segment (max {max})")]
    IndexOutOfRange {
        segment: Segment,
        index: u16,
        max: u16,
    },
    #[error("call passes {args} arguments (max {max})")]
    TooManyArguments { args: u16, max: u16 },
    #[error("label `{0}` is defined more than once")]
    DuplicateLabel(String),
    #[error("`{0}` names both a label and a static variable")]
    StaticClash(String),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("{unit}: {error}")]
    Parse { unit: String, error: ParseError },
    #[error("{unit}: line {line}: {error}")]
    Codegen {
        unit: String,
        /// Source line of the command, or its 1-based position when the unit
        /// was built from commands directly.
        line: usize,
        error: CodegenError,
    },
}

impl Error {
    pub fn unit(&self) -> &str {
        match self {
            Error::Parse { unit, .. } | Error::Codegen { unit, .. } => unit,
        }
    }
}

#[test]
fn test_messages_carry_location() {
    let err = Error::Parse {
        unit: "Main".to_string(),
        error: ParseError {
            line: 4,
            kind: ParseErrorKind::UnrecognizedMnemonic("psh".to_string()),
        },
    };
    assert_eq!(err.to_string(), "Main: line 4: unrecognized mnemonic `psh`");

    let err = Error::Codegen {
        unit: "Sys".to_string(),
        line: 2,
        error: CodegenError::InvalidSegmentForOperation {
            segment: Segment::Constant,
            operation: "pop",
        },
    };
    assert_eq!(err.to_string(), "Sys: line 2: cannot pop the constant segment");
    assert_eq!(err.unit(), "Sys");
}
