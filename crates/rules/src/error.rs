//! Error types for rule document loading, editing and persistence.

use std::fmt;
use std::process::ExitStatus;

/// Errors that can occur while loading, editing or storing a rules document.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Input was not text (non-string YAML value, non-UTF-8 bytes).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// YAML syntax error with a known position (1-based).
    #[error("There is a syntax error in the rules line: {line} column: {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// YAML syntax error the parser could not locate.
    #[error("There is a syntax error in the rules: {0}")]
    SyntaxUnlocated(String),

    /// The parsed document holds no data at all.
    #[error("The rules must have data in it.")]
    Empty,

    /// The document root is a scalar or a sequence.
    #[error("The rules document root must be a mapping.")]
    NotAMapping,

    /// A canonical attribute carries a value of the wrong shape.
    #[error("`{field}` must be {expected}")]
    InvalidFieldType {
        field: &'static str,
        expected: &'static str,
    },

    /// A top-level key outside the closed schema.
    #[error("{0} isn't a valid rule attribute.")]
    UnknownField(String),

    /// `EDITOR` is unset or empty.
    #[error("no editor configured: please add \"export EDITOR='subl -w'\" to your profile or something equivalent")]
    NoEditor,

    /// The editor process exited unsuccessfully.
    #[error("editor '{program}' exited with {status}")]
    EditorFailed { program: String, status: ExitStatus },

    /// Filesystem or process I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML emit error.
    #[error("YAML serialize error: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// No stored document with the given name.
    #[error("no rules document found for '{0}'")]
    NotFound(String),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// Coarse classification of a [`RuleError`], for callers that branch on the
/// failure category rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    MalformedInput,
    UnknownField,
    Configuration,
    Editor,
    Io,
    Serialize,
    NotFound,
}

impl RuleError {
    /// The failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuleError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RuleError::Syntax { .. }
            | RuleError::SyntaxUnlocated(_)
            | RuleError::Empty
            | RuleError::NotAMapping
            | RuleError::InvalidFieldType { .. } => ErrorKind::MalformedInput,
            RuleError::UnknownField(_) => ErrorKind::UnknownField,
            RuleError::NoEditor => ErrorKind::Configuration,
            RuleError::EditorFailed { .. } => ErrorKind::Editor,
            RuleError::Io(_) => ErrorKind::Io,
            RuleError::Serialize(_) => ErrorKind::Serialize,
            RuleError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Wrap a YAML parse error, keeping its position when the parser reports one.
    ///
    /// The parser appends `at line L column C` to located messages; that part
    /// is dropped since `Syntax` renders the position itself.
    pub(crate) fn from_parse(err: serde_yaml::Error) -> Self {
        match err.location() {
            Some(loc) => {
                let suffix = format!(" at line {} column {}", loc.line(), loc.column());
                RuleError::Syntax {
                    line: loc.line(),
                    column: loc.column(),
                    message: err.to_string().replacen(&suffix, "", 1),
                }
            }
            None => RuleError::SyntaxUnlocated(err.to_string()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "InvalidArgument"),
            ErrorKind::MalformedInput => write!(f, "MalformedInput"),
            ErrorKind::UnknownField => write!(f, "UnknownField"),
            ErrorKind::Configuration => write!(f, "Configuration"),
            ErrorKind::Editor => write!(f, "Editor"),
            ErrorKind::Io => write!(f, "Io"),
            ErrorKind::Serialize => write!(f, "Serialize"),
            ErrorKind::NotFound => write!(f, "NotFound"),
        }
    }
}
