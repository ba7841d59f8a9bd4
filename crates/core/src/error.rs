//! The failure kinds jadep distinguishes.
//!
//! Each variant maps to a different recovery policy: a file that won't
//! parse is skipped, a failed package load aborts the invocation, a
//! malformed label in a rule attribute is silently discarded at the
//! accessor boundary, and cancellation unwinds promptly. Keeping the
//! taxonomy in one enum lets every crate agree on those policies without
//! inspecting error strings.

use thiserror::Error;

/// Alias used by all jadep crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Anything that can go wrong while computing missing dependencies.
#[derive(Error, Debug)]
pub enum Error {
    /// A file, directory or socket could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unusable flags, a missing WORKSPACE file, or similar setup trouble.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A Java source could not be parsed. The file is skipped; other
    /// files keep being processed.
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    /// A string that should have been a Bazel label wasn't one.
    #[error("Label syntax error: {0}")]
    Label(String),

    /// A rule attribute did not have the requested type.
    #[error("Attribute error: {0}")]
    Attribute(String),

    /// At least one package in a load batch failed. Deliberately not
    /// correlated to specific packages; callers must not try.
    #[error("Load error: {0}")]
    Load(String),

    /// The package-server connection broke down: dialing, framing, or an
    /// error reply.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// buildozer refused or failed to apply an edit.
    #[error("Editor error: {0}")]
    Editor(String),

    /// The operation was called off before it finished. Workers seeing
    /// this return promptly.
    #[error("Operation cancelled")]
    Cancelled,

    /// A caller handed us something unusable (empty name, bad regex, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A foreign error plus what jadep was doing when it happened.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Escape hatch for errors the taxonomy has no slot for.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Shorthand constructors so call sites read `Error::load(msg)` rather
/// than spelling out variants and conversions.
impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn label(msg: impl Into<String>) -> Self {
        Self::Label(msg.into())
    }

    pub fn attribute(msg: impl Into<String>) -> Self {
        Self::Attribute(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    pub fn editor(msg: impl Into<String>) -> Self {
        Self::Editor(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wraps a foreign error with a note on the operation in progress.
    pub fn with_context<E>(context: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
