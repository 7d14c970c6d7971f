//! The runtime's closed error taxonomy.
//!
//! Every fallible operation in the object kernel, the property system, the
//! signal path and the streaming/config-client layers returns a [`DaqError`]
//! drawn from this fixed set of [`ErrorKind`]s. The taxonomy is deliberately
//! closed: new failure modes are expressed as a `message` on an existing
//! kind rather than by growing the enum, so that callers written against
//! `match err.kind() { ... }` keep exhaustively compiling as the runtime
//! grows.
//!
//! `Ignored` is the one outcome in the set that is not really a failure: it
//! means the operation was accepted but had no effect (a locked attribute,
//! a no-op value write, a component already in the requested state). No
//! event fires for an `Ignored` outcome, but the call still returns `Ok`
//! from the caller's point of view in most of the API surface above this
//! module - `DaqError::Ignored` exists mainly so that internal helpers can
//! propagate the "nothing happened" signal with `?` and let the caller
//! decide whether that is worth reporting.

use std::fmt;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    ArgumentNull,
    InvalidParameter,
    InvalidState,
    InvalidOperation,
    NotFound,
    DuplicateItem,
    AlreadyExists,
    Frozen,
    /// Operation accepted but had no effect; see module docs.
    Ignored,
    NotImplemented,
    NotSupported,
    NoInterface,
    OutOfMemory,
    GeneralError,
    ComponentRemoved,
    PacketStreaming,
    Auth,
    AccessDenied,
}

impl ErrorKind {
    /// Short machine-stable tag, handy for log fields and metrics.
    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::ArgumentNull => "argument_null",
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidOperation => "invalid_operation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::DuplicateItem => "duplicate_item",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::Frozen => "frozen",
            ErrorKind::Ignored => "ignored",
            ErrorKind::NotImplemented => "not_implemented",
            ErrorKind::NotSupported => "not_supported",
            ErrorKind::NoInterface => "no_interface",
            ErrorKind::OutOfMemory => "out_of_memory",
            ErrorKind::GeneralError => "general_error",
            ErrorKind::ComponentRemoved => "component_removed",
            ErrorKind::PacketStreaming => "packet_streaming",
            ErrorKind::Auth => "auth",
            ErrorKind::AccessDenied => "access_denied",
        }
    }
}

/// The runtime's single error type. Carries a [`ErrorKind`], a human message
/// and an optional source string recorded at the point of failure - a plain
/// field rather than thread-local state, since nothing in the runtime reads
/// errors out of band.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?}: {message}{}", source.as_ref().map(|s| format!(" (from {s})")).unwrap_or_default())]
pub struct DaqError {
    kind: ErrorKind,
    message: String,
    source: Option<String>,
    #[source]
    cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl DaqError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
            cause: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_tag(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// True for the success-shaped `Ignored` outcome: the operation was
    /// accepted but elided, no event fired, and callers usually want to
    /// treat this as "nothing to do" rather than propagate it as a hard
    /// failure.
    pub fn is_ignored(&self) -> bool {
        matches!(self.kind, ErrorKind::Ignored)
    }
}

macro_rules! ctor {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        pub fn $name(message: impl Into<String>) -> DaqError {
            DaqError::new(ErrorKind::$kind, message)
        }
    };
}

ctor!(
    /// Build an [`ErrorKind::ArgumentNull`] error.
    argument_null => ArgumentNull
);
ctor!(invalid_parameter => InvalidParameter);
ctor!(invalid_state => InvalidState);
ctor!(invalid_operation => InvalidOperation);
ctor!(not_found => NotFound);
ctor!(duplicate_item => DuplicateItem);
ctor!(already_exists => AlreadyExists);
ctor!(frozen => Frozen);
ctor!(ignored => Ignored);
ctor!(not_implemented => NotImplemented);
ctor!(not_supported => NotSupported);
ctor!(no_interface => NoInterface);
ctor!(out_of_memory => OutOfMemory);
ctor!(general_error => GeneralError);
ctor!(component_removed => ComponentRemoved);
ctor!(packet_streaming => PacketStreaming);
ctor!(auth => Auth);
ctor!(access_denied => AccessDenied);

/// Crate-wide result alias; mirrors the rest of the API's preference for a
/// single default error type over ad hoc `Result<T, X>` spellings.
pub type DaqResult<T> = std::result::Result<T, DaqError>;

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_is_not_a_hard_failure_marker() {
        let err = ignored("attribute locked");
        assert!(err.is_ignored());
        assert_eq!(err.kind(), ErrorKind::Ignored);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = not_found("property 'Gain'");
        let rendered = format!("{err}");
        assert!(rendered.contains("NotFound"));
        assert!(rendered.contains("Gain"));
    }

    #[test]
    fn cause_chain_is_reachable_through_std_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = general_error("load failed").with_cause(io_err);
        let source = std::error::Error::source(&err).expect("cause should be present");
        assert_eq!(source.to_string(), "boom");
    }
}
