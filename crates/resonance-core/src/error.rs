//! Error types for resonance-core

/// Errors surfaced by the fallible entry points of this crate: untyped
/// event intake and node key parsing.
///
/// Storage failures never reach callers as errors. Hydration and persistence
/// log them and reflect them in the returned reports instead.
#[derive(Debug, thiserror::Error)]
pub enum ResonanceError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("invalid payload for {event}: {message}")]
    InvalidPayload { event: String, message: String },

    #[error("unknown {kind}: {value}")]
    UnknownKind { kind: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ResonanceError>;
