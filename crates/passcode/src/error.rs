//! Error types for the passcode store.
//!
//! Exhaustion is deliberately absent from this enum. Running out of codes is an
//! expected outcome of [`CodeStore::next`] and is reported through
//! [`Dispense::OutOfCodes`] instead.
//!
//! ## Error Cases
//! - `InvalidCodeFormat`: A batch handed to [`CodeStore::replace`] contained a
//!   code of the wrong width or alphabet, or more codes than there are slots.
//! - `InvalidLayout`: A store was configured with a code width outside
//!   `1..=MAX_CODE_WIDTH`.
//! - `StoreUnavailable`: The backing resource could not be opened, read,
//!   written, or synced.
//! - `CorruptState`: The persisted bytes do not describe a valid store.
//!
//! [`CodeStore::next`]: crate::CodeStore::next
//! [`CodeStore::replace`]: crate::CodeStore::replace
//! [`Dispense::OutOfCodes`]: crate::Dispense::OutOfCodes

use std::io;

pub type Result<T, E = StoreError> = core::result::Result<T, E>;

/// All errors the store can produce.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// A code batch was rejected before anything was written.
    #[error("invalid code format: {reason}")]
    InvalidCodeFormat { reason: String },

    /// The requested code width cannot describe a store.
    #[error("invalid layout: code width {width} outside 1..={max}")]
    InvalidLayout { width: usize, max: usize },

    /// I/O against the backing resource failed.
    #[error("store unavailable while {context}: {source}")]
    StoreUnavailable {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// The persisted bytes are not a valid store image.
    ///
    /// Never coerced to a default position: the request that observed it fails.
    #[error("corrupt store state: {reason}")]
    CorruptState { reason: String },
}

impl StoreError {
    pub(crate) fn invalid_code(reason: impl Into<String>) -> Self {
        Self::InvalidCodeFormat {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptState {
            reason: reason.into(),
        }
    }

    /// Returns a closure suitable for `map_err` on an [`io::Result`].
    pub(crate) fn unavailable(context: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::StoreUnavailable { context, source }
    }

    /// `true` for failures that leave the store untouched and are the caller's
    /// fault.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidCodeFormat { .. })
    }
}
