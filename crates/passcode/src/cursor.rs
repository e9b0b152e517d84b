use crate::{
    error::{Result, StoreError},
    layout::SLOT_COUNT,
};
use core::fmt;

/// Persisted marker for [`Cursor::Exhausted`].
pub const EXHAUSTED_MARKER: u8 = b'x';

/// Position of the next code to dispense.
///
/// The cursor has exactly eleven states: a slot position `P0..=P9`, or
/// [`Cursor::Exhausted`]. Position zero and exhaustion are distinct states, so
/// a freshly replaced store and a fully drained one are never confused.
///
/// ```text
/// replace:  any     -> P0
/// next:     Pi      -> P(i+1)     (i < 9)
///           P9      -> Exhausted
///           Exhausted -> Exhausted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cursor {
    /// The next code to dispense lives in this slot. Always below
    /// [`SLOT_COUNT`].
    At(u8),
    /// Every slot of the current batch has been consumed.
    Exhausted,
}

impl Cursor {
    /// The state immediately after a replace.
    pub const START: Self = Self::At(0);

    /// Decodes the persisted marker byte.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptState`] for any byte other than `b'0'` to
    /// `b'9'` or [`EXHAUSTED_MARKER`].
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            b'0'..=b'9' => Ok(Self::At(byte - b'0')),
            EXHAUSTED_MARKER => Ok(Self::Exhausted),
            other => Err(StoreError::corrupt(format!(
                "cursor marker 0x{other:02x} is not one of '0'..='9' or 'x'"
            ))),
        }
    }

    /// Encodes the cursor as its persisted marker byte.
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::At(i) => b'0' + i,
            Self::Exhausted => EXHAUSTED_MARKER,
        }
    }

    /// The state after one code has been dispensed from this one.
    pub const fn advance(self) -> Self {
        match self {
            Self::At(i) if (i as usize) + 1 < SLOT_COUNT => Self::At(i + 1),
            _ => Self::Exhausted,
        }
    }

    /// Slot index for a positioned cursor.
    pub const fn slot(self) -> Option<usize> {
        match self {
            Self::At(i) => Some(i as usize),
            Self::Exhausted => None,
        }
    }

    pub const fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(i) => write!(f, "P{i}"),
            Self::Exhausted => f.write_str("Exhausted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_valid_marker_round_trips() {
        for byte in (b'0'..=b'9').chain([EXHAUSTED_MARKER]) {
            assert_eq!(Cursor::from_byte(byte).unwrap().to_byte(), byte);
        }
    }

    #[test]
    fn invalid_markers_are_corrupt_not_coerced() {
        for byte in [0u8, b'/', b':', b'X', b'a', b' ', 0xff] {
            let err = Cursor::from_byte(byte).unwrap_err();
            assert!(matches!(err, StoreError::CorruptState { .. }), "{byte:#x}");
        }
    }

    #[test]
    fn advance_walks_p0_through_p9_then_exhausts() {
        let mut cursor = Cursor::START;
        for i in 0..SLOT_COUNT {
            assert_eq!(cursor.slot(), Some(i));
            cursor = cursor.advance();
        }
        assert_eq!(cursor, Cursor::Exhausted);
        assert_eq!(cursor.advance(), Cursor::Exhausted);
    }

    #[test]
    fn p9_never_wraps_to_p0() {
        assert_eq!(Cursor::At(9).advance(), Cursor::Exhausted);
        assert_ne!(Cursor::At(9).advance(), Cursor::START);
    }
}
