//! # Record Layout
//!
//! The store is a single fixed-size record:
//!
//! ```text
//! byte 0            cursor marker, b'0'..=b'9' or b'x'
//! bytes [1, 1+W)    slot 0
//! bytes [1+W, 1+2W) slot 1
//! ...
//! bytes [1+9W, 1+10W) slot 9
//! ```
//!
//! With the default width of 7 the record is exactly 71 bytes. Fixed-width
//! slots give O(1) addressing of any slot and let a whole batch be written in
//! one contiguous block.
//!
//! A slot made entirely of NUL bytes is *empty*: it has never held a code, or
//! was cleared by a bounded replace. Empty slots are never dispensed.

use crate::error::{Result, StoreError};
use core::fmt;
use core::ops::Range;

/// Number of code slots in every store.
pub const SLOT_COUNT: usize = 10;

/// Offset of the cursor marker byte.
pub const CURSOR_OFFSET: usize = 0;

/// Code width used by the reference deployment.
pub const DEFAULT_CODE_WIDTH: usize = 7;

/// Widest code a store will accept.
pub const MAX_CODE_WIDTH: usize = 64;

/// Filler byte for empty slots.
pub(crate) const EMPTY_BYTE: u8 = 0;

/// Geometry of a store image for a given code width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    width: usize,
}

impl Layout {
    /// Creates a layout for codes of exactly `width` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidLayout`] if `width` is zero or larger than
    /// [`MAX_CODE_WIDTH`].
    pub fn new(width: usize) -> Result<Self> {
        if width == 0 || width > MAX_CODE_WIDTH {
            return Err(StoreError::InvalidLayout {
                width,
                max: MAX_CODE_WIDTH,
            });
        }
        Ok(Self { width })
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// Total size of the store image in bytes: `1 + SLOT_COUNT * width`.
    pub const fn size(&self) -> usize {
        1 + SLOT_COUNT * self.width
    }

    /// Byte offset of slot `index`.
    ///
    /// `index` must be below [`SLOT_COUNT`].
    pub const fn slot_offset(&self, index: usize) -> usize {
        debug_assert!(index < SLOT_COUNT);
        1 + self.width * index
    }

    /// Byte range covered by slot `index`.
    pub const fn slot_range(&self, index: usize) -> Range<usize> {
        let start = self.slot_offset(index);
        start..start + self.width
    }

    /// An image with the cursor exhausted and every slot empty.
    ///
    /// This is what a store looks like before its first replace.
    pub fn blank(&self) -> Vec<u8> {
        let mut image = vec![EMPTY_BYTE; self.size()];
        image[CURSOR_OFFSET] = crate::Cursor::Exhausted.to_byte();
        image
    }

    /// Interprets the raw bytes of one slot.
    ///
    /// Returns `Ok(None)` for an empty slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptState`] when the bytes are neither empty
    /// nor a valid code.
    pub fn decode_slot(&self, index: usize, bytes: &[u8]) -> Result<Option<Code>> {
        if bytes.len() != self.width {
            return Err(StoreError::corrupt(format!(
                "slot {index} is {} bytes, expected {}",
                bytes.len(),
                self.width
            )));
        }
        if bytes.iter().all(|&b| b == EMPTY_BYTE) {
            return Ok(None);
        }
        if !bytes.iter().copied().all(is_code_byte) {
            return Err(StoreError::corrupt(format!(
                "slot {index} holds non-code bytes {bytes:02x?}"
            )));
        }
        // All bytes are printable ASCII, so this cannot fail.
        let code = core::str::from_utf8(bytes)
            .map_err(|e| StoreError::corrupt(format!("slot {index}: {e}")))?;
        Ok(Some(Code(code.to_owned())))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: DEFAULT_CODE_WIDTH,
        }
    }
}

/// Printable, non-whitespace ASCII.
const fn is_code_byte(b: u8) -> bool {
    b.is_ascii_graphic()
}

/// A passcode validated against a [`Layout`].
///
/// Holds exactly `layout.width()` printable ASCII characters, so its byte
/// length equals its character count and it fits its slot with no padding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Code(String);

impl Code {
    /// Validates `raw` as a code for `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidCodeFormat`] if `raw` is not exactly
    /// `layout.width()` printable, non-whitespace ASCII characters.
    pub fn parse(raw: &str, layout: Layout) -> Result<Self> {
        if raw.len() != layout.width() {
            return Err(StoreError::invalid_code(format!(
                "code {raw:?} is {} bytes wide, expected {}",
                raw.len(),
                layout.width()
            )));
        }
        if let Some(bad) = raw.bytes().find(|&b| !is_code_byte(b)) {
            return Err(StoreError::invalid_code(format!(
                "code {raw:?} contains disallowed byte 0x{bad:02x}"
            )));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_layout_is_71_bytes() {
        let layout = Layout::default();
        assert_eq!(layout.size(), 71);
        assert_eq!(layout.slot_range(0), 1..8);
        assert_eq!(layout.slot_range(3), 22..29);
        assert_eq!(layout.slot_range(9), 64..71);
    }

    #[test]
    fn slots_tile_the_record_without_gaps() {
        for width in [1, 6, 7, 8, MAX_CODE_WIDTH] {
            let layout = Layout::new(width).unwrap();
            let mut expected_start = 1;
            for i in 0..SLOT_COUNT {
                let range = layout.slot_range(i);
                assert_eq!(range.start, expected_start);
                assert_eq!(range.len(), width);
                expected_start = range.end;
            }
            assert_eq!(expected_start, layout.size());
        }
    }

    #[test]
    fn width_bounds_are_enforced() {
        let err = Layout::new(0).unwrap_err();
        assert!(matches!(err, StoreError::InvalidLayout { width: 0, .. }));
        assert!(!err.is_invalid_input());
        assert!(Layout::new(MAX_CODE_WIDTH + 1).is_err());
        assert_eq!(Layout::new(MAX_CODE_WIDTH).unwrap().width(), MAX_CODE_WIDTH);
    }

    #[test]
    fn blank_image_is_exhausted_and_empty() {
        let layout = Layout::default();
        let image = layout.blank();
        assert_eq!(image.len(), 71);
        assert_eq!(image[0], b'x');
        for i in 0..SLOT_COUNT {
            assert_eq!(layout.decode_slot(i, &image[layout.slot_range(i)]).unwrap(), None);
        }
    }

    #[test]
    fn code_parse_rejects_wrong_width() {
        let layout = Layout::default();
        assert!(Code::parse("123456", layout).is_err());
        assert!(Code::parse("12345678", layout).is_err());
        assert_eq!(Code::parse("1234567", layout).unwrap().as_str(), "1234567");
    }

    #[test]
    fn code_parse_rejects_whitespace_control_and_non_ascii() {
        let layout = Layout::default();
        assert!(Code::parse("123 567", layout).is_err());
        assert!(Code::parse("123\0567", layout).is_err());
        // 'é' is two bytes, so this is seven bytes but six characters.
        assert!(Code::parse("12345é", layout).is_err());
    }

    #[test]
    fn decode_slot_round_trips_exact_bytes() {
        let layout = Layout::default();
        let decoded = layout.decode_slot(3, b"1234567").unwrap().unwrap();
        assert_eq!(decoded.as_str(), "1234567");
    }

    #[test]
    fn decode_slot_flags_partial_garbage() {
        let layout = Layout::default();
        let err = layout.decode_slot(2, b"12\03456").unwrap_err();
        assert!(matches!(err, StoreError::CorruptState { .. }));
    }
}
