use crate::{
    cursor::Cursor,
    error::{Result, StoreError},
    layout::{CURSOR_OFFSET, Code, EMPTY_BYTE, Layout, SLOT_COUNT},
    medium::{FileMedium, Medium},
    status::Dispense,
};
use core::fmt;
use parking_lot::Mutex;
use std::path::Path;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How a replace treats the slots past the end of a short batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchPolicy {
    /// Slots past the batch are cleared, so dispensing stops exactly at the end
    /// of the batch with [`Dispense::OutOfCodes`].
    #[default]
    Bounded,
    /// Slots past the batch keep whatever an earlier batch left there, and are
    /// dispensed after the new codes. Only slots that have never held a code
    /// stop dispensing early.
    Legacy,
}

/// Construction options for a [`CodeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreOptions {
    pub layout: Layout,
    pub batch_policy: BatchPolicy,
}

impl StoreOptions {
    pub const fn new(layout: Layout, batch_policy: BatchPolicy) -> Self {
        Self {
            layout,
            batch_policy,
        }
    }
}

/// A durable rotating store of one-time passcodes.
///
/// The store owns a single [`Medium`] holding one record of
/// `1 + SLOT_COUNT * width` bytes: a [`Cursor`] marker followed by
/// [`SLOT_COUNT`] fixed-width code slots (see [`crate::layout`]).
///
/// Every operation runs its read-compute-write cycle while holding the store
/// lock, so concurrent callers observe each [`replace`](Self::replace) and
/// [`next`](Self::next) as a single step. Two concurrent `next` calls can never
/// read the same cursor position.
///
/// ## See Also
/// - [`Dispense`]
/// - [`BatchPolicy`]
pub struct CodeStore<M: Medium = FileMedium> {
    medium: Mutex<M>,
    options: StoreOptions,
}

impl CodeStore<FileMedium> {
    /// Opens the store kept in the file at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::StoreUnavailable`] if the file cannot be opened or
    ///   initialized.
    /// - [`StoreError::CorruptState`] if an existing file does not match the
    ///   layout size.
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let medium =
            FileMedium::open(path).map_err(StoreError::unavailable("opening store file"))?;
        Self::with_medium(medium, options)
    }
}

impl<M: Medium> CodeStore<M> {
    /// Builds a store over an arbitrary medium.
    ///
    /// An empty medium is initialized to the blank image: cursor exhausted and
    /// every slot empty. A non-empty medium must already be exactly
    /// `options.layout.size()` bytes long. The cursor byte is not checked here,
    /// so a store with a damaged cursor can still be repaired by a replace.
    ///
    /// # Errors
    ///
    /// - [`StoreError::StoreUnavailable`] on I/O failure.
    /// - [`StoreError::CorruptState`] on a size mismatch.
    pub fn with_medium(mut medium: M, options: StoreOptions) -> Result<Self> {
        let expected = options.layout.size() as u64;
        let len = medium
            .byte_len()
            .map_err(StoreError::unavailable("reading store length"))?;

        if len == 0 {
            medium
                .write_at(0, &options.layout.blank())
                .map_err(StoreError::unavailable("initializing store"))?;
            medium
                .sync()
                .map_err(StoreError::unavailable("syncing new store"))?;
            #[cfg(feature = "tracing")]
            tracing::info!(bytes = expected, "Initialized empty passcode store");
        } else if len != expected {
            return Err(StoreError::corrupt(format!(
                "store is {len} bytes, layout for width {} needs {expected}",
                options.layout.width()
            )));
        }

        Ok(Self {
            medium: Mutex::new(medium),
            options,
        })
    }

    pub const fn layout(&self) -> Layout {
        self.options.layout
    }

    pub const fn batch_policy(&self) -> BatchPolicy {
        self.options.batch_policy
    }

    /// Overwrites the store with a new batch and resets the cursor to `P0`.
    ///
    /// Code `k` of the batch lands in slot `k`. The whole batch is validated
    /// before the lock is taken, so a rejected batch leaves the store exactly
    /// as it was. Accepted batches are written as one contiguous block starting
    /// at the cursor byte, then synced.
    ///
    /// Slots past the end of the batch are cleared under
    /// [`BatchPolicy::Bounded`] and left alone under [`BatchPolicy::Legacy`].
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidCodeFormat`] if more than [`SLOT_COUNT`] codes
    ///   are given, or any code does not fit the layout.
    /// - [`StoreError::StoreUnavailable`] if the write or sync fails. The
    ///   previous bytes are written back first, so the old batch and cursor
    ///   stay in effect.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all, fields(count = codes.len())))]
    pub fn replace<S: AsRef<str>>(&self, codes: &[S]) -> Result<()> {
        let layout = self.options.layout;

        if codes.len() > SLOT_COUNT {
            return Err(StoreError::invalid_code(format!(
                "batch of {} codes exceeds the {SLOT_COUNT} available slots",
                codes.len()
            )));
        }

        let codes = codes
            .iter()
            .map(|raw| Code::parse(raw.as_ref(), layout))
            .collect::<Result<Vec<_>>>()?;

        let block_len = match self.options.batch_policy {
            BatchPolicy::Bounded => layout.size(),
            BatchPolicy::Legacy => 1 + codes.len() * layout.width(),
        };
        let mut block = vec![EMPTY_BYTE; block_len];
        block[CURSOR_OFFSET] = Cursor::START.to_byte();
        for (slot, code) in codes.iter().enumerate() {
            block[layout.slot_range(slot)].copy_from_slice(code.as_bytes());
        }

        let mut medium = self.medium.lock();
        let mut previous = vec![EMPTY_BYTE; block_len];
        medium
            .read_at(CURSOR_OFFSET as u64, &mut previous)
            .map_err(StoreError::unavailable("reading previous batch"))?;
        write_synced(&mut *medium, &block, &previous, "writing batch", "syncing batch")?;

        #[cfg(feature = "tracing")]
        tracing::debug!(policy = ?self.options.batch_policy, "Replaced passcode batch");
        Ok(())
    }

    /// Takes the code at the cursor and advances the cursor.
    ///
    /// - Cursor at `Pi` holding a code: returns it and persists `P(i+1)`, or
    ///   `Exhausted` after `P9`.
    /// - Cursor at `Pi` whose slot is empty: persists `Exhausted` and returns
    ///   [`Dispense::OutOfCodes`].
    /// - Cursor `Exhausted`: returns [`Dispense::OutOfCodes`] without writing.
    ///
    /// # Errors
    ///
    /// - [`StoreError::StoreUnavailable`] on I/O failure. If the cursor write
    ///   or its sync fails, the previous cursor is written back, so the code
    ///   under it is handed out by a later call.
    /// - [`StoreError::CorruptState`] if the cursor byte or the slot under it is
    ///   invalid.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn next(&self) -> Result<Dispense> {
        let layout = self.options.layout;
        let mut medium = self.medium.lock();

        let cursor = read_cursor(&mut *medium)?;
        let Some(slot) = cursor.slot() else {
            return Ok(Dispense::OutOfCodes);
        };

        let mut raw = vec![0u8; layout.width()];
        medium
            .read_at(layout.slot_offset(slot) as u64, &mut raw)
            .map_err(StoreError::unavailable("reading code slot"))?;

        let (dispense, next) = match layout.decode_slot(slot, &raw)? {
            Some(code) => (
                Dispense::Ready {
                    code: code.into_string(),
                },
                cursor.advance(),
            ),
            None => (Dispense::OutOfCodes, Cursor::Exhausted),
        };

        write_synced(
            &mut *medium,
            &[next.to_byte()],
            &[cursor.to_byte()],
            "writing cursor",
            "syncing cursor",
        )?;

        #[cfg(feature = "tracing")]
        tracing::debug!(from = %cursor, to = %next, ready = dispense.is_ready(), "Advanced cursor");
        Ok(dispense)
    }

    /// Reads the current cursor without changing anything.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next), minus the slot checks.
    pub fn cursor(&self) -> Result<Cursor> {
        let mut medium = self.medium.lock();
        read_cursor(&mut *medium)
    }

    /// Copies the whole persisted record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`] if the read fails.
    pub fn image(&self) -> Result<Vec<u8>> {
        let mut image = vec![0u8; self.options.layout.size()];
        self.medium
            .lock()
            .read_at(0, &mut image)
            .map_err(StoreError::unavailable("reading store image"))?;
        Ok(image)
    }

    /// Consumes the store and returns its medium.
    pub fn into_medium(self) -> M {
        self.medium.into_inner()
    }
}

impl<M: Medium> fmt::Debug for CodeStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeStore")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn read_cursor<M: Medium + ?Sized>(medium: &mut M) -> Result<Cursor> {
    let mut byte = [0u8; 1];
    medium
        .read_at(CURSOR_OFFSET as u64, &mut byte)
        .map_err(StoreError::unavailable("reading cursor"))?;
    Cursor::from_byte(byte[0])
}

/// Writes `block` at the cursor offset and syncs it. If either step fails,
/// `previous` is written back so the caller's failed request leaves the store
/// as it found it. The restore is best effort.
fn write_synced<M: Medium + ?Sized>(
    medium: &mut M,
    block: &[u8],
    previous: &[u8],
    write_context: &'static str,
    sync_context: &'static str,
) -> Result<()> {
    let result = medium
        .write_at(CURSOR_OFFSET as u64, block)
        .map_err(StoreError::unavailable(write_context))
        .and_then(|()| {
            medium
                .sync()
                .map_err(StoreError::unavailable(sync_context))
        });

    if result.is_err() {
        let restored = medium
            .write_at(CURSOR_OFFSET as u64, previous)
            .and_then(|()| medium.sync());
        if let Err(e) = restored {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to restore store after failed write: {e}");
            #[cfg(not(feature = "tracing"))]
            let _ = e;
        }
    }
    result
}
