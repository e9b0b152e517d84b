/// Represents the result of asking the store for the next code.
///
/// This type models the outcome of [`CodeStore::next`]:
///
/// - [`Dispense::Ready`] carries the code at the cursor, which has already
///   been advanced past it.
/// - [`Dispense::OutOfCodes`] means the current batch is used up. This is the
///   normal terminal state of every batch, not a failure, and it repeats until
///   the next replace.
///
/// # Example
///
/// ```
/// use passcode::{CodeStore, Dispense, MemoryMedium, StoreOptions};
///
/// let store = CodeStore::with_medium(MemoryMedium::default(), StoreOptions::default()).unwrap();
/// store.replace(&["1234567"]).unwrap();
///
/// match store.next().unwrap() {
///     Dispense::Ready { code } => assert_eq!(code, "1234567"),
///     Dispense::OutOfCodes => unreachable!(),
/// }
/// assert_eq!(store.next().unwrap(), Dispense::OutOfCodes);
/// ```
///
/// [`CodeStore::next`]: crate::CodeStore::next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispense {
    /// A code was taken from the store.
    Ready {
        /// The dispensed code, exactly one slot wide.
        code: String,
    },
    /// No code remains in the current batch.
    OutOfCodes,
}

impl Dispense {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Returns the code, or `None` when out of codes.
    pub fn into_code(self) -> Option<String> {
        match self {
            Self::Ready { code } => Some(code),
            Self::OutOfCodes => None,
        }
    }

    /// Returns the code, panicking when out of codes.
    ///
    /// Intended for tests.
    #[track_caller]
    pub fn unwrap_ready(self) -> String {
        match self {
            Self::Ready { code } => code,
            Self::OutOfCodes => panic!("called `Dispense::unwrap_ready()` on `OutOfCodes`"),
        }
    }
}
