//! A durable, fixed-capacity rotating store for one-time passcodes.
//!
//! A [`CodeStore`] keeps ten fixed-width code slots and a cursor in a single
//! record. [`CodeStore::replace`] loads a new batch and rewinds the cursor;
//! [`CodeStore::next`] hands out the code under the cursor and advances it
//! until the batch is used up, after which it reports
//! [`Dispense::OutOfCodes`].
//!
//! ```
//! use passcode::{CodeStore, Cursor, Dispense, MemoryMedium, StoreOptions};
//!
//! let store = CodeStore::with_medium(MemoryMedium::default(), StoreOptions::default()).unwrap();
//! store.replace(&["AAAAAAA", "BBBBBBB"]).unwrap();
//!
//! assert_eq!(store.next().unwrap().unwrap_ready(), "AAAAAAA");
//! assert_eq!(store.cursor().unwrap(), Cursor::At(1));
//! assert_eq!(store.next().unwrap().unwrap_ready(), "BBBBBBB");
//! assert_eq!(store.next().unwrap(), Dispense::OutOfCodes);
//! ```

mod cursor;
mod error;
pub mod layout;
mod medium;
mod status;
mod store;

pub use crate::cursor::*;
pub use crate::error::*;
pub use crate::layout::{Code, Layout, SLOT_COUNT};
pub use crate::medium::*;
pub use crate::status::*;
pub use crate::store::*;
