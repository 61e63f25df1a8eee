//! Immutable, read-optimized key-value databases in the cdb file format.
//!
//! The `constdb` crate builds and queries constant databases as proposed by
//! D. J. Bernstein: a single file mapping opaque byte-string keys to opaque
//! byte-string values, written once and thereafter served to any number of
//! concurrent readers with a couple of positional reads per lookup. Multiple
//! values per key are retained and a full scan yields records in insertion
//! order.
//!
//! A [`Writer`] streams records to any `Write + Seek` sink and finalizes the
//! hash tables on [`close`](Writer::close); a [`Reader`] opens the finished
//! file through the [`ReadAt`] seam and answers point queries and scans.
//!
//! ```
//! use constdb::{Reader, Writer};
//!
//! # fn main() -> std::io::Result<()> {
//! let mut writer = Writer::new(tempfile::tempfile()?)?;
//! writer.put(b"apple", b"fruit")?;
//! writer.put(b"carrot", b"vegetable")?;
//! let file = writer.close()?;
//!
//! let reader = Reader::open(file)?;
//! assert_eq!(reader.get(b"apple")?, Some(b"fruit".to_vec()));
//! assert_eq!(reader.get(b"mushroom")?, None);
//! # Ok(())
//! # }
//! ```

/// Number of hash tables in a database.
const TABLE_COUNT: usize = 256;
/// Size in bytes of the directory header: one `(position, length)` pair per table.
const HEADER_SIZE: u32 = TABLE_COUNT as u32 * 8;
/// Size in bytes of one `(hash, position)` slot.
const SLOT_SIZE: u32 = 8;

mod hash;
pub use hash::{DjbHash, Fold32, Hash32};

mod directory;
pub use directory::{Directory, TableRef};

mod source;
pub use source::ReadAt;

mod writer;
pub use writer::Writer;

mod reader;
pub use reader::Reader;

mod iter;
pub use iter::{Iter, Record, SectionReader};
