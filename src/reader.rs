use std::io::{self, Error, ErrorKind};

use crate::directory::Directory;
use crate::hash::{DjbHash, Hash32};
use crate::iter::{Iter, Sections};
use crate::source::{read_pair, read_vec, ReadAt};
use crate::{HEADER_SIZE, SLOT_SIZE};

/// Query handle over a finished constant-database file.
///
/// A `Reader` parses the 2048-byte directory once at open time and keeps it
/// immutable thereafter; every lookup allocates its own probe state, so one
/// reader can serve any number of threads without locking (the source only
/// has to support concurrent positional reads, which platform file handles
/// do).
///
/// Point lookups hash the key, pick one of the 256 tables, and probe
/// linearly from `(hash >> 8) mod length`; an empty slot ends the probe with
/// not-found. The first record put under a key is the one lookups return.
#[derive(Debug)]
pub struct Reader<R: ReadAt, H: Hash32 = DjbHash> {
    source: R,
    hash: H,
    directory: Directory,
    data_end: u32,
    len: usize,
}

impl<R: ReadAt> Reader<R> {
    /// Opens a database using the default [`DjbHash`].
    pub fn open(source: R) -> io::Result<Self> {
        Reader::with_hash(source, DjbHash)
    }
}

impl<R: ReadAt, H: Hash32> Reader<R, H> {
    /// Opens a database built with [`Writer::with_hash`](crate::Writer::with_hash)
    /// and the same `hash`.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InvalidData`] when the directory cannot be
    /// read in full, which covers files shorter than 2048 bytes.
    pub fn with_hash(source: R, hash: H) -> io::Result<Self> {
        let mut buf = [0u8; HEADER_SIZE as usize];
        source.read_exact_at(&mut buf, 0).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("invalid database header: {e}"),
            )
        })?;
        let directory = Directory::parse(&buf);

        Ok(Reader {
            data_end: directory.data_end(),
            len: directory.record_count(),
            source,
            hash,
            directory,
        })
    }

    /// Returns the value of the first record put under `key`, or `None`.
    pub fn get(&self, key: &[u8]) -> io::Result<Option<Vec<u8>>> {
        match self.find(key)? {
            Some(sections) => {
                read_vec(&self.source, sections.value_pos, sections.value_len).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Tells whether any record was put under `key`.
    pub fn has(&self, key: &[u8]) -> io::Result<bool> {
        Ok(self.find(key)?.is_some())
    }

    /// Number of records in the database, counting duplicate keys.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Tells whether the database holds no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The parsed directory, immutable for the reader's lifetime.
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Full-scan cursor over all records in insertion order, positioned
    /// before the first record.
    pub fn iter(&self) -> Iter<'_, R> {
        Iter::scan(&self.source, self.data_end)
    }

    /// Cursor whose current record is the first match for `key`, or `None`
    /// when the key is absent. Advancing it continues through the records
    /// that follow the match in file order.
    pub fn iter_at(&self, key: &[u8]) -> io::Result<Option<Iter<'_, R>>> {
        Ok(self
            .find(key)?
            .map(|sections| Iter::at(&self.source, self.data_end, sections)))
    }

    /// Probes for the first record matching `key`.
    ///
    /// Offsets are widened to `u64` throughout, so a corrupt slot can only
    /// yield a failed read or a failed compare, never wrapped arithmetic.
    fn find(&self, key: &[u8]) -> io::Result<Option<Sections>> {
        let hash = self.hash.hash(key);
        let table = self.directory.table_for(hash);
        if table.length == 0 {
            return Ok(None);
        }

        let mut k = (hash >> 8) % table.length;
        for _ in 0..table.length {
            let slot_offset = u64::from(table.position) + u64::from(k) * u64::from(SLOT_SIZE);
            let (slot_hash, slot_pos) = read_pair(&self.source, slot_offset)?;
            if slot_pos == 0 {
                return Ok(None);
            }

            if slot_hash == hash {
                let sections = Sections::read_at(&self.source, u64::from(slot_pos))?;
                if sections.key_len as usize == key.len()
                    && read_vec(&self.source, sections.key_pos, sections.key_len)? == key
                {
                    return Ok(Some(sections));
                }
            }

            k = (k + 1) % table.length;
        }
        Ok(None)
    }
}
