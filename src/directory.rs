use byteorder::{ByteOrder, LittleEndian};

use crate::{HEADER_SIZE, TABLE_COUNT};

/// Location of one hash table inside a database file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    /// Byte offset of the table within the file, 0 when the table is empty.
    pub position: u32,
    /// Number of slots in the table, twice the number of records it covers.
    pub length: u32,
}

/// The parsed 2048-byte header: one [`TableRef`] per hash table.
///
/// A key whose hash is `h` belongs to table `h mod 256`. A directory whose
/// entries are all zero describes an empty database.
#[derive(Debug, Clone)]
pub struct Directory {
    refs: [TableRef; TABLE_COUNT],
}

impl Directory {
    pub(crate) fn new(refs: [TableRef; TABLE_COUNT]) -> Directory {
        Directory { refs }
    }

    /// Decodes the header from its on-disk little-endian representation.
    pub(crate) fn parse(buf: &[u8; HEADER_SIZE as usize]) -> Directory {
        let mut refs = [TableRef::default(); TABLE_COUNT];
        for (i, entry) in refs.iter_mut().enumerate() {
            let j = i * 8;
            entry.position = LittleEndian::read_u32(&buf[j..j + 4]);
            entry.length = LittleEndian::read_u32(&buf[j + 4..j + 8]);
        }
        Directory { refs }
    }

    /// Encodes the header back into its on-disk representation.
    pub(crate) fn encode(&self) -> [u8; HEADER_SIZE as usize] {
        let mut buf = [0u8; HEADER_SIZE as usize];
        for (i, entry) in self.refs.iter().enumerate() {
            let j = i * 8;
            LittleEndian::write_u32(&mut buf[j..j + 4], entry.position);
            LittleEndian::write_u32(&mut buf[j + 4..j + 8], entry.length);
        }
        buf
    }

    /// Returns the table covering keys with hash value `hash`.
    pub fn table_for(&self, hash: u32) -> TableRef {
        self.refs[hash as usize % TABLE_COUNT]
    }

    /// All 256 table references in directory order.
    pub fn tables(&self) -> &[TableRef] {
        &self.refs
    }

    /// Offset one past the last record: the smallest non-zero table
    /// position, or the header size when every table is empty.
    pub(crate) fn data_end(&self) -> u32 {
        self.refs
            .iter()
            .filter(|r| r.position != 0)
            .map(|r| r.position)
            .min()
            .unwrap_or(HEADER_SIZE)
    }

    /// Total number of records, counting duplicates. Tables are sized at
    /// twice their record count, so this is half the summed slot count.
    pub(crate) fn record_count(&self) -> usize {
        self.refs.iter().map(|r| r.length as usize / 2).sum()
    }
}
