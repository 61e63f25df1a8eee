use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use crate::directory::{Directory, TableRef};
use crate::hash::{DjbHash, Hash32};
use crate::{HEADER_SIZE, SLOT_SIZE, TABLE_COUNT};

/// Capacity of the buffer used while streaming records, so `put` is not
/// stalled by per-record syscalls.
const WRITE_BUFFER_SIZE: usize = 1 << 20; // 1 MiB

/// One pending hash-table entry: the key's hash and the absolute offset of
/// its record. `position == 0` marks an empty slot, which is unambiguous
/// because no record can start inside the header.
#[derive(Debug, Default, Clone, Copy)]
struct Slot {
    hash: u32,
    position: u32,
}

/// Streaming builder for constant-database files.
///
/// Construction reserves the 2048-byte directory at the sink's current
/// offset; [`put`](Writer::put) appends records in call order; and
/// [`close`](Writer::close) materializes the 256 hash tables, rewrites the
/// directory, and hands the sink back. A writer is single-owner and `close`
/// consumes it, so no record can be added to a finalized database.
///
/// Every absolute offset must fit in 32 bits. A `put` that would push the
/// file past that bound fails without writing, leaving the sink at the end
/// of the previous record.
pub struct Writer<W: Write + Seek, H: Hash32 = DjbHash> {
    sink: BufWriter<W>,
    tables: Vec<Vec<Slot>>,
    hash: H,
    begin: u64,
    position: u64,
}

fn err_too_big() -> io::Error {
    io::Error::other("database would exceed the 4 GiB format limit")
}

impl<W: Write + Seek> Writer<W> {
    /// Starts a database at `sink`'s current offset using the default
    /// [`DjbHash`].
    pub fn new(sink: W) -> io::Result<Self> {
        Writer::with_hash(sink, DjbHash)
    }
}

impl<W: Write + Seek, H: Hash32> Writer<W, H> {
    /// Starts a database at `sink`'s current offset using `hash`.
    ///
    /// The same hash implementation must later be passed to
    /// [`Reader::with_hash`](crate::Reader::with_hash).
    pub fn with_hash(mut sink: W, hash: H) -> io::Result<Self> {
        let begin = sink.stream_position()?;
        let position = begin + u64::from(HEADER_SIZE);
        if position > u64::from(u32::MAX) {
            return Err(err_too_big());
        }
        sink.seek(SeekFrom::Start(position))?;

        Ok(Writer {
            sink: BufWriter::with_capacity(WRITE_BUFFER_SIZE, sink),
            tables: vec![Vec::new(); TABLE_COUNT],
            hash,
            begin,
            position,
        })
    }

    /// Appends one record. Duplicate keys are retained; lookups return the
    /// first value put, full scans return all of them in put order.
    ///
    /// # Errors
    ///
    /// Fails with the 4 GiB bound error if either length does not fit in 32
    /// bits or the record would push any file offset past `u32::MAX`;
    /// otherwise surfaces the sink's I/O errors unchanged.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> io::Result<()> {
        if key.len() > u32::MAX as usize || value.len() > u32::MAX as usize {
            return Err(err_too_big());
        }
        let end = self.position + 8 + key.len() as u64 + value.len() as u64;
        if end > u64::from(u32::MAX) {
            return Err(err_too_big());
        }

        self.sink.write_u32::<LittleEndian>(key.len() as u32)?;
        self.sink.write_u32::<LittleEndian>(value.len() as u32)?;
        self.sink.write_all(key)?;
        self.sink.write_all(value)?;

        let hash = self.hash.hash(key);
        self.tables[hash as usize % TABLE_COUNT].push(Slot {
            hash,
            position: self.position as u32,
        });
        self.position = end;
        Ok(())
    }

    /// Finalizes the database: flushes buffered records, appends the hash
    /// tables, rewrites the directory, and leaves the sink positioned at
    /// end-of-file.
    ///
    /// Each table holds twice as many slots as records, filled by linear
    /// probing from `(hash >> 8) mod n`, so probes on the read side terminate
    /// after a short run.
    pub fn close(self) -> io::Result<W> {
        let Writer {
            sink,
            tables,
            begin,
            mut position,
            ..
        } = self;
        let mut sink = sink.into_inner().map_err(io::IntoInnerError::into_error)?;

        let mut refs = [TableRef::default(); TABLE_COUNT];
        for (table, entry) in tables.iter().zip(refs.iter_mut()) {
            if table.is_empty() {
                continue;
            }
            let n = table.len() * 2;

            let mut slots = vec![Slot::default(); n];
            for slot in table {
                let mut k = (slot.hash >> 8) as usize % n;
                while slots[k].position != 0 {
                    k = (k + 1) % n;
                }
                slots[k] = *slot;
            }

            let end = position + (n as u64) * u64::from(SLOT_SIZE);
            if end > u64::from(u32::MAX) {
                return Err(err_too_big());
            }
            *entry = TableRef {
                position: position as u32,
                length: n as u32,
            };

            let mut buf = Vec::with_capacity(n * SLOT_SIZE as usize);
            for slot in &slots {
                buf.write_u32::<LittleEndian>(slot.hash)?;
                buf.write_u32::<LittleEndian>(slot.position)?;
            }
            sink.write_all(&buf)?;
            position = end;
        }

        sink.seek(SeekFrom::Start(begin))?;
        sink.write_all(&Directory::new(refs).encode())?;
        sink.seek(SeekFrom::Start(position))?;
        sink.flush()?;
        Ok(sink)
    }
}
