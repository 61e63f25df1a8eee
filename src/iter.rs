use std::io::{self, Read};

use crate::source::{read_pair, read_vec, ReadAt};
use crate::HEADER_SIZE;

/// Offsets and sizes of one record's key and value sections.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Sections {
    pub key_pos: u64,
    pub key_len: u32,
    pub value_pos: u64,
    pub value_len: u32,
}

impl Sections {
    /// Decodes the record header at `position` into section bounds.
    pub(crate) fn read_at<R: ReadAt>(source: &R, position: u64) -> io::Result<Sections> {
        let (key_len, value_len) = read_pair(source, position)?;
        let key_pos = position + 8;
        Ok(Sections {
            key_pos,
            key_len,
            value_pos: key_pos + u64::from(key_len),
            value_len,
        })
    }

    /// Offset one past the value section, where the next record starts.
    pub(crate) fn end(&self) -> u64 {
        self.value_pos + u64::from(self.value_len)
    }
}

/// Cursor over the records of a database.
///
/// [`Reader::iter`](crate::Reader::iter) returns a cursor before the first
/// record; [`Reader::iter_at`](crate::Reader::iter_at) returns one whose
/// current record is the first match for a key. [`advance`](Iter::advance)
/// moves through the data region in insertion order either way.
///
/// `Iter` also implements [`Iterator`], yielding each record's key and value
/// as owned byte vectors; a read failure is yielded in-stream and fuses the
/// cursor.
pub struct Iter<'a, R: ReadAt> {
    source: &'a R,
    data_end: u32,
    position: u64,
    current: Option<Sections>,
}

impl<'a, R: ReadAt> Iter<'a, R> {
    pub(crate) fn scan(source: &'a R, data_end: u32) -> Iter<'a, R> {
        Iter {
            source,
            data_end,
            position: u64::from(HEADER_SIZE),
            current: None,
        }
    }

    pub(crate) fn at(source: &'a R, data_end: u32, sections: Sections) -> Iter<'a, R> {
        Iter {
            source,
            data_end,
            position: sections.end(),
            current: Some(sections),
        }
    }

    /// Moves to the next record in file order.
    ///
    /// Returns `false` once the data region is exhausted, leaving the
    /// current record untouched. A read failure fuses the cursor and is
    /// surfaced unchanged.
    pub fn advance(&mut self) -> io::Result<bool> {
        if !self.has_next() {
            return Ok(false);
        }
        match Sections::read_at(self.source, self.position) {
            Ok(sections) => {
                self.position = sections.end();
                self.current = Some(sections);
                Ok(true)
            }
            Err(e) => {
                self.position = u64::from(self.data_end);
                self.current = None;
                Err(e)
            }
        }
    }

    /// Tells whether another record follows the current one.
    pub fn has_next(&self) -> bool {
        self.position < u64::from(self.data_end)
    }

    /// Snapshot of the current record, or `None` before the first
    /// [`advance`](Iter::advance).
    ///
    /// The snapshot borrows the reader's source, not the cursor, so it stays
    /// valid across later `advance` calls and after the cursor is dropped.
    pub fn record(&self) -> Option<Record<'a, R>> {
        self.current.map(|sections| Record {
            source: self.source,
            sections,
        })
    }

    /// Reads the current record's key into a fresh buffer.
    pub fn key(&self) -> Option<io::Result<Vec<u8>>> {
        self.record().map(|record| record.key())
    }

    /// Reads the current record's value into a fresh buffer.
    pub fn value(&self) -> Option<io::Result<Vec<u8>>> {
        self.record().map(|record| record.value())
    }
}

impl<'a, R: ReadAt> Iterator for Iter<'a, R> {
    type Item = io::Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(false) => None,
            Err(e) => Some(Err(e)),
            Ok(true) => {
                let record = self.record()?;
                Some(record.key().and_then(|key| Ok((key, record.value()?))))
            }
        }
    }
}

/// By-value view of one record: the source handle plus the key and value
/// section bounds. Cheap to copy around and valid for the reader's lifetime.
///
/// Both accessor styles read the same bytes and may be called any number of
/// times: [`key`](Record::key) / [`value`](Record::value) allocate, while
/// [`key_reader`](Record::key_reader) / [`value_reader`](Record::value_reader)
/// stream straight from the source.
pub struct Record<'a, R: ReadAt> {
    source: &'a R,
    sections: Sections,
}

impl<'a, R: ReadAt> Record<'a, R> {
    /// Length of the key in bytes.
    pub fn key_len(&self) -> u32 {
        self.sections.key_len
    }

    /// Length of the value in bytes.
    pub fn value_len(&self) -> u32 {
        self.sections.value_len
    }

    /// Reads the key into a fresh buffer.
    pub fn key(&self) -> io::Result<Vec<u8>> {
        read_vec(self.source, self.sections.key_pos, self.sections.key_len)
    }

    /// Reads the value into a fresh buffer.
    pub fn value(&self) -> io::Result<Vec<u8>> {
        read_vec(self.source, self.sections.value_pos, self.sections.value_len)
    }

    /// Positional [`Read`] over the key bytes, without allocation.
    pub fn key_reader(&self) -> SectionReader<'a, R> {
        SectionReader {
            source: self.source,
            position: self.sections.key_pos,
            remaining: self.sections.key_len,
        }
    }

    /// Positional [`Read`] over the value bytes, without allocation.
    pub fn value_reader(&self) -> SectionReader<'a, R> {
        SectionReader {
            source: self.source,
            position: self.sections.value_pos,
            remaining: self.sections.value_len,
        }
    }
}

/// Streaming reader over one record section.
pub struct SectionReader<'a, R: ReadAt> {
    source: &'a R,
    position: u64,
    remaining: u32,
}

impl<'a, R: ReadAt> SectionReader<'a, R> {
    /// Number of bytes left to read.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl<'a, R: ReadAt> Read for SectionReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining as usize);
        if n == 0 {
            return Ok(0);
        }
        self.source.read_exact_at(&mut buf[..n], self.position)?;
        self.position += n as u64;
        self.remaining -= n as u32;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Reader, Writer};
    use std::io::Read;

    fn sample_reader() -> Reader<std::fs::File> {
        let mut writer = Writer::new(tempfile::tempfile().unwrap()).unwrap();
        for (key, value) in [
            ("key1", "value1"),
            ("key2", "value2"),
            ("key6", "value61"),
            ("key6", "value62"),
            ("key7", "value7"),
        ] {
            writer.put(key.as_bytes(), value.as_bytes()).unwrap();
        }
        Reader::open(writer.close().unwrap()).unwrap()
    }

    #[test]
    fn test_full_scan_in_insertion_order() {
        let reader = sample_reader();
        let records: Vec<_> = reader
            .iter()
            .collect::<std::io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(
            records,
            vec![
                (b"key1".to_vec(), b"value1".to_vec()),
                (b"key2".to_vec(), b"value2".to_vec()),
                (b"key6".to_vec(), b"value61".to_vec()),
                (b"key6".to_vec(), b"value62".to_vec()),
                (b"key7".to_vec(), b"value7".to_vec()),
            ]
        );
    }

    #[test]
    fn test_cursor_walk() {
        let reader = sample_reader();
        let mut iter = reader.iter();
        assert!(iter.record().is_none());
        assert!(iter.has_next());

        let mut seen = 0;
        while iter.advance().unwrap() {
            seen += 1;
            let record = iter.record().unwrap();
            assert_eq!(record.key().unwrap().len() as u32, record.key_len());
        }
        assert_eq!(seen, 5);
        assert!(!iter.has_next());
        assert!(!iter.advance().unwrap());
    }

    #[test]
    fn test_record_reads_are_repeatable() {
        let reader = sample_reader();
        let iter = reader.iter_at(b"key2").unwrap().unwrap();
        let record = iter.record().unwrap();

        for _ in 0..10 {
            assert_eq!(record.key().unwrap(), b"key2");
            assert_eq!(record.value().unwrap(), b"value2");
        }
    }

    #[test]
    fn test_snapshot_survives_advance() {
        let reader = sample_reader();
        let mut iter = reader.iter();
        iter.advance().unwrap();
        let first = iter.record().unwrap();

        while iter.advance().unwrap() {}
        drop(iter);

        assert_eq!(first.key().unwrap(), b"key1");
        assert_eq!(first.value().unwrap(), b"value1");
    }

    #[test]
    fn test_iter_at_continues_in_file_order() {
        let reader = sample_reader();
        let mut iter = reader.iter_at(b"key6").unwrap().unwrap();
        assert_eq!(iter.value().unwrap().unwrap(), b"value61");

        // The next record is the duplicate, then key7.
        assert!(iter.advance().unwrap());
        assert_eq!(iter.key().unwrap().unwrap(), b"key6");
        assert_eq!(iter.value().unwrap().unwrap(), b"value62");
        assert!(iter.advance().unwrap());
        assert_eq!(iter.key().unwrap().unwrap(), b"key7");
        assert!(!iter.advance().unwrap());
    }

    #[test]
    fn test_section_reader_streams_in_chunks() {
        let reader = sample_reader();
        let record = reader.iter_at(b"key6").unwrap().unwrap().record().unwrap();

        let mut section = record.value_reader();
        assert_eq!(section.remaining(), 7);

        let mut out = Vec::new();
        let mut chunk = [0u8; 3];
        loop {
            let n = section.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(out, b"value61");
        assert_eq!(section.remaining(), 0);
    }

    #[test]
    fn test_empty_database_scan() {
        let writer = Writer::new(tempfile::tempfile().unwrap()).unwrap();
        let reader = Reader::open(writer.close().unwrap()).unwrap();

        let mut iter = reader.iter();
        assert!(!iter.has_next());
        assert!(!iter.advance().unwrap());
        assert!(iter.record().is_none());
        assert!(reader.iter().next().is_none());
    }
}
