//! Big-endian framed record reader.
//!
//! Every logical BPCH record is stored as a 4-byte length, the payload of
//! that length and a trailing copy of the length. The reader either decodes
//! a record or skips it; both leave the position just past the trailer.

use crate::error::{BpchError, Result};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;

/// Sequential reader over framed records, buffered internally
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: BufReader<R>,
}

impl RecordReader<File> {
    /// Open a file for record reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BpchError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => BpchError::Io(e),
        })?;
        Ok(Self::new(file))
    }
}

impl<R: Read + Seek> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
        }
    }

    /// Current byte offset
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Offset of the end of the stream; the current position is restored
    pub fn end_offset(&mut self) -> Result<u64> {
        let current = self.position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.seek_to(current)?;
        Ok(end)
    }

    /// Read one record's payload
    pub fn read_record(&mut self, context: &str) -> Result<Vec<u8>> {
        let start = self.position()?;
        let leading = self.read_marker(start, context)?;
        let mut payload = vec![0u8; leading as usize];
        self.read_exact_or_eof(&mut payload, start, context)?;
        self.check_trailer(start, leading, context)?;
        Ok(payload)
    }

    /// Advance past one record without decoding it, returning its payload length.
    ///
    /// Short skips stay inside the read buffer.
    pub fn skip_record(&mut self, context: &str) -> Result<usize> {
        let start = self.position()?;
        let leading = self.read_marker(start, context)?;
        self.inner.seek_relative(i64::from(leading))?;
        self.check_trailer(start, leading, context)?;
        Ok(leading as usize)
    }

    /// Read a record that must have exactly `len` bytes, as a field cursor
    pub fn read_fixed(&mut self, len: usize, context: &str) -> Result<FieldCursor> {
        let offset = self.position()?;
        let bytes = self.read_record(context)?;
        if bytes.len() != len {
            return Err(BpchError::RecordLength {
                offset,
                expected: len,
                found: bytes.len(),
                context: context.to_string(),
            });
        }
        Ok(FieldCursor::new(bytes))
    }

    /// Read a record of big-endian 4-byte floats
    pub fn read_f32_record(&mut self, context: &str) -> Result<Vec<f32>> {
        let offset = self.position()?;
        let bytes = self.read_record(context)?;
        if bytes.len() % 4 != 0 {
            return Err(BpchError::RecordLength {
                offset,
                expected: bytes.len() / 4 * 4,
                found: bytes.len(),
                context: context.to_string(),
            });
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn read_marker(&mut self, start: u64, context: &str) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact_or_eof(&mut buf, start, context)?;
        let len = i32::from_be_bytes(buf);
        if len < 0 {
            return Err(BpchError::RecordFraming {
                offset: start,
                leading: len,
                trailing: len,
            });
        }
        Ok(len)
    }

    fn check_trailer(&mut self, start: u64, leading: i32, context: &str) -> Result<()> {
        let mut buf = [0u8; 4];
        self.read_exact_or_eof(&mut buf, start, context)?;
        let trailing = i32::from_be_bytes(buf);
        if trailing != leading {
            return Err(BpchError::RecordFraming {
                offset: start,
                leading,
                trailing,
            });
        }
        Ok(())
    }

    fn read_exact_or_eof(&mut self, buf: &mut [u8], offset: u64, context: &str) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => BpchError::UnexpectedEof {
                offset,
                context: context.to_string(),
            },
            _ => BpchError::Io(e),
        })
    }
}

/// Decodes consecutive big-endian fields out of one fixed-layout record
#[derive(Debug)]
pub struct FieldCursor {
    bytes: Vec<u8>,
    pos: usize,
}

impl FieldCursor {
    fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> &[u8] {
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    /// Fixed-width text field with padding removed
    pub fn text(&mut self, width: usize) -> String {
        let raw = self.take(width);
        String::from_utf8_lossy(raw)
            .trim_matches(|c: char| c == ' ' || c == '\0')
            .to_string()
    }

    pub fn i32(&mut self) -> i32 {
        let b = self.take(4);
        i32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    pub fn f32(&mut self) -> f32 {
        let b = self.take(4);
        f32::from_be_bytes([b[0], b[1], b[2], b[3]])
    }

    pub fn f64(&mut self) -> f64 {
        let b = self.take(8);
        f64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    }
}
