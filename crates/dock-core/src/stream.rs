//! Big-endian stream primitives shared by every binary layout encoder.
//!
//! Both traits are blanket-implemented, so they work on concrete writers as
//! well as on `&mut dyn Write` / `&mut dyn Read` handed to factories.

use std::io::{self, Read, Write};

/// Encoding helpers on top of [`Write`].
pub trait DataOutput: Write {
    /// One byte, `1` or `0`.
    fn write_bool(&mut self, value: bool) -> io::Result<()> {
        self.write_all(&[u8::from(value)])
    }

    fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.write_all(&value.to_be_bytes())
    }

    /// A `u16` byte length followed by UTF-8 bytes.
    fn write_utf(&mut self, value: &str) -> io::Result<()> {
        let len = u16::try_from(value.len()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("string of {} bytes is too long to encode", value.len()),
            )
        })?;
        self.write_all(&len.to_be_bytes())?;
        self.write_all(value.as_bytes())
    }

    /// An `i32` byte length followed by the bytes.
    fn write_block(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_len(bytes.len())?;
        self.write_all(bytes)
    }

    /// A collection length as a non-negative `i32`.
    fn write_len(&mut self, len: usize) -> io::Result<()> {
        let len = i32::try_from(len).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("length {} exceeds i32", len))
        })?;
        self.write_i32(len)
    }
}

impl<W: Write + ?Sized> DataOutput for W {}

/// Decoding helpers on top of [`Read`].
///
/// Truncated input fails with [`io::ErrorKind::UnexpectedEof`]; values that
/// cannot have been produced by [`DataOutput`] fail with
/// [`io::ErrorKind::InvalidData`].
pub trait DataInput: Read {
    fn read_bool(&mut self) -> io::Result<bool> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte)?;
        match byte[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(invalid(format!("invalid boolean byte {}", other))),
        }
    }

    fn read_i32(&mut self) -> io::Result<i32> {
        let mut bytes = [0u8; 4];
        self.read_exact(&mut bytes)?;
        Ok(i32::from_be_bytes(bytes))
    }

    fn read_utf(&mut self) -> io::Result<String> {
        let mut len = [0u8; 2];
        self.read_exact(&mut len)?;
        let mut bytes = vec![0u8; usize::from(u16::from_be_bytes(len))];
        self.read_exact(&mut bytes)?;
        String::from_utf8(bytes).map_err(|e| invalid(format!("invalid utf-8 string: {}", e)))
    }

    fn read_block(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_len()?;
        let mut bytes = Vec::new();
        // `take` keeps a corrupt length from allocating before the stream runs dry.
        Read::take(&mut *self, len as u64).read_to_end(&mut bytes)?;
        if bytes.len() != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("block declares {} bytes, stream holds {}", len, bytes.len()),
            ));
        }
        Ok(bytes)
    }

    /// A length written by [`DataOutput::write_len`].
    fn read_len(&mut self) -> io::Result<usize> {
        let len = self.read_i32()?;
        usize::try_from(len).map_err(|_| invalid(format!("negative length {}", len)))
    }
}

impl<R: Read + ?Sized> DataInput for R {}

fn invalid(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
