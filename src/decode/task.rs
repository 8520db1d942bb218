use bytes::Bytes;

use crate::error::{DecoderError, Result};

/// One decode request: a region of an immutable, shared byte buffer.
///
/// The buffer is reference counted, so the region stays valid and unmodified
/// for as long as any clone of the task is alive, which covers the whole
/// window between engine submission and completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTask {
    data: Bytes,
    offset: usize,
    length: usize,
}

impl DecodeTask {
    /// Creates a task over `data[offset..offset + length]`.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::InvalidRange`] if the region does not fit in
    /// `data`, including when `offset + length` overflows.
    pub fn new(data: impl Into<Bytes>, offset: usize, length: usize) -> Result<Self> {
        let data = data.into();
        check_range(data.len(), offset, length)?;
        Ok(Self {
            data,
            offset,
            length,
        })
    }

    /// Creates a task covering all of `data`
    pub fn whole(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let length = data.len();
        Self {
            data,
            offset: 0,
            length,
        }
    }

    /// Copies `buffer[offset..offset + length]` into a task of its own.
    ///
    /// Used when the caller keeps ownership of a buffer it may rewrite as soon
    /// as the call returns.
    pub fn copy_from_slice(buffer: &[u8], offset: usize, length: usize) -> Result<Self> {
        check_range(buffer.len(), offset, length)?;
        Ok(Self::whole(Bytes::copy_from_slice(
            &buffer[offset..offset + length],
        )))
    }

    /// The whole backing buffer
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Start of the region within [`data`](Self::data)
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length of the region
    pub fn length(&self) -> usize {
        self.length
    }

    /// True for a zero-length region
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The bytes the engine should decode
    pub fn region(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.length]
    }

    /// The region as a cheap shared slice of the backing buffer
    pub fn region_bytes(&self) -> Bytes {
        self.data.slice(self.offset..self.offset + self.length)
    }
}

fn check_range(size: usize, offset: usize, length: usize) -> Result<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(DecoderError::InvalidRange {
            offset,
            length,
            size,
        }),
    }
}
