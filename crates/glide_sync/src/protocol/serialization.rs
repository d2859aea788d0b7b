//! # Payload Serialization
//!
//! Zero-allocation little-endian writer and reader for value payloads.
//!
//! ## Design
//!
//! - The writer owns a fixed buffer sized for the largest payload
//!   (every axis of every channel as a raw `f32`)
//! - The reader borrows whatever bytes the transport delivered
//! - Running out of room is an error, never a panic

use crate::error::{SyncError, SyncResult};

/// Largest payload the codec can produce: 4 channels x 3 axes x 4 bytes.
pub const MAX_PAYLOAD_SIZE: usize = 48;

/// Payload writer - writes scalars into a pre-allocated buffer.
///
/// Reuse one writer per synchronizer to avoid allocations.
#[derive(Clone, Debug)]
pub struct PayloadWriter {
    buffer: [u8; MAX_PAYLOAD_SIZE],
    position: usize,
}

impl PayloadWriter {
    /// Creates a new writer with a fresh buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_PAYLOAD_SIZE],
            position: 0,
        }
    }

    /// Resets the writer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns a slice of the written data.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    fn write_bytes<const N: usize>(&mut self, bytes: [u8; N]) -> SyncResult<()> {
        let remaining = MAX_PAYLOAD_SIZE - self.position;
        if N > remaining {
            return Err(SyncError::PayloadOverflow { needed: N, remaining });
        }
        self.buffer[self.position..self.position + N].copy_from_slice(&bytes);
        self.position += N;
        Ok(())
    }

    /// Writes a u16 in little-endian format.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> SyncResult<()> {
        self.write_bytes(value.to_le_bytes())
    }

    /// Writes a f32 in little-endian format.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> SyncResult<()> {
        self.write_bytes(value.to_le_bytes())
    }
}

impl Default for PayloadWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload reader - reads scalars from a received buffer.
#[derive(Clone, Debug)]
pub struct PayloadReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    /// Creates a new reader over a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, position: 0 }
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    fn read_bytes<const N: usize>(&mut self) -> SyncResult<[u8; N]> {
        let remaining = self.remaining();
        if N > remaining {
            return Err(SyncError::PayloadTruncated { needed: N, remaining });
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(bytes)
    }

    /// Reads a u16 in little-endian format.
    #[inline]
    pub fn read_u16(&mut self) -> SyncResult<u16> {
        self.read_bytes().map(u16::from_le_bytes)
    }

    /// Reads a f32 in little-endian format.
    #[inline]
    pub fn read_f32(&mut self) -> SyncResult<f32> {
        self.read_bytes().map(f32::from_le_bytes)
    }
}
