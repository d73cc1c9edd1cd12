// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::mem::size_of;

use bytemuck::Pod;

use crate::renderer::error::DescriptorError;

/// A growable byte stream written once per frame and read back at commit.
///
/// Values are stored as their raw bytes, unaligned. Variable-size payloads are
/// copied in behind a `u32` length prefix, so the caller's slice does not need
/// to outlive the call that recorded it.
#[derive(Debug, Clone)]
pub struct CommandBuffer {
    bytes: Vec<u8>,
}

impl CommandBuffer {
    /// Initial capacity used by [`CommandBuffer::new`].
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates an empty stream with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates an empty stream able to hold `capacity` bytes before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Appends the raw bytes of `value`.
    pub fn write<T: Pod>(&mut self, value: T) {
        self.bytes.extend_from_slice(bytemuck::bytes_of(&value));
    }

    /// Appends a length-prefixed copy of `payload`.
    ///
    /// # Panics
    ///
    /// If `payload` is longer than `u32::MAX`; check with [`payload_len`] first.
    pub fn write_payload(&mut self, payload: &[u8]) {
        let len = match payload_len(payload) {
            Ok(len) => len,
            Err(err) => panic!("{err}"),
        };
        self.write(len);
        self.bytes.extend_from_slice(payload);
    }

    /// A reader positioned at the start of the stream.
    pub fn reader(&self) -> CommandReader<'_> {
        CommandReader {
            bytes: &self.bytes,
            cursor: 0,
        }
    }

    /// Empties the stream, keeping its allocation for the next frame.
    pub fn reset(&mut self) {
        self.bytes.clear();
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if nothing was written since the last reset.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes the stream can hold before it reallocates.
    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates that a payload fits the stream's length prefix.
pub fn payload_len(payload: &[u8]) -> Result<u32, DescriptorError> {
    u32::try_from(payload.len()).map_err(|_| DescriptorError::PayloadTooLarge { len: payload.len() })
}

/// Sequential reader over a [`CommandBuffer`].
///
/// Reading past the written bytes means the reader and the writer disagree on
/// a command's layout. That is a broken invariant, so it panics.
#[derive(Debug)]
pub struct CommandReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> CommandReader<'a> {
    /// Reads the next `T`.
    pub fn read<T: Pod>(&mut self) -> T {
        let bytes = self.take(size_of::<T>());
        bytemuck::pod_read_unaligned(bytes)
    }

    /// Reads a payload written by [`CommandBuffer::write_payload`].
    pub fn read_payload(&mut self) -> &'a [u8] {
        let len = self.read::<u32>() as usize;
        self.take(len)
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// `true` once every written byte has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.bytes.len()
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let end = self.cursor + len;
        assert!(
            end <= self.bytes.len(),
            "command stream desync: reading {len} bytes at offset {} but only {} were written",
            self.cursor,
            self.bytes.len()
        );
        let slice = &self.bytes[self.cursor..end];
        self.cursor = end;
        slice
    }
}
