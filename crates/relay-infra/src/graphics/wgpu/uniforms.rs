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

//! Per-frame uniform sub-allocation.

use relay_core::renderer::ResourceError;

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
pub const fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) & !(alignment - 1)
}

/// A bump allocator over one uniform buffer region.
///
/// Every `apply_uniforms` in a frame gets its own aligned range, so draws
/// recorded earlier in the frame keep the values they were given. The arena
/// rewinds itself the first time it is used in a new frame.
#[derive(Debug, Clone)]
pub struct UniformArena {
    capacity: u64,
    alignment: u64,
    cursor: u64,
    epoch: u64,
}

impl UniformArena {
    /// Creates an arena over `capacity` bytes with offsets aligned to `alignment`.
    pub fn new(capacity: u64, alignment: u64) -> Self {
        debug_assert!(alignment.is_power_of_two());
        Self {
            capacity,
            alignment,
            cursor: 0,
            epoch: 0,
        }
    }

    /// Reserves `len` bytes for frame `epoch` and returns their offset.
    pub fn allocate(&mut self, epoch: u64, len: u64) -> Result<u64, ResourceError> {
        if epoch != self.epoch {
            self.epoch = epoch;
            self.cursor = 0;
        }
        let offset = align_up(self.cursor, self.alignment);
        let end = offset + len;
        if end > self.capacity {
            return Err(ResourceError::UniformOverflow {
                requested: len,
                available: self.capacity.saturating_sub(offset),
            });
        }
        self.cursor = end;
        Ok(offset)
    }

    /// Bytes handed out in the current frame, including alignment padding.
    pub fn used(&self) -> u64 {
        self.cursor
    }

    /// Total bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Offset alignment.
    pub fn alignment(&self) -> u64 {
        self.alignment
    }
}

/// Copies `data` into a vector padded to the 4-byte copy granularity.
pub fn pad_to_copy_alignment(data: &[u8]) -> Vec<u8> {
    let padded = align_up(data.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT) as usize;
    let mut bytes = Vec::with_capacity(padded);
    bytes.extend_from_slice(data);
    bytes.resize(padded, 0);
    bytes
}
