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

//! Interleaved vertex layout built with a begin/add/end protocol.

use super::types::AttribType;
use crate::renderer::error::DescriptorError;

/// Maximum number of attributes in one vertex layout.
pub const MAX_VERTEX_ATTRIBUTES: usize = 16;

/// One attribute of an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader input location.
    pub location: u32,
    /// Byte offset inside the vertex.
    pub offset: u32,
    /// Component type.
    pub ty: AttribType,
}

impl VertexAttribute {
    const EMPTY: Self = Self {
        location: 0,
        offset: 0,
        ty: AttribType::Float,
    };
}

/// A single interleaved vertex buffer layout.
///
/// ```
/// use relay_core::renderer::api::{AttribType, VertexAttributes};
///
/// let mut layout = VertexAttributes::new();
/// layout
///     .begin()
///     .add(0, AttribType::Float3)?
///     .add(1, AttribType::Float4)?
///     .end();
/// assert_eq!(layout.stride(), 28);
/// # Ok::<(), relay_core::renderer::error::DescriptorError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct VertexAttributes {
    attributes: [VertexAttribute; MAX_VERTEX_ATTRIBUTES],
    count: usize,
    stride: u32,
}

impl VertexAttributes {
    /// An empty layout.
    pub const fn new() -> Self {
        Self {
            attributes: [VertexAttribute::EMPTY; MAX_VERTEX_ATTRIBUTES],
            count: 0,
            stride: 0,
        }
    }

    /// Clears the layout so attributes can be added from offset 0.
    pub fn begin(&mut self) -> &mut Self {
        self.count = 0;
        self.stride = 0;
        self
    }

    /// Appends an attribute at the current end of the vertex.
    pub fn add(&mut self, location: u32, ty: AttribType) -> Result<&mut Self, DescriptorError> {
        if self.count == MAX_VERTEX_ATTRIBUTES {
            return Err(DescriptorError::TooManyAttributes {
                max: MAX_VERTEX_ATTRIBUTES,
            });
        }
        if self.iter().any(|attribute| attribute.location == location) {
            return Err(DescriptorError::DuplicateLocation { location });
        }

        self.attributes[self.count] = VertexAttribute {
            location,
            offset: self.stride,
            ty,
        };
        self.count += 1;
        self.stride += ty.size();
        Ok(self)
    }

    /// Closes the layout.
    pub fn end(&mut self) -> &mut Self {
        self
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.count
    }

    /// `true` if no attribute was added.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The attributes in insertion order.
    pub fn as_slice(&self) -> &[VertexAttribute] {
        &self.attributes[..self.count]
    }

    /// Iterates over the attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &VertexAttribute> {
        self.as_slice().iter()
    }

    /// Rebuilds a layout from decoded attributes; the stride is taken as given.
    pub(crate) fn from_decoded(attributes: &[VertexAttribute], stride: u32) -> Self {
        let mut layout = Self::new();
        let count = attributes.len().min(MAX_VERTEX_ATTRIBUTES);
        layout.attributes[..count].copy_from_slice(&attributes[..count]);
        layout.count = count;
        layout.stride = stride;
        layout
    }
}

impl Default for VertexAttributes {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for VertexAttributes {
    fn eq(&self, other: &Self) -> bool {
        self.stride == other.stride && self.as_slice() == other.as_slice()
    }
}

impl Eq for VertexAttributes {}
