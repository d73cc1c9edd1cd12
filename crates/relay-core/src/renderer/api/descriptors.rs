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

//! Descriptors passed to resource creation and draw-state calls.

use super::types::{CullMode, FaceWinding, LoadAction, PrimitiveType};
use super::vertex::VertexAttributes;
use crate::handle::{BufferHandle, ImageHandle, PassHandle, ProgramHandle, UniformBufferHandle};

/// Maximum number of vertex buffers bound at once.
pub const MAX_BUFFER_BIND: usize = 8;

/// Maximum number of images bound at once.
pub const MAX_IMAGE_BIND: usize = 4;

/// Bytes per texel of every image (RGBA8).
pub const IMAGE_BYTES_PER_PIXEL: u32 = 4;

/// Immutable pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineDesc {
    /// The vertex + fragment program.
    pub program: ProgramHandle,
    /// Layout of the single interleaved vertex buffer at slot 0.
    pub vertex_attributes: VertexAttributes,
    /// Face culling.
    pub cull_mode: CullMode,
    /// Front-face winding.
    pub face_winding: FaceWinding,
    /// The pass this pipeline renders in; null means the default pass.
    pub pass: PassHandle,
    /// Primitive topology.
    pub primitive: PrimitiveType,
}

impl PipelineDesc {
    /// A pipeline for `program` with the default fixed-function state.
    pub fn new(program: ProgramHandle, vertex_attributes: VertexAttributes) -> Self {
        Self {
            program,
            vertex_attributes,
            ..Self::default()
        }
    }
}

impl Default for PipelineDesc {
    fn default() -> Self {
        Self {
            program: ProgramHandle::NULL,
            vertex_attributes: VertexAttributes::new(),
            cull_mode: CullMode::default(),
            face_winding: FaceWinding::default(),
            pass: PassHandle::NULL,
            primitive: PrimitiveType::default(),
        }
    }
}

/// A render pass over the current swapchain image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassDesc {
    /// Linear RGBA clear color, used when `load` is [`LoadAction::Clear`].
    pub clear_color: [f32; 4],
    /// Load behaviour of the color attachment.
    pub load: LoadAction,
}

impl PassDesc {
    /// The pass used by `begin_default_pass`: clear to opaque black.
    pub const DEFAULT_PASS: Self = Self {
        clear_color: [0.0, 0.0, 0.0, 1.0],
        load: LoadAction::Clear,
    };
}

impl Default for PassDesc {
    fn default() -> Self {
        Self::DEFAULT_PASS
    }
}

/// Size of an RGBA8 image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureDesc {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
}

impl TextureDesc {
    /// Creates a descriptor.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of bytes a tightly packed upload must contain.
    pub fn byte_len(&self) -> u64 {
        self.width as u64 * self.height as u64 * IMAGE_BYTES_PER_PIXEL as u64
    }
}

/// Buffers and images used by the following draw calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bindings {
    /// Vertex buffers by slot; null slots are unbound.
    pub vertex_buffers: [BufferHandle; MAX_BUFFER_BIND],
    /// 16-bit index buffer used by `draw_indexed`.
    pub index_buffer: BufferHandle,
    /// Uniform buffer that `apply_uniforms` writes into.
    pub uniform_buffer: UniformBufferHandle,
    /// Sampled images by slot.
    pub images: [ImageHandle; MAX_IMAGE_BIND],
}

impl Bindings {
    /// Bindings with a single vertex buffer at slot 0.
    pub fn with_vertex_buffer(buffer: BufferHandle) -> Self {
        let mut bindings = Self::default();
        bindings.vertex_buffers[0] = buffer;
        bindings
    }

    /// Bound vertex buffers with their slots.
    pub fn bound_vertex_buffers(&self) -> impl Iterator<Item = (u32, BufferHandle)> + '_ {
        self.vertex_buffers
            .iter()
            .enumerate()
            .filter(|(_, handle)| !handle.is_null())
            .map(|(slot, handle)| (slot as u32, *handle))
    }

    /// Bound images with their slots.
    pub fn bound_images(&self) -> impl Iterator<Item = (u32, ImageHandle)> + '_ {
        self.images
            .iter()
            .enumerate()
            .filter(|(_, handle)| !handle.is_null())
            .map(|(slot, handle)| (slot as u32, *handle))
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self {
            vertex_buffers: [BufferHandle::NULL; MAX_BUFFER_BIND],
            index_buffer: BufferHandle::NULL,
            uniform_buffer: UniformBufferHandle::NULL,
            images: [ImageHandle::NULL; MAX_IMAGE_BIND],
        }
    }
}
