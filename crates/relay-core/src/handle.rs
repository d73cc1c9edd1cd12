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

//! Typed resource handles and their allocators.
//!
//! A handle is a 16-bit index whose resource kind is carried by its Rust type,
//! so a `ShaderHandle(3)` and a `BufferHandle(3)` never compare equal. Handles
//! are handed out the moment a `new_*` call is recorded, but the object they
//! name only exists once the backend has replayed the creation command.

use std::fmt;
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use crate::renderer::api::settings::ResourceLimits;
use crate::renderer::error::ResourceError;

/// Reserved raw value meaning "no resource".
pub const NULL_HANDLE: u16 = u16::MAX;

/// The kind of resource a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandleKind {
    /// A single compiled shader stage.
    Shader = 0,
    /// A vertex + fragment shader pair.
    Program = 1,
    /// A render pipeline state object.
    Pipeline = 2,
    /// A render pass description.
    Pass = 3,
    /// A static vertex, index or uniform buffer.
    Buffer = 4,
    /// A per-frame-in-flight uniform buffer.
    UniformBuffer = 5,
    /// A sampled texture.
    Image = 6,
}

impl HandleKind {
    /// Decodes a kind tag written into the command stream.
    pub fn from_wire(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => HandleKind::Shader,
            1 => HandleKind::Program,
            2 => HandleKind::Pipeline,
            3 => HandleKind::Pass,
            4 => HandleKind::Buffer,
            5 => HandleKind::UniformBuffer,
            6 => HandleKind::Image,
            _ => return None,
        })
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Shader => "shader",
            HandleKind::Program => "program",
            HandleKind::Pipeline => "pipeline",
            HandleKind::Pass => "pass",
            HandleKind::Buffer => "buffer",
            HandleKind::UniformBuffer => "uniform buffer",
            HandleKind::Image => "image",
        };
        f.write_str(name)
    }
}

/// Common behaviour of every typed handle.
pub trait Handle: Copy + Eq + fmt::Debug + Pod {
    /// The resource kind this handle type names.
    const KIND: HandleKind;

    /// Builds a handle from its raw index.
    fn from_raw(raw: u16) -> Self;

    /// The raw 16-bit value.
    fn raw(self) -> u16;

    /// Returns `true` for the reserved "no resource" value.
    fn is_null(self) -> bool {
        self.raw() == NULL_HANDLE
    }

    /// The handle as a table index.
    fn index(self) -> usize {
        self.raw() as usize
    }
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
        #[repr(transparent)]
        pub struct $name(u16);

        impl $name {
            /// The null handle of this kind.
            pub const NULL: Self = Self(NULL_HANDLE);

            /// Returns `true` for the reserved "no resource" value.
            pub fn is_null(self) -> bool {
                self.0 == NULL_HANDLE
            }

            /// The handle as a table index.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NULL
            }
        }

        impl Handle for $name {
            const KIND: HandleKind = HandleKind::$kind;

            fn from_raw(raw: u16) -> Self {
                Self(raw)
            }

            fn raw(self) -> u16 {
                self.0
            }
        }

        impl From<$name> for ResourceId {
            fn from(handle: $name) -> Self {
                ResourceId::$kind(handle)
            }
        }
    };
}

define_handle!(
    /// Identifies a shader stage created with `Context::new_shader`.
    ShaderHandle => Shader
);
define_handle!(
    /// Identifies a shader program created with `Context::new_program`.
    ProgramHandle => Program
);
define_handle!(
    /// Identifies a pipeline created with `Context::new_pipeline`.
    PipelineHandle => Pipeline
);
define_handle!(
    /// Identifies a pass created with `Context::new_pass`.
    PassHandle => Pass
);
define_handle!(
    /// Identifies a buffer created with `Context::new_buffer`.
    BufferHandle => Buffer
);
define_handle!(
    /// Identifies a uniform buffer created with `Context::new_uniform_buffer`.
    UniformBufferHandle => UniformBuffer
);
define_handle!(
    /// Identifies an image created with `Context::new_image`.
    ImageHandle => Image
);

/// Any handle, tagged with its kind. Used where one operation accepts every
/// resource kind, such as destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ResourceId {
    Shader(ShaderHandle),
    Program(ProgramHandle),
    Pipeline(PipelineHandle),
    Pass(PassHandle),
    Buffer(BufferHandle),
    UniformBuffer(UniformBufferHandle),
    Image(ImageHandle),
}

impl ResourceId {
    /// The resource kind.
    pub fn kind(self) -> HandleKind {
        match self {
            ResourceId::Shader(_) => HandleKind::Shader,
            ResourceId::Program(_) => HandleKind::Program,
            ResourceId::Pipeline(_) => HandleKind::Pipeline,
            ResourceId::Pass(_) => HandleKind::Pass,
            ResourceId::Buffer(_) => HandleKind::Buffer,
            ResourceId::UniformBuffer(_) => HandleKind::UniformBuffer,
            ResourceId::Image(_) => HandleKind::Image,
        }
    }

    /// The raw index, regardless of kind.
    pub fn raw(self) -> u16 {
        match self {
            ResourceId::Shader(h) => h.raw(),
            ResourceId::Program(h) => h.raw(),
            ResourceId::Pipeline(h) => h.raw(),
            ResourceId::Pass(h) => h.raw(),
            ResourceId::Buffer(h) => h.raw(),
            ResourceId::UniformBuffer(h) => h.raw(),
            ResourceId::Image(h) => h.raw(),
        }
    }

    /// Rebuilds an id from a kind and a raw index.
    pub fn from_parts(kind: HandleKind, raw: u16) -> Self {
        match kind {
            HandleKind::Shader => ResourceId::Shader(ShaderHandle::from_raw(raw)),
            HandleKind::Program => ResourceId::Program(ProgramHandle::from_raw(raw)),
            HandleKind::Pipeline => ResourceId::Pipeline(PipelineHandle::from_raw(raw)),
            HandleKind::Pass => ResourceId::Pass(PassHandle::from_raw(raw)),
            HandleKind::Buffer => ResourceId::Buffer(BufferHandle::from_raw(raw)),
            HandleKind::UniformBuffer => {
                ResourceId::UniformBuffer(UniformBufferHandle::from_raw(raw))
            }
            HandleKind::Image => ResourceId::Image(ImageHandle::from_raw(raw)),
        }
    }
}

/// Hands out handles of one kind as a strictly increasing sequence from 0.
///
/// Handles are never recycled. Once `limit` handles have been issued every
/// further request fails with [`ResourceError::CapacityExceeded`].
#[derive(Debug)]
pub struct HandleAllocator<H: Handle> {
    next: u32,
    limit: u32,
    _marker: PhantomData<H>,
}

impl<H: Handle> HandleAllocator<H> {
    /// Creates an allocator covering the whole 16-bit domain minus the null value.
    pub fn new() -> Self {
        Self::with_limit(NULL_HANDLE as usize)
    }

    /// Creates an allocator that issues at most `limit` handles.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            next: 0,
            limit: limit.min(NULL_HANDLE as usize) as u32,
            _marker: PhantomData,
        }
    }

    /// Issues the next handle.
    pub fn allocate(&mut self) -> Result<H, ResourceError> {
        if self.next >= self.limit {
            return Err(ResourceError::CapacityExceeded {
                kind: H::KIND,
                capacity: self.limit as usize,
            });
        }
        let handle = H::from_raw(self.next as u16);
        self.next += 1;
        Ok(handle)
    }

    /// Number of handles issued so far.
    pub fn issued(&self) -> usize {
        self.next as usize
    }

    /// Maximum number of handles this allocator will issue.
    pub fn limit(&self) -> usize {
        self.limit as usize
    }
}

impl<H: Handle> Default for HandleAllocator<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// One allocator per resource kind.
#[derive(Debug, Default)]
#[allow(missing_docs)]
pub struct HandleAllocators {
    pub shaders: HandleAllocator<ShaderHandle>,
    pub programs: HandleAllocator<ProgramHandle>,
    pub pipelines: HandleAllocator<PipelineHandle>,
    pub passes: HandleAllocator<PassHandle>,
    pub buffers: HandleAllocator<BufferHandle>,
    pub uniform_buffers: HandleAllocator<UniformBufferHandle>,
    pub images: HandleAllocator<ImageHandle>,
}

impl HandleAllocators {
    /// Builds allocators whose limits match the backend table capacities, so
    /// exhaustion is reported at record time instead of during replay.
    pub fn from_limits(limits: &ResourceLimits) -> Self {
        Self {
            shaders: HandleAllocator::with_limit(limits.shaders),
            programs: HandleAllocator::with_limit(limits.programs),
            pipelines: HandleAllocator::with_limit(limits.pipelines),
            passes: HandleAllocator::with_limit(limits.passes),
            buffers: HandleAllocator::with_limit(limits.buffers),
            uniform_buffers: HandleAllocator::with_limit(limits.uniform_buffers),
            images: HandleAllocator::with_limit(limits.images),
        }
    }
}
