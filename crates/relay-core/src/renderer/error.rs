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

//! Defines the hierarchy of error types for the rendering subsystem.

use std::fmt;

use crate::command::CommandKind;
use crate::handle::{HandleKind, PipelineHandle, ProgramHandle, ShaderHandle};
use crate::renderer::api::{GraphicsApi, PrimitiveType};

/// A failure while bringing a backend up.
#[derive(Debug)]
pub enum InitError {
    /// The backend needs a window but none was supplied.
    MissingPlatformHandle,
    /// The settings contain an out-of-range or unparsable value.
    InvalidSettings(String),
    /// The requested API is not available in this build or on this machine.
    UnsupportedApi(GraphicsApi),
    /// No adapter can drive the surface.
    NoSuitableAdapter(String),
    /// The presentation surface could not be created.
    SurfaceCreationFailed(String),
    /// The logical device could not be created.
    DeviceCreationFailed(String),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitError::MissingPlatformHandle => {
                write!(f, "No platform window handle was provided.")
            }
            InitError::InvalidSettings(msg) => write!(f, "Invalid renderer settings: {msg}"),
            InitError::UnsupportedApi(api) => write!(f, "Graphics API {api} is not supported."),
            InitError::NoSuitableAdapter(msg) => write!(f, "No suitable adapter found: {msg}"),
            InitError::SurfaceCreationFailed(msg) => {
                write!(f, "Failed to create presentation surface: {msg}")
            }
            InitError::DeviceCreationFailed(msg) => {
                write!(f, "Failed to create logical device: {msg}")
            }
        }
    }
}

impl std::error::Error for InitError {}

/// An error related to the creation of a shader module.
#[derive(Debug)]
pub enum ShaderError {
    /// The bytecode is not a well-formed SPIR-V module.
    InvalidBytecode {
        /// The shader being created.
        handle: ShaderHandle,
        /// Why the bytecode was rejected.
        reason: String,
    },
    /// The backend rejected the module.
    CompilationFailed {
        /// The shader being created.
        handle: ShaderHandle,
        /// Detailed messages from the shader compiler.
        details: String,
    },
    /// The backend cannot run shaders of this stage.
    UnsupportedStage {
        /// The shader being created.
        handle: ShaderHandle,
        /// The requested stage.
        stage: String,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::InvalidBytecode { handle, reason } => {
                write!(f, "Invalid bytecode for shader {handle:?}: {reason}")
            }
            ShaderError::CompilationFailed { handle, details } => {
                write!(f, "Shader compilation failed for {handle:?}: {details}")
            }
            ShaderError::UnsupportedStage { handle, stage } => {
                write!(f, "Shader {handle:?} uses unsupported stage '{stage}'")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation of a program or pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// A program references a shader of the wrong stage.
    StageMismatch {
        /// The program being created.
        program: ProgramHandle,
        /// The offending shader.
        shader: ShaderHandle,
    },
    /// The pipeline's program does not exist.
    MissingProgram {
        /// The pipeline being created.
        pipeline: PipelineHandle,
        /// The referenced program.
        program: ProgramHandle,
    },
    /// The topology cannot be expressed by the backend.
    UnsupportedTopology {
        /// The pipeline being created.
        pipeline: PipelineHandle,
        /// The requested topology.
        primitive: PrimitiveType,
    },
    /// The backend failed to compile the pipeline state object.
    CompilationFailed {
        /// The pipeline being created.
        pipeline: PipelineHandle,
        /// Detailed messages from the backend.
        details: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::StageMismatch { program, shader } => {
                write!(f, "Program {program:?} received shader {shader:?} of the wrong stage")
            }
            PipelineError::MissingProgram { pipeline, program } => {
                write!(f, "Pipeline {pipeline:?} references missing program {program:?}")
            }
            PipelineError::UnsupportedTopology {
                pipeline,
                primitive,
            } => {
                write!(f, "Pipeline {pipeline:?} uses unsupported topology {primitive:?}")
            }
            PipelineError::CompilationFailed { pipeline, details } => {
                write!(f, "Pipeline compilation failed for {pipeline:?}: {details}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

/// A descriptor or payload was rejected before reaching the backend.
#[derive(Debug, PartialEq, Eq)]
pub enum DescriptorError {
    /// A vertex layout already holds the maximum number of attributes.
    TooManyAttributes {
        /// The maximum.
        max: usize,
    },
    /// Two attributes share a shader location.
    DuplicateLocation {
        /// The location.
        location: u32,
    },
    /// Pixel data does not match `width * height * 4`.
    ImageSizeMismatch {
        /// Expected byte count.
        expected: u64,
        /// Provided byte count.
        actual: u64,
    },
    /// A payload does not fit the 32-bit length prefix of the command stream.
    PayloadTooLarge {
        /// Payload size in bytes.
        len: usize,
    },
    /// A zero-sized buffer or image was requested.
    Empty,
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::TooManyAttributes { max } => {
                write!(f, "Vertex layout already holds the maximum of {max} attributes")
            }
            DescriptorError::DuplicateLocation { location } => {
                write!(f, "Vertex attribute location {location} is used twice")
            }
            DescriptorError::ImageSizeMismatch { expected, actual } => {
                write!(f, "Image data is {actual} bytes, expected {expected}")
            }
            DescriptorError::PayloadTooLarge { len } => {
                write!(f, "Payload of {len} bytes is too large to record")
            }
            DescriptorError::Empty => write!(f, "Resource size must not be zero"),
        }
    }
}

impl std::error::Error for DescriptorError {}

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A shader-specific error occurred.
    Shader(ShaderError),
    /// A program or pipeline error occurred.
    Pipeline(PipelineError),
    /// A descriptor was malformed.
    Descriptor(DescriptorError),
    /// A handle allocator or resource table is full.
    CapacityExceeded {
        /// Resource kind.
        kind: HandleKind,
        /// Configured capacity.
        capacity: usize,
    },
    /// The null handle was used where a resource is required.
    InvalidHandle {
        /// Resource kind.
        kind: HandleKind,
    },
    /// No resource exists at this index.
    NotFound {
        /// Resource kind.
        kind: HandleKind,
        /// Raw handle value.
        index: u16,
    },
    /// A creation command targeted an occupied slot.
    AlreadyExists {
        /// Resource kind.
        kind: HandleKind,
        /// Raw handle value.
        index: u16,
    },
    /// The resource was destroyed and its handle is stale.
    Destroyed {
        /// Resource kind.
        kind: HandleKind,
        /// Raw handle value.
        index: u16,
    },
    /// A uniform update does not fit the remaining per-frame space.
    UniformOverflow {
        /// Bytes requested, including alignment.
        requested: u64,
        /// Bytes still free this frame.
        available: u64,
    },
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::Shader(err) => write!(f, "Shader resource error: {err}"),
            ResourceError::Pipeline(err) => write!(f, "Pipeline resource error: {err}"),
            ResourceError::Descriptor(err) => write!(f, "Invalid descriptor: {err}"),
            ResourceError::CapacityExceeded { kind, capacity } => {
                write!(f, "Capacity exceeded: at most {capacity} {kind} resources")
            }
            ResourceError::InvalidHandle { kind } => write!(f, "Null {kind} handle."),
            ResourceError::NotFound { kind, index } => {
                write!(f, "No {kind} exists at index {index}.")
            }
            ResourceError::AlreadyExists { kind, index } => {
                write!(f, "A {kind} already exists at index {index}.")
            }
            ResourceError::Destroyed { kind, index } => {
                write!(f, "The {kind} at index {index} was destroyed.")
            }
            ResourceError::UniformOverflow {
                requested,
                available,
            } => {
                write!(
                    f,
                    "Uniform update of {requested} bytes exceeds the {available} bytes left this frame."
                )
            }
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Shader(err) => Some(err),
            ResourceError::Pipeline(err) => Some(err),
            ResourceError::Descriptor(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for ResourceError {
    fn from(err: ShaderError) -> Self {
        ResourceError::Shader(err)
    }
}

impl From<PipelineError> for ResourceError {
    fn from(err: PipelineError) -> Self {
        ResourceError::Pipeline(err)
    }
}

impl From<DescriptorError> for ResourceError {
    fn from(err: DescriptorError) -> Self {
        ResourceError::Descriptor(err)
    }
}

/// A high-level error returned by the context or a backend.
#[derive(Debug)]
pub enum RenderError {
    /// An operation was attempted before init or after shutdown.
    NotInitialized,
    /// The backend failed to initialize.
    Initialization(InitError),
    /// An error occurred while managing a GPU resource.
    Resource(ResourceError),
    /// A draw-state call arrived in the wrong state, e.g. a draw outside a pass.
    InvalidState(String),
    /// A recorded command failed during replay; the rest of the frame was dropped.
    Replay {
        /// Zero-based position of the failing command in the frame.
        index: usize,
        /// Kind of the failing command.
        command: CommandKind,
        /// The backend error.
        source: Box<RenderError>,
    },
    /// Failed to acquire the next frame from the swapchain/surface for rendering.
    SurfaceAcquisitionFailed(String),
    /// The graphics device was lost and the context must be recreated.
    DeviceLost,
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::NotInitialized => {
                write!(f, "The rendering context is not initialized.")
            }
            RenderError::Initialization(err) => {
                write!(f, "Failed to initialize graphics backend: {err}")
            }
            RenderError::Resource(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::InvalidState(msg) => write!(f, "Invalid render state: {msg}"),
            RenderError::Replay {
                index,
                command,
                source,
            } => {
                write!(f, "Replay of command #{index} ({command:?}) failed: {source}")
            }
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface for rendering: {msg}")
            }
            RenderError::DeviceLost => write!(
                f,
                "The graphics device was lost and needs to be reinitialized."
            ),
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Initialization(err) => Some(err),
            RenderError::Resource(err) => Some(err),
            RenderError::Replay { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<InitError> for RenderError {
    fn from(err: InitError) -> Self {
        RenderError::Initialization(err)
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::Resource(err.into())
    }
}

impl From<PipelineError> for RenderError {
    fn from(err: PipelineError) -> Self {
        RenderError::Resource(err.into())
    }
}

impl From<DescriptorError> for RenderError {
    fn from(err: DescriptorError) -> Self {
        RenderError::Resource(err.into())
    }
}
