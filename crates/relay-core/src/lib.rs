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

//! # Relay Core
//!
//! Backend-agnostic half of the relay renderer: typed resource handles, the
//! per-frame command stream, the [`RenderBackend`] contract and the
//! [`Context`] that records calls and replays them against a backend at
//! [`Context::commit_frame`].

#![warn(missing_docs)]

pub mod command;
pub mod context;
pub mod handle;
pub mod platform;
pub mod renderer;

pub use context::Context;
pub use handle::{
    BufferHandle, Handle, HandleKind, ImageHandle, PassHandle, PipelineHandle, ProgramHandle,
    ResourceId, ShaderHandle, UniformBufferHandle, NULL_HANDLE,
};
pub use renderer::traits::{FrameStatus, RenderBackend};
