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

use std::any::Any;

use crate::handle::{
    BufferHandle, ImageHandle, PassHandle, PipelineHandle, ProgramHandle, ResourceId,
    ShaderHandle, UniformBufferHandle,
};
use crate::renderer::api::{
    Bindings, BufferType, GraphicsApi, InitInfo, PassDesc, PipelineDesc, Resolution, ShaderStage,
    ShaderType, TextureDesc,
};
use crate::renderer::error::{InitError, RenderError};

/// Outcome of a committed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The frame was submitted and presented.
    Presented,
    /// The surface no longer matches the window. The frame was dropped and the
    /// surface is recreated at the next commit.
    SurfaceOutdated,
}

/// A concrete graphics backend driven by the [`Context`](crate::Context).
///
/// Creation methods receive the handle the context already gave out and
/// store the new object at that handle's index. Every method other than
/// `init`, `shutdown`, `resize` and `commit_frame` is only ever called while
/// replaying a frame's command stream, in recording order.
pub trait RenderBackend: std::fmt::Debug {
    /// The API this backend drives.
    fn api(&self) -> GraphicsApi;

    /// Bring the backend up against the window in `info`.
    fn init(&mut self, info: &InitInfo) -> Result<(), InitError>;

    /// Wait for the GPU to go idle and release every object. Must be idempotent.
    fn shutdown(&mut self);

    /// Recreate the swapchain and anything sized from it.
    fn resize(&mut self, resolution: Resolution) -> Result<(), RenderError>;

    /// Compile one shader stage.
    fn new_shader(
        &mut self,
        handle: ShaderHandle,
        ty: ShaderType,
        bytecode: &[u8],
    ) -> Result<(), RenderError>;

    /// Pair a vertex and a fragment shader.
    fn new_program(
        &mut self,
        handle: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<(), RenderError>;

    /// Build a pipeline state object.
    fn new_pipeline(&mut self, handle: PipelineHandle, desc: &PipelineDesc)
        -> Result<(), RenderError>;

    /// Register a render pass.
    fn new_pass(&mut self, handle: PassHandle, desc: &PassDesc) -> Result<(), RenderError>;

    /// Create a buffer initialized with `data`.
    fn new_buffer(
        &mut self,
        handle: BufferHandle,
        ty: BufferType,
        data: &[u8],
    ) -> Result<(), RenderError>;

    /// Create a per-frame-in-flight uniform buffer of `size` bytes per frame.
    fn new_uniform_buffer(
        &mut self,
        handle: UniformBufferHandle,
        size: u32,
    ) -> Result<(), RenderError>;

    /// Create an RGBA8 image initialized with `data`.
    fn new_image(
        &mut self,
        handle: ImageHandle,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<(), RenderError>;

    /// Release a resource once the GPU no longer uses it.
    fn destroy(&mut self, id: ResourceId) -> Result<(), RenderError>;

    /// Begin the pass that targets the current swapchain image.
    fn begin_default_pass(&mut self) -> Result<(), RenderError>;

    /// Begin a user pass.
    fn begin_pass(&mut self, pass: PassHandle) -> Result<(), RenderError>;

    /// Bind a pipeline for the following draws.
    fn apply_pipeline(&mut self, pipeline: PipelineHandle) -> Result<(), RenderError>;

    /// Bind buffers and images for the following draws.
    fn apply_bindings(&mut self, bindings: &Bindings) -> Result<(), RenderError>;

    /// Upload uniform data for the following draws.
    fn apply_uniforms(&mut self, stage: ShaderStage, data: &[u8]) -> Result<(), RenderError>;

    /// Non-indexed draw.
    fn draw(&mut self, first_vertex: u32, vertex_count: u32) -> Result<(), RenderError>;

    /// Indexed draw with 16-bit indices.
    fn draw_indexed(&mut self, first_index: u32, index_count: u32) -> Result<(), RenderError>;

    /// End the current pass.
    fn end_pass(&mut self) -> Result<(), RenderError>;

    /// Submit the recorded frame, present it and advance to the next frame slot.
    fn commit_frame(&mut self) -> Result<FrameStatus, RenderError>;

    /// Drop whatever was recorded for the current frame after a replay failure.
    fn discard_frame(&mut self) {}

    /// Downcast to Any for type-specific access
    fn as_any(&self) -> &dyn Any;
}
