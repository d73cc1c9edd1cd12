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

//! The recording facade applications talk to.
//!
//! Resource creation and draw-state calls are not executed when they are made.
//! They allocate a handle where needed, serialize themselves into the frame's
//! command stream and return. [`Context::commit_frame`] replays the whole
//! stream against the backend in recording order and then presents.

use crate::command::{payload_len, Command, CommandBuffer};
use crate::handle::{
    BufferHandle, HandleAllocators, ImageHandle, PassHandle, PipelineHandle, ProgramHandle,
    ResourceId, ShaderHandle, UniformBufferHandle,
};
use crate::renderer::api::{
    Bindings, BufferType, GraphicsApi, InitInfo, PassDesc, PipelineDesc, Resolution, ShaderStage,
    ShaderType, TextureDesc,
};
use crate::renderer::error::{DescriptorError, RenderError, ResourceError};
use crate::renderer::traits::{FrameStatus, RenderBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingResize {
    resolution: Resolution,
    /// Frame index of the first commit allowed to apply it.
    apply_at: u64,
}

/// An owned rendering context driving one backend.
///
/// A context is single-threaded: it records from the thread that owns it and
/// replays on the same thread. Dropping it shuts the backend down.
#[derive(Debug)]
pub struct Context {
    backend: Box<dyn RenderBackend>,
    api: GraphicsApi,
    commands: CommandBuffer,
    handles: HandleAllocators,
    resolution: Resolution,
    pending_resize: Option<PendingResize>,
    frame_index: u64,
    recorded: usize,
    initialized: bool,
}

impl Context {
    /// Initializes `backend` and wraps it in a context.
    pub fn new(mut backend: Box<dyn RenderBackend>, info: &InitInfo) -> Result<Self, RenderError> {
        info.settings.validate()?;
        if backend.api() != info.api {
            log::warn!(
                "Context: requested {} but the backend drives {}",
                info.api,
                backend.api()
            );
        }

        log::info!(
            "Context: initializing {} backend at {}",
            backend.api(),
            info.resolution
        );
        backend.init(info)?;

        Ok(Self {
            api: backend.api(),
            backend,
            commands: CommandBuffer::with_capacity(info.settings.command_buffer_capacity),
            handles: HandleAllocators::from_limits(&info.settings.limits),
            resolution: info.resolution,
            pending_resize: None,
            frame_index: 0,
            recorded: 0,
            initialized: true,
        })
    }

    // --- Resource creation ---

    /// Records the creation of a shader stage from SPIR-V bytecode.
    pub fn new_shader(
        &mut self,
        ty: ShaderType,
        bytecode: &[u8],
    ) -> Result<ShaderHandle, RenderError> {
        self.ensure_initialized()?;
        check_payload(bytecode)?;
        let handle = self.handles.shaders.allocate()?;
        self.record(Command::NewShader {
            handle,
            ty,
            bytecode,
        });
        Ok(handle)
    }

    /// Records the creation of a program from a vertex and a fragment shader.
    pub fn new_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, RenderError> {
        self.ensure_initialized()?;
        let handle = self.handles.programs.allocate()?;
        self.record(Command::NewProgram {
            handle,
            vertex,
            fragment,
        });
        Ok(handle)
    }

    /// Records the creation of a pipeline.
    pub fn new_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle, RenderError> {
        self.ensure_initialized()?;
        let handle = self.handles.pipelines.allocate()?;
        self.record(Command::NewPipeline {
            handle,
            desc: *desc,
        });
        Ok(handle)
    }

    /// Records the creation of a pass.
    pub fn new_pass(&mut self, desc: &PassDesc) -> Result<PassHandle, RenderError> {
        self.ensure_initialized()?;
        let handle = self.handles.passes.allocate()?;
        self.record(Command::NewPass {
            handle,
            desc: *desc,
        });
        Ok(handle)
    }

    /// Records the creation of a buffer holding a copy of `data`.
    pub fn new_buffer(&mut self, data: &[u8], ty: BufferType) -> Result<BufferHandle, RenderError> {
        self.ensure_initialized()?;
        if data.is_empty() {
            return Err(DescriptorError::Empty.into());
        }
        check_payload(data)?;
        let handle = self.handles.buffers.allocate()?;
        self.record(Command::NewBuffer { handle, ty, data });
        Ok(handle)
    }

    /// Records the creation of a uniform buffer with `size` bytes per frame in flight.
    pub fn new_uniform_buffer(&mut self, size: u32) -> Result<UniformBufferHandle, RenderError> {
        self.ensure_initialized()?;
        if size == 0 {
            return Err(DescriptorError::Empty.into());
        }
        let handle = self.handles.uniform_buffers.allocate()?;
        self.record(Command::NewUniformBuffer { handle, size });
        Ok(handle)
    }

    /// Records the creation of an RGBA8 image from tightly packed pixels.
    pub fn new_image(&mut self, data: &[u8], desc: &TextureDesc) -> Result<ImageHandle, RenderError> {
        self.ensure_initialized()?;
        if desc.width == 0 || desc.height == 0 {
            return Err(DescriptorError::Empty.into());
        }
        if desc.byte_len() != data.len() as u64 {
            return Err(DescriptorError::ImageSizeMismatch {
                expected: desc.byte_len(),
                actual: data.len() as u64,
            }
            .into());
        }
        check_payload(data)?;
        let handle = self.handles.images.allocate()?;
        self.record(Command::NewImage {
            handle,
            desc: *desc,
            data,
        });
        Ok(handle)
    }

    /// Records the release of a resource. The handle is never reissued.
    pub fn destroy(&mut self, id: impl Into<ResourceId>) -> Result<(), RenderError> {
        self.ensure_initialized()?;
        let id = id.into();
        if id.raw() == crate::handle::NULL_HANDLE {
            return Err(ResourceError::InvalidHandle { kind: id.kind() }.into());
        }
        self.record(Command::Destroy(id));
        Ok(())
    }

    // --- Draw state ---
    //
    // These cannot fail at record time. After shutdown they are dropped.

    /// Records the start of the pass targeting the swapchain image.
    pub fn begin_default_pass(&mut self) {
        self.record(Command::BeginDefaultPass);
    }

    /// Records the start of a user pass.
    pub fn begin_pass(&mut self, pass: PassHandle) {
        self.record(Command::BeginPass(pass));
    }

    /// Records a pipeline bind.
    pub fn apply_pipeline(&mut self, pipeline: PipelineHandle) {
        self.record(Command::ApplyPipeline(pipeline));
    }

    /// Records a snapshot of `bindings`.
    pub fn apply_bindings(&mut self, bindings: &Bindings) {
        self.record(Command::ApplyBindings(*bindings));
    }

    /// Records a uniform upload for `stage`. The bytes are copied.
    pub fn apply_uniforms(&mut self, stage: ShaderStage, data: &[u8]) -> Result<(), RenderError> {
        self.ensure_initialized()?;
        check_payload(data)?;
        self.record(Command::ApplyUniforms { stage, data });
        Ok(())
    }

    /// Records a non-indexed draw.
    pub fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        self.record(Command::Draw {
            first_vertex,
            vertex_count,
        });
    }

    /// Records an indexed draw.
    pub fn draw_indexed(&mut self, first_index: u32, index_count: u32) {
        self.record(Command::DrawIndexed {
            first_index,
            index_count,
        });
    }

    /// Records the end of the current pass.
    pub fn end_pass(&mut self) {
        self.record(Command::EndPass);
    }

    // --- Immediate operations ---

    /// Requests a new surface size.
    ///
    /// Nothing is resized here. If the current frame has no recorded commands
    /// yet the new size applies at the next commit, before replay. Otherwise
    /// the recorded commands replay against the old size and the new one
    /// takes effect from the following frame.
    pub fn reset(&mut self, width: u32, height: u32) {
        let resolution = Resolution::new(width, height);
        let apply_at = if self.recorded == 0 {
            self.frame_index
        } else {
            self.frame_index + 1
        };
        log::debug!(
            "Context: resize to {resolution} requested, effective at frame {apply_at}"
        );
        self.pending_resize = Some(PendingResize {
            resolution,
            apply_at,
        });
    }

    /// Replays the frame's commands against the backend, then presents.
    ///
    /// If a command fails the rest of the frame is dropped, the backend is
    /// told to discard its partial work and [`RenderError::Replay`] reports the
    /// index and kind of the failing command. A failed resize drops the frame
    /// the same way and stays pending. The stream is always cleared.
    pub fn commit_frame(&mut self) -> Result<FrameStatus, RenderError> {
        self.ensure_initialized()?;
        if let Err(err) = self.apply_pending_resize() {
            log::error!(
                "Context: frame {} dropped, resize failed: {err}",
                self.frame_index
            );
            self.end_frame();
            return Err(err);
        }

        Command::End.encode(&mut self.commands);
        let replayed = replay(self.backend.as_mut(), &self.commands);

        log::debug!(
            "Context: frame {} replayed {} commands ({} bytes)",
            self.frame_index,
            self.recorded,
            self.commands.len()
        );
        self.end_frame();

        if let Err(err) = replayed {
            log::error!("Context: frame {} dropped: {err}", self.frame_index - 1);
            self.backend.discard_frame();
            return Err(err);
        }

        let status = self.backend.commit_frame()?;
        if status == FrameStatus::SurfaceOutdated && self.pending_resize.is_none() {
            log::warn!("Context: surface outdated, recreating at {}", self.resolution);
            self.pending_resize = Some(PendingResize {
                resolution: self.resolution,
                apply_at: self.frame_index,
            });
        }
        Ok(status)
    }

    /// Shuts the backend down. Further creation and commits fail with
    /// [`RenderError::NotInitialized`], and draw-state calls are ignored.
    /// Calling it twice is harmless.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;
        self.commands.reset();
        self.recorded = 0;
        self.pending_resize = None;
        self.backend.shutdown();
        log::info!("Context: shut down after {} frames", self.frame_index);
    }

    // --- Queries ---

    /// The API of the active backend.
    pub fn api(&self) -> GraphicsApi {
        self.api
    }

    /// The surface size the backend currently renders at.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// A requested size that has not been applied yet.
    pub fn pending_resolution(&self) -> Option<Resolution> {
        self.pending_resize.map(|pending| pending.resolution)
    }

    /// Number of commits so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Commands recorded since the last commit.
    pub fn recorded_commands(&self) -> usize {
        self.recorded
    }

    /// `false` after shutdown.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The backend, for backend-specific inspection.
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    fn ensure_initialized(&self) -> Result<(), RenderError> {
        if self.initialized {
            Ok(())
        } else {
            Err(RenderError::NotInitialized)
        }
    }

    fn record(&mut self, command: Command<'_>) {
        if !self.initialized {
            log::warn!("Context: {:?} recorded after shutdown, ignored", command.kind());
            return;
        }
        log::trace!("Context: record #{} {:?}", self.recorded, command.kind());
        command.encode(&mut self.commands);
        self.recorded += 1;
    }

    fn end_frame(&mut self) {
        self.commands.reset();
        self.recorded = 0;
        self.frame_index += 1;
    }

    fn apply_pending_resize(&mut self) -> Result<(), RenderError> {
        let Some(pending) = self.pending_resize else {
            return Ok(());
        };
        if pending.apply_at > self.frame_index {
            return Ok(());
        }
        log::debug!(
            "Context: applying resize {} -> {}",
            self.resolution,
            pending.resolution
        );
        self.backend.resize(pending.resolution)?;
        self.resolution = pending.resolution;
        self.pending_resize = None;
        Ok(())
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn check_payload(payload: &[u8]) -> Result<(), RenderError> {
    payload_len(payload)?;
    Ok(())
}

/// Decodes and dispatches every command up to the end marker. Returns the
/// number of commands executed.
fn replay(backend: &mut dyn RenderBackend, commands: &CommandBuffer) -> Result<usize, RenderError> {
    let mut reader = commands.reader();
    let mut index = 0;
    loop {
        let command = Command::decode(&mut reader);
        if let Command::End = command {
            assert!(
                reader.is_exhausted(),
                "command stream desync: {} bytes after the end marker",
                commands.len() - reader.position()
            );
            return Ok(index);
        }

        let kind = command.kind();
        log::trace!("Context: replay #{index} {kind:?}");
        dispatch(backend, command).map_err(|source| RenderError::Replay {
            index,
            command: kind,
            source: Box::new(source),
        })?;
        index += 1;
    }
}

fn dispatch(backend: &mut dyn RenderBackend, command: Command<'_>) -> Result<(), RenderError> {
    match command {
        Command::NewShader {
            handle,
            ty,
            bytecode,
        } => backend.new_shader(handle, ty, bytecode),
        Command::NewProgram {
            handle,
            vertex,
            fragment,
        } => backend.new_program(handle, vertex, fragment),
        Command::NewPipeline { handle, desc } => backend.new_pipeline(handle, &desc),
        Command::NewPass { handle, desc } => backend.new_pass(handle, &desc),
        Command::NewBuffer { handle, ty, data } => backend.new_buffer(handle, ty, data),
        Command::NewUniformBuffer { handle, size } => backend.new_uniform_buffer(handle, size),
        Command::NewImage { handle, desc, data } => backend.new_image(handle, &desc, data),
        Command::Destroy(id) => backend.destroy(id),
        Command::BeginDefaultPass => backend.begin_default_pass(),
        Command::BeginPass(pass) => backend.begin_pass(pass),
        Command::ApplyPipeline(pipeline) => backend.apply_pipeline(pipeline),
        Command::ApplyBindings(bindings) => backend.apply_bindings(&bindings),
        Command::ApplyUniforms { stage, data } => backend.apply_uniforms(stage, data),
        Command::Draw {
            first_vertex,
            vertex_count,
        } => backend.draw(first_vertex, vertex_count),
        Command::DrawIndexed {
            first_index,
            index_count,
        } => backend.draw_indexed(first_index, index_count),
        Command::EndPass => backend.end_pass(),
        Command::End => Ok(()),
    }
}
