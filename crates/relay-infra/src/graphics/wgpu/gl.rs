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

//! The immediate backend.
//!
//! Runs on wgpu's GL backend one frame at a time: every commit waits for the
//! device to go idle, so releases only have to outlive the frame's submit.

use std::any::Any;

use relay_core::renderer::{
    Bindings, BufferType, FrameStatus, GraphicsApi, InitError, InitInfo, PassDesc, PipelineDesc,
    RenderBackend, RenderError, Resolution, ShaderStage, ShaderType, TextureDesc,
    IMAGE_BYTES_PER_PIXEL,
};
use relay_core::{
    BufferHandle, ImageHandle, PassHandle, PipelineHandle, ProgramHandle, ResourceId,
    ShaderHandle, UniformBufferHandle,
};

use super::context::{
    instance_flags, into_init_error, ContextOptions, SurfaceFrame, WgpuGraphicsContext,
};
use super::conversions::IntoWgpu;
use super::recorder::{PassRecorder, PassTarget};
use super::resources::{GpuResources, Retired};

/// The only uniform region: the previous frame is always finished.
const SLOT: usize = 0;

#[derive(Debug)]
struct GlState {
    context: WgpuGraphicsContext,
    resources: GpuResources,
    recorder: PassRecorder,
    surface: SurfaceFrame,
    /// Released during the current frame, freed once it has executed.
    pending: Vec<Retired>,
    /// Bumped for every recorded frame, submitted or discarded.
    frame: u64,
}

impl GlState {
    fn begin_pass(&mut self, target: PassTarget) -> Result<(), RenderError> {
        let desc = match target {
            PassTarget::Default => PassDesc::DEFAULT_PASS,
            PassTarget::User(handle) => *self.resources.passes.get(handle)?,
        };
        let view = self.surface.acquire(&self.context)?;
        self.recorder
            .begin(&self.context.device, target, &desc, view)
    }

    fn upload_image(
        &mut self,
        handle: ImageHandle,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let texture = self.resources.create_image(handle, desc)?;
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(desc.width * IMAGE_BYTES_PER_PIXEL),
                rows_per_image: Some(desc.height),
            },
            desc.into_wgpu(),
        );
        Ok(())
    }

    fn commit(&mut self) -> Result<FrameStatus, RenderError> {
        let frame = self.recorder.finish()?;
        self.context.queue.submit(frame);
        let status = self.surface.present();
        self.context.wait_idle();

        let released = std::mem::take(&mut self.pending);
        if !released.is_empty() {
            log::trace!("GlRenderBackend: releasing {} object(s)", released.len());
        }
        released.into_iter().for_each(Retired::release);

        log::debug!("GlRenderBackend: frame {} submitted ({status:?})", self.frame);
        self.frame += 1;
        Ok(status)
    }

    fn discard(&mut self) {
        self.recorder.discard();
        self.surface.discard();
        self.frame += 1;
    }

    fn shutdown(mut self) {
        self.discard();
        self.context.wait_idle();
        let mut retired = std::mem::take(&mut self.pending);
        retired.extend(self.resources.drain());
        let count = retired.len();
        retired.into_iter().for_each(Retired::release);
        self.resources.release_fallbacks();
        log::info!("GlRenderBackend: shut down, released {count} object(s)");
    }
}

/// Immediate backend: one frame at a time.
#[derive(Debug, Default)]
pub struct GlRenderBackend {
    state: Option<GlState>,
}

impl GlRenderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the adapter, once initialized.
    pub fn adapter_name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.context.adapter_name.as_str())
    }

    fn state(&mut self) -> Result<&mut GlState, RenderError> {
        self.state.as_mut().ok_or(RenderError::NotInitialized)
    }
}

impl RenderBackend for GlRenderBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::OpenGl
    }

    fn init(&mut self, info: &InitInfo) -> Result<(), InitError> {
        if self.state.is_some() {
            log::warn!("GlRenderBackend: already initialized, shutting down first.");
            self.shutdown();
        }
        let window = info
            .platform
            .clone()
            .ok_or(InitError::MissingPlatformHandle)?;
        let settings = &info.settings;
        let options = ContextOptions {
            label: "Relay GL Device",
            backends: GraphicsApi::OpenGl.into_wgpu(),
            flags: instance_flags(settings.validation, &info.extension_names),
            present_mode: settings.present_mode,
            frame_latency: 1,
        };
        let context = pollster::block_on(WgpuGraphicsContext::new(
            window,
            info.resolution,
            &options,
        ))
        .map_err(into_init_error)?;

        let alignment = context.uniform_alignment(settings.uniform_alignment);
        let resources = GpuResources::new(
            &context.device,
            &context.queue,
            context.surface_format(),
            &settings.limits,
            SLOT + 1,
            alignment,
        );
        log::info!("GlRenderBackend: initialized on \"{}\"", context.adapter_name);
        self.state = Some(GlState {
            context,
            resources,
            recorder: PassRecorder::new(),
            surface: SurfaceFrame::default(),
            pending: Vec::new(),
            frame: 0,
        });
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(state) = self.state.take() {
            log::info!("GlRenderBackend: shutting down...");
            state.shutdown();
        }
    }

    fn resize(&mut self, resolution: Resolution) -> Result<(), RenderError> {
        let state = self.state()?;
        log::debug!("GlRenderBackend: reconfiguring surface at {resolution}");
        state.context.resize(resolution);
        Ok(())
    }

    fn new_shader(
        &mut self,
        handle: ShaderHandle,
        ty: ShaderType,
        bytecode: &[u8],
    ) -> Result<(), RenderError> {
        self.state()?.resources.create_shader(handle, ty, bytecode)
    }

    fn new_program(
        &mut self,
        handle: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<(), RenderError> {
        self.state()?
            .resources
            .create_program(handle, vertex, fragment)
    }

    fn new_pipeline(
        &mut self,
        handle: PipelineHandle,
        desc: &PipelineDesc,
    ) -> Result<(), RenderError> {
        self.state()?.resources.create_pipeline(handle, desc)
    }

    fn new_pass(&mut self, handle: PassHandle, desc: &PassDesc) -> Result<(), RenderError> {
        self.state()?.resources.create_pass(handle, desc)
    }

    fn new_buffer(
        &mut self,
        handle: BufferHandle,
        ty: BufferType,
        data: &[u8],
    ) -> Result<(), RenderError> {
        self.state()?.resources.create_buffer(handle, ty, data)
    }

    fn new_uniform_buffer(
        &mut self,
        handle: UniformBufferHandle,
        size: u32,
    ) -> Result<(), RenderError> {
        self.state()?.resources.create_uniform_buffer(handle, size)
    }

    fn new_image(
        &mut self,
        handle: ImageHandle,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<(), RenderError> {
        self.state()?.upload_image(handle, desc, data)
    }

    fn destroy(&mut self, id: ResourceId) -> Result<(), RenderError> {
        let state = self.state()?;
        if let Some(retired) = state.resources.remove(id)? {
            state.pending.push(retired);
        }
        Ok(())
    }

    fn begin_default_pass(&mut self) -> Result<(), RenderError> {
        self.state()?.begin_pass(PassTarget::Default)
    }

    fn begin_pass(&mut self, pass: PassHandle) -> Result<(), RenderError> {
        self.state()?.begin_pass(PassTarget::User(pass))
    }

    fn apply_pipeline(&mut self, pipeline: PipelineHandle) -> Result<(), RenderError> {
        let state = self.state()?;
        state.recorder.apply_pipeline(&state.resources, pipeline)
    }

    fn apply_bindings(&mut self, bindings: &Bindings) -> Result<(), RenderError> {
        let state = self.state()?;
        if let Some(group) = state.recorder.apply_bindings(&state.resources, bindings)? {
            state.pending.push(Retired::BindGroup(group));
        }
        Ok(())
    }

    fn apply_uniforms(&mut self, stage: ShaderStage, data: &[u8]) -> Result<(), RenderError> {
        let state = self.state()?;
        let group = state.recorder.apply_uniforms(
            &mut state.resources,
            &state.context.queue,
            stage,
            data,
            SLOT,
            state.frame,
        )?;
        if let Some(group) = group {
            state.pending.push(Retired::BindGroup(group));
        }
        Ok(())
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) -> Result<(), RenderError> {
        self.state()?.recorder.draw(first_vertex, vertex_count)
    }

    fn draw_indexed(&mut self, first_index: u32, index_count: u32) -> Result<(), RenderError> {
        self.state()?.recorder.draw_indexed(first_index, index_count)
    }

    fn end_pass(&mut self) -> Result<(), RenderError> {
        self.state()?.recorder.end()
    }

    fn commit_frame(&mut self) -> Result<FrameStatus, RenderError> {
        let state = self.state()?;
        state.commit().inspect_err(|_| state.discard())
    }

    fn discard_frame(&mut self) {
        if let Some(state) = self.state.as_mut() {
            log::debug!("GlRenderBackend: discarding frame {}", state.frame);
            state.discard();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
