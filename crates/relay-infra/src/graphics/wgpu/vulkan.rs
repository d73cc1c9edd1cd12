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

//! The explicit backend.
//!
//! Runs on wgpu's Vulkan backend with several frames in flight. Each slot of
//! the [`FrameRing`] is guarded by the fence of its last submission, and
//! nothing a slot released is freed before that fence signals.

use std::any::Any;

use relay_core::renderer::{
    Bindings, BufferType, FrameStatus, GraphicsApi, InitError, InitInfo, PassDesc, PipelineDesc,
    RenderBackend, RenderError, Resolution, ShaderStage, ShaderType, TextureDesc,
};
use relay_core::{
    BufferHandle, ImageHandle, PassHandle, PipelineHandle, ProgramHandle, ResourceId,
    ShaderHandle, UniformBufferHandle,
};
use wgpu::util::DeviceExt;

use super::context::{
    instance_flags, into_init_error, ContextOptions, SurfaceFrame, WgpuGraphicsContext,
};
use super::conversions::IntoWgpu;
use super::frame::{FrameRing, SubmissionFence};
use super::recorder::{PassRecorder, PassTarget};
use super::resources::{padded_rows, GpuResources, Retired};

/// Everything that exists between `init` and `shutdown`.
#[derive(Debug)]
struct VulkanState {
    context: WgpuGraphicsContext,
    resources: GpuResources,
    ring: FrameRing<SubmissionFence>,
    recorder: PassRecorder,
    /// Image uploads, submitted ahead of the frame's passes.
    uploads: Option<wgpu::CommandEncoder>,
    surface: SurfaceFrame,
    /// Bumped for every recorded frame, submitted or discarded. Rewinds the
    /// uniform arenas.
    epoch: u64,
}

impl VulkanState {
    /// Opens the current slot, freeing what its previous submission held.
    fn begin_frame(&mut self) -> Result<(), RenderError> {
        let released = self.ring.begin()?;
        if !released.is_empty() {
            log::trace!(
                "VulkanRenderBackend: releasing {} object(s) from slot {}",
                released.len(),
                self.ring.current_index()
            );
        }
        released.into_iter().for_each(Retired::release);
        Ok(())
    }

    fn begin_pass(&mut self, target: PassTarget) -> Result<(), RenderError> {
        self.begin_frame()?;
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
        let (rows, pitch) = padded_rows(data, desc.width, desc.height);
        let staging = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Relay Image Staging"),
                contents: &rows,
                usage: wgpu::BufferUsages::COPY_SRC,
            });

        let device = &self.context.device;
        let uploads = self.uploads.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Relay Upload Encoder"),
            })
        });
        uploads.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(pitch),
                    rows_per_image: Some(desc.height),
                },
            },
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            desc.into_wgpu(),
        );
        self.ring.defer_release(Retired::Buffer(staging));
        Ok(())
    }

    fn commit(&mut self) -> Result<FrameStatus, RenderError> {
        self.begin_frame()?;
        let frame = self.recorder.finish()?;
        let uploads = self.uploads.take().map(|encoder| encoder.finish());
        let command_buffers: Vec<wgpu::CommandBuffer> = uploads.into_iter().chain(frame).collect();

        let index = self.context.queue.submit(command_buffers);
        let fence = SubmissionFence::new(&self.context.device, &self.context.queue, index);
        let slot = self.ring.current_index();
        self.ring.submit(fence)?;

        let status = self.surface.present();
        self.epoch += 1;

        if let Err(e) = self.context.device.poll(wgpu::PollType::Poll) {
            log::warn!("VulkanRenderBackend: non-blocking poll failed: {e:?}");
        }
        log::debug!(
            "VulkanRenderBackend: frame {} submitted on slot {slot} ({status:?})",
            self.ring.frame_number()
        );
        Ok(status)
    }

    /// Drops the frame being recorded. Uploads and parked releases are kept
    /// for the next submission of this slot.
    fn discard(&mut self) {
        self.recorder.discard();
        self.surface.discard();
        self.ring.abandon();
        self.epoch += 1;
    }

    fn shutdown(mut self) {
        self.discard();
        self.uploads = None;
        self.context.wait_idle();

        let mut retired = match self.ring.drain() {
            Ok(retired) => retired,
            Err(e) => {
                log::error!("VulkanRenderBackend: failed to drain frames in flight: {e}");
                Vec::new()
            }
        };
        retired.extend(self.resources.drain());
        let count = retired.len();
        retired.into_iter().for_each(Retired::release);
        self.resources.release_fallbacks();
        log::info!("VulkanRenderBackend: shut down, released {count} object(s)");
    }
}

/// Explicit backend with frames in flight.
#[derive(Debug, Default)]
pub struct VulkanRenderBackend {
    state: Option<VulkanState>,
}

impl VulkanRenderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the adapter, once initialized.
    pub fn adapter_name(&self) -> Option<&str> {
        self.state.as_ref().map(|s| s.context.adapter_name.as_str())
    }

    /// Number of frame slots, once initialized.
    pub fn frames_in_flight(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.ring.len())
    }

    fn state(&mut self) -> Result<&mut VulkanState, RenderError> {
        self.state.as_mut().ok_or(RenderError::NotInitialized)
    }

    /// The current slot, opened for recording.
    fn frame(&mut self) -> Result<&mut VulkanState, RenderError> {
        let state = self.state()?;
        state.begin_frame()?;
        Ok(state)
    }
}

impl RenderBackend for VulkanRenderBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Vulkan
    }

    fn init(&mut self, info: &InitInfo) -> Result<(), InitError> {
        if self.state.is_some() {
            log::warn!("VulkanRenderBackend: already initialized, shutting down first.");
            self.shutdown();
        }
        let window = info
            .platform
            .clone()
            .ok_or(InitError::MissingPlatformHandle)?;
        let settings = &info.settings;
        let options = ContextOptions {
            label: "Relay Vulkan Device",
            backends: GraphicsApi::Vulkan.into_wgpu(),
            flags: instance_flags(settings.validation, &info.extension_names),
            present_mode: settings.present_mode,
            frame_latency: settings.frames_in_flight as u32,
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
            settings.frames_in_flight,
            alignment,
        );
        log::info!(
            "VulkanRenderBackend: initialized on \"{}\" with {} frames in flight",
            context.adapter_name,
            settings.frames_in_flight
        );
        self.state = Some(VulkanState {
            context,
            resources,
            ring: FrameRing::new(settings.frames_in_flight),
            recorder: PassRecorder::new(),
            uploads: None,
            surface: SurfaceFrame::default(),
            epoch: 0,
        });
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(state) = self.state.take() {
            log::info!("VulkanRenderBackend: shutting down...");
            state.shutdown();
        }
    }

    fn resize(&mut self, resolution: Resolution) -> Result<(), RenderError> {
        let state = self.state()?;
        log::debug!("VulkanRenderBackend: recreating swapchain at {resolution}");
        state.context.resize(resolution);
        Ok(())
    }

    fn new_shader(
        &mut self,
        handle: ShaderHandle,
        ty: ShaderType,
        bytecode: &[u8],
    ) -> Result<(), RenderError> {
        self.frame()?.resources.create_shader(handle, ty, bytecode)
    }

    fn new_program(
        &mut self,
        handle: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<(), RenderError> {
        self.frame()?
            .resources
            .create_program(handle, vertex, fragment)
    }

    fn new_pipeline(
        &mut self,
        handle: PipelineHandle,
        desc: &PipelineDesc,
    ) -> Result<(), RenderError> {
        self.frame()?.resources.create_pipeline(handle, desc)
    }

    fn new_pass(&mut self, handle: PassHandle, desc: &PassDesc) -> Result<(), RenderError> {
        self.frame()?.resources.create_pass(handle, desc)
    }

    fn new_buffer(
        &mut self,
        handle: BufferHandle,
        ty: BufferType,
        data: &[u8],
    ) -> Result<(), RenderError> {
        self.frame()?.resources.create_buffer(handle, ty, data)
    }

    fn new_uniform_buffer(
        &mut self,
        handle: UniformBufferHandle,
        size: u32,
    ) -> Result<(), RenderError> {
        self.frame()?.resources.create_uniform_buffer(handle, size)
    }

    fn new_image(
        &mut self,
        handle: ImageHandle,
        desc: &TextureDesc,
        data: &[u8],
    ) -> Result<(), RenderError> {
        self.frame()?.upload_image(handle, desc, data)
    }

    fn destroy(&mut self, id: ResourceId) -> Result<(), RenderError> {
        let state = self.frame()?;
        if let Some(retired) = state.resources.remove(id)? {
            state.ring.defer_release(retired);
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
            state.ring.defer_release(Retired::BindGroup(group));
        }
        Ok(())
    }

    fn apply_uniforms(&mut self, stage: ShaderStage, data: &[u8]) -> Result<(), RenderError> {
        let state = self.state()?;
        let slot = state.ring.current_index();
        let epoch = state.epoch;
        let group = state.recorder.apply_uniforms(
            &mut state.resources,
            &state.context.queue,
            stage,
            data,
            slot,
            epoch,
        )?;
        if let Some(group) = group {
            state.ring.defer_release(Retired::BindGroup(group));
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
            log::debug!("VulkanRenderBackend: discarding frame {}", state.ring.frame_number());
            state.discard();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
