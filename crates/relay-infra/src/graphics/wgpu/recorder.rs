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

//! Pass recording shared by both backends.
//!
//! [`PassState`] is the draw-state machine. It knows nothing about wgpu and
//! rejects out-of-order calls with [`RenderError::InvalidState`].
//! [`PassRecorder`] drives a `wgpu::RenderPass` behind it.

use std::ops::Range;

use relay_core::renderer::{
    Bindings, BufferType, DescriptorError, PassDesc, RenderError, ShaderStage,
};
use relay_core::{PassHandle, PipelineHandle, UniformBufferHandle};

use super::conversions::IntoWgpu;
use super::resources::{GpuResources, IMAGE_GROUP};
use super::uniforms::pad_to_copy_alignment;

/// What an open pass renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    Default,
    User(PassHandle),
}

/// Draw state of the current pass.
#[derive(Debug, Default, Clone)]
pub struct PassState {
    target: Option<PassTarget>,
    pipeline: Option<PipelineHandle>,
    /// Vertex buffer slots the bound pipeline reads.
    pipeline_slots: u32,
    /// Bit `n` is set when vertex slot `n` has a buffer.
    vertex_mask: u32,
    index_bound: bool,
    uniform_buffer: Option<UniformBufferHandle>,
}

impl PassState {
    pub fn begin(&mut self, target: PassTarget) -> Result<(), RenderError> {
        if let Some(open) = self.target {
            return Err(invalid(format!(
                "cannot begin {target:?} while {open:?} is still open"
            )));
        }
        *self = PassState {
            target: Some(target),
            ..PassState::default()
        };
        Ok(())
    }

    pub fn set_pipeline(
        &mut self,
        pipeline: PipelineHandle,
        vertex_slots: u32,
    ) -> Result<(), RenderError> {
        self.require_pass("apply_pipeline")?;
        self.pipeline = Some(pipeline);
        self.pipeline_slots = vertex_slots;
        Ok(())
    }

    /// Replaces every binding with `bindings`.
    pub fn set_bindings(&mut self, bindings: &Bindings) -> Result<(), RenderError> {
        self.require_pass("apply_bindings")?;
        self.vertex_mask = bindings
            .bound_vertex_buffers()
            .fold(0, |mask, (slot, _)| mask | (1 << slot));
        self.index_bound = !bindings.index_buffer.is_null();
        self.uniform_buffer = if bindings.uniform_buffer.is_null() {
            None
        } else {
            Some(bindings.uniform_buffer)
        };
        Ok(())
    }

    /// The uniform buffer `apply_uniforms` writes into.
    pub fn uniform_target(&self) -> Result<UniformBufferHandle, RenderError> {
        self.require_pass("apply_uniforms")?;
        self.uniform_buffer
            .ok_or_else(|| invalid("apply_uniforms without a bound uniform buffer".to_string()))
    }

    pub fn check_draw(&self) -> Result<(), RenderError> {
        self.require_pass("draw")?;
        let pipeline = self
            .pipeline
            .ok_or_else(|| invalid("draw without a pipeline".to_string()))?;
        let required = (1u32 << self.pipeline_slots) - 1;
        if self.vertex_mask & required != required {
            return Err(invalid(format!(
                "pipeline {pipeline:?} reads {} vertex buffer(s) but slots {:#b} are bound",
                self.pipeline_slots, self.vertex_mask
            )));
        }
        Ok(())
    }

    pub fn check_draw_indexed(&self) -> Result<(), RenderError> {
        self.check_draw()?;
        if !self.index_bound {
            return Err(invalid("draw_indexed without an index buffer".to_string()));
        }
        Ok(())
    }

    pub fn end(&mut self) -> Result<PassTarget, RenderError> {
        let target = self.require_pass("end_pass")?;
        *self = PassState::default();
        Ok(target)
    }

    pub fn is_open(&self) -> bool {
        self.target.is_some()
    }

    fn require_pass(&self, call: &str) -> Result<PassTarget, RenderError> {
        self.target
            .ok_or_else(|| invalid(format!("{call} outside of a pass")))
    }
}

/// Records passes into one command encoder.
///
/// When the surface could not be acquired, passes are begun without a
/// target view. Calls are then validated but nothing is encoded.
#[derive(Debug, Default)]
pub struct PassRecorder {
    state: PassState,
    encoder: Option<wgpu::CommandEncoder>,
    pass: Option<wgpu::RenderPass<'static>>,
    /// Bind groups set in the current pass, by group index.
    groups_set: [bool; 3],
}

impl PassRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(
        &mut self,
        device: &wgpu::Device,
        target: PassTarget,
        desc: &PassDesc,
        view: Option<&wgpu::TextureView>,
    ) -> Result<(), RenderError> {
        self.state.begin(target)?;
        self.groups_set = [false; 3];
        let Some(view) = view else {
            log::trace!("Beginning {target:?} without a surface image");
            return Ok(());
        };

        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Relay Frame Encoder"),
            })
        });
        let label = match target {
            PassTarget::Default => "Relay Default Pass",
            PassTarget::User(_) => "Relay User Pass",
        };
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: desc.into_wgpu(),
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();
        self.pass = Some(pass);
        Ok(())
    }

    pub fn apply_pipeline(
        &mut self,
        resources: &GpuResources,
        handle: PipelineHandle,
    ) -> Result<(), RenderError> {
        let entry = resources.pipelines.get(handle)?;
        self.state.set_pipeline(handle, entry.vertex_buffers)?;
        if let Some(pass) = self.pass.as_mut() {
            pass.set_pipeline(&entry.pipeline);
            for (group, fallback) in resources.fallback_groups().iter().enumerate() {
                if !self.groups_set[group] {
                    pass.set_bind_group(group as u32, fallback, &[]);
                    self.groups_set[group] = true;
                }
            }
        }
        Ok(())
    }

    /// Binds buffers and images. Returns the image bind group created for
    /// this call, which must outlive the frame's GPU work.
    pub fn apply_bindings(
        &mut self,
        resources: &GpuResources,
        bindings: &Bindings,
    ) -> Result<Option<wgpu::BindGroup>, RenderError> {
        let mut vertex_buffers = Vec::new();
        for (slot, handle) in bindings.bound_vertex_buffers() {
            let entry = resources.buffers.get(handle)?;
            expect_type(entry.ty, BufferType::Vertex, handle)?;
            vertex_buffers.push((slot, &entry.buffer));
        }
        let index_buffer = if bindings.index_buffer.is_null() {
            None
        } else {
            let entry = resources.buffers.get(bindings.index_buffer)?;
            expect_type(entry.ty, BufferType::Index, bindings.index_buffer)?;
            Some(&entry.buffer)
        };
        if !bindings.uniform_buffer.is_null() {
            resources.uniform_buffers.get(bindings.uniform_buffer)?;
        }
        self.state.set_bindings(bindings)?;

        let Some(pass) = self.pass.as_mut() else {
            return Ok(None);
        };
        for (slot, buffer) in vertex_buffers {
            pass.set_vertex_buffer(slot, buffer.slice(..));
        }
        if let Some(buffer) = index_buffer {
            pass.set_index_buffer(buffer.slice(..), wgpu::IndexFormat::Uint16);
        }
        let images = resources.image_bind_group(bindings)?;
        let group = images
            .as_ref()
            .unwrap_or(&resources.fallback_groups()[IMAGE_GROUP as usize]);
        pass.set_bind_group(IMAGE_GROUP, group, &[]);
        self.groups_set[IMAGE_GROUP as usize] = true;
        Ok(images)
    }

    /// Writes `data` into the bound uniform buffer's region for `slot` and
    /// binds it for `stage`. Returns the bind group created for this call.
    pub fn apply_uniforms(
        &mut self,
        resources: &mut GpuResources,
        queue: &wgpu::Queue,
        stage: ShaderStage,
        data: &[u8],
        slot: usize,
        epoch: u64,
    ) -> Result<Option<wgpu::BindGroup>, RenderError> {
        let handle = self.state.uniform_target()?;
        if data.is_empty() {
            return Err(RenderError::Resource(DescriptorError::Empty.into()));
        }
        let bytes = pad_to_copy_alignment(data);
        let len = bytes.len() as u64;
        let offset = resources
            .uniform_buffers
            .get_mut(handle)?
            .allocate(slot, epoch, len)?;

        let Some(pass) = self.pass.as_mut() else {
            return Ok(None);
        };
        let buffer = &resources.uniform_buffers.get(handle)?.buffer;
        queue.write_buffer(buffer, offset, &bytes);
        let (group, bind_group) = resources.uniform_bind_group(stage, buffer, offset, len);
        pass.set_bind_group(group, &bind_group, &[]);
        self.groups_set[group as usize] = true;
        log::trace!("Uniforms for {stage:?}: {len} bytes at offset {offset}");
        Ok(Some(bind_group))
    }

    pub fn draw(&mut self, first_vertex: u32, vertex_count: u32) -> Result<(), RenderError> {
        self.state.check_draw()?;
        let vertices = draw_range("draw", first_vertex, vertex_count)?;
        if let Some(pass) = self.pass.as_mut() {
            pass.draw(vertices, 0..1);
        }
        Ok(())
    }

    pub fn draw_indexed(&mut self, first_index: u32, index_count: u32) -> Result<(), RenderError> {
        self.state.check_draw_indexed()?;
        let indices = draw_range("draw_indexed", first_index, index_count)?;
        if let Some(pass) = self.pass.as_mut() {
            pass.draw_indexed(indices, 0, 0..1);
        }
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), RenderError> {
        let target = self.state.end()?;
        self.pass = None;
        log::trace!("Ended {target:?}");
        Ok(())
    }

    /// Closes the encoder. `None` if nothing was encoded this frame.
    pub fn finish(&mut self) -> Result<Option<wgpu::CommandBuffer>, RenderError> {
        if self.state.is_open() {
            self.discard();
            return Err(invalid("frame committed with a pass still open".to_string()));
        }
        Ok(self.encoder.take().map(|encoder| encoder.finish()))
    }

    /// Drops everything recorded since the last finish.
    pub fn discard(&mut self) {
        self.pass = None;
        self.encoder = None;
        self.state = PassState::default();
    }

    pub fn in_pass(&self) -> bool {
        self.state.is_open()
    }
}

fn expect_type(
    actual: BufferType,
    expected: BufferType,
    handle: relay_core::BufferHandle,
) -> Result<(), RenderError> {
    if actual != expected {
        return Err(invalid(format!(
            "buffer {handle:?} is a {actual:?} buffer, expected {expected:?}"
        )));
    }
    Ok(())
}

/// `first..first + count`, rejected when the end does not fit in `u32`.
fn draw_range(call: &str, first: u32, count: u32) -> Result<Range<u32>, RenderError> {
    let end = first
        .checked_add(count)
        .ok_or_else(|| invalid(format!("{call} range {first}+{count} overflows u32")))?;
    Ok(first..end)
}

fn invalid(msg: String) -> RenderError {
    RenderError::InvalidState(msg)
}
