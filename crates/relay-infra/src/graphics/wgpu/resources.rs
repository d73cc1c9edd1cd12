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

//! GPU-side resource tables and the creation helpers both backends share.

use std::borrow::Cow;
use std::num::NonZeroU64;

use relay_core::renderer::{
    Bindings, BufferType, PassDesc, PipelineDesc, PipelineError, RenderError, ResourceError,
    ResourceLimits, ResourceTable, ShaderError, ShaderStage, ShaderType, TextureDesc,
    IMAGE_BYTES_PER_PIXEL, MAX_IMAGE_BIND,
};
use relay_core::{
    BufferHandle, Handle, ImageHandle, PassHandle, PipelineHandle, ProgramHandle, ResourceId,
    ShaderHandle, UniformBufferHandle,
};
use wgpu::util::DeviceExt;

use super::conversions::IntoWgpu;
use super::spirv;
use super::uniforms::{align_up, UniformArena};

/// Size of the zeroed buffer bound when a pipeline gets no uniforms.
pub const FALLBACK_UNIFORM_SIZE: u64 = 1024;

/// Bind group index of vertex-visible uniforms.
pub const VERTEX_UNIFORM_GROUP: u32 = 0;
/// Bind group index of fragment-only uniforms.
pub const FRAGMENT_UNIFORM_GROUP: u32 = 1;
/// Bind group index of images and their sampler.
pub const IMAGE_GROUP: u32 = 2;

/// Format of every user image.
pub const IMAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// A GPU object waiting for the GPU to stop using it.
#[derive(Debug)]
pub enum Retired {
    Buffer(wgpu::Buffer),
    Texture(wgpu::Texture),
    BindGroup(wgpu::BindGroup),
    Pipeline(wgpu::RenderPipeline),
    Shader(wgpu::ShaderModule),
    Program(GpuProgram),
}

impl Retired {
    /// Frees the object. Buffers and textures release their memory eagerly.
    pub fn release(self) {
        match self {
            Retired::Buffer(buffer) => buffer.destroy(),
            Retired::Texture(texture) => texture.destroy(),
            Retired::BindGroup(_)
            | Retired::Pipeline(_)
            | Retired::Shader(_)
            | Retired::Program(_) => {}
        }
    }
}

#[derive(Debug)]
pub struct GpuShader {
    pub module: wgpu::ShaderModule,
    pub ty: ShaderType,
}

#[derive(Debug)]
pub struct GpuProgram {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
}

#[derive(Debug)]
pub struct GpuPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub pass: PassHandle,
    /// Number of vertex buffer slots the pipeline reads.
    pub vertex_buffers: u32,
}

#[derive(Debug)]
pub struct GpuBuffer {
    pub buffer: wgpu::Buffer,
    pub ty: BufferType,
}

/// One uniform buffer split into a region per frame in flight.
#[derive(Debug)]
pub struct GpuUniformBuffer {
    pub buffer: wgpu::Buffer,
    region: u64,
    arenas: Vec<UniformArena>,
}

impl GpuUniformBuffer {
    /// Reserves `len` bytes in `slot`'s region for frame `epoch`, returning
    /// the absolute buffer offset.
    pub fn allocate(&mut self, slot: usize, epoch: u64, len: u64) -> Result<u64, ResourceError> {
        let region = self.region;
        let arena = self.arenas.get_mut(slot).ok_or_else(|| {
            ResourceError::BackendError(format!("no uniform region for frame slot {slot}"))
        })?;
        Ok(slot as u64 * region + arena.allocate(epoch, len)?)
    }
}

#[derive(Debug)]
pub struct GpuImage {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub desc: TextureDesc,
}

/// Every object created through the backend, stored at its handle's index,
/// plus the layouts and fallbacks all pipelines share.
#[derive(Debug)]
pub struct GpuResources {
    device: wgpu::Device,
    surface_format: wgpu::TextureFormat,
    uniform_alignment: u64,
    frame_slots: usize,

    pub shaders: ResourceTable<ShaderHandle, GpuShader>,
    pub programs: ResourceTable<ProgramHandle, GpuProgram>,
    pub pipelines: ResourceTable<PipelineHandle, GpuPipeline>,
    pub passes: ResourceTable<PassHandle, PassDesc>,
    pub buffers: ResourceTable<BufferHandle, GpuBuffer>,
    pub uniform_buffers: ResourceTable<UniformBufferHandle, GpuUniformBuffer>,
    pub images: ResourceTable<ImageHandle, GpuImage>,

    uniform_layouts: [wgpu::BindGroupLayout; 2],
    image_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    fallback_uniforms: wgpu::Buffer,
    fallback_texture: wgpu::Texture,
    fallback_view: wgpu::TextureView,
    fallback_groups: [wgpu::BindGroup; 3],
}

impl GpuResources {
    /// Builds empty tables sized from `limits`, with uniform buffers split
    /// into `frame_slots` regions.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        limits: &ResourceLimits,
        frame_slots: usize,
        uniform_alignment: u64,
    ) -> Self {
        let uniform_entry = |visibility: wgpu::ShaderStages| wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let uniform_layouts = [
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Relay Vertex Uniforms Layout"),
                entries: &[uniform_entry(ShaderStage::All.into_wgpu())],
            }),
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Relay Fragment Uniforms Layout"),
                entries: &[uniform_entry(ShaderStage::Fragment.into_wgpu())],
            }),
        ];

        let mut image_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..MAX_IMAGE_BIND as u32)
            .map(|binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            })
            .collect();
        image_entries.push(wgpu::BindGroupLayoutEntry {
            binding: MAX_IMAGE_BIND as u32,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
        let image_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Relay Images Layout"),
            entries: &image_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Relay Pipeline Layout"),
            bind_group_layouts: &[&uniform_layouts[0], &uniform_layouts[1], &image_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Relay Linear Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // --- Fallbacks bound until the application binds its own ---
        let fallback_uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Relay Fallback Uniforms"),
            contents: &[0u8; FALLBACK_UNIFORM_SIZE as usize],
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let fallback_desc = TextureDesc::new(1, 1);
        let fallback_texture = create_image_texture(device, "Relay Fallback Image", &fallback_desc);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &fallback_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255u8; IMAGE_BYTES_PER_PIXEL as usize],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(IMAGE_BYTES_PER_PIXEL),
                rows_per_image: Some(1),
            },
            (&fallback_desc).into_wgpu(),
        );
        let fallback_view = fallback_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let fallback_uniform_group = |layout: &wgpu::BindGroupLayout, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: fallback_uniforms.as_entire_binding(),
                }],
            })
        };
        let fallback_groups = [
            fallback_uniform_group(&uniform_layouts[0], "Relay Fallback Vertex Uniforms"),
            fallback_uniform_group(&uniform_layouts[1], "Relay Fallback Fragment Uniforms"),
            images_bind_group(
                device,
                &image_layout,
                &sampler,
                [&fallback_view; MAX_IMAGE_BIND],
                "Relay Fallback Images",
            ),
        ];

        Self {
            device: device.clone(),
            surface_format,
            uniform_alignment,
            frame_slots,
            shaders: ResourceTable::new(limits.shaders),
            programs: ResourceTable::new(limits.programs),
            pipelines: ResourceTable::new(limits.pipelines),
            passes: ResourceTable::new(limits.passes),
            buffers: ResourceTable::new(limits.buffers),
            uniform_buffers: ResourceTable::new(limits.uniform_buffers),
            images: ResourceTable::new(limits.images),
            uniform_layouts,
            image_layout,
            pipeline_layout,
            sampler,
            fallback_uniforms,
            fallback_texture,
            fallback_view,
            fallback_groups,
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// The bind groups to use until the application binds its own, by group index.
    pub fn fallback_groups(&self) -> &[wgpu::BindGroup; 3] {
        &self.fallback_groups
    }

    // --- Creation ---

    pub fn create_shader(
        &mut self,
        handle: ShaderHandle,
        ty: ShaderType,
        bytecode: &[u8],
    ) -> Result<(), RenderError> {
        if ty == ShaderType::Compute {
            return Err(resource(ShaderError::UnsupportedStage {
                handle,
                stage: format!("{ty:?}"),
            }));
        }
        let words = spirv::decode_words(handle, bytecode).map_err(resource)?;
        if let Some((major, minor)) = spirv::version(&words) {
            log::trace!("Shader {handle:?} is SPIR-V {major}.{minor}");
        }

        let label = format!("Relay Shader {}", handle.raw());
        let module = scoped(&self.device, || {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::SpirV(Cow::Owned(words)),
            })
        })
        .map_err(|err| {
            scope_error(err, |details| {
                resource(ShaderError::CompilationFailed { handle, details })
            })
        })?;

        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| m.message.clone())
            .collect();
        if !errors.is_empty() {
            return Err(resource(ShaderError::CompilationFailed {
                handle,
                details: errors.join("; "),
            }));
        }

        self.shaders
            .insert(handle, GpuShader { module, ty })
            .map_err(RenderError::Resource)?;
        log::debug!("Created {ty:?} shader {handle:?}");
        Ok(())
    }

    pub fn create_program(
        &mut self,
        handle: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<(), RenderError> {
        let module_of = |shader: ShaderHandle, expected: ShaderType| {
            let entry = self.shaders.get(shader).map_err(RenderError::Resource)?;
            if entry.ty != expected {
                return Err(resource(PipelineError::StageMismatch {
                    program: handle,
                    shader,
                }));
            }
            Ok(entry.module.clone())
        };
        let program = GpuProgram {
            vertex: module_of(vertex, ShaderType::Vertex)?,
            fragment: module_of(fragment, ShaderType::Fragment)?,
        };
        self.programs
            .insert(handle, program)
            .map_err(RenderError::Resource)?;
        log::debug!("Created program {handle:?} from {vertex:?} and {fragment:?}");
        Ok(())
    }

    pub fn create_pipeline(
        &mut self,
        handle: PipelineHandle,
        desc: &PipelineDesc,
    ) -> Result<(), RenderError> {
        let program = self.programs.get(desc.program).map_err(|_| {
            resource(PipelineError::MissingProgram {
                pipeline: handle,
                program: desc.program,
            })
        })?;
        if !desc.pass.is_null() {
            self.passes.get(desc.pass).map_err(RenderError::Resource)?;
        }
        let topology: wgpu::PrimitiveTopology =
            desc.primitive.into_wgpu().ok_or_else(|| {
                resource(PipelineError::UnsupportedTopology {
                    pipeline: handle,
                    primitive: desc.primitive,
                })
            })?;

        let attributes: Vec<wgpu::VertexAttribute> = desc
            .vertex_attributes
            .iter()
            .map(|attribute| wgpu::VertexAttribute {
                format: attribute.ty.into_wgpu(),
                offset: attribute.offset as u64,
                shader_location: attribute.location,
            })
            .collect();
        let vertex_layouts = if attributes.is_empty() {
            Vec::new()
        } else {
            vec![wgpu::VertexBufferLayout {
                array_stride: desc.vertex_attributes.stride() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }]
        };

        let strip_index_format = match topology {
            wgpu::PrimitiveTopology::LineStrip | wgpu::PrimitiveTopology::TriangleStrip => {
                Some(wgpu::IndexFormat::Uint16)
            }
            _ => None,
        };

        let label = format!("Relay Pipeline {}", handle.raw());
        let pipeline = scoped(&self.device, || {
            self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some("main"),
                    buffers: &vertex_layouts,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format,
                    front_face: desc.face_winding.into_wgpu(),
                    cull_mode: desc.cull_mode.into_wgpu(),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
        .map_err(|err| {
            scope_error(err, |details| {
                resource(PipelineError::CompilationFailed {
                    pipeline: handle,
                    details,
                })
            })
        })?;

        self.pipelines
            .insert(
                handle,
                GpuPipeline {
                    pipeline,
                    pass: desc.pass,
                    vertex_buffers: vertex_layouts.len() as u32,
                },
            )
            .map_err(RenderError::Resource)?;
        log::debug!("Created pipeline {handle:?} ({topology:?})");
        Ok(())
    }

    pub fn create_pass(&mut self, handle: PassHandle, desc: &PassDesc) -> Result<(), RenderError> {
        self.passes.insert(handle, *desc).map_err(RenderError::Resource)?;
        log::debug!("Created pass {handle:?} ({:?})", desc.load);
        Ok(())
    }

    pub fn create_buffer(
        &mut self,
        handle: BufferHandle,
        ty: BufferType,
        data: &[u8],
    ) -> Result<(), RenderError> {
        let label = format!("Relay {ty:?} Buffer {}", handle.raw());
        let buffer = scoped(&self.device, || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&label),
                    contents: data,
                    usage: ty.into_wgpu(),
                })
        })
        .map_err(|err| scope_error(err, backend_error))?;
        self.buffers
            .insert(handle, GpuBuffer { buffer, ty })
            .map_err(RenderError::Resource)?;
        log::debug!("Created {ty:?} buffer {handle:?} ({} bytes)", data.len());
        Ok(())
    }

    pub fn create_uniform_buffer(
        &mut self,
        handle: UniformBufferHandle,
        size: u32,
    ) -> Result<(), RenderError> {
        let region = align_up(size as u64, self.uniform_alignment);
        let label = format!("Relay Uniform Buffer {}", handle.raw());
        let buffer = scoped(&self.device, || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&label),
                size: region * self.frame_slots as u64,
                usage: BufferType::Uniform.into_wgpu(),
                mapped_at_creation: false,
            })
        })
        .map_err(|err| scope_error(err, backend_error))?;
        let arenas = (0..self.frame_slots)
            .map(|_| UniformArena::new(region, self.uniform_alignment))
            .collect();
        self.uniform_buffers
            .insert(
                handle,
                GpuUniformBuffer {
                    buffer,
                    region,
                    arenas,
                },
            )
            .map_err(RenderError::Resource)?;
        log::debug!(
            "Created uniform buffer {handle:?} ({size} bytes x {} frames)",
            self.frame_slots
        );
        Ok(())
    }

    /// Creates the texture for an image. Uploading the pixels is up to the backend.
    pub fn create_image(
        &mut self,
        handle: ImageHandle,
        desc: &TextureDesc,
    ) -> Result<&wgpu::Texture, RenderError> {
        let label = format!("Relay Image {}", handle.raw());
        let texture = scoped(&self.device, || create_image_texture(&self.device, &label, desc))
            .map_err(|err| scope_error(err, backend_error))?;
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.images
            .insert(
                handle,
                GpuImage {
                    texture,
                    view,
                    desc: *desc,
                },
            )
            .map_err(RenderError::Resource)?;
        log::debug!("Created image {handle:?} ({}x{})", desc.width, desc.height);
        let image = self.images.get(handle).map_err(RenderError::Resource)?;
        Ok(&image.texture)
    }

    // --- Destruction ---

    /// Takes a resource out of its table. The caller decides when the GPU
    /// object may actually be freed. Passes own no GPU object.
    pub fn remove(&mut self, id: ResourceId) -> Result<Option<Retired>, RenderError> {
        let retired = match id {
            ResourceId::Shader(h) => Some(Retired::Shader(self.shaders.remove(h)?.module)),
            ResourceId::Program(h) => Some(Retired::Program(self.programs.remove(h)?)),
            ResourceId::Pipeline(h) => Some(Retired::Pipeline(self.pipelines.remove(h)?.pipeline)),
            ResourceId::Pass(h) => {
                self.passes.remove(h)?;
                None
            }
            ResourceId::Buffer(h) => Some(Retired::Buffer(self.buffers.remove(h)?.buffer)),
            ResourceId::UniformBuffer(h) => {
                Some(Retired::Buffer(self.uniform_buffers.remove(h)?.buffer))
            }
            ResourceId::Image(h) => Some(Retired::Texture(self.images.remove(h)?.texture)),
        };
        log::debug!("Destroyed {:?} {}", id.kind(), id.raw());
        Ok(retired)
    }

    /// Empties every table, including the shared fallbacks' users.
    pub fn drain(&mut self) -> Vec<Retired> {
        let mut retired = Vec::new();
        retired.extend(self.pipelines.drain().map(|(_, p)| Retired::Pipeline(p.pipeline)));
        retired.extend(self.programs.drain().map(|(_, p)| Retired::Program(p)));
        retired.extend(self.shaders.drain().map(|(_, s)| Retired::Shader(s.module)));
        retired.extend(self.buffers.drain().map(|(_, b)| Retired::Buffer(b.buffer)));
        retired.extend(
            self.uniform_buffers
                .drain()
                .map(|(_, u)| Retired::Buffer(u.buffer)),
        );
        retired.extend(self.images.drain().map(|(_, i)| Retired::Texture(i.texture)));
        self.passes.drain().for_each(drop);
        retired
    }

    /// Frees the shared fallback objects. Only called once the device is idle.
    pub fn release_fallbacks(&self) {
        self.fallback_uniforms.destroy();
        self.fallback_texture.destroy();
    }

    // --- Bind groups ---

    /// A bind group over `len` bytes of a uniform buffer at `offset`, for the
    /// group `stage` binds to.
    pub fn uniform_bind_group(
        &self,
        stage: ShaderStage,
        buffer: &wgpu::Buffer,
        offset: u64,
        len: u64,
    ) -> (u32, wgpu::BindGroup) {
        let group = uniform_group(stage);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Relay Uniforms"),
            layout: &self.uniform_layouts[group as usize],
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset,
                    size: NonZeroU64::new(len),
                }),
            }],
        });
        (group, bind_group)
    }

    /// The image bind group for `bindings`, or `None` if no image is bound.
    /// Unbound image slots sample opaque white.
    pub fn image_bind_group(
        &self,
        bindings: &Bindings,
    ) -> Result<Option<wgpu::BindGroup>, RenderError> {
        if bindings.bound_images().next().is_none() {
            return Ok(None);
        }
        let mut views = [&self.fallback_view; MAX_IMAGE_BIND];
        for (slot, handle) in bindings.bound_images() {
            views[slot as usize] = &self.images.get(handle)?.view;
        }
        Ok(Some(images_bind_group(
            &self.device,
            &self.image_layout,
            &self.sampler,
            views,
            "Relay Images",
        )))
    }
}

/// Uniform bind group index for a stage.
pub fn uniform_group(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex | ShaderStage::All => VERTEX_UNIFORM_GROUP,
        ShaderStage::Fragment => FRAGMENT_UNIFORM_GROUP,
    }
}

/// Rows of `data` re-laid out so each starts on the 256-byte boundary
/// buffer-to-texture copies require. Returns the data and its row pitch.
pub fn padded_rows(data: &[u8], width: u32, height: u32) -> (Cow<'_, [u8]>, u32) {
    let row = width * IMAGE_BYTES_PER_PIXEL;
    let pitch = align_up(row as u64, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64) as u32;
    if pitch == row {
        return (Cow::Borrowed(data), pitch);
    }
    let mut padded = vec![0u8; pitch as usize * height as usize];
    for (src, dst) in data
        .chunks_exact(row as usize)
        .zip(padded.chunks_exact_mut(pitch as usize))
    {
        dst[..row as usize].copy_from_slice(src);
    }
    (Cow::Owned(padded), pitch)
}

fn create_image_texture(device: &wgpu::Device, label: &str, desc: &TextureDesc) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: desc.into_wgpu(),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: IMAGE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn images_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    views: [&wgpu::TextureView; MAX_IMAGE_BIND],
    label: &str,
) -> wgpu::BindGroup {
    let mut entries: Vec<wgpu::BindGroupEntry> = views
        .iter()
        .enumerate()
        .map(|(binding, view)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: wgpu::BindingResource::TextureView(view),
        })
        .collect();
    entries.push(wgpu::BindGroupEntry {
        binding: MAX_IMAGE_BIND as u32,
        resource: wgpu::BindingResource::Sampler(sampler),
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &entries,
    })
}

/// Runs `create` inside validation and out-of-memory error scopes.
///
/// wgpu reports these errors asynchronously. Blocking on the scopes here
/// keeps an invalid object out of the resource tables.
fn scoped<T>(device: &wgpu::Device, create: impl FnOnce() -> T) -> Result<T, wgpu::Error> {
    let validation = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let out_of_memory = device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    let value = create();
    let oom = pollster::block_on(out_of_memory.pop());
    let invalid = pollster::block_on(validation.pop());
    match oom.or(invalid) {
        Some(err) => Err(err),
        None => Ok(value),
    }
}

/// Out-of-memory becomes a backend error, anything else goes to `invalid`.
fn scope_error(err: wgpu::Error, invalid: impl FnOnce(String) -> RenderError) -> RenderError {
    if matches!(err, wgpu::Error::OutOfMemory { .. }) {
        backend_error(format!("out of memory: {err}"))
    } else {
        invalid(err.to_string())
    }
}

fn backend_error(details: String) -> RenderError {
    resource(ResourceError::BackendError(details))
}

fn resource(err: impl Into<ResourceError>) -> RenderError {
    RenderError::Resource(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_error(description: &str) -> wgpu::Error {
        wgpu::Error::Validation {
            source: Box::new(std::fmt::Error),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_validation_errors_fail_pipeline_creation() {
        let pipeline = PipelineHandle::from_raw(4);
        let err = scope_error(validation_error("location 2 not consumed"), |details| {
            resource(PipelineError::CompilationFailed { pipeline, details })
        });
        match err {
            RenderError::Resource(ResourceError::Pipeline(PipelineError::CompilationFailed {
                pipeline: failed,
                details,
            })) => {
                assert_eq!(failed, pipeline);
                assert!(details.contains("location 2 not consumed"));
            }
            other => panic!("expected a pipeline error, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_memory_is_a_backend_error() {
        let oom = wgpu::Error::OutOfMemory {
            source: Box::new(std::fmt::Error),
        };
        let err = scope_error(oom, |_| panic!("out of memory is not a validation error"));
        assert!(matches!(
            err,
            RenderError::Resource(ResourceError::BackendError(msg)) if msg.starts_with("out of memory")
        ));
    }

    #[test]
    fn test_validation_errors_fail_buffer_creation() {
        let err = scope_error(validation_error("size exceeds limit"), backend_error);
        assert!(matches!(
            err,
            RenderError::Resource(ResourceError::BackendError(msg)) if msg.contains("size exceeds limit")
        ));
    }

    #[test]
    fn test_stages_map_to_uniform_groups() {
        assert_eq!(uniform_group(ShaderStage::Vertex), VERTEX_UNIFORM_GROUP);
        assert_eq!(uniform_group(ShaderStage::All), VERTEX_UNIFORM_GROUP);
        assert_eq!(uniform_group(ShaderStage::Fragment), FRAGMENT_UNIFORM_GROUP);
    }

    #[test]
    fn test_aligned_rows_are_borrowed() {
        // --- ARRANGE ---
        let data = vec![7u8; 64 * 4 * 2];

        // --- ACT ---
        let (rows, pitch) = padded_rows(&data, 64, 2);

        // --- ASSERT ---
        assert_eq!(pitch, 256);
        assert!(matches!(rows, Cow::Borrowed(_)));
    }

    #[test]
    fn test_short_rows_are_padded_to_256_bytes() {
        // --- ARRANGE ---
        // Two rows of 3 pixels: row 0 is all 1s, row 1 is all 2s.
        let mut data = vec![1u8; 12];
        data.extend_from_slice(&[2u8; 12]);

        // --- ACT ---
        let (rows, pitch) = padded_rows(&data, 3, 2);

        // --- ASSERT ---
        assert_eq!(pitch, 256);
        assert_eq!(rows.len(), 512);
        assert_eq!(&rows[..12], &[1u8; 12]);
        assert!(rows[12..256].iter().all(|&b| b == 0));
        assert_eq!(&rows[256..268], &[2u8; 12]);
    }
}
