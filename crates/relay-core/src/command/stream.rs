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

//! Tagged commands and their fixed byte layouts.
//!
//! Every command starts with its [`CommandKind`] tag followed by its operands.
//! Layouts are not self-describing: [`Command::encode`] and [`Command::decode`]
//! must agree byte for byte. Variable-length payloads always come last.

use super::buffer::{CommandBuffer, CommandReader};
use crate::handle::{
    BufferHandle, HandleKind, ImageHandle, PassHandle, PipelineHandle, ProgramHandle,
    ResourceId, ShaderHandle, UniformBufferHandle,
};
use crate::renderer::api::{
    AttribType, Bindings, BufferType, CullMode, FaceWinding, LoadAction, PassDesc, PipelineDesc,
    PrimitiveType, ShaderStage, ShaderType, TextureDesc, VertexAttribute, VertexAttributes,
    MAX_BUFFER_BIND, MAX_IMAGE_BIND, MAX_VERTEX_ATTRIBUTES,
};

/// Discriminator written before each command's operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum CommandKind {
    NewShader = 0,
    NewProgram = 1,
    NewPipeline = 2,
    NewPass = 3,
    NewBuffer = 4,
    NewUniformBuffer = 5,
    NewImage = 6,
    Destroy = 7,
    BeginDefaultPass = 8,
    BeginPass = 9,
    ApplyPipeline = 10,
    ApplyBindings = 11,
    ApplyUniforms = 12,
    Draw = 13,
    DrawIndexed = 14,
    EndPass = 15,
    /// Terminates a frame's stream.
    End = 16,
}

impl CommandKind {
    /// Decodes a tag.
    pub fn from_wire(tag: u8) -> Option<Self> {
        use CommandKind::*;
        Some(match tag {
            0 => NewShader,
            1 => NewProgram,
            2 => NewPipeline,
            3 => NewPass,
            4 => NewBuffer,
            5 => NewUniformBuffer,
            6 => NewImage,
            7 => Destroy,
            8 => BeginDefaultPass,
            9 => BeginPass,
            10 => ApplyPipeline,
            11 => ApplyBindings,
            12 => ApplyUniforms,
            13 => Draw,
            14 => DrawIndexed,
            15 => EndPass,
            16 => End,
            _ => return None,
        })
    }

    /// `true` for commands that materialize or release a resource.
    pub fn is_resource_command(self) -> bool {
        (self as u8) <= CommandKind::Destroy as u8
    }
}

/// One decoded command. Payload slices borrow from the command stream.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum Command<'a> {
    NewShader {
        handle: ShaderHandle,
        ty: ShaderType,
        bytecode: &'a [u8],
    },
    NewProgram {
        handle: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    },
    NewPipeline {
        handle: PipelineHandle,
        desc: PipelineDesc,
    },
    NewPass {
        handle: PassHandle,
        desc: PassDesc,
    },
    NewBuffer {
        handle: BufferHandle,
        ty: BufferType,
        data: &'a [u8],
    },
    NewUniformBuffer {
        handle: UniformBufferHandle,
        size: u32,
    },
    NewImage {
        handle: ImageHandle,
        desc: TextureDesc,
        data: &'a [u8],
    },
    Destroy(ResourceId),
    BeginDefaultPass,
    BeginPass(PassHandle),
    ApplyPipeline(PipelineHandle),
    ApplyBindings(Bindings),
    ApplyUniforms {
        stage: ShaderStage,
        data: &'a [u8],
    },
    Draw {
        first_vertex: u32,
        vertex_count: u32,
    },
    DrawIndexed {
        first_index: u32,
        index_count: u32,
    },
    EndPass,
    End,
}

impl<'a> Command<'a> {
    /// The tag of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::NewShader { .. } => CommandKind::NewShader,
            Command::NewProgram { .. } => CommandKind::NewProgram,
            Command::NewPipeline { .. } => CommandKind::NewPipeline,
            Command::NewPass { .. } => CommandKind::NewPass,
            Command::NewBuffer { .. } => CommandKind::NewBuffer,
            Command::NewUniformBuffer { .. } => CommandKind::NewUniformBuffer,
            Command::NewImage { .. } => CommandKind::NewImage,
            Command::Destroy(_) => CommandKind::Destroy,
            Command::BeginDefaultPass => CommandKind::BeginDefaultPass,
            Command::BeginPass(_) => CommandKind::BeginPass,
            Command::ApplyPipeline(_) => CommandKind::ApplyPipeline,
            Command::ApplyBindings(_) => CommandKind::ApplyBindings,
            Command::ApplyUniforms { .. } => CommandKind::ApplyUniforms,
            Command::Draw { .. } => CommandKind::Draw,
            Command::DrawIndexed { .. } => CommandKind::DrawIndexed,
            Command::EndPass => CommandKind::EndPass,
            Command::End => CommandKind::End,
        }
    }

    /// Appends the tag and operands to `buffer`.
    pub fn encode(&self, buffer: &mut CommandBuffer) {
        buffer.write(self.kind() as u8);
        match *self {
            Command::NewShader {
                handle,
                ty,
                bytecode,
            } => {
                buffer.write(handle);
                buffer.write(ty.wire());
                buffer.write_payload(bytecode);
            }
            Command::NewProgram {
                handle,
                vertex,
                fragment,
            } => {
                buffer.write(handle);
                buffer.write(vertex);
                buffer.write(fragment);
            }
            Command::NewPipeline { handle, ref desc } => {
                buffer.write(handle);
                write_pipeline_desc(buffer, desc);
            }
            Command::NewPass { handle, ref desc } => {
                buffer.write(handle);
                buffer.write(desc.clear_color);
                buffer.write(desc.load.wire());
            }
            Command::NewBuffer { handle, ty, data } => {
                buffer.write(handle);
                buffer.write(ty.wire());
                buffer.write_payload(data);
            }
            Command::NewUniformBuffer { handle, size } => {
                buffer.write(handle);
                buffer.write(size);
            }
            Command::NewImage { handle, desc, data } => {
                buffer.write(handle);
                buffer.write(desc.width);
                buffer.write(desc.height);
                buffer.write_payload(data);
            }
            Command::Destroy(id) => {
                buffer.write(id.kind() as u8);
                buffer.write(id.raw());
            }
            Command::BeginDefaultPass | Command::EndPass | Command::End => {}
            Command::BeginPass(pass) => buffer.write(pass),
            Command::ApplyPipeline(pipeline) => buffer.write(pipeline),
            Command::ApplyBindings(ref bindings) => {
                buffer.write(bindings.vertex_buffers);
                buffer.write(bindings.index_buffer);
                buffer.write(bindings.uniform_buffer);
                buffer.write(bindings.images);
            }
            Command::ApplyUniforms { stage, data } => {
                buffer.write(stage.wire());
                buffer.write_payload(data);
            }
            Command::Draw {
                first_vertex,
                vertex_count,
            } => {
                buffer.write(first_vertex);
                buffer.write(vertex_count);
            }
            Command::DrawIndexed {
                first_index,
                index_count,
            } => {
                buffer.write(first_index);
                buffer.write(index_count);
            }
        }
    }

    /// Reads one command.
    ///
    /// # Panics
    ///
    /// On an unknown tag or a truncated command; both mean the stream was not
    /// produced by [`Command::encode`].
    pub fn decode(reader: &mut CommandReader<'a>) -> Self {
        let tag: u8 = reader.read();
        let kind = decode_tag(tag, "command", CommandKind::from_wire);
        match kind {
            CommandKind::NewShader => {
                let handle = reader.read();
                let ty = decode_tag(reader.read(), "shader type", ShaderType::from_wire);
                Command::NewShader {
                    handle,
                    ty,
                    bytecode: reader.read_payload(),
                }
            }
            CommandKind::NewProgram => Command::NewProgram {
                handle: reader.read(),
                vertex: reader.read(),
                fragment: reader.read(),
            },
            CommandKind::NewPipeline => Command::NewPipeline {
                handle: reader.read(),
                desc: read_pipeline_desc(reader),
            },
            CommandKind::NewPass => {
                let handle = reader.read();
                let clear_color = reader.read();
                let load = decode_tag(reader.read(), "load action", LoadAction::from_wire);
                Command::NewPass {
                    handle,
                    desc: PassDesc { clear_color, load },
                }
            }
            CommandKind::NewBuffer => {
                let handle = reader.read();
                let ty = decode_tag(reader.read(), "buffer type", BufferType::from_wire);
                Command::NewBuffer {
                    handle,
                    ty,
                    data: reader.read_payload(),
                }
            }
            CommandKind::NewUniformBuffer => Command::NewUniformBuffer {
                handle: reader.read(),
                size: reader.read(),
            },
            CommandKind::NewImage => {
                let handle = reader.read();
                let width = reader.read();
                let height = reader.read();
                Command::NewImage {
                    handle,
                    desc: TextureDesc { width, height },
                    data: reader.read_payload(),
                }
            }
            CommandKind::Destroy => {
                let kind = decode_tag(reader.read(), "resource kind", HandleKind::from_wire);
                Command::Destroy(ResourceId::from_parts(kind, reader.read()))
            }
            CommandKind::BeginDefaultPass => Command::BeginDefaultPass,
            CommandKind::BeginPass => Command::BeginPass(reader.read()),
            CommandKind::ApplyPipeline => Command::ApplyPipeline(reader.read()),
            CommandKind::ApplyBindings => {
                let vertex_buffers: [BufferHandle; MAX_BUFFER_BIND] = reader.read();
                let index_buffer = reader.read();
                let uniform_buffer = reader.read();
                let images: [ImageHandle; MAX_IMAGE_BIND] = reader.read();
                Command::ApplyBindings(Bindings {
                    vertex_buffers,
                    index_buffer,
                    uniform_buffer,
                    images,
                })
            }
            CommandKind::ApplyUniforms => {
                let stage = decode_tag(reader.read(), "shader stage", ShaderStage::from_wire);
                Command::ApplyUniforms {
                    stage,
                    data: reader.read_payload(),
                }
            }
            CommandKind::Draw => Command::Draw {
                first_vertex: reader.read(),
                vertex_count: reader.read(),
            },
            CommandKind::DrawIndexed => Command::DrawIndexed {
                first_index: reader.read(),
                index_count: reader.read(),
            },
            CommandKind::EndPass => Command::EndPass,
            CommandKind::End => Command::End,
        }
    }
}

fn decode_tag<T>(tag: u8, what: &str, from_wire: fn(u8) -> Option<T>) -> T {
    match from_wire(tag) {
        Some(value) => value,
        None => panic!("command stream desync: invalid {what} tag {tag}"),
    }
}

fn write_pipeline_desc(buffer: &mut CommandBuffer, desc: &PipelineDesc) {
    buffer.write(desc.program);
    buffer.write(desc.pass);
    buffer.write(desc.cull_mode.wire());
    buffer.write(desc.face_winding.wire());
    buffer.write(desc.primitive.wire());

    let attributes = &desc.vertex_attributes;
    buffer.write(attributes.len() as u8);
    buffer.write(attributes.stride());
    for attribute in attributes.iter() {
        buffer.write(attribute.location);
        buffer.write(attribute.offset);
        buffer.write(attribute.ty.wire());
    }
}

fn read_pipeline_desc(reader: &mut CommandReader<'_>) -> PipelineDesc {
    let program: ProgramHandle = reader.read();
    let pass: PassHandle = reader.read();
    let cull_mode = decode_tag(reader.read(), "cull mode", CullMode::from_wire);
    let face_winding = decode_tag(reader.read(), "face winding", FaceWinding::from_wire);
    let primitive = decode_tag(reader.read(), "primitive", PrimitiveType::from_wire);

    let count = reader.read::<u8>() as usize;
    assert!(
        count <= MAX_VERTEX_ATTRIBUTES,
        "command stream desync: {count} vertex attributes"
    );
    let stride: u32 = reader.read();
    let mut attributes = [VertexAttribute {
        location: 0,
        offset: 0,
        ty: AttribType::Float,
    }; MAX_VERTEX_ATTRIBUTES];
    for attribute in attributes.iter_mut().take(count) {
        attribute.location = reader.read();
        attribute.offset = reader.read();
        attribute.ty = decode_tag(reader.read(), "attribute type", AttribType::from_wire);
    }

    PipelineDesc {
        program,
        vertex_attributes: VertexAttributes::from_decoded(&attributes[..count], stride),
        cull_mode,
        face_winding,
        pass,
        primitive,
    }
}
