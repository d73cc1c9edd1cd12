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

use relay_core::renderer::{
    AttribType, BufferType, CullMode, FaceWinding, GraphicsApi, LoadAction, PassDesc,
    PresentModePreference, PrimitiveType, Resolution, ShaderStage, TextureDesc,
};

/// A local extension trait to convert relay types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

// --- Dimensions ---

impl IntoWgpu<wgpu::Extent3d> for Resolution {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

impl IntoWgpu<wgpu::Extent3d> for &TextureDesc {
    fn into_wgpu(self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

// --- Pipeline state ---

impl IntoWgpu<wgpu::VertexFormat> for AttribType {
    fn into_wgpu(self) -> wgpu::VertexFormat {
        match self {
            AttribType::Float => wgpu::VertexFormat::Float32,
            AttribType::Float2 => wgpu::VertexFormat::Float32x2,
            AttribType::Float3 => wgpu::VertexFormat::Float32x3,
            AttribType::Float4 => wgpu::VertexFormat::Float32x4,
        }
    }
}

impl IntoWgpu<Option<wgpu::Face>> for CullMode {
    fn into_wgpu(self) -> Option<wgpu::Face> {
        match self {
            CullMode::None => None,
            CullMode::Front => Some(wgpu::Face::Front),
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }
}

impl IntoWgpu<wgpu::FrontFace> for FaceWinding {
    fn into_wgpu(self) -> wgpu::FrontFace {
        match self {
            FaceWinding::Clockwise => wgpu::FrontFace::Cw,
            FaceWinding::CounterClockwise => wgpu::FrontFace::Ccw,
        }
    }
}

/// `None` for topologies wgpu cannot express (triangle fans).
impl IntoWgpu<Option<wgpu::PrimitiveTopology>> for PrimitiveType {
    fn into_wgpu(self) -> Option<wgpu::PrimitiveTopology> {
        match self {
            PrimitiveType::Points => Some(wgpu::PrimitiveTopology::PointList),
            PrimitiveType::Lines => Some(wgpu::PrimitiveTopology::LineList),
            PrimitiveType::LineStrip => Some(wgpu::PrimitiveTopology::LineStrip),
            PrimitiveType::Triangles => Some(wgpu::PrimitiveTopology::TriangleList),
            PrimitiveType::TriangleStrip => Some(wgpu::PrimitiveTopology::TriangleStrip),
            PrimitiveType::TriangleFan => None,
        }
    }
}

// --- Buffers and bindings ---

impl IntoWgpu<wgpu::BufferUsages> for BufferType {
    fn into_wgpu(self) -> wgpu::BufferUsages {
        let usage = match self {
            BufferType::Vertex => wgpu::BufferUsages::VERTEX,
            BufferType::Index => wgpu::BufferUsages::INDEX,
            BufferType::Uniform => wgpu::BufferUsages::UNIFORM,
        };
        usage | wgpu::BufferUsages::COPY_DST
    }
}

impl IntoWgpu<wgpu::ShaderStages> for ShaderStage {
    fn into_wgpu(self) -> wgpu::ShaderStages {
        match self {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
            ShaderStage::All => wgpu::ShaderStages::VERTEX_FRAGMENT,
        }
    }
}

// --- Passes ---

impl IntoWgpu<wgpu::Color> for [f32; 4] {
    fn into_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self[0] as f64,
            g: self[1] as f64,
            b: self[2] as f64,
            a: self[3] as f64,
        }
    }
}

impl IntoWgpu<wgpu::Operations<wgpu::Color>> for &PassDesc {
    fn into_wgpu(self) -> wgpu::Operations<wgpu::Color> {
        let load = match self.load {
            LoadAction::Clear => wgpu::LoadOp::Clear(self.clear_color.into_wgpu()),
            LoadAction::Load => wgpu::LoadOp::Load,
        };
        wgpu::Operations {
            load,
            store: wgpu::StoreOp::Store,
        }
    }
}

// --- Presentation and instance ---

impl IntoWgpu<wgpu::PresentMode> for PresentModePreference {
    fn into_wgpu(self) -> wgpu::PresentMode {
        match self {
            PresentModePreference::Mailbox => wgpu::PresentMode::Mailbox,
            PresentModePreference::Fifo => wgpu::PresentMode::Fifo,
            PresentModePreference::Immediate => wgpu::PresentMode::Immediate,
        }
    }
}

impl IntoWgpu<wgpu::Backends> for GraphicsApi {
    fn into_wgpu(self) -> wgpu::Backends {
        match self {
            GraphicsApi::Vulkan => wgpu::Backends::VULKAN,
            GraphicsApi::OpenGl => wgpu::Backends::GL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attrib_type_conversion() {
        assert_eq!(wgpu::VertexFormat::Float32, AttribType::Float.into_wgpu());
        assert_eq!(wgpu::VertexFormat::Float32x3, AttribType::Float3.into_wgpu());
        assert_eq!(wgpu::VertexFormat::Float32x4, AttribType::Float4.into_wgpu());
    }

    #[test]
    fn test_vertex_format_sizes_match_attribute_sizes() {
        for ty in [
            AttribType::Float,
            AttribType::Float2,
            AttribType::Float3,
            AttribType::Float4,
        ] {
            let format: wgpu::VertexFormat = ty.into_wgpu();
            assert_eq!(format.size(), ty.size() as u64);
        }
    }

    #[test]
    fn test_cull_mode_conversion() {
        let front: Option<wgpu::Face> = CullMode::Front.into_wgpu();
        assert_eq!(Some(wgpu::Face::Front), front);
        let none: Option<wgpu::Face> = CullMode::None.into_wgpu();
        assert_eq!(None, none);
    }

    #[test]
    fn test_winding_conversion() {
        assert_eq!(wgpu::FrontFace::Cw, FaceWinding::Clockwise.into_wgpu());
        assert_eq!(wgpu::FrontFace::Ccw, FaceWinding::CounterClockwise.into_wgpu());
    }

    #[test]
    fn test_triangle_fan_has_no_topology() {
        let fan: Option<wgpu::PrimitiveTopology> = PrimitiveType::TriangleFan.into_wgpu();
        assert_eq!(None, fan);
        let list: Option<wgpu::PrimitiveTopology> = PrimitiveType::default().into_wgpu();
        assert_eq!(Some(wgpu::PrimitiveTopology::TriangleList), list);
    }

    #[test]
    fn test_buffer_usage_allows_writes() {
        let usage: wgpu::BufferUsages = BufferType::Index.into_wgpu();
        assert!(usage.contains(wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST));
    }

    #[test]
    fn test_default_pass_clears_to_black() {
        let ops: wgpu::Operations<wgpu::Color> = (&PassDesc::DEFAULT_PASS).into_wgpu();
        assert_eq!(ops.load, wgpu::LoadOp::Clear(wgpu::Color::BLACK));
        assert_eq!(ops.store, wgpu::StoreOp::Store);
    }

    #[test]
    fn test_load_pass_keeps_contents() {
        let desc = PassDesc {
            clear_color: [1.0, 0.0, 0.0, 1.0],
            load: LoadAction::Load,
        };
        let ops: wgpu::Operations<wgpu::Color> = (&desc).into_wgpu();
        assert_eq!(ops.load, wgpu::LoadOp::Load);
    }

    #[test]
    fn test_api_selects_one_backend() {
        assert_eq!(wgpu::Backends::VULKAN, GraphicsApi::Vulkan.into_wgpu());
        assert_eq!(wgpu::Backends::GL, GraphicsApi::OpenGl.into_wgpu());
    }
}
