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

//! Small enums and value types shared by the public API and the command stream.

use std::fmt;

/// Declares a fieldless `u8` enum that can be written into and read back from
/// the command stream.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            /// Decodes a tag produced by [`Self::wire`].
            pub fn from_wire(tag: u8) -> Option<Self> {
                match tag {
                    $(x if x == $value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// The tag written into the command stream.
            pub fn wire(self) -> u8 {
                self as u8
            }
        }
    };
}

wire_enum! {
    /// Selects the concrete backend a context drives.
    pub enum GraphicsApi {
        /// Explicit GPU API with frames in flight.
        Vulkan = 0,
        /// Immediate-mode GPU API.
        OpenGl = 1,
    }
}

impl fmt::Display for GraphicsApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsApi::Vulkan => f.write_str("Vulkan"),
            GraphicsApi::OpenGl => f.write_str("OpenGL"),
        }
    }
}

wire_enum! {
    /// Component type of one vertex attribute.
    pub enum AttribType {
        /// One 32-bit float.
        Float = 0,
        /// Two 32-bit floats.
        Float2 = 1,
        /// Three 32-bit floats.
        Float3 = 2,
        /// Four 32-bit floats.
        Float4 = 3,
    }
}

impl AttribType {
    /// Number of float components.
    pub fn components(self) -> u32 {
        match self {
            AttribType::Float => 1,
            AttribType::Float2 => 2,
            AttribType::Float3 => 3,
            AttribType::Float4 => 4,
        }
    }

    /// Size of the attribute in bytes.
    pub fn size(self) -> u32 {
        self.components() * 4
    }
}

wire_enum! {
    /// Usage of a static buffer.
    pub enum BufferType {
        /// Vertex data.
        Vertex = 0,
        /// 16-bit index data.
        Index = 1,
        /// Uniform data that never changes after creation.
        Uniform = 2,
    }
}

wire_enum! {
    /// The shader stage a uniform update is visible to.
    pub enum ShaderStage {
        /// Vertex stage only.
        Vertex = 0,
        /// Fragment stage only.
        Fragment = 1,
        /// Both stages.
        All = 2,
    }
}

wire_enum! {
    /// The pipeline stage a shader module is compiled for.
    pub enum ShaderType {
        /// Vertex shader.
        Vertex = 0,
        /// Fragment shader.
        Fragment = 1,
        /// Compute shader.
        Compute = 2,
    }
}

wire_enum! {
    /// Which faces are culled.
    #[derive(Default)]
    pub enum CullMode {
        /// No culling.
        None = 0,
        /// Cull front faces.
        #[default]
        Front = 1,
        /// Cull back faces.
        Back = 2,
    }
}

wire_enum! {
    /// Primitive topology.
    #[derive(Default)]
    pub enum PrimitiveType {
        /// Point list.
        Points = 0,
        /// Line list.
        Lines = 1,
        /// Line strip.
        LineStrip = 2,
        /// Triangle list.
        #[default]
        Triangles = 3,
        /// Triangle strip.
        TriangleStrip = 4,
        /// Triangle fan.
        TriangleFan = 5,
    }
}

wire_enum! {
    /// Vertex winding that marks a front face.
    #[derive(Default)]
    pub enum FaceWinding {
        /// Clockwise.
        #[default]
        Clockwise = 0,
        /// Counter-clockwise.
        CounterClockwise = 1,
    }
}

wire_enum! {
    /// What happens to the color attachment when a pass begins.
    #[derive(Default)]
    pub enum LoadAction {
        /// Clear to the pass clear color.
        #[default]
        Clear = 0,
        /// Keep the existing contents.
        Load = 1,
    }
}

/// Size of the presentation surface in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Creates a resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either dimension is zero, e.g. a minimized window.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
