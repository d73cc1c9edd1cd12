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

//! The public-facing entry point of the relay renderer.
//!
//! ```no_run
//! use relay_sdk::prelude::*;
//!
//! # fn window() -> PlatformHandle { unimplemented!() }
//! let info = InitInfo::new(GraphicsApi::Vulkan, Resolution::new(1280, 720))
//!     .with_platform(window());
//! let mut context = relay_sdk::init(info)?;
//! context.begin_default_pass();
//! context.end_pass();
//! context.commit_frame()?;
//! # Ok::<(), RenderError>(())
//! ```

use relay_core::renderer::{GraphicsApi, InitInfo, RenderBackend, RenderError};
use relay_infra::{GlRenderBackend, VulkanRenderBackend};

pub use relay_core::{command, handle, platform, renderer, Context};

pub mod prelude {
    pub use relay_core::platform::{PlatformHandle, WindowHandle};
    pub use relay_core::renderer::{
        AttribType, Bindings, BufferType, CullMode, FaceWinding, FrameStatus, GraphicsApi,
        InitError, InitInfo, LoadAction, PassDesc, PipelineDesc, PresentModePreference,
        PrimitiveType, RenderError, RendererSettings, Resolution, ResourceLimits, ShaderStage,
        ShaderType, TextureDesc, VertexAttributes,
    };
    pub use relay_core::{
        BufferHandle, Context, Handle, ImageHandle, PassHandle, PipelineHandle, ProgramHandle,
        ResourceId, ShaderHandle, UniformBufferHandle,
    };
}

/// A fresh, uninitialized backend for `api`.
pub fn create_backend(api: GraphicsApi) -> Box<dyn RenderBackend> {
    match api {
        GraphicsApi::Vulkan => Box::new(VulkanRenderBackend::new()),
        GraphicsApi::OpenGl => Box::new(GlRenderBackend::new()),
    }
}

/// Creates the backend `info.api` selects and brings a context up on it.
pub fn init(info: InitInfo) -> Result<Context, RenderError> {
    log::info!("relay: creating {} context at {}", info.api, info.resolution);
    let backend = create_backend(info.api);
    Context::new(backend, &info)
}
