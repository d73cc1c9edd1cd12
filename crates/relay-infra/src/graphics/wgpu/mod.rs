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

//! The `wgpu` implementation of the render backend contract.
//!
//! Both backends share the device bring-up in [`context`], the GPU-side
//! resource tables in [`resources`] and the pass state machine in
//! [`recorder`]. They differ in how frames are paced: see [`frame`].

pub mod context;
pub mod conversions;
pub mod frame;
pub mod recorder;
pub mod resources;
pub mod spirv;
pub mod uniforms;

#[cfg(feature = "gl")]
mod gl;
#[cfg(feature = "vulkan")]
mod vulkan;

#[cfg(feature = "gl")]
pub use gl::GlRenderBackend;
#[cfg(feature = "vulkan")]
pub use vulkan::VulkanRenderBackend;
