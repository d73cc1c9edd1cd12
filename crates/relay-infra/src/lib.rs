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

//! # Relay Infra
//!
//! Concrete [`RenderBackend`](relay_core::RenderBackend) implementations built
//! on `wgpu`.
//!
//! - [`VulkanRenderBackend`] is the explicit backend. It keeps several frames
//!   in flight, paces the CPU with submission fences and defers every release
//!   until the GPU is done with it.
//! - [`GlRenderBackend`] is the immediate backend. It runs one frame at a time
//!   and waits for the device after each submit.

pub mod graphics;

#[cfg(feature = "gl")]
pub use graphics::wgpu::GlRenderBackend;
#[cfg(feature = "vulkan")]
pub use graphics::wgpu::VulkanRenderBackend;
