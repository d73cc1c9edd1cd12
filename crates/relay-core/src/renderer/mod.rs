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

//! Backend-agnostic rendering contracts.
//!
//! This module holds the "common language" between application code and a
//! backend: descriptors in [`api`], the [`RenderBackend`] trait, the error
//! hierarchy and the handle-indexed [`ResourceTable`] backends store their
//! objects in.

pub mod api;
pub mod error;
pub mod table;
pub mod traits;

pub use self::api::*;
pub use self::error::{
    DescriptorError, InitError, PipelineError, RenderError, ResourceError, ShaderError,
};
pub use self::table::ResourceTable;
pub use self::traits::{FrameStatus, RenderBackend};
