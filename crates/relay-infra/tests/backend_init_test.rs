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

//! Backend behavior that does not need a GPU: init preconditions and the
//! uninitialized state.

use relay_core::renderer::{
    Bindings, GraphicsApi, InitError, InitInfo, PassDesc, RenderBackend, RenderError,
    Resolution, ShaderType,
};
use relay_core::{Context, Handle, ResourceId, ShaderHandle};
use relay_infra::{GlRenderBackend, VulkanRenderBackend};

fn backends() -> Vec<Box<dyn RenderBackend>> {
    vec![
        Box::new(VulkanRenderBackend::new()),
        Box::new(GlRenderBackend::new()),
    ]
}

#[test]
fn test_init_without_window_reports_missing_platform_handle() {
    for mut backend in backends() {
        // --- ARRANGE ---
        let info = InitInfo::new(backend.api(), Resolution::new(800, 600));

        // --- ACT ---
        let result = backend.init(&info);

        // --- ASSERT ---
        assert!(
            matches!(result, Err(InitError::MissingPlatformHandle)),
            "{:?} accepted an init without a window",
            backend.api()
        );
    }
}

#[test]
fn test_context_surfaces_backend_init_failure() {
    let info = InitInfo::new(GraphicsApi::Vulkan, Resolution::new(800, 600));

    let result = Context::new(Box::new(VulkanRenderBackend::new()), &info);

    match result {
        Err(RenderError::Initialization(InitError::MissingPlatformHandle)) => {}
        other => panic!("expected a missing platform error, got {other:?}"),
    }
}

#[test]
fn test_uninitialized_backend_rejects_work() {
    for mut backend in backends() {
        let shader = ShaderHandle::from_raw(0);

        assert!(matches!(
            backend.new_shader(shader, ShaderType::Vertex, &[0u8; 20]),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            backend.new_pass(relay_core::PassHandle::from_raw(0), &PassDesc::default()),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            backend.destroy(ResourceId::Shader(shader)),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            backend.begin_default_pass(),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            backend.apply_bindings(&Bindings::default()),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            backend.resize(Resolution::new(640, 480)),
            Err(RenderError::NotInitialized)
        ));
        assert!(matches!(
            backend.commit_frame(),
            Err(RenderError::NotInitialized)
        ));
    }
}

#[test]
fn test_shutdown_and_discard_are_harmless_before_init() {
    for mut backend in backends() {
        backend.discard_frame();
        backend.shutdown();
        backend.shutdown();
        assert!(matches!(
            backend.draw(0, 3),
            Err(RenderError::NotInitialized)
        ));
    }
}

#[test]
fn test_backends_report_their_api() {
    let vulkan = VulkanRenderBackend::new();
    let gl = GlRenderBackend::new();

    assert_eq!(vulkan.api(), GraphicsApi::Vulkan);
    assert_eq!(gl.api(), GraphicsApi::OpenGl);
    assert!(vulkan.adapter_name().is_none());
    assert!(vulkan.frames_in_flight().is_none());
    assert!(vulkan
        .as_any()
        .downcast_ref::<VulkanRenderBackend>()
        .is_some());
}
