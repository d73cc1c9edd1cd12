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

use relay_sdk::prelude::*;

#[test]
fn test_create_backend_matches_the_requested_api() {
    for api in [GraphicsApi::Vulkan, GraphicsApi::OpenGl] {
        let backend = relay_sdk::create_backend(api);
        assert_eq!(backend.api(), api);
    }
}

#[test]
fn test_init_without_window_fails_cleanly() {
    // --- ARRANGE ---
    let info = InitInfo::new(GraphicsApi::OpenGl, Resolution::new(640, 480));

    // --- ACT ---
    let result = relay_sdk::init(info);

    // --- ASSERT ---
    match result {
        Err(RenderError::Initialization(InitError::MissingPlatformHandle)) => {}
        other => panic!("expected a missing platform error, got {other:?}"),
    }
}

#[test]
fn test_init_rejects_invalid_settings_before_touching_the_backend() {
    let mut settings = RendererSettings::default();
    settings.frames_in_flight = 7;
    let info = InitInfo::new(GraphicsApi::Vulkan, Resolution::new(640, 480)).with_settings(settings);

    let result = relay_sdk::init(info);

    assert!(matches!(
        result,
        Err(RenderError::Initialization(InitError::InvalidSettings(_)))
    ));
}
