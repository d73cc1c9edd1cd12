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

//! Initialization configuration of a context.

use std::fmt;

use super::settings::RendererSettings;
use super::types::{GraphicsApi, Resolution};
use crate::platform::PlatformHandle;

/// Everything a backend needs to come up.
#[derive(Clone)]
pub struct InitInfo {
    /// Which backend to drive.
    pub api: GraphicsApi,
    /// Window to present into. Required by every GPU backend.
    pub platform: Option<PlatformHandle>,
    /// Backend-specific extension or layer names, passed through verbatim.
    pub extension_names: Vec<String>,
    /// Initial surface size.
    pub resolution: Resolution,
    /// Tunables.
    pub settings: RendererSettings,
}

impl InitInfo {
    /// Configuration without a window, mostly useful with test backends.
    pub fn new(api: GraphicsApi, resolution: Resolution) -> Self {
        Self {
            api,
            platform: None,
            extension_names: Vec::new(),
            resolution,
            settings: RendererSettings::default(),
        }
    }

    /// Sets the window to present into.
    pub fn with_platform(mut self, platform: PlatformHandle) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Appends extension names.
    pub fn with_extensions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extension_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: RendererSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl fmt::Debug for InitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitInfo")
            .field("api", &self.api)
            .field("platform", &self.platform.as_ref().map(|_| "<window>"))
            .field("extension_names", &self.extension_names)
            .field("resolution", &self.resolution)
            .field("settings", &self.settings)
            .finish()
    }
}
