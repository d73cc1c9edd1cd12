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

//! Global settings for a rendering context.

use serde::{Deserialize, Serialize};

use crate::renderer::error::InitError;

/// Upper bound on frames in flight.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Presentation mode requested from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PresentModePreference {
    /// Low-latency vsync, falling back to FIFO when unsupported.
    #[default]
    Mailbox,
    /// Classic vsync. Always available.
    Fifo,
    /// No vsync, falling back to FIFO when unsupported.
    Immediate,
}

/// Capacity of each backend resource table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct ResourceLimits {
    pub shaders: usize,
    pub programs: usize,
    pub pipelines: usize,
    pub passes: usize,
    pub buffers: usize,
    pub uniform_buffers: usize,
    pub images: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            shaders: 512,
            programs: 512,
            pipelines: 512,
            passes: 512,
            buffers: 4096,
            uniform_buffers: 512,
            images: 4096,
        }
    }
}

/// A collection of settings that shape how a context records and presents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Number of frames the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
    /// Initial byte capacity of the command stream.
    pub command_buffer_capacity: usize,
    /// Resource table capacities.
    pub limits: ResourceLimits,
    /// Presentation mode.
    pub present_mode: PresentModePreference,
    /// Enables backend validation.
    pub validation: bool,
    /// Alignment of per-draw uniform regions, in bytes.
    pub uniform_alignment: u32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            frames_in_flight: 2,
            command_buffer_capacity: 1024,
            limits: ResourceLimits::default(),
            present_mode: PresentModePreference::default(),
            validation: cfg!(debug_assertions),
            uniform_alignment: 256,
        }
    }
}

impl RendererSettings {
    /// Parses settings from RON text. Missing fields keep their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, InitError> {
        let settings: RendererSettings =
            ron::from_str(text).map_err(|e| InitError::InvalidSettings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serializes the settings as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, InitError> {
        let pretty = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty).map_err(|e| InitError::InvalidSettings(e.to_string()))
    }

    /// Checks every value is in range.
    pub fn validate(&self) -> Result<(), InitError> {
        if !(2..=MAX_FRAMES_IN_FLIGHT).contains(&self.frames_in_flight) {
            return Err(InitError::InvalidSettings(format!(
                "frames_in_flight must be between 2 and {MAX_FRAMES_IN_FLIGHT}, got {}",
                self.frames_in_flight
            )));
        }
        if !self.uniform_alignment.is_power_of_two() {
            return Err(InitError::InvalidSettings(format!(
                "uniform_alignment must be a power of two, got {}",
                self.uniform_alignment
            )));
        }
        let limits = &self.limits;
        for (name, value) in [
            ("shaders", limits.shaders),
            ("programs", limits.programs),
            ("pipelines", limits.pipelines),
            ("passes", limits.passes),
            ("buffers", limits.buffers),
            ("uniform_buffers", limits.uniform_buffers),
            ("images", limits.images),
        ] {
            if value == 0 || value > crate::handle::NULL_HANDLE as usize {
                return Err(InitError::InvalidSettings(format!(
                    "limits.{name} must be between 1 and {}, got {value}",
                    crate::handle::NULL_HANDLE
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = RendererSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.limits.shaders, 512);
        assert_eq!(settings.limits.images, 4096);
        assert_eq!(settings.command_buffer_capacity, 1024);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let settings =
            RendererSettings::from_ron_str("(frames_in_flight: 3, present_mode: Fifo)").unwrap();
        assert_eq!(settings.frames_in_flight, 3);
        assert_eq!(settings.present_mode, PresentModePreference::Fifo);
        assert_eq!(settings.uniform_alignment, 256);
        assert_eq!(settings.limits, ResourceLimits::default());
    }

    #[test]
    fn single_frame_in_flight_is_rejected() {
        let err = RendererSettings::from_ron_str("(frames_in_flight: 1)").unwrap_err();
        assert!(matches!(err, InitError::InvalidSettings(_)));
    }

    #[test]
    fn malformed_ron_is_rejected() {
        assert!(RendererSettings::from_ron_str("(frames_in_flight: )").is_err());
    }

    #[test]
    fn pretty_output_parses_back() {
        let mut settings = RendererSettings::default();
        settings.limits.buffers = 100;
        let text = settings.to_ron_string().unwrap();
        assert_eq!(RendererSettings::from_ron_str(&text).unwrap(), settings);
    }
}
