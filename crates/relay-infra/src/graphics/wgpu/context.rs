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

//! Instance, surface, adapter and device bring-up shared by both backends.

use anyhow::Result;
use relay_core::platform::PlatformHandle;
use relay_core::renderer::{
    FrameStatus, InitError, PresentModePreference, RenderError, Resolution,
};
use wgpu::SurfaceTargetUnsafe;

use super::conversions::IntoWgpu;

/// Instance layer enabling full API validation.
pub const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";
/// Instance extension enabling debug labels and messenger callbacks.
pub const DEBUG_UTILS_EXTENSION: &str = "VK_EXT_debug_utils";

/// How a backend wants its context brought up.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub label: &'static str,
    pub backends: wgpu::Backends,
    pub flags: wgpu::InstanceFlags,
    pub present_mode: PresentModePreference,
    /// Frames the presentation engine may queue ahead.
    pub frame_latency: u32,
}

/// Holds the core WGPU state objects required for rendering.
/// This structure manages the connection to the graphics API for one window surface.
#[derive(Debug)]
pub struct WgpuGraphicsContext {
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,

    // Configuration for the surface's swapchain behavior
    pub surface_config: wgpu::SurfaceConfiguration,

    // Store info for easy access
    pub adapter_name: String,
    pub adapter_backend: wgpu::Backend,

    // The surface was created unsafely from this window and must not outlive it.
    _window: PlatformHandle,
}

impl WgpuGraphicsContext {
    /// Asynchronously initializes the graphics context for a window surface.
    ///
    /// Failures are reported as an [`anyhow::Error`] wrapping the matching
    /// [`InitError`]; see [`into_init_error`].
    pub async fn new(
        window: PlatformHandle,
        resolution: Resolution,
        options: &ContextOptions,
    ) -> Result<Self> {
        log::info!(
            "Initializing WGPU Graphics Context for {:?} ({})...",
            options.backends,
            options.label
        );

        // --- 1. Create Instance and Surface ---
        let mut instance_desc = wgpu::InstanceDescriptor::default();
        instance_desc.backends = options.backends;
        instance_desc.flags = options.flags;
        let instance = wgpu::Instance::new(&instance_desc);

        let surface_target = unsafe {
            SurfaceTargetUnsafe::from_window(&window).map_err(|e| {
                anyhow::Error::new(InitError::SurfaceCreationFailed(e.to_string()))
            })?
        };
        let surface = unsafe {
            instance
                .create_surface_unsafe(surface_target)
                .map_err(|e| anyhow::Error::new(InitError::SurfaceCreationFailed(e.to_string())))?
        };
        log::debug!("WGPU surface created for the window.");

        // --- 2. Pick an Adapter that can present to it ---
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow::Error::new(InitError::NoSuitableAdapter(e.to_string())))?;

        let adapter_info = adapter.get_info();
        if !options.backends.contains(adapter_info.backend.into()) {
            return Err(anyhow::Error::new(InitError::NoSuitableAdapter(format!(
                "adapter \"{}\" runs on {:?}, expected {:?}",
                adapter_info.name, adapter_info.backend, options.backends
            ))));
        }
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            adapter_info.name,
            adapter_info.backend
        );

        // --- 3. Create Logical Device and Command Queue from Adapter ---
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(options.label),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|e| anyhow::Error::new(InitError::DeviceCreationFailed(e.to_string())))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        // --- 4. Configure Surface ---
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| {
                anyhow::Error::new(InitError::SurfaceCreationFailed(
                    "the surface reports no supported format".to_string(),
                ))
            })?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: resolution.width.max(1),
            height: resolution.height.max(1),
            present_mode: choose_present_mode(options.present_mode, &surface_caps.present_modes),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: options.frame_latency,
        };
        surface.configure(&device, &surface_config);
        log::info!(
            "Surface configured: {}x{} {:?} {:?}",
            surface_config.width,
            surface_config.height,
            surface_config.format,
            surface_config.present_mode
        );

        Ok(WgpuGraphicsContext {
            surface,
            adapter,
            device,
            queue,
            surface_config,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            _window: window,
        })
    }

    /// Reconfigures the underlying surface (swapchain) when the window is resized.
    pub fn resize(&mut self, resolution: Resolution) {
        if resolution.is_empty() {
            log::warn!("WgpuGraphicsContext: Ignoring resize request to zero dimensions: {resolution}");
            return;
        }
        log::debug!("WgpuGraphicsContext: Resizing surface configuration to {resolution}");
        self.surface_config.width = resolution.width;
        self.surface_config.height = resolution.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Reconfigures the surface at its current size.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Acquires the next swapchain image.
    ///
    /// `Ok(None)` means the surface is lost or outdated. That is recoverable
    /// by reconfiguring, so it is not an error.
    pub fn acquire_frame(&self) -> Result<Option<wgpu::SurfaceTexture>, RenderError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(e @ wgpu::SurfaceError::Lost) | Err(e @ wgpu::SurfaceError::Outdated) => {
                log::warn!("WgpuGraphicsContext: Surface needs to be recreated ({e:?})");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::SurfaceAcquisitionFailed(
                "OutOfMemory".to_string(),
            )),
            Err(wgpu::SurfaceError::Timeout) => {
                Err(RenderError::SurfaceAcquisitionFailed("Timeout".to_string()))
            }
            Err(e) => {
                log::error!("WgpuGraphicsContext: Unexpected SurfaceError: {e:?}");
                Err(RenderError::SurfaceAcquisitionFailed(format!("{e:?}")))
            }
        }
    }

    /// Offset alignment for dynamic uniform regions, at least what the device requires.
    pub fn uniform_alignment(&self, requested: u32) -> u64 {
        let required = self.device.limits().min_uniform_buffer_offset_alignment;
        requested.max(required) as u64
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// Returns the size of the surface configuration.
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.surface_config.width, self.surface_config.height)
    }

    /// Blocks until every submission has finished.
    pub fn wait_idle(&self) {
        if let Err(e) = self.device.poll(wgpu::PollType::Wait) {
            log::warn!("Failed to poll device while waiting for idle: {e:?}");
        }
    }
}

/// The swapchain image of the frame being recorded.
///
/// The image is acquired lazily by the first pass of a frame, so frames that
/// draw nothing never touch the swapchain.
#[derive(Debug, Default)]
pub struct SurfaceFrame {
    texture: Option<wgpu::SurfaceTexture>,
    view: Option<wgpu::TextureView>,
    attempted: bool,
    lost: bool,
}

impl SurfaceFrame {
    /// The view to render into, acquiring the image on first use.
    /// `None` if the surface is lost or outdated this frame.
    pub fn acquire(
        &mut self,
        context: &WgpuGraphicsContext,
    ) -> Result<Option<&wgpu::TextureView>, RenderError> {
        if !self.attempted {
            self.attempted = true;
            match context.acquire_frame()? {
                Some(texture) => {
                    self.view = Some(
                        texture
                            .texture
                            .create_view(&wgpu::TextureViewDescriptor::default()),
                    );
                    self.texture = Some(texture);
                }
                None => self.lost = true,
            }
        }
        Ok(self.view.as_ref())
    }

    /// Presents the acquired image, if any, and readies the next frame.
    pub fn present(&mut self) -> FrameStatus {
        self.view = None;
        let status = match self.texture.take() {
            Some(texture) => {
                texture.present();
                FrameStatus::Presented
            }
            None if self.lost => FrameStatus::SurfaceOutdated,
            None => FrameStatus::Presented,
        };
        self.attempted = false;
        self.lost = false;
        status
    }

    /// Drops the acquired image without presenting it.
    pub fn discard(&mut self) {
        *self = SurfaceFrame::default();
    }
}

/// Instance flags for the requested validation setting and extension names.
///
/// Names the backend does not understand are logged and ignored.
pub fn instance_flags(validation: bool, extension_names: &[String]) -> wgpu::InstanceFlags {
    let mut flags = wgpu::InstanceFlags::empty();
    if validation {
        flags |= wgpu::InstanceFlags::VALIDATION;
    }
    for name in extension_names {
        match name.as_str() {
            VALIDATION_LAYER => flags |= wgpu::InstanceFlags::VALIDATION,
            DEBUG_UTILS_EXTENSION => flags |= wgpu::InstanceFlags::DEBUG,
            other => log::warn!("Ignoring unknown instance extension '{other}'"),
        }
    }
    flags
}

/// The preferred present mode if the surface supports it, otherwise FIFO,
/// which every surface supports.
pub fn choose_present_mode(
    preference: PresentModePreference,
    supported: &[wgpu::PresentMode],
) -> wgpu::PresentMode {
    let wanted: wgpu::PresentMode = preference.into_wgpu();
    if supported.contains(&wanted) {
        wanted
    } else {
        log::debug!("Present mode {wanted:?} unsupported, falling back to Fifo");
        wgpu::PresentMode::Fifo
    }
}

/// Recovers the [`InitError`] carried by a context bring-up failure.
pub fn into_init_error(err: anyhow::Error) -> InitError {
    match err.downcast::<InitError>() {
        Ok(init) => init,
        Err(other) => InitError::DeviceCreationFailed(format!("{other:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_validation_setting_enables_validation() {
        assert!(instance_flags(true, &[]).contains(wgpu::InstanceFlags::VALIDATION));
        assert!(instance_flags(false, &[]).is_empty());
    }

    #[test]
    fn test_known_extension_names_map_to_flags() {
        let names = vec![
            VALIDATION_LAYER.to_string(),
            DEBUG_UTILS_EXTENSION.to_string(),
            "VK_KHR_surface".to_string(),
        ];
        let flags = instance_flags(false, &names);
        assert!(flags.contains(wgpu::InstanceFlags::VALIDATION | wgpu::InstanceFlags::DEBUG));
    }

    #[test]
    fn test_present_mode_falls_back_to_fifo() {
        let supported = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate];
        assert_eq!(
            choose_present_mode(PresentModePreference::Mailbox, &supported),
            wgpu::PresentMode::Fifo
        );
        assert_eq!(
            choose_present_mode(PresentModePreference::Immediate, &supported),
            wgpu::PresentMode::Immediate
        );
    }

    #[test]
    fn test_init_error_survives_the_anyhow_round_trip() {
        let err = anyhow::Error::new(InitError::NoSuitableAdapter("none".to_string()));
        assert!(matches!(into_init_error(err), InitError::NoSuitableAdapter(_)));

        let other = into_init_error(anyhow!("driver exploded"));
        match other {
            InitError::DeviceCreationFailed(msg) => assert!(msg.contains("driver exploded")),
            e => panic!("unexpected error {e:?}"),
        }
    }
}
