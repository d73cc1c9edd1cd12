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

//! Integration tests for deferred recording and replay through [`Context`].
//!
//! A mock backend logs every call it receives and keeps real resource
//! tables, so cross-resource references resolve exactly as they would on a
//! GPU backend.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use relay_core::renderer::{
    AttribType, Bindings, BufferType, DescriptorError, FrameStatus, GraphicsApi, InitError,
    InitInfo, PassDesc, PipelineDesc, RenderBackend, RenderError, RendererSettings, Resolution,
    ResourceError, ResourceLimits, ResourceTable, ShaderStage, ShaderType, TextureDesc,
    VertexAttributes,
};
use relay_core::{
    command::CommandKind, BufferHandle, Context, Handle, HandleKind, ImageHandle, PassHandle,
    PipelineHandle, ProgramHandle, ResourceId, ShaderHandle, UniformBufferHandle,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Init(Resolution),
    Shutdown,
    Resize(Resolution),
    NewShader(u16, ShaderType, usize),
    NewProgram(u16),
    NewPipeline(u16),
    NewPass(u16),
    NewBuffer(u16, BufferType, Vec<u8>),
    NewUniformBuffer(u16, u32),
    NewImage(u16, u32, u32),
    Destroy(ResourceId),
    BeginDefaultPass(Resolution),
    BeginPass(u16),
    ApplyPipeline(u16),
    ApplyBindings,
    ApplyUniforms(ShaderStage, Vec<u8>),
    Draw(u32, u32),
    DrawIndexed(u32, u32),
    EndPass,
    Commit,
    Discard,
}

type CallLog = Rc<RefCell<Vec<Call>>>;

#[derive(Debug)]
struct MockBackend {
    log: CallLog,
    extent: Resolution,
    in_pass: bool,
    shaders: ResourceTable<ShaderHandle, ShaderType>,
    /// Vertex and fragment shader of each program.
    programs: ResourceTable<ProgramHandle, (ShaderHandle, ShaderHandle)>,
    /// Program each pipeline was built from.
    pipelines: ResourceTable<PipelineHandle, ProgramHandle>,
    passes: ResourceTable<PassHandle, ()>,
    buffers: ResourceTable<BufferHandle, usize>,
    uniform_buffers: ResourceTable<UniformBufferHandle, u32>,
    images: ResourceTable<ImageHandle, ()>,
    report_outdated: bool,
    failing_resizes: u32,
    shut_down: bool,
}

impl MockBackend {
    fn new(log: CallLog) -> Self {
        let limits = ResourceLimits::default();
        Self {
            log,
            extent: Resolution::default(),
            in_pass: false,
            shaders: ResourceTable::new(limits.shaders),
            programs: ResourceTable::new(limits.programs),
            pipelines: ResourceTable::new(limits.pipelines),
            passes: ResourceTable::new(limits.passes),
            buffers: ResourceTable::new(limits.buffers),
            uniform_buffers: ResourceTable::new(limits.uniform_buffers),
            images: ResourceTable::new(limits.images),
            report_outdated: false,
            failing_resizes: 0,
            shut_down: false,
        }
    }

    fn push(&self, call: Call) {
        self.log.borrow_mut().push(call);
    }

    fn require_pass(&self, what: &str) -> Result<(), RenderError> {
        if self.in_pass {
            Ok(())
        } else {
            Err(RenderError::InvalidState(format!("{what} outside a pass")))
        }
    }
}

impl RenderBackend for MockBackend {
    fn api(&self) -> GraphicsApi {
        GraphicsApi::Vulkan
    }

    fn init(&mut self, info: &InitInfo) -> Result<(), InitError> {
        self.extent = info.resolution;
        self.push(Call::Init(info.resolution));
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.push(Call::Shutdown);
    }

    fn resize(&mut self, resolution: Resolution) -> Result<(), RenderError> {
        if self.failing_resizes > 0 {
            self.failing_resizes -= 1;
            return Err(RenderError::InvalidState("swapchain busy".to_string()));
        }
        self.extent = resolution;
        self.push(Call::Resize(resolution));
        Ok(())
    }

    fn new_shader(
        &mut self,
        handle: ShaderHandle,
        ty: ShaderType,
        bytecode: &[u8],
    ) -> Result<(), RenderError> {
        self.shaders.insert(handle, ty)?;
        self.push(Call::NewShader(handle.raw(), ty, bytecode.len()));
        Ok(())
    }

    fn new_program(
        &mut self,
        handle: ProgramHandle,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<(), RenderError> {
        self.shaders.get(vertex)?;
        self.shaders.get(fragment)?;
        self.programs.insert(handle, (vertex, fragment))?;
        self.push(Call::NewProgram(handle.raw()));
        Ok(())
    }

    fn new_pipeline(&mut self, handle: PipelineHandle, desc: &PipelineDesc) -> Result<(), RenderError> {
        self.programs.get(desc.program)?;
        self.pipelines.insert(handle, desc.program)?;
        self.push(Call::NewPipeline(handle.raw()));
        Ok(())
    }

    fn new_pass(&mut self, handle: PassHandle, _desc: &PassDesc) -> Result<(), RenderError> {
        self.passes.insert(handle, ())?;
        self.push(Call::NewPass(handle.raw()));
        Ok(())
    }

    fn new_buffer(
        &mut self,
        handle: BufferHandle,
        ty: BufferType,
        data: &[u8],
    ) -> Result<(), RenderError> {
        self.buffers.insert(handle, data.len())?;
        self.push(Call::NewBuffer(handle.raw(), ty, data.to_vec()));
        Ok(())
    }

    fn new_uniform_buffer(
        &mut self,
        handle: UniformBufferHandle,
        size: u32,
    ) -> Result<(), RenderError> {
        self.uniform_buffers.insert(handle, size)?;
        self.push(Call::NewUniformBuffer(handle.raw(), size));
        Ok(())
    }

    fn new_image(
        &mut self,
        handle: ImageHandle,
        desc: &TextureDesc,
        _data: &[u8],
    ) -> Result<(), RenderError> {
        self.images.insert(handle, ())?;
        self.push(Call::NewImage(handle.raw(), desc.width, desc.height));
        Ok(())
    }

    fn destroy(&mut self, id: ResourceId) -> Result<(), RenderError> {
        match id {
            ResourceId::Buffer(handle) => {
                self.buffers.remove(handle)?;
            }
            ResourceId::Shader(handle) => {
                self.shaders.remove(handle)?;
            }
            _ => return Err(RenderError::Internal(format!("mock cannot destroy {id:?}"))),
        }
        self.push(Call::Destroy(id));
        Ok(())
    }

    fn begin_default_pass(&mut self) -> Result<(), RenderError> {
        self.in_pass = true;
        self.push(Call::BeginDefaultPass(self.extent));
        Ok(())
    }

    fn begin_pass(&mut self, pass: PassHandle) -> Result<(), RenderError> {
        self.passes.get(pass)?;
        self.in_pass = true;
        self.push(Call::BeginPass(pass.raw()));
        Ok(())
    }

    fn apply_pipeline(&mut self, pipeline: PipelineHandle) -> Result<(), RenderError> {
        self.require_pass("apply_pipeline")?;
        self.pipelines.get(pipeline)?;
        self.push(Call::ApplyPipeline(pipeline.raw()));
        Ok(())
    }

    fn apply_bindings(&mut self, bindings: &Bindings) -> Result<(), RenderError> {
        self.require_pass("apply_bindings")?;
        for (_, buffer) in bindings.bound_vertex_buffers() {
            self.buffers.get(buffer)?;
        }
        self.push(Call::ApplyBindings);
        Ok(())
    }

    fn apply_uniforms(&mut self, stage: ShaderStage, data: &[u8]) -> Result<(), RenderError> {
        self.require_pass("apply_uniforms")?;
        self.push(Call::ApplyUniforms(stage, data.to_vec()));
        Ok(())
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32) -> Result<(), RenderError> {
        self.require_pass("draw")?;
        self.push(Call::Draw(first_vertex, vertex_count));
        Ok(())
    }

    fn draw_indexed(&mut self, first_index: u32, index_count: u32) -> Result<(), RenderError> {
        self.require_pass("draw_indexed")?;
        self.push(Call::DrawIndexed(first_index, index_count));
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), RenderError> {
        self.require_pass("end_pass")?;
        self.in_pass = false;
        self.push(Call::EndPass);
        Ok(())
    }

    fn commit_frame(&mut self) -> Result<FrameStatus, RenderError> {
        self.push(Call::Commit);
        if std::mem::take(&mut self.report_outdated) {
            Ok(FrameStatus::SurfaceOutdated)
        } else {
            Ok(FrameStatus::Presented)
        }
    }

    fn discard_frame(&mut self) {
        self.in_pass = false;
        self.push(Call::Discard);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn context_with(settings: RendererSettings) -> (Context, CallLog) {
    let log = CallLog::default();
    let info =
        InitInfo::new(GraphicsApi::Vulkan, Resolution::new(800, 600)).with_settings(settings);
    let context = Context::new(Box::new(MockBackend::new(log.clone())), &info)
        .expect("mock backend initializes");
    log.borrow_mut().clear();
    (context, log)
}

fn context() -> (Context, CallLog) {
    context_with(RendererSettings::default())
}

fn calls(log: &CallLog) -> Vec<Call> {
    log.borrow().clone()
}

fn mock(context: &Context) -> &MockBackend {
    context
        .backend()
        .as_any()
        .downcast_ref::<MockBackend>()
        .expect("backend is the mock")
}

fn triangle_pipeline(context: &mut Context) -> PipelineHandle {
    let vs = context.new_shader(ShaderType::Vertex, &[0x03, 0x02, 0x23, 0x07]).unwrap();
    let fs = context.new_shader(ShaderType::Fragment, &[0x03, 0x02, 0x23, 0x07]).unwrap();
    let program = context.new_program(vs, fs).unwrap();
    let mut attributes = VertexAttributes::new();
    attributes
        .begin()
        .add(0, AttribType::Float3)
        .unwrap()
        .add(1, AttribType::Float4)
        .unwrap()
        .end();
    context.new_pipeline(&PipelineDesc::new(program, attributes)).unwrap()
}

// --- Recording is deferred ---

#[test]
fn test_nothing_reaches_the_backend_before_commit() {
    // ARRANGE
    let (mut context, log) = context();

    // ACT
    let pipeline = triangle_pipeline(&mut context);
    context.begin_default_pass();
    context.apply_pipeline(pipeline);
    context.draw(0, 3);
    context.end_pass();

    // ASSERT
    assert!(calls(&log).is_empty());
    assert_eq!(context.recorded_commands(), 8);
    assert!(mock(&context).pipelines.is_empty());
}

#[test]
fn test_replay_preserves_recording_order() {
    let (mut context, log) = context();
    let pipeline = triangle_pipeline(&mut context);
    let vertices = context
        .new_buffer(&[1, 2, 3, 4], BufferType::Vertex)
        .unwrap();
    context.begin_default_pass();
    context.apply_pipeline(pipeline);
    context.apply_bindings(&Bindings::with_vertex_buffer(vertices));
    context
        .apply_uniforms(ShaderStage::Vertex, &[9, 9, 9, 9])
        .unwrap();
    context.draw(0, 3);
    context.end_pass();

    let status = context.commit_frame().unwrap();

    assert_eq!(status, FrameStatus::Presented);
    assert_eq!(
        calls(&log),
        vec![
            Call::NewShader(0, ShaderType::Vertex, 4),
            Call::NewShader(1, ShaderType::Fragment, 4),
            Call::NewProgram(0),
            Call::NewPipeline(0),
            Call::NewBuffer(0, BufferType::Vertex, vec![1, 2, 3, 4]),
            Call::BeginDefaultPass(Resolution::new(800, 600)),
            Call::ApplyPipeline(0),
            Call::ApplyBindings,
            Call::ApplyUniforms(ShaderStage::Vertex, vec![9, 9, 9, 9]),
            Call::Draw(0, 3),
            Call::EndPass,
            Call::Commit,
        ]
    );
    assert_eq!(context.recorded_commands(), 0);
    assert_eq!(context.frame_index(), 1);
}

#[test]
fn test_handles_created_in_one_frame_resolve_in_the_same_replay() {
    let (mut context, _log) = context();
    let pipeline = triangle_pipeline(&mut context);
    context.begin_default_pass();
    context.apply_pipeline(pipeline);
    context.end_pass();

    context.commit_frame().unwrap();

    let backend = mock(&context);
    assert_eq!(backend.shaders.len(), 2);
    let program = *backend.pipelines.get(pipeline).unwrap();
    assert_eq!(program, ProgramHandle::from_raw(0));
    let (vertex, fragment) = *backend.programs.get(program).unwrap();
    assert_eq!(*backend.shaders.get(vertex).unwrap(), ShaderType::Vertex);
    assert_eq!(*backend.shaders.get(fragment).unwrap(), ShaderType::Fragment);
}

#[test]
fn test_pipelines_reference_the_program_they_were_built_from() {
    // --- ARRANGE ---
    let (mut context, _log) = context();
    let spirv = [0x03, 0x02, 0x23, 0x07];
    let first_vs = context.new_shader(ShaderType::Vertex, &spirv).unwrap();
    let first_fs = context.new_shader(ShaderType::Fragment, &spirv).unwrap();
    let first = context.new_program(first_vs, first_fs).unwrap();
    let second_vs = context.new_shader(ShaderType::Vertex, &spirv).unwrap();
    let second_fs = context.new_shader(ShaderType::Fragment, &spirv).unwrap();
    let second = context.new_program(second_vs, second_fs).unwrap();

    // --- ACT ---
    let a = context
        .new_pipeline(&PipelineDesc::new(second, VertexAttributes::new()))
        .unwrap();
    let b = context
        .new_pipeline(&PipelineDesc::new(first, VertexAttributes::new()))
        .unwrap();
    context.commit_frame().unwrap();

    // --- ASSERT ---
    let backend = mock(&context);
    assert_eq!(*backend.pipelines.get(a).unwrap(), second);
    assert_eq!(*backend.pipelines.get(b).unwrap(), first);
    assert_eq!(*backend.programs.get(second).unwrap(), (second_vs, second_fs));
    assert_eq!(*backend.programs.get(first).unwrap(), (first_vs, first_fs));
}

#[test]
fn test_payloads_are_copied_at_record_time() {
    let (mut context, log) = context();
    let mut pixels = vec![7u8; 2 * 2 * 4];
    let mut vertices = vec![1u8, 2, 3];
    context.new_image(&pixels, &TextureDesc::new(2, 2)).unwrap();
    context.new_buffer(&vertices, BufferType::Vertex).unwrap();
    pixels.clear();
    vertices.iter_mut().for_each(|byte| *byte = 0);
    drop(pixels);

    context.commit_frame().unwrap();

    assert_eq!(
        calls(&log)[..2],
        [
            Call::NewImage(0, 2, 2),
            Call::NewBuffer(0, BufferType::Vertex, vec![1, 2, 3]),
        ]
    );
}

#[test]
fn test_handles_are_never_reissued_after_destroy() {
    let (mut context, log) = context();
    let first = context.new_buffer(&[1], BufferType::Vertex).unwrap();
    context.destroy(first).unwrap();
    let second = context.new_buffer(&[2], BufferType::Vertex).unwrap();

    context.commit_frame().unwrap();

    assert_ne!(first, second);
    assert_eq!(second.raw(), 1);
    assert_eq!(calls(&log)[1], Call::Destroy(ResourceId::Buffer(first)));
    assert!(matches!(
        mock(&context).buffers.get(first),
        Err(ResourceError::Destroyed { .. })
    ));
}

// --- Record-time validation ---

#[test]
fn test_image_size_must_match_its_descriptor() {
    let (mut context, log) = context();

    let result = context.new_image(&[0u8; 15], &TextureDesc::new(2, 2));

    match result {
        Err(RenderError::Resource(ResourceError::Descriptor(err))) => assert_eq!(
            err,
            DescriptorError::ImageSizeMismatch {
                expected: 16,
                actual: 15
            }
        ),
        other => panic!("expected a size mismatch, got {other:?}"),
    }
    assert_eq!(context.recorded_commands(), 0);
    context.commit_frame().unwrap();
    assert_eq!(calls(&log), vec![Call::Commit]);
}

#[test]
fn test_empty_buffers_are_rejected() {
    let (mut context, _log) = context();
    assert!(context.new_buffer(&[], BufferType::Index).is_err());
    assert!(context.new_uniform_buffer(0).is_err());
    assert_eq!(context.recorded_commands(), 0);
}

#[test]
fn test_destroying_a_null_handle_is_rejected() {
    let (mut context, _log) = context();
    let err = context.destroy(ImageHandle::NULL).unwrap_err();
    assert!(matches!(
        err,
        RenderError::Resource(ResourceError::InvalidHandle {
            kind: HandleKind::Image
        })
    ));
}

#[test]
fn test_allocation_fails_once_the_limit_is_reached() {
    // ARRANGE
    let settings = RendererSettings {
        limits: ResourceLimits {
            passes: 2,
            ..ResourceLimits::default()
        },
        ..RendererSettings::default()
    };
    let (mut context, _log) = context_with(settings);

    // ACT
    context.new_pass(&PassDesc::DEFAULT_PASS).unwrap();
    context.new_pass(&PassDesc::DEFAULT_PASS).unwrap();
    let err = context.new_pass(&PassDesc::DEFAULT_PASS).unwrap_err();

    // ASSERT
    assert_eq!(
        err.to_string(),
        "Graphics resource operation failed: Capacity exceeded: at most 2 pass resources"
    );
    context.commit_frame().unwrap();
    assert_eq!(mock(&context).passes.len(), 2);
}

#[test]
fn test_invalid_settings_fail_before_the_backend_is_touched() {
    let log = CallLog::default();
    let settings = RendererSettings {
        frames_in_flight: 7,
        ..RendererSettings::default()
    };
    let info = InitInfo::new(GraphicsApi::Vulkan, Resolution::new(1, 1)).with_settings(settings);

    let result = Context::new(Box::new(MockBackend::new(log.clone())), &info);

    assert!(matches!(
        result,
        Err(RenderError::Initialization(InitError::InvalidSettings(_)))
    ));
    assert!(calls(&log).is_empty());
}

// --- Replay failures ---

#[test]
fn test_replay_failure_reports_the_failing_command_and_drops_the_frame() {
    // ARRANGE
    let (mut context, log) = context();
    let buffer = context.new_buffer(&[0; 12], BufferType::Vertex).unwrap();
    context.begin_default_pass();
    context.end_pass();
    context.draw(0, 3);
    context.draw(3, 3);

    // ACT
    let err = context.commit_frame().unwrap_err();

    // ASSERT
    match &err {
        RenderError::Replay { index, command, .. } => {
            assert_eq!(*index, 3);
            assert_eq!(*command, CommandKind::Draw);
        }
        other => panic!("expected a replay error, got {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Replay of command #3 (Draw) failed: Invalid render state: draw outside a pass"
    );
    assert_eq!(
        calls(&log),
        vec![
            Call::NewBuffer(0, BufferType::Vertex, vec![0; 12]),
            Call::BeginDefaultPass(Resolution::new(800, 600)),
            Call::EndPass,
            Call::Discard,
        ]
    );
    assert!(mock(&context).buffers.contains(buffer));
    assert_eq!(context.recorded_commands(), 0);
    assert_eq!(context.frame_index(), 1);
}

#[test]
fn test_next_frame_replays_cleanly_after_a_failure() {
    let (mut context, log) = context();
    context.apply_pipeline(PipelineHandle::from_raw(3));
    assert!(context.commit_frame().is_err());
    log.borrow_mut().clear();

    context.begin_default_pass();
    context.draw(0, 6);
    context.end_pass();
    let status = context.commit_frame().unwrap();

    assert_eq!(status, FrameStatus::Presented);
    assert_eq!(calls(&log).len(), 4);
}

#[test]
fn test_unknown_handle_surfaces_the_backend_error() {
    let (mut context, _log) = context();
    context.begin_pass(PassHandle::from_raw(9));

    let err = context.commit_frame().unwrap_err();

    let RenderError::Replay { index, source, .. } = err else {
        panic!("expected a replay error");
    };
    assert_eq!(index, 0);
    assert!(matches!(
        *source,
        RenderError::Resource(ResourceError::NotFound {
            kind: HandleKind::Pass,
            index: 9
        })
    ));
}

// --- Resize deferral ---

#[test]
fn test_resize_requested_mid_frame_applies_from_the_next_frame() {
    // ARRANGE
    let (mut context, log) = context();
    context.begin_default_pass();
    context.reset(1024, 768);
    context.end_pass();

    // ACT
    context.commit_frame().unwrap();
    context.begin_default_pass();
    context.end_pass();
    context.commit_frame().unwrap();

    // ASSERT
    assert_eq!(
        calls(&log),
        vec![
            Call::BeginDefaultPass(Resolution::new(800, 600)),
            Call::EndPass,
            Call::Commit,
            Call::Resize(Resolution::new(1024, 768)),
            Call::BeginDefaultPass(Resolution::new(1024, 768)),
            Call::EndPass,
            Call::Commit,
        ]
    );
    assert_eq!(context.resolution(), Resolution::new(1024, 768));
    assert_eq!(context.pending_resolution(), None);
}

#[test]
fn test_resize_before_any_recording_applies_at_this_commit() {
    let (mut context, log) = context();
    context.reset(640, 480);
    assert_eq!(context.pending_resolution(), Some(Resolution::new(640, 480)));
    context.begin_default_pass();
    context.end_pass();

    context.commit_frame().unwrap();

    assert_eq!(
        calls(&log)[..2],
        [
            Call::Resize(Resolution::new(640, 480)),
            Call::BeginDefaultPass(Resolution::new(640, 480)),
        ]
    );
}

#[test]
fn test_failed_resize_drops_the_frame_and_stays_pending() {
    // --- ARRANGE ---
    let log = CallLog::default();
    let mut backend = MockBackend::new(log.clone());
    backend.failing_resizes = 1;
    let info = InitInfo::new(GraphicsApi::Vulkan, Resolution::new(800, 600));
    let mut context = Context::new(Box::new(backend), &info).unwrap();
    log.borrow_mut().clear();
    context.reset(1024, 768);
    context.begin_default_pass();
    context.draw(0, 3);
    context.end_pass();

    // --- ACT ---
    let failed = context.commit_frame();

    // --- ASSERT ---
    assert!(matches!(failed, Err(RenderError::InvalidState(_))));
    assert_eq!(context.recorded_commands(), 0);
    assert_eq!(context.frame_index(), 1);
    assert_eq!(context.pending_resolution(), Some(Resolution::new(1024, 768)));
    assert!(calls(&log).is_empty());

    // --- ACT ---
    context.begin_default_pass();
    context.draw(10, 6);
    context.end_pass();
    context.commit_frame().unwrap();

    // --- ASSERT ---
    assert_eq!(
        calls(&log),
        vec![
            Call::Resize(Resolution::new(1024, 768)),
            Call::BeginDefaultPass(Resolution::new(1024, 768)),
            Call::Draw(10, 6),
            Call::EndPass,
            Call::Commit,
        ]
    );
    assert_eq!(context.resolution(), Resolution::new(1024, 768));
}

#[test]
fn test_latest_resize_request_wins() {
    let (mut context, log) = context();
    context.reset(100, 100);
    context.reset(200, 150);

    context.commit_frame().unwrap();

    assert_eq!(
        calls(&log),
        vec![Call::Resize(Resolution::new(200, 150)), Call::Commit]
    );
}

#[test]
fn test_outdated_surface_schedules_a_recreate_at_the_current_size() {
    // ARRANGE
    let log = CallLog::default();
    let mut backend = MockBackend::new(log.clone());
    backend.report_outdated = true;
    let info = InitInfo::new(GraphicsApi::Vulkan, Resolution::new(320, 240));
    let mut context = Context::new(Box::new(backend), &info).unwrap();
    log.borrow_mut().clear();

    // ACT + ASSERT
    assert_eq!(context.commit_frame().unwrap(), FrameStatus::SurfaceOutdated);
    assert_eq!(context.pending_resolution(), Some(Resolution::new(320, 240)));
    assert_eq!(context.commit_frame().unwrap(), FrameStatus::Presented);
    assert_eq!(
        calls(&log),
        vec![
            Call::Commit,
            Call::Resize(Resolution::new(320, 240)),
            Call::Commit
        ]
    );
}

// --- Lifecycle ---

#[test]
fn test_shutdown_is_idempotent_and_runs_on_drop() {
    let (mut context, log) = context();
    context.shutdown();
    context.shutdown();
    assert!(!context.is_initialized());
    drop(context);

    assert_eq!(calls(&log), vec![Call::Shutdown]);
}

#[test]
fn test_dropping_a_live_context_shuts_the_backend_down() {
    let (context, log) = context();
    drop(context);
    assert_eq!(calls(&log), vec![Call::Shutdown]);
}

#[test]
fn test_calls_after_shutdown_are_rejected() {
    let (mut context, _log) = context();
    context.shutdown();

    assert!(matches!(
        context.new_uniform_buffer(64),
        Err(RenderError::NotInitialized)
    ));
    assert!(matches!(
        context.commit_frame(),
        Err(RenderError::NotInitialized)
    ));
}

#[test]
fn test_draw_state_after_shutdown_is_not_recorded() {
    let (mut context, _log) = context();
    context.shutdown();

    context.begin_default_pass();
    context.apply_pipeline(PipelineHandle::from_raw(0));
    context.draw(0, 3);
    context.end_pass();

    assert_eq!(context.recorded_commands(), 0);
    assert!(matches!(
        context.apply_uniforms(ShaderStage::Vertex, &[1, 2, 3, 4]),
        Err(RenderError::NotInitialized)
    ));
}

#[test]
fn test_init_reports_resolution_and_api() {
    let log = CallLog::default();
    let info = InitInfo::new(GraphicsApi::Vulkan, Resolution::new(1280, 720));
    let context = Context::new(Box::new(MockBackend::new(log.clone())), &info).unwrap();

    assert_eq!(calls(&log), vec![Call::Init(Resolution::new(1280, 720))]);
    assert_eq!(context.api(), GraphicsApi::Vulkan);
    assert_eq!(context.resolution(), Resolution::new(1280, 720));
    assert_eq!(context.frame_index(), 0);
}
