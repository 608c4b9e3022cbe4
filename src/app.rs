//! Main application state and event handling.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::ar::ArSession;
use crate::assets::{library_entry, AssetCatalog, ModelEntry, SAMPLE_MODEL, SAMPLE_TEXTURE};
use crate::bootstrap::PreloadState;
use crate::camera::{CameraCapture, CameraStatus};
use crate::config::StudioConfig;
use crate::export;
use crate::render::{ModelRenderer, RenderContext, StreamedTexture};
use crate::tutorial::TutorialFlow;
use crate::ui::{
    show_alerts, ArAction, ArPanel, HomeAction, HomePanel, TutorialAction, TutorialPanel, UiState,
    View, ViewerAction, ViewerPanel,
};
use crate::viewer::{ModelAsset, ModelError, ViewerScene};
use crate::vision::{self, CaptureOutcome};

/// Helper function to render egui pass, working around lifetime issues in egui-wgpu.
fn render_egui_pass(
    renderer: &egui_wgpu::Renderer,
    encoder: &mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    paint_jobs: &[egui::ClippedPrimitive],
    screen_descriptor: &egui_wgpu::ScreenDescriptor,
) {
    let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("egui Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });

    // SAFETY: The render_pass is used only within this function and dropped
    // before the encoder is finished.
    let render_pass_static: &mut wgpu::RenderPass<'static> =
        unsafe { std::mem::transmute(&mut render_pass) };

    renderer.render(render_pass_static, paint_jobs, screen_descriptor);
}

const APP_TITLE: &str = "AR Coloring Studio";

/// Side of the square AR overlay render target.
const OVERLAY_TARGET_SIZE: u32 = 512;

/// Viewport backdrop for the 3D viewers.
const VIEWPORT_CLEAR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.15,
    a: 1.0,
};

/// Actions gathered from all panels over one egui frame.
#[derive(Default)]
struct FrameActions {
    home: Vec<HomeAction>,
    viewer: Vec<ViewerAction>,
    ar: Vec<ArAction>,
    tutorial: Vec<TutorialAction>,
    back_to_home: bool,
}

/// Scene a background model import installs into when it lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportTarget {
    Viewer,
    Tutorial,
}

/// One in-flight model import on a worker thread.
struct ModelImport {
    target: ImportTarget,
    rx: mpsc::Receiver<(PathBuf, Result<ModelAsset, ModelError>)>,
}

/// Parse a glTF file off the UI thread. The result is picked up by
/// `update_domain`; dropping the receiver discards it.
fn spawn_model_import(target: ImportTarget, path: PathBuf) -> ModelImport {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = ModelAsset::load(&path);
        let _ = tx.send((path, result));
    });
    ModelImport { target, rx }
}

/// Main application state.
pub struct StudioApp {
    config: StudioConfig,
    catalog: AssetCatalog,

    /// Main window
    window: Option<Arc<Window>>,
    /// GPU surface state
    render: Option<RenderContext>,
    /// egui context
    egui_ctx: egui::Context,
    /// egui-winit state
    egui_state: Option<egui_winit::State>,
    /// egui-wgpu renderer
    egui_renderer: Option<egui_wgpu::Renderer>,

    // Offscreen renderers, one per viewport
    viewer_renderer: Option<ModelRenderer>,
    tutorial_renderer: Option<ModelRenderer>,
    overlay_renderer: Option<ModelRenderer>,
    camera_feed: StreamedTexture,
    capture_preview: StreamedTexture,
    page_reference: StreamedTexture,

    // Panels
    ui_state: UiState,
    home_panel: HomePanel,
    viewer_panel: ViewerPanel,
    ar_panel: ArPanel,
    tutorial_panel: TutorialPanel,

    // Scenes and flows
    viewer_scene: ViewerScene,
    viewer_title: String,
    tutorial_scene: ViewerScene,
    tutorial_flow: TutorialFlow,
    model_import: Option<ModelImport>,

    // AR studio
    camera: Option<CameraCapture>,
    ar_session: Option<ArSession>,
    last_fed_frame: Option<u64>,
    ar_failure_alerted: bool,
    camera_failure_alerted: bool,
}

impl StudioApp {
    pub fn new(config: StudioConfig) -> Self {
        let catalog = AssetCatalog::locate(config.asset_root.as_deref());
        Self {
            config,
            catalog,
            window: None,
            render: None,
            egui_ctx: egui::Context::default(),
            egui_state: None,
            egui_renderer: None,
            viewer_renderer: None,
            tutorial_renderer: None,
            overlay_renderer: None,
            camera_feed: StreamedTexture::new("Camera Feed Texture"),
            capture_preview: StreamedTexture::new("Capture Preview Texture"),
            page_reference: StreamedTexture::new("Page Reference Texture"),
            ui_state: UiState::default(),
            home_panel: HomePanel,
            viewer_panel: ViewerPanel::new(),
            ar_panel: ArPanel::new(),
            tutorial_panel: TutorialPanel::new(),
            viewer_scene: ViewerScene::new(),
            viewer_title: String::new(),
            tutorial_scene: ViewerScene::with_placeholder(),
            tutorial_flow: TutorialFlow::new(),
            model_import: None,
            camera: None,
            ar_session: None,
            last_fed_frame: None,
            ar_failure_alerted: false,
            camera_failure_alerted: false,
        }
    }

    fn initialize_graphics(&mut self, window: Arc<Window>) {
        let size = window.inner_size();

        // Create wgpu instance
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface
        let surface = instance.create_surface(window.clone()).expect("Failed to create surface");

        // Request adapter
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .expect("Failed to get adapter");

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        // Create device and queue
        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Main Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .expect("Failed to create device");

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        // Initialize egui
        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        // Offscreen model renderers
        self.viewer_renderer = Some(ModelRenderer::new(&device, &queue));
        self.tutorial_renderer = Some(ModelRenderer::new(&device, &queue));
        self.overlay_renderer = Some(ModelRenderer::new(&device, &queue));

        self.render = Some(RenderContext::new(device, queue, surface, config));
        self.window = Some(window);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(render) = &mut self.render {
            render.resize(size.width.max(1), size.height.max(1));
        }
        // Remembered for the next launch; written on close
        self.config.window_width = size.width.max(1);
        self.config.window_height = size.height.max(1);
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.state == ElementState::Pressed {
            if let PhysicalKey::Code(KeyCode::Escape) = key.physical_key {
                if self.ui_state.view != View::Home {
                    self.leave_current_view();
                }
            }
        }
    }

    /// Per-frame domain updates before the UI is drawn.
    fn update_domain(&mut self) {
        self.ui_state.prune_alerts();

        // Drive the AR runtime preload
        if let Some(session) = &mut self.ar_session {
            session.poll();
            if let PreloadState::Failed(message) = session.state() {
                if !self.ar_failure_alerted {
                    self.ui_state.push_alert(message.clone());
                    self.ar_failure_alerted = true;
                }
            }
        }

        // Upload the page artwork thumbnail once the runtime is up
        if !self.page_reference.has_frame() {
            if let Some(session) = &self.ar_session {
                if let (Some(marker), Some(render), Some(egui_renderer)) =
                    (session.marker(), &self.render, &mut self.egui_renderer)
                {
                    self.page_reference
                        .upload(render.device(), render.queue(), egui_renderer, marker);
                }
            }
        }

        // Land any finished model import in its scene
        if let Some(import) = &self.model_import {
            match import.rx.try_recv() {
                Ok((path, result)) => {
                    let target = import.target;
                    self.model_import = None;
                    self.finish_model_import(target, &path, result);
                }
                Err(mpsc::TryRecvError::Empty) => {}
                Err(mpsc::TryRecvError::Disconnected) => self.model_import = None,
            }
        }

        // Pull the newest camera frame into the feed texture and the tracker
        self.poll_camera();

        // Advance whichever scene is on screen
        match self.ui_state.view {
            View::Viewer => self.viewer_scene.advance(),
            View::Tutorial => self.tutorial_scene.advance(),
            View::ArStudio => {
                if let Some(session) = &mut self.ar_session {
                    session.overlay.advance();
                }
            }
            _ => {}
        }
    }

    fn poll_camera(&mut self) {
        let Some(camera) = &self.camera else {
            return;
        };

        if let CameraStatus::Failed(reason) = camera.status() {
            if !self.camera_failure_alerted {
                for device in CameraCapture::list_devices() {
                    log::info!("available camera {}: {}", device.index, device.name);
                }
                self.ui_state.push_alert(format!("Camera unavailable: {}", reason));
                self.camera_failure_alerted = true;
            }
        }

        let Some(frame) = camera.latest_frame() else {
            return;
        };
        if self.last_fed_frame == Some(frame.frame_number) {
            return;
        }
        self.last_fed_frame = Some(frame.frame_number);

        let Some(image) = frame.to_image() else {
            log::warn!("camera frame dropped: byte count mismatch");
            return;
        };

        if let (Some(render), Some(egui_renderer)) = (&self.render, &mut self.egui_renderer) {
            self.camera_feed
                .upload(render.device(), render.queue(), egui_renderer, &image);
        }

        if let Some(session) = &mut self.ar_session {
            if session.should_observe(frame.frame_number) {
                session.observe_frame(&image, frame.frame_number);
            }
        }
    }

    fn finish_model_import(
        &mut self,
        target: ImportTarget,
        path: &Path,
        result: Result<ModelAsset, ModelError>,
    ) {
        match result {
            Ok(asset) => match target {
                ImportTarget::Viewer => self.viewer_scene.install_model(asset),
                ImportTarget::Tutorial => {
                    self.tutorial_scene.install_model(asset);
                    self.tutorial_flow.record_model_upload();
                }
            },
            Err(e) => {
                self.ui_state
                    .push_alert(format!("Failed to load {}: {}", path.display(), e));
            }
        }
    }

    /// Draw the active view. Returns the actions to apply afterwards.
    fn draw_ui(&mut self) -> FrameActions {
        let mut actions = FrameActions::default();
        let ctx = self.egui_ctx.clone();

        egui::CentralPanel::default().show(&ctx, |ui| match self.ui_state.view {
            View::Home => {
                actions.home = self
                    .home_panel
                    .render(ui, library_entry(&self.config.active_model));
            }
            View::Viewer => {
                let importing = self
                    .model_import
                    .as_ref()
                    .is_some_and(|import| import.target == ImportTarget::Viewer);
                actions.viewer = self.viewer_panel.render(
                    ui,
                    &mut self.viewer_scene,
                    &self.viewer_title,
                    importing,
                );
            }
            View::ArStudio => {
                if let Some(session) = &self.ar_session {
                    let status = self
                        .camera
                        .as_ref()
                        .map(|c| c.status())
                        .unwrap_or(CameraStatus::Connecting);
                    actions.ar = self.ar_panel.render(
                        ui,
                        session,
                        &status,
                        &self.camera_feed,
                        &self.capture_preview,
                        &self.page_reference,
                    );
                } else {
                    actions.back_to_home = true;
                }
            }
            View::Tutorial => {
                actions.tutorial =
                    self.tutorial_panel
                        .render(ui, &self.tutorial_flow, &mut self.tutorial_scene);
            }
            View::About => {
                actions.back_to_home = Self::draw_about(ui);
            }
        });

        show_alerts(&ctx, &self.ui_state);
        actions
    }

    fn draw_about(ui: &mut egui::Ui) -> bool {
        let mut back = false;
        ui.horizontal(|ui| {
            ui.heading("About");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Back").clicked() {
                    back = true;
                }
            });
        });
        ui.add_space(8.0);
        ui.label(
            "AR Coloring Studio turns printed coloring pages into textures for 3D \
             models. Color a page, point the camera at it, and capture: the page is \
             found, flattened and cleaned up, then wrapped onto the model.",
        );
        ui.add_space(8.0);
        ui.label("Orbit with the mouse, zoom with the wheel or the +/\u{2212} buttons.");
        back
    }

    fn apply_actions(&mut self, actions: FrameActions) {
        if actions.back_to_home {
            self.leave_current_view();
        }
        for action in actions.home {
            self.handle_home_action(action);
        }
        for action in actions.viewer {
            self.handle_viewer_action(action);
        }
        for action in actions.ar {
            self.handle_ar_action(action);
        }
        for action in actions.tutorial {
            self.handle_tutorial_action(action);
        }
    }

    fn handle_home_action(&mut self, action: HomeAction) {
        match action {
            HomeAction::OpenViewer(entry) => self.open_viewer(entry),
            HomeAction::OpenArStudio(entry) => self.open_ar_studio(entry),
            HomeAction::OpenTutorial => self.switch_view(View::Tutorial),
            HomeAction::OpenAbout => self.switch_view(View::About),
        }
    }

    /// Switch views and keep the window title in step.
    fn switch_view(&mut self, view: View) {
        self.ui_state.view = view;
        if let Some(window) = &self.window {
            match view {
                View::Home => window.set_title(APP_TITLE),
                _ => window.set_title(&format!("{} - {}", APP_TITLE, view.title())),
            }
        }
    }

    fn open_viewer(&mut self, entry: &'static ModelEntry) {
        self.viewer_scene = ViewerScene::new();
        self.viewer_title = entry.title.to_string();
        let path = self.catalog.resolve(entry.viewer_model);
        self.model_import = Some(spawn_model_import(ImportTarget::Viewer, path));
        self.remember_active_model(entry);
        self.switch_view(View::Viewer);
    }

    fn open_ar_studio(&mut self, entry: &'static ModelEntry) {
        if self.camera.is_none() {
            match CameraCapture::start(
                self.config.camera_index,
                self.config.camera_width,
                self.config.camera_height,
            ) {
                Ok(camera) => {
                    self.camera = Some(camera);
                    self.camera_failure_alerted = false;
                    self.last_fed_frame = None;
                }
                Err(e) => {
                    self.ui_state.push_alert(format!("Camera start failed: {}", e));
                }
            }
        }

        let mut session = ArSession::begin(*entry, &self.catalog);
        session.overlay.resize(OVERLAY_TARGET_SIZE, OVERLAY_TARGET_SIZE);
        self.ar_session = Some(session);
        self.ar_failure_alerted = false;
        self.remember_active_model(entry);
        self.switch_view(View::ArStudio);
    }

    fn remember_active_model(&mut self, entry: &ModelEntry) {
        if self.config.active_model != entry.id {
            self.config.active_model = entry.id.to_string();
            if let Err(e) = self.config.save() {
                log::warn!("config save failed: {}", e);
            }
        }
    }

    /// Back to home, releasing whatever the current view held.
    fn leave_current_view(&mut self) {
        match self.ui_state.view {
            View::ArStudio => {
                self.ar_session = None;
                self.camera = None;
                self.last_fed_frame = None;
                if let Some(egui_renderer) = &mut self.egui_renderer {
                    self.camera_feed.free(egui_renderer);
                    self.capture_preview.free(egui_renderer);
                    self.page_reference.free(egui_renderer);
                }
            }
            View::Viewer | View::Tutorial => {
                // Orphan any import still in flight; the worker's send just fails
                self.model_import = None;
            }
            _ => {}
        }
        self.switch_view(View::Home);
    }

    fn handle_viewer_action(&mut self, action: ViewerAction) {
        match action {
            ViewerAction::UploadModel => {
                if let Some(path) = pick_model_file() {
                    self.model_import = Some(spawn_model_import(ImportTarget::Viewer, path));
                }
            }
            ViewerAction::UploadTexture => {
                if let Some(path) = pick_texture_file() {
                    match image::open(&path) {
                        Ok(image) => {
                            if self.viewer_scene.apply_texture_rgba(&image.to_rgba8()) == 0 {
                                let message = if self.viewer_scene.has_model() {
                                    "Model has no texture slot for this image"
                                } else {
                                    "Load a model before uploading a texture"
                                };
                                self.ui_state.push_alert(message);
                            }
                        }
                        Err(e) => {
                            self.ui_state
                                .push_alert(format!("Failed to read {}: {}", path.display(), e));
                        }
                    }
                }
            }
            ViewerAction::Screenshot => self.save_viewer_screenshot(),
            ViewerAction::Back => self.leave_current_view(),
        }
    }

    fn save_viewer_screenshot(&mut self) {
        let (Some(render), Some(renderer)) = (&self.render, &self.viewer_renderer) else {
            return;
        };
        let image = match renderer.screenshot(render.device(), render.queue()) {
            Ok(image) => image,
            Err(e) => {
                self.ui_state.push_alert(format!("Screenshot failed: {}", e));
                return;
            }
        };

        let suggested = export::default_screenshot_path();
        let dialog = rfd::FileDialog::new()
            .set_title("Save Screenshot")
            .add_filter("PNG image", &["png"]);
        let dialog = match (suggested.parent(), suggested.file_name()) {
            (Some(dir), Some(name)) => dialog
                .set_directory(dir)
                .set_file_name(name.to_string_lossy()),
            _ => dialog.set_file_name("screenshot.png"),
        };
        if let Some(path) = dialog.save_file() {
            if let Err(e) = export::save_screenshot_png(&path, &image) {
                self.ui_state
                    .push_alert(format!("Failed to save {}: {}", path.display(), e));
            }
        }
    }

    fn handle_ar_action(&mut self, action: ArAction) {
        match action {
            ArAction::Capture => self.run_capture(),
            ArAction::ToggleVariant => {
                if let Some(session) = &mut self.ar_session {
                    session.toggle_variant();
                }
            }
            ArAction::SavePage => self.save_captured_page(),
            ArAction::Back => self.leave_current_view(),
        }
    }

    /// Write the last captured page, or its edge map, as a PNG.
    fn save_captured_page(&mut self) {
        let Some(session) = &self.ar_session else {
            return;
        };
        let (image, file_name) = match session.last_outcome() {
            Some(CaptureOutcome::Retextured { texture, .. }) => (texture, "captured_page.png"),
            Some(CaptureOutcome::NoTarget { edges, .. }) => (edges, "edge_view.png"),
            None => return,
        };
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save Page")
            .add_filter("PNG image", &["png"])
            .set_file_name(file_name)
            .save_file()
        else {
            return;
        };
        if let Err(e) = export::save_gray_png(&path, image) {
            self.ui_state
                .push_alert(format!("Failed to save {}: {}", path.display(), e));
        }
    }

    fn run_capture(&mut self) {
        let Some(session) = &mut self.ar_session else {
            return;
        };
        let frame = self.camera.as_ref().and_then(|c| c.latest_frame());
        let Some(image) = frame.and_then(|f| f.to_image()) else {
            self.ui_state.push_alert("No camera frame to capture yet");
            return;
        };

        // Preview: the color warp on success, the edge map otherwise
        let preview = match session.capture(&image) {
            Some(CaptureOutcome::Retextured { preview, .. }) => Some(preview.clone()),
            Some(CaptureOutcome::NoTarget { edges, .. }) => Some(vision::gray_to_rgba(edges)),
            None => None,
        };
        if let (Some(preview), Some(render), Some(egui_renderer)) =
            (preview, &self.render, &mut self.egui_renderer)
        {
            self.capture_preview
                .upload(render.device(), render.queue(), egui_renderer, &preview);
        }
    }

    fn handle_tutorial_action(&mut self, action: TutorialAction) {
        match action {
            TutorialAction::Next => {
                self.tutorial_flow.next_step();
                log::debug!("tutorial advanced: {}", self.tutorial_flow);
            }
            TutorialAction::Previous => {
                self.tutorial_flow.previous_step();
            }
            TutorialAction::Restart => {
                self.tutorial_flow.restart();
                self.tutorial_scene = ViewerScene::with_placeholder();
                self.model_import = None;
            }
            TutorialAction::UploadModel => {
                if let Some(path) = pick_model_file() {
                    self.model_import = Some(spawn_model_import(ImportTarget::Tutorial, path));
                }
            }
            TutorialAction::UploadTexture => {
                if let Some(path) = pick_texture_file() {
                    match image::open(&path) {
                        Ok(image) => {
                            if self.tutorial_scene.apply_texture_rgba(&image.to_rgba8()) > 0 {
                                self.tutorial_flow.record_texture_upload();
                            } else {
                                self.ui_state
                                    .push_alert("Model has no texture slot for this image");
                            }
                        }
                        Err(e) => self
                            .ui_state
                            .push_alert(format!("Failed to read {}: {}", path.display(), e)),
                    }
                }
            }
            TutorialAction::SaveSampleModel => self.save_sample(SAMPLE_MODEL, "sample_model.glb"),
            TutorialAction::SaveSampleTexture => {
                self.save_sample(SAMPLE_TEXTURE, "sample_texture.png")
            }
            TutorialAction::Exit => self.leave_current_view(),
        }
    }

    fn save_sample(&mut self, relative: &str, file_name: &str) {
        let Some(dest) = rfd::FileDialog::new()
            .set_title("Save Sample")
            .set_file_name(file_name)
            .save_file()
        else {
            return;
        };
        if let Err(e) = self.catalog.export_sample(relative, &dest) {
            self.ui_state.push_alert(format!("{}", e));
        }
    }

    /// Size offscreen targets to the panel viewports and keep the egui
    /// registrations current.
    fn sync_render_targets(&mut self) {
        let (Some(render), Some(egui_renderer)) = (&self.render, &mut self.egui_renderer) else {
            return;
        };
        let scale = self.egui_ctx.pixels_per_point();
        let device = render.device();

        match self.ui_state.view {
            View::Viewer => {
                if let Some(renderer) = &mut self.viewer_renderer {
                    let (w, h) = self.viewer_panel.viewport_size();
                    let (w, h) = scaled_target(w, h, scale);
                    if renderer.ensure_render_target(device, w, h) {
                        self.viewer_scene.resize(w, h);
                        if let Some(view) = renderer.texture_view() {
                            register_panel_texture(
                                egui_renderer,
                                device,
                                view,
                                &mut self.viewer_panel.texture_id,
                            );
                        }
                    }
                }
            }
            View::Tutorial => {
                if let Some(renderer) = &mut self.tutorial_renderer {
                    let (w, h) = self.tutorial_panel.viewport_size();
                    let (w, h) = scaled_target(w, h, scale);
                    if renderer.ensure_render_target(device, w, h) {
                        self.tutorial_scene.resize(w, h);
                        if let Some(view) = renderer.texture_view() {
                            register_panel_texture(
                                egui_renderer,
                                device,
                                view,
                                &mut self.tutorial_panel.texture_id,
                            );
                        }
                    }
                }
            }
            View::ArStudio => {
                if let Some(renderer) = &mut self.overlay_renderer {
                    if renderer.ensure_render_target(
                        device,
                        OVERLAY_TARGET_SIZE,
                        OVERLAY_TARGET_SIZE,
                    ) {
                        if let Some(view) = renderer.texture_view() {
                            register_panel_texture(
                                egui_renderer,
                                device,
                                view,
                                &mut self.ar_panel.overlay_texture_id,
                            );
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Encode the offscreen model pass for the active view.
    fn encode_scene_pass(&mut self, encoder: &mut wgpu::CommandEncoder) {
        let Some(render) = &self.render else {
            return;
        };
        match self.ui_state.view {
            View::Viewer => {
                if let Some(renderer) = &mut self.viewer_renderer {
                    renderer.render(
                        encoder,
                        render.device(),
                        render.queue(),
                        &self.viewer_scene,
                        VIEWPORT_CLEAR,
                    );
                }
            }
            View::Tutorial => {
                if let Some(renderer) = &mut self.tutorial_renderer {
                    renderer.render(
                        encoder,
                        render.device(),
                        render.queue(),
                        &self.tutorial_scene,
                        VIEWPORT_CLEAR,
                    );
                }
            }
            View::ArStudio => {
                if let (Some(renderer), Some(session)) =
                    (&mut self.overlay_renderer, &self.ar_session)
                {
                    renderer.render(
                        encoder,
                        render.device(),
                        render.queue(),
                        &session.overlay,
                        wgpu::Color::TRANSPARENT,
                    );
                }
            }
            _ => {}
        }
    }

    fn render_frame(&mut self) {
        self.update_domain();

        // Get window reference for egui input
        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else { return };

        // Begin egui frame
        let raw_input = egui_state.take_egui_input(window);
        self.egui_ctx.begin_pass(raw_input);

        let actions = self.draw_ui();

        // End egui frame
        let full_output = self.egui_ctx.end_pass();

        let Some(window) = &self.window else { return };
        let Some(egui_state) = &mut self.egui_state else { return };
        egui_state.handle_platform_output(window, full_output.platform_output);

        // Tessellate shapes
        let pixels_per_point = self.egui_ctx.pixels_per_point();
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes, pixels_per_point);

        // Apply actions (may open dialogs and mutate scenes) before encoding
        self.apply_actions(actions);
        self.sync_render_targets();

        let Some(render) = &self.render else { return };

        // Render
        let output = match render.surface().get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let Some(window) = &self.window else { return };
                let size = window.inner_size();
                if let Some(render) = &mut self.render {
                    render.resize(size.width, size.height);
                }
                return;
            }
            Err(e) => {
                log::error!("Surface error: {:?}", e);
                return;
            }
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = render.device().create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        // Offscreen viewport pass for the active view
        self.encode_scene_pass(&mut encoder);

        let Some(render) = &self.render else { return };
        let Some(egui_renderer) = &mut self.egui_renderer else { return };

        // Clear pass
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.08,
                            g: 0.08,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        // egui pass
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [render.config().width, render.config().height],
            pixels_per_point,
        };

        for (id, delta) in &full_output.textures_delta.set {
            egui_renderer.update_texture(render.device(), render.queue(), *id, delta);
        }

        egui_renderer.update_buffers(
            render.device(),
            render.queue(),
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        render_egui_pass(
            egui_renderer,
            &mut encoder,
            &view,
            &clipped_primitives,
            &screen_descriptor,
        );

        for id in &full_output.textures_delta.free {
            egui_renderer.free_texture(id);
        }

        render.queue().submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

impl ApplicationHandler for StudioApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window_attrs = Window::default_attributes()
                .with_title(APP_TITLE)
                .with_inner_size(PhysicalSize::new(
                    self.config.window_width,
                    self.config.window_height,
                ));

            let window = Arc::new(
                event_loop
                    .create_window(window_attrs)
                    .expect("Failed to create window"),
            );

            self.initialize_graphics(window);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Let egui handle the event first
        if let Some(egui_state) = &mut self.egui_state {
            if let Some(window) = &self.window {
                let response = egui_state.on_window_event(window, &event);
                if response.consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                if let Err(e) = self.config.save() {
                    log::warn!("config save failed: {}", e);
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.handle_resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event);
            }
            WindowEvent::RedrawRequested => {
                self.render_frame();

                // Request next frame
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Register a panel's render-target view with egui, replacing any old one.
fn register_panel_texture(
    egui_renderer: &mut egui_wgpu::Renderer,
    device: &wgpu::Device,
    texture_view: &wgpu::TextureView,
    current_id: &mut Option<egui::TextureId>,
) {
    if let Some(old_id) = current_id.take() {
        egui_renderer.free_texture(&old_id);
    }
    let id = egui_renderer.register_native_texture(device, texture_view, wgpu::FilterMode::Linear);
    *current_id = Some(id);
}

/// Logical panel size to physical texels, clamped to something sane.
fn scaled_target(width: u32, height: u32, pixels_per_point: f32) -> (u32, u32) {
    let scale = if pixels_per_point.is_finite() && pixels_per_point > 0.0 {
        pixels_per_point
    } else {
        1.0
    };
    (
        ((width as f32 * scale) as u32).clamp(1, 4096),
        ((height as f32 * scale) as u32).clamp(1, 4096),
    )
}

fn pick_model_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Upload Model")
        .add_filter("glTF model", &["glb", "gltf"])
        .pick_file()
}

fn pick_texture_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Upload Texture")
        .add_filter("Image", &["png", "jpg", "jpeg", "bmp", "webp"])
        .pick_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_scaled_target_clamps_and_scales() {
        assert_eq!(scaled_target(640, 480, 2.0), (1280, 960));
        assert_eq!(scaled_target(640, 480, 0.0), (640, 480));
        assert_eq!(scaled_target(0, 10, 1.0), (1, 10));
        assert_eq!(scaled_target(10_000, 10, 1.0), (4096, 10));
    }

    #[test]
    fn test_model_import_reports_failure_with_path() {
        let path = PathBuf::from("no_such_model.glb");
        let import = spawn_model_import(ImportTarget::Viewer, path.clone());
        let (echoed, result) = import
            .rx
            .recv_timeout(Duration::from_secs(5))
            .expect("import worker should answer");
        assert_eq!(echoed, path);
        assert!(matches!(result, Err(ModelError::Import(_))));
        assert_eq!(import.target, ImportTarget::Viewer);
    }

    #[test]
    fn test_failed_import_leaves_scene_unchanged() {
        let mut app = StudioApp::new(StudioConfig::default());
        let before = app.viewer_scene.revision();
        app.finish_model_import(
            ImportTarget::Viewer,
            Path::new("drawing.png"),
            Err(ModelError::UnsupportedFormat),
        );
        assert!(!app.viewer_scene.has_model());
        assert_eq!(app.viewer_scene.revision(), before);
        assert_eq!(app.ui_state.alerts().len(), 1);
    }

    #[test]
    fn test_tutorial_import_records_progress() {
        let mut app = StudioApp::new(StudioConfig::default());
        let before = app.tutorial_scene.revision();
        let cube = ModelAsset::placeholder_cube();
        app.finish_model_import(ImportTarget::Tutorial, Path::new("cube.glb"), Ok(cube));
        assert!(app.tutorial_flow.model_uploaded());
        assert_eq!(app.tutorial_scene.revision(), before + 1);
        assert!(app.ui_state.alerts().is_empty());
    }
}
