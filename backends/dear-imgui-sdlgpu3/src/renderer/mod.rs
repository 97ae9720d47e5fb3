//! Main SDL_GPU renderer implementation
//!
//! This module contains the `Sdlgpu3Renderer` struct and its lifecycle,
//! following the pattern from imgui_impl_sdlgpu3.cpp.
//!
//! Frame flow
//! - `new_frame()` before `Context::frame()`.
//! - After `Context::render()`: acquire a command buffer, call
//!   `prepare_draw_data(draw_data, cmd)` *outside* any render pass. It records one copy pass
//!   that services `DrawData::textures()` requests (`WantCreate` / `WantUpdates` /
//!   `WantDestroy`) and uploads vertices and indices.
//! - Begin your render pass and call `render_draw_data(draw_data, cmd, pass, None)`.

use crate::{
    RendererError, RendererResult, ShaderManager, Sdlgpu3BackendData, Sdlgpu3InitInfo,
    Sdlgpu3TextureManager, TextureUpdateResult,
};
use dear_imgui_rs::{BackendFlags, Context, TextureData};
use sdl3_sys::gpu::*;
use std::ptr;

/// Main SDL_GPU renderer for Dear ImGui
///
/// This corresponds to the renderer functionality in imgui_impl_sdlgpu3.cpp
pub struct Sdlgpu3Renderer {
    /// Backend data
    backend_data: Option<Sdlgpu3BackendData>,
    /// Shader manager
    shader_manager: ShaderManager,
    /// Texture manager
    texture_manager: Sdlgpu3TextureManager,
    /// 1x1 white texture bound for null or unknown texture ids
    default_texture: *mut SDL_GPUTexture,
    /// Registered font atlas texture id (legacy upload path)
    font_texture_id: Option<u64>,
}

impl Sdlgpu3Renderer {
    /// Create a new SDL_GPU renderer with full initialization
    ///
    /// This corresponds to ImGui_ImplSDLGPU3_Init and also configures the ImGui context
    /// (renderer name and backend flags).
    ///
    /// # Example
    /// ```rust,no_run
    /// use dear_imgui_sdlgpu3::{Sdlgpu3InitInfo, Sdlgpu3Renderer};
    ///
    /// let init_info = Sdlgpu3InitInfo::new(device, swapchain_format);
    /// let mut renderer = Sdlgpu3Renderer::new(init_info, &mut imgui_context)?;
    /// ```
    pub fn new(init_info: Sdlgpu3InitInfo, imgui_ctx: &mut Context) -> RendererResult<Self> {
        let mut renderer = Self::empty();
        renderer.init_with_context(init_info, imgui_ctx)?;
        Ok(renderer)
    }

    /// Create an uninitialized renderer; call `init` or `init_with_context` later.
    pub fn empty() -> Self {
        Self {
            backend_data: None,
            shader_manager: ShaderManager::new(),
            texture_manager: Sdlgpu3TextureManager::new(),
            default_texture: ptr::null_mut(),
            font_texture_id: None,
        }
    }

    /// Initialize the renderer
    ///
    /// Validates the init info and creates device objects. Fails on a null device, an
    /// invalid color target format, or a renderer that is already initialized (call
    /// `shutdown` first).
    pub fn init(&mut self, init_info: Sdlgpu3InitInfo) -> RendererResult<()> {
        if self.backend_data.is_some() {
            return Err(RendererError::AlreadyInitialized);
        }
        validate_init_info(&init_info)?;
        self.backend_data = Some(Sdlgpu3BackendData::new(init_info));
        if let Err(e) = self.create_device_objects() {
            self.backend_data = None;
            return Err(e);
        }
        tracing::debug!(target: "dear-imgui-sdlgpu3", "SDL_GPU renderer initialized");
        Ok(())
    }

    /// `init` followed by `configure_imgui_context`
    pub fn init_with_context(
        &mut self,
        init_info: Sdlgpu3InitInfo,
        imgui_ctx: &mut Context,
    ) -> RendererResult<()> {
        self.init(init_info)?;
        self.configure_imgui_context(imgui_ctx);
        Ok(())
    }

    /// Configure Dear ImGui context with SDL_GPU backend capabilities
    pub fn configure_imgui_context(&self, imgui_context: &mut Context) {
        if imgui_context.io().backend_renderer_name().is_none() {
            let _ = imgui_context.set_renderer_name(Some(renderer_name()));
        }

        let io = imgui_context.io_mut();
        let mut flags = io.backend_flags();
        // We can honor the ImDrawCmd::VtxOffset field, allowing for large meshes.
        flags.insert(BackendFlags::RENDERER_HAS_VTX_OFFSET);
        // We can honor ImGuiPlatformIO::Textures[] requests during render.
        flags.insert(BackendFlags::RENDERER_HAS_TEXTURES);
        io.set_backend_flags(flags);
    }

    /// Check if the renderer is initialized
    pub fn is_initialized(&self) -> bool {
        self.backend_data.is_some()
    }

    /// Init info the renderer was created with
    pub fn init_info(&self) -> Option<&Sdlgpu3InitInfo> {
        self.backend_data.as_ref().map(|b| &b.init_info)
    }

    /// Graphics pipeline used when `render_draw_data` gets no override
    pub fn pipeline(&self) -> *mut SDL_GPUGraphicsPipeline {
        self.backend_data
            .as_ref()
            .map_or(ptr::null_mut(), |b| b.pipeline)
    }

    /// Get the texture manager
    pub fn texture_manager(&self) -> &Sdlgpu3TextureManager {
        &self.texture_manager
    }

    /// Get the texture manager mutably
    pub fn texture_manager_mut(&mut self) -> &mut Sdlgpu3TextureManager {
        &mut self.texture_manager
    }

    fn backend(&self) -> RendererResult<&Sdlgpu3BackendData> {
        self.backend_data
            .as_ref()
            .ok_or(RendererError::NotInitialized)
    }

    fn device(&self) -> RendererResult<*mut SDL_GPUDevice> {
        Ok(self.backend()?.device())
    }

    /// Called every frame to prepare for rendering
    ///
    /// This corresponds to ImGui_ImplSDLGPU3_NewFrame in the C++ implementation:
    /// device objects are recreated if they were destroyed.
    pub fn new_frame(&mut self) -> RendererResult<()> {
        if !self.backend()?.has_device_objects() {
            self.create_device_objects()?;
        }
        Ok(())
    }

    /// Update a single texture manually
    ///
    /// Records the upload on a private command buffer and submits it. Returns a
    /// `TextureUpdateResult` to apply to the texture data.
    ///
    /// ```rust,no_run
    /// # fn example(
    /// #     renderer: &mut dear_imgui_sdlgpu3::Sdlgpu3Renderer,
    /// # ) -> Result<(), Box<dyn std::error::Error>> {
    /// let mut texture_data = dear_imgui_rs::TextureData::new();
    /// let result = renderer.update_texture(&texture_data)?;
    /// result.apply_to(&mut texture_data);
    /// # Ok(())
    /// # }
    /// ```
    pub fn update_texture(
        &mut self,
        texture_data: &TextureData,
    ) -> RendererResult<TextureUpdateResult> {
        let device = self.device()?;
        let textures = &mut self.texture_manager;
        submit_upload(device, |copy_pass| {
            textures.update_single_texture(texture_data, device, copy_pass)
        })
    }

    /// Shutdown the renderer
    ///
    /// This corresponds to ImGui_ImplSDLGPU3_Shutdown in the C++ implementation: GPU objects are
    /// released and the backend flags are cleared. The renderer name is only cleared when it is
    /// the one `configure_imgui_context` set.
    pub fn shutdown(&mut self, imgui_ctx: &mut Context) {
        if let Some(backend) = self.backend_data.as_ref() {
            unsafe { SDL_WaitForGPUIdle(backend.device()) };
        }
        self.destroy_fonts_texture(imgui_ctx);
        self.destroy_platform_textures(imgui_ctx);
        self.destroy_internal();

        let owns_name = imgui_ctx
            .io()
            .backend_renderer_name()
            .is_some_and(|name| name.to_bytes() == renderer_name().as_bytes());
        if owns_name {
            let _ = imgui_ctx.set_renderer_name(None::<String>);
        }
        let io = imgui_ctx.io_mut();
        let mut flags = io.backend_flags();
        flags.remove(BackendFlags::RENDERER_HAS_VTX_OFFSET);
        flags.remove(BackendFlags::RENDERER_HAS_TEXTURES);
        io.set_backend_flags(flags);
    }

    fn destroy_internal(&mut self) {
        let Some(backend) = self.backend_data.as_ref() else {
            return;
        };
        let device = backend.device();
        unsafe {
            SDL_WaitForGPUIdle(device);
        }
        self.destroy_device_objects();
        self.texture_manager.clear(device);
        self.font_texture_id = None;
        self.backend_data = None;
        tracing::debug!(target: "dear-imgui-sdlgpu3", "SDL_GPU renderer shut down");
    }
}

impl Default for Sdlgpu3Renderer {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Sdlgpu3Renderer {
    fn drop(&mut self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.destroy_internal();
        }));
    }
}

/// Name reported through `io.BackendRendererName`.
fn renderer_name() -> String {
    format!("dear-imgui-sdlgpu3 {}", env!("CARGO_PKG_VERSION"))
}

/// Reject init info the GPU API would fail on later.
pub(crate) fn validate_init_info(info: &Sdlgpu3InitInfo) -> RendererResult<()> {
    if info.device.is_null() {
        return Err(RendererError::NullDevice);
    }
    if info.color_target_format == SDL_GPU_TEXTUREFORMAT_INVALID {
        return Err(RendererError::InvalidColorTargetFormat);
    }
    Ok(())
}

/// Run `record` inside a copy pass on a fresh command buffer and submit it.
pub(crate) fn submit_upload<T>(
    device: *mut SDL_GPUDevice,
    record: impl FnOnce(*mut SDL_GPUCopyPass) -> RendererResult<T>,
) -> RendererResult<T> {
    unsafe {
        let command_buffer = SDL_AcquireGPUCommandBuffer(device);
        if command_buffer.is_null() {
            return Err(RendererError::sdl("SDL_AcquireGPUCommandBuffer"));
        }
        let copy_pass = SDL_BeginGPUCopyPass(command_buffer);
        if copy_pass.is_null() {
            let err = RendererError::sdl("SDL_BeginGPUCopyPass");
            SDL_CancelGPUCommandBuffer(command_buffer);
            return Err(err);
        }
        let result = record(copy_pass);
        SDL_EndGPUCopyPass(copy_pass);
        if !SDL_SubmitGPUCommandBuffer(command_buffer) {
            return Err(RendererError::sdl("SDL_SubmitGPUCommandBuffer"));
        }
        result
    }
}

// Submodules for renderer features
mod draw;
mod external_textures;
mod font_atlas;
mod pipeline;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_renderer_is_not_initialized() {
        let mut renderer = Sdlgpu3Renderer::empty();
        assert!(!renderer.is_initialized());
        assert!(renderer.init_info().is_none());
        assert!(renderer.pipeline().is_null());
        assert!(matches!(
            renderer.new_frame(),
            Err(RendererError::NotInitialized)
        ));
    }

    #[test]
    fn init_rejects_null_device() {
        let info = Sdlgpu3InitInfo::new(ptr::null_mut(), SDL_GPU_TEXTUREFORMAT_B8G8R8A8_UNORM);
        assert!(matches!(
            Sdlgpu3Renderer::empty().init(info),
            Err(RendererError::NullDevice)
        ));
    }

    #[test]
    fn init_rejects_invalid_format() {
        let device = 0x1 as *mut SDL_GPUDevice;
        let info = Sdlgpu3InitInfo::new(device, SDL_GPU_TEXTUREFORMAT_INVALID);
        assert!(matches!(
            validate_init_info(&info),
            Err(RendererError::InvalidColorTargetFormat)
        ));
        let ok = Sdlgpu3InitInfo::new(device, SDL_GPU_TEXTUREFORMAT_R8G8B8A8_UNORM);
        assert!(validate_init_info(&ok).is_ok());
    }

    #[test]
    fn second_init_is_rejected_and_keeps_textures() {
        let device = 0x1 as *mut SDL_GPUDevice;
        let mut renderer = Sdlgpu3Renderer::empty();
        renderer.backend_data = Some(Sdlgpu3BackendData::new(Sdlgpu3InitInfo::new(
            device,
            SDL_GPU_TEXTUREFORMAT_B8G8R8A8_UNORM,
        )));
        let id = renderer.texture_manager.register_external(crate::ExternalTexture {
            texture: 0x10 as *mut SDL_GPUTexture,
            sampler: ptr::null_mut(),
        });

        let other = Sdlgpu3InitInfo::new(
            0x2 as *mut SDL_GPUDevice,
            SDL_GPU_TEXTUREFORMAT_R8G8B8A8_UNORM,
        );
        assert!(matches!(
            renderer.init(other),
            Err(RendererError::AlreadyInitialized)
        ));
        assert_eq!(renderer.init_info().map(|info| info.device), Some(device));
        assert!(renderer.texture_manager().contains_texture(id));

        // The fake device must never reach SDL on drop.
        renderer.backend_data = None;
    }

    #[test]
    fn shutdown_keeps_foreign_renderer_name() {
        let mut ctx = Context::create();
        let _ = ctx.set_renderer_name(Some("custom-renderer"));
        let mut renderer = Sdlgpu3Renderer::empty();
        renderer.configure_imgui_context(&mut ctx);
        renderer.shutdown(&mut ctx);
        assert_eq!(ctx.io().backend_renderer_name(), Some("custom-renderer"));
        let flags = ctx.io().backend_flags();
        assert!(!flags.contains(BackendFlags::RENDERER_HAS_TEXTURES));

        let _ = ctx.set_renderer_name(None::<String>);
        renderer.configure_imgui_context(&mut ctx);
        assert_eq!(
            ctx.io().backend_renderer_name(),
            Some(renderer_name().as_str())
        );
        renderer.shutdown(&mut ctx);
        assert!(ctx.io().backend_renderer_name().is_none());
    }
}
