//! SDL3 platform integration hooks
//!
//! Thin wrappers over [`dear_imgui_sdl3`], which compiles the official `imgui_impl_sdl3.cpp`.
//! They only exist so an SDL_GPU application can drive both halves of the integration
//! from this crate with one error type. Pick the `init_for_*` matching the graphics API
//! the window renders with; for this renderer that is [`init_for_sdl_gpu`].

use crate::RendererResult;
use dear_imgui_rs::Context;
use sdl3::video::{GLContext, Window};
use sdl3_sys::events::SDL_Event;

pub use dear_imgui_sdl3::GamepadMode;

/// Initialize the SDL3 platform backend for an OpenGL window.
pub fn init_for_opengl(
    imgui: &mut Context,
    window: &Window,
    gl_context: &GLContext,
) -> RendererResult<()> {
    dear_imgui_sdl3::init_platform_for_opengl(imgui, window, gl_context)?;
    Ok(())
}

/// Initialize the SDL3 platform backend for a Vulkan window.
pub fn init_for_vulkan(imgui: &mut Context, window: &Window) -> RendererResult<()> {
    dear_imgui_sdl3::init_for_vulkan(imgui, window)?;
    Ok(())
}

/// Initialize the SDL3 platform backend for a Direct3D window.
pub fn init_for_d3d(imgui: &mut Context, window: &Window) -> RendererResult<()> {
    dear_imgui_sdl3::init_for_d3d(imgui, window)?;
    Ok(())
}

/// Initialize the SDL3 platform backend for a Metal window.
pub fn init_for_metal(imgui: &mut Context, window: &Window) -> RendererResult<()> {
    dear_imgui_sdl3::init_for_metal(imgui, window)?;
    Ok(())
}

/// Initialize the SDL3 platform backend for a window drawn with `SDL_Renderer`.
///
/// # Safety
///
/// `renderer` must be a valid `SDL_Renderer` created for `window` and must outlive
/// the platform backend (until [`shutdown`]).
pub unsafe fn init_for_sdl_renderer(
    imgui: &mut Context,
    window: &Window,
    renderer: *mut sdl3_sys::render::SDL_Renderer,
) -> RendererResult<()> {
    unsafe { dear_imgui_sdl3::init_for_sdl_renderer(imgui, window, renderer)? };
    Ok(())
}

/// Initialize the SDL3 platform backend for a window claimed by an `SDL_GPUDevice`.
pub fn init_for_sdl_gpu(imgui: &mut Context, window: &Window) -> RendererResult<()> {
    dear_imgui_sdl3::init_for_sdl_gpu(imgui, window)?;
    Ok(())
}

/// Initialize the SDL3 platform backend without any graphics API specific setup.
pub fn init_for_other(imgui: &mut Context, window: &Window) -> RendererResult<()> {
    dear_imgui_sdl3::init_for_other(imgui, window)?;
    Ok(())
}

/// Shut down the SDL3 platform backend.
pub fn shutdown(imgui: &mut Context) {
    dear_imgui_sdl3::shutdown(imgui);
}

/// Start a new platform frame (display size, input, cursor). Call before `Context::frame()`.
pub fn new_frame(imgui: &mut Context) {
    dear_imgui_sdl3::sdl3_new_frame(imgui);
}

/// Forward an SDL event to ImGui. Returns `true` if ImGui consumed it.
///
/// Check `Io::want_capture_mouse` / `want_capture_keyboard` to decide whether the
/// application should also handle it.
pub fn process_event(event: &SDL_Event) -> bool {
    dear_imgui_sdl3::process_sys_event(event)
}

/// Poll one raw SDL event.
pub fn poll_event() -> Option<SDL_Event> {
    dear_imgui_sdl3::sdl3_poll_event_ll()
}

/// Choose how the platform backend opens gamepads for navigation.
pub fn set_gamepad_mode(mode: GamepadMode) {
    dear_imgui_sdl3::set_gamepad_mode(mode);
}
