//! SDL_GPU backend for Dear ImGui
//!
//! This crate provides a renderer for Dear ImGui on top of the SDL3 GPU API
//! (`SDL_gpu.h`, through `sdl3-sys`), plus the SDL3 platform hooks needed to drive
//! ImGui from an SDL3 window.
//!
//! # Features
//!
//! - **Modern texture management**: Full integration with Dear ImGui's ImTextureData system
//! - **Built-in shaders**: SPIR-V generated at startup for Vulkan, MSL source for Metal;
//!   other drivers take application-supplied shaders
//! - **External textures**: Show any `SDL_GPUTexture` through a `TextureId`
//! - **Large meshes**: `RENDERER_HAS_VTX_OFFSET` is honored
//!
//! # Frame flow
//!
//! SDL_GPU does not allow copy passes inside a render pass, so rendering is split in two:
//! [`Sdlgpu3Renderer::prepare_draw_data`] uploads textures and geometry on the command
//! buffer, then [`Sdlgpu3Renderer::render_draw_data`] records draws into your render pass.
//!
//! # Example
//!
//! ```rust,no_run
//! use dear_imgui_rs::Context;
//! use dear_imgui_sdlgpu3::{Sdlgpu3InitInfo, Sdlgpu3Renderer, platform};
//! use sdl3_sys::gpu::*;
//!
//! # fn example(
//! #     window: &sdl3::video::Window,
//! #     device: *mut SDL_GPUDevice,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let mut imgui = Context::create();
//! platform::init_for_sdl_gpu(&mut imgui, window)?;
//!
//! let format = unsafe { SDL_GetGPUSwapchainTextureFormat(device, window.raw()) };
//! let mut renderer = Sdlgpu3Renderer::new(Sdlgpu3InitInfo::new(device, format), &mut imgui)?;
//!
//! // In your render loop:
//! // renderer.new_frame()?;
//! // platform::new_frame(&mut imgui);
//! // let ui = imgui.frame();
//! // ... build your UI ...
//! // let draw_data = imgui.render();
//! // let cmd = SDL_AcquireGPUCommandBuffer(device);
//! // renderer.prepare_draw_data(draw_data, cmd)?;
//! // ... begin render pass on the swapchain texture ...
//! // renderer.render_draw_data(draw_data, cmd, pass, None)?;
//! // ... end render pass, submit ...
//! # Ok(())
//! # }
//! ```

// Module declarations
mod data;
mod error;
mod frame_resources;
pub mod platform;
mod renderer;
mod shaders;
mod texture;
mod uniforms;

// Re-exports
pub use data::*;
pub use error::*;
pub use frame_resources::*;
pub use renderer::*;
pub use shaders::*;
pub use texture::*;
pub use uniforms::*;
