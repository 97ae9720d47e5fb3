//! SDL3 + SDL_GPU renderer example (single window).
//!
//! This demonstrates driving Dear ImGui with:
//! - SDL3 for window + events
//! - SDL_GPU (`SDL_gpu.h`) for rendering
//! - Official SDL3 platform backend (through `dear_imgui_sdlgpu3::platform`)
//! - Rust SDL_GPU renderer backend (`dear-imgui-sdlgpu3`)
//!
//! Run with:
//!   cargo run -p dear-imgui-sdlgpu3-demo --bin sdl3_sdlgpu3

use std::error::Error;
use std::ffi::CStr;
use std::ptr;
use std::time::{Duration, Instant};

use dear_imgui_rs::{Condition, ConfigFlags, Context};
use dear_imgui_sdlgpu3::{Sdlgpu3InitInfo, Sdlgpu3Renderer, platform};
use sdl3::event::Event;
use sdl3::keyboard::Keycode;
use sdl3::video::{Window, WindowPos};
use sdl3_sys::gpu::*;
use sdl3_sys::pixels::SDL_FColor;
use sdl3_sys::video::{SDL_GetWindowFlags, SDL_WINDOW_MINIMIZED};

fn sdl_error() -> String {
    unsafe {
        let ptr = sdl3_sys::error::SDL_GetError();
        if ptr.is_null() {
            return String::from("unknown SDL error");
        }
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dear-imgui-sdlgpu3=info,sdl3_sdlgpu3=info,warn".into());
    fmt().with_env_filter(filter).with_target(true).init();
}

/// GPU device claimed for one window; released on drop.
struct GpuWindow {
    device: *mut SDL_GPUDevice,
    window: Window,
}

impl GpuWindow {
    fn new(window: Window) -> Result<Self, Box<dyn Error>> {
        // The renderer generates SPIR-V and MSL itself.
        let device = unsafe {
            SDL_CreateGPUDevice(
                SDL_GPU_SHADERFORMAT_SPIRV | SDL_GPU_SHADERFORMAT_MSL,
                cfg!(debug_assertions),
                ptr::null(),
            )
        };
        if device.is_null() {
            return Err(format!("SDL_CreateGPUDevice failed: {}", sdl_error()).into());
        }
        if !unsafe { SDL_ClaimWindowForGPUDevice(device, window.raw()) } {
            let err = format!("SDL_ClaimWindowForGPUDevice failed: {}", sdl_error());
            unsafe { SDL_DestroyGPUDevice(device) };
            return Err(err.into());
        }
        unsafe {
            SDL_SetGPUSwapchainParameters(
                device,
                window.raw(),
                SDL_GPU_SWAPCHAINCOMPOSITION_SDR,
                SDL_GPU_PRESENTMODE_VSYNC,
            );
        }
        let driver = unsafe {
            let name = SDL_GetGPUDeviceDriver(device);
            if name.is_null() {
                String::from("unknown")
            } else {
                CStr::from_ptr(name).to_string_lossy().into_owned()
            }
        };
        tracing::info!("SDL_GPU device created (driver: {driver})");
        Ok(Self { device, window })
    }

    fn swapchain_format(&self) -> SDL_GPUTextureFormat {
        unsafe { SDL_GetGPUSwapchainTextureFormat(self.device, self.window.raw()) }
    }

    fn is_minimized(&self) -> bool {
        let flags = unsafe { SDL_GetWindowFlags(self.window.raw()) };
        flags & SDL_WINDOW_MINIMIZED == SDL_WINDOW_MINIMIZED
    }
}

impl Drop for GpuWindow {
    fn drop(&mut self) {
        unsafe {
            SDL_WaitForGPUIdle(self.device);
            SDL_ReleaseWindowFromGPUDevice(self.device, self.window.raw());
            SDL_DestroyGPUDevice(self.device);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    // Initialize SDL3 (video + events).
    let sdl = sdl3::init()?;
    let video = sdl.video()?;

    let main_scale = video
        .get_primary_display()?
        .get_content_scale()
        .unwrap_or(1.0);

    let mut window = video
        .window(
            "Dear ImGui SDL3 + SDL_GPU",
            (1280.0 * main_scale) as u32,
            (800.0 * main_scale) as u32,
        )
        .resizable()
        .high_pixel_density()
        .build()
        .map_err(|e| format!("failed to create SDL3 window: {e}"))?;
    window.set_position(WindowPos::Centered, WindowPos::Centered);

    let gpu = GpuWindow::new(window)?;

    // Dear ImGui context.
    let mut imgui = Context::create();
    imgui.set_ini_filename(None::<String>)?;
    {
        let io = imgui.io_mut();
        let mut flags = io.config_flags();
        flags.insert(ConfigFlags::NAV_ENABLE_KEYBOARD);
        flags.insert(ConfigFlags::NAV_ENABLE_GAMEPAD);
        io.set_config_flags(flags);

        let style = imgui.style_mut();
        style.set_font_scale_dpi(main_scale);
    }

    // Setup Platform/Renderer backends
    platform::init_for_sdl_gpu(&mut imgui, &gpu.window)?;
    let init_info = Sdlgpu3InitInfo::new(gpu.device, gpu.swapchain_format());
    let mut renderer = Sdlgpu3Renderer::new(init_info, &mut imgui)?;

    let mut last_frame = Instant::now();
    let mut show_demo = true;
    let mut clear_color = [0.45f32, 0.55, 0.60, 1.00];

    'running: loop {
        while let Some(raw) = platform::poll_event() {
            platform::process_event(&raw);

            match Event::from_ll(raw) {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::Window {
                    win_event: sdl3::event::WindowEvent::CloseRequested,
                    window_id,
                    ..
                } if window_id == gpu.window.id() => break 'running,
                _ => {}
            }
        }

        if gpu.is_minimized() {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }

        let now = Instant::now();
        imgui
            .io_mut()
            .set_delta_time((now - last_frame).as_secs_f32().max(1.0e-5));
        last_frame = now;

        // Start the Dear ImGui frame
        renderer.new_frame()?;
        platform::new_frame(&mut imgui);
        let ui = imgui.frame();

        ui.window("SDL3 + SDL_GPU")
            .size([420.0, 180.0], Condition::FirstUseEver)
            .build(|| {
                ui.text("Dear ImGui running on SDL_GPU");
                ui.separator();
                ui.checkbox("Show demo window", &mut show_demo);
                ui.color_edit4("clear color", &mut clear_color);
                ui.text(format!(
                    "Application average {:.3} ms/frame ({:.1} FPS)",
                    1000.0 / ui.io().framerate(),
                    ui.io().framerate()
                ));
            });
        if show_demo {
            ui.show_demo_window(&mut show_demo);
        }

        let draw_data = imgui.render();

        let command_buffer = unsafe { SDL_AcquireGPUCommandBuffer(gpu.device) };
        if command_buffer.is_null() {
            tracing::warn!("SDL_AcquireGPUCommandBuffer failed: {}", sdl_error());
            continue;
        }

        let mut swapchain_texture: *mut SDL_GPUTexture = ptr::null_mut();
        let acquired = unsafe {
            SDL_WaitAndAcquireGPUSwapchainTexture(
                command_buffer,
                gpu.window.raw(),
                &mut swapchain_texture,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if !acquired {
            tracing::warn!("SDL_WaitAndAcquireGPUSwapchainTexture failed: {}", sdl_error());
        }

        if !swapchain_texture.is_null() {
            // Mandatory: upload vertex/index data before the render pass begins.
            renderer.prepare_draw_data(draw_data, command_buffer)?;

            let target_info = SDL_GPUColorTargetInfo {
                texture: swapchain_texture,
                clear_color: SDL_FColor {
                    r: clear_color[0],
                    g: clear_color[1],
                    b: clear_color[2],
                    a: clear_color[3],
                },
                load_op: SDL_GPU_LOADOP_CLEAR,
                store_op: SDL_GPU_STOREOP_STORE,
                mip_level: 0,
                layer_or_depth_plane: 0,
                cycle: false,
                ..unsafe { std::mem::zeroed() }
            };
            let render_pass =
                unsafe { SDL_BeginGPURenderPass(command_buffer, &target_info, 1, ptr::null()) };
            renderer.render_draw_data(draw_data, command_buffer, render_pass, None)?;
            unsafe { SDL_EndGPURenderPass(render_pass) };
        }

        if !unsafe { SDL_SubmitGPUCommandBuffer(command_buffer) } {
            tracing::warn!("SDL_SubmitGPUCommandBuffer failed: {}", sdl_error());
        }
    }

    // Cleanup
    renderer.shutdown(&mut imgui);
    platform::shutdown(&mut imgui);
    drop(gpu);
    Ok(())
}
