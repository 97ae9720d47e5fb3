//! Core data structures for the SDL_GPU renderer
//!
//! This module contains the initialization info and the backend data,
//! following the pattern from imgui_impl_sdlgpu3.cpp

use crate::FrameResources;
use sdl3_sys::gpu::{
    SDL_GPU_SAMPLECOUNT_1, SDL_GPUDevice, SDL_GPUGraphicsPipeline, SDL_GPUSampleCount,
    SDL_GPUSampler, SDL_GPUShaderFormat, SDL_GPUTextureFormat,
};
use std::ptr;

/// Precompiled shader blob handed to `SDL_CreateGPUShader`.
#[derive(Debug, Clone)]
pub struct ShaderCode {
    /// Single `SDL_GPU_SHADERFORMAT_*` flag describing `code`
    pub format: SDL_GPUShaderFormat,
    /// Bytecode (SPIR-V, DXIL, metallib) or UTF-8 source (MSL)
    pub code: Vec<u8>,
    /// Entry point name
    pub entrypoint: String,
}

impl ShaderCode {
    pub fn new(format: SDL_GPUShaderFormat, code: Vec<u8>, entrypoint: impl Into<String>) -> Self {
        Self {
            format,
            code,
            entrypoint: entrypoint.into(),
        }
    }
}

/// Vertex + fragment shaders supplied by the application.
///
/// Both stages must follow the resource layout of the built-in shaders:
/// one vertex uniform buffer (`scale`, `translate`) and one fragment sampler.
#[derive(Debug, Clone)]
pub struct CustomShaders {
    pub vertex: ShaderCode,
    pub fragment: ShaderCode,
}

/// Initialization data for the ImGui SDL_GPU renderer
///
/// This corresponds to ImGui_ImplSDLGPU3_InitInfo in the C++ implementation.
/// `color_target_format` and `msaa_samples` must match the render pass target
/// that `render_draw_data` records into.
#[derive(Debug, Clone)]
pub struct Sdlgpu3InitInfo {
    /// GPU device owned by the application; must outlive the renderer
    pub device: *mut SDL_GPUDevice,
    /// Format of the color target (usually `SDL_GetGPUSwapchainTextureFormat`)
    pub color_target_format: SDL_GPUTextureFormat,
    /// Sample count of the color target
    pub msaa_samples: SDL_GPUSampleCount,
    /// Shaders to use instead of the built-in ones
    pub custom_shaders: Option<CustomShaders>,
}

impl Sdlgpu3InitInfo {
    /// Create new initialization info with required parameters
    pub fn new(device: *mut SDL_GPUDevice, color_target_format: SDL_GPUTextureFormat) -> Self {
        Self {
            device,
            color_target_format,
            msaa_samples: SDL_GPU_SAMPLECOUNT_1,
            custom_shaders: None,
        }
    }

    /// Set the sample count of the color target
    pub fn with_msaa_samples(mut self, samples: SDL_GPUSampleCount) -> Self {
        self.msaa_samples = samples;
        self
    }

    /// Use application-provided shaders (required on drivers that only take DXIL)
    pub fn with_custom_shaders(mut self, shaders: CustomShaders) -> Self {
        self.custom_shaders = Some(shaders);
        self
    }
}

/// Main backend data structure
///
/// This corresponds to ImGui_ImplSDLGPU3_Data in the C++ implementation.
/// Raw handles are null until `create_device_objects` runs.
pub struct Sdlgpu3BackendData {
    /// Initialization info
    pub init_info: Sdlgpu3InitInfo,
    /// Graphics pipeline rendering ImGui triangles
    pub pipeline: *mut SDL_GPUGraphicsPipeline,
    /// Linear clamp-to-edge sampler shared by all managed textures
    pub sampler: *mut SDL_GPUSampler,
    /// Vertex/index buffers filled by `prepare_draw_data`
    pub frame_resources: FrameResources,
}

impl Sdlgpu3BackendData {
    pub fn new(init_info: Sdlgpu3InitInfo) -> Self {
        Self {
            init_info,
            pipeline: ptr::null_mut(),
            sampler: ptr::null_mut(),
            frame_resources: FrameResources::new(),
        }
    }

    pub fn device(&self) -> *mut SDL_GPUDevice {
        self.init_info.device
    }

    /// True when the pipeline and sampler exist
    pub fn has_device_objects(&self) -> bool {
        !self.pipeline.is_null() && !self.sampler.is_null()
    }
}
