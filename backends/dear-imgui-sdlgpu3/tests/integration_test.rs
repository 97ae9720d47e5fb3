//! Integration tests for the SDL_GPU backend
//!
//! These run without a GPU device: they cover the public math, configuration and
//! bookkeeping that must match imgui_impl_sdlgpu3.cpp.

use dear_imgui_sdlgpu3::{
    BuiltinShaderFormat, CustomShaders, ExternalTexture, INDEX_BUFFER_SLACK, RendererError,
    ScissorRect, Sdlgpu3InitInfo, Sdlgpu3Renderer, Sdlgpu3TextureManager, ShaderCode,
    VERTEX_BUFFER_SLACK, VertexUniforms, framebuffer_size, grown_capacity, project_clip_rect,
};
use sdl3_sys::gpu::*;
use std::ptr;

/// Projection must put the display rectangle exactly onto [-1, 1] before the shader flips Y.
#[test]
fn test_projection_matches_cpp_scale_translate() {
    let u = VertexUniforms::from_display([0.0, 0.0], [1280.0, 720.0]);
    assert_eq!(u.scale, [2.0 / 1280.0, 2.0 / 720.0]);
    assert_eq!(u.translate, [-1.0, -1.0]);

    // Secondary viewport style offset
    let u = VertexUniforms::from_display([1920.0, 0.0], [800.0, 600.0]);
    assert_eq!(u.apply([1920.0, 0.0]), [-1.0, -1.0]);
    assert_eq!(u.apply([2720.0, 600.0]), [1.0, 1.0]);
}

#[test]
fn test_scissor_projection_with_hidpi_scale() {
    let fb = framebuffer_size([640.0, 480.0], [2.0, 2.0]).expect("visible");
    assert_eq!(fb, (1280, 960));

    let scissor = project_clip_rect(
        [10.0, 20.0, 110.0, 70.0],
        [0.0, 0.0],
        [2.0, 2.0],
        [fb.0 as f32, fb.1 as f32],
    )
    .expect("non-empty");
    assert_eq!(
        scissor,
        ScissorRect {
            x: 20,
            y: 40,
            w: 200,
            h: 100
        }
    );
    assert_eq!(ScissorRect::full(fb.0, fb.1).to_sdl().w, 1280);
}

#[test]
fn test_buffer_growth_uses_cpp_slack() {
    assert_eq!(VERTEX_BUFFER_SLACK, 5000);
    assert_eq!(INDEX_BUFFER_SLACK, 10000);
    assert_eq!(grown_capacity(0, 1, VERTEX_BUFFER_SLACK), Some(5001));
    assert_eq!(grown_capacity(5001, 5001, VERTEX_BUFFER_SLACK), None);
    assert_eq!(grown_capacity(100, 300, INDEX_BUFFER_SLACK), Some(10300));
}

#[test]
fn test_init_info_builder() {
    let device = 0x1 as *mut SDL_GPUDevice;
    let info = Sdlgpu3InitInfo::new(device, SDL_GPU_TEXTUREFORMAT_B8G8R8A8_UNORM);
    assert_eq!(info.msaa_samples, SDL_GPU_SAMPLECOUNT_1);
    assert!(info.custom_shaders.is_none());

    let shaders = CustomShaders {
        vertex: ShaderCode::new(SDL_GPU_SHADERFORMAT_DXIL, vec![1, 2, 3], "main"),
        fragment: ShaderCode::new(SDL_GPU_SHADERFORMAT_DXIL, vec![4, 5, 6], "main"),
    };
    let info = info
        .with_msaa_samples(SDL_GPU_SAMPLECOUNT_4)
        .with_custom_shaders(shaders);
    assert_eq!(info.msaa_samples, SDL_GPU_SAMPLECOUNT_4);
    let custom = info.custom_shaders.expect("custom shaders");
    assert_eq!(custom.vertex.code, vec![1, 2, 3]);
    assert_eq!(custom.fragment.entrypoint, "main");
}

#[test]
fn test_renderer_requires_device() {
    let mut renderer = Sdlgpu3Renderer::empty();
    let err = renderer
        .init(Sdlgpu3InitInfo::new(
            ptr::null_mut(),
            SDL_GPU_TEXTUREFORMAT_R8G8B8A8_UNORM,
        ))
        .unwrap_err();
    assert!(matches!(err, RendererError::NullDevice));
    assert!(!renderer.is_initialized());
}

#[test]
fn test_uninitialized_renderer_reports_errors() {
    let mut renderer = Sdlgpu3Renderer::default();
    assert!(matches!(
        renderer.new_frame(),
        Err(RendererError::NotInitialized)
    ));
    // Nothing to release, must not touch SDL.
    renderer.destroy_device_objects();
    drop(renderer);
}

#[test]
fn test_error_messages() {
    let err = RendererError::BuffersNotPrepared {
        needed_vertices: 10,
        needed_indices: 30,
        vertex_capacity: 0,
        index_capacity: 0,
    };
    assert!(err.to_string().contains("prepare_draw_data"));
    assert_eq!(RendererError::BadTextureId(9).to_string(), "bad texture id: 9");
    let err = RendererError::Sdl {
        call: "SDL_CreateGPUBuffer",
        message: "out of memory".to_string(),
    };
    assert_eq!(err.to_string(), "SDL_CreateGPUBuffer failed: out of memory");
}

#[test]
fn test_builtin_shader_availability() {
    assert_eq!(
        BuiltinShaderFormat::select(SDL_GPU_SHADERFORMAT_SPIRV),
        Some(BuiltinShaderFormat::Spirv)
    );
    assert_eq!(BuiltinShaderFormat::select(SDL_GPU_SHADERFORMAT_DXIL), None);

    let spirv = BuiltinShaderFormat::Spirv.shaders().expect("spirv");
    assert_eq!(spirv.vertex.code.len() % 4, 0);
    assert_eq!(&spirv.vertex.code[..4], &0x0723_0203u32.to_ne_bytes());
    assert_eq!(spirv.vertex.entrypoint, "main");
}

#[test]
fn test_texture_manager_ids_are_never_null() {
    let mut manager = Sdlgpu3TextureManager::new();
    let texture = 0x100 as *mut SDL_GPUTexture;
    let sampler = 0x200 as *mut SDL_GPUSampler;
    let a = manager.register_external(ExternalTexture { texture, sampler });
    let b = manager.register_external(ExternalTexture { texture, sampler });
    assert_ne!(a, 0);
    assert_ne!(a, b);
    assert_eq!(manager.texture_count(), 2);
    assert!(manager.binding(0, ptr::null_mut()).is_none());

    manager.clear(ptr::null_mut());
    assert_eq!(manager.texture_count(), 0);
}
