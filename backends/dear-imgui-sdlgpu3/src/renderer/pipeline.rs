// Renderer pipeline and device-objects creation

use super::*;
use crate::texture::{create_rgba_texture, upload_rgba};
use dear_imgui_rs::render::DrawVert;
use std::mem::size_of;

impl Sdlgpu3Renderer {
    /// Create device objects (sampler, shaders, pipeline, default texture)
    ///
    /// This corresponds to ImGui_ImplSDLGPU3_CreateDeviceObjects in the C++ implementation.
    /// Existing device objects are released first.
    pub fn create_device_objects(&mut self) -> RendererResult<()> {
        self.destroy_device_objects();
        let result = self.create_device_objects_inner();
        if result.is_err() {
            self.destroy_device_objects();
        }
        result
    }

    fn create_device_objects_inner(&mut self) -> RendererResult<()> {
        let backend = self
            .backend_data
            .as_mut()
            .ok_or(RendererError::NotInitialized)?;
        let device = backend.device();

        backend.sampler = create_sampler(device)?;

        self.shader_manager
            .initialize(device, backend.init_info.custom_shaders.as_ref())?;

        backend.pipeline = create_graphics_pipeline(
            device,
            &backend.init_info,
            self.shader_manager.vertex(),
            self.shader_manager.fragment(),
        )?;

        self.default_texture = create_default_texture(device)?;

        tracing::debug!(
            target: "dear-imgui-sdlgpu3",
            "Device objects created (format={:?}, samples={:?})",
            backend.init_info.color_target_format,
            backend.init_info.msaa_samples
        );
        Ok(())
    }

    /// Destroy device objects
    ///
    /// This corresponds to ImGui_ImplSDLGPU3_DestroyDeviceObjects in the C++ implementation.
    /// Textures registered with the texture manager stay alive; they are released on shutdown.
    pub fn destroy_device_objects(&mut self) {
        let Some(backend) = self.backend_data.as_mut() else {
            return;
        };
        let device = backend.device();
        unsafe {
            if !backend.pipeline.is_null() {
                SDL_ReleaseGPUGraphicsPipeline(device, backend.pipeline);
                backend.pipeline = ptr::null_mut();
            }
            if !backend.sampler.is_null() {
                SDL_ReleaseGPUSampler(device, backend.sampler);
                backend.sampler = ptr::null_mut();
            }
            if !self.default_texture.is_null() {
                SDL_ReleaseGPUTexture(device, self.default_texture);
                self.default_texture = ptr::null_mut();
            }
        }
        self.shader_manager.destroy(device);
        backend.frame_resources.destroy(device);
    }
}

fn create_sampler(device: *mut SDL_GPUDevice) -> RendererResult<*mut SDL_GPUSampler> {
    let info = SDL_GPUSamplerCreateInfo {
        min_filter: SDL_GPU_FILTER_LINEAR,
        mag_filter: SDL_GPU_FILTER_LINEAR,
        mipmap_mode: SDL_GPU_SAMPLERMIPMAPMODE_LINEAR,
        address_mode_u: SDL_GPU_SAMPLERADDRESSMODE_CLAMP_TO_EDGE,
        address_mode_v: SDL_GPU_SAMPLERADDRESSMODE_CLAMP_TO_EDGE,
        address_mode_w: SDL_GPU_SAMPLERADDRESSMODE_CLAMP_TO_EDGE,
        mip_lod_bias: 0.0,
        min_lod: -1000.0,
        max_lod: 1000.0,
        enable_anisotropy: false,
        max_anisotropy: 1.0,
        enable_compare: false,
        ..unsafe { std::mem::zeroed() }
    };
    let sampler = unsafe { SDL_CreateGPUSampler(device, &info) };
    if sampler.is_null() {
        return Err(RendererError::sdl("SDL_CreateGPUSampler"));
    }
    Ok(sampler)
}

/// Vertex attributes matching `ImDrawVert`: pos, uv, packed RGBA color.
pub(crate) fn vertex_attributes() -> [SDL_GPUVertexAttribute; 3] {
    [
        SDL_GPUVertexAttribute {
            location: 0,
            buffer_slot: 0,
            format: SDL_GPU_VERTEXELEMENTFORMAT_FLOAT2,
            offset: memoffset::offset_of!(DrawVert, pos) as u32,
        },
        SDL_GPUVertexAttribute {
            location: 1,
            buffer_slot: 0,
            format: SDL_GPU_VERTEXELEMENTFORMAT_FLOAT2,
            offset: memoffset::offset_of!(DrawVert, uv) as u32,
        },
        SDL_GPUVertexAttribute {
            location: 2,
            buffer_slot: 0,
            format: SDL_GPU_VERTEXELEMENTFORMAT_UBYTE4_NORM,
            offset: memoffset::offset_of!(DrawVert, col) as u32,
        },
    ]
}

/// Straight alpha blending into the color target.
pub(crate) fn alpha_blend_state() -> SDL_GPUColorTargetBlendState {
    SDL_GPUColorTargetBlendState {
        src_color_blendfactor: SDL_GPU_BLENDFACTOR_SRC_ALPHA,
        dst_color_blendfactor: SDL_GPU_BLENDFACTOR_ONE_MINUS_SRC_ALPHA,
        color_blend_op: SDL_GPU_BLENDOP_ADD,
        src_alpha_blendfactor: SDL_GPU_BLENDFACTOR_ONE,
        dst_alpha_blendfactor: SDL_GPU_BLENDFACTOR_ONE_MINUS_SRC_ALPHA,
        alpha_blend_op: SDL_GPU_BLENDOP_ADD,
        color_write_mask: SDL_GPU_COLORCOMPONENT_R
            | SDL_GPU_COLORCOMPONENT_G
            | SDL_GPU_COLORCOMPONENT_B
            | SDL_GPU_COLORCOMPONENT_A,
        enable_blend: true,
        enable_color_write_mask: true,
        ..unsafe { std::mem::zeroed() }
    }
}

fn create_graphics_pipeline(
    device: *mut SDL_GPUDevice,
    init_info: &Sdlgpu3InitInfo,
    vertex_shader: *mut SDL_GPUShader,
    fragment_shader: *mut SDL_GPUShader,
) -> RendererResult<*mut SDL_GPUGraphicsPipeline> {
    let vertex_buffer_descriptions = [SDL_GPUVertexBufferDescription {
        slot: 0,
        pitch: size_of::<DrawVert>() as u32,
        input_rate: SDL_GPU_VERTEXINPUTRATE_VERTEX,
        instance_step_rate: 0,
    }];
    let vertex_attributes = vertex_attributes();

    let vertex_input_state = SDL_GPUVertexInputState {
        vertex_buffer_descriptions: vertex_buffer_descriptions.as_ptr(),
        num_vertex_buffers: vertex_buffer_descriptions.len() as u32,
        vertex_attributes: vertex_attributes.as_ptr(),
        num_vertex_attributes: vertex_attributes.len() as u32,
    };

    let rasterizer_state = SDL_GPURasterizerState {
        fill_mode: SDL_GPU_FILLMODE_FILL,
        cull_mode: SDL_GPU_CULLMODE_NONE,
        front_face: SDL_GPU_FRONTFACE_COUNTER_CLOCKWISE,
        enable_depth_bias: false,
        enable_depth_clip: false,
        ..unsafe { std::mem::zeroed() }
    };

    let multisample_state = SDL_GPUMultisampleState {
        sample_count: init_info.msaa_samples,
        enable_mask: false,
        ..unsafe { std::mem::zeroed() }
    };

    let depth_stencil_state = SDL_GPUDepthStencilState {
        enable_depth_test: false,
        enable_depth_write: false,
        enable_stencil_test: false,
        ..unsafe { std::mem::zeroed() }
    };

    let color_target_descriptions = [SDL_GPUColorTargetDescription {
        format: init_info.color_target_format,
        blend_state: alpha_blend_state(),
    }];

    let target_info = SDL_GPUGraphicsPipelineTargetInfo {
        color_target_descriptions: color_target_descriptions.as_ptr(),
        num_color_targets: color_target_descriptions.len() as u32,
        has_depth_stencil_target: false,
        ..unsafe { std::mem::zeroed() }
    };

    let info = SDL_GPUGraphicsPipelineCreateInfo {
        vertex_shader,
        fragment_shader,
        vertex_input_state,
        primitive_type: SDL_GPU_PRIMITIVETYPE_TRIANGLELIST,
        rasterizer_state,
        multisample_state,
        depth_stencil_state,
        target_info,
        ..unsafe { std::mem::zeroed() }
    };

    let pipeline = unsafe { SDL_CreateGPUGraphicsPipeline(device, &info) };
    if pipeline.is_null() {
        return Err(RendererError::sdl("SDL_CreateGPUGraphicsPipeline"));
    }
    Ok(pipeline)
}

/// 1x1 opaque white texture bound when a command has no usable texture.
fn create_default_texture(device: *mut SDL_GPUDevice) -> RendererResult<*mut SDL_GPUTexture> {
    let texture = create_rgba_texture(device, 1, 1)?;
    let uploaded = submit_upload(device, |copy_pass| {
        upload_rgba(device, copy_pass, texture, 0, 0, 1, 1, &[255, 255, 255, 255])
    });
    if let Err(e) = uploaded {
        unsafe { SDL_ReleaseGPUTexture(device, texture) };
        return Err(e);
    }
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_draw_vert() {
        assert_eq!(size_of::<DrawVert>(), 20);
        let attrs = vertex_attributes();
        let offsets: Vec<u32> = attrs.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        let locations: Vec<u32> = attrs.iter().map(|a| a.location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
        assert_eq!(attrs[2].format, SDL_GPU_VERTEXELEMENTFORMAT_UBYTE4_NORM);
    }

    #[test]
    fn blend_state_is_straight_alpha() {
        let blend = alpha_blend_state();
        assert!(blend.enable_blend);
        assert_eq!(blend.src_color_blendfactor, SDL_GPU_BLENDFACTOR_SRC_ALPHA);
        assert_eq!(blend.dst_alpha_blendfactor, SDL_GPU_BLENDFACTOR_ONE_MINUS_SRC_ALPHA);
        assert_eq!(blend.src_alpha_blendfactor, SDL_GPU_BLENDFACTOR_ONE);
    }
}
