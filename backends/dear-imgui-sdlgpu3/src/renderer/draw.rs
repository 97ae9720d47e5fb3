// Renderer draw helpers: upload of frame data, render state setup, draw lists traversal

use super::*;
use crate::frame_resources::{INDEX_ELEMENT_SIZE, draw_data_totals, to_u32};
use crate::uniforms::{ScissorRect, VertexUniforms, framebuffer_size, project_clip_rect};
use dear_imgui_rs::TextureId;
use dear_imgui_rs::render::{DrawCmd, DrawData};

impl Sdlgpu3Renderer {
    /// Upload textures and geometry for `draw_data`
    ///
    /// This corresponds to ImGui_ImplSDLGPU3_PrepareDrawData in the C++ implementation.
    /// Must be called on `command_buffer` before the render pass that calls
    /// `render_draw_data` begins, since SDL_GPU forbids copy passes inside render passes.
    pub fn prepare_draw_data(
        &mut self,
        draw_data: &DrawData,
        command_buffer: *mut SDL_GPUCommandBuffer,
    ) -> RendererResult<()> {
        let backend = self
            .backend_data
            .as_mut()
            .ok_or(RendererError::NotInitialized)?;
        let device = backend.device();

        // Avoid rendering when minimized
        if framebuffer_size(draw_data.display_size, draw_data.framebuffer_scale).is_none() {
            return Ok(());
        }
        let (total_vtx, total_idx) = draw_data_totals(draw_data);
        if total_vtx == 0 {
            return Ok(());
        }

        let copy_pass = unsafe { SDL_BeginGPUCopyPass(command_buffer) };
        if copy_pass.is_null() {
            return Err(RendererError::sdl("SDL_BeginGPUCopyPass"));
        }

        // Catch up with texture updates. Most of the time the list has a single
        // element with OK status, so nothing is recorded.
        self.texture_manager
            .handle_texture_updates(draw_data, device, copy_pass);

        let result = backend
            .frame_resources
            .ensure_capacity(device, total_vtx, total_idx)
            .and_then(|()| backend.frame_resources.upload(device, copy_pass, draw_data));

        unsafe { SDL_EndGPUCopyPass(copy_pass) };
        result
    }

    /// Record the draw calls for `draw_data` into `render_pass`
    ///
    /// This corresponds to ImGui_ImplSDLGPU3_RenderDrawData in the C++ implementation.
    /// `pipeline` overrides the renderer's own pipeline (it must be layout compatible).
    /// `prepare_draw_data` must have been called for the same draw data.
    pub fn render_draw_data(
        &mut self,
        draw_data: &DrawData,
        command_buffer: *mut SDL_GPUCommandBuffer,
        render_pass: *mut SDL_GPURenderPass,
        pipeline: Option<*mut SDL_GPUGraphicsPipeline>,
    ) -> RendererResult<()> {
        let backend = self
            .backend_data
            .as_ref()
            .ok_or(RendererError::NotInitialized)?;

        let Some((fb_width, fb_height)) =
            framebuffer_size(draw_data.display_size, draw_data.framebuffer_scale)
        else {
            return Ok(());
        };
        if !draw_data.valid() {
            return Ok(());
        }

        let (total_vtx, total_idx) = draw_data_totals(draw_data);
        let resources = &backend.frame_resources;
        if total_vtx > 0 && !resources.can_hold(total_vtx, total_idx) {
            return Err(RendererError::BuffersNotPrepared {
                needed_vertices: total_vtx,
                needed_indices: total_idx,
                vertex_capacity: resources.vertex_capacity(),
                index_capacity: resources.index_capacity(),
            });
        }

        let pipeline = pipeline
            .filter(|p| !p.is_null())
            .unwrap_or(backend.pipeline);
        if pipeline.is_null() {
            return Err(RendererError::NotInitialized);
        }

        let state = RenderState {
            pipeline,
            command_buffer,
            render_pass,
            vertex_buffer: resources.vertex_buffer(),
            index_buffer: resources.index_buffer(),
            has_geometry: total_vtx > 0,
            fb_width,
            fb_height,
        };
        state.setup(draw_data);

        // Will project scissor/clipping rectangles into framebuffer space
        let clip_off = draw_data.display_pos;
        let clip_scale = draw_data.framebuffer_scale;
        let fb_size = [fb_width as f32, fb_height as f32];
        let default_binding = SDL_GPUTextureSamplerBinding {
            texture: self.default_texture,
            sampler: backend.sampler,
        };

        // Because we merged all buffers into a single one, we maintain our own offset into them
        let mut global_vtx_offset: usize = 0;
        let mut global_idx_offset: usize = 0;
        for draw_list in draw_data.draw_lists() {
            for cmd in draw_list.commands() {
                match cmd {
                    DrawCmd::Elements {
                        count,
                        cmd_params,
                        raw_cmd,
                    } => {
                        let Some(scissor) =
                            project_clip_rect(cmd_params.clip_rect, clip_off, clip_scale, fb_size)
                        else {
                            continue;
                        };
                        let tex_id = resolve_effective_texture_id(cmd_params.texture_id, raw_cmd);
                        let binding = self
                            .texture_binding(tex_id.id(), backend.sampler)
                            .unwrap_or(default_binding);

                        let first_index = to_u32(global_idx_offset + cmd_params.idx_offset)?;
                        let vertex_offset =
                            i32::try_from(global_vtx_offset + cmd_params.vtx_offset).map_err(
                                |_| RendererError::Sdl {
                                    call: "SDL_DrawGPUIndexedPrimitives",
                                    message: "vertex offset exceeds Sint32".to_string(),
                                },
                            )?;

                        unsafe {
                            SDL_SetGPUScissor(render_pass, &scissor.to_sdl());
                            SDL_BindGPUFragmentSamplers(render_pass, 0, &binding, 1);
                            SDL_DrawGPUIndexedPrimitives(
                                render_pass,
                                to_u32(count)?,
                                1,
                                first_index,
                                vertex_offset,
                                0,
                            );
                        }
                    }
                    DrawCmd::ResetRenderState => state.setup(draw_data),
                    DrawCmd::RawCallback { .. } => {
                        tracing::warn!(
                            target: "dear-imgui-sdlgpu3",
                            "Raw draw callbacks are not supported by the SDL_GPU renderer; skipping"
                        );
                    }
                }
            }
            global_idx_offset += draw_list.idx_buffer().len();
            global_vtx_offset += draw_list.vtx_buffer().len();
        }

        // Note: at this point both SDL_SetGPUViewport() and SDL_SetGPUScissor() have been
        // called. Restore a full scissor so user rendering after us is not clipped.
        unsafe {
            SDL_SetGPUScissor(
                render_pass,
                &ScissorRect::full(fb_width, fb_height).to_sdl(),
            );
        }
        Ok(())
    }

    /// Binding for a command's texture; `None` for the null id or ids we do not know.
    fn texture_binding(
        &self,
        tex_id: u64,
        default_sampler: *mut SDL_GPUSampler,
    ) -> Option<SDL_GPUTextureSamplerBinding> {
        if tex_id == 0 {
            return None;
        }
        let binding = self.texture_manager.binding(tex_id, default_sampler);
        if binding.is_none() && cfg!(debug_assertions) {
            tracing::debug!(
                target: "dear-imgui-sdlgpu3",
                "Unknown texture id {} in draw command; using default texture",
                tex_id
            );
        }
        binding
    }
}

/// Everything `ImGui_ImplSDLGPU3_SetupRenderState` touches.
struct RenderState {
    pipeline: *mut SDL_GPUGraphicsPipeline,
    command_buffer: *mut SDL_GPUCommandBuffer,
    render_pass: *mut SDL_GPURenderPass,
    vertex_buffer: *mut SDL_GPUBuffer,
    index_buffer: *mut SDL_GPUBuffer,
    has_geometry: bool,
    fb_width: i32,
    fb_height: i32,
}

impl RenderState {
    /// Bind pipeline, buffers, viewport and the projection uniforms.
    fn setup(&self, draw_data: &DrawData) {
        let uniforms = VertexUniforms::from_display(draw_data.display_pos, draw_data.display_size);
        let uniform_bytes = bytemuck::bytes_of(&uniforms);
        let viewport = SDL_GPUViewport {
            x: 0.0,
            y: 0.0,
            w: self.fb_width as f32,
            h: self.fb_height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        unsafe {
            SDL_BindGPUGraphicsPipeline(self.render_pass, self.pipeline);
            if self.has_geometry {
                let vertex_binding = SDL_GPUBufferBinding {
                    buffer: self.vertex_buffer,
                    offset: 0,
                };
                let index_binding = SDL_GPUBufferBinding {
                    buffer: self.index_buffer,
                    offset: 0,
                };
                SDL_BindGPUVertexBuffers(self.render_pass, 0, &vertex_binding, 1);
                SDL_BindGPUIndexBuffer(self.render_pass, &index_binding, INDEX_ELEMENT_SIZE);
            }
            SDL_SetGPUViewport(self.render_pass, &viewport);
            SDL_PushGPUVertexUniformData(
                self.command_buffer,
                0,
                uniform_bytes.as_ptr() as *const std::ffi::c_void,
                uniform_bytes.len() as u32,
            );
        }
    }
}

/// Texture id of a draw command after this frame's texture requests were serviced.
///
/// Commands referencing an `ImTextureData` only learn its id once `prepare_draw_data`
/// created the GPU texture, so the legacy field may still be zero.
fn resolve_effective_texture_id(
    legacy: TextureId,
    raw_cmd: *const dear_imgui_rs::sys::ImDrawCmd,
) -> TextureId {
    if raw_cmd.is_null() {
        return legacy;
    }
    // SAFETY: raw_cmd points into the draw list being iterated.
    unsafe {
        let mut copy = *raw_cmd;
        TextureId::from(dear_imgui_rs::sys::ImDrawCmd_GetTexID(&mut copy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_raw_cmd_keeps_legacy_id() {
        let id = resolve_effective_texture_id(TextureId::from(42u64), std::ptr::null());
        assert_eq!(id.id(), 42);
    }

    #[test]
    fn null_and_unknown_ids_have_no_binding() {
        let renderer = Sdlgpu3Renderer::empty();
        assert!(renderer.texture_binding(0, ptr::null_mut()).is_none());
        assert!(renderer.texture_binding(5, ptr::null_mut()).is_none());
    }
}
