// Renderer font atlas handling (legacy upload path)

use super::*;
use crate::Sdlgpu3Texture;
use crate::texture::{create_rgba_texture, upload_rgba};
use dear_imgui_rs::TextureId;

impl Sdlgpu3Renderer {
    /// Upload the font atlas immediately and assign its `TextureId`
    ///
    /// With `RENDERER_HAS_TEXTURES` set, ImGui 1.92+ requests the atlas through
    /// `DrawData::textures()` and this call is unnecessary. It remains for applications that
    /// build the atlas up front. Returns `Ok(None)` when the atlas has no CPU pixels yet.
    pub fn create_fonts_texture(
        &mut self,
        imgui_ctx: &mut Context,
    ) -> RendererResult<Option<TextureId>> {
        let device = self.device()?;

        let raw_tex = imgui_ctx.font_atlas().get_tex_data();
        if raw_tex.is_null() {
            if cfg!(debug_assertions) {
                tracing::debug!(
                    target: "dear-imgui-sdlgpu3",
                    "Font atlas TexData is null; skip legacy upload"
                );
            }
            return Ok(None);
        }

        // SAFETY: raw_tex is non-null and owned by the atlas; pixels are only copied.
        let (width, height, rgba) = unsafe {
            let w = (*raw_tex).Width.max(0) as u32;
            let h = (*raw_tex).Height.max(0) as u32;
            let bpp = (*raw_tex).BytesPerPixel;
            let px_ptr = (*raw_tex).Pixels as *const u8;
            if px_ptr.is_null() || w == 0 || h == 0 {
                (w, h, None)
            } else {
                let px_count = (w as usize) * (h as usize);
                match bpp {
                    4 => {
                        let src = std::slice::from_raw_parts(px_ptr, px_count * 4);
                        (w, h, Some(src.to_vec()))
                    }
                    1 => {
                        let src = std::slice::from_raw_parts(px_ptr, px_count);
                        let mut out = Vec::with_capacity(px_count * 4);
                        for &a in src {
                            out.extend_from_slice(&[255, 255, 255, a]);
                        }
                        (w, h, Some(out))
                    }
                    other => {
                        return Err(RendererError::TextureUpload(format!(
                            "unexpected font atlas bytes per pixel: {other}"
                        )));
                    }
                }
            }
        };

        let Some(rgba) = rgba else {
            if cfg!(debug_assertions) {
                tracing::debug!(
                    target: "dear-imgui-sdlgpu3",
                    "Font atlas has no CPU pixel buffer; renderer will use texture requests"
                );
            }
            return Ok(None);
        };

        // Re-uploading replaces the previous legacy font texture.
        if let Some(old) = self.font_texture_id.take() {
            self.texture_manager.remove_texture(device, old);
        }

        let texture = create_rgba_texture(device, width, height)?;
        if let Err(e) = submit_upload(device, |copy_pass| {
            upload_rgba(device, copy_pass, texture, 0, 0, width, height, &rgba)
        }) {
            unsafe { SDL_ReleaseGPUTexture(device, texture) };
            return Err(e);
        }

        let tex_id = self.texture_manager.register_texture(Sdlgpu3Texture {
            texture,
            width,
            height,
        });
        self.font_texture_id = Some(tex_id);

        let texture_id = TextureId::from(tex_id);
        imgui_ctx.font_atlas_mut().set_texture_id(texture_id);

        if cfg!(debug_assertions) {
            tracing::debug!(
                target: "dear-imgui-sdlgpu3",
                "Font atlas uploaded: {}x{} tex_id={}",
                width,
                height,
                tex_id
            );
        }
        Ok(Some(texture_id))
    }

    /// Release the texture created by `create_fonts_texture` and clear the atlas id
    pub fn destroy_fonts_texture(&mut self, imgui_ctx: &mut Context) {
        let Some(tex_id) = self.font_texture_id.take() else {
            return;
        };
        if let Ok(device) = self.device() {
            unsafe { SDL_WaitForGPUIdle(device) };
            self.texture_manager.remove_texture(device, tex_id);
        }
        imgui_ctx
            .font_atlas_mut()
            .set_texture_id(TextureId::from(0u64));
    }

    /// Id of the legacy font texture, if `create_fonts_texture` uploaded one
    pub fn font_texture_id(&self) -> Option<TextureId> {
        self.font_texture_id.map(TextureId::from)
    }

    /// Release every renderer-owned texture ImGui knows about and mark it destroyed
    ///
    /// Mirrors the texture loop of ImGui_ImplSDLGPU3_DestroyDeviceObjects. Textures whose
    /// reference count is above one are shared with another backend and left alone.
    pub(super) fn destroy_platform_textures(&mut self, imgui_ctx: &mut Context) {
        let Ok(device) = self.device() else {
            return;
        };
        for mut td in imgui_ctx.platform_io_mut().textures() {
            let ref_count = unsafe {
                let raw = td.as_raw();
                if raw.is_null() { 0 } else { (*raw).RefCount }
            };
            if ref_count != 1 {
                continue;
            }
            let id = td.tex_id().id();
            if id != 0 && self.texture_manager.remove_texture(device, id) {
                td.set_tex_id(TextureId::from(0u64));
                td.set_status(dear_imgui_rs::TextureStatus::Destroyed);
            }
        }
    }
}
