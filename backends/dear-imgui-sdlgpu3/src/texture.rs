//! Texture management for the SDL_GPU renderer
//!
//! This module handles texture creation, updates and destruction, integrating with
//! Dear ImGui's modern texture system (`ImTextureData`, ImGui 1.92+), and keeps the
//! registry of application textures shown through `TextureId`.
//!
//! All uploads are recorded into a caller-provided `SDL_GPUCopyPass`; the staging
//! transfer buffers are released right after recording; SDL keeps them alive until
//! the command buffer completes.

use crate::frame_resources::create_transfer_buffer;
use crate::{RendererError, RendererResult};
use dear_imgui_rs::texture::TextureRect;
use dear_imgui_rs::{
    TextureData, TextureFormat as ImGuiTextureFormat, TextureId, TextureStatus,
};
use sdl3_sys::gpu::*;
use std::collections::HashMap;
use std::ptr;

/// Result of a texture update operation
///
/// This enum represents the outcome of a texture update operation and
/// contains any state changes that need to be applied to the texture data.
#[derive(Debug, Clone)]
pub enum TextureUpdateResult {
    /// Texture was successfully created
    Created { texture_id: TextureId },
    /// Texture was successfully updated
    Updated,
    /// Texture was destroyed
    Destroyed,
    /// Texture update failed
    Failed,
    /// No action was needed
    NoAction,
}

impl TextureUpdateResult {
    /// Apply the result to a texture data object
    pub fn apply_to(self, texture_data: &mut TextureData) {
        match self {
            TextureUpdateResult::Created { texture_id } => {
                texture_data.set_tex_id(texture_id);
                texture_data.set_status(TextureStatus::OK);
            }
            TextureUpdateResult::Updated => {
                texture_data.set_status(TextureStatus::OK);
            }
            TextureUpdateResult::Destroyed => unsafe {
                // SetStatus(Destroyed) flips back to WantCreate unless a destroy was requested.
                (*texture_data.as_raw_mut()).WantDestroyNextFrame = true;
                texture_data.set_status(TextureStatus::Destroyed);
            },
            TextureUpdateResult::Failed => {
                texture_data.set_status(TextureStatus::Destroyed);
            }
            TextureUpdateResult::NoAction => {}
        }
    }
}

/// GPU texture created and owned by the renderer (RGBA8, sampled with the default sampler)
#[derive(Debug)]
pub struct Sdlgpu3Texture {
    pub texture: *mut SDL_GPUTexture,
    pub width: u32,
    pub height: u32,
}

/// Texture + sampler supplied by the application; never released by the renderer
///
/// A null `sampler` samples with whatever default sampler is current at bind time.
#[derive(Debug, Clone, Copy)]
pub struct ExternalTexture {
    pub texture: *mut SDL_GPUTexture,
    pub sampler: *mut SDL_GPUSampler,
}

/// Texture manager for the SDL_GPU renderer
///
/// Maps `TextureId` values (0 = null) to owned textures or external bindings.
#[derive(Debug)]
pub struct Sdlgpu3TextureManager {
    textures: HashMap<u64, Sdlgpu3Texture>,
    external_textures: HashMap<u64, ExternalTexture>,
    next_id: u64,
}

impl Default for Sdlgpu3TextureManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Sdlgpu3TextureManager {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
            external_textures: HashMap::new(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1).max(1);
        id
    }

    /// Register an owned texture and return its id
    pub fn register_texture(&mut self, texture: Sdlgpu3Texture) -> u64 {
        let id = self.allocate_id();
        self.textures.insert(id, texture);
        id
    }

    /// Register an application texture + sampler and return its id
    pub fn register_external(&mut self, texture: ExternalTexture) -> u64 {
        let id = self.allocate_id();
        self.external_textures.insert(id, texture);
        id
    }

    /// Replace the binding of a registered external texture. Returns false for unknown ids.
    pub fn update_external(&mut self, id: u64, texture: ExternalTexture) -> bool {
        match self.external_textures.get_mut(&id) {
            Some(slot) => {
                *slot = texture;
                true
            }
            None => false,
        }
    }

    pub fn get_texture(&self, id: u64) -> Option<&Sdlgpu3Texture> {
        self.textures.get(&id)
    }

    pub fn contains_texture(&self, id: u64) -> bool {
        self.textures.contains_key(&id) || self.external_textures.contains_key(&id)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len() + self.external_textures.len()
    }

    /// Texture/sampler pair to bind for `id`.
    ///
    /// Owned textures and external textures without their own sampler use `default_sampler`.
    pub fn binding(
        &self,
        id: u64,
        default_sampler: *mut SDL_GPUSampler,
    ) -> Option<SDL_GPUTextureSamplerBinding> {
        if let Some(tex) = self.textures.get(&id) {
            return Some(SDL_GPUTextureSamplerBinding {
                texture: tex.texture,
                sampler: default_sampler,
            });
        }
        self.external_textures
            .get(&id)
            .map(|ext| SDL_GPUTextureSamplerBinding {
                texture: ext.texture,
                sampler: if ext.sampler.is_null() {
                    default_sampler
                } else {
                    ext.sampler
                },
            })
    }

    /// Remove a texture by id; owned GPU textures are released.
    pub fn remove_texture(&mut self, device: *mut SDL_GPUDevice, id: u64) -> bool {
        if let Some(tex) = self.textures.remove(&id) {
            unsafe { SDL_ReleaseGPUTexture(device, tex.texture) };
            return true;
        }
        self.external_textures.remove(&id).is_some()
    }

    /// Release every owned texture and forget external ones.
    pub fn clear(&mut self, device: *mut SDL_GPUDevice) {
        for (_, tex) in self.textures.drain() {
            unsafe { SDL_ReleaseGPUTexture(device, tex.texture) };
        }
        self.external_textures.clear();
    }

    /// Create a GPU texture from `texture_data` and record the full upload.
    pub fn create_texture_from_data(
        &mut self,
        device: *mut SDL_GPUDevice,
        copy_pass: *mut SDL_GPUCopyPass,
        texture_data: &TextureData,
    ) -> RendererResult<u64> {
        let width = texture_data.width() as u32;
        let height = texture_data.height() as u32;
        let pixels = texture_data_to_rgba_full(texture_data).ok_or_else(|| {
            RendererError::TextureUpload(format!(
                "texture data {width}x{height} has no CPU pixels"
            ))
        })?;
        let texture = create_rgba_texture(device, width, height)?;
        if let Err(e) = upload_rgba(device, copy_pass, texture, 0, 0, width, height, &pixels) {
            unsafe { SDL_ReleaseGPUTexture(device, texture) };
            return Err(e);
        }
        let id = self.register_texture(Sdlgpu3Texture {
            texture,
            width,
            height,
        });
        if cfg!(debug_assertions) {
            tracing::debug!(
                target: "dear-imgui-sdlgpu3",
                "Texture created: id={} {}x{}",
                id,
                width,
                height
            );
        }
        Ok(id)
    }

    /// Upload the queued sub-rectangles of `texture_data` into texture `id`.
    ///
    /// Uses `Updates[]` when present, else `UpdateRect`. Returns false when nothing was uploaded.
    pub fn apply_subrect_updates(
        &mut self,
        device: *mut SDL_GPUDevice,
        copy_pass: *mut SDL_GPUCopyPass,
        texture_data: &TextureData,
        id: u64,
    ) -> RendererResult<bool> {
        let Some(tex) = self.textures.get(&id) else {
            return Ok(false);
        };
        let mut rects: Vec<TextureRect> = texture_data.updates().collect();
        if rects.is_empty() {
            let r = texture_data.update_rect();
            if r.w > 0 && r.h > 0 {
                rects.push(r);
            }
        }
        let mut uploaded = false;
        for rect in rects {
            let (x, y, w, h) = clamp_rect(rect, tex.width, tex.height);
            if w == 0 || h == 0 {
                continue;
            }
            let Some(pixels) = texture_data_to_rgba_subrect(texture_data, x, y, w, h) else {
                return Ok(false);
            };
            upload_rgba(device, copy_pass, tex.texture, x, y, w, h, &pixels)?;
            uploaded = true;
            if cfg!(debug_assertions) {
                tracing::debug!(
                    target: "dear-imgui-sdlgpu3",
                    "Updated texture id={} subrect x={} y={} w={} h={}",
                    id,
                    x,
                    y,
                    w,
                    h
                );
            }
        }
        Ok(uploaded)
    }

    /// Handle the texture requests carried by `draw_data`
    ///
    /// This corresponds to the `ImGui_ImplSDLGPU3_UpdateTexture` loop in the C++
    /// implementation. Ids and statuses are written back into each `ImTextureData`.
    pub fn handle_texture_updates(
        &mut self,
        draw_data: &dear_imgui_rs::render::DrawData,
        device: *mut SDL_GPUDevice,
        copy_pass: *mut SDL_GPUCopyPass,
    ) {
        for mut td in draw_data.textures() {
            match self.update_single_texture(&td, device, copy_pass) {
                Ok(result) => result.apply_to(&mut td),
                Err(e) => {
                    tracing::warn!(
                        target: "dear-imgui-sdlgpu3",
                        "Texture request {:?} failed: {}",
                        td.status(),
                        e
                    );
                    TextureUpdateResult::Failed.apply_to(&mut td);
                }
            }
        }
    }

    /// Process a single texture based on its status
    pub fn update_single_texture(
        &mut self,
        texture_data: &TextureData,
        device: *mut SDL_GPUDevice,
        copy_pass: *mut SDL_GPUCopyPass,
    ) -> RendererResult<TextureUpdateResult> {
        let internal_id = texture_data.tex_id().id();
        match texture_data.status() {
            TextureStatus::WantCreate => {
                // A stale id from a previous device generation is dropped first.
                if internal_id != 0 {
                    self.remove_texture(device, internal_id);
                }
                let id = self.create_texture_from_data(device, copy_pass, texture_data)?;
                Ok(TextureUpdateResult::Created {
                    texture_id: TextureId::from(id),
                })
            }
            TextureStatus::WantUpdates => {
                if internal_id == 0 || !self.textures.contains_key(&internal_id) {
                    let id = self.create_texture_from_data(device, copy_pass, texture_data)?;
                    return Ok(TextureUpdateResult::Created {
                        texture_id: TextureId::from(id),
                    });
                }
                if self.apply_subrect_updates(device, copy_pass, texture_data, internal_id)? {
                    return Ok(TextureUpdateResult::Updated);
                }
                // No usable rects: re-upload everything under a fresh id.
                self.remove_texture(device, internal_id);
                let id = self.create_texture_from_data(device, copy_pass, texture_data)?;
                Ok(TextureUpdateResult::Created {
                    texture_id: TextureId::from(id),
                })
            }
            TextureStatus::WantDestroy => {
                if unused_frames(texture_data) > 0 {
                    self.remove_texture(device, internal_id);
                    if cfg!(debug_assertions) {
                        tracing::debug!(
                            target: "dear-imgui-sdlgpu3",
                            "Texture destroyed: id={}",
                            internal_id
                        );
                    }
                    Ok(TextureUpdateResult::Destroyed)
                } else {
                    Ok(TextureUpdateResult::NoAction)
                }
            }
            TextureStatus::OK | TextureStatus::Destroyed => Ok(TextureUpdateResult::NoAction),
        }
    }
}

fn unused_frames(texture_data: &TextureData) -> i32 {
    // SAFETY: plain field read from a live ImTextureData
    unsafe {
        let raw = texture_data.as_raw();
        if raw.is_null() { 1 } else { (*raw).UnusedFrames }
    }
}

/// Create a sampled RGBA8 2D texture.
pub(crate) fn create_rgba_texture(
    device: *mut SDL_GPUDevice,
    width: u32,
    height: u32,
) -> RendererResult<*mut SDL_GPUTexture> {
    if width == 0 || height == 0 {
        return Err(RendererError::TextureUpload(format!(
            "invalid texture size {width}x{height}"
        )));
    }
    let info = SDL_GPUTextureCreateInfo {
        r#type: SDL_GPU_TEXTURETYPE_2D,
        format: SDL_GPU_TEXTUREFORMAT_R8G8B8A8_UNORM,
        usage: SDL_GPU_TEXTUREUSAGE_SAMPLER,
        width,
        height,
        layer_count_or_depth: 1,
        num_levels: 1,
        sample_count: SDL_GPU_SAMPLECOUNT_1,
        ..unsafe { std::mem::zeroed() }
    };
    let texture = unsafe { SDL_CreateGPUTexture(device, &info) };
    if texture.is_null() {
        return Err(RendererError::sdl("SDL_CreateGPUTexture"));
    }
    Ok(texture)
}

/// Stage tightly packed RGBA8 `pixels` and record an upload into the given region.
#[allow(clippy::too_many_arguments)]
pub(crate) fn upload_rgba(
    device: *mut SDL_GPUDevice,
    copy_pass: *mut SDL_GPUCopyPass,
    texture: *mut SDL_GPUTexture,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    pixels: &[u8],
) -> RendererResult<()> {
    let expected = (w as usize) * (h as usize) * 4;
    if pixels.len() < expected {
        return Err(RendererError::TextureUpload(format!(
            "{} bytes for a {w}x{h} region",
            pixels.len()
        )));
    }
    let transfer = create_transfer_buffer(device, expected)?;
    unsafe {
        let mapped = SDL_MapGPUTransferBuffer(device, transfer, false) as *mut u8;
        if mapped.is_null() {
            let err = RendererError::sdl("SDL_MapGPUTransferBuffer");
            SDL_ReleaseGPUTransferBuffer(device, transfer);
            return Err(err);
        }
        ptr::copy_nonoverlapping(pixels.as_ptr(), mapped, expected);
        SDL_UnmapGPUTransferBuffer(device, transfer);

        let source = SDL_GPUTextureTransferInfo {
            transfer_buffer: transfer,
            offset: 0,
            pixels_per_row: w,
            rows_per_layer: h,
        };
        let destination = SDL_GPUTextureRegion {
            texture,
            mip_level: 0,
            layer: 0,
            x,
            y,
            z: 0,
            w,
            h,
            d: 1,
        };
        SDL_UploadToGPUTexture(copy_pass, &source, &destination, false);
        SDL_ReleaseGPUTransferBuffer(device, transfer);
    }
    Ok(())
}

/// Whole texture as tightly packed RGBA8
pub fn texture_data_to_rgba_full(td: &TextureData) -> Option<Vec<u8>> {
    let w = td.width() as u32;
    let h = td.height() as u32;
    if w == 0 || h == 0 {
        return None;
    }
    texture_data_to_rgba_subrect(td, 0, 0, w, h)
}

/// Sub-rectangle as tightly packed RGBA8; Alpha8 expands to white with alpha.
pub fn texture_data_to_rgba_subrect(
    td: &TextureData,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
) -> Option<Vec<u8>> {
    let pixels = td.pixels()?;
    let tex_w = td.width() as usize;
    let tex_h = td.height() as usize;
    let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
    if tex_w == 0 || tex_h == 0 || w == 0 || h == 0 || x + w > tex_w || y + h > tex_h {
        return None;
    }
    let bpp = td.bytes_per_pixel() as usize;
    let mut out = vec![0u8; w * h * 4];
    match td.format() {
        ImGuiTextureFormat::RGBA32 => {
            for row in 0..h {
                let src = ((y + row) * tex_w + x) * bpp;
                let dst = row * w * 4;
                out[dst..dst + w * 4].copy_from_slice(pixels.get(src..src + w * 4)?);
            }
        }
        ImGuiTextureFormat::Alpha8 => {
            for row in 0..h {
                let src = ((y + row) * tex_w + x) * bpp;
                let alphas = pixels.get(src..src + w)?;
                for (i, &a) in alphas.iter().enumerate() {
                    let dst = (row * w + i) * 4;
                    out[dst..dst + 4].copy_from_slice(&[255, 255, 255, a]);
                }
            }
        }
    }
    Some(out)
}

/// Clamp an update rect to a `tw` x `th` texture; empty results have zero extent.
pub fn clamp_rect(rect: TextureRect, tw: u32, th: u32) -> (u32, u32, u32, u32) {
    let x = u32::from(rect.x).min(tw);
    let y = u32::from(rect.y).min(th);
    let w = u32::from(rect.w);
    let h = u32::from(rect.h);
    if w == 0 || h == 0 || x >= tw || y >= th {
        return (x, y, 0, 0);
    }
    (x, y, w.min(tw - x), h.min(th - y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dear_imgui_rs::texture::TextureFormat as ImFormat;
    use dear_imgui_rs::texture::OwnedTextureData;

    #[test]
    fn texture_update_result_apply_to_sets_status_and_id() {
        let mut tex = TextureData::new();

        TextureUpdateResult::Created {
            texture_id: TextureId::from(7u64),
        }
        .apply_to(&mut tex);
        assert_eq!(tex.status(), TextureStatus::OK);
        assert_eq!(tex.tex_id().id(), 7);

        TextureUpdateResult::Updated.apply_to(&mut tex);
        assert_eq!(tex.status(), TextureStatus::OK);

        TextureUpdateResult::Destroyed.apply_to(&mut tex);
        assert_eq!(tex.status(), TextureStatus::Destroyed);

        // Without a requested destroy, ImGui turns Destroyed back into WantCreate.
        unsafe {
            (*tex.as_raw_mut()).WantDestroyNextFrame = false;
        }
        TextureUpdateResult::Failed.apply_to(&mut tex);
        assert_eq!(tex.status(), TextureStatus::WantCreate);

        TextureUpdateResult::NoAction.apply_to(&mut tex);
        assert_eq!(tex.status(), TextureStatus::WantCreate);
    }

    fn with_status(status: TextureStatus, unused_frames: i32) -> OwnedTextureData {
        let mut tex = TextureData::new();
        tex.set_status(status);
        unsafe {
            (*tex.as_raw_mut()).UnusedFrames = unused_frames;
        }
        tex
    }

    // Null device and copy pass: none of these paths may reach SDL.
    fn update(
        manager: &mut Sdlgpu3TextureManager,
        tex: &TextureData,
    ) -> RendererResult<TextureUpdateResult> {
        manager.update_single_texture(tex, ptr::null_mut(), ptr::null_mut())
    }

    #[test]
    fn want_destroy_waits_for_unused_frames() {
        let mut manager = Sdlgpu3TextureManager::new();

        let tex = with_status(TextureStatus::WantDestroy, 0);
        assert!(matches!(
            update(&mut manager, &tex),
            Ok(TextureUpdateResult::NoAction)
        ));

        let tex = with_status(TextureStatus::WantDestroy, 2);
        assert!(matches!(
            update(&mut manager, &tex),
            Ok(TextureUpdateResult::Destroyed)
        ));
    }

    #[test]
    fn want_destroy_forgets_external_binding() {
        let mut manager = Sdlgpu3TextureManager::new();
        let id = manager.register_external(ExternalTexture {
            texture: 0x10 as *mut SDL_GPUTexture,
            sampler: ptr::null_mut(),
        });
        let mut tex = with_status(TextureStatus::WantDestroy, 1);
        tex.set_tex_id(TextureId::from(id));
        assert!(matches!(
            update(&mut manager, &tex),
            Ok(TextureUpdateResult::Destroyed)
        ));
        assert!(!manager.contains_texture(id));
    }

    #[test]
    fn settled_statuses_need_no_action() {
        let mut manager = Sdlgpu3TextureManager::new();

        let tex = with_status(TextureStatus::OK, 0);
        assert!(matches!(
            update(&mut manager, &tex),
            Ok(TextureUpdateResult::NoAction)
        ));

        let mut tex = TextureData::new();
        unsafe {
            (*tex.as_raw_mut()).WantDestroyNextFrame = true;
        }
        tex.set_status(TextureStatus::Destroyed);
        assert_eq!(tex.status(), TextureStatus::Destroyed);
        assert!(matches!(
            update(&mut manager, &tex),
            Ok(TextureUpdateResult::NoAction)
        ));
    }

    #[test]
    fn want_updates_for_unknown_id_takes_create_path() {
        let mut manager = Sdlgpu3TextureManager::new();
        let mut tex = with_status(TextureStatus::WantUpdates, 0);
        tex.set_tex_id(TextureId::from(42u64));
        // No CPU pixels: the create path fails before any GPU call.
        assert!(matches!(
            update(&mut manager, &tex),
            Err(RendererError::TextureUpload(_))
        ));
        assert_eq!(manager.texture_count(), 0);
    }

    #[test]
    fn want_create_without_pixels_fails() {
        let mut manager = Sdlgpu3TextureManager::new();
        let tex = with_status(TextureStatus::WantCreate, 0);
        assert!(matches!(
            update(&mut manager, &tex),
            Err(RendererError::TextureUpload(_))
        ));
        assert_eq!(manager.texture_count(), 0);
    }

    #[test]
    fn rgba32_subrect_copies_rows() {
        let mut tex = TextureData::new();
        tex.create(ImFormat::RGBA32, 2, 2);
        let pixels: [u8; 16] = [
            1, 2, 3, 4, 5, 6, 7, 8, //
            9, 10, 11, 12, 13, 14, 15, 16,
        ];
        tex.set_data(&pixels);

        assert_eq!(texture_data_to_rgba_full(&tex).unwrap(), pixels);
        assert_eq!(
            texture_data_to_rgba_subrect(&tex, 1, 0, 1, 2).unwrap(),
            vec![5, 6, 7, 8, 13, 14, 15, 16]
        );
    }

    #[test]
    fn alpha8_expands_to_white() {
        let mut tex = TextureData::new();
        tex.create(ImFormat::Alpha8, 2, 2);
        tex.set_data(&[0, 64, 128, 255]);
        assert_eq!(
            texture_data_to_rgba_subrect(&tex, 0, 1, 2, 1).unwrap(),
            vec![255, 255, 255, 128, 255, 255, 255, 255]
        );
    }

    #[test]
    fn subrect_outside_texture_is_rejected() {
        let mut tex = TextureData::new();
        tex.create(ImFormat::RGBA32, 2, 2);
        assert!(texture_data_to_rgba_subrect(&tex, 1, 1, 2, 1).is_none());
        assert!(texture_data_to_rgba_subrect(&tex, 0, 0, 0, 1).is_none());
    }

    #[test]
    fn clamp_rect_trims_to_texture() {
        let r = TextureRect {
            x: 6,
            y: 2,
            w: 10,
            h: 3,
        };
        assert_eq!(clamp_rect(r, 8, 4), (6, 2, 2, 2));
        let outside = TextureRect {
            x: 9,
            y: 0,
            w: 1,
            h: 1,
        };
        assert_eq!(clamp_rect(outside, 8, 4), (8, 0, 0, 0));
    }

    #[test]
    fn external_textures_get_ids_and_bindings() {
        let mut manager = Sdlgpu3TextureManager::new();
        let texture = 0x10 as *mut SDL_GPUTexture;
        let sampler = 0x20 as *mut SDL_GPUSampler;
        let id = manager.register_external(ExternalTexture { texture, sampler });
        assert_eq!(id, 1);
        assert!(manager.contains_texture(id));

        let binding = manager.binding(id, ptr::null_mut()).expect("binding");
        assert_eq!(binding.texture, texture);
        assert_eq!(binding.sampler, sampler);

        let other = 0x30 as *mut SDL_GPUTexture;
        assert!(manager.update_external(id, ExternalTexture { texture: other, sampler }));
        assert_eq!(manager.binding(id, ptr::null_mut()).unwrap().texture, other);
        assert!(!manager.update_external(99, ExternalTexture { texture: other, sampler }));

        // External textures are not released, so a null device is never touched.
        assert!(manager.remove_texture(ptr::null_mut(), id));
        assert!(manager.binding(id, ptr::null_mut()).is_none());
        assert_eq!(manager.register_external(ExternalTexture { texture, sampler }), 2);
    }
}
