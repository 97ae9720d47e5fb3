// Renderer external texture helpers (register/update/unregister)

use super::*;
use crate::ExternalTexture;
use dear_imgui_rs::TextureId;

impl Sdlgpu3Renderer {
    /// Register an application-owned texture and obtain a `TextureId` for ImGui usage.
    ///
    /// Use this for render targets, video frames or anything else you already uploaded:
    /// `ui.image(texture_id, size)`. Pass a null `sampler` to sample with the renderer's
    /// linear clamp-to-edge sampler, resolved at draw time so it survives
    /// `create_device_objects`. The renderer never releases the texture or sampler.
    pub fn register_external_texture(
        &mut self,
        texture: *mut SDL_GPUTexture,
        sampler: *mut SDL_GPUSampler,
    ) -> RendererResult<TextureId> {
        if texture.is_null() {
            return Err(RendererError::BadTextureId(0));
        }
        let id = self
            .texture_manager
            .register_external(ExternalTexture { texture, sampler });
        Ok(TextureId::from(id))
    }

    /// Point an already registered external texture at a new texture/sampler pair.
    pub fn update_external_texture(
        &mut self,
        texture_id: TextureId,
        texture: *mut SDL_GPUTexture,
        sampler: *mut SDL_GPUSampler,
    ) -> RendererResult<()> {
        if texture.is_null()
            || !self
                .texture_manager
                .update_external(texture_id.id(), ExternalTexture { texture, sampler })
        {
            return Err(RendererError::BadTextureId(texture_id.id()));
        }
        Ok(())
    }

    /// Unregister (remove) a texture by id. Managed textures are released, external ones
    /// are only forgotten.
    pub fn unregister_texture(&mut self, texture_id: TextureId) -> RendererResult<()> {
        let device = self.device()?;
        if !self.texture_manager.remove_texture(device, texture_id.id()) {
            return Err(RendererError::BadTextureId(texture_id.id()));
        }
        if self.font_texture_id == Some(texture_id.id()) {
            self.font_texture_id = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_texture_is_rejected() {
        let mut renderer = Sdlgpu3Renderer::empty();
        assert!(matches!(
            renderer.register_external_texture(ptr::null_mut(), ptr::null_mut()),
            Err(RendererError::BadTextureId(0))
        ));
    }

    #[test]
    fn null_sampler_follows_the_current_default_sampler() {
        let mut renderer = Sdlgpu3Renderer::empty();
        let texture = 0x10 as *mut SDL_GPUTexture;
        let id = renderer
            .register_external_texture(texture, ptr::null_mut())
            .expect("register");

        // Device objects recreated: the old default sampler is gone.
        let old_sampler = 0xa as *mut SDL_GPUSampler;
        let new_sampler = 0xb as *mut SDL_GPUSampler;
        let manager = renderer.texture_manager();
        assert_eq!(
            manager.binding(id.id(), old_sampler).expect("binding").sampler,
            old_sampler
        );
        let binding = manager.binding(id.id(), new_sampler).expect("binding");
        assert_eq!(binding.texture, texture);
        assert_eq!(binding.sampler, new_sampler);

        let other = 0x30 as *mut SDL_GPUTexture;
        renderer
            .update_external_texture(id, other, ptr::null_mut())
            .expect("update");
        let binding = renderer
            .texture_manager()
            .binding(id.id(), new_sampler)
            .expect("binding");
        assert_eq!(binding.texture, other);
        assert_eq!(binding.sampler, new_sampler);

        // An explicit sampler is never replaced.
        let own = 0x40 as *mut SDL_GPUSampler;
        renderer
            .update_external_texture(id, other, own)
            .expect("update");
        assert_eq!(
            renderer
                .texture_manager()
                .binding(id.id(), new_sampler)
                .expect("binding")
                .sampler,
            own
        );
    }

    #[test]
    fn explicit_sampler_works_without_device() {
        let mut renderer = Sdlgpu3Renderer::empty();
        let texture = 0x10 as *mut SDL_GPUTexture;
        let sampler = 0x20 as *mut SDL_GPUSampler;
        let id = renderer
            .register_external_texture(texture, sampler)
            .expect("register");
        assert!(renderer.texture_manager().contains_texture(id.id()));

        let other = 0x30 as *mut SDL_GPUTexture;
        renderer
            .update_external_texture(id, other, sampler)
            .expect("update");
        assert!(matches!(
            renderer.update_external_texture(TextureId::from(99u64), other, sampler),
            Err(RendererError::BadTextureId(99))
        ));
        assert!(matches!(
            renderer.unregister_texture(id),
            Err(RendererError::NotInitialized)
        ));
    }
}
