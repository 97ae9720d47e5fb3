//! Error types for the SDL_GPU renderer.

use thiserror::Error;

/// Result type for renderer operations.
pub type RendererResult<T> = Result<T, RendererError>;

/// Errors that can occur during SDL_GPU renderer initialization or rendering.
#[derive(Debug, Error)]
pub enum RendererError {
    /// The init info carried a null `SDL_GPUDevice`.
    #[error("SDL_GPU device pointer is null")]
    NullDevice,

    /// The init info carried `SDL_GPU_TEXTUREFORMAT_INVALID` as color target format.
    #[error("invalid color target format")]
    InvalidColorTargetFormat,

    /// The device does not accept any shader format this crate can produce.
    #[error("no supported shader format (device formats: {0}); provide custom shaders")]
    UnsupportedShaderFormat(String),

    /// An SDL call failed; carries `SDL_GetError()`.
    #[error("{call} failed: {message}")]
    Sdl {
        call: &'static str,
        message: String,
    },

    /// `init` was called on a renderer that is already initialized.
    #[error("renderer already initialized; call shutdown first")]
    AlreadyInitialized,

    /// The renderer was used before `init` or after `shutdown`.
    #[error("renderer not initialized")]
    NotInitialized,

    /// `render_draw_data` was called without a matching `prepare_draw_data`.
    #[error(
        "draw data needs {needed_vertices} vertices / {needed_indices} indices but buffers hold \
         {vertex_capacity} / {index_capacity}; call prepare_draw_data first"
    )]
    BuffersNotPrepared {
        needed_vertices: usize,
        needed_indices: usize,
        vertex_capacity: usize,
        index_capacity: usize,
    },

    /// Bad texture id (no matching texture binding).
    #[error("bad texture id: {0}")]
    BadTextureId(u64),

    /// Texture data could not be converted for upload.
    #[error("texture upload failed: {0}")]
    TextureUpload(String),

    /// SDL3 platform backend initialization failed.
    #[error("SDL3 platform backend: {0}")]
    PlatformInit(#[from] dear_imgui_sdl3::Sdl3BackendError),
}

impl RendererError {
    /// Build an [`RendererError::Sdl`] from the current `SDL_GetError()` message.
    pub(crate) fn sdl(call: &'static str) -> Self {
        RendererError::Sdl {
            call,
            message: sdl_error_message(),
        }
    }
}

/// Read the thread-local SDL error string.
pub(crate) fn sdl_error_message() -> String {
    // SAFETY: SDL_GetError always returns a valid, NUL-terminated string (possibly empty).
    unsafe {
        let ptr = sdl3_sys::error::SDL_GetError();
        if ptr.is_null() {
            return String::new();
        }
        std::ffi::CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}
