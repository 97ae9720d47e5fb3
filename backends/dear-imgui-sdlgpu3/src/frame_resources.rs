//! Vertex/index buffer management for the SDL_GPU renderer
//!
//! This corresponds to the FrameRenderBuffers handling in imgui_impl_sdlgpu3.cpp:
//! GPU buffers grow with slack, and each frame is uploaded through one cycled
//! transfer buffer inside a copy pass.

use crate::{RendererError, RendererResult};
use dear_imgui_rs::render::{DrawData, DrawIdx, DrawVert};
use sdl3_sys::gpu::*;
use std::mem::size_of;
use std::ptr;

/// Extra vertices allocated whenever the vertex buffer grows.
pub const VERTEX_BUFFER_SLACK: usize = 5000;
/// Extra indices allocated whenever the index buffer grows.
pub const INDEX_BUFFER_SLACK: usize = 10000;

/// ImGui index element size as SDL expects it. Derived from `DrawIdx` so a switch
/// to 32-bit indices needs no further change here.
pub const INDEX_ELEMENT_SIZE: SDL_GPUIndexElementSize = if size_of::<DrawIdx>() == 2 {
    SDL_GPU_INDEXELEMENTSIZE_16BIT
} else {
    SDL_GPU_INDEXELEMENTSIZE_32BIT
};

/// New element capacity for a buffer holding `current` elements that must hold `needed`.
///
/// Returns `None` when the buffer is already large enough.
pub fn grown_capacity(current: usize, needed: usize, slack: usize) -> Option<usize> {
    if current != 0 && needed <= current {
        None
    } else {
        Some(needed + slack)
    }
}

/// Per-frame GPU buffers
pub struct FrameResources {
    vertex_buffer: *mut SDL_GPUBuffer,
    index_buffer: *mut SDL_GPUBuffer,
    transfer_buffer: *mut SDL_GPUTransferBuffer,
    /// Capacity in vertices
    vertex_capacity: usize,
    /// Capacity in indices
    index_capacity: usize,
    /// Capacity in bytes
    transfer_capacity: usize,
}

impl FrameResources {
    pub fn new() -> Self {
        Self {
            vertex_buffer: ptr::null_mut(),
            index_buffer: ptr::null_mut(),
            transfer_buffer: ptr::null_mut(),
            vertex_capacity: 0,
            index_capacity: 0,
            transfer_capacity: 0,
        }
    }

    pub fn vertex_buffer(&self) -> *mut SDL_GPUBuffer {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> *mut SDL_GPUBuffer {
        self.index_buffer
    }

    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    /// True when the buffers can serve a draw of this size
    pub fn can_hold(&self, vertices: usize, indices: usize) -> bool {
        !self.vertex_buffer.is_null()
            && !self.index_buffer.is_null()
            && vertices <= self.vertex_capacity
            && indices <= self.index_capacity
    }

    /// Grow the GPU vertex/index buffers so they hold at least the given counts.
    pub fn ensure_capacity(
        &mut self,
        device: *mut SDL_GPUDevice,
        vertices: usize,
        indices: usize,
    ) -> RendererResult<()> {
        if let Some(capacity) = grown_capacity(self.vertex_capacity, vertices, VERTEX_BUFFER_SLACK)
        {
            let buffer = create_buffer(
                device,
                SDL_GPU_BUFFERUSAGE_VERTEX,
                capacity * size_of::<DrawVert>(),
            )?;
            release_buffer(device, &mut self.vertex_buffer);
            self.vertex_buffer = buffer;
            self.vertex_capacity = capacity;
        }
        if let Some(capacity) = grown_capacity(self.index_capacity, indices, INDEX_BUFFER_SLACK) {
            let buffer = create_buffer(
                device,
                SDL_GPU_BUFFERUSAGE_INDEX,
                capacity * size_of::<DrawIdx>(),
            )?;
            release_buffer(device, &mut self.index_buffer);
            self.index_buffer = buffer;
            self.index_capacity = capacity;
        }
        Ok(())
    }

    fn ensure_transfer_capacity(
        &mut self,
        device: *mut SDL_GPUDevice,
        bytes: usize,
    ) -> RendererResult<()> {
        if !self.transfer_buffer.is_null() && bytes <= self.transfer_capacity {
            return Ok(());
        }
        let transfer = create_transfer_buffer(device, bytes)?;
        if !self.transfer_buffer.is_null() {
            unsafe { SDL_ReleaseGPUTransferBuffer(device, self.transfer_buffer) };
        }
        self.transfer_buffer = transfer;
        self.transfer_capacity = bytes;
        Ok(())
    }

    /// Copy every draw list into the transfer buffer and record the uploads into `copy_pass`.
    ///
    /// `ensure_capacity` must have been called for the draw data's totals.
    pub fn upload(
        &mut self,
        device: *mut SDL_GPUDevice,
        copy_pass: *mut SDL_GPUCopyPass,
        draw_data: &DrawData,
    ) -> RendererResult<()> {
        let (total_vtx, total_idx) = draw_data_totals(draw_data);
        if !self.can_hold(total_vtx, total_idx) {
            return Err(RendererError::BuffersNotPrepared {
                needed_vertices: total_vtx,
                needed_indices: total_idx,
                vertex_capacity: self.vertex_capacity,
                index_capacity: self.index_capacity,
            });
        }
        let vtx_bytes = total_vtx * size_of::<DrawVert>();
        let idx_bytes = total_idx * size_of::<DrawIdx>();
        self.ensure_transfer_capacity(device, vtx_bytes + idx_bytes)?;

        unsafe {
            let mapped = SDL_MapGPUTransferBuffer(device, self.transfer_buffer, true) as *mut u8;
            if mapped.is_null() {
                return Err(RendererError::sdl("SDL_MapGPUTransferBuffer"));
            }
            let mut vtx_dst = mapped;
            let mut idx_dst = mapped.add(vtx_bytes);
            for draw_list in draw_data.draw_lists() {
                let vtx = draw_list.vtx_buffer();
                let idx = draw_list.idx_buffer();
                let vtx_len = std::mem::size_of_val(vtx);
                let idx_len = std::mem::size_of_val(idx);
                ptr::copy_nonoverlapping(vtx.as_ptr() as *const u8, vtx_dst, vtx_len);
                ptr::copy_nonoverlapping(idx.as_ptr() as *const u8, idx_dst, idx_len);
                vtx_dst = vtx_dst.add(vtx_len);
                idx_dst = idx_dst.add(idx_len);
            }
            SDL_UnmapGPUTransferBuffer(device, self.transfer_buffer);

            let vertex_source = SDL_GPUTransferBufferLocation {
                transfer_buffer: self.transfer_buffer,
                offset: 0,
            };
            let vertex_region = SDL_GPUBufferRegion {
                buffer: self.vertex_buffer,
                offset: 0,
                size: to_u32(vtx_bytes)?,
            };
            let index_source = SDL_GPUTransferBufferLocation {
                transfer_buffer: self.transfer_buffer,
                offset: to_u32(vtx_bytes)?,
            };
            let index_region = SDL_GPUBufferRegion {
                buffer: self.index_buffer,
                offset: 0,
                size: to_u32(idx_bytes)?,
            };
            SDL_UploadToGPUBuffer(copy_pass, &vertex_source, &vertex_region, true);
            SDL_UploadToGPUBuffer(copy_pass, &index_source, &index_region, true);
        }
        Ok(())
    }

    /// Release all GPU buffers.
    pub fn destroy(&mut self, device: *mut SDL_GPUDevice) {
        release_buffer(device, &mut self.vertex_buffer);
        release_buffer(device, &mut self.index_buffer);
        if !self.transfer_buffer.is_null() {
            unsafe { SDL_ReleaseGPUTransferBuffer(device, self.transfer_buffer) };
            self.transfer_buffer = ptr::null_mut();
        }
        self.vertex_capacity = 0;
        self.index_capacity = 0;
        self.transfer_capacity = 0;
    }

    /// Get buffer statistics for debugging
    pub fn stats(&self) -> FrameResourcesStats {
        FrameResourcesStats {
            vertex_capacity: self.vertex_capacity,
            index_capacity: self.index_capacity,
            vertex_buffer_bytes: self.vertex_capacity * size_of::<DrawVert>(),
            index_buffer_bytes: self.index_capacity * size_of::<DrawIdx>(),
            transfer_buffer_bytes: self.transfer_capacity,
        }
    }
}

impl Default for FrameResources {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for frame resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameResourcesStats {
    pub vertex_capacity: usize,
    pub index_capacity: usize,
    pub vertex_buffer_bytes: usize,
    pub index_buffer_bytes: usize,
    pub transfer_buffer_bytes: usize,
}

/// Total vertex and index counts across all draw lists.
pub fn draw_data_totals(draw_data: &DrawData) -> (usize, usize) {
    let mut vertices = 0;
    let mut indices = 0;
    for draw_list in draw_data.draw_lists() {
        vertices += draw_list.vtx_buffer().len();
        indices += draw_list.idx_buffer().len();
    }
    (vertices, indices)
}

pub(crate) fn to_u32(value: usize) -> RendererResult<u32> {
    u32::try_from(value).map_err(|_| RendererError::Sdl {
        call: "size conversion",
        message: format!("{value} does not fit in Uint32"),
    })
}

fn create_buffer(
    device: *mut SDL_GPUDevice,
    usage: SDL_GPUBufferUsageFlags,
    bytes: usize,
) -> RendererResult<*mut SDL_GPUBuffer> {
    let info = SDL_GPUBufferCreateInfo {
        usage,
        size: to_u32(bytes)?,
        ..unsafe { std::mem::zeroed() }
    };
    let buffer = unsafe { SDL_CreateGPUBuffer(device, &info) };
    if buffer.is_null() {
        return Err(RendererError::sdl("SDL_CreateGPUBuffer"));
    }
    Ok(buffer)
}

pub(crate) fn create_transfer_buffer(
    device: *mut SDL_GPUDevice,
    bytes: usize,
) -> RendererResult<*mut SDL_GPUTransferBuffer> {
    let info = SDL_GPUTransferBufferCreateInfo {
        usage: SDL_GPU_TRANSFERBUFFERUSAGE_UPLOAD,
        size: to_u32(bytes)?,
        ..unsafe { std::mem::zeroed() }
    };
    let transfer = unsafe { SDL_CreateGPUTransferBuffer(device, &info) };
    if transfer.is_null() {
        return Err(RendererError::sdl("SDL_CreateGPUTransferBuffer"));
    }
    Ok(transfer)
}

fn release_buffer(device: *mut SDL_GPUDevice, buffer: &mut *mut SDL_GPUBuffer) {
    if !buffer.is_null() {
        unsafe { SDL_ReleaseGPUBuffer(device, *buffer) };
        *buffer = ptr::null_mut();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_always_grows_with_slack() {
        assert_eq!(grown_capacity(0, 0, VERTEX_BUFFER_SLACK), Some(5000));
        assert_eq!(grown_capacity(0, 120, INDEX_BUFFER_SLACK), Some(10120));
    }

    #[test]
    fn large_enough_buffer_is_kept() {
        assert_eq!(grown_capacity(5000, 5000, VERTEX_BUFFER_SLACK), None);
        assert_eq!(grown_capacity(5000, 10, VERTEX_BUFFER_SLACK), None);
    }

    #[test]
    fn small_buffer_grows_to_need_plus_slack() {
        assert_eq!(grown_capacity(5000, 5001, VERTEX_BUFFER_SLACK), Some(10001));
    }

    #[test]
    fn empty_resources_hold_nothing() {
        let res = FrameResources::new();
        assert!(!res.can_hold(0, 0));
        assert_eq!(res.stats().vertex_buffer_bytes, 0);
    }

    #[test]
    fn index_size_matches_draw_idx() {
        assert_eq!(size_of::<DrawIdx>(), 2);
        assert!(INDEX_ELEMENT_SIZE == SDL_GPU_INDEXELEMENTSIZE_16BIT);
    }
}
