//! Vertex uniforms and clip-rect math for the SDL_GPU renderer
//!
//! This corresponds to the `ScaleTranslate` push data and the scissor projection in
//! imgui_impl_sdlgpu3.cpp.

use bytemuck::{Pod, Zeroable};

/// Vertex uniform block pushed with `SDL_PushGPUVertexUniformData`.
///
/// Maps ImGui display space to clip space: `clip = pos * scale + translate`.
/// The shaders flip Y afterwards.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct VertexUniforms {
    pub scale: [f32; 2],
    pub translate: [f32; 2],
}

impl VertexUniforms {
    /// Projection for the given display rectangle.
    pub fn from_display(display_pos: [f32; 2], display_size: [f32; 2]) -> Self {
        let scale = [2.0 / display_size[0], 2.0 / display_size[1]];
        let translate = [
            -1.0 - display_pos[0] * scale[0],
            -1.0 - display_pos[1] * scale[1],
        ];
        Self { scale, translate }
    }

    /// Transform a display-space position the same way the vertex shader does
    /// (before the Y flip).
    pub fn apply(&self, pos: [f32; 2]) -> [f32; 2] {
        [
            pos[0] * self.scale[0] + self.translate[0],
            pos[1] * self.scale[1] + self.translate[1],
        ]
    }
}

/// Scissor rectangle in framebuffer pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl ScissorRect {
    pub fn full(fb_width: i32, fb_height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            w: fb_width,
            h: fb_height,
        }
    }

    pub fn to_sdl(self) -> sdl3_sys::rect::SDL_Rect {
        sdl3_sys::rect::SDL_Rect {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }
}

/// Project an ImGui clip rectangle into framebuffer space and clamp it.
///
/// Returns `None` when the clipped rectangle is empty.
pub fn project_clip_rect(
    clip_rect: [f32; 4],
    clip_off: [f32; 2],
    clip_scale: [f32; 2],
    fb_size: [f32; 2],
) -> Option<ScissorRect> {
    let min_x = ((clip_rect[0] - clip_off[0]) * clip_scale[0]).max(0.0);
    let min_y = ((clip_rect[1] - clip_off[1]) * clip_scale[1]).max(0.0);
    let max_x = ((clip_rect[2] - clip_off[0]) * clip_scale[0]).min(fb_size[0]);
    let max_y = ((clip_rect[3] - clip_off[1]) * clip_scale[1]).min(fb_size[1]);
    if max_x <= min_x || max_y <= min_y {
        return None;
    }
    Some(ScissorRect {
        x: min_x as i32,
        y: min_y as i32,
        w: (max_x - min_x) as i32,
        h: (max_y - min_y) as i32,
    })
}

/// Framebuffer size in pixels, or `None` when minimized / degenerate.
pub fn framebuffer_size(
    display_size: [f32; 2],
    framebuffer_scale: [f32; 2],
) -> Option<(i32, i32)> {
    let w = (display_size[0] * framebuffer_scale[0]) as i32;
    let h = (display_size[1] * framebuffer_scale[1]) as i32;
    if w <= 0 || h <= 0 {
        return None;
    }
    Some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_map_display_corners_to_clip_space() {
        let u = VertexUniforms::from_display([0.0, 0.0], [800.0, 600.0]);
        assert_eq!(u.apply([0.0, 0.0]), [-1.0, -1.0]);
        assert_eq!(u.apply([800.0, 600.0]), [1.0, 1.0]);
    }

    #[test]
    fn uniforms_account_for_display_pos() {
        let u = VertexUniforms::from_display([100.0, 50.0], [200.0, 100.0]);
        assert_eq!(u.apply([100.0, 50.0]), [-1.0, -1.0]);
        assert_eq!(u.apply([300.0, 150.0]), [1.0, 1.0]);
        assert_eq!(u.apply([200.0, 100.0]), [0.0, 0.0]);
    }

    #[test]
    fn uniforms_are_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<VertexUniforms>(), 16);
        let u = VertexUniforms::from_display([0.0, 0.0], [2.0, 2.0]);
        assert_eq!(bytemuck::bytes_of(&u).len(), 16);
    }

    #[test]
    fn clip_rect_is_scaled_and_clamped() {
        let r = project_clip_rect(
            [-10.0, 5.0, 500.0, 40.0],
            [0.0, 0.0],
            [2.0, 2.0],
            [800.0, 600.0],
        )
        .expect("non-empty");
        assert_eq!(
            r,
            ScissorRect {
                x: 0,
                y: 10,
                w: 800,
                h: 70
            }
        );
    }

    #[test]
    fn clip_rect_outside_framebuffer_is_skipped() {
        let (origin, scale, fb) = ([0.0, 0.0], [1.0, 1.0], [800.0, 600.0]);
        assert!(project_clip_rect([900.0, 0.0, 1000.0, 10.0], origin, scale, fb).is_none());
        assert!(project_clip_rect([10.0, 10.0, 10.0, 20.0], origin, scale, fb).is_none());
    }

    #[test]
    fn clip_rect_honors_display_offset() {
        let r = project_clip_rect(
            [110.0, 60.0, 120.0, 70.0],
            [100.0, 50.0],
            [1.0, 1.0],
            [800.0, 600.0],
        )
        .expect("non-empty");
        assert_eq!((r.x, r.y, r.w, r.h), (10, 10, 10, 10));
    }

    #[test]
    fn minimized_framebuffer_has_no_size() {
        assert_eq!(framebuffer_size([0.0, 600.0], [1.0, 1.0]), None);
        assert_eq!(framebuffer_size([800.0, 600.0], [2.0, 2.0]), Some((1600, 1200)));
    }
}
