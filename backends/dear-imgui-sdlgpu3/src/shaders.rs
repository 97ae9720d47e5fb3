//! Shader management for the SDL_GPU renderer
//!
//! SDL_GPU takes precompiled shaders in whatever format the driver wants. This module
//! produces the ImGui vertex/fragment pair for the formats we can generate without an
//! offline toolchain:
//!
//! - SPIR-V (Vulkan), assembled at runtime with `rspirv`
//! - MSL source (Metal)
//!
//! Drivers that only accept DXIL or metallib need [`CustomShaders`](crate::CustomShaders).
//!
//! Resource layout follows SDL's conventions: the vertex uniform block lives in
//! set 1 / `[[buffer(0)]]`, the fragment combined sampler in set 2 / `[[texture(0)]]`.

use crate::{CustomShaders, RendererError, RendererResult, ShaderCode};
use rspirv::binary::Assemble;
use rspirv::dr::{Builder, Operand};
use rspirv::spirv::{
    AddressingModel, BuiltIn, Capability, Decoration, Dim, ExecutionMode, ExecutionModel,
    FunctionControl, ImageFormat, MemoryModel, StorageClass, Word,
};
use sdl3_sys::gpu::*;
use std::ffi::CString;
use std::ptr;

/// Entry point of the generated SPIR-V modules
pub const SPIRV_ENTRY_POINT: &str = "main";
/// Entry point of the MSL sources (spirv-cross naming)
pub const MSL_ENTRY_POINT: &str = "main0";

/// Metal vertex shader
pub const MSL_VERTEX_SOURCE: &str = r#"#include <metal_stdlib>
using namespace metal;

struct Uniforms
{
    float2 scale;
    float2 translate;
};

struct VertexIn
{
    float2 pos [[attribute(0)]];
    float2 uv [[attribute(1)]];
    float4 color [[attribute(2)]];
};

struct VertexOut
{
    float4 color [[user(locn0)]];
    float2 uv [[user(locn1)]];
    float4 position [[position]];
};

vertex VertexOut main0(VertexIn in [[stage_in]], constant Uniforms& u [[buffer(0)]])
{
    VertexOut out = {};
    out.color = in.color;
    out.uv = in.uv;
    float2 p = in.pos * u.scale + u.translate;
    out.position = float4(p.x, -p.y, 0.0, 1.0);
    return out;
}
"#;

/// Metal fragment shader
pub const MSL_FRAGMENT_SOURCE: &str = r#"#include <metal_stdlib>
using namespace metal;

struct FragmentIn
{
    float4 color [[user(locn0)]];
    float2 uv [[user(locn1)]];
};

fragment float4 main0(FragmentIn in [[stage_in]],
                      texture2d<float> tex [[texture(0)]],
                      sampler smp [[sampler(0)]])
{
    return in.color * tex.sample(smp, in.uv);
}
"#;

/// Shader flavours this crate can produce itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinShaderFormat {
    Spirv,
    Msl,
}

impl BuiltinShaderFormat {
    /// Pick a built-in flavour from the device's `SDL_GetGPUShaderFormats` mask.
    pub fn select(available: SDL_GPUShaderFormat) -> Option<Self> {
        if available & SDL_GPU_SHADERFORMAT_SPIRV == SDL_GPU_SHADERFORMAT_SPIRV {
            Some(Self::Spirv)
        } else if available & SDL_GPU_SHADERFORMAT_MSL == SDL_GPU_SHADERFORMAT_MSL {
            Some(Self::Msl)
        } else {
            None
        }
    }

    pub fn sdl_format(self) -> SDL_GPUShaderFormat {
        match self {
            Self::Spirv => SDL_GPU_SHADERFORMAT_SPIRV,
            Self::Msl => SDL_GPU_SHADERFORMAT_MSL,
        }
    }

    /// Vertex + fragment code for this flavour
    pub fn shaders(self) -> RendererResult<CustomShaders> {
        let format = self.sdl_format();
        Ok(match self {
            Self::Spirv => CustomShaders {
                vertex: ShaderCode::new(
                    format,
                    words_to_bytes(&spirv_vertex_shader()?),
                    SPIRV_ENTRY_POINT,
                ),
                fragment: ShaderCode::new(
                    format,
                    words_to_bytes(&spirv_fragment_shader()?),
                    SPIRV_ENTRY_POINT,
                ),
            },
            Self::Msl => CustomShaders {
                vertex: ShaderCode::new(
                    format,
                    MSL_VERTEX_SOURCE.as_bytes().to_vec(),
                    MSL_ENTRY_POINT,
                ),
                fragment: ShaderCode::new(
                    format,
                    MSL_FRAGMENT_SOURCE.as_bytes().to_vec(),
                    MSL_ENTRY_POINT,
                ),
            },
        })
    }
}

const NO_OPERANDS: [Operand; 0] = [];
const NO_WORDS: [Word; 0] = [];

fn words_to_bytes(words: &[u32]) -> Vec<u8> {
    bytemuck::cast_slice(words).to_vec()
}

fn spirv_err(e: rspirv::dr::Error) -> RendererError {
    RendererError::Sdl {
        call: "SPIR-V assembly",
        message: format!("{e:?}"),
    }
}

fn new_shader_builder() -> Builder {
    let mut b = Builder::new();
    b.set_version(1, 0);
    b.capability(Capability::Shader);
    b.memory_model(AddressingModel::Logical, MemoryModel::GLSL450);
    b
}

fn location(b: &mut Builder, var: Word, loc: u32) {
    b.decorate(var, Decoration::Location, [Operand::LiteralBit32(loc)]);
}

/// ImGui vertex shader:
///
/// ```glsl
/// layout(set = 1, binding = 0) uniform UBO { vec2 uScale; vec2 uTranslate; } pc;
/// Out.Color = aColor; Out.UV = aUV;
/// gl_Position = vec4(aPos * pc.uScale + pc.uTranslate, 0, 1); gl_Position.y *= -1.0;
/// ```
pub fn spirv_vertex_shader() -> RendererResult<Vec<u32>> {
    let mut b = new_shader_builder();

    let void = b.type_void();
    let fn_void = b.type_function(void, NO_WORDS);
    let f32_ty = b.type_float(32);
    let vec2 = b.type_vector(f32_ty, 2);
    let vec4 = b.type_vector(f32_ty, 4);
    let u32_ty = b.type_int(32, 0);

    let ptr_in_vec2 = b.type_pointer(None, StorageClass::Input, vec2);
    let ptr_in_vec4 = b.type_pointer(None, StorageClass::Input, vec4);
    let ptr_out_vec2 = b.type_pointer(None, StorageClass::Output, vec2);
    let ptr_out_vec4 = b.type_pointer(None, StorageClass::Output, vec4);

    let ubo = b.type_struct([vec2, vec2]);
    b.decorate(ubo, Decoration::Block, NO_OPERANDS);
    b.member_decorate(ubo, 0, Decoration::Offset, [Operand::LiteralBit32(0)]);
    b.member_decorate(ubo, 1, Decoration::Offset, [Operand::LiteralBit32(8)]);
    let ptr_uniform_ubo = b.type_pointer(None, StorageClass::Uniform, ubo);
    let ptr_uniform_vec2 = b.type_pointer(None, StorageClass::Uniform, vec2);

    let a_pos = b.variable(ptr_in_vec2, None, StorageClass::Input, None);
    let a_uv = b.variable(ptr_in_vec2, None, StorageClass::Input, None);
    let a_color = b.variable(ptr_in_vec4, None, StorageClass::Input, None);
    let out_color = b.variable(ptr_out_vec4, None, StorageClass::Output, None);
    let out_uv = b.variable(ptr_out_vec2, None, StorageClass::Output, None);
    let position = b.variable(ptr_out_vec4, None, StorageClass::Output, None);
    let pc = b.variable(ptr_uniform_ubo, None, StorageClass::Uniform, None);

    location(&mut b, a_pos, 0);
    location(&mut b, a_uv, 1);
    location(&mut b, a_color, 2);
    location(&mut b, out_color, 0);
    location(&mut b, out_uv, 1);
    b.decorate(
        position,
        Decoration::BuiltIn,
        [Operand::BuiltIn(BuiltIn::Position)],
    );
    b.decorate(pc, Decoration::DescriptorSet, [Operand::LiteralBit32(1)]);
    b.decorate(pc, Decoration::Binding, [Operand::LiteralBit32(0)]);

    let idx0 = b.constant_bit32(u32_ty, 0);
    let idx1 = b.constant_bit32(u32_ty, 1);
    let zero = b.constant_bit32(f32_ty, 0.0f32.to_bits());
    let one = b.constant_bit32(f32_ty, 1.0f32.to_bits());

    let main = b
        .begin_function(void, None, FunctionControl::NONE, fn_void)
        .map_err(spirv_err)?;
    b.begin_block(None).map_err(spirv_err)?;

    let color = b.load(vec4, None, a_color, None, NO_OPERANDS).map_err(spirv_err)?;
    b.store(out_color, color, None, NO_OPERANDS).map_err(spirv_err)?;
    let uv = b.load(vec2, None, a_uv, None, NO_OPERANDS).map_err(spirv_err)?;
    b.store(out_uv, uv, None, NO_OPERANDS).map_err(spirv_err)?;

    let scale_ptr = b
        .access_chain(ptr_uniform_vec2, None, pc, [idx0])
        .map_err(spirv_err)?;
    let translate_ptr = b
        .access_chain(ptr_uniform_vec2, None, pc, [idx1])
        .map_err(spirv_err)?;
    let scale = b.load(vec2, None, scale_ptr, None, NO_OPERANDS).map_err(spirv_err)?;
    let translate = b.load(vec2, None, translate_ptr, None, NO_OPERANDS).map_err(spirv_err)?;
    let pos = b.load(vec2, None, a_pos, None, NO_OPERANDS).map_err(spirv_err)?;
    let scaled = b.f_mul(vec2, None, pos, scale).map_err(spirv_err)?;
    let clip = b.f_add(vec2, None, scaled, translate).map_err(spirv_err)?;
    let x = b.composite_extract(f32_ty, None, clip, [0u32]).map_err(spirv_err)?;
    let y = b.composite_extract(f32_ty, None, clip, [1u32]).map_err(spirv_err)?;
    let flipped_y = b.f_negate(f32_ty, None, y).map_err(spirv_err)?;
    let gl_position = b
        .composite_construct(vec4, None, [x, flipped_y, zero, one])
        .map_err(spirv_err)?;
    b.store(position, gl_position, None, NO_OPERANDS).map_err(spirv_err)?;

    b.ret().map_err(spirv_err)?;
    b.end_function().map_err(spirv_err)?;

    b.entry_point(
        ExecutionModel::Vertex,
        main,
        SPIRV_ENTRY_POINT,
        [a_pos, a_uv, a_color, out_color, out_uv, position],
    );

    Ok(b.module().assemble())
}

/// ImGui fragment shader:
///
/// ```glsl
/// layout(set = 2, binding = 0) uniform sampler2D sTexture;
/// fColor = In.Color * texture(sTexture, In.UV.st);
/// ```
pub fn spirv_fragment_shader() -> RendererResult<Vec<u32>> {
    let mut b = new_shader_builder();

    let void = b.type_void();
    let fn_void = b.type_function(void, NO_WORDS);
    let f32_ty = b.type_float(32);
    let vec2 = b.type_vector(f32_ty, 2);
    let vec4 = b.type_vector(f32_ty, 4);
    let image = b.type_image(f32_ty, Dim::Dim2D, 0, 0, 0, 1, ImageFormat::Unknown, None);
    let sampled_image = b.type_sampled_image(image);

    let ptr_in_vec2 = b.type_pointer(None, StorageClass::Input, vec2);
    let ptr_in_vec4 = b.type_pointer(None, StorageClass::Input, vec4);
    let ptr_out_vec4 = b.type_pointer(None, StorageClass::Output, vec4);
    let ptr_sampled_image = b.type_pointer(None, StorageClass::UniformConstant, sampled_image);

    let in_color = b.variable(ptr_in_vec4, None, StorageClass::Input, None);
    let in_uv = b.variable(ptr_in_vec2, None, StorageClass::Input, None);
    let out_color = b.variable(ptr_out_vec4, None, StorageClass::Output, None);
    let texture = b.variable(ptr_sampled_image, None, StorageClass::UniformConstant, None);

    location(&mut b, in_color, 0);
    location(&mut b, in_uv, 1);
    location(&mut b, out_color, 0);
    b.decorate(texture, Decoration::DescriptorSet, [Operand::LiteralBit32(2)]);
    b.decorate(texture, Decoration::Binding, [Operand::LiteralBit32(0)]);

    let main = b
        .begin_function(void, None, FunctionControl::NONE, fn_void)
        .map_err(spirv_err)?;
    b.begin_block(None).map_err(spirv_err)?;

    let color = b.load(vec4, None, in_color, None, NO_OPERANDS).map_err(spirv_err)?;
    let uv = b.load(vec2, None, in_uv, None, NO_OPERANDS).map_err(spirv_err)?;
    let tex = b
        .load(sampled_image, None, texture, None, NO_OPERANDS)
        .map_err(spirv_err)?;
    let texel = b
        .image_sample_implicit_lod(vec4, None, tex, uv, None, NO_OPERANDS)
        .map_err(spirv_err)?;
    let result = b.f_mul(vec4, None, color, texel).map_err(spirv_err)?;
    b.store(out_color, result, None, NO_OPERANDS).map_err(spirv_err)?;

    b.ret().map_err(spirv_err)?;
    b.end_function().map_err(spirv_err)?;

    b.entry_point(
        ExecutionModel::Fragment,
        main,
        SPIRV_ENTRY_POINT,
        [in_color, in_uv, out_color],
    );
    b.execution_mode(main, ExecutionMode::OriginUpperLeft, NO_WORDS);

    Ok(b.module().assemble())
}

/// Shader manager
///
/// Owns the `SDL_GPUShader` pair used by the default pipeline.
pub struct ShaderManager {
    vertex: *mut SDL_GPUShader,
    fragment: *mut SDL_GPUShader,
}

impl ShaderManager {
    pub fn new() -> Self {
        Self {
            vertex: ptr::null_mut(),
            fragment: ptr::null_mut(),
        }
    }

    pub fn vertex(&self) -> *mut SDL_GPUShader {
        self.vertex
    }

    pub fn fragment(&self) -> *mut SDL_GPUShader {
        self.fragment
    }

    pub fn is_initialized(&self) -> bool {
        !self.vertex.is_null() && !self.fragment.is_null()
    }

    /// Create both shader stages on `device`, preferring `custom` when given.
    pub fn initialize(
        &mut self,
        device: *mut SDL_GPUDevice,
        custom: Option<&CustomShaders>,
    ) -> RendererResult<()> {
        self.destroy(device);

        let code = match custom {
            Some(shaders) => shaders.clone(),
            None => {
                let available = unsafe { SDL_GetGPUShaderFormats(device) };
                let flavour = BuiltinShaderFormat::select(available).ok_or_else(|| {
                    RendererError::UnsupportedShaderFormat(format!("{available:?}"))
                })?;
                tracing::debug!(
                    target: "dear-imgui-sdlgpu3",
                    "Using built-in {:?} shaders",
                    flavour
                );
                flavour.shaders()?
            }
        };

        self.vertex = create_shader(device, &code.vertex, SDL_GPU_SHADERSTAGE_VERTEX, 0, 1)?;
        match create_shader(device, &code.fragment, SDL_GPU_SHADERSTAGE_FRAGMENT, 1, 0) {
            Ok(fragment) => self.fragment = fragment,
            Err(e) => {
                self.destroy(device);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn destroy(&mut self, device: *mut SDL_GPUDevice) {
        unsafe {
            if !self.vertex.is_null() {
                SDL_ReleaseGPUShader(device, self.vertex);
            }
            if !self.fragment.is_null() {
                SDL_ReleaseGPUShader(device, self.fragment);
            }
        }
        self.vertex = ptr::null_mut();
        self.fragment = ptr::null_mut();
    }
}

impl Default for ShaderManager {
    fn default() -> Self {
        Self::new()
    }
}

fn create_shader(
    device: *mut SDL_GPUDevice,
    code: &ShaderCode,
    stage: SDL_GPUShaderStage,
    num_samplers: u32,
    num_uniform_buffers: u32,
) -> RendererResult<*mut SDL_GPUShader> {
    let entrypoint = CString::new(code.entrypoint.as_str()).map_err(|_| RendererError::Sdl {
        call: "SDL_CreateGPUShader",
        message: "entry point contains a NUL byte".to_string(),
    })?;
    let info = SDL_GPUShaderCreateInfo {
        code_size: code.code.len(),
        code: code.code.as_ptr(),
        entrypoint: entrypoint.as_ptr(),
        format: code.format,
        stage,
        num_samplers,
        num_storage_textures: 0,
        num_storage_buffers: 0,
        num_uniform_buffers,
        ..unsafe { std::mem::zeroed() }
    };
    let shader = unsafe { SDL_CreateGPUShader(device, &info) };
    if shader.is_null() {
        return Err(RendererError::sdl("SDL_CreateGPUShader"));
    }
    Ok(shader)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn spirv_modules_carry_magic_and_entry_point() {
        for words in [spirv_vertex_shader().unwrap(), spirv_fragment_shader().unwrap()] {
            assert!(words.len() > 5);
            assert_eq!(words[0], SPIRV_MAGIC);
            let bytes = words_to_bytes(&words);
            assert_eq!(bytes.len(), words.len() * 4);
            // OpEntryPoint name is stored as a NUL-padded literal string
            assert!(bytes.windows(5).any(|w| w == b"main\0"));
        }
    }

    #[test]
    fn spirv_vertex_module_parses_back() {
        let words = spirv_vertex_shader().unwrap();
        let module = rspirv::dr::load_words(&words).expect("valid module");
        assert_eq!(module.entry_points.len(), 1);
        let fragment =
            rspirv::dr::load_words(spirv_fragment_shader().unwrap()).expect("valid module");
        assert_eq!(fragment.execution_modes.len(), 1);
    }

    #[test]
    fn msl_sources_declare_both_stages() {
        assert!(MSL_VERTEX_SOURCE.contains("vertex VertexOut main0"));
        assert!(MSL_VERTEX_SOURCE.contains("[[buffer(0)]]"));
        assert!(MSL_FRAGMENT_SOURCE.contains("fragment float4 main0"));
        assert!(MSL_FRAGMENT_SOURCE.contains("[[texture(0)]]"));
    }

    #[test]
    fn format_selection_prefers_spirv() {
        assert_eq!(
            BuiltinShaderFormat::select(SDL_GPU_SHADERFORMAT_SPIRV | SDL_GPU_SHADERFORMAT_MSL),
            Some(BuiltinShaderFormat::Spirv)
        );
        assert_eq!(
            BuiltinShaderFormat::select(SDL_GPU_SHADERFORMAT_MSL | SDL_GPU_SHADERFORMAT_METALLIB),
            Some(BuiltinShaderFormat::Msl)
        );
        assert_eq!(BuiltinShaderFormat::select(SDL_GPU_SHADERFORMAT_DXIL), None);
    }

    #[test]
    fn builtin_shaders_use_matching_format() {
        let shaders = BuiltinShaderFormat::Msl.shaders().unwrap();
        assert!(shaders.vertex.format == SDL_GPU_SHADERFORMAT_MSL);
        assert_eq!(shaders.fragment.entrypoint, MSL_ENTRY_POINT);
    }
}
