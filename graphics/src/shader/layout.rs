//! Shader layout bookkeeping.
//!
//! The layout is the builder's contract with the binding layer: attribute
//! offsets, strides, and binding slots are computed here exactly once, and
//! the binding layer allocates memory purely from this description. Nothing
//! downstream may reorder, rename, or resize a declared field.

bitflags::bitflags! {
    /// Shader stages that can access a binding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Fragment shader stage.
        const FRAGMENT = 1 << 1;
    }
}

/// Data type of a declared attribute or uniform.
///
/// The component/size/alignment table is fixed and immutable; all layout
/// arithmetic derives from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    /// A sampled 2D texture (own binding slot, no byte layout).
    Texture2d,
    /// A texture sampler (own binding slot, no byte layout).
    Sampler,
}

impl ShaderType {
    /// Number of f32/i32 components.
    pub fn components(&self) -> u32 {
        match self {
            Self::Float | Self::Int => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
            Self::Texture2d | Self::Sampler => 0,
        }
    }

    /// Size of one component in bytes.
    pub fn component_size(&self) -> u32 {
        match self {
            Self::Texture2d | Self::Sampler => 0,
            _ => 4,
        }
    }

    /// Total byte size (`components * component_size`).
    pub fn byte_size(&self) -> u32 {
        self.components() * self.component_size()
    }

    /// Alignment inside a packed uniform block (WGSL uniform rules).
    ///
    /// `Mat3` is never placed in a block here; its padded-column layout
    /// would not match `byte_size`.
    pub fn block_align(&self) -> u32 {
        match self {
            Self::Float | Self::Int => 4,
            Self::Vec2 | Self::Mat2 => 8,
            Self::Vec3 | Self::Vec4 | Self::Mat3 | Self::Mat4 => 16,
            Self::Texture2d | Self::Sampler => 0,
        }
    }
}

/// Closed set of uniforms a generated program can declare.
///
/// Replaces the string-keyed setter tables of older designs: the binding
/// layer updates uniforms through an exhaustive match over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// Per-instance world transform (absent on static elements).
    Transformation,
    /// Perspective projection matrix.
    Perspective,
    /// Sprite-sheet UV offset for 2D animation.
    AnimationOffset,
    /// Displacement-map strength.
    BumpScale,
    /// Skinning matrix array, one mat4 per bone.
    BoneMatrices,
    /// The sampled color texture.
    DiffuseTexture,
    /// Sampler for the color texture (WGSL dialect only).
    DiffuseSampler,
    /// The displacement-map texture.
    DisplacementMap,
    /// Sampler for the displacement map (WGSL dialect only).
    DisplacementSampler,
}

impl UniformKind {
    /// The declared name, identical in both shader dialects.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Transformation => "transformation",
            Self::Perspective => "perspective",
            Self::AnimationOffset => "animation_offset",
            Self::BumpScale => "bump_scale",
            Self::BoneMatrices => "bones",
            Self::DiffuseTexture => "diffuse_texture",
            Self::DiffuseSampler => "diffuse_sampler",
            Self::DisplacementMap => "displacement_map",
            Self::DisplacementSampler => "displacement_sampler",
        }
    }

    /// Declared data type.
    pub fn ty(&self) -> ShaderType {
        match self {
            Self::Transformation | Self::Perspective | Self::BoneMatrices => ShaderType::Mat4,
            Self::AnimationOffset => ShaderType::Vec2,
            Self::BumpScale => ShaderType::Float,
            Self::DiffuseTexture | Self::DisplacementMap => ShaderType::Texture2d,
            Self::DiffuseSampler | Self::DisplacementSampler => ShaderType::Sampler,
        }
    }

    /// Whether the uniform packs into the shared uniform block.
    ///
    /// Textures, samplers, and the bone-matrix array each consume their own
    /// binding slot instead.
    pub fn is_packed(&self) -> bool {
        matches!(
            self,
            Self::Transformation | Self::Perspective | Self::AnimationOffset | Self::BumpScale
        )
    }

    /// Stages that read this uniform.
    pub fn visibility(&self) -> ShaderStageFlags {
        match self {
            Self::Transformation
            | Self::Perspective
            | Self::AnimationOffset
            | Self::BumpScale
            | Self::BoneMatrices
            | Self::DisplacementMap
            | Self::DisplacementSampler => ShaderStageFlags::VERTEX,
            Self::DiffuseTexture | Self::DiffuseSampler => ShaderStageFlags::FRAGMENT,
        }
    }
}

/// One interleaved vertex attribute in the generated program.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSlot {
    /// Declared name.
    pub name: &'static str,
    /// Data type.
    pub ty: ShaderType,
    /// Number of components.
    pub components: u32,
    /// Total byte size within a vertex.
    pub byte_size: u32,
    /// Byte offset from the start of a vertex.
    pub offset: u32,
    /// Shader location, assigned in declaration order.
    pub location: u32,
}

/// One uniform in the generated program.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSlot {
    /// Which uniform this is.
    pub kind: UniformKind,
    /// Data type.
    pub ty: ShaderType,
    /// Number of components (per array element).
    pub components: u32,
    /// Byte offset inside the packed uniform block; zero for own-slot
    /// bindings.
    pub offset: u32,
    /// Binding slot: bind-group entry for the WGSL dialect, texture unit
    /// for GLSL textures. Packed uniforms all report the shared block slot.
    pub binding: u32,
    /// Array length (1 except for the bone-matrix array).
    pub array_len: u32,
    /// Stages that read this uniform.
    pub visibility: ShaderStageFlags,
}

/// The builder's emitted layout: the binding layer's sole contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramLayout {
    /// Interleaved attributes in declaration order.
    pub attributes: Vec<AttributeSlot>,
    /// Uniforms in declaration order.
    pub uniforms: Vec<UniformSlot>,
    /// Binding names in slot order. The shared uniform block appears once as
    /// `"uniform_block"` at the position of its first packed member.
    pub binding_order: Vec<&'static str>,
    /// Total bytes per interleaved vertex.
    pub attribute_stride: u32,
    /// Total bytes of the packed uniform block (unpadded).
    pub uniform_stride: u32,
}

impl ProgramLayout {
    /// Look up a declared uniform.
    pub fn uniform(&self, kind: UniformKind) -> Option<&UniformSlot> {
        self.uniforms.iter().find(|u| u.kind == kind)
    }

    /// Whether the program declared a uniform.
    pub fn has_uniform(&self, kind: UniformKind) -> bool {
        self.uniform(kind).is_some()
    }

    /// Look up a declared attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSlot> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Bone count when skeletal animation was requested.
    pub fn bone_count(&self) -> Option<u32> {
        self.uniform(UniformKind::BoneMatrices).map(|u| u.array_len)
    }
}

/// Name of the shared packed uniform block in the binding order.
pub const UNIFORM_BLOCK_BINDING: &str = "uniform_block";

/// Accumulates declarations and computes offsets, strides, and slots.
#[derive(Debug)]
pub(crate) struct LayoutBuilder {
    attributes: Vec<AttributeSlot>,
    uniforms: Vec<UniformSlot>,
    binding_order: Vec<&'static str>,
    attribute_offset: u32,
    packed_offset: u32,
    next_binding: u32,
    block_slot: Option<u32>,
}

impl LayoutBuilder {
    pub(crate) fn new() -> Self {
        Self {
            attributes: Vec::new(),
            uniforms: Vec::new(),
            binding_order: Vec::new(),
            attribute_offset: 0,
            packed_offset: 0,
            next_binding: 0,
            block_slot: None,
        }
    }

    /// Declare an interleaved attribute. Offset and location accumulate in
    /// declaration order.
    pub(crate) fn attribute(&mut self, name: &'static str, ty: ShaderType) {
        let byte_size = ty.byte_size();
        self.attributes.push(AttributeSlot {
            name,
            ty,
            components: ty.components(),
            byte_size,
            offset: self.attribute_offset,
            location: self.attributes.len() as u32,
        });
        self.attribute_offset += byte_size;
    }

    /// Declare a uniform. Packed uniforms accumulate block offsets honoring
    /// block alignment and share one binding slot; everything else takes the
    /// next slot in declaration order.
    pub(crate) fn uniform(&mut self, kind: UniformKind, array_len: u32) {
        let ty = kind.ty();
        let (offset, binding) = if kind.is_packed() {
            let aligned = align_to(self.packed_offset, ty.block_align());
            let slot = match self.block_slot {
                Some(slot) => slot,
                None => {
                    let slot = self.take_slot(UNIFORM_BLOCK_BINDING);
                    self.block_slot = Some(slot);
                    slot
                }
            };
            self.packed_offset = aligned + ty.byte_size() * array_len;
            (aligned, slot)
        } else {
            (0, self.take_slot(kind.name()))
        };
        self.uniforms.push(UniformSlot {
            kind,
            ty,
            components: ty.components(),
            offset,
            binding,
            array_len,
            visibility: kind.visibility(),
        });
    }

    fn take_slot(&mut self, name: &'static str) -> u32 {
        let slot = self.next_binding;
        self.next_binding += 1;
        self.binding_order.push(name);
        slot
    }

    pub(crate) fn finish(self) -> ProgramLayout {
        ProgramLayout {
            attributes: self.attributes,
            uniforms: self.uniforms,
            binding_order: self.binding_order,
            attribute_stride: self.attribute_offset,
            uniform_stride: self.packed_offset,
        }
    }
}

/// Round `offset` up to `align` (no-op for zero alignment).
pub(crate) fn align_to(offset: u32, align: u32) -> u32 {
    if align == 0 {
        return offset;
    }
    offset.div_ceil(align) * align
}
