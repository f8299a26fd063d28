//! Buffer binding targets and usage hints.

use std::fmt;

/// The binding point a buffer is used through.
///
/// A buffer's target is chosen at construction and never changes. It decides
/// which slot [`Buffer::bind`](crate::Buffer::bind) occupies and, on the wgpu
/// backend, which usages the GPU allocation is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute source.
    ArrayBuffer,
    /// Index source for indexed draws.
    ElementArrayBuffer,
    /// Destination of pixel read-backs.
    PixelPackBuffer,
    /// Source of texture uploads.
    PixelUnpackBuffer,
    /// Uniform block storage.
    UniformBuffer,
    /// Texel data for buffer textures.
    TextureBuffer,
    /// Transform feedback output.
    TransformFeedbackBuffer,
    /// Copy source.
    CopyReadBuffer,
    /// Copy destination.
    CopyWriteBuffer,
    /// Indirect draw arguments.
    DrawIndirectBuffer,
    /// Shader storage block.
    ShaderStorageBuffer,
    /// Indirect dispatch arguments.
    DispatchIndirectBuffer,
    /// Query result storage.
    QueryBuffer,
    /// Atomic counter storage.
    AtomicCounterBuffer,
}

impl BufferTarget {
    /// Every target, in declaration order.
    pub const ALL: [BufferTarget; 14] = [
        Self::ArrayBuffer,
        Self::ElementArrayBuffer,
        Self::PixelPackBuffer,
        Self::PixelUnpackBuffer,
        Self::UniformBuffer,
        Self::TextureBuffer,
        Self::TransformFeedbackBuffer,
        Self::CopyReadBuffer,
        Self::CopyWriteBuffer,
        Self::DrawIndirectBuffer,
        Self::ShaderStorageBuffer,
        Self::DispatchIndirectBuffer,
        Self::QueryBuffer,
        Self::AtomicCounterBuffer,
    ];

    /// Get a stable name for this target, used in logs and labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ArrayBuffer => "ArrayBuffer",
            Self::ElementArrayBuffer => "ElementArrayBuffer",
            Self::PixelPackBuffer => "PixelPackBuffer",
            Self::PixelUnpackBuffer => "PixelUnpackBuffer",
            Self::UniformBuffer => "UniformBuffer",
            Self::TextureBuffer => "TextureBuffer",
            Self::TransformFeedbackBuffer => "TransformFeedbackBuffer",
            Self::CopyReadBuffer => "CopyReadBuffer",
            Self::CopyWriteBuffer => "CopyWriteBuffer",
            Self::DrawIndirectBuffer => "DrawIndirectBuffer",
            Self::ShaderStorageBuffer => "ShaderStorageBuffer",
            Self::DispatchIndirectBuffer => "DispatchIndirectBuffer",
            Self::QueryBuffer => "QueryBuffer",
            Self::AtomicCounterBuffer => "AtomicCounterBuffer",
        }
    }
}

impl fmt::Display for BufferTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Hint describing how often a buffer's contents change and who reads them.
///
/// Hints only take effect when a buffer's GPU storage is (re)allocated. An
/// in-place update keeps whatever hint the current allocation was made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsageHint {
    /// Written once, drawn a few times.
    StreamDraw,
    /// Written once by the GPU, read a few times by the CPU.
    StreamRead,
    /// Written once by the GPU, used a few times by the GPU.
    StreamCopy,
    /// Written once, drawn many times.
    StaticDraw,
    /// Written once by the GPU, read many times by the CPU.
    StaticRead,
    /// Written once by the GPU, used many times by the GPU.
    StaticCopy,
    /// Rewritten often, drawn many times.
    #[default]
    DynamicDraw,
    /// Rewritten often by the GPU, read many times by the CPU.
    DynamicRead,
    /// Rewritten often by the GPU, used many times by the GPU.
    DynamicCopy,
}

impl BufferUsageHint {
    /// Get a stable name for this hint.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StreamDraw => "StreamDraw",
            Self::StreamRead => "StreamRead",
            Self::StreamCopy => "StreamCopy",
            Self::StaticDraw => "StaticDraw",
            Self::StaticRead => "StaticRead",
            Self::StaticCopy => "StaticCopy",
            Self::DynamicDraw => "DynamicDraw",
            Self::DynamicRead => "DynamicRead",
            Self::DynamicCopy => "DynamicCopy",
        }
    }
}

impl fmt::Display for BufferUsageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
