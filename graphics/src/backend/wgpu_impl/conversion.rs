//! Type conversions between InsectRTS types and wgpu types.

use crate::types::BufferTarget;

/// Usages every buffer gets so it can be updated in place and read back.
const TRANSFER_USAGES: wgpu::BufferUsages =
    wgpu::BufferUsages::COPY_SRC.union(wgpu::BufferUsages::COPY_DST);

/// Convert a binding target to the wgpu usages its allocation needs.
pub fn convert_buffer_target(target: BufferTarget) -> wgpu::BufferUsages {
    let usage = match target {
        BufferTarget::ArrayBuffer => wgpu::BufferUsages::VERTEX,
        BufferTarget::ElementArrayBuffer => wgpu::BufferUsages::INDEX,
        BufferTarget::UniformBuffer => wgpu::BufferUsages::UNIFORM,
        BufferTarget::TextureBuffer
        | BufferTarget::TransformFeedbackBuffer
        | BufferTarget::ShaderStorageBuffer
        | BufferTarget::AtomicCounterBuffer => wgpu::BufferUsages::STORAGE,
        BufferTarget::DrawIndirectBuffer | BufferTarget::DispatchIndirectBuffer => {
            wgpu::BufferUsages::INDIRECT
        }
        BufferTarget::QueryBuffer => wgpu::BufferUsages::QUERY_RESOLVE,
        BufferTarget::PixelPackBuffer
        | BufferTarget::PixelUnpackBuffer
        | BufferTarget::CopyReadBuffer
        | BufferTarget::CopyWriteBuffer => wgpu::BufferUsages::empty(),
    };

    usage | TRANSFER_USAGES
}

/// Round `size` up to the copy alignment wgpu requires for writes and copies.
pub fn align_copy_size(size: u64) -> u64 {
    wgpu::util::align_to(size, wgpu::COPY_BUFFER_ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_target_is_copyable() {
        for target in BufferTarget::ALL {
            let usage = convert_buffer_target(target);
            assert!(usage.contains(wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST));
        }
    }

    #[test]
    fn test_target_usages() {
        assert!(convert_buffer_target(BufferTarget::ArrayBuffer).contains(wgpu::BufferUsages::VERTEX));
        assert!(
            convert_buffer_target(BufferTarget::ElementArrayBuffer)
                .contains(wgpu::BufferUsages::INDEX)
        );
        assert!(
            convert_buffer_target(BufferTarget::DispatchIndirectBuffer)
                .contains(wgpu::BufferUsages::INDIRECT)
        );
    }

    #[test]
    fn test_align_copy_size() {
        assert_eq!(align_copy_size(0), 0);
        assert_eq!(align_copy_size(1), 4);
        assert_eq!(align_copy_size(4), 4);
        assert_eq!(align_copy_size(13), 16);
    }
}
