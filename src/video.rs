pub mod drm;

pub type Modifier = u64;

pub const INVALID_MODIFIER: Modifier = 0x00ff_ffff_ffff_ffff;

/// A buffer that can be scanned out once it has been registered with the
/// display hardware as a framebuffer.
#[derive(Clone, Debug)]
pub struct ScanoutBuffer {
    pub width: u32,
    pub height: u32,
    /// DRM fourcc code.
    pub format: u32,
    pub modifier: Modifier,
    pub handles: [u32; 4],
    pub pitches: [u32; 4],
    pub offsets: [u32; 4],
}

impl ScanoutBuffer {
    /// A single-plane buffer without an explicit modifier, e.g. a dumb buffer.
    pub fn linear(width: u32, height: u32, format: u32, handle: u32, pitch: u32) -> Self {
        Self {
            width,
            height,
            format,
            modifier: INVALID_MODIFIER,
            handles: [handle, 0, 0, 0],
            pitches: [pitch, 0, 0, 0],
            offsets: [0; 4],
        }
    }
}
