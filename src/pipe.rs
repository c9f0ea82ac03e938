use {
    crate::{
        time::Time,
        video::{
            ScanoutBuffer,
            drm::{DrmCrtc, DrmError, DrmFb},
        },
    },
    std::{cell::Cell, rc::Rc, time::Duration},
};

/// The storage location of the framebuffer id that a pipe (or the screen as a
/// whole) currently scans out from.
pub type FbSlot = Rc<Cell<DrmFb>>;

/// Registers buffers with the display hardware.
pub trait ScanoutDevice {
    fn import_framebuffer(&self, buffer: &ScanoutBuffer) -> Result<DrmFb, DrmError>;

    fn destroy_framebuffer(&self, fb: DrmFb) -> Result<(), DrmError>;
}

/// The persistent state of one display pipe (CRTC).
#[derive(Debug)]
pub struct DisplayPipe {
    pub crtc: DrmCrtc,
    /// Index of the pipe in the vblank numbering of the device.
    pub vblank_pipe: u32,
    pub enabled: Cell<bool>,
    pub fb: FbSlot,
    pub flipping_time: Cell<Option<Time>>,
}

impl DisplayPipe {
    pub fn new(crtc: DrmCrtc, vblank_pipe: u32) -> Rc<Self> {
        Rc::new(Self {
            crtc,
            vblank_pipe,
            enabled: Cell::new(true),
            fb: Default::default(),
            flipping_time: Cell::new(None),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// The time since the last flip was accepted on this pipe.
    pub fn flip_age(&self) -> Option<Duration> {
        self.flipping_time.get().map(|t| t.elapsed())
    }

    /// The last flip time in milliseconds on the monotonic clock.
    pub fn flipping_time_ms(&self) -> Option<u64> {
        self.flipping_time.get().map(|t| t.msec())
    }
}
