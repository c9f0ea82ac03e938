use {
    crate::{
        channel::{ChannelError, Drained, EventChannel},
        config::FlipConfig,
        flip::FlipQueue,
        pipe::{DisplayPipe, FbSlot, ScanoutDevice},
        video::drm::{DrmCrtc, DrmDevice},
    },
    std::rc::Rc,
};

/// The display pipes of one device together with the machinery to flip them.
pub struct Screen {
    pub device: Rc<dyn ScanoutDevice>,
    pub queue: FlipQueue,
    pub pipes: Vec<Rc<DisplayPipe>>,
    /// The framebuffer slot used when a swap is not tied to a single pipe.
    pub fb: FbSlot,
    pub config: FlipConfig,
}

impl Screen {
    pub fn new(
        device: Rc<dyn ScanoutDevice>,
        channel: Rc<dyn EventChannel>,
        pipes: Vec<Rc<DisplayPipe>>,
        config: FlipConfig,
    ) -> Self {
        Self {
            device,
            queue: FlipQueue::new(channel, config.max_pending_sequences),
            pipes,
            fb: Default::default(),
            config,
        }
    }

    pub fn with_drm(drm: &Rc<DrmDevice>, pipes: Vec<Rc<DisplayPipe>>, config: FlipConfig) -> Self {
        Self::new(drm.clone(), drm.clone(), pipes, config)
    }

    pub fn pipe(&self, vblank_pipe: u32) -> Option<&Rc<DisplayPipe>> {
        self.pipes.iter().find(|p| p.vblank_pipe == vblank_pipe)
    }

    pub fn pipe_by_crtc(&self, crtc: DrmCrtc) -> Option<&Rc<DisplayPipe>> {
        self.pipes.iter().find(|p| p.crtc == crtc)
    }

    /// Dispatches the flip events that are ready. Meant to be called when the
    /// event channel becomes readable.
    pub fn drain(&self) -> Result<Drained, ChannelError> {
        self.queue.drain()
    }

    /// Disables a pipe and aborts the flips pending on it.
    pub fn disable_pipe(&self, crtc: DrmCrtc) {
        let Some(pipe) = self.pipe_by_crtc(crtc) else {
            log::warn!("Cannot disable unknown crtc {}", crtc);
            return;
        };
        pipe.enabled.set(false);
        let n = self.queue.abort_pipe(crtc);
        if n > 0 {
            log::debug!("Aborted {} pending flips on crtc {}", n, crtc);
        }
    }

    pub fn enable_pipe(&self, crtc: DrmCrtc) {
        match self.pipe_by_crtc(crtc) {
            Some(pipe) => pipe.enabled.set(true),
            None => log::warn!("Cannot enable unknown crtc {}", crtc),
        }
    }
}
