use {
    crate::{
        channel::{Drained, SubmitError},
        flip::{
            FlipError,
            barrier::{FlipBarrier, FlipCompletion, FlipRecord},
        },
        pipe::DisplayPipe,
        screen::Screen,
        time::Time,
        utils::errorfmt::ErrorFmt,
        video::{
            ScanoutBuffer,
            drm::{DRM_MODE_PAGE_FLIP_ASYNC, DRM_MODE_PAGE_FLIP_EVENT},
        },
    },
    smallvec::SmallVec,
    std::rc::Rc,
};

/// The pipes that take part in a swap.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SwapTargets {
    /// All enabled pipes of the screen.
    All,
    /// Only the pipe with this vblank index. Falls back to all enabled pipes
    /// if there is no such pipe.
    Single(u32),
}

enum Queued {
    Submitted,
    /// The pipe was disabled before the flip could be submitted.
    Skipped,
}

pub struct SwapRequest {
    pub buffer: ScanoutBuffer,
    /// Don't wait for the refresh boundary.
    pub async_flip: bool,
    pub targets: SwapTargets,
    /// The vblank index of the pipe whose completion time is reported. Defaults
    /// to the targeted pipe of a single-pipe swap.
    pub reference: Option<u32>,
    pub completion: Box<dyn FlipCompletion>,
}

impl Screen {
    /// Flips the targeted pipes to `request.buffer`.
    ///
    /// If at least one pipe accepted the flip, this returns `Ok` and the
    /// completion is notified once all pipes have reported back. Otherwise the
    /// swap is rolled back: the completion has already been aborted, if the
    /// buffer could be imported at all, and the previous framebuffer is still
    /// installed. Pipes that get disabled while the swap is being queued are
    /// skipped.
    pub fn submit_swap(&self, request: SwapRequest) -> Result<(), FlipError> {
        let SwapRequest {
            buffer,
            async_flip,
            targets,
            reference,
            completion,
        } = request;

        let target = match targets {
            SwapTargets::All => None,
            SwapTargets::Single(vblank_pipe) => self.pipe(vblank_pipe),
        };
        let reference = reference.or(target.map(|p| p.vblank_pipe));
        let fb_slot = match target {
            Some(pipe) => pipe.fb.clone(),
            None => self.fb.clone(),
        };

        let old_fb = fb_slot.get();
        let new_fb = match self.device.import_framebuffer(&buffer) {
            Ok(fb) => fb,
            Err(e) => {
                let e = FlipError::ImportFramebuffer(e);
                log::warn!("Page flip failed: {}", ErrorFmt(&e));
                return Err(e);
            }
        };
        fb_slot.set(new_fb);
        let barrier = FlipBarrier::new(self.device.clone(), completion, fb_slot, old_fb);

        let mut flags = DRM_MODE_PAGE_FLIP_EVENT;
        if async_flip && self.config.async_flips {
            flags |= DRM_MODE_PAGE_FLIP_ASYNC;
        }

        let pipes: SmallVec<[Rc<DisplayPipe>; 4]> = self
            .pipes
            .iter()
            .filter(|p| p.is_enabled())
            .filter(|p| target.is_none_or(|t| Rc::ptr_eq(t, *p)))
            .cloned()
            .collect();

        let mut submitted = 0;
        let mut error = None;
        for pipe in &pipes {
            // A flip dispatched during an earlier retry might have disabled it.
            if !pipe.is_enabled() {
                continue;
            }
            let is_reference = reference == Some(pipe.vblank_pipe);
            match self.queue_flip_on_pipe(pipe, &barrier, is_reference, flags) {
                Ok(Queued::Submitted) => {
                    pipe.flipping_time.set(Some(Time::now_unchecked()));
                    submitted += 1;
                }
                Ok(Queued::Skipped) => {}
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        barrier.release_local_hold();

        match error {
            None if submitted > 0 => Ok(()),
            Some(e) if submitted > 0 => {
                log::warn!(
                    "Page flip only reached {} of {} pipes: {}",
                    submitted,
                    pipes.len(),
                    ErrorFmt(e),
                );
                Ok(())
            }
            error => {
                let e = error.unwrap_or(FlipError::NoPipes);
                log::warn!("Page flip failed: {}", ErrorFmt(&e));
                Err(e)
            }
        }
    }

    fn queue_flip_on_pipe(
        &self,
        pipe: &DisplayPipe,
        barrier: &Rc<FlipBarrier>,
        is_reference: bool,
        flags: u32,
    ) -> Result<Queued, FlipError> {
        let record = FlipRecord::new(barrier, is_reference);
        let Some(token) = self.queue.allocate(pipe.crtc, Box::new(record)) else {
            log::warn!("flip queue: could not allocate a sequence");
            return Err(FlipError::SequenceExhausted);
        };
        barrier.hold();

        let mut idle_retries = 0;
        let err = loop {
            let res = self.queue.submit(pipe.crtc, barrier.new_fb(), flags, token);
            match res {
                Ok(()) => {
                    barrier.mark_submitted();
                    self.queue.registry().forget_retired_pipe(pipe.crtc);
                    return Ok(Queued::Submitted);
                }
                Err(SubmitError::Rejected(e)) => {
                    break FlipError::Submit {
                        crtc: pipe.crtc,
                        source: e,
                    };
                }
                Err(SubmitError::ChannelFull) => {}
            }
            // The event queue is full. Dispatch whatever is ready and retry.
            match self.queue.drain() {
                Ok(Drained::Handled(_)) => idle_retries = 0,
                Ok(Drained::Empty) if idle_retries < self.config.max_idle_retries => {
                    idle_retries += 1;
                }
                Ok(Drained::Empty) => break FlipError::ChannelStalled { crtc: pipe.crtc },
                Err(e) => break FlipError::Drain(e),
            }
            // The drain can run handlers that disable this pipe. Its record
            // is then already aborted and must not be submitted or resolved
            // again.
            if !self.queue.registry().contains(token) {
                self.queue.registry().forget_retired(token);
                log::debug!("Crtc {} was disabled while queueing a page flip", pipe.crtc);
                return Ok(Queued::Skipped);
            }
            if !pipe.is_enabled() {
                self.queue.abort_seq(token);
                return Ok(Queued::Skipped);
            }
            log::warn!("flip queue retry");
        };
        log::warn!("flip queue failed: {}", ErrorFmt(&err));
        self.queue.abort_seq(token);
        Err(err)
    }
}
