mod barrier;
mod queue;
mod swap;

pub use {
    barrier::{FlipBarrier, FlipCompletion, FlipRecord, FlipStamp},
    queue::{FlipQueue, QueuedEvent, SequenceRegistry, SequenceToken},
    swap::{SwapRequest, SwapTargets},
};
use {
    crate::{
        channel::ChannelError,
        utils::oserror::OsError,
        video::drm::{DrmCrtc, DrmError},
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum FlipError {
    #[error("Could not import the new framebuffer")]
    ImportFramebuffer(#[source] DrmError),
    #[error("Could not allocate a flip sequence")]
    SequenceExhausted,
    #[error("Could not queue a page flip on crtc {crtc}")]
    Submit {
        crtc: DrmCrtc,
        #[source]
        source: OsError,
    },
    #[error("Could not drain the event channel")]
    Drain(#[source] ChannelError),
    #[error("The event channel stayed full while queueing a page flip on crtc {crtc}")]
    ChannelStalled { crtc: DrmCrtc },
    #[error("There are no enabled pipes to flip")]
    NoPipes,
}
