use {
    crate::{
        flip::{FlipStamp, SequenceToken},
        utils::oserror::OsError,
        video::drm::{DrmCrtc, DrmFb},
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("The event channel is full")]
    ChannelFull,
    #[error("The page flip was rejected")]
    Rejected(#[source] OsError),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Could not poll the event channel")]
    Poll(#[source] OsError),
    #[error("Could not read from the event channel")]
    Read(#[source] OsError),
    #[error("Read invalid data from the event channel")]
    InvalidRead,
}

/// A notification delivered by the hardware for a previously submitted flip.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelEvent {
    Complete {
        token: SequenceToken,
        stamp: FlipStamp,
    },
    Abort {
        token: SequenceToken,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Drained {
    Empty,
    Handled(usize),
}

/// The asynchronous, bounded path through which page flips are submitted and
/// their completions are reported.
pub trait EventChannel {
    /// Submits a flip of `crtc` to `fb`. The token is reported back with the
    /// completion of this flip.
    fn submit(
        &self,
        crtc: DrmCrtc,
        fb: DrmFb,
        flags: u32,
        token: SequenceToken,
    ) -> Result<(), SubmitError>;

    /// Reads whatever events are ready without blocking.
    ///
    /// Returns `false` if nothing was ready.
    fn read_events(&self, events: &mut Vec<ChannelEvent>) -> Result<bool, ChannelError>;
}
