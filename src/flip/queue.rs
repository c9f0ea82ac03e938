use {
    crate::{
        channel::{ChannelError, ChannelEvent, Drained, EventChannel, SubmitError},
        flip::barrier::FlipStamp,
        utils::{copyhashmap::CopyHashMap, numcell::NumCell},
        video::drm::{DrmCrtc, DrmFb},
    },
    std::{
        fmt::{Display, Formatter},
        num::NonZeroU32,
        rc::Rc,
    },
};

/// An opaque value that identifies a submitted event while it is in flight.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SequenceToken(NonZeroU32);

impl SequenceToken {
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    pub fn from_raw(raw: u64) -> Option<Self> {
        u32::try_from(raw)
            .ok()
            .and_then(NonZeroU32::new)
            .map(Self)
    }
}

impl Display for SequenceToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// An event waiting for the hardware. Exactly one of the two methods is
/// called.
pub trait QueuedEvent {
    fn complete(self: Box<Self>, stamp: FlipStamp);

    fn abort(self: Box<Self>);
}

struct PendingSequence {
    crtc: DrmCrtc,
    event: Box<dyn QueuedEvent>,
}

/// Maps sequence tokens to the events waiting for them.
pub struct SequenceRegistry {
    next: NumCell<u32>,
    max_pending: usize,
    pending: CopyHashMap<SequenceToken, PendingSequence>,
    // Tokens that were aborted locally while the hardware might still report
    // them. Late events for these are dropped. Counts against `max_pending`.
    retired: CopyHashMap<SequenceToken, DrmCrtc>,
}

impl SequenceRegistry {
    pub fn new(max_pending: usize) -> Self {
        Self {
            next: NumCell::new(1),
            max_pending: max_pending.min(u32::MAX as usize / 2),
            pending: Default::default(),
            retired: Default::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, token: SequenceToken) -> bool {
        self.pending.contains(&token)
    }

    /// The number of retired tokens that have not been forgotten yet.
    pub fn retired(&self) -> usize {
        self.retired.len()
    }

    /// Registers `event` for `crtc`. Returns `None` if too many events are
    /// pending or retired.
    pub fn allocate(&self, crtc: DrmCrtc, event: Box<dyn QueuedEvent>) -> Option<SequenceToken> {
        if self.pending.len() + self.retired.len() >= self.max_pending {
            return None;
        }
        loop {
            let raw = self.next.get();
            self.next.set(raw.wrapping_add(1));
            let Some(raw) = NonZeroU32::new(raw) else {
                continue;
            };
            let token = SequenceToken(raw);
            if self.pending.contains(&token) || self.retired.contains(&token) {
                continue;
            }
            self.pending.set(token, PendingSequence { crtc, event });
            return Some(token);
        }
    }

    /// Removes the event registered for `token`.
    ///
    /// # Panics
    ///
    /// Panics if no event is registered for the token. This means that the
    /// token was resolved twice.
    pub fn resolve_and_remove(&self, token: SequenceToken) -> Box<dyn QueuedEvent> {
        match self.pending.remove(&token) {
            Some(p) => p.event,
            None => panic!("Sequence {} was resolved but is not pending", token),
        }
    }

    /// Removes all events registered for `crtc` and remembers their tokens as
    /// retired.
    pub fn retire_pipe(&self, crtc: DrmCrtc) -> Vec<Box<dyn QueuedEvent>> {
        self.pending
            .take_matching(|_, p| p.crtc == crtc)
            .into_iter()
            .map(|(token, p)| {
                self.retired.set(token, p.crtc);
                p.event
            })
            .collect()
    }

    /// Forgets a retired token. Returns whether the token was retired.
    pub fn forget_retired(&self, token: SequenceToken) -> bool {
        self.retired.remove(&token).is_some()
    }

    /// Forgets the retired tokens of `crtc`. Called once the hardware has
    /// accepted a new flip on the crtc, which it only does after it has
    /// reported or dropped every earlier one.
    pub fn forget_retired_pipe(&self, crtc: DrmCrtc) -> usize {
        self.retired.take_matching(|_, c| *c == crtc).len()
    }
}

/// The sequence registry together with the event channel that delivers the
/// events.
pub struct FlipQueue {
    channel: Rc<dyn EventChannel>,
    registry: SequenceRegistry,
}

impl FlipQueue {
    pub fn new(channel: Rc<dyn EventChannel>, max_pending: usize) -> Self {
        Self {
            channel,
            registry: SequenceRegistry::new(max_pending),
        }
    }

    pub fn registry(&self) -> &SequenceRegistry {
        &self.registry
    }

    pub fn allocate(&self, crtc: DrmCrtc, event: Box<dyn QueuedEvent>) -> Option<SequenceToken> {
        self.registry.allocate(crtc, event)
    }

    pub fn submit(
        &self,
        crtc: DrmCrtc,
        fb: DrmFb,
        flags: u32,
        token: SequenceToken,
    ) -> Result<(), SubmitError> {
        self.channel.submit(crtc, fb, flags, token)
    }

    /// Dispatches all events that are ready without blocking.
    pub fn drain(&self) -> Result<Drained, ChannelError> {
        let mut events = vec![];
        if !self.channel.read_events(&mut events)? {
            return Ok(Drained::Empty);
        }
        let n = events.len();
        for event in events {
            self.dispatch(event);
        }
        Ok(Drained::Handled(n))
    }

    fn dispatch(&self, event: ChannelEvent) {
        let token = match event {
            ChannelEvent::Complete { token, .. } => token,
            ChannelEvent::Abort { token } => token,
        };
        if self.registry.forget_retired(token) {
            log::debug!("Dropping late event for aborted sequence {}", token);
            return;
        }
        let queued = self.registry.resolve_and_remove(token);
        match event {
            ChannelEvent::Complete { stamp, .. } => queued.complete(stamp),
            ChannelEvent::Abort { .. } => queued.abort(),
        }
    }

    /// Aborts a single event that the hardware has never seen.
    pub fn abort_seq(&self, token: SequenceToken) {
        self.registry.resolve_and_remove(token).abort();
    }

    /// Aborts all events pending on `crtc`, e.g. because the pipe was
    /// disabled. Returns the number of aborted events.
    pub fn abort_pipe(&self, crtc: DrmCrtc) -> usize {
        let events = self.registry.retire_pipe(crtc);
        let n = events.len();
        for event in events {
            event.abort();
        }
        n
    }
}
