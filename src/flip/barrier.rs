use {
    crate::{
        flip::queue::QueuedEvent,
        pipe::{FbSlot, ScanoutDevice},
        utils::errorfmt::ErrorFmt,
        video::drm::DrmFb,
    },
    std::{
        cell::RefCell,
        fmt::{Debug, Formatter},
        mem,
        rc::Rc,
    },
};

/// The vblank counter and time (in microseconds) at which a flip completed.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FlipStamp {
    pub frame: u64,
    pub usec: u64,
}

/// Receives the outcome of a swap. Exactly one of the two methods is called,
/// exactly once.
pub trait FlipCompletion {
    fn flipped(self: Box<Self>, stamp: FlipStamp);

    fn aborted(self: Box<Self>);
}

/// Tracks the per-pipe flips of one swap and finalizes the swap once all of
/// them have been resolved and the submitter has released its hold.
pub struct FlipBarrier {
    device: Rc<dyn ScanoutDevice>,
    new_fb: DrmFb,
    state: RefCell<BarrierState>,
}

enum BarrierState {
    Pending(PendingSwap),
    Finalized,
}

struct PendingSwap {
    holds: usize,
    local_hold: bool,
    submitted: bool,
    reference_stamp: Option<FlipStamp>,
    first_stamp: Option<FlipStamp>,
    completion: Box<dyn FlipCompletion>,
    old_fb: DrmFb,
    fb_slot: FbSlot,
}

impl Debug for FlipBarrier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("FlipBarrier");
        s.field("new_fb", &self.new_fb);
        match &*self.state.borrow() {
            BarrierState::Pending(p) => s
                .field("holds", &p.holds)
                .field("local_hold", &p.local_hold)
                .field("old_fb", &p.old_fb),
            BarrierState::Finalized => s.field("finalized", &true),
        };
        s.finish_non_exhaustive()
    }
}

impl FlipBarrier {
    /// Creates a barrier for a swap from `old_fb` to the framebuffer currently
    /// stored in `fb_slot`.
    ///
    /// The barrier starts out with the local hold of the caller.
    pub fn new(
        device: Rc<dyn ScanoutDevice>,
        completion: Box<dyn FlipCompletion>,
        fb_slot: FbSlot,
        old_fb: DrmFb,
    ) -> Rc<Self> {
        Rc::new(Self {
            device,
            new_fb: fb_slot.get(),
            state: RefCell::new(BarrierState::Pending(PendingSwap {
                holds: 1,
                local_hold: true,
                submitted: false,
                reference_stamp: None,
                first_stamp: None,
                completion,
                old_fb,
                fb_slot,
            })),
        })
    }

    pub fn new_fb(&self) -> DrmFb {
        self.new_fb
    }

    pub fn is_finalized(&self) -> bool {
        matches!(*self.state.borrow(), BarrierState::Finalized)
    }

    /// The number of unresolved flips plus the local hold, if it is still held.
    pub fn outstanding(&self) -> usize {
        match &*self.state.borrow() {
            BarrierState::Pending(p) => p.holds,
            BarrierState::Finalized => 0,
        }
    }

    /// Takes a reference for a flip record that has been registered.
    pub fn hold(&self) {
        match &mut *self.state.borrow_mut() {
            BarrierState::Pending(p) => p.holds += 1,
            BarrierState::Finalized => panic!("Cannot add a flip to a finalized swap"),
        }
    }

    /// Records that at least one pipe accepted the flip. From now on an
    /// aborted swap reclaims the old framebuffer instead of the new one.
    pub fn mark_submitted(&self) {
        if let BarrierState::Pending(p) = &mut *self.state.borrow_mut() {
            p.submitted = true;
        }
    }

    pub fn release_local_hold(&self) {
        self.drop_hold(|p| {
            if !p.local_hold {
                panic!("The local hold of a swap was released twice");
            }
            p.local_hold = false;
        });
    }

    /// Resolves one flip record. `stamp` is `None` if the flip was aborted.
    pub fn resolve(&self, record: FlipRecord, stamp: Option<FlipStamp>) {
        debug_assert!(std::ptr::eq(&*record.barrier, self));
        self.drop_hold(|p| {
            let Some(stamp) = stamp else {
                return;
            };
            if record.reference {
                p.reference_stamp = Some(stamp);
            } else if p.first_stamp.is_none() {
                p.first_stamp = Some(stamp);
            }
        });
    }

    fn drop_hold(&self, f: impl FnOnce(&mut PendingSwap)) {
        let swap = {
            let mut state = self.state.borrow_mut();
            let BarrierState::Pending(swap) = &mut *state else {
                panic!("A page flip was resolved after its swap was finalized");
            };
            f(swap);
            swap.holds -= 1;
            if swap.holds > 0 {
                return;
            }
            match mem::replace(&mut *state, BarrierState::Finalized) {
                BarrierState::Pending(swap) => swap,
                BarrierState::Finalized => unreachable!(),
            }
        };
        self.finalize(swap);
    }

    fn finalize(&self, swap: PendingSwap) {
        let reclaim = match swap.reference_stamp.or(swap.first_stamp) {
            Some(stamp) => {
                swap.completion.flipped(stamp);
                swap.old_fb
            }
            None => {
                swap.completion.aborted();
                if swap.submitted {
                    swap.old_fb
                } else {
                    if swap.fb_slot.get() == self.new_fb {
                        swap.fb_slot.set(swap.old_fb);
                    }
                    self.new_fb
                }
            }
        };
        if reclaim.is_none() {
            return;
        }
        if let Err(e) = self.device.destroy_framebuffer(reclaim) {
            log::error!("Could not delete framebuffer {}: {}", reclaim, ErrorFmt(e));
        }
    }
}

/// The part of a swap that concerns a single pipe. Owned by the sequence
/// registry until the flip is completed or aborted.
pub struct FlipRecord {
    barrier: Rc<FlipBarrier>,
    reference: bool,
}

impl FlipRecord {
    pub fn new(barrier: &Rc<FlipBarrier>, reference: bool) -> Self {
        Self {
            barrier: barrier.clone(),
            reference,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference
    }
}

impl QueuedEvent for FlipRecord {
    fn complete(self: Box<Self>, stamp: FlipStamp) {
        let barrier = self.barrier.clone();
        barrier.resolve(*self, Some(stamp));
    }

    fn abort(self: Box<Self>) {
        let barrier = self.barrier.clone();
        barrier.resolve(*self, None);
    }
}
