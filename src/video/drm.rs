mod sys;
#[cfg(test)]
mod tests;

pub use sys::{DRM_MODE_PAGE_FLIP_ASYNC, DRM_MODE_PAGE_FLIP_EVENT};
use {
    crate::{
        channel::{ChannelError, ChannelEvent, EventChannel, SubmitError},
        flip::{FlipStamp, SequenceToken},
        pipe::ScanoutDevice,
        utils::oserror::OsError,
        video::{
            INVALID_MODIFIER, ScanoutBuffer,
            drm::sys::{
                DRM_EVENT_FLIP_COMPLETE, DRM_MODE_FB_MODIFIERS, drm_event, drm_event_vblank,
                mode_addfb2, mode_page_flip, mode_rmfb,
            },
        },
    },
    std::{
        fmt::{Debug, Display, Formatter},
        rc::Rc,
        slice,
    },
    thiserror::Error,
    uapi::{Errno, OwnedFd, c},
};

#[derive(Debug, Error)]
pub enum DrmError {
    #[error("Could not create a framebuffer")]
    AddFb(#[source] OsError),
    #[error("Could not delete a framebuffer")]
    RmFb(#[source] OsError),
}

macro_rules! drm_obj {
    ($name:ident) => {
        #[repr(transparent)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
        pub struct $name(pub u32);

        impl $name {
            pub const NONE: Self = Self(0);

            pub fn is_some(&self) -> bool {
                self.0 != 0
            }

            pub fn is_none(&self) -> bool {
                self.0 == 0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

drm_obj!(DrmCrtc);
drm_obj!(DrmFb);

const EVENT_BUF_SIZE: usize = 1024;

/// A DRM device node used both for framebuffer management and as the page
/// flip event channel.
pub struct DrmDevice {
    fd: Rc<OwnedFd>,
}

impl Debug for DrmDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrmDevice")
            .field("fd", &self.fd.raw())
            .finish()
    }
}

impl DrmDevice {
    pub fn new(fd: Rc<OwnedFd>) -> Self {
        Self { fd }
    }

    pub fn raw(&self) -> c::c_int {
        self.fd.raw()
    }

    fn poll_readable(&self) -> Result<bool, ChannelError> {
        let mut pollfd = c::pollfd {
            fd: self.fd.raw(),
            events: c::POLLIN,
            revents: 0,
        };
        loop {
            match uapi::poll(slice::from_mut(&mut pollfd), 0) {
                Ok(0) => return Ok(false),
                Ok(_) => return Ok(true),
                Err(Errno(c::EINTR | c::EAGAIN)) => {}
                Err(e) => return Err(ChannelError::Poll(e.into())),
            }
        }
    }
}

impl ScanoutDevice for DrmDevice {
    fn import_framebuffer(&self, buffer: &ScanoutBuffer) -> Result<DrmFb, DrmError> {
        let mut flags = 0;
        let mut modifiers = [0; 4];
        if buffer.modifier != INVALID_MODIFIER {
            flags |= DRM_MODE_FB_MODIFIERS;
            for (modifier, handle) in modifiers.iter_mut().zip(buffer.handles.iter()) {
                if *handle != 0 {
                    *modifier = buffer.modifier;
                }
            }
        }
        mode_addfb2(
            self.fd.raw(),
            buffer.width,
            buffer.height,
            buffer.format,
            flags,
            buffer.handles,
            buffer.pitches,
            buffer.offsets,
            modifiers,
        )
        .map_err(DrmError::AddFb)
    }

    fn destroy_framebuffer(&self, fb: DrmFb) -> Result<(), DrmError> {
        mode_rmfb(self.fd.raw(), fb).map_err(DrmError::RmFb)
    }
}

impl EventChannel for DrmDevice {
    fn submit(
        &self,
        crtc: DrmCrtc,
        fb: DrmFb,
        flags: u32,
        token: SequenceToken,
    ) -> Result<(), SubmitError> {
        match mode_page_flip(self.fd.raw(), crtc, fb, flags, token.raw() as u64) {
            Ok(()) => Ok(()),
            Err(OsError(c::EBUSY | c::ENOMEM)) => Err(SubmitError::ChannelFull),
            Err(e) => Err(SubmitError::Rejected(e)),
        }
    }

    fn read_events(&self, events: &mut Vec<ChannelEvent>) -> Result<bool, ChannelError> {
        if !self.poll_readable()? {
            return Ok(false);
        }
        let mut buf = [0u8; EVENT_BUF_SIZE];
        let buf = match uapi::read(self.fd.raw(), &mut buf[..]) {
            Ok(buf) => buf,
            Err(Errno(c::EAGAIN)) => return Ok(false),
            Err(e) => return Err(ChannelError::Read(e.into())),
        };
        parse_events(buf, events)?;
        Ok(true)
    }
}

/// Parses the events in a buffer returned by a read of a DRM fd. Only page
/// flip completions that carry a sequence token are returned.
fn parse_events(mut buf: &[u8], events: &mut Vec<ChannelEvent>) -> Result<(), ChannelError> {
    while buf.len() > 0 {
        let header: drm_event = match uapi::pod_read_init(buf) {
            Ok(e) => e,
            _ => return Err(ChannelError::InvalidRead),
        };
        let len = header.length as usize;
        if len < size_of::<drm_event>() || len > buf.len() {
            return Err(ChannelError::InvalidRead);
        }
        if header.ty == DRM_EVENT_FLIP_COMPLETE {
            if len < size_of::<drm_event_vblank>() {
                return Err(ChannelError::InvalidRead);
            }
            let event: drm_event_vblank = match uapi::pod_read_init(&buf[..len]) {
                Ok(e) => e,
                _ => return Err(ChannelError::InvalidRead),
            };
            match SequenceToken::from_raw(event.user_data) {
                Some(token) => events.push(ChannelEvent::Complete {
                    token,
                    stamp: FlipStamp {
                        frame: event.sequence as u64,
                        usec: event.tv_sec as u64 * 1_000_000 + event.tv_usec as u64,
                    },
                }),
                None => log::debug!(
                    "Ignoring flip event on crtc {} without a sequence token",
                    event.crtc_id
                ),
            }
        }
        buf = &buf[len..];
    }
    Ok(())
}
