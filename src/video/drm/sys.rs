#![allow(non_camel_case_types)]

use {
    crate::{
        utils::{compat::IoctlNumber, oserror::OsError},
        video::drm::{DrmCrtc, DrmFb},
    },
    uapi::{Pod, c},
};

pub unsafe fn ioctl<T>(fd: c::c_int, request: u64, t: &mut T) -> Result<c::c_int, OsError> {
    let mut ret;
    loop {
        ret = unsafe { c::ioctl(fd, request as IoctlNumber, &mut *t) };
        if ret != -1 {
            return Ok(ret);
        }
        let err = uapi::get_errno();
        if !matches!(err, c::EINTR | c::EAGAIN) {
            return Err(OsError(err));
        }
    }
}

pub const DRM_IOCTL_BASE: u64 = b'd' as u64;

pub const fn drm_iowr<T>(nr: u64) -> u64 {
    uapi::_IOWR::<T>(DRM_IOCTL_BASE, nr)
}

pub const DRM_MODE_PAGE_FLIP_EVENT: u32 = 0x01;
pub const DRM_MODE_PAGE_FLIP_ASYNC: u32 = 0x02;

#[repr(C)]
struct drm_mode_crtc_page_flip {
    crtc_id: u32,
    fb_id: u32,
    flags: u32,
    reserved: u32,
    user_data: u64,
}

const DRM_IOCTL_MODE_PAGE_FLIP: u64 = drm_iowr::<drm_mode_crtc_page_flip>(0xb0);

pub fn mode_page_flip(
    fd: c::c_int,
    crtc: DrmCrtc,
    fb: DrmFb,
    flags: u32,
    user_data: u64,
) -> Result<(), OsError> {
    let mut req = drm_mode_crtc_page_flip {
        crtc_id: crtc.0,
        fb_id: fb.0,
        flags,
        reserved: 0,
        user_data,
    };
    unsafe {
        ioctl(fd, DRM_IOCTL_MODE_PAGE_FLIP, &mut req)?;
    }
    Ok(())
}

#[repr(C)]
struct drm_mode_fb_cmd2 {
    fb_id: u32,
    width: u32,
    height: u32,
    pixel_format: u32,
    flags: u32,
    handles: [u32; 4],
    pitches: [u32; 4],
    offsets: [u32; 4],
    modifiers: [u64; 4],
}

pub const DRM_MODE_FB_MODIFIERS: u32 = 1 << 1;

const DRM_IOCTL_MODE_ADDFB2: u64 = drm_iowr::<drm_mode_fb_cmd2>(0xb8);

#[allow(clippy::too_many_arguments)]
pub fn mode_addfb2(
    fd: c::c_int,
    width: u32,
    height: u32,
    pixel_format: u32,
    flags: u32,
    handles: [u32; 4],
    strides: [u32; 4],
    offsets: [u32; 4],
    modifiers: [u64; 4],
) -> Result<DrmFb, OsError> {
    let mut res = drm_mode_fb_cmd2 {
        fb_id: 0,
        width,
        height,
        pixel_format,
        flags,
        handles,
        pitches: strides,
        offsets,
        modifiers,
    };
    unsafe {
        ioctl(fd, DRM_IOCTL_MODE_ADDFB2, &mut res)?;
    }
    Ok(DrmFb(res.fb_id))
}

const DRM_IOCTL_MODE_RMFB: u64 = drm_iowr::<c::c_uint>(0xaf);

pub fn mode_rmfb(fd: c::c_int, id: DrmFb) -> Result<(), OsError> {
    let mut res = id.0 as c::c_uint;
    unsafe {
        ioctl(fd, DRM_IOCTL_MODE_RMFB, &mut res)?;
    }
    Ok(())
}

pub const DRM_EVENT_FLIP_COMPLETE: u32 = 0x02;

#[repr(C)]
pub struct drm_event {
    pub ty: u32,
    pub length: u32,
}

unsafe impl Pod for drm_event {}

#[repr(C)]
pub struct drm_event_vblank {
    pub base: drm_event,
    pub user_data: u64,
    pub tv_sec: u32,
    pub tv_usec: u32,
    pub sequence: u32,
    pub crtc_id: u32,
}

unsafe impl Pod for drm_event_vblank {}
