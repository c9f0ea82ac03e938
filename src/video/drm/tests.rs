use crate::{
    channel::{ChannelError, ChannelEvent},
    flip::{FlipStamp, SequenceToken},
    video::drm::{
        parse_events,
        sys::{DRM_EVENT_FLIP_COMPLETE, drm_event, drm_event_vblank},
    },
};

const DRM_EVENT_VBLANK: u32 = 0x01;

fn vblank_event(ty: u32, user_data: u64, tv_sec: u32, tv_usec: u32, sequence: u32) -> Vec<u8> {
    let mut buf = vec![];
    buf.extend_from_slice(&ty.to_ne_bytes());
    buf.extend_from_slice(&(size_of::<drm_event_vblank>() as u32).to_ne_bytes());
    buf.extend_from_slice(&user_data.to_ne_bytes());
    buf.extend_from_slice(&tv_sec.to_ne_bytes());
    buf.extend_from_slice(&tv_usec.to_ne_bytes());
    buf.extend_from_slice(&sequence.to_ne_bytes());
    buf.extend_from_slice(&41u32.to_ne_bytes());
    assert_eq!(buf.len(), size_of::<drm_event_vblank>());
    buf
}

fn flip(user_data: u64, tv_sec: u32, tv_usec: u32, sequence: u32) -> Vec<u8> {
    vblank_event(DRM_EVENT_FLIP_COMPLETE, user_data, tv_sec, tv_usec, sequence)
}

fn token(raw: u64) -> SequenceToken {
    SequenceToken::from_raw(raw).unwrap()
}

fn parse(buf: &[u8]) -> Result<Vec<ChannelEvent>, ChannelError> {
    let mut events = vec![];
    parse_events(buf, &mut events).map(|_| events)
}

#[test]
fn flip_completions() {
    let mut buf = flip(3, 2, 500, 77);
    buf.extend(flip(4, 3, 0, 78));
    let events = parse(&buf).unwrap();
    assert_eq!(
        events,
        [
            ChannelEvent::Complete {
                token: token(3),
                stamp: FlipStamp {
                    frame: 77,
                    usec: 2_000_500,
                },
            },
            ChannelEvent::Complete {
                token: token(4),
                stamp: FlipStamp {
                    frame: 78,
                    usec: 3_000_000,
                },
            },
        ]
    );
}

#[test]
fn other_events_are_skipped() {
    let mut buf = vblank_event(DRM_EVENT_VBLANK, 9, 1, 1, 1);
    buf.extend(flip(5, 0, 10, 1));
    let events = parse(&buf).unwrap();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], ChannelEvent::Complete { token: t, .. } if t == token(5)));
}

#[test]
fn flip_without_token() {
    let mut buf = flip(0, 1, 1, 1);
    buf.extend(flip(u64::MAX, 1, 1, 1));
    assert!(parse(&buf).unwrap().is_empty());
}

#[test]
fn empty_buffer() {
    assert!(parse(&[]).unwrap().is_empty());
}

#[test]
fn truncated_event() {
    let buf = flip(3, 0, 0, 0);
    let res = parse(&buf[..buf.len() - 4]);
    assert!(matches!(res, Err(ChannelError::InvalidRead)));
    let res = parse(&buf[..size_of::<drm_event>() - 1]);
    assert!(matches!(res, Err(ChannelError::InvalidRead)));
}

#[test]
fn invalid_lengths() {
    let mut buf = flip(3, 0, 0, 0);
    buf[4..8].copy_from_slice(&4u32.to_ne_bytes());
    assert!(matches!(parse(&buf), Err(ChannelError::InvalidRead)));
    // A flip event that is too short to hold a vblank event.
    buf[4..8].copy_from_slice(&(size_of::<drm_event>() as u32).to_ne_bytes());
    assert!(matches!(parse(&buf), Err(ChannelError::InvalidRead)));
}
