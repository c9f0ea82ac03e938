use {
    std::{
        error::Error,
        fmt::{Display, Formatter},
        io,
    },
    uapi::{Errno, c},
};

/// An errno value returned by a system call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct OsError(pub c::c_int);

impl From<Errno> for OsError {
    fn from(e: Errno) -> Self {
        Self(e.0)
    }
}

impl From<io::Error> for OsError {
    fn from(v: io::Error) -> Self {
        match v.raw_os_error() {
            Some(v) => Self(v),
            None => Self(c::EINVAL),
        }
    }
}

impl Display for OsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let msg = io::Error::from_raw_os_error(self.0);
        Display::fmt(&msg, f)
    }
}

impl Error for OsError {}
