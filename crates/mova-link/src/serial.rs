//! POSIX serial tty link.
//!
//! The port is put in raw mode (no echo, no line discipline, 8N1) with
//! `VMIN = 0, VTIME = 0` so reads never block; the reader asks the driver
//! how many bytes are queued (`FIONREAD`) before reading them.

use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use nix::fcntl::OFlag;
use nix::sys::termios::{
    self, BaudRate, ControlFlags, FlushArg, SetArg, SpecialCharacterIndices,
};
use tracing::{debug, info};

use crate::error::{LinkError, LinkResult};
use crate::link::{ByteLink, LinkReader, LinkWriter};

nix::ioctl_read_bad!(fionread, nix::libc::FIONREAD, nix::libc::c_int);

/// An opened and configured serial device.
#[derive(Debug)]
pub struct SerialLink {
    path: PathBuf,
    file: File,
}

impl SerialLink {
    /// Open `path` at `baud_rate` in raw 8N1 mode.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> LinkResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LinkError::DeviceNotFound(path.to_path_buf()));
        }

        let speed = baud_rate_for(baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NOCTTY.bits())
            .open(path)
            .map_err(|e| LinkError::open_failed(path, e.to_string()))?;

        let mut tio = termios::tcgetattr(&file)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, speed)?;
        tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        tio.control_flags &= !(ControlFlags::CSTOPB | ControlFlags::PARENB);
        tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        tio.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&file, SetArg::TCSANOW, &tio)?;

        // Drop whatever the device sent before we were listening.
        termios::tcflush(&file, FlushArg::TCIOFLUSH)?;

        info!(device = %path.display(), baud_rate, "Serial link opened");

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Device path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteLink for SerialLink {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn split(self) -> LinkResult<(Box<dyn LinkReader>, Box<dyn LinkWriter>)> {
        let writer = self.file.try_clone()?;
        debug!(device = %self.path.display(), "Split serial link into reader and writer");
        Ok((Box::new(SerialReader { file: self.file }), Box::new(writer)))
    }
}

/// Read half of a serial link.
struct SerialReader {
    file: File,
}

impl LinkReader for SerialReader {
    fn available(&mut self) -> io::Result<usize> {
        let mut queued: nix::libc::c_int = 0;
        // SAFETY: the fd is owned by `self.file` and outlives the call;
        // FIONREAD writes a single c_int.
        unsafe { fionread(self.file.as_raw_fd(), &mut queued) }.map_err(io::Error::from)?;
        Ok(queued.max(0) as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Map a numeric rate onto a termios speed constant.
fn baud_rate_for(rate: u32) -> LinkResult<BaudRate> {
    let speed = match rate {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => return Err(LinkError::UnsupportedBaud(other)),
    };
    Ok(speed)
}
