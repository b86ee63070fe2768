// pipe.rs — Client ends of the two named pipes.
//
// Both pipes are created by other processes; this module only opens them. The
// resulting std::fs::File is a plain blocking byte stream, and std reports a
// broken pipe on read as Ok(0), which the listeners treat as "peer gone".

use crate::channel::Connector;
use crate::error::ChannelError;
use log::debug;
use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::windows::io::AsRawHandle;
use std::ptr;
use std::time::Duration;
use winapi::shared::minwindef::DWORD;
use winapi::um::namedpipeapi::SetNamedPipeHandleState;
use winapi::um::winbase::{WaitNamedPipeA, PIPE_READMODE_BYTE, PIPE_WAIT};

/// Open the duplex primary pipe, waiting up to `timeout` for it to become
/// available, and switch it to blocking byte mode.
pub fn connect_primary(name: &str, timeout: Duration) -> Result<File, ChannelError> {
    let file = match open_duplex(name) {
        Ok(file) => file,
        Err(e) => {
            debug!("primary pipe {name} not open yet ({e}), waiting up to {timeout:?}");
            let cname = CString::new(name).map_err(|e| ChannelError::Open {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, e),
            })?;
            let ms = DWORD::try_from(timeout.as_millis()).unwrap_or(DWORD::MAX);
            if unsafe { WaitNamedPipeA(cname.as_ptr(), ms) } == 0 {
                return Err(ChannelError::Unavailable { name: name.to_string(), waited: timeout });
            }
            open_duplex(name).map_err(|source| ChannelError::Open { name: name.to_string(), source })?
        }
    };

    let mut mode: DWORD = PIPE_READMODE_BYTE | PIPE_WAIT;
    let ok = unsafe {
        SetNamedPipeHandleState(file.as_raw_handle() as _, &mut mode, ptr::null_mut(), ptr::null_mut())
    };
    if ok == 0 {
        return Err(ChannelError::Configure {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(file)
}

fn open_duplex(name: &str) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(name)
}

/// Read-only client for the secondary pipe.
pub struct SecondaryPipe {
    name: String,
}

impl SecondaryPipe {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Connector for SecondaryPipe {
    type Stream = File;

    fn open(&self) -> io::Result<File> {
        OpenOptions::new().read(true).open(&self.name)
    }
}
