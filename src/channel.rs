// channel.rs — Command listeners for the primary and secondary pipes.
//
// Primary: a duplex stream to the control process. Two synchronous handshake
// exchanges, then a blocking read loop until the peer goes away.
// Secondary: a read-only stream any peer may open. Reopened forever at a fixed
// interval; no handshake.
//
// Both loops hand decoded requests to automation::run_login on their own
// thread, synchronously: a long login attempt delays the next read on that
// channel only. Malformed frames are logged at debug level and dropped.
//
// The loops are generic over std::io streams so they work the same on a named
// pipe (pipe.rs) and on in-memory buffers.

use crate::automation::{run_login, AutomationSettings, LoginOutcome};
use crate::command::{decode_flag, Command};
use crate::error::{ChannelError, HandshakeStep};
use crate::wait::{self, CancelToken};
use crate::widgets::WidgetHost;
use log::{debug, info, warn};
use std::io::{ErrorKind, Read, Write};
use std::sync::Arc;
use std::time::Duration;

// ============================================================
// Handshake
// ============================================================

/// External handler for the host's idle-kick countermeasure.
pub trait IdleKickGuard {
    /// Called once if the control process asks for the countermeasure to be disabled.
    fn neutralize(&self);
}

/// Values agreed during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    pub disable_idle_kick: bool,
    pub auto_login: bool,
}

/// Run both handshake exchanges on a freshly opened primary stream.
pub fn handshake<S: Read + Write>(
    stream: &mut S,
    pid: u32,
    frame_size: usize,
    guard: &dyn IdleKickGuard,
) -> Result<Handshake, ChannelError> {
    let disable_idle_kick = exchange(stream, pid, HandshakeStep::DisableNosmall, frame_size)?;
    if disable_idle_kick {
        info!("control process requested idle-kick countermeasure to be disabled");
        guard.neutralize();
    }

    let auto_login = exchange(stream, pid, HandshakeStep::AutoLogin, frame_size)?;
    info!("handshake complete: disable_idle_kick={disable_idle_kick} auto_login={auto_login}");

    Ok(Handshake { disable_idle_kick, auto_login })
}

/// Send "<pid> <token>" and read back one integer flag.
fn exchange<S: Read + Write>(
    stream: &mut S,
    pid: u32,
    step: HandshakeStep,
    frame_size: usize,
) -> Result<bool, ChannelError> {
    let message = format!("{pid} {step}");
    stream
        .write_all(message.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|source| ChannelError::HandshakeWrite { step, source })?;

    let mut buf = vec![0u8; frame_size];
    let n = read_frame(stream, &mut buf).map_err(|source| ChannelError::HandshakeRead { step, source })?;
    if n == 0 {
        return Err(ChannelError::HandshakeClosed { step });
    }

    let reply = &buf[..n];
    decode_flag(reply).ok_or_else(|| ChannelError::HandshakeDecode {
        step,
        reply: String::from_utf8_lossy(reply).into_owned(),
    })
}

// ============================================================
// Session
// ============================================================

/// What both listeners need to act on a frame. Cheap to clone.
pub struct Session<H: ?Sized> {
    pub host: Arc<H>,
    pub settings: Arc<AutomationSettings>,
    pub cancel: CancelToken,
}

impl<H: ?Sized> Clone for Session<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            settings: Arc::clone(&self.settings),
            cancel: self.cancel.clone(),
        }
    }
}

impl<H: WidgetHost + ?Sized> Session<H> {
    pub fn new(host: Arc<H>, settings: AutomationSettings, cancel: CancelToken) -> Self {
        Self { host, settings: Arc::new(settings), cancel }
    }

    /// Decode one frame and, if it is a Relogin, run the login attempt.
    /// Returns `None` for frames that were dropped.
    pub fn handle_frame(&self, channel: &str, frame: &[u8]) -> Option<LoginOutcome> {
        match Command::decode(frame) {
            Ok(Command::Relogin(request)) => {
                info!("{channel}: Relogin {request:?}");
                Some(run_login(&*self.host, &request, &self.settings, &self.cancel))
            }
            Err(e) => {
                debug!("{channel}: dropped frame ({e}): {:?}", String::from_utf8_lossy(frame));
                None
            }
        }
    }
}

// ============================================================
// Listeners
// ============================================================

/// Read frames from the primary stream until it closes or fails.
/// Both count as a normal shutdown.
pub fn serve_primary<H, S>(session: &Session<H>, stream: &mut S, frame_size: usize)
where
    H: WidgetHost + ?Sized,
    S: Read,
{
    let mut buf = vec![0u8; frame_size];
    loop {
        if session.cancel.is_cancelled() { break; }
        match read_frame(stream, &mut buf) {
            Ok(0) => {
                info!("primary: peer closed the pipe");
                break;
            }
            Ok(n) => {
                session.handle_frame("primary", &buf[..n]);
            }
            Err(e) => {
                info!("primary: read failed, stopping: {e}");
                break;
            }
        }
    }
}

/// Something that can (re)open the secondary stream.
pub trait Connector {
    type Stream: Read;
    fn open(&self) -> std::io::Result<Self::Stream>;
}

/// Keep the secondary stream open and serve it until the session is cancelled.
pub fn serve_secondary<H, C>(session: &Session<H>, connector: &C, frame_size: usize, retry: Duration)
where
    H: WidgetHost + ?Sized,
    C: Connector,
{
    let mut buf = vec![0u8; frame_size];
    let mut was_connected = true;

    while !session.cancel.is_cancelled() {
        let mut stream = match connector.open() {
            Ok(stream) => stream,
            Err(e) => {
                if was_connected {
                    debug!("secondary: not available ({e}), retrying every {retry:?}");
                    was_connected = false;
                }
                if wait::settle(retry, &session.cancel).is_err() {
                    return;
                }
                continue;
            }
        };

        info!("secondary: connected");
        was_connected = true;

        loop {
            if session.cancel.is_cancelled() { return; }
            match read_frame(&mut stream, &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    session.handle_frame("secondary", &buf[..n]);
                }
                Err(e) => {
                    warn!("secondary: read failed: {e}");
                    break;
                }
            }
        }
        info!("secondary: disconnected");
    }
}

/// One raw read, retried on EINTR-style interruptions. `Ok(0)` means the peer is gone.
fn read_frame<S: Read + ?Sized>(stream: &mut S, buf: &mut [u8]) -> std::io::Result<usize> {
    buf.fill(0);
    loop {
        match stream.read(buf) {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
