// lib.rs — DLL entry point for the login automation module.
//
// When this DLL is injected into the client via LoadLibraryA, DllMain fires
// with DLL_PROCESS_ATTACH. It spawns a background worker thread that:
//   1. Loads gfless.toml and opens gfless.log next to the DLL
//   2. Locates the login widget singletons and publishes them to the C exports
//   3. Connects to the control process's pipe and runs the handshake
//   4. Waits for the login widgets, then starts the secondary pipe listener
//   5. Serves Relogin commands from the primary pipe until the peer goes away
//
// The worker's thread exit code is 0 on a normal shutdown (primary pipe closed)
// and 1 if startup fails (no pipe, broken handshake, bad config).
//
// The DLL itself must be compiled as a 32-bit cdylib (i686-pc-windows-msvc).
// Everything that doesn't touch the host process also builds on other targets.

#![allow(non_snake_case)]

// Compile-time guard: only 32-bit x86 on Windows
#[cfg(all(windows, not(target_arch = "x86")))]
compile_error!("Build with i686-pc-windows-msvc (32-bit x86).");

pub mod automation; // Login state machine
pub mod channel;    // Primary / secondary pipe listeners and handshake
pub mod command;    // Frame and handshake reply decoding
pub mod config;     // gfless.toml
pub mod error;      // Error types
pub mod exports;    // Synchronous commands + Gfless_* C exports
pub mod logging;    // fern file logger
pub mod pattern;    // Masked byte patterns for singleton locators
pub mod wait;       // Poll / settle helpers, cancel token
pub mod widgets;    // Widget traits and resolve-and-use host trait

#[cfg(all(windows, target_arch = "x86"))]
mod host;   // Widgets backed by host memory
#[cfg(all(windows, target_arch = "x86"))]
mod invoke; // Raw register-convention call
#[cfg(all(windows, target_arch = "x86"))]
mod memory; // Checked memory access, module scanning
#[cfg(all(windows, target_arch = "x86"))]
mod module; // DLL handle and directory
#[cfg(all(windows, target_arch = "x86"))]
mod pipe;   // Named pipe clients

#[cfg(test)]
mod testing;

#[cfg(all(windows, target_arch = "x86"))]
mod dll {
    use crate::automation::AutomationSettings;
    use crate::channel::{self, IdleKickGuard, Session};
    use crate::config::{GflessConfig, PipeConfig};
    use crate::error::{ConfigError, StartupError};
    use crate::host::ProcessHost;
    use crate::pipe::{self, SecondaryPipe};
    use crate::wait::{self, CancelToken};
    use crate::widgets::WidgetHost;
    use crate::{exports, logging, module};
    use log::{error, info, warn, LevelFilter};
    use once_cell::sync::Lazy;
    use std::ptr;
    use std::sync::Arc;
    use winapi::shared::minwindef::{BOOL, DWORD, HINSTANCE, LPVOID, TRUE};
    use winapi::um::handleapi::CloseHandle;
    use winapi::um::libloaderapi::DisableThreadLibraryCalls;
    use winapi::um::processthreadsapi::CreateThread;
    use winapi::um::winnt::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};

    const EXIT_SUCCESS: DWORD = 0;
    const EXIT_FAILURE: DWORD = 1;

    /// Cancelled on DLL_PROCESS_DETACH; every wait and read loop checks it.
    static SHUTDOWN: Lazy<CancelToken> = Lazy::new(CancelToken::new);

    /// This build ships no handler for the idle-kick countermeasure.
    struct NoIdleKickHandler;

    impl IdleKickGuard for NoIdleKickHandler {
        fn neutralize(&self) {
            warn!("no idle-kick countermeasure handler installed; request ignored");
        }
    }

    /// Background worker thread entry point.
    unsafe extern "system" fn worker(_: LPVOID) -> DWORD {
        let dir = module::dll_directory();
        let config = GflessConfig::load(&dir);

        let level = config
            .as_ref()
            .ok()
            .and_then(|c| c.logging.level_filter().ok())
            .unwrap_or(LevelFilter::Info);
        // Without a log file we still run, just silently.
        let _ = logging::initialize(&dir, level);

        let code = match run(config) {
            Ok(()) => {
                info!("worker exiting");
                EXIT_SUCCESS
            }
            Err(e) => {
                error!("worker stopped: {e}");
                EXIT_FAILURE
            }
        };
        log::logger().flush();
        code
    }

    fn run(config: Result<GflessConfig, ConfigError>) -> Result<(), StartupError> {
        let config = config?;
        let pipes = &config.pipes;

        let host = Arc::new(ProcessHost::locate(config.layout.as_ref()));
        exports::publish(Arc::clone(&host));

        let mut primary = pipe::connect_primary(&pipes.primary, pipes.connect_timeout())?;
        info!("connected to {}", pipes.primary);

        let hs = channel::handshake(&mut primary, std::process::id(), pipes.frame_size, &NoIdleKickHandler)?;

        let settings = AutomationSettings {
            auto_login: hs.auto_login,
            timings: config.timings.clone(),
        };
        let session = Session::new(host, settings, CancelToken::clone(&SHUTDOWN));

        info!("waiting for login widgets");
        let poll = config.timings.poll_interval();
        if wait::poll_until(poll, &session.cancel, || session.host.widgets_present()).is_err() {
            return Ok(());
        }
        info!("login widgets present");

        spawn_secondary(session.clone(), pipes);
        channel::serve_primary(&session, &mut primary, pipes.frame_size);
        Ok(())
    }

    fn spawn_secondary(session: Session<ProcessHost>, pipes: &PipeConfig) {
        let connector = SecondaryPipe::new(pipes.secondary.clone());
        let frame_size = pipes.frame_size;
        let retry = pipes.reconnect_interval();

        let spawned = std::thread::Builder::new()
            .name("gfless-secondary".to_string())
            .spawn(move || channel::serve_secondary(&session, &connector, frame_size, retry));
        if let Err(e) = spawned {
            warn!("secondary listener not started: {e}");
        }
    }

    /// DLL entry point, called by Windows when the DLL is loaded/unloaded.
    #[no_mangle]
    pub unsafe extern "system" fn DllMain(
        hinst: HINSTANCE,
        reason: DWORD,
        _reserved: LPVOID,
    ) -> BOOL {
        match reason {
            DLL_PROCESS_ATTACH => {
                // Prevent DLL_THREAD_ATTACH/DETACH notifications (we don't need them)
                DisableThreadLibraryCalls(hinst);

                // Needed to find gfless.toml and gfless.log
                module::set_dll_hinst(hinst as usize);

                let h = CreateThread(
                    ptr::null_mut(), 0, Some(worker),
                    ptr::null_mut(), 0, ptr::null_mut(),
                );
                if !h.is_null() {
                    CloseHandle(h); // We don't need the thread handle
                }
            }
            DLL_PROCESS_DETACH => {
                SHUTDOWN.cancel();
                log::logger().flush();
            }
            _ => {}
        }
        TRUE
    }
}
