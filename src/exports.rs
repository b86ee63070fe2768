// exports.rs — Synchronous commands callable by the control process.
//
// Each command resolves one widget and performs a single fire-and-forget call.
// They bypass the login state machine and the auto-login flag entirely. When
// the widget is absent (or the module hasn't finished starting up) they do
// nothing.
//
// The generic functions are what the C exports call; they return whether the
// widget was present so they can be tested without a host process.

use crate::widgets::WidgetHost;
use log::debug;

pub fn select_language<H: WidgetHost + ?Sized>(host: &H, id: i32) -> bool {
    host.with_server_select(&mut |w| w.select_language(id))
}

pub fn select_server<H: WidgetHost + ?Sized>(host: &H, id: i32) -> bool {
    host.with_server_select(&mut |w| w.select_server(id))
}

pub fn select_channel<H: WidgetHost + ?Sized>(host: &H, id: i32) -> bool {
    host.with_server_select(&mut |w| w.select_channel(id))
}

/// `slot` is 0-based. Negative slots are ignored.
pub fn select_character<H: WidgetHost + ?Sized>(host: &H, slot: i32) -> bool {
    let Ok(slot) = u32::try_from(slot) else {
        debug!("ignoring negative character slot {slot}");
        return false;
    };
    host.with_character_select(&mut |w| w.select_character_at(slot))
}

pub fn click_start<H: WidgetHost + ?Sized>(host: &H) -> bool {
    host.with_character_select(&mut |w| w.click_start())
}

// ============================================================
// C Exports
// ============================================================

#[cfg(all(windows, target_arch = "x86"))]
mod ffi {
    use crate::host::ProcessHost;
    use once_cell::sync::OnceCell;
    use std::os::raw::c_int;
    use std::sync::Arc;

    /// Set once by the worker after the layout has been located.
    static HOST: OnceCell<Arc<ProcessHost>> = OnceCell::new();

    pub fn publish(host: Arc<ProcessHost>) {
        let _ = HOST.set(host);
    }

    /// Run `f` against the published host. A panic here aborts the process:
    /// release builds use panic = "abort" and extern "C" frames don't unwind.
    fn with_host(name: &str, f: impl FnOnce(&ProcessHost) -> bool) {
        let Some(host) = HOST.get() else {
            log::debug!("{name}: module not ready");
            return;
        };
        if !f(host) {
            log::debug!("{name}: widget not present");
        }
    }

    #[no_mangle]
    pub extern "C" fn Gfless_SelectLanguage(lang: c_int) {
        with_host("Gfless_SelectLanguage", |h| super::select_language(h, lang));
    }

    #[no_mangle]
    pub extern "C" fn Gfless_SelectServer(server: c_int) {
        with_host("Gfless_SelectServer", |h| super::select_server(h, server));
    }

    #[no_mangle]
    pub extern "C" fn Gfless_SelectChannel(channel: c_int) {
        with_host("Gfless_SelectChannel", |h| super::select_channel(h, channel));
    }

    #[no_mangle]
    pub extern "C" fn Gfless_SelectCharacter(character: c_int) {
        with_host("Gfless_SelectCharacter", |h| super::select_character(h, character));
    }

    #[no_mangle]
    pub extern "C" fn Gfless_ClickStart() {
        with_host("Gfless_ClickStart", |h| super::click_start(h));
    }
}

#[cfg(all(windows, target_arch = "x86"))]
pub use ffi::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeHost};

    #[test]
    fn each_command_issues_exactly_one_call() {
        let host = FakeHost::new();
        assert!(select_language(&host, 1));
        assert!(select_server(&host, 2));
        assert!(select_channel(&host, 3));
        assert!(select_character(&host, 0));
        assert!(click_start(&host));
        assert_eq!(
            host.calls(),
            vec![Call::Language(1), Call::Server(2), Call::Channel(3), Call::Character(0), Call::Start]
        );
    }

    #[test]
    fn commands_are_no_ops_without_widgets() {
        let host = FakeHost::new();
        host.set_present(false, false);
        assert!(!select_language(&host, 1));
        assert!(!select_server(&host, 1));
        assert!(!select_channel(&host, 1));
        assert!(!select_character(&host, 1));
        assert!(!click_start(&host));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn character_slot_is_passed_through_zero_based() {
        let host = FakeHost::new();
        select_character(&host, 3);
        assert!(!select_character(&host, -1));
        assert_eq!(host.calls(), vec![Call::Character(3)]);
    }

    #[test]
    fn commands_ignore_visibility() {
        let host = FakeHost::new();
        host.set_server_visible(false);
        host.set_character_visible(false);
        assert!(select_channel(&host, 9));
        assert_eq!(host.calls(), vec![Call::Channel(9)]);
    }
}
