// testing.rs — In-memory widget host shared by the unit tests.

use crate::config::Timings;
use crate::widgets::{CharacterSelectWidget, ServerSelectWidget, WidgetHost};
use std::sync::Mutex;
use std::time::Duration;

/// One operation issued against a fake widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Language(i32),
    Server(i32),
    Channel(i32),
    Character(u32),
    Start,
    /// A settle delay taken between two operations.
    Settle(Duration),
}

#[derive(Default)]
struct State {
    server_present: bool,
    character_present: bool,
    server_visible: bool,
    character_visible: bool,
    /// Resolutions answered with "absent" before the presence flags apply.
    absent_resolutions: usize,
    /// Server visibility queries answered with "hidden" before the flag applies.
    hidden_server_polls: usize,
    /// Character screen appears after this many select_channel calls.
    show_character_after_channels: Option<usize>,
    channels_selected: usize,
    /// Character / start calls made while the character screen was hidden.
    premature_character_calls: usize,
    calls: Vec<Call>,
}

/// Widget host whose widgets only record what was asked of them.
pub struct FakeHost {
    state: Mutex<State>,
}

impl FakeHost {
    /// Both widgets present, both hidden.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                server_present: true,
                character_present: true,
                ..State::default()
            }),
        }
    }

    /// Server screen shown; character screen appears after the first channel selection.
    pub fn login_screen() -> Self {
        let host = Self::new();
        host.set_server_visible(true);
        host.show_character_after_channels(1);
        host
    }

    pub fn set_present(&self, server: bool, character: bool) {
        let mut s = self.state.lock().unwrap();
        s.server_present = server;
        s.character_present = character;
    }

    pub fn set_server_visible(&self, visible: bool) {
        self.state.lock().unwrap().server_visible = visible;
    }

    pub fn set_character_visible(&self, visible: bool) {
        self.state.lock().unwrap().character_visible = visible;
    }

    pub fn absent_for(&self, resolutions: usize) {
        self.state.lock().unwrap().absent_resolutions = resolutions;
    }

    pub fn hide_server_for(&self, polls: usize) {
        self.state.lock().unwrap().hidden_server_polls = polls;
    }

    pub fn show_character_after_channels(&self, channels: usize) {
        self.state.lock().unwrap().show_character_after_channels = Some(channels);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn premature_character_calls(&self) -> usize {
        self.state.lock().unwrap().premature_character_calls
    }

    /// Log a settle delay in call order instead of sleeping.
    pub fn record_settle(&self, delay: Duration) {
        self.record(Call::Settle(delay));
    }

    fn record(&self, call: Call) {
        let mut s = self.state.lock().unwrap();
        match call {
            Call::Channel(_) => {
                s.channels_selected += 1;
                if s.show_character_after_channels == Some(s.channels_selected) {
                    s.character_visible = true;
                }
            }
            Call::Character(_) | Call::Start if !s.character_visible => {
                s.premature_character_calls += 1;
            }
            _ => {}
        }
        s.calls.push(call);
    }

    fn resolve(&self, present: impl Fn(&State) -> bool) -> bool {
        let mut s = self.state.lock().unwrap();
        if s.absent_resolutions > 0 {
            s.absent_resolutions -= 1;
            return false;
        }
        present(&s)
    }
}

struct FakeServer<'a>(&'a FakeHost);
struct FakeCharacter<'a>(&'a FakeHost);

impl ServerSelectWidget for FakeServer<'_> {
    fn select_language(&self, id: i32) { self.0.record(Call::Language(id)); }
    fn select_server(&self, id: i32) { self.0.record(Call::Server(id)); }
    fn select_channel(&self, id: i32) { self.0.record(Call::Channel(id)); }

    fn is_visible(&self) -> bool {
        let mut s = self.0.state.lock().unwrap();
        if s.hidden_server_polls > 0 {
            s.hidden_server_polls -= 1;
            return false;
        }
        s.server_visible
    }
}

impl CharacterSelectWidget for FakeCharacter<'_> {
    fn select_character_at(&self, slot: u32) { self.0.record(Call::Character(slot)); }
    fn click_start(&self) { self.0.record(Call::Start); }
    fn is_visible(&self) -> bool { self.0.state.lock().unwrap().character_visible }
}

impl WidgetHost for FakeHost {
    fn with_server_select(&self, f: &mut dyn FnMut(&dyn ServerSelectWidget)) -> bool {
        if !self.resolve(|s| s.server_present) { return false; }
        f(&FakeServer(self));
        true
    }

    fn with_character_select(&self, f: &mut dyn FnMut(&dyn CharacterSelectWidget)) -> bool {
        if !self.resolve(|s| s.character_present) { return false; }
        f(&FakeCharacter(self));
        true
    }
}

/// Millisecond delays so state machine tests finish quickly.
pub fn fast_timings() -> Timings {
    Timings {
        poll_interval_ms: 1,
        language_settle_ms: 1,
        server_settle_ms: 1,
        channel_settle_ms: 1,
        character_screen_settle_ms: 1,
        character_settle_ms: 1,
    }
}
