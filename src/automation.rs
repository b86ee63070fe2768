// automation.rs — The login state machine.
//
// Given a Relogin request, drives the host from wherever its login UI currently
// is to "character selected, session started":
//
//   Idle
//    -> WaitForCharacterScreenOrServerScreen   (both widgets exist; which screen is up?)
//    -> SelectingLanguage                      (select language, settle)
//    -> AwaitingServerScreenVisible            (server list is back)
//    -> SelectingServerAndChannel              (select server, settle, channel, settle)
//    -> AwaitingCharacterScreenVisible         (not yet? go round again)
//    -> SelectingCharacterAndStarting          (settle, pick slot, settle, start)
//    -> Done
//
// There is no completion signal from the host, so each step is a visibility poll
// followed by a fixed settle delay. None of the waits time out and there is no
// retry ceiling; only the cancel token can end an attempt early.
//
// run_login is reentrant and is called from both pipe listener threads. Two
// attempts running at once drive the same host UI without any locking between
// them. In practice only one channel is active per session.

use crate::command::LoginRequest;
use crate::config::Timings;
use crate::wait::{self, poll_until, CancelToken, Cancelled};
use crate::widgets::WidgetHost;
use log::{debug, info, warn};
use std::time::Duration;

/// Immutable once the handshake has completed; shared by both listeners.
#[derive(Debug, Clone)]
pub struct AutomationSettings {
    /// Whether Relogin requests are acted on at all.
    pub auto_login: bool,
    pub timings: Timings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    WaitForCharacterScreenOrServerScreen,
    SelectingLanguage,
    AwaitingServerScreenVisible,
    SelectingServerAndChannel,
    AwaitingCharacterScreenVisible,
    SelectingCharacterAndStarting,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Reached Done.
    Completed,
    /// Auto-login is disabled for this session; nothing was touched.
    Skipped,
    /// The cancel token fired mid-attempt.
    Cancelled,
}

/// Settle step: sleeps a delay unless cancelled.
type SettleFn<'a> = &'a dyn Fn(Duration, &CancelToken) -> Result<(), Cancelled>;

/// Run one login attempt to completion on the calling thread.
pub fn run_login<H: WidgetHost + ?Sized>(
    host: &H,
    request: &LoginRequest,
    settings: &AutomationSettings,
    cancel: &CancelToken,
) -> LoginOutcome {
    run_login_with(host, request, settings, cancel, &wait::settle)
}

fn run_login_with<H: WidgetHost + ?Sized>(
    host: &H,
    request: &LoginRequest,
    settings: &AutomationSettings,
    cancel: &CancelToken,
    settle: SettleFn<'_>,
) -> LoginOutcome {
    if !settings.auto_login {
        debug!("auto-login disabled, ignoring {request:?}");
        return LoginOutcome::Skipped;
    }

    info!("login attempt started: {request:?}");
    let attempt = Attempt { host, request, timings: &settings.timings, cancel, settle };
    let mut state = LoginState::Idle;

    while state != LoginState::Done {
        let next = match attempt.step(state) {
            Ok(next) => next,
            Err(Cancelled) => {
                info!("login attempt cancelled in {state:?}");
                return LoginOutcome::Cancelled;
            }
        };
        debug!("login state {state:?} -> {next:?}");
        state = next;
    }

    info!("login attempt finished");
    LoginOutcome::Completed
}

struct Attempt<'a, H: ?Sized> {
    host: &'a H,
    request: &'a LoginRequest,
    timings: &'a Timings,
    cancel: &'a CancelToken,
    settle: SettleFn<'a>,
}

impl<H: WidgetHost + ?Sized> Attempt<'_, H> {
    fn step(&self, state: LoginState) -> Result<LoginState, Cancelled> {
        use LoginState::*;

        let host = self.host;
        let req = self.request;
        let t = self.timings;

        match state {
            Idle => Ok(WaitForCharacterScreenOrServerScreen),

            WaitForCharacterScreenOrServerScreen => {
                poll_until(t.poll_interval(), self.cancel, || host.widgets_present())?;
                if host.character_select_visible() {
                    return Ok(SelectingCharacterAndStarting);
                }
                poll_until(t.poll_interval(), self.cancel, || host.server_select_visible())?;
                Ok(SelectingLanguage)
            }

            SelectingLanguage => {
                self.on_server_select("select_language", &mut |w| w.select_language(req.language));
                self.pause(t.language_settle())?;
                Ok(AwaitingServerScreenVisible)
            }

            AwaitingServerScreenVisible => {
                poll_until(t.poll_interval(), self.cancel, || host.server_select_visible())?;
                Ok(SelectingServerAndChannel)
            }

            SelectingServerAndChannel => {
                self.on_server_select("select_server", &mut |w| w.select_server(req.server));
                self.pause(t.server_settle())?;
                self.on_server_select("select_channel", &mut |w| w.select_channel(req.channel));
                self.pause(t.channel_settle())?;
                Ok(AwaitingCharacterScreenVisible)
            }

            AwaitingCharacterScreenVisible => {
                if host.character_select_visible() {
                    Ok(SelectingCharacterAndStarting)
                } else {
                    Ok(WaitForCharacterScreenOrServerScreen)
                }
            }

            SelectingCharacterAndStarting => {
                self.pause(t.character_screen_settle())?;
                if let Some(slot) = req.character_slot {
                    self.on_character_select("select_character_at", &mut |w| w.select_character_at(slot));
                    self.pause(t.character_settle())?;
                    self.on_character_select("click_start", &mut |w| w.click_start());
                }
                Ok(Done)
            }

            Done => Ok(Done),
        }
    }

    fn pause(&self, delay: Duration) -> Result<(), Cancelled> {
        (self.settle)(delay, self.cancel)
    }

    fn on_server_select(&self, op: &str, f: &mut dyn FnMut(&dyn crate::widgets::ServerSelectWidget)) {
        if !self.host.with_server_select(f) {
            warn!("server select widget gone before {op}");
        }
    }

    fn on_character_select(&self, op: &str, f: &mut dyn FnMut(&dyn crate::widgets::CharacterSelectWidget)) {
        if !self.host.with_character_select(f) {
            warn!("character select widget gone before {op}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fast_timings, Call, FakeHost};
    use std::sync::Arc;
    use std::time::Duration;

    fn enabled() -> AutomationSettings {
        AutomationSettings { auto_login: true, timings: fast_timings() }
    }

    fn run(host: &FakeHost, wire: (i32, i32, i32, i32), settings: &AutomationSettings) -> LoginOutcome {
        let req = LoginRequest::from_wire(wire.0, wire.1, wire.2, wire.3);
        run_login(host, &req, settings, &CancelToken::new())
    }

    #[test]
    fn full_login_selects_everything_once() {
        let host = FakeHost::login_screen();
        assert_eq!(run(&host, (1, 2, 3, 4), &enabled()), LoginOutcome::Completed);
        assert_eq!(
            host.calls(),
            vec![Call::Language(1), Call::Server(2), Call::Channel(3), Call::Character(3), Call::Start]
        );
        assert_eq!(host.premature_character_calls(), 0);
    }

    #[test]
    fn slot_zero_stops_after_channel() {
        let host = FakeHost::login_screen();
        assert_eq!(run(&host, (1, 2, 3, 0), &enabled()), LoginOutcome::Completed);
        assert_eq!(host.calls(), vec![Call::Language(1), Call::Server(2), Call::Channel(3)]);
    }

    /// Run with the default timings, logging each settle on the host instead of sleeping.
    fn run_recording_settles(host: &FakeHost, wire: (i32, i32, i32, i32)) -> LoginOutcome {
        let settings = AutomationSettings { auto_login: true, timings: Timings::default() };
        let req = LoginRequest::from_wire(wire.0, wire.1, wire.2, wire.3);
        let record = |delay: Duration, _: &CancelToken| -> Result<(), Cancelled> {
            host.record_settle(delay);
            Ok(())
        };
        run_login_with(host, &req, &settings, &CancelToken::new(), &record)
    }

    fn ms(n: u64) -> Call {
        Call::Settle(Duration::from_millis(n))
    }

    #[test]
    fn each_step_is_followed_by_its_own_settle_delay() {
        let host = FakeHost::login_screen();
        assert_eq!(run_recording_settles(&host, (1, 2, 3, 4)), LoginOutcome::Completed);
        assert_eq!(
            host.calls(),
            vec![
                Call::Language(1), ms(2000),
                Call::Server(2), ms(1000),
                Call::Channel(3), ms(4000),
                ms(500),
                Call::Character(3), ms(1000),
                Call::Start,
            ]
        );
    }

    #[test]
    fn character_screen_settle_precedes_slot_check() {
        let host = FakeHost::login_screen();
        run_recording_settles(&host, (1, 2, 3, 0));
        assert_eq!(
            host.calls(),
            vec![Call::Language(1), ms(2000), Call::Server(2), ms(1000), Call::Channel(3), ms(4000), ms(500)]
        );

        let host = FakeHost::new();
        host.set_character_visible(true);
        run_recording_settles(&host, (1, 2, 3, 1));
        assert_eq!(host.calls(), vec![ms(500), Call::Character(0), ms(1000), Call::Start]);
    }

    #[test]
    fn disabled_auto_login_touches_nothing() {
        let host = FakeHost::login_screen();
        let settings = AutomationSettings { auto_login: false, timings: fast_timings() };
        assert_eq!(run(&host, (1, 2, 3, 4), &settings), LoginOutcome::Skipped);
        assert!(host.calls().is_empty());
    }

    #[test]
    fn character_screen_already_up_skips_server_steps() {
        let host = FakeHost::new();
        host.set_character_visible(true);
        assert_eq!(run(&host, (1, 2, 3, 2), &enabled()), LoginOutcome::Completed);
        assert_eq!(host.calls(), vec![Call::Character(1), Call::Start]);
    }

    #[test]
    fn waits_for_widgets_to_be_constructed() {
        let host = FakeHost::login_screen();
        host.absent_for(5);
        assert_eq!(run(&host, (1, 2, 3, 1), &enabled()), LoginOutcome::Completed);
        assert_eq!(
            host.calls(),
            vec![Call::Language(1), Call::Server(2), Call::Channel(3), Call::Character(0), Call::Start]
        );
    }

    #[test]
    fn waits_for_server_screen_before_each_selection() {
        let host = FakeHost::login_screen();
        host.hide_server_for(4);
        assert_eq!(run(&host, (7, 8, 9, 0), &enabled()), LoginOutcome::Completed);
        assert_eq!(host.calls(), vec![Call::Language(7), Call::Server(8), Call::Channel(9)]);
    }

    #[test]
    fn repeats_server_steps_until_character_screen_shows() {
        let host = FakeHost::new();
        host.set_server_visible(true);
        host.show_character_after_channels(3);

        assert_eq!(run(&host, (1, 2, 3, 1), &enabled()), LoginOutcome::Completed);

        let round = [Call::Language(1), Call::Server(2), Call::Channel(3)];
        let mut expected: Vec<Call> = round.iter().chain(&round).chain(&round).copied().collect();
        expected.extend([Call::Character(0), Call::Start]);
        assert_eq!(host.calls(), expected);
        assert_eq!(host.premature_character_calls(), 0);
    }

    #[test]
    fn cancel_ends_an_attempt_that_never_reaches_the_character_screen() {
        let host = FakeHost::new();
        host.set_server_visible(true);

        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });

        let req = LoginRequest::from_wire(1, 2, 3, 4);
        let outcome = run_login(&host, &req, &enabled(), &token);
        canceller.join().unwrap();

        assert_eq!(outcome, LoginOutcome::Cancelled);
        assert!(!host.calls().iter().any(|c| matches!(c, Call::Character(_) | Call::Start)));
    }

    #[test]
    fn concurrent_attempts_both_complete() {
        let host = Arc::new(FakeHost::login_screen());
        let settings = Arc::new(enabled());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let host = Arc::clone(&host);
                let settings = Arc::clone(&settings);
                std::thread::spawn(move || {
                    let req = LoginRequest::from_wire(1, 2, 3, 0);
                    run_login(&*host, &req, &settings, &CancelToken::new())
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), LoginOutcome::Completed);
        }
        assert!(host.calls().iter().filter(|c| **c == Call::Channel(3)).count() >= 1);
    }
}
