// widgets.rs — Typed views onto the host's login UI widgets.
//
// The host owns every widget; we only ever borrow one for the duration of a
// closure. WidgetHost resolves the current singleton on each call, so a widget
// destroyed or recreated by the host between two calls is picked up again
// instead of being dereferenced through a stale pointer.
//
// Every mutating operation is fire-and-forget: it calls into host code and
// returns nothing. The only feedback is a later change in is_visible().

/// The server / channel / language selection screen.
pub trait ServerSelectWidget {
    fn select_language(&self, id: i32);
    fn select_server(&self, id: i32);
    fn select_channel(&self, id: i32);
    fn is_visible(&self) -> bool;
}

/// The character selection screen.
pub trait CharacterSelectWidget {
    fn select_character_at(&self, slot: u32);
    fn click_start(&self);
    fn is_visible(&self) -> bool;
}

/// The host's generic graphic button, used by both screens.
pub trait ButtonWidget {
    fn set_selected_index(&self, index: i32);
    fn click(&self);
}

/// Resolve-and-use access to the widget singletons.
///
/// `with_*` returns `false` when the host hasn't constructed the widget (yet),
/// in which case `f` is not called. No handle outlives the closure.
pub trait WidgetHost: Send + Sync {
    fn with_server_select(&self, f: &mut dyn FnMut(&dyn ServerSelectWidget)) -> bool;
    fn with_character_select(&self, f: &mut dyn FnMut(&dyn CharacterSelectWidget)) -> bool;

    /// Both login widgets exist.
    fn widgets_present(&self) -> bool {
        self.with_server_select(&mut |_| {}) && self.with_character_select(&mut |_| {})
    }

    /// Server screen exists and is shown. Absent counts as hidden.
    fn server_select_visible(&self) -> bool {
        let mut visible = false;
        self.with_server_select(&mut |w| visible = w.is_visible());
        visible
    }

    /// Character screen exists and is shown. Absent counts as hidden.
    fn character_select_visible(&self) -> bool {
        let mut visible = false;
        self.with_character_select(&mut |w| visible = w.is_visible());
        visible
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{Call, FakeHost};
    use crate::widgets::WidgetHost;

    #[test]
    fn absent_widgets_are_reported_and_not_called() {
        let host = FakeHost::new();
        host.set_present(false, false);

        let mut called = false;
        assert!(!host.with_server_select(&mut |_| called = true));
        assert!(!host.with_character_select(&mut |_| called = true));
        assert!(!called);
        assert!(!host.widgets_present());
        assert!(!host.server_select_visible());
        assert!(!host.character_select_visible());
    }

    #[test]
    fn presence_needs_both_widgets() {
        let host = FakeHost::new();
        host.set_present(true, false);
        assert!(!host.widgets_present());
        host.set_present(true, true);
        assert!(host.widgets_present());
    }

    #[test]
    fn repeated_resolution_sees_the_same_widget() {
        let host = FakeHost::new();
        host.set_server_visible(true);

        assert!(host.server_select_visible());
        assert!(host.server_select_visible());
        assert!(!host.character_select_visible());
        assert!(!host.character_select_visible());
        assert!(host.calls().is_empty());
    }

    #[test]
    fn operations_go_through_the_resolved_widget() {
        let host = FakeHost::new();
        host.with_server_select(&mut |w| w.select_language(2));
        host.with_character_select(&mut |w| w.select_character_at(1));
        assert_eq!(host.calls(), vec![Call::Language(2), Call::Character(1)]);
    }
}
