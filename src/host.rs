// host.rs — Widget handles backed by the live host process.
//
// Each widget singleton lives behind a static pointer slot in the host image.
// The slot address comes from the layout's locator (fixed address, or a byte
// pattern found once at startup). The instance pointer inside the slot is read
// again on every with_* call, never cached.
//
// Widget operations all end in a button click:
//   select_language / select_server / select_channel
//       -> set the matching button's selected index, click it
//   select_character_at -> same, on the character button
//   click_start         -> click the start button

use crate::config::{ButtonLayout, HostLayout, Locator};
use crate::invoke;
use crate::memory;
use crate::pattern::BytePattern;
use crate::widgets::{ButtonWidget, CharacterSelectWidget, ServerSelectWidget, WidgetHost};
use log::{error, info, trace, warn};

/// Widget host for the current process.
pub struct ProcessHost {
    resolved: Option<Resolved>,
}

struct Resolved {
    layout: HostLayout,
    server_slot: usize,
    character_slot: usize,
}

impl ProcessHost {
    /// Run the locators for both widgets. If either can't be found (or there is
    /// no layout at all) every widget resolves as absent.
    pub fn locate(layout: Option<&HostLayout>) -> Self {
        let Some(layout) = layout else {
            warn!("no [layout] configured; login widgets will never resolve");
            return Self { resolved: None };
        };

        let server_slot = locate_slot("server select", &layout.server_select.locator);
        let character_slot = locate_slot("character select", &layout.character_select.locator);

        let resolved = match (server_slot, character_slot) {
            (Some(server_slot), Some(character_slot)) => Some(Resolved {
                layout: layout.clone(),
                server_slot,
                character_slot,
            }),
            _ => {
                error!("widget singletons not located; login widgets will never resolve");
                None
            }
        };
        Self { resolved }
    }
}

fn locate_slot(what: &str, locator: &Locator) -> Option<usize> {
    let slot = match locator {
        Locator::Address { address } => Some(*address),
        Locator::Pattern { module, pattern, offset } => {
            let pattern = BytePattern::parse(pattern).ok()?;
            unsafe {
                memory::scan_module(module, &pattern)
                    .map(|hit| memory::read_ptr(hit + offset))
                    .filter(|&slot| slot != 0)
            }
        }
    };
    match slot {
        Some(slot) => info!("{what} singleton slot at {slot:#010x}"),
        None => warn!("{what} singleton slot not found ({locator:?})"),
    }
    slot
}

impl WidgetHost for ProcessHost {
    fn with_server_select(&self, f: &mut dyn FnMut(&dyn ServerSelectWidget)) -> bool {
        let Some(r) = &self.resolved else { return false };
        let base = unsafe { memory::read_ptr(r.server_slot) };
        if base == 0 { return false; }
        f(&RawServerSelect { base, layout: &r.layout });
        true
    }

    fn with_character_select(&self, f: &mut dyn FnMut(&dyn CharacterSelectWidget)) -> bool {
        let Some(r) = &self.resolved else { return false };
        let base = unsafe { memory::read_ptr(r.character_slot) };
        if base == 0 { return false; }
        f(&RawCharacterSelect { base, layout: &r.layout });
        true
    }
}

// ============================================================
// Buttons
// ============================================================

/// Everything needed for one click, read right before the call.
struct ButtonInvocation {
    parameters: usize,
    target: usize,
    receiver: usize,
}

impl ButtonInvocation {
    fn fire(self) {
        if !unsafe { memory::is_executable(self.target) } {
            error!(target: "invoke",
                "refusing call to non-executable {:#010x} (receiver {:#010x})",
                self.target, self.receiver);
            return;
        }
        trace!(target: "invoke",
            "call {:#010x} eax={:#010x} edx={:#010x}",
            self.target, self.parameters, self.receiver);
        unsafe { invoke::call_register(self.target, self.parameters, self.receiver) }
    }
}

struct RawButton<'a> {
    base: usize,
    layout: &'a ButtonLayout,
}

impl ButtonWidget for RawButton<'_> {
    fn set_selected_index(&self, index: i32) {
        let ok = unsafe { memory::write_i32(self.base + self.layout.selected_index_offset, index) };
        if !ok {
            warn!("button {:#010x}: selected index not writable", self.base);
        }
    }

    fn click(&self) {
        let invocation = unsafe {
            ButtonInvocation {
                parameters: memory::read_ptr(self.base + self.layout.parameters_offset),
                target: memory::read_ptr(self.base + self.layout.click_function_offset),
                receiver: self.base,
            }
        };
        invocation.fire();
    }
}

/// Follow the button pointer at `widget + offset`.
fn button_at<'a>(widget: usize, offset: usize, layout: &'a ButtonLayout) -> Option<RawButton<'a>> {
    let base = unsafe { memory::read_ptr(widget + offset) };
    if base == 0 {
        warn!("widget {widget:#010x}: no button at +{offset:#x}");
        return None;
    }
    Some(RawButton { base, layout })
}

fn select_and_click(widget: usize, offset: usize, layout: &ButtonLayout, index: i32) {
    if let Some(button) = button_at(widget, offset, layout) {
        button.set_selected_index(index);
        button.click();
    }
}

// ============================================================
// Screens
// ============================================================

struct RawServerSelect<'a> {
    base: usize,
    layout: &'a HostLayout,
}

impl ServerSelectWidget for RawServerSelect<'_> {
    fn select_language(&self, id: i32) {
        let l = &self.layout;
        select_and_click(self.base, l.server_select.language_button_offset, &l.button, id);
    }

    fn select_server(&self, id: i32) {
        let l = &self.layout;
        select_and_click(self.base, l.server_select.server_button_offset, &l.button, id);
    }

    fn select_channel(&self, id: i32) {
        let l = &self.layout;
        select_and_click(self.base, l.server_select.channel_button_offset, &l.button, id);
    }

    fn is_visible(&self) -> bool {
        unsafe { memory::read_u8(self.base + self.layout.server_select.visible_offset) != 0 }
    }
}

struct RawCharacterSelect<'a> {
    base: usize,
    layout: &'a HostLayout,
}

impl CharacterSelectWidget for RawCharacterSelect<'_> {
    fn select_character_at(&self, slot: u32) {
        let Ok(index) = i32::try_from(slot) else {
            warn!("character slot {slot} out of range");
            return;
        };
        let l = &self.layout;
        select_and_click(self.base, l.character_select.character_button_offset, &l.button, index);
    }

    fn click_start(&self) {
        let l = &self.layout;
        if let Some(button) = button_at(self.base, l.character_select.start_button_offset, &l.button) {
            button.click();
        }
    }

    fn is_visible(&self) -> bool {
        unsafe { memory::read_u8(self.base + self.layout.character_select.visible_offset) != 0 }
    }
}
