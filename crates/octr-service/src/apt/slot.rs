//! Fixed applet slot table and slot resolution

use crate::apt::runtime::AppletRuntime;
use crate::apt::types::{AppletAttributes, AppletId, AppletPos, Notification};
use octr_kernel::event::Event;
use std::sync::Arc;

/// The four fixed execution slots tracked by APT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppletSlot {
    Application,
    SystemApplet,
    HomeMenu,
    LibraryApplet,
}

impl AppletSlot {
    pub const ALL: [AppletSlot; 4] = [
        AppletSlot::Application,
        AppletSlot::SystemApplet,
        AppletSlot::HomeMenu,
        AppletSlot::LibraryApplet,
    ];

    fn index(self) -> usize {
        match self {
            AppletSlot::Application => 0,
            AppletSlot::SystemApplet => 1,
            AppletSlot::HomeMenu => 2,
            AppletSlot::LibraryApplet => 3,
        }
    }
}

/// State of a single applet slot
///
/// Slots are created once at manager construction and reused; `reset`
/// returns a slot to vacancy without deallocating its events.
pub struct AppletSlotData {
    pub slot: AppletSlot,
    pub applet_id: Option<AppletId>,
    pub title_id: u64,
    pub registered: bool,
    pub loaded: bool,
    pub attributes: AppletAttributes,
    pub notification: Notification,
    pub notification_event: Arc<Event>,
    pub parameter_event: Arc<Event>,
    pub runtime: Option<AppletRuntime>,
}

impl AppletSlotData {
    fn new(slot: AppletSlot) -> Self {
        Self {
            slot,
            applet_id: None,
            title_id: 0,
            registered: false,
            loaded: false,
            attributes: AppletAttributes::default(),
            notification: Notification::None,
            notification_event: Arc::new(Event::new("APT:Notification")),
            parameter_event: Arc::new(Event::new("APT:Parameter")),
            runtime: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.applet_id.is_some()
    }

    /// Return the slot to vacancy, terminating any native process
    pub fn reset(&mut self) {
        self.applet_id = None;
        self.title_id = 0;
        self.registered = false;
        self.loaded = false;
        self.attributes = AppletAttributes::default();
        self.notification = Notification::None;
        if let Some(AppletRuntime::Native(process)) = self.runtime.take() {
            process.terminate();
        }
    }
}

/// Table of all four applet slots
pub struct SlotTable {
    slots: [AppletSlotData; 4],
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            slots: AppletSlot::ALL.map(AppletSlotData::new),
        }
    }

    pub fn get(&self, slot: AppletSlot) -> &AppletSlotData {
        &self.slots[slot.index()]
    }

    pub fn get_mut(&mut self, slot: AppletSlot) -> &mut AppletSlotData {
        &mut self.slots[slot.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppletSlotData> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AppletSlotData> {
        self.slots.iter_mut()
    }

    /// Applet id occupying a slot, if any
    pub fn applet_id(&self, slot: Option<AppletSlot>) -> Option<AppletId> {
        slot.and_then(|s| self.get(s).applet_id)
    }

    /// Resolve an applet id to a slot
    ///
    /// Wildcard selectors resolve through occupancy and position checks;
    /// concrete ids scan occupied slots for an exact match.
    pub fn resolve_id(&self, id: AppletId) -> Option<AppletSlot> {
        match id {
            AppletId::Application => {
                self.get(AppletSlot::Application)
                    .is_occupied()
                    .then_some(AppletSlot::Application)
            }
            AppletId::AnySystemApplet => {
                if self.get(AppletSlot::SystemApplet).is_occupied() {
                    return Some(AppletSlot::SystemApplet);
                }
                // The Home Menu is also a system applet, but it lives in
                // its own slot so it can run concurrently with other
                // system applets.
                self.get(AppletSlot::HomeMenu)
                    .is_occupied()
                    .then_some(AppletSlot::HomeMenu)
            }
            AppletId::AnyLibraryApplet | AppletId::AnySysLibraryApplet => {
                let slot = self.get(AppletSlot::LibraryApplet);
                if !slot.is_occupied() {
                    return None;
                }

                let wanted = if id == AppletId::AnyLibraryApplet {
                    AppletPos::Library
                } else {
                    AppletPos::SysLibrary
                };
                (slot.attributes.pos == wanted).then_some(AppletSlot::LibraryApplet)
            }
            AppletId::HomeMenu | AppletId::AlternateMenu => {
                self.get(AppletSlot::HomeMenu)
                    .is_occupied()
                    .then_some(AppletSlot::HomeMenu)
            }
            _ => self
                .slots
                .iter()
                .find(|slot| slot.applet_id == Some(id))
                .map(|slot| slot.slot),
        }
    }

    /// Resolve an attributes word to a slot
    pub fn resolve_attributes(&self, attributes: AppletAttributes) -> Option<AppletSlot> {
        let slot = Self::slot_from_pos(attributes.pos)?;

        // The Home Menu is a system applet, however, it has its own slot
        // so that it can run concurrently with other system applets.
        if slot == AppletSlot::SystemApplet && attributes.is_home_menu {
            return Some(AppletSlot::HomeMenu);
        }

        Some(slot)
    }

    /// Fixed mapping from hierarchy position to slot
    pub fn slot_from_pos(pos: AppletPos) -> Option<AppletSlot> {
        match pos {
            AppletPos::Application => Some(AppletSlot::Application),
            AppletPos::Library | AppletPos::SysLibrary | AppletPos::AutoLibrary => {
                Some(AppletSlot::LibraryApplet)
            }
            AppletPos::System => Some(AppletSlot::SystemApplet),
            AppletPos::Resident | AppletPos::Invalid => None,
        }
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupy(table: &mut SlotTable, slot: AppletSlot, id: AppletId, pos: AppletPos) {
        let data = table.get_mut(slot);
        data.applet_id = Some(id);
        data.attributes = AppletAttributes::new(pos);
        data.registered = true;
    }

    #[test]
    fn test_resolve_concrete_id() {
        let mut table = SlotTable::new();
        assert_eq!(table.resolve_id(AppletId::SoftwareKeyboard1), None);

        occupy(
            &mut table,
            AppletSlot::LibraryApplet,
            AppletId::SoftwareKeyboard1,
            AppletPos::Library,
        );
        assert_eq!(
            table.resolve_id(AppletId::SoftwareKeyboard1),
            Some(AppletSlot::LibraryApplet)
        );
    }

    #[test]
    fn test_any_system_applet_prefers_system_slot() {
        let mut table = SlotTable::new();
        assert_eq!(table.resolve_id(AppletId::AnySystemApplet), None);

        occupy(
            &mut table,
            AppletSlot::HomeMenu,
            AppletId::HomeMenu,
            AppletPos::System,
        );
        assert_eq!(
            table.resolve_id(AppletId::AnySystemApplet),
            Some(AppletSlot::HomeMenu)
        );

        occupy(
            &mut table,
            AppletSlot::SystemApplet,
            AppletId::InternetBrowser,
            AppletPos::System,
        );
        assert_eq!(
            table.resolve_id(AppletId::AnySystemApplet),
            Some(AppletSlot::SystemApplet)
        );
    }

    #[test]
    fn test_any_library_applet_checks_position() {
        let mut table = SlotTable::new();
        occupy(
            &mut table,
            AppletSlot::LibraryApplet,
            AppletId::Error,
            AppletPos::SysLibrary,
        );

        assert_eq!(table.resolve_id(AppletId::AnyLibraryApplet), None);
        assert_eq!(
            table.resolve_id(AppletId::AnySysLibraryApplet),
            Some(AppletSlot::LibraryApplet)
        );
    }

    #[test]
    fn test_resolve_attributes_home_menu_special_case() {
        let table = SlotTable::new();

        let system = AppletAttributes::new(AppletPos::System);
        assert_eq!(
            table.resolve_attributes(system),
            Some(AppletSlot::SystemApplet)
        );

        let menu = AppletAttributes {
            pos: AppletPos::System,
            is_home_menu: true,
            ..Default::default()
        };
        assert_eq!(table.resolve_attributes(menu), Some(AppletSlot::HomeMenu));
    }

    #[test]
    fn test_resolve_attributes_invalid_positions() {
        let table = SlotTable::new();
        assert_eq!(
            table.resolve_attributes(AppletAttributes::new(AppletPos::Resident)),
            None
        );
        assert_eq!(
            table.resolve_attributes(AppletAttributes::from_raw(0x6)),
            None
        );
    }

    #[test]
    fn test_reset_vacates_slot() {
        let mut table = SlotTable::new();
        occupy(
            &mut table,
            AppletSlot::LibraryApplet,
            AppletId::Mint,
            AppletPos::Library,
        );

        table.get_mut(AppletSlot::LibraryApplet).reset();
        let slot = table.get(AppletSlot::LibraryApplet);
        assert!(!slot.is_occupied());
        assert!(!slot.registered);
        assert_eq!(slot.attributes, AppletAttributes::default());
    }
}
