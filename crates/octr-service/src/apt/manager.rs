//! The applet manager: slot lifecycle, mailbox dispatch and the
//! prepare/start/close protocols
//!
//! One manager instance is authoritative per emulated system. It runs
//! synchronously on whichever caller invokes it; waiting happens outside,
//! on the per-slot readiness events or by polling glance/receive.

use crate::apt::mailbox::Mailbox;
use crate::apt::runtime::{
    AppletRuntime, HleApplet, HleAppletFactory, SystemResetHandler, TitleLauncher,
};
use crate::apt::slot::{AppletSlot, SlotTable};
use crate::apt::title;
use crate::apt::types::{
    AppletAttributes, AppletId, AppletPos, ApplicationJumpFlags, ApplicationJumpParameters,
    ApplicationRunningMode, ApplicationStartParameters, DeliverArg, MediaType, MessageParameter,
    Notification, SharedObject, SignalType, TargetPlatform,
};
use octr_core::config::{Region, SystemConfig};
use octr_core::error::AptError;
use octr_kernel::event::Event;
use octr_kernel::process::Process;
use parking_lot::Mutex;
use std::sync::Arc;

/// Advisory lock returned by `get_lock_handle`
///
/// Callers are expected to hold it across a prepare/start or
/// prepare/close sequence; the manager itself does not enforce this.
pub type LockHandle = Arc<Mutex<()>>;

/// Readiness events handed back to a newly initialized applet
pub struct InitializeResult {
    pub notification_event: Arc<Event>,
    pub parameter_event: Arc<Event>,
}

/// Per-applet information reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppletInfo {
    pub title_id: u64,
    pub media_type: MediaType,
    pub registered: bool,
    pub loaded: bool,
    pub attributes: AppletAttributes,
}

/// Snapshot of the manager's occupancy state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppletManInfo {
    pub active_applet_pos: AppletPos,
    pub requested_applet_id: Option<AppletId>,
    pub home_menu_applet_id: Option<AppletId>,
    pub active_applet_id: Option<AppletId>,
}

pub struct AppletManager {
    region: Region,
    is_new_3ds: bool,

    slots: SlotTable,
    mailbox: Mailbox,
    active_slot: Option<AppletSlot>,

    last_library_launcher_slot: Option<AppletSlot>,
    last_system_launcher_slot: Option<AppletSlot>,
    last_prepared_library_applet: Option<AppletId>,
    last_jump_to_home_slot: Option<AppletSlot>,
    library_applet_closing_signal: SignalType,
    ordered_to_close_sys_applet: bool,
    ordered_to_close_application: bool,
    application_close_returns_to_system: bool,

    app_start_parameters: Option<ApplicationStartParameters>,
    app_jump_parameters: Option<ApplicationJumpParameters>,
    deliver_arg: Option<DeliverArg>,

    lock: LockHandle,

    launcher: Arc<dyn TitleLauncher>,
    reset_handler: Arc<dyn SystemResetHandler>,
    hle_applets: Option<Arc<dyn HleAppletFactory>>,
}

impl AppletManager {
    pub fn new(
        config: &SystemConfig,
        launcher: Arc<dyn TitleLauncher>,
        reset_handler: Arc<dyn SystemResetHandler>,
        hle_applets: Option<Arc<dyn HleAppletFactory>>,
    ) -> Self {
        Self {
            region: config.region,
            is_new_3ds: config.is_new_3ds,
            slots: SlotTable::new(),
            mailbox: Mailbox::new(),
            active_slot: None,
            last_library_launcher_slot: None,
            last_system_launcher_slot: None,
            last_prepared_library_applet: None,
            last_jump_to_home_slot: None,
            library_applet_closing_signal: SignalType::None,
            ordered_to_close_sys_applet: false,
            ordered_to_close_application: false,
            application_close_returns_to_system: true,
            app_start_parameters: None,
            app_jump_parameters: None,
            deliver_arg: None,
            lock: Arc::new(Mutex::new(())),
            launcher,
            reset_handler,
            hle_applets,
        }
    }

    pub fn active_slot(&self) -> Option<AppletSlot> {
        self.active_slot
    }

    // ------------------------------------------------------------------
    // Registration lifecycle

    /// Return the APT lock, correcting ambiguous library positions.
    ///
    /// A "library"/"sys-library"/"auto" position is rewritten based on
    /// who last launched a library applet: the application gets Library,
    /// anything else gets SysLibrary.
    pub fn get_lock_handle(
        &self,
        mut attributes: AppletAttributes,
    ) -> (AppletAttributes, LockHandle) {
        if matches!(
            attributes.pos,
            AppletPos::Library | AppletPos::SysLibrary | AppletPos::AutoLibrary
        ) {
            attributes.pos = if self.last_library_launcher_slot == Some(AppletSlot::Application) {
                AppletPos::Library
            } else {
                AppletPos::SysLibrary
            };
        }
        (attributes, Arc::clone(&self.lock))
    }

    /// Occupy the slot selected by `attributes` and hand back its
    /// readiness events. The very first applet to initialize becomes the
    /// active slot and wakes itself up.
    pub fn initialize(
        &mut self,
        app_id: AppletId,
        attributes: AppletAttributes,
    ) -> Result<InitializeResult, AptError> {
        // The real NS module indexes the slot array without validating
        // the attributes first; an unresolvable position is a caller bug.
        let slot = self
            .slots
            .resolve_attributes(attributes)
            .expect("invalid applet attributes");

        let title_id = title::title_id_for_applet(app_id, self.region, self.is_new_3ds);

        let slot_data = self.slots.get_mut(slot);
        if slot_data.registered {
            return Err(AptError::AlreadyExists);
        }

        slot_data.applet_id = Some(app_id);
        slot_data.attributes = attributes;
        if let Some(title_id) = title_id {
            slot_data.title_id = title_id;
        }

        let notification_event = Arc::clone(&slot_data.notification_event);
        let parameter_event = Arc::clone(&slot_data.parameter_event);

        if self.active_slot.is_none() {
            self.active_slot = Some(slot);

            // Bootstrap: nothing else will wake up the first applet, so
            // queue its wakeup here and signal the parameter event.
            self.cancel_and_send_parameter(MessageParameter {
                sender_id: None,
                destination_id: app_id,
                signal: SignalType::Wakeup,
                object: None,
                buffer: Vec::new(),
            });
        }

        tracing::debug!("Initialized {:?} in slot {:?}", app_id, slot);
        Ok(InitializeResult {
            notification_event,
            parameter_event,
        })
    }

    /// Mark the slot as registered and flush any deferred parameter
    /// destined for it.
    pub fn enable(&mut self, attributes: AppletAttributes) -> Result<(), AptError> {
        let slot = self
            .slots
            .resolve_attributes(attributes)
            .ok_or(AptError::InvalidAppletSlot)?;

        let applet_id = {
            let slot_data = self.slots.get_mut(slot);
            slot_data.registered = true;
            slot_data.applet_id
        };
        tracing::debug!("Enabled slot {:?} ({:?})", slot, applet_id);

        if let Some(applet_id) = applet_id {
            if self.mailbox.is_occupied() {
                // A parameter still in flight is never overwritten; the
                // deferred entry stays queued until a later enable retries.
                if self.mailbox.has_delayed() {
                    tracing::warn!(
                        "Mailbox busy, deferred parameter for {:?} stays queued",
                        applet_id
                    );
                }
            } else if let Some(parameter) = self.mailbox.take_delayed_for(applet_id) {
                self.send_parameter(parameter)?;
            }
        }

        Ok(())
    }

    /// Vacate the applet's slot entirely
    pub fn finalize(&mut self, app_id: AppletId) -> Result<(), AptError> {
        let slot = self.slots.resolve_id(app_id).ok_or(AptError::NotFound)?;
        self.slots.get_mut(slot).reset();
        if self.active_slot == Some(slot) {
            self.active_slot = None;
        }
        Ok(())
    }

    pub fn count_registered_applets(&self) -> u32 {
        self.slots.iter().filter(|slot| slot.registered).count() as u32
    }

    pub fn is_registered(&self, app_id: AppletId) -> bool {
        if let Some(slot) = self.slots.resolve_id(app_id) {
            if self.slots.get(slot).registered {
                return true;
            }
        }

        // Simulated applets never register a slot themselves.
        match app_id {
            AppletId::AnyLibraryApplet | AppletId::AnySysLibraryApplet => matches!(
                self.slots.get(AppletSlot::LibraryApplet).runtime,
                Some(AppletRuntime::Simulated(_))
            ),
            id => self.simulated_instance(id).is_some(),
        }
    }

    pub fn get_attribute(&self, app_id: AppletId) -> Result<AppletAttributes, AptError> {
        let slot = self.slots.resolve_id(app_id).ok_or(AptError::NotFound)?;
        let slot_data = self.slots.get(slot);
        if !slot_data.registered {
            return Err(AptError::NotFound);
        }
        Ok(slot_data.attributes)
    }

    // ------------------------------------------------------------------
    // Mailbox protocol

    /// Unconditionally place a parameter and signal the destination's
    /// parameter event. Discards any parameter still in flight.
    pub fn cancel_and_send_parameter(&mut self, parameter: MessageParameter) {
        let destination = parameter.destination_id;
        self.mailbox.force_store(parameter);

        match self.slots.resolve_id(destination) {
            Some(slot) => self.slots.get(slot).parameter_event.signal(),
            None => tracing::debug!("No applet registered with id {:?}", destination),
        }
    }

    /// Send a parameter, failing if one is already in flight.
    ///
    /// Simulated destinations are delivered to synchronously; everything
    /// else goes through the mailbox.
    pub fn send_parameter(&mut self, parameter: MessageParameter) -> Result<(), AptError> {
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }

        if let Some(applet) = self.simulated_instance(parameter.destination_id) {
            tracing::debug!(
                "Delivering {:?} directly to simulated applet {:?}",
                parameter.signal,
                parameter.destination_id
            );
            return applet.receive_parameter(&parameter);
        }

        self.cancel_and_send_parameter(parameter);
        Ok(())
    }

    pub fn glance_parameter(&mut self, app_id: AppletId) -> Result<MessageParameter, AptError> {
        self.mailbox.glance(app_id)
    }

    pub fn receive_parameter(&mut self, app_id: AppletId) -> Result<MessageParameter, AptError> {
        self.mailbox.receive(app_id)
    }

    pub fn cancel_parameter(
        &mut self,
        check_sender: bool,
        sender: Option<AppletId>,
        check_receiver: bool,
        receiver: Option<AppletId>,
    ) -> bool {
        self.mailbox.cancel(check_sender, sender, check_receiver, receiver)
    }

    /// Deliver now if the destination slot is registered, otherwise hold
    /// the parameter until it registers through `enable`.
    pub fn send_parameter_after_registration(
        &mut self,
        parameter: MessageParameter,
    ) -> Result<(), AptError> {
        let registered = self
            .slots
            .resolve_id(parameter.destination_id)
            .map(|slot| self.slots.get(slot).registered)
            .unwrap_or(false);

        if registered {
            return self.send_parameter(parameter);
        }

        self.mailbox.store_delayed(parameter);
        Ok(())
    }

    /// Tell whichever applet owns the DSP that it is about to sleep.
    pub fn send_dsp_sleep(
        &mut self,
        from: AppletId,
        object: Option<SharedObject>,
    ) -> Result<(), AptError> {
        self.send_dsp_signal(SignalType::DspSleep, from, object)
    }

    pub fn send_dsp_wakeup(
        &mut self,
        from: AppletId,
        object: Option<SharedObject>,
    ) -> Result<(), AptError> {
        self.send_dsp_signal(SignalType::DspWakeup, from, object)
    }

    /// A registered library applet services DSP power transitions unless
    /// it opted out, in which case the system applet does.
    fn send_dsp_signal(
        &mut self,
        signal: SignalType,
        from: AppletId,
        object: Option<SharedObject>,
    ) -> Result<(), AptError> {
        let library = self.slots.get(AppletSlot::LibraryApplet);
        let destination = if library.registered && !library.attributes.no_exit_on_system_applet {
            library.applet_id
        } else {
            let system = self.slots.get(AppletSlot::SystemApplet);
            if system.registered {
                system.applet_id
            } else {
                None
            }
        };

        match destination {
            Some(destination_id) => self.send_parameter(MessageParameter {
                sender_id: Some(from),
                destination_id,
                signal,
                object,
                buffer: Vec::new(),
            }),
            None => {
                tracing::debug!("No applet to service {:?}", signal);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Notifications

    /// Read and clear the slot's pending notification
    pub fn inquire_notification(&mut self, app_id: AppletId) -> Result<Notification, AptError> {
        let slot = self.slots.resolve_id(app_id).ok_or(AptError::NotFound)?;
        let slot_data = self.slots.get_mut(slot);
        if !slot_data.registered {
            return Err(AptError::NotFound);
        }
        Ok(std::mem::replace(
            &mut slot_data.notification,
            Notification::None,
        ))
    }

    /// Post a notification to the active slot
    pub fn send_notification(&mut self, notification: Notification) {
        if let Some(active) = self.active_slot {
            let slot_data = self.slots.get_mut(active);
            if slot_data.registered {
                slot_data.notification = notification;
                slot_data.notification_event.signal();
            }
        }
    }

    /// Post a notification to every registered slot
    pub fn send_notification_to_all(&mut self, notification: Notification) {
        for slot_data in self.slots.iter_mut() {
            if slot_data.registered {
                slot_data.notification = notification;
                slot_data.notification_event.signal();
            }
        }
    }

    // ------------------------------------------------------------------
    // Library applet protocol

    pub fn prepare_to_start_library_applet(&mut self, applet_id: AppletId) -> Result<(), AptError> {
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }
        if self.slots.get(AppletSlot::LibraryApplet).registered {
            return Err(AptError::AlreadyExists);
        }

        self.last_library_launcher_slot = self.active_slot;
        self.last_prepared_library_applet = Some(applet_id);
        self.load_library_applet(applet_id, false)
    }

    /// Like prepare, but the slot is not considered loaded until
    /// `finish_preloading_library_applet` is called.
    pub fn preload_library_applet(&mut self, applet_id: AppletId) -> Result<(), AptError> {
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }
        if self.slots.get(AppletSlot::LibraryApplet).registered {
            return Err(AptError::AlreadyExists);
        }

        self.last_library_launcher_slot = self.active_slot;
        self.last_prepared_library_applet = Some(applet_id);
        self.load_library_applet(applet_id, true)
    }

    pub fn finish_preloading_library_applet(
        &mut self,
        applet_id: AppletId,
    ) -> Result<(), AptError> {
        // TODO: fail when the applet is not actually in the preloading state.
        tracing::debug!("Finished preloading {:?}", applet_id);
        self.slots.get_mut(AppletSlot::LibraryApplet).loaded = true;
        Ok(())
    }

    fn load_library_applet(&mut self, applet_id: AppletId, preload: bool) -> Result<(), AptError> {
        let native = match title::title_id_for_applet(applet_id, self.region, self.is_new_3ds) {
            Some(title_id) => match self.launcher.launch_title(MediaType::Nand, title_id) {
                Ok(process) => Some(process),
                Err(err) => {
                    tracing::warn!(
                        "Native title 0x{:016X} for {:?} unavailable: {}",
                        title_id,
                        applet_id,
                        err
                    );
                    None
                }
            },
            None => None,
        };

        let runtime = match native {
            Some(process) => AppletRuntime::Native(process),
            None => {
                // Fall back to an in-process simulated applet.
                let factory = self.hle_applets.as_ref().ok_or(AptError::NotSupported)?;
                let parent = self.slots.applet_id(self.last_library_launcher_slot);
                AppletRuntime::Simulated(factory.create(applet_id, parent, preload)?)
            }
        };

        let slot_data = self.slots.get_mut(AppletSlot::LibraryApplet);
        slot_data.runtime = Some(runtime);
        slot_data.loaded = !preload;
        Ok(())
    }

    /// Make the library applet the active slot and wake it up
    pub fn start_library_applet(
        &mut self,
        applet_id: AppletId,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        let previous_active = self.active_slot;
        self.active_slot = Some(AppletSlot::LibraryApplet);

        let parameter = MessageParameter {
            sender_id: self.slots.applet_id(self.last_library_launcher_slot),
            destination_id: applet_id,
            signal: SignalType::Wakeup,
            object: object.clone(),
            buffer: buffer.clone(),
        };

        if let Err(err) = self.send_parameter(parameter) {
            self.active_slot = previous_active;
            return Err(err);
        }

        // Simulated applets also get their startup entry point invoked.
        if let Some(applet) = self.simulated_instance(applet_id) {
            applet.start(object, &buffer)?;
        }

        Ok(())
    }

    /// Record how the subsequent close should wake the launcher
    pub fn prepare_to_close_library_applet(
        &mut self,
        not_pause: bool,
        exiting: bool,
        jump_home: bool,
    ) -> Result<(), AptError> {
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }

        self.library_applet_closing_signal = if !not_pause {
            SignalType::WakeupByPause
        } else if jump_home {
            SignalType::WakeupToJumpHome
        } else if exiting {
            SignalType::WakeupByCancel
        } else {
            SignalType::WakeupByExit
        };

        Ok(())
    }

    /// Hand control back to the launcher. Unless the closing signal is
    /// the pause variant, the library applet slot is vacated.
    pub fn close_library_applet(
        &mut self,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        let sender_id = self.slots.get(AppletSlot::LibraryApplet).applet_id;
        let destination = self.slots.applet_id(self.last_library_launcher_slot);

        self.active_slot = self.last_library_launcher_slot;

        let result = match destination {
            Some(destination_id) => self.send_parameter(MessageParameter {
                sender_id,
                destination_id,
                signal: self.library_applet_closing_signal,
                object,
                buffer,
            }),
            None => {
                tracing::warn!("Library applet closed with no launcher to notify");
                Ok(())
            }
        };

        if self.library_applet_closing_signal != SignalType::WakeupByPause {
            self.slots.get_mut(AppletSlot::LibraryApplet).reset();
        }

        result
    }

    /// Ask the running library applet to wind itself down
    pub fn cancel_library_applet(&mut self, app_exiting: bool) -> Result<(), AptError> {
        let slot_data = self.slots.get(AppletSlot::LibraryApplet);
        if !slot_data.registered {
            return Err(AptError::InvalidAppletSlot);
        }
        let sender_id = slot_data.applet_id;

        let destination_id = self
            .slots
            .applet_id(self.last_library_launcher_slot)
            .ok_or(AptError::NotFound)?;

        tracing::debug!("Cancelling library applet (app_exiting={})", app_exiting);
        self.send_parameter(MessageParameter {
            sender_id,
            destination_id,
            signal: SignalType::WakeupByCancel,
            object: None,
            buffer: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // System applet protocol

    pub fn prepare_to_start_system_applet(&mut self, applet_id: AppletId) -> Result<(), AptError> {
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }
        tracing::debug!("Preparing to start system applet {:?}", applet_id);
        self.last_system_launcher_slot = self.active_slot;
        Ok(())
    }

    /// Launch (if needed) and hand control to a system applet.
    ///
    /// The wakeup goes through deferred delivery since a freshly
    /// launched target has not registered yet.
    pub fn start_system_applet(
        &mut self,
        applet_id: AppletId,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        let target = if applet_id == AppletId::HomeMenu {
            AppletSlot::HomeMenu
        } else {
            AppletSlot::SystemApplet
        };

        let sender_id = self.slots.applet_id(self.last_system_launcher_slot);

        // A system applet that launches another never closes itself
        // explicitly; its slot is vacated here instead.
        if self.last_system_launcher_slot == Some(AppletSlot::SystemApplet) {
            self.slots.get_mut(AppletSlot::SystemApplet).reset();
        }

        if !self.slots.get(target).registered {
            let process = self.launch_applet_title(applet_id).map_err(|err| {
                tracing::error!(
                    "System applet {:?} has no launchable title, requesting shutdown",
                    applet_id
                );
                self.reset_handler.request_shutdown();
                err
            })?;
            self.slots.get_mut(target).runtime = Some(AppletRuntime::Native(process));
        }

        self.active_slot = Some(target);

        self.send_parameter_after_registration(MessageParameter {
            sender_id,
            destination_id: applet_id,
            signal: SignalType::Wakeup,
            object,
            buffer,
        })
    }

    /// Ask the running system applet to shut itself down. The applet
    /// answers with the usual prepare-to-close/close sequence, after
    /// which control lands on the application instead of the launcher.
    pub fn order_to_close_system_applet(&mut self) -> Result<(), AptError> {
        let system = self.slots.get(AppletSlot::SystemApplet);
        if !system.registered {
            return Err(AptError::InvalidAppletSlot);
        }
        let Some(destination_id) = system.applet_id else {
            return Err(AptError::InvalidAppletSlot);
        };

        self.ordered_to_close_sys_applet = true;
        self.active_slot = Some(AppletSlot::SystemApplet);
        self.cancel_and_send_parameter(MessageParameter {
            sender_id: Some(AppletId::Application),
            destination_id,
            signal: SignalType::WakeupByCancel,
            object: None,
            buffer: Vec::new(),
        });
        Ok(())
    }

    pub fn prepare_to_close_system_applet(&mut self) -> Result<(), AptError> {
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }
        Ok(())
    }

    /// Hand control back to whoever launched the closing system applet
    /// and vacate its slot. System applets have no pause variant.
    pub fn close_system_applet(
        &mut self,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        let active = self.active_slot.expect("no active applet slot");
        assert!(
            matches!(active, AppletSlot::SystemApplet | AppletSlot::HomeMenu),
            "attempted to close a system applet from a non-system slot"
        );

        let sender_id = self.slots.get(active).applet_id;

        if self.ordered_to_close_sys_applet {
            // The application ordered this close, so it takes the
            // foreground instead of the original launcher.
            self.ordered_to_close_sys_applet = false;
            self.active_slot = Some(AppletSlot::Application);
            self.slots.get_mut(active).reset();
            self.cancel_and_send_parameter(MessageParameter {
                sender_id,
                destination_id: AppletId::Application,
                signal: SignalType::WakeupByExit,
                object,
                buffer,
            });
            return Ok(());
        }

        self.active_slot = self.last_system_launcher_slot;

        let result = match self.slots.applet_id(self.last_system_launcher_slot) {
            Some(destination_id) => self.send_parameter(MessageParameter {
                sender_id,
                destination_id,
                signal: SignalType::WakeupByExit,
                object,
                buffer,
            }),
            None => Ok(()),
        };

        self.slots.get_mut(active).reset();
        result
    }

    // ------------------------------------------------------------------
    // Home Menu jump protocol

    /// Record who holds the foreground so the jump knows which slot is
    /// yielding, and make sure the menu exists when an application jumps.
    pub fn prepare_to_jump_to_home_menu(&mut self) -> Result<(), AptError> {
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }

        self.last_jump_to_home_slot = self.active_slot;
        if self.last_jump_to_home_slot == Some(AppletSlot::Application) {
            self.ensure_home_menu_loaded();
        }
        Ok(())
    }

    /// Hand the foreground to the Home Menu. How the yielding slot gets
    /// out of the way depends on its position: applications pause in
    /// place, library applets are told to close first.
    pub fn jump_to_home_menu(
        &mut self,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        let Some(slot) = self.last_jump_to_home_slot else {
            return Ok(());
        };

        let (applet_id, pos, is_home_menu, loaded) = {
            let slot_data = self.slots.get(slot);
            let Some(applet_id) = slot_data.applet_id else {
                return Ok(());
            };
            (
                applet_id,
                slot_data.attributes.pos,
                slot_data.attributes.is_home_menu,
                slot_data.loaded,
            )
        };

        match pos {
            AppletPos::Application => {
                self.active_slot = Some(AppletSlot::HomeMenu);
                self.send_parameter(MessageParameter {
                    sender_id: Some(applet_id),
                    destination_id: AppletId::HomeMenu,
                    signal: SignalType::WakeupByPause,
                    object,
                    buffer,
                })
            }
            AppletPos::Library => self.send_parameter(MessageParameter {
                sender_id: Some(applet_id),
                destination_id: applet_id,
                signal: SignalType::WakeupByCancel,
                object,
                buffer,
            }),
            AppletPos::SysLibrary => {
                let signal = if loaded {
                    SignalType::WakeupByPause
                } else {
                    SignalType::WakeupByCancel
                };
                self.send_parameter(MessageParameter {
                    sender_id: Some(applet_id),
                    destination_id: applet_id,
                    signal,
                    object,
                    buffer,
                })
            }
            AppletPos::System if is_home_menu => self.send_parameter(MessageParameter {
                sender_id: Some(applet_id),
                destination_id: applet_id,
                signal: SignalType::WakeupByPause,
                object,
                buffer,
            }),
            _ => Ok(()),
        }
    }

    pub fn prepare_to_leave_home_menu(&mut self) -> Result<(), AptError> {
        if !self.slots.get(AppletSlot::Application).registered {
            return Err(AptError::InvalidAppletSlot);
        }
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }
        Ok(())
    }

    /// Resume the paused application and give it the foreground back.
    pub fn leave_home_menu(
        &mut self,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        self.active_slot = Some(AppletSlot::Application);
        self.send_parameter(MessageParameter {
            sender_id: self.slots.get(AppletSlot::HomeMenu).applet_id,
            destination_id: AppletId::Application,
            signal: SignalType::WakeupByPause,
            object,
            buffer,
        })
    }

    // ------------------------------------------------------------------
    // Application start & jump protocol

    /// Only a system-position applet (the Home Menu included) may stage
    /// an application start, and only one start may be pending.
    pub fn prepare_to_start_application(
        &mut self,
        title_id: u64,
        media_type: MediaType,
    ) -> Result<(), AptError> {
        let from_system_position = self
            .active_slot
            .map(|slot| self.slots.get(slot).attributes.pos == AppletPos::System)
            .unwrap_or(false);
        if !from_system_position {
            return Err(AptError::InvalidAppletSlot);
        }

        if self.slots.get(AppletSlot::Application).registered {
            return Err(AptError::AlreadyExists);
        }
        if self.app_start_parameters.is_some() {
            return Err(AptError::AlreadyExists);
        }

        self.app_start_parameters = Some(ApplicationStartParameters {
            next_title_id: title_id,
            next_media_type: media_type,
        });
        Ok(())
    }

    /// Launch the staged application. There is no fallback: a launch
    /// failure requests a system shutdown.
    pub fn start_application(
        &mut self,
        parameter: Vec<u8>,
        hmac: Vec<u8>,
        paused: bool,
    ) -> Result<(), AptError> {
        // The delivery argument is set unconditionally.
        self.deliver_arg = Some(DeliverArg {
            param: parameter,
            hmac,
            ..Default::default()
        });

        let start = self
            .app_start_parameters
            .take()
            .expect("start_application called without a prepared start");

        match self.launcher.launch_title(start.next_media_type, start.next_title_id) {
            Ok(process) => {
                let slot_data = self.slots.get_mut(AppletSlot::Application);
                slot_data.title_id = start.next_title_id;
                slot_data.runtime = Some(AppletRuntime::Native(process));
            }
            Err(err) => {
                tracing::error!(
                    "Failed to launch title 0x{:016X} during application start, requesting \
                     shutdown: {}",
                    start.next_title_id,
                    err
                );
                self.reset_handler.request_shutdown();
                return Err(AptError::NotSupported);
            }
        }

        if !paused {
            return self.wakeup_application(None, Vec::new());
        }
        Ok(())
    }

    /// Wake the application on behalf of the Home Menu. Delivery is
    /// deferred because the application may still be registering.
    pub fn wakeup_application(
        &mut self,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        let sender_id = self.slots.get(AppletSlot::HomeMenu).applet_id;
        self.send_parameter_after_registration(MessageParameter {
            sender_id,
            destination_id: AppletId::Application,
            signal: SignalType::Wakeup,
            object,
            buffer,
        })
    }

    pub fn cancel_application(&mut self) -> Result<(), AptError> {
        if !self.slots.get(AppletSlot::Application).registered {
            return Err(AptError::InvalidAppletSlot);
        }

        let sender_id = self.slots.applet_id(self.active_slot);
        self.send_parameter_after_registration(MessageParameter {
            sender_id,
            destination_id: AppletId::Application,
            signal: SignalType::WakeupByCancel,
            object: None,
            buffer: Vec::new(),
        })
    }

    /// Ask the running application to exit on the Home Menu's behalf.
    /// The application answers with prepare-to-close/close.
    pub fn order_to_close_application(&mut self) -> Result<(), AptError> {
        if !self.slots.get(AppletSlot::Application).is_occupied() {
            return Err(AptError::InvalidAppletSlot);
        }

        self.ordered_to_close_application = true;
        self.active_slot = Some(AppletSlot::Application);
        self.cancel_and_send_parameter(MessageParameter {
            sender_id: self.slots.get(AppletSlot::HomeMenu).applet_id,
            destination_id: AppletId::Application,
            signal: SignalType::WakeupByCancel,
            object: None,
            buffer: Vec::new(),
        });
        Ok(())
    }

    /// `return_to_sys` picks what happens after the close: hand the
    /// foreground back to the Home Menu, or power the system down.
    pub fn prepare_to_close_application(&mut self, return_to_sys: bool) -> Result<(), AptError> {
        if !self.slots.get(AppletSlot::Application).is_occupied() {
            return Err(AptError::InvalidAppletSlot);
        }
        if self.mailbox.is_occupied() {
            return Err(AptError::ParameterPresent);
        }

        self.application_close_returns_to_system = return_to_sys;
        Ok(())
    }

    /// Vacate the application slot and resolve the fate staged by
    /// `prepare_to_close_application`.
    pub fn close_application(
        &mut self,
        object: Option<SharedObject>,
        buffer: Vec<u8>,
    ) -> Result<(), AptError> {
        let sender_id = self.slots.get(AppletSlot::Application).applet_id;
        self.slots.get_mut(AppletSlot::Application).reset();
        self.ordered_to_close_application = false;

        if !self.application_close_returns_to_system {
            tracing::info!("Application closed without a return target, shutting down");
            self.reset_handler.request_shutdown();
            if self.active_slot == Some(AppletSlot::Application) {
                self.active_slot = None;
            }
            return Ok(());
        }

        let destination = {
            let home_menu = self.slots.get(AppletSlot::HomeMenu);
            if home_menu.registered {
                home_menu.applet_id
            } else {
                None
            }
        };

        match destination {
            Some(destination_id) => {
                self.active_slot = Some(AppletSlot::HomeMenu);
                self.cancel_and_send_parameter(MessageParameter {
                    sender_id,
                    destination_id,
                    signal: SignalType::WakeupByExit,
                    object,
                    buffer,
                });
            }
            None => {
                if self.active_slot == Some(AppletSlot::Application) {
                    self.active_slot = None;
                }
            }
        }
        Ok(())
    }

    /// Capture the jump's current/next title pair.
    ///
    /// `UseStoredParameters` was never observed in the wild and its
    /// semantics are unknown; it is refused rather than guessed at.
    pub fn prepare_to_do_application_jump(
        &mut self,
        title_id: u64,
        media_type: MediaType,
        flags: ApplicationJumpFlags,
    ) -> Result<(), AptError> {
        assert!(
            flags != ApplicationJumpFlags::UseStoredParameters,
            "unsupported application jump flags"
        );

        let application = self.slots.get(AppletSlot::Application);
        let next_title_id = if flags == ApplicationJumpFlags::UseCurrentParameters {
            application.title_id
        } else {
            title_id
        };

        self.app_jump_parameters = Some(ApplicationJumpParameters {
            next_title_id,
            next_media_type: media_type,
            flags,
            current_title_id: application.title_id,
            // The media of the running application is not tracked.
            current_media_type: MediaType::Nand,
        });
        Ok(())
    }

    /// Vacate the application slot and relaunch into the jump target.
    ///
    /// Real hardware routes the jump through the Home Menu; here it is
    /// approximated with a full system reset targeting the next title's
    /// install path.
    pub fn do_application_jump(&mut self, mut arg: DeliverArg) -> Result<(), AptError> {
        let jump = self
            .app_jump_parameters
            .expect("application jump without preparation");

        if jump.flags != ApplicationJumpFlags::UseCurrentParameters {
            // The source program id is only rewritten when jumping to a
            // different title.
            arg.source_program_id = self.slots.get(AppletSlot::Application).title_id;
        }

        self.slots.get_mut(AppletSlot::Application).reset();
        self.deliver_arg = Some(arg);
        self.active_slot = Some(AppletSlot::Application);

        let path = self.launcher.content_path(jump.next_media_type, jump.next_title_id);
        if path.is_none() {
            tracing::warn!(
                "Could not resolve content path for title 0x{:016X}",
                jump.next_title_id
            );
        }
        self.reset_handler.request_reset(path);
        Ok(())
    }

    pub fn receive_deliver_arg(&mut self) -> Option<DeliverArg> {
        self.deliver_arg.take()
    }

    pub fn set_deliver_arg(&mut self, arg: Option<DeliverArg>) {
        self.deliver_arg = arg;
    }

    // ------------------------------------------------------------------
    // Home Menu bootstrap

    /// Launch the Home Menu title if it is not already running.
    /// A launch failure is tolerated; application jumping simply will
    /// not work without it.
    pub fn ensure_home_menu_loaded(&mut self) {
        assert!(
            !self.slots.get(AppletSlot::SystemApplet).registered,
            "a system applet is already running"
        );

        if self.slots.get(AppletSlot::HomeMenu).registered {
            return;
        }

        match self.launch_applet_title(AppletId::HomeMenu) {
            Ok(process) => {
                self.slots.get_mut(AppletSlot::HomeMenu).runtime =
                    Some(AppletRuntime::Native(process));
            }
            Err(_) => {
                tracing::warn!(
                    "The Home Menu failed to launch, application jumping will not work."
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Queries

    pub fn get_applet_info(&self, app_id: AppletId) -> Result<AppletInfo, AptError> {
        match self.slots.resolve_id(app_id) {
            Some(slot) if self.slots.get(slot).registered => {
                let slot_data = self.slots.get(slot);
                Ok(AppletInfo {
                    title_id: slot_data.title_id,
                    media_type: MediaType::Nand,
                    registered: true,
                    loaded: slot_data.loaded,
                    attributes: slot_data.attributes,
                })
            }
            _ if self.simulated_instance(app_id).is_some() => {
                tracing::warn!("Using simulated applet info for {:?}", app_id);
                Ok(AppletInfo {
                    title_id: 0,
                    media_type: MediaType::Nand,
                    registered: true,
                    loaded: true,
                    attributes: AppletAttributes::default(),
                })
            }
            _ => Err(AptError::NotFound),
        }
    }

    pub fn get_applet_man_info(&self, requested_pos: AppletPos) -> AppletManInfo {
        AppletManInfo {
            active_applet_pos: self
                .active_slot
                .map(|slot| self.slots.get(slot).attributes.pos)
                .unwrap_or(AppletPos::Invalid),
            requested_applet_id: SlotTable::slot_from_pos(requested_pos)
                .and_then(|slot| self.slots.get(slot).applet_id),
            home_menu_applet_id: self.slots.get(AppletSlot::HomeMenu).applet_id,
            active_applet_id: self.slots.applet_id(self.active_slot),
        }
    }

    pub fn target_platform(&self) -> TargetPlatform {
        if self.is_new_3ds {
            TargetPlatform::New3ds
        } else {
            TargetPlatform::Old3ds
        }
    }

    pub fn application_running_mode(&self) -> ApplicationRunningMode {
        let application = self.slots.get(AppletSlot::Application);
        if !application.is_occupied() {
            return ApplicationRunningMode::NoApplication;
        }
        match (self.is_new_3ds, application.registered) {
            (true, true) => ApplicationRunningMode::New3dsRegistered,
            (false, true) => ApplicationRunningMode::Old3dsRegistered,
            (true, false) => ApplicationRunningMode::New3dsUnregistered,
            (false, false) => ApplicationRunningMode::Old3dsUnregistered,
        }
    }

    // ------------------------------------------------------------------
    // Internals

    fn launch_applet_title(&self, applet_id: AppletId) -> Result<Arc<Process>, AptError> {
        let title_id = title::title_id_for_applet(applet_id, self.region, self.is_new_3ds)
            .ok_or_else(|| {
                tracing::error!("No title known for applet {:?}", applet_id);
                AptError::NotSupported
            })?;

        self.launcher
            .launch_title(MediaType::Nand, title_id)
            .map_err(|err| {
                tracing::warn!("Failed to launch title 0x{:016X}: {}", title_id, err);
                AptError::NotSupported
            })
    }

    /// The simulated instance serving an applet id, if one exists
    fn simulated_instance(&self, app_id: AppletId) -> Option<Arc<dyn HleApplet>> {
        for slot_data in self.slots.iter() {
            if let Some(AppletRuntime::Simulated(applet)) = slot_data.runtime.as_ref() {
                let matches = slot_data.applet_id == Some(app_id)
                    || (slot_data.slot == AppletSlot::LibraryApplet
                        && self.last_prepared_library_applet == Some(app_id));
                if matches {
                    return Some(Arc::clone(applet));
                }
            }
        }
        None
    }
}
