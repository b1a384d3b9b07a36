//! Single-message mailbox used to pass control between applet slots

use crate::apt::types::{AppletId, MessageParameter, SignalType};
use octr_core::error::AptError;

/// At most one parameter is ever in flight; a second `store` fails with
/// `ParameterPresent` instead of queuing. A separate `delayed` entry
/// holds one parameter destined for a slot that has not registered yet.
#[derive(Default)]
pub struct Mailbox {
    next: Option<MessageParameter>,
    delayed: Option<MessageParameter>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_occupied(&self) -> bool {
        self.next.is_some()
    }

    /// Place a parameter, failing if one is already in flight
    pub fn store(&mut self, parameter: MessageParameter) -> Result<(), AptError> {
        if self.next.is_some() {
            return Err(AptError::ParameterPresent);
        }
        self.next = Some(parameter);
        Ok(())
    }

    /// Place a parameter, discarding any in-flight one
    pub fn force_store(&mut self, parameter: MessageParameter) {
        if self.next.is_some() {
            tracing::debug!(
                "Mailbox: discarding undelivered parameter for {:?}",
                parameter.destination_id
            );
        }
        self.next = Some(parameter);
    }

    /// Read the in-flight parameter without consuming it
    ///
    /// The NS module always clears the DspSleep and DspWakeup signals
    /// even on a glance; that quirk is preserved here.
    pub fn glance(&mut self, app_id: AppletId) -> Result<MessageParameter, AptError> {
        let next = self.next.as_ref().ok_or(AptError::NoData)?;

        if next.destination_id != app_id {
            return Err(AptError::NotFound);
        }

        let parameter = next.clone();
        if matches!(next.signal, SignalType::DspSleep | SignalType::DspWakeup) {
            self.next = None;
        }

        Ok(parameter)
    }

    /// Read and consume the in-flight parameter
    pub fn receive(&mut self, app_id: AppletId) -> Result<MessageParameter, AptError> {
        let parameter = self.glance(app_id)?;
        self.next = None;
        Ok(parameter)
    }

    /// Clear the in-flight parameter if it matches the given filters.
    /// Returns true only when a parameter was actually cleared.
    pub fn cancel(
        &mut self,
        check_sender: bool,
        sender: Option<AppletId>,
        check_receiver: bool,
        receiver: Option<AppletId>,
    ) -> bool {
        let Some(next) = self.next.as_ref() else {
            return false;
        };

        if check_sender && next.sender_id != sender {
            return false;
        }
        if check_receiver && Some(next.destination_id) != receiver {
            return false;
        }

        self.next = None;
        true
    }

    /// Hold a parameter until its destination registers.
    /// Only the most recent deferred parameter is kept.
    pub fn store_delayed(&mut self, parameter: MessageParameter) {
        if let Some(previous) = self.delayed.as_ref() {
            tracing::warn!(
                "Mailbox: deferred parameter for {:?} overwritten by one for {:?}",
                previous.destination_id,
                parameter.destination_id
            );
        }
        self.delayed = Some(parameter);
    }

    /// Take the deferred parameter if it is destined for the given applet
    pub fn take_delayed_for(&mut self, app_id: AppletId) -> Option<MessageParameter> {
        if self.delayed.as_ref()?.destination_id != app_id {
            return None;
        }
        self.delayed.take()
    }

    pub fn has_delayed(&self) -> bool {
        self.delayed.is_some()
    }
}
