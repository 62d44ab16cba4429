use crate::error::Error;
use crate::radio::{ConnHandle, EncryptionInfo};
use crate::writer::ConfigWrite;
use heapless::Deque;

/// Capacity of the event queue between interrupt handlers and the main loop.
pub const EVENT_QUEUE_SIZE: usize = 10;

/// Buttons that end the session when pressed after boot.
#[derive(strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    /// Sampled at boot to pick the mode; afterwards it finalizes a provisioning session.
    Config,
    /// Restarts so that the bootloader can take over.
    Bootloader,
}

/// Everything the foreground loop reacts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Connected(ConnHandle),
    Disconnected,
    AdvertisingTimeout,
    SecurityParamsRequest,
    SystemAttributesMissing,
    AuthStatus(EncryptionInfo),
    SecurityInfoRequest { div: u16 },
    /// Connection parameter negotiation gave up.
    ConnParamsFailed,
    ConfigWrite(ConfigWrite),
    Button(Button),
    IndicatorTimeout,
}

/// Bounded FIFO of pending events.
pub struct EventQueue {
    events: Deque<Event, EVENT_QUEUE_SIZE>,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
        }
    }

    pub fn push(&mut self, event: Event) -> Result<(), Error> {
        self.events
            .push_back(event)
            .map_err(|_| Error::EventQueueFull)
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
