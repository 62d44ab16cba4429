use crate::advertising::Advertisement;
use crate::error::Error;
use crate::event::{Button, Event, EventQueue};
use crate::indicator::Indicator;
use crate::mode::{Mode, select_mode};
use crate::platform::Platform;
use crate::radio::{
    Board, ConnHandle, EncryptionInfo, HCI_CONN_INTERVAL_UNACCEPTABLE, RadioStack,
};
use crate::record::ConfigRecord;
use crate::settings::Settings;
use crate::storage::{BlockStorage, Completion};
use crate::store::ConfigStore;
use crate::writer::handle_write;
#[cfg(feature = "defmt")]
use defmt::{debug, error, info, warn};
use embedded_hal::digital::InputPin;

/// Why a session ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RestartReason {
    Disconnected,
    AdvertisingTimeout,
    ConfigButton,
    Bootloader,
    Fatal(Error),
}

/// Session state. `Running` is entered at boot and never changes mode; every path out of it
/// ends in `Restart`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Running(Mode),
    /// An unrecoverable error was observed; the next [`Beacon::process`] restarts.
    Fatal(Error),
    /// Terminal. Storage is quiescent and the device may be reset.
    Restart(RestartReason),
}

/// Result of one main loop iteration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    /// Every event is handled and the flash is quiescent. The caller may sleep until the next
    /// interrupt.
    Idle,
    /// Reset the device. All flash operations have finished.
    Restart(RestartReason),
}

/// One boot-to-reset session of the beacon.
///
/// Interrupt handlers hand their events to [`Beacon::post`], the main loop calls
/// [`Beacon::process`] until it returns [`Control::Restart`] and then resets the chip.
pub struct Beacon<T: Platform, R: RadioStack, B: Board> {
    store: ConfigStore<T>,
    radio: R,
    board: B,
    settings: Settings,
    state: State,
    advertisement: Advertisement,
    indicator: Indicator,
    events: EventQueue,
    conn: Option<ConnHandle>,
    auth: Option<EncryptionInfo>,
}

impl<T: Platform, R: RadioStack, B: Board> Beacon<T, R, B> {
    /// Picks the mode from `config_pin`, loads (or initializes) the stored record and starts
    /// advertising.
    ///
    /// An error leaves the device unusable; the caller resets after the storage became
    /// quiescent, which `boot` already guarantees for the flash writes it issued.
    pub fn boot<P: InputPin>(
        storage: BlockStorage<T>,
        radio: R,
        board: B,
        config_pin: &mut P,
        settings: Settings,
    ) -> Result<Self, Error> {
        let mode = select_mode(config_pin)?;

        let mut store = ConfigStore::with_defaults(storage, settings.default_record)?;
        let record = store.load()?;
        let advertisement = Advertisement::for_mode(mode, &record, &settings)?;

        let mut beacon = Self {
            store,
            radio,
            board,
            settings,
            state: State::Running(mode),
            advertisement,
            indicator: Indicator::new(mode),
            events: EventQueue::new(),
            conn: None,
            auth: None,
        };
        beacon.start()?;

        #[cfg(feature = "defmt")]
        info!("boot: advertising in {} mode", mode);

        Ok(beacon)
    }

    fn start(&mut self) -> Result<(), Error> {
        let adv = &self.advertisement;
        if adv.mode == Mode::Config {
            self.radio.set_device_name(self.settings.device_name)?;
            self.radio.set_preferred_conn_params(&self.settings.connection)?;
            self.radio.register_provisioning_service(&adv.beacon_info)?;
        }
        self.radio.set_advertising_data(&adv.adv_data, &adv.scan_data)?;
        self.board.start_indicator_timer(Indicator::initial_ticks())?;
        self.radio.start_advertising(&adv.params)?;
        Ok(())
    }

    /// Queues an event from interrupt context. An overflowing queue is fatal.
    pub fn post(&mut self, event: Event) -> Result<(), Error> {
        self.events.push(event).inspect_err(|&e| self.fail(e))
    }

    /// Runs one main loop iteration: handles every queued event, then runs the flash operations
    /// they queued.
    pub fn process(&mut self) -> Control {
        if let State::Restart(reason) = self.state {
            return Control::Restart(reason);
        }

        while let State::Running(_) = self.state {
            let Some(event) = self.events.pop() else {
                break;
            };
            match self.handle(event) {
                Ok(None) => {}
                Ok(Some(reason)) => return self.restart(reason),
                Err(e) => self.fail(e),
            }
        }

        while let Some(completion) = self.store.poll() {
            self.on_storage_complete(completion);
        }

        match self.state {
            State::Running(_) => Control::Idle,
            State::Fatal(e) => self.restart(RestartReason::Fatal(e)),
            State::Restart(reason) => Control::Restart(reason),
        }
    }

    fn handle(&mut self, event: Event) -> Result<Option<RestartReason>, Error> {
        #[cfg(feature = "defmt")]
        debug!("event: {}", event);

        match event {
            Event::Connected(conn) => self.conn = Some(conn),
            Event::Disconnected => {
                self.conn = None;
                return Ok(Some(RestartReason::Disconnected));
            }
            Event::AdvertisingTimeout => return Ok(Some(RestartReason::AdvertisingTimeout)),
            Event::Button(Button::Config) => return Ok(Some(RestartReason::ConfigButton)),
            Event::Button(Button::Bootloader) => return Ok(Some(RestartReason::Bootloader)),
            Event::SecurityParamsRequest => {
                if let Some(conn) = self.conn {
                    self.radio.reply_security_params(conn, &self.settings.security)?;
                }
            }
            Event::SystemAttributesMissing => {
                if let Some(conn) = self.conn {
                    self.radio.set_system_attributes(conn)?;
                }
            }
            Event::AuthStatus(info) => self.auth = Some(info),
            Event::SecurityInfoRequest { div } => {
                if let Some(conn) = self.conn {
                    let keys = self.auth.as_ref().filter(|keys| keys.div == div);
                    self.radio.reply_security_info(conn, keys)?;
                }
            }
            Event::ConnParamsFailed => {
                if let Some(conn) = self.conn {
                    self.radio.disconnect(conn, HCI_CONN_INTERVAL_UNACCEPTABLE)?;
                }
            }
            Event::ConfigWrite(write) => {
                if self.mode() == Mode::Config {
                    // one commit in flight
                    self.store.wait_for_quiescence()?;
                    handle_write(&mut self.store, &write)?;
                } else {
                    #[cfg(feature = "defmt")]
                    warn!("ignoring config write outside of config mode");
                }
            }
            Event::IndicatorTimeout => {
                let blink = self.indicator.step();
                self.board.set_leds(blink.mask, blink.lit);
                self.board.start_indicator_timer(blink.next_ticks)?;
            }
        }
        Ok(None)
    }

    fn on_storage_complete(&mut self, completion: Completion) {
        #[cfg(feature = "defmt")]
        debug!("storage: {} of {} bytes done", completion.op, completion.len);

        if let Err(e) = completion.result {
            self.fail(e);
        }
    }

    fn fail(&mut self, e: Error) {
        #[cfg(feature = "defmt")]
        error!("fatal: {}", e);

        if let State::Running(_) = self.state {
            self.state = State::Fatal(e);
        }
    }

    /// Waits for the flash before entering the terminal state. A flash failure surfacing here
    /// turns a regular exit into a fatal one.
    fn restart(&mut self, reason: RestartReason) -> Control {
        let reason = match (self.store.wait_for_quiescence(), reason) {
            (Err(_e), RestartReason::Fatal(_)) => {
                #[cfg(feature = "defmt")]
                warn!("storage failed while restarting: {}", _e);
                reason
            }
            (Err(e), _) => RestartReason::Fatal(e),
            (Ok(()), _) => reason,
        };

        #[cfg(feature = "defmt")]
        info!("restart: {}", reason);

        self.state = State::Restart(reason);
        Control::Restart(reason)
    }

    pub fn mode(&self) -> Mode {
        self.advertisement.mode
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The record as it is in flash. A write shows up here once its store completed.
    pub fn record(&self) -> &ConfigRecord {
        self.store.record()
    }

    /// The advertisement handed to the radio at boot.
    pub fn advertisement(&self) -> &Advertisement {
        &self.advertisement
    }

    pub fn connection(&self) -> Option<ConnHandle> {
        self.conn
    }

    pub fn store(&self) -> &ConfigStore<T> {
        &self.store
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn board(&self) -> &B {
        &self.board
    }
}
