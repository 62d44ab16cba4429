use crate::error::Error;
#[cfg(feature = "defmt")]
use defmt::info;
use embedded_hal::digital::InputPin;

/// Operating mode of a session. It is decided once at boot and only left by restarting.
#[derive(strum::Display, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Non-connectable advertising of the stored identity.
    Beacon,
    /// Connectable advertising with the provisioning service enabled.
    Config,
}

/// Samples the config button and picks the mode. The button pulls the pin low, so a low level
/// selects [`Mode::Config`].
///
/// Has to run before the radio starts advertising; the pin is expected to be debounced already.
pub fn select_mode<P: InputPin>(config_pin: &mut P) -> Result<Mode, Error> {
    let pressed = config_pin.is_low().map_err(|_| Error::InputPin)?;
    let mode = if pressed { Mode::Config } else { Mode::Beacon };

    #[cfg(feature = "defmt")]
    info!("mode selected: {}", mode);

    Ok(mode)
}
