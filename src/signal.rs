use embedded_hal::delay::DelayNs;

use crate::port::{PinMode, Pull, SensorPort};

/// Hold times of the request sequence.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WakeTiming {
    /// High level before the start signal.
    pub init_hold_us: u32,
    /// Low level that tells the sensor to measure.
    pub start_hold_us: u32,
}

/// Sends the start signal to the AM2302 and releases the line.
///
/// The line is driven high through the pull-up, held low for the start time,
/// then handed back to the pull-up by switching to input. It is not driven high
/// before the release; doing so leaves the line at an intermediate level when
/// the sensor pulls down and corrupts the first bit.
///
/// # Returns
///
/// The time of the release, which is when the sensor starts answering.
pub fn send_wake_sequence<P, D>(
    port: &mut P,
    delay: &mut D,
    timing: WakeTiming,
) -> Result<u64, P::Error>
where
    P: SensorPort,
    D: DelayNs,
{
    // Idle high
    port.set_pull(Pull::Up)?;
    port.set_high()?;
    port.set_mode(PinMode::Output)?;
    delay.delay_us(timing.init_hold_us);

    // Start signal
    port.set_low()?;
    delay.delay_us(timing.start_hold_us);

    // Release
    port.set_mode(PinMode::Input)?;
    port.set_pull(Pull::Up)?;

    Ok(port.now_us())
}
