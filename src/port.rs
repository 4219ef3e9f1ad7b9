//! Capabilities the driver needs from the GPIO subsystem.
//!
//! Level writes go through [`OutputPin`]. Everything `embedded-hal` does not
//! model (direction and pull switching, edge notification, connection to a
//! GPIO daemon, the tick clock) is part of [`SensorPort`].

use embedded_hal::digital::OutputPin;

use crate::capture::EdgeSink;

/// Direction of the data pin.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinMode {
    Input,
    Output,
}

/// Pull resistor applied to the data pin.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    Up,
    Down,
    None,
}

/// Active falling-edge notification. Cancelling twice must be harmless.
pub trait Subscription {
    /// Stops delivering edges to the sink.
    fn cancel(&mut self);
}

/// A GPIO line the sensor's data pin is wired to.
///
/// # Example Implementation
///
/// ```ignore
/// impl SensorPort for PigpioLine {
///     type Subscription = PigpioCallback;
///
///     fn subscribe_falling_edges(&mut self, sink: EdgeSink) -> Result<PigpioCallback, Self::Error> {
///         self.pi.callback(self.gpio, FALLING_EDGE, move |_gpio, _level, tick| sink.record(tick))
///     }
///     // ...
/// }
/// ```
pub trait SensorPort: OutputPin {
    /// Handle that keeps edge delivery alive until cancelled.
    type Subscription: Subscription;

    /// Establishes the connection to the GPIO subsystem.
    fn connect(&mut self) -> Result<(), Self::Error>;

    fn is_connected(&self) -> bool;

    /// Releases the connection. Calling this while disconnected does nothing.
    fn disconnect(&mut self);

    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error>;

    fn set_pull(&mut self, pull: Pull) -> Result<(), Self::Error>;

    /// Delivers the tick of every falling edge on the pin to `sink` until the
    /// returned subscription is cancelled.
    fn subscribe_falling_edges(&mut self, sink: EdgeSink)
    -> Result<Self::Subscription, Self::Error>;

    /// Monotonic time in microseconds.
    fn now_us(&self) -> u64;
}
