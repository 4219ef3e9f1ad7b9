//! AM2302 protocol timing.
//!
//! All values are in microseconds.

/// Minimum time between two requests. Faster polling yields unreliable data.
pub const MIN_INTERVAL_US: u64 = 2_000_000;

/// Time the line is held high before the start signal.
pub const INIT_HOLD_US: u32 = 500;

/// Time the line is held low to request a measurement.
pub const START_HOLD_US: u32 = 1_500;

/// Latest point after the request at which edge capture may be armed.
pub const RESPONSE_WINDOW_US: u64 = 270;

/// Pulse width separating a 0 bit (50us low + ~25us high) from a 1 bit
/// (50us low + ~75us high).
pub const BIT_THRESHOLD_US: u32 = 100;

/// Sensor response signal (80us low + 80us high).
pub const RESPONSE_PULSE_US: u32 = 160;

/// Upper bound of a single data pulse.
pub const MAX_BIT_PULSE_US: u32 = 120;

/// One wait step while edges arrive: ten times the longest possible transmission.
pub const WAIT_STEP_US: u32 = (RESPONSE_PULSE_US + 41 * MAX_BIT_PULSE_US) * 10;

/// How many wait steps are taken before decoding whatever arrived.
pub const WAIT_ATTEMPTS: u8 = 2;

/// Falling edges in a complete transmission: response edge, start edge and
/// one per data bit.
pub const FULL_EDGE_COUNT: usize = 42;
