use core::fmt::Debug;

/// Faults of a single transmission.
///
/// These are expected on a noisy single-wire link. Wait for the minimum read
/// interval and try again.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransmissionError {
    /// No falling edge was captured; the sensor did not answer at all.
    #[error("no data received from sensor")]
    NoData,
    /// Too few or too many falling edges were captured.
    #[error("received {bits} of 40 bits ({edges} edges)")]
    InsufficientData {
        /// Number of captured edges.
        edges: usize,
        /// Edge count less the start and response edges.
        bits: usize,
    },
    /// The checksum byte does not match the sum of the data bytes.
    #[error("checksum mismatch: expected {expected:#010b}, received {received:#010b}")]
    ChecksumMismatch {
        /// Checksum computed from the four data bytes.
        expected: u8,
        /// Checksum byte sent by the sensor.
        received: u8,
    },
    /// Edge capture was armed too late after the request; pulses may be missing.
    #[error("edge capture armed {elapsed_us}us after the request")]
    ResponseWindowMissed {
        /// Time between the request and arming capture.
        elapsed_us: u64,
    },
}

/// Errors from decoding a buffer of edge timestamps.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Recoverable transmission fault.
    #[error(transparent)]
    Transmission(#[from] TransmissionError),
    /// The bit count after trimming the start bit is not 40 although the edge
    /// count passed the length gate.
    #[error("decoded {bits} bits instead of 40")]
    BitCount {
        /// Number of bits left after trimming.
        bits: usize,
    },
}

/// Possible errors from the AM2302 driver.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DhtError<E>
where
    E: Debug,
{
    /// The GPIO subsystem could not be reached.
    #[error("connection to the GPIO subsystem failed: {0:?}")]
    Connection(E),
    /// Error from the GPIO pin (mode, pull or level change).
    #[error("GPIO pin error: {0:?}")]
    Pin(E),
    /// Recoverable transmission fault; retry after the minimum interval.
    #[error(transparent)]
    Transmission(TransmissionError),
    /// Internal inconsistency between the length gate and the bit decoder.
    #[error("decoded {bits} bits instead of 40")]
    BitCount {
        /// Number of bits left after trimming.
        bits: usize,
    },
    /// The read was aborted through an [`AbortHandle`](crate::AbortHandle).
    #[error("read aborted")]
    Aborted,
}

impl<E: Debug> DhtError<E> {
    /// Returns `true` for faults worth skipping and retrying on the next cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DhtError::Transmission(_))
    }
}

impl<E: Debug> From<TransmissionError> for DhtError<E> {
    fn from(value: TransmissionError) -> Self {
        Self::Transmission(value)
    }
}

impl<E: Debug> From<DecodeError> for DhtError<E> {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::Transmission(err) => Self::Transmission(err),
            DecodeError::BitCount { bits } => Self::BitCount { bits },
        }
    }
}
