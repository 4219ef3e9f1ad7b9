//! Decoding of captured falling-edge timestamps.
//!
//! Every data bit starts with the sensor pulling the line low for ~50us and
//! then releasing it for ~25us (0) or ~75us (1), so the time between two
//! falling edges encodes one bit. A full capture holds 42 edges: the end of the
//! sensor's response signal, then one edge per bit boundary. The response edge
//! is frequently missed, leaving 41.

use crate::dht22::{Reading, TemperatureUnit};
use crate::error::{DecodeError, TransmissionError};
use crate::timing::FULL_EDGE_COUNT;

/// Number of data bits in one transmission.
pub const PAYLOAD_BITS: usize = 40;

/// The five bytes sent by the sensor.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payload {
    bytes: [u8; 5],
}

impl Payload {
    pub const fn new(bytes: [u8; 5]) -> Self {
        Self { bytes }
    }

    /// Packs 40 bits, most significant bit first, into a payload.
    ///
    /// A 41st leading bit is the sensor's start pulse and is dropped.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::BitCount` if anything other than 40 bits remain.
    pub fn from_bits(bits: &[bool]) -> Result<Self, DecodeError> {
        let bits = match bits {
            [_start, rest @ ..] if bits.len() == PAYLOAD_BITS + 1 => rest,
            _ => bits,
        };
        if bits.len() != PAYLOAD_BITS {
            return Err(DecodeError::BitCount { bits: bits.len() });
        }

        let mut bytes = [0; 5];
        for (byte, chunk) in bytes.iter_mut().zip(bits.chunks_exact(8)) {
            *byte = chunk
                .iter()
                .fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit));
        }
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> [u8; 5] {
        self.bytes
    }

    /// Checksum byte as transmitted.
    pub fn checksum(&self) -> u8 {
        self.bytes[4]
    }

    /// Low byte of the sum of the four data bytes, sign bit included.
    pub fn expected_checksum(&self) -> u8 {
        self.bytes[..4]
            .iter()
            .fold(0u8, |sum, v| sum.wrapping_add(*v))
    }

    /// Checks the transmitted checksum against the data bytes.
    pub fn verify(&self) -> Result<(), TransmissionError> {
        let expected = self.expected_checksum();
        let received = self.checksum();
        if expected != received {
            return Err(TransmissionError::ChecksumMismatch { expected, received });
        }
        Ok(())
    }

    /// Relative humidity in percent.
    pub fn relative_humidity(&self) -> f32 {
        let [hum_hi, hum_lo, ..] = self.bytes;
        u16::from_be_bytes([hum_hi, hum_lo]) as f32 / 10.0
    }

    /// Temperature in degrees Celsius.
    ///
    /// Bit 7 of the high byte is a sign flag, the remaining 15 bits are the
    /// magnitude in tenths of a degree.
    pub fn celsius(&self) -> f32 {
        let [_, _, temp_hi, temp_lo, _] = self.bytes;
        let is_negative = (temp_hi >> 7) != 0;
        let magnitude = u16::from_be_bytes([temp_hi & 0b0111_1111, temp_lo]) as f32 / 10.0;
        if is_negative { -magnitude } else { magnitude }
    }

    /// Converts the payload into a reading in `unit`.
    ///
    /// Does not check the checksum.
    pub fn to_reading(&self, unit: TemperatureUnit) -> Reading {
        Reading {
            temperature: unit.convert_celsius(self.celsius()),
            relative_humidity: self.relative_humidity(),
            unit,
        }
    }
}

/// A checked payload together with capture diagnostics.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub payload: Payload,
    /// Only 41 edges arrived; the response edge was most likely missed.
    pub start_edge_missed: bool,
}

/// Checks the number of captured edges before decoding.
///
/// # Returns
///
/// * `Ok(false)` for a complete capture of 42 edges.
/// * `Ok(true)` for 41 edges, which is tolerated.
/// * `Err(TransmissionError)` for every other count.
pub fn check_edge_count(edges: usize) -> Result<bool, TransmissionError> {
    match edges {
        0 => Err(TransmissionError::NoData),
        n if n == FULL_EDGE_COUNT - 1 => Ok(true),
        FULL_EDGE_COUNT => Ok(false),
        n => Err(TransmissionError::InsufficientData {
            edges: n,
            bits: n.saturating_sub(2),
        }),
    }
}

/// Turns consecutive edges into bits: a pulse longer than `threshold_us` is a 1.
///
/// Timestamps come from a free-running tick counter, so the difference wraps.
pub fn pulse_bits(edges: &[u32], threshold_us: u32) -> impl Iterator<Item = bool> + '_ {
    edges
        .windows(2)
        .map(move |pair| pair[1].wrapping_sub(pair[0]) > threshold_us)
}

/// Decodes and checks one capture.
///
/// # Errors
///
/// * `DecodeError::Transmission` if the edge count is wrong or the checksum
///   does not match.
/// * `DecodeError::BitCount` if the bit count is off after passing the edge
///   count check.
pub fn decode(edges: &[u32], threshold_us: u32) -> Result<Frame, DecodeError> {
    decode_capture(edges, edges.len(), threshold_us)
}

/// Like [`decode`], for a capture of which only the first `edges.len()` of
/// `seen` edges were stored. The edge count check uses `seen`.
pub fn decode_capture(
    edges: &[u32],
    seen: usize,
    threshold_us: u32,
) -> Result<Frame, DecodeError> {
    let start_edge_missed = check_edge_count(seen)?;

    let mut bits = [false; FULL_EDGE_COUNT - 1];
    let mut count = 0;
    for (slot, bit) in bits.iter_mut().zip(pulse_bits(edges, threshold_us)) {
        *slot = bit;
        count += 1;
    }

    let payload = Payload::from_bits(&bits[..count])?;
    payload.verify()?;

    Ok(Frame {
        payload,
        start_edge_missed,
    })
}
