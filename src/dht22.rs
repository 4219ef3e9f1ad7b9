use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::delay::DelayNs;

use crate::capture::{EDGE_CAPACITY, EdgeLog, EdgeSink};
use crate::decode::decode_capture;
use crate::error::{DecodeError, DhtError, TransmissionError};
use crate::port::{PinMode, Pull, SensorPort, Subscription};
use crate::signal::{WakeTiming, send_wake_sequence};
use crate::timing;

/// Unit of [`Reading::temperature`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Converts a temperature in degrees Celsius into this unit.
    pub fn convert_celsius(self, celsius: f32) -> f32 {
        match self {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

/// Reading returned by the AM2302 sensor.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in `unit`.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub relative_humidity: f32,
    pub unit: TemperatureUnit,
}

/// Driver settings. The defaults follow the AM2302 datasheet.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub unit: TemperatureUnit,
    /// Minimum time between two requests.
    pub min_interval_us: u64,
    pub init_hold_us: u32,
    pub start_hold_us: u32,
    /// Capture armed later than this after the request is discarded.
    pub response_window_us: u64,
    pub bit_threshold_us: u32,
    /// Number of sleeps while waiting for the transmission to complete.
    pub wait_attempts: u8,
    pub wait_step_us: u32,
}

impl Config {
    pub const fn new() -> Self {
        Self {
            unit: TemperatureUnit::Celsius,
            min_interval_us: timing::MIN_INTERVAL_US,
            init_hold_us: timing::INIT_HOLD_US,
            start_hold_us: timing::START_HOLD_US,
            response_window_us: timing::RESPONSE_WINDOW_US,
            bit_threshold_us: timing::BIT_THRESHOLD_US,
            wait_attempts: timing::WAIT_ATTEMPTS,
            wait_step_us: timing::WAIT_STEP_US,
        }
    }

    pub const fn with_unit(mut self, unit: TemperatureUnit) -> Self {
        self.unit = unit;
        self
    }

    fn wake_timing(&self) -> WakeTiming {
        WakeTiming {
            init_hold_us: self.init_hold_us,
            start_hold_us: self.start_hold_us,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Requests an in-progress read to stop, e.g. from a signal handler.
///
/// The read returns [`DhtError::Aborted`] after the pin has been cleaned up.
#[derive(Clone, Debug)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Port plus the edge subscription that may be active on it.
struct Connection<P: SensorPort> {
    port: P,
    subscription: Option<P::Subscription>,
}

impl<P: SensorPort> Connection<P> {
    fn ensure_connected(&mut self) -> Result<(), P::Error> {
        if !self.port.is_connected() {
            self.port.connect()?;
        }
        Ok(())
    }

    /// Cancels edge delivery and leaves the pin as a pulled-up input.
    fn disarm(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if self.port.is_connected() {
            // Report the error that caused the cleanup, not a cleanup failure
            let _ = self.port.set_mode(PinMode::Input);
            let _ = self.port.set_pull(Pull::Up);
        }
    }
}

/// Keeps the pin and the edge log in a capture session until dropped.
struct Capture<'a, P: SensorPort> {
    link: &'a mut Connection<P>,
    edges: &'a Arc<EdgeLog>,
}

impl<'a, P: SensorPort> Capture<'a, P> {
    fn new(link: &'a mut Connection<P>, edges: &'a Arc<EdgeLog>) -> Self {
        Self { link, edges }
    }

    fn arm(&mut self) -> Result<(), P::Error> {
        self.edges.arm();
        let sink = EdgeSink::new(self.edges.clone());
        self.link.subscription = Some(self.link.port.subscribe_falling_edges(sink)?);
        Ok(())
    }
}

impl<P: SensorPort> Drop for Capture<'_, P> {
    fn drop(&mut self) {
        self.edges.disarm();
        self.link.disarm();
    }
}

/// Driver for the AM2302 (DHT22) temperature and humidity sensor.
///
/// Edges are timestamped by the GPIO subsystem and decoded after the
/// transmission, so the driver does not depend on tight polling.
pub struct Dht22<P, D>
where
    P: SensorPort,
    D: DelayNs,
{
    link: Connection<P>,
    delay: D,
    config: Config,
    edges: Arc<EdgeLog>,
    abort: Arc<AtomicBool>,
    last_request_us: Option<u64>,
    last_reading: Option<Reading>,
}

impl<P, D> Dht22<P, D>
where
    P: SensorPort,
    D: DelayNs,
{
    /// Creates a new instance of the AM2302 driver with default settings.
    ///
    /// # Arguments
    ///
    /// * `port` - The GPIO line connected to the AM2302 data pin.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    ///
    /// The port is connected on the first read.
    pub fn new(port: P, delay: D) -> Self {
        Self::with_config(port, delay, Config::default())
    }

    pub fn with_config(port: P, delay: D, config: Config) -> Self {
        Dht22 {
            link: Connection {
                port,
                subscription: None,
            },
            delay,
            config,
            edges: Arc::new(EdgeLog::new()),
            abort: Arc::new(AtomicBool::new(false)),
            last_request_us: None,
            last_reading: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.link.port.is_connected()
    }

    /// Last successful reading, cleared when a new read starts.
    pub fn last_reading(&self) -> Option<Reading> {
        self.last_reading
    }

    /// Returns a handle that aborts the read in progress.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.abort.clone())
    }

    /// Reads a temperature and humidity measurement from the AM2302 sensor.
    ///
    /// Blocks until the minimum interval since the previous request has
    /// passed, connects to the GPIO subsystem if needed, requests a
    /// transmission, collects its falling edges and decodes them. The pin is
    /// left as a pulled-up input with no edge subscription on every return.
    ///
    /// The read is not retried. Errors for which
    /// [`DhtError::is_recoverable`] holds can be retried on the next cycle.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` if the transmission was complete and the checksum is valid.
    /// * `Err(DhtError)` otherwise.
    pub fn read(&mut self) -> Result<Reading, DhtError<P::Error>> {
        self.abort.store(false, Ordering::Release);
        self.wait_for_interval();
        if self.abort.swap(false, Ordering::AcqRel) {
            warn!("read aborted before the request");
            return Err(DhtError::Aborted);
        }
        self.last_reading = None;

        if let Err(err) = self.link.ensure_connected() {
            error!("cannot connect to the GPIO subsystem");
            return Err(DhtError::Connection(err));
        }

        let mut edges = [0; EDGE_CAPACITY];
        let count = self.collect_edges(&mut edges)?;
        let stored = &edges[..count.min(EDGE_CAPACITY)];

        let frame = decode_capture(stored, count, self.config.bit_threshold_us)
            .map_err(|err| {
                match err {
                    DecodeError::Transmission(fault) => debug!("faulty transmission: {}", fault),
                    DecodeError::BitCount { bits } => {
                        error!("decoded {} bits from {} edges", bits, count)
                    }
                }
                DhtError::from(err)
            })?;

        if frame.start_edge_missed {
            warn!("missed one edge, usually the first");
        }

        let reading = frame.payload.to_reading(self.config.unit);
        self.last_reading = Some(reading);
        Ok(reading)
    }

    /// Cancels any edge subscription, returns the pin to input and
    /// disconnects. Safe to call more than once; the next read reconnects.
    pub fn release(&mut self) {
        self.edges.disarm();
        self.link.disarm();
        self.link.port.disconnect();
    }

    /// Sleeps until the minimum interval since the last request has passed.
    fn wait_for_interval(&mut self) {
        let Some(last) = self.last_request_us else {
            return;
        };
        let elapsed = self.link.port.now_us().saturating_sub(last);
        if elapsed < self.config.min_interval_us {
            let remaining = self.config.min_interval_us - elapsed;
            debug!("waiting {} us before the next request", remaining);
            self.delay
                .delay_us(u32::try_from(remaining).unwrap_or(u32::MAX));
        }
    }

    /// Requests a transmission and copies its edge timestamps into `out`.
    ///
    /// Returns the number of edges seen, which may exceed what fits in `out`.
    fn collect_edges(
        &mut self,
        out: &mut [u32; EDGE_CAPACITY],
    ) -> Result<usize, DhtError<P::Error>> {
        let mut capture = Capture::new(&mut self.link, &self.edges);

        let released = send_wake_sequence(
            &mut capture.link.port,
            &mut self.delay,
            self.config.wake_timing(),
        )
        .map_err(DhtError::Pin)?;
        self.last_request_us = Some(released);
        trace!("request sent at {} us", released);

        capture.arm().map_err(DhtError::Pin)?;

        let elapsed_us = capture.link.port.now_us().saturating_sub(released);
        if elapsed_us > self.config.response_window_us {
            debug!("capture armed {} us after the request", elapsed_us);
            return Err(TransmissionError::ResponseWindowMissed { elapsed_us }.into());
        }

        for _ in 0..self.config.wait_attempts {
            if self.edges.len() >= timing::FULL_EDGE_COUNT {
                break;
            }
            self.delay.delay_us(self.config.wait_step_us);
            if self.abort.swap(false, Ordering::AcqRel) {
                warn!("read aborted while waiting for edges");
                return Err(DhtError::Aborted);
            }
        }

        drop(capture);
        Ok(self.edges.copy_into(out))
    }
}

impl<P, D> Drop for Dht22<P, D>
where
    P: SensorPort,
    D: DelayNs,
{
    fn drop(&mut self) {
        self.release();
    }
}
