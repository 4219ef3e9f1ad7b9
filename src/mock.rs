//! Scripted GPIO port and clock-driven delay for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, PinState};

use crate::capture::EdgeSink;
use crate::port::{PinMode, Pull, SensorPort, Subscription};

/// Pin operation seen by the mock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Connect,
    Disconnect,
    Mode(PinMode),
    Pull(Pull),
    Write(PinState),
    Subscribe,
    Cancel,
}

#[derive(Default)]
struct State {
    ops: Vec<Op>,
    now_us: u64,
    connected: bool,
    connect_error: Option<ErrorKind>,
    write_error: Option<ErrorKind>,
    mode: Option<PinMode>,
    pull: Option<Pull>,
    responses: VecDeque<Vec<u32>>,
    arm_latency_us: u64,
    sink: Option<EdgeSink>,
    active_subscriptions: usize,
    requests: Vec<u64>,
}

/// Shared handle; clones observe the same pin.
#[derive(Clone, Default)]
pub struct MockPort {
    state: Rc<RefCell<State>>,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&mut self, now_us: u64) {
        self.state.borrow_mut().now_us = now_us;
    }

    pub fn advance(&self, us: u64) {
        self.state.borrow_mut().now_us += us;
    }

    pub fn fail_connect(&mut self, err: ErrorKind) {
        self.state.borrow_mut().connect_error = Some(err);
    }

    pub fn fail_writes(&mut self, err: ErrorKind) {
        self.state.borrow_mut().write_error = Some(err);
    }

    /// Queues the edges the sensor answers with on the next subscription.
    pub fn respond_with(&mut self, edges: Vec<u32>) {
        self.state.borrow_mut().responses.push_back(edges);
    }

    /// Time spent between the release of the line and an active subscription.
    pub fn set_arm_latency(&mut self, us: u64) {
        self.state.borrow_mut().arm_latency_us = us;
    }

    /// Delivers an edge through the current subscription, if any.
    pub fn emit(&self, timestamp_us: u32) {
        let state = self.state.borrow();
        if state.active_subscriptions > 0 {
            if let Some(sink) = &state.sink {
                sink.record(timestamp_us);
            }
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.borrow().ops.clone()
    }

    pub fn mode(&self) -> Option<PinMode> {
        self.state.borrow().mode
    }

    pub fn pull(&self) -> Option<Pull> {
        self.state.borrow().pull
    }

    pub fn active_subscriptions(&self) -> usize {
        self.state.borrow().active_subscriptions
    }

    /// Times at which the line was pulled low to request a reading.
    pub fn requests(&self) -> Vec<u64> {
        self.state.borrow().requests.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.state.borrow().ops.iter().filter(|o| **o == op).count()
    }

    /// Delay that advances this port's clock.
    pub fn delay(&self) -> MockDelay {
        MockDelay {
            state: self.state.clone(),
            hook: None,
        }
    }
}

impl ErrorType for MockPort {
    type Error = ErrorKind;
}

impl OutputPin for MockPort {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.write_error {
            return Err(err);
        }
        let now = state.now_us;
        state.requests.push(now);
        state.ops.push(Op::Write(PinState::Low));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.write_error {
            return Err(err);
        }
        state.ops.push(Op::Write(PinState::High));
        Ok(())
    }
}

impl SensorPort for MockPort {
    type Subscription = MockSubscription;

    fn connect(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.ops.push(Op::Connect);
        if let Some(err) = state.connect_error {
            return Err(err);
        }
        state.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    fn disconnect(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.connected {
            state.connected = false;
            state.ops.push(Op::Disconnect);
        }
    }

    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.mode = Some(mode);
        state.ops.push(Op::Mode(mode));
        Ok(())
    }

    fn set_pull(&mut self, pull: Pull) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.pull = Some(pull);
        state.ops.push(Op::Pull(pull));
        Ok(())
    }

    fn subscribe_falling_edges(
        &mut self,
        sink: EdgeSink,
    ) -> Result<Self::Subscription, Self::Error> {
        let mut state = self.state.borrow_mut();
        state.ops.push(Op::Subscribe);
        state.active_subscriptions += 1;
        let latency = state.arm_latency_us;
        state.now_us += latency;
        if let Some(edges) = state.responses.pop_front() {
            for edge in edges {
                sink.record(edge);
            }
        }
        state.sink = Some(sink);
        Ok(MockSubscription {
            state: self.state.clone(),
            cancelled: false,
        })
    }

    fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }
}

pub struct MockSubscription {
    state: Rc<RefCell<State>>,
    cancelled: bool,
}

impl Subscription for MockSubscription {
    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        let mut state = self.state.borrow_mut();
        state.active_subscriptions -= 1;
        state.sink = None;
        state.ops.push(Op::Cancel);
    }
}

/// `DelayNs` that moves the mock clock forward instead of sleeping.
pub struct MockDelay {
    state: Rc<RefCell<State>>,
    hook: Option<Box<dyn FnMut()>>,
}

impl MockDelay {
    /// Runs `hook` after every delay, e.g. to inject edges or abort a read.
    pub fn on_delay(mut self, hook: impl FnMut() + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.state.borrow_mut().now_us += u64::from(ns).div_ceil(1_000);
        if let Some(hook) = self.hook.as_mut() {
            hook();
        }
    }
}

/// Falling-edge timestamps of a transmission of `bytes`, starting at `start`.
///
/// Zero bits are 70us pulses, one bits 120us. With `with_start` the sensor's
/// response edge is included, giving 42 edges instead of 41.
pub fn encode_edges(bytes: [u8; 5], start: u32, with_start: bool) -> Vec<u32> {
    let mut t = start;
    let mut edges = vec![t];
    if with_start {
        t = t.wrapping_add(160);
        edges.push(t);
    }
    for byte in bytes {
        for i in 0..8 {
            let bit = (byte >> (7 - i)) & 1;
            t = t.wrapping_add(if bit == 1 { 120 } else { 70 });
            edges.push(t);
        }
    }
    edges
}
