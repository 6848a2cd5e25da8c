//! Staged-processor skeleton.
//!
//! A [`Pipeline`] is a fixed-depth sequence of stages, each holding at most
//! one packet, with a per-stage transform, stall predicate, and residence
//! latency. It provides:
//! 1. **Drain-before-fill advance:** Stages are walked back to front, so a
//!    packet never jumps two stages in one tick.
//! 2. **Latency holds:** A packet stays in its stage until the stage's
//!    latency has elapsed; the latency may depend on the packet.
//! 3. **Back-pressure:** A stalled or occupied downstream stage holds the
//!    upstream packet in place and counts a stall.
//! 4. **Self-generation:** Stage 0's transform is also called with no input,
//!    letting a stage emit packets from an internal buffer.
//!
//! The default per-stage latency is a construction parameter: `0` suits
//! direct `advance()` calls in unit tests, `1` and above suits
//! scheduler-driven ticking.

use std::fmt;
use std::rc::Rc;

use crate::fabric::packet::Packet;
use crate::fabric::port::{Port, PortDirection, PortMap};
use crate::trace::Tracer;

/// Name of the dedicated stall control port.
pub const STALL_PORT: &str = "stall";

/// A pipeline stage: transform, stall predicate, and optional per-packet
/// residence latency.
pub trait Stage {
    /// Stage name for traces.
    fn name(&self) -> &str;

    /// Transforms a packet as it moves into this stage. Stage 0 receives
    /// `None` when no input port had data and may still produce a packet
    /// from internal state. Returning `None` consumes the input.
    fn process(&mut self, input: Option<Packet>, now: u64) -> Option<Packet>;

    /// True if this stage refuses to accept `packet` this tick.
    fn should_stall(&self, packet: &Packet) -> bool {
        let _ = packet;
        false
    }

    /// Residence latency override for `packet` in the *upstream* slot.
    /// `None` uses the pipeline's per-slot latency.
    fn hold_cycles(&self, packet: &Packet) -> Option<u64> {
        let _ = packet;
        None
    }
}

/// A stage that passes packets through unchanged.
#[derive(Debug, Clone)]
pub struct Passthrough {
    name: String,
}

impl Passthrough {
    /// Creates a passthrough stage.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Stage for Passthrough {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, input: Option<Packet>, _now: u64) -> Option<Packet> {
        input
    }
}

#[derive(Debug, Default)]
struct Slot {
    packet: Option<Packet>,
    entered_at: u64,
    cycles_in_stage: u64,
}

/// Fixed-depth staged processor.
pub struct Pipeline {
    name: String,
    slots: Vec<Slot>,
    stages: Vec<Box<dyn Stage>>,
    latencies: Vec<u64>,
    ports: PortMap,
    total_processed: u64,
    total_stalls: u64,
    tracer: Tracer,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.slots.len())
            .field("occupancy", &self.occupancy())
            .field("processed", &self.total_processed)
            .field("stalls", &self.total_stalls)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline with `num_stages` passthrough stages, the given
    /// default per-stage latency, and the standard `in`/`out`/`stall` ports.
    pub fn new(
        name: impl Into<String>,
        num_stages: usize,
        default_latency: u64,
        tracer: Tracer,
    ) -> Self {
        let name = name.into();
        let mut slots = Vec::with_capacity(num_stages);
        let mut stages: Vec<Box<dyn Stage>> = Vec::with_capacity(num_stages);
        for i in 0..num_stages {
            slots.push(Slot::default());
            stages.push(Box::new(Passthrough::new(format!("{name}_stage{i}"))));
        }
        let mut ports = PortMap::new();
        let _ = ports.add("in", PortDirection::Input);
        let _ = ports.add("out", PortDirection::Output);
        let _ = ports.add(STALL_PORT, PortDirection::Input);
        Self {
            name,
            slots,
            stages,
            latencies: vec![default_latency; num_stages],
            ports,
            total_processed: 0,
            total_stalls: 0,
            tracer,
        }
    }

    /// Pipeline name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stages.
    pub fn num_stages(&self) -> usize {
        self.slots.len()
    }

    /// Installs a stage object at `index`.
    pub fn set_stage(&mut self, index: usize, stage: Box<dyn Stage>) {
        if index < self.stages.len() {
            self.stages[index] = stage;
        }
    }

    /// Sets the residence latency of stage `index`.
    pub fn set_latency(&mut self, index: usize, latency: u64) {
        if index < self.latencies.len() {
            self.latencies[index] = latency;
        }
    }

    /// Residence latency of stage `index`.
    pub fn latency(&self, index: usize) -> u64 {
        self.latencies.get(index).copied().unwrap_or(1)
    }

    /// The component's ports.
    pub fn ports(&self) -> &PortMap {
        &self.ports
    }

    /// Looks up a port by name.
    pub fn port(&self, name: &str) -> Option<Rc<Port>> {
        self.ports.get(name)
    }

    /// Adds a port (components layer extra ports over the defaults).
    pub fn add_port(&mut self, name: impl Into<String>, direction: PortDirection) -> Rc<Port> {
        self.ports.add(name, direction)
    }

    /// Clears every stage.
    pub fn flush(&mut self) {
        for slot in &mut self.slots {
            *slot = Slot::default();
        }
    }

    /// True if no stage holds a packet.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.packet.is_none())
    }

    /// True if every stage holds a packet.
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.packet.is_some())
    }

    /// Number of occupied stages.
    pub fn occupancy(&self) -> usize {
        self.slots.iter().filter(|s| s.packet.is_some()).count()
    }

    /// Packets that reached the end of the pipeline.
    pub fn total_processed(&self) -> u64 {
        self.total_processed
    }

    /// Accumulated stall count (latency holds, predicate stalls, and
    /// whole-pipeline stall ticks).
    pub fn total_stalls(&self) -> u64 {
        self.total_stalls
    }

    /// One tick of pipeline work: drain the back, shift the middle, fill
    /// the front.
    pub fn advance(&mut self, now: u64) {
        // Whole-pipeline stall: a non-zero integer on the control port skips
        // this tick entirely.
        if let Some(port) = self.ports.get(STALL_PORT) {
            if port.has_data() {
                let stalled = port.read().and_then(|p| p.as_word()).unwrap_or(0) != 0;
                if stalled {
                    self.total_stalls += 1;
                    return;
                }
            }
        }

        let n = self.slots.len();
        if n == 0 {
            return;
        }

        for slot in &mut self.slots {
            if slot.packet.is_some() {
                slot.cycles_in_stage += 1;
            }
        }

        // Final stage drains to every output port.
        if let Some(packet) = self.slots[n - 1].packet.take() {
            let residency = now.saturating_sub(self.slots[n - 1].entered_at);
            for port in self.ports.iter() {
                if port.direction() == PortDirection::Output {
                    let _ = port.write(packet.clone().at(now));
                }
            }
            self.tracer.compute(
                now,
                &self.name,
                "PIPELINE_OUT",
                format!("stage={} residency={residency}", n - 1),
            );
            self.total_processed += 1;
        }

        // Middle stages, back to front: move i-1 into i where possible.
        for i in (1..n).rev() {
            if self.slots[i - 1].packet.is_none() || self.slots[i].packet.is_some() {
                continue;
            }
            // Borrow the packet to judge latency and stall before moving it.
            let (held, required) = {
                // Unwrap is fine: occupancy checked above.
                #[allow(clippy::unwrap_used)]
                let packet = self.slots[i - 1].packet.as_ref().unwrap();
                let required = self.stages[i - 1]
                    .hold_cycles(packet)
                    .unwrap_or(self.latencies[i - 1]);
                (self.slots[i - 1].cycles_in_stage, required)
            };
            if held < required {
                self.total_stalls += 1;
                continue;
            }
            #[allow(clippy::unwrap_used)]
            let stalled = {
                let packet = self.slots[i - 1].packet.as_ref().unwrap();
                self.stages[i].should_stall(packet)
            };
            if stalled {
                self.tracer.compute(
                    now,
                    &self.name,
                    "PIPELINE_STALL",
                    format!("stage={}", i - 1),
                );
                self.total_stalls += 1;
                continue;
            }
            #[allow(clippy::unwrap_used)]
            let packet = self.slots[i - 1].packet.take().unwrap();
            if let Some(out) = self.stages[i].process(Some(packet), now) {
                self.slots[i] = Slot {
                    packet: Some(out),
                    entered_at: now,
                    cycles_in_stage: 0,
                };
            }
        }

        // Stage 0 intake: first waiting input port wins; no input is also a
        // legal call so stage 0 can generate packets internally.
        if self.slots[0].packet.is_none() {
            let mut input = None;
            for port in self.ports.iter() {
                if port.direction() == PortDirection::Input
                    && port.name() != STALL_PORT
                    && port.has_data()
                {
                    input = port.read();
                    break;
                }
            }
            if let Some(out) = self.stages[0].process(input, now) {
                self.slots[0] = Slot {
                    packet: Some(out),
                    entered_at: now,
                    cycles_in_stage: 0,
                };
            }
        }
    }
}
