//! Simulation trace log.
//!
//! A line-oriented event log shared by every component of a simulation. It
//! provides:
//! 1. **Recording:** Timestamped entries with a type, component name, event
//!    name, and free-form details.
//! 2. **Filtering:** Optional component-name substring filters.
//! 3. **Output:** Rendering to any writer in the stable line format
//!    `[timestamp] [TYPE] [component] [event] details (priority=p)?`.
//!
//! The tracer is an explicit handle threaded through component constructors.
//! Cloning the handle is cheap and all clones share one log. A disabled
//! tracer records nothing, so components trace unconditionally.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};
use std::rc::Rc;

/// Kind of a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// Component tick.
    Tick,
    /// Generic scheduler or component event.
    Event,
    /// Computation performed by a functional unit or stage.
    Compute,
    /// Memory read access.
    MemRead,
    /// Memory write access.
    MemWrite,
    /// Connection propagation.
    Prop,
    /// Component state change.
    State,
    /// Instruction lifecycle event.
    Instr,
    /// Queue operation (push/pop/full).
    Queue,
    /// Register file access.
    Reg,
    /// Multiply-accumulate operation.
    Mac,
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tick => "TICK",
            Self::Event => "EVENT",
            Self::Compute => "COMPUTE",
            Self::MemRead => "MEM_READ",
            Self::MemWrite => "MEM_WRITE",
            Self::Prop => "PROP",
            Self::State => "STATE",
            Self::Instr => "INSTR",
            Self::Queue => "QUEUE",
            Self::Reg => "REG",
            Self::Mac => "MAC",
        };
        f.write_str(s)
    }
}

/// A single recorded trace entry.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Simulated time the entry was recorded at.
    pub timestamp: u64,
    /// Entry kind.
    pub kind: TraceKind,
    /// Name of the originating component or connection.
    pub component: String,
    /// Short event name (e.g. `DISPATCH`, `EXECUTE_COMPLETE`).
    pub event: String,
    /// Free-form details.
    pub details: String,
    /// Scheduler priority, when the entry came from event dispatch.
    pub priority: Option<i32>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] [{}] [{}] {}",
            self.timestamp, self.kind, self.component, self.event, self.details
        )?;
        if let Some(p) = self.priority {
            write!(f, " (priority={p})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct TraceLog {
    entries: Vec<TraceEntry>,
    component_filters: Vec<String>,
}

impl TraceLog {
    fn admits(&self, component: &str) -> bool {
        self.component_filters.is_empty()
            || self.component_filters.iter().any(|f| component.contains(f))
    }
}

/// Shared handle to a simulation trace log.
///
/// `Tracer::disabled()` produces a handle that records nothing; components
/// hold it and trace unconditionally without checking a flag.
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    log: Option<Rc<RefCell<TraceLog>>>,
}

impl Tracer {
    /// Creates an enabled tracer with an empty log and no filters.
    pub fn enabled() -> Self {
        Self {
            log: Some(Rc::new(RefCell::new(TraceLog::default()))),
        }
    }

    /// Creates a disabled tracer. All recording calls are no-ops.
    pub fn disabled() -> Self {
        Self { log: None }
    }

    /// Returns true if this handle records entries.
    pub fn is_enabled(&self) -> bool {
        self.log.is_some()
    }

    /// Adds a component-name substring filter. With at least one filter set,
    /// only entries whose component name contains one of the patterns are
    /// recorded.
    pub fn add_component_filter(&self, pattern: impl Into<String>) {
        if let Some(log) = &self.log {
            log.borrow_mut().component_filters.push(pattern.into());
        }
    }

    /// Clears all component filters (record everything again).
    pub fn clear_component_filters(&self) {
        if let Some(log) = &self.log {
            log.borrow_mut().component_filters.clear();
        }
    }

    /// Records an entry.
    pub fn record(
        &self,
        timestamp: u64,
        kind: TraceKind,
        component: &str,
        event: &str,
        details: impl Into<String>,
        priority: Option<i32>,
    ) {
        let Some(log) = &self.log else { return };
        let mut log = log.borrow_mut();
        if !log.admits(component) {
            return;
        }
        log.entries.push(TraceEntry {
            timestamp,
            kind,
            component: component.to_owned(),
            event: event.to_owned(),
            details: details.into(),
            priority,
        });
    }

    /// Records a component tick.
    pub fn tick(&self, timestamp: u64, component: &str, details: impl Into<String>) {
        self.record(timestamp, TraceKind::Tick, component, "tick", details, None);
    }

    /// Records a generic event.
    pub fn event(&self, timestamp: u64, component: &str, event: &str, details: impl Into<String>) {
        self.record(timestamp, TraceKind::Event, component, event, details, None);
    }

    /// Records a computation.
    pub fn compute(
        &self,
        timestamp: u64,
        component: &str,
        event: &str,
        details: impl Into<String>,
    ) {
        self.record(timestamp, TraceKind::Compute, component, event, details, None);
    }

    /// Records a connection propagation.
    pub fn prop(&self, timestamp: u64, component: &str, details: impl Into<String>) {
        self.record(
            timestamp,
            TraceKind::Prop,
            component,
            "propagate",
            details,
            None,
        );
    }

    /// Records a queue operation.
    pub fn queue(&self, timestamp: u64, component: &str, event: &str, details: impl Into<String>) {
        self.record(timestamp, TraceKind::Queue, component, event, details, None);
    }

    /// Records a register file access.
    pub fn reg(&self, timestamp: u64, component: &str, event: &str, details: impl Into<String>) {
        self.record(timestamp, TraceKind::Reg, component, event, details, None);
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.log.as_ref().map_or(0, |l| l.borrow().entries.len())
    }

    /// True if no entries have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the recorded entries.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.log
            .as_ref()
            .map_or_else(Vec::new, |l| l.borrow().entries.clone())
    }

    /// Renders every recorded entry to `out`, one line per entry.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        if let Some(log) = &self.log {
            for entry in &log.borrow().entries {
                writeln!(out, "{entry}")?;
            }
        }
        Ok(())
    }
}
