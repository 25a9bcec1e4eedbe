//! Anomalies reported by the command pipeline.
//!
//! None of these are fatal: the pipeline always degrades (truncate, clamp, evict) and keeps
//! simulating. They are surfaced for logging and anti-cheat heuristics.
use alloc::vec::Vec;
use core::fmt;

use bevy_ecs::prelude::*;
use bevy_platform::collections::HashMap;
#[allow(unused_imports)]
use tracing::{debug, warn};

use crate::tick::Tick;

/// Field of an input command that can be clamped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandField {
    ForwardMove,
    SideMove,
    UpMove,
    ViewDelta,
}

impl fmt::Display for CommandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandField::ForwardMove => "forward_move",
            CommandField::SideMove => "side_move",
            CommandField::UpMove => "up_move",
            CommandField::ViewDelta => "view_delta",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Anomaly {
    #[error("received a batch of {received} commands, only the first {kept} were kept")]
    BatchTruncated { received: usize, kept: usize },
    #[error("command backlog full, evicted the oldest context ({evicted_totalcmds} commands)")]
    BacklogOverflow { evicted_totalcmds: u32 },
    #[error("requested a clock advance of {requested} ticks, clamped to {granted}")]
    ClockClamped { requested: u32, granted: u32 },
    #[error("clock correction from {current:?} to {requested:?} would move the clock backward")]
    ClockBackward { current: Tick, requested: Tick },
    #[error("command {sequence} had an out-of-range {field}, clamped")]
    CommandClamped { sequence: u32, field: CommandField },
}

impl Anomaly {
    /// Short stable name of the anomaly, used for metrics and counters
    pub fn kind(&self) -> &'static str {
        match self {
            Anomaly::BatchTruncated { .. } => "batch_truncated",
            Anomaly::BacklogOverflow { .. } => "backlog_overflow",
            Anomaly::ClockClamped { .. } => "clock_clamped",
            Anomaly::ClockBackward { .. } => "clock_backward",
            Anomaly::CommandClamped { .. } => "command_clamped",
        }
    }
}

/// Channel through which the plain (non-ECS) parts of the pipeline report anomalies
pub trait AnomalySink {
    fn report(&mut self, anomaly: Anomaly);
}

impl AnomalySink for Vec<Anomaly> {
    fn report(&mut self, anomaly: Anomaly) {
        self.push(anomaly);
    }
}

/// Sink that drops every anomaly
impl AnomalySink for () {
    fn report(&mut self, _: Anomaly) {}
}

/// Message emitted for every anomaly, tagged with the player entity it concerns
#[derive(Message, Debug, Clone, PartialEq)]
pub struct AnomalyEvent {
    pub entity: Entity,
    pub anomaly: Anomaly,
}

/// Running count of the anomalies seen, by [`Anomaly::kind`]
#[derive(Resource, Debug, Default)]
pub struct AnomalyCounts {
    counts: HashMap<&'static str, u64>,
}

impl AnomalyCounts {
    pub fn get(&self, kind: &str) -> u64 {
        self.counts.get(kind).copied().unwrap_or_default()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub(crate) fn record(&mut self, anomaly: &Anomaly) {
        *self.counts.entry(anomaly.kind()).or_default() += 1;
    }
}

/// Write the anomalies collected for `entity` as [`AnomalyEvent`]s
pub fn forward_anomalies(
    entity: Entity,
    anomalies: impl IntoIterator<Item = Anomaly>,
    writer: &mut MessageWriter<AnomalyEvent>,
) {
    for anomaly in anomalies {
        writer.write(AnomalyEvent { entity, anomaly });
    }
}

/// Log and count every anomaly emitted during this tick
pub(crate) fn log_anomalies(
    mut reader: MessageReader<AnomalyEvent>,
    mut counts: ResMut<AnomalyCounts>,
) {
    for event in reader.read() {
        warn!(entity = ?event.entity, kind = event.anomaly.kind(), "{}", event.anomaly);
        counts.record(&event.anomaly);
        #[cfg(feature = "metrics")]
        {
            metrics::counter!(format!("usercmd::anomaly::{}", event.anomaly.kind())).increment(1);
        }
    }
}
