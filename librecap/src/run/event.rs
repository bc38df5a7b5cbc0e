//! Lifecycle events as delivered by the orchestration engine. Everything the
//! engine hands us is reduced to these payloads at the boundary; nothing past
//! this module looks at engine-native structures.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::stats::PerHostStats;

/// Placeholder used when a normal result arrives without a task name.
pub const UNKNOWN_TASK: &str = "unknown task";
/// Placeholder used when an unreachable result arrives without a task name.
pub const UNREACHABLE_TASK: &str = "unreachable";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The playbook run started.
    PlaybookStart,
    /// A task started. The id is shared by every host that runs the task.
    TaskStart {
        #[serde(default)]
        task_id: Option<String>,
    },
    RunnerOk(TaskResult),
    RunnerSkipped(TaskResult),
    RunnerFailed(TaskResult),
    RunnerUnreachable(TaskResult),
    /// The run completed; carries the engine's per-host counters.
    PlaybookStats { stats: PerHostStats },
}

impl LifecycleEvent {
    /// The outcome and payload of a per-host result event, if this is one.
    pub fn result(&self) -> Option<(Outcome, &TaskResult)> {
        match self {
            LifecycleEvent::RunnerOk(result) => Some((Outcome::Ok, result)),
            LifecycleEvent::RunnerSkipped(result) => Some((Outcome::Skipped, result)),
            LifecycleEvent::RunnerFailed(result) => Some((Outcome::Failed, result)),
            LifecycleEvent::RunnerUnreachable(result) => Some((Outcome::Unreachable, result)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::PlaybookStart => "playbook_start",
            LifecycleEvent::TaskStart { .. } => "task_start",
            LifecycleEvent::RunnerOk(_) => "runner_ok",
            LifecycleEvent::RunnerSkipped(_) => "runner_skipped",
            LifecycleEvent::RunnerFailed(_) => "runner_failed",
            LifecycleEvent::RunnerUnreachable(_) => "runner_unreachable",
            LifecycleEvent::PlaybookStats { .. } => "playbook_stats",
        }
    }
}

/// The per-host result of one task.
#[derive(Getters, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    host: String,
    #[serde(default)]
    task_name: Option<String>,
    #[serde(default)]
    task_id: Option<String>,
}

impl TaskResult {
    pub fn new<S: Into<String>>(host: S, task_name: Option<S>, task_id: Option<S>) -> Self {
        Self {
            host: host.into(),
            task_name: task_name.map(Into::into),
            task_id: task_id.map(Into::into),
        }
    }
}

/// How a task ended on one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Ok,
    Skipped,
    Failed,
    Unreachable,
}

impl Outcome {
    pub fn skipped(self) -> bool {
        self == Outcome::Skipped
    }

    /// Unreachable hosts count as failed.
    pub fn failed(self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Unreachable)
    }

    pub fn unreachable(self) -> bool {
        self == Outcome::Unreachable
    }

    /// Name to report when the engine did not supply one.
    pub fn fallback_task_name(self) -> &'static str {
        match self {
            Outcome::Unreachable => UNREACHABLE_TASK,
            _ => UNKNOWN_TASK,
        }
    }
}

/// A [`LifecycleEvent`] with an optional timestamp. Events without one are
/// stamped on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub at: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}

impl TimedEvent {
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// The event's own timestamp, or `now` when it carries none.
    pub fn at_or(&self, now: OffsetDateTime) -> OffsetDateTime {
        self.at.unwrap_or(now)
    }
}
