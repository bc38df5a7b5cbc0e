use std::collections::HashMap;

use derive_getters::Getters;
use time::{Duration, OffsetDateTime};

use crate::log::*;
use crate::render;

pub mod event;
pub mod stats;

pub use event::{LifecycleEvent, Outcome, TaskResult, TimedEvent};
pub use stats::{HostStats, PerHostStats};

/// When each task started, keyed by the task id the engine shares across all
/// hosts running that task. Entries are read, never removed, for the life of
/// the run.
#[derive(Debug, Clone, Default)]
pub struct TaskStartRegistry {
    starts: HashMap<String, OffsetDateTime>,
}

impl TaskStartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the timer for `task_id`. A restart replaces the earlier entry.
    pub fn record<S: Into<String>>(&mut self, task_id: S, at: OffsetDateTime) {
        self.starts.insert(task_id.into(), at);
    }

    pub fn started_at(&self, task_id: &str) -> Option<OffsetDateTime> {
        self.starts.get(task_id).copied()
    }

    /// Seconds between the task's start and `now`, or `None` when no start
    /// was seen for it.
    pub fn elapsed(&self, task_id: Option<&str>, now: OffsetDateTime) -> Option<f64> {
        let start = self.started_at(task_id?)?;
        Some((now - start).as_seconds_f64())
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Wall-clock bounds of the run.
#[derive(Getters, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunWindow {
    start_time: Option<OffsetDateTime>,
    end_time: Option<OffsetDateTime>,
}

impl RunWindow {
    pub fn new(start_time: Option<OffsetDateTime>, end_time: Option<OffsetDateTime>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// Total run time. Only known once both ends were recorded.
    pub fn elapsed(&self) -> Option<Duration> {
        Some(self.end_time? - self.start_time?)
    }
}

/// One host's outcome for one task.
#[derive(Getters, Debug, Clone, PartialEq)]
pub struct TaskResultRecord {
    host: String,
    task: String,
    duration: f64,
    skipped: bool,
    failed: bool,
    unreachable: bool,
}

impl TaskResultRecord {
    pub fn new<S: Into<String>>(host: S, task: S, duration: f64, outcome: Outcome) -> Self {
        Self {
            host: host.into(),
            task: task.into(),
            duration,
            skipped: outcome.skipped(),
            failed: outcome.failed(),
            unreachable: outcome.unreachable(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_flags(
        host: &str,
        task: &str,
        duration: f64,
        skipped: bool,
        failed: bool,
        unreachable: bool,
    ) -> Self {
        Self {
            host: host.to_string(),
            task: task.to_string(),
            duration,
            skipped,
            failed,
            unreachable,
        }
    }
}

/// Everything accumulated over one run. Each event is applied in arrival
/// order; the completion event yields the rendered recap.
#[derive(Getters, Debug, Clone, Default)]
pub struct RunState {
    window: RunWindow,
    task_starts: TaskStartRegistry,
    results: Vec<TaskResultRecord>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event at time `now`. Returns the recap text when the event
    /// completes the run.
    #[tracing::instrument(skip(self, event), fields(event = event.name()))]
    pub fn apply(&mut self, event: &LifecycleEvent, now: OffsetDateTime) -> Option<String> {
        match event {
            LifecycleEvent::PlaybookStart => self.on_playbook_start(now),
            LifecycleEvent::TaskStart { task_id } => self.on_task_start(task_id.as_deref(), now),
            LifecycleEvent::PlaybookStats { stats } => return Some(self.on_stats(stats, now)),
            _ => {
                if let Some((outcome, result)) = event.result() {
                    self.on_result(outcome, result, now);
                }
            }
        }
        None
    }

    pub fn on_playbook_start(&mut self, now: OffsetDateTime) {
        debug!("run state: playbook started");
        self.window.start_time = Some(now);
    }

    pub fn on_task_start(&mut self, task_id: Option<&str>, now: OffsetDateTime) {
        match task_id {
            Some(task_id) => {
                trace!("run state: task {} started", task_id);
                self.task_starts.record(task_id, now);
            }
            None => debug!("run state: task started without an id, not timing it"),
        }
    }

    /// Append the record for one host's result. Durations are measured from
    /// the shared task start; unknown starts count as zero.
    pub fn on_result(&mut self, outcome: Outcome, result: &TaskResult, now: OffsetDateTime) {
        let duration = match self.task_starts.elapsed(result.task_id().as_deref(), now) {
            Some(duration) if duration < 0.0 => {
                warn!(
                    "run state: result for {} arrived before its task started, clamping to zero",
                    result.host()
                );
                0.0
            }
            Some(duration) => duration,
            None => 0.0,
        };
        let task = result
            .task_name()
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| outcome.fallback_task_name());

        trace!(
            "run state: {} on {}: {:?} after {:.2}s",
            task,
            result.host(),
            outcome,
            duration
        );
        self.results.push(TaskResultRecord::new(
            result.host().as_str(),
            task,
            duration,
            outcome,
        ));
    }

    /// Close the run window and render the recap.
    pub fn on_stats(&mut self, stats: &PerHostStats, now: OffsetDateTime) -> String {
        self.window.end_time = Some(now);
        info!(
            "run state: run complete, {} hosts, {} results",
            stats.len(),
            self.results.len()
        );
        render::render(&self.window, stats, &self.results)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::Duration;

    use super::*;

    const T0: OffsetDateTime = datetime!(2024-03-01 10:00:00 UTC);

    fn at(seconds: f64) -> OffsetDateTime {
        T0 + Duration::seconds_f64(seconds)
    }

    fn ok(host: &str, task: &str, task_id: &str) -> LifecycleEvent {
        LifecycleEvent::RunnerOk(TaskResult::new(host, Some(task), Some(task_id)))
    }

    #[test]
    fn test_every_result_produces_one_record() {
        let mut state = RunState::new();
        state.apply(&LifecycleEvent::PlaybookStart, at(0.0));
        state.apply(
            &LifecycleEvent::TaskStart {
                task_id: Some("a".into()),
            },
            at(0.0),
        );
        for (i, host) in ["web1", "web2", "web3"].iter().enumerate() {
            state.apply(&ok(host, "ping", "a"), at(i as f64));
        }
        state.apply(
            &LifecycleEvent::RunnerUnreachable(TaskResult::new("db1", None, Some("a"))),
            at(4.0),
        );
        assert_eq!(4, state.results().len());
        let hosts: Vec<&str> = state.results().iter().map(|r| r.host().as_str()).collect();
        assert_eq!(vec!["web1", "web2", "web3", "db1"], hosts);
    }

    #[test]
    fn test_duration_is_measured_per_host_from_shared_start() {
        let mut state = RunState::new();
        state.apply(
            &LifecycleEvent::TaskStart {
                task_id: Some("a".into()),
            },
            at(1.0),
        );
        state.apply(&ok("web1", "ping", "a"), at(3.5));
        state.apply(&ok("web2", "ping", "a"), at(8.0));
        let durations: Vec<f64> = state.results().iter().map(|r| *r.duration()).collect();
        assert_eq!(vec![2.5, 7.0], durations);
    }

    #[test]
    fn test_missing_start_defaults_to_zero() {
        let mut state = RunState::new();
        state.apply(&ok("web1", "ping", "never-started"), at(3.0));
        state.apply(
            &LifecycleEvent::RunnerOk(TaskResult::new("web1", Some("ping"), None)),
            at(4.0),
        );
        assert!(state.results().iter().all(|r| *r.duration() == 0.0));
    }

    #[test]
    fn test_restarted_task_uses_latest_start() {
        let mut state = RunState::new();
        let start = LifecycleEvent::TaskStart {
            task_id: Some("a".into()),
        };
        state.apply(&start, at(0.0));
        state.apply(&start, at(10.0));
        state.apply(&ok("web1", "ping", "a"), at(12.0));
        assert_eq!(2.0, *state.results()[0].duration());
        assert_eq!(1, state.task_starts().len());
    }

    #[test]
    fn test_result_before_start_is_clamped() {
        let mut state = RunState::new();
        state.apply(
            &LifecycleEvent::TaskStart {
                task_id: Some("a".into()),
            },
            at(5.0),
        );
        state.apply(&ok("web1", "ping", "a"), at(2.0));
        assert_eq!(0.0, *state.results()[0].duration());
    }

    #[test]
    fn test_missing_task_names_use_placeholders() {
        let mut state = RunState::new();
        state.apply(
            &LifecycleEvent::RunnerFailed(TaskResult::new("web1", None, None)),
            at(0.0),
        );
        state.apply(
            &LifecycleEvent::RunnerSkipped(TaskResult::new("web1", Some(""), None)),
            at(0.0),
        );
        state.apply(
            &LifecycleEvent::RunnerUnreachable(TaskResult::new("web2", None, None)),
            at(0.0),
        );
        let tasks: Vec<&str> = state.results().iter().map(|r| r.task().as_str()).collect();
        assert_eq!(vec!["unknown task", "unknown task", "unreachable"], tasks);
    }

    #[test]
    fn test_outcome_flags_are_recorded() {
        let mut state = RunState::new();
        state.apply(
            &LifecycleEvent::RunnerSkipped(TaskResult::new("web1", Some("a"), None)),
            at(0.0),
        );
        state.apply(
            &LifecycleEvent::RunnerUnreachable(TaskResult::new("web2", Some("a"), None)),
            at(0.0),
        );
        let skipped = &state.results()[0];
        assert!(*skipped.skipped() && !*skipped.failed() && !*skipped.unreachable());
        let unreachable = &state.results()[1];
        assert!(!*unreachable.skipped() && *unreachable.failed() && *unreachable.unreachable());
    }

    #[test]
    fn test_run_window_elapsed_requires_start() {
        assert_eq!(None, RunWindow::new(None, Some(at(6.0))).elapsed());
        assert_eq!(
            Some(Duration::seconds(6)),
            RunWindow::new(Some(at(0.0)), Some(at(6.0))).elapsed()
        );
    }

    #[test]
    fn test_stats_event_closes_window_and_renders() {
        let mut state = RunState::new();
        assert_eq!(None, state.apply(&LifecycleEvent::PlaybookStart, at(0.0)));
        let recap = state.apply(
            &LifecycleEvent::PlaybookStats {
                stats: PerHostStats::new(),
            },
            at(6.0),
        );
        assert_eq!(Some(at(6.0)), *state.window().end_time());
        assert_eq!(
            Some("PLAYBOOK RECAP\n\nPlaybook run took 0:00:06\n\nTASKS RECAP".to_string()),
            recap
        );
    }
}
