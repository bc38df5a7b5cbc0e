//! Turns an accumulated run into the recap text sent to ntfy.

use time::Duration;

use crate::run::{HostStats, PerHostStats, RunWindow, TaskResultRecord};

pub const PLAYBOOK_HEADER: &str = "PLAYBOOK RECAP";
pub const TASKS_HEADER: &str = "TASKS RECAP";

const MICROS_PER_SECOND: i128 = 1_000_000;
const MICROS_PER_DAY: i128 = 86_400 * MICROS_PER_SECOND;

/// Render the recap. Hosts are listed in lexicographic order, tasks by
/// descending duration. The input records are left untouched.
pub fn render(window: &RunWindow, stats: &PerHostStats, records: &[TaskResultRecord]) -> String {
    let mut lines = vec![PLAYBOOK_HEADER.to_string()];
    for (host, host_stats) in stats.iter() {
        lines.push(host_line(host, host_stats));
    }

    if let Some(elapsed) = window.elapsed() {
        lines.push(String::new());
        lines.push(format!("Playbook run took {}", format_elapsed(elapsed)));
    }

    lines.push(String::new());
    lines.push(TASKS_HEADER.to_string());

    let mut sorted: Vec<&TaskResultRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.duration().total_cmp(a.duration()));
    lines.extend(sorted.into_iter().map(task_line));

    lines.join("\n")
}

/// `web1 : ok=1 changed=0 unreachable=0 failed=0 skipped=1 rescued=0 ignored=0`
pub fn host_line(host: &str, stats: &HostStats) -> String {
    let counters: Vec<String> = stats
        .fields()
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!("{} : {}", host, counters.join(" "))
}

/// `web2 : install - 5.00s (failed)`
pub fn task_line(record: &TaskResultRecord) -> String {
    let skipped = if *record.skipped() { " (skipped)" } else { "" };
    let failed = if *record.unreachable() {
        " (unreachable)"
    } else if *record.failed() {
        " (failed)"
    } else {
        ""
    };
    format!(
        "{} : {} - {:.2}s{}{}",
        record.host(),
        record.task(),
        record.duration(),
        skipped,
        failed
    )
}

/// Format a duration as `H:MM:SS`, with a `.ffffff` microsecond part only
/// when it is non-zero and an `N day(s), ` prefix once a day has passed.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.whole_microseconds();
    let days = total.div_euclid(MICROS_PER_DAY);
    let rest = total.rem_euclid(MICROS_PER_DAY);
    let micros = rest % MICROS_PER_SECOND;
    let seconds = rest / MICROS_PER_SECOND;

    let mut out = String::new();
    if days != 0 {
        let plural = if days.abs() == 1 { "" } else { "s" };
        out.push_str(&format!("{days} day{plural}, "));
    }
    out.push_str(&format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    ));
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}
