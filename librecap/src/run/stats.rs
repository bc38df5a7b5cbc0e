use std::collections::BTreeMap;

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Counters the engine keeps for a single host. Missing counters default to
/// zero.
#[derive(Getters, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HostStats {
    ok: u32,
    changed: u32,
    unreachable: u32,
    failures: u32,
    skipped: u32,
    rescued: u32,
    ignored: u32,
}

impl HostStats {
    pub fn new(
        ok: u32,
        changed: u32,
        unreachable: u32,
        failures: u32,
        skipped: u32,
        rescued: u32,
        ignored: u32,
    ) -> Self {
        Self {
            ok,
            changed,
            unreachable,
            failures,
            skipped,
            rescued,
            ignored,
        }
    }

    /// The counters in recap order, paired with the label they are printed
    /// under.
    pub fn fields(&self) -> [(&'static str, u32); 7] {
        [
            ("ok", self.ok),
            ("changed", self.changed),
            ("unreachable", self.unreachable),
            ("failed", self.failures),
            ("skipped", self.skipped),
            ("rescued", self.rescued),
            ("ignored", self.ignored),
        ]
    }
}

/// Per-host summary supplied by the engine at completion. Iterates in
/// lexicographic host order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerHostStats(BTreeMap<String, HostStats>);

impl PerHostStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, host: S, stats: HostStats) {
        self.0.insert(host.into(), stats);
    }

    pub fn get(&self, host: &str) -> Option<&HostStats> {
        self.0.get(host)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HostStats)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, HostStats)> for PerHostStats {
    fn from_iter<I: IntoIterator<Item = (S, HostStats)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(host, stats)| (host.into(), stats))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosts_iterate_in_lexicographic_order() {
        let stats: PerHostStats = [
            ("web2", HostStats::default()),
            ("db1", HostStats::default()),
            ("Web3", HostStats::default()),
            ("web10", HostStats::default()),
        ]
        .into_iter()
        .collect();
        let hosts: Vec<&str> = stats.iter().map(|(host, _)| host.as_str()).collect();
        assert_eq!(vec!["Web3", "db1", "web10", "web2"], hosts);
    }

    #[test]
    fn test_failures_are_labelled_failed() {
        let stats = HostStats::new(1, 2, 3, 4, 5, 6, 7);
        assert_eq!(
            [
                ("ok", 1),
                ("changed", 2),
                ("unreachable", 3),
                ("failed", 4),
                ("skipped", 5),
                ("rescued", 6),
                ("ignored", 7),
            ],
            stats.fields()
        );
    }
}
