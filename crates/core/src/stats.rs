use std::collections::HashMap;
use std::sync::Mutex;

use crate::template::Variable;

/// Accumulates `(variable, raw value)` occurrence counts during the scan
/// pass. Scanning runs in parallel (rayon), so observations are guarded by
/// a mutex rather than requiring external synchronization from callers.
#[derive(Debug, Default)]
pub struct StatisticsCollector {
    counts: Mutex<HashMap<(Variable, String), u64>>,
}

impl StatisticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, variable: Variable, raw_value: &str) {
        let mut counts = self.counts.lock().expect("statistics mutex poisoned");
        *counts
            .entry((variable, raw_value.to_string()))
            .or_insert(0) += 1;
    }

    /// Consumes the collector and produces an immutable snapshot for the
    /// apply pass. Once frozen, counts never change mid-apply.
    pub fn freeze(self) -> Statistics {
        Statistics {
            counts: self.counts.into_inner().expect("statistics mutex poisoned"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    counts: HashMap<(Variable, String), u64>,
}

impl Statistics {
    pub fn count(&self, variable: Variable, raw_value: &str) -> u64 {
        self.counts
            .get(&(variable, raw_value.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_accumulates_per_variable_value_pair() {
        let collector = StatisticsCollector::new();
        collector.observe(Variable::City, "Prague");
        collector.observe(Variable::City, "Prague");
        collector.observe(Variable::City, "Brno");

        let stats = collector.freeze();
        assert_eq!(stats.count(Variable::City, "Prague"), 2);
        assert_eq!(stats.count(Variable::City, "Brno"), 1);
        assert_eq!(stats.count(Variable::City, "Ostrava"), 0);
    }

    #[test]
    fn distinct_variables_do_not_share_counts() {
        let collector = StatisticsCollector::new();
        collector.observe(Variable::City, "2026");
        collector.observe(Variable::Year, "2026");

        let stats = collector.freeze();
        assert_eq!(stats.count(Variable::City, "2026"), 1);
        assert_eq!(stats.count(Variable::Year, "2026"), 1);
    }
}
