use super::*;
use crate::{base::SentinelRule, logging, utils, Error, Result};
use arc_swap::ArcSwap;
use enum_map::EnumMap;
use std::sync::{Arc, Mutex};

/// The rules in force, the one with the lowest threshold per dimension.
/// An unset dimension never blocks.
#[derive(Debug, Clone, Default)]
pub struct SystemThresholds {
    rules: EnumMap<MetricType, Option<Arc<Rule>>>,
}

impl SystemThresholds {
    fn build(rules: &[Arc<Rule>]) -> Self {
        let mut thresholds = SystemThresholds::default();
        for rule in rules {
            let lower_in_force = matches!(
                &thresholds.rules[rule.metric_type],
                Some(current) if current.threshold <= rule.threshold
            );
            if !lower_in_force {
                thresholds.rules[rule.metric_type] = Some(Arc::clone(rule));
            }
        }
        thresholds
    }

    pub fn threshold(&self, metric_type: MetricType) -> Option<f64> {
        self.rules[metric_type].as_ref().map(|rule| rule.threshold)
    }

    pub fn rule(&self, metric_type: MetricType) -> Option<&Arc<Rule>> {
        self.rules[metric_type].as_ref()
    }

    /// The set dimensions in checking order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// SystemRuleManager keeps the system rules and publishes the thresholds derived from them.
#[derive(Debug, Default)]
pub struct SystemRuleManager {
    current_rules: Mutex<Vec<Arc<Rule>>>,
    thresholds: ArcSwap<SystemThresholds>,
}

impl SystemRuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `thresholds` returns the thresholds in force
    pub fn thresholds(&self) -> Arc<SystemThresholds> {
        self.thresholds.load_full()
    }

    /// `get_rules` returns the rules in force, one per set dimension
    pub fn get_rules(&self) -> Vec<Arc<Rule>> {
        self.thresholds.load().iter().cloned().collect()
    }

    /// `load_rules` replaces all previous rules with the given ones.
    /// The batch is rejected as a whole if any rule of it is invalid, keeping the thresholds in force.
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> Result<bool> {
        let mut current_rules = self
            .current_rules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current_rules == rules {
            logging::info!(
                "[SystemRuleManager] Load rules is the same with current rules, so ignore load operation."
            );
            return Ok(false);
        }
        for rule in &rules {
            if let Err(err) = rule.is_valid() {
                logging::warn!(
                    "[SystemRuleManager] Rejecting the system rules due to an invalid rule {:?}, reason: {:?}",
                    rule,
                    err
                );
                return Err(Error::msg(format!(
                    "invalid system rule {}: {}",
                    rule.id, err
                )));
            }
        }

        let start = utils::curr_time_nanos();
        let thresholds = SystemThresholds::build(&rules);
        logging::info!(
            "[SystemRuleManager] System rules loaded, rules {:?}",
            thresholds.iter().collect::<Vec<_>>()
        );
        self.thresholds.store(Arc::new(thresholds));
        *current_rules = rules;
        logging::debug!(
            "[SystemRuleManager] Time statistic(ns) for updating system rule, time cost {}",
            utils::curr_time_nanos() - start
        );
        Ok(true)
    }

    /// `clear_rules` clear all the previous rules
    pub fn clear_rules(&self) {
        let mut current_rules = self
            .current_rules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        current_rules.clear();
        self.thresholds.store(Arc::new(SystemThresholds::default()));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rule(metric_type: MetricType, threshold: f64) -> Arc<Rule> {
        Arc::new(Rule {
            metric_type,
            threshold,
            ..Default::default()
        })
    }

    #[test]
    fn empty_rules() {
        let manager = SystemRuleManager::new();
        assert!(manager.get_rules().is_empty());
        assert!(manager.thresholds().is_empty());
    }

    #[test]
    fn minimum_per_dimension() {
        let manager = SystemRuleManager::new();
        assert!(manager
            .load_rules(vec![
                rule(MetricType::InboundQps, 2.0),
                rule(MetricType::InboundQps, 1.0),
                rule(MetricType::Concurrency, 2.0),
                rule(MetricType::InboundQps, 3.0),
            ])
            .unwrap());
        let thresholds = manager.thresholds();
        assert_eq!(thresholds.threshold(MetricType::InboundQps), Some(1.0));
        assert_eq!(thresholds.threshold(MetricType::Concurrency), Some(2.0));
        assert_eq!(thresholds.threshold(MetricType::Load), None);
        assert_eq!(manager.get_rules().len(), 2);
    }

    #[test]
    fn same_rules() {
        let manager = SystemRuleManager::new();
        assert!(manager
            .load_rules(vec![rule(MetricType::Load, 4.0)])
            .unwrap());
        assert!(!manager
            .load_rules(vec![rule(MetricType::Load, 4.0)])
            .unwrap());
    }

    #[test]
    fn invalid_batch_keeps_previous() {
        let manager = SystemRuleManager::new();
        manager
            .load_rules(vec![rule(MetricType::CpuUsage, 0.8)])
            .unwrap();
        let err = manager
            .load_rules(vec![
                rule(MetricType::InboundQps, 10.0),
                rule(MetricType::CpuUsage, 1.5),
            ])
            .unwrap_err();
        assert!(err.to_string().contains("invalid CPU usage"));
        let thresholds = manager.thresholds();
        assert_eq!(thresholds.threshold(MetricType::CpuUsage), Some(0.8));
        assert_eq!(thresholds.threshold(MetricType::InboundQps), None);
    }

    #[test]
    fn clear() {
        let manager = SystemRuleManager::new();
        manager
            .load_rules(vec![
                rule(MetricType::InboundQps, 1.0),
                rule(MetricType::AvgRt, 2.0),
            ])
            .unwrap();
        manager.clear_rules();
        assert!(manager.get_rules().is_empty());
        assert!(manager.thresholds().is_empty());
    }

    #[test]
    fn checking_order() {
        let manager = SystemRuleManager::new();
        manager
            .load_rules(vec![
                rule(MetricType::CpuUsage, 0.5),
                rule(MetricType::Load, 1.0),
                rule(MetricType::InboundQps, 1.0),
            ])
            .unwrap();
        let order: Vec<_> = manager
            .thresholds()
            .iter()
            .map(|rule| rule.metric_type)
            .collect();
        assert_eq!(
            order,
            vec![MetricType::InboundQps, MetricType::Load, MetricType::CpuUsage]
        );
    }
}
