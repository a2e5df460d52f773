use super::*;
use crate::{base::SentinelRule, logging, Error, Result};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type RuleMap = HashMap<String, Vec<Arc<Rule>>>;

/// FlowRuleManager serves the valid flow rules of each resource to the `FlowSlot`.
#[derive(Debug, Default)]
pub struct FlowRuleManager {
    // the rules as loaded, invalid ones included
    current_rules: Mutex<Vec<Arc<Rule>>>,
    rule_map: ArcSwap<RuleMap>,
}

impl FlowRuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// `load_rules` loads the given flow rules, while all previous rules will be replaced.
    /// Invalid rules are skipped. Returns false when the rules equal the current rules.
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        let mut current_rules = self
            .current_rules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current_rules == rules {
            logging::info!(
                "[Flow] Load rules is the same with current rules, so ignore load operation."
            );
            return false;
        }
        let mut rule_map = RuleMap::new();
        for rule in &rules {
            if let Err(err) = rule.is_valid() {
                logging::warn!(
                    "[Flow load_rules] Ignoring invalid flow rule {:?}, reason: {:?}",
                    rule,
                    err
                );
                continue;
            }
            rule_map
                .entry(rule.resource.clone())
                .or_default()
                .push(Arc::clone(rule));
        }
        if rule_map.is_empty() {
            logging::info!("[Flow load_rules] Flow rules were cleared");
        } else {
            logging::info!("[Flow load_rules] Flow rules were loaded: {:?}", rule_map);
        }
        self.rule_map.store(Arc::new(rule_map));
        *current_rules = rules;
        true
    }

    pub fn get_rules(&self) -> Vec<Arc<Rule>> {
        self.rule_map.load().values().flatten().cloned().collect()
    }

    pub fn get_rules_of_resource(&self, res: &str) -> Vec<Arc<Rule>> {
        self.rule_map.load().get(res).cloned().unwrap_or_default()
    }

    pub fn clear_rules(&self) {
        let mut current_rules = self
            .current_rules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        current_rules.clear();
        self.rule_map.store(Arc::new(RuleMap::new()));
    }

    /// `load_rules_from_yaml` parses a YAML list of flow rules and loads them.
    pub fn load_rules_from_yaml(&self, yaml: &str) -> Result<bool> {
        let rules: Vec<Rule> = serde_yaml::from_str(yaml)
            .map_err(|err| Error::msg(format!("invalid flow rules: {}", err)))?;
        Ok(self.load_rules(rules.into_iter().map(Arc::new).collect()))
    }
}
