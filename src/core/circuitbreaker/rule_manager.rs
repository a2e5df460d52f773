use super::*;
use crate::{base::SentinelRule, logging, utils, Error, Result};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

pub type BreakerGenFn = dyn Send
    + Sync
    + Fn(
        Arc<Rule>,
        Option<Arc<CounterLeapArray>>,
        StateChangeListeners,
    ) -> Result<Arc<dyn CircuitBreakerTrait>>;

/// rules grouped by resource, in the order they were loaded
pub type RuleMap = HashMap<String, Vec<Arc<Rule>>>;

pub type BreakerMap = HashMap<String, Vec<Arc<dyn CircuitBreakerTrait>>>;

use gen_fns::*;
mod gen_fns {
    use super::*;

    pub(super) fn gen_slow_request(
        rule: Arc<Rule>,
        stat: Option<Arc<CounterLeapArray>>,
        listeners: StateChangeListeners,
    ) -> Result<Arc<dyn CircuitBreakerTrait>> {
        Ok(match stat {
            Some(stat) => Arc::new(SlowRtBreaker::new_with_stat(rule, stat, listeners)),
            None => Arc::new(SlowRtBreaker::new(rule, listeners)?),
        })
    }

    pub(super) fn gen_error_count(
        rule: Arc<Rule>,
        stat: Option<Arc<CounterLeapArray>>,
        listeners: StateChangeListeners,
    ) -> Result<Arc<dyn CircuitBreakerTrait>> {
        Ok(match stat {
            Some(stat) => Arc::new(ErrorCountBreaker::new_with_stat(rule, stat, listeners)),
            None => Arc::new(ErrorCountBreaker::new(rule, listeners)?),
        })
    }

    pub(super) fn gen_error_ratio(
        rule: Arc<Rule>,
        stat: Option<Arc<CounterLeapArray>>,
        listeners: StateChangeListeners,
    ) -> Result<Arc<dyn CircuitBreakerTrait>> {
        Ok(match stat {
            Some(stat) => Arc::new(ErrorRatioBreaker::new_with_stat(rule, stat, listeners)),
            None => Arc::new(ErrorRatioBreaker::new(rule, listeners)?),
        })
    }
}

/// CircuitBreakerManager converts the circuit breaking rules into breakers and serves them to the slots.
/// Readers get the breakers of a resource without locking,
/// rule updates are serialized and publish a new breaker map as a whole.
pub struct CircuitBreakerManager {
    generators: RwLock<HashMap<BreakerStrategy, Arc<BreakerGenFn>>>,
    listeners: StateChangeListeners,
    // the rules as loaded, invalid ones included
    current_rules: Mutex<RuleMap>,
    breakers: ArcSwap<BreakerMap>,
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        let mut generators: HashMap<BreakerStrategy, Arc<BreakerGenFn>> = HashMap::new();
        generators.insert(BreakerStrategy::SlowRequestRatio, Arc::new(gen_slow_request));
        generators.insert(BreakerStrategy::ErrorCount, Arc::new(gen_error_count));
        generators.insert(BreakerStrategy::ErrorRatio, Arc::new(gen_error_ratio));
        CircuitBreakerManager {
            generators: RwLock::new(generators),
            listeners: new_state_change_listeners(),
            current_rules: Mutex::new(RuleMap::new()),
            breakers: ArcSwap::from_pointee(BreakerMap::new()),
        }
    }
}

fn group_by_resource(rules: Vec<Arc<Rule>>) -> RuleMap {
    let mut rule_map = RuleMap::new();
    for rule in rules {
        rule_map.entry(rule.resource.clone()).or_default().push(rule);
    }
    rule_map
}

fn valid_rules_of(rules: &[Arc<Rule>]) -> Vec<Arc<Rule>> {
    rules
        .iter()
        .filter(|rule| match rule.is_valid() {
            Ok(_) => true,
            Err(err) => {
                logging::warn!(
                    "[CircuitBreaker load_rules] Ignoring invalid circuit breaking rule {:?}, reason: {:?}",
                    rule,
                    err
                );
                false
            }
        })
        .cloned()
        .collect()
}

impl CircuitBreakerManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_rules(&self) -> std::sync::MutexGuard<'_, RuleMap> {
        self.current_rules
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `get_rules_of_resource` returns specific resource's valid rules
    pub fn get_rules_of_resource(&self, res: &str) -> Vec<Arc<Rule>> {
        self.breakers
            .load()
            .get(res)
            .map(|cbs| cbs.iter().map(|cb| Arc::clone(cb.bound_rule())).collect())
            .unwrap_or_default()
    }

    /// `get_rules` returns all the valid rules
    pub fn get_rules(&self) -> Vec<Arc<Rule>> {
        self.breakers
            .load()
            .values()
            .flatten()
            .map(|cb| Arc::clone(cb.bound_rule()))
            .collect()
    }

    pub fn get_breakers_of_resource(&self, res: &str) -> Vec<Arc<dyn CircuitBreakerTrait>> {
        self.breakers.load().get(res).cloned().unwrap_or_default()
    }

    /// `clear_rules` clear all the previous rules.
    pub fn clear_rules(&self) {
        let mut current = self.lock_rules();
        current.clear();
        self.breakers.store(Arc::new(BreakerMap::new()));
    }

    /// `clear_rules_of_resource` clears resource level rules.
    pub fn clear_rules_of_resource(&self, res: &str) {
        let mut current = self.lock_rules();
        current.remove(res);
        let mut breakers = (**self.breakers.load()).clone();
        breakers.remove(res);
        self.breakers.store(Arc::new(breakers));
    }

    /// load_rules replaces old rules with the given circuit breaking rules.
    /// returned `bool` indicate whether the internal map has been changed
    pub fn load_rules(&self, rules: Vec<Arc<Rule>>) -> bool {
        let rule_map = group_by_resource(rules);
        let mut current = self.lock_rules();
        if *current == rule_map {
            logging::info!(
                "[CircuitBreaker load_rules] Loaded rules is the same with current rules, so ignore load operation."
            );
            return false;
        }

        let start = utils::curr_time_nanos();
        let mut old_breakers = (**self.breakers.load()).clone();
        let mut new_breakers = BreakerMap::with_capacity(rule_map.len());
        for (res, rules) in &rule_map {
            let valid_rules = valid_rules_of(rules);
            if valid_rules.is_empty() {
                continue;
            }
            let mut placeholder = Vec::new();
            let new_cbs_of_res = self.build_resource_circuit_breaker(
                res,
                &valid_rules,
                old_breakers.get_mut(res).unwrap_or(&mut placeholder),
            );
            if !new_cbs_of_res.is_empty() {
                new_breakers.insert(res.clone(), new_cbs_of_res);
            }
        }

        if new_breakers.is_empty() {
            logging::info!("[CircuitBreaker load_rules] Circuit breaking rules were cleared")
        } else {
            logging::info!(
                "[CircuitBreaker load_rules] Circuit breaking rules were loaded: {:?}",
                new_breakers
                    .values()
                    .flatten()
                    .map(|cb| cb.bound_rule())
                    .collect::<Vec<_>>()
            )
        }
        self.breakers.store(Arc::new(new_breakers));
        *current = rule_map;
        logging::debug!(
            "[CircuitBreaker load_rules] Time statistic(ns) for updating circuit breaker rule, time cost {}",
            utils::curr_time_nanos() - start
        );
        true
    }

    /// load_rules_of_resource loads the given resource's circuit breaking rules, replacing all previous rules of the resource.
    /// Returns false when the rules equal the current rules of the resource.
    pub fn load_rules_of_resource(&self, res: &str, rules: Vec<Arc<Rule>>) -> Result<bool> {
        if res.is_empty() {
            return Err(Error::msg("empty resource"));
        }
        let mut current = self.lock_rules();
        let mut breakers = (**self.breakers.load()).clone();
        if rules.is_empty() {
            current.remove(res);
            breakers.remove(res);
            self.breakers.store(Arc::new(breakers));
            logging::info!(
                "[CircuitBreaker load_rules_of_resource] Clear resource level rules, resource {}",
                res
            );
            return Ok(true);
        }
        if current.get(res) == Some(&rules) {
            logging::info!("[CircuitBreaker load_rules_of_resource] Load resource level rules is the same with current resource level rules, so ignore load operation.");
            return Ok(false);
        }

        let valid_rules = valid_rules_of(&rules);
        let mut old_res_cbs = breakers.remove(res).unwrap_or_default();
        let new_res_cbs = self.build_resource_circuit_breaker(res, &valid_rules, &mut old_res_cbs);
        if !new_res_cbs.is_empty() {
            breakers.insert(res.to_owned(), new_res_cbs);
        }
        self.breakers.store(Arc::new(breakers));
        current.insert(res.to_owned(), rules);
        logging::info!(
            "[CircuitBreaker load_rules_of_resource] Load resource level rules, resource: {}, valid rules: {:?}",
            res,
            valid_rules
        );
        Ok(true)
    }

    /// register_state_change_listeners registers the state change listeners for all circuit breakers of the manager
    pub fn register_state_change_listeners(&self, listeners: Vec<Arc<dyn StateChangeListener>>) {
        if listeners.is_empty() {
            return;
        }
        self.listeners.rcu(|current| {
            let mut all = (**current).clone();
            all.extend(listeners.iter().cloned());
            all
        });
    }

    /// clear_state_change_listeners clears the all StateChangeListener
    pub fn clear_state_change_listeners(&self) {
        self.listeners.store(Arc::new(Vec::new()));
    }

    /// set_circuit_breaker_generator sets the circuit breaker generator for the given strategy.
    /// Note that modifying the generator of default strategies is not allowed.
    pub fn set_circuit_breaker_generator(
        &self,
        s: BreakerStrategy,
        generator: Box<BreakerGenFn>,
    ) -> Result<()> {
        match s {
            BreakerStrategy::Custom(_) => {
                self.generators
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .insert(s, Arc::from(generator));
                Ok(())
            }
            _ => Err(Error::msg(
                "Default circuit breakers are not allowed to be modified.",
            )),
        }
    }

    pub fn remove_circuit_breaker_generator(&self, s: &BreakerStrategy) -> Result<()> {
        match s {
            BreakerStrategy::Custom(_) => {
                self.generators
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .remove(s);
                Ok(())
            }
            _ => Err(Error::msg(
                "Default circuit breakers are not allowed to be modified.",
            )),
        }
    }

    fn generator_of(&self, s: &BreakerStrategy) -> Option<Arc<BreakerGenFn>> {
        self.generators
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(s)
            .cloned()
    }

    /// build_resource_circuit_breaker builds the breakers of `res` from its rules.
    /// The breaker of an equal old rule is kept as it is, the statistic of a stat reusable old rule is carried over.
    /// Reused breakers are removed from `old_res_cbs`.
    pub fn build_resource_circuit_breaker(
        &self,
        res: &str,
        rules_of_res: &[Arc<Rule>],
        old_res_cbs: &mut Vec<Arc<dyn CircuitBreakerTrait>>,
    ) -> Vec<Arc<dyn CircuitBreakerTrait>> {
        let mut new_res_cbs = Vec::with_capacity(rules_of_res.len());
        for rule in rules_of_res {
            if res != rule.resource {
                logging::error!("[CircuitBreaker build_resource_circuit_breaker] Unmatched resource name, expect: {}, actual: {}, rule: {:?}", res, rule.resource, rule);
                continue;
            }

            let (eq_idx, reuse_stat_idx) = calculate_reuse_index_for(rule, old_res_cbs);
            if let Some(eq_idx) = eq_idx {
                new_res_cbs.push(old_res_cbs.remove(eq_idx));
                continue;
            }

            let generator = match self.generator_of(&rule.strategy) {
                Some(generator) => generator,
                None => {
                    logging::error!("[CircuitBreaker build_resource_circuit_breaker] Ignoring the rule due to unsupported circuit breaking strategy, rule {:?}", rule);
                    continue;
                }
            };
            let stat = reuse_stat_idx.map(|idx| Arc::clone(old_res_cbs[idx].stat()));
            match generator(Arc::clone(rule), stat, Arc::clone(&self.listeners)) {
                Ok(cb) => {
                    if let Some(idx) = reuse_stat_idx {
                        old_res_cbs.remove(idx);
                    }
                    new_res_cbs.push(cb);
                }
                Err(err) => logging::error!(
                    "[CircuitBreaker build_resource_circuit_breaker] Failed to generate the circuit breaker, rule {:?}, error: {:?}",
                    rule,
                    err
                ),
            }
        }
        new_res_cbs
    }
}

/// Returns the index of the breaker with an equal rule and of the first breaker with a stat reusable rule.
pub fn calculate_reuse_index_for(
    r: &Arc<Rule>,
    old_res_cbs: &[Arc<dyn CircuitBreakerTrait>],
) -> (Option<usize>, Option<usize>) {
    let mut reuse_stat_idx = None;
    for (idx, old_cb) in old_res_cbs.iter().enumerate() {
        let old_rule = old_cb.bound_rule();
        if old_rule == r {
            return (Some(idx), reuse_stat_idx);
        }
        if reuse_stat_idx.is_none() && old_rule.is_stat_reusable(r) {
            reuse_stat_idx = Some(idx);
        }
    }
    (None, reuse_stat_idx)
}
