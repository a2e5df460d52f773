use super::*;
use crate::base::{BaseSlot, BlockType, EntryContext, Slot, TokenResult};
use std::sync::Arc;

pub const BREAKER_CHECK_SLOT_ORDER: u32 = 6000;

/// CircuitBreakerSlot refuses the entry as soon as one breaker of the resource refuses it.
pub struct CircuitBreakerSlot {
    manager: Arc<CircuitBreakerManager>,
}

impl CircuitBreakerSlot {
    pub fn new(manager: Arc<CircuitBreakerManager>) -> Self {
        CircuitBreakerSlot { manager }
    }
}

impl BaseSlot for CircuitBreakerSlot {
    fn order(&self) -> u32 {
        BREAKER_CHECK_SLOT_ORDER
    }
}

impl Slot for CircuitBreakerSlot {
    fn entry(&self, ctx: &mut EntryContext) -> TokenResult {
        let res = ctx.resource().name().clone();
        if res.is_empty() {
            return TokenResult::new_pass();
        }
        match can_pass_check(&self.manager, ctx, &res) {
            None => TokenResult::new_pass(),
            Some(breaker) => TokenResult::new_blocked_with_cause(
                BlockType::CircuitBreaking,
                res,
                "circuit breaker check blocked".into(),
                breaker.bound_rule().clone(),
                Arc::new(breaker.trip_snapshot()),
            ),
        }
    }
}

/// `None` indicates it passes
/// `Some(breaker)` indicates it is broken by the breaker
fn can_pass_check(
    manager: &CircuitBreakerManager,
    ctx: &mut EntryContext,
    res: &str,
) -> Option<Arc<dyn CircuitBreakerTrait>> {
    manager
        .get_breakers_of_resource(res)
        .into_iter()
        .find(|breaker| !breaker.try_pass(ctx))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::{ResourceType, ResourceWrapper, TrafficType};

    fn custom_rule() -> Arc<Rule> {
        Arc::new(Rule {
            resource: "abc".into(),
            strategy: BreakerStrategy::Custom(101),
            retry_timeout_ms: 3000,
            min_request_amount: 10,
            stat_interval_ms: 10000,
            max_allowed_rt_ms: 50,
            threshold: 0.5,
            ..Default::default()
        })
    }

    fn manager_with(pass: bool) -> Arc<CircuitBreakerManager> {
        let manager = Arc::new(CircuitBreakerManager::new());
        manager
            .set_circuit_breaker_generator(
                BreakerStrategy::Custom(101),
                Box::new(
                    move |rule: Arc<Rule>,
                          _: Option<Arc<CounterLeapArray>>,
                          _: StateChangeListeners|
                          -> crate::Result<Arc<dyn CircuitBreakerTrait>> {
                        let mut breaker = MockCircuitBreaker::new();
                        breaker.expect_try_pass().return_const(pass);
                        breaker.expect_bound_rule().return_const(rule);
                        breaker.expect_trip_snapshot().return_const(0.8);
                        Ok(Arc::new(breaker))
                    },
                ),
            )
            .unwrap();
        assert!(manager.load_rules(vec![custom_rule()]));
        assert_eq!(manager.get_breakers_of_resource("abc").len(), 1);
        manager
    }

    fn context() -> EntryContext {
        let mut ctx = EntryContext::new();
        ctx.set_resource(ResourceWrapper::new(
            "abc".into(),
            ResourceType::Common,
            TrafficType::Inbound,
        ));
        ctx
    }

    #[test]
    fn check_blocked() {
        let slot = CircuitBreakerSlot::new(manager_with(false));
        let mut ctx = context();
        let token = slot.entry(&mut ctx);
        let block_err = token.block_err().unwrap();
        assert_eq!(block_err.block_type(), BlockType::CircuitBreaking);
        assert_eq!(block_err.block_msg(), "circuit breaker check blocked");
        assert_eq!(block_err.triggered_value_as::<f64>(), Some(&0.8));
        assert!(block_err.triggered_rule().is_some());
    }

    #[test]
    fn check_pass() {
        let slot = CircuitBreakerSlot::new(manager_with(true));
        let mut ctx = context();
        assert!(slot.entry(&mut ctx).is_pass());
    }

    #[test]
    fn no_breakers() {
        let slot = CircuitBreakerSlot::new(Arc::new(CircuitBreakerManager::new()));
        let mut ctx = context();
        assert!(slot.entry(&mut ctx).is_pass());
    }
}
