use crate::base::{BaseSlot, BlockType, EntryContext, Slot, TokenResult};
use arc_swap::ArcSwapOption;
use std::sync::Arc;

pub const AUTHORITY_SLOT_ORDER: u32 = 3000;

/// AuthorityChecker decides whether the caller `origin` may access `resource`.
pub trait AuthorityChecker: Send + Sync {
    fn check(&self, resource: &str, origin: &str) -> bool;
}

impl<F> AuthorityChecker for F
where
    F: Fn(&str, &str) -> bool + Send + Sync,
{
    fn check(&self, resource: &str, origin: &str) -> bool {
        self(resource, origin)
    }
}

/// AuthoritySlot blocks the calls refused by the checker.
/// Calls without an origin, and all calls while no checker is set, are admitted.
#[derive(Default)]
pub struct AuthoritySlot {
    checker: ArcSwapOption<Box<dyn AuthorityChecker>>,
}

impl AuthoritySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checker(checker: Box<dyn AuthorityChecker>) -> Self {
        let slot = Self::default();
        slot.set_checker(Some(checker));
        slot
    }

    /// Replaces the checker, `None` admits every call.
    pub fn set_checker(&self, checker: Option<Box<dyn AuthorityChecker>>) {
        self.checker.store(checker.map(Arc::new));
    }

    pub fn has_checker(&self) -> bool {
        self.checker.load().is_some()
    }
}

impl BaseSlot for AuthoritySlot {
    fn order(&self) -> u32 {
        AUTHORITY_SLOT_ORDER
    }
}

impl Slot for AuthoritySlot {
    fn entry(&self, ctx: &mut EntryContext) -> TokenResult {
        let origin = match ctx.input().origin() {
            Some(origin) => origin,
            None => return TokenResult::new_pass(),
        };
        let checker = self.checker.load();
        match checker.as_deref() {
            Some(checker) if !checker.check(ctx.resource().name(), origin) => {
                TokenResult::new_blocked_with_msg(
                    BlockType::Authority,
                    ctx.resource().name().clone(),
                    format!("origin {} is not allowed", origin),
                )
            }
            _ => TokenResult::new_pass(),
        }
    }
}
