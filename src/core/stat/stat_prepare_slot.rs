use super::NodeRegistry;
use crate::{
    base::{BaseSlot, EntryContext, Slot, TokenResult},
    logging,
};
use std::sync::Arc;

pub const PREPARE_SLOT_ORDER: u32 = 1000;

/// ResourceNodePrepareSlot resolves the resource node, and the origin node
/// when the call carries a caller origin, for the slots after it.
#[derive(Debug)]
pub struct ResourceNodePrepareSlot {
    registry: Arc<NodeRegistry>,
}

impl ResourceNodePrepareSlot {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        ResourceNodePrepareSlot { registry }
    }
}

impl BaseSlot for ResourceNodePrepareSlot {
    fn order(&self) -> u32 {
        PREPARE_SLOT_ORDER
    }
}

impl Slot for ResourceNodePrepareSlot {
    fn entry(&self, ctx: &mut EntryContext) -> TokenResult {
        let node = match self.registry.get_or_create_resource_node(ctx.resource()) {
            Ok(node) => node,
            Err(err) => {
                logging::warn!(
                    "[ResourceNodePrepareSlot] Failed to create the node of {}, error: {:?}",
                    ctx.resource(),
                    err
                );
                return TokenResult::new_pass();
            }
        };
        if let Some(origin) = ctx.input().origin().map(String::from) {
            match self.registry.get_or_create_origin_node(&node, &origin) {
                Ok(origin_node) => ctx.set_origin_node(origin_node),
                Err(err) => logging::warn!(
                    "[ResourceNodePrepareSlot] Failed to create the origin node {} of {}, error: {:?}",
                    origin,
                    ctx.resource(),
                    err
                ),
            }
        }
        ctx.set_stat_node(node);
        TokenResult::new_pass()
    }
}
