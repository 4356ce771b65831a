// ABOUTME: Explicit event-name to handler mapping for inbound transport events
// Dispatch is table driven so it can be exercised without any network

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Handler for one inbound event
pub type Handler<S> = fn(&mut S, Value);

/// Event name → handler table for a target of type `S`
pub struct HandlerTable<S> {
    handlers: BTreeMap<&'static str, Handler<S>>,
}

impl<S> HandlerTable<S> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register `handler` for `event`, replacing any previous binding
    pub fn on(mut self, event: &'static str, handler: Handler<S>) -> Self {
        self.handlers.insert(event, handler);
        self
    }

    /// Run the handler bound to `event`. Returns false when nothing is bound.
    pub fn dispatch(&self, target: &mut S, event: &str, payload: Value) -> bool {
        match self.handlers.get(event) {
            Some(handler) => {
                handler(target, payload);
                true
            }
            None => {
                debug!("No handler bound for event {}", event);
                false
            }
        }
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Bound event names in sorted order
    pub fn events(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }
}

impl<S> Default for HandlerTable<S> {
    fn default() -> Self {
        Self::new()
    }
}
