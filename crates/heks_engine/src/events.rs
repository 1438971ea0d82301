//! Engine-scoped event handlers and the fixed tick lifecycle.
//!
//! Handlers are stored per event name in registration order and are never
//! deduplicated. Emission snapshots the list first, so a handler registered
//! while an event is being emitted only runs on the next emission.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::engine::Engine;

/// A handler invoked with the engine and the emitted arguments.
pub type EventHandler = Rc<dyn Fn(&mut Engine, &[Value]) -> anyhow::Result<()>>;

/// Lifecycle events emitted by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Start,
    BeforeUpdate,
    Update,
    AfterUpdate,
    BeforeDraw,
    Draw,
    AfterDraw,
}

impl Lifecycle {
    /// The phases of one tick, in emission order.
    pub const TICK: [Lifecycle; 6] = [
        Lifecycle::BeforeUpdate,
        Lifecycle::Update,
        Lifecycle::AfterUpdate,
        Lifecycle::BeforeDraw,
        Lifecycle::Draw,
        Lifecycle::AfterDraw,
    ];

    /// The event name handlers subscribe to.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Start => "start",
            Lifecycle::BeforeUpdate => "beforeUpdate",
            Lifecycle::Update => "update",
            Lifecycle::AfterUpdate => "afterUpdate",
            Lifecycle::BeforeDraw => "beforeDraw",
            Lifecycle::Draw => "draw",
            Lifecycle::AfterDraw => "afterDraw",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered handlers keyed by event name.
#[derive(Default)]
pub struct EventHandlers {
    handlers: HashMap<String, Vec<EventHandler>>,
}

impl EventHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `event`.
    pub fn add(&mut self, event: impl Into<String>, handler: EventHandler) {
        self.handlers.entry(event.into()).or_default().push(handler);
    }

    /// Copy of the current handler list for `event`, or `None` if nothing is
    /// registered.
    #[must_use]
    pub fn snapshot(&self, event: &str) -> Option<Vec<EventHandler>> {
        self.handlers.get(event).cloned()
    }

    /// Number of handlers registered for `event`.
    #[must_use]
    pub fn count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(name, list)| (name, list.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_order() {
        let names: Vec<&str> = Lifecycle::TICK.iter().map(|l| l.as_str()).collect();
        assert_eq!(
            names,
            vec!["beforeUpdate", "update", "afterUpdate", "beforeDraw", "draw", "afterDraw"]
        );
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut handlers = EventHandlers::new();
        let handler: EventHandler =
            Rc::new(|_: &mut Engine, _: &[Value]| Ok::<_, anyhow::Error>(()));
        handlers.add("update", Rc::clone(&handler));
        handlers.add("update", handler);
        assert_eq!(handlers.count("update"), 2);
        assert_eq!(handlers.count("draw"), 0);
        assert!(handlers.snapshot("draw").is_none());
    }
}
