//! A state-threading event emitter.
//!
//! Unlike the engine's own event bus, which mutates a shared [`Engine`]
//! in place, this emitter threads an owned state value through its handlers:
//! `emit` is a left fold, so each handler receives the state returned by the
//! previous one and the result of the last handler is returned to the caller.
//!
//! Handlers get the emitter itself as context and may register, remove or
//! emit from inside a fold. The handler list is captured before folding
//! starts, so such changes only affect later emissions.
//!
//! [`Engine`]: crate::engine::Engine

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::events::Lifecycle;

/// Identifies a registered handler so it can be removed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// A state-threading handler: `(state, event, emitter) -> next state`.
pub type StateHandler<S, E> = Rc<dyn Fn(S, &E, &EventEmitter<S, E>) -> anyhow::Result<S>>;

pub struct EventEmitter<S, E> {
    handlers: RefCell<HashMap<String, Vec<(HandlerId, StateHandler<S, E>)>>>,
    next_id: Cell<u64>,
}

impl<S, E> EventEmitter<S, E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Append a handler for `event`.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(S, &E, &EventEmitter<S, E>) -> anyhow::Result<S> + 'static,
    {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    /// Remove one handler. Returns `false` if it was not registered for
    /// `event`.
    pub fn remove(&self, event: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(handler_id, _)| *handler_id != id);
        before != list.len()
    }

    /// Remove every handler for `event`.
    pub fn remove_all(&self, event: &str) {
        self.handlers.borrow_mut().remove(event);
    }

    #[must_use]
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.borrow().get(event).map_or(0, Vec::len)
    }

    /// Fold `state` through every handler of `event`, in registration order.
    ///
    /// With no handlers, `state` is returned untouched.
    ///
    /// # Errors
    ///
    /// The first handler error ends the fold and is returned; the state built
    /// so far is dropped.
    pub fn emit(&self, event: &str, state: S, payload: &E) -> anyhow::Result<S> {
        let snapshot: Vec<StateHandler<S, E>> = match self.handlers.borrow().get(event) {
            Some(list) => list.iter().map(|(_, handler)| Rc::clone(handler)).collect(),
            None => return Ok(state),
        };
        trace!(event, handlers = snapshot.len(), "folding event");
        snapshot
            .iter()
            .try_fold(state, |state, handler| handler(state, payload, self))
    }

    /// Fold `state` through the six tick phases, each with the same payload.
    ///
    /// # Errors
    ///
    /// See [`EventEmitter::emit`].
    pub fn emit_tick(&self, state: S, payload: &E) -> anyhow::Result<S> {
        Lifecycle::TICK
            .iter()
            .try_fold(state, |state, phase| self.emit(phase.as_str(), state, payload))
    }
}

impl<S, E> Default for EventEmitter<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E> fmt::Debug for EventEmitter<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        f.debug_map()
            .entries(handlers.iter().map(|(event, list)| (event, list.len())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Game {
        log: Vec<String>,
        score: i64,
    }

    fn game() -> Game {
        Game {
            log: Vec::new(),
            score: 0,
        }
    }

    #[test]
    fn test_emit_is_a_left_fold() {
        let emitter: EventEmitter<Game, i64> = EventEmitter::new();
        emitter.on("score", |mut g: Game, points: &i64, _: &EventEmitter<Game, i64>| {
            g.score += points;
            g.log.push(format!("h1 saw {}", g.score));
            Ok(g)
        });
        emitter.on("score", |mut g: Game, _: &i64, _: &EventEmitter<Game, i64>| {
            g.log.push(format!("h2 saw {}", g.score));
            g.score *= 2;
            Ok(g)
        });

        let result = emitter.emit("score", game(), &5).unwrap();
        assert_eq!(result.score, 10);
        assert_eq!(result.log, vec!["h1 saw 5", "h2 saw 5"]);
    }

    #[test]
    fn test_emit_without_handlers_returns_state() {
        let emitter: EventEmitter<Game, ()> = EventEmitter::new();
        let state = game();
        assert_eq!(emitter.emit("nothing", state.clone(), &()).unwrap(), state);
    }

    #[test]
    fn test_handler_added_during_fold_runs_next_time() {
        let emitter: EventEmitter<i64, ()> = EventEmitter::new();
        emitter.on("tick", |n: i64, _: &(), ctx: &EventEmitter<i64, ()>| {
            if n == 0 {
                ctx.on("tick", |n: i64, _: &(), _: &EventEmitter<i64, ()>| Ok(n + 100));
            }
            Ok(n + 1)
        });

        assert_eq!(emitter.emit("tick", 0, &()).unwrap(), 1);
        assert_eq!(emitter.handler_count("tick"), 2);
        assert_eq!(emitter.emit("tick", 1, &()).unwrap(), 102);
    }

    #[test]
    fn test_nested_emit_from_handler() {
        let emitter: EventEmitter<i64, ()> = EventEmitter::new();
        emitter.on("outer", |n: i64, e: &(), ctx: &EventEmitter<i64, ()>| {
            ctx.emit("inner", n * 10, e)
        });
        emitter.on("inner", |n: i64, _: &(), _: &EventEmitter<i64, ()>| Ok(n + 1));
        assert_eq!(emitter.emit("outer", 2, &()).unwrap(), 21);
    }

    #[test]
    fn test_remove_and_remove_all() {
        let emitter: EventEmitter<i64, ()> = EventEmitter::new();
        let add = emitter.on("e", |n: i64, _: &(), _: &EventEmitter<i64, ()>| Ok(n + 1));
        emitter.on("e", |n: i64, _: &(), _: &EventEmitter<i64, ()>| Ok(n * 3));

        assert!(emitter.remove("e", add));
        assert!(!emitter.remove("e", add));
        assert!(!emitter.remove("other", add));
        assert_eq!(emitter.emit("e", 2, &()).unwrap(), 6);

        emitter.remove_all("e");
        assert_eq!(emitter.handler_count("e"), 0);
        assert_eq!(emitter.emit("e", 2, &()).unwrap(), 2);
    }

    #[test]
    fn test_error_stops_fold() {
        let emitter: EventEmitter<i64, ()> = EventEmitter::new();
        emitter.on("e", |_: i64, _: &(), _: &EventEmitter<i64, ()>| {
            Err(anyhow::anyhow!("boom"))
        });
        emitter.on("e", |n: i64, _: &(), _: &EventEmitter<i64, ()>| Ok(n + 1));
        let err = emitter.emit("e", 0, &()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_emit_tick_runs_phases_in_order() {
        type Emitter = EventEmitter<Vec<&'static str>, f64>;
        let emitter: Emitter = EventEmitter::new();
        for phase in Lifecycle::TICK.iter().rev() {
            let name = phase.as_str();
            emitter.on(name, move |mut log: Vec<&'static str>, _: &f64, _: &Emitter| {
                log.push(name);
                Ok(log)
            });
        }
        let log = emitter.emit_tick(Vec::new(), &16.0).unwrap();
        assert_eq!(
            log,
            vec!["beforeUpdate", "update", "afterUpdate", "beforeDraw", "draw", "afterDraw"]
        );
    }
}
