//! Declarative component filters.
//!
//! A [`ComponentFilter`] maps component names to requirements. Evaluation is a
//! fold: each entry narrows the candidate list left by the previous ones, so
//! entries are conjunctive and cheap entries placed first save work for the
//! rest.
//!
//! The requirement kinds are asymmetric:
//!
//! | requirement  | component absent | component present                 |
//! |--------------|------------------|-----------------------------------|
//! | `Truthy`     | rejected         | kept if the value is truthy       |
//! | `Equals(v)`  | rejected         | kept if the value equals `v`      |
//! | `Predicate`  | rejected         | kept if the predicate returns true |
//! | `Falsy`      | kept             | kept if the value is falsy        |
//!
//! Predicates receive the stored value, the entity id and a caller-supplied
//! context (the engine, in practice) so they can consult other state.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::component::{Truthy, values_equal};
use crate::entity::EntityId;
use crate::error::{ComponentError, json_kind};
use crate::store::ComponentStore;

/// A filter predicate: `(value, entity, context) -> keep?`.
pub type Predicate<C> = Rc<dyn Fn(&Value, &EntityId, &C) -> bool>;

/// Requirement placed on a single component.
pub enum FilterValue<C> {
    /// The entity must hold the component with a truthy value.
    Truthy,
    /// The entity must lack the component or hold a falsy value.
    Falsy,
    /// The entity must hold the component with exactly this value.
    Equals(Value),
    /// The entity must hold the component and the predicate must accept it.
    Predicate(Predicate<C>),
}

impl<C> FilterValue<C> {
    /// Whether the requirement can only be met by entities holding the
    /// component. Decides the outcome when no entity holds it at all.
    #[must_use]
    pub fn requires_presence(&self) -> bool {
        !matches!(self, FilterValue::Falsy)
    }

    fn accepts(&self, stored: Option<&Value>, entity: &EntityId, ctx: &C) -> bool {
        match self {
            FilterValue::Truthy => stored.is_truthy(),
            FilterValue::Falsy => !stored.is_truthy(),
            FilterValue::Equals(expected) => stored.is_some_and(|v| values_equal(v, expected)),
            FilterValue::Predicate(predicate) => stored.is_some_and(|v| predicate(v, entity, ctx)),
        }
    }
}

impl<C> Clone for FilterValue<C> {
    fn clone(&self) -> Self {
        match self {
            FilterValue::Truthy => FilterValue::Truthy,
            FilterValue::Falsy => FilterValue::Falsy,
            FilterValue::Equals(v) => FilterValue::Equals(v.clone()),
            FilterValue::Predicate(p) => FilterValue::Predicate(Rc::clone(p)),
        }
    }
}

impl<C> fmt::Debug for FilterValue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Truthy => f.write_str("Truthy"),
            FilterValue::Falsy => f.write_str("Falsy"),
            FilterValue::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            FilterValue::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// An ordered, conjunctive set of component requirements.
///
/// Each component name appears at most once; setting a name again replaces
/// its requirement in place.
pub struct ComponentFilter<C> {
    entries: Vec<(String, FilterValue<C>)>,
}

impl<C> ComponentFilter<C> {
    /// An empty filter, which matches every candidate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Set the requirement for `component`.
    #[must_use]
    pub fn require(mut self, component: impl Into<String>, value: FilterValue<C>) -> Self {
        self.set(component, value);
        self
    }

    /// Require a truthy `component`.
    #[must_use]
    pub fn with(self, component: impl Into<String>) -> Self {
        self.require(component, FilterValue::Truthy)
    }

    /// Require `component` to be absent or falsy.
    #[must_use]
    pub fn without(self, component: impl Into<String>) -> Self {
        self.require(component, FilterValue::Falsy)
    }

    /// Require `component` to equal `value`.
    #[must_use]
    pub fn equals(self, component: impl Into<String>, value: impl Into<Value>) -> Self {
        self.require(component, FilterValue::Equals(value.into()))
    }

    /// Require `component` to be present and accepted by `predicate`.
    #[must_use]
    pub fn matching<F>(self, component: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &EntityId, &C) -> bool + 'static,
    {
        self.require(component, FilterValue::Predicate(Rc::new(predicate)))
    }

    /// Upsert a requirement, keeping the original position of an existing name.
    pub fn set(&mut self, component: impl Into<String>, value: FilterValue<C>) {
        let component = component.into();
        match self.entries.iter_mut().find(|(name, _)| *name == component) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((component, value)),
        }
    }

    /// Build a filter from a JSON object.
    ///
    /// `true` becomes [`FilterValue::Truthy`], any falsy literal (`false`,
    /// `null`, `0`, `""`) becomes [`FilterValue::Falsy`] and every other value
    /// becomes [`FilterValue::Equals`].
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::InvalidFilterInput`] if `value` is not an
    /// object.
    pub fn from_json(value: &Value) -> Result<Self, ComponentError> {
        let Value::Object(map) = value else {
            return Err(ComponentError::InvalidFilterInput(json_kind(value)));
        };
        let mut filter = Self::new();
        for (name, v) in map {
            let requirement = match v {
                Value::Bool(true) => FilterValue::Truthy,
                v if !v.is_truthy() => FilterValue::Falsy,
                v => FilterValue::Equals(v.clone()),
            };
            filter.set(name.clone(), requirement);
        }
        Ok(filter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue<C>)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> Default for ComponentFilter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for ComponentFilter<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<C> fmt::Debug for ComponentFilter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, v)| (k, v))).finish()
    }
}

/// Narrow `candidates` to the ids satisfying every entry of `filter`.
///
/// Candidate order is preserved. Evaluation stops early once no candidates
/// remain.
#[must_use]
pub fn filter_ids<C>(
    store: &ComponentStore,
    ctx: &C,
    candidates: &[EntityId],
    filter: &ComponentFilter<C>,
) -> Vec<EntityId> {
    let mut ids = candidates.to_vec();

    for (name, requirement) in filter.iter() {
        if ids.is_empty() {
            break;
        }

        let Some(entries) = store.entries(name) else {
            // Nobody holds the component: presence requirements fail for
            // everyone, absence requirements pass for everyone.
            if requirement.requires_presence() {
                ids.clear();
            }
            continue;
        };

        ids.retain(|id| requirement.accepts(entries.get(id), id, ctx));
    }

    ids
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;

    fn ids(names: &[&str]) -> Vec<EntityId> {
        names.iter().map(|n| EntityId::from(*n)).collect()
    }

    /// goblin: enemy + creature, turret: enemy + !creature, hero: player + creature
    fn make_store() -> ComponentStore {
        let mut store = ComponentStore::new();
        store.insert("enemy", "goblin".into(), json!(true));
        store.insert("creature", "goblin".into(), json!(true));
        store.insert("enemy", "turret".into(), json!(true));
        store.insert("creature", "turret".into(), json!(false));
        store.insert("player", "hero".into(), json!(true));
        store.insert("creature", "hero".into(), json!(true));
        store
    }

    fn all() -> Vec<EntityId> {
        ids(&["goblin", "turret", "hero"])
    }

    #[test]
    fn test_empty_filter_keeps_all() {
        let store = make_store();
        let filter = ComponentFilter::<()>::new();
        assert_eq!(filter_ids(&store, &(), &all(), &filter), all());
    }

    #[test]
    fn test_truthy_filter() {
        let store = make_store();
        let filter = ComponentFilter::<()>::new().with("enemy");
        assert_eq!(
            filter_ids(&store, &(), &all(), &filter),
            ids(&["goblin", "turret"])
        );
    }

    #[test]
    fn test_falsy_filter_accepts_absent_and_falsy() {
        let store = make_store();
        let no_enemy = ComponentFilter::<()>::new().without("enemy");
        assert_eq!(filter_ids(&store, &(), &all(), &no_enemy), ids(&["hero"]));

        let not_creature = ComponentFilter::<()>::new().without("creature");
        assert_eq!(
            filter_ids(&store, &(), &all(), &not_creature),
            ids(&["turret"])
        );
    }

    #[test]
    fn test_conjunction() {
        let store = make_store();
        let filter = ComponentFilter::<()>::new().with("enemy").with("creature");
        assert_eq!(filter_ids(&store, &(), &all(), &filter), ids(&["goblin"]));
    }

    #[test]
    fn test_unknown_component() {
        let store = make_store();
        let positive = ComponentFilter::<()>::new().with("structure");
        assert!(filter_ids(&store, &(), &all(), &positive).is_empty());

        let negative = ComponentFilter::<()>::new().without("structure");
        assert_eq!(filter_ids(&store, &(), &all(), &negative), all());

        let literal = ComponentFilter::<()>::new().equals("structure", "wall");
        assert!(filter_ids(&store, &(), &all(), &literal).is_empty());
    }

    #[test]
    fn test_equals_filter() {
        let mut store = ComponentStore::new();
        store.insert("team", "a".into(), json!("red"));
        store.insert("team", "b".into(), json!("blue"));
        store.insert("team", "c".into(), json!("red"));
        let filter = ComponentFilter::<()>::new().equals("team", "red");
        assert_eq!(
            filter_ids(&store, &(), &ids(&["a", "b", "c", "d"]), &filter),
            ids(&["a", "c"])
        );
    }

    #[test]
    fn test_predicate_filter_requires_presence() {
        let mut store = ComponentStore::new();
        store.insert("health", "strong".into(), json!(10));
        store.insert("health", "weak".into(), json!(5));
        let filter = ComponentFilter::<()>::new()
            .matching("health", |v, _, _| v.as_f64().is_some_and(|h| h > 5.0));
        assert_eq!(
            filter_ids(&store, &(), &ids(&["strong", "weak", "ghost"]), &filter),
            ids(&["strong"])
        );
    }

    #[test]
    fn test_predicate_receives_entity_and_context() {
        let mut store = ComponentStore::new();
        store.insert("score", "a".into(), json!(1));
        store.insert("score", "b".into(), json!(2));
        let threshold = 2.0_f64;
        let filter = ComponentFilter::<f64>::new().matching("score", |v, id, min: &f64| {
            id.as_str() != "nobody" && v.as_f64().is_some_and(|s| s >= *min)
        });
        assert_eq!(
            filter_ids(&store, &threshold, &ids(&["a", "b"]), &filter),
            ids(&["b"])
        );
    }

    #[test]
    fn test_later_entries_only_see_survivors() {
        let store = make_store();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let filter = ComponentFilter::<()>::new()
            .with("player")
            .matching("creature", move |_, _, _| {
                counter.set(counter.get() + 1);
                true
            });
        assert_eq!(filter_ids(&store, &(), &all(), &filter), ids(&["hero"]));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_from_json() {
        let filter = ComponentFilter::<()>::from_json(&json!({
            "enemy": true,
            "dead": false,
            "team": "red",
            "ammo": 0,
        }))
        .unwrap();
        let kinds: Vec<String> = filter.iter().map(|(n, v)| format!("{n}:{v:?}")).collect();
        assert!(kinds.contains(&"enemy:Truthy".to_string()));
        assert!(kinds.contains(&"dead:Falsy".to_string()));
        assert!(kinds.contains(&"ammo:Falsy".to_string()));
        assert!(kinds.contains(&"team:Equals(String(\"red\"))".to_string()));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = ComponentFilter::<()>::from_json(&json!(["enemy"])).unwrap_err();
        assert_eq!(err, ComponentError::InvalidFilterInput("array"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let filter = ComponentFilter::<()>::new()
            .with("a")
            .with("b")
            .without("a");
        let names: Vec<&str> = filter.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(matches!(filter.iter().next(), Some((_, FilterValue::Falsy))));
    }
}
