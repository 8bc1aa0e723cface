//! Observable records and collections.
//!
//! Views never own these; they subscribe to them through [`Model::on`] and [`Collection::on`].

use crate::events::{Emitter, Subscription};
use core::{
	cell::{Cell, RefCell},
	cmp::Ordering,
	fmt::{self, Debug, Display, Formatter},
};
use serde_json::{Map, Value};
use std::rc::Rc;
use tracing::{trace, warn};

thread_local! {
	static NEXT_CID: Cell<u64> = Cell::new(1);
}

/// A record's stable client-side identity token.
///
/// Assigned once at construction and never reused within a thread, so it identifies a record independently of its position or attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cid(u64);

impl Cid {
	fn next() -> Self {
		NEXT_CID.with(|next| {
			let cid = next.get();
			next.set(cid + 1);
			Self(cid)
		})
	}
}

impl Display for Cid {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "c{}", self.0)
	}
}

/// Synchronisation state of a sync-aware record or collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncState {
	Unsynced,
	Syncing,
	Synced,
}

/// Capability of entities that track remote synchronisation.
///
/// Entities expose it through an `Option`, so plain records and collections simply don't have it.
pub trait SyncStatus {
	fn sync_state(&self) -> SyncState;

	fn is_unsynced(&self) -> bool {
		self.sync_state() == SyncState::Unsynced
	}

	fn is_syncing(&self) -> bool {
		self.sync_state() == SyncState::Syncing
	}

	fn is_synced(&self) -> bool {
		self.sync_state() == SyncState::Synced
	}
}

/// Holds a [`SyncState`] and validates transitions on it.
#[derive(Debug)]
pub struct SyncMachine {
	state: Cell<SyncState>,
}

impl Default for SyncMachine {
	fn default() -> Self {
		Self { state: Cell::new(SyncState::Unsynced) }
	}
}

impl SyncStatus for SyncMachine {
	fn sync_state(&self) -> SyncState {
		self.state.get()
	}
}

impl SyncMachine {
	/// Moves to [`SyncState::Syncing`] from any state other than `Syncing`.
	fn begin_sync(&self) -> Option<SyncState> {
		self.transition(|state| state != SyncState::Syncing, SyncState::Syncing)
	}

	fn finish_sync(&self) -> Option<SyncState> {
		self.transition(|state| state == SyncState::Syncing, SyncState::Synced)
	}

	/// Returns to `Unsynced` from an aborted `Syncing`.
	fn abort_sync(&self) -> Option<SyncState> {
		self.transition(|state| state == SyncState::Syncing, SyncState::Unsynced)
	}

	fn unsync(&self) -> Option<SyncState> {
		self.transition(|state| state != SyncState::Unsynced, SyncState::Unsynced)
	}

	fn transition(&self, allowed: impl FnOnce(SyncState) -> bool, to: SyncState) -> Option<SyncState> {
		let from = self.state.get();
		if allowed(from) {
			trace!(?from, ?to, "Sync state transition.");
			self.state.set(to);
			Some(to)
		} else {
			None
		}
	}
}

/// Events emitted by a [`Model`].
#[derive(Debug, Clone)]
pub enum ModelEvent {
	Change { key: String },
	SyncStateChange(SyncState),
	Disposed,
}

struct ModelInner {
	cid: Cid,
	attributes: RefCell<Map<String, Value>>,
	sync: Option<SyncMachine>,
	events: Emitter<ModelEvent>,
	disposed: Cell<bool>,
}

/// A shared handle to an observable record: a key/value attribute bag with a stable [`Cid`].
///
/// Clones refer to the same record. Equality is identity.
#[derive(Clone)]
pub struct Model {
	inner: Rc<ModelInner>,
}

impl PartialEq for Model {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}
impl Eq for Model {}

impl Debug for Model {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("Model");
		debug.field("cid", &self.inner.cid);
		if cfg!(feature = "dangerous-logging") {
			debug.field("attributes", &*self.inner.attributes.borrow());
		}
		debug.finish()
	}
}

impl Model {
	/// Creates a record from a JSON object. Any other JSON value yields an empty attribute bag.
	#[must_use]
	pub fn new(attributes: Value) -> Self {
		Self::with_sync(attributes, None)
	}

	/// Creates a sync-aware record, initially [`SyncState::Unsynced`].
	#[must_use]
	pub fn syncable(attributes: Value) -> Self {
		Self::with_sync(attributes, Some(SyncMachine::default()))
	}

	fn with_sync(attributes: Value, sync: Option<SyncMachine>) -> Self {
		let attributes = match attributes {
			Value::Object(map) => map,
			Value::Null => Map::new(),
			_ => {
				warn!("Model attributes must be a JSON object. Ignoring the given value.");
				Map::new()
			}
		};
		Self {
			inner: Rc::new(ModelInner {
				cid: Cid::next(),
				attributes: RefCell::new(attributes),
				sync,
				events: Emitter::new(),
				disposed: Cell::new(false),
			}),
		}
	}

	#[must_use]
	pub fn cid(&self) -> Cid {
		self.inner.cid
	}

	#[must_use]
	pub fn get(&self, key: &str) -> Option<Value> {
		self.inner.attributes.borrow().get(key).cloned()
	}

	/// Sets an attribute and emits [`ModelEvent::Change`] if the value differs.
	pub fn set(&self, key: impl Into<String>, value: Value) {
		let key = key.into();
		let changed = {
			let mut attributes = self.inner.attributes.borrow_mut();
			if attributes.get(&key) == Some(&value) {
				false
			} else {
				attributes.insert(key.clone(), value);
				true
			}
		};
		if changed {
			self.inner.events.emit(&ModelEvent::Change { key })
		}
	}

	/// A shallow copy of the attribute bag.
	#[must_use]
	pub fn attributes(&self) -> Map<String, Value> {
		self.inner.attributes.borrow().clone()
	}

	#[must_use = "dropping the `Subscription` immediately unregisters the handler"]
	pub fn on(&self, handler: impl Fn(&ModelEvent) + 'static) -> Subscription {
		self.inner.events.on(handler)
	}

	#[must_use]
	pub fn sync_status(&self) -> Option<&dyn SyncStatus> {
		self.inner.sync.as_ref().map(|sync| sync as &dyn SyncStatus)
	}

	pub fn begin_sync(&self) -> bool {
		self.sync_transition(SyncMachine::begin_sync)
	}

	pub fn finish_sync(&self) -> bool {
		self.sync_transition(SyncMachine::finish_sync)
	}

	pub fn abort_sync(&self) -> bool {
		self.sync_transition(SyncMachine::abort_sync)
	}

	pub fn unsync(&self) -> bool {
		self.sync_transition(SyncMachine::unsync)
	}

	fn sync_transition(&self, transition: fn(&SyncMachine) -> Option<SyncState>) -> bool {
		match self.inner.sync.as_ref().and_then(transition) {
			Some(state) => {
				self.inner.events.emit(&ModelEvent::SyncStateChange(state));
				true
			}
			None => false,
		}
	}

	/// Emits [`ModelEvent::Disposed`] once, then drops all listeners.
	pub fn dispose(&self) {
		if self.inner.disposed.replace(true) {
			return;
		}
		self.inner.events.emit(&ModelEvent::Disposed);
		self.inner.events.clear();
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.get()
	}
}

/// Events emitted by a [`Collection`].
#[derive(Debug, Clone)]
pub enum CollectionEvent {
	Add { model: Model, index: usize },
	Remove { model: Model, index: usize },
	Reset,
	Sort,
	SyncStateChange(SyncState),
	Disposed,
}

struct CollectionInner {
	models: RefCell<Vec<Model>>,
	sync: Option<SyncMachine>,
	events: Emitter<CollectionEvent>,
	disposed: Cell<bool>,
}

/// A shared handle to an ordered, observable list of [`Model`]s.
///
/// Every mutation emits its [`CollectionEvent`] synchronously after the member list has been updated.
#[derive(Clone)]
pub struct Collection {
	inner: Rc<CollectionInner>,
}

impl PartialEq for Collection {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}
}
impl Eq for Collection {}

impl Debug for Collection {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Collection")
			.field("models", &*self.inner.models.borrow())
			.field("sync", &self.inner.sync)
			.finish()
	}
}

impl Default for Collection {
	fn default() -> Self {
		Self::new(Vec::new())
	}
}

impl Collection {
	#[must_use]
	pub fn new(models: Vec<Model>) -> Self {
		Self::with_sync(models, None)
	}

	/// Creates a sync-aware collection, initially [`SyncState::Unsynced`].
	#[must_use]
	pub fn syncable(models: Vec<Model>) -> Self {
		Self::with_sync(models, Some(SyncMachine::default()))
	}

	fn with_sync(mut models: Vec<Model>, sync: Option<SyncMachine>) -> Self {
		let mut seen = hashbrown::HashSet::new();
		models.retain(|model| seen.insert(model.cid()));
		Self {
			inner: Rc::new(CollectionInner {
				models: RefCell::new(models),
				sync,
				events: Emitter::new(),
				disposed: Cell::new(false),
			}),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.inner.models.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// A snapshot of the current members, in order.
	#[must_use]
	pub fn models(&self) -> Vec<Model> {
		self.inner.models.borrow().clone()
	}

	#[must_use]
	pub fn get(&self, index: usize) -> Option<Model> {
		self.inner.models.borrow().get(index).cloned()
	}

	#[must_use]
	pub fn index_of(&self, model: &Model) -> Option<usize> {
		self.inner.models.borrow().iter().position(|m| m == model)
	}

	#[must_use]
	pub fn contains(&self, model: &Model) -> bool {
		self.index_of(model).is_some()
	}

	/// Appends `model`. See [`Collection::add_at`].
	pub fn add(&self, model: Model) -> usize {
		let index = self.len();
		self.add_at(model, index)
	}

	/// Inserts `model` at `index` (clamped to the length) and emits [`CollectionEvent::Add`].
	///
	/// Adding a member a second time does nothing and returns its current index.
	pub fn add_at(&self, model: Model, index: usize) -> usize {
		let index = {
			let mut models = self.inner.models.borrow_mut();
			if let Some(existing) = models.iter().position(|m| *m == model) {
				return existing;
			}
			let index = index.min(models.len());
			models.insert(index, model.clone());
			index
		};
		trace!(cid = %model.cid(), index, "Model added.");
		self.inner.events.emit(&CollectionEvent::Add { model, index });
		index
	}

	/// Removes `model` and emits [`CollectionEvent::Remove`]. Returns the index it had, if it was a member.
	pub fn remove(&self, model: &Model) -> Option<usize> {
		let index = {
			let mut models = self.inner.models.borrow_mut();
			let index = models.iter().position(|m| m == model)?;
			models.remove(index);
			index
		};
		trace!(cid = %model.cid(), index, "Model removed.");
		self.inner.events.emit(&CollectionEvent::Remove { model: model.clone(), index });
		Some(index)
	}

	/// Replaces all members at once and emits a single [`CollectionEvent::Reset`].
	pub fn reset(&self, mut models: Vec<Model>) {
		let mut seen = hashbrown::HashSet::new();
		models.retain(|model| seen.insert(model.cid()));
		*self.inner.models.borrow_mut() = models;
		self.inner.events.emit(&CollectionEvent::Reset);
	}

	/// Stably reorders the members and emits [`CollectionEvent::Sort`].
	pub fn sort_by(&self, compare: impl FnMut(&Model, &Model) -> Ordering) {
		self.inner.models.borrow_mut().sort_by(compare);
		self.inner.events.emit(&CollectionEvent::Sort);
	}

	#[must_use = "dropping the `Subscription` immediately unregisters the handler"]
	pub fn on(&self, handler: impl Fn(&CollectionEvent) + 'static) -> Subscription {
		self.inner.events.on(handler)
	}

	#[must_use]
	pub fn sync_status(&self) -> Option<&dyn SyncStatus> {
		self.inner.sync.as_ref().map(|sync| sync as &dyn SyncStatus)
	}

	pub fn begin_sync(&self) -> bool {
		self.sync_transition(SyncMachine::begin_sync)
	}

	pub fn finish_sync(&self) -> bool {
		self.sync_transition(SyncMachine::finish_sync)
	}

	pub fn abort_sync(&self) -> bool {
		self.sync_transition(SyncMachine::abort_sync)
	}

	pub fn unsync(&self) -> bool {
		self.sync_transition(SyncMachine::unsync)
	}

	fn sync_transition(&self, transition: fn(&SyncMachine) -> Option<SyncState>) -> bool {
		match self.inner.sync.as_ref().and_then(transition) {
			Some(state) => {
				self.inner.events.emit(&CollectionEvent::SyncStateChange(state));
				true
			}
			None => false,
		}
	}

	/// Emits [`CollectionEvent::Disposed`] once, then drops all listeners. Members are not disposed.
	pub fn dispose(&self) {
		if self.inner.disposed.replace(true) {
			return;
		}
		self.inner.events.emit(&CollectionEvent::Disposed);
		self.inner.events.clear();
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.inner.disposed.get()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn add_is_idempotent_per_member() {
		let collection = Collection::default();
		let model = Model::new(json!({ "title": "a" }));
		let events = Rc::new(Cell::new(0));
		let _subscription = collection.on({
			let events = events.clone();
			move |_| events.set(events.get() + 1)
		});

		assert_eq!(collection.add(model.clone()), 0);
		assert_eq!(collection.add_at(model, 5), 0);
		assert_eq!(collection.len(), 1);
		assert_eq!(events.get(), 1);
	}

	#[test]
	fn sync_transitions_only_emit_on_change() {
		let collection = Collection::syncable(Vec::new());
		assert!(!collection.finish_sync());
		assert!(collection.begin_sync());
		assert!(!collection.begin_sync());
		assert!(collection.sync_status().unwrap().is_syncing());
		assert!(collection.finish_sync());
		assert!(collection.sync_status().unwrap().is_synced());
		assert!(Collection::default().sync_status().is_none());
		assert!(!Collection::default().begin_sync());
	}

	#[test]
	fn cids_are_unique() {
		let a = Model::new(Value::Null);
		let b = Model::new(Value::Null);
		assert_ne!(a.cid(), b.cid());
		assert_ne!(a, b);
		assert_eq!(a, a.clone());
	}
}
