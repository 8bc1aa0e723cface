//! The base unit of UI: [`ManagedView`].

use crate::{
	document::{Container, ContainerMethod, Document},
	error::ViewError,
	events::{Emitter, Subscription},
	model::{Cid, Collection, CollectionEvent, Model, ModelEvent},
	region::RegionRegistry,
};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Display, Formatter},
	mem,
};
use hashbrown::HashMap;
use serde_json::{Map, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, instrument, trace, warn};

thread_local! {
	static NEXT_VIEW_ID: Cell<u64> = Cell::new(1);
}

/// Identifies a view in logs and in a [`RegionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(u64);

impl ViewId {
	fn next() -> Self {
		NEXT_VIEW_ID.with(|next| {
			let id = next.get();
			next.set(id + 1);
			Self(id)
		})
	}
}

impl Display for ViewId {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "view{}", self.0)
	}
}

/// Turns template data into markup.
pub type Template = Rc<dyn Fn(&Value) -> String>;

/// Produces the data a view's [`Template`] is called with.
pub type TemplateData<D> = Rc<dyn Fn(&ManagedView<D>) -> Value>;

/// Notifications a view emits to its listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
	/// The view's element was attached to its container.
	AddedToDom,
	/// A collection view inserted this view's element into its list.
	AddedToParent,
	/// A collection view's visible items changed. Carries the new visible items.
	VisibilityChange(Vec<Model>),
}

/// Key of a subview within its parent.
///
/// Item views created by a [`CollectionView`](`crate::collection_view::CollectionView`) live under [`SubviewKey::Item`],
/// so they never collide with named subviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubviewKey {
	Item(Cid),
	Named(String),
}

impl From<&str> for SubviewKey {
	fn from(name: &str) -> Self {
		SubviewKey::Named(name.to_owned())
	}
}

impl From<String> for SubviewKey {
	fn from(name: String) -> Self {
		SubviewKey::Named(name)
	}
}

impl From<Cid> for SubviewKey {
	fn from(cid: Cid) -> Self {
		SubviewKey::Item(cid)
	}
}

impl Display for SubviewKey {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			SubviewKey::Item(cid) => write!(f, "item:{}", cid),
			SubviewKey::Named(name) => f.write_str(name),
		}
	}
}

/// Anything that can be registered as a subview.
///
/// Every view is built around a [`ManagedView`], which handles registration and disposal.
/// Implementors customise rendering only.
pub trait View<D: Document>: 'static {
	fn managed(&self) -> &ManagedView<D>;

	/// Renders the view. Returns `false` if it was already disposed.
	fn render(&self) -> Result<bool, ViewError> {
		Ok(self.managed().render()?.is_some())
	}
}

/// What [`ManagedView::remove_subview`] should remove.
pub enum SubviewTarget<'a, D: Document> {
	Key(SubviewKey),
	View(&'a ManagedView<D>),
}

impl<'a, D: Document> From<&str> for SubviewTarget<'a, D> {
	fn from(name: &str) -> Self {
		SubviewTarget::Key(name.into())
	}
}

impl<'a, D: Document> From<String> for SubviewTarget<'a, D> {
	fn from(name: String) -> Self {
		SubviewTarget::Key(name.into())
	}
}

impl<'a, D: Document> From<SubviewKey> for SubviewTarget<'a, D> {
	fn from(key: SubviewKey) -> Self {
		SubviewTarget::Key(key)
	}
}

impl<'a, D: Document> From<&'a ManagedView<D>> for SubviewTarget<'a, D> {
	fn from(view: &'a ManagedView<D>) -> Self {
		SubviewTarget::View(view)
	}
}

/// Construction-time configuration of a [`ManagedView`].
pub struct ViewOptions<D: Document> {
	/// Render during construction.
	pub auto_render: bool,
	/// Attach to [`container`](`ViewOptions::container`) after every render.
	pub auto_attach: bool,
	pub container: Option<Container<D>>,
	pub container_method: ContainerMethod<D>,
	/// Use this element instead of creating one.
	pub element: Option<D::Element>,
	/// Tag of the created element. Ignored if [`element`](`ViewOptions::element`) is set.
	pub tag_name: String,
	pub class_name: Option<String>,
	pub id: Option<String>,
	pub template: Option<Template>,
	/// Make rendering without [`template`](`ViewOptions::template`) a [`ViewError::MissingTemplate`].
	pub template_required: bool,
	/// Replaces [`ManagedView::default_template_data`].
	pub template_data: Option<TemplateData<D>>,
	pub model: Option<Model>,
	pub collection: Option<Collection>,
	/// Regions to register as `(name, selector)`. An empty selector registers the view's own element.
	pub regions: Vec<(String, String)>,
	pub region_registry: Option<RegionRegistry<D>>,
}

impl<D: Document> Default for ViewOptions<D> {
	fn default() -> Self {
		Self {
			auto_render: false,
			auto_attach: true,
			container: None,
			container_method: ContainerMethod::Append,
			element: None,
			tag_name: "div".to_owned(),
			class_name: None,
			id: None,
			template: None,
			template_required: false,
			template_data: None,
			model: None,
			collection: None,
			regions: Vec::new(),
			region_registry: None,
		}
	}
}

struct ViewState<D: Document> {
	disposed: bool,
	element: Option<D::Element>,
	auto_attach: bool,
	container: Option<Container<D>>,
	container_method: ContainerMethod<D>,
	template: Option<Template>,
	template_required: bool,
	template_data: Option<TemplateData<D>>,
	model: Option<Model>,
	collection: Option<Collection>,
	region_registry: Option<RegionRegistry<D>>,
	subviews: Vec<(SubviewKey, Rc<dyn View<D>>)>,
	subviews_by_key: HashMap<SubviewKey, Rc<dyn View<D>>>,
	subscriptions: Vec<Subscription>,
	dom_listeners: Vec<D::Listener>,
	dispose_hooks: Vec<Box<dyn FnOnce()>>,
}

struct ViewInner<D: Document> {
	id: ViewId,
	document: D,
	events: Emitter<ViewEvent>,
	state: RefCell<ViewState<D>>,
}

/// A unit of UI: an owned element, an optional bound [`Model`] or [`Collection`],
/// a registry of subviews and a render → attach → dispose lifecycle.
///
/// This is a shared handle. Clones refer to the same view.
///
/// # Lifecycle
///
/// A view is *active* until [`dispose`](`ManagedView::dispose`) is called on it, on its parent, or its bound entity is disposed.
/// Disposal is terminal: Afterwards every operation is a no-op, getters return `None` or empty values, and no listener fires.
pub struct ManagedView<D: Document> {
	inner: Rc<ViewInner<D>>,
}

impl<D: Document> Clone for ManagedView<D> {
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}

impl<D: Document> Debug for ManagedView<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.try_borrow();
		let mut debug = f.debug_struct("ManagedView");
		debug.field("id", &self.inner.id);
		if let Ok(state) = state {
			debug
				.field("disposed", &state.disposed)
				.field("element", &state.element)
				.field("subviews", &state.subviews.iter().map(|(key, _)| key).collect::<Vec<_>>());
		}
		debug.finish()
	}
}

impl<D: Document> View<D> for ManagedView<D> {
	fn managed(&self) -> &ManagedView<D> {
		self
	}
}

/// A non-owning handle to a [`ManagedView`].
pub struct WeakManagedView<D: Document> {
	inner: Weak<ViewInner<D>>,
}

impl<D: Document> Clone for WeakManagedView<D> {
	fn clone(&self) -> Self {
		Self { inner: self.inner.clone() }
	}
}

impl<D: Document> WeakManagedView<D> {
	#[must_use]
	pub fn upgrade(&self) -> Option<ManagedView<D>> {
		self.inner.upgrade().map(|inner| ManagedView { inner })
	}
}

impl<D: Document> ManagedView<D> {
	/// Creates a view, binds it to the disposal of its model or collection and renders it if [`ViewOptions::auto_render`] is set.
	///
	/// # Errors
	///
	/// Iff rendering during construction fails.
	pub fn new(document: D, options: ViewOptions<D>) -> Result<Self, ViewError> {
		let ViewOptions {
			auto_render,
			auto_attach,
			container,
			container_method,
			element,
			tag_name,
			class_name,
			id,
			template,
			template_required,
			template_data,
			model,
			collection,
			regions,
			region_registry,
		} = options;

		let element = element.unwrap_or_else(|| {
			let element = document.create_element(&tag_name);
			if let Some(class_name) = &class_name {
				document.set_attribute(&element, "class", class_name);
			}
			if let Some(id) = &id {
				document.set_attribute(&element, "id", id);
			}
			element
		});

		let view = Self {
			inner: Rc::new(ViewInner {
				id: ViewId::next(),
				document,
				events: Emitter::new(),
				state: RefCell::new(ViewState {
					disposed: false,
					element: Some(element),
					auto_attach,
					container,
					container_method,
					template,
					template_required,
					template_data,
					model: model.clone(),
					collection: collection.clone(),
					region_registry,
					subviews: Vec::new(),
					subviews_by_key: HashMap::new(),
					subscriptions: Vec::new(),
					dom_listeners: Vec::new(),
					dispose_hooks: Vec::new(),
				}),
			}),
		};

		if let Some(model) = model {
			let weak = view.downgrade();
			view.listen_to(model.on(move |event| {
				if let ModelEvent::Disposed = event {
					if let Some(view) = weak.upgrade() {
						view.dispose()
					}
				}
			}));
		}
		if let Some(collection) = collection {
			let weak = view.downgrade();
			view.listen_to(collection.on(move |event| {
				if let CollectionEvent::Disposed = event {
					if let Some(view) = weak.upgrade() {
						view.dispose()
					}
				}
			}));
		}

		for (name, selector) in &regions {
			view.register_region(name, if selector.is_empty() { None } else { Some(selector.as_str()) });
		}

		debug!(view = %view.id(), "Created view.");
		if auto_render {
			view.render()?;
		}
		Ok(view)
	}

	#[must_use]
	pub fn id(&self) -> ViewId {
		self.inner.id
	}

	#[must_use]
	pub fn document(&self) -> &D {
		&self.inner.document
	}

	/// The view's root element, or `None` once disposed.
	#[must_use]
	pub fn element(&self) -> Option<D::Element> {
		self.inner.state.borrow().element.clone()
	}

	#[must_use]
	pub fn model(&self) -> Option<Model> {
		self.inner.state.borrow().model.clone()
	}

	#[must_use]
	pub fn collection(&self) -> Option<Collection> {
		self.inner.state.borrow().collection.clone()
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.inner.state.borrow().disposed
	}

	#[must_use]
	pub fn downgrade(&self) -> WeakManagedView<D> {
		WeakManagedView { inner: Rc::downgrade(&self.inner) }
	}

	/// Whether both handles refer to the same view.
	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.inner, &other.inner)
	}

	// Rendering
	// ---------

	/// Renders the template (if any) into the element, then attaches the element if [`ViewOptions::auto_attach`] is set.
	///
	/// Returns `Ok(None)` without doing anything if the view was disposed.
	///
	/// # Errors
	///
	/// [`ViewError::MissingTemplate`] if a template is required but not configured. Nothing is rendered in that case.
	#[instrument(skip(self), fields(view = %self.inner.id))]
	pub fn render(&self) -> Result<Option<&Self>, ViewError> {
		if !self.render_content()? {
			return Ok(None);
		}
		self.attach_if_needed();
		Ok(Some(self))
	}

	/// Renders without attaching. `Ok(false)` if disposed.
	pub(crate) fn render_content(&self) -> Result<bool, ViewError> {
		let (template, element) = {
			let state = self.inner.state.borrow();
			if state.disposed {
				return Ok(false);
			}
			if state.template.is_none() && state.template_required {
				return Err(ViewError::MissingTemplate);
			}
			(state.template.clone(), state.element.clone())
		};

		if let (Some(template), Some(element)) = (template, element) {
			let data = self.template_data();
			let markup = template(&data);
			if cfg!(feature = "dangerous-logging") {
				trace!(%markup, "Rendered template.");
			}
			self.inner.document.set_inner_html(&element, &markup);
		}
		Ok(true)
	}

	pub(crate) fn attach_if_needed(&self) {
		let auto_attach = self.inner.state.borrow().auto_attach;
		if auto_attach {
			self.attach()
		}
	}

	/// The data the template is rendered with: [`ViewOptions::template_data`] if set, otherwise [`ManagedView::default_template_data`].
	#[must_use]
	pub fn template_data(&self) -> Value {
		let custom = self.inner.state.borrow().template_data.clone();
		match custom {
			Some(template_data) => template_data(self),
			None => self.default_template_data(),
		}
	}

	/// A shallow copy of the bound model's attributes, or `{"items": [...], "length": n}` for a bound collection, or `{}`.
	///
	/// If the bound entity is sync-aware, a `synced` flag is added unless the data already has one.
	#[must_use]
	pub fn default_template_data(&self) -> Value {
		let (model, collection) = {
			let state = self.inner.state.borrow();
			(state.model.clone(), state.collection.clone())
		};

		let mut data = if let Some(model) = &model {
			model.attributes()
		} else if let Some(collection) = &collection {
			let mut data = Map::new();
			let models = collection.models();
			data.insert("length".to_owned(), Value::from(models.len()));
			data.insert("items".to_owned(), Value::Array(models.iter().map(|model| Value::Object(model.attributes())).collect()));
			data
		} else {
			Map::new()
		};

		let synced = match (&model, &collection) {
			(Some(model), _) => model.sync_status().map(|sync| sync.is_synced()),
			(None, Some(collection)) => collection.sync_status().map(|sync| sync.is_synced()),
			(None, None) => None,
		};
		if let Some(synced) = synced {
			data.entry("synced").or_insert(Value::Bool(synced));
		}
		Value::Object(data)
	}

	/// Inserts the element into the configured container unless it's already connected to the document.
	///
	/// Emits [`ViewEvent::AddedToDom`] after inserting.
	/// Does nothing if no container is configured or the view is disposed.
	#[instrument(skip(self), fields(view = %self.inner.id))]
	pub fn attach(&self) {
		let (element, container, container_method, region_registry) = {
			let state = self.inner.state.borrow();
			if state.disposed {
				return;
			}
			match (&state.element, &state.container) {
				(Some(element), Some(container)) => (element.clone(), container.clone(), state.container_method.clone(), state.region_registry.clone()),
				_ => return,
			}
		};

		let document = &self.inner.document;
		if document.is_connected(&element) {
			return;
		}

		let target = match &container {
			Container::Selector(selector) => document.query_document(selector),
			Container::Element(element) => Some(element.clone()),
			Container::Region(name) => match &region_registry {
				Some(registry) => registry.resolve(document, name),
				None => {
					warn!(name = %name, "Region containers need a region registry.");
					None
				}
			},
			Container::Resolver(resolve) => resolve(document),
		};
		let target = match target {
			Some(target) => target,
			None => return warn!(?container, "Container not found. Not attaching."),
		};

		container_method.insert(document, &target, &element);
		debug!(?container_method, "Attached.");
		self.trigger(&ViewEvent::AddedToDom);
	}

	// Events
	// ------

	/// Listens to this view's [`ViewEvent`]s. Listeners are dropped when the view is disposed.
	#[must_use = "dropping the `Subscription` immediately unregisters the handler"]
	pub fn on(&self, handler: impl Fn(&ViewEvent) + 'static) -> Subscription {
		self.inner.events.on(handler)
	}

	/// Emits `event` to this view's listeners. Does nothing once disposed.
	pub fn trigger(&self, event: &ViewEvent) {
		if !self.is_disposed() {
			self.inner.events.emit(event)
		}
	}

	/// Keeps `subscription` alive until this view is disposed. Drops it immediately if the view already is.
	pub fn listen_to(&self, subscription: Subscription) {
		let mut state = self.inner.state.borrow_mut();
		if state.disposed {
			drop(state);
			drop(subscription);
		} else {
			state.subscriptions.push(subscription);
		}
	}

	/// Binds `handler` to `event` on this view's element until the view is disposed.
	pub fn listen_dom(&self, event: &str, handler: impl Fn() + 'static) {
		let element = match self.element() {
			Some(element) => element,
			None => return,
		};
		let listener = self.inner.document.add_listener(&element, event, Rc::new(handler));
		self.inner.state.borrow_mut().dom_listeners.push(listener);
	}

	/// Runs `hook` at the start of disposal, before subviews and listeners are released.
	pub(crate) fn on_dispose(&self, hook: impl FnOnce() + 'static) {
		let mut state = self.inner.state.borrow_mut();
		if !state.disposed {
			state.dispose_hooks.push(Box::new(hook));
		}
	}

	// Regions
	// -------

	/// Publishes region `name`: this view's element, or its first descendant matching `selector`.
	pub fn register_region(&self, name: &str, selector: Option<&str>) {
		let (registry, element) = {
			let state = self.inner.state.borrow();
			match (&state.region_registry, &state.element) {
				(Some(registry), Some(element)) => (registry.clone(), element.clone()),
				(None, _) => return warn!(name, "Can't register a region without region registry."),
				(_, None) => return,
			}
		};
		registry.register(self.inner.id, name, element, selector);
	}

	pub fn unregister_region(&self, name: &str) {
		let registry = self.inner.state.borrow().region_registry.clone();
		if let Some(registry) = registry {
			registry.unregister(self.inner.id, name)
		}
	}

	pub fn unregister_all_regions(&self) {
		let registry = self.inner.state.borrow().region_registry.clone();
		if let Some(registry) = registry {
			registry.unregister_owner(self.inner.id)
		}
	}

	// Subviews
	// --------

	#[must_use]
	pub fn subview(&self, key: impl Into<SubviewKey>) -> Option<Rc<dyn View<D>>> {
		let key: SubviewKey = key.into();
		self.inner.state.borrow().subviews_by_key.get(&key).cloned()
	}

	/// Registers `view` under `key`, disposing and evicting any other view registered under it first.
	///
	/// Re-registering a view under its current key changes nothing.
	/// If this view is disposed, `view` is disposed instead of being registered.
	pub fn set_subview(&self, key: impl Into<SubviewKey>, view: Rc<dyn View<D>>) -> Rc<dyn View<D>> {
		let key = key.into();
		let existing = {
			let state = self.inner.state.borrow();
			if state.disposed {
				drop(state);
				warn!(key = %key, "Disposing a subview offered to a disposed view.");
				view.managed().dispose();
				return view;
			}
			state.subviews_by_key.get(&key).cloned()
		};
		if let Some(existing) = existing {
			if existing.managed().ptr_eq(view.managed()) {
				return view;
			}
			self.remove_subview(key.clone());
		}

		trace!(parent = %self.inner.id, child = %view.managed().id(), key = %key, "Registering subview.");
		let mut state = self.inner.state.borrow_mut();
		state.subviews.push((key.clone(), view.clone()));
		state.subviews_by_key.insert(key, view.clone());
		view
	}

	/// Disposes and unregisters the subview with the given key, or the given view.
	///
	/// Unknown keys and views that aren't subviews are ignored.
	pub fn remove_subview<'a>(&self, target: impl Into<SubviewTarget<'a, D>>) {
		let found = {
			let state = self.inner.state.borrow();
			match target.into() {
				SubviewTarget::Key(key) => state.subviews_by_key.get(&key).map(|view| (key.clone(), view.clone())),
				SubviewTarget::View(target) => state
					.subviews_by_key
					.iter()
					.find(|(_, view)| view.managed().ptr_eq(target))
					.map(|(key, view)| (key.clone(), view.clone())),
			}
		};
		let (key, view) = match found {
			Some(found) => found,
			None => return,
		};

		view.managed().dispose();

		let removed = {
			let mut state = self.inner.state.borrow_mut();
			state.subviews.retain(|(other, _)| *other != key);
			state.subviews_by_key.remove(&key)
		};
		trace!(parent = %self.inner.id, key = %key, "Removed subview.");
		drop(removed);
	}

	/// The subviews in registration order.
	#[must_use]
	pub fn subviews(&self) -> Vec<Rc<dyn View<D>>> {
		self.inner.state.borrow().subviews.iter().map(|(_, view)| view.clone()).collect()
	}

	/// The subview keys in registration order.
	#[must_use]
	pub fn subview_keys(&self) -> Vec<SubviewKey> {
		self.inner.state.borrow().subviews.iter().map(|(key, _)| key.clone()).collect()
	}

	#[must_use]
	pub fn subview_count(&self) -> usize {
		let state = self.inner.state.borrow();
		debug_assert_eq!(state.subviews.len(), state.subviews_by_key.len());
		state.subviews.len()
	}

	pub(crate) fn item_subviews(&self) -> Vec<(Cid, Rc<dyn View<D>>)> {
		self.inner
			.state
			.borrow()
			.subviews
			.iter()
			.filter_map(|(key, view)| match key {
				SubviewKey::Item(cid) => Some((*cid, view.clone())),
				SubviewKey::Named(_) => None,
			})
			.collect()
	}

	// Disposal
	// --------

	/// Tears the view down: Unregisters its regions, disposes its subviews, drops all of its listeners,
	/// removes its element from the document and releases all references it holds.
	///
	/// The view counts as disposed from the start of this call, so teardown callbacks see it as such.
	/// Disposing a disposed view does nothing.
	#[instrument(skip(self), fields(view = %self.inner.id))]
	pub fn dispose(&self) {
		let hooks = {
			let mut state = self.inner.state.borrow_mut();
			if state.disposed {
				return;
			}
			state.disposed = true;
			mem::take(&mut state.dispose_hooks)
		};
		for hook in hooks {
			hook()
		}

		self.unregister_all_regions();

		let subviews = self.subviews();
		for subview in &subviews {
			subview.managed().dispose()
		}
		drop(subviews);

		self.inner.events.clear();
		let (subscriptions, dom_listeners, element) = {
			let mut state = self.inner.state.borrow_mut();
			(mem::take(&mut state.subscriptions), mem::take(&mut state.dom_listeners), state.element.take())
		};
		trace!("Releasing {} subscription(s) and {} element listener(s).", subscriptions.len(), dom_listeners.len());
		drop(subscriptions);
		drop(dom_listeners);

		if let Some(element) = element {
			self.inner.document.remove(&element)
		}

		let released = {
			let mut state = self.inner.state.borrow_mut();
			(
				state.container.take(),
				state.template.take(),
				state.template_data.take(),
				state.model.take(),
				state.collection.take(),
				state.region_registry.take(),
				mem::take(&mut state.subviews),
				mem::take(&mut state.subviews_by_key),
			)
		};
		drop(released);
		debug!("Disposed.");
	}
}
