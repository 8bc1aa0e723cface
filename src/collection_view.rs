//! [`CollectionView`]: keeps one item view per [`Collection`] member, in collection order.

use crate::{
	document::Document,
	error::ViewError,
	events::Subscription,
	model::{Cid, Collection, CollectionEvent, Model},
	view::{ManagedView, SubviewKey, Template, View, ViewEvent, ViewOptions, WeakManagedView},
};
use core::{
	cell::RefCell,
	fmt::{self, Debug, Formatter},
	mem,
	time::Duration,
};
use hashbrown::HashSet;
use serde_json::{Map, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, error, instrument, trace, trace_span, warn};

/// Decides whether the record at the given index is shown.
pub type Filterer = Rc<dyn Fn(&Model, usize) -> bool>;

/// Applies the outcome of a [`Filterer`] to an item view.
pub type FilterCallback<D> = Rc<dyn Fn(&ManagedView<D>, bool)>;

/// Creates item views for records.
///
/// Implement this to vary the kind of item view by record. Closures `Fn(&D, &Model) -> Result<Rc<dyn View<D>>, ViewError>` implement it too.
/// The created view must not render itself. The [`CollectionView`] renders it right after creation.
pub trait ItemKind<D: Document> {
	/// # Errors
	///
	/// Whenever the view can't be created.
	fn create(&self, document: &D, model: &Model) -> Result<Rc<dyn View<D>>, ViewError>;
}

impl<D, F> ItemKind<D> for F
where
	D: Document,
	F: Fn(&D, &Model) -> Result<Rc<dyn View<D>>, ViewError>,
{
	fn create(&self, document: &D, model: &Model) -> Result<Rc<dyn View<D>>, ViewError> {
		self(document, model)
	}
}

/// An [`ItemKind`] creating a plain [`ManagedView`] bound to the record and rendered with `template`.
#[derive(Clone)]
pub struct ItemTemplate {
	pub tag_name: String,
	pub class_name: Option<String>,
	pub template: Option<Template>,
}

impl ItemTemplate {
	#[must_use]
	pub fn new(tag_name: &str, template: impl Fn(&Value) -> String + 'static) -> Self {
		Self {
			tag_name: tag_name.to_owned(),
			class_name: None,
			template: Some(Rc::new(template)),
		}
	}
}

impl Debug for ItemTemplate {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ItemTemplate")
			.field("tag_name", &self.tag_name)
			.field("class_name", &self.class_name)
			.field("template", &self.template.as_ref().map(|_| ".."))
			.finish()
	}
}

impl<D: Document> ItemKind<D> for ItemTemplate {
	fn create(&self, document: &D, model: &Model) -> Result<Rc<dyn View<D>>, ViewError> {
		let view = ManagedView::new(
			document.clone(),
			ViewOptions {
				auto_render: false,
				tag_name: self.tag_name.clone(),
				class_name: self.class_name.clone(),
				template: self.template.clone(),
				model: Some(model.clone()),
				..ViewOptions::default()
			},
		)?;
		Ok(Rc::new(view))
	}
}

/// Construction-time configuration of a [`CollectionView`].
pub struct CollectionViewOptions<D: Document> {
	/// Options of the underlying [`ManagedView`]. [`ViewOptions::auto_render`] defaults to `true` here.
	///
	/// [`ViewOptions::collection`] is replaced by the collection passed to [`CollectionView::new`].
	pub view: ViewOptions<D>,
	pub item_kind: Option<Rc<dyn ItemKind<D>>>,
	/// Render all items when the view renders.
	pub render_items: bool,
	pub filterer: Option<Filterer>,
	/// Defaults to stopping animations and toggling visibility.
	pub filter_callback: Option<FilterCallback<D>>,
	/// Fade-in duration of inserted items. Zero disables animation.
	pub animation_duration: Duration,
	/// Animate through [`animation_start_class`](`CollectionViewOptions::animation_start_class`) and
	/// [`animation_end_class`](`CollectionViewOptions::animation_end_class`) instead of fading opacity.
	pub use_css_animation: bool,
	pub animation_start_class: String,
	pub animation_end_class: String,
	/// Selects the element item views are inserted into. The view's own element if unset.
	pub list_selector: Option<String>,
	/// Selects which children of the list element are item views. All children if unset.
	pub item_selector: Option<String>,
	/// Selects an element shown while no items are visible.
	pub fallback_selector: Option<String>,
	/// Selects an element shown while a sync-aware collection is empty and syncing.
	pub loading_selector: Option<String>,
}

impl<D: Document> Default for CollectionViewOptions<D> {
	fn default() -> Self {
		Self {
			view: ViewOptions {
				auto_render: true,
				..ViewOptions::default()
			},
			item_kind: None,
			render_items: true,
			filterer: None,
			filter_callback: None,
			animation_duration: Duration::from_millis(500),
			use_css_animation: false,
			animation_start_class: "animated-item-view".to_owned(),
			animation_end_class: "animated-item-view-end".to_owned(),
			list_selector: None,
			item_selector: None,
			fallback_selector: None,
			loading_selector: None,
		}
	}
}

struct ListState<D: Document> {
	collection: Option<Collection>,
	item_kind: Option<Rc<dyn ItemKind<D>>>,
	render_items: bool,
	filterer: Option<Filterer>,
	filter_callback: Option<FilterCallback<D>>,
	animation_duration: Duration,
	use_css_animation: bool,
	animation_start_class: String,
	animation_end_class: String,
	list_selector: Option<String>,
	item_selector: Option<String>,
	fallback_selector: Option<String>,
	loading_selector: Option<String>,
	visible_items: Vec<Model>,
	list: Option<D::Element>,
	fallback: Option<D::Element>,
	loading: Option<D::Element>,
	fallback_subscriptions: Vec<Subscription>,
	loading_subscriptions: Vec<Subscription>,
}

/// Mirrors a [`Collection`] into item views inside a list element.
///
/// Item views are created lazily through the configured [`ItemKind`] and registered as subviews under [`SubviewKey::Item`],
/// so a record keeps its view across moves, sorts and resets. They are disposed when their record leaves the collection.
///
/// The view also tracks which records are *visible* (rendered and accepted by the filter),
/// emitting [`ViewEvent::VisibilityChange`] when that set changes, and can drive fallback and loading indicators from it.
///
/// This is a shared handle. Clones refer to the same view.
pub struct CollectionView<D: Document> {
	base: ManagedView<D>,
	list: Rc<RefCell<ListState<D>>>,
}

impl<D: Document> Clone for CollectionView<D> {
	fn clone(&self) -> Self {
		Self {
			base: self.base.clone(),
			list: self.list.clone(),
		}
	}
}

impl<D: Document> Debug for CollectionView<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let mut debug = f.debug_struct("CollectionView");
		debug.field("base", &self.base);
		if let Ok(list) = self.list.try_borrow() {
			debug.field("visible_items", &list.visible_items).field("list", &list.list);
		}
		debug.finish()
	}
}

impl<D: Document> View<D> for CollectionView<D> {
	fn managed(&self) -> &ManagedView<D> {
		&self.base
	}

	fn render(&self) -> Result<bool, ViewError> {
		Ok(CollectionView::render(self)?.is_some())
	}
}

struct WeakCollectionView<D: Document> {
	base: WeakManagedView<D>,
	list: Weak<RefCell<ListState<D>>>,
}

impl<D: Document> Clone for WeakCollectionView<D> {
	fn clone(&self) -> Self {
		Self {
			base: self.base.clone(),
			list: self.list.clone(),
		}
	}
}

impl<D: Document> WeakCollectionView<D> {
	fn upgrade(&self) -> Option<CollectionView<D>> {
		Some(CollectionView {
			base: self.base.upgrade()?,
			list: self.list.upgrade()?,
		})
	}
}

fn list_template_data<D: Document>(view: &ManagedView<D>) -> Value {
	let mut data = Map::new();
	if let Some(collection) = view.collection() {
		data.insert("length".to_owned(), Value::from(collection.len()));
		if let Some(sync) = collection.sync_status() {
			data.insert("synced".to_owned(), Value::Bool(sync.is_synced()));
		}
	}
	Value::Object(data)
}

impl<D: Document> CollectionView<D> {
	/// Creates the view, starts observing `collection`, applies the initial filter and renders if [`ViewOptions::auto_render`] is set.
	///
	/// # Errors
	///
	/// Iff the initial render fails, for example with [`ViewError::MissingItemKind`] for a non-empty collection.
	pub fn new(document: D, collection: Collection, options: CollectionViewOptions<D>) -> Result<Self, ViewError> {
		let CollectionViewOptions {
			mut view,
			item_kind,
			render_items,
			filterer,
			filter_callback,
			animation_duration,
			use_css_animation,
			animation_start_class,
			animation_end_class,
			list_selector,
			item_selector,
			fallback_selector,
			loading_selector,
		} = options;

		let auto_render = mem::replace(&mut view.auto_render, false);
		view.collection = Some(collection.clone());
		if view.template_data.is_none() {
			view.template_data = Some(Rc::new(list_template_data::<D>));
		}

		let this = Self {
			base: ManagedView::new(document, view)?,
			list: Rc::new(RefCell::new(ListState {
				collection: Some(collection.clone()),
				item_kind,
				render_items,
				filterer: None,
				filter_callback,
				animation_duration,
				use_css_animation,
				animation_start_class,
				animation_end_class,
				list_selector,
				item_selector,
				fallback_selector,
				loading_selector,
				visible_items: Vec::new(),
				list: None,
				fallback: None,
				loading: None,
				fallback_subscriptions: Vec::new(),
				loading_subscriptions: Vec::new(),
			})),
		};

		let list = Rc::downgrade(&this.list);
		this.base.on_dispose(move || {
			if let Some(list) = list.upgrade() {
				let released = {
					let mut list = list.borrow_mut();
					(
						list.list.take(),
						list.fallback.take(),
						list.loading.take(),
						mem::take(&mut list.visible_items),
						mem::take(&mut list.fallback_subscriptions),
						mem::take(&mut list.loading_subscriptions),
						list.collection.take(),
						list.item_kind.take(),
						list.filterer.take(),
						list.filter_callback.take(),
					)
				};
				drop(released);
			}
		});

		this.add_collection_listeners(&collection);

		if filterer.is_some() {
			this.filter(filterer)?;
		}
		if auto_render {
			this.render()?;
		}
		Ok(this)
	}

	fn downgrade(&self) -> WeakCollectionView<D> {
		WeakCollectionView {
			base: self.base.downgrade(),
			list: Rc::downgrade(&self.list),
		}
	}

	fn add_collection_listeners(&self, collection: &Collection) {
		let weak = self.downgrade();
		self.base.listen_to(collection.on(move |event| {
			let view = match weak.upgrade() {
				Some(view) => view,
				None => return,
			};
			match event {
				CollectionEvent::Add { model, index } => {
					let span = trace_span!("item added", cid = %model.cid(), index);
					let _enter = span.enter();
					if let Err(error) = view.item_added(model, *index) {
						error!(%error, "Failed to insert an item view.");
					}
				}
				CollectionEvent::Remove { model, .. } => {
					let span = trace_span!("item removed", cid = %model.cid());
					let _enter = span.enter();
					view.item_removed(model);
				}
				CollectionEvent::Reset | CollectionEvent::Sort => {
					let span = trace_span!("items reset");
					let _enter = span.enter();
					if let Err(error) = view.render_all_items() {
						error!(%error, "Failed to re-render items.");
					}
				}
				CollectionEvent::SyncStateChange(_) | CollectionEvent::Disposed => (),
			}
		}));
	}

	#[must_use]
	pub fn is_disposed(&self) -> bool {
		self.base.is_disposed()
	}

	/// The observed collection, or `None` once disposed.
	#[must_use]
	pub fn collection(&self) -> Option<Collection> {
		self.list.borrow().collection.clone()
	}

	/// The records currently rendered and accepted by the filter, in the order they became visible.
	#[must_use]
	pub fn visible_items(&self) -> Vec<Model> {
		self.list.borrow().visible_items.clone()
	}

	#[must_use]
	pub fn list_element(&self) -> Option<D::Element> {
		self.list.borrow().list.clone()
	}

	#[must_use]
	pub fn fallback_element(&self) -> Option<D::Element> {
		self.list.borrow().fallback.clone()
	}

	#[must_use]
	pub fn loading_element(&self) -> Option<D::Element> {
		self.list.borrow().loading.clone()
	}

	/// The item views by record [`Cid`], in registration order.
	#[must_use]
	pub fn get_item_views(&self) -> Vec<(Cid, Rc<dyn View<D>>)> {
		self.base.item_subviews()
	}

	#[must_use]
	pub fn item_view(&self, model: &Model) -> Option<Rc<dyn View<D>>> {
		self.base.subview(SubviewKey::Item(model.cid()))
	}

	pub fn dispose(&self) {
		self.base.dispose()
	}

	// Rendering
	// ---------

	/// Renders the template (if any), locates the list, fallback and loading elements,
	/// renders all items if [`CollectionViewOptions::render_items`] is set, then attaches.
	///
	/// Meant to be called once. Returns `Ok(None)` if the view was disposed.
	///
	/// # Errors
	///
	/// See [`ManagedView::render`] and [`CollectionView::render_all_items`].
	#[instrument(skip(self), fields(view = %self.base.id()))]
	pub fn render(&self) -> Result<Option<&Self>, ViewError> {
		if !self.base.render_content()? {
			return Ok(None);
		}
		let element = match self.base.element() {
			Some(element) => element,
			None => return Ok(None),
		};

		let (list_selector, render_items) = {
			let list = self.list.borrow();
			(list.list_selector.clone(), list.render_items)
		};
		let list_element = match list_selector {
			Some(selector) => self.base.document().query(&element, &selector).unwrap_or_else(|| {
				warn!(selector = %selector, "List element not found. Inserting items into the view's own element.");
				element.clone()
			}),
			None => element,
		};
		self.list.borrow_mut().list = Some(list_element);

		self.init_fallback();
		self.init_loading_indicator();

		if render_items {
			self.render_all_items()?;
		}

		self.base.attach_if_needed();
		Ok(Some(self))
	}

	/// Reconciles the item views with the collection: Disposes views of records that left it,
	/// then repositions existing views and creates missing ones in collection order.
	///
	/// # Errors
	///
	/// [`ViewError::MissingItemKind`] if a view would have to be created but no item kind is configured.
	/// This is checked before anything changes.
	/// Errors from creating or rendering an item view abort the reconciliation at that record.
	#[instrument(skip(self), fields(view = %self.base.id()))]
	pub fn render_all_items(&self) -> Result<(), ViewError> {
		let (collection, has_item_kind) = {
			let list = self.list.borrow();
			match &list.collection {
				Some(collection) => (collection.clone(), list.item_kind.is_some()),
				None => return Ok(()),
			}
		};
		let models = collection.models();
		let has_view = |model: &Model| self.base.subview(SubviewKey::Item(model.cid())).is_some();

		if !has_item_kind && !models.iter().all(|model| has_view(model)) {
			return Err(ViewError::MissingItemKind);
		}

		let previously_visible = mem::take(&mut self.list.borrow_mut().visible_items);

		let remaining: HashSet<Cid> = models.iter().filter(|model| has_view(*model)).map(Model::cid).collect();
		for (cid, _) in self.base.item_subviews() {
			if !remaining.contains(&cid) {
				trace!(cid = %cid, "Removing stale item view.");
				self.base.remove_subview(SubviewKey::Item(cid));
			}
		}

		for (index, model) in models.iter().enumerate() {
			match self.item_view(model) {
				Some(view) => {
					self.insert_view(model, view, Some(index), false);
				}
				None => {
					let view = self.render_item(model)?;
					self.insert_view(model, view, Some(index), true);
				}
			}
		}

		// Insertions announce every addition. Only a change to nothing visible is left to report.
		let nothing_visible = self.list.borrow().visible_items.is_empty();
		if models.is_empty() || (nothing_visible && !previously_visible.is_empty()) {
			self.trigger_visibility_change();
		}
		debug!("Rendered {} item(s).", models.len());
		Ok(())
	}

	/// Returns the item view for `model`, creating and registering it first if needed. Renders it in either case.
	///
	/// # Errors
	///
	/// [`ViewError::MissingItemKind`] if the view has to be created but no item kind is configured,
	/// and any error from creating or rendering the item view.
	pub fn render_item(&self, model: &Model) -> Result<Rc<dyn View<D>>, ViewError> {
		let view = match self.item_view(model) {
			Some(view) => view,
			None => {
				let view = self.init_item_view(model)?;
				self.base.set_subview(SubviewKey::Item(model.cid()), view)
			}
		};
		view.render()?;
		Ok(view)
	}

	fn init_item_view(&self, model: &Model) -> Result<Rc<dyn View<D>>, ViewError> {
		let item_kind = self.list.borrow().item_kind.clone().ok_or(ViewError::MissingItemKind)?;
		item_kind.create(self.base.document(), model)
	}

	// Adding / Removing
	// -----------------

	/// Creates (or reuses) and inserts the view for a record added at `index`.
	///
	/// # Errors
	///
	/// See [`CollectionView::render_item`]. Nothing is inserted in that case.
	pub fn item_added(&self, model: &Model, index: usize) -> Result<(), ViewError> {
		if self.is_disposed() {
			return Ok(());
		}
		let view = self.render_item(model)?;
		self.insert_view(model, view, Some(index), true);
		Ok(())
	}

	/// Hides and disposes the view of a removed record.
	pub fn item_removed(&self, model: &Model) {
		self.update_visible_items(model, false, true);
		self.base.remove_subview(SubviewKey::Item(model.cid()));
	}

	/// Inserts `view` into the list at `position` (by default the record's collection index),
	/// applying the filter and, if `animate` is set and the animation duration isn't zero, fading it in.
	///
	/// Emits [`ViewEvent::AddedToParent`] on `view` and updates the visible items.
	pub fn insert_view(&self, model: &Model, view: Rc<dyn View<D>>, position: Option<usize>, animate: bool) -> Rc<dyn View<D>> {
		let (collection, list, filterer, filter_callback, item_selector) = {
			let list = self.list.borrow();
			match &list.collection {
				Some(collection) => (
					collection.clone(),
					list.list.clone(),
					list.filterer.clone(),
					list.filter_callback.clone(),
					list.item_selector.clone(),
				),
				None => return view,
			}
		};
		let (animation_duration, use_css_animation, animation_start_class, animation_end_class) = {
			let list = self.list.borrow();
			(
				list.animation_duration,
				list.use_css_animation,
				list.animation_start_class.clone(),
				list.animation_end_class.clone(),
			)
		};

		let document = self.base.document();
		let list = match list.or_else(|| self.base.element()) {
			Some(list) => list,
			None => return view,
		};
		let element = match view.managed().element() {
			Some(element) => element,
			None => {
				warn!(cid = %model.cid(), "Not inserting a disposed item view.");
				return view;
			}
		};

		let animate = animate && animation_duration != Duration::from_secs(0);
		let position = position.unwrap_or_else(|| collection.index_of(model).unwrap_or_else(|| collection.len()));
		let included = filterer.as_ref().map_or(true, |filterer| filterer(model, position));

		if included && animate {
			if use_css_animation {
				document.add_class(&element, &animation_start_class);
			} else {
				document.set_opacity(&element, 0.0);
			}
		}

		if filterer.is_some() {
			apply_filter_callback(document, filter_callback.as_ref(), view.managed(), included);
		}

		let length = collection.len();
		let insert_in_middle = 0 < position && position < length;
		if insert_in_middle || item_selector.is_some() {
			let children = document.children(&list, item_selector.as_deref());
			if children.get(position) != Some(&element) {
				if children.is_empty() || position >= children.len() {
					document.append(&list, &element);
				} else if position == 0 {
					document.insert_before(&children[0], &element);
				} else {
					document.insert_after(&children[position - 1], &element);
				}
			}
		} else if length == 0 || position >= length {
			if document.last_child(&list).as_ref() != Some(&element) {
				document.append(&list, &element);
			}
		} else if document.first_child(&list).as_ref() != Some(&element) {
			document.prepend(&list, &element);
		}

		view.managed().trigger(&ViewEvent::AddedToParent);

		self.update_visible_items(model, included, true);

		if included && animate {
			if use_css_animation {
				let deferred_document = document.clone();
				let element = element.clone();
				document.defer(Box::new(move || deferred_document.add_class(&element, &animation_end_class)));
			} else {
				document.fade_to(&element, 1.0, animation_duration);
			}
		}

		view
	}

	// Visible items
	// -------------

	/// Adds `model` to or removes it from the visible items. Returns whether they changed.
	///
	/// Emits [`ViewEvent::VisibilityChange`] on change if `notify` is set.
	pub fn update_visible_items(&self, model: &Model, included: bool, notify: bool) -> bool {
		let notification = {
			let mut list = self.list.borrow_mut();
			let index = list.visible_items.iter().position(|visible| visible == model);
			match (included, index) {
				(true, None) => list.visible_items.push(model.clone()),
				(false, Some(index)) => {
					list.visible_items.remove(index);
				}
				_ => return false,
			}
			if notify {
				Some(list.visible_items.clone())
			} else {
				None
			}
		};
		if let Some(visible_items) = notification {
			self.base.trigger(&ViewEvent::VisibilityChange(visible_items));
		}
		true
	}

	fn trigger_visibility_change(&self) {
		let visible_items = self.list.borrow().visible_items.clone();
		self.base.trigger(&ViewEvent::VisibilityChange(visible_items));
	}

	// Filtering
	// ---------

	/// Replaces the filter (`None` shows everything) and applies it to all item views, keeping the filter callback.
	///
	/// See [`CollectionView::filter_with`].
	///
	/// # Errors
	///
	/// See [`CollectionView::filter_with`].
	pub fn filter(&self, filterer: Option<Filterer>) -> Result<(), ViewError> {
		self.apply_filter(filterer, None)
	}

	/// Replaces the filter and the filter callback (`None` restores the default), then applies them.
	///
	/// If any item views exist, each member's view is passed to the callback with its inclusion
	/// and the visible items are updated. Exactly one [`ViewEvent::VisibilityChange`] is emitted in any case.
	///
	/// # Errors
	///
	/// [`ViewError::MissingItemView`] if some item views exist but not for every member.
	/// Nothing changes in that case.
	pub fn filter_with(&self, filterer: Option<Filterer>, filter_callback: Option<FilterCallback<D>>) -> Result<(), ViewError> {
		self.apply_filter(filterer, Some(filter_callback))
	}

	#[instrument(skip(self, filterer, filter_callback), fields(view = %self.base.id(), filtered = filterer.is_some()))]
	fn apply_filter(&self, filterer: Option<Filterer>, filter_callback: Option<Option<FilterCallback<D>>>) -> Result<(), ViewError> {
		let collection = match self.collection() {
			Some(collection) => collection,
			None => return Ok(()),
		};

		let mut targets = Vec::new();
		if !self.base.item_subviews().is_empty() {
			for (index, model) in collection.models().into_iter().enumerate() {
				let view = self.item_view(&model).ok_or_else(|| ViewError::MissingItemView(model.cid()))?;
				targets.push((index, model, view));
			}
		}

		let filter_callback = {
			let mut list = self.list.borrow_mut();
			list.filterer = filterer.clone();
			if let Some(filter_callback) = filter_callback {
				list.filter_callback = filter_callback;
			}
			list.filter_callback.clone()
		};

		let document = self.base.document();
		for (index, model, view) in targets {
			let included = filterer.as_ref().map_or(true, |filterer| filterer(&model, index));
			apply_filter_callback(document, filter_callback.as_ref(), view.managed(), included);
			self.update_visible_items(&model, included, false);
		}

		self.trigger_visibility_change();
		Ok(())
	}

	// Fallback and loading indicator
	// ------------------------------

	fn init_fallback(&self) {
		let (selector, collection) = {
			let list = self.list.borrow();
			match (&list.fallback_selector, &list.collection) {
				(Some(selector), Some(collection)) => (selector.clone(), collection.clone()),
				_ => return,
			}
		};
		let fallback = match self.base.element().and_then(|element| self.base.document().query(&element, &selector)) {
			Some(fallback) => fallback,
			None => return warn!(selector = %selector, "Fallback element not found."),
		};

		let weak = self.downgrade();
		let on_visibility_change = self.base.on({
			let weak = weak.clone();
			move |event| {
				if let ViewEvent::VisibilityChange(_) = event {
					if let Some(view) = weak.upgrade() {
						view.toggle_fallback()
					}
				}
			}
		});
		let on_sync_state_change = collection.on(move |event| {
			if let CollectionEvent::SyncStateChange(_) = event {
				if let Some(view) = weak.upgrade() {
					view.toggle_fallback()
				}
			}
		});

		let replaced = {
			let mut list = self.list.borrow_mut();
			list.fallback = Some(fallback);
			mem::replace(&mut list.fallback_subscriptions, vec![on_visibility_change, on_sync_state_change])
		};
		drop(replaced);

		self.toggle_fallback();
	}

	/// Shows the fallback element iff no item is visible and the collection is synced (or isn't sync-aware).
	pub fn toggle_fallback(&self) {
		let (fallback, visible_count, collection) = {
			let list = self.list.borrow();
			match (&list.fallback, &list.collection) {
				(Some(fallback), Some(collection)) => (fallback.clone(), list.visible_items.len(), collection.clone()),
				_ => return,
			}
		};
		let synced = collection.sync_status().map_or(true, |sync| sync.is_synced());
		let visible = visible_count == 0 && synced;
		trace!(visible, "Toggling fallback.");
		self.base.document().set_visible(&fallback, visible);
	}

	fn init_loading_indicator(&self) {
		let (selector, collection) = {
			let list = self.list.borrow();
			match (&list.loading_selector, &list.collection) {
				(Some(selector), Some(collection)) if collection.sync_status().is_some() => (selector.clone(), collection.clone()),
				_ => return,
			}
		};
		let loading = match self.base.element().and_then(|element| self.base.document().query(&element, &selector)) {
			Some(loading) => loading,
			None => return warn!(selector = %selector, "Loading indicator element not found."),
		};

		let weak = self.downgrade();
		let on_sync_state_change = collection.on(move |event| {
			if let CollectionEvent::SyncStateChange(_) = event {
				if let Some(view) = weak.upgrade() {
					view.toggle_loading_indicator()
				}
			}
		});

		let replaced = {
			let mut list = self.list.borrow_mut();
			list.loading = Some(loading);
			mem::replace(&mut list.loading_subscriptions, vec![on_sync_state_change])
		};
		drop(replaced);

		self.toggle_loading_indicator();
	}

	/// Shows the loading indicator iff the collection is empty and syncing.
	///
	/// Syncing a non-empty collection (to append to it, for example) leaves the indicator hidden.
	pub fn toggle_loading_indicator(&self) {
		let (loading, collection) = {
			let list = self.list.borrow();
			match (&list.loading, &list.collection) {
				(Some(loading), Some(collection)) => (loading.clone(), collection.clone()),
				_ => return,
			}
		};
		let syncing = collection.sync_status().map_or(false, |sync| sync.is_syncing());
		let visible = collection.is_empty() && syncing;
		trace!(visible, "Toggling loading indicator.");
		self.base.document().set_visible(&loading, visible);
	}
}

/// Runs `filter_callback`, or by default stops animations on the view's element and shows or hides it.
fn apply_filter_callback<D: Document>(document: &D, filter_callback: Option<&FilterCallback<D>>, view: &ManagedView<D>, included: bool) {
	match filter_callback {
		Some(filter_callback) => filter_callback(view, included),
		None => {
			if let Some(element) = view.element() {
				document.stop_animation(&element);
				document.set_visible(&element, included);
			}
		}
	}
}
