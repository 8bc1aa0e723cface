//! The document tree that views render into.
//!
//! Views only ever touch elements through a [`Document`], so the same view code drives
//! [`MemoryDocument`](`crate::memory::MemoryDocument`) natively and [`WebDocument`](`crate::web::WebDocument`) in the browser.

use core::{
	fmt::{self, Debug, Formatter},
	time::Duration,
};
use std::rc::Rc;

/// Element-level operations views need from a document tree.
///
/// All methods are infallible from the caller's point of view:
/// Implementations log and skip operations they can't perform (for example a syntactically invalid selector).
pub trait Document: Clone + 'static {
	/// A cheap handle to an element. Equality is identity.
	type Element: Clone + PartialEq + Debug + 'static;
	/// An event listener registration. Dropping it unregisters the listener.
	type Listener: 'static;

	fn create_element(&self, tag_name: &str) -> Self::Element;
	fn set_attribute(&self, element: &Self::Element, name: &str, value: &str);
	fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

	/// Replaces the element's content with parsed `markup`.
	fn set_inner_html(&self, element: &Self::Element, markup: &str);

	/// Finds the first descendant of `scope` (excluding `scope` itself) matching `selector`.
	fn query(&self, scope: &Self::Element, selector: &str) -> Option<Self::Element>;
	/// Finds the first element anywhere in the document matching `selector`.
	fn query_document(&self, selector: &str) -> Option<Self::Element>;

	/// The element children of `parent`, optionally only those matching `selector`.
	fn children(&self, parent: &Self::Element, selector: Option<&str>) -> Vec<Self::Element>;
	fn first_child(&self, parent: &Self::Element) -> Option<Self::Element>;
	fn last_child(&self, parent: &Self::Element) -> Option<Self::Element>;
	fn parent(&self, element: &Self::Element) -> Option<Self::Element>;

	// Insertion moves `element` if it is already part of a tree.
	fn append(&self, parent: &Self::Element, element: &Self::Element);
	fn prepend(&self, parent: &Self::Element, element: &Self::Element);
	/// Inserts `element` as the previous sibling of `reference`.
	fn insert_before(&self, reference: &Self::Element, element: &Self::Element);
	/// Inserts `element` as the next sibling of `reference`.
	fn insert_after(&self, reference: &Self::Element, element: &Self::Element);
	/// Removes all content of `parent`, then appends `element`.
	fn replace_content(&self, parent: &Self::Element, element: &Self::Element);

	/// Detaches `element` from its parent and releases listeners bound within its subtree.
	fn remove(&self, element: &Self::Element);
	/// Whether `element` is part of the document's tree.
	fn is_connected(&self, element: &Self::Element) -> bool;

	fn add_class(&self, element: &Self::Element, class: &str);
	fn remove_class(&self, element: &Self::Element, class: &str);
	fn has_class(&self, element: &Self::Element, class: &str) -> bool;

	fn set_visible(&self, element: &Self::Element, visible: bool);
	fn is_visible(&self, element: &Self::Element) -> bool;

	fn set_opacity(&self, element: &Self::Element, opacity: f64);
	/// Animates the element's opacity to `opacity` over `duration`.
	fn fade_to(&self, element: &Self::Element, opacity: f64, duration: Duration);
	/// Jumps any running animation on `element` to its end state.
	fn stop_animation(&self, element: &Self::Element);

	/// Runs `task` on a later tick, after the current one has been rendered.
	fn defer(&self, task: Box<dyn FnOnce()>);

	fn add_listener(&self, element: &Self::Element, event: &str, handler: Rc<dyn Fn()>) -> Self::Listener;
}

/// Where a view's element is attached on render.
pub enum Container<D: Document> {
	/// The first element in the document matching this selector.
	Selector(String),
	Element(D::Element),
	/// A region registered by another view, resolved through the view's [`RegionRegistry`](`crate::region::RegionRegistry`).
	Region(String),
	/// Resolved on each attach.
	Resolver(Rc<dyn Fn(&D) -> Option<D::Element>>),
}

impl<D: Document> Clone for Container<D> {
	fn clone(&self) -> Self {
		match self {
			Container::Selector(selector) => Container::Selector(selector.clone()),
			Container::Element(element) => Container::Element(element.clone()),
			Container::Region(name) => Container::Region(name.clone()),
			Container::Resolver(resolver) => Container::Resolver(resolver.clone()),
		}
	}
}

impl<D: Document> Debug for Container<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Container::Selector(selector) => f.debug_tuple("Selector").field(selector).finish(),
			Container::Element(element) => f.debug_tuple("Element").field(element).finish(),
			Container::Region(name) => f.debug_tuple("Region").field(name).finish(),
			Container::Resolver(_) => f.write_str("Resolver(..)"),
		}
	}
}

/// How a view's element is inserted relative to its container.
pub enum ContainerMethod<D: Document> {
	/// As the container's last child.
	Append,
	/// As the container's first child.
	Prepend,
	/// As the container's only content.
	Html,
	/// As the container's previous sibling.
	Before,
	/// As the container's next sibling.
	After,
	/// Called with the container and the view's element.
	Custom(Rc<dyn Fn(&D, &D::Element, &D::Element)>),
}

impl<D: Document> Default for ContainerMethod<D> {
	fn default() -> Self {
		ContainerMethod::Append
	}
}

impl<D: Document> Clone for ContainerMethod<D> {
	fn clone(&self) -> Self {
		match self {
			ContainerMethod::Append => ContainerMethod::Append,
			ContainerMethod::Prepend => ContainerMethod::Prepend,
			ContainerMethod::Html => ContainerMethod::Html,
			ContainerMethod::Before => ContainerMethod::Before,
			ContainerMethod::After => ContainerMethod::After,
			ContainerMethod::Custom(insert) => ContainerMethod::Custom(insert.clone()),
		}
	}
}

impl<D: Document> Debug for ContainerMethod<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			ContainerMethod::Append => "Append",
			ContainerMethod::Prepend => "Prepend",
			ContainerMethod::Html => "Html",
			ContainerMethod::Before => "Before",
			ContainerMethod::After => "After",
			ContainerMethod::Custom(_) => "Custom(..)",
		})
	}
}

impl<D: Document> ContainerMethod<D> {
	pub(crate) fn insert(&self, document: &D, container: &D::Element, element: &D::Element) {
		match self {
			ContainerMethod::Append => document.append(container, element),
			ContainerMethod::Prepend => document.prepend(container, element),
			ContainerMethod::Html => document.replace_content(container, element),
			ContainerMethod::Before => document.insert_before(container, element),
			ContainerMethod::After => document.insert_after(container, element),
			ContainerMethod::Custom(insert) => insert(document, container, element),
		}
	}
}
