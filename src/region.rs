//! Named attachment points that views publish for other views.

use crate::{document::Document, view::ViewId};
use core::fmt::{self, Debug, Formatter};
use std::{cell::RefCell, rc::Rc};
use tracing::trace;

struct Region<D: Document> {
	owner: ViewId,
	name: String,
	element: D::Element,
	selector: Option<String>,
}

/// A shared registry of regions.
///
/// A region is an element (or a selector scoped to an element) that belongs to one view.
/// Other views attach into it through [`Container::Region`](`crate::document::Container::Region`).
/// Several views may register the same name: The most recent registration wins until it is unregistered.
///
/// Clones share the same registry. Pass it to each view that takes part through [`ViewOptions::region_registry`](`crate::view::ViewOptions::region_registry`).
pub struct RegionRegistry<D: Document> {
	regions: Rc<RefCell<Vec<Region<D>>>>,
}

impl<D: Document> Clone for RegionRegistry<D> {
	fn clone(&self) -> Self {
		Self { regions: self.regions.clone() }
	}
}

impl<D: Document> Default for RegionRegistry<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Document> Debug for RegionRegistry<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_list()
			.entries(self.regions.borrow().iter().map(|region| (region.owner, &region.name, &region.selector)))
			.finish()
	}
}

impl<D: Document> RegionRegistry<D> {
	#[must_use]
	pub fn new() -> Self {
		Self { regions: Rc::default() }
	}

	pub(crate) fn register(&self, owner: ViewId, name: &str, element: D::Element, selector: Option<&str>) {
		trace!(?owner, name, ?selector, "Registering region.");
		let mut regions = self.regions.borrow_mut();
		regions.retain(|region| !(region.owner == owner && region.name == name));
		regions.push(Region {
			owner,
			name: name.to_owned(),
			element,
			selector: selector.map(str::to_owned),
		});
	}

	pub(crate) fn unregister(&self, owner: ViewId, name: &str) {
		self.regions.borrow_mut().retain(|region| !(region.owner == owner && region.name == name));
	}

	pub(crate) fn unregister_owner(&self, owner: ViewId) {
		let mut regions = self.regions.borrow_mut();
		let before = regions.len();
		regions.retain(|region| region.owner != owner);
		trace!(?owner, "Unregistered {} region(s).", before - regions.len());
	}

	/// Finds the element a view attaching into region `name` should be inserted into.
	#[must_use]
	pub fn resolve(&self, document: &D, name: &str) -> Option<D::Element> {
		let (element, selector) = {
			let regions = self.regions.borrow();
			let region = regions.iter().rev().find(|region| region.name == name)?;
			(region.element.clone(), region.selector.clone())
		};
		match selector {
			Some(selector) => document.query(&element, &selector),
			None => Some(element),
		}
	}

	#[must_use]
	pub fn contains(&self, name: &str) -> bool {
		self.regions.borrow().iter().any(|region| region.name == name)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.regions.borrow().len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
