//! [`Document`] implementation on top of the browser DOM, through [`web_sys`].

use crate::document::Document;
use core::{
	fmt::{self, Debug, Formatter},
	time::Duration,
};
use std::rc::Rc;
use tracing::{error, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, UnwrapThrowExt};
use web_sys::{Element, HtmlElement};

const FADE_TARGET_ATTRIBUTE: &str = "data-fade-target";

/// Drives views in a browser document.
///
/// Animations use CSS transitions on the element's inline style.
#[derive(Clone)]
pub struct WebDocument {
	document: web_sys::Document,
}

impl Debug for WebDocument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebDocument").finish_non_exhaustive()
	}
}

impl WebDocument {
	/// The current window's document, if there is one.
	#[must_use]
	pub fn new() -> Option<Self> {
		web_sys::window()?.document().map(Self::from_document)
	}

	#[must_use]
	pub fn from_document(document: web_sys::Document) -> Self {
		Self { document }
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	#[must_use]
	pub fn body(&self) -> Option<Element> {
		self.document.body().map(Into::into)
	}

	fn with_style(element: &Element, f: impl FnOnce(&web_sys::CssStyleDeclaration)) {
		match element.dyn_ref::<HtmlElement>() {
			Some(html_element) => f(&html_element.style()),
			None => warn!("Can't style non-HTML element <{}>. Ignoring.", element.tag_name()),
		}
	}

	fn set_style(element: &Element, property: &str, value: &str) {
		Self::with_style(element, |style| {
			if let Err(error) = style.set_property(property, value) {
				error!("Failed to set style property {:?}: {:?}", property, error)
			}
		})
	}

	fn remove_style(element: &Element, property: &str) {
		Self::with_style(element, |style| {
			if let Err(error) = style.remove_property(property) {
				error!("Failed to remove style property {:?}: {:?}", property, error)
			}
		})
	}
}

/// A listener bound through [`WebDocument`]. Dropping it removes the listener from its element.
pub struct WebListener {
	target: Element,
	event: String,
	closure: Closure<dyn Fn()>,
}

impl Debug for WebListener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebListener").field("target", &self.target).field("event", &self.event).finish_non_exhaustive()
	}
}

impl Drop for WebListener {
	fn drop(&mut self) {
		if let Err(error) = self.target.remove_event_listener_with_callback(&self.event, self.closure.as_ref().unchecked_ref()) {
			error!("Failed to remove {:?} listener: {:?}", self.event, error)
		}
	}
}

impl Document for WebDocument {
	type Element = Element;
	type Listener = WebListener;

	fn create_element(&self, tag_name: &str) -> Element {
		self.document.create_element(tag_name).expect_throw("managed-views: Failed to create element.")
	}

	fn set_attribute(&self, element: &Element, name: &str, value: &str) {
		if let Err(error) = element.set_attribute(name, value) {
			error!("Failed to set attribute {:?}: {:?}", name, error)
		}
	}

	fn attribute(&self, element: &Element, name: &str) -> Option<String> {
		element.get_attribute(name)
	}

	fn set_inner_html(&self, element: &Element, markup: &str) {
		element.set_inner_html(markup)
	}

	fn query(&self, scope: &Element, selector: &str) -> Option<Element> {
		scope.query_selector(selector).unwrap_or_else(|error| {
			warn!(selector, "Invalid selector: {:?}", error);
			None
		})
	}

	fn query_document(&self, selector: &str) -> Option<Element> {
		self.document.query_selector(selector).unwrap_or_else(|error| {
			warn!(selector, "Invalid selector: {:?}", error);
			None
		})
	}

	fn children(&self, parent: &Element, selector: Option<&str>) -> Vec<Element> {
		let children = parent.children();
		(0..children.length())
			.filter_map(|i| children.item(i))
			.filter(|child| match selector {
				Some(selector) => child.matches(selector).unwrap_or_else(|error| {
					warn!(selector, "Invalid selector: {:?}", error);
					false
				}),
				None => true,
			})
			.collect()
	}

	fn first_child(&self, parent: &Element) -> Option<Element> {
		parent.first_element_child()
	}

	fn last_child(&self, parent: &Element) -> Option<Element> {
		parent.last_element_child()
	}

	fn parent(&self, element: &Element) -> Option<Element> {
		element.parent_element()
	}

	fn append(&self, parent: &Element, element: &Element) {
		if let Err(error) = parent.append_child(element) {
			error!("Failed to append element: {:?}", error)
		}
	}

	fn prepend(&self, parent: &Element, element: &Element) {
		if let Err(error) = parent.prepend_with_node_1(element) {
			error!("Failed to prepend element: {:?}", error)
		}
	}

	fn insert_before(&self, reference: &Element, element: &Element) {
		if reference == element {
			return;
		}
		if let Err(error) = reference.before_with_node_1(element) {
			error!("Failed to insert element: {:?}", error)
		}
	}

	fn insert_after(&self, reference: &Element, element: &Element) {
		if reference == element {
			return;
		}
		if let Err(error) = reference.after_with_node_1(element) {
			error!("Failed to insert element: {:?}", error)
		}
	}

	fn replace_content(&self, parent: &Element, element: &Element) {
		parent.set_inner_html("");
		self.append(parent, element)
	}

	fn remove(&self, element: &Element) {
		element.remove()
	}

	fn is_connected(&self, element: &Element) -> bool {
		element.is_connected()
	}

	fn add_class(&self, element: &Element, class: &str) {
		if let Err(error) = element.class_list().add_1(class) {
			error!("Failed to add class {:?}: {:?}", class, error)
		}
	}

	fn remove_class(&self, element: &Element, class: &str) {
		if let Err(error) = element.class_list().remove_1(class) {
			error!("Failed to remove class {:?}: {:?}", class, error)
		}
	}

	fn has_class(&self, element: &Element, class: &str) -> bool {
		element.class_list().contains(class)
	}

	fn set_visible(&self, element: &Element, visible: bool) {
		if visible {
			Self::remove_style(element, "display")
		} else {
			Self::set_style(element, "display", "none")
		}
	}

	fn is_visible(&self, element: &Element) -> bool {
		element
			.dyn_ref::<HtmlElement>()
			.and_then(|html_element| html_element.style().get_property_value("display").ok())
			.map_or(true, |display| display != "none")
	}

	fn set_opacity(&self, element: &Element, opacity: f64) {
		Self::remove_style(element, "transition");
		Self::set_style(element, "opacity", &opacity.to_string())
	}

	fn fade_to(&self, element: &Element, opacity: f64, duration: Duration) {
		if duration.as_millis() == 0 {
			return self.set_opacity(element, opacity);
		}
		trace!(?duration, opacity, "Fading.");
		self.set_attribute(element, FADE_TARGET_ATTRIBUTE, &opacity.to_string());
		// Reading layout flushes pending styles, so the transition starts from the current opacity.
		if let Some(html_element) = element.dyn_ref::<HtmlElement>() {
			let _ = html_element.offset_width();
		}
		Self::set_style(element, "transition", &format!("opacity {}ms", duration.as_millis()));
		Self::set_style(element, "opacity", &opacity.to_string())
	}

	fn stop_animation(&self, element: &Element) {
		if element.get_attribute(FADE_TARGET_ATTRIBUTE).is_some() {
			Self::remove_style(element, "transition");
			if let Err(error) = element.remove_attribute(FADE_TARGET_ATTRIBUTE) {
				error!("Failed to remove fade target: {:?}", error)
			}
		}
	}

	fn defer(&self, task: Box<dyn FnOnce()>) {
		let window = match web_sys::window() {
			Some(window) => window,
			None => return error!("No window to defer a task on. Dropping it."),
		};
		let callback = Closure::once_into_js(move || task());
		if let Err(error) = window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref::<js_sys::Function>(), 0) {
			error!("Failed to defer task: {:?}", error)
		}
	}

	fn add_listener(&self, element: &Element, event: &str, handler: Rc<dyn Fn()>) -> WebListener {
		let closure = Closure::wrap(Box::new(move || handler()) as Box<dyn Fn()>);
		if let Err(error) = element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref::<js_sys::Function>()) {
			error!("Failed to add {:?} listener: {:?}", event, error)
		}
		WebListener {
			target: element.clone(),
			event: event.to_owned(),
			closure,
		}
	}
}

