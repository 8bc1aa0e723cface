//! An in-memory [`Document`].
//!
//! Supports a practical subset of the DOM: Elements with attributes and classes, text, markup parsing for
//! [`Document::set_inner_html`] and compound selectors (`tag`, `#id`, `.class`, `*`) joined by descendant combinators.
//!
//! Animations and deferred tasks don't advance on their own.
//! Drive them with [`MemoryDocument::finish_animations`] and [`MemoryDocument::run_deferred`].

use crate::document::Document;
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter, Write as _},
	time::Duration,
};
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{trace, warn};

/// Handle to a node of a [`MemoryDocument`]. Only meaningful with the document that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

enum NodeKind {
	Element { tag: String, attributes: Vec<(String, String)>, classes: Vec<String> },
	Text(String),
}

struct Node {
	kind: NodeKind,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
	hidden: bool,
	opacity: f64,
	fade_target: Option<f64>,
	listeners: Vec<(u64, String, Rc<dyn Fn()>)>,
}

impl Node {
	fn new(kind: NodeKind) -> Self {
		Self {
			kind,
			parent: None,
			children: Vec::new(),
			hidden: false,
			opacity: 1.0,
			fade_target: None,
			listeners: Vec::new(),
		}
	}
}

struct Tree {
	nodes: Vec<Node>,
	body: NodeId,
}

impl Tree {
	fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}

	fn node_mut(&mut self, id: NodeId) -> &mut Node {
		&mut self.nodes[id.0]
	}

	/// Ids are never reused.
	fn push(&mut self, kind: NodeKind) -> NodeId {
		self.nodes.push(Node::new(kind));
		NodeId(self.nodes.len() - 1)
	}

	fn is_element(&self, id: NodeId) -> bool {
		matches!(self.node(id).kind, NodeKind::Element { .. })
	}

	fn tag(&self, id: NodeId) -> Option<&str> {
		match &self.node(id).kind {
			NodeKind::Element { tag, .. } => Some(tag.as_str()),
			NodeKind::Text(_) => None,
		}
	}

	fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
		self.node(id).children.iter().copied().filter(move |&child| self.is_element(child))
	}

	fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
		loop {
			if node == ancestor {
				return true;
			}
			match self.node(node).parent {
				Some(parent) => node = parent,
				None => return false,
			}
		}
	}

	fn detach(&mut self, id: NodeId) {
		if let Some(parent) = self.node_mut(id).parent.take() {
			self.node_mut(parent).children.retain(|&child| child != id);
		}
	}

	/// Inserts `id` into `parent` at `index`, moving it out of its current position first.
	fn insert(&mut self, parent: NodeId, index: Option<usize>, id: NodeId) -> bool {
		if self.is_ancestor_or_self(id, parent) {
			warn!("Refusing to insert a node into itself or one of its descendants.");
			return false;
		}
		self.detach(id);
		let children = &mut self.node_mut(parent).children;
		let index = index.unwrap_or(children.len()).min(children.len());
		children.insert(index, id);
		self.node_mut(id).parent = Some(parent);
		true
	}

	fn release_listeners(&mut self, id: NodeId) {
		let mut stack = vec![id];
		while let Some(id) = stack.pop() {
			let node = self.node_mut(id);
			node.listeners.clear();
			stack.extend(node.children.iter().copied());
		}
	}

	fn clear_children(&mut self, id: NodeId) {
		for child in core::mem::take(&mut self.node_mut(id).children) {
			self.node_mut(child).parent = None;
			self.release_listeners(child);
		}
	}

	fn descendants(&self, id: NodeId) -> Vec<NodeId> {
		let mut found = Vec::new();
		let mut stack: Vec<NodeId> = self.node(id).children.iter().rev().copied().collect();
		while let Some(id) = stack.pop() {
			if self.is_element(id) {
				found.push(id);
				stack.extend(self.node(id).children.iter().rev().copied());
			}
		}
		found
	}

	fn text(&self, id: NodeId, out: &mut String) {
		match &self.node(id).kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Element { .. } => {
				for &child in &self.node(id).children {
					self.text(child, out)
				}
			}
		}
	}

	fn serialize(&self, id: NodeId, out: &mut String) {
		match &self.node(id).kind {
			NodeKind::Text(text) => out.push_str(text),
			NodeKind::Element { tag, attributes, classes } => {
				out.push('<');
				out.push_str(tag);
				for (name, value) in attributes {
					write!(out, " {}=\"{}\"", name, value).ok();
				}
				if !classes.is_empty() {
					write!(out, " class=\"{}\"", classes.join(" ")).ok();
				}
				out.push('>');
				if !is_void(tag) {
					for &child in &self.node(id).children {
						self.serialize(child, out)
					}
					write!(out, "</{}>", tag).ok();
				}
			}
		}
	}
}

struct Inner {
	tree: RefCell<Tree>,
	deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
	next_listener: Cell<u64>,
}

/// A single-threaded document tree held in memory.
///
/// Clones share the same tree.
///
/// Nodes live in an arena that only grows: Removed or replaced nodes keep their [`NodeId`] and stay readable,
/// so ids held after a removal never alias a newer node. Use one document per test or short-lived scene
/// rather than one that re-renders indefinitely.
#[derive(Clone)]
pub struct MemoryDocument {
	inner: Rc<Inner>,
}

impl Debug for MemoryDocument {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryDocument")
			.field("nodes", &self.inner.tree.borrow().nodes.len())
			.field("deferred", &self.inner.deferred.borrow().len())
			.finish()
	}
}

impl Default for MemoryDocument {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDocument {
	/// Creates a document containing only an empty `<body>`.
	#[must_use]
	pub fn new() -> Self {
		let mut tree = Tree { nodes: Vec::new(), body: NodeId(0) };
		tree.body = tree.push(NodeKind::Element {
			tag: "body".to_owned(),
			attributes: Vec::new(),
			classes: Vec::new(),
		});
		Self {
			inner: Rc::new(Inner {
				tree: RefCell::new(tree),
				deferred: RefCell::new(VecDeque::new()),
				next_listener: Cell::new(0),
			}),
		}
	}

	#[must_use]
	pub fn body(&self) -> NodeId {
		self.inner.tree.borrow().body
	}

	#[must_use]
	pub fn tag_name(&self, element: NodeId) -> Option<String> {
		self.inner.tree.borrow().tag(element).map(str::to_owned)
	}

	/// The concatenated text content of `element`'s subtree.
	#[must_use]
	pub fn text(&self, element: NodeId) -> String {
		let mut text = String::new();
		self.inner.tree.borrow().text(element, &mut text);
		text
	}

	#[must_use]
	pub fn inner_html(&self, element: NodeId) -> String {
		let tree = self.inner.tree.borrow();
		let mut html = String::new();
		for &child in &tree.node(element).children {
			tree.serialize(child, &mut html)
		}
		html
	}

	#[must_use]
	pub fn outer_html(&self, element: NodeId) -> String {
		let mut html = String::new();
		self.inner.tree.borrow().serialize(element, &mut html);
		html
	}

	#[must_use]
	pub fn opacity(&self, element: NodeId) -> f64 {
		self.inner.tree.borrow().node(element).opacity
	}

	#[must_use]
	pub fn is_animating(&self, element: NodeId) -> bool {
		self.inner.tree.borrow().node(element).fade_target.is_some()
	}

	/// Completes all running fades.
	pub fn finish_animations(&self) {
		let mut tree = self.inner.tree.borrow_mut();
		for node in &mut tree.nodes {
			if let Some(target) = node.fade_target.take() {
				node.opacity = target;
			}
		}
	}

	/// Runs deferred tasks, including ones they defer in turn, until none are left. Returns how many ran.
	pub fn run_deferred(&self) -> usize {
		let mut count = 0;
		loop {
			let task = self.inner.deferred.borrow_mut().pop_front();
			match task {
				Some(task) => {
					task();
					count += 1;
				}
				None => break count,
			}
		}
	}

	#[must_use]
	pub fn pending_deferred(&self) -> usize {
		self.inner.deferred.borrow().len()
	}

	/// Calls the `event` listeners bound directly on `element`. Returns how many were called.
	pub fn dispatch(&self, element: NodeId, event: &str) -> usize {
		let handlers: Vec<Rc<dyn Fn()>> = self
			.inner
			.tree
			.borrow()
			.node(element)
			.listeners
			.iter()
			.filter(|(_, name, _)| name == event)
			.map(|(_, _, handler)| handler.clone())
			.collect();
		for handler in &handlers {
			handler()
		}
		handlers.len()
	}

	#[must_use]
	pub fn listener_count(&self, element: NodeId) -> usize {
		self.inner.tree.borrow().node(element).listeners.len()
	}

	fn matches(tree: &Tree, id: NodeId, selector: &[Compound]) -> bool {
		let (last, rest) = match selector.split_last() {
			Some(split) => split,
			None => return false,
		};
		if !last.matches(tree, id) {
			return false;
		}
		let mut ancestor = tree.node(id).parent;
		for compound in rest.iter().rev() {
			loop {
				match ancestor {
					Some(candidate) => {
						ancestor = tree.node(candidate).parent;
						if compound.matches(tree, candidate) {
							break;
						}
					}
					None => return false,
				}
			}
		}
		true
	}
}

impl Document for MemoryDocument {
	type Element = NodeId;
	type Listener = MemoryListener;

	fn create_element(&self, tag_name: &str) -> NodeId {
		self.inner.tree.borrow_mut().push(NodeKind::Element {
			tag: tag_name.to_ascii_lowercase(),
			attributes: Vec::new(),
			classes: Vec::new(),
		})
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) {
		let mut tree = self.inner.tree.borrow_mut();
		if let NodeKind::Element { attributes, classes, .. } = &mut tree.node_mut(*element).kind {
			if name == "class" {
				*classes = value.split_whitespace().map(str::to_owned).collect();
			} else if let Some(existing) = attributes.iter_mut().find(|(n, _)| n == name) {
				existing.1 = value.to_owned();
			} else {
				attributes.push((name.to_owned(), value.to_owned()));
			}
		}
	}

	fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
		match &self.inner.tree.borrow().node(*element).kind {
			NodeKind::Element { classes, .. } if name == "class" => Some(classes.join(" ")),
			NodeKind::Element { attributes, .. } => attributes.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
			NodeKind::Text(_) => None,
		}
	}

	fn set_inner_html(&self, element: &NodeId, markup: &str) {
		let mut tree = self.inner.tree.borrow_mut();
		tree.clear_children(*element);
		parse_markup(&mut tree, *element, markup);
	}

	fn query(&self, scope: &NodeId, selector: &str) -> Option<NodeId> {
		let selector = parse_selector(selector)?;
		let tree = self.inner.tree.borrow();
		tree.descendants(*scope).into_iter().find(|&id| Self::matches(&tree, id, &selector))
	}

	fn query_document(&self, selector: &str) -> Option<NodeId> {
		let selector = parse_selector(selector)?;
		let tree = self.inner.tree.borrow();
		let body = tree.body;
		if Self::matches(&tree, body, &selector) {
			return Some(body);
		}
		tree.descendants(body).into_iter().find(|&id| Self::matches(&tree, id, &selector))
	}

	fn children(&self, parent: &NodeId, selector: Option<&str>) -> Vec<NodeId> {
		let tree = self.inner.tree.borrow();
		match selector {
			None => tree.element_children(*parent).collect(),
			Some(selector) => match parse_selector(selector) {
				Some(selector) => tree.element_children(*parent).filter(|&id| Self::matches(&tree, id, &selector)).collect(),
				None => Vec::new(),
			},
		}
	}

	fn first_child(&self, parent: &NodeId) -> Option<NodeId> {
		self.inner.tree.borrow().element_children(*parent).next()
	}

	fn last_child(&self, parent: &NodeId) -> Option<NodeId> {
		self.inner.tree.borrow().element_children(*parent).last()
	}

	fn parent(&self, element: &NodeId) -> Option<NodeId> {
		self.inner.tree.borrow().node(*element).parent
	}

	fn append(&self, parent: &NodeId, element: &NodeId) {
		trace!(?parent, ?element, "append");
		self.inner.tree.borrow_mut().insert(*parent, None, *element);
	}

	fn prepend(&self, parent: &NodeId, element: &NodeId) {
		trace!(?parent, ?element, "prepend");
		self.inner.tree.borrow_mut().insert(*parent, Some(0), *element);
	}

	fn insert_before(&self, reference: &NodeId, element: &NodeId) {
		trace!(?reference, ?element, "insert_before");
		if reference == element {
			return;
		}
		let mut tree = self.inner.tree.borrow_mut();
		let parent = match tree.node(*reference).parent {
			Some(parent) => parent,
			None => return warn!("Can't insert before a node without parent."),
		};
		// Detach first so the reference's index accounts for the move.
		tree.detach(*element);
		let index = tree.node(parent).children.iter().position(|child| child == reference);
		tree.insert(parent, index, *element);
	}

	fn insert_after(&self, reference: &NodeId, element: &NodeId) {
		trace!(?reference, ?element, "insert_after");
		if reference == element {
			return;
		}
		let mut tree = self.inner.tree.borrow_mut();
		let parent = match tree.node(*reference).parent {
			Some(parent) => parent,
			None => return warn!("Can't insert after a node without parent."),
		};
		tree.detach(*element);
		let index = tree.node(parent).children.iter().position(|child| child == reference).map(|index| index + 1);
		tree.insert(parent, index, *element);
	}

	fn replace_content(&self, parent: &NodeId, element: &NodeId) {
		let mut tree = self.inner.tree.borrow_mut();
		tree.detach(*element);
		tree.clear_children(*parent);
		tree.insert(*parent, None, *element);
	}

	fn remove(&self, element: &NodeId) {
		trace!(?element, "remove");
		let mut tree = self.inner.tree.borrow_mut();
		tree.detach(*element);
		tree.release_listeners(*element);
	}

	fn is_connected(&self, element: &NodeId) -> bool {
		let tree = self.inner.tree.borrow();
		tree.is_ancestor_or_self(tree.body, *element)
	}

	fn add_class(&self, element: &NodeId, class: &str) {
		if let NodeKind::Element { classes, .. } = &mut self.inner.tree.borrow_mut().node_mut(*element).kind {
			if !classes.iter().any(|c| c == class) {
				classes.push(class.to_owned())
			}
		}
	}

	fn remove_class(&self, element: &NodeId, class: &str) {
		if let NodeKind::Element { classes, .. } = &mut self.inner.tree.borrow_mut().node_mut(*element).kind {
			classes.retain(|c| c != class)
		}
	}

	fn has_class(&self, element: &NodeId, class: &str) -> bool {
		match &self.inner.tree.borrow().node(*element).kind {
			NodeKind::Element { classes, .. } => classes.iter().any(|c| c == class),
			NodeKind::Text(_) => false,
		}
	}

	fn set_visible(&self, element: &NodeId, visible: bool) {
		self.inner.tree.borrow_mut().node_mut(*element).hidden = !visible;
	}

	fn is_visible(&self, element: &NodeId) -> bool {
		!self.inner.tree.borrow().node(*element).hidden
	}

	fn set_opacity(&self, element: &NodeId, opacity: f64) {
		let mut tree = self.inner.tree.borrow_mut();
		let node = tree.node_mut(*element);
		node.fade_target = None;
		node.opacity = opacity;
	}

	fn fade_to(&self, element: &NodeId, opacity: f64, duration: Duration) {
		trace!(?element, opacity, ?duration, "fade_to");
		let mut tree = self.inner.tree.borrow_mut();
		let node = tree.node_mut(*element);
		if duration == Duration::from_secs(0) {
			node.fade_target = None;
			node.opacity = opacity;
		} else {
			node.fade_target = Some(opacity);
		}
	}

	fn stop_animation(&self, element: &NodeId) {
		let mut tree = self.inner.tree.borrow_mut();
		let node = tree.node_mut(*element);
		if let Some(target) = node.fade_target.take() {
			node.opacity = target;
		}
	}

	fn defer(&self, task: Box<dyn FnOnce()>) {
		self.inner.deferred.borrow_mut().push_back(task);
	}

	fn add_listener(&self, element: &NodeId, event: &str, handler: Rc<dyn Fn()>) -> MemoryListener {
		let id = self.inner.next_listener.get();
		self.inner.next_listener.set(id + 1);
		self.inner.tree.borrow_mut().node_mut(*element).listeners.push((id, event.to_owned(), handler));
		MemoryListener {
			document: Rc::downgrade(&self.inner),
			node: *element,
			id,
		}
	}
}

/// A [`MemoryDocument`] event listener registration. Unregisters on drop.
pub struct MemoryListener {
	document: Weak<Inner>,
	node: NodeId,
	id: u64,
}

impl Debug for MemoryListener {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("MemoryListener").field("node", &self.node).field("id", &self.id).finish()
	}
}

impl Drop for MemoryListener {
	fn drop(&mut self) {
		if let Some(inner) = self.document.upgrade() {
			let id = self.id;
			// Listeners can be dropped while their handler runs, so the tree may already be borrowed.
			if let Ok(mut tree) = inner.tree.try_borrow_mut() {
				tree.node_mut(self.node).listeners.retain(|(other, _, _)| *other != id);
			} else {
				warn!("Could not release a listener because the document is busy.");
			}
		}
	}
}

#[derive(Debug, Default, PartialEq)]
struct Compound {
	tag: Option<String>,
	id: Option<String>,
	classes: Vec<String>,
}

impl Compound {
	fn matches(&self, tree: &Tree, node: NodeId) -> bool {
		let (tag, attributes, classes) = match &tree.node(node).kind {
			NodeKind::Element { tag, attributes, classes } => (tag, attributes, classes),
			NodeKind::Text(_) => return false,
		};
		if let Some(expected) = &self.tag {
			if !expected.eq_ignore_ascii_case(tag) {
				return false;
			}
		}
		if let Some(expected) = &self.id {
			if !attributes.iter().any(|(name, value)| name == "id" && value == expected) {
				return false;
			}
		}
		self.classes.iter().all(|expected| classes.iter().any(|class| class == expected))
	}
}

fn is_ident_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(s: &str) -> (&str, &str) {
	let end = s.find(|c: char| !is_ident_char(c)).unwrap_or_else(|| s.len());
	s.split_at(end)
}

fn parse_selector(selector: &str) -> Option<Vec<Compound>> {
	let parsed = selector.split_whitespace().map(parse_compound).collect::<Option<Vec<_>>>();
	match parsed {
		Some(parsed) if !parsed.is_empty() => Some(parsed),
		_ => {
			warn!(selector, "Unsupported or empty selector.");
			None
		}
	}
}

fn parse_compound(mut s: &str) -> Option<Compound> {
	let mut compound = Compound::default();
	if let Some(rest) = s.strip_prefix('*') {
		s = rest;
	} else {
		let (tag, rest) = take_ident(s);
		if !tag.is_empty() {
			compound.tag = Some(tag.to_owned());
		}
		s = rest;
	}
	while !s.is_empty() {
		let (marker, rest) = s.split_at(1);
		let (name, rest) = take_ident(rest);
		if name.is_empty() {
			return None;
		}
		match marker {
			"." => compound.classes.push(name.to_owned()),
			"#" => compound.id = Some(name.to_owned()),
			_ => return None,
		}
		s = rest;
	}
	Some(compound)
}

fn is_void(tag: &str) -> bool {
	matches!(
		tag,
		"area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
	)
}

/// Lenient markup parser: unknown constructs become text, unclosed elements are closed at the end.
fn parse_markup(tree: &mut Tree, root: NodeId, markup: &str) {
	let mut open = vec![root];
	let mut rest = markup;
	while !rest.is_empty() {
		let parent = *open.last().unwrap_or(&root);
		if let Some(after) = rest.strip_prefix("<!--") {
			rest = after.find("-->").map_or("", |end| &after[end + 3..]);
		} else if let Some(after) = rest.strip_prefix("</") {
			let end = after.find('>').unwrap_or_else(|| after.len());
			let name = after[..end].trim().to_ascii_lowercase();
			if let Some(position) = open.iter().skip(1).rposition(|&id| tree.tag(id) == Some(name.as_str())) {
				open.truncate(position + 1);
			}
			rest = after.get(end + 1..).unwrap_or("");
		} else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
			let (tag, after_tag) = take_ident(&rest[1..]);
			let tag = tag.to_ascii_lowercase();
			let mut attributes = Vec::new();
			let mut classes = Vec::new();
			let mut self_closing = false;
			let mut s = after_tag;
			loop {
				s = s.trim_start();
				if s.is_empty() {
					break;
				} else if let Some(after) = s.strip_prefix("/>") {
					self_closing = true;
					s = after;
					break;
				} else if let Some(after) = s.strip_prefix('>') {
					s = after;
					break;
				}
				let name_end = s.find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/').unwrap_or_else(|| s.len());
				if name_end == 0 {
					// Stray character, such as a lone `/`.
					s = &s[s.chars().next().map_or(1, char::len_utf8)..];
					continue;
				}
				let name = s[..name_end].to_ascii_lowercase();
				s = s[name_end..].trim_start();
				let mut value = String::new();
				if let Some(after) = s.strip_prefix('=') {
					let after = after.trim_start();
					if let Some(quote) = after.chars().next().filter(|&c| c == '"' || c == '\'') {
						let body = &after[1..];
						let end = body.find(quote).unwrap_or_else(|| body.len());
						value = body[..end].to_owned();
						s = body.get(end + 1..).unwrap_or("");
					} else {
						let end = after.find(|c: char| c.is_whitespace() || c == '>').unwrap_or_else(|| after.len());
						value = after[..end].to_owned();
						s = &after[end..];
					}
				}
				if name == "class" {
					classes = value.split_whitespace().map(str::to_owned).collect();
				} else {
					attributes.push((name, value));
				}
			}
			let void = is_void(&tag);
			let element = tree.push(NodeKind::Element { tag, attributes, classes });
			tree.insert(parent, None, element);
			if !self_closing && !void {
				open.push(element);
			}
			rest = s;
		} else {
			let end = rest.char_indices().skip(1).find(|&(_, c)| c == '<').map_or(rest.len(), |(i, _)| i);
			let text = tree.push(NodeKind::Text(rest[..end].to_owned()));
			tree.insert(parent, None, text);
			rest = &rest[end..];
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selectors() {
		assert_eq!(
			parse_selector("ul.items li#first").unwrap(),
			vec![
				Compound {
					tag: Some("ul".to_owned()),
					id: None,
					classes: vec!["items".to_owned()],
				},
				Compound {
					tag: Some("li".to_owned()),
					id: Some("first".to_owned()),
					classes: Vec::new(),
				},
			]
		);
		assert_eq!(parse_selector("*.a.b").unwrap()[0].classes.len(), 2);
		assert!(parse_selector("").is_none());
		assert!(parse_selector("a > b").is_none());
		assert!(parse_selector("[href]").is_none());
	}

	#[test]
	fn markup_round_trips_through_serialization() {
		let document = MemoryDocument::new();
		let root = document.create_element("div");
		document.set_inner_html(&root, r#"<p class="lead big" id=intro>Hi <b>there</b></p><br><!-- gone --><input type='text'/>"#);
		assert_eq!(
			document.inner_html(root),
			r#"<p id="intro" class="lead big">Hi <b>there</b></p><br><input type="text">"#
		);
		assert_eq!(document.text(root), "Hi there");
	}

	#[test]
	fn removed_nodes_stay_addressable() {
		let document = MemoryDocument::new();
		let root = document.create_element("div");
		document.set_inner_html(&root, "<p>old</p>");
		let old = document.children(&root, None)[0];

		document.set_inner_html(&root, "<em>new</em>");
		let new = document.children(&root, None)[0];
		assert_ne!(old, new);
		assert_eq!(document.tag_name(old).as_deref(), Some("p"));
		assert_eq!(document.text(old), "old");

		document.remove(&new);
		assert_eq!(document.tag_name(new).as_deref(), Some("em"));
		assert!(!document.is_connected(&new));
		assert!(document.children(&root, None).is_empty());
	}

	#[test]
	fn lenient_markup() {
		let document = MemoryDocument::new();
		let root = document.create_element("div");
		document.set_inner_html(&root, "<ul><li>a<li>b</ul></span>tail < end");
		assert_eq!(document.children(&root, None).len(), 1);
		assert_eq!(document.text(root), "abtail < end");
	}
}
