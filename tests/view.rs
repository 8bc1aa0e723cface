use managed_views::{
	document::Document,
	memory::{MemoryDocument, NodeId},
	model::{Collection, Model},
	region::RegionRegistry,
	serde_json::{json, Value},
	Container, ContainerMethod, ErrorKind, ManagedView, SubviewKey, View, ViewError, ViewEvent, ViewOptions,
};
use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

fn plain(document: &MemoryDocument) -> ManagedView<MemoryDocument> {
	ManagedView::new(document.clone(), ViewOptions::default()).unwrap()
}

fn host(document: &MemoryDocument) -> NodeId {
	let host = document.create_element("section");
	document.set_attribute(&host, "id", "host");
	document.append(&document.body(), &host);
	let existing = document.create_element("p");
	document.append(&host, &existing);
	host
}

fn attached(document: &MemoryDocument, container: Container<MemoryDocument>, container_method: ContainerMethod<MemoryDocument>) -> ManagedView<MemoryDocument> {
	ManagedView::new(
		document.clone(),
		ViewOptions {
			auto_render: true,
			container: Some(container),
			container_method,
			..ViewOptions::default()
		},
	)
	.unwrap()
}

#[test]
fn registering_under_a_taken_key_disposes_the_previous_subview() {
	let document = MemoryDocument::new();
	let parent = plain(&document);
	let first = Rc::new(plain(&document));
	let second = Rc::new(plain(&document));

	parent.set_subview("sidebar", first.clone());
	parent.set_subview("sidebar", second.clone());

	assert!(first.is_disposed());
	assert!(!second.is_disposed());
	assert_eq!(parent.subview_count(), 1);
	assert!(parent.subview("sidebar").unwrap().managed().ptr_eq(&second));
}

#[test]
fn registering_the_same_view_twice_changes_nothing() {
	let document = MemoryDocument::new();
	let parent = plain(&document);
	let child = Rc::new(plain(&document));

	parent.set_subview("child", child.clone());
	parent.set_subview("child", child.clone());

	assert!(!child.is_disposed());
	assert_eq!(parent.subview_count(), 1);
	assert_eq!(parent.subview_keys(), vec![SubviewKey::from("child")]);
}

#[test]
fn removing_subviews_by_name_or_view_is_idempotent() {
	let document = MemoryDocument::new();
	let parent = plain(&document);
	let a = Rc::new(plain(&document));
	let b = Rc::new(plain(&document));
	parent.set_subview("a", a.clone());
	parent.set_subview("b", b.clone());

	parent.remove_subview("a");
	assert!(a.is_disposed());
	assert_eq!(parent.subview_count(), 1);

	parent.remove_subview("a");
	parent.remove_subview("unknown");
	assert_eq!(parent.subview_count(), 1);

	parent.remove_subview(&*b);
	assert!(b.is_disposed());
	assert_eq!(parent.subview_count(), 0);

	let stranger = plain(&document);
	parent.remove_subview(&stranger);
	assert!(!stranger.is_disposed());
}

#[test]
fn disposal_cascades_and_is_terminal() {
	let document = MemoryDocument::new();
	let parent = attached(&document, Container::Element(document.body()), ContainerMethod::Append);
	let child = Rc::new(plain(&document));
	parent.set_subview("child", child.clone());
	assert_eq!(document.inner_html(document.body()), "<div></div>");

	let events = Rc::new(Cell::new(0));
	let _subscription = parent.on({
		let events = events.clone();
		move |_| events.set(events.get() + 1)
	});

	parent.dispose();
	assert!(parent.is_disposed());
	assert!(child.is_disposed());
	assert_eq!(parent.element(), None);
	assert_eq!(parent.subview_count(), 0);
	assert_eq!(document.inner_html(document.body()), "");

	parent.trigger(&ViewEvent::AddedToDom);
	assert_eq!(events.get(), 0);

	parent.dispose();
	assert!(parent.render().unwrap().is_none());
	parent.attach();
	assert_eq!(document.inner_html(document.body()), "");

	let late = Rc::new(plain(&document));
	parent.set_subview("late", late.clone());
	assert_eq!(parent.subview_count(), 0);
	assert!(late.is_disposed());
}

struct OnDrop(Option<Box<dyn FnOnce()>>);

impl Drop for OnDrop {
	fn drop(&mut self) {
		if let Some(f) = self.0.take() {
			f()
		}
	}
}

#[test]
fn teardown_sees_a_disposed_view() {
	let document = MemoryDocument::new();
	let view = attached(&document, Container::Element(document.body()), ContainerMethod::Append);
	let child = Rc::new(plain(&document));
	view.set_subview("child", child.clone());

	let seen_disposed = Rc::new(Cell::new(None));
	let events = Rc::new(Cell::new(0));
	let _events_subscription = view.on({
		let events = events.clone();
		move |_| events.set(events.get() + 1)
	});
	let guard = OnDrop(Some(Box::new({
		let view = view.clone();
		let seen_disposed = seen_disposed.clone();
		move || {
			seen_disposed.set(Some(view.is_disposed()));
			view.trigger(&ViewEvent::AddedToDom);
			view.dispose();
		}
	})));
	let model = Model::new(json!({}));
	view.listen_to(model.on(move |_| {
		let _ = &guard;
	}));

	view.dispose();

	assert_eq!(seen_disposed.get(), Some(true));
	assert_eq!(events.get(), 0);
	assert!(child.is_disposed());
	assert_eq!(view.subview_count(), 0);
	assert_eq!(document.inner_html(document.body()), "");
}

#[test]
fn disposing_the_model_disposes_the_view() {
	let document = MemoryDocument::new();
	let model = Model::new(json!({ "name": "Ada" }));
	let view = ManagedView::new(
		document,
		ViewOptions {
			model: Some(model.clone()),
			..ViewOptions::default()
		},
	)
	.unwrap();

	model.dispose();
	assert!(view.is_disposed());
	assert_eq!(view.model(), None);
}

#[test]
fn disposing_the_collection_disposes_the_view() {
	let document = MemoryDocument::new();
	let collection = Collection::default();
	let view = ManagedView::new(
		document,
		ViewOptions {
			collection: Some(collection.clone()),
			..ViewOptions::default()
		},
	)
	.unwrap();

	collection.dispose();
	assert!(view.is_disposed());
}

#[test]
fn templates_render_model_attributes_and_sync_state() {
	let document = MemoryDocument::new();
	let model = Model::syncable(json!({ "name": "Ada" }));
	let view = ManagedView::new(
		document.clone(),
		ViewOptions {
			model: Some(model.clone()),
			template: Some(Rc::new(|data: &Value| format!("<b>{}</b> {}", data["name"].as_str().unwrap(), data["synced"]))),
			..ViewOptions::default()
		},
	)
	.unwrap();

	view.render().unwrap();
	assert_eq!(document.inner_html(view.element().unwrap()), "<b>Ada</b> false");

	assert!(model.begin_sync());
	assert!(model.finish_sync());
	model.set("name", json!("Grace"));
	view.render().unwrap();
	assert_eq!(document.inner_html(view.element().unwrap()), "<b>Grace</b> true");
}

#[test]
fn collection_template_data() {
	let document = MemoryDocument::new();
	let collection = Collection::new(vec![Model::new(json!({ "n": 1 })), Model::new(json!({ "n": 2 }))]);
	let view = ManagedView::new(
		document,
		ViewOptions {
			collection: Some(collection),
			..ViewOptions::default()
		},
	)
	.unwrap();

	assert_eq!(view.template_data(), json!({ "length": 2, "items": [{ "n": 1 }, { "n": 2 }] }));
}

#[test]
fn custom_template_data_replaces_the_default() {
	let document = MemoryDocument::new();
	let view = ManagedView::new(
		document.clone(),
		ViewOptions {
			model: Some(Model::new(json!({ "secret": "hidden" }))),
			template_data: Some(Rc::new(|view: &ManagedView<MemoryDocument>| json!({ "id": view.id().to_string() }))),
			template: Some(Rc::new(|data: &Value| data["secret"].to_string())),
			..ViewOptions::default()
		},
	)
	.unwrap();

	assert_eq!(view.template_data()["id"], json!(view.id().to_string()));
	view.render().unwrap();
	assert_eq!(document.text(view.element().unwrap()), "null");
}

#[test]
fn a_required_template_must_be_configured() {
	let document = MemoryDocument::new();
	let options = || ViewOptions {
		template_required: true,
		..ViewOptions::default()
	};

	let view = ManagedView::new(document.clone(), options()).unwrap();
	let error = view.render().unwrap_err();
	assert_eq!(error, ViewError::MissingTemplate);
	assert_eq!(error.kind(), ErrorKind::Configuration);

	assert_eq!(
		ManagedView::new(document, ViewOptions { auto_render: true, ..options() }).unwrap_err(),
		ViewError::MissingTemplate
	);
}

#[test]
fn attach_appends_by_default() {
	let document = MemoryDocument::new();
	let host = host(&document);
	attached(&document, Container::Selector("#host".to_owned()), ContainerMethod::Append);
	assert_eq!(document.inner_html(host), "<p></p><div></div>");
}

#[test]
fn attach_prepends() {
	let document = MemoryDocument::new();
	let host = host(&document);
	attached(&document, Container::Element(host), ContainerMethod::Prepend);
	assert_eq!(document.inner_html(host), "<div></div><p></p>");
}

#[test]
fn attach_replaces_content() {
	let document = MemoryDocument::new();
	let host = host(&document);
	attached(&document, Container::Element(host), ContainerMethod::Html);
	assert_eq!(document.inner_html(host), "<div></div>");
}

#[test]
fn attach_before_and_after() {
	let document = MemoryDocument::new();
	let host = host(&document);
	attached(&document, Container::Element(host), ContainerMethod::Before);
	attached(&document, Container::Element(host), ContainerMethod::After);
	assert_eq!(document.inner_html(document.body()), "<div></div><section id=\"host\"><p></p></section><div></div>");
}

#[test]
fn attach_with_a_custom_method_and_resolver() {
	let document = MemoryDocument::new();
	let host = host(&document);
	attached(
		&document,
		Container::Resolver(Rc::new(|document: &MemoryDocument| document.query_document("section p"))),
		ContainerMethod::Custom(Rc::new(|document: &MemoryDocument, container: &NodeId, element: &NodeId| document.append(container, element))),
	);
	assert_eq!(document.inner_html(host), "<p><div></div></p>");
}

#[test]
fn attaching_emits_added_to_dom_once() {
	let document = MemoryDocument::new();
	let view = ManagedView::new(
		document.clone(),
		ViewOptions {
			container: Some(Container::Element(document.body())),
			..ViewOptions::default()
		},
	)
	.unwrap();
	let events = Rc::new(RefCell::new(Vec::new()));
	let _subscription = view.on({
		let events = events.clone();
		move |event| events.borrow_mut().push(event.clone())
	});

	view.render().unwrap();
	view.render().unwrap();
	view.attach();

	assert_eq!(*events.borrow(), vec![ViewEvent::AddedToDom]);
}

#[test]
fn auto_attach_can_be_disabled() {
	let document = MemoryDocument::new();
	let view = ManagedView::new(
		document.clone(),
		ViewOptions {
			auto_render: true,
			auto_attach: false,
			container: Some(Container::Element(document.body())),
			..ViewOptions::default()
		},
	)
	.unwrap();
	assert_eq!(document.inner_html(document.body()), "");

	view.attach();
	assert_eq!(document.inner_html(document.body()), "<div></div>");
}

#[test]
fn a_missing_container_is_not_fatal() {
	let document = MemoryDocument::new();
	let view = attached(&document, Container::Selector("#nowhere".to_owned()), ContainerMethod::Append);
	assert!(!view.is_disposed());
	assert!(!document.is_connected(&view.element().unwrap()));
}

#[test]
fn views_attach_into_regions_of_other_views() {
	let document = MemoryDocument::new();
	let registry = RegionRegistry::new();
	let layout = ManagedView::new(
		document.clone(),
		ViewOptions {
			auto_render: true,
			container: Some(Container::Element(document.body())),
			template: Some(Rc::new(|_: &Value| "<main class=\"content\"></main>".to_owned())),
			regions: vec![("main".to_owned(), "main.content".to_owned())],
			region_registry: Some(registry.clone()),
			..ViewOptions::default()
		},
	)
	.unwrap();
	assert!(registry.contains("main"));

	ManagedView::new(
		document.clone(),
		ViewOptions {
			auto_render: true,
			tag_name: "article".to_owned(),
			container: Some(Container::Region("main".to_owned())),
			region_registry: Some(registry.clone()),
			..ViewOptions::default()
		},
	)
	.unwrap();
	assert_eq!(document.inner_html(document.body()), "<div><main class=\"content\"><article></article></main></div>");

	layout.dispose();
	assert!(!registry.contains("main"));
	assert!(registry.is_empty());
}

#[test]
fn element_listeners_are_released_on_disposal() {
	let document = MemoryDocument::new();
	let view = plain(&document);
	let clicks = Rc::new(Cell::new(0));
	view.listen_dom("click", {
		let clicks = clicks.clone();
		move || clicks.set(clicks.get() + 1)
	});
	let element = view.element().unwrap();

	assert_eq!(document.dispatch(element, "click"), 1);
	assert_eq!(clicks.get(), 1);

	view.dispose();
	assert_eq!(document.listener_count(element), 0);
	assert_eq!(document.dispatch(element, "click"), 0);
	assert_eq!(clicks.get(), 1);
}
