use managed_views::{
	document::Document,
	memory::MemoryDocument,
	model::{Collection, Model},
	serde_json::{json, Value},
	CollectionView, CollectionViewOptions, Filterer, ItemTemplate, ViewOptions,
};
use proptest::prelude::*;
use std::{cell::Cell, rc::Rc, time::Duration};

#[derive(Debug, Clone)]
enum Step {
	Add { index: usize, keep: bool },
	Remove(usize),
	Reset { retain_even: bool, fresh: Vec<bool> },
	Filter(Option<bool>),
	Sort,
}

fn step() -> impl Strategy<Value = Step> {
	prop_oneof![
		3 => (0..8_usize, any::<bool>()).prop_map(|(index, keep)| Step::Add { index, keep }),
		2 => (0..8_usize).prop_map(Step::Remove),
		1 => (any::<bool>(), prop::collection::vec(any::<bool>(), 0..4)).prop_map(|(retain_even, fresh)| Step::Reset { retain_even, fresh }),
		2 => prop::option::of(any::<bool>()).prop_map(Step::Filter),
		1 => Just(Step::Sort),
	]
}

fn name(model: &Model) -> String {
	model.get("name").and_then(|name| name.as_str().map(str::to_owned)).unwrap_or_default()
}

fn passes(model: &Model, filter: Option<bool>) -> bool {
	filter.map_or(true, |keep| model.get("keep") == Some(json!(keep)))
}

struct Fixture {
	document: MemoryDocument,
	collection: Collection,
	view: CollectionView<MemoryDocument>,
	filter: Option<bool>,
	next: Cell<usize>,
}

impl Fixture {
	fn new() -> Self {
		let document = MemoryDocument::new();
		let collection = Collection::default();
		let view = CollectionView::new(
			document.clone(),
			collection.clone(),
			CollectionViewOptions {
				view: ViewOptions {
					auto_render: true,
					template: Some(Rc::new(|_: &Value| "<ol></ol><em></em>".to_owned())),
					..ViewOptions::default()
				},
				item_kind: Some(Rc::new(ItemTemplate::new("li", |data| data["name"].as_str().unwrap_or_default().to_owned()))),
				list_selector: Some("ol".to_owned()),
				fallback_selector: Some("em".to_owned()),
				animation_duration: Duration::from_secs(0),
				..CollectionViewOptions::default()
			},
		)
		.unwrap();
		Self {
			document,
			collection,
			view,
			filter: None,
			next: Cell::new(0),
		}
	}

	fn record(&self, keep: bool) -> Model {
		let n = self.next.get();
		self.next.set(n + 1);
		Model::new(json!({ "name": format!("r{}", n), "keep": keep }))
	}

	fn apply(&mut self, step: &Step) {
		let models = self.collection.models();
		match step {
			Step::Add { index, keep } => {
				self.collection.add_at(self.record(*keep), *index);
			}
			Step::Remove(index) => {
				if !models.is_empty() {
					self.collection.remove(&models[index % models.len()]);
				}
			}
			Step::Reset { retain_even, fresh } => {
				let mut next: Vec<Model> = if *retain_even {
					models.iter().step_by(2).cloned().collect()
				} else {
					Vec::new()
				};
				next.extend(fresh.iter().map(|keep| self.record(*keep)));
				self.collection.reset(next);
			}
			Step::Filter(filter) => {
				self.filter = *filter;
				let filterer = filter.map(|keep| -> Filterer { Rc::new(move |model: &Model, _: usize| model.get("keep") == Some(json!(keep))) });
				self.view.filter(filterer).unwrap();
			}
			Step::Sort => self.collection.sort_by(|a, b| name(b).cmp(&name(a))),
		}
	}
}

proptest! {
	#![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

	#[test]
	fn visible_items_track_the_filtered_collection(steps in prop::collection::vec(step(), 1..24)) {
		let mut fixture = Fixture::new();
		for step in &steps {
			fixture.apply(step);

			let members = fixture.collection.models();
			let mut expected: Vec<String> = members
				.iter()
				.filter(|model| fixture.view.item_view(model).is_some() && passes(model, fixture.filter))
				.map(name)
				.collect();
			expected.sort();
			let mut visible: Vec<String> = fixture.view.visible_items().iter().map(name).collect();
			visible.sort();
			prop_assert_eq!(&visible, &expected, "after {:?}", step);

			let rendered: Vec<String> = fixture
				.document
				.children(&fixture.view.list_element().unwrap(), None)
				.into_iter()
				.map(|element| fixture.document.text(element))
				.collect();
			let order: Vec<String> = members.iter().map(name).collect();
			prop_assert_eq!(&rendered, &order, "after {:?}", step);

			let fallback = fixture.view.fallback_element().unwrap();
			prop_assert_eq!(fixture.document.is_visible(&fallback), visible.is_empty(), "after {:?}", step);
		}
		fixture.view.dispose();
	}
}
