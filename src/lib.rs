#![doc(html_root_url = "https://docs.rs/managed-views/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Managed views for document trees.
//!
//! A [`ManagedView`](`view::ManagedView`) owns one element, renders a template into it, attaches it to a container
//! and keeps a registry of subviews that is torn down with it.
//! A [`CollectionView`](`collection_view::CollectionView`) additionally keeps one item view per member of an observable
//! [`Collection`](`model::Collection`), in order, with filtering, animations and fallback/loading indicators.
//!
//! Views talk to their document only through the [`Document`](`document::Document`) trait:
//! [`MemoryDocument`](`memory::MemoryDocument`) is a native in-memory tree, [`WebDocument`](`web::WebDocument`) drives the browser DOM.

pub use serde_json;

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod collection_view;
pub mod document;
pub mod error;
pub mod events;
pub mod memory;
pub mod model;
pub mod region;
pub mod view;
pub mod web;

pub use collection_view::{CollectionView, CollectionViewOptions, FilterCallback, Filterer, ItemKind, ItemTemplate};
pub use document::{Container, ContainerMethod, Document};
pub use error::{ErrorKind, ViewError};
pub use view::{ManagedView, SubviewKey, View, ViewEvent, ViewOptions};
