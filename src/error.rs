use crate::model::Cid;

/// Broad classification of a [`ViewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// A required piece of configuration is missing. Fix the view's options.
	Configuration,
	/// Operations were called in an order the view can't support.
	InvariantViolation,
}

/// Failures of view operations.
///
/// None of these are transient: retrying the same call without changing the configuration or call order fails the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
	#[error("no item kind is configured, so no view can be created for a record")]
	MissingItemKind,
	#[error("this view requires a template but none is configured")]
	MissingTemplate,
	#[error("no item view exists for record {0}; filtering must follow rendering")]
	MissingItemView(Cid),
}

impl ViewError {
	#[must_use]
	pub fn kind(&self) -> ErrorKind {
		match self {
			ViewError::MissingItemKind | ViewError::MissingTemplate => ErrorKind::Configuration,
			ViewError::MissingItemView(_) => ErrorKind::InvariantViolation,
		}
	}
}
