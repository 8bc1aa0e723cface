//! Synchronous event emission with RAII listener registrations.

use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter},
};
use std::rc::{Rc, Weak};
use tracing::trace;

type Handler<E> = Rc<dyn Fn(&E)>;
type Listeners<E> = RefCell<Vec<(u64, Handler<E>)>>;

/// A single-threaded list of event listeners.
///
/// Emission is synchronous and runs listeners in registration order.
/// Listeners may register or cancel listeners (including themselves) while an event is being emitted:
/// A listener cancelled during emission is not called for the rest of it,
/// and a listener registered during emission first receives the *next* event.
pub struct Emitter<E> {
	listeners: Rc<Listeners<E>>,
	next_id: Cell<u64>,
}

impl<E: 'static> Default for Emitter<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E: 'static> Debug for Emitter<E> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Emitter").field("listener_count", &self.listener_count()).finish()
	}
}

impl<E: 'static> Emitter<E> {
	#[must_use]
	pub fn new() -> Self {
		Self {
			listeners: Rc::new(RefCell::new(Vec::new())),
			next_id: Cell::new(0),
		}
	}

	/// Registers `handler` until the returned [`Subscription`] is cancelled or dropped.
	#[must_use = "dropping the `Subscription` immediately unregisters the handler"]
	pub fn on(&self, handler: impl Fn(&E) + 'static) -> Subscription {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.listeners.borrow_mut().push((id, Rc::new(handler)));

		let listeners: Weak<Listeners<E>> = Rc::downgrade(&self.listeners);
		Subscription::new(move || {
			if let Some(listeners) = listeners.upgrade() {
				// The handler is dropped outside the borrow. Its captures may call back into this emitter.
				let removed = {
					let mut listeners = listeners.borrow_mut();
					let index = listeners.iter().position(|(other, _)| *other == id);
					index.map(|index| listeners.remove(index))
				};
				drop(removed);
			}
		})
	}

	pub fn emit(&self, event: &E) {
		let snapshot: Vec<(u64, Handler<E>)> = self.listeners.borrow().iter().map(|(id, handler)| (*id, handler.clone())).collect();
		for (id, handler) in snapshot {
			let still_registered = self.listeners.borrow().iter().any(|(other, _)| *other == id);
			if still_registered {
				handler(event)
			}
		}
	}

	/// Unregisters all listeners. Outstanding [`Subscription`]s become inert.
	pub fn clear(&self) {
		let removed = core::mem::take(&mut *self.listeners.borrow_mut());
		trace!("Cleared {} listener(s).", removed.len());
	}

	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.listeners.borrow().len()
	}
}

/// A listener registration. Dropping it unregisters the listener.
#[must_use = "dropping a `Subscription` unregisters its listener"]
pub struct Subscription {
	cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
	pub(crate) fn new(cancel: impl FnOnce() + 'static) -> Self {
		Self { cancel: Some(Box::new(cancel)) }
	}

	/// Unregisters the listener now.
	pub fn cancel(mut self) {
		self.run_cancel()
	}

	/// Keeps the listener registered for as long as its emitter exists.
	pub fn forget(mut self) {
		self.cancel = None;
	}

	fn run_cancel(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel()
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.run_cancel()
	}
}

impl Debug for Subscription {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn dropping_a_subscription_unregisters() {
		let emitter = Emitter::<u32>::new();
		let seen = Rc::new(Cell::new(0));
		let subscription = emitter.on({
			let seen = seen.clone();
			move |value| seen.set(seen.get() + value)
		});
		emitter.emit(&2);
		drop(subscription);
		emitter.emit(&3);
		assert_eq!(seen.get(), 2);
		assert_eq!(emitter.listener_count(), 0);
	}

	#[test]
	fn listener_cancelled_mid_emission_is_skipped() {
		let emitter = Rc::new(Emitter::<()>::new());
		let second_calls = Rc::new(Cell::new(0));
		let second: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

		emitter
			.on({
				let second = second.clone();
				move |_| drop(second.borrow_mut().take())
			})
			.forget();
		*second.borrow_mut() = Some(emitter.on({
			let second_calls = second_calls.clone();
			move |_| second_calls.set(second_calls.get() + 1)
		}));

		emitter.emit(&());
		assert_eq!(second_calls.get(), 0);
	}

	#[test]
	fn clear_makes_subscriptions_inert() {
		let emitter = Emitter::<()>::new();
		let subscription = emitter.on(|_| panic!("cleared listener called"));
		emitter.clear();
		emitter.emit(&());
		subscription.cancel();
	}
}
