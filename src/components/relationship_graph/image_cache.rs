//! Lazily loaded node images keyed by URL.
//!
//! Each URL is absent, loading, or ready. A load is started the first time a
//! frame asks for an absent URL and resolves through one callback. Failures
//! return the URL to absent, so a later frame asking again retries it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use log::debug;

/// Completion callback handed to a loader: `Some(image)` or `None` on failure.
pub type LoadDone<I> = Box<dyn FnOnce(Option<I>)>;

/// Starts an asynchronous image fetch.
pub trait ImageLoader {
	/// Cheap-to-clone handle to a decoded image.
	type Image: Clone + 'static;

	/// Begins loading `url`. `done` must be called at most once.
	fn load(&self, url: &str, done: LoadDone<Self::Image>);
}

/// Observable state of one URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageState {
	/// Never requested, or the last load failed.
	Absent,
	/// A load is in flight.
	Loading,
	/// Decoded and drawable.
	Ready,
}

enum Slot<I> {
	Loading,
	Ready(I),
}

type Slots<I> = RefCell<HashMap<String, Slot<I>>>;

/// URL-keyed image cache owned by the renderer.
pub struct ImageCache<L: ImageLoader> {
	loader: L,
	slots: Rc<Slots<L::Image>>,
	on_ready: Rc<RefCell<Option<Box<dyn Fn()>>>>,
}

impl<L: ImageLoader> ImageCache<L> {
	/// Empty cache that fetches through `loader`.
	pub fn new(loader: L) -> Self {
		Self {
			loader,
			slots: Rc::new(RefCell::new(HashMap::new())),
			on_ready: Rc::new(RefCell::new(None)),
		}
	}

	/// Called whenever an image becomes ready, e.g. to request a repaint.
	pub fn set_on_ready(&self, callback: impl Fn() + 'static) {
		*self.on_ready.borrow_mut() = Some(Box::new(callback));
	}

	/// The decoded image if ready; otherwise starts a load if none is in flight.
	pub fn get(&self, url: &str) -> Option<L::Image> {
		{
			let mut slots = self.slots.borrow_mut();
			match slots.get(url) {
				Some(Slot::Ready(image)) => return Some(image.clone()),
				Some(Slot::Loading) => return None,
				None => {
					slots.insert(url.to_string(), Slot::Loading);
				}
			}
		}

		let slots: Weak<Slots<L::Image>> = Rc::downgrade(&self.slots);
		let on_ready = Rc::downgrade(&self.on_ready);
		let key = url.to_string();
		self.loader.load(
			url,
			Box::new(move |result| {
				let Some(slots) = slots.upgrade() else {
					return;
				};
				let ready = {
					let mut slots = slots.borrow_mut();
					if !matches!(slots.get(&key), Some(Slot::Loading)) {
						return;
					}
					match result {
						Some(image) => {
							slots.insert(key, Slot::Ready(image));
							true
						}
						None => {
							debug!("image cache: failed to load {key}");
							slots.remove(&key);
							false
						}
					}
				};
				if ready {
					if let Some(on_ready) = on_ready.upgrade() {
						if let Some(cb) = on_ready.borrow().as_ref() {
							cb();
						}
					}
				}
			}),
		);

		match self.slots.borrow().get(url) {
			Some(Slot::Ready(image)) => Some(image.clone()),
			_ => None,
		}
	}

	/// Where `url` stands, without starting a load.
	pub fn state(&self, url: &str) -> ImageState {
		match self.slots.borrow().get(url) {
			None => ImageState::Absent,
			Some(Slot::Loading) => ImageState::Loading,
			Some(Slot::Ready(_)) => ImageState::Ready,
		}
	}

	/// Drops every entry. Loads still in flight resolve into nothing.
	pub fn clear(&self) {
		self.slots.borrow_mut().clear();
	}

	/// Entries, loading or ready.
	pub fn len(&self) -> usize {
		self.slots.borrow().len()
	}

	/// No entries at all.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Loader that never produces images; frames draw placeholders.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoImages;

impl ImageLoader for NoImages {
	type Image = ();

	fn load(&self, _url: &str, done: LoadDone<()>) {
		done(None);
	}
}
