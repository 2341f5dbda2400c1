#[cfg(target_arch = "wasm32")]
mod host {
	use wasm_bindgen::prelude::*;

	#[wasm_bindgen]
	extern "C" {
		#[wasm_bindgen(js_name = queueMicrotask)]
		fn queue_microtask(closure: &JsValue);
	}

	pub fn queue<F: FnOnce() + 'static>(func: F) {
		queue_microtask(&Closure::once_into_js(func));
	}
}

#[cfg(not(target_arch = "wasm32"))]
mod host {
	use std::cell::RefCell;
	use std::collections::VecDeque;

	thread_local! {
		static TASKS: RefCell<VecDeque<Box<dyn FnOnce()>>> = RefCell::new(VecDeque::new());
	}

	pub fn queue<F: FnOnce() + 'static>(func: F) {
		TASKS.with(|t| t.borrow_mut().push_back(Box::new(func)));
	}

	/// Drain the microtask queue, including tasks queued while draining.
	pub fn run() -> usize {
		let mut count = 0;
		while let Some(task) = TASKS.with(|t| t.borrow_mut().pop_front()) {
			task();
			count += 1;
		}
		count
	}
}

pub use host::queue;

/// Yield to the microtask queue. Native hosts call this where a browser
/// would return to its event loop.
#[cfg(not(target_arch = "wasm32"))]
pub fn tick() -> usize {
	host::run()
}
