//! In-memory browser for tests.
//!
//! [`MockDriver`] implements [`crate::driver::Driver`] over a small element
//! tree ([`MockDocument`]). Application behaviour (a todo list appending an
//! item when Enter is pressed, say) is scripted with a [`MockHandler`].
//!
//! ```rust,ignore
//! let driver = MockDriver::new().with_handler(|doc, id, event| {
//!     if *event == MockEvent::Click {
//!         doc.get_mut(id).map(|e| e.add_class("active"));
//!     }
//! });
//! ```

pub mod dom;
pub mod driver;
pub mod todomvc;

pub use dom::{CssSelector, ElementId, MockDocument, MockElement};
pub use driver::{MockDriver, MockEvent, MockHandler};
pub use todomvc::{todomvc_document, todomvc_handler};
