//! Page objects for the applications under test.

pub mod todo;

pub use todo::{TodoPage, TodoTestData};
