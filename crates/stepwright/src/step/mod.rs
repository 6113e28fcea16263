//! Step definitions: expressions, typed arguments and the registry.
//!
//! ```rust,ignore
//! fn go_back<'a>(ctx: &'a mut FixtureContext, _: StepArgs) -> StepFuture<'a> {
//!     Box::pin(async move { ctx.base_page().go_back().await })
//! }
//!
//! let mut registry = StepRegistry::new();
//! registry.when("I go back", go_back)?;
//! ```

pub mod args;
pub mod expression;
pub mod registry;

pub use args::{StepArg, StepArgs};
pub use expression::{ParameterType, StepExpression};
pub use registry::{MatchedStep, StepDefinition, StepFuture, StepHandler, StepKind, StepRegistry};
