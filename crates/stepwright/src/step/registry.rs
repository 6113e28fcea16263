//! Step registry and dispatch.
//!
//! Definitions are kept in registration order. Registration rejects an
//! expression that is already registered; dispatch requires exactly one
//! expression to match the step text, failing with
//! [`StepwrightError::AmbiguousStep`] or [`StepwrightError::UndefinedStep`]
//! otherwise. The Given/When/Then keyword does not restrict matching.

use super::args::StepArgs;
use super::expression::StepExpression;
use crate::result::{StepwrightError, StepwrightResult};
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Future returned by a step handler
pub type StepFuture<'a> = BoxFuture<'a, StepwrightResult<()>>;

/// Type-erased step handler
pub type StepHandler<W> = Arc<dyn for<'a> Fn(&'a mut W, StepArgs) -> StepFuture<'a> + Send + Sync>;

/// Keyword a definition was registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Given,
    When,
    Then,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
        })
    }
}

/// One registered step
pub struct StepDefinition<W> {
    kind: StepKind,
    expression: StepExpression,
    handler: StepHandler<W>,
}

impl<W> fmt::Debug for StepDefinition<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("kind", &self.kind)
            .field("expression", &self.expression.source())
            .finish_non_exhaustive()
    }
}

impl<W> StepDefinition<W> {
    #[must_use]
    pub const fn kind(&self) -> StepKind {
        self.kind
    }

    #[must_use]
    pub const fn expression(&self) -> &StepExpression {
        &self.expression
    }
}

/// A step resolved against the registry
pub struct MatchedStep<W> {
    /// Expression source of the winning definition
    pub expression: String,
    /// Converted arguments
    pub args: StepArgs,
    handler: StepHandler<W>,
}

impl<W> fmt::Debug for MatchedStep<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchedStep")
            .field("expression", &self.expression)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

impl<W> MatchedStep<W> {
    /// Run the handler
    pub async fn run(self, world: &mut W) -> StepwrightResult<()> {
        (self.handler)(world, self.args).await
    }
}

/// Registry of step definitions for world type `W`
pub struct StepRegistry<W> {
    definitions: Vec<StepDefinition<W>>,
}

impl<W> Default for StepRegistry<W> {
    fn default() -> Self {
        Self {
            definitions: Vec::new(),
        }
    }
}

impl<W> fmt::Debug for StepRegistry<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("definitions", &self.definitions.len())
            .finish()
    }
}

impl<W> StepRegistry<W> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition
    pub fn register<F>(&mut self, kind: StepKind, expression: &str, handler: F) -> StepwrightResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut W, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        if self.definitions.iter().any(|d| d.expression.source() == expression) {
            return Err(StepwrightError::DuplicateStep {
                pattern: expression.to_string(),
            });
        }
        let expression = StepExpression::parse(expression)?;
        tracing::trace!(%kind, %expression, "registered step");
        self.definitions.push(StepDefinition {
            kind,
            expression,
            handler: Arc::new(handler),
        });
        Ok(self)
    }

    /// Register a `Given` definition
    pub fn given<F>(&mut self, expression: &str, handler: F) -> StepwrightResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut W, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.register(StepKind::Given, expression, handler)
    }

    /// Register a `When` definition
    pub fn when<F>(&mut self, expression: &str, handler: F) -> StepwrightResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut W, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.register(StepKind::When, expression, handler)
    }

    /// Register a `Then` definition
    pub fn then<F>(&mut self, expression: &str, handler: F) -> StepwrightResult<&mut Self>
    where
        F: for<'a> Fn(&'a mut W, StepArgs) -> StepFuture<'a> + Send + Sync + 'static,
    {
        self.register(StepKind::Then, expression, handler)
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &StepDefinition<W>> {
        self.definitions.iter()
    }

    /// Resolve step text to exactly one definition
    pub fn find(&self, text: &str) -> StepwrightResult<MatchedStep<W>> {
        let text = text.trim();
        let candidates: Vec<&StepDefinition<W>> = self
            .definitions
            .iter()
            .filter(|d| d.expression.is_match(text))
            .collect();

        match candidates.as_slice() {
            [] => Err(StepwrightError::UndefinedStep {
                text: text.to_string(),
            }),
            [definition] => {
                let args = definition
                    .expression
                    .match_text(text)?
                    .unwrap_or_default();
                Ok(MatchedStep {
                    expression: definition.expression.source().to_string(),
                    args,
                    handler: definition.handler.clone(),
                })
            }
            many => Err(StepwrightError::AmbiguousStep {
                text: text.to_string(),
                patterns: many
                    .iter()
                    .map(|d| d.expression.source().to_string())
                    .collect(),
            }),
        }
    }

    /// Resolve and run one step
    pub async fn execute(&self, world: &mut W, text: &str) -> StepwrightResult<()> {
        let matched = self.find(text)?;
        tracing::debug!(step = text, expression = %matched.expression, "running step");
        matched.run(world).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct World {
        log: Vec<String>,
    }

    fn record<'a>(world: &'a mut World, args: StepArgs) -> StepFuture<'a> {
        Box::pin(async move {
            world.log.push(format!("{args:?}"));
            Ok(())
        })
    }

    fn fail<'a>(_: &'a mut World, _: StepArgs) -> StepFuture<'a> {
        Box::pin(async { Err(StepwrightError::assertion("boom")) })
    }

    mod registration_tests {
        use super::*;

        #[test]
        fn test_duplicate_rejected() {
            let mut registry = StepRegistry::<World>::new();
            registry.then("I should be in page {string}", record).unwrap();
            let err = registry.given("I should be in page {string}", record).unwrap_err();
            assert!(matches!(err, StepwrightError::DuplicateStep { .. }));
            assert_eq!(registry.len(), 1);
        }

        #[test]
        fn test_invalid_expression_rejected() {
            let mut registry = StepRegistry::<World>::new();
            assert!(registry.when("I {dance}", record).is_err());
            assert!(registry.is_empty());
        }

        #[test]
        fn test_registration_order_kept() {
            let mut registry = StepRegistry::<World>::new();
            registry
                .given("a", record)
                .unwrap()
                .when("b", record)
                .unwrap()
                .then("c", record)
                .unwrap();
            let listed: Vec<(StepKind, &str)> = registry
                .definitions()
                .map(|d| (d.kind(), d.expression().source()))
                .collect();
            assert_eq!(
                listed,
                vec![(StepKind::Given, "a"), (StepKind::When, "b"), (StepKind::Then, "c")]
            );
        }
    }

    mod dispatch_tests {
        use super::*;

        #[tokio::test]
        async fn test_single_match_runs_with_args() {
            let mut registry = StepRegistry::<World>::new();
            registry.when("I click button {string} at index {int}", record).unwrap();
            registry.when("I click button {string}", record).unwrap();
            let mut world = World::default();
            registry
                .execute(&mut world, "I click button \"Save\" at index 1")
                .await
                .unwrap();
            assert_eq!(world.log.len(), 1);
            assert!(world.log[0].contains("Save"));
            assert!(world.log[0].contains("Int(1)"));
        }

        #[tokio::test]
        async fn test_undefined() {
            let registry = StepRegistry::<World>::new();
            let err = registry.execute(&mut World::default(), "I fly").await.unwrap_err();
            assert!(matches!(err, StepwrightError::UndefinedStep { ref text } if text == "I fly"));
        }

        #[tokio::test]
        async fn test_ambiguous_names_every_candidate() {
            let mut registry = StepRegistry::<World>::new();
            registry.when("I see {string}", record).unwrap();
            registry.when("I see {}", record).unwrap();
            registry.when("I hear {}", record).unwrap();
            let mut world = World::default();
            let err = registry.execute(&mut world, "I see \"x\"").await.unwrap_err();
            match err {
                StepwrightError::AmbiguousStep { patterns, .. } => {
                    assert_eq!(patterns, vec!["I see {string}", "I see {}"]);
                }
                other => panic!("unexpected {other}"),
            }
            assert!(world.log.is_empty());
        }

        #[tokio::test]
        async fn test_handler_error_propagates() {
            let mut registry = StepRegistry::<World>::new();
            registry.then("it fails", fail).unwrap();
            let err = registry.execute(&mut World::default(), "it fails").await.unwrap_err();
            assert_eq!(err.to_string(), StepwrightError::assertion("boom").to_string());
        }

        #[test]
        fn test_text_is_trimmed() {
            let mut registry = StepRegistry::<World>::new();
            registry.given("I go back", record).unwrap();
            assert_eq!(registry.find("  I go back ").unwrap().expression, "I go back");
        }
    }
}
