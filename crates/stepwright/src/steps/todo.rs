//! TodoMVC steps.

use crate::fixture::FixtureContext;
use crate::page_object::PageObject;
use crate::result::{StepwrightError, StepwrightResult};
use crate::step::{StepArgs, StepFuture, StepRegistry};

pub fn register(registry: &mut StepRegistry<FixtureContext>) -> StepwrightResult<()> {
    registry
        .given("I am on the Todo page", open_todo_page)?
        .when("I add a todo {string}", add_todo)?
        .when("I add the todos {listOfString}", add_todos)?
        .when("I complete the todo at index {int}", complete_todo)?
        .then("I should see {string} in the list", should_see_todo)?
        .then("I should see {int} todo(s) in the list", should_see_count)?
        .then("the todo at index {int} should be marked as completed", todo_completed)?;
    Ok(())
}

fn open_todo_page<'a>(ctx: &'a mut FixtureContext, _: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.todo_page().base().goto().await })
}

fn add_todo<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.todo_page().add_todo(args.str(0)?).await })
}

fn add_todos<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        for item in args.list(0)? {
            ctx.todo_page().add_todo(item).await?;
        }
        Ok(())
    })
}

fn complete_todo<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.todo_page().complete_todo(args.index(0)?).await })
}

fn should_see_todo<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let item = args.str(0)?;
        let todos = ctx.todo_page().get_todos().await?;
        if todos.iter().any(|t| t == item) {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "expected {item:?} in the list, found {todos:?}"
            )))
        }
    })
}

fn should_see_count<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let expected = args.index(0)?;
        let todos = ctx.todo_page().get_todos().await?;
        if todos.len() == expected {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "expected {expected} todos, found {}",
                todos.len()
            )))
        }
    })
}

fn todo_completed<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let item = ctx.todo_page().todo_item(args.index(0)?);
        ctx.page().expect(item).to_have_class("completed").await
    })
}
