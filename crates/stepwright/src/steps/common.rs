//! Generic browser steps: navigation, waits, typing, hover, click,
//! clipboard and assertions.

use crate::driver::ClickOptions;
use crate::fixture::FixtureContext;
use crate::locator::Locator;
use crate::page::WaitState;
use crate::result::{StepwrightError, StepwrightResult};
use crate::step::{StepArgs, StepFuture, StepRegistry};

/// Install the common steps
pub fn register(registry: &mut StepRegistry<FixtureContext>) -> StepwrightResult<()> {
    registry
        // Navigation
        .given("I am on the page {string}", goto_page)?
        .given("I navigate to {string}", goto_page)?
        .given("I go to home page", go_home)?
        .when("I go back", go_back)?
        .when("I go forward", go_forward)?
        .when("I close current tab", close_tab)?
        .when("I close tab at index {int}", close_tab_at)?
        // Waits
        .when("I wait for {int} seconds", wait_seconds)?
        .when("I wait for response of API with key {string}", wait_for_api_response)?
        .when(
            "I wait for element with role {string} and name {string} to be visible",
            wait_for_role,
        )?
        .when("I wait for element with locator {string} to be visible", wait_for_locator)?
        // Typing
        .when("I type data with key {string} to input with role {string}", type_data_to_role)?
        .when("I type data with key {string} to input with locator {string}", type_data_to_locator)?
        .when("I type {string} to input with locator {string}", type_to_locator)?
        .when("I type {string} to input with role {string}", type_to_role)?
        .when("I type {string} to input with placeholder {string}", type_to_placeholder)?
        .when("I type {string} to input with role {string} at index {int}", type_to_role_at)?
        .when("I type {string} to input with locator {string} at index {int}", type_to_locator_at)?
        .when(
            "I type {string} to input with placeholder {string} at index {int}",
            type_to_placeholder_at,
        )?
        .when(
            "I fill all the inputs with placeholder {string} with values: {listOfString}",
            fill_all_by_placeholder,
        )?
        // Hover
        .when("I hover on element with label {string}", hover_label)?
        .when("I hover on element with locator {string}", hover_locator)?
        .when("I hover on element with role {string} and name {string}", hover_role)?
        // Click
        .when("I click element with locator {string}", click_locator)?
        .when("I click element with label {string}", click_label)?
        .when("I click element with role {string} and name {string}", click_role)?
        .when(
            "I click element with role {string} and name {string} at index {int}",
            click_role_at,
        )?
        .when("I click element with text {string} at index {int}", click_text_at)?
        .when("I click link {string}", click_link)?
        .when("I click button {string}", click_button)?
        .when("I click button {string} at index {int}", click_button_at)?
        .when("I click button with locator {string}", click_locator)?
        .when("I click button with locator {string} at index {int}", click_locator_at)?
        .when("I click menuitem {string}", click_menuitem)?
        // Clipboard
        .when("I copy element with label {string} to clipboard", copy_label)?
        .when("I copy element with locator {string} to clipboard", copy_locator)?
        .when("I paste from clipboard to input with label {string}", paste_label)?
        .when("I paste from clipboard to input with role {string}", paste_role)?
        .when("I paste from clipboard to input with placeholder {string}", paste_placeholder)?
        .when("I paste from clipboard to input with locator {string}", paste_locator)?
        .when(
            "I paste from clipboard to input with locator {string} at index {int}",
            paste_locator_at,
        )?
        // Assertions
        .then("I should be in page {string}", should_be_in_page)?
        .then("I expect that the title contains {string}", title_contains)?
        .then("I expect that the text contains {string} is visible", text_contains_visible)?
        .then("I expect that the text contains {string} is invisible", text_contains_hidden)?
        .then("I expect that the text {string} is visible", text_visible)?
        .then("I expect that the text {string} is invisible", text_hidden)?
        .then("I expect that the text of data with key {string} is visible", data_text_visible)?
        .then("I expect that the text of data with key {string} is invisible", data_text_hidden)?
        .then("I expect that element with locator {string} is invisible", locator_hidden)?
        .then("I expect that element with locator {string} is visible", locator_visible)?
        .then("I expect that {string} with text {string} is visible", role_text_visible)?
        .then("I expect that button with text {string} is visible", button_visible)?
        .then("I expect that the element with text {string} is invisible", element_text_hidden)?
        .then(
            "I expect that the element with role {string} and order {int} is visible",
            role_order_visible,
        )?
        .then(
            "I expect that the element with role {string} and text {string} is visible",
            role_text_visible,
        )?
        .then(
            "I expect that row number {int} in table contains these values: {listOfString}",
            table_row_contains,
        )?
        .then(
            "I expect that all rows at column {int} in table contains the same value: {string}",
            table_column_same_value,
        )?
        .then("I expect that the table contains {int} record", table_record_count)?
        .then(
            "I expect that all text in a list with role {string} equal to: {listOfString}",
            list_texts_equal,
        )?
        .then(
            "I expect that element with role {string} and name {string} is displayed {int} times",
            role_displayed_times,
        )?;
    Ok(())
}

fn required_data(ctx: &mut FixtureContext, key: &str) -> StepwrightResult<String> {
    ctx.common_data()?
        .text(key)
        .ok_or_else(|| StepwrightError::StepArgument {
            index: 0,
            message: format!("no data with key {key:?}"),
        })
}

// ===== NAVIGATION =====

fn goto_page<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let page_object = ctx.page_object(args.str(0)?)?;
        page_object.base().goto().await
    })
}

fn go_home<'a>(ctx: &'a mut FixtureContext, _: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().goto().await })
}

fn go_back<'a>(ctx: &'a mut FixtureContext, _: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().go_back().await })
}

fn go_forward<'a>(ctx: &'a mut FixtureContext, _: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().go_forward().await })
}

fn close_tab<'a>(ctx: &'a mut FixtureContext, _: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().close().await })
}

fn close_tab_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().close_by_index(args.index(0)?).await })
}

// ===== WAITS =====

fn wait_seconds<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let seconds = args.index(0)? as u64;
        ctx.base_page().wait_for_timeout(seconds * 1000).await;
        Ok(())
    })
}

fn wait_for_api_response<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let url = required_data(ctx, args.str(0)?)?;
        ctx.base_page().wait_for_response(&url, 200).await.map(|_| ())
    })
}

fn wait_for_role<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .wait_for_role_visible(args.str(0)?, Some(args.str(1)?), true)
            .await
    })
}

fn wait_for_locator<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().wait_for_locator_visible(args.str(0)?).await })
}

// ===== TYPING =====

fn type_data_to_role<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let value = required_data(ctx, args.str(0)?)?;
        ctx.base_page().fill_by_role_textbox(args.str(1)?, &value).await
    })
}

fn type_data_to_locator<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let value = ctx.data_or_literal(args.str(0)?)?;
        ctx.base_page().fill_by_locator(args.str(1)?, &value, None).await
    })
}

fn type_to_locator<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .fill_by_locator(args.str(1)?, args.str(0)?, None)
            .await
    })
}

fn type_to_role<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .fill_by_role_textbox(args.str(1)?, args.str(0)?)
            .await
    })
}

fn type_to_placeholder<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .fill_by_placeholder(args.str(1)?, args.str(0)?)
            .await
    })
}

fn type_to_role_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let locator = Locator::role_named("textbox", args.str(1)?, false).nth(args.index(2)?);
        ctx.page().fill(&locator, args.str(0)?).await
    })
}

fn type_to_locator_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .fill_by_locator(args.str(1)?, args.str(0)?, Some(args.index(2)?))
            .await
    })
}

fn type_to_placeholder_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let locator = Locator::placeholder(args.str(1)?, true).nth(args.index(2)?);
        ctx.page().fill(&locator, args.str(0)?).await
    })
}

fn fill_all_by_placeholder<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let placeholder = args.str(0)?;
        for (index, value) in args.list(1)?.iter().enumerate() {
            let locator = Locator::placeholder(placeholder, true).nth(index);
            ctx.page().fill(&locator, value).await?;
        }
        Ok(())
    })
}

// ===== HOVER =====

fn hover_label<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().hover_by_label(args.str(0)?).await })
}

fn hover_locator<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().hover_by_locator(args.str(0)?).await })
}

fn hover_role<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().hover_by_role(args.str(0)?, args.str(1)?).await })
}

// ===== CLICK =====

fn click_locator<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .click_by_locator(args.str(0)?, None, ClickOptions::default())
            .await
    })
}

fn click_locator_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .click_by_locator(args.str(0)?, Some(args.index(1)?), ClickOptions::default())
            .await
    })
}

fn click_label<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().click_by_label(args.str(0)?, false).await })
}

fn click_role<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .click_by_role(args.str(0)?, args.str(1)?, true, None)
            .await
    })
}

fn click_role_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .click_by_role(args.str(0)?, args.str(1)?, true, Some(args.index(2)?))
            .await
    })
}

fn click_text_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .click_by_text(args.str(0)?, Some(args.index(1)?))
            .await
    })
}

fn click_link<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().click_by_role("link", args.str(0)?, true, None).await })
}

fn click_button<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().click_by_role("button", args.str(0)?, true, None).await })
}

fn click_button_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .click_by_role("button", args.str(0)?, true, Some(args.index(1)?))
            .await
    })
}

fn click_menuitem<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .click_by_role("menuitem", args.str(0)?, true, None)
            .await
    })
}

// ===== CLIPBOARD =====

fn copy_label<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().copy_by_label(args.str(0)?).await })
}

fn copy_locator<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().copy_by_locator(args.str(0)?).await })
}

fn paste_label<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().paste_by_label(args.str(0)?).await })
}

fn paste_role<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().paste_by_role_textbox(args.str(0)?).await })
}

fn paste_placeholder<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().paste_by_placeholder(args.str(0)?).await })
}

fn paste_locator<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.base_page().paste_by_locator(args.str(0)?, 0).await })
}

fn paste_locator_at<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.base_page()
            .paste_by_locator(args.str(0)?, args.index(1)?)
            .await
    })
}

// ===== ASSERTIONS =====

fn should_be_in_page<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let url = ctx.page_object(args.str(0)?)?.url()?;
        ctx.page().expect_url(&url).await
    })
}

fn title_contains<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.page().expect_title_matches(args.str(0)?).await })
}

async fn expect_visible(ctx: &FixtureContext, locator: Locator, visible: bool) -> StepwrightResult<()> {
    let expect = ctx.page().expect(locator);
    if visible {
        expect.to_be_visible().await
    } else {
        expect.to_be_hidden().await
    }
}

fn text_contains_visible<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { expect_visible(ctx, Locator::text(args.str(0)?, false).first(), true).await })
}

fn text_contains_hidden<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { expect_visible(ctx, Locator::text(args.str(0)?, false).first(), false).await })
}

fn text_visible<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { expect_visible(ctx, Locator::text(args.str(0)?, true).first(), true).await })
}

fn text_hidden<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { expect_visible(ctx, Locator::text(args.str(0)?, true).first(), false).await })
}

fn data_text_visible<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let text = ctx.data_or_literal(args.str(0)?)?;
        expect_visible(ctx, Locator::text(text, true).first(), true).await
    })
}

fn data_text_hidden<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let text = ctx.data_or_literal(args.str(0)?)?;
        expect_visible(ctx, Locator::text(text, true).first(), false).await
    })
}

fn locator_visible<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { expect_visible(ctx, Locator::css(args.str(0)?).first(), true).await })
}

fn locator_hidden<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { expect_visible(ctx, Locator::css(args.str(0)?).first(), false).await })
}

fn role_text_visible<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let locator = Locator::role_named(args.str(0)?, args.str(1)?, true).first();
        expect_visible(ctx, locator, true).await
    })
}

fn button_visible<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let locator = Locator::role_named("button", args.str(0)?, true).first();
        expect_visible(ctx, locator, true).await
    })
}

fn element_text_hidden<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { expect_visible(ctx, Locator::text(args.str(0)?, true), false).await })
}

fn role_order_visible<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let locator = Locator::role(args.str(0)?).nth(args.index(1)?);
        expect_visible(ctx, locator, true).await
    })
}

async fn wait_for_table(ctx: &FixtureContext) -> StepwrightResult<()> {
    let page = ctx.page();
    page.wait_for(&Locator::css("table"), WaitState::Attached, page.timeouts().action)
        .await
}

fn table_row_contains<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        wait_for_table(ctx).await?;
        // Row 0 is the header row
        let row = Locator::css("table tr").nth(args.index(0)?);
        for value in args.list(1)? {
            ctx.page().expect(row.clone()).to_contain_text(value.clone()).await?;
        }
        Ok(())
    })
}

fn table_column_same_value<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let text = args.str(1)?;
        let page = ctx.page();
        let cells = Locator::css("table tbody tr td");
        let empty = page.count(&cells.clone().filter_has_text("No results.")).await?;
        if empty > 0 {
            tracing::info!("table is empty, nothing to compare");
            return Ok(());
        }
        let rows = page.count(&Locator::css("table tbody tr")).await?;
        let matching = page.count(&cells.filter_has_text(text)).await?;
        if rows == matching {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "expected all {rows} rows to contain {text:?}, found {matching}"
            )))
        }
    })
}

fn table_record_count<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        wait_for_table(ctx).await?;
        let total = args.index(0)?;
        let size = ctx.page().count(&Locator::css("table tr")).await?;
        if size == total + 1 {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "expected {total} records plus a header row, found {size} rows"
            )))
        }
    })
}

fn list_texts_equal<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        ctx.page()
            .expect(Locator::role(args.str(0)?))
            .to_have_texts(args.list(1)?)
            .await
    })
}

fn role_displayed_times<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let (role, name) = (args.str(0)?, args.str(1)?);
        for index in 0..args.index(2)? {
            ctx.base_page()
                .wait_for_role_with_index_visible(role, Some(name), index)
                .await?;
        }
        Ok(())
    })
}
