//! REST API steps.
//!
//! Requests go through the scenario's [`ApiFixture`](crate::fixture::ApiFixture)
//! and the last response is kept for the assertion steps. A status assertion
//! against a rate-limited (429) response skips the scenario instead of failing
//! it, unless 429 is the status being asserted.

use crate::api::{skip_if_rate_limited, ApiClient, ApiResponse, ApiValidator};
use crate::fixture::FixtureContext;
use crate::result::{StepwrightError, StepwrightResult};
use crate::step::{StepArgs, StepFuture, StepRegistry};
use reqwest::Method;
use serde_json::Value;

pub fn register(registry: &mut StepRegistry<FixtureContext>) -> StepwrightResult<()> {
    registry
        .given("the API base URL is {string}", set_base_url)?
        .given("I set the API header {string} to {string}", set_header)?
        .when("I send a GET request to {string}", send_get)?
        .when("I send a DELETE request to {string}", send_delete)?
        .when("I send a POST request to {string} with body {string}", send_post)?
        .when("I send a PUT request to {string} with body {string}", send_put)?
        .when("I send a PATCH request to {string} with body {string}", send_patch)?
        .then("I skip the scenario if the API is rate limited", skip_rate_limited)?
        .then("the response status should be {int}", status_is)?
        .then("the response status should be one of {listOfString}", status_one_of)?
        .then("the response field {string} should equal {string}", field_equals)?
        .then("the response field {string} should be a list of {int} item(s)", field_list_len)?
        .then(
            "each item in the response field {string} should have fields: {listOfString}",
            items_have_fields,
        )?;
    Ok(())
}

fn last(ctx: &mut FixtureContext) -> StepwrightResult<&ApiResponse> {
    ctx.api()?.last_response()
}

fn field<'r>(response: &'r ApiResponse, path: &str) -> StepwrightResult<&'r Value> {
    response
        .field(path)
        .ok_or_else(|| StepwrightError::assertion(format!("response has no field {path:?}")))
}

fn parse_body(raw: &str) -> StepwrightResult<Value> {
    serde_json::from_str(raw).map_err(|e| StepwrightError::StepArgument {
        index: 1,
        message: format!("request body is not JSON: {e}"),
    })
}

// ===== REQUESTS =====

fn set_base_url<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let _ = ctx.set_api_client(ApiClient::new(args.str(0)?)?);
        Ok(())
    })
}

fn set_header<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { ctx.api()?.client.set_header(args.str(0)?, args.str(1)?) })
}

async fn send(
    ctx: &mut FixtureContext,
    method: Method,
    path: &str,
    body: Option<Value>,
) -> StepwrightResult<()> {
    let api = ctx.api()?;
    let response = api.client.request(method, path, body.as_ref()).await?;
    api.record(response);
    Ok(())
}

fn send_get<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { send(ctx, Method::GET, args.str(0)?, None).await })
}

fn send_delete<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { send(ctx, Method::DELETE, args.str(0)?, None).await })
}

fn send_post<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let body = parse_body(args.str(1)?)?;
        send(ctx, Method::POST, args.str(0)?, Some(body)).await
    })
}

fn send_put<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let body = parse_body(args.str(1)?)?;
        send(ctx, Method::PUT, args.str(0)?, Some(body)).await
    })
}

fn send_patch<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let body = parse_body(args.str(1)?)?;
        send(ctx, Method::PATCH, args.str(0)?, Some(body)).await
    })
}

// ===== ASSERTIONS =====

fn skip_rate_limited<'a>(ctx: &'a mut FixtureContext, _: StepArgs) -> StepFuture<'a> {
    Box::pin(async move { skip_if_rate_limited(last(ctx)?) })
}

fn status_is<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let expected = u16::try_from(args.int(0)?).map_err(|e| StepwrightError::StepArgument {
            index: 0,
            message: e.to_string(),
        })?;
        let response = last(ctx)?;
        if expected != 429 {
            skip_if_rate_limited(response)?;
        }
        ApiValidator::validate_status(response, expected)
    })
}

fn status_one_of<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let allowed = args
            .list(0)?
            .iter()
            .map(|s| {
                s.parse::<u16>().map_err(|e| StepwrightError::StepArgument {
                    index: 0,
                    message: format!("{s:?}: {e}"),
                })
            })
            .collect::<StepwrightResult<Vec<u16>>>()?;
        let response = last(ctx)?;
        if allowed.contains(&response.status) {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "Expected status in {allowed:?}, but got {}",
                response.status
            )))
        }
    })
}

fn field_equals<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let (path, expected) = (args.str(0)?, args.str(1)?);
        let value = field(last(ctx)?, path)?;
        let actual = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if actual == expected {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "field {path:?}: expected {expected:?}, got {actual:?}"
            )))
        }
    })
}

fn field_list_len<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let (path, expected) = (args.str(0)?, args.index(1)?);
        let value = field(last(ctx)?, path)?;
        ApiValidator::validate_array_response(value, 0)?;
        let len = value.as_array().map_or(0, Vec::len);
        if len == expected {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "field {path:?}: expected {expected} items, got {len}"
            )))
        }
    })
}

fn items_have_fields<'a>(ctx: &'a mut FixtureContext, args: StepArgs) -> StepFuture<'a> {
    Box::pin(async move {
        let path = args.str(0)?;
        let fields: Vec<&str> = args.list(1)?.iter().map(String::as_str).collect();
        let value = field(last(ctx)?, path)?;
        ApiValidator::validate_array_response(value, 1)?;
        for item in value.as_array().into_iter().flatten() {
            ApiValidator::validate_required_fields(item, &fields)?;
        }
        Ok(())
    })
}
