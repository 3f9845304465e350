//! Route handlers.
//!
//! Handlers run only after their validation pipeline has attached typed
//! locals, so the access token they see is known to the store. Each one
//! refreshes the token's metadata along with its own reads and writes.

use axum::{
    Extension,
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use futures::future::try_join_all;
use persistent_values_authn::touch_access_token;
use persistent_values_storage::{OutputFormat, PutOptions, Value, Values, keys::derive_key};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::Rejection,
    locals::{
        GetValueLocals, IssueTokenLocals, OUTPUT_PARAM, ParsedUrl, SetMultipleValuesLocals,
        SetValueLocals,
    },
    response::json_response,
    router::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssuedToken<'a> {
    access_token: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyedValue<'a> {
    access_token: &'a str,
    key: &'a str,
    value: Option<&'a Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WrittenValues<'a> {
    access_token: &'a str,
    values: &'a Values,
}

async fn write(state: &AppState, key: &str, value: String) -> Result<(), Rejection> {
    Ok(state.store.put(key, value, PutOptions::touched_now()).await?)
}

async fn touch(state: &AppState, access_token: &str) -> Result<(), Rejection> {
    Ok(touch_access_token(state.store.as_ref(), access_token).await?)
}

/// `GET /values/new_access_token`
pub async fn issue_token(
    State(state): State<AppState>,
    Extension(locals): Extension<IssueTokenLocals>,
) -> Result<Response, Rejection> {
    let token = state.issuer.issue().await?;
    info!(github_repo = %locals.github_repo, "Issued access token");
    Ok(json_response(StatusCode::OK, &IssuedToken { access_token: token.as_str() }))
}

/// `GET /values/get`
///
/// Returns `null` for a key that was never written. A present entry is
/// rewritten with its stored text unchanged, which refreshes its metadata;
/// `output=json` only affects the response.
pub async fn get_value(
    State(state): State<AppState>,
    Extension(locals): Extension<GetValueLocals>,
    parsed_url: Option<Extension<ParsedUrl>>,
    uri: Uri,
) -> Result<Response, Rejection> {
    let output = parsed_url
        .map(|Extension(url)| url)
        .or_else(|| ParsedUrl::parse(&uri))
        .and_then(|url| url.query_param(OUTPUT_PARAM));
    let format = OutputFormat::from_query(output.as_deref());
    let key = derive_key(&locals.access_token, &locals.key);

    let stored = state.store.get_text(&key).await?;
    match &stored {
        Some(text) => {
            tokio::try_join!(
                write(&state, &key, text.clone()),
                touch(&state, &locals.access_token),
            )?;
        },
        None => {
            debug!(key = %locals.key, "Key not found");
            touch(&state, &locals.access_token).await?;
        },
    }

    let value = stored.as_deref().map(|text| format.decode(text));
    Ok(json_response(StatusCode::OK, &KeyedValue {
        access_token: &locals.access_token,
        key: &locals.key,
        value: value.as_ref(),
    }))
}

/// `POST /values/set`
pub async fn set_value(
    State(state): State<AppState>,
    Extension(locals): Extension<SetValueLocals>,
) -> Result<Response, Rejection> {
    let key = derive_key(&locals.access_token, &locals.key);

    tokio::try_join!(
        write(&state, &key, locals.value.encode()),
        touch(&state, &locals.access_token),
    )?;

    Ok(json_response(StatusCode::OK, &KeyedValue {
        access_token: &locals.access_token,
        key: &locals.key,
        value: Some(&locals.value),
    }))
}

/// `POST /values/set_multiple`
///
/// Writes every entry concurrently. Any failed write fails the request;
/// writes that already landed are not rolled back.
pub async fn set_multiple_values(
    State(state): State<AppState>,
    Extension(locals): Extension<SetMultipleValuesLocals>,
) -> Result<Response, Rejection> {
    let writes = locals.values.iter().map(|(key, value)| {
        let key = derive_key(&locals.access_token, key);
        let state = &state;
        async move { write(state, &key, value.encode()).await }
    });

    tokio::try_join!(try_join_all(writes), touch(&state, &locals.access_token))?;

    debug!(count = locals.values.len(), "Stored values");
    Ok(json_response(StatusCode::OK, &WrittenValues {
        access_token: &locals.access_token,
        values: &locals.values,
    }))
}

/// Fallback for unmatched routes and methods.
pub async fn not_found() -> Response {
    Rejection::not_found().into_response()
}
