//! Request locals: the fields a handler needs, pulled from headers, query
//! string and body.
//!
//! Extraction never fails. A header that is missing, empty or not UTF-8, a
//! query parameter that is absent or empty, and a body that is absent or not
//! JSON all leave the affected field `None`. Schema validation then turns the
//! gap into a 400 with a precise message.
//!
//! After validation the [`PartialLocals`] bag is narrowed into the typed
//! locals of its endpoint and inserted into the request extensions, where
//! handlers pick it up with [`axum::Extension`].

use std::fmt;

use axum::{
    body::Bytes,
    http::{Extensions, HeaderMap, Request, Uri},
};
use persistent_values_storage::{MAX_STRING_VALUE_LENGTH, Value, Values};
use url::Url;

use crate::{error::Rejection, schema::ONE_OF_MESSAGE};

/// Header carrying the repository requesting a token.
pub const GITHUB_REPO_HEADER: &str = "x-github-repo";

/// Header carrying the caller's access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Query parameter naming the key to read or write.
pub const KEY_PARAM: &str = "key";

/// Query parameter selecting the output format of a read.
pub const OUTPUT_PARAM: &str = "output";

/// Base used to turn the path-and-query request target into an absolute URL.
const URL_BASE: &str = "http://localhost";

/// The four validated endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /values/new_access_token`
    IssueToken,
    /// `GET /values/get`
    GetValue,
    /// `POST /values/set`
    SetValue,
    /// `POST /values/set_multiple`
    SetMultipleValues,
}

impl Endpoint {
    /// The locals extractor of this endpoint.
    #[must_use]
    pub fn extractor(self) -> Extractor {
        match self {
            Self::IssueToken => extract_issue_token_locals,
            Self::GetValue => extract_get_value_locals,
            Self::SetValue => extract_set_value_locals,
            Self::SetMultipleValues => extract_set_multiple_values_locals,
        }
    }

    /// Route path of this endpoint.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::IssueToken => "/values/new_access_token",
            Self::GetValue => "/values/get",
            Self::SetValue => "/values/set",
            Self::SetMultipleValues => "/values/set_multiple",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A locals field, named as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `x-github-repo` header.
    GithubRepo,
    /// `x-access-token` header.
    AccessToken,
    /// `key` query parameter.
    Key,
    /// `value` property of the body.
    Value,
    /// The whole body, as a key → value map.
    Values,
}

impl Field {
    /// Wire name of the field, used in validation messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::GithubRepo => GITHUB_REPO_HEADER,
            Self::AccessToken => ACCESS_TOKEN_HEADER,
            Self::Key => KEY_PARAM,
            Self::Value => "value",
            Self::Values => "values",
        }
    }
}

/// Borrowed view of one present field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    /// Header or query parameter text.
    Text(&'a str),
    /// A JSON value taken from the body.
    Json(&'a serde_json::Value),
}

/// Locals as extracted, before validation. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialLocals {
    /// `x-github-repo` header.
    pub github_repo: Option<String>,
    /// `x-access-token` header.
    pub access_token: Option<String>,
    /// `key` query parameter.
    pub key: Option<String>,
    /// `value` property of a set body.
    pub value: Option<serde_json::Value>,
    /// A set-multiple body.
    pub values: Option<serde_json::Value>,
}

impl PartialLocals {
    /// Returns the field if it was extracted.
    #[must_use]
    pub fn field(&self, field: Field) -> Option<FieldRef<'_>> {
        match field {
            Field::GithubRepo => self.github_repo.as_deref().map(FieldRef::Text),
            Field::AccessToken => self.access_token.as_deref().map(FieldRef::Text),
            Field::Key => self.key.as_deref().map(FieldRef::Text),
            Field::Value => self.value.as_ref().map(FieldRef::Json),
            Field::Values => self.values.as_ref().map(FieldRef::Json),
        }
    }

    /// Number of entries in `values`, if it is an object.
    #[must_use]
    pub fn values_len(&self) -> Option<usize> {
        self.values.as_ref().and_then(serde_json::Value::as_object).map(serde_json::Map::len)
    }
}

/// Signature shared by the per-endpoint extractors.
pub type Extractor = fn(&Request<Bytes>) -> PartialLocals;

/// The request URL, parsed once and shared through the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl(pub Url);

impl ParsedUrl {
    /// Parses the request target. Returns `None` if it is not a valid URL.
    #[must_use]
    pub fn parse(uri: &Uri) -> Option<Self> {
        let base = Url::parse(URL_BASE).ok()?;
        let target = uri.path_and_query().map_or("/", |pq| pq.as_str());
        base.join(target).ok().map(Self)
    }

    /// First value of the query parameter `name`; empty values count as absent.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.0
            .query_pairs()
            .find(|(param, _)| param == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn query_param(request: &Request<Bytes>, name: &str) -> Option<String> {
    match request.extensions().get::<ParsedUrl>() {
        Some(parsed) => parsed.query_param(name),
        None => ParsedUrl::parse(request.uri())?.query_param(name),
    }
}

fn json_body(request: &Request<Bytes>) -> Option<serde_json::Value> {
    serde_json::from_slice(request.body()).ok()
}

/// Locals of `GET /values/new_access_token`.
pub fn extract_issue_token_locals(request: &Request<Bytes>) -> PartialLocals {
    PartialLocals {
        github_repo: header(request.headers(), GITHUB_REPO_HEADER),
        ..PartialLocals::default()
    }
}

/// Locals of `GET /values/get`. Reuses a [`ParsedUrl`] extension if an
/// earlier layer stored one.
pub fn extract_get_value_locals(request: &Request<Bytes>) -> PartialLocals {
    PartialLocals {
        access_token: header(request.headers(), ACCESS_TOKEN_HEADER),
        key: query_param(request, KEY_PARAM),
        ..PartialLocals::default()
    }
}

/// Locals of `POST /values/set`. A `null` value counts as absent.
pub fn extract_set_value_locals(request: &Request<Bytes>) -> PartialLocals {
    let value = json_body(request)
        .and_then(|mut body| body.get_mut("value").map(serde_json::Value::take))
        .filter(|value| !value.is_null());

    PartialLocals {
        access_token: header(request.headers(), ACCESS_TOKEN_HEADER),
        key: query_param(request, KEY_PARAM),
        value,
        ..PartialLocals::default()
    }
}

/// Locals of `POST /values/set_multiple`. The whole body is the values map.
pub fn extract_set_multiple_values_locals(request: &Request<Bytes>) -> PartialLocals {
    PartialLocals {
        access_token: header(request.headers(), ACCESS_TOKEN_HEADER),
        values: json_body(request),
        ..PartialLocals::default()
    }
}

/// Validated locals of `GET /values/new_access_token`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTokenLocals {
    /// Repository the token is issued to.
    pub github_repo: String,
}

/// Validated locals of `GET /values/get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetValueLocals {
    /// Caller's access token.
    pub access_token: String,
    /// Key to read.
    pub key: String,
}

/// Validated locals of `POST /values/set`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValueLocals {
    /// Caller's access token.
    pub access_token: String,
    /// Key to write.
    pub key: String,
    /// Value to write.
    pub value: Value,
}

/// Validated locals of `POST /values/set_multiple`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetMultipleValuesLocals {
    /// Caller's access token.
    pub access_token: String,
    /// Values to write, by key.
    pub values: Values,
}

/// Validated locals, one variant per endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Locals {
    /// See [`IssueTokenLocals`].
    IssueToken(IssueTokenLocals),
    /// See [`GetValueLocals`].
    GetValue(GetValueLocals),
    /// See [`SetValueLocals`].
    SetValue(SetValueLocals),
    /// See [`SetMultipleValuesLocals`].
    SetMultipleValues(SetMultipleValuesLocals),
}

/// Message for a set-multiple body whose entries are not all storable.
pub const INVALID_VALUES_MESSAGE: &str =
    "values must map keys of 1 to 1024 characters to strings of 1 to 1024 characters, numbers or booleans";

impl Locals {
    /// Narrows schema-checked locals into the typed locals of `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a 400 [`Rejection`] if a required field is missing or a
    /// set-multiple entry is not a storable key-value pair.
    pub fn narrow(endpoint: Endpoint, partial: PartialLocals) -> Result<Self, Rejection> {
        Ok(match endpoint {
            Endpoint::IssueToken => Self::IssueToken(IssueTokenLocals {
                github_repo: required(partial.github_repo, Field::GithubRepo)?,
            }),
            Endpoint::GetValue => Self::GetValue(GetValueLocals {
                access_token: required(partial.access_token, Field::AccessToken)?,
                key: required(partial.key, Field::Key)?,
            }),
            Endpoint::SetValue => {
                let value = required(partial.value, Field::Value)?;
                let value = Value::try_from(value)
                    .ok()
                    .filter(Value::is_well_formed)
                    .ok_or_else(|| Rejection::bad_request(ONE_OF_MESSAGE))?;
                Self::SetValue(SetValueLocals {
                    access_token: required(partial.access_token, Field::AccessToken)?,
                    key: required(partial.key, Field::Key)?,
                    value,
                })
            },
            Endpoint::SetMultipleValues => Self::SetMultipleValues(SetMultipleValuesLocals {
                access_token: required(partial.access_token, Field::AccessToken)?,
                values: narrow_values(required(partial.values, Field::Values)?)?,
            }),
        })
    }

    /// Inserts the typed locals into `extensions`, keyed by their own type.
    pub fn attach(self, extensions: &mut Extensions) {
        match self {
            Self::IssueToken(locals) => extensions.insert(locals).map(drop),
            Self::GetValue(locals) => extensions.insert(locals).map(drop),
            Self::SetValue(locals) => extensions.insert(locals).map(drop),
            Self::SetMultipleValues(locals) => extensions.insert(locals).map(drop),
        };
    }
}

fn required<T>(field: Option<T>, name: Field) -> Result<T, Rejection> {
    field.ok_or_else(|| {
        Rejection::bad_request(format!("must have required property '{}'", name.name()))
    })
}

fn narrow_values(values: serde_json::Value) -> Result<Values, Rejection> {
    let serde_json::Value::Object(entries) = values else {
        return Err(Rejection::bad_request("must be object"));
    };

    entries
        .into_iter()
        .map(|(key, value)| {
            let key_len = key.chars().count();
            let value = Value::try_from(value).ok().filter(Value::is_well_formed);
            match value {
                Some(value) if (1..=MAX_STRING_VALUE_LENGTH).contains(&key_len) => Ok((key, value)),
                _ => Err(Rejection::bad_request(INVALID_VALUES_MESSAGE)),
            }
        })
        .collect()
}
