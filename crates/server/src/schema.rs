//! Structural validation of extracted locals.
//!
//! Each endpoint has one static [`Schema`]: a list of required fields and a
//! [`Constraint`] per field. Validation reports every error it finds, in a
//! fixed order: missing required fields first, then property constraints,
//! both in declaration order. Messages use the wording of common JSON Schema
//! validators so clients see familiar errors.

use std::fmt;

use serde_json::Value as Json;

use crate::locals::{Endpoint, Field, FieldRef, PartialLocals};

/// Constraint on a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// A string whose length in characters lies in `min..=max`.
    String {
        /// Minimum length.
        min: usize,
        /// Maximum length.
        max: usize,
    },
    /// A JSON object, any shape.
    Object,
    /// A JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// Exactly one of the listed constraints must hold.
    OneOf(&'static [Constraint]),
}

impl Constraint {
    /// Checks `field` and returns every violated rule, in report order.
    ///
    /// A failing `OneOf` reports the errors of each branch, in branch order,
    /// followed by its own summary. If more than one branch passes only the
    /// summary is reported.
    fn check(&self, field: FieldRef<'_>) -> Vec<String> {
        match (self, field) {
            (Self::String { min, max }, FieldRef::Text(text)) => check_length(text, *min, *max),
            (Self::String { min, max }, FieldRef::Json(Json::String(text))) => {
                check_length(text, *min, *max)
            },
            (Self::String { .. }, FieldRef::Json(_)) => vec!["must be string".to_owned()],
            (Self::Object, FieldRef::Json(Json::Object(_))) => Vec::new(),
            (Self::Object, _) => vec!["must be object".to_owned()],
            (Self::Number, FieldRef::Json(Json::Number(_))) => Vec::new(),
            (Self::Number, _) => vec!["must be number".to_owned()],
            (Self::Boolean, FieldRef::Json(Json::Bool(_))) => Vec::new(),
            (Self::Boolean, _) => vec!["must be boolean".to_owned()],
            (Self::OneOf(options), field) => {
                let branches: Vec<_> = options.iter().map(|option| option.check(field)).collect();
                let matches = branches.iter().filter(|errors| errors.is_empty()).count();
                match matches {
                    1 => Vec::new(),
                    0 => branches
                        .into_iter()
                        .flatten()
                        .chain(std::iter::once(ONE_OF_MESSAGE.to_owned()))
                        .collect(),
                    _ => vec![ONE_OF_MESSAGE.to_owned()],
                }
            },
        }
    }
}

/// Summary reported when a `OneOf` constraint fails.
pub const ONE_OF_MESSAGE: &str = "must match exactly one schema in oneOf";

fn check_length(text: &str, min: usize, max: usize) -> Vec<String> {
    let len = text.chars().count();
    if len < min {
        vec![format!("must NOT have fewer than {min} characters")]
    } else if len > max {
        vec![format!("must NOT have more than {max} characters")]
    } else {
        Vec::new()
    }
}

/// One schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// Field that failed.
    pub field: Field,
    /// Caller-facing message.
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.name(), self.message)
    }
}

/// Validates extracted locals against a structure.
pub trait SchemaValidator: Send + Sync {
    /// Returns every violation in report order, or `Ok` if there are none.
    ///
    /// # Errors
    ///
    /// Returns the non-empty list of [`SchemaError`]s.
    fn validate(&self, locals: &PartialLocals) -> Result<(), Vec<SchemaError>>;
}

/// A fixed per-endpoint schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Endpoint the schema belongs to.
    pub endpoint: Endpoint,
    /// Fields that must be present, in report order.
    pub required: &'static [Field],
    /// Constraints on fields that are present, in report order.
    pub properties: &'static [(Field, Constraint)],
}

const GITHUB_REPO: Constraint = Constraint::String { min: 3, max: 1024 };
const ACCESS_TOKEN: Constraint = Constraint::String { min: 36, max: 36 };
const KEY: Constraint = Constraint::String { min: 1, max: 1024 };
const VALUE: Constraint = Constraint::OneOf(&[
    Constraint::String { min: 1, max: 1024 },
    Constraint::Number,
    Constraint::Boolean,
]);

/// `GET /values/new_access_token`.
pub static ISSUE_TOKEN_SCHEMA: Schema = Schema {
    endpoint: Endpoint::IssueToken,
    required: &[Field::GithubRepo],
    properties: &[(Field::GithubRepo, GITHUB_REPO)],
};

/// `GET /values/get`.
pub static GET_VALUE_SCHEMA: Schema = Schema {
    endpoint: Endpoint::GetValue,
    required: &[Field::AccessToken, Field::Key],
    properties: &[(Field::AccessToken, ACCESS_TOKEN), (Field::Key, KEY)],
};

/// `POST /values/set`.
pub static SET_VALUE_SCHEMA: Schema = Schema {
    endpoint: Endpoint::SetValue,
    required: &[Field::AccessToken, Field::Key, Field::Value],
    properties: &[(Field::AccessToken, ACCESS_TOKEN), (Field::Key, KEY), (Field::Value, VALUE)],
};

/// `POST /values/set_multiple`.
pub static SET_MULTIPLE_VALUES_SCHEMA: Schema = Schema {
    endpoint: Endpoint::SetMultipleValues,
    required: &[Field::AccessToken, Field::Values],
    properties: &[(Field::AccessToken, ACCESS_TOKEN), (Field::Values, Constraint::Object)],
};

impl Schema {
    /// The schema of `endpoint`.
    #[must_use]
    pub fn for_endpoint(endpoint: Endpoint) -> &'static Self {
        match endpoint {
            Endpoint::IssueToken => &ISSUE_TOKEN_SCHEMA,
            Endpoint::GetValue => &GET_VALUE_SCHEMA,
            Endpoint::SetValue => &SET_VALUE_SCHEMA,
            Endpoint::SetMultipleValues => &SET_MULTIPLE_VALUES_SCHEMA,
        }
    }
}

impl SchemaValidator for Schema {
    fn validate(&self, locals: &PartialLocals) -> Result<(), Vec<SchemaError>> {
        let missing = self.required.iter().filter(|field| locals.field(**field).is_none()).map(
            |field| SchemaError {
                field: *field,
                message: format!("must have required property '{}'", field.name()),
            },
        );

        let invalid = self.properties.iter().flat_map(|(field, constraint)| {
            let messages = locals.field(*field).map(|value| constraint.check(value));
            messages
                .into_iter()
                .flatten()
                .map(move |message| SchemaError { field: *field, message })
        });

        let errors: Vec<_> = missing.chain(invalid).collect();
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
