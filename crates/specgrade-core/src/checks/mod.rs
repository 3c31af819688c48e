//! Built-in checks.
//!
//! A check is the pair (target selector, condition) a catalog rule runs.
//! Rules name their check with a `snake_case` identifier; the evaluator
//! turns the returned `TargetOutcome`s into coverage and findings.

mod design;
mod documentation;
mod metadata;
pub mod patterns;
mod responses;
mod security;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::document::{Operation, SpecDocument};

/// Every check a catalog rule may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    OperationSummary,
    OperationDescription,
    OperationId,
    OperationTags,
    SchemaDescriptions,
    ResponseExamples,
    PathNaming,
    PathVerbs,
    PathParameters,
    Pagination,
    PaginationLimits,
    PropertyTypes,
    SuccessResponse,
    ErrorResponses,
    ResponseSchemas,
    ProblemDetails,
    RequestBodySchema,
    RateLimiting,
    SecurityRequirements,
    SecuritySchemes,
    HttpsServers,
    ApiVersion,
    ContactInfo,
    LicenseInfo,
}

impl CheckKind {
    /// Select this check's targets in `doc` and test each one.
    ///
    /// An empty result means the document has nothing for the check to
    /// look at.
    pub fn inspect(self, doc: &SpecDocument) -> Vec<TargetOutcome> {
        match self {
            CheckKind::OperationSummary => documentation::operation_summary(doc),
            CheckKind::OperationDescription => documentation::operation_description(doc),
            CheckKind::OperationId => documentation::operation_id(doc),
            CheckKind::OperationTags => documentation::operation_tags(doc),
            CheckKind::SchemaDescriptions => documentation::schema_descriptions(doc),
            CheckKind::ResponseExamples => documentation::response_examples(doc),
            CheckKind::PathNaming => design::path_naming(doc),
            CheckKind::PathVerbs => design::path_verbs(doc),
            CheckKind::PathParameters => design::path_parameters(doc),
            CheckKind::Pagination => design::pagination(doc),
            CheckKind::PaginationLimits => design::pagination_limits(doc),
            CheckKind::PropertyTypes => design::property_types(doc),
            CheckKind::SuccessResponse => responses::success_response(doc),
            CheckKind::ErrorResponses => responses::error_responses(doc),
            CheckKind::ResponseSchemas => responses::response_schemas(doc),
            CheckKind::ProblemDetails => responses::problem_details(doc),
            CheckKind::RequestBodySchema => responses::request_body_schema(doc),
            CheckKind::RateLimiting => responses::rate_limiting(doc),
            CheckKind::SecurityRequirements => security::security_requirements(doc),
            CheckKind::SecuritySchemes => security::security_schemes(doc),
            CheckKind::HttpsServers => security::https_servers(doc),
            CheckKind::ApiVersion => metadata::api_version(doc),
            CheckKind::ContactInfo => metadata::contact_info(doc),
            CheckKind::LicenseInfo => metadata::license_info(doc),
        }
    }

    /// Identifier used in catalog files.
    pub fn name(self) -> &'static str {
        match self {
            CheckKind::OperationSummary => "operation_summary",
            CheckKind::OperationDescription => "operation_description",
            CheckKind::OperationId => "operation_id",
            CheckKind::OperationTags => "operation_tags",
            CheckKind::SchemaDescriptions => "schema_descriptions",
            CheckKind::ResponseExamples => "response_examples",
            CheckKind::PathNaming => "path_naming",
            CheckKind::PathVerbs => "path_verbs",
            CheckKind::PathParameters => "path_parameters",
            CheckKind::Pagination => "pagination",
            CheckKind::PaginationLimits => "pagination_limits",
            CheckKind::PropertyTypes => "property_types",
            CheckKind::SuccessResponse => "success_response",
            CheckKind::ErrorResponses => "error_responses",
            CheckKind::ResponseSchemas => "response_schemas",
            CheckKind::ProblemDetails => "problem_details",
            CheckKind::RequestBodySchema => "request_body_schema",
            CheckKind::RateLimiting => "rate_limiting",
            CheckKind::SecurityRequirements => "security_requirements",
            CheckKind::SecuritySchemes => "security_schemes",
            CheckKind::HttpsServers => "https_servers",
            CheckKind::ApiVersion => "api_version",
            CheckKind::ContactInfo => "contact_info",
            CheckKind::LicenseInfo => "license_info",
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of testing one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOutcome {
    /// JSON Pointer of the target
    pub location: String,

    /// Why the target failed; `None` when it passed
    pub failure: Option<String>,
}

impl TargetOutcome {
    pub fn pass(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            failure: None,
        }
    }

    pub fn fail(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            failure: Some(message.into()),
        }
    }

    /// Pass when `ok`, otherwise fail with the lazily built message.
    pub fn condition(
        location: impl Into<String>,
        ok: bool,
        message: impl FnOnce() -> String,
    ) -> Self {
        if ok {
            Self::pass(location)
        } else {
            Self::fail(location, message())
        }
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// "GET /pets" style label used in messages.
pub(crate) fn op_label(op: &Operation<'_>) -> String {
    format!("{} {}", op.method.to_ascii_uppercase(), op.path)
}

/// First digit of a status code (`"404"` and `"4XX"` both give `'4'`).
/// `default` and malformed codes have no class.
pub(crate) fn status_class(code: &str) -> Option<char> {
    let mut chars = code.chars();
    let first = chars.next().filter(|c| ('1'..='5').contains(c))?;
    let rest: Vec<char> = chars.collect();
    let well_formed = rest.len() == 2
        && (rest.iter().all(char::is_ascii_digit)
            || rest.iter().all(|c| c.eq_ignore_ascii_case(&'x')));
    well_formed.then_some(first)
}

/// Media type objects of a response or request body, by media type name.
pub(crate) fn media_types(node: &Value) -> Vec<(&str, &Value)> {
    node.get("content")
        .and_then(Value::as_object)
        .map(|content| content.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default()
}

/// Property names whose array value marks an object as a collection wrapper.
const COLLECTION_WRAPPERS: [&str; 4] = ["items", "data", "results", "records"];

/// Whether a response body is a list of resources.
///
/// Either a top-level array or an object wrapping one under a conventional
/// property name.
pub(crate) fn returns_collection(doc: &SpecDocument, response: &Value) -> bool {
    media_types(response).into_iter().any(|(_, media)| {
        let Some(schema) = media.get("schema").map(|s| doc.resolve(s)) else {
            return false;
        };
        if is_array_schema(schema) {
            return true;
        }
        schema
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(|props| {
                COLLECTION_WRAPPERS.iter().any(|name| {
                    props
                        .get(*name)
                        .is_some_and(|p| is_array_schema(doc.resolve(p)))
                })
            })
    })
}

fn is_array_schema(schema: &Value) -> bool {
    match schema.get("type") {
        Some(Value::String(t)) => t == "array",
        // 3.1 allows a list of types
        Some(Value::Array(types)) => types.iter().any(|t| t == "array"),
        _ => false,
    }
}

/// GET operations whose 200 response returns a collection.
pub(crate) fn collection_reads<'a>(doc: &'a SpecDocument) -> Vec<Operation<'a>> {
    doc.operations()
        .into_iter()
        .filter(|op| op.method == "get")
        .filter(|op| {
            op.responses(doc)
                .into_iter()
                .any(|(code, response)| code == "200" && returns_collection(doc, response))
        })
        .collect()
}
