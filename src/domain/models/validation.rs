//! Validation issue model shared by the specification and step-graph validators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a validation finding.
///
/// `Error` blocks the artifact; `Warning` is surfaced but never triggers repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Blocks the artifact
    Error,
    /// Reported only
    Warning,
}

impl Severity {
    /// Uppercase label
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category tag attached to every issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// Not valid JSON, or fails the schema
    StructureError,
    /// Empty or duplicate id
    IdConflict,
    /// Predicate does not parse
    PredExprInvalid,
    /// Predicate uses a forbidden construct or call
    PredUnsafeNode,
    /// Predicate references an undeclared name
    PredNameUnknown,
    /// Predicate is a constant
    PredTrivial,
    /// Example is malformed for its group
    ExampleInvalid,
    /// Example omits declared parameters
    ExampleInputMissing,
    /// Unknown or incomplete metamorphic relation
    MetaRelationInvalid,
    /// Forbidden API entry is not a dotted name
    ForbiddenApiFormat,
    /// Complexity bound is not `O(...)`
    ComplexityInvalid,
    /// Too few examples or predicates
    CoverageInsufficient,
    /// Step is missing its id or intent, or repeats an id
    StepInvalid,
    /// Step references an undeclared predicate id
    StepRefUnknown,
    /// Edge names an unknown step
    EdgeInvalid,
    /// `order` is not a permutation of the step ids
    OrderInvalid,
}

impl IssueCode {
    /// Code as it appears in reports
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StructureError => "STRUCTURE_ERROR",
            Self::IdConflict => "ID_CONFLICT",
            Self::PredExprInvalid => "PRED_EXPR_INVALID",
            Self::PredUnsafeNode => "PRED_UNSAFE_NODE",
            Self::PredNameUnknown => "PRED_NAME_UNKNOWN",
            Self::PredTrivial => "PRED_TRIVIAL",
            Self::ExampleInvalid => "EXAMPLE_INVALID",
            Self::ExampleInputMissing => "EXAMPLE_INPUT_MISSING",
            Self::MetaRelationInvalid => "META_RELATION_INVALID",
            Self::ForbiddenApiFormat => "FORBIDDEN_API_FORMAT",
            Self::ComplexityInvalid => "COMPLEXITY_INVALID",
            Self::CoverageInsufficient => "COVERAGE_INSUFFICIENT",
            Self::StepInvalid => "STEP_INVALID",
            Self::StepRefUnknown => "STEP_REF_UNKNOWN",
            Self::EdgeInvalid => "EDGE_INVALID",
            Self::OrderInvalid => "ORDER_INVALID",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validator finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Category tag
    pub code: IssueCode,
    /// Dotted path to the offending field, e.g. `examples.positive.E1`
    pub location: String,
    /// Human-readable description
    pub message: String,
    /// Whether the issue blocks the artifact
    pub severity: Severity,
}

impl ValidationIssue {
    /// A blocking issue
    pub fn error(code: IssueCode, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            location: location.into(),
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// A non-blocking issue
    pub fn warning(code: IssueCode, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            location: location.into(),
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    /// Whether this issue blocks the artifact
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Render as `SEVERITY:CODE::location::message`.
    pub fn format(&self) -> String {
        format!(
            "{}:{}::{}::{}",
            self.severity, self.code, self.location, self.message
        )
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Split a mixed issue list into `(errors, warnings)`, preserving order.
pub fn partition_issues(issues: Vec<ValidationIssue>) -> (Vec<ValidationIssue>, Vec<ValidationIssue>) {
    issues.into_iter().partition(ValidationIssue::is_error)
}
