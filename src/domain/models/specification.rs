//! Specification domain model
//!
//! The contract a generated function must satisfy: signature, predicates,
//! examples, metamorphic relations and complexity guarantees. The serialized
//! form is the artifact persisted between pipeline stages, so field order here
//! is the on-disk key order.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use crate::domain::errors::DomainResult;

/// The only specification format version this crate accepts.
pub const SPEC_VERSION: i64 = 2;

/// Names every predicate may reference besides the declared parameters.
pub const RESERVED_RESULT_NAMES: [&str; 3] = ["result", "original_result", "new_result"];

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_spec_version() -> i64 {
    SPEC_VERSION
}

fn default_return_type() -> String {
    "Any".to_string()
}

fn empty_inputs() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Describes a parameter or return type. Purely descriptive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Parameter name, empty for a return type
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Declared type, e.g. `list[int]`
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub type_name: String,
    /// Free-form description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Whether `None` is accepted
    #[serde(default, deserialize_with = "null_as_default")]
    pub nullable: bool,
    /// Alternative types
    #[serde(default, deserialize_with = "null_as_default")]
    pub union: Vec<String>,
}

/// A condition under which an exception of `exception_type` is raised.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionSpec {
    /// Exception class name
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub exception_type: String,
    /// Condition that triggers the exception
    #[serde(alias = "condition", default, deserialize_with = "null_as_default")]
    pub predicate: String,
    /// Expected message, if any
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// A named boolean expression in the `pre`, `post` or `invariants` group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Unique id across all predicate groups
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Python boolean expression
    #[serde(default, deserialize_with = "null_as_default")]
    pub expr: String,
    /// Explanation shown when the predicate fails
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

impl Predicate {
    /// Predicate with no message
    pub fn new(id: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            expr: expr.into(),
            message: String::new(),
        }
    }
}

/// A concrete input/outcome pair.
///
/// Positive examples carry `output`; negative examples carry `raises`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Unique id across both example groups
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Keyword arguments as a JSON object
    #[serde(default = "empty_inputs")]
    pub inputs: Value,
    /// Expected return value
    #[serde(default)]
    pub output: Option<Value>,
    /// Expected exception type name
    #[serde(default)]
    pub raises: Option<String>,
    /// Free-form labels
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Free-form notes
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

impl Example {
    /// Build a positive example expecting `output`.
    pub fn positive(id: impl Into<String>, inputs: Value, output: Value) -> Self {
        Self {
            id: id.into(),
            inputs,
            output: Some(output),
            raises: None,
            tags: Vec::new(),
            notes: String::new(),
        }
    }

    /// Build a negative example expecting an exception named `raises`.
    pub fn negative(id: impl Into<String>, inputs: Value, raises: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inputs,
            output: None,
            raises: Some(raises.into()),
            tags: Vec::new(),
            notes: String::new(),
        }
    }

    /// `raises` with blank strings treated as absent.
    pub fn expected_exception(&self) -> Option<&str> {
        self.raises.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Which group an example was declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExampleKind {
    /// Expected return value
    Positive,
    /// Expected exception
    Negative,
}

impl ExampleKind {
    /// Group name as written in the document
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

/// Allowed metamorphic relation tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// Same output
    Equal,
    /// Output contained in the original output
    Subset,
    /// Same elements in any order
    Permutation,
    /// Output at least as long
    LengthNonDecreasing,
    /// Checked by `oracle_expr`
    Custom,
}

impl RelationKind {
    /// Every relation tag
    pub const ALL: [Self; 5] = [
        Self::Equal,
        Self::Subset,
        Self::Permutation,
        Self::LengthNonDecreasing,
        Self::Custom,
    ];

    /// Tag as written in the document
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Subset => "subset",
            Self::Permutation => "permutation",
            Self::LengthNonDecreasing => "length_non_decreasing",
            Self::Custom => "custom",
        }
    }

    /// Parse a relation tag exactly
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relates the output on a transformed input to the output on the original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetamorphicRelation {
    /// Relation id
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    /// Python expression deriving the transformed inputs
    #[serde(default, deserialize_with = "null_as_default")]
    pub transform_inputs: String,
    /// Kept as the raw tag so an unknown relation can be reported, not rejected at parse time
    #[serde(default, deserialize_with = "null_as_default")]
    pub relation: String,
    /// Check for `custom` relations
    #[serde(default, deserialize_with = "null_as_default")]
    pub oracle_expr: String,
    /// Free-form notes
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
}

impl MetamorphicRelation {
    /// Parsed relation tag, `None` when unknown
    pub fn kind(&self) -> Option<RelationKind> {
        RelationKind::parse(self.relation.trim())
    }
}

/// Declared asymptotic bound and structural witness rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityGuarantee {
    /// Bound such as `O(n log n)`
    #[serde(alias = "complexity", default, deserialize_with = "null_as_default")]
    pub big_o: String,
    /// Structural rules the implementation should follow
    #[serde(default, deserialize_with = "null_as_default")]
    pub witness_rules: Vec<String>,
}

/// How conformance is ultimately judged. Carried as data only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSpec {
    /// Oracle kind, e.g. `reference`
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub oracle_type: String,
    /// Reference implementation name
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    /// Inline reference code
    #[serde(default)]
    pub code: Option<String>,
}

/// A parameter in a function signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Declared type
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub type_name: String,
    /// Free-form description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Value constraints in prose
    #[serde(default, deserialize_with = "null_as_default")]
    pub constraints: String,
}

/// Parameters and return type of a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Parameters in call order
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<Parameter>,
    /// Declared return type, `Any` when missing
    #[serde(alias = "returns", default = "default_return_type")]
    pub return_type: String,
    /// Free-form description of the return value
    #[serde(default, deserialize_with = "null_as_default")]
    pub return_description: String,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            parameters: Vec::new(),
            return_type: default_return_type(),
            return_description: String::new(),
        }
    }
}

/// An exception a function documents raising.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionException {
    /// Exception class name
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub exception_type: String,
    /// When it is raised
    #[serde(alias = "predicate", default, deserialize_with = "null_as_default")]
    pub condition: String,
}

/// The main function or a helper function of the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Python identifier
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// One-line purpose
    #[serde(default, deserialize_with = "null_as_default")]
    pub purpose: String,
    /// Parameters and return type
    #[serde(default, deserialize_with = "null_as_default")]
    pub signature: Signature,
    /// Documented exceptions
    #[serde(default, deserialize_with = "null_as_default")]
    pub exceptions: Vec<FunctionException>,
    /// Informal complexity note
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub complexity: String,
}

/// Typed parameter, return and exception declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypesModel {
    /// Authoritative parameter list
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<TypeDescriptor>,
    /// Return type
    #[serde(alias = "return", default)]
    pub returns: Option<TypeDescriptor>,
    /// Declared exception conditions
    #[serde(default, deserialize_with = "null_as_default")]
    pub exceptions: Vec<ExceptionSpec>,
}

/// Positive and negative examples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamplesBundle {
    /// Examples expecting a return value
    #[serde(default, deserialize_with = "null_as_default")]
    pub positive: Vec<Example>,
    /// Examples expecting an exception
    #[serde(default, deserialize_with = "null_as_default")]
    pub negative: Vec<Example>,
}

impl ExamplesBundle {
    /// All examples in declaration order: positive group first, then negative.
    pub fn iter(&self) -> impl Iterator<Item = (ExampleKind, &Example)> {
        self.positive
            .iter()
            .map(|e| (ExampleKind::Positive, e))
            .chain(self.negative.iter().map(|e| (ExampleKind::Negative, e)))
    }

    /// Total number of examples
    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len()
    }

    /// No examples in either group
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three predicate-ID collections a step graph may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateIds {
    /// Precondition ids
    pub pre: HashSet<String>,
    /// Postcondition ids
    pub post: HashSet<String>,
    /// Invariant ids
    pub invariants: HashSet<String>,
}

/// Root of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    /// Format version, defaults to 2
    #[serde(default = "default_spec_version")]
    pub spec_version: i64,
    /// The function to generate
    #[serde(default)]
    pub main_function: Option<FunctionSpec>,
    /// Helpers the main function may call
    #[serde(default, deserialize_with = "null_as_default")]
    pub helper_functions: Vec<FunctionSpec>,
    /// Typed declarations
    #[serde(default, deserialize_with = "null_as_default")]
    pub types: TypesModel,
    /// Preconditions over the parameters
    #[serde(default, deserialize_with = "null_as_default")]
    pub pre: Vec<Predicate>,
    /// Postconditions over the parameters and `result`
    #[serde(default, deserialize_with = "null_as_default")]
    pub post: Vec<Predicate>,
    /// Conditions that hold throughout
    #[serde(default, deserialize_with = "null_as_default")]
    pub invariants: Vec<Predicate>,
    /// Concrete examples
    #[serde(default, deserialize_with = "null_as_default")]
    pub examples: ExamplesBundle,
    /// Metamorphic relations
    #[serde(default, deserialize_with = "null_as_default")]
    pub metamorphic_relations: Vec<MetamorphicRelation>,
    /// Dotted names the implementation must not use
    #[serde(default, deserialize_with = "null_as_default")]
    pub forbidden_apis: Vec<String>,
    /// Declared complexity bound
    #[serde(default)]
    pub complexity_guarantee: Option<ComplexityGuarantee>,
    /// How conformance is judged
    #[serde(default)]
    pub oracle: Option<OracleSpec>,
    /// Free-form design notes
    #[serde(alias = "notes", default, deserialize_with = "null_as_default")]
    pub design_notes: String,
}

impl Default for Specification {
    fn default() -> Self {
        Self {
            spec_version: SPEC_VERSION,
            main_function: None,
            helper_functions: Vec::new(),
            types: TypesModel::default(),
            pre: Vec::new(),
            post: Vec::new(),
            invariants: Vec::new(),
            examples: ExamplesBundle::default(),
            metamorphic_relations: Vec::new(),
            forbidden_apis: Vec::new(),
            complexity_guarantee: None,
            oracle: None,
            design_notes: String::new(),
        }
    }
}

impl Specification {
    /// Deserialize from a JSON value
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Parse from JSON text
    pub fn from_json(raw: &str) -> DomainResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize as indented JSON
    pub fn to_json_pretty(&self) -> DomainResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Main function name, or empty when no main function is declared.
    pub fn name(&self) -> &str {
        self.main_function.as_ref().map_or("", |f| f.name.as_str())
    }

    /// Main function purpose, or empty
    pub fn purpose(&self) -> &str {
        self.main_function.as_ref().map_or("", |f| f.purpose.as_str())
    }

    /// Declared parameter names in order.
    ///
    /// `types.parameters` is authoritative; the main function signature is
    /// consulted only when it is empty.
    pub fn parameter_names(&self) -> Vec<String> {
        let typed: Vec<String> = self
            .types
            .parameters
            .iter()
            .map(|p| p.name.clone())
            .filter(|n| !n.is_empty())
            .collect();
        if !typed.is_empty() {
            return typed;
        }
        self.main_function
            .as_ref()
            .map(|f| {
                f.signature
                    .parameters
                    .iter()
                    .map(|p| p.name.clone())
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ids of each predicate group
    pub fn predicate_ids(&self) -> PredicateIds {
        let collect = |preds: &[Predicate]| preds.iter().map(|p| p.id.clone()).collect();
        PredicateIds {
            pre: collect(&self.pre),
            post: collect(&self.post),
            invariants: collect(&self.invariants),
        }
    }

    /// Look up a predicate by id across all three groups.
    pub fn find_predicate(&self, id: &str) -> Option<&Predicate> {
        self.pre
            .iter()
            .chain(&self.post)
            .chain(&self.invariants)
            .find(|p| p.id == id)
    }

    /// Render a Python-style `def name(a, b) -> T` header for prompts.
    pub fn signature_line(&self) -> String {
        let return_type = self
            .main_function
            .as_ref()
            .map_or("Any", |f| f.signature.return_type.as_str());
        format!(
            "def {}({}) -> {}",
            self.name(),
            self.parameter_names().join(", "),
            return_type
        )
    }
}
