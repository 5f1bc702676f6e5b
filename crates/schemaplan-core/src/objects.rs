//! Schema-level objects other than tables: sequences, functions, triggers,
//! views, and user-defined types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::{FuncParamDir, SqlFormat, TriggerForEach, TriggerTiming, TypeDefKind};
use crate::grant::Grant;
use crate::identity::{name_sets_match, names_match, FormatEq, Identity};

/// A sequence
///
/// Numeric attributes are optional: "unspecified" is distinct from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub cache: Option<i64>,

    #[serde(default)]
    pub start: Option<i64>,

    #[serde(default)]
    pub min: Option<i64>,

    #[serde(default)]
    pub max: Option<i64>,

    #[serde(default)]
    pub increment: Option<i64>,

    #[serde(default)]
    pub cycle: bool,

    /// Owning column as `table.column`
    #[serde(default)]
    pub owned_by: String,

    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl Sequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Identity for Sequence {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

impl FormatEq for Sequence {
    fn equals(&self, other: &Self, _format: SqlFormat) -> bool {
        self.identity_matches(other)
            && names_match(&self.owner, &other.owner)
            && self.cache == other.cache
            && self.start == other.start
            && self.min == other.min
            && self.max == other.max
            && self.increment == other.increment
            && self.cycle == other.cycle
            && names_match(&self.owned_by, &other.owned_by)
    }
}

/// A function parameter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParameter {
    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: String,

    #[serde(default)]
    pub direction: FuncParamDir,
}

impl FunctionParameter {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            direction: FuncParamDir::In,
        }
    }

    pub fn with_direction(mut self, direction: FuncParamDir) -> Self {
        self.direction = direction;
        self
    }

    fn same(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
            && names_match(&self.data_type, &other.data_type)
            && self.direction == other.direction
    }
}

/// Function body for one SQL format
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Must be declared; an absent format is a validation error
    #[serde(default)]
    pub sql_format: Option<SqlFormat>,

    #[serde(default)]
    pub language: String,

    pub text: String,
}

impl FunctionDefinition {
    pub fn new(
        sql_format: SqlFormat,
        language: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sql_format: Some(sql_format),
            language: language.into(),
            text: text.into(),
        }
    }
}

impl Identity for FunctionDefinition {
    fn identity_matches(&self, other: &Self) -> bool {
        self.sql_format.is_some() && self.sql_format == other.sql_format
    }
}

impl FormatEq for FunctionDefinition {
    fn equals(&self, other: &Self, format: SqlFormat) -> bool {
        self.sql_format == Some(format)
            && self.identity_matches(other)
            && names_match(&self.language, &other.language)
            && self.text.trim() == other.text.trim()
    }
}

/// A stored function
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub returns: String,

    #[serde(default)]
    pub cache_policy: String,

    #[serde(default)]
    pub security_definer: bool,

    #[serde(default)]
    pub parameters: Vec<FunctionParameter>,

    #[serde(default)]
    pub definitions: Vec<FunctionDefinition>,

    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl Function {
    pub fn new(name: impl Into<String>, returns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            returns: returns.into(),
            ..Self::default()
        }
    }

    pub fn with_parameter(mut self, parameter: FunctionParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_definition(mut self, definition: FunctionDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Definition for `format`, if any
    pub fn definition_for(&self, format: SqlFormat) -> Option<&FunctionDefinition> {
        self.definitions
            .iter()
            .find(|d| d.sql_format == Some(format))
    }

    /// Name and parameter list match pairwise (name, type, direction)
    pub fn signature_matches(&self, other: &Function) -> bool {
        names_match(&self.name, &other.name)
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.same(b))
    }

    /// Human-readable signature, e.g. `add(int, int)`
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.data_type.as_str())
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl Identity for Function {
    /// Same signature and at least one definition for a shared format. With
    /// no overlapping format there is nothing comparable yet, so no match.
    fn identity_matches(&self, other: &Self) -> bool {
        self.signature_matches(other)
            && self
                .definitions
                .iter()
                .any(|d| other.definitions.iter().any(|o| d.identity_matches(o)))
    }
}

impl FormatEq for Function {
    fn equals(&self, other: &Self, format: SqlFormat) -> bool {
        let definitions_match = match (self.definition_for(format), other.definition_for(format)) {
            (Some(a), Some(b)) => a.equals(b, format),
            _ => false,
        };

        self.signature_matches(other)
            && names_match(&self.owner, &other.owner)
            && names_match(&self.returns, &other.returns)
            && names_match(&self.cache_policy, &other.cache_policy)
            && self.security_definer == other.security_definer
            && definitions_match
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// A trigger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,

    /// Table the trigger is attached to
    pub table: String,

    /// INSERT, UPDATE, DELETE, TRUNCATE
    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default)]
    pub timing: TriggerTiming,

    #[serde(default)]
    pub for_each: TriggerForEach,

    /// Name of the function the trigger executes
    pub function: String,

    /// Restrict the trigger to one format
    #[serde(default)]
    pub sql_format: Option<SqlFormat>,
}

impl Trigger {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            function: function.into(),
            ..Self::default()
        }
    }

    /// Whether this trigger applies when targeting `format`
    pub fn applies_to(&self, format: SqlFormat) -> bool {
        self.sql_format.map_or(true, |f| f == format)
    }
}

impl Identity for Trigger {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name) && names_match(&self.table, &other.table)
    }
}

impl FormatEq for Trigger {
    fn equals(&self, other: &Self, format: SqlFormat) -> bool {
        self.identity_matches(other)
            && self.applies_to(format)
            && other.applies_to(format)
            && name_sets_match(&self.events, &other.events)
            && self.timing == other.timing
            && self.for_each == other.for_each
            && names_match(&self.function, &other.function)
    }
}

/// View body for one SQL format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub sql_format: SqlFormat,
    pub text: String,
}

impl Identity for ViewQuery {
    fn identity_matches(&self, other: &Self) -> bool {
        self.sql_format == other.sql_format
    }
}

/// A view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: String,

    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub queries: Vec<ViewQuery>,

    /// Names of views this view must be created after
    #[serde(default)]
    pub depends_on_views: Vec<String>,

    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl View {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, sql_format: SqlFormat, text: impl Into<String>) -> Self {
        self.queries.push(ViewQuery {
            sql_format,
            text: text.into(),
        });
        self
    }

    pub fn query_for(&self, format: SqlFormat) -> Option<&str> {
        self.queries
            .iter()
            .find(|q| q.sql_format == format)
            .map(|q| q.text.as_str())
    }
}

impl Identity for View {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

impl FormatEq for View {
    fn equals(&self, other: &Self, format: SqlFormat) -> bool {
        let queries_match = match (self.query_for(format), other.query_for(format)) {
            (Some(a), Some(b)) => a.trim() == b.trim(),
            (None, None) => true,
            _ => false,
        };

        self.identity_matches(other) && names_match(&self.owner, &other.owner) && queries_match
    }
}

/// Field of a composite type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeField {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: String,
}

/// Base type of a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainType {
    pub base_type: String,

    #[serde(default)]
    pub default: Option<String>,

    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

/// Named CHECK on a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConstraint {
    pub name: String,
    pub check: String,
}

/// A user-defined type
///
/// The payload fields are mutually exclusive and must agree with `kind`:
/// enums carry only `enum_values`, composites only `composite_fields`, and
/// domains only `domain_type` plus `domain_constraints`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,

    pub kind: TypeDefKind,

    #[serde(default)]
    pub enum_values: Vec<String>,

    #[serde(default)]
    pub composite_fields: Vec<CompositeField>,

    #[serde(default)]
    pub domain_type: Option<DomainType>,

    #[serde(default)]
    pub domain_constraints: Vec<DomainConstraint>,
}

impl TypeDef {
    pub fn enumeration<I>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            kind: TypeDefKind::Enum,
            enum_values: values.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn composite(name: impl Into<String>, fields: Vec<CompositeField>) -> Self {
        Self {
            name: name.into(),
            kind: TypeDefKind::Composite,
            composite_fields: fields,
            ..Self::default()
        }
    }

    pub fn domain(name: impl Into<String>, domain_type: DomainType) -> Self {
        Self {
            name: name.into(),
            kind: TypeDefKind::Domain,
            domain_type: Some(domain_type),
            ..Self::default()
        }
    }

    /// Names of payload fields populated but not allowed for `kind`
    pub fn stray_payload(&self) -> Vec<&'static str> {
        let mut stray = Vec::new();
        if self.kind != TypeDefKind::Enum && !self.enum_values.is_empty() {
            stray.push("enum values");
        }
        if self.kind != TypeDefKind::Composite && !self.composite_fields.is_empty() {
            stray.push("composite fields");
        }
        if self.kind != TypeDefKind::Domain {
            if self.domain_type.is_some() {
                stray.push("domain type");
            }
            if !self.domain_constraints.is_empty() {
                stray.push("domain constraints");
            }
        }
        stray
    }
}

impl Identity for TypeDef {
    fn identity_matches(&self, other: &Self) -> bool {
        names_match(&self.name, &other.name)
    }
}

impl FormatEq for TypeDef {
    fn equals(&self, other: &Self, _format: SqlFormat) -> bool {
        if !self.identity_matches(other) || self.kind != other.kind {
            return false;
        }
        match self.kind {
            TypeDefKind::Enum => self.enum_values == other.enum_values,
            TypeDefKind::Composite => {
                self.composite_fields.len() == other.composite_fields.len()
                    && self
                        .composite_fields
                        .iter()
                        .zip(&other.composite_fields)
                        .all(|(a, b)| {
                            names_match(&a.name, &b.name) && names_match(&a.data_type, &b.data_type)
                        })
            }
            TypeDefKind::Domain => {
                self.domain_type == other.domain_type
                    && self.domain_constraints == other.domain_constraints
            }
        }
    }
}
