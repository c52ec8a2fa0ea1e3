//! ShExJ schema model
//!
//! Serde types for the JSON encoding of shape expressions. Shape and triple
//! expressions may be given inline or as a label referring to a declaration
//! elsewhere in the schema, which is how recursive shapes are written.

use serde::{Deserialize, Serialize};
use super::{SchemaError, SchemaResult};

/// A ShExJ schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<ShapeExprRef>,
    #[serde(default)]
    pub shapes: Vec<ShapeExpr>,
}

impl Schema {
    /// Parse a ShExJ document
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a schema from an already-parsed JSON value
    pub fn from_value(value: serde_json::Value) -> SchemaResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Labels of every declared shape, in declaration order
    pub fn shape_labels(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().filter_map(|s| s.id())
    }

    /// Resolve a shape label to the expression it declares.
    ///
    /// `ShapeDecl` wrappers are unwrapped, so the returned expression is the
    /// node a traversal visits and memoizes.
    pub fn resolve_shape(&self, label: &str) -> SchemaResult<&ShapeExpr> {
        self.shapes
            .iter()
            .find(|s| s.id() == Some(label))
            .map(ShapeExpr::unwrap_decl)
            .ok_or_else(|| SchemaError::UnresolvedShape(label.to_string()))
    }

    /// Resolve a triple expression label by searching every shape
    pub fn resolve_triple_expr(&self, label: &str) -> SchemaResult<&TripleExpr> {
        self.shapes
            .iter()
            .find_map(|s| s.find_triple_expr(label))
            .ok_or_else(|| SchemaError::UnresolvedTripleExpr(label.to_string()))
    }

    /// Predicates a triple expression constrains, with their direction.
    ///
    /// Labelled sub-expressions are resolved, each at most once.
    pub fn predicates_of(&self, expr: &TripleExprRef) -> SchemaResult<Vec<(String, bool)>> {
        let mut predicates = Vec::new();
        let mut labels = Vec::new();
        self.collect_predicates(expr, &mut predicates, &mut labels)?;
        Ok(predicates)
    }

    fn collect_predicates<'a>(
        &'a self,
        expr: &'a TripleExprRef,
        predicates: &mut Vec<(String, bool)>,
        labels: &mut Vec<&'a str>,
    ) -> SchemaResult<()> {
        let expr = match expr {
            TripleExprRef::Inline(expr) => expr.as_ref(),
            TripleExprRef::Label(label) => {
                if labels.contains(&label.as_str()) {
                    return Ok(());
                }
                labels.push(label.as_str());
                self.resolve_triple_expr(label)?
            }
        };
        match expr {
            TripleExpr::EachOf(EachOf { expressions, .. })
            | TripleExpr::OneOf(OneOf { expressions, .. }) => {
                for expr in expressions {
                    self.collect_predicates(expr, predicates, labels)?;
                }
            }
            TripleExpr::TripleConstraint(t) => {
                let key = (t.predicate.clone(), t.inverse);
                if !predicates.contains(&key) {
                    predicates.push(key);
                }
            }
        }
        Ok(())
    }
}

/// Either a label pointing at a declared shape or an inline shape expression
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShapeExprRef {
    Label(String),
    Inline(Box<ShapeExpr>),
}

/// Either a label pointing at a triple expression or an inline one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TripleExprRef {
    Label(String),
    Inline(Box<TripleExpr>),
}

/// Shape expressions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeExpr {
    ShapeDecl(ShapeDecl),
    Shape(Shape),
    NodeConstraint(NodeConstraint),
    ShapeAnd(ShapeAnd),
    ShapeOr(ShapeOr),
    ShapeNot(ShapeNot),
    ShapeExternal(ShapeExternal),
}

impl ShapeExpr {
    /// Label of this expression, if it carries one
    pub fn id(&self) -> Option<&str> {
        match self {
            ShapeExpr::ShapeDecl(d) => Some(d.id.as_str()),
            ShapeExpr::Shape(s) => s.id.as_deref(),
            ShapeExpr::NodeConstraint(n) => n.id.as_deref(),
            ShapeExpr::ShapeAnd(a) => a.id.as_deref(),
            ShapeExpr::ShapeOr(o) => o.id.as_deref(),
            ShapeExpr::ShapeNot(n) => n.id.as_deref(),
            ShapeExpr::ShapeExternal(e) => e.id.as_deref(),
        }
    }

    /// The declared expression behind a `ShapeDecl`, or `self`
    pub fn unwrap_decl(&self) -> &ShapeExpr {
        match self {
            ShapeExpr::ShapeDecl(d) => d.shape_expr.unwrap_decl(),
            other => other,
        }
    }

    fn find_triple_expr(&self, label: &str) -> Option<&TripleExpr> {
        match self {
            ShapeExpr::ShapeDecl(d) => d.shape_expr.find_triple_expr(label),
            ShapeExpr::Shape(s) => match &s.expression {
                Some(TripleExprRef::Inline(expr)) => expr.find(label),
                _ => None,
            },
            ShapeExpr::ShapeAnd(ShapeAnd { shape_exprs, .. })
            | ShapeExpr::ShapeOr(ShapeOr { shape_exprs, .. }) => {
                shape_exprs.iter().find_map(|e| match e {
                    ShapeExprRef::Inline(expr) => expr.find_triple_expr(label),
                    ShapeExprRef::Label(_) => None,
                })
            }
            ShapeExpr::ShapeNot(n) => match &n.shape_expr {
                ShapeExprRef::Inline(expr) => expr.find_triple_expr(label),
                ShapeExprRef::Label(_) => None,
            },
            ShapeExpr::NodeConstraint(_) | ShapeExpr::ShapeExternal(_) => None,
        }
    }
}

/// Named declaration wrapping a shape expression (ShExJ 2.1)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeDecl {
    pub id: String,
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    pub shape_expr: Box<ShapeExpr>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<TripleExprRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

/// Kind of RDF node allowed by a node constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Iri,
    Bnode,
    Nonliteral,
    Literal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_kind: Option<NodeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<ValueSetValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(rename = "minlength", default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(rename = "maxlength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(rename = "mininclusive", default, skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<f64>,
    #[serde(rename = "maxinclusive", default, skip_serializing_if = "Option::is_none")]
    pub max_inclusive: Option<f64>,
    #[serde(rename = "minexclusive", default, skip_serializing_if = "Option::is_none")]
    pub min_exclusive: Option<f64>,
    #[serde(rename = "maxexclusive", default, skip_serializing_if = "Option::is_none")]
    pub max_exclusive: Option<f64>,
}

/// Entry of a node constraint's value set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSetValue {
    Iri(String),
    Stem(StemValue),
    Literal(ObjectLiteral),
}

/// Stem and language value-set entries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StemValue {
    IriStem { stem: String },
    LiteralStem { stem: String },
    LanguageStem { stem: String },
    Language {
        #[serde(rename = "languageTag")]
        language_tag: String,
    },
}

/// Literal as written in ShExJ (`type` carries the datatype IRI)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectLiteral {
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Object of an annotation: an IRI or a literal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ObjectValue {
    Iri(String),
    Literal(ObjectLiteral),
}

impl ObjectValue {
    /// IRI string or literal lexical form
    pub fn as_str(&self) -> &str {
        match self {
            ObjectValue::Iri(iri) => iri,
            ObjectValue::Literal(l) => &l.value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation {
    pub predicate: String,
    pub object: ObjectValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeAnd {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub shape_exprs: Vec<ShapeExprRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeOr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub shape_exprs: Vec<ShapeExprRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeNot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub shape_expr: ShapeExprRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShapeExternal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Triple expressions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TripleExpr {
    EachOf(EachOf),
    OneOf(OneOf),
    TripleConstraint(TripleConstraint),
}

impl TripleExpr {
    /// Label of this expression, if it carries one
    pub fn id(&self) -> Option<&str> {
        match self {
            TripleExpr::EachOf(e) => e.id.as_deref(),
            TripleExpr::OneOf(o) => o.id.as_deref(),
            TripleExpr::TripleConstraint(t) => t.id.as_deref(),
        }
    }

    fn find(&self, label: &str) -> Option<&TripleExpr> {
        if self.id() == Some(label) {
            return Some(self);
        }
        match self {
            TripleExpr::EachOf(EachOf { expressions, .. })
            | TripleExpr::OneOf(OneOf { expressions, .. }) => {
                expressions.iter().find_map(|e| match e {
                    TripleExprRef::Inline(expr) => expr.find(label),
                    TripleExprRef::Label(_) => None,
                })
            }
            TripleExpr::TripleConstraint(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EachOf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub expressions: Vec<TripleExprRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneOf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub expressions: Vec<TripleExprRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripleConstraint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub predicate: String,
    #[serde(default)]
    pub inverse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_expr: Option<ShapeExprRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

/// Unbounded `max` in ShExJ
pub const UNBOUNDED: i64 = -1;

/// Effective `(min, max)` of a cardinality; `None` max means unbounded.
/// ShEx defaults both bounds to 1.
pub fn cardinality(min: Option<i64>, max: Option<i64>) -> (usize, Option<usize>) {
    let min = min.unwrap_or(1).max(0) as usize;
    let max = match max.unwrap_or(1) {
        UNBOUNDED => None,
        n => Some(n.max(0) as usize),
    };
    (min, max)
}

impl TripleConstraint {
    /// Effective `(min, max)` bounds
    pub fn bounds(&self) -> (usize, Option<usize>) {
        cardinality(self.min, self.max)
    }

    /// Object of the first annotation with the given predicate
    pub fn annotation(&self, predicate: &str) -> Option<&ObjectValue> {
        self.annotations
            .iter()
            .find(|a| a.predicate == predicate)
            .map(|a| &a.object)
    }
}
