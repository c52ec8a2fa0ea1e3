//! Context generation from shapes
//!
//! `ContextBuilder` is a shape visitor that turns each declared shape into an
//! alias table. Triple constraints become entries; what a constraint's value
//! expression resolves to decides the value kind:
//! - datatype or literal node constraints give literal properties
//! - anything else gives object properties, carrying the label of the
//!   referenced shape so nested proxies can resolve it later
//!
//! Recursive references hit the traversal memo and come back as
//! `Fragment::Pending`, which is read as "an object of that shape".

use super::schema::{
    EachOf, NodeConstraint, NodeKind, ObjectValue, OneOf, Schema, Shape, ShapeAnd, ShapeExprRef,
    ShapeExternal, ShapeNot, ShapeOr, TripleConstraint, ValueSetValue,
};
use super::traverser::{traverse_shape, ShapeNodeKind, ShapeVisitor, Traversal};
use super::SchemaResult;
use crate::proxy::{Cardinality, ContextEntry, LdoContext, ShapeContext, ValueKind};
use crate::rdf::namespace::{local_name, rdf, rdfs};
use crate::rdf::{NamedNode, RdfPredicate};
use tracing::{debug, info};

/// What a visited node contributes
#[derive(Debug, Clone)]
pub enum Fragment {
    /// Node still being visited
    Pending,
    /// Properties of a shape or triple expression
    Entries(Vec<(String, ContextEntry)>),
    /// Description of a value expression
    Value {
        kind: ValueKind,
        datatype: Option<String>,
    },
}

impl Fragment {
    fn entries(self) -> Vec<(String, ContextEntry)> {
        match self {
            Fragment::Entries(entries) => entries,
            _ => Vec::new(),
        }
    }

    fn object() -> Self {
        Fragment::Value {
            kind: ValueKind::Object,
            datatype: None,
        }
    }
}

/// Per-build state
#[derive(Debug, Default)]
pub struct BuildState {
    /// Label of the declared shape being built
    root: String,
    /// Tables for anonymous inline shapes, keyed by synthetic label
    anonymous: Vec<(String, Vec<(String, ContextEntry)>)>,
}

/// Visitor deriving alias tables from a schema
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build one alias table per declared shape
    pub fn build(&self, schema: &Schema) -> SchemaResult<LdoContext> {
        let mut context = LdoContext::new();
        let mut state = BuildState::default();

        for label in schema.shape_labels() {
            state.root = label.to_string();
            let fragment = traverse_shape(schema, self, label, &mut state)?;
            if let Fragment::Entries(entries) = fragment {
                context.insert_shape(label, table(entries));
            }
        }
        for (label, entries) in state.anonymous.drain(..) {
            if context.shape(&label).is_none() {
                context.insert_shape(label, table(entries));
            }
        }

        info!("Built context for {} shapes", context.len());
        Ok(context)
    }

    /// Alias of a triple constraint: its `rdfs:label` annotation, else the
    /// predicate's local name
    fn alias(constraint: &TripleConstraint) -> String {
        match constraint.annotation(rdfs::LABEL.as_str()) {
            Some(label) => label.as_str().to_string(),
            None => local_name(&constraint.predicate).to_string(),
        }
    }

    fn is_list(constraint: &TripleConstraint) -> bool {
        matches!(
            constraint.annotation(rdf::TYPE.as_str()),
            Some(ObjectValue::Iri(iri)) if iri == rdf::LIST.as_str()
        )
    }
}

/// Turn collected entries into a table, suffixing colliding aliases
fn table(entries: Vec<(String, ContextEntry)>) -> ShapeContext {
    let mut context = ShapeContext::new();
    for (alias, entry) in entries {
        if let Some(existing) = context.get(&alias) {
            if existing.predicate == entry.predicate && existing.inverse == entry.inverse {
                continue;
            }
        }
        let mut candidate = alias.clone();
        let mut n = 1;
        while context.contains(&candidate) {
            n += 1;
            candidate = format!("{}{}", alias, n);
        }
        context.insert(candidate, entry);
    }
    context
}

fn literal_value(values: &[ValueSetValue]) -> bool {
    !values.is_empty()
        && values.iter().all(|v| {
            matches!(
                v,
                ValueSetValue::Literal(_)
                    | ValueSetValue::Stem(super::schema::StemValue::LiteralStem { .. })
                    | ValueSetValue::Stem(super::schema::StemValue::Language { .. })
                    | ValueSetValue::Stem(super::schema::StemValue::LanguageStem { .. })
            )
        })
}

impl ShapeVisitor for ContextBuilder {
    type Output = Fragment;
    type Context = BuildState;

    fn placeholder(&self, _kind: ShapeNodeKind) -> Fragment {
        Fragment::Pending
    }

    fn visit_shape<'a>(
        &self,
        shape: &'a Shape,
        ctx: &mut BuildState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        match &shape.expression {
            Some(expression) => Ok(Fragment::Entries(walk.triple_expr(expression, ctx)?.entries())),
            None => Ok(Fragment::Entries(Vec::new())),
        }
    }

    fn visit_node_constraint<'a>(
        &self,
        constraint: &'a NodeConstraint,
        _ctx: &mut BuildState,
        _walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        let literal = constraint.datatype.is_some()
            || constraint.node_kind == Some(NodeKind::Literal)
            || constraint.values.as_deref().is_some_and(literal_value);
        Ok(Fragment::Value {
            kind: if literal {
                ValueKind::Literal
            } else {
                ValueKind::Object
            },
            datatype: constraint.datatype.clone(),
        })
    }

    /// Conjunction: the union of every member's properties
    fn visit_shape_and<'a>(
        &self,
        and: &'a ShapeAnd,
        ctx: &mut BuildState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        let mut entries = Vec::new();
        let mut value = None;
        for expr in &and.shape_exprs {
            match walk.shape_expr(expr, ctx)? {
                Fragment::Entries(more) => entries.extend(more),
                v @ Fragment::Value { .. } => value = Some(v),
                Fragment::Pending => {}
            }
        }
        match value {
            // a node constraint conjoined with no shape describes a value
            Some(v) if entries.is_empty() => Ok(v),
            _ => Ok(Fragment::Entries(entries)),
        }
    }

    /// Disjunction: a literal only if every branch is literal
    fn visit_shape_or<'a>(
        &self,
        or: &'a ShapeOr,
        ctx: &mut BuildState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        let mut datatypes = Vec::new();
        let mut all_literal = !or.shape_exprs.is_empty();
        for expr in &or.shape_exprs {
            match walk.shape_expr(expr, ctx)? {
                Fragment::Value {
                    kind: ValueKind::Literal,
                    datatype,
                } => datatypes.push(datatype),
                _ => all_literal = false,
            }
        }
        if !all_literal {
            return Ok(Fragment::object());
        }
        let datatype = match datatypes.split_first() {
            Some((first, rest)) if rest.iter().all(|d| d == first) => first.clone(),
            _ => None,
        };
        Ok(Fragment::Value {
            kind: ValueKind::Literal,
            datatype,
        })
    }

    fn visit_shape_not<'a>(
        &self,
        not: &'a ShapeNot,
        ctx: &mut BuildState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        walk.shape_expr(&not.shape_expr, ctx)?;
        Ok(Fragment::object())
    }

    fn visit_shape_external<'a>(
        &self,
        _external: &'a ShapeExternal,
        _ctx: &mut BuildState,
        _walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        Ok(Fragment::object())
    }

    fn visit_each_of<'a>(
        &self,
        each_of: &'a EachOf,
        ctx: &mut BuildState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        let mut entries = Vec::new();
        for expr in &each_of.expressions {
            entries.extend(walk.triple_expr(expr, ctx)?.entries());
        }
        Ok(Fragment::Entries(entries))
    }

    /// Alternatives are all exposed; which one holds is for validation
    fn visit_one_of<'a>(
        &self,
        one_of: &'a OneOf,
        ctx: &mut BuildState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        let mut entries = Vec::new();
        for expr in &one_of.expressions {
            entries.extend(walk.triple_expr(expr, ctx)?.entries());
        }
        Ok(Fragment::Entries(entries))
    }

    fn visit_triple_constraint<'a>(
        &self,
        constraint: &'a TripleConstraint,
        ctx: &mut BuildState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Fragment> {
        let alias = Self::alias(constraint);
        let predicate = RdfPredicate::new(&constraint.predicate)?;

        let (kind, datatype, shape) = match &constraint.value_expr {
            None => (ValueKind::Object, None, None),
            Some(ShapeExprRef::Label(label)) => match walk.shape_label(label, ctx)? {
                Fragment::Value { kind, datatype } => (kind, datatype, None),
                Fragment::Entries(_) | Fragment::Pending => {
                    (ValueKind::Object, None, Some(label.clone()))
                }
            },
            Some(expr @ ShapeExprRef::Inline(_)) => match walk.shape_expr(expr, ctx)? {
                Fragment::Value { kind, datatype } => (kind, datatype, None),
                Fragment::Entries(entries) => {
                    let synthetic = format!("{}/{}", ctx.root, alias);
                    debug!("Registering inline shape as {}", synthetic);
                    ctx.anonymous.push((synthetic.clone(), entries));
                    (ValueKind::Object, None, Some(synthetic))
                }
                Fragment::Pending => (ValueKind::Object, None, None),
            },
        };

        let mut entry = match kind {
            ValueKind::Literal => ContextEntry::literal(predicate),
            ValueKind::Object => ContextEntry::object(predicate),
        };
        if let Some(datatype) = datatype {
            entry = entry.with_datatype(NamedNode::new(&datatype)?);
        }
        if let Some(shape) = shape {
            entry = entry.with_shape(shape);
        }
        if constraint.inverse {
            entry = entry.inverted();
        }
        let cardinality = if Self::is_list(constraint) {
            Cardinality::List
        } else {
            match constraint.bounds() {
                (_, Some(max)) if max <= 1 => Cardinality::Single,
                _ => Cardinality::Set,
            }
        };
        entry = entry.with_cardinality(cardinality);

        Ok(Fragment::Entries(vec![(alias, entry)]))
    }
}
