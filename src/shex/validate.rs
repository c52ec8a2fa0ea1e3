//! Shape validation
//!
//! `ShapeValidator` is the second visitor over the shape traversal. One
//! top-level traversal checks one focus node; the memo is therefore only
//! reused for the same focus. Value nodes reached through a triple
//! constraint are checked by a fresh traversal with the value as focus.
//!
//! Recursion through other nodes is coinductive: a (shape, node) pair that
//! is already being checked further up is assumed to conform.
//!
//! Triple expressions are matched greedily by predicate; there is no
//! backtracking partition of triples between constraints.

use super::schema::{
    EachOf, NodeConstraint, NodeKind, OneOf, Schema, Shape, ShapeAnd, ShapeExprRef,
    ShapeExternal, ShapeNot, ShapeOr, StemValue, TripleConstraint, ValueSetValue,
};
use super::traverser::{traverse_expr, traverse_shape, ShapeNodeKind, ShapeVisitor, Traversal};
use super::{SchemaError, SchemaResult};
use crate::proxy::{is_supported, to_native};
use crate::rdf::namespace::xsd;
use crate::rdf::{QuadPattern, QuadStore, RdfObject, RdfPredicate, RdfSubject};
use indexmap::IndexSet;
use regex::RegexBuilder;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Outcome of checking a node against a shape expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub conforms: bool,
    /// Why the node does not conform; empty when it does
    pub reasons: Vec<String>,
    /// Triples consumed by a triple expression
    matched: usize,
}

impl Verdict {
    pub fn accept() -> Self {
        Self {
            conforms: true,
            reasons: Vec::new(),
            matched: 0,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            conforms: false,
            reasons: vec![reason.into()],
            matched: 0,
        }
    }

    fn matched(mut self, matched: usize) -> Self {
        self.matched = matched;
        self
    }

    /// Conjunction, keeping every reason
    fn and(mut self, other: Verdict) -> Self {
        self.conforms &= other.conforms;
        self.reasons.extend(other.reasons);
        self.matched += other.matched;
        self
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conforms {
            write!(f, "conforms")
        } else {
            write!(f, "does not conform: {}", self.reasons.join("; "))
        }
    }
}

/// State of one validation run
#[derive(Debug)]
pub struct ValidationState {
    focus: RdfObject,
    /// (shape label, node) pairs currently being checked
    in_progress: HashSet<(String, RdfObject)>,
    /// `extra` predicates of the innermost shape
    extra: Vec<String>,
}

/// Validates nodes of a dataset against a schema
pub struct ShapeValidator<'d> {
    schema: &'d Schema,
    data: &'d QuadStore,
}

impl<'d> ShapeValidator<'d> {
    pub fn new(schema: &'d Schema, data: &'d QuadStore) -> Self {
        Self { schema, data }
    }

    /// Check `focus` against the shape declared as `shape`
    pub fn validate(&self, shape: &str, focus: impl Into<RdfObject>) -> SchemaResult<Verdict> {
        let focus = focus.into();
        let mut state = ValidationState {
            focus: focus.clone(),
            in_progress: HashSet::from([(shape.to_string(), focus.clone())]),
            extra: Vec::new(),
        };
        let verdict = traverse_shape(self.schema, self, shape, &mut state)?;
        debug!("Validated {} against {}: {}", focus, shape, verdict);
        Ok(verdict)
    }

    /// Check a value node against a value expression with a fresh traversal
    fn check_value(
        &self,
        schema: &Schema,
        expr: &ShapeExprRef,
        value: &RdfObject,
        ctx: &mut ValidationState,
    ) -> SchemaResult<Verdict> {
        let key = match expr {
            ShapeExprRef::Label(label) => {
                let key = (label.clone(), value.clone());
                if ctx.in_progress.contains(&key) {
                    return Ok(Verdict::accept());
                }
                ctx.in_progress.insert(key.clone());
                Some(key)
            }
            ShapeExprRef::Inline(_) => None,
        };

        let focus = std::mem::replace(&mut ctx.focus, value.clone());
        let extra = std::mem::take(&mut ctx.extra);
        let result = traverse_expr(schema, self, expr, ctx);
        ctx.focus = focus;
        ctx.extra = extra;

        if let Some(key) = key {
            ctx.in_progress.remove(&key);
        }
        result
    }

    /// Values of `predicate` around `focus`, in the requested direction
    fn neighbours(&self, focus: &RdfObject, predicate: &RdfPredicate, inverse: bool) -> Vec<RdfObject> {
        let pattern = QuadPattern::any().predicate(predicate.clone());
        let values: IndexSet<RdfObject> = if inverse {
            self.data
                .query(&pattern.object(focus.clone()))
                .into_iter()
                .map(|q| q.subject.into())
                .collect()
        } else {
            match RdfSubject::try_from(focus.clone()) {
                Ok(subject) => self
                    .data
                    .query(&pattern.subject(subject))
                    .into_iter()
                    .map(|q| q.object)
                    .collect(),
                Err(_) => IndexSet::new(),
            }
        };
        values.into_iter().collect()
    }
}

/// Lexical form a facet applies to
fn lexical(term: &RdfObject) -> &str {
    match term {
        RdfObject::NamedNode(n) => n.as_str(),
        RdfObject::BlankNode(b) => b.as_str(),
        RdfObject::Literal(l) => l.value(),
    }
}

fn value_set_contains(values: &[ValueSetValue], term: &RdfObject) -> bool {
    values.iter().any(|value| match (value, term) {
        (ValueSetValue::Iri(iri), RdfObject::NamedNode(n)) => n.as_str() == iri,
        (ValueSetValue::Literal(expected), RdfObject::Literal(l)) => {
            let datatype = expected.datatype.as_deref().unwrap_or(xsd::STRING.as_str());
            l.value() == expected.value
                && match (&expected.language, l.language()) {
                    (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
                    (None, None) => l.datatype_iri() == datatype,
                    _ => false,
                }
        }
        (ValueSetValue::Stem(StemValue::IriStem { stem }), RdfObject::NamedNode(n)) => {
            n.as_str().starts_with(stem.as_str())
        }
        (ValueSetValue::Stem(StemValue::LiteralStem { stem }), RdfObject::Literal(l)) => {
            l.value().starts_with(stem.as_str())
        }
        (ValueSetValue::Stem(StemValue::Language { language_tag }), RdfObject::Literal(l)) => l
            .language()
            .is_some_and(|tag| tag.eq_ignore_ascii_case(language_tag)),
        (ValueSetValue::Stem(StemValue::LanguageStem { stem }), RdfObject::Literal(l)) => l
            .language()
            .is_some_and(|tag| tag.to_ascii_lowercase().starts_with(&stem.to_ascii_lowercase())),
        _ => false,
    })
}

/// Check one node against a node constraint
fn check_node(constraint: &NodeConstraint, term: &RdfObject) -> SchemaResult<Verdict> {
    let mut verdict = Verdict::accept();

    if let Some(kind) = constraint.node_kind {
        let ok = match kind {
            NodeKind::Iri => term.is_named_node(),
            NodeKind::Bnode => term.is_blank_node(),
            NodeKind::Nonliteral => !term.is_literal(),
            NodeKind::Literal => term.is_literal(),
        };
        if !ok {
            verdict = verdict.and(Verdict::reject(format!("{} is not of node kind {:?}", term, kind)));
        }
    }

    if let Some(datatype) = &constraint.datatype {
        match term.as_literal() {
            Some(l) if l.datatype_iri() == datatype => {
                if is_supported(datatype) && to_native(l, true).is_err() {
                    verdict = verdict.and(Verdict::reject(format!("{} is not a valid {}", term, datatype)));
                }
            }
            _ => {
                verdict = verdict.and(Verdict::reject(format!("{} does not have datatype {}", term, datatype)));
            }
        }
    }

    if let Some(values) = &constraint.values {
        if !value_set_contains(values, term) {
            verdict = verdict.and(Verdict::reject(format!("{} is not in the value set", term)));
        }
    }

    let text = lexical(term);
    if let Some(pattern) = &constraint.pattern {
        let flags = constraint.flags.as_deref().unwrap_or("");
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .ignore_whitespace(flags.contains('x'))
            .build()
            .map_err(|e| SchemaError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        if !regex.is_match(text) {
            verdict = verdict.and(Verdict::reject(format!("{} does not match /{}/", term, pattern)));
        }
    }

    let length = text.chars().count();
    let length_ok = constraint.length.map_or(true, |n| length == n)
        && constraint.min_length.map_or(true, |n| length >= n)
        && constraint.max_length.map_or(true, |n| length <= n);
    if !length_ok {
        verdict = verdict.and(Verdict::reject(format!("{} has length {}", term, length)));
    }

    let numeric = [
        constraint.min_inclusive,
        constraint.max_inclusive,
        constraint.min_exclusive,
        constraint.max_exclusive,
    ];
    if numeric.iter().any(Option::is_some) {
        match term.as_literal().and_then(|l| l.value().trim().parse::<f64>().ok()) {
            Some(n) => {
                let ok = constraint.min_inclusive.map_or(true, |m| n >= m)
                    && constraint.max_inclusive.map_or(true, |m| n <= m)
                    && constraint.min_exclusive.map_or(true, |m| n > m)
                    && constraint.max_exclusive.map_or(true, |m| n < m);
                if !ok {
                    verdict = verdict.and(Verdict::reject(format!("{} is out of range", term)));
                }
            }
            None => {
                verdict = verdict.and(Verdict::reject(format!("{} is not numeric", term)));
            }
        }
    }

    Ok(verdict)
}

impl ShapeVisitor for ShapeValidator<'_> {
    type Output = Verdict;
    type Context = ValidationState;

    fn placeholder(&self, _kind: ShapeNodeKind) -> Verdict {
        Verdict::accept()
    }

    fn visit_shape<'a>(
        &self,
        shape: &'a Shape,
        ctx: &mut ValidationState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        let extra = std::mem::replace(&mut ctx.extra, shape.extra.clone());

        let mut verdict = match &shape.expression {
            Some(expression) => walk.triple_expr(expression, ctx)?,
            None => Verdict::accept(),
        };

        if shape.closed {
            let mentioned = match &shape.expression {
                Some(expression) => walk.schema().predicates_of(expression)?,
                None => Vec::new(),
            };
            if let Ok(subject) = RdfSubject::try_from(ctx.focus.clone()) {
                for quad in self.data.query(&QuadPattern::any().subject(subject)) {
                    let predicate = quad.predicate.as_str();
                    let allowed = mentioned
                        .iter()
                        .any(|(p, inverse)| !inverse && p == predicate)
                        || ctx.extra.iter().any(|p| p == predicate);
                    if !allowed {
                        verdict = verdict.and(Verdict::reject(format!(
                            "closed shape does not allow {}",
                            predicate
                        )));
                    }
                }
            }
        }

        ctx.extra = extra;
        Ok(verdict)
    }

    fn visit_node_constraint<'a>(
        &self,
        constraint: &'a NodeConstraint,
        ctx: &mut ValidationState,
        _walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        check_node(constraint, &ctx.focus)
    }

    fn visit_shape_and<'a>(
        &self,
        and: &'a ShapeAnd,
        ctx: &mut ValidationState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        let mut verdict = Verdict::accept();
        for expr in &and.shape_exprs {
            verdict = verdict.and(walk.shape_expr(expr, ctx)?);
        }
        Ok(verdict)
    }

    fn visit_shape_or<'a>(
        &self,
        or: &'a ShapeOr,
        ctx: &mut ValidationState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        let mut reasons = Vec::new();
        for expr in &or.shape_exprs {
            let verdict = walk.shape_expr(expr, ctx)?;
            if verdict.conforms {
                return Ok(Verdict::accept());
            }
            reasons.extend(verdict.reasons);
        }
        Ok(Verdict {
            conforms: false,
            reasons,
            matched: 0,
        })
    }

    fn visit_shape_not<'a>(
        &self,
        not: &'a ShapeNot,
        ctx: &mut ValidationState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        if walk.shape_expr(&not.shape_expr, ctx)?.conforms {
            Ok(Verdict::reject(format!("{} conforms to a negated shape", ctx.focus)))
        } else {
            Ok(Verdict::accept())
        }
    }

    fn visit_shape_external<'a>(
        &self,
        external: &'a ShapeExternal,
        _ctx: &mut ValidationState,
        _walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        debug!("Assuming external shape {:?} holds", external.id);
        Ok(Verdict::accept())
    }

    fn visit_each_of<'a>(
        &self,
        each_of: &'a EachOf,
        ctx: &mut ValidationState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        let mut verdict = Verdict::accept();
        for expr in &each_of.expressions {
            verdict = verdict.and(walk.triple_expr(expr, ctx)?);
        }
        // an optional group with nothing present is satisfied
        let (min, _) = super::cardinality(each_of.min, each_of.max);
        if !verdict.conforms && min == 0 && verdict.matched == 0 {
            return Ok(Verdict::accept());
        }
        Ok(verdict)
    }

    fn visit_one_of<'a>(
        &self,
        one_of: &'a OneOf,
        ctx: &mut ValidationState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        let mut outcomes = Vec::with_capacity(one_of.expressions.len());
        for expr in &one_of.expressions {
            outcomes.push(walk.triple_expr(expr, ctx)?);
        }

        let used: Vec<&Verdict> = outcomes.iter().filter(|v| v.conforms && v.matched > 0).collect();
        match used.len() {
            1 => Ok(used[0].clone()),
            0 if outcomes.iter().any(|v| v.conforms) => Ok(Verdict::accept()),
            0 => Ok(Verdict {
                conforms: false,
                reasons: outcomes.into_iter().flat_map(|v| v.reasons).collect(),
                matched: 0,
            }),
            n => Ok(Verdict::reject(format!(
                "{} alternatives of a OneOf matched {}",
                n, ctx.focus
            ))),
        }
    }

    fn visit_triple_constraint<'a>(
        &self,
        constraint: &'a TripleConstraint,
        ctx: &mut ValidationState,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Verdict> {
        let predicate = RdfPredicate::new(&constraint.predicate)?;
        let focus = ctx.focus.clone();
        let values = self.neighbours(&focus, &predicate, constraint.inverse);

        let mut matched = 0;
        let mut failures = Vec::new();
        for value in &values {
            let verdict = match &constraint.value_expr {
                Some(expr) => self.check_value(walk.schema(), expr, value, ctx)?,
                None => Verdict::accept(),
            };
            if verdict.conforms {
                matched += 1;
            } else {
                failures.push((value, verdict));
            }
        }

        let mut verdict = Verdict::accept();
        let (min, max) = constraint.bounds();
        if matched < min {
            verdict = verdict.and(Verdict::reject(format!(
                "{} needs at least {} {} values, found {}",
                focus, min, constraint.predicate, matched
            )));
        }
        if let Some(max) = max {
            if matched > max {
                verdict = verdict.and(Verdict::reject(format!(
                    "{} allows at most {} {} values, found {}",
                    focus, max, constraint.predicate, matched
                )));
            }
        }
        if !ctx.extra.contains(&constraint.predicate) {
            for (value, failure) in failures {
                verdict = verdict.and(Verdict::reject(format!(
                    "{} value {} does not conform: {}",
                    constraint.predicate,
                    value,
                    failure.reasons.join("; ")
                )));
            }
        }
        Ok(verdict.matched(matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{BlankNode, Literal, NamedNode, Quad};

    const SCHEMA: &str = r#"{
      "type": "Schema",
      "shapes": [
        {
          "type": "Shape",
          "id": "http://example.org/Person",
          "closed": true,
          "expression": {
            "type": "EachOf",
            "expressions": [
              {
                "type": "TripleConstraint",
                "predicate": "http://xmlns.com/foaf/0.1/name",
                "valueExpr": { "type": "NodeConstraint", "datatype": "http://www.w3.org/2001/XMLSchema#string", "minlength": 1 }
              },
              {
                "type": "TripleConstraint",
                "predicate": "http://xmlns.com/foaf/0.1/age",
                "valueExpr": { "type": "NodeConstraint", "datatype": "http://www.w3.org/2001/XMLSchema#integer", "mininclusive": 0 },
                "min": 0, "max": 1
              },
              {
                "type": "TripleConstraint",
                "predicate": "http://xmlns.com/foaf/0.1/knows",
                "valueExpr": "http://example.org/Person",
                "min": 0, "max": -1
              }
            ]
          }
        },
        {
          "type": "Shape",
          "id": "http://example.org/Contact",
          "expression": {
            "type": "OneOf",
            "expressions": [
              { "type": "TripleConstraint", "predicate": "http://example.org/email",
                "valueExpr": { "type": "NodeConstraint", "pattern": "^MAILTO:", "flags": "i" } },
              { "type": "TripleConstraint", "predicate": "http://example.org/phone" }
            ]
          }
        },
        {
          "type": "NodeConstraint",
          "id": "http://example.org/Colour",
          "values": ["http://example.org/red", { "value": "blue" }, { "type": "IriStem", "stem": "http://colours.example/" }]
        }
      ]
    }"#;

    fn foaf(local: &str) -> RdfPredicate {
        RdfPredicate::new(&format!("http://xmlns.com/foaf/0.1/{}", local)).unwrap()
    }

    fn node(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    fn person(store: &mut QuadStore, iri: &str, name: &str) -> NamedNode {
        let subject = node(iri);
        store.insert(Quad::in_default_graph(subject.clone(), foaf("name"), Literal::new_simple_literal(name)));
        subject
    }

    #[test]
    fn test_conforming_recursive_data() {
        let schema = Schema::from_json(SCHEMA).unwrap();
        let mut store = QuadStore::new();
        let alice = person(&mut store, "http://example.org/alice", "Alice");
        let bob = person(&mut store, "http://example.org/bob", "Bob");
        // mutual knows: coinduction keeps this finite
        store.insert(Quad::in_default_graph(alice.clone(), foaf("knows"), bob.clone()));
        store.insert(Quad::in_default_graph(bob.clone(), foaf("knows"), alice.clone()));

        let verdict = ShapeValidator::new(&schema, &store)
            .validate("http://example.org/Person", alice)
            .unwrap();
        assert!(verdict.conforms, "{}", verdict);
    }

    #[test]
    fn test_cardinality_and_datatype_failures() {
        let schema = Schema::from_json(SCHEMA).unwrap();
        let mut store = QuadStore::new();
        let carol = node("http://example.org/carol");
        store.insert(Quad::in_default_graph(carol.clone(), foaf("age"), Literal::new_typed_literal("-3", xsd::INTEGER.into())));

        let verdict = ShapeValidator::new(&schema, &store)
            .validate("http://example.org/Person", carol)
            .unwrap();
        assert!(!verdict.conforms);
        assert_eq!(verdict.reasons.len(), 2);
    }

    #[test]
    fn test_closed_shape_rejects_unknown_predicate() {
        let schema = Schema::from_json(SCHEMA).unwrap();
        let mut store = QuadStore::new();
        let dan = person(&mut store, "http://example.org/dan", "Dan");
        store.insert(Quad::in_default_graph(dan.clone(), foaf("nick"), Literal::new_simple_literal("D")));

        let verdict = ShapeValidator::new(&schema, &store)
            .validate("http://example.org/Person", dan)
            .unwrap();
        assert!(!verdict.conforms);
        assert!(verdict.reasons[0].contains("closed"));
    }

    #[test]
    fn test_nested_failure_is_reported() {
        let schema = Schema::from_json(SCHEMA).unwrap();
        let mut store = QuadStore::new();
        let erin = person(&mut store, "http://example.org/erin", "Erin");
        let ghost = node("http://example.org/ghost");
        store.insert(Quad::in_default_graph(erin.clone(), foaf("knows"), ghost));

        let verdict = ShapeValidator::new(&schema, &store)
            .validate("http://example.org/Person", erin)
            .unwrap();
        assert!(!verdict.conforms);
        assert!(verdict.reasons[0].contains("ghost"));
    }

    #[test]
    fn test_closed_shape_sharing_a_labelled_expression() {
        let schema = Schema::from_json(
            r#"{
              "type": "Schema",
              "shapes": [
                { "type": "Shape", "id": "http://example.org/B",
                  "expression": { "type": "TripleConstraint", "id": "http://example.org/t1",
                                  "predicate": "http://example.org/p" } },
                { "type": "Shape", "id": "http://example.org/A", "closed": true,
                  "expression": "http://example.org/t1" },
                { "type": "ShapeAnd", "id": "http://example.org/Root",
                  "shapeExprs": ["http://example.org/B", "http://example.org/A"] }
              ]
            }"#,
        )
        .unwrap();
        let subject = node("http://example.org/x");
        let mut store = QuadStore::new();
        store.insert(Quad::in_default_graph(
            subject.clone(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            Literal::new_simple_literal("v"),
        ));

        let validator = ShapeValidator::new(&schema, &store);
        let alone = validator.validate("http://example.org/A", subject.clone()).unwrap();
        assert!(alone.conforms, "{}", alone);
        // B visits t1 first; A must still count its predicate as mentioned
        let both = validator.validate("http://example.org/Root", subject).unwrap();
        assert!(both.conforms, "{}", both);
    }

    #[test]
    fn test_one_of() {
        let schema = Schema::from_json(SCHEMA).unwrap();
        let email = RdfPredicate::new("http://example.org/email").unwrap();
        let phone = RdfPredicate::new("http://example.org/phone").unwrap();
        let subject = BlankNode::new();

        let mut store = QuadStore::new();
        store.insert(Quad::in_default_graph(subject.clone(), email, node("mailto:a@example.org")));
        let validator = ShapeValidator::new(&schema, &store);
        assert!(validator.validate("http://example.org/Contact", subject.clone()).unwrap().conforms);

        store.insert(Quad::in_default_graph(subject.clone(), phone, Literal::new_simple_literal("555")));
        let validator = ShapeValidator::new(&schema, &store);
        assert!(!validator.validate("http://example.org/Contact", subject).unwrap().conforms);
    }

    #[test]
    fn test_value_set() {
        let schema = Schema::from_json(SCHEMA).unwrap();
        let store = QuadStore::new();
        let validator = ShapeValidator::new(&schema, &store);
        let colour = "http://example.org/Colour";

        assert!(validator.validate(colour, node("http://example.org/red")).unwrap().conforms);
        assert!(validator.validate(colour, Literal::new_simple_literal("blue")).unwrap().conforms);
        assert!(validator.validate(colour, node("http://colours.example/teal")).unwrap().conforms);
        assert!(!validator.validate(colour, node("http://example.org/green")).unwrap().conforms);
    }

    #[test]
    fn test_invalid_pattern() {
        let schema = Schema::from_json(
            r#"{"type": "Schema", "shapes": [{"type": "NodeConstraint", "id": "http://example.org/Bad", "pattern": "("}]}"#,
        )
        .unwrap();
        let store = QuadStore::new();
        let result = ShapeValidator::new(&schema, &store)
            .validate("http://example.org/Bad", Literal::new_simple_literal("x"));
        assert!(matches!(result, Err(SchemaError::InvalidPattern { .. })));
    }
}
