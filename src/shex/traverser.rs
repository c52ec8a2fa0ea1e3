//! Memoized shape traversal
//!
//! `Traversal` walks a shape-expression graph and dispatches each node to a
//! [`ShapeVisitor`] by kind. Within one top-level call every node is visited
//! at most once: the first visit stores the visitor's placeholder in the memo,
//! so a recursive reference back to a node still being visited gets the
//! placeholder instead of recursing again. That is what makes self- and
//! mutually-recursive shapes terminate.
//!
//! Node identity is the node's address inside the borrowed `Schema`.

use super::schema::{
    EachOf, NodeConstraint, OneOf, Schema, Shape, ShapeAnd, ShapeExpr, ShapeExprRef,
    ShapeExternal, ShapeNot, ShapeOr, TripleConstraint, TripleExpr, TripleExprRef,
};
use super::SchemaResult;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Node kinds a visitor dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeNodeKind {
    Shape,
    NodeConstraint,
    ShapeAnd,
    ShapeOr,
    ShapeNot,
    ShapeExternal,
    EachOf,
    OneOf,
    TripleConstraint,
}

impl fmt::Display for ShapeNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Table of per-kind visit functions.
///
/// A visitor is built once per schema and passed explicitly to every
/// traversal. `walk` re-enters the traversal for child nodes.
pub trait ShapeVisitor: Sized {
    /// What a visit produces
    type Output: Clone;
    /// Caller-provided state threaded through every visit
    type Context;

    /// Value returned for a node whose visit is still in progress
    fn placeholder(&self, kind: ShapeNodeKind) -> Self::Output;

    fn visit_shape<'a>(
        &self,
        shape: &'a Shape,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_node_constraint<'a>(
        &self,
        constraint: &'a NodeConstraint,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_shape_and<'a>(
        &self,
        and: &'a ShapeAnd,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_shape_or<'a>(
        &self,
        or: &'a ShapeOr,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_shape_not<'a>(
        &self,
        not: &'a ShapeNot,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_shape_external<'a>(
        &self,
        external: &'a ShapeExternal,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_each_of<'a>(
        &self,
        each_of: &'a EachOf,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_one_of<'a>(
        &self,
        one_of: &'a OneOf,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;

    fn visit_triple_constraint<'a>(
        &self,
        constraint: &'a TripleConstraint,
        ctx: &mut Self::Context,
        walk: &mut Traversal<'a, Self>,
    ) -> SchemaResult<Self::Output>;
}

/// State of one top-level traversal
pub struct Traversal<'a, V: ShapeVisitor> {
    schema: &'a Schema,
    visitor: &'a V,
    memo: HashMap<usize, V::Output>,
}

impl<'a, V: ShapeVisitor> Traversal<'a, V> {
    /// Start a traversal with an empty memo
    pub fn new(schema: &'a Schema, visitor: &'a V) -> Self {
        Self {
            schema,
            visitor,
            memo: HashMap::new(),
        }
    }

    /// The schema being traversed
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Number of distinct nodes visited so far
    pub fn visited(&self) -> usize {
        self.memo.len()
    }

    /// Visit a shape expression given by label or inline
    pub fn shape_expr(
        &mut self,
        expr: &'a ShapeExprRef,
        ctx: &mut V::Context,
    ) -> SchemaResult<V::Output> {
        match expr {
            ShapeExprRef::Label(label) => self.shape_label(label, ctx),
            ShapeExprRef::Inline(node) => self.visit_shape_expr(node, ctx),
        }
    }

    /// Visit the shape declared under `label`
    pub fn shape_label(&mut self, label: &str, ctx: &mut V::Context) -> SchemaResult<V::Output> {
        let node = self.schema.resolve_shape(label)?;
        self.visit_shape_expr(node, ctx)
    }

    /// Visit a triple expression given by label or inline
    pub fn triple_expr(
        &mut self,
        expr: &'a TripleExprRef,
        ctx: &mut V::Context,
    ) -> SchemaResult<V::Output> {
        match expr {
            TripleExprRef::Label(label) => {
                let node = self.schema.resolve_triple_expr(label)?;
                self.visit_triple_expr(node, ctx)
            }
            TripleExprRef::Inline(node) => self.visit_triple_expr(node, ctx),
        }
    }

    /// Visit a shape expression node
    pub fn visit_shape_expr(
        &mut self,
        node: &'a ShapeExpr,
        ctx: &mut V::Context,
    ) -> SchemaResult<V::Output> {
        let node = node.unwrap_decl();
        let kind = match node {
            ShapeExpr::Shape(_) => ShapeNodeKind::Shape,
            ShapeExpr::NodeConstraint(_) => ShapeNodeKind::NodeConstraint,
            ShapeExpr::ShapeAnd(_) => ShapeNodeKind::ShapeAnd,
            ShapeExpr::ShapeOr(_) => ShapeNodeKind::ShapeOr,
            ShapeExpr::ShapeNot(_) => ShapeNodeKind::ShapeNot,
            ShapeExpr::ShapeExternal(_) | ShapeExpr::ShapeDecl(_) => ShapeNodeKind::ShapeExternal,
        };
        let key = node as *const ShapeExpr as usize;
        if let Some(cached) = self.enter(key, kind) {
            return Ok(cached);
        }

        let visitor = self.visitor;
        let result = match node {
            ShapeExpr::Shape(shape) => visitor.visit_shape(shape, ctx, self),
            ShapeExpr::NodeConstraint(nc) => visitor.visit_node_constraint(nc, ctx, self),
            ShapeExpr::ShapeAnd(and) => visitor.visit_shape_and(and, ctx, self),
            ShapeExpr::ShapeOr(or) => visitor.visit_shape_or(or, ctx, self),
            ShapeExpr::ShapeNot(not) => visitor.visit_shape_not(not, ctx, self),
            ShapeExpr::ShapeExternal(ext) => visitor.visit_shape_external(ext, ctx, self),
            // unwrap_decl never returns a declaration
            ShapeExpr::ShapeDecl(decl) => self.visit_shape_expr(&decl.shape_expr, ctx),
        };
        self.leave(key, result)
    }

    /// Visit a triple expression node
    pub fn visit_triple_expr(
        &mut self,
        node: &'a TripleExpr,
        ctx: &mut V::Context,
    ) -> SchemaResult<V::Output> {
        let kind = match node {
            TripleExpr::EachOf(_) => ShapeNodeKind::EachOf,
            TripleExpr::OneOf(_) => ShapeNodeKind::OneOf,
            TripleExpr::TripleConstraint(_) => ShapeNodeKind::TripleConstraint,
        };
        let key = node as *const TripleExpr as usize;
        if let Some(cached) = self.enter(key, kind) {
            return Ok(cached);
        }

        let visitor = self.visitor;
        let result = match node {
            TripleExpr::EachOf(each_of) => visitor.visit_each_of(each_of, ctx, self),
            TripleExpr::OneOf(one_of) => visitor.visit_one_of(one_of, ctx, self),
            TripleExpr::TripleConstraint(tc) => visitor.visit_triple_constraint(tc, ctx, self),
        };
        self.leave(key, result)
    }

    /// Returns the memoized output if the node was already entered,
    /// otherwise records the placeholder and returns `None`
    fn enter(&mut self, key: usize, kind: ShapeNodeKind) -> Option<V::Output> {
        if let Some(cached) = self.memo.get(&key) {
            debug!("Reusing memoized {} visit", kind);
            return Some(cached.clone());
        }
        self.memo.insert(key, self.visitor.placeholder(kind));
        None
    }

    fn leave(&mut self, key: usize, result: SchemaResult<V::Output>) -> SchemaResult<V::Output> {
        match result {
            Ok(output) => {
                self.memo.insert(key, output.clone());
                Ok(output)
            }
            Err(e) => {
                self.memo.remove(&key);
                Err(e)
            }
        }
    }
}

/// Traverse the shape declared under `label` with a fresh memo
pub fn traverse_shape<'a, V: ShapeVisitor>(
    schema: &'a Schema,
    visitor: &'a V,
    label: &str,
    ctx: &mut V::Context,
) -> SchemaResult<V::Output> {
    let mut traversal = Traversal::new(schema, visitor);
    let output = traversal.shape_label(label, ctx)?;
    debug!("Traversed {} ({} nodes)", label, traversal.visited());
    Ok(output)
}

/// Traverse an arbitrary shape expression of `schema` with a fresh memo
pub fn traverse_expr<'a, V: ShapeVisitor>(
    schema: &'a Schema,
    visitor: &'a V,
    expr: &'a ShapeExprRef,
    ctx: &mut V::Context,
) -> SchemaResult<V::Output> {
    Traversal::new(schema, visitor).shape_expr(expr, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shex::SchemaError;

    /// Counts visits per kind and collects predicates reached
    struct Recorder;

    #[derive(Default)]
    struct Log {
        shapes: usize,
        constraints: usize,
        predicates: Vec<String>,
    }

    impl ShapeVisitor for Recorder {
        type Output = usize;
        type Context = Log;

        fn placeholder(&self, _kind: ShapeNodeKind) -> usize {
            0
        }

        fn visit_shape<'a>(
            &self,
            shape: &'a Shape,
            ctx: &mut Log,
            walk: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            ctx.shapes += 1;
            match &shape.expression {
                Some(expr) => Ok(1 + walk.triple_expr(expr, ctx)?),
                None => Ok(1),
            }
        }

        fn visit_node_constraint<'a>(
            &self,
            _: &'a NodeConstraint,
            _: &mut Log,
            _: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            Ok(1)
        }

        fn visit_shape_and<'a>(
            &self,
            and: &'a ShapeAnd,
            ctx: &mut Log,
            walk: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            let mut total = 1;
            for expr in &and.shape_exprs {
                total += walk.shape_expr(expr, ctx)?;
            }
            Ok(total)
        }

        fn visit_shape_or<'a>(
            &self,
            or: &'a ShapeOr,
            ctx: &mut Log,
            walk: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            let mut total = 1;
            for expr in &or.shape_exprs {
                total += walk.shape_expr(expr, ctx)?;
            }
            Ok(total)
        }

        fn visit_shape_not<'a>(
            &self,
            not: &'a ShapeNot,
            ctx: &mut Log,
            walk: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            Ok(1 + walk.shape_expr(&not.shape_expr, ctx)?)
        }

        fn visit_shape_external<'a>(
            &self,
            _: &'a ShapeExternal,
            _: &mut Log,
            _: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            Ok(1)
        }

        fn visit_each_of<'a>(
            &self,
            each_of: &'a EachOf,
            ctx: &mut Log,
            walk: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            let mut total = 1;
            for expr in &each_of.expressions {
                total += walk.triple_expr(expr, ctx)?;
            }
            Ok(total)
        }

        fn visit_one_of<'a>(
            &self,
            one_of: &'a OneOf,
            ctx: &mut Log,
            walk: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            let mut total = 1;
            for expr in &one_of.expressions {
                total += walk.triple_expr(expr, ctx)?;
            }
            Ok(total)
        }

        fn visit_triple_constraint<'a>(
            &self,
            tc: &'a TripleConstraint,
            ctx: &mut Log,
            walk: &mut Traversal<'a,
            Self>,
        ) -> SchemaResult<usize> {
            ctx.constraints += 1;
            ctx.predicates.push(tc.predicate.clone());
            match &tc.value_expr {
                Some(expr) => Ok(1 + walk.shape_expr(expr, ctx)?),
                None => Ok(1),
            }
        }
    }

    fn schema(json: &str) -> Schema {
        Schema::from_json(json).unwrap()
    }

    #[test]
    fn test_self_reference_visits_once() {
        let schema = schema(r#"{"type": "Schema", "shapes": [{
            "type": "Shape", "id": "http://ex/Node",
            "expression": {"type": "TripleConstraint", "predicate": "http://ex/next",
                           "valueExpr": "http://ex/Node", "min": 0, "max": 1}
        }]}"#);

        let mut log = Log::default();
        let total = traverse_shape(&schema, &Recorder, "http://ex/Node", &mut log).unwrap();
        assert_eq!(log.shapes, 1);
        assert_eq!(log.constraints, 1);
        // shape(1) + constraint(1) + placeholder(0)
        assert_eq!(total, 2);
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let schema = schema(r#"{"type": "Schema", "shapes": [
            {"type": "ShapeDecl", "id": "http://ex/A", "shapeExpr": {"type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": "http://ex/b", "valueExpr": "http://ex/B"}}},
            {"type": "ShapeDecl", "id": "http://ex/B", "shapeExpr": {"type": "Shape",
                "expression": {"type": "TripleConstraint", "predicate": "http://ex/a", "valueExpr": "http://ex/A"}}}
        ]}"#);

        let mut log = Log::default();
        traverse_shape(&schema, &Recorder, "http://ex/A", &mut log).unwrap();
        assert_eq!(log.shapes, 2);
        assert_eq!(log.predicates, vec!["http://ex/b", "http://ex/a"]);
    }

    #[test]
    fn test_shared_node_visited_once_per_call() {
        let schema = schema(r#"{"type": "Schema", "shapes": [
            {"type": "Shape", "id": "http://ex/Leaf"},
            {"type": "ShapeAnd", "id": "http://ex/Both", "shapeExprs": ["http://ex/Leaf", "http://ex/Leaf"]}
        ]}"#);

        let mut log = Log::default();
        let total = traverse_shape(&schema, &Recorder, "http://ex/Both", &mut log).unwrap();
        assert_eq!(log.shapes, 1);
        // and(1) + leaf(1) + cached leaf(1)
        assert_eq!(total, 3);

        // A new top-level call starts with a fresh memo
        traverse_shape(&schema, &Recorder, "http://ex/Both", &mut log).unwrap();
        assert_eq!(log.shapes, 2);
    }

    #[test]
    fn test_unresolved_reference_is_an_error() {
        let schema = schema(r#"{"type": "Schema", "shapes": [{
            "type": "Shape", "id": "http://ex/A",
            "expression": {"type": "TripleConstraint", "predicate": "http://ex/p", "valueExpr": "http://ex/Missing"}
        }]}"#);

        let result = traverse_shape(&schema, &Recorder, "http://ex/A", &mut Log::default());
        assert!(matches!(result, Err(SchemaError::UnresolvedShape(_))));
    }

    #[test]
    fn test_labelled_triple_expression_reuse() {
        let schema = schema(r#"{"type": "Schema", "shapes": [
            {"type": "Shape", "id": "http://ex/A",
             "expression": {"type": "TripleConstraint", "id": "http://ex/nameTc", "predicate": "http://ex/name"}},
            {"type": "Shape", "id": "http://ex/B",
             "expression": {"type": "EachOf", "expressions": ["http://ex/nameTc", "http://ex/nameTc"]}}
        ]}"#);

        let mut log = Log::default();
        traverse_shape(&schema, &Recorder, "http://ex/B", &mut log).unwrap();
        assert_eq!(log.constraints, 1);
    }
}
