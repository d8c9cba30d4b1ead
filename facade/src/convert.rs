//! Host-side arguments and values, formula construction, and the rewrites
//! that need the identity cache.
//!
//! [`Arg`] is what callers hand to [`Factory::build`]: facade objects, raw
//! terms, primitives, nested trees, host collections and dates. Conversion is
//! recursive and canonical: non-empty collections become `(TheList ...)` /
//! `(TheSet ...)` terms, empty ones become sentinel leaves, dates become
//! `(DayFn d (MonthFn Month (YearFn y)))`, and every functional term is run
//! back through the cache so it surfaces as its tightest facade object.
//!
//! [`HostValue`] is the reverse direction, produced by [`Factory::to_host`].

use std::collections::{BTreeSet, HashSet};
use std::hash::BuildHasher;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use kbf_kinds::Kind;
use tracing::debug;

use crate::arity::{ArityDescriptor, Nullable};
use crate::error::{FacadeError, Result};
use crate::factory::Factory;
use crate::formula::{ArgPath, CollectionShape, FormulaTree, Leaf, Substitution};
use crate::object::FacadeObject;
use crate::term::{Primitive, RawArg, TermRef};

/// One argument to [`Factory::build`].
#[derive(Debug, Clone)]
pub enum Arg {
    /// An absent argument. Always rejected by `build`.
    Null,
    /// A primitive value.
    Value(Primitive),
    /// A raw term, canonicalised through the cache.
    Term(TermRef),
    /// A facade object.
    Object(Arc<FacadeObject>),
    /// An already-built formula tree.
    Tree(FormulaTree),
    /// An ordered host collection.
    List(Vec<Arg>),
    /// An unordered host collection. Elements are deduplicated and ordered by
    /// their canonical rendering.
    Set(Vec<Arg>),
    /// A calendar day.
    Date(NaiveDate),
    /// A calendar day and time of day, to the second.
    DateTime(NaiveDateTime),
}

impl Nullable for Arg {
    fn is_null(&self) -> bool {
        matches!(self, Arg::Null)
    }
}

impl Nullable for FormulaTree {
    fn is_null(&self) -> bool {
        false
    }
}

impl From<Primitive> for Arg {
    fn from(v: Primitive) -> Self {
        Arg::Value(v)
    }
}

impl From<i64> for Arg {
    fn from(v: i64) -> Self {
        Arg::Value(Primitive::Int(v))
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Value(Primitive::Int(i64::from(v)))
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Value(Primitive::Float(v))
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Value(Primitive::from(v))
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::Value(Primitive::Str(v))
    }
}

impl From<TermRef> for Arg {
    fn from(t: TermRef) -> Self {
        Arg::Term(t)
    }
}

impl From<Arc<FacadeObject>> for Arg {
    fn from(o: Arc<FacadeObject>) -> Self {
        Arg::Object(o)
    }
}

impl From<&Arc<FacadeObject>> for Arg {
    fn from(o: &Arc<FacadeObject>) -> Self {
        Arg::Object(Arc::clone(o))
    }
}

impl From<FormulaTree> for Arg {
    fn from(t: FormulaTree) -> Self {
        Arg::Tree(t)
    }
}

impl From<NaiveDate> for Arg {
    fn from(d: NaiveDate) -> Self {
        Arg::Date(d)
    }
}

impl From<NaiveDateTime> for Arg {
    fn from(d: NaiveDateTime) -> Self {
        Arg::DateTime(d)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        v.map_or(Arg::Null, Into::into)
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(v: Vec<T>) -> Self {
        Arg::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg>> From<BTreeSet<T>> for Arg {
    fn from(v: BTreeSet<T>) -> Self {
        Arg::Set(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg>, S: BuildHasher> From<HashSet<T, S>> for Arg {
    fn from(v: HashSet<T, S>) -> Self {
        Arg::Set(v.into_iter().map(Into::into).collect())
    }
}

/// A formula tree converted back to host values where it has a host
/// counterpart.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// A primitive.
    Value(Primitive),
    /// A facade object with no host counterpart.
    Object(Arc<FacadeObject>),
    /// A list term or the empty list sentinel.
    List(Vec<HostValue>),
    /// A set term or the empty set sentinel.
    Set(Vec<HostValue>),
    /// A day term.
    Date(NaiveDate),
    /// A second-precision time term.
    DateTime(NaiveDateTime),
    /// Any other composite expression.
    Formula(FormulaTree),
}

impl Factory {
    /// Builds `(operator args...)`.
    ///
    /// The operator must denote a facade object. Relations have their arity
    /// checked first, with null arguments forbidden for every operator; then
    /// each argument is converted. When the operator is a function the result
    /// is a functional term, re-resolved through the cache and returned as an
    /// object leaf of its tightest kind.
    ///
    /// # Errors
    ///
    /// - [`FacadeError::InvalidArgument`] if the operator is not an object.
    /// - [`FacadeError::Arity`] if the argument list does not fit.
    /// - `StaleReference` if any object involved was invalidated.
    /// - Any resolution error raised while converting arguments.
    pub fn build(&self, operator: impl Into<Arg>, args: Vec<Arg>) -> Result<FormulaTree> {
        let op = self.operator_object(operator.into())?;
        self.check_arity(&op, &args)?;
        let trees = args
            .into_iter()
            .map(|arg| self.to_tree(arg))
            .collect::<Result<Vec<_>>>()?;
        self.assemble(op, trees)
    }

    /// Looks up the operator by name as a relation and builds with it.
    ///
    /// # Errors
    ///
    /// As [`Factory::get`] for the operator, then as [`Factory::build`].
    pub fn build_named(&self, operator: &str, args: Vec<Arg>) -> Result<FormulaTree> {
        let op = self.get(operator, Kind::Relation)?;
        self.build(op, args)
    }

    /// Converts one argument to a formula tree.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::InvalidArgument`] for nulls and any resolution
    /// error raised by nested terms or collections.
    pub fn to_tree(&self, arg: Arg) -> Result<FormulaTree> {
        match arg {
            Arg::Null => Err(FacadeError::InvalidArgument {
                reason: "null cannot appear in a formula".to_owned(),
            }),
            Arg::Value(v) => Ok(FormulaTree::from(v)),
            Arg::Term(t) => self.term_to_tree(&t),
            Arg::Object(o) => {
                o.ensure_valid()?;
                Ok(FormulaTree::from(o))
            }
            Arg::Tree(t) => Ok(t),
            Arg::List(items) => self.collection(CollectionShape::List, items),
            Arg::Set(items) => self.collection(CollectionShape::Set, items),
            Arg::Date(d) => self.date_tree(d),
            Arg::DateTime(dt) => self.datetime_tree(dt),
        }
    }

    fn operator_object(&self, operator: Arg) -> Result<Arc<FacadeObject>> {
        let tree = self.to_tree(operator)?;
        let op = tree.as_object().cloned().ok_or_else(|| FacadeError::InvalidArgument {
            reason: format!("operator {tree} is not a term"),
        })?;
        op.ensure_valid()?;
        Ok(op)
    }

    fn check_arity<T: Nullable>(&self, op: &FacadeObject, args: &[T]) -> Result<()> {
        let arity = match op.as_relation() {
            Some(_) => self.arity_of(op)?,
            None => ArityDescriptor::Unknown,
        };
        arity.validate(args, true).map_err(|source| FacadeError::Arity {
            relation: op.label(),
            source,
        })
    }

    fn assemble(&self, op: Arc<FacadeObject>, args: Vec<FormulaTree>) -> Result<FormulaTree> {
        let is_function = self.registry().is_subkind(op.kind(), Kind::Function);
        let tree = FormulaTree::node(FormulaTree::from(op), args);
        if is_function {
            self.canonicalize(&tree)
        } else {
            Ok(tree)
        }
    }

    /// Re-resolves a functional node as a non-atomic term.
    fn canonicalize(&self, node: &FormulaTree) -> Result<FormulaTree> {
        let args = node
            .positions()
            .iter()
            .map(|t| self.to_raw(t))
            .collect::<Result<Vec<_>>>()?;
        let object = self.get(TermRef::non_atomic(args), Kind::Term)?;
        debug!(term = %object.label(), kind = %object.kind(), "canonicalised functional term");
        Ok(FormulaTree::from(object))
    }

    fn collection(&self, shape: CollectionShape, items: Vec<Arg>) -> Result<FormulaTree> {
        if items.is_empty() {
            return Ok(FormulaTree::from(Leaf::Empty(shape)));
        }
        let vocabulary = &self.config().vocabulary;
        let name = match shape {
            CollectionShape::List => &vocabulary.list_fn,
            CollectionShape::Set => &vocabulary.set_fn,
        };
        let op = self.get(name.as_str(), Kind::Function)?;
        if items.iter().any(Nullable::is_null) {
            self.check_arity(&op, &items)?;
        }
        let mut trees = items
            .into_iter()
            .map(|arg| self.to_tree(arg))
            .collect::<Result<Vec<_>>>()?;
        if shape == CollectionShape::Set {
            // Rendering only orders the members; distinct terms can render alike.
            trees.sort_by_cached_key(ToString::to_string);
            let mut members: Vec<FormulaTree> = Vec::with_capacity(trees.len());
            for tree in trees {
                if !members.contains(&tree) {
                    members.push(tree);
                }
            }
            trees = members;
        }
        self.check_arity(&op, &trees)?;
        self.assemble(op, trees)
    }

    fn function(&self, name: &str) -> Result<Arc<FacadeObject>> {
        self.get(name, Kind::Function)
    }

    fn date_tree(&self, date: NaiveDate) -> Result<FormulaTree> {
        let vocabulary = &self.config().vocabulary;
        let month_name = vocabulary
            .months
            .get(date.month0() as usize)
            .ok_or_else(|| FacadeError::InvalidArgument {
                reason: format!("no month constant configured for month {}", date.month()),
            })?;
        let month = self.get(month_name.as_str(), Kind::Object)?;
        let year = self.build(
            self.function(&vocabulary.year_fn)?,
            vec![Arg::from(i64::from(date.year()))],
        )?;
        let month = self.build(
            self.function(&vocabulary.month_fn)?,
            vec![Arg::Object(month), Arg::Tree(year)],
        )?;
        self.build(
            self.function(&vocabulary.day_fn)?,
            vec![Arg::from(i64::from(date.day())), Arg::Tree(month)],
        )
    }

    fn datetime_tree(&self, at: NaiveDateTime) -> Result<FormulaTree> {
        let vocabulary = &self.config().vocabulary;
        let day = self.date_tree(at.date())?;
        let hour = self.build(
            self.function(&vocabulary.hour_fn)?,
            vec![Arg::from(i64::from(at.hour())), Arg::Tree(day)],
        )?;
        let minute = self.build(
            self.function(&vocabulary.minute_fn)?,
            vec![Arg::from(i64::from(at.minute())), Arg::Tree(hour)],
        )?;
        self.build(
            self.function(&vocabulary.second_fn)?,
            vec![Arg::from(i64::from(at.second())), Arg::Tree(minute)],
        )
    }

    /// Converts a tree back to a raw argument: objects to their terms,
    /// sentinels to the knowledge base's sentinel constants, nodes to
    /// functional terms or sentences by their operator.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference` for invalidated objects and `NotFound` if a
    /// sentinel constant is missing from the knowledge base.
    pub fn to_raw(&self, tree: &FormulaTree) -> Result<RawArg> {
        match tree {
            FormulaTree::Leaf(Leaf::Value(v)) => Ok(RawArg::Value(v.clone())),
            FormulaTree::Leaf(Leaf::Object(o)) => Ok(RawArg::Term(o.term()?.clone())),
            FormulaTree::Leaf(Leaf::Empty(shape)) => Ok(RawArg::Term(self.sentinel_term(*shape)?)),
            FormulaTree::Node(_) => {
                let args = tree
                    .positions()
                    .iter()
                    .map(|t| self.to_raw(t))
                    .collect::<Result<Vec<_>>>()?;
                let functional = tree
                    .operator_object()
                    .is_some_and(|op| self.registry().is_subkind(op.kind(), Kind::Function));
                Ok(RawArg::Term(if functional {
                    TermRef::non_atomic(args)
                } else {
                    TermRef::sentence(args)
                }))
            }
        }
    }

    /// Converts a tree to a raw term.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::InvalidArgument`] for primitive leaves, and
    /// otherwise as [`Factory::to_raw`].
    pub fn to_term(&self, tree: &FormulaTree) -> Result<TermRef> {
        match self.to_raw(tree)? {
            RawArg::Term(t) => Ok(t),
            RawArg::Value(v) => Err(FacadeError::InvalidArgument {
                reason: format!("{} is a value, not a term", crate::render::sexpr::primitive(&v)),
            }),
        }
    }

    /// Converts a tree to host values where it has a host counterpart:
    /// list and set terms, sentinels, day terms and second-precision time
    /// terms. Anything else stays an object or a formula.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference` if the tree passes through an invalidated
    /// object.
    pub fn to_host(&self, tree: &FormulaTree) -> Result<HostValue> {
        match tree {
            FormulaTree::Leaf(Leaf::Value(v)) => Ok(HostValue::Value(v.clone())),
            FormulaTree::Leaf(Leaf::Empty(CollectionShape::List)) => {
                Ok(HostValue::List(Vec::new()))
            }
            FormulaTree::Leaf(Leaf::Empty(CollectionShape::Set)) => Ok(HostValue::Set(Vec::new())),
            FormulaTree::Leaf(Leaf::Object(o)) => match o.formula()? {
                Some(formula) => match self.expression_to_host(formula)? {
                    HostValue::Formula(_) => Ok(HostValue::Object(Arc::clone(o))),
                    host => Ok(host),
                },
                None => Ok(HostValue::Object(Arc::clone(o))),
            },
            FormulaTree::Node(_) => self.expression_to_host(tree),
        }
    }

    fn expression_to_host(&self, expr: &FormulaTree) -> Result<HostValue> {
        let vocabulary = &self.config().vocabulary;
        let Some(op) = operator_name(expr)? else {
            return Ok(HostValue::Formula(expr.clone()));
        };
        let elements = || expr.args().iter().map(|a| self.to_host(a)).collect::<Result<Vec<_>>>();
        if op == vocabulary.list_fn {
            return Ok(HostValue::List(elements()?));
        }
        if op == vocabulary.set_fn {
            return Ok(HostValue::Set(elements()?));
        }
        if op == vocabulary.day_fn {
            if let Some(date) = self.decode_date(expr)? {
                return Ok(HostValue::Date(date));
            }
        }
        if op == vocabulary.second_fn {
            if let Some(at) = self.decode_datetime(expr)? {
                return Ok(HostValue::DateTime(at));
            }
        }
        Ok(HostValue::Formula(expr.clone()))
    }

    fn decode_date(&self, day: &FormulaTree) -> Result<Option<NaiveDate>> {
        let vocabulary = &self.config().vocabulary;
        let Some([d, month]) = decode_step::<2>(day, &vocabulary.day_fn)? else {
            return Ok(None);
        };
        let Some([month_const, year]) = decode_step::<2>(&month, &vocabulary.month_fn)? else {
            return Ok(None);
        };
        let Some([y]) = decode_step::<1>(&year, &vocabulary.year_fn)? else {
            return Ok(None);
        };
        let month_name = match month_const.as_object() {
            Some(o) => o.term()?.name().map(str::to_owned),
            None => None,
        };
        let month_number = month_name
            .and_then(|name| vocabulary.months.iter().position(|m| *m == name))
            .and_then(|i| u32::try_from(i + 1).ok());
        Ok(match (int_of(&y), month_number, int_of(&d)) {
            (Some(y), Some(m), Some(d)) => i32::try_from(y)
                .ok()
                .zip(u32::try_from(d).ok())
                .and_then(|(y, d)| NaiveDate::from_ymd_opt(y, m, d)),
            _ => None,
        })
    }

    fn decode_datetime(&self, second: &FormulaTree) -> Result<Option<NaiveDateTime>> {
        let vocabulary = &self.config().vocabulary;
        let Some([s, minute]) = decode_step::<2>(second, &vocabulary.second_fn)? else {
            return Ok(None);
        };
        let Some([m, hour]) = decode_step::<2>(&minute, &vocabulary.minute_fn)? else {
            return Ok(None);
        };
        let Some([h, day]) = decode_step::<2>(&hour, &vocabulary.hour_fn)? else {
            return Ok(None);
        };
        let Some(date) = self.decode_date(&day)? else {
            return Ok(None);
        };
        let part = |t: &FormulaTree| int_of(t).and_then(|v| u32::try_from(v).ok());
        Ok(match (part(&h), part(&m), part(&s)) {
            (Some(h), Some(m), Some(s)) => date.and_hms_opt(h, m, s),
            _ => None,
        })
    }

    /// Replaces every leaf that the knowledge base classifies as indexical
    /// with the value it evaluates to.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::Unevaluatable`] if an indexical cannot be
    /// evaluated, and `StaleReference` for invalidated objects.
    pub fn evaluate_indexicals(&self, tree: &FormulaTree) -> Result<FormulaTree> {
        let marker = &self.config().vocabulary.indexical_marker;
        let mut failure = None;
        let evaluated = tree.substitute_with(&mut |leaf| {
            if failure.is_some() {
                return None;
            }
            let Leaf::Object(object) = leaf else {
                return None;
            };
            match self.evaluate_leaf(object, marker) {
                Ok(replacement) => replacement,
                Err(e) => {
                    failure = Some(e);
                    None
                }
            }
        });
        match failure {
            Some(e) => Err(e),
            None => Ok(evaluated),
        }
    }

    fn evaluate_leaf(&self, object: &FacadeObject, marker: &str) -> Result<Option<FormulaTree>> {
        let term = object.term()?;
        if !self.kb().classify(term)?.iter().any(|c| c == marker) {
            return Ok(None);
        }
        let value = self
            .kb()
            .evaluate_indexical(term)
            .map_err(|e| FacadeError::Unevaluatable {
                term: term.to_string(),
                reason: e.to_string(),
            })?;
        debug!(term = %term, "evaluated indexical");
        self.raw_to_tree(&value).map(Some)
    }

    /// Replaces the subtree at `path`, descending into functional-term
    /// objects and re-canonicalising each one rebuilt on the way up.
    ///
    /// # Errors
    ///
    /// Returns [`FacadeError::NotAnExpression`] or
    /// [`FacadeError::ArgumentOutOfRange`] for bad paths, and any error
    /// raised converting `arg` or re-resolving a rebuilt term.
    pub fn replace_arg(
        &self,
        tree: &FormulaTree,
        path: &ArgPath,
        arg: impl Into<Arg>,
    ) -> Result<FormulaTree> {
        let replacement = self.to_tree(arg.into())?;
        self.replace_at(tree, path, 0, replacement)
    }

    fn replace_at(
        &self,
        tree: &FormulaTree,
        path: &ArgPath,
        depth: usize,
        replacement: FormulaTree,
    ) -> Result<FormulaTree> {
        let Some(&index) = path.indices().get(depth) else {
            return Ok(replacement);
        };
        let not_an_expression = || FacadeError::NotAnExpression {
            path: ArgPath::from(&path.indices()[..depth]).to_string(),
        };
        let (expression, rebuild_term) = match tree {
            FormulaTree::Node(_) => (tree.clone(), false),
            FormulaTree::Leaf(Leaf::Object(o)) => match o.formula()? {
                Some(formula) => (formula.clone(), o.shape() == kbf_kinds::TermShape::NonAtomic),
                None => return Err(not_an_expression()),
            },
            FormulaTree::Leaf(_) => return Err(not_an_expression()),
        };
        let positions = expression.positions();
        let child = positions.get(index).ok_or_else(|| FacadeError::ArgumentOutOfRange {
            path: path.to_string(),
            index,
            len: positions.len(),
        })?;
        let replaced = self.replace_at(child, path, depth + 1, replacement)?;
        let rebuilt = expression.with_position(index, replaced);
        if rebuild_term {
            self.canonicalize(&rebuilt)
        } else {
            Ok(rebuilt)
        }
    }

    /// Substitutes leaves throughout the tree, including inside functional
    /// terms; every functional term that changes is re-canonicalised.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference` for invalidated objects and any error raised
    /// re-resolving a rebuilt term.
    pub fn substitute_deep(
        &self,
        tree: &FormulaTree,
        mapping: &Substitution,
    ) -> Result<FormulaTree> {
        if mapping.is_empty() {
            return Ok(tree.clone());
        }
        match tree {
            FormulaTree::Leaf(leaf) => {
                if let Some(replacement) = mapping.get(leaf) {
                    return Ok(replacement.clone());
                }
                let Leaf::Object(o) = leaf else {
                    return Ok(tree.clone());
                };
                if o.shape() != kbf_kinds::TermShape::NonAtomic {
                    return Ok(tree.clone());
                }
                let Some(formula) = o.formula()? else {
                    return Ok(tree.clone());
                };
                let rewritten = self.substitute_deep(formula, mapping)?;
                if rewritten.shares(formula) {
                    Ok(tree.clone())
                } else {
                    self.canonicalize(&rewritten)
                }
            }
            FormulaTree::Node(_) => {
                let positions = tree.positions();
                let mut changed = false;
                let mut terms = Vec::with_capacity(positions.len());
                for term in positions {
                    let next = self.substitute_deep(term, mapping)?;
                    changed |= !next.shares(term);
                    terms.push(next);
                }
                Ok(if changed {
                    FormulaTree::from_terms(terms)
                } else {
                    tree.clone()
                })
            }
        }
    }
}

fn operator_name(expr: &FormulaTree) -> Result<Option<String>> {
    match expr.operator_object() {
        Some(op) => Ok(op.term()?.name().map(str::to_owned)),
        None => Ok(None),
    }
}

/// Matches `(function a b ...)` with exactly `N` arguments, looking through
/// functional-term objects.
fn decode_step<const N: usize>(
    tree: &FormulaTree,
    function: &str,
) -> Result<Option<[FormulaTree; N]>> {
    let expr = match tree {
        FormulaTree::Leaf(Leaf::Object(o)) => match o.formula()? {
            Some(formula) => formula.clone(),
            None => return Ok(None),
        },
        FormulaTree::Node(_) => tree.clone(),
        FormulaTree::Leaf(_) => return Ok(None),
    };
    if operator_name(&expr)?.as_deref() != Some(function) {
        return Ok(None);
    }
    Ok(<[FormulaTree; N]>::try_from(expr.args().to_vec()).ok())
}

fn int_of(tree: &FormulaTree) -> Option<i64> {
    match tree {
        FormulaTree::Leaf(Leaf::Value(Primitive::Int(v))) => Some(*v),
        _ => None,
    }
}
