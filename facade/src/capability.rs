//! Capability traits implemented per kind family.
//!
//! Rather than a deep object hierarchy, a [`FacadeObject`] hands out small
//! typed views whose traits expose what that family of kinds can do. Every
//! capability call checks validity first and talks to the knowledge base
//! through the [`Factory`].

use crate::arity::ArityDescriptor;
use crate::error::Result;
use crate::factory::Factory;
use crate::object::FacadeObject;

/// Relations: arity metadata.
pub trait HasArity {
    /// Returns the relation's arity, resolving and caching it on first use.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference` for invalidated objects and `Backend` if the
    /// knowledge base cannot be queried.
    fn arity(&self, factory: &Factory) -> Result<ArityDescriptor>;
}

/// Terms: documentation comments.
pub trait HasComments {
    /// Returns the comments attached to the term.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference` for invalidated objects and `Backend` if the
    /// knowledge base cannot be queried.
    fn comments(&self, factory: &Factory) -> Result<Vec<String>>;
}

/// Terms: classifications of the term's syntax.
pub trait HasQuotedIsa {
    /// Returns the collections the term is a quoted instance of.
    ///
    /// # Errors
    ///
    /// Returns `StaleReference` for invalidated objects and `Backend` if the
    /// knowledge base cannot be queried.
    fn quoted_isa(&self, factory: &Factory) -> Result<Vec<String>>;
}

/// View of a relation-kinded facade object.
#[derive(Debug, Clone, Copy)]
pub struct RelationView<'a>(&'a FacadeObject);

impl<'a> RelationView<'a> {
    pub(crate) fn new(object: &'a FacadeObject) -> Self {
        Self(object)
    }

    /// Returns the viewed object.
    #[must_use]
    pub fn object(&self) -> &'a FacadeObject {
        self.0
    }
}

/// View of a facade object wrapping a denotational term.
#[derive(Debug, Clone, Copy)]
pub struct TermView<'a>(&'a FacadeObject);

impl<'a> TermView<'a> {
    pub(crate) fn new(object: &'a FacadeObject) -> Self {
        Self(object)
    }

    /// Returns the viewed object.
    #[must_use]
    pub fn object(&self) -> &'a FacadeObject {
        self.0
    }
}

impl HasArity for RelationView<'_> {
    fn arity(&self, factory: &Factory) -> Result<ArityDescriptor> {
        factory.arity_of(self.0)
    }
}

impl HasComments for RelationView<'_> {
    fn comments(&self, factory: &Factory) -> Result<Vec<String>> {
        Ok(factory.kb().comments(self.0.term()?)?)
    }
}

impl HasComments for TermView<'_> {
    fn comments(&self, factory: &Factory) -> Result<Vec<String>> {
        Ok(factory.kb().comments(self.0.term()?)?)
    }
}

impl HasQuotedIsa for TermView<'_> {
    fn quoted_isa(&self, factory: &Factory) -> Result<Vec<String>> {
        Ok(factory.kb().quoted_isa(self.0.term()?)?)
    }
}
