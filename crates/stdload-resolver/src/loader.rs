//! Request-to-result pipeline

use stdload_catalog::{Catalog, ProductTable};
use tracing::info;

use crate::budget;
use crate::content::ContentSource;
use crate::emitter::{self, LoadResult};
use crate::error::LoadError;
use crate::query::{LoadRequest, QueryParser};
use crate::resolver;

/// A request as text or as a list of atom strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `@load [CS:api + SEC:api]` and friends
    Text(String),
    /// `["CS:api", "SEC:api"]`
    Atoms(Vec<String>),
}

impl From<&str> for Request {
    fn from(text: &str) -> Self {
        Request::Text(text.to_string())
    }
}

impl From<String> for Request {
    fn from(text: String) -> Self {
        Request::Text(text)
    }
}

impl From<Vec<String>> for Request {
    fn from(atoms: Vec<String>) -> Self {
        Request::Atoms(atoms)
    }
}

impl From<&[&str]> for Request {
    fn from(atoms: &[&str]) -> Self {
        Request::Atoms(atoms.iter().map(ToString::to_string).collect())
    }
}

/// Resolves requests against a catalog and reads content from a source.
///
/// Holds only shared references, so one loader can serve several threads
/// when the content source is `Sync`.
#[derive(Debug)]
pub struct Loader<'a, S: ContentSource> {
    catalog: &'a Catalog,
    products: &'a ProductTable,
    source: &'a S,
}

impl<'a, S: ContentSource> Loader<'a, S> {
    /// Loader over an already validated catalog and product table
    pub fn new(catalog: &'a Catalog, products: &'a ProductTable, source: &'a S) -> Self {
        Self {
            catalog,
            products,
            source,
        }
    }

    /// Parse a request without resolving it
    pub fn parse(
        &self,
        request: impl Into<Request>,
        budget: Option<u64>,
        strategy: Option<&str>,
    ) -> Result<LoadRequest, LoadError> {
        let parser = QueryParser::new(self.catalog, self.products);
        let parsed = match request.into() {
            Request::Text(text) => parser.parse(&text, budget, strategy)?,
            Request::Atoms(atoms) => parser.parse_atoms(&atoms, budget, strategy)?,
        };
        Ok(parsed)
    }

    /// Parse, resolve, select under the budget and emit content
    pub fn resolve(
        &self,
        request: impl Into<Request>,
        budget: Option<u64>,
        strategy: Option<&str>,
    ) -> Result<LoadResult, LoadError> {
        let request = self.parse(request, budget, strategy)?;
        self.load(&request)
    }

    /// Resolve an already parsed request
    pub fn load(&self, request: &LoadRequest) -> Result<LoadResult, LoadError> {
        let mut candidates = resolver::resolve(self.catalog, request)?;
        budget::select(&mut candidates.units, request.budget_tokens());

        let result = emitter::emit(
            self.catalog,
            self.source,
            candidates.units,
            candidates.diagnostics,
            &request.strategy().name,
            request.budget_tokens(),
        );

        info!(
            "Loaded {} sections ({} tokens), skipped {} with strategy {}",
            result.included.len(),
            result.total_tokens,
            result.skipped.len(),
            result.strategy
        );
        Ok(result)
    }
}
