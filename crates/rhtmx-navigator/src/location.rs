//! Snapshot of where the navigator is (or is going)

use std::sync::Arc;

use crate::params::{Params, Query};
use crate::query::encode_query;
use crate::route::{CompiledRoute, MatchChain};

/// A resolved location: canonical pathname (base href stripped), query and
/// the matched chain
///
/// Guards receive the location being left and the location being entered.
#[derive(Debug, Clone, Default)]
pub struct Location {
    pub pathname: String,
    pub query: Query,
    pub chain: MatchChain,
}

impl Location {
    pub fn new(pathname: impl Into<String>, query: Query, chain: MatchChain) -> Self {
        Self {
            pathname: pathname.into(),
            query,
            chain,
        }
    }

    /// Parameters of the innermost matched route (merged with its ancestors)
    pub fn params(&self) -> Params {
        self.chain.last().map(|m| m.params.clone()).unwrap_or_default()
    }

    /// Innermost matched route
    pub fn route(&self) -> Option<&Arc<CompiledRoute>> {
        self.chain.last().map(|m| &m.route)
    }

    /// Name of the innermost matched route
    pub fn route_name(&self) -> Option<&str> {
        self.route().and_then(|r| r.name())
    }

    pub fn is_matched(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Encoded query string without the `?`
    pub fn search(&self) -> String {
        encode_query(&self.query)
    }

    /// Pathname plus `?search` when the query is non-empty
    pub fn href(&self) -> String {
        let search = self.search();
        if search.is_empty() {
            self.pathname.clone()
        } else {
            format!("{}?{}", self.pathname, search)
        }
    }
}
