//! Named-route href generation

use crate::error::NavigationError;
use crate::lock;
use crate::params::{ParamValue, Params, Query};
use crate::path::join_base;
use crate::query::encode_query;
use crate::route::{CompiledRoute, PathSegment};

use super::Navigator;

/// A named route plus the values needed to build its href
///
/// ```
/// use rhtmx_navigator::Destination;
///
/// let dest = Destination::named("user").param("id", 42u64).query("tab", "posts");
/// assert_eq!(dest.name, "user");
/// assert_eq!(dest.params.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub name: String,
    pub params: Params,
    pub query: Query,
}

impl Destination {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }
}

impl Navigator {
    /// Builds the href of a named route, base href included
    ///
    /// A wildcard segment takes the value of the `*` parameter, or is dropped.
    ///
    /// # Errors
    ///
    /// - [`NavigationError::UnknownRouteName`] when no route has that name
    /// - [`NavigationError::MissingParam`] when a captured segment has no value
    pub fn href(&self, destination: &Destination) -> Result<String, NavigationError> {
        let route = self
            .core
            .routes
            .by_name(&destination.name)
            .ok_or_else(|| NavigationError::UnknownRouteName {
                name: destination.name.clone(),
            })?;

        let pathname = build_pathname(route, &destination.params)?;
        let mut href = join_base(&self.core.config.base_href, &pathname);

        let search = encode_query(&destination.query);
        if !search.is_empty() {
            href.push('?');
            href.push_str(&search);
        }
        Ok(href)
    }

    /// Whether `destination` is part of the committed location
    ///
    /// Its route must be in the committed chain with every given param
    /// equal. With `check_query`, every given query value must also equal the
    /// committed one.
    pub fn includes(&self, destination: &Destination, check_query: bool) -> bool {
        if check_query {
            let state = lock(&self.core.state);
            let same_query = destination
                .query
                .iter()
                .all(|(k, v)| state.location.query.get(k) == Some(v));
            if !same_query {
                return false;
            }
        }
        self.is_active(&destination.name, &destination.params)
    }
}

/// Substitutes parameters into a route's full pattern (pure function)
fn build_pathname(route: &CompiledRoute, params: &Params) -> Result<String, NavigationError> {
    let segments = route
        .full_segments()
        .iter()
        .map(|segment| match segment {
            PathSegment::Literal(value) => Ok(value.clone()),
            PathSegment::Numeric(name) | PathSegment::Named(name) => params
                .get(name)
                .map(ParamValue::to_string)
                .ok_or_else(|| NavigationError::MissingParam {
                    route: route.pattern().to_string(),
                    param: name.clone(),
                }),
            PathSegment::Wildcard => Ok(params.get("*").map(ParamValue::to_string).unwrap_or_default()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let joined = segments
        .iter()
        .flat_map(|s| s.split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    Ok(format!("/{}", joined))
}
