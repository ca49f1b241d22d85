//! Ordered query parameters with URLSearchParams-style `set` semantics.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use url::form_urlencoded;
use url::Url;

/// Ordered `(name, value)` pairs of a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` string. A leading `?` is ignored.
    pub fn parse(input: &str) -> Self {
        let input = input.strip_prefix('?').unwrap_or(input);
        let pairs = form_urlencoded::parse(input.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    pub fn from_url(url: &Url) -> Self {
        url.query().map(Self::parse).unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Overwrite the first pair named `name` and drop any later duplicates,
    /// or append when the name is absent.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| *k == name) {
            Some(first) => {
                self.pairs[first].1 = value;
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = index <= first || *k != name;
                    index += 1;
                    keep
                });
            }
            None => self.pairs.push((name, value)),
        }
    }

    /// `set` every pair of `other`, in order.
    pub fn merge(&mut self, other: QueryParams) {
        for (name, value) in other.pairs {
            self.set(name, value);
        }
    }

    /// Sort by name, then value.
    pub fn sort(&mut self) {
        self.pairs.sort();
    }

    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&(String, String), &(String, String)) -> Ordering,
    {
        self.pairs.sort_by(compare);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Replace the query of `url` with these params; no params clears it.
    pub fn apply_to(&self, url: &mut Url) {
        if self.pairs.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&self.to_string()));
        }
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish();
        f.write_str(&encoded)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let pairs = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        Self { pairs }
    }
}

/// Anything `set_query` accepts: an encoded string, ordered pairs, a map or
/// an existing `QueryParams`.
#[derive(Debug, Clone)]
pub struct QueryInput(QueryParams);

impl QueryInput {
    pub fn into_params(self) -> QueryParams {
        self.0
    }
}

impl From<&str> for QueryInput {
    fn from(s: &str) -> Self {
        QueryInput(QueryParams::parse(s))
    }
}

impl From<String> for QueryInput {
    fn from(s: String) -> Self {
        QueryInput(QueryParams::parse(&s))
    }
}

impl From<QueryParams> for QueryInput {
    fn from(params: QueryParams) -> Self {
        QueryInput(params)
    }
}

impl<K: Into<String>, V: ToString> From<Vec<(K, V)>> for QueryInput {
    fn from(pairs: Vec<(K, V)>) -> Self {
        QueryInput(pairs.into_iter().collect())
    }
}

impl<K: Into<String>, V: ToString, const N: usize> From<[(K, V); N]> for QueryInput {
    fn from(pairs: [(K, V); N]) -> Self {
        QueryInput(pairs.into_iter().collect())
    }
}

impl<K: Into<String>, V: ToString> From<BTreeMap<K, V>> for QueryInput {
    fn from(map: BTreeMap<K, V>) -> Self {
        QueryInput(map.into_iter().collect())
    }
}

impl<K: Into<String>, V: ToString, S> From<HashMap<K, V, S>> for QueryInput {
    fn from(map: HashMap<K, V, S>) -> Self {
        QueryInput(map.into_iter().collect())
    }
}
