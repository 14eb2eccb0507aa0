//! Request parameter multimap.
//!
//! Query parameters are decoded once per request into a [`Parameters`] value
//! that the controller instance owns for the lifetime of that request.
//! Names compare case-insensitively; values keep the order they arrived in.

use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the common case (≤8 params).
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Ordered, case-insensitive multimap of request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    pairs: ParamVec,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an `application/x-www-form-urlencoded` query string.
    ///
    /// A leading `?` is tolerated. A key without `=` is kept with an empty value.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Append a value for `name`, keeping any existing values.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.pairs.push((Arc::from(name), value.into()));
    }

    /// Whether any value was supplied for `name` (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// First value supplied for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values supplied for `name`, in request order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name` joined with `,`, or `None` if the name is absent.
    #[must_use]
    pub fn joined(&self, name: &str) -> Option<String> {
        if !self.contains(name) {
            return None;
        }
        Some(self.get_all(name).collect::<Vec<_>>().join(","))
    }

    /// Distinct parameter names in first-seen order.
    ///
    /// The first spelling of a name wins when the request repeats it with
    /// different casing.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::with_capacity(self.pairs.len());
        for (k, _) in &self.pairs {
            if !keys.iter().any(|seen| seen.eq_ignore_ascii_case(k)) {
                keys.push(k);
            }
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let pairs = iter
            .into_iter()
            .map(|(k, v)| (Arc::from(k), v.to_string()))
            .collect();
        Self { pairs }
    }
}
