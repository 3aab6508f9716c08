//! Query-string builder for the REST table API.
//!
//! Filters use the `column=op.value` convention; `in` lists are rendered as
//! `in.(a,b)`. The builder only produces pairs; URL encoding happens when
//! they are appended to a [`Url`].

use std::fmt::Display;

use url::Url;

/// Sort direction for [`TableQuery::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl Order {
    const fn suffix(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Ordered list of query pairs for one table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pairs: Vec<(String, String)>,
}

impl TableQuery {
    /// Empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns (and embedded relations) to return.
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.push("select", columns.to_owned())
    }

    /// `column = value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.push(column, format!("eq.{value}"))
    }

    /// `column IN (values)`.
    #[must_use]
    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined = values
            .into_iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.push(column, format!("in.({joined})"))
    }

    /// Sort by `column`.
    #[must_use]
    pub fn order(self, column: &str, order: Order) -> Self {
        self.push("order", format!("{column}.{}", order.suffix()))
    }

    /// Cap the number of rows.
    #[must_use]
    pub fn limit(self, limit: usize) -> Self {
        self.push("limit", limit.to_string())
    }

    /// Conflict target for upserts.
    #[must_use]
    pub fn on_conflict(self, column: &str) -> Self {
        self.push("on_conflict", column.to_owned())
    }

    /// Rendered pairs in insertion order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Append the pairs to `url`'s query string.
    pub fn apply_to(&self, url: &mut Url) {
        if self.pairs.is_empty() {
            return;
        }
        url.query_pairs_mut().extend_pairs(
            self.pairs
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        );
    }

    fn push(mut self, key: &str, value: String) -> Self {
        self.pairs.push((key.to_owned(), value));
        self
    }
}
