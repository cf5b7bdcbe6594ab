use crate::types::{ConsistencyLevel, SliceRange};

/// Range and consistency overrides for a read or delete
///
/// Unset fields fall back to `start = ""`, `finish = ""`,
/// `reversed = false`, `count = 100` and the connection's default level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub start: Option<String>,
    pub finish: Option<String>,
    pub reversed: Option<bool>,
    pub count: Option<i32>,
    pub consistency_level: Option<ConsistencyLevel>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn finish(mut self, finish: impl Into<String>) -> Self {
        self.finish = Some(finish.into());
        self
    }

    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = Some(reversed);
        self
    }

    pub fn count(mut self, count: i32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = Some(level);
        self
    }

    /// Overlay these options onto the default range
    pub(crate) fn slice_range(&self) -> SliceRange {
        let defaults = SliceRange::default();
        SliceRange {
            start: self.start.clone().unwrap_or(defaults.start),
            finish: self.finish.clone().unwrap_or(defaults.finish),
            reversed: self.reversed.unwrap_or(defaults.reversed),
            count: self.count.unwrap_or(defaults.count),
        }
    }
}

/// Consistency override for a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    pub consistency_level: Option<ConsistencyLevel>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = Some(level);
        self
    }
}

/// One trailing call parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryArg {
    /// A super column name, or a single column name
    Name(String),
    /// Explicit column names
    Names(Vec<String>),
    Options(QueryOptions),
}

impl QueryArg {
    pub(crate) fn shape(&self) -> &'static str {
        match self {
            QueryArg::Name(_) => "name",
            QueryArg::Names(_) => "column names",
            QueryArg::Options(_) => "options",
        }
    }
}

impl From<&str> for QueryArg {
    fn from(name: &str) -> Self {
        QueryArg::Name(name.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(name: String) -> Self {
        QueryArg::Name(name)
    }
}

impl From<Vec<String>> for QueryArg {
    fn from(names: Vec<String>) -> Self {
        QueryArg::Names(names)
    }
}

impl From<Vec<&str>> for QueryArg {
    fn from(names: Vec<&str>) -> Self {
        QueryArg::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for QueryArg {
    fn from(names: [&str; N]) -> Self {
        QueryArg::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<QueryOptions> for QueryArg {
    fn from(options: QueryOptions) -> Self {
        QueryArg::Options(options)
    }
}

/// Conversion of a call's trailing parameters into an ordered list
///
/// Implemented for `()`, any single [`QueryArg`]-convertible value, and
/// tuples of up to three of them:
///
/// ```
/// use cassandra_client::{IntoQueryArgs, QueryArg, QueryOptions};
///
/// assert!(().into_query_args().is_empty());
/// assert_eq!(
///     ("address", ["city"]).into_query_args(),
///     vec![QueryArg::Name("address".into()), QueryArg::Names(vec!["city".into()])],
/// );
/// let args = QueryOptions::new().reversed(true).count(1).into_query_args();
/// assert_eq!(args.len(), 1);
/// ```
pub trait IntoQueryArgs {
    fn into_query_args(self) -> Vec<QueryArg>;
}

impl IntoQueryArgs for () {
    fn into_query_args(self) -> Vec<QueryArg> {
        Vec::new()
    }
}

impl IntoQueryArgs for Vec<QueryArg> {
    fn into_query_args(self) -> Vec<QueryArg> {
        self
    }
}

macro_rules! single_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoQueryArgs for $ty {
                fn into_query_args(self) -> Vec<QueryArg> {
                    vec![QueryArg::from(self)]
                }
            }
        )*
    };
}

single_arg!(QueryArg, &str, String, Vec<String>, Vec<&str>, QueryOptions);

impl<const N: usize> IntoQueryArgs for [&str; N] {
    fn into_query_args(self) -> Vec<QueryArg> {
        vec![QueryArg::from(self)]
    }
}

impl<A: Into<QueryArg>> IntoQueryArgs for (A,) {
    fn into_query_args(self) -> Vec<QueryArg> {
        vec![self.0.into()]
    }
}

impl<A: Into<QueryArg>, B: Into<QueryArg>> IntoQueryArgs for (A, B) {
    fn into_query_args(self) -> Vec<QueryArg> {
        vec![self.0.into(), self.1.into()]
    }
}

impl<A: Into<QueryArg>, B: Into<QueryArg>, C: Into<QueryArg>> IntoQueryArgs for (A, B, C) {
    fn into_query_args(self) -> Vec<QueryArg> {
        vec![self.0.into(), self.1.into(), self.2.into()]
    }
}
