use crate::common::{ClientError, ClientResult};
use crate::types::{ColumnFamilyKind, ColumnParent, ConsistencyLevel, SlicePredicate};

use super::args::QueryArg;

/// Canonical form of a call's trailing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub column_parent: ColumnParent,
    pub predicate: SlicePredicate,
    /// `None` means "use the connection default for this kind of operation"
    pub consistency_level: Option<ConsistencyLevel>,
}

/// Resolve `[super_column?, names_or_options?, options?]` for a column family.
///
/// Rules, applied left to right:
/// 1. For a super column family, a leading name selects the super column.
/// 2. A name or a list of names becomes an explicit column-name predicate;
///    an options value may follow, of which only the consistency level is used.
/// 3. Otherwise an options value is overlaid onto the default range.
/// 4. With nothing left, the default range is used.
///
/// Anything left over after these rules is rejected.
pub fn resolve(
    column_family: &str,
    kind: ColumnFamilyKind,
    args: Vec<QueryArg>,
) -> ClientResult<ResolvedQuery> {
    let mut args = args.into_iter().peekable();
    let mut column_parent = ColumnParent::new(column_family);

    if kind == ColumnFamilyKind::Super
        && let Some(QueryArg::Name(super_column)) =
            args.next_if(|arg| matches!(arg, QueryArg::Name(_)))
    {
        column_parent.super_column = Some(super_column);
    }

    let (predicate, consistency_level) = match args.next() {
        None => (SlicePredicate::default(), None),
        Some(QueryArg::Name(name)) => (
            SlicePredicate::ColumnNames(vec![name]),
            trailing_consistency(&mut args),
        ),
        Some(QueryArg::Names(names)) => (
            SlicePredicate::ColumnNames(names),
            trailing_consistency(&mut args),
        ),
        Some(QueryArg::Options(options)) => (
            SlicePredicate::SliceRange(options.slice_range()),
            options.consistency_level,
        ),
    };

    if let Some(extra) = args.next() {
        return Err(ClientError::InvalidArguments(format!(
            "unexpected {} argument for {} column family '{}'",
            extra.shape(),
            kind,
            column_family
        )));
    }

    Ok(ResolvedQuery {
        column_parent,
        predicate,
        consistency_level,
    })
}

fn trailing_consistency(
    args: &mut std::iter::Peekable<std::vec::IntoIter<QueryArg>>,
) -> Option<ConsistencyLevel> {
    match args.next_if(|arg| matches!(arg, QueryArg::Options(_))) {
        Some(QueryArg::Options(options)) => options.consistency_level,
        _ => None,
    }
}
