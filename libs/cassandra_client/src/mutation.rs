//! Construction of batch mutations for inserts and deletions

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::common::{ClientError, ClientResult};
use crate::query::ResolvedQuery;
use crate::types::{
    Column, ColumnFamilyKind, ColumnOrSuperColumn, Deletion, Mutation, MutationMap,
    SlicePredicate, SuperColumn,
};

/// Source of write timestamps
///
/// Milliseconds since the Unix epoch, bumped by one whenever the wall clock
/// has not advanced past the previous timestamp. Two calls on the same
/// connection therefore never share a timestamp, and a removal issued after
/// a write always supersedes it.
#[derive(Debug, Default)]
pub struct WriteClock {
    last: AtomicI64,
}

impl WriteClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let mut previous = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = wall.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => previous = actual,
            }
        }
    }
}

/// Build the mutations for a `set` call.
///
/// `values` must serialize to a map: `{column: value}` for a standard family,
/// `{super_column: {sub_column: value}}` for a super family. Leaf values are
/// sent as strings; numbers and booleans are rendered with their JSON text.
pub fn build_insert<V: Serialize + ?Sized>(
    column_family: &str,
    kind: ColumnFamilyKind,
    key: &str,
    values: &V,
    timestamp: i64,
) -> ClientResult<MutationMap> {
    let values = top_level_map(values)?;

    let mutations = match kind {
        ColumnFamilyKind::Standard => values
            .into_iter()
            .map(|(name, value)| {
                let value = leaf_string(&name, &value)?;
                Ok(Mutation::Insert(ColumnOrSuperColumn::Column(Column::new(
                    name, value, timestamp,
                ))))
            })
            .collect::<ClientResult<Vec<_>>>()?,
        ColumnFamilyKind::Super => values
            .into_iter()
            .map(|(super_name, sub_values)| {
                let Value::Object(sub_values) = sub_values else {
                    return Err(ClientError::InvalidArguments(format!(
                        "super column '{}' must map sub-column names to values",
                        super_name
                    )));
                };
                let columns = sub_values
                    .into_iter()
                    .map(|(name, value)| {
                        let value = leaf_string(&name, &value)?;
                        Ok(Column::new(name, value, timestamp))
                    })
                    .collect::<ClientResult<Vec<_>>>()?;
                Ok(Mutation::Insert(ColumnOrSuperColumn::SuperColumn(
                    SuperColumn {
                        name: super_name,
                        columns,
                    },
                )))
            })
            .collect::<ClientResult<Vec<_>>>()?,
    };

    Ok(single_row(key, column_family, mutations))
}

/// Build the single deletion for a `remove` call.
///
/// Only an explicit column-name predicate narrows the deletion; a range
/// predicate is dropped and the whole row (or super column) is targeted.
pub fn build_deletion(key: &str, query: &ResolvedQuery, timestamp: i64) -> MutationMap {
    let predicate = match &query.predicate {
        SlicePredicate::ColumnNames(_) => Some(query.predicate.clone()),
        SlicePredicate::SliceRange(_) => None,
    };

    let deletion = Deletion {
        timestamp,
        super_column: query.column_parent.super_column.clone(),
        predicate,
    };

    single_row(
        key,
        &query.column_parent.column_family,
        vec![Mutation::Deletion(deletion)],
    )
}

fn single_row(key: &str, column_family: &str, mutations: Vec<Mutation>) -> MutationMap {
    let families = HashMap::from([(column_family.to_string(), mutations)]);
    HashMap::from([(key.to_string(), families)])
}

fn top_level_map<V: Serialize + ?Sized>(values: &V) -> ClientResult<Map<String, Value>> {
    match serde_json::to_value(values) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(ClientError::InvalidArguments(format!(
            "values must be a map of column names, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ClientError::InvalidArguments(format!(
            "values could not be serialized: {}",
            e
        ))),
    }
}

fn leaf_string(name: &str, value: &Value) -> ClientResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ClientError::InvalidArguments(format!(
            "column '{}' has a {} value; only strings, numbers and booleans are stored",
            name,
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{IntoQueryArgs, QueryOptions, resolve};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn row_mutations(map: &MutationMap, key: &str, cf: &str) -> Vec<Mutation> {
        map[key][cf].clone()
    }

    #[test]
    fn test_clock_is_strictly_increasing() {
        let clock = WriteClock::new();
        let mut previous = clock.next();
        for _ in 0..1000 {
            let next = clock.next();
            assert!(next > previous);
            previous = next;
        }
        assert!(previous >= Utc::now().timestamp_millis() - 5_000);
    }

    #[test]
    fn test_standard_insert_coerces_values() {
        let values = json!({"id": 1, "first_name": "Todd", "age": 24, "active": true});

        let map = build_insert("Standard", ColumnFamilyKind::Standard, "todd", &values, 42).unwrap();

        assert_eq!(map.len(), 1);
        let mutations = row_mutations(&map, "todd", "Standard");
        assert_eq!(mutations.len(), 4);
        let columns: BTreeMap<String, (String, i64)> = mutations
            .into_iter()
            .map(|m| match m {
                Mutation::Insert(ColumnOrSuperColumn::Column(c)) => (c.name, (c.value, c.timestamp)),
                other => panic!("unexpected mutation {:?}", other),
            })
            .collect();
        assert_eq!(columns["id"], ("1".to_string(), 42));
        assert_eq!(columns["age"], ("24".to_string(), 42));
        assert_eq!(columns["first_name"].0, "Todd");
        assert_eq!(columns["active"].0, "true");
    }

    #[test]
    fn test_insert_accepts_maps() {
        let values = BTreeMap::from([("a", "apple")]);
        let map = build_insert("names", ColumnFamilyKind::Standard, "fruits", &values, 1).unwrap();
        assert_eq!(
            row_mutations(&map, "fruits", "names"),
            vec![Mutation::Insert(ColumnOrSuperColumn::Column(Column::new(
                "a", "apple", 1
            )))]
        );
    }

    #[test]
    fn test_super_insert_embeds_sub_columns() {
        let values = json!({
            "10": {"visits": 29, "pageViews": 84},
            "11": {"visits": 14, "pageViews": 29}
        });

        let map = build_insert("metrics", ColumnFamilyKind::Super, "august_2011", &values, 7).unwrap();

        let mutations = row_mutations(&map, "august_2011", "metrics");
        assert_eq!(mutations.len(), 2);
        for mutation in mutations {
            let Mutation::Insert(ColumnOrSuperColumn::SuperColumn(sc)) = mutation else {
                panic!("expected a super column insert");
            };
            assert!(sc.name == "10" || sc.name == "11");
            assert_eq!(sc.columns.len(), 2);
            assert!(sc.columns.iter().all(|c| c.timestamp == 7));
        }
    }

    #[test]
    fn test_nesting_depth_is_checked() {
        let result = build_insert(
            "Standard",
            ColumnFamilyKind::Standard,
            "k",
            &json!({"address": {"city": "Madison"}}),
            1,
        );
        assert!(matches!(result, Err(ClientError::InvalidArguments(_))));

        let result = build_insert("Super", ColumnFamilyKind::Super, "k", &json!({"city": "Madison"}), 1);
        assert!(matches!(result, Err(ClientError::InvalidArguments(_))));

        let result = build_insert("Standard", ColumnFamilyKind::Standard, "k", &json!(["a"]), 1);
        assert!(matches!(result, Err(ClientError::InvalidArguments(_))));
    }

    #[test]
    fn test_deletion_with_column_names() {
        let query = resolve(
            "Standard",
            ColumnFamilyKind::Standard,
            ["first_name", "last_name"].into_query_args(),
        )
        .unwrap();

        let map = build_deletion("todd", &query, 9);

        let expected = Deletion {
            timestamp: 9,
            super_column: None,
            predicate: Some(SlicePredicate::ColumnNames(vec![
                "first_name".to_string(),
                "last_name".to_string(),
            ])),
        };
        assert_eq!(
            row_mutations(&map, "todd", "Standard"),
            vec![Mutation::Deletion(expected)]
        );
    }

    #[test]
    fn test_deletion_drops_range_predicate() {
        let query = resolve(
            "Standard",
            ColumnFamilyKind::Standard,
            QueryOptions::new().count(1).into_query_args(),
        )
        .unwrap();

        let map = build_deletion("todd", &query, 9);

        let Mutation::Deletion(deletion) = &row_mutations(&map, "todd", "Standard")[0] else {
            panic!("expected a deletion");
        };
        assert_eq!(deletion.predicate, None);
        assert_eq!(deletion.super_column, None);
    }

    #[test]
    fn test_deletion_scoped_to_super_column() {
        let query = resolve(
            "Super",
            ColumnFamilyKind::Super,
            ("address", ["city"]).into_query_args(),
        )
        .unwrap();

        let map = build_deletion("edgar", &query, 3);

        let Mutation::Deletion(deletion) = &row_mutations(&map, "edgar", "Super")[0] else {
            panic!("expected a deletion");
        };
        assert_eq!(deletion.super_column.as_deref(), Some("address"));
        assert_eq!(
            deletion.predicate,
            Some(SlicePredicate::ColumnNames(vec!["city".to_string()]))
        );
    }
}
