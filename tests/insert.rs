mod common;

use common::{planner, position, table};
use shardroute::planner::{Error, Plan};
use shardroute::route;
use shardroute::sharding::Value;
use shardroute::statement::{
    Expr, InsertContext, InsertRow, ParameterMarker, StatementContext, StatementKind,
    ValueSegment,
};

/// Rows of a VALUES list written with `?`, `$n`, integers and quoted strings.
fn rows(sql: &str) -> Vec<InsertRow> {
    let chars = sql.chars().collect::<Vec<_>>();
    let mut rows = vec![];
    let mut parameter = 0;
    let mut i = position(sql, "VALUES", 0);

    while i < chars.len() {
        if chars[i] == '(' {
            let start = i;
            let stop = (i..chars.len()).find(|&j| chars[j] == ')').unwrap();
            let inner = chars[start + 1..stop].iter().collect::<String>();

            let mut values = vec![];
            let mut cursor = start + 1;
            for item in inner.split(", ") {
                let expr = if item == "?" {
                    parameter += 1;
                    Expr::param(parameter - 1)
                } else if let Some(n) = item.strip_prefix('$') {
                    Expr::Parameter(ParameterMarker::dollar(n.parse::<usize>().unwrap() - 1))
                } else if let Ok(n) = item.parse::<i64>() {
                    Expr::literal(n)
                } else {
                    Expr::literal(item.trim_matches('\''))
                };
                let length = item.chars().count();
                values.push(ValueSegment {
                    start: cursor,
                    stop: cursor + length - 1,
                    expr,
                });
                cursor += length + 2;
            }

            rows.push(InsertRow {
                start,
                stop,
                values,
            });
            i = stop;
        }
        i += 1;
    }

    rows
}

fn insert(sql: &str, columns: &[&str]) -> StatementContext {
    let last = columns.last().unwrap();
    let mut stmt = StatementContext::new(sql, StatementKind::Insert).table(table(sql, "t_order"));
    stmt.insert = Some(InsertContext {
        table: "t_order".into(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        columns_stop: Some(position(sql, last, 0) + last.len() - 1),
        rows: rows(sql),
    });
    stmt
}

fn key(plan: &Plan, row: usize) -> i64 {
    match plan.generated_keys[row] {
        Value::Integer(key) => key,
        ref other => panic!("generated key is {:?}", other),
    }
}

#[test]
fn test_generated_keys_for_every_row() {
    let sql = "INSERT INTO t_order (user_id, status) VALUES (?, ?), (?, ?), (?, ?)";
    let params = vec![
        Value::from(1),
        Value::from("a"),
        Value::from(1),
        Value::from("b"),
        Value::from(1),
        Value::from("c"),
    ];

    let plan = planner().plan(&insert(sql, &["user_id", "status"]), &params, None).unwrap();

    assert_eq!(plan.generated_keys.len(), 3);
    let keys = (0..3).map(|row| key(&plan, row)).collect::<Vec<_>>();
    assert!(keys[0] != keys[1] && keys[1] != keys[2] && keys[0] != keys[2]);

    assert!(!plan.units.is_empty() && plan.units.len() <= 3);
    assert!(plan.units.iter().all(|unit| unit.data_source == "ds_1"));

    let mut rows = 0;
    for unit in &plan.units {
        assert!(unit.sql.contains("(user_id, status, order_id) VALUES "));
        let routed = keys
            .iter()
            .filter(|key| unit.sql.contains(&format!(", {})", key)))
            .collect::<Vec<_>>();
        for key in &routed {
            assert_eq!(unit.tables[0].1, format!("t_order_{}", *key % 2));
        }
        assert_eq!(unit.parameters.len(), routed.len() * 2);
        assert_eq!(
            unit.generated_keys,
            routed.iter().map(|key| Value::from(**key)).collect::<Vec<_>>()
        );
        rows += routed.len();
    }
    assert_eq!(rows, 3);
}

#[test]
fn test_rows_split_between_tables() {
    let sql = "INSERT INTO t_order (user_id, order_id, status) VALUES (0, 1, 'a'), (0, 2, 'b')";
    let plan = planner()
        .plan(&insert(sql, &["user_id", "order_id", "status"]), &[], None)
        .unwrap();

    assert!(plan.generated_keys.is_empty());
    let sqls = plan
        .units
        .iter()
        .map(|unit| format!("{}: {}", unit.data_source, unit.sql))
        .collect::<Vec<_>>();
    assert_eq!(
        sqls,
        vec![
            "ds_0: INSERT INTO t_order_0 (user_id, order_id, status) VALUES (0, 2, 'b')",
            "ds_0: INSERT INTO t_order_1 (user_id, order_id, status) VALUES (0, 1, 'a')",
        ]
    );
    assert!(plan.units.iter().all(|unit| unit.generated_keys.is_empty()));
}

#[test]
fn test_generated_keys_per_unit() {
    let sql = "INSERT INTO t_order (user_id, status) VALUES (0, 'a'), (0, 'b'), (0, 'c'), (0, 'd')";
    let plan = planner()
        .plan(&insert(sql, &["user_id", "status"]), &[], None)
        .unwrap();

    assert_eq!(plan.generated_keys.len(), 4);
    let mut reported = vec![];
    for unit in &plan.units {
        assert_eq!(unit.data_source, "ds_0");
        assert!(!unit.generated_keys.is_empty());
        for key in &unit.generated_keys {
            let Value::Integer(key) = key else {
                panic!("generated key is {:?}", key);
            };
            assert_eq!(unit.tables[0].1, format!("t_order_{}", key % 2));
            assert!(unit.sql.contains(&format!(", {})", key)));
        }
        reported.extend(unit.generated_keys.iter().cloned());
    }

    reported.sort_by_key(|key| match key {
        Value::Integer(key) => *key,
        _ => 0,
    });
    let mut expected = plan.generated_keys.clone();
    expected.sort_by_key(|key| match key {
        Value::Integer(key) => *key,
        _ => 0,
    });
    assert_eq!(reported, expected);
}

#[test]
fn test_row_on_several_nodes() {
    let sql = "INSERT INTO t_order (order_id, status) VALUES (1, 'a')";
    let err = planner()
        .plan(&insert(sql, &["order_id", "status"]), &[], None)
        .unwrap_err();
    assert!(
        matches!(
            err,
            Error::Route(route::Error::InsertMultipleNodes { row: 0, nodes: 2, .. })
        ),
        "{:?}",
        err
    );
}

#[test]
fn test_null_key_is_generated() {
    let sql = "INSERT INTO t_order (user_id, order_id) VALUES (?, ?)";
    let plan = planner()
        .plan(
            &insert(sql, &["user_id", "order_id"]),
            &[Value::from(0), Value::Null],
            None,
        )
        .unwrap();

    let key = key(&plan, 0);
    assert_eq!(plan.units.len(), 1);
    assert_eq!(plan.units[0].data_source, "ds_0");
    assert_eq!(
        plan.units[0].sql,
        format!(
            "INSERT INTO t_order_{} (user_id, order_id) VALUES (?, {})",
            key % 2,
            key
        )
    );
    assert_eq!(plan.units[0].parameters, vec![Value::from(0)]);
}

#[test]
fn test_positional_parameters_are_kept() {
    let sql = "INSERT INTO t_order (user_id, status) VALUES ($1, $2), ($3, $4)";
    let params = vec![
        Value::from(0),
        Value::from("a"),
        Value::from(1),
        Value::from("b"),
    ];
    let plan = planner()
        .plan(&insert(sql, &["user_id", "status"]), &params, None)
        .unwrap();

    assert_eq!(plan.generated_keys.len(), 2);
    let data_sources = plan
        .units
        .iter()
        .map(|unit| unit.data_source.as_str())
        .collect::<Vec<_>>();
    assert!(data_sources.contains(&"ds_0") && data_sources.contains(&"ds_1"));

    for unit in &plan.units {
        assert_eq!(unit.parameters, params);
        if unit.data_source == "ds_0" {
            assert!(unit.sql.contains("($1, $2, "));
            assert!(!unit.sql.contains("$3"));
        }
    }
}
