// Trial store fixtures shared by the integration tests
//
// Every store is a real SQLite file created with the recorder's schema, so the
// tests exercise the same read path as production runs.

#![allow(dead_code)]

use rusqlite::{params, Connection};
use scholar::store::create_schema;
use scholar::variable::TextKey;
use std::path::Path;

/// Input `x` (float, interval)
pub const X: i64 = 1;
/// Output `y` (text, categorical)
pub const Y: i64 = 2;

pub const TYPE_INTEGER: i64 = 1;
pub const TYPE_FLOAT: i64 = 2;
pub const TYPE_TEXT: i64 = 3;

pub const CATEGORICAL: i64 = 0;
pub const ORDINAL: i64 = 1;
pub const INTERVAL: i64 = 2;

/// Label recorded in bucket `x` of the scenario: "A" on even, "B" on odd
pub fn label(bucket: usize) -> &'static str {
    if bucket % 2 == 0 {
        "A"
    } else {
        "B"
    }
}

pub fn open(path: &Path) -> Connection {
    let conn = Connection::open(path).unwrap();
    create_schema(&conn).unwrap();
    conn
}

pub fn input(conn: &Connection, id: i64, name: &str, ty: i64, category: i64) {
    conn.execute(
        "INSERT INTO input_types VALUES (?1, ?2, ?3, ?4)",
        params![id, name, ty, category],
    )
    .unwrap();
}

pub fn output(conn: &Connection, id: i64, name: &str, ty: i64, category: i64) {
    conn.execute(
        "INSERT INTO output_types VALUES (?1, ?2, ?3, ?4)",
        params![id, name, ty, category],
    )
    .unwrap();
}

pub fn problem(conn: &Connection, id: i64, inputs: &[i64], outputs: &[i64]) {
    conn.execute(
        "INSERT INTO problem_descriptions VALUES (?1, ?2, ?3)",
        params![id, inputs.len() as i64, outputs.len() as i64],
    )
    .unwrap();
    for (index, variable) in inputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO problem_inputs VALUES (?1, ?2, ?3)",
            params![id, variable, index as i64],
        )
        .unwrap();
    }
    for (index, variable) in outputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO problem_outputs VALUES (?1, ?2, ?3)",
            params![id, variable, index as i64],
        )
        .unwrap();
    }
}

pub fn trial(conn: &Connection, id: i64, problem: i64, result: f64) {
    conn.execute(
        "INSERT INTO trials VALUES (?1, ?2, ?3)",
        params![id, problem, result],
    )
    .unwrap();
}

pub fn discrete(conn: &Connection, trial: i64, variable: i64, value: i64) {
    conn.execute(
        "INSERT INTO trial_values VALUES (?1, ?2, ?3, NULL)",
        params![trial, variable, value],
    )
    .unwrap();
}

pub fn real(conn: &Connection, trial: i64, variable: i64, value: f64) {
    conn.execute(
        "INSERT INTO trial_values VALUES (?1, ?2, NULL, ?3)",
        params![trial, variable, value],
    )
    .unwrap();
}

/// Problem 1: inputs `[x]`, outputs `[y]`; one trial per x in 0..10, y alternating
pub fn seed_scenario(path: &Path) -> Connection {
    let conn = open(path);
    input(&conn, X, "x", TYPE_FLOAT, INTERVAL);
    output(&conn, Y, "y", TYPE_TEXT, CATEGORICAL);
    problem(&conn, 1, &[X], &[Y]);
    for x in 0..10 {
        let id = 100 + x as i64;
        trial(&conn, id, 1, 1.0 + x as f64 / 10.0);
        real(&conn, id, X, x as f64);
        discrete(&conn, id, Y, TextKey::of(label(x)).0);
    }
    conn
}
