//! Read-only adapter over the SQLite trial store written by the tuning recorder
//!
//! Tables (all created by the recorder):
//!
//! ```text
//! input_types / output_types (id, name, type, statistical_category)
//! problem_descriptions       (id, problem_inputs, problem_outputs)
//! problem_inputs / outputs   (problem_id, variable_id, variable_index)
//! trials                     (trial_id, problem_id, result)
//! trial_values               (trial_id, variable_id, discrete_result, real_result)
//! candidate_sets             (id, continuous_value, discrete_value)   optional
//! optimization_goals         (id, optimized_type, goal_type)          unused
//! ```

use crate::catalog::{Catalog, Problem};
use crate::error::{CompileError, Result};
use crate::variable::{
    ProblemId, Role, StatisticalCategory, TrialId, Value, ValueType, Variable, VariableId,
};
use rusqlite::{params, Connection, OpenFlags};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Schema the recorder creates; used by tests and tooling that seed stores
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS input_types(id int PRIMARY KEY, name text NOT NULL, type int NOT NULL, statistical_category int NOT NULL);
CREATE TABLE IF NOT EXISTS output_types(id int PRIMARY KEY, name text NOT NULL, type int NOT NULL, statistical_category int NOT NULL);
CREATE TABLE IF NOT EXISTS optimization_goals(id int PRIMARY KEY, optimized_type int, goal_type int);
CREATE TABLE IF NOT EXISTS problem_descriptions(id int, problem_inputs int, problem_outputs int);
CREATE TABLE IF NOT EXISTS problem_inputs(problem_id int, variable_id int, variable_index int);
CREATE TABLE IF NOT EXISTS problem_outputs(problem_id int, variable_id int, variable_index int);
CREATE TABLE IF NOT EXISTS trials(trial_id int, problem_id int, result real);
CREATE TABLE IF NOT EXISTS candidate_sets(id int, continuous_value real, discrete_value int);
CREATE TABLE IF NOT EXISTS trial_values(trial_id int, variable_id int, discrete_result int, real_result real);
";

/// Create the recorder's tables on `conn`
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Store file name for an optional MPI rank
pub fn database_name(rank: Option<&str>) -> String {
    match rank {
        Some(rank) => format!("tuning_db{}.db", rank),
        None => "tuning_db.db".to_string(),
    }
}

/// Where the recorder writes by default: one store per MPI rank
pub fn default_database_path() -> PathBuf {
    let rank = std::env::var("OMPI_COMM_WORLD_RANK").ok();
    PathBuf::from(database_name(rank.as_deref()))
}

/// Open trial store
pub struct TrialStore {
    conn: Connection,
}

impl TrialStore {
    /// Open an existing store without write access
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!("Opened trial store {}", path.display());
        Ok(Self { conn })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Read every table into an immutable catalog
    pub fn load_catalog(&self) -> Result<Catalog> {
        let mut builder = Catalog::builder();

        for (table, role) in [("input_types", Role::Input), ("output_types", Role::Output)] {
            for variable in self.variables(table, role)? {
                builder.variable(variable);
            }
        }

        let inputs = self.problem_variables("problem_inputs")?;
        let outputs = self.problem_variables("problem_outputs")?;
        for (id, declared) in self.problem_descriptions()? {
            let problem = Problem {
                id,
                inputs: inputs.get(&id).cloned().unwrap_or_default(),
                outputs: outputs.get(&id).cloned().unwrap_or_default(),
            };
            if let Some((n_inputs, n_outputs)) = declared {
                if n_inputs != problem.inputs.len() as i64
                    || n_outputs != problem.outputs.len() as i64
                {
                    warn!(
                        "Problem {} declares {} inputs and {} outputs, found {} and {}",
                        id,
                        n_inputs,
                        n_outputs,
                        problem.inputs.len(),
                        problem.outputs.len()
                    );
                }
            }
            builder.problem(problem);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT trial_id, problem_id, result FROM trials ORDER BY trial_id")?;
        let trials = stmt.query_map([], |row| {
            let result: Option<f64> = row.get(2)?;
            Ok((
                row.get::<_, TrialId>(0)?,
                row.get::<_, ProblemId>(1)?,
                result.unwrap_or(f64::NAN),
            ))
        })?;
        for trial in trials {
            let (id, problem, result) = trial?;
            builder.trial_header(id, problem, result);
        }

        let mut stmt = self.conn.prepare(
            "SELECT trial_id, variable_id, discrete_result, real_result FROM trial_values",
        )?;
        let values = stmt.query_map([], |row| {
            Ok((
                row.get::<_, TrialId>(0)?,
                row.get::<_, VariableId>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })?;
        for value in values {
            let (trial, variable, discrete, real) = value?;
            let value = match (discrete, real) {
                (Some(d), None) => Value::Discrete(d),
                (None, Some(r)) => Value::Continuous(r),
                _ => return Err(CompileError::MalformedTrialValue { trial, variable }),
            };
            builder.trial_value(trial, variable, value);
        }

        if self.has_table("candidate_sets")? {
            let mut stmt = self.conn.prepare(
                "SELECT id, continuous_value, discrete_value FROM candidate_sets ORDER BY rowid",
            )?;
            let candidates = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, VariableId>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            })?;
            for candidate in candidates {
                let (variable, continuous, discrete) = candidate?;
                match discrete
                    .map(Value::Discrete)
                    .or(continuous.map(Value::Continuous))
                {
                    Some(value) => {
                        builder.candidate(variable, value);
                    }
                    None => warn!("Ignoring empty candidate for variable {}", variable),
                }
            }
        }

        builder.build()
    }

    fn variables(&self, table: &str, role: Role) -> Result<Vec<Variable>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, name, type, statistical_category FROM {} ORDER BY id",
            table
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, VariableId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut variables = Vec::new();
        for row in rows {
            let (id, name, type_code, category_code) = row?;
            variables.push(Variable {
                id,
                name,
                value_type: ValueType::from_code(id, type_code)?,
                category: StatisticalCategory::from_code(id, category_code)?,
                role,
            });
        }
        Ok(variables)
    }

    /// Variable ids per problem in `variable_index` order
    fn problem_variables(&self, table: &str) -> Result<BTreeMap<ProblemId, Vec<VariableId>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT problem_id, variable_id FROM {} ORDER BY problem_id, variable_index",
            table
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, ProblemId>(0)?, row.get::<_, VariableId>(1)?))
        })?;

        let mut map: BTreeMap<ProblemId, Vec<VariableId>> = BTreeMap::new();
        for row in rows {
            let (problem, variable) = row?;
            map.entry(problem).or_default().push(variable);
        }
        Ok(map)
    }

    /// Problem ids with their declared (inputs, outputs) counts when recorded
    fn problem_descriptions(&self) -> Result<Vec<(ProblemId, Option<(i64, i64)>)>> {
        let mut stmt = self.conn.prepare("SELECT * FROM problem_descriptions ORDER BY 1")?;
        let with_counts = stmt.column_count() >= 3;
        let rows = stmt.query_map([], |row| {
            let id: ProblemId = row.get(0)?;
            if !with_counts {
                return Ok((id, None));
            }
            let inputs: Option<i64> = row.get(1)?;
            let outputs: Option<i64> = row.get(2)?;
            Ok((id, inputs.zip(outputs)))
        })?;

        let mut problems: Vec<(ProblemId, Option<(i64, i64)>)> = Vec::new();
        for row in rows {
            let row = row?;
            if problems.last().map(|(id, _)| *id) == Some(row.0) {
                continue;
            }
            problems.push(row);
        }
        Ok(problems)
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
