use rusqlite::Connection;
use tracing::{debug, info};

use crate::bookkeeping;
use crate::driver::Driver;
use crate::graph::Edge;
use crate::splitter::split_statements;
use crate::{MigrateError, Result};

// Pseudo file name reported when a bookkeeping statement fails.
const BOOKKEEPING_FILE: &str = "<bookkeeping>";

/// Execute a migration plan for `schema` inside one transaction.
///
/// For each edge in order: every script is read, split into statements and
/// streamed to the connection, then the edge's bookkeeping statements run.
/// The first failing statement rolls the whole transaction back, so partial
/// progress is never observable. An empty plan is a no-op and opens no
/// transaction.
///
/// `with_bookkeeping` is only ever false for the engine schema's own
/// removal plan, whose scripts drop the bookkeeping tables themselves.
pub fn execute_plan(
    conn: &Connection,
    driver: &dyn Driver,
    schema: &str,
    plan: &[Edge],
    with_bookkeeping: bool,
) -> Result<()> {
    if plan.is_empty() {
        debug!("empty plan for schema '{}', nothing to do", schema);
        return Ok(());
    }

    conn.execute_batch(driver.begin_sql())?;
    match run_edges(conn, driver, schema, plan, with_bookkeeping) {
        Ok(()) => {
            conn.execute_batch(driver.commit_sql())?;
            info!(
                "schema '{}' migrated from {} to {} in {} step(s)",
                schema,
                plan[0].from,
                plan[plan.len() - 1].to,
                plan.len()
            );
            Ok(())
        }
        Err(e) => {
            // Rollback errors are secondary; the original failure is what
            // the caller needs to see.
            let _ = conn.execute_batch(driver.rollback_sql());
            Err(e)
        }
    }
}

fn run_edges(
    conn: &Connection,
    driver: &dyn Driver,
    schema: &str,
    plan: &[Edge],
    with_bookkeeping: bool,
) -> Result<()> {
    for edge in plan {
        info!(
            "applying step {} ({} -> {}) for schema '{}'",
            edge.dir_name, edge.from, edge.to, schema
        );
        for script in &edge.scripts {
            debug!("running script {}/{}", edge.dir_name, script.name);
            let body = script.read_body()?;
            for stmt in split_statements(&body) {
                conn.execute_batch(&stmt)
                    .map_err(|e| MigrateError::ExecutionFailure {
                        edge: edge.dir_name.clone(),
                        file: script.name.clone(),
                        message: e.to_string(),
                    })?;
            }
        }
        if with_bookkeeping {
            for stmt in bookkeeping::record_transition(driver, schema, &edge.from, &edge.to) {
                conn.execute_batch(&stmt)
                    .map_err(|e| MigrateError::ExecutionFailure {
                        edge: edge.dir_name.clone(),
                        file: BOOKKEEPING_FILE.to_string(),
                        message: e.to_string(),
                    })?;
            }
        }
    }
    Ok(())
}
