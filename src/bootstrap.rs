use once_cell::sync::Lazy;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::bookkeeping;
use crate::driver::Driver;
use crate::executor::execute_plan;
use crate::graph::{Edge, Graph};
use crate::overlay::Script;
use crate::version::Version;
use crate::{MigrateError, Result};

/// Reserved schema name the engine records itself under.
pub const ENGINE_SCHEMA: &str = "migration-directories";

/// The bookkeeping schema version this build of the engine requires.
pub const ENGINE_VERSION: &str = "0.01";

static REQUIRED: Lazy<Version> = Lazy::new(|| Version::parse(ENGINE_VERSION).unwrap());

// The engine's own schema ships embedded: install 0.01 creates the
// bookkeeping tables, transition 0.01-0 drops them. The first statements of
// the install run against a database that does not yet contain these tables,
// which is why current_version treats a missing table as absence.
const INSTALL_BOOKKEEPING: &str = "\
CREATE TABLE schema_version (
    schema TEXT NOT NULL PRIMARY KEY,
    version TEXT NOT NULL
);

CREATE TABLE schema_log (
    schema TEXT NOT NULL,
    from_version TEXT,
    to_version TEXT NOT NULL,
    at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
";

const DROP_BOOKKEEPING: &str = "\
DROP TABLE schema_log;
DROP TABLE schema_version;
";

fn engine_graph() -> Graph {
    Graph::new(vec![
        Edge {
            from: Version::zero(),
            to: REQUIRED.clone(),
            dir_name: ENGINE_VERSION.to_string(),
            scripts: vec![Script::embedded("100_bookkeeping.sql", INSTALL_BOOKKEEPING)],
        },
        Edge {
            from: REQUIRED.clone(),
            to: Version::zero(),
            dir_name: format!("{ENGINE_VERSION}-0"),
            scripts: vec![Script::embedded("100_drop_bookkeeping.sql", DROP_BOOKKEEPING)],
        },
    ])
}

/// Bring the engine's own bookkeeping schema to the version this build
/// requires. Idempotent; called before every full migration.
pub fn ensure_engine_schema(conn: &Connection, driver: &dyn Driver) -> Result<()> {
    let current = bookkeeping::current_version(conn, driver, ENGINE_SCHEMA)?
        .unwrap_or_else(Version::zero);
    if current == *REQUIRED {
        debug!("bookkeeping schema already at {}", *REQUIRED);
        return Ok(());
    }

    info!(
        "bootstrapping bookkeeping schema from {} to {}",
        current, *REQUIRED
    );
    let plan = engine_graph()
        .plan(&current, &REQUIRED)
        .map_err(|e| MigrateError::BootstrapFailure(e.to_string()))?;
    execute_plan(conn, driver, ENGINE_SCHEMA, &plan, true)
        .map_err(|e| MigrateError::BootstrapFailure(e.to_string()))
}

/// Tear the engine schema down. The removal plan drops the bookkeeping
/// tables themselves, so it runs without bookkeeping writes; there is no
/// table left to record the final transition in.
pub fn remove_engine_schema(conn: &Connection, driver: &dyn Driver) -> Result<()> {
    let Some(current) = bookkeeping::current_version(conn, driver, ENGINE_SCHEMA)? else {
        return Ok(());
    };

    info!("removing bookkeeping schema (was at {})", current);
    let plan = engine_graph()
        .plan(&current, &Version::zero())
        .map_err(|e| MigrateError::BootstrapFailure(e.to_string()))?;
    execute_plan(conn, driver, ENGINE_SCHEMA, &plan, false)
        .map_err(|e| MigrateError::BootstrapFailure(e.to_string()))
}
