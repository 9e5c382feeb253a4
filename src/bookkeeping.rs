use rusqlite::{params, Connection};

use crate::driver::Driver;
use crate::version::Version;
use crate::Result;

/// Current version per schema name; a row exists iff the schema is installed.
pub const VERSION_TABLE: &str = "schema_version";

/// Append-only migration history.
pub const LOG_TABLE: &str = "schema_log";

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Look up the recorded version of `schema`, or `None` when absent.
///
/// A missing bookkeeping table reads as absent rather than raising: during
/// bootstrap the very first install plan is what creates the tables, and the
/// engine has to be able to ask "am I installed?" before that.
pub fn current_version(
    conn: &Connection,
    driver: &dyn Driver,
    schema: &str,
) -> Result<Option<Version>> {
    let lookup = conn.query_row(
        "SELECT version FROM schema_version WHERE schema = ?1",
        params![schema],
        |row| row.get::<_, String>(0),
    );
    match lookup {
        Ok(text) => Ok(Some(Version::parse(&text)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(ref e) if driver.is_missing_table(e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Every schema name currently recorded as installed. A missing table reads
/// as "none installed".
pub fn installed_schemas(conn: &Connection, driver: &dyn Driver) -> Result<Vec<String>> {
    let mut stmt = match conn.prepare("SELECT schema FROM schema_version ORDER BY schema") {
        Ok(stmt) => stmt,
        Err(ref e) if driver.is_missing_table(e) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut schemas = Vec::new();
    for row in rows {
        schemas.push(row?);
    }
    Ok(schemas)
}

/// The statements recording one transition of `schema` from `from` to `to`.
///
/// The store never executes anything; the executor interleaves these into
/// the same transaction as the step's scripts. An edge out of zero INSERTs
/// the `schema_version` row, an edge into zero DELETEs it, anything else
/// UPDATEs it; every edge appends one `schema_log` row, with a zero `from`
/// recorded as NULL.
pub fn record_transition(
    driver: &dyn Driver,
    schema: &str,
    from: &Version,
    to: &Version,
) -> Vec<String> {
    let mut statements = Vec::with_capacity(2);

    if to.is_zero() {
        statements.push(format!(
            "DELETE FROM schema_version WHERE schema = {}",
            quote(schema)
        ));
    } else if from.is_zero() {
        statements.push(format!(
            "INSERT INTO schema_version (schema, version) VALUES ({}, {})",
            quote(schema),
            quote(to.as_str())
        ));
    } else {
        statements.push(format!(
            "UPDATE schema_version SET version = {} WHERE schema = {}",
            quote(to.as_str()),
            quote(schema)
        ));
    }

    let from_literal = if from.is_zero() {
        "NULL".to_string()
    } else {
        quote(from.as_str())
    };
    statements.push(format!(
        "INSERT INTO schema_log (schema, from_version, to_version, at) VALUES ({}, {}, {}, {})",
        quote(schema),
        from_literal,
        quote(to.as_str()),
        driver.now_expr()
    ));

    statements
}

/// Remove the `schema_version` row without touching `schema_log`; the audit
/// trail outlives the schema.
pub fn drop_schema_record(schema: &str) -> Vec<String> {
    vec![format!(
        "DELETE FROM schema_version WHERE schema = {}",
        quote(schema)
    )]
}
