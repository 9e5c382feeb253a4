use std::path::PathBuf;

use rusqlite::Connection;
use tracing::debug;

use crate::bookkeeping;
use crate::bootstrap;
use crate::config;
use crate::driver::{Driver, SqliteDriver};
use crate::executor::execute_plan;
use crate::graph::{Edge, Graph};
use crate::scanner;
use crate::version::Version;
use crate::{MigrateError, Result};

/// Names a code location a schema belongs to, used for defaulting: the
/// qualified name (`my::app`) becomes the schema name (`my-app`), and its
/// declared version, when present, becomes the desired version.
#[derive(Debug, Clone)]
pub struct VersionSource {
    pub name: String,
    pub version: Option<Version>,
}

impl VersionSource {
    pub fn new(name: impl Into<String>) -> Self {
        VersionSource {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }
}

/// Options recognized by [`Migrator::new`]. Everything except the schema
/// identity (a name or a source) has a default.
#[derive(Default)]
pub struct MigratorOptions {
    pub schema_name: Option<String>,
    pub desired_version: Option<Version>,
    pub source: Option<VersionSource>,
    pub driver: Option<Box<dyn Driver>>,
    pub base_dir: Option<PathBuf>,
    pub schema_dir: Option<PathBuf>,
}

impl MigratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_name(mut self, name: impl Into<String>) -> Self {
        self.schema_name = Some(name.into());
        self
    }

    pub fn desired_version(mut self, version: Version) -> Self {
        self.desired_version = Some(version);
        self
    }

    pub fn source(mut self, source: VersionSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn driver(mut self, driver: Box<dyn Driver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }
}

/// The migration engine's programmatic surface.
///
/// Owns nothing but its resolved options; the database handle stays with
/// the caller and is borrowed for the engine's exclusive use for the
/// lifetime of this value.
pub struct Migrator<'c> {
    conn: &'c Connection,
    driver: Box<dyn Driver>,
    schema_name: String,
    schema_dir: PathBuf,
    desired: Option<Version>,
}

impl<'c> Migrator<'c> {
    /// Resolve options against their defaults. The driver defaults to
    /// SQLite (inferred from the `rusqlite` handle); the schema directory
    /// to `<base>/<schema-name>`; the base directory to the configuration
    /// fallback. A missing schema identity is an error.
    pub fn new(conn: &'c Connection, options: MigratorOptions) -> Result<Self> {
        let MigratorOptions {
            schema_name,
            desired_version,
            source,
            driver,
            base_dir,
            schema_dir,
        } = options;

        let schema_name = schema_name
            .or_else(|| source.as_ref().map(|s| s.name.replace("::", "-")))
            .ok_or_else(|| {
                MigrateError::InvalidParameter(
                    "either schema_name or source must be given".to_string(),
                )
            })?;
        let desired = desired_version.or_else(|| source.and_then(|s| s.version));
        let driver = driver.unwrap_or_else(|| Box::new(SqliteDriver));
        let schema_dir = schema_dir.unwrap_or_else(|| {
            base_dir
                .unwrap_or_else(config::default_base_dir)
                .join(&schema_name)
        });
        debug!(
            "migrator for schema '{}' using {} under {}",
            schema_name,
            driver.name(),
            schema_dir.display()
        );

        Ok(Migrator {
            conn,
            driver,
            schema_name,
            schema_dir,
            desired,
        })
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// The recorded version of this schema, or `None` when absent. Missing
    /// bookkeeping tables read as absent.
    pub fn current_version(&self) -> Result<Option<Version>> {
        bookkeeping::current_version(self.conn, self.driver.as_ref(), &self.schema_name)
    }

    /// Compute the plan between two arbitrary versions without executing
    /// anything.
    pub fn plan(&self, from: &Version, to: &Version) -> Result<Vec<Edge>> {
        self.load_graph()?.plan(from, to)
    }

    /// Migrate to the desired version, defaulting to the highest version
    /// reachable from the current one. Returns the version the schema ends
    /// up at.
    pub fn migrate(&mut self) -> Result<Version> {
        let current = self.current_version()?.unwrap_or_else(Version::zero);
        let target = match &self.desired {
            Some(version) => version.clone(),
            None => self.load_graph()?.latest_reachable(&current)?,
        };
        self.migrate_to(&target)?;
        Ok(target)
    }

    /// Migrate to an explicit version, forward or backward.
    pub fn migrate_to(&mut self, target: &Version) -> Result<()> {
        let current = self.current_version()?.unwrap_or_else(Version::zero);
        let plan = self.load_graph()?.plan(&current, target)?;
        execute_plan(
            self.conn,
            self.driver.as_ref(),
            &self.schema_name,
            &plan,
            true,
        )
    }

    /// Remove the schema: migrate it to zero.
    pub fn delete_schema(&mut self) -> Result<()> {
        self.migrate_to(&Version::zero())
    }

    /// Ensure the engine's own bookkeeping schema is current, then migrate
    /// this schema. Two transactions, engine first.
    pub fn full_migrate(&mut self) -> Result<Version> {
        bootstrap::ensure_engine_schema(self.conn, self.driver.as_ref())?;
        self.migrate()
    }

    /// Remove this schema, then the engine's bookkeeping schema as well if
    /// no other schema remains installed.
    pub fn full_delete_schema(&mut self) -> Result<()> {
        self.delete_schema()?;
        let remaining = bookkeeping::installed_schemas(self.conn, self.driver.as_ref())?
            .into_iter()
            .filter(|name| name != bootstrap::ENGINE_SCHEMA)
            .count();
        if remaining == 0 {
            bootstrap::remove_engine_schema(self.conn, self.driver.as_ref())?;
        }
        Ok(())
    }

    fn load_graph(&self) -> Result<Graph> {
        let edges = scanner::scan(&self.schema_dir, self.driver.name())?;
        Ok(Graph::new(edges))
    }
}
