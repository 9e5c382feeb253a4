pub mod bookkeeping;
pub mod bootstrap;
pub mod config;
pub mod driver;
pub mod executor;
pub mod graph;
pub mod migrator;
pub mod overlay;
pub mod scanner;
pub mod splitter;
pub mod version;

use std::path::PathBuf;

use thiserror::Error;


#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("no migration path from version {from} to version {to}")]
    NoMigrationPath { from: Version, to: Version },

    #[error("current version {0} is not known to any migration directory")]
    UnknownCurrentVersion(Version),

    #[error("invalid version syntax: {0:?}")]
    BadVersionSyntax(String),

    #[error("failed to read {}: {source}", .path.display())]
    ScriptReadFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("statement failed in step {edge}, file {file}: {message}")]
    ExecutionFailure {
        edge: String,
        file: String,
        message: String,
    },

    #[error("bookkeeping schema could not be migrated: {0}")]
    BootstrapFailure(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MigrateError>;

pub use driver::{Driver, SqliteDriver};
pub use graph::{Edge, Graph};
pub use migrator::{Migrator, MigratorOptions, VersionSource};
pub use version::Version;
