//! Command-line access to tables of a `SQLite` store.
//!
//! ```bash
//! # Column types of a table
//! tablekit --database app.sqlite schema Users
//!
//! # Insert with the email column encrypted
//! tablekit --database app.sqlite --key-file column.key --encrypt email \
//!     insert Users --set name=Bob --set email=b@x.com
//!
//! # Lookup on the encrypted column
//! tablekit --config store.json --encrypt email select Users --where email=b@x.com
//! ```
//!
//! Values given on the command line are text. They are converted to the
//! column type of the table before being bound.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use serde_json::json;
use tablekit::{
    Cipher, Connection, DeterministicCipher, EncryptedColumns, Record, StoreConfig, Table,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tablekit", version, about = "Query and update SQLite tables")]
struct Cli {
    /// JSON store configuration.
    #[arg(long, global = true, env = "TABLEKIT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file, used when no configuration is given.
    #[arg(long, global = true, env = "TABLEKIT_DATABASE", value_name = "FILE")]
    database: Option<PathBuf>,

    /// File holding the hex-encoded column key. Overrides the configuration.
    #[arg(long, global = true, env = "TABLEKIT_KEY_FILE", value_name = "FILE")]
    key_file: Option<PathBuf>,

    /// Column stored encrypted. Repeat for several columns.
    #[arg(long = "encrypt", global = true, value_name = "COLUMN")]
    encrypt: Vec<String>,

    /// Every column is stored encrypted.
    #[arg(long, global = true)]
    encrypt_all: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the columns of a table and their inferred types.
    Schema {
        /// Table name.
        table: String,
    },
    /// Print the rows matching every `--where` term.
    Select {
        /// Table name.
        table: String,
        /// Equality term.
        #[arg(long = "where", value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
        predicate: Vec<(String, String)>,
    },
    /// Print every row.
    SelectAll {
        /// Table name.
        table: String,
        /// Raw SQL appended to the query, e.g. "ORDER BY id LIMIT 10".
        #[arg(long, default_value = "")]
        suffix: String,
    },
    /// Insert one row. Omitted columns get type defaults.
    Insert {
        /// Table name.
        table: String,
        /// Column value.
        #[arg(long = "set", required = true, value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
    /// Update the rows matching every `--where` term.
    Update {
        /// Table name.
        table: String,
        /// New column value.
        #[arg(long = "set", required = true, value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
        /// Equality term.
        #[arg(long = "where", required = true, value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
        predicate: Vec<(String, String)>,
    },
    /// Print whether any row matches every `--where` term.
    Exists {
        /// Table name.
        table: String,
        /// Equality term.
        #[arg(long = "where", value_name = "COLUMN=VALUE", value_parser = parse_assignment)]
        predicate: Vec<(String, String)>,
    },
}

impl Command {
    fn table(&self) -> &str {
        match self {
            Self::Schema { table }
            | Self::Select { table, .. }
            | Self::SelectAll { table, .. }
            | Self::Insert { table, .. }
            | Self::Update { table, .. }
            | Self::Exists { table, .. } => table,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected COLUMN=VALUE, got '{raw}'")),
    }
}

fn to_record(pairs: Vec<(String, String)>) -> Record {
    pairs.into_iter().collect()
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

impl Cli {
    fn store_config(&self) -> Result<StoreConfig> {
        let mut config = match (&self.config, &self.database) {
            (Some(path), _) => StoreConfig::from_file(path)?,
            (None, Some(database)) => StoreConfig {
                database_path: database.clone(),
                ..StoreConfig::default()
            },
            (None, None) => bail!("either --config or --database is required"),
        };
        if let Some(key_file) = &self.key_file {
            config.encryption_key_path = Some(key_file.clone());
        }
        Ok(config)
    }

    fn encrypted_columns(&self) -> EncryptedColumns {
        if self.encrypt_all {
            EncryptedColumns::all()
        } else {
            EncryptedColumns::columns(self.encrypt.iter().cloned())
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.store_config()?;
    let conn = config
        .open_connection()
        .wrap_err("opening the database")?;
    tracing::debug!(path = %config.database_path.display(), "opened database");

    let cipher = config.load_cipher().wrap_err("loading the column key")?;
    let encrypted = cli.encrypted_columns();
    if !encrypted.is_empty() && cipher.is_none() {
        bail!("encrypted columns need a key, pass --key-file or set encryption_key_path");
    }

    let table = open_table(&conn, cli.command.table(), cipher.as_ref(), encrypted)?;
    let output = match cli.command {
        Command::Schema { .. } => {
            let columns = table
                .schema()
                .iter()
                .map(|(column, ty)| json!({ "column": column, "type": ty.to_string() }))
                .collect::<Vec<_>>();
            json!(columns)
        }
        Command::Select { predicate, .. } => json!(table.select(to_record(predicate))?),
        Command::SelectAll { suffix, .. } => json!(table.select_all(&suffix)?),
        Command::Insert { values, .. } => {
            json!({ "rows_changed": table.insert(to_record(values))? })
        }
        Command::Update {
            values, predicate, ..
        } => {
            let changed = table.update(to_record(values), to_record(predicate))?;
            json!({ "rows_changed": changed })
        }
        Command::Exists { predicate, .. } => {
            json!({ "exists": table.exists(to_record(predicate))? })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn open_table<'a>(
    conn: &'a Connection,
    name: &str,
    cipher: Option<&'a DeterministicCipher>,
    encrypted: EncryptedColumns,
) -> Result<Table<'a>> {
    let table = match cipher {
        Some(cipher) => {
            Table::try_with_encryption(conn, name, cipher as &dyn Cipher, encrypted)
        }
        None => Table::try_new(conn, name),
    };
    table.wrap_err_with(|| format!("opening table '{name}'"))
}
