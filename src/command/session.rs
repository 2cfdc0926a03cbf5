use std::fmt;
use std::path::Path;

use csv::ReaderBuilder;
use log::{debug, info};
use prettytable::{Cell, Row, Table};

use super::error::{CommandError, CommandResult};
use super::parser::{Command, Selectors, parse};
use crate::record::Value;
use crate::recovery::{RecoveryManager, Transaction};
use crate::storage::Storage;

/// Result of one command, ready to be printed
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Message(String),
    Exit,
}

impl Output {
    fn table(header: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        Output::Table { header, rows }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Table { header, rows } => {
                let mut table = Table::new();
                table.add_row(Row::new(header.iter().map(|h| Cell::new(h)).collect()));
                for row in rows {
                    table.add_row(Row::new(row.iter().map(|v| Cell::new(v)).collect()));
                }
                write!(f, "{}", table)?;
                write!(f, "{} row(s)", rows.len())
            }
            Output::Message(message) => write!(f, "{}", message),
            Output::Exit => Ok(()),
        }
    }
}

/// A storage file, its log and at most one open transaction.
///
/// Updates outside `begin` ... `commit` run in a transaction of their own
/// so every change reaches the log.
pub struct Session {
    storage: Storage,
    recovery: RecoveryManager,
    current: Option<Transaction>,
}

impl Session {
    pub fn new(storage: Storage, recovery: RecoveryManager) -> Self {
        Self {
            storage,
            recovery,
            current: None,
        }
    }

    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    pub fn current_transaction(&self) -> Option<Transaction> {
        self.current
    }

    /// Parse and execute one input line
    pub fn run(&mut self, line: &str) -> CommandResult<Output> {
        let command = parse(line)?;
        debug!("executing {:?}", command);
        self.execute(command)
    }

    pub fn execute(&mut self, command: Command) -> CommandResult<Output> {
        match command {
            Command::Column(name, data_type) => {
                self.storage.add_column(&name, data_type)?;
                Ok(Output::Message(format!("added column {} {}", name, data_type)))
            }
            Command::Select(selectors) => self.select(selectors),
            Command::Insert(texts) => {
                self.insert(&texts)?;
                Ok(Output::Message("1 row inserted".to_string()))
            }
            Command::Find(text) => {
                let primary = self.parse_primary(&text)?;
                let header = self.column_names();
                let rows = self.storage.find(&primary)?.into_iter().collect();
                Ok(Output::table(header, rows))
            }
            Command::Update {
                primary,
                column,
                value,
            } => self.update(&primary, &column, &value),
            Command::Load(path) => {
                let count = self.load(Path::new(&path))?;
                Ok(Output::Message(format!("{} row(s) loaded", count)))
            }
            Command::Begin => {
                if let Some(txn) = self.current {
                    return Err(CommandError::TransactionActive(txn.id()));
                }
                let txn = self.recovery.new_transaction();
                let lsn = self.recovery.begin(&txn)?;
                self.current = Some(txn);
                Ok(Output::Message(format!("began txn {} at lsn {}", txn.id(), lsn)))
            }
            Command::Commit => {
                let txn = self.current.ok_or(CommandError::NoTransaction)?;
                let lsn = self.recovery.commit(&txn)?;
                self.current = None;
                Ok(Output::Message(format!("committed txn {} at lsn {}", txn.id(), lsn)))
            }
            Command::Abort => {
                let txn = self.current.ok_or(CommandError::NoTransaction)?;
                let lsn = self.recovery.abort(&txn)?;
                self.current = None;
                Ok(Output::Message(format!("aborted txn {} at lsn {}", txn.id(), lsn)))
            }
            Command::Recover => self.recover(),
            Command::Flush => {
                self.storage.flush()?;
                Ok(Output::Message("flushed".to_string()))
            }
            Command::Schema => {
                let rows = self
                    .storage
                    .schema()
                    .columns()
                    .iter()
                    .map(|c| vec![c.name.clone(), c.data_type.to_string()])
                    .collect();
                Ok(Output::Table {
                    header: vec!["column".to_string(), "type".to_string()],
                    rows,
                })
            }
            Command::Exit => Ok(Output::Exit),
        }
    }

    fn column_names(&self) -> Vec<String> {
        self.storage
            .schema()
            .columns()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    fn parse_primary(&self, text: &str) -> CommandResult<Value> {
        let column = self
            .storage
            .schema()
            .column(0)
            .ok_or(CommandError::EmptySchema)?;
        Ok(Value::parse(text, &column.data_type)?)
    }

    fn select(&mut self, selectors: Selectors) -> CommandResult<Output> {
        let header = match selectors {
            Selectors::All => self.column_names(),
            Selectors::List(columns) => columns,
        };
        let names: Vec<&str> = header.iter().map(String::as_str).collect();
        let rows = self.storage.select(&names)?;
        Ok(Output::table(header, rows))
    }

    fn insert<S: AsRef<str>>(&mut self, texts: &[S]) -> CommandResult<()> {
        let columns = self.storage.schema().columns();
        if columns.is_empty() {
            return Err(CommandError::EmptySchema);
        }
        if texts.len() != columns.len() {
            return Err(CommandError::ArityMismatch {
                expected: columns.len(),
                actual: texts.len(),
            });
        }

        let values = texts
            .iter()
            .zip(columns)
            .map(|(text, column)| Value::parse(text.as_ref(), &column.data_type))
            .collect::<Result<Vec<_>, _>>()?;
        self.storage.add(&values)?;
        Ok(())
    }

    fn update(&mut self, primary: &str, column: &str, value: &str) -> CommandResult<Output> {
        let primary = self.parse_primary(primary)?;
        let schema = self.storage.schema();
        let data_type = schema.columns()[schema.column_index(column)?].data_type;
        let value = Value::parse(value, &data_type)?;

        if let Some(txn) = self.current {
            let lsn = self
                .recovery
                .update_row(&mut self.storage, &txn, &primary, column, &value)?;
            return Ok(Output::Message(format!(
                "updated in txn {} at lsn {}",
                txn.id(),
                lsn
            )));
        }

        let txn = self.recovery.new_transaction();
        self.recovery.begin(&txn)?;
        if let Err(e) = self
            .recovery
            .update_row(&mut self.storage, &txn, &primary, column, &value)
        {
            self.recovery.abort(&txn)?;
            return Err(e.into());
        }
        let lsn = self.recovery.commit(&txn)?;
        Ok(Output::Message(format!("updated and committed at lsn {}", lsn)))
    }

    /// Insert every record of a headerless CSV file
    fn load(&mut self, path: &Path) -> CommandResult<usize> {
        let mut reader = ReaderBuilder::new().has_headers(false).from_path(path)?;
        let mut count = 0;
        for record in reader.records() {
            let record = record?;
            let texts: Vec<&str> = record.iter().map(str::trim).collect();
            self.insert(&texts)?;
            count += 1;
        }
        info!("loaded {} rows from {}", count, path.display());
        Ok(count)
    }

    /// Drop every buffered page as a crash would, then replay the log
    fn recover(&mut self) -> CommandResult<Output> {
        if let Some(txn) = self.current {
            return Err(CommandError::TransactionActive(txn.id()));
        }
        self.storage.clear()?;
        let summary = self.recovery.log_redo(&mut self.storage)?;
        Ok(Output::Message(format!(
            "recovered: {} committed txn(s), {} update(s) replayed, {} up to date, {} skipped",
            summary.winners, summary.applied, summary.up_to_date, summary.skipped
        )))
    }
}
