use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use pagedb::{Config, ConfigResult, Output, RecoveryManager, Session};

/// Interactive shell over a single-table storage file and its redo log
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the storage and log files
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Frames in the buffer pool
    #[arg(long)]
    pool_capacity: Option<usize>,

    /// Fan-out used when a new storage file is created
    #[arg(long)]
    max_degree: Option<usize>,
}

impl Args {
    fn config(&self) -> ConfigResult<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(capacity) = self.pool_capacity {
            config.pool_capacity = capacity;
        }
        if let Some(degree) = self.max_degree {
            config.max_degree = degree;
        }
        config.validate()?;
        Ok(config)
    }
}

fn open_session(args: &Args) -> Result<Session, Box<dyn std::error::Error>> {
    let config = args.config()?;
    let storage = config.open_storage()?;
    let recovery = RecoveryManager::new(config.open_log()?)?;
    Ok(Session::new(storage, recovery))
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut session = match open_session(&args) {
        Ok(session) => session,
        Err(e) => {
            error!("failed to open storage: {}", e);
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    loop {
        match rl.readline("pagedb > ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());
                match session.run(&line) {
                    Ok(Output::Exit) => break,
                    Ok(output) => println!("{}", output),
                    Err(e) => println!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
            }
            Err(ReadlineError::Eof) => {
                println!("Exited");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    // Inserts are not logged, so they only survive through a flush
    if let Some(txn) = session.current_transaction() {
        println!("txn {} left open, skipping flush", txn.id());
        return ExitCode::SUCCESS;
    }
    if let Err(e) = session.storage_mut().flush() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
