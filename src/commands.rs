//! Command execution.

use crate::Commands;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use walkv_core::{Config, Engine, FaultInjector};
use walkv_wal::{verify_wal, TransactionSequencer};

/// Runs a command against the files named by `config`.
pub fn execute(config: &Config, cmd: Commands) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Write { key, value } => {
            let mut engine = Engine::open(config)?;
            engine.write(&key, &value, true)?;
            println!("Wrote ({}={}) with fsync", key, value);
            Ok(ExitCode::SUCCESS)
        }

        Commands::WriteNosync { key, value } => {
            let mut engine = Engine::open(config)?;
            engine.write(&key, &value, false)?;
            println!("Wrote ({}={}) without fsync", key, value);
            Ok(ExitCode::SUCCESS)
        }

        Commands::CrashAfterWal { key, value, at } => {
            let mut engine = Engine::open(config)?;
            let report = engine.simulate_crash(&FaultInjector::new(at), &key, &value)?;
            if report.committed() {
                println!("Simulated crash AFTER WAL (before DB apply)");
            } else {
                println!(
                    "Simulated crash AFTER WAL (before DB apply; transaction {} stopped {})",
                    report.tid, report.point
                );
            }
            Ok(ExitCode::FAILURE)
        }

        Commands::Recover => {
            let mut engine = Engine::open(config)?;
            match engine.recover()? {
                Some(_) => println!("Recovery done. Applied committed transactions."),
                None => println!("No WAL file to recover from"),
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Display => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "---- WAL LOG ----")?;
            dump_file(&mut out, &config.wal_path())?;
            writeln!(out, "\n---- DB FILE ----")?;
            dump_file(&mut out, &config.snapshot_path())?;
            out.flush()?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Verify => {
            let wal_path = config.wal_path();
            let Some(report) = verify_wal(&wal_path)? else {
                println!("No WAL file to verify");
                return Ok(ExitCode::SUCCESS);
            };
            let next = TransactionSequencer::recover(&wal_path)?.peek();

            println!("WAL:            {}", wal_path.display());
            println!("records:        {}", report.records);
            println!("malformed:      {}", report.malformed);
            println!("committed:      {}", report.committed);
            println!("discarded:      {}", report.discarded);
            println!("orphan commits: {}", report.orphan_commits);
            println!("stray sets:     {}", report.stray_sets);
            match report.max_tid {
                Some(tid) => println!("max tid:        {}", tid),
                None => println!("max tid:        -"),
            }
            println!("next tid:       {}", next);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Copies a file to `out` as-is, or prints `(empty)` if it is missing or
/// has no content.
fn dump_file(out: &mut impl Write, path: &Path) -> io::Result<()> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return writeln!(out, "(empty)"),
        Err(e) => return Err(e),
    };
    if io::copy(&mut file, out)? == 0 {
        writeln!(out, "(empty)")?;
    }
    Ok(())
}
