//! The durability engine.
//!
//! Write path: the sequencer issues an id, the Begin/Set/Commit records are
//! appended to the WAL, then the store is mutated and the snapshot rewritten.
//!
//! Recovery path: the snapshot is loaded, the WAL is replayed from the
//! start, and the merged store is persisted again.
//!
//! A single process owns the files at a time; nothing here locks them.

use crate::config::Config;
use crate::error::CoreError;
use crate::fault::{CrashReport, FaultInjector};
use crate::recovery::RecoveryReplayer;
use walkv_storage::{KeyValueStore, SnapshotWriter};
use walkv_wal::{
    check_entry, open_records, LogRecord, LogStats, LogWriter, ReplayReport,
    TransactionSequencer, TxnId,
};

/// Key-value store backed by a WAL and a snapshot file.
pub struct Engine {
    store: KeyValueStore,
    sequencer: TransactionSequencer,
    log: LogWriter,
    snapshot: SnapshotWriter,
}

impl Engine {
    /// Opens the engine: loads the snapshot and rebuilds the transaction
    /// sequencer from the WAL.
    pub fn open(config: &Config) -> Result<Self, CoreError> {
        let snapshot = SnapshotWriter::new(config.snapshot_path());
        let mut store = KeyValueStore::new(config.store_limits());
        if let Some(entries) = snapshot.load()? {
            store.load(entries)?;
        }

        let wal_path = config.wal_path();
        let sequencer = TransactionSequencer::recover(&wal_path)?;
        let log = LogWriter::new(wal_path);

        tracing::info!(
            wal = %log.path().display(),
            snapshot = %snapshot.path().display(),
            entries = store.len(),
            next_tid = sequencer.peek(),
            "engine opened"
        );

        Ok(Self {
            store,
            sequencer,
            log,
            snapshot,
        })
    }

    /// Logs, applies and persists a single write.
    ///
    /// With `durable` set every WAL record and the snapshot are fsynced;
    /// without it a crash may lose the write even though this returned.
    /// Entries the store would reject are refused before anything is logged.
    pub fn write(&mut self, key: &str, value: &str, durable: bool) -> Result<TxnId, CoreError> {
        check_entry(key, value)?;
        self.store.check_set(key, value)?;

        let tid = self.sequencer.next_id()?;
        for record in LogRecord::transaction(tid, key, value) {
            self.log.append(&record, durable)?;
        }

        self.store.apply_set(key, value)?;
        self.snapshot.persist(&self.store, durable)?;

        tracing::info!(tid, key, durable, "write committed");
        Ok(tid)
    }

    /// Rebuilds the store from the snapshot plus every committed transaction
    /// in the WAL, then rewrites the snapshot durably.
    ///
    /// Returns `None` without touching anything when there is no WAL.
    pub fn recover(&mut self) -> Result<Option<ReplayReport>, CoreError> {
        let Some(records) = open_records(self.log.path())? else {
            tracing::info!(wal = %self.log.path().display(), "no WAL to recover from");
            return Ok(None);
        };

        let entries = self.snapshot.load()?.unwrap_or_default();
        self.store.load(entries)?;

        let report = RecoveryReplayer::new(&mut self.store).replay(records)?;
        self.snapshot.persist(&self.store, true)?;

        tracing::info!(entries = self.store.len(), "recovery complete");
        Ok(Some(report))
    }

    /// Durably logs a transaction through `injector` and stops before the
    /// store or snapshot see it.
    pub fn simulate_crash(
        &mut self,
        injector: &FaultInjector,
        key: &str,
        value: &str,
    ) -> Result<CrashReport, CoreError> {
        injector.simulate_crash(&mut self.log, &mut self.sequencer, key, value)
    }

    /// Returns the in-memory store.
    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    /// Returns the transaction sequencer.
    pub fn sequencer(&self) -> &TransactionSequencer {
        &self.sequencer
    }

    /// Returns WAL I/O statistics for this process.
    pub fn log_stats(&self) -> LogStats {
        self.log.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::CrashPoint;
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;
    use walkv_storage::load_snapshot;

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.storage.data_dir = dir.to_path_buf();
        config
    }

    fn snapshot_map(config: &Config) -> BTreeMap<String, String> {
        load_snapshot(config.snapshot_path())
            .unwrap()
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    fn map(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_write_logs_then_persists() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let mut engine = Engine::open(&config).unwrap();

        assert_eq!(engine.write("a", "1", true).unwrap(), 1);
        assert_eq!(engine.write("b", "2", false).unwrap(), 2);

        let wal = std::fs::read_to_string(config.wal_path()).unwrap();
        assert_eq!(
            wal,
            "TRANSACTION 1 BEGIN\nSET a 1\nTRANSACTION 1 COMMIT\n\
             TRANSACTION 2 BEGIN\nSET b 2\nTRANSACTION 2 COMMIT\n"
        );
        assert_eq!(snapshot_map(&config), map(&[("a", "1"), ("b", "2")]));
        assert_eq!(engine.log_stats().syncs, 3);
    }

    #[test]
    fn test_reopen_continues_ids_and_loads_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        {
            let mut engine = Engine::open(&config).unwrap();
            engine.write("a", "1", true).unwrap();
            engine.write("b", "2", true).unwrap();
        }

        let mut engine = Engine::open(&config).unwrap();
        assert_eq!(engine.store().get("a"), Some("1"));
        assert_eq!(engine.sequencer().peek(), 3);
        assert_eq!(engine.write("c", "3", true).unwrap(), 3);
    }

    #[test]
    fn test_crash_after_wal_then_recover() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        {
            let mut engine = Engine::open(&config).unwrap();
            engine.write("a", "1", true).unwrap();
            engine.write("b", "2", true).unwrap();
            let report = engine
                .simulate_crash(&FaultInjector::default(), "c", "3")
                .unwrap();
            assert!(report.committed());
            assert_eq!(engine.store().get("c"), None);
        }
        assert_eq!(snapshot_map(&config), map(&[("a", "1"), ("b", "2")]));

        let mut engine = Engine::open(&config).unwrap();
        let report = engine.recover().unwrap().unwrap();
        assert_eq!(report.committed, 3);
        assert_eq!(
            snapshot_map(&config),
            map(&[("a", "1"), ("b", "2"), ("c", "3")])
        );
    }

    #[test]
    fn test_crash_before_commit_then_recover() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        {
            let mut engine = Engine::open(&config).unwrap();
            engine.write("a", "1", true).unwrap();
            engine.write("b", "2", true).unwrap();
            engine
                .simulate_crash(&FaultInjector::new(CrashPoint::BeforeCommit), "c", "3")
                .unwrap();
        }

        let mut engine = Engine::open(&config).unwrap();
        engine.recover().unwrap();
        assert_eq!(snapshot_map(&config), map(&[("a", "1"), ("b", "2")]));

        // The torn transaction keeps its id; the next write does not reuse it.
        assert_eq!(engine.write("d", "4", true).unwrap(), 4);
    }

    #[test]
    fn test_commit_appended_later_is_recovered() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        {
            let mut engine = Engine::open(&config).unwrap();
            engine
                .simulate_crash(&FaultInjector::new(CrashPoint::BeforeCommit), "c", "3")
                .unwrap();
        }

        let mut engine = Engine::open(&config).unwrap();
        engine.recover().unwrap();
        assert_eq!(engine.store().get("c"), None);

        let mut log = LogWriter::new(config.wal_path());
        log.append(&LogRecord::Commit { tid: 1 }, true).unwrap();

        let mut engine = Engine::open(&config).unwrap();
        engine.recover().unwrap();
        assert_eq!(engine.store().get("c"), Some("3"));
    }

    #[test]
    fn test_recover_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let mut engine = Engine::open(&config).unwrap();
        engine.write("a", "1", true).unwrap();
        engine.write("a", "2", true).unwrap();
        engine
            .simulate_crash(&FaultInjector::default(), "b", "3")
            .unwrap();

        engine.recover().unwrap();
        let first = snapshot_map(&config);
        let wal_before = std::fs::read(config.wal_path()).unwrap();

        engine.recover().unwrap();
        assert_eq!(snapshot_map(&config), first);
        assert_eq!(std::fs::read(config.wal_path()).unwrap(), wal_before);
        assert_eq!(first, map(&[("a", "2"), ("b", "3")]));
    }

    #[test]
    fn test_recover_without_wal_is_noop() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let mut engine = Engine::open(&config).unwrap();
        assert!(engine.recover().unwrap().is_none());
        assert!(!config.snapshot_path().exists());
        assert!(!config.wal_path().exists());
    }

    #[test]
    fn test_capacity_refused_before_logging() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.limits.max_entries = 1;
        let mut engine = Engine::open(&config).unwrap();

        engine.write("a", "1", true).unwrap();
        let err = engine.write("b", "2", true).unwrap_err();
        assert_eq!(err.error_code(), "CAPACITY_ERROR");
        assert!(err.is_fatal());

        let wal = std::fs::read_to_string(config.wal_path()).unwrap();
        assert!(!wal.contains("SET b"));
        assert_eq!(engine.sequencer().peek(), 2);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let mut engine = Engine::open(&config).unwrap();

        let err = engine.write("a=b", "1", true).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ENTRY");
        assert!(!config.wal_path().exists());
    }

    #[test]
    fn test_wal_failure_leaves_store_and_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        {
            let mut engine = Engine::open(&config).unwrap();
            engine.write("a", "1", true).unwrap();
        }

        let mut engine = Engine::open(&config).unwrap();
        // Replace the WAL with a directory so the lazy open fails.
        std::fs::remove_file(config.wal_path()).unwrap();
        std::fs::create_dir(config.wal_path()).unwrap();

        let err = engine.write("b", "2", true).unwrap_err();
        assert_eq!(err.error_code(), "RESOURCE_ERROR");
        assert!(err.is_fatal());
        assert_eq!(engine.store().get("b"), None);
        assert_eq!(engine.store().len(), 1);
        assert_eq!(snapshot_map(&config), map(&[("a", "1")]));
    }

    #[test]
    fn test_exhausted_ids_refuse_write() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path());
        let tail = format!("TRANSACTION {} COMMIT\n", walkv_wal::MAX_TXN_ID);
        std::fs::write(config.wal_path(), &tail).unwrap();

        let mut engine = Engine::open(&config).unwrap();
        let err = engine.write("a", "1", true).unwrap_err();
        assert_eq!(err.error_code(), "RESOURCE_ERROR");
        assert_eq!(std::fs::read_to_string(config.wal_path()).unwrap(), tail);
        assert!(engine.store().is_empty());
        assert!(!config.snapshot_path().exists());
    }
}
