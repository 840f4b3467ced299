use crate::model::SettingValue;
use crate::persist::PersistentStore;
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;

/// Result of a finished background task, applied by the thread that owns the settings.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Exported { path: PathBuf, count: usize },
    Imported { values: BTreeMap<String, SettingValue> },
    /// Keys whose preference files were deleted.
    Reverted { keys: Vec<String> },
}

pub struct TaskHandle {
    receiver: Receiver<Result<TaskOutcome>>,
    finished: bool,
}

impl TaskHandle {
    /// `None` while the task runs, then its result exactly once.
    pub fn poll(&mut self) -> Option<Result<TaskOutcome>> {
        if self.finished {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Some(Err(anyhow::anyhow!("Background task exited without a result")))
            }
        }
    }

    /// Block until the task finishes.
    pub fn wait(mut self) -> Result<TaskOutcome> {
        if self.finished {
            anyhow::bail!("Task result was already taken");
        }
        self.finished = true;
        self.receiver
            .recv()
            .context("Background task exited without a result")?
    }
}

fn spawn<F>(name: &'static str, job: F) -> TaskHandle
where
    F: FnOnce() -> Result<TaskOutcome> + Send + 'static,
{
    let (tx, rx) = channel();
    thread::spawn(move || {
        info!("[TASKS] {} started", name);
        let result = job();
        if let Err(e) = &result {
            warn!("[TASKS] {} failed: {:#}", name, e);
        }
        // The receiver may be gone if nobody cares about the result anymore.
        let _ = tx.send(result);
    });
    TaskHandle { receiver: rx, finished: false }
}

/// Write a settings snapshot as pretty JSON.
pub fn export_to_json(path: &Path, snapshot: &BTreeMap<String, SettingValue>) -> Result<usize> {
    let json = serde_json::to_string_pretty(snapshot)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;
    Ok(snapshot.len())
}

pub fn import_from_json(path: &Path) -> Result<BTreeMap<String, SettingValue>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {:?}", path))?;
    let values = serde_json::from_str(&json).context("Invalid settings file format")?;
    Ok(values)
}

pub fn spawn_export(path: PathBuf, snapshot: BTreeMap<String, SettingValue>) -> TaskHandle {
    spawn("export", move || {
        let count = export_to_json(&path, &snapshot)?;
        info!("[TASKS] Wrote {} settings to {:?}", count, path);
        Ok(TaskOutcome::Exported { path, count })
    })
}

pub fn spawn_import(path: PathBuf) -> TaskHandle {
    spawn("import", move || {
        let values = import_from_json(&path)?;
        info!("[TASKS] Read {} settings from {:?}", values.len(), path);
        Ok(TaskOutcome::Imported { values })
    })
}

/// Delete every persisted preference under `dir`.
pub fn spawn_revert(dir: PathBuf) -> TaskHandle {
    spawn("revert", move || {
        let keys = PersistentStore::open(&dir).remove_all()?;
        Ok(TaskOutcome::Reverted { keys })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use std::time::{Duration, Instant};

    fn finish(mut handle: TaskHandle) -> Result<TaskOutcome> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = handle.poll() {
                assert!(handle.poll().is_none(), "Result is delivered once");
                return result;
            }
            assert!(Instant::now() < deadline, "Task did not finish in time");
            thread::sleep(Duration::from_millis(5));
        }
    }

    fn snapshot() -> BTreeMap<String, SettingValue> {
        let mut values = BTreeMap::new();
        values.insert("genes.foregroundColor".to_string(), SettingValue::Color(Color::RED));
        values.insert("windowSize".to_string(), SettingValue::Int(900));
        values.insert(
            "trackOrder".to_string(),
            SettingValue::StringList(vec!["DNA".into(), "genes".into()]),
        );
        values
    }

    #[test]
    fn test_export_then_import_restores_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("settings.json");

        let exported = finish(spawn_export(path.clone(), snapshot())).unwrap();
        assert_eq!(exported, TaskOutcome::Exported { path: path.clone(), count: 3 });

        let imported = finish(spawn_import(path)).unwrap();
        assert_eq!(imported, TaskOutcome::Imported { values: snapshot() });
    }

    #[test]
    fn test_import_missing_file_reports_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = finish(spawn_import(tmp.path().join("nope.json")));
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Failed to read settings"), "{message}");
    }

    #[test]
    fn test_import_rejects_malformed_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "[1, 2").unwrap();
        assert!(spawn_import(path).wait().is_err());
    }

    #[test]
    fn test_revert_deletes_preferences() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(tmp.path());
        store.save("a.trackHeight", &SettingValue::Int(3)).unwrap();
        store.save("windowSize", &SettingValue::Int(800)).unwrap();

        let outcome = spawn_revert(tmp.path().to_path_buf()).wait().unwrap();
        assert_eq!(
            outcome,
            TaskOutcome::Reverted { keys: vec!["a.trackHeight".into(), "windowSize".into()] }
        );
        assert!(store.keys().unwrap().is_empty());
    }
}
