//! Running calls against a persisted instance.

use super::storage::{run_or_recover, CheckedLock, CheckedStorage, Lock, Storage};
use super::{InstanceError, StoredSnapshot};
use crate::engine::{Call, Machine, Snapshot, Step};
use tracing::{debug, info};

/// One persisted instance of a [`Machine`].
///
/// Every call runs under the lock: load, step, persist, unlock. A failing
/// call writes nothing, releases the lock and surfaces its own error.
///
/// # Example
///
/// ```rust
/// use hierarch::builder::GraphBuilder;
/// use hierarch::engine::{Bindings, Call, LeafOutcome, Machine};
/// use hierarch::persistence::{Instance, MemoryLock, MemoryStorage};
/// use serde_json::json;
///
/// let graph = GraphBuilder::new()
///     .graph("main", ["main:A", "main:B"])
///     .entry_point("main", "start", "main:A", "start")
///     .arrow("main", "main:A", "x", "main:B", "start")
///     .build()
///     .unwrap();
/// let bindings = Bindings::new()
///     .leaf("main:A", |_, context| Ok(LeafOutcome::follow("x", context)));
/// let machine = Machine::new(graph, bindings);
///
/// let storage = MemoryStorage::new();
/// let instance = Instance::new(&machine, &storage, MemoryLock::new());
/// instance.handle(&Call::new("go")).unwrap();
///
/// let stored = instance.load().unwrap().unwrap();
/// assert_eq!(
///     stored.configuration.get("main").map(|id| id.as_str()),
///     Some("main:B")
/// );
/// ```
#[derive(Debug)]
pub struct Instance<'m, S, L> {
    machine: &'m Machine,
    storage: CheckedStorage<S>,
    lock: CheckedLock<L>,
}

impl<'m, S: Storage, L: Lock> Instance<'m, S, L> {
    pub fn new(machine: &'m Machine, storage: S, lock: L) -> Self {
        Self {
            machine,
            storage: CheckedStorage::new(storage),
            lock: CheckedLock::new(lock),
        }
    }

    /// Handle one call, persisting the resulting snapshot.
    pub fn handle(&self, call: &Call) -> Result<Step, InstanceError> {
        let mut held = Some(self.lock.lock()?);

        let step = run_or_recover(
            || self.process(call),
            || held.take().map_or(Ok(()), |held| held.unlock()),
        )?;

        if let Some(held) = held {
            held.unlock()?;
        }
        info!(method = %call.method, any_arrow_followed = step.any_arrow_followed, "call persisted");
        Ok(step)
    }

    /// Delete the stored snapshot. The next call starts afresh.
    pub fn remove(&self) -> Result<(), InstanceError> {
        let mut held = Some(self.lock.lock()?);

        run_or_recover(
            || self.storage.remove(),
            || held.take().map_or(Ok(()), |held| held.unlock()),
        )?;

        if let Some(held) = held {
            held.unlock()?;
        }
        debug!("stored snapshot removed");
        Ok(())
    }

    /// The stored snapshot, if any, without taking the lock.
    pub fn load(&self) -> Result<Option<Snapshot>, InstanceError> {
        Ok(self
            .storage
            .get()?
            .map(StoredSnapshot::into_snapshot)
            .transpose()?)
    }

    fn process(&self, call: &Call) -> Result<Step, InstanceError> {
        let snapshot = self.load()?;
        debug!(method = %call.method, fresh = snapshot.is_none(), "handling call");

        let step = self.machine.step(snapshot, call)?;
        self.storage.set(&StoredSnapshot::new(step.snapshot.clone()))?;
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::engine::{Bindings, BoxError, EngineError, LeafOutcome};
    use crate::persistence::{LockError, MemoryLock, MemoryStorage, StorageError, Unlock};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn machine() -> Machine {
        let graph = GraphBuilder::new()
            .graph("main", ["main:A", "main:B"])
            .entry_point("main", "start", "main:A", "start")
            .arrow("main", "main:A", "x", "main:B", "start")
            .arrow("main", "main:B", "x", "main:A", "start")
            .build()
            .unwrap();
        let toggle = |call: &Call, context: Value| -> Result<LeafOutcome, BoxError> {
            match call.method.as_str() {
                "fail" => Err("refused".into()),
                _ => Ok(LeafOutcome::follow("x", context)),
            }
        };
        Machine::new(graph, Bindings::new().leaf("main:A", toggle).leaf("main:B", toggle))
    }

    fn active(instance: &Instance<'_, &MemoryStorage, MemoryLock>) -> Option<String> {
        instance
            .load()
            .unwrap()
            .and_then(|snapshot| snapshot.configuration.get("main").map(|id| id.to_string()))
    }

    #[test]
    fn persists_each_call() {
        let machine = machine();
        let storage = MemoryStorage::new();
        let lock = MemoryLock::new();
        let instance = Instance::new(&machine, &storage, lock.clone());

        instance.handle(&Call::new("go")).unwrap();
        assert_eq!(active(&instance).as_deref(), Some("main:B"));

        instance.handle(&Call::new("go")).unwrap();
        assert_eq!(active(&instance).as_deref(), Some("main:A"));
        assert!(!lock.is_locked());
    }

    #[test]
    fn failed_call_writes_nothing_and_unlocks() {
        let machine = machine();
        let storage = MemoryStorage::new();
        let lock = MemoryLock::new();
        let instance = Instance::new(&machine, &storage, lock.clone());

        let result = instance.handle(&Call::new("fail"));

        assert!(matches!(
            result,
            Err(InstanceError::Engine(EngineError::Behavior { .. }))
        ));
        assert!(storage.get_data().unwrap().is_none());
        assert!(!lock.is_locked());
    }

    #[test]
    fn remove_starts_over() {
        let machine = machine();
        let storage = MemoryStorage::new();
        let instance = Instance::new(&machine, &storage, MemoryLock::new());
        instance.handle(&Call::new("go")).unwrap();

        instance.remove().unwrap();

        assert!(instance.load().unwrap().is_none());
        let step = instance.handle(&Call::new("go")).unwrap();
        assert_eq!(
            step.snapshot.configuration.get("main").map(|id| id.as_str()),
            Some("main:B")
        );
    }

    #[test]
    fn held_lock_rejects_call() {
        let machine = machine();
        let storage = MemoryStorage::new();
        let lock = MemoryLock::new();
        let instance = Instance::new(&machine, &storage, lock.clone());
        let _held = CheckedLock::new(lock).lock().unwrap();

        let result = instance.handle(&Call::new("go"));

        assert!(matches!(result, Err(InstanceError::Lock(LockError::Lock { .. }))));
        assert!(storage.get_data().unwrap().is_none());
    }

    struct Unwritable {
        data: Option<StoredSnapshot>,
    }

    impl Storage for Unwritable {
        fn get_data(&self) -> Result<Option<StoredSnapshot>, BoxError> {
            Ok(self.data.clone())
        }

        fn set_data(&self, _: &StoredSnapshot) -> Result<(), BoxError> {
            Err("disk full".into())
        }

        fn remove_data(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    struct CountingLock {
        unlocks: Arc<AtomicUsize>,
        fail_unlock: bool,
    }

    impl Lock for CountingLock {
        fn lock(&self) -> Result<Unlock, BoxError> {
            let unlocks = self.unlocks.clone();
            let fail = self.fail_unlock;
            Ok(Box::new(move || -> Result<(), BoxError> {
                unlocks.fetch_add(1, Ordering::SeqCst);
                if fail {
                    return Err("stuck".into());
                }
                Ok(())
            }))
        }
    }

    #[test]
    fn write_failure_is_reported_after_unlocking() {
        let machine = machine();
        let unlocks = Arc::new(AtomicUsize::new(0));
        let lock = CountingLock {
            unlocks: unlocks.clone(),
            fail_unlock: false,
        };
        let instance = Instance::new(&machine, Unwritable { data: None }, lock);

        let result = instance.handle(&Call::new("go"));

        assert!(matches!(
            result,
            Err(InstanceError::Storage(StorageError::Write { .. }))
        ));
        assert_eq!(unlocks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_unlock_during_recovery_keeps_original_error() {
        let machine = machine();
        let unlocks = Arc::new(AtomicUsize::new(0));
        let lock = CountingLock {
            unlocks: unlocks.clone(),
            fail_unlock: true,
        };
        let instance = Instance::new(&machine, Unwritable { data: None }, lock);

        let result = instance.handle(&Call::new("go"));

        assert!(matches!(result, Err(InstanceError::Storage(_))));
        assert_eq!(unlocks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_unlock_after_success_is_reported() {
        let machine = machine();
        let storage = MemoryStorage::new();
        let unlocks = Arc::new(AtomicUsize::new(0));
        let lock = CountingLock {
            unlocks,
            fail_unlock: true,
        };
        let instance = Instance::new(&machine, &storage, lock);

        let result = instance.handle(&Call::new("go"));

        assert!(matches!(result, Err(InstanceError::Lock(LockError::Unlock { .. }))));
        assert!(storage.get_data().unwrap().is_some());
    }

    #[test]
    fn stale_version_is_rejected_before_dispatch() {
        let machine = machine();
        let mut stored = StoredSnapshot::new(Snapshot {
            configuration: Default::default(),
            context: json!({}),
        });
        stored.version = 0;
        let instance = Instance::new(&machine, Unwritable { data: Some(stored) }, MemoryLock::new());

        let result = instance.handle(&Call::new("go"));

        assert!(matches!(
            result,
            Err(InstanceError::Storage(StorageError::UnsupportedVersion { found: 0, .. }))
        ));
    }
}
