use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::{ContainerStatus, ObjectStore, RemoteObject, Result};

/// テスト用のインメモリストア
#[derive(Default)]
pub struct MemoryStore {
    objects: RefCell<BTreeMap<String, Vec<u8>>>,
    container_exists: RefCell<bool>,
    fail_keys: HashSet<String>,
    puts: RefCell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定したキーへの put を失敗させる
    pub fn failing_on(keys: &[&str]) -> Self {
        Self {
            fail_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.borrow().keys().cloned().collect()
    }

    pub fn put_calls(&self) -> usize {
        *self.puts.borrow()
    }
}

impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn container(&self) -> &str {
        "test-container"
    }

    fn ensure_container(&self) -> Result<ContainerStatus> {
        let mut exists = self.container_exists.borrow_mut();
        if *exists {
            return Ok(ContainerStatus::Existing);
        }
        *exists = true;
        Ok(ContainerStatus::Created)
    }

    fn put_object(&self, local_path: &Path, key: &str) -> Result<()> {
        *self.puts.borrow_mut() += 1;

        if self.fail_keys.contains(key) {
            return Err(crate::Error::Remote(format!("injected failure for {}", key)));
        }

        let data = fs::read(local_path)?;
        self.objects.borrow_mut().insert(key.to_string(), data);
        Ok(())
    }

    fn get_object(&self, key: &str, local_path: &Path) -> Result<()> {
        let objects = self.objects.borrow();
        let data = objects
            .get(key)
            .ok_or_else(|| crate::Error::Remote(format!("BlobNotFound: {}", key)))?;

        fs::write(local_path, data)?;
        Ok(())
    }

    fn list_objects(&self, prefix: &str) -> Result<Vec<RemoteObject>> {
        Ok(self
            .objects
            .borrow()
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| RemoteObject {
                key: k.clone(),
                size: v.len() as u64,
            })
            .collect())
    }
}
