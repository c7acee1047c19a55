//! Key/value store backends.
//!
//! - [`MemoryStore`]: volatile, shareable between clones, counts writes.
//! - [`FileStore`]: one TOML file, one table per namespace. Every `put_*`
//!   rewrites the file so a power cut never loses an acknowledged write.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use brewscale_traits::{BoxError, KvStore};

use crate::error::HwError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stored {
    F32(f32),
    I32(i32),
    U32(u32),
}

#[derive(Debug, Default)]
struct MemoryInner {
    namespaces: HashMap<String, HashMap<String, Stored>>,
    open: Option<(String, bool)>,
    writes: usize,
    opens: usize,
}

impl MemoryInner {
    fn current(&self) -> Option<&HashMap<String, Stored>> {
        let (ns, _) = self.open.as_ref()?;
        self.namespaces.get(ns)
    }

    fn get(&self, key: &str) -> Option<Stored> {
        self.current().and_then(|m| m.get(key).copied())
    }

    fn put(&mut self, key: &str, value: Stored) -> Result<(), BoxError> {
        let ns = match &self.open {
            None => return Err(Box::new(HwError::Storage("namespace not open".into()))),
            Some((_, true)) => {
                return Err(Box::new(HwError::Storage(format!(
                    "namespace opened read-only, refusing write of {key}"
                ))));
            }
            Some((ns, false)) => ns.clone(),
        };
        self.namespaces
            .entry(ns)
            .or_default()
            .insert(key.to_string(), value);
        self.writes += 1;
        Ok(())
    }
}

/// Volatile store. Clones share the same contents, so a test can keep a
/// clone to inspect what the scale persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put_*` calls since creation.
    pub fn writes(&self) -> usize {
        self.inner.borrow().writes
    }

    /// Number of `open()` calls since creation.
    pub fn opens(&self) -> usize {
        self.inner.borrow().opens
    }

    /// True while a namespace is open.
    pub fn is_open(&self) -> bool {
        self.inner.borrow().open.is_some()
    }

    /// Read a float from `namespace` without going through open/close.
    pub fn peek_f32(&self, namespace: &str, key: &str) -> Option<f32> {
        match self.inner.borrow().namespaces.get(namespace)?.get(key)? {
            Stored::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Seed a value directly, bypassing open/close and the write counter.
    pub fn seed_f32(&self, namespace: &str, key: &str, value: f32) {
        self.seed(namespace, key, Stored::F32(value));
    }

    pub fn seed_i32(&self, namespace: &str, key: &str, value: i32) {
        self.seed(namespace, key, Stored::I32(value));
    }

    pub fn seed_u32(&self, namespace: &str, key: &str, value: u32) {
        self.seed(namespace, key, Stored::U32(value));
    }

    fn seed(&self, namespace: &str, key: &str, value: Stored) {
        self.inner
            .borrow_mut()
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

impl KvStore for MemoryStore {
    fn open(&mut self, namespace: &str, read_only: bool) -> Result<(), BoxError> {
        let mut inner = self.inner.borrow_mut();
        if let Some((ns, _)) = &inner.open {
            return Err(Box::new(HwError::Storage(format!(
                "namespace {ns} already open"
            ))));
        }
        inner.open = Some((namespace.to_string(), read_only));
        inner.opens += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.inner.borrow_mut().open = None;
    }

    fn has_key(&self, key: &str) -> bool {
        self.inner.borrow().get(key).is_some()
    }

    fn get_f32(&self, key: &str, default: f32) -> f32 {
        match self.inner.borrow().get(key) {
            Some(Stored::F32(v)) => v,
            _ => default,
        }
    }

    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), BoxError> {
        self.inner.borrow_mut().put(key, Stored::F32(value))
    }

    fn get_i32(&self, key: &str, default: i32) -> i32 {
        match self.inner.borrow().get(key) {
            Some(Stored::I32(v)) => v,
            _ => default,
        }
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), BoxError> {
        self.inner.borrow_mut().put(key, Stored::I32(value))
    }

    fn get_u32(&self, key: &str, default: u32) -> u32 {
        match self.inner.borrow().get(key) {
            Some(Stored::U32(v)) => v,
            _ => default,
        }
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), BoxError> {
        self.inner.borrow_mut().put(key, Stored::U32(value))
    }
}

/// TOML-file backed store.
///
/// ```toml
/// [scale]
/// calib = 2000.0
/// brew_thresh = 0.15000000596046448
/// stab_timeout = 2000
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    doc: toml::Table,
    open: Option<(String, bool)>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: toml::Table::new(),
            open: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&mut self) -> Result<(), HwError> {
        self.doc = match std::fs::read_to_string(&self.path) {
            Ok(text) => text
                .parse::<toml::Table>()
                .map_err(|e| HwError::Storage(format!("parse {}: {e}", self.path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => return Err(HwError::Io(e)),
        };
        Ok(())
    }

    fn flush(&self) -> Result<(), HwError> {
        let text = toml::to_string(&self.doc)
            .map_err(|e| HwError::Storage(format!("serialize: {e}")))?;
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, text)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Option<&toml::Value> {
        let (ns, _) = self.open.as_ref()?;
        self.doc.get(ns)?.as_table()?.get(key)
    }

    fn put(&mut self, key: &str, value: toml::Value) -> Result<(), BoxError> {
        let ns = match &self.open {
            None => return Err(Box::new(HwError::Storage("namespace not open".into()))),
            Some((_, true)) => {
                return Err(Box::new(HwError::Storage(format!(
                    "namespace opened read-only, refusing write of {key}"
                ))));
            }
            Some((ns, false)) => ns.clone(),
        };
        let table = self
            .doc
            .entry(ns.clone())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        match table.as_table_mut() {
            Some(t) => {
                t.insert(key.to_string(), value);
            }
            None => {
                return Err(Box::new(HwError::Storage(format!(
                    "{ns} is not a table in {}",
                    self.path.display()
                ))));
            }
        }
        self.flush()?;
        tracing::trace!(namespace = %ns, key, "file store write");
        Ok(())
    }
}

impl KvStore for FileStore {
    fn open(&mut self, namespace: &str, read_only: bool) -> Result<(), BoxError> {
        if let Some((ns, _)) = &self.open {
            return Err(Box::new(HwError::Storage(format!(
                "namespace {ns} already open"
            ))));
        }
        self.load()?;
        self.open = Some((namespace.to_string(), read_only));
        Ok(())
    }

    fn close(&mut self) {
        self.open = None;
    }

    fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get_f32(&self, key: &str, default: f32) -> f32 {
        match self.get(key) {
            Some(toml::Value::Float(v)) => *v as f32,
            Some(toml::Value::Integer(v)) => *v as f32,
            _ => default,
        }
    }

    fn put_f32(&mut self, key: &str, value: f32) -> Result<(), BoxError> {
        self.put(key, toml::Value::Float(f64::from(value)))
    }

    fn get_i32(&self, key: &str, default: i32) -> i32 {
        match self.get(key) {
            Some(toml::Value::Integer(v)) => i32::try_from(*v).unwrap_or(default),
            _ => default,
        }
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), BoxError> {
        self.put(key, toml::Value::Integer(i64::from(value)))
    }

    fn get_u32(&self, key: &str, default: u32) -> u32 {
        match self.get(key) {
            Some(toml::Value::Integer(v)) => u32::try_from(*v).unwrap_or(default),
            _ => default,
        }
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), BoxError> {
        self.put(key, toml::Value::Integer(i64::from(value)))
    }
}
