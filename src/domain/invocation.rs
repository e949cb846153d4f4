//! Invocation record: parsed CLI input, consumed once per run

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A single parsed argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Flag(bool),
    Str(String),
    Int(i64),
    Path(PathBuf),
    List(Vec<String>),
}

/// Parsed input: which command to run plus its keyword inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    handler: Option<String>,
    values: BTreeMap<String, ArgValue>,
}

impl Invocation {
    pub fn new(handler: Option<String>, values: BTreeMap<String, ArgValue>) -> Self {
        Self { handler, values }
    }

    /// Take the handler key out of the record; a second call yields None.
    pub fn take_handler(&mut self) -> Option<String> {
        self.handler.take()
    }

    pub fn handler(&self) -> Option<&str> {
        self.handler.as_deref()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ArgValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn values(&self) -> &BTreeMap<String, ArgValue> {
        &self.values
    }

    /// Switch value; absent means false.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(ArgValue::Flag(true)))
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ArgValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ArgValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn path(&self, key: &str) -> Option<&Path> {
        match self.values.get(key) {
            Some(ArgValue::Path(p)) => Some(p),
            _ => None,
        }
    }

    /// List value; absent means empty.
    pub fn list(&self, key: &str) -> &[String] {
        match self.values.get(key) {
            Some(ArgValue::List(items)) => items,
            _ => &[],
        }
    }
}
