//! Async predicate table
//!
//! A `custom-async` keyword names a predicate by id. The table maps ids to
//! implementations of [`AsyncPredicate`] and is handed to both the schema
//! parser (to reject unknown ids early) and the compiler (to bind each
//! check to its implementation). There is no process-wide registry; every
//! validator owns the table it was compiled with.

pub mod builtin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::error::RegistryError;

/// A specific rejection raised by a predicate
///
/// The message, params and optional keyword override are copied into the
/// resulting [`ValidationError`](crate::report::ValidationError).
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct PredicateError {
    pub message: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl PredicateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            params: Value::Null,
            keyword: None,
        }
    }

    /// Attach structured details
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    /// Report the failure under a different keyword
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Deadline expiry
    pub fn timeout(limit: Duration) -> Self {
        Self::new(format!("check timed out after {}ms", limit.as_millis()))
            .with_params(json!({ "timeoutMs": limit.as_millis() as u64 }))
    }
}

/// An asynchronous check over a single value
///
/// `Ok(true)` accepts the value, `Ok(false)` rejects it with a generic
/// message and `Err` rejects it with the predicate's own diagnostic.
#[async_trait]
pub trait AsyncPredicate: Send + Sync {
    async fn check(&self, value: &Value, params: &Value) -> Result<bool, PredicateError>;
}

/// Adapter turning an async closure into an [`AsyncPredicate`]
///
/// The closure receives owned copies of the value and params so the future
/// it returns does not borrow from the executor.
pub struct FnPredicate<F, Fut> {
    f: F,
    _marker: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnPredicate<F, Fut>
where
    F: Fn(Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, PredicateError>> + Send,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> AsyncPredicate for FnPredicate<F, Fut>
where
    F: Fn(Value, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, PredicateError>> + Send,
{
    async fn check(&self, value: &Value, params: &Value) -> Result<bool, PredicateError> {
        (self.f)(value.clone(), params.clone()).await
    }
}

/// Wraps a predicate with its own deadline
pub struct Timeout<P> {
    inner: P,
    limit: Duration,
}

impl<P> Timeout<P> {
    pub fn new(inner: P, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<P: AsyncPredicate> AsyncPredicate for Timeout<P> {
    async fn check(&self, value: &Value, params: &Value) -> Result<bool, PredicateError> {
        match tokio::time::timeout(self.limit, self.inner.check(value, params)).await {
            Ok(result) => result,
            Err(_) => Err(PredicateError::timeout(self.limit)),
        }
    }
}

/// Shorthand for [`Timeout::new`]
pub fn with_timeout<P: AsyncPredicate>(predicate: P, limit: Duration) -> Timeout<P> {
    Timeout::new(predicate, limit)
}

/// Table of named async predicates
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: BTreeMap<String, Arc<dyn AsyncPredicate>>,
}

impl PredicateRegistry {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding the built-in network and filesystem predicates
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (id, predicate) in builtin::all() {
            registry.predicates.insert(id.to_string(), predicate);
        }
        registry
    }

    /// Add a predicate under a fresh id
    pub fn register(
        &mut self,
        id: impl Into<String>,
        predicate: Arc<dyn AsyncPredicate>,
    ) -> Result<(), RegistryError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.predicates.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        tracing::debug!(predicate = %id, "Registered async predicate");
        self.predicates.insert(id, predicate);
        Ok(())
    }

    /// Add an async closure as a predicate
    pub fn register_fn<F, Fut>(&mut self, id: impl Into<String>, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Value, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, PredicateError>> + Send + 'static,
    {
        self.register(id, Arc::new(FnPredicate::new(f)))
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AsyncPredicate>> {
        self.predicates.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.predicates.contains_key(id)
    }

    /// Registered ids in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("ids", &self.predicates.keys().collect::<Vec<_>>())
            .finish()
    }
}
