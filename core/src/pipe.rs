//! Ordered transformer chains.
//!
//! # Design
//! A chain is an explicit list of stages folded left to right when it runs,
//! so the first registered stage always sees the input first and each stage
//! receives the previous one's output. Stages are shared behind `Arc`, but
//! the list itself is owned: cloning a chain and pushing onto the clone never
//! changes the original.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::Result;

type Stage<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Async, fallible chain used for request bodies and responses.
pub struct Pipe<T> {
    stages: Vec<Stage<T>>,
}

impl<T: Send + 'static> Pipe<T> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push<F, Fut>(&mut self, stage: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.stages.push(Arc::new(move |value| stage(value).boxed()));
    }

    pub fn push_sync<F>(&mut self, stage: F)
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.push(move |value| future::ready(Ok(stage(value))));
    }

    /// Run every stage in registration order. The first error stops the chain.
    pub async fn run(&self, mut value: T) -> Result<T> {
        for stage in &self.stages {
            value = stage(value).await?;
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<T: Send + 'static> Default for Pipe<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Pipe<T> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<T> fmt::Debug for Pipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe").field("stages", &self.stages.len()).finish()
    }
}

/// Synchronous chain of plugins, each receiving the previous one's output.
pub struct PluginChain<T> {
    plugins: Vec<Arc<dyn Fn(T) -> T + Send + Sync>>,
}

impl<T> PluginChain<T> {
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    pub fn push<F>(&mut self, plugin: F)
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        self.plugins.push(Arc::new(plugin));
    }

    pub fn apply(&self, value: T) -> T {
        self.plugins.iter().fold(value, |value, plugin| plugin(value))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<T> Default for PluginChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for PluginChain<T> {
    fn clone(&self) -> Self {
        Self {
            plugins: self.plugins.clone(),
        }
    }
}

impl<T> fmt::Debug for PluginChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginChain")
            .field("plugins", &self.plugins.len())
            .finish()
    }
}
