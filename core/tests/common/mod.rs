#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use liftoff_core::{Command, CommandError};

/// Shared, ordered log of lifecycle calls.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Command that records every call and can be told to fail.
pub struct Recorder {
    name: String,
    journal: Journal,
    start_failure: Option<CommandError>,
    stop_failure: Option<CommandError>,
    received: Mutex<Vec<Option<CommandError>>>,
}

impl Recorder {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: journal.clone(),
            start_failure: None,
            stop_failure: None,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_start(mut self, message: &str) -> Self {
        self.start_failure = Some(CommandError::from(anyhow::anyhow!(message.to_string())));
        self
    }

    pub fn failing_stop(mut self, message: &str) -> Self {
        self.stop_failure = Some(CommandError::from(anyhow::anyhow!(message.to_string())));
        self
    }

    pub fn start_failure(&self) -> Option<&CommandError> {
        self.start_failure.as_ref()
    }

    pub fn stop_failure(&self) -> Option<&CommandError> {
        self.stop_failure.as_ref()
    }

    /// Failures handed to each `stop` call, in call order.
    pub fn received(&self) -> Vec<Option<CommandError>> {
        self.received.lock().unwrap().clone()
    }

    fn record_start(&self, mode: &str) -> Result<(), CommandError> {
        self.journal.push(format!("{mode}start {}", self.name));
        match &self.start_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record_stop(&self, mode: &str, failure: Option<&CommandError>) -> Result<(), CommandError> {
        let tag = match failure {
            Some(err) => format!(" ({err})"),
            None => String::new(),
        };
        self.journal.push(format!("{mode}stop {}{tag}", self.name));
        self.received.lock().unwrap().push(failure.cloned());
        match &self.stop_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Command for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), CommandError> {
        self.record_start("")
    }

    fn stop(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        self.record_stop("", failure)
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        tokio::task::yield_now().await;
        self.record_start("async ")
    }

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        tokio::task::yield_now().await;
        self.record_stop("async ", failure)
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
