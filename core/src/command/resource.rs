use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{CommandError, ProcedureKind};

use super::Command;

/// Continuation stored by a started [`ResourceCommand`].
///
/// Receives the failure that caused the shutdown, if any. Returning `Ok(())`
/// means the resource wound down normally, whether or not a failure was
/// injected; returning an error propagates it to whoever called `stop`.
pub type Teardown = Box<dyn FnOnce(Option<CommandError>) -> anyhow::Result<()> + Send>;

/// Continuation stored by a started [`AsyncResourceCommand`].
pub type AsyncTeardown =
    Box<dyn FnOnce(Option<CommandError>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

type Setup = Box<dyn Fn() -> anyhow::Result<Teardown> + Send + Sync>;
type AsyncSetup = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<AsyncTeardown>> + Send + Sync>;

pub fn teardown<F>(f: F) -> Teardown
where
    F: FnOnce(Option<CommandError>) -> anyhow::Result<()> + Send + 'static,
{
    Box::new(f)
}

pub fn async_teardown<F, Fut>(f: F) -> AsyncTeardown
where
    F: FnOnce(Option<CommandError>) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move |failure| Box::pin(f(failure)))
}

/// Where a two-phase resource is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    NotStarted,
    Started,
    Stopped,
}

enum Slot<T> {
    NotStarted,
    Started(T),
    Stopped,
}

impl<T> Slot<T> {
    fn state(&self) -> ResourceState {
        match self {
            Self::NotStarted => ResourceState::NotStarted,
            Self::Started(_) => ResourceState::Started,
            Self::Stopped => ResourceState::Stopped,
        }
    }

    /// Move the continuation out, leaving `Stopped` behind. Any other state is
    /// left untouched.
    fn take_started(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::Stopped) {
            Self::Started(handle) => Some(handle),
            other => {
                *self = other;
                None
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Two-phase resource: setup runs once and hands back the teardown that
/// `stop` resumes.
///
/// `start` is idempotent and `stop` before `start` never runs the teardown.
/// A failed setup leaves the resource `NotStarted`.
pub struct ResourceCommand {
    name: String,
    setup: Setup,
    slot: Mutex<Slot<Teardown>>,
}

impl ResourceCommand {
    pub fn new<F>(name: impl Into<String>, setup: F) -> Self
    where
        F: Fn() -> anyhow::Result<Teardown> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            setup: Box::new(setup),
            slot: Mutex::new(Slot::NotStarted),
        }
    }

    pub fn state(&self) -> ResourceState {
        lock(&self.slot).state()
    }
}

impl fmt::Debug for ResourceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Command for ResourceCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), CommandError> {
        let mut slot = lock(&self.slot);
        if !matches!(*slot, Slot::NotStarted) {
            return Ok(());
        }
        let handle = (self.setup)().map_err(CommandError::from)?;
        *slot = Slot::Started(handle);
        Ok(())
    }

    fn stop(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        let Some(handle) = lock(&self.slot).take_started() else {
            return Ok(());
        };
        handle(failure.cloned()).map_err(CommandError::from)
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        self.start()
    }

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        self.stop(failure)
    }
}

/// Asynchronous two-phase resource. Only the async operations are supported.
pub struct AsyncResourceCommand {
    name: String,
    setup: AsyncSetup,
    slot: tokio::sync::Mutex<Slot<AsyncTeardown>>,
}

impl AsyncResourceCommand {
    pub fn new<F, Fut>(name: impl Into<String>, setup: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<AsyncTeardown>> + Send + 'static,
    {
        Self {
            name: name.into(),
            setup: Box::new(move || Box::pin(setup())),
            slot: tokio::sync::Mutex::new(Slot::NotStarted),
        }
    }

    pub async fn state(&self) -> ResourceState {
        self.slot.lock().await.state()
    }

    fn refuse_sync(&self) -> CommandError {
        CommandError::invalid_call_mode(&self.name, ProcedureKind::AsyncResource)
    }
}

impl fmt::Debug for AsyncResourceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResourceCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Command for AsyncResourceCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), CommandError> {
        Err(self.refuse_sync())
    }

    fn stop(&self, _failure: Option<&CommandError>) -> Result<(), CommandError> {
        Err(self.refuse_sync())
    }

    async fn start_async(&self) -> Result<(), CommandError> {
        let mut slot = self.slot.lock().await;
        if !matches!(*slot, Slot::NotStarted) {
            return Ok(());
        }
        let handle = (self.setup)().await.map_err(CommandError::from)?;
        *slot = Slot::Started(handle);
        Ok(())
    }

    async fn stop_async(&self, failure: Option<&CommandError>) -> Result<(), CommandError> {
        let Some(handle) = self.slot.lock().await.take_started() else {
            return Ok(());
        };
        handle(failure.cloned()).await.map_err(CommandError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;

    fn journal() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn recorded(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn pool(log: Arc<Mutex<Vec<String>>>) -> ResourceCommand {
        ResourceCommand::new("pool", move || {
            log.lock().unwrap().push("setup".into());
            let log = log.clone();
            Ok(teardown(move |failure| {
                let entry = match failure {
                    Some(err) => format!("teardown: {err}"),
                    None => "teardown".to_string(),
                };
                log.lock().unwrap().push(entry);
                Ok(())
            }))
        })
    }

    #[test]
    fn start_then_stop_runs_both_phases() {
        let log = journal();
        let command = pool(log.clone());

        command.start().unwrap();
        assert_eq!(recorded(&log), vec!["setup"]);
        assert_eq!(command.state(), ResourceState::Started);

        command.stop(None).unwrap();
        assert_eq!(recorded(&log), vec!["setup", "teardown"]);
        assert_eq!(command.state(), ResourceState::Stopped);
    }

    #[test]
    fn start_twice_runs_setup_once() {
        let log = journal();
        let command = pool(log.clone());

        command.start().unwrap();
        command.start().unwrap();

        assert_eq!(recorded(&log), vec!["setup"]);
    }

    #[test]
    fn stop_before_start_is_noop() {
        let log = journal();
        let command = pool(log.clone());

        command.stop(None).unwrap();

        assert!(recorded(&log).is_empty());
        assert_eq!(command.state(), ResourceState::NotStarted);
    }

    #[test]
    fn stop_after_stop_is_noop() {
        let log = journal();
        let command = pool(log.clone());

        command.start().unwrap();
        command.stop(None).unwrap();
        command.stop(None).unwrap();
        command.start().unwrap();

        assert_eq!(recorded(&log), vec!["setup", "teardown"]);
    }

    #[test]
    fn stop_injects_failure() {
        let log = journal();
        let command = pool(log.clone());
        let failure = CommandError::from(anyhow::anyhow!("upstream crashed"));

        command.start().unwrap();
        command.stop(Some(&failure)).unwrap();

        assert_eq!(
            recorded(&log),
            vec!["setup", "teardown: upstream crashed"]
        );
    }

    #[test]
    fn teardown_may_reraise_injected_failure() {
        let command = ResourceCommand::new("strict", || {
            Ok(teardown(|failure| match failure {
                Some(err) => Err(err.into()),
                None => Ok(()),
            }))
        });
        let failure = CommandError::from(anyhow::anyhow!("upstream crashed"));

        command.start().unwrap();
        let err = command.stop(Some(&failure)).unwrap_err();

        assert!(err.same_failure(&failure));
    }

    #[test]
    fn failed_setup_can_be_retried() {
        let attempts = Arc::new(Mutex::new(0));
        let counter = attempts.clone();
        let command = ResourceCommand::new("flaky", move || {
            let mut n = counter.lock().unwrap();
            *n += 1;
            if *n == 1 {
                anyhow::bail!("not yet");
            }
            Ok(teardown(|_| Ok(())))
        });

        assert!(command.start().is_err());
        assert_eq!(command.state(), ResourceState::NotStarted);
        command.start().unwrap();
        assert_eq!(command.state(), ResourceState::Started);
    }

    #[tokio::test]
    async fn sync_resource_async_path_delegates() {
        let log = journal();
        let command = pool(log.clone());

        command.start_async().await.unwrap();
        command.stop_async(None).await.unwrap();

        assert_eq!(recorded(&log), vec!["setup", "teardown"]);
    }

    fn async_pool(log: Arc<Mutex<Vec<String>>>) -> AsyncResourceCommand {
        AsyncResourceCommand::new("async-pool", move || {
            let log = log.clone();
            async move {
                tokio::task::yield_now().await;
                log.lock().unwrap().push("setup".into());
                Ok(async_teardown(move |failure| async move {
                    tokio::task::yield_now().await;
                    let entry = match failure {
                        Some(err) => format!("teardown: {err}"),
                        None => "teardown".to_string(),
                    };
                    log.lock().unwrap().push(entry);
                    Ok(())
                }))
            }
        })
    }

    #[tokio::test]
    async fn async_resource_runs_both_phases() {
        let log = journal();
        let command = async_pool(log.clone());

        command.start_async().await.unwrap();
        command.start_async().await.unwrap();
        assert_eq!(recorded(&log), vec!["setup"]);

        command.stop_async(None).await.unwrap();
        assert_eq!(recorded(&log), vec!["setup", "teardown"]);
        assert_eq!(command.state().await, ResourceState::Stopped);
    }

    #[tokio::test]
    async fn async_resource_stop_before_start_is_noop() {
        let log = journal();
        let command = async_pool(log.clone());

        command.stop_async(None).await.unwrap();

        assert!(recorded(&log).is_empty());
    }

    #[tokio::test]
    async fn async_resource_injects_failure() {
        let log = journal();
        let command = async_pool(log.clone());
        let failure = CommandError::from(anyhow::anyhow!("listener died"));

        command.start_async().await.unwrap();
        command.stop_async(Some(&failure)).await.unwrap();

        assert_eq!(recorded(&log), vec!["setup", "teardown: listener died"]);
    }

    #[test]
    fn async_resource_rejects_sync_calls() {
        let log = journal();
        let command = async_pool(log.clone());

        let err = command.start().unwrap_err();
        assert!(err.is_invalid_call_mode());
        assert!(err.to_string().contains("async-pool"));
        assert!(command.stop(None).unwrap_err().is_invalid_call_mode());
        assert!(recorded(&log).is_empty());
    }
}
