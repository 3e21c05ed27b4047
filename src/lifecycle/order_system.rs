use crate::config::AppConfig;
use crate::context::RequestContext;
use crate::http::{self, HttpBinding, HttpError, HttpState};
use crate::ingest::{IngestError, IngestWorker, MessageSource, OrderValidator};
use crate::service::OrderService;
use crate::store::DurableStore;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Default time tasks get to finish after shutdown is raised.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(40);

/// Terminal failure of a long-running task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// A task and the error it ended with.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: &'static str,
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task failed: {}", self.task, self.error)
    }
}

/// What started the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// The external termination future resolved (SIGINT/SIGTERM in production).
    Signal,
    /// Someone called [`ShutdownHandle::shutdown`].
    Requested,
    /// A task ended with an error.
    TaskFailed,
    /// Every task ended cleanly on its own.
    TasksFinished,
}

#[derive(Debug)]
pub struct ShutdownReport {
    pub trigger: ShutdownTrigger,
    /// The first task error observed, before or during the drain.
    pub first_error: Option<TaskFailure>,
    /// False when the grace period ran out and stragglers were aborted.
    pub clean: bool,
}

impl ShutdownReport {
    pub fn is_success(&self) -> bool {
        self.first_error.is_none()
    }
}

/// Raises the shared cancellation signal. Calling it more than once is the
/// same as calling it once.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    token: CancellationToken,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Shutdown requested");
        }
        self.token.cancel();
    }
}

type TaskOutcome = (&'static str, Result<(), TaskError>);

/// Runs the ingest and serving tasks and coordinates their shutdown.
///
/// Every task receives a child of one shared [`CancellationToken`]. The system
/// waits for the first of: a task failing, the termination future resolving,
/// or an explicit [`ShutdownHandle::shutdown`]. It then cancels the token,
/// gives the tasks the grace period to finish, and aborts whatever is left.
///
/// ```ignore
/// let binding = HttpBinding::Addr(config.http.addr.clone());
/// let (system, service) = OrderSystem::start(&config, store, source, binding).await;
/// let report = system.run().await;   // until SIGINT/SIGTERM or a task error
/// if !report.is_success() {
///     std::process::exit(1);
/// }
/// ```
pub struct OrderSystem {
    token: CancellationToken,
    tasks: JoinSet<TaskOutcome>,
    names: HashMap<tokio::task::Id, &'static str>,
    grace: Duration,
}

impl Default for OrderSystem {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_GRACE)
    }
}

impl OrderSystem {
    /// An empty system. Tasks are added with [`OrderSystem::spawn`].
    pub fn new(grace: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: JoinSet::new(),
            names: HashMap::new(),
            grace,
        }
    }

    /// Builds the service, warms its cache and launches the ingest and
    /// serving tasks.
    ///
    /// A failed warm-up is logged and the system starts with a cold cache.
    pub async fn start<S, M>(
        config: &AppConfig,
        store: S,
        source: M,
        binding: HttpBinding,
    ) -> (Self, Arc<OrderService<S>>)
    where
        S: DurableStore,
        M: MessageSource + 'static,
    {
        let mut system = Self::new(config.lifecycle.shutdown_grace());
        let service = Arc::new(OrderService::new(store, config.cache.capacity));

        let warm_ctx = RequestContext::with_token(system.token.child_token());
        if let Err(e) = service.warm_up(&warm_ctx).await {
            warn!(error = %e, "Cache warm-up failed, starting cold");
        }

        let worker = IngestWorker::new(source, service.clone(), OrderValidator::new());
        system.spawn("ingest", move |token| async move {
            worker.run(token).await.map(|_| ())
        });

        let state = HttpState::new(service.clone(), config.http.request_timeout());
        system.spawn("http", move |token| async move {
            let listener = binding.into_listener().await?;
            http::serve(listener, state, token).await
        });

        (system, service)
    }

    /// Spawns a task that gets its own child of the shared token.
    pub fn spawn<F, Fut, E>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<TaskError>,
    {
        let fut = task(self.token.child_token());
        let handle = self
            .tasks
            .spawn(async move { (name, fut.await.map_err(Into::into)) });
        self.names.insert(handle.id(), name);
        info!(task = name, "Task started");
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            token: self.token.clone(),
        }
    }

    /// Runs until SIGINT/SIGTERM or a task error.
    pub async fn run(self) -> ShutdownReport {
        self.run_until(shutdown_signal()).await
    }

    /// Runs until `termination` resolves, a task fails, or shutdown is
    /// requested through a [`ShutdownHandle`].
    pub async fn run_until<T>(mut self, termination: T) -> ShutdownReport
    where
        T: Future<Output = ()>,
    {
        tokio::pin!(termination);
        let mut first_error = None;

        let trigger = loop {
            tokio::select! {
                biased;
                _ = &mut termination => break ShutdownTrigger::Signal,
                _ = self.token.cancelled() => break ShutdownTrigger::Requested,
                joined = self.tasks.join_next() => {
                    let Some(joined) = joined else {
                        break ShutdownTrigger::TasksFinished;
                    };
                    if let Some(failure) = self.settle(joined) {
                        error!(task = failure.task, error = %failure.error, "Task failed");
                        first_error = Some(failure);
                        break ShutdownTrigger::TaskFailed;
                    }
                }
            }
        };

        info!(?trigger, "Shutting down");
        self.token.cancel();
        let clean = self.drain(&mut first_error).await;

        info!(clean, failed = first_error.is_some(), "Shutdown complete");
        ShutdownReport {
            trigger,
            first_error,
            clean,
        }
    }

    /// Waits out the remaining tasks, aborting them once the grace period ends.
    async fn drain(&mut self, first_error: &mut Option<TaskFailure>) -> bool {
        let grace = self.grace;
        let finished = tokio::time::timeout(grace, async {
            while let Some(joined) = self.tasks.join_next().await {
                if let Some(failure) = self.settle(joined) {
                    error!(task = failure.task, error = %failure.error, "Task failed during shutdown");
                    if first_error.is_none() {
                        *first_error = Some(failure);
                    }
                }
            }
        })
        .await;

        if finished.is_ok() {
            return true;
        }

        warn!(
            remaining = self.tasks.len(),
            grace_secs = grace.as_secs(),
            "Grace period elapsed, aborting remaining tasks"
        );
        self.tasks.abort_all();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_cancelled() {
                    warn!(task = self.name_of(&e), "Task aborted");
                }
            }
        }
        false
    }

    /// Logs a finished task and returns its failure, if it failed.
    fn settle(&self, joined: Result<TaskOutcome, JoinError>) -> Option<TaskFailure> {
        match joined {
            Ok((task, Ok(()))) => {
                info!(task, "Task finished");
                None
            }
            Ok((task, Err(error))) => Some(TaskFailure { task, error }),
            Err(e) if e.is_cancelled() => {
                warn!(task = self.name_of(&e), "Task aborted");
                None
            }
            Err(e) => Some(TaskFailure {
                task: self.name_of(&e),
                error: TaskError::Panicked(e.to_string()),
            }),
        }
    }

    fn name_of(&self, e: &JoinError) -> &'static str {
        self.names.get(&e.id()).copied().unwrap_or("unknown")
    }
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
