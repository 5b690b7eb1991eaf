use crate::{
    sync::{Lock, LockEx},
    InitError, InitResult, ServiceInfo,
};
use derive_more::Display;
use futures::channel::oneshot;
use std::thread::{self, ThreadId};
use tracing::{debug, error};

/// The lifecycle of an initializer. States only move forward.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InitState {
    /// The initializer can still be configured.
    Uninitialized,
    /// The initializer is resolving arguments for its client.
    Initializing,
    /// The client has accepted its arguments.
    Initialized,
    /// Initialization failed. It is never retried.
    Failed,
}

impl InitState {
    /// Whether the state can't change anymore.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, InitState::Initialized | InitState::Failed)
    }
}

impl Default for InitState {
    fn default() -> Self {
        InitState::Uninitialized
    }
}

/// What a synchronous caller should do.
pub(crate) enum SyncEntry<R> {
    /// The caller owns the attempt.
    Started,
    /// A previous attempt succeeded.
    Done(R),
}

/// What an asynchronous caller should do.
pub(crate) enum AsyncEntry<R> {
    /// The caller owns the attempt.
    Started,
    /// A previous attempt succeeded.
    Done(R),
    /// Another attempt is in flight. The receiver completes once it ends.
    Wait(oneshot::Receiver<()>),
}

struct Inner<R> {
    state: InitState,
    result: Option<R>,
    failure: Option<String>,
    waiters: Vec<oneshot::Sender<()>>,
}

/// The state of an initializer along with the outcome of its only attempt.
///
/// While arguments are resolved, the cell remembers the thread doing the
/// resolving. Calls from that thread are reentrant, while calls from other
/// threads wait for the attempt to end.
pub(crate) struct StateCell<R> {
    client: ServiceInfo,
    inner: Lock<Inner<R>>,
    resolving: Lock<Option<ThreadId>>,
}

impl<R: Clone> StateCell<R> {
    pub fn new(client: ServiceInfo) -> Self {
        StateCell {
            client,
            inner: Lock::new(Inner {
                state: InitState::Uninitialized,
                result: None,
                failure: None,
                waiters: Vec::new(),
            }),
            resolving: Lock::new(None),
        }
    }

    pub fn state(&self) -> InitState {
        self.inner.with_inner(|inner| inner.state)
    }

    /// Fails unless the initializer can still be configured.
    pub fn ensure_uninitialized(&self) -> InitResult<()> {
        match self.state() {
            InitState::Uninitialized => Ok(()),
            state => Err(InitError::AlreadyStarted {
                client: self.client,
                state,
            }),
        }
    }

    /// Whether arguments are being resolved right now on the current
    /// thread.
    pub fn is_resolving(&self) -> bool {
        let current = thread::current().id();
        self.resolving.with_inner(|owner| *owner == Some(current))
    }

    pub fn begin_sync(&self) -> InitResult<SyncEntry<R>> {
        let resolving = self.is_resolving();
        self.inner.with_inner_mut(|inner| match inner.state {
            InitState::Uninitialized => {
                inner.state = InitState::Initializing;
                Ok(SyncEntry::Started)
            }
            InitState::Initializing if resolving => Err(self.reentry()),
            InitState::Initializing => Err(InitError::InitializationPending {
                client: self.client,
            }),
            InitState::Initialized => {
                Self::stored(self.client, inner).map(SyncEntry::Done)
            }
            InitState::Failed => {
                Err(Self::previous_failure(self.client, inner))
            }
        })
    }

    pub fn begin_async(&self) -> InitResult<AsyncEntry<R>> {
        let resolving = self.is_resolving();
        self.inner.with_inner_mut(|inner| match inner.state {
            InitState::Uninitialized => {
                inner.state = InitState::Initializing;
                Ok(AsyncEntry::Started)
            }
            InitState::Initializing if resolving => Err(self.reentry()),
            InitState::Initializing => {
                let (sender, receiver) = oneshot::channel();
                inner.waiters.push(sender);
                Ok(AsyncEntry::Wait(receiver))
            }
            InitState::Initialized => {
                Self::stored(self.client, inner).map(AsyncEntry::Done)
            }
            InitState::Failed => {
                Err(Self::previous_failure(self.client, inner))
            }
        })
    }

    /// Gets the outcome of the attempt after it ended.
    pub fn outcome(&self) -> InitResult<R> {
        self.inner.with_inner(|inner| match inner.state {
            InitState::Initialized => Self::stored(self.client, inner),
            InitState::Failed => {
                Err(Self::previous_failure(self.client, inner))
            }
            state => Err(InitError::InternalError(format!(
                "attempt to initialize {} ended while {}",
                self.client, state
            ))),
        })
    }

    /// Marks arguments as being resolved on the current thread until the
    /// returned guard is dropped.
    pub fn enter_resolution(&self) -> ResolutionGuard<'_> {
        let current = thread::current().id();
        self.resolving.with_inner_mut(|owner| *owner = Some(current));
        ResolutionGuard {
            resolving: &self.resolving,
        }
    }

    /// Takes ownership of the attempt started by a successful `begin_*`.
    /// If the attempt is dropped before it is finished, it is abandoned.
    pub fn attempt(&self) -> Attempt<'_, R> {
        Attempt {
            cell: self,
            finished: false,
        }
    }

    fn complete(&self, result: R) {
        let waiters = self.inner.with_inner_mut(|inner| {
            inner.state = InitState::Initialized;
            inner.result = Some(result);
            std::mem::take(&mut inner.waiters)
        });
        debug!(
            client = %self.client,
            state = %InitState::Initialized,
            "initializer state changed"
        );
        Self::wake(waiters);
    }

    fn fail(&self, error: &InitError) {
        let waiters = self.inner.with_inner_mut(|inner| {
            inner.state = InitState::Failed;
            inner.failure = Some(error.to_string());
            std::mem::take(&mut inner.waiters)
        });
        debug!(
            client = %self.client,
            state = %InitState::Failed,
            "initializer state changed"
        );
        Self::wake(waiters);
    }

    fn reentry(&self) -> InitError {
        error!(
            client = %self.client,
            "initializer was reentered while resolving its arguments"
        );
        InitError::ReentrantInitialization {
            client: self.client,
        }
    }

    fn wake(waiters: Vec<oneshot::Sender<()>>) {
        for waiter in waiters {
            // Waiters that stopped waiting don't need to be told.
            let _ = waiter.send(());
        }
    }

    fn stored(client: ServiceInfo, inner: &Inner<R>) -> InitResult<R> {
        inner.result.clone().ok_or_else(|| {
            InitError::InternalError(format!(
                "{client} is initialized but has no stored client"
            ))
        })
    }

    fn previous_failure(client: ServiceInfo, inner: &Inner<R>) -> InitError {
        InitError::PreviouslyFailed {
            client,
            message: inner.failure.clone().unwrap_or_default(),
        }
    }
}

/// Clears the resolving thread when dropped.
pub(crate) struct ResolutionGuard<'a> {
    resolving: &'a Lock<Option<ThreadId>>,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.resolving.with_inner_mut(|owner| *owner = None);
    }
}

/// The only attempt to initialize a client.
pub(crate) struct Attempt<'a, R: Clone> {
    cell: &'a StateCell<R>,
    finished: bool,
}

impl<R: Clone> Attempt<'_, R> {
    /// Ends the attempt with its outcome.
    pub fn finish(mut self, outcome: InitResult<R>) -> InitResult<R> {
        self.finished = true;
        match outcome {
            Ok(result) => {
                self.cell.complete(result.clone());
                Ok(result)
            }
            Err(error) => {
                self.cell.fail(&error);
                Err(error)
            }
        }
    }
}

impl<R: Clone> Drop for Attempt<'_, R> {
    fn drop(&mut self) {
        if !self.finished {
            let error = InitError::Abandoned {
                client: self.cell.client,
            };
            debug!(
                client = %self.cell.client,
                "initialization was dropped before it finished"
            );
            self.cell.fail(&error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> StateCell<u32> {
        StateCell::new(ServiceInfo::of::<u32>())
    }

    #[test]
    fn successful_attempt_is_stored() {
        let cell = cell();
        assert!(matches!(cell.begin_sync(), Ok(SyncEntry::Started)));
        assert_eq!(InitState::Initializing, cell.state());

        cell.attempt().finish(Ok(5)).unwrap();
        assert_eq!(InitState::Initialized, cell.state());
        assert!(matches!(cell.begin_sync(), Ok(SyncEntry::Done(5))));
        assert!(matches!(cell.begin_async(), Ok(AsyncEntry::Done(5))));
    }

    #[test]
    fn failure_is_preserved() {
        let cell = cell();
        let _ = cell.begin_sync().unwrap();
        let error = cell
            .attempt()
            .finish(Err(InitError::InternalError("boom".into())))
            .unwrap_err();
        assert!(matches!(error, InitError::InternalError(_)));

        match cell.begin_sync() {
            Err(InitError::PreviouslyFailed { message, .. }) => {
                assert!(message.contains("boom"));
            }
            _ => panic!("expected the previous failure"),
        }
        assert_eq!(InitState::Failed, cell.state());
    }

    #[test]
    fn reentry_is_detected_while_resolving() {
        let cell = cell();
        let _ = cell.begin_sync().unwrap();
        let attempt = cell.attempt();

        {
            let _guard = cell.enter_resolution();
            assert!(matches!(
                cell.begin_sync(),
                Err(InitError::ReentrantInitialization { .. })
            ));
            assert!(matches!(
                cell.begin_async(),
                Err(InitError::ReentrantInitialization { .. })
            ));
        }

        assert!(matches!(
            cell.begin_sync(),
            Err(InitError::InitializationPending { .. })
        ));
        attempt.finish(Ok(1)).unwrap();
    }

    #[test]
    #[cfg(feature = "arc")]
    fn other_threads_are_not_reentrant() {
        let cell = cell();
        let _ = cell.begin_async().unwrap();
        let attempt = cell.attempt();
        let guard = cell.enter_resolution();
        assert!(cell.is_resolving());

        std::thread::scope(|scope| {
            scope.spawn(|| {
                assert!(!cell.is_resolving());
                assert!(matches!(
                    cell.begin_sync(),
                    Err(InitError::InitializationPending { .. })
                ));
                assert!(matches!(cell.begin_async(), Ok(AsyncEntry::Wait(_))));
            });
        });

        drop(guard);
        assert!(!cell.is_resolving());
        attempt.finish(Ok(2)).unwrap();
    }

    #[test]
    fn waiters_are_woken_with_the_outcome() {
        let cell = cell();
        let _ = cell.begin_async().unwrap();
        let attempt = cell.attempt();

        let receiver = match cell.begin_async() {
            Ok(AsyncEntry::Wait(receiver)) => receiver,
            _ => panic!("expected to wait"),
        };
        attempt.finish(Ok(9)).unwrap();

        futures::executor::block_on(receiver).unwrap();
        assert_eq!(9, cell.outcome().unwrap());
    }

    #[test]
    fn dropped_attempt_is_abandoned() {
        let cell = cell();
        let _ = cell.begin_async().unwrap();
        drop(cell.attempt());

        assert_eq!(InitState::Failed, cell.state());
        assert!(matches!(
            cell.ensure_uninitialized(),
            Err(InitError::AlreadyStarted {
                state: InitState::Failed,
                ..
            })
        ));
    }
}
