#![allow(clippy::used_underscore_binding)]

use crate::{InitState, ServiceInfo};
use derive_more::Display;
use std::error::Error;

/// A boxed error raised by a provider or by a client while accepting its
/// arguments.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A result from attempting to resolve the arguments of a client and inject
/// them into it.
pub type InitResult<T> = Result<T, InitError>;

/// An error that has occurred while initializing a client.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum InitError {
    /// A required argument resolved to nothing and no service could stand in
    /// for it.
    #[display(
        fmt = "argument #{} ({}) of {} is missing",
        position,
        argument,
        client
    )]
    MissingArgument {
        /// The client being initialized.
        client: ServiceInfo,
        /// The type of the missing argument.
        argument: ServiceInfo,
        /// The one-based position of the argument.
        position: usize,
    },

    /// The requested target cannot receive the arguments.
    #[display(fmt = "invalid target for {}: {}", client, reason)]
    InvalidTarget {
        /// The client being initialized.
        client: ServiceInfo,
        /// Why the target was rejected.
        reason: &'static str,
    },

    /// A provider returned an error while producing an argument.
    #[display(
        fmt = "the provider of argument #{} ({}) of {} failed: {}",
        position,
        argument,
        client,
        inner
    )]
    ProviderFailed {
        /// The client being initialized.
        client: ServiceInfo,
        /// The type of the argument being produced.
        argument: ServiceInfo,
        /// The one-based position of the argument.
        position: usize,
        /// The error raised by the provider.
        inner: BoxError,
    },

    /// The initializer was asked to initialize its client while it was
    /// already resolving that client's arguments. This usually means that an
    /// argument provider depends on the client it provides for.
    #[display(
        fmt = "reentrant initialization of {} (an argument provider \
               depends on its own client)",
        client
    )]
    ReentrantInitialization {
        /// The client being initialized.
        client: ServiceInfo,
    },

    /// The client refused the arguments it was given.
    #[display(fmt = "{} failed to accept its arguments: {}", client, inner)]
    ActivationFailed {
        /// The client being initialized.
        client: ServiceInfo,
        /// The error returned by the client.
        inner: BoxError,
    },

    /// An asynchronous provider was asked for its value synchronously.
    #[display(
        fmt = "argument #{} ({}) of {} can only be resolved asynchronously",
        position,
        argument,
        client
    )]
    AsyncOnly {
        /// The client being initialized.
        client: ServiceInfo,
        /// The type of the argument.
        argument: ServiceInfo,
        /// The one-based position of the argument, or zero if the whole
        /// initializer was asked to run synchronously.
        position: usize,
    },

    /// An asynchronous initialization is in flight and the synchronous path
    /// cannot wait for it.
    #[display(fmt = "initialization of {} is still in progress", client)]
    InitializationPending {
        /// The client being initialized.
        client: ServiceInfo,
    },

    /// An earlier attempt failed. Initializers are never retried.
    #[display(
        fmt = "initialization of {} previously failed: {}",
        client,
        message
    )]
    PreviouslyFailed {
        /// The client being initialized.
        client: ServiceInfo,
        /// The message of the error that failed the first attempt.
        message: String,
    },

    /// The initializer can no longer be configured.
    #[display(
        fmt = "the initializer of {} can't be configured while {}",
        client,
        state
    )]
    AlreadyStarted {
        /// The client being initialized.
        client: ServiceInfo,
        /// The state the initializer was in.
        state: InitState,
    },

    /// The host or the initializer was torn down while arguments were being
    /// produced. Nothing was injected.
    #[display(fmt = "initialization of {} was abandoned", client)]
    Abandoned {
        /// The client being initialized.
        client: ServiceInfo,
    },

    /// The initializer or its host has already been destroyed.
    #[display(fmt = "the initializer of {} has been destroyed", client)]
    Destroyed {
        /// The client being initialized.
        client: ServiceInfo,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(
        fmt = "an unexpected error occurred (please report this): {}",
        _0
    )]
    InternalError(String),
}

impl InitError {
    /// Gets the client this error is about, if any.
    #[must_use]
    pub fn client(&self) -> Option<ServiceInfo> {
        match self {
            InitError::MissingArgument { client, .. }
            | InitError::InvalidTarget { client, .. }
            | InitError::ProviderFailed { client, .. }
            | InitError::ReentrantInitialization { client }
            | InitError::ActivationFailed { client, .. }
            | InitError::AsyncOnly { client, .. }
            | InitError::InitializationPending { client }
            | InitError::PreviouslyFailed { client, .. }
            | InitError::AlreadyStarted { client, .. }
            | InitError::Abandoned { client }
            | InitError::Destroyed { client } => Some(*client),
            InitError::InternalError(_) => None,
        }
    }

    /// Whether this error fails the initializer it was raised by. Errors
    /// that only reject a call (like configuring an initializer that has
    /// already started) return `false`.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            InitError::InitializationPending { .. }
                | InitError::ReentrantInitialization { .. }
                | InitError::PreviouslyFailed { .. }
                | InitError::AlreadyStarted { .. }
                | InitError::AsyncOnly { .. }
        )
    }
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InitError::ProviderFailed { inner, .. }
            | InitError::ActivationFailed { inner, .. } => Some(inner.as_ref()),
            _ => None,
        }
    }
}
