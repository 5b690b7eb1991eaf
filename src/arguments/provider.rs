use crate::{
    boxed, BoxError, BoxedFuture, Host, HostId, Initializer, MaybeSend,
    NullGuardResult, Service, ServiceLookup,
};
use derive_more::Display;
use std::{future::Future, marker::PhantomData};

/// The execution context an argument is resolved in. Providers which rely
/// on host APIs that are only usable from the host's own thread can check
/// this before touching them.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Context {
    /// Resolution happens on the host's own scheduling context.
    MainThread,
    /// Resolution may happen anywhere.
    Unconstrained,
}

impl Default for Context {
    fn default() -> Self {
        Context::MainThread
    }
}

/// Everything a provider is given when asked for a value.
#[derive(Clone, Copy)]
pub struct ProvideRequest<'a> {
    initializer: &'a dyn Initializer,
    host: Option<&'a dyn Host>,
    services: &'a dyn ServiceLookup,
    context: Context,
    position: usize,
}

impl<'a> ProvideRequest<'a> {
    /// Creates a request on behalf of an initializer.
    #[must_use]
    pub fn new(
        initializer: &'a dyn Initializer,
        host: Option<&'a dyn Host>,
        services: &'a dyn ServiceLookup,
    ) -> Self {
        ProvideRequest {
            initializer,
            host,
            services,
            context: Context::MainThread,
            position: 0,
        }
    }

    /// Sets the context the request is made from.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Sets the one-based position of the argument being requested.
    #[must_use]
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// The initializer the value is requested for.
    #[must_use]
    pub fn initializer(&self) -> &'a dyn Initializer {
        self.initializer
    }

    /// The host of the initializer, if it still exists.
    #[must_use]
    pub fn host(&self) -> Option<&'a dyn Host> {
        self.host
    }

    /// The services that empty arguments fall back to.
    #[must_use]
    pub fn services(&self) -> &'a dyn ServiceLookup {
        self.services
    }

    /// The context the request is made from.
    #[must_use]
    pub fn context(&self) -> Context {
        self.context
    }

    /// The one-based position of the argument, or zero if the request isn't
    /// for a particular argument.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the request is made during live execution.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.host.map_or(false, |host| host.is_live())
    }

    /// The scope services are looked up in. Host-scoped services can only be
    /// found from the host's own context.
    #[must_use]
    pub fn scope(&self) -> Option<HostId> {
        match self.context {
            Context::MainThread => self.host.map(|host| host.id()),
            Context::Unconstrained => None,
        }
    }
}

/// Produces the value of an argument on demand.
pub trait ValueProvider<T>: Service {
    /// Produces a value. `Ok(None)` means the provider has nothing to give,
    /// which is treated like a missing argument.
    fn provide(
        &self,
        request: &ProvideRequest<'_>,
    ) -> Result<Option<T>, BoxError>;

    /// Checks whether [`ValueProvider::provide`] would currently produce a
    /// value. Providers whose values are expensive to produce should
    /// override this with a cheaper check.
    fn has_value(&self, request: &ProvideRequest<'_>) -> bool {
        matches!(self.provide(request), Ok(Some(_)))
    }

    /// Checks this provider against the null guard. A provider that raises
    /// an error reports [`NullGuardResult::ProviderException`].
    fn null_guard(&self, request: &ProvideRequest<'_>) -> NullGuardResult {
        match self.provide(request) {
            Ok(Some(_)) => NullGuardResult::Passed,
            Ok(None) if request.is_live() => NullGuardResult::ValueMissing,
            Ok(None) => NullGuardResult::ProviderNotReady,
            Err(_) => NullGuardResult::ProviderException,
        }
    }

    /// Gets the capability used to release values produced by this provider.
    fn releaser(&self) -> Option<&dyn ValueReleaser<T>> {
        None
    }
}

/// Produces the value of an argument asynchronously. Arguments backed by an
/// asynchronous provider force their initializer onto the asynchronous path.
pub trait AsyncValueProvider<T>: Service {
    /// Produces a value.
    fn provide_async<'a>(
        &'a self,
        request: ProvideRequest<'a>,
    ) -> BoxedFuture<'a, Result<Option<T>, BoxError>>;

    /// Checks whether a value is available without waiting for one.
    fn has_value(&self, _request: &ProvideRequest<'_>) -> bool {
        false
    }

    /// Checks this provider against the null guard. Values which are not
    /// produced yet may still be produced at runtime.
    fn null_guard(&self, request: &ProvideRequest<'_>) -> NullGuardResult {
        if self.has_value(request) {
            NullGuardResult::Passed
        } else {
            NullGuardResult::ProviderNotReady
        }
    }

    /// Gets the capability used to release values produced by this provider.
    fn releaser(&self) -> Option<&dyn ValueReleaser<T>> {
        None
    }
}

/// Releases a value that was produced by a provider once the initializer it
/// was produced for is torn down.
pub trait ValueReleaser<T> {
    /// Releases a value.
    fn release(&self, host: Option<&dyn Host>, value: T);
}

/// A [`ValueProvider`] backed by a function.
pub struct FnProvider<F, T> {
    func: F,
    marker: PhantomData<fn() -> T>,
}

/// Creates a [`ValueProvider`] from a function.
///
/// ```
/// use init_args::{provider_fn, ArgumentSlot};
///
/// let slot: ArgumentSlot<i32> =
///     ArgumentSlot::provider(provider_fn(|_| Ok(Some(4))));
/// assert!(!slot.is_async());
/// ```
pub fn provider_fn<T, F>(func: F) -> FnProvider<F, T>
where
    F: Service + Fn(&ProvideRequest<'_>) -> Result<Option<T>, BoxError>,
    T: Service,
{
    FnProvider {
        func,
        marker: PhantomData,
    }
}

impl<F, T> ValueProvider<T> for FnProvider<F, T>
where
    F: Service + Fn(&ProvideRequest<'_>) -> Result<Option<T>, BoxError>,
    T: Service,
{
    fn provide(
        &self,
        request: &ProvideRequest<'_>,
    ) -> Result<Option<T>, BoxError> {
        (self.func)(request)
    }
}

/// An [`AsyncValueProvider`] backed by a function returning a future.
pub struct AsyncFnProvider<F, T> {
    func: F,
    marker: PhantomData<fn() -> T>,
}

/// Creates an [`AsyncValueProvider`] from a function returning a future.
///
/// ```
/// use init_args::{async_provider_fn, ArgumentSlot, BoxError};
///
/// let slot: ArgumentSlot<String> =
///     ArgumentSlot::async_provider(async_provider_fn(|| async {
///         Ok::<_, BoxError>(Some("ready".to_string()))
///     }));
/// assert!(slot.is_async());
/// ```
pub fn async_provider_fn<T, F, Fut>(func: F) -> AsyncFnProvider<F, T>
where
    F: Service + Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, BoxError>> + MaybeSend + 'static,
    T: Service,
{
    AsyncFnProvider {
        func,
        marker: PhantomData,
    }
}

impl<F, T, Fut> AsyncValueProvider<T> for AsyncFnProvider<F, T>
where
    F: Service + Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, BoxError>> + MaybeSend + 'static,
    T: Service,
{
    fn provide_async<'a>(
        &'a self,
        _request: ProvideRequest<'a>,
    ) -> BoxedFuture<'a, Result<Option<T>, BoxError>> {
        boxed((self.func)())
    }
}
