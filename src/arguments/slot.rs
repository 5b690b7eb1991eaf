use crate::{
    boxed, Argument, AsyncValueProvider, BoxedFuture, Host, HostId,
    InitError, InitResult, NullGuardResult, ProvideRequest, ServiceInfo,
    ServiceLookup, Svc, ValueProvider,
};
use std::fmt::{Debug, Formatter};

/// Holds what an initializer knows about one of its arguments before it is
/// resolved.
///
/// ```
/// use init_args::ArgumentSlot;
///
/// let slot = ArgumentSlot::from(42);
/// assert!(!slot.is_empty());
/// assert!(!slot.is_async());
/// assert!(ArgumentSlot::<i32>::default().is_empty());
/// ```
pub enum ArgumentSlot<T: Argument> {
    /// Nothing was assigned. A service is looked up in its place.
    Empty,
    /// Explicitly assigned nothing. Services are never looked up.
    Null,
    /// A value to pass as-is.
    Value(T),
    /// A provider asked for the value when the argument is resolved.
    Provider(Svc<dyn ValueProvider<T>>),
    /// A provider awaited for the value when the argument is resolved.
    AsyncProvider(Svc<dyn AsyncValueProvider<T>>),
}

impl<T: Argument> ArgumentSlot<T> {
    /// Creates a slot holding a value.
    #[must_use]
    pub fn value(value: T) -> Self {
        ArgumentSlot::Value(value)
    }

    /// Creates a slot backed by a provider.
    #[must_use]
    pub fn provider<P: ValueProvider<T>>(provider: P) -> Self {
        ArgumentSlot::Provider(Svc::new(provider))
    }

    /// Creates a slot backed by an asynchronous provider.
    #[must_use]
    pub fn async_provider<P: AsyncValueProvider<T>>(provider: P) -> Self {
        ArgumentSlot::AsyncProvider(Svc::new(provider))
    }

    /// Whether nothing was assigned to this slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, ArgumentSlot::Empty)
    }

    /// Whether this slot can only be resolved asynchronously.
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self, ArgumentSlot::AsyncProvider(_))
    }

    /// Whether this slot can only be resolved asynchronously with the given
    /// services. Empty slots are asynchronous when the service standing in
    /// for them is loaded asynchronously.
    #[must_use]
    pub fn resolves_async(
        &self,
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> bool {
        match self {
            ArgumentSlot::AsyncProvider(_) => true,
            ArgumentSlot::Empty => T::service_is_async(services, scope),
            _ => false,
        }
    }

    /// Resolves the value of this slot without waiting. `Ok(None)` means the
    /// argument is missing.
    pub fn resolve_sync(
        &self,
        request: &ProvideRequest<'_>,
    ) -> InitResult<Option<T>> {
        match self {
            ArgumentSlot::Empty => {
                Ok(T::from_services(request.services(), request.scope()))
            }
            ArgumentSlot::Null => Ok(None),
            ArgumentSlot::Value(value) => Ok(Some(value.clone())),
            ArgumentSlot::Provider(provider) => {
                provider.provide(request).map_err(|inner| {
                    InitError::ProviderFailed {
                        client: request.initializer().client_info(),
                        argument: ServiceInfo::of::<T>(),
                        position: request.position(),
                        inner,
                    }
                })
            }
            ArgumentSlot::AsyncProvider(_) => Err(InitError::AsyncOnly {
                client: request.initializer().client_info(),
                argument: ServiceInfo::of::<T>(),
                position: request.position(),
            }),
        }
    }

    /// Resolves the value of this slot, waiting for asynchronous providers
    /// and services. Other slots resolve immediately.
    pub fn resolve_async<'a>(
        &'a self,
        request: ProvideRequest<'a>,
    ) -> BoxedFuture<'a, InitResult<Option<T>>> {
        match self {
            ArgumentSlot::Empty
                if T::service_is_async(request.services(), request.scope()) =>
            {
                let lookup =
                    T::from_services_async(request.services(), request.scope());
                boxed(async move { Ok(lookup.await) })
            }
            ArgumentSlot::AsyncProvider(provider) => {
                let client = request.initializer().client_info();
                let position = request.position();
                let future = provider.provide_async(request);
                boxed(async move {
                    future.await.map_err(|inner| InitError::ProviderFailed {
                        client,
                        argument: ServiceInfo::of::<T>(),
                        position,
                        inner,
                    })
                })
            }
            _ => boxed(futures::future::ready(self.resolve_sync(&request))),
        }
    }

    /// Checks whether resolving this slot would currently produce a value.
    /// Values and service lookups are checked without side effects.
    #[must_use]
    pub fn has_value(&self, request: &ProvideRequest<'_>) -> bool {
        match self {
            ArgumentSlot::Empty => {
                T::service_exists(request.services(), request.scope())
            }
            ArgumentSlot::Null => false,
            ArgumentSlot::Value(_) => true,
            ArgumentSlot::Provider(provider) => provider.has_value(request),
            ArgumentSlot::AsyncProvider(provider) => {
                provider.has_value(request)
            }
        }
    }

    /// Checks this slot against the null guard. Outside of live execution,
    /// empty slots of service types pass since the service may be
    /// registered once the host runs.
    #[must_use]
    pub fn evaluate_null_guard(
        &self,
        request: &ProvideRequest<'_>,
    ) -> NullGuardResult {
        match self {
            ArgumentSlot::Value(_) => NullGuardResult::Passed,
            ArgumentSlot::Null => NullGuardResult::ValueMissing,
            ArgumentSlot::Empty => {
                if (T::IS_SERVICE && !request.is_live())
                    || T::service_exists(request.services(), request.scope())
                {
                    NullGuardResult::Passed
                } else {
                    NullGuardResult::ValueMissing
                }
            }
            ArgumentSlot::Provider(provider) => provider.null_guard(request),
            ArgumentSlot::AsyncProvider(provider) => {
                provider.null_guard(request)
            }
        }
    }

    /// Empties this slot. If the slot is backed by a provider that can
    /// release what it produced, the given value is handed back to it.
    /// Otherwise the slot's contents are dropped. Returns whether the value
    /// was released to a provider.
    pub(crate) fn release(
        &mut self,
        host: Option<&dyn Host>,
        value: Option<T>,
    ) -> bool {
        match std::mem::take(self) {
            ArgumentSlot::Provider(provider) => {
                match (provider.releaser(), value) {
                    (Some(releaser), Some(value)) => {
                        releaser.release(host, value);
                        true
                    }
                    _ => false,
                }
            }
            ArgumentSlot::AsyncProvider(provider) => {
                match (provider.releaser(), value) {
                    (Some(releaser), Some(value)) => {
                        releaser.release(host, value);
                        true
                    }
                    _ => false,
                }
            }
            ArgumentSlot::Empty
            | ArgumentSlot::Null
            | ArgumentSlot::Value(_) => false,
        }
    }
}

impl<T: Argument> Default for ArgumentSlot<T> {
    fn default() -> Self {
        ArgumentSlot::Empty
    }
}

impl<T: Argument> Clone for ArgumentSlot<T> {
    fn clone(&self) -> Self {
        match self {
            ArgumentSlot::Empty => ArgumentSlot::Empty,
            ArgumentSlot::Null => ArgumentSlot::Null,
            ArgumentSlot::Value(value) => ArgumentSlot::Value(value.clone()),
            ArgumentSlot::Provider(provider) => {
                ArgumentSlot::Provider(provider.clone())
            }
            ArgumentSlot::AsyncProvider(provider) => {
                ArgumentSlot::AsyncProvider(provider.clone())
            }
        }
    }
}

impl<T: Argument> From<T> for ArgumentSlot<T> {
    fn from(value: T) -> Self {
        ArgumentSlot::Value(value)
    }
}

impl<T: Argument> Debug for ArgumentSlot<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            ArgumentSlot::Empty => "Empty",
            ArgumentSlot::Null => "Null",
            ArgumentSlot::Value(_) => "Value",
            ArgumentSlot::Provider(_) => "Provider",
            ArgumentSlot::AsyncProvider(_) => "AsyncProvider",
        };
        f.debug_tuple(kind)
            .field(&ServiceInfo::of::<T>().name())
            .finish()
    }
}
