use crate::{
    boxed, BoxedFuture, HostId, Service, ServiceInfo, ServiceLookup, Svc,
};
use futures::future::ready;

/// A type that can be passed to a client as one of its arguments.
///
/// Arguments that are left empty may be substituted by a service from a
/// [`ServiceLookup`]. Types that should never be looked up (plain values
/// like numbers or strings) set [`Argument::IS_SERVICE`] to `false`:
///
/// ```
/// use init_args::Argument;
///
/// #[derive(Clone)]
/// struct Volume(f32);
///
/// impl Argument for Volume {
///     const IS_SERVICE: bool = false;
/// }
///
/// assert!(!Volume::IS_SERVICE);
/// assert!(<init_args::Svc<String>>::IS_SERVICE);
/// ```
pub trait Argument: Service + Clone {
    /// Whether this type can be substituted by a registered service when no
    /// value was assigned to it.
    const IS_SERVICE: bool = true;

    /// Gets the value to inject when this argument is missing and the null
    /// guard tolerates it. Types which have no way to represent a missing
    /// value return `None`, in which case initialization fails.
    #[must_use]
    fn absent() -> Option<Self> {
        None
    }

    /// Gets the type information used to look this argument up as a service.
    #[must_use]
    fn service_info() -> ServiceInfo {
        ServiceInfo::of::<Self>()
    }

    /// Looks up a service that can stand in for this argument.
    fn from_services(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> Option<Self> {
        if !Self::IS_SERVICE {
            return None;
        }

        services.lookup::<Self>(scope)
    }

    /// Checks whether a service that can stand in for this argument exists
    /// without retrieving it.
    fn service_exists(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> bool {
        let info = Self::service_info();
        Self::IS_SERVICE
            && !services.is_excluded(info)
            && services.exists(info, scope)
    }

    /// Checks whether the service that can stand in for this argument is
    /// loaded asynchronously.
    fn service_is_async(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> bool {
        let info = Self::service_info();
        Self::IS_SERVICE
            && !services.is_excluded(info)
            && services.is_async(info, scope)
    }

    /// Looks up a service that can stand in for this argument, waiting for
    /// it to load if needed.
    fn from_services_async(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> BoxedFuture<'_, Option<Self>> {
        if !Self::IS_SERVICE {
            return boxed(ready(None));
        }

        boxed(services.lookup_async::<Self>(scope))
    }
}

impl<T: ?Sized + Service> Argument for Svc<T> {}

impl<T: Argument> Argument for Option<T> {
    const IS_SERVICE: bool = T::IS_SERVICE;

    fn absent() -> Option<Self> {
        Some(None)
    }

    fn service_info() -> ServiceInfo {
        T::service_info()
    }

    fn from_services(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> Option<Self> {
        T::from_services(services, scope).map(Some)
    }

    fn service_exists(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> bool {
        T::service_exists(services, scope)
    }

    fn service_is_async(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> bool {
        T::service_is_async(services, scope)
    }

    fn from_services_async(
        services: &dyn ServiceLookup,
        scope: Option<HostId>,
    ) -> BoxedFuture<'_, Option<Self>> {
        boxed(async move {
            T::from_services_async(services, scope).await.map(Some)
        })
    }
}

macro_rules! value_arguments {
    ($($type:ty),* $(,)?) => {
        $(
            impl Argument for $type {
                const IS_SERVICE: bool = false;
            }
        )*
    };
}

value_arguments!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);
