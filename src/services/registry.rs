use crate::{
    boxed, downcast, erase, BoxedFuture, DynSvc, HostId, MaybeSend, Service,
    ServiceInfo, Svc,
};
use futures::{
    future::{ready, Shared},
    FutureExt,
};
use std::{
    collections::{HashMap, HashSet},
    future::Future,
};
use tracing::trace;

/// Read-only access to registered services. Empty arguments of service
/// types are looked up here.
pub trait ServiceLookup: Service {
    /// Gets the service registered for a type. Services registered for the
    /// given host take precedence over global ones. Services that are
    /// loaded asynchronously are only returned once they have loaded.
    fn try_get(
        &self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> Option<DynSvc>;

    /// Checks whether a service is registered for a type.
    fn exists(
        &self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> bool {
        self.try_get(service_info, scope).is_some()
    }

    /// Whether a type has been excluded from being resolved as a service.
    fn is_excluded(&self, _service_info: ServiceInfo) -> bool {
        false
    }

    /// Whether the service registered for a type is loaded asynchronously.
    /// Initializers with empty arguments of such types can only initialize
    /// their clients asynchronously.
    fn is_async(
        &self,
        _service_info: ServiceInfo,
        _scope: Option<HostId>,
    ) -> bool {
        false
    }

    /// Gets the service registered for a type, waiting for it to load if
    /// needed.
    fn try_get_async<'a>(
        &'a self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> BoxedFuture<'a, Option<DynSvc>> {
        boxed(ready(self.try_get(service_info, scope)))
    }
}

impl dyn ServiceLookup {
    /// Gets a copy of the service registered for `T`.
    #[must_use]
    pub fn lookup<T: Service + Clone>(
        &self,
        scope: Option<HostId>,
    ) -> Option<T> {
        let service_info = ServiceInfo::of::<T>();
        if self.is_excluded(service_info) {
            return None;
        }

        let service = self.try_get(service_info, scope)?;
        Self::copy_of(service, scope)
    }

    /// Gets a copy of the service registered for `T`, waiting for it to load
    /// if needed.
    pub async fn lookup_async<T: Service + Clone>(
        &self,
        scope: Option<HostId>,
    ) -> Option<T> {
        let service_info = ServiceInfo::of::<T>();
        if self.is_excluded(service_info) {
            return None;
        }

        let service = self.try_get_async(service_info, scope).await?;
        Self::copy_of(service, scope)
    }

    fn copy_of<T: Service + Clone>(
        service: DynSvc,
        scope: Option<HostId>,
    ) -> Option<T> {
        let service = downcast::<T>(service).ok()?;
        trace!(
            service = %ServiceInfo::of::<T>(),
            ?scope,
            "resolved argument from services"
        );
        Some(T::clone(&service))
    }
}

type Key = (Option<HostId>, ServiceInfo);
type Loading = Shared<BoxedFuture<'static, DynSvc>>;

/// A registered service, either ready or loading.
enum Entry<'a> {
    Ready(&'a DynSvc),
    Loading(&'a Loading),
}

/// An in-memory collection of services. Cloning it does not clone the
/// services inside of it.
///
/// ```
/// use init_args::{HostId, ServiceLookup, Services};
///
/// let mut builder = Services::builder();
/// builder.provide("global".to_string());
/// builder.provide_for(HostId(1), "scoped".to_string());
/// let services = builder.build();
/// let services: &dyn ServiceLookup = &services;
///
/// assert_eq!(Some("scoped".to_string()), services.lookup(Some(HostId(1))));
/// assert_eq!(Some("global".to_string()), services.lookup(Some(HostId(2))));
/// assert_eq!(Some("global".to_string()), services.lookup(None));
/// ```
#[derive(Clone, Default)]
pub struct Services {
    services: Svc<HashMap<Key, DynSvc>>,
    loading: Svc<HashMap<Key, Loading>>,
    excluded: Svc<HashSet<ServiceInfo>>,
}

impl Services {
    /// Creates a builder for a collection of services.
    #[must_use]
    pub fn builder() -> ServicesBuilder {
        ServicesBuilder::default()
    }

    fn entry(
        &self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> Option<Entry<'_>> {
        let get = |key: Key| {
            self.services
                .get(&key)
                .map(Entry::Ready)
                .or_else(|| self.loading.get(&key).map(Entry::Loading))
        };

        scope
            .and_then(|scope| get((Some(scope), service_info)))
            .or_else(|| get((None, service_info)))
    }
}

impl ServiceLookup for Services {
    fn try_get(
        &self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> Option<DynSvc> {
        match self.entry(service_info, scope)? {
            Entry::Ready(service) => Some(service.clone()),
            Entry::Loading(loading) => loading.peek().cloned(),
        }
    }

    fn exists(
        &self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> bool {
        self.entry(service_info, scope).is_some()
    }

    fn is_excluded(&self, service_info: ServiceInfo) -> bool {
        self.excluded.contains(&service_info)
    }

    fn is_async(
        &self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> bool {
        matches!(self.entry(service_info, scope), Some(Entry::Loading(_)))
    }

    fn try_get_async<'a>(
        &'a self,
        service_info: ServiceInfo,
        scope: Option<HostId>,
    ) -> BoxedFuture<'a, Option<DynSvc>> {
        match self.entry(service_info, scope) {
            Some(Entry::Loading(loading)) => boxed(loading.clone().map(Some)),
            Some(Entry::Ready(service)) => boxed(ready(Some(service.clone()))),
            None => boxed(ready(None)),
        }
    }
}

/// A builder for [`Services`].
#[derive(Default)]
pub struct ServicesBuilder {
    services: HashMap<Key, DynSvc>,
    loading: HashMap<Key, Loading>,
    excluded: HashSet<ServiceInfo>,
}

impl ServicesBuilder {
    /// Registers a service for every host. Registering another service of
    /// the same type replaces it.
    pub fn provide<T: Service + Clone>(&mut self, service: T) {
        self.insert(None, service);
    }

    /// Registers a service for a single host.
    pub fn provide_for<T: Service + Clone>(
        &mut self,
        host: HostId,
        service: T,
    ) {
        self.insert(Some(host), service);
    }

    /// Registers a service for every host that is loaded asynchronously.
    /// The service is loaded once, the first time it is requested, and
    /// shared by everything that requests it afterwards.
    ///
    /// ```
    /// use init_args::{ServiceInfo, ServiceLookup, Services};
    ///
    /// let mut builder = Services::builder();
    /// builder.provide_async(async { "theme".to_string() });
    /// let services = builder.build();
    /// let services: &dyn ServiceLookup = &services;
    ///
    /// let info = ServiceInfo::of::<String>();
    /// assert!(services.is_async(info, None));
    /// assert_eq!(None, services.lookup::<String>(None));
    ///
    /// let loaded = services.lookup_async::<String>(None);
    /// let loaded = futures::executor::block_on(loaded);
    /// assert_eq!(Some("theme".to_string()), loaded);
    /// assert_eq!(Some("theme".to_string()), services.lookup(None));
    /// ```
    pub fn provide_async<T, F>(&mut self, loader: F)
    where
        T: Service + Clone,
        F: Future<Output = T> + MaybeSend + 'static,
    {
        self.insert_loading(None, loader);
    }

    /// Registers a service for a single host that is loaded asynchronously.
    pub fn provide_async_for<T, F>(&mut self, host: HostId, loader: F)
    where
        T: Service + Clone,
        F: Future<Output = T> + MaybeSend + 'static,
    {
        self.insert_loading(Some(host), loader);
    }

    /// Prevents a type from being resolved as a service, even when a service
    /// of that type is registered.
    pub fn exclude<T: ?Sized + Service>(&mut self) {
        self.excluded.insert(ServiceInfo::of::<T>());
    }

    /// Builds the collection of services.
    #[must_use]
    pub fn build(self) -> Services {
        Services {
            services: Svc::new(self.services),
            loading: Svc::new(self.loading),
            excluded: Svc::new(self.excluded),
        }
    }

    fn insert<T: Service + Clone>(
        &mut self,
        scope: Option<HostId>,
        service: T,
    ) {
        let key = (scope, ServiceInfo::of::<T>());
        self.loading.remove(&key);
        self.services.insert(key, erase(Svc::new(service)));
    }

    fn insert_loading<T, F>(&mut self, scope: Option<HostId>, loader: F)
    where
        T: Service + Clone,
        F: Future<Output = T> + MaybeSend + 'static,
    {
        let key = (scope, ServiceInfo::of::<T>());
        let loading = boxed(async move { erase(Svc::new(loader.await)) });
        self.services.remove(&key);
        self.loading.insert(key, loading.shared());
    }
}
