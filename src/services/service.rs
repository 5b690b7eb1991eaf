use std::{
    any::{Any, TypeId},
    fmt::{Display, Formatter},
    future::Future,
};

#[cfg(feature = "arc")]
mod types {
    use std::{
        any::Any,
        sync::{Arc, Weak},
    };

    /// A reference-counted pointer holding a service. The pointer type is
    /// determined by the feature flags passed to this crate.
    pub type Svc<T> = Arc<T>;

    /// A non-owning counterpart to [`Svc<T>`].
    pub type WeakSvc<T> = Weak<T>;

    /// A reference-counted service pointer holding an instance of `dyn Any`.
    pub type DynSvc = Arc<dyn Any + Send + Sync>;

    /// A boxed future returned by providers and initializers.
    pub type BoxedFuture<'a, T> = futures::future::BoxFuture<'a, T>;

    /// A task handed to the host to be run once the current turn ends.
    pub type DeferredTask = Box<dyn FnOnce() + Send>;

    /// Implemented automatically on types that are capable of being a service.
    pub trait Service: Any + Send + Sync {}
    impl<T: ?Sized + Any + Send + Sync> Service for T {}

    /// Implemented automatically on types that can be held across an await
    /// point of a [`BoxedFuture`].
    pub trait MaybeSend: Send {}
    impl<T: ?Sized + Send> MaybeSend for T {}
}

#[cfg(feature = "rc")]
mod types {
    use std::{
        any::Any,
        rc::{Rc, Weak},
    };

    /// A reference-counted pointer holding a service. The pointer type is
    /// determined by the feature flags passed to this crate.
    pub type Svc<T> = Rc<T>;

    /// A non-owning counterpart to [`Svc<T>`].
    pub type WeakSvc<T> = Weak<T>;

    /// A reference-counted service pointer holding an instance of `dyn Any`.
    pub type DynSvc = Rc<dyn Any>;

    /// A boxed future returned by providers and initializers.
    pub type BoxedFuture<'a, T> = futures::future::LocalBoxFuture<'a, T>;

    /// A task handed to the host to be run once the current turn ends.
    pub type DeferredTask = Box<dyn FnOnce()>;

    /// Implemented automatically on types that are capable of being a service.
    pub trait Service: Any {}
    impl<T: ?Sized + Any> Service for T {}

    /// Implemented automatically on types that can be held across an await
    /// point of a [`BoxedFuture`].
    pub trait MaybeSend {}
    impl<T: ?Sized> MaybeSend for T {}
}

pub use types::*;

/// Boxes a future into a [`BoxedFuture`].
#[inline]
pub fn boxed<'a, F>(future: F) -> BoxedFuture<'a, F::Output>
where
    F: Future + MaybeSend + 'a,
{
    Box::pin(future)
}

/// Converts a service pointer into a type-erased [`DynSvc`].
#[inline]
#[must_use]
pub fn erase<T: Service>(service: Svc<T>) -> DynSvc {
    service
}

/// Attempts to recover a typed service pointer from a [`DynSvc`]. The
/// original pointer is returned if the service is not a `T`.
#[inline]
pub fn downcast<T: Service>(service: DynSvc) -> Result<Svc<T>, DynSvc> {
    service.downcast()
}

/// Checks whether two type-erased service pointers point to the same
/// allocation. Only the data pointers are compared.
#[inline]
#[must_use]
pub fn same_service(a: &DynSvc, b: &DynSvc) -> bool {
    std::ptr::eq(
        Svc::as_ptr(a).cast::<()>(),
        Svc::as_ptr(b).cast::<()>(),
    )
}

/// Type information about a service or argument.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct ServiceInfo {
    id: TypeId,
    name: &'static str,
}

impl ServiceInfo {
    /// Creates a [`ServiceInfo`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        ServiceInfo {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this service.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name of this service.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Display for ServiceInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
