use crate::{BoxError, DeferredTask, DynSvc, InitResult, Service};
use derive_more::Display;

/// Identifies a host. Services can be registered for a single host by its
/// ID.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "host#{}", _0)]
pub struct HostId(pub u64);

/// The composite object that owns initializers and the clients they
/// initialize. Hosts control when their components are created and
/// activated, which is why clients can't be handed their arguments through
/// ordinary constructors.
///
/// Hosts are expected to run every call into an initializer on a single
/// cooperative scheduling context.
pub trait Host: Service {
    /// Gets the ID of this host.
    fn id(&self) -> HostId;

    /// Whether this host has not been destroyed yet.
    fn is_alive(&self) -> bool;

    /// Whether this host is part of live execution, as opposed to being
    /// edited at design time.
    fn is_live(&self) -> bool;

    /// Whether this host is an inert prototype that other hosts are cloned
    /// from.
    fn is_template(&self) -> bool;

    /// Whether the given component is attached to this host.
    fn contains(&self, component: &DynSvc) -> bool;

    /// Attaches a newly created client to this host. Clients are only
    /// attached after they have accepted their arguments.
    fn attach(&self, component: DynSvc) -> InitResult<()>;

    /// Creates a copy of a template component that lives on this host. The
    /// template itself must not be modified.
    fn instantiate(&self, template: &DynSvc) -> InitResult<DynSvc>;

    /// Removes a component from this host.
    fn remove(&self, component: &DynSvc);

    /// Runs a task once the current turn of the host's scheduler has ended.
    fn defer(&self, task: DeferredTask);
}

/// A client that accepts its arguments through an initializer.
///
/// ```
/// use init_args::{BoxError, Initializable};
/// use std::sync::OnceLock;
///
/// #[derive(Default)]
/// struct Greeter {
///     greeting: OnceLock<(String, u32)>,
/// }
///
/// impl Initializable<(String, u32)> for Greeter {
///     fn init(&self, args: (String, u32)) -> Result<(), BoxError> {
///         self.greeting
///             .set(args)
///             .map_err(|_| "greeter was initialized twice".into())
///     }
/// }
/// ```
pub trait Initializable<Args>: Service {
    /// Accepts the client's arguments. Initializers call this at most once
    /// per client.
    fn init(&self, args: Args) -> Result<(), BoxError>;
}
