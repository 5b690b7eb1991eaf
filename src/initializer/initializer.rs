use crate::{
    BoxedFuture, DynSvc, InitResult, InitState, NullGuardResult, Service,
    ServiceInfo, Svc,
};

/// Initializes a client with its arguments. This trait is object-safe so
/// hosts can hold initializers of any client and arity.
///
/// Implementations are generated for clients accepting one to twelve
/// arguments (see [`Initializer1`](crate::Initializer1) through
/// [`Initializer12`](crate::Initializer12)).
pub trait Initializer: Service {
    /// The type of client this initializer initializes.
    fn client_info(&self) -> ServiceInfo;

    /// The types of the client's arguments, in order.
    fn argument_infos(&self) -> Vec<ServiceInfo>;

    /// The current state of this initializer.
    fn state(&self) -> InitState;

    /// Whether any argument can only be resolved asynchronously, in which
    /// case the client can only be initialized asynchronously.
    fn is_async(&self) -> bool;

    /// Initializes the client without waiting. Calling this after the client
    /// is initialized returns the same client again.
    fn init_target(&self) -> InitResult<DynSvc>;

    /// Initializes the client, waiting for asynchronous arguments. If
    /// another initialization is in flight, its outcome is returned.
    fn init_target_async(&self) -> BoxedFuture<'_, InitResult<DynSvc>>;

    /// Checks the arguments against the null guard without producing them
    /// where avoidable.
    fn evaluate_null_guard(&self) -> NullGuardResult;

    /// Checks the arguments against the null guard and reports missing
    /// arguments as warnings when the guard asks for it.
    fn validate(&self) -> NullGuardResult;

    /// Tears this initializer down and releases the arguments flagged for
    /// release. Only the first call has an effect, and dropping the
    /// initializer does the same.
    fn destroy(&self);

    /// Handles the host's creation event for this initializer.
    fn activate(self: Svc<Self>) -> Activation;
}

/// The typed counterpart of [`Initializer`].
pub trait TypedInitializer: Initializer {
    /// The client being initialized.
    type Client: Service;

    /// The arguments the client accepts, as a tuple.
    type Arguments;

    /// Initializes the client without waiting.
    fn initialize(&self) -> InitResult<Svc<Self::Client>>;

    /// Initializes the client, waiting for asynchronous arguments.
    fn initialize_async(
        &self,
    ) -> BoxedFuture<'_, InitResult<Svc<Self::Client>>>;
}

/// The result of handling a host's creation event.
pub enum Activation {
    /// Every argument was available, so the client was initialized right
    /// away.
    Completed(InitResult<DynSvc>),
    /// Some arguments are produced asynchronously. The host drives the
    /// future on its scheduler to finish initializing the client.
    Pending(BoxedFuture<'static, InitResult<DynSvc>>),
}

impl Activation {
    /// Waits for the initialization to finish.
    pub async fn finish(self) -> InitResult<DynSvc> {
        match self {
            Activation::Completed(result) => result,
            Activation::Pending(future) => future.await,
        }
    }

    /// Whether the client was initialized right away.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Activation::Completed(_))
    }
}
