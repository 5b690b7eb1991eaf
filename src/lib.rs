//! Argument injection for clients whose construction is controlled by a
//! host.
//!
//! Some objects can't be created through ordinary constructors because a
//! host (a scene graph, a component system, an editor) decides when they are
//! created and activated. This crate lets such clients declare the arguments
//! they need through [`Initializable`], and supplies those arguments exactly
//! once through an initializer ([`Initializer1`] through [`Initializer12`]).
//!
//! By default, services and initializers are held in thread-safe
//! [`Arc<T>`](std::sync::Arc) pointers. This can be changed to
//! [`Rc<T>`](std::rc::Rc) by disabling default features and enabling the "rc"
//! feature:
//!
//! ```text
//! init_args = {
//!     version = "*",
//!     default_features = false,
//!     features = ["rc"]
//! }
//! ```
//!
//! # Arguments
//!
//! Each argument of an initializer is held in an [`ArgumentSlot`]. A slot can
//! hold a value, a [`ValueProvider`] that is asked for the value when the
//! client is initialized, or an [`AsyncValueProvider`] whose value is awaited.
//! Slots that are left empty are looked up in a [`ServiceLookup`] instead.
//! If any argument is asynchronous, the client can only be initialized
//! asynchronously.
//!
//! # Targets
//!
//! An initializer either creates a new client and attaches it to its host,
//! initializes a requested client that already lives on the host, or clones a
//! requested client that lives elsewhere and initializes the clone. Templates
//! are never modified.
//!
//! # Missing arguments
//!
//! The [`NullArgumentGuard`] of an initializer decides whether arguments that
//! resolve to nothing are warned about outside of live execution, and whether
//! they fail initialization during live execution.
//!
//! # Example
//!
//! ```
//! use init_args::{
//!     async_provider_fn, erase, same_service, ArgumentSlot, BoxError,
//!     DeferredTask, DynSvc, Host, HostId, InitError, InitResult,
//!     Initializable, Initializer, Initializer2, ServiceInfo, Services, Svc,
//!     TypedInitializer,
//! };
//! use futures::executor::block_on;
//! use std::sync::{Mutex, OnceLock};
//!
//! // The host owns the initializer and the client it creates.
//! #[derive(Default)]
//! struct Scene {
//!     components: Mutex<Vec<DynSvc>>,
//!     deferred: Mutex<Vec<DeferredTask>>,
//! }
//!
//! impl Host for Scene {
//!     fn id(&self) -> HostId { HostId(1) }
//!     fn is_alive(&self) -> bool { true }
//!     fn is_live(&self) -> bool { true }
//!     fn is_template(&self) -> bool { false }
//!
//!     fn contains(&self, component: &DynSvc) -> bool {
//!         let components = self.components.lock().unwrap();
//!         components.iter().any(|c| same_service(c, component))
//!     }
//!
//!     fn attach(&self, component: DynSvc) -> InitResult<()> {
//!         self.components.lock().unwrap().push(component);
//!         Ok(())
//!     }
//!
//!     fn instantiate(&self, _template: &DynSvc) -> InitResult<DynSvc> {
//!         Err(InitError::InvalidTarget {
//!             client: ServiceInfo::of::<Music>(),
//!             reason: "this scene has no templates",
//!         })
//!     }
//!
//!     fn remove(&self, component: &DynSvc) {
//!         let mut components = self.components.lock().unwrap();
//!         components.retain(|c| !same_service(c, component));
//!     }
//!
//!     fn defer(&self, task: DeferredTask) {
//!         self.deferred.lock().unwrap().push(task);
//!     }
//! }
//!
//! // The client can't be constructed with its arguments, so it accepts them
//! // once it exists.
//! #[derive(Default)]
//! struct Music {
//!     settings: OnceLock<(u32, String)>,
//! }
//!
//! impl Initializable<(u32, String)> for Music {
//!     fn init(&self, args: (u32, String)) -> Result<(), BoxError> {
//!         self.settings
//!             .set(args)
//!             .map_err(|_| "music was initialized twice".into())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scene = Svc::new(Scene::default());
//!     let services = Svc::new(Services::default());
//!     let initializer =
//!         Initializer2::<Music, u32, String>::new(scene.clone(), services);
//!     scene.attach(erase(initializer.clone()))?;
//!
//!     // The second argument is streamed in asynchronously
//!     initializer.set_first_argument(42)?;
//!     initializer.set_second_argument(ArgumentSlot::<String>::async_provider(
//!         async_provider_fn(|| async {
//!             Ok::<_, BoxError>(Some("ready".to_string()))
//!         }),
//!     ))?;
//!     assert!(initializer.is_async());
//!
//!     let music = block_on(initializer.initialize_async())?;
//!     assert_eq!(Some(&(42, "ready".to_string())), music.settings.get());
//!
//!     // Initializing again returns the same client
//!     let again = block_on(initializer.initialize_async())?;
//!     assert!(Svc::ptr_eq(&music, &again));
//!
//!     // Once the scene's turn ends, the initializer removes itself
//!     let tasks = std::mem::take(&mut *scene.deferred.lock().unwrap());
//!     for task in tasks {
//!         task();
//!     }
//!     assert!(!scene.contains(&erase(initializer.clone())));
//!     assert!(scene.contains(&erase(music)));
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value,
    clippy::needless_doctest_main
)]

#[cfg(not(any(feature = "arc", feature = "rc")))]
compile_error!(
    "Either the 'arc' or 'rc' feature must be enabled (but not both)."
);

#[cfg(all(feature = "arc", feature = "rc"))]
compile_error!(
    "The 'arc' and 'rc' features are mutually exclusive and cannot be \
     enabled together."
);

mod arguments;
mod error;
mod guard;
mod host;
mod initializer;
mod services;
mod sync;
mod target;

pub use arguments::*;
pub use error::*;
pub use guard::*;
pub use host::*;
pub use initializer::*;
pub use services::*;
pub use target::*;
