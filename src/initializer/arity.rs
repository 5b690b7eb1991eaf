use crate::{
    boxed, erase,
    sync::{Lock, LockEx},
    Activation, Argument, ArgumentSlot, Arguments, BoxedFuture, DynSvc, Host,
    InitError, InitResult, InitState, Initializable, Initializer,
    InitializerSettings, NullArgumentGuard, NullGuardResult, ProvideRequest,
    ServiceInfo, ServiceLookup, Svc, Target, TypedInitializer, WeakSvc,
};
use crate::initializer::state::{AsyncEntry, StateCell, SyncEntry};
use futures::future::poll_fn;
use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::{debug, error, warn};

/// Configuration shared by every arity.
struct Setup<C: crate::Service, S> {
    target: Target<C>,
    slots: S,
    settings: InitializerSettings,
}

/// Unwraps a resolved argument, applying the null guard when it is missing.
fn require<A: Argument>(
    client: ServiceInfo,
    value: Option<A>,
    position: usize,
    guard: NullArgumentGuard,
    host: &dyn Host,
) -> InitResult<A> {
    if let Some(value) = value {
        return Ok(value);
    }

    let argument = ServiceInfo::of::<A>();
    let missing = || InitError::MissingArgument {
        client,
        argument,
        position,
    };
    if guard.fails_at_runtime(host) {
        return Err(missing());
    }

    if guard.warns(host) {
        warn!(%client, %argument, index = position, "argument is missing");
    }

    A::absent().ok_or_else(missing)
}

/// Hides the null guard's verdict on missing values from guards that never
/// report them.
fn filter_guard_result(
    guard: NullArgumentGuard,
    result: NullGuardResult,
) -> NullGuardResult {
    let reports = NullArgumentGuard::WARN_OUTSIDE_RUNTIME
        | NullArgumentGuard::FAIL_AT_RUNTIME;
    if result == NullGuardResult::ValueMissing && !guard.intersects(reports) {
        NullGuardResult::Passed
    } else {
        result
    }
}

/// Polls a future with the resolving flag set, so calls back into the
/// initializer from a provider are recognized as reentrant.
async fn while_resolving<R: Clone, F: Future>(
    state: &StateCell<R>,
    future: F,
) -> F::Output {
    futures::pin_mut!(future);
    poll_fn(|cx| {
        let _resolving = state.enter_resolution();
        future.as_mut().poll(cx)
    })
    .await
}

macro_rules! impl_initializer {
    (
        $(#[$attr:meta])*
        $name:ident;
        $($idx:tt => $arg:ident, $getter:ident, $setter:ident, $flag:ident;)+
    ) => {
        $(#[$attr])*
        pub struct $name<C, $($arg),+>
        where
            C: $crate::Service,
            $($arg: Argument,)+
        {
            host: WeakSvc<dyn Host>,
            services: Svc<dyn ServiceLookup>,
            this: WeakSvc<Self>,
            setup: Lock<Setup<C, ($(ArgumentSlot<$arg>,)+)>>,
            state: StateCell<Svc<C>>,
            resolved: Lock<Option<($(Option<$arg>,)+)>>,
            torn_down: AtomicBool,
        }

        impl<C, $($arg),+> $name<C, $($arg),+>
        where
            C: $crate::Service,
            $($arg: Argument,)+
        {
            /// Creates an initializer owned by `host` with default settings.
            /// Empty arguments fall back to `services`.
            #[must_use]
            pub fn new(
                host: Svc<dyn Host>,
                services: Svc<dyn ServiceLookup>,
            ) -> Svc<Self> {
                let settings = InitializerSettings::default();
                Self::with_settings(host, services, settings)
            }

            /// Creates an initializer owned by `host`.
            #[must_use]
            pub fn with_settings(
                host: Svc<dyn Host>,
                services: Svc<dyn ServiceLookup>,
                settings: InitializerSettings,
            ) -> Svc<Self> {
                Svc::new_cyclic(|this| $name {
                    host: Svc::downgrade(&host),
                    services,
                    this: this.clone(),
                    setup: Lock::new(Setup {
                        target: Target::Absent,
                        slots: Default::default(),
                        settings,
                    }),
                    state: StateCell::new(ServiceInfo::of::<C>()),
                    resolved: Lock::new(None),
                    torn_down: AtomicBool::new(false),
                })
            }

            /// Requests a target to initialize. Targets on the host are
            /// initialized in place, and targets elsewhere are cloned.
            pub fn set_target(&self, target: &Svc<C>) -> InitResult<()> {
                self.state.ensure_uninitialized()?;
                let target = Target::new(target);
                self.setup.with_inner_mut(|setup| setup.target = target);
                Ok(())
            }

            /// Clears the requested target so that a new client is created.
            pub fn clear_target(&self) -> InitResult<()> {
                self.state.ensure_uninitialized()?;
                self.setup
                    .with_inner_mut(|setup| setup.target = Target::Absent);
                Ok(())
            }

            /// Gets the settings of this initializer.
            #[must_use]
            pub fn settings(&self) -> InitializerSettings {
                self.setup.with_inner(|setup| setup.settings)
            }

            /// Replaces the settings of this initializer.
            pub fn set_settings(
                &self,
                settings: InitializerSettings,
            ) -> InitResult<()> {
                self.state.ensure_uninitialized()?;
                self.setup.with_inner_mut(|setup| setup.settings = settings);
                Ok(())
            }

            /// Sets when missing arguments are tolerated, warned about, or
            /// fatal.
            pub fn set_null_argument_guard(
                &self,
                guard: NullArgumentGuard,
            ) -> InitResult<()> {
                self.state.ensure_uninitialized()?;
                self.setup.with_inner_mut(|setup| {
                    setup.settings.null_argument_guard = guard;
                });
                Ok(())
            }

            /// Sets the arguments released when this initializer is torn
            /// down.
            pub fn set_release_on_teardown(
                &self,
                arguments: Arguments,
            ) -> InitResult<()> {
                self.state.ensure_uninitialized()?;
                self.setup.with_inner_mut(|setup| {
                    setup.settings.release_on_teardown = arguments;
                });
                Ok(())
            }

            $(
                /// Gets a copy of an argument's slot.
                #[must_use]
                pub fn $getter(&self) -> ArgumentSlot<$arg> {
                    self.setup.with_inner(|setup| setup.slots.$idx.clone())
                }

                /// Assigns an argument. Accepts a value or a slot.
                pub fn $setter(
                    &self,
                    slot: impl Into<ArgumentSlot<$arg>>,
                ) -> InitResult<()> {
                    self.state.ensure_uninitialized()?;
                    let slot = slot.into();
                    self.setup
                        .with_inner_mut(|setup| setup.slots.$idx = slot);
                    Ok(())
                }
            )+

            /// Finds the first argument that can only be resolved
            /// asynchronously, either through its provider or through a
            /// service that is loaded asynchronously.
            fn first_async(&self) -> Option<(usize, ServiceInfo)> {
                let scope = self.host.upgrade().map(|host| host.id());
                let services = &*self.services;
                self.setup.with_inner(|setup| {
                    $(
                        if setup.slots.$idx.resolves_async(services, scope) {
                            let argument = ServiceInfo::of::<$arg>();
                            return Some(($idx + 1, argument));
                        }
                    )+
                    None
                })
            }

            /// Gets the host, unless it or this initializer is gone.
            fn live_host(&self) -> InitResult<Svc<dyn Host>> {
                let client = ServiceInfo::of::<C>();
                if self.torn_down.load(Ordering::Acquire) {
                    return Err(InitError::Destroyed { client });
                }

                self.host
                    .upgrade()
                    .filter(|host| host.is_alive())
                    .ok_or(InitError::Destroyed { client })
            }

            fn teardown(&self) {
                if self.torn_down.swap(true, Ordering::AcqRel) {
                    return;
                }

                let client = ServiceInfo::of::<C>();
                let flags = self
                    .setup
                    .with_inner(|setup| setup.settings.release_on_teardown);
                let values = self
                    .resolved
                    .with_inner_mut(Option::take)
                    .unwrap_or_default();
                let host = self.host.upgrade();
                $(
                    if flags.contains(Arguments::$flag) {
                        let mut slot = self.setup.with_inner_mut(|setup| {
                            std::mem::take(&mut setup.slots.$idx)
                        });
                        let released =
                            slot.release(host.as_deref(), values.$idx);
                        debug!(
                            %client,
                            argument = %ServiceInfo::of::<$arg>(),
                            index = $idx + 1,
                            released,
                            "disposed argument"
                        );
                    }
                )+
                debug!(%client, "initializer torn down");
            }
        }

        impl<C, $($arg),+> $name<C, $($arg),+>
        where
            C: Initializable<($($arg,)+)> + Default,
            $($arg: Argument,)+
        {
            /// Injects resolved arguments into the target.
            fn finish(
                &self,
                host: &dyn Host,
                target: &Target<C>,
                settings: InitializerSettings,
                values: ($(Option<$arg>,)+),
            ) -> InitResult<Svc<C>> {
                let client = ServiceInfo::of::<C>();
                let guard = settings.null_argument_guard;
                let arguments = ($(
                    require::<$arg>(
                        client,
                        values.$idx,
                        $idx + 1,
                        guard,
                        host,
                    )?,
                )+);

                let resolution = target.resolve(host)?;
                debug!(
                    %client,
                    resolution = resolution.kind(),
                    "resolved target"
                );

                let flags = settings.release_on_teardown;
                let kept = ($(
                    if flags.contains(Arguments::$flag) {
                        Some(arguments.$idx.clone())
                    } else {
                        None
                    },
                )+);
                self.resolved
                    .with_inner_mut(|resolved| *resolved = Some(kept));

                resolution.apply(host, |instance| {
                    instance.init(arguments).map_err(|inner| {
                        InitError::ActivationFailed { client, inner }
                    })
                })
            }

            fn guard_results(
                &self,
            ) -> Vec<(usize, ServiceInfo, NullGuardResult)> {
                let (slots, guard) = self.setup.with_inner(|setup| {
                    (setup.slots.clone(), setup.settings.null_argument_guard)
                });
                let host = self.host.upgrade();
                let request =
                    ProvideRequest::new(self, host.as_deref(), &*self.services);
                vec![$(
                    (
                        $idx + 1,
                        ServiceInfo::of::<$arg>(),
                        filter_guard_result(
                            guard,
                            slots.$idx.evaluate_null_guard(
                                &request.with_position($idx + 1),
                            ),
                        ),
                    ),
                )+]
            }

            fn run_sync(&self) -> InitResult<Svc<C>> {
                let host = self.live_host()?;
                let (target, slots, settings) = self.setup.with_inner(|setup| {
                    (setup.target.clone(), setup.slots.clone(), setup.settings)
                });

                let request =
                    ProvideRequest::new(self, Some(&*host), &*self.services);
                let values = {
                    let _resolving = self.state.enter_resolution();
                    ($(
                        slots.$idx.resolve_sync(
                            &request.with_position($idx + 1),
                        )?,
                    )+)
                };

                // Providers may tear down the initializer or its host
                self.ensure_not_abandoned(&*host, false)?;
                self.finish(&*host, &target, settings, values)
            }

            async fn run_async(&self) -> InitResult<Svc<C>> {
                let host = self.live_host()?;
                let (target, slots, settings) = self.setup.with_inner(|setup| {
                    (setup.target.clone(), setup.slots.clone(), setup.settings)
                });

                let values = {
                    let services = &*self.services;
                    let request =
                        ProvideRequest::new(self, Some(&*host), services);
                    let resolution = async {
                        Ok::<_, InitError>(($(
                            slots
                                .$idx
                                .resolve_async(request.with_position($idx + 1))
                                .await?,
                        )+))
                    };
                    while_resolving(&self.state, resolution).await?
                };

                self.ensure_not_abandoned(&*host, target.is_destroyed())?;
                self.finish(&*host, &target, settings, values)
            }

            /// Fails with [`InitError::Abandoned`] if the initializer or its
            /// host went away while the arguments were being resolved.
            fn ensure_not_abandoned(
                &self,
                host: &dyn Host,
                target_destroyed: bool,
            ) -> InitResult<()> {
                if self.torn_down.load(Ordering::Acquire)
                    || !host.is_alive()
                    || target_destroyed
                {
                    let client = ServiceInfo::of::<C>();
                    debug!(%client, "abandoning initialization");
                    return Err(InitError::Abandoned { client });
                }

                Ok(())
            }

            /// Logs a failed attempt, or schedules the removal of this
            /// initializer after a successful one.
            fn conclude(
                &self,
                outcome: InitResult<Svc<C>>,
            ) -> InitResult<Svc<C>> {
                let client = ServiceInfo::of::<C>();
                match &outcome {
                    Ok(_) => {
                        debug!(%client, "client initialized");
                        if self.settings().removes_itself() {
                            self.schedule_removal();
                        }
                    }
                    Err(InitError::Abandoned { .. }) => {}
                    Err(error) => {
                        error!(%client, %error, "initialization failed");
                    }
                }

                outcome
            }

            fn schedule_removal(&self) {
                let Some(host) = self.host.upgrade() else {
                    return;
                };

                let this = self.this.clone();
                host.defer(Box::new(move || {
                    let Some(this) = this.upgrade() else {
                        return;
                    };

                    if let Some(host) = this.host.upgrade() {
                        host.remove(&erase(this.clone()));
                    }
                    this.destroy();
                }));
            }
        }

        impl<C, $($arg),+> Initializer for $name<C, $($arg),+>
        where
            C: Initializable<($($arg,)+)> + Default,
            $($arg: Argument,)+
        {
            fn client_info(&self) -> ServiceInfo {
                ServiceInfo::of::<C>()
            }

            fn argument_infos(&self) -> Vec<ServiceInfo> {
                vec![$(ServiceInfo::of::<$arg>()),+]
            }

            fn state(&self) -> InitState {
                self.state.state()
            }

            fn is_async(&self) -> bool {
                self.first_async().is_some()
            }

            fn init_target(&self) -> InitResult<DynSvc> {
                self.initialize().map(erase)
            }

            fn init_target_async(
                &self,
            ) -> BoxedFuture<'_, InitResult<DynSvc>> {
                boxed(async move {
                    self.initialize_async().await.map(erase)
                })
            }

            fn evaluate_null_guard(&self) -> NullGuardResult {
                if self.state.state() == InitState::Failed {
                    return NullGuardResult::ProviderException;
                }

                NullGuardResult::join_all(
                    self.guard_results()
                        .into_iter()
                        .map(|(_, _, result)| result),
                )
            }

            fn validate(&self) -> NullGuardResult {
                let client = ServiceInfo::of::<C>();
                if self.state.state() == InitState::Failed {
                    return NullGuardResult::ProviderException;
                }

                let guard = self.settings().null_argument_guard;
                let warns = self
                    .host
                    .upgrade()
                    .map_or(false, |host| guard.warns(&*host));
                let mut joined = NullGuardResult::Passed;
                for (position, argument, result) in self.guard_results() {
                    if warns && !result.is_passed() {
                        warn!(
                            %client,
                            %argument,
                            index = position,
                            %result,
                            "argument failed the null guard"
                        );
                    }
                    joined = joined.join(result);
                }

                joined
            }

            fn destroy(&self) {
                self.teardown();
            }

            fn activate(self: Svc<Self>) -> Activation {
                if Initializer::is_async(&*self) {
                    Activation::Pending(boxed(async move {
                        self.initialize_async().await.map(erase)
                    }))
                } else {
                    Activation::Completed(self.initialize().map(erase))
                }
            }
        }

        impl<C, $($arg),+> TypedInitializer for $name<C, $($arg),+>
        where
            C: Initializable<($($arg,)+)> + Default,
            $($arg: Argument,)+
        {
            type Client = C;
            type Arguments = ($($arg,)+);

            fn initialize(&self) -> InitResult<Svc<C>> {
                if let Some((position, argument)) = self.first_async() {
                    if self.state.state() == InitState::Uninitialized {
                        return Err(InitError::AsyncOnly {
                            client: ServiceInfo::of::<C>(),
                            argument,
                            position,
                        });
                    }
                }

                match self.state.begin_sync()? {
                    SyncEntry::Done(client) => return Ok(client),
                    SyncEntry::Started => {}
                }

                debug!(
                    client = %ServiceInfo::of::<C>(),
                    state = %InitState::Initializing,
                    "initializer state changed"
                );
                let attempt = self.state.attempt();
                let outcome = attempt.finish(self.run_sync());
                self.conclude(outcome)
            }

            fn initialize_async(
                &self,
            ) -> BoxedFuture<'_, InitResult<Svc<C>>> {
                boxed(async move {
                    match self.state.begin_async()? {
                        AsyncEntry::Done(client) => return Ok(client),
                        AsyncEntry::Wait(finished) => {
                            // A dropped sender means the attempt ended anyway.
                            let _ = finished.await;
                            return self.state.outcome();
                        }
                        AsyncEntry::Started => {}
                    }

                    debug!(
                        client = %ServiceInfo::of::<C>(),
                        state = %InitState::Initializing,
                        "initializer state changed"
                    );
                    let attempt = self.state.attempt();
                    let outcome = attempt.finish(self.run_async().await);
                    self.conclude(outcome)
                })
            }
        }

        impl<C, $($arg),+> Drop for $name<C, $($arg),+>
        where
            C: $crate::Service,
            $($arg: Argument,)+
        {
            fn drop(&mut self) {
                self.teardown();
            }
        }
    };
}

impl_initializer! {
    /// Initializes a client that accepts one argument.
    ///
    /// ```
    /// use init_args::{
    ///     BoxError, Host, Initializable, Initializer1, Services, Svc,
    ///     TypedInitializer,
    /// };
    /// use std::sync::OnceLock;
    ///
    /// #[derive(Default)]
    /// struct Player {
    ///     speed: OnceLock<f32>,
    /// }
    ///
    /// impl Initializable<(f32,)> for Player {
    ///     fn init(&self, (speed,): (f32,)) -> Result<(), BoxError> {
    ///         self.speed.set(speed).map_err(|_| "initialized twice".into())
    ///     }
    /// }
    ///
    /// # type Error = Box<dyn std::error::Error>;
    /// # fn run(host: Svc<dyn Host>) -> Result<(), Error> {
    /// let services = Svc::new(Services::default());
    /// let initializer = Initializer1::<Player, f32>::new(host, services);
    /// initializer.set_first_argument(4.5)?;
    ///
    /// let player = initializer.initialize()?;
    /// assert_eq!(Some(&4.5), player.speed.get());
    /// # Ok(())
    /// # }
    /// ```
    Initializer1;
    0 => A1, first_argument, set_first_argument, FIRST;
}

impl_initializer! {
    /// Initializes a client that accepts two arguments.
    Initializer2;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
}

impl_initializer! {
    /// Initializes a client that accepts three arguments.
    Initializer3;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
}

impl_initializer! {
    /// Initializes a client that accepts four arguments.
    Initializer4;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
}

impl_initializer! {
    /// Initializes a client that accepts five arguments.
    Initializer5;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
}

impl_initializer! {
    /// Initializes a client that accepts six arguments.
    Initializer6;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
    5 => A6, sixth_argument, set_sixth_argument, SIXTH;
}

impl_initializer! {
    /// Initializes a client that accepts seven arguments.
    Initializer7;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
    5 => A6, sixth_argument, set_sixth_argument, SIXTH;
    6 => A7, seventh_argument, set_seventh_argument, SEVENTH;
}

impl_initializer! {
    /// Initializes a client that accepts eight arguments.
    Initializer8;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
    5 => A6, sixth_argument, set_sixth_argument, SIXTH;
    6 => A7, seventh_argument, set_seventh_argument, SEVENTH;
    7 => A8, eighth_argument, set_eighth_argument, EIGHTH;
}

impl_initializer! {
    /// Initializes a client that accepts nine arguments.
    Initializer9;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
    5 => A6, sixth_argument, set_sixth_argument, SIXTH;
    6 => A7, seventh_argument, set_seventh_argument, SEVENTH;
    7 => A8, eighth_argument, set_eighth_argument, EIGHTH;
    8 => A9, ninth_argument, set_ninth_argument, NINTH;
}

impl_initializer! {
    /// Initializes a client that accepts ten arguments.
    Initializer10;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
    5 => A6, sixth_argument, set_sixth_argument, SIXTH;
    6 => A7, seventh_argument, set_seventh_argument, SEVENTH;
    7 => A8, eighth_argument, set_eighth_argument, EIGHTH;
    8 => A9, ninth_argument, set_ninth_argument, NINTH;
    9 => A10, tenth_argument, set_tenth_argument, TENTH;
}

impl_initializer! {
    /// Initializes a client that accepts eleven arguments.
    Initializer11;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
    5 => A6, sixth_argument, set_sixth_argument, SIXTH;
    6 => A7, seventh_argument, set_seventh_argument, SEVENTH;
    7 => A8, eighth_argument, set_eighth_argument, EIGHTH;
    8 => A9, ninth_argument, set_ninth_argument, NINTH;
    9 => A10, tenth_argument, set_tenth_argument, TENTH;
    10 => A11, eleventh_argument, set_eleventh_argument, ELEVENTH;
}

impl_initializer! {
    /// Initializes a client that accepts twelve arguments.
    Initializer12;
    0 => A1, first_argument, set_first_argument, FIRST;
    1 => A2, second_argument, set_second_argument, SECOND;
    2 => A3, third_argument, set_third_argument, THIRD;
    3 => A4, fourth_argument, set_fourth_argument, FOURTH;
    4 => A5, fifth_argument, set_fifth_argument, FIFTH;
    5 => A6, sixth_argument, set_sixth_argument, SIXTH;
    6 => A7, seventh_argument, set_seventh_argument, SEVENTH;
    7 => A8, eighth_argument, set_eighth_argument, EIGHTH;
    8 => A9, ninth_argument, set_ninth_argument, NINTH;
    9 => A10, tenth_argument, set_tenth_argument, TENTH;
    10 => A11, eleventh_argument, set_eleventh_argument, ELEVENTH;
    11 => A12, twelfth_argument, set_twelfth_argument, TWELFTH;
}
