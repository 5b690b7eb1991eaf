use crate::{
    downcast, erase, same_service, Host, InitError, InitResult, Service,
    ServiceInfo, Svc, WeakSvc,
};

/// The client instance an initializer was asked to initialize. The
/// initializer never keeps its target alive.
pub enum Target<C: Service> {
    /// No target was requested. A new client is created.
    Absent,
    /// A target was requested.
    Requested(WeakSvc<C>),
}

impl<C: Service> Target<C> {
    /// Requests a target.
    #[must_use]
    pub fn new(target: &Svc<C>) -> Self {
        Target::Requested(Svc::downgrade(target))
    }

    /// Whether a target was requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        matches!(self, Target::Requested(_))
    }

    /// Whether the requested target no longer exists.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        match self {
            Target::Absent => false,
            Target::Requested(target) => target.strong_count() == 0,
        }
    }

    /// Decides how the client is obtained on the given host.
    pub fn resolve(&self, host: &dyn Host) -> InitResult<TargetResolution<C>> {
        let target = match self {
            Target::Absent => return Ok(TargetResolution::CreateNew),
            Target::Requested(target) => {
                target.upgrade().ok_or(InitError::InvalidTarget {
                    client: ServiceInfo::of::<C>(),
                    reason: "the requested target has been destroyed",
                })?
            }
        };

        if host.contains(&erase(target.clone())) {
            Ok(TargetResolution::Reuse(target))
        } else {
            Ok(TargetResolution::Clone(target))
        }
    }
}

impl<C: Service> Default for Target<C> {
    fn default() -> Self {
        Target::Absent
    }
}

impl<C: Service> Clone for Target<C> {
    fn clone(&self) -> Self {
        match self {
            Target::Absent => Target::Absent,
            Target::Requested(target) => Target::Requested(target.clone()),
        }
    }
}

/// How the client of an initializer is obtained.
pub enum TargetResolution<C: Service> {
    /// The requested target lives on the host and is initialized in place.
    Reuse(Svc<C>),
    /// The requested target lives elsewhere. It is a template, and a copy of
    /// it is initialized instead.
    Clone(Svc<C>),
    /// A new client is created and attached to the host.
    CreateNew,
}

impl<C: Service> TargetResolution<C> {
    /// A short name for this resolution, used in diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            TargetResolution::Reuse(_) => "reuse",
            TargetResolution::Clone(_) => "clone",
            TargetResolution::CreateNew => "create",
        }
    }

    /// Obtains the client and passes it to `inject`. Newly created clients
    /// are attached to the host only after they have been injected, and
    /// templates are never injected.
    pub fn apply<F>(self, host: &dyn Host, inject: F) -> InitResult<Svc<C>>
    where
        C: Default,
        F: FnOnce(&Svc<C>) -> InitResult<()>,
    {
        match self {
            TargetResolution::Reuse(target) => {
                inject(&target)?;
                Ok(target)
            }
            TargetResolution::Clone(template) => {
                let template = erase(template);
                let copy = host.instantiate(&template)?;
                if same_service(&template, &copy) {
                    return Err(InitError::InvalidTarget {
                        client: ServiceInfo::of::<C>(),
                        reason:
                            "the host returned the template instead of a copy",
                    });
                }

                let copy = downcast::<C>(copy).map_err(|_| {
                    InitError::InvalidTarget {
                        client: ServiceInfo::of::<C>(),
                        reason:
                            "the host copied the template into another type",
                    }
                })?;
                inject(&copy)?;
                Ok(copy)
            }
            TargetResolution::CreateNew => {
                let client = Svc::new(C::default());
                inject(&client)?;
                host.attach(erase(client.clone()))?;
                Ok(client)
            }
        }
    }
}
