use crate::Host;
use bitflags::bitflags;
use derive_more::Display;

bitflags! {
    /// Controls when an argument that resolves to nothing is tolerated,
    /// warned about, or fatal.
    ///
    /// The default guard warns about missing arguments outside of live
    /// execution and fails initialization during live execution:
    ///
    /// ```
    /// use init_args::NullArgumentGuard;
    ///
    /// let guard = NullArgumentGuard::default();
    /// assert!(guard.contains(NullArgumentGuard::WARN_OUTSIDE_RUNTIME));
    /// assert!(guard.contains(NullArgumentGuard::FAIL_AT_RUNTIME));
    /// assert!(!guard.contains(NullArgumentGuard::APPLY_TO_TEMPLATES));
    /// ```
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[cfg_attr(feature = "serde", serde(transparent))]
    pub struct NullArgumentGuard: u8 {
        /// Report missing arguments as warnings when validated outside of
        /// live execution. Never blocks initialization.
        const WARN_OUTSIDE_RUNTIME = 1 << 0;
        /// Fail initialization with a missing argument error during live
        /// execution.
        const FAIL_AT_RUNTIME = 1 << 1;
        /// Include template hosts in design-time warnings.
        const APPLY_TO_TEMPLATES = 1 << 2;
    }
}

impl NullArgumentGuard {
    /// A guard that never reports or fails on missing arguments.
    pub const NONE: Self = Self::empty();

    /// Whether a missing argument fails initialization on the given host.
    /// Template hosts are inert and are never failed.
    #[must_use]
    pub fn fails_at_runtime(self, host: &dyn Host) -> bool {
        self.contains(Self::FAIL_AT_RUNTIME)
            && host.is_live()
            && !host.is_template()
    }

    /// Whether a missing argument is reported as a design-time warning on
    /// the given host.
    #[must_use]
    pub fn warns(self, host: &dyn Host) -> bool {
        self.contains(Self::WARN_OUTSIDE_RUNTIME)
            && !host.is_live()
            && (!host.is_template() || self.contains(Self::APPLY_TO_TEMPLATES))
    }
}

impl Default for NullArgumentGuard {
    fn default() -> Self {
        Self::WARN_OUTSIDE_RUNTIME | Self::FAIL_AT_RUNTIME
    }
}

/// The outcome of checking one or more arguments against the null guard.
///
/// Results are ordered by severity. Several results are combined with
/// [`NullGuardResult::join`], which keeps the most severe one:
///
/// ```
/// use init_args::NullGuardResult;
///
/// let result = NullGuardResult::Passed
///     .join(NullGuardResult::ProviderNotReady)
///     .join(NullGuardResult::ValueMissing);
/// assert_eq!(NullGuardResult::ValueMissing, result);
/// ```
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub enum NullGuardResult {
    /// The argument has a value.
    #[default]
    Passed,
    /// The argument is produced by a provider that has no value yet, but may
    /// produce one at runtime.
    ProviderNotReady,
    /// The argument references a provider that can't produce a value of the
    /// argument's type. Built-in slots never report this since their
    /// providers are typed; custom providers may.
    ProviderInvalid,
    /// The argument has no value and nothing can stand in for it.
    ValueMissing,
    /// The provider of the argument raised an error.
    ProviderException,
}

impl NullGuardResult {
    /// Combines two results, keeping the more severe one. This is
    /// associative and commutative, and [`NullGuardResult::Passed`] is its
    /// identity.
    #[inline]
    #[must_use]
    pub fn join(self, other: Self) -> Self {
        self.max(other)
    }

    /// Combines any number of results.
    #[must_use]
    pub fn join_all(results: impl IntoIterator<Item = Self>) -> Self {
        results.into_iter().fold(Self::Passed, Self::join)
    }

    /// Whether this result allows initialization to proceed.
    #[inline]
    #[must_use]
    pub fn is_passed(self) -> bool {
        self == Self::Passed
    }
}
