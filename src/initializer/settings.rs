use crate::{Arguments, NullArgumentGuard};

/// Configures how an initializer treats its arguments and itself.
///
/// ```
/// use init_args::{Arguments, InitializerSettings, NullArgumentGuard};
///
/// let settings = InitializerSettings {
///     null_argument_guard: NullArgumentGuard::NONE,
///     ..InitializerSettings::default()
/// };
/// assert!(settings.remove_after_init);
/// assert_eq!(Arguments::empty(), settings.release_on_teardown);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InitializerSettings {
    /// When missing arguments are tolerated, warned about, or fatal.
    pub null_argument_guard: NullArgumentGuard,
    /// Whether the initializer removes itself from its host once its client
    /// is initialized. Initializers with arguments to release on teardown
    /// are kept until their host removes them.
    pub remove_after_init: bool,
    /// The arguments released when the initializer is torn down.
    pub release_on_teardown: Arguments,
}

impl InitializerSettings {
    /// Whether a deferred self-removal is scheduled after a successful
    /// initialization.
    #[must_use]
    pub fn removes_itself(&self) -> bool {
        self.remove_after_init && self.release_on_teardown.is_empty()
    }
}

impl Default for InitializerSettings {
    fn default() -> Self {
        InitializerSettings {
            null_argument_guard: NullArgumentGuard::default(),
            remove_after_init: true,
            release_on_teardown: Arguments::empty(),
        }
    }
}
