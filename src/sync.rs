/// Access to a value shared behind an initializer's `&self`. Closures passed
/// to these functions must never call back into the owner of the lock.
pub(crate) trait LockEx<T> {
    fn with_inner<R, F: FnOnce(&T) -> R>(&self, f: F) -> R;
    fn with_inner_mut<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R;
}

#[cfg(feature = "rc")]
mod types {
    use super::LockEx;
    use std::cell::RefCell;

    pub type Lock<T> = RefCell<T>;

    impl<T> LockEx<T> for Lock<T> {
        fn with_inner<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
            f(&*self.borrow())
        }

        fn with_inner_mut<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
            f(&mut *self.borrow_mut())
        }
    }
}

#[cfg(feature = "arc")]
mod types {
    use super::LockEx;
    use parking_lot::Mutex;

    pub type Lock<T> = Mutex<T>;

    impl<T> LockEx<T> for Lock<T> {
        fn with_inner<R, F: FnOnce(&T) -> R>(&self, f: F) -> R {
            f(&*self.lock())
        }

        fn with_inner_mut<R, F: FnOnce(&mut T) -> R>(&self, f: F) -> R {
            f(&mut *self.lock())
        }
    }
}

#[allow(clippy::wildcard_imports)]
pub(crate) use types::*;
