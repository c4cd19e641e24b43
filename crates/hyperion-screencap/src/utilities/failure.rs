use tracing::{debug, error};

pub fn log_and_panic<Err: core::fmt::Display>(error: Err, message: &str) -> ! {
    error!("{message}: {error}");

    panic!("{message}: {error}");
}

pub fn log<Err: core::fmt::Display>(error: Err, message: &str) {
    error!("{message}: {error}");
}

/// Handling for failures the application can't recover from, or can only log.
pub trait Failure<T> {
    fn log_and_panic(self, message: &str) -> T;
    fn log(self, message: &str) -> Option<T>;
}

pub trait Ignore {
    fn ignore(self);
}

impl<T, E: core::fmt::Display> Failure<T> for Result<T, E> {
    fn log_and_panic(self, message: &str) -> T {
        match self {
            Ok(value) => value,
            Err(error) => log_and_panic(error, message),
        }
    }

    fn log(self, message: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                log(error, message);
                None
            }
        }
    }
}

impl<T, E> Ignore for Result<T, E> {
    #[track_caller]
    fn ignore(self) {
        if self.is_err() {
            debug!("Ignoring error ({})", core::panic::Location::caller());
        }
    }
}

impl<T> Failure<T> for Option<T> {
    fn log_and_panic(self, message: &str) -> T {
        match self {
            Some(value) => value,
            None => log_and_panic("Was None", message),
        }
    }

    fn log(self, message: &str) -> Self {
        match self {
            Some(value) => Some(value),
            None => {
                log("Was None", message);
                None
            }
        }
    }
}

impl<T> Ignore for Option<T> {
    #[track_caller]
    fn ignore(self) {
        if self.is_none() {
            debug!("Ignoring None ({})", core::panic::Location::caller());
        }
    }
}
