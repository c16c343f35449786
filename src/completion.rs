//! How a finished procedure is reported to the terminal callback.
//!
//! A procedure finishes with a [`Completion`]. It is mapped onto exactly one
//! invocation of the terminal callback:
//! - `Error(e)` is delivered as `Err(e)`, with no values.
//! - `Values(vs)` is delivered as `Ok(vs)`, each element a separate value.
//! - `Value(v)` is delivered as `Ok(vec![v])`.
//!
//! Procedures may also finish with a plain `Result<T, E>` or an
//! [`ErrorResult`], both convert into a `Completion`.

/// The outcome of a procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Completion<T, E> {
    /// A single successful value.
    Value(T),

    /// Several successful values, delivered in order.
    Values(Vec<T>),

    /// The procedure failed with `E`.
    Error(E),
}

impl<T, E> Completion<T, E> {
    /// Returns `true` if the procedure failed.
    pub fn is_error(&self) -> bool {
        matches!(self, Completion::Error(_))
    }

    /// Maps the completion onto the shape the terminal callback receives.
    pub fn into_result(self) -> Result<Vec<T>, E> {
        match self {
            Completion::Error(err) => Err(err),
            Completion::Values(values) => Ok(values),
            Completion::Value(value) => Ok(vec![value]),
        }
    }
}

impl<T, E> From<Result<T, E>> for Completion<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Completion::Value(value),
            Err(err) => Completion::Error(err),
        }
    }
}

impl<T, E> From<ErrorResult<E>> for Completion<T, E> {
    fn from(result: ErrorResult<E>) -> Self {
        Completion::Error(result.0)
    }
}

/// Marks a value returned from a procedure as an error.
///
/// Useful when the error type is also a plausible success value, or when a
/// procedure returns errors it received from the sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorResult<E>(pub E);

impl<E> ErrorResult<E> {
    /// Wraps `err` as an explicit error result.
    pub fn new(err: E) -> Self {
        Self(err)
    }

    /// Returns the wrapped error.
    pub fn into_inner(self) -> E {
        self.0
    }
}

/// Holds a callback until it is fired, then never fires it again.
pub struct OnceCallback<C> {
    callback: Option<C>,
}

impl<C> OnceCallback<C> {
    /// Guards `callback` so it fires at most once.
    pub fn new(callback: C) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    /// Invokes the callback with `arg` if it has not been invoked yet.
    ///
    /// Returns `false` when the callback already fired.
    pub fn fire<A>(&mut self, arg: A) -> bool
    where
        C: FnOnce(A),
    {
        match self.callback.take() {
            Some(callback) => {
                callback(arg);
                true
            }
            None => false,
        }
    }

    /// Returns `true` once the callback has fired.
    pub fn is_spent(&self) -> bool {
        self.callback.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_maps_to_callback_shape() {
        assert_eq!(Completion::<u8, ()>::Value(3).into_result(), Ok(vec![3]));
        assert_eq!(
            Completion::<u8, ()>::Values(vec![1, 2]).into_result(),
            Ok(vec![1, 2])
        );
        assert_eq!(Completion::<u8, &str>::Error("e").into_result(), Err("e"));
        assert_eq!(
            Completion::<u8, &str>::from(ErrorResult("wrapped")).into_result(),
            Err("wrapped")
        );
    }

    #[test]
    fn only_errors_report_as_errors() {
        assert!(Completion::<u8, &str>::Error("e").is_error());
        assert!(Completion::<u8, &str>::from(ErrorResult::new("e")).is_error());
        assert!(!Completion::<u8, &str>::Value(1).is_error());
        assert!(!Completion::<u8, &str>::Values(Vec::new()).is_error());
        assert_eq!(ErrorResult::new("inner").into_inner(), "inner");
    }

    #[test]
    fn once_callback_fires_once() {
        let mut count = 0;
        let mut once = OnceCallback::new(|n: u32| count += n);
        assert!(once.fire(1));
        assert!(!once.fire(1));
        assert!(once.is_spent());
        drop(once);
        assert_eq!(count, 1);
    }
}
