//! The result sink and wait handle handed to every procedure.
//!
//! A procedure receives a [`Sink`] and a [`Wait`] as its trailing arguments.
//! The sink is passed on to callback-based operations, which invoke it with the
//! conventional `(error, values...)` shape. The wait handle gives the procedure
//! a future that resolves the next time the sink fires. Each firing resolves the
//! current future and installs a fresh pending one, so a procedure can suspend
//! and resume any number of times in sequence.
//!
//! The error of the latest firing is kept on the sink and can be inspected
//! right after resuming.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    ErrorResult,
    resolvable::{Resolvable, Resolver, resolvable},
};

/// Values delivered by one firing of the [`Sink`].
///
/// No values normalize to `Empty`, one value to `Single` and two or more to
/// `Multiple`, preserving their order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resumption<T> {
    /// The sink fired with an error argument only.
    Empty,

    /// The sink fired with exactly one value.
    Single(T),

    /// The sink fired with several values.
    Multiple(Vec<T>),
}

impl<T> Resumption<T> {
    /// Returns `true` if no values were delivered.
    pub fn is_empty(&self) -> bool {
        matches!(self, Resumption::Empty)
    }

    /// Number of values delivered.
    pub fn len(&self) -> usize {
        match self {
            Resumption::Empty => 0,
            Resumption::Single(_) => 1,
            Resumption::Multiple(values) => values.len(),
        }
    }

    /// Returns the value if exactly one was delivered.
    pub fn into_single(self) -> Option<T> {
        match self {
            Resumption::Single(value) => Some(value),
            _ => None,
        }
    }

    /// Returns all delivered values in order.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Resumption::Empty => Vec::new(),
            Resumption::Single(value) => vec![value],
            Resumption::Multiple(values) => values,
        }
    }
}

impl<T> From<Vec<T>> for Resumption<T> {
    fn from(mut values: Vec<T>) -> Self {
        match values.len() {
            0 => Resumption::Empty,
            1 => values.pop().map_or(Resumption::Empty, Resumption::Single),
            _ => Resumption::Multiple(values),
        }
    }
}

// The wait-then-resume cycle. `pending` is the future handed out by `Wait`,
// `resolver` completes exactly that future.
struct Cycle<T> {
    pending: Resolvable<Resumption<T>>,
    resolver: Resolver<Resumption<T>>,
    fired: u64,
}

impl<T> Cycle<T> {
    fn new() -> Self {
        let (pending, resolver) = resolvable();
        Self {
            pending,
            resolver,
            fired: 0,
        }
    }

    // Installs a fresh pending future and returns the resolver of the old one.
    fn advance(&mut self) -> Resolver<Resumption<T>> {
        let (pending, resolver) = resolvable();
        self.pending = pending;
        self.fired += 1;
        std::mem::replace(&mut self.resolver, resolver)
    }
}

/// Creates the sink and wait handle for one invocation.
pub(crate) fn channel<T, E>() -> (Sink<T, E>, Wait<T>) {
    let cycle = Arc::new(Mutex::new(Cycle::new()));
    let sink = Sink {
        err: Arc::new(Mutex::new(None)),
        cycle: Arc::clone(&cycle),
    };
    (sink, Wait { cycle })
}

/// The per-invocation callback that drives a procedure's resumption.
///
/// Invoking the sink records the error argument, normalizes the values into a
/// [`Resumption`] and resolves the future the procedure is waiting on. The sink
/// may be cloned and moved into callback-based operations. Firing it after the
/// procedure has completed has no effect on the terminal callback.
pub struct Sink<T, E> {
    err: Arc<Mutex<Option<E>>>,
    cycle: Arc<Mutex<Cycle<T>>>,
}

impl<T, E> Clone for Sink<T, E> {
    fn clone(&self) -> Self {
        Self {
            err: Arc::clone(&self.err),
            cycle: Arc::clone(&self.cycle),
        }
    }
}

impl<T, E> Sink<T, E> {
    /// Invokes the sink with an error argument followed by values.
    ///
    /// The error is stored before the waiting future resolves, so the
    /// procedure always observes the error and the values of the same firing.
    pub fn call(&self, err: Option<E>, values: Vec<T>) {
        let resumption = Resumption::from(values);
        let has_err = err.is_some();
        let values = resumption.len();
        *self.err.lock() = err;

        let (resolver, cycle) = {
            let mut cycle = self.cycle.lock();
            let resolver = cycle.advance();
            (resolver, cycle.fired)
        };
        trace!(cycle, has_err, values, "result sink invoked");
        resolver.resolve(resumption);
    }

    /// Invokes the sink from a `Result`, `Ok(v)` as `(None, [v])` and `Err(e)` as `(Some(e), [])`.
    pub fn complete(&self, result: Result<T, E>) {
        match result {
            Ok(value) => self.call(None, vec![value]),
            Err(err) => self.call(Some(err), Vec::new()),
        }
    }

    /// Returns an owned callback that invokes this sink.
    ///
    /// Handy for APIs that take a `FnOnce(Option<E>, Vec<T>)` completion callback.
    pub fn callback(&self) -> impl FnOnce(Option<E>, Vec<T>) + Send + use<T, E>
    where
        T: Send,
        E: Send,
    {
        let sink = self.clone();
        move |err, values| sink.call(err, values)
    }

    /// Returns the error of the latest firing, if any.
    pub fn err(&self) -> Option<E>
    where
        E: Clone,
    {
        self.err.lock().clone()
    }

    /// Takes the error of the latest firing, leaving `None` behind.
    pub fn take_err(&self) -> Option<E> {
        self.err.lock().take()
    }

    /// Returns `true` if the latest firing carried an error.
    pub fn has_err(&self) -> bool {
        self.err.lock().is_some()
    }

    /// Wraps `err` so that returning it from a procedure reports an error.
    pub fn error_result(&self, err: E) -> ErrorResult<E> {
        ErrorResult::new(err)
    }
}

/// Hands out the future a procedure suspends on.
pub struct Wait<T> {
    cycle: Arc<Mutex<Cycle<T>>>,
}

impl<T> Clone for Wait<T> {
    fn clone(&self) -> Self {
        Self {
            cycle: Arc::clone(&self.cycle),
        }
    }
}

impl<T> Wait<T> {
    /// Returns the future that resolves the next time the sink fires.
    ///
    /// Calling this again before the sink fires returns the same future.
    pub fn next(&self) -> Resolvable<Resumption<T>> {
        self.cycle.lock().pending.clone()
    }

    /// Captures the next resumption and then runs `start`.
    ///
    /// Use this to kick off an operation that may fire the sink before the
    /// caller gets around to waiting.
    ///
    /// # Example
    /// ```
    /// # use await_callback::{Completion, Sink, Wait};
    /// async fn tick(_: (), sink: Sink<u32, ()>, wait: Wait<u32>) -> Completion<u32, ()> {
    ///     let value = wait.until(|| sink.call(None, vec![7])).await;
    ///     Completion::from(value.into_single().ok_or(()))
    /// }
    /// ```
    pub fn until(&self, start: impl FnOnce()) -> Resolvable<Resumption<T>> {
        let pending = self.next();
        start();
        pending
    }

    /// Like [`until`](Self::until), for operations that can fail to start.
    ///
    /// If `start` returns an error, the sink will never fire for it, so the
    /// error is returned instead of a future.
    ///
    /// # Example
    /// ```
    /// # use await_callback::{Completion, Sink, Wait};
    /// async fn register(_: (), _sink: Sink<u32, String>, wait: Wait<u32>) -> Completion<u32, String> {
    ///     let heard = match wait.try_until(|| Err::<(), _>("no listener".to_string())) {
    ///         Ok(pending) => pending.await,
    ///         Err(err) => return Completion::Error(err),
    ///     };
    ///     Completion::from(heard.into_single().ok_or_else(|| "silent".to_string()))
    /// }
    /// ```
    pub fn try_until<R, X>(
        &self,
        start: impl FnOnce() -> Result<R, X>,
    ) -> Result<Resolvable<Resumption<T>>, X> {
        let pending = self.next();
        start()?;
        Ok(pending)
    }

    // Releases whoever is still parked on the current future.
    pub(crate) fn finish(&self) -> bool {
        let resolver = self.cycle.lock().resolver.share();
        // Wake outside the lock, a woken task may call back into `next`.
        resolver.resolve(Resumption::Empty)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        sync::{
            atomic::{AtomicBool, Ordering},
            mpsc,
        },
        task::Context,
        thread,
        time::Duration,
    };

    use futures::{
        FutureExt,
        task::{ArcWake, waker},
    };

    use super::*;

    #[test]
    fn resumption_normalizes_by_arity() {
        assert_eq!(Resumption::<u8>::from(vec![]), Resumption::Empty);
        assert_eq!(Resumption::from(vec![4]), Resumption::Single(4));
        assert_eq!(
            Resumption::from(vec![1, 2, 3]),
            Resumption::Multiple(vec![1, 2, 3])
        );
    }

    #[test]
    fn sink_replaces_pending_future_on_each_firing() {
        let (sink, wait) = channel::<u8, &str>();
        let first = wait.next();
        sink.call(Some("boom"), vec![]);
        assert!(first.is_resolved());
        assert!(!wait.next().is_resolved());
        assert_eq!(sink.err(), Some("boom"));

        sink.complete(Ok(1));
        assert!(!sink.has_err());
        sink.complete(Err("again"));
        assert_eq!(sink.take_err(), Some("again"));
        assert_eq!(sink.err(), None);
    }

    #[test]
    fn finish_resolves_only_the_current_future() {
        let (_sink, wait) = channel::<u8, ()>();
        let pending = wait.next();
        assert!(wait.finish());
        assert!(pending.is_resolved());
        assert!(!wait.finish());
    }

    // Wakes by asking the wait handle for its current future.
    struct NextOnWake {
        wait: Wait<u8>,
        woken: AtomicBool,
    }

    impl ArcWake for NextOnWake {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            let _ = arc_self.wait.next();
            arc_self.woken.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn finish_lets_woken_task_reenter_wait() {
        let (_sink, wait) = channel::<u8, ()>();
        let wake = Arc::new(NextOnWake {
            wait: wait.clone(),
            woken: AtomicBool::new(false),
        });
        let waker = waker(Arc::clone(&wake));
        let mut pending = wait.next();
        let mut cx = Context::from_waker(&waker);
        assert!(Pin::new(&mut pending).poll(&mut cx).is_pending());

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(wait.finish());
        });
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(500)),
            Ok(true),
            "finish should return while the woken task re-enters the wait handle"
        );
        assert!(wake.woken.load(Ordering::SeqCst));
        assert!(pending.is_resolved());
    }

    #[test]
    fn try_until_returns_start_error_instead_of_future() {
        let (sink, wait) = channel::<u8, &str>();
        let started = wait.try_until(|| Err::<(), _>("registration failed"));
        assert_eq!(started.err(), Some("registration failed"));

        let pending = wait
            .try_until(|| {
                sink.call(None, vec![]);
                Ok::<(), &str>(())
            })
            .unwrap();
        assert!(pending.is_resolved());
        assert!(wait.next().now_or_never().is_none());
    }

    #[test]
    fn empty_resumption_has_no_values() {
        let empty = Resumption::<u8>::from(vec![]);
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
        assert!(!Resumption::from(vec![1, 2]).is_empty());
    }
}
