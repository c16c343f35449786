//! The public surface: [`invoke`] a procedure once, or [`wrap`] it for reuse.
//!
//! Both hand the procedure its caller arguments followed by a fresh [`Sink`]
//! and [`Wait`] handle, and return an [`Invocation`] future that must be polled
//! by whatever executor the caller uses. The procedure starts on the first poll
//! and runs until its first suspension. When it finishes, the outstanding
//! resumption future is released and the terminal callback fires exactly once
//! with the mapped [`Completion`].
//!
//! A panic inside the procedure is never delivered to the callback. It is
//! caught at the invocation boundary and reported as
//! [`BridgeError::Fault`] from the `Invocation` itself, no matter whether it
//! happened before or after a suspension point.

use std::{
    any::type_name,
    marker::PhantomData,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
};

use futures::{FutureExt, future::CatchUnwind};
use pin_project_lite::pin_project;
use tracing::{debug, error, trace};

use crate::{
    BridgeError, Completion,
    completion::OnceCallback,
    sink::{self, Sink, Wait},
};

pin_project! {
    /// One run of a procedure, reported to a terminal callback.
    ///
    /// Resolves to `Ok(())` once the callback has been invoked, or to
    /// [`BridgeError::Fault`] if the procedure panicked. A procedure that is
    /// never resumed keeps the invocation pending; bounding that is left to the
    /// caller.
    #[must_use = "futures do nothing unless polled or .awaited"]
    pub struct Invocation<F, C, T, E> {
        #[pin]
        body: CatchUnwind<AssertUnwindSafe<F>>,
        wait: Wait<T>,
        callback: OnceCallback<C>,
        label: &'static str,
        started: bool,
        _error: PhantomData<fn() -> E>,
    }
}

impl<F, C, T, E> Invocation<F, C, T, E> {
    /// Sets the name used for this invocation in logs and faults.
    ///
    /// Defaults to the type name of the procedure.
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }
}

impl<F, C, T, E> Future for Invocation<F, C, T, E>
where
    F: Future<Output = Completion<T, E>>,
    C: FnOnce(Result<Vec<T>, E>),
{
    type Output = Result<(), BridgeError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        if !*this.started {
            *this.started = true;
            debug!(procedure = *this.label, "procedure started");
        }

        let outcome = ready!(this.body.poll(cx));
        this.wait.finish();

        match outcome {
            Ok(completion) => {
                let result = completion.into_result();
                debug!(
                    procedure = *this.label,
                    failed = result.is_err(),
                    "procedure completed"
                );
                this.callback.fire(result);
                Poll::Ready(Ok(()))
            }
            Err(payload) => {
                let fault = BridgeError::fault(*this.label, payload);
                error!(procedure = *this.label, %fault, "procedure faulted");
                Poll::Ready(Err(fault))
            }
        }
    }
}

/// Runs `procedure` once with `args` and reports its outcome to `callback`.
///
/// The procedure is called as `procedure(args, sink, wait)`. Several caller
/// arguments are passed as a tuple. The returned [`Invocation`] does nothing
/// until it is polled.
///
/// # Example
/// ```
/// # use await_callback::{invoke, Completion, Sink, Wait};
/// #
/// async fn sum((a, b): (i32, i32), sink: Sink<i32, ()>, wait: Wait<i32>) -> Completion<i32, ()> {
///     wait.until(|| sink.call(None, Vec::new())).await;
///     Completion::Value(a + b)
/// }
///
/// # async {
/// invoke(sum, (1, 2), |result: Result<Vec<i32>, ()>| {
///     assert_eq!(result, Ok(vec![3]));
/// })
/// .await
/// .unwrap();
/// # };
/// ```
pub fn invoke<P, A, T, E, Fut, C>(
    procedure: P,
    args: A,
    callback: C,
) -> Invocation<impl Future<Output = Completion<T, E>>, C, T, E>
where
    P: FnOnce(A, Sink<T, E>, Wait<T>) -> Fut,
    Fut: Future,
    Fut::Output: Into<Completion<T, E>>,
    C: FnOnce(Result<Vec<T>, E>),
{
    let (sink, wait) = sink::channel();
    let resume = wait.clone();
    // Calling the procedure inside the body defers it to the first poll, so a
    // panic in its synchronous prefix is caught like any other.
    let body = async move {
        let completion: Completion<T, E> = procedure(args, sink, resume).await.into();
        completion
    };

    Invocation {
        body: AssertUnwindSafe(body).catch_unwind(),
        wait,
        callback: OnceCallback::new(callback),
        label: type_name::<P>(),
        started: false,
        _error: PhantomData,
    }
}

/// A reusable procedure produced by [`wrap`].
///
/// Every [`call`](Wrapped::call) is an independent invocation with its own sink,
/// wait handle and callback.
pub struct Wrapped<P, A, T, E> {
    procedure: Arc<P>,
    label: &'static str,
    _marker: PhantomData<fn(A) -> (T, E)>,
}

impl<P, A, T, E> Clone for Wrapped<P, A, T, E> {
    fn clone(&self) -> Self {
        Self {
            procedure: Arc::clone(&self.procedure),
            label: self.label,
            _marker: PhantomData,
        }
    }
}

/// Turns `procedure` into a callable that can be invoked any number of times.
///
/// # Example
/// ```
/// # use await_callback::{wrap, Completion, Sink, Wait};
/// #
/// async fn echo(word: &'static str, sink: Sink<&'static str, ()>, wait: Wait<&'static str>)
///     -> Completion<&'static str, ()>
/// {
///     let heard = wait.until(|| sink.call(None, vec![word])).await;
///     Completion::from(heard.into_single().ok_or(()))
/// }
///
/// let echo = wrap(echo).label("echo");
/// # async move {
/// echo.call("hello", |r: Result<Vec<&'static str>, ()>| assert_eq!(r, Ok(vec!["hello"])))
///     .await
///     .unwrap();
/// # };
/// ```
pub fn wrap<P, A, T, E, Fut>(procedure: P) -> Wrapped<P, A, T, E>
where
    P: Fn(A, Sink<T, E>, Wait<T>) -> Fut,
    Fut: Future,
    Fut::Output: Into<Completion<T, E>>,
{
    Wrapped {
        procedure: Arc::new(procedure),
        label: type_name::<P>(),
        _marker: PhantomData,
    }
}

impl<P, A, T, E> Wrapped<P, A, T, E> {
    /// Sets the name used for invocations of this procedure in logs and faults.
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Invokes the wrapped procedure with `args`, reporting to `callback`.
    pub fn call<Fut, C>(
        &self,
        args: A,
        callback: C,
    ) -> Invocation<impl Future<Output = Completion<T, E>> + use<P, A, T, E, Fut, C>, C, T, E>
    where
        P: Fn(A, Sink<T, E>, Wait<T>) -> Fut,
        Fut: Future,
        Fut::Output: Into<Completion<T, E>>,
        C: FnOnce(Result<Vec<T>, E>),
    {
        trace!(procedure = self.label, "calling wrapped procedure");
        let procedure = Arc::clone(&self.procedure);
        invoke(
            move |args, sink, wait| (*procedure)(args, sink, wait),
            args,
            callback,
        )
        .label(self.label)
    }
}
