//! Drive callback-based asynchronous operations from a single linear procedure.
//!
//! `await-callback` lets an `async` procedure call APIs that report through
//! `(error, values...)` callbacks as if they returned futures, and exposes the
//! procedure's outcome through one terminal callback of the same shape.
//!
//! A procedure receives its arguments followed by a [`Sink`] and a [`Wait`]
//! handle. It passes the sink to a callback-based operation and awaits the
//! future returned by the wait handle. When the operation fires the sink, the
//! procedure resumes with the delivered values and can inspect the delivered
//! error on the sink. Whatever the procedure finally returns is mapped onto
//! exactly one invocation of the terminal callback:
//! - an error (a [`Completion::Error`], an `Err`, or an [`ErrorResult`]) is
//!   delivered alone as `Err(e)`
//! - several values ([`Completion::Values`]) are delivered in order as `Ok(values)`
//! - any other value is delivered as `Ok(vec![value])`
//!
//! The crate does not run an event loop. [`invoke`] and [`Wrapped::call`]
//! return an [`Invocation`] future that is driven by the caller's executor,
//! whichever it is.
//!
//! Misuse is rejected by the compiler before anything runs. A procedure must
//! be callable:
//! ```compile_fail
//! let _ = await_callback::invoke(42, (), |_: Result<Vec<u8>, ()>| {});
//! ```
//! It must return a future, plain functions are not procedures:
//! ```compile_fail
//! use await_callback::{Completion, Sink, Wait};
//! fn plain(_: (), _: Sink<u8, ()>, _: Wait<u8>) -> Completion<u8, ()> {
//!     Completion::Value(1)
//! }
//! let _ = await_callback::wrap(plain);
//! ```
//! And the terminal callback must be callable:
//! ```compile_fail
//! use await_callback::{Completion, Sink, Wait};
//! async fn procedure(_: (), _: Sink<u8, ()>, _: Wait<u8>) -> Completion<u8, ()> {
//!     Completion::Value(1)
//! }
//! let _ = await_callback::invoke(procedure, (), "not a callback");
//! ```
//! The same holds for wrapped procedures:
//! ```compile_fail
//! use await_callback::{Completion, Sink, Wait};
//! async fn procedure(_: (), _: Sink<u8, ()>, _: Wait<u8>) -> Completion<u8, ()> {
//!     Completion::Value(1)
//! }
//! let _ = await_callback::wrap(procedure).call((), "not a callback");
//! ```
//! A starter that can fail has to go through [`Wait::try_until`], so its error
//! cannot be dropped on the floor:
//! ```compile_fail
//! use await_callback::{Completion, Sink, Wait};
//! async fn procedure(_: (), _: Sink<u8, ()>, wait: Wait<u8>) -> Completion<u8, ()> {
//!     wait.until(|| Err::<(), ()>(())).await;
//!     Completion::Value(1)
//! }
//! ```

pub mod bridge;
pub mod completion;
pub mod error;
pub mod fs;
pub mod resolvable;
pub mod sink;

pub use bridge::{Invocation, Wrapped, invoke, wrap};
pub use completion::{Completion, ErrorResult, OnceCallback};
pub use error::BridgeError;
pub use resolvable::{Resolvable, Resolver, resolvable};
pub use sink::{Resumption, Sink, Wait};
