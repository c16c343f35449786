//! Single-resolution futures.
//!
//! A [`Resolvable`] is a future that stays pending until its paired [`Resolver`]
//! supplies a value. The pair is created together by [`resolvable`] and the
//! resolver only ever completes the future it was created with. Resolution
//! happens at most once; later attempts are ignored.
//!
//! `Resolvable` can be cloned. Every clone observes the same slot and yields a
//! clone of the resolved value, so more than one party may await the same
//! resolution.

use std::{
    mem,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
};

use parking_lot::Mutex;

struct Slot<T> {
    value: Option<T>,
    wakers: Vec<Waker>,
}

/// Creates a pending [`Resolvable`] together with the [`Resolver`] that completes it.
pub fn resolvable<T>() -> (Resolvable<T>, Resolver<T>) {
    let slot = Arc::new(Mutex::new(Slot {
        value: None,
        wakers: Vec::with_capacity(1),
    }));
    (
        Resolvable {
            slot: Arc::clone(&slot),
        },
        Resolver { slot },
    )
}

/// A future resolved at most once by its [`Resolver`].
#[must_use = "futures do nothing unless polled or .awaited"]
pub struct Resolvable<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Resolvable<T> {
    /// Returns `true` once a value has been supplied.
    pub fn is_resolved(&self) -> bool {
        self.slot.lock().value.is_some()
    }
}

impl<T> Clone for Resolvable<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Future for Resolvable<T>
where
    T: Clone,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.value.as_ref() {
            return Poll::Ready(value.clone());
        }
        if !slot.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            slot.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

/// Completes the [`Resolvable`] it was created with.
pub struct Resolver<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Resolver<T> {
    /// Resolves the paired future with `value`.
    ///
    /// Returns `false` and drops `value` if the future was already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let wakers = {
            let mut slot = self.slot.lock();
            if slot.value.is_some() {
                return false;
            }
            slot.value = Some(value);
            mem::take(&mut slot.wakers)
        };
        // Wake outside the lock, a woken task may poll right away.
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Returns `true` once the paired future has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.slot.lock().value.is_some()
    }

    // A second handle on the same future, so it can be resolved after the
    // owner's lock is released.
    pub(crate) fn share(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}
