//! Replay-latest observable values.
//!
//! [`Observable`] holds a current value and a list of subscriber callbacks.
//! Subscribing delivers the current value immediately, then every later
//! publish in order. Only the owning store can publish; views get a shared
//! reference and can read or subscribe.
//!
//! Callbacks run with no lock held, so a callback may read the store, or even
//! mutate it. Values published from inside a callback are queued and
//! delivered after the current one finishes, which keeps delivery order equal
//! to publish order for every subscriber.
//!
//! The replay for a new subscriber goes through the same queue. A subscriber
//! therefore sees the value current at subscribe time first, then exactly the
//! values published after it, even when another thread is publishing.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::storage::lock;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    /// First publish sequence number this subscriber receives.
    since: u64,
    callback: Callback<T>,
}

enum Pending<T> {
    /// A published value, for every subscriber registered before it.
    Publish { seq: u64, value: T },
    /// The subscribe-time value, for one subscriber.
    Replay { id: u64, value: T },
}

struct Inner<T> {
    current: T,
    subscribers: Vec<Subscriber<T>>,
    next_id: u64,
    next_seq: u64,
    pending: VecDeque<Pending<T>>,
    delivering: bool,
}

/// A value with replay-latest change notification.
pub struct Observable<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> fmt::Debug for Observable<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Observable")
            .field("current", &inner.current)
            .field("subscribers", &inner.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an observable holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                current: initial,
                subscribers: Vec::new(),
                next_id: 0,
                next_seq: 0,
                pending: VecDeque::new(),
                delivering: false,
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        lock(&self.inner).current.clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&lock(&self.inner).current)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Register `callback`.
    ///
    /// The callback is invoked with the current value, then once per
    /// subsequent publish until the returned [`Subscription`] is dropped or
    /// [`Subscription::unsubscribe`] is called.
    ///
    /// The replay is queued behind values already awaiting delivery. When no
    /// delivery is running it happens before this returns; when one is (a
    /// callback subscribing, or another thread publishing) that delivery
    /// loop makes it, still ahead of any later value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            let since = inner.next_seq;
            inner.subscribers.push(Subscriber {
                id,
                since,
                callback: Arc::new(callback),
            });
            let value = inner.current.clone();
            inner.pending.push_back(Pending::Replay { id, value });
            id
        };

        self.flush();

        let weak: Weak<Mutex<Inner<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).subscribers.retain(|sub| sub.id != id);
                }
            })),
        }
    }

    /// Replace the current value and notify every subscriber.
    #[cfg(test)]
    pub(crate) fn publish(&self, value: T) {
        self.stage(value);
        self.flush();
    }

    /// Replace the current value and queue it for delivery without
    /// delivering. Callers holding their own write lock stage under it and
    /// [`flush`](Self::flush) after releasing it.
    pub(crate) fn stage(&self, value: T) {
        let mut inner = lock(&self.inner);
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.current = value.clone();
        inner.pending.push_back(Pending::Publish { seq, value });
    }

    /// Deliver queued values. Returns immediately if a delivery loop is
    /// already running further up the stack or on another thread; that loop
    /// drains the queue.
    pub(crate) fn flush(&self) {
        {
            let mut inner = lock(&self.inner);
            if inner.delivering {
                return;
            }
            inner.delivering = true;
        }
        let _reset = DeliveryReset(&self.inner);

        loop {
            let (value, subscribers) = {
                let mut inner = lock(&self.inner);
                let Some(pending) = inner.pending.pop_front() else {
                    // Cleared under the lock that saw the queue empty, so no
                    // concurrently staged value is stranded.
                    inner.delivering = false;
                    return;
                };
                match pending {
                    Pending::Publish { seq, value } => {
                        let subscribers: Vec<Callback<T>> = inner
                            .subscribers
                            .iter()
                            .filter(|sub| sub.since <= seq)
                            .map(|sub| Arc::clone(&sub.callback))
                            .collect();
                        (value, subscribers)
                    }
                    Pending::Replay { id, value } => {
                        let subscribers: Vec<Callback<T>> = inner
                            .subscribers
                            .iter()
                            .filter(|sub| sub.id == id)
                            .map(|sub| Arc::clone(&sub.callback))
                            .collect();
                        (value, subscribers)
                    }
                }
            };

            for callback in subscribers {
                callback(&value);
            }
        }
    }
}

/// Clears the delivering flag when a callback panics out of the loop, so
/// later publishes are not stranded in the queue.
struct DeliveryReset<'a, T>(&'a Mutex<Inner<T>>);

impl<T> Drop for DeliveryReset<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut inner = lock(self.0);
            inner.delivering = false;
            inner.pending.clear();
        }
    }
}

/// Handle to a registered callback.
///
/// Dropping the handle unsubscribes. A callback removed while a delivery is
/// in flight may still see that one in-flight value.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Stop receiving values.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Keep the callback registered for the life of the observable.
    pub fn detach(mut self) {
        self.cancel = None;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(&T) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &T| sink.lock().unwrap().push(value.clone()))
    }

    #[test]
    fn test_subscribe_replays_current_value() {
        let observable = Observable::new(1);
        observable.publish(2);

        let (seen, callback) = recorder();
        let _sub = observable.subscribe(callback);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_delivers_every_publish_in_order() {
        let observable = Observable::new(0);
        let (seen, callback) = recorder();
        let _sub = observable.subscribe(callback);

        observable.publish(1);
        observable.publish(1);
        observable.publish(3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 1, 3]);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let observable = Observable::new(0);
        let (seen, callback) = recorder();
        let sub = observable.subscribe(callback);
        assert_eq!(observable.subscriber_count(), 1);

        drop(sub);
        observable.publish(5);
        assert_eq!(observable.subscriber_count(), 0);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_detach_keeps_callback() {
        let observable = Observable::new(0);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        observable
            .subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .detach();

        observable.publish(1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_may_read_observable() {
        let observable = Arc::new(Observable::new(0));
        let reader = Arc::clone(&observable);
        let (seen, sink) = recorder();
        let _sub = observable.subscribe(move |value: &i32| {
            // Re-reading inside the callback must not deadlock and must
            // agree with the delivered value.
            assert_eq!(reader.get(), *value);
            sink(value);
        });

        observable.publish(7);
        assert_eq!(*seen.lock().unwrap(), vec![0, 7]);
    }

    #[test]
    fn test_nested_publish_is_delivered_after_current() {
        let observable = Arc::new(Observable::new(0));
        let publisher = Arc::clone(&observable);
        let _bump = observable.subscribe(move |value: &i32| {
            if *value == 1 {
                publisher.publish(2);
            }
        });
        let (seen, callback) = recorder();
        let _sub = observable.subscribe(callback);

        observable.publish(1);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(observable.get(), 2);
    }

    #[test]
    fn test_subscribe_inside_callback_replays_once() {
        let observable = Arc::new(Observable::new(0));
        let (seen, callback) = recorder();
        let callback = Arc::new(Mutex::new(Some(callback)));
        let target = Arc::clone(&observable);
        let late = Arc::new(Mutex::new(Vec::new()));
        let handles = Arc::clone(&late);
        let _outer = observable.subscribe(move |value: &i32| {
            if *value == 1 {
                if let Some(callback) = callback.lock().unwrap().take() {
                    handles.lock().unwrap().push(target.subscribe(callback));
                }
                target.publish(2);
            }
        });

        observable.publish(1);
        // Replay of 1, then the publish made after subscribing; no repeat.
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_replay_is_never_overtaken_by_concurrent_publish() {
        for _ in 0..50 {
            let observable = Arc::new(Observable::new(0_u32));
            let publisher = Arc::clone(&observable);
            let writer = std::thread::spawn(move || {
                for value in 1..=200 {
                    publisher.publish(value);
                }
            });

            let (seen, callback) = recorder();
            let sub = observable.subscribe(callback);
            writer.join().unwrap();
            // Any delivery still queued by the writer has drained by now.
            observable.flush();

            let seen = seen.lock().unwrap().clone();
            assert!(seen.windows(2).all(|pair| pair[0] < pair[1]), "{seen:?}");
            assert_eq!(seen.last().copied(), Some(200));
            drop(sub);
        }
    }

    #[test]
    fn test_stage_without_flush_updates_value_only() {
        let observable = Observable::new(0);
        let (seen, callback) = recorder();
        let _sub = observable.subscribe(callback);

        observable.stage(4);
        assert_eq!(observable.get(), 4);
        assert_eq!(*seen.lock().unwrap(), vec![0]);

        observable.flush();
        assert_eq!(*seen.lock().unwrap(), vec![0, 4]);
    }
}
