//! Channels: the supported cross-thread communication primitive.
//!
//! Capacity > 0 is a FIFO ring guarded by not-empty/not-full condition
//! variables. Capacity 0 is a single-slot rendezvous: the sender parks
//! until a receiver has taken the value. `close` is idempotent and wakes
//! every waiter.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::context::{throw_msg, Exec};
use crate::heap::Object;
use crate::value::{ChannelRef, Value};
use parking_lot::{Condvar, Mutex, MutexGuard};

/// Pause between polling passes in [`select`].
const SELECT_POLL_INTERVAL: Duration = Duration::from_millis(1);

struct ChannelInner {
    /// Ring buffer when capacity > 0.
    queue: VecDeque<Value>,
    /// Single rendezvous slot when capacity == 0.
    slot: Option<Value>,
    /// A deposited rendezvous value is awaiting pickup.
    sender_waiting: bool,
    /// Sequence number of the most recent deposit into the slot.
    deposit_seq: u64,
    /// Sequence number of the most recent pickup from the slot.
    taken_seq: u64,
    closed: bool,
}

impl ChannelInner {
    /// Take a value if one is available, maintaining rendezvous
    /// bookkeeping. Shared by recv, timed recv, and try_recv.
    fn take(&mut self, capacity: usize) -> Option<Value> {
        if capacity == 0 {
            let value = self.slot.take()?;
            self.taken_seq = self.deposit_seq;
            self.sender_waiting = false;
            Some(value)
        } else {
            self.queue.pop_front()
        }
    }
}

pub struct Channel {
    capacity: usize,
    inner: Mutex<ChannelInner>,
    not_empty: Condvar,
    not_full: Condvar,
    rendezvous: Condvar,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Channel")
            .field("capacity", &self.capacity)
            .field("length", &inner.queue.len())
            .field("closed", &inner.closed)
            .finish()
    }
}

/// Outcome of a non-blocking receive attempt, used by [`select`].
pub enum TryRecv {
    Value(Value),
    Empty,
    Closed,
}

impl Channel {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(ChannelInner {
                queue: VecDeque::with_capacity(capacity),
                slot: None,
                sender_waiting: false,
                deposit_seq: 0,
                taken_seq: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            rendezvous: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Values currently buffered (or in the rendezvous slot).
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        if self.capacity == 0 {
            inner.slot.is_some() as usize
        } else {
            inner.queue.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Blocking send. Throws when the channel is closed (including a
    /// close that lands while waiting).
    pub fn send(&self, value: Value) -> Exec<()> {
        self.send_deadline(value, None).map(|_| ())
    }

    /// Send with a timeout; returns false when the deadline passes
    /// before the value is accepted.
    pub fn send_timeout(&self, value: Value, timeout: Duration) -> Exec<bool> {
        self.send_deadline(value, Some(Instant::now() + timeout))
    }

    fn send_deadline(&self, value: Value, deadline: Option<Instant>) -> Exec<bool> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return throw_msg("send on closed channel");
        }

        if self.capacity == 0 {
            return self.send_rendezvous(inner, value, deadline);
        }

        while inner.queue.len() == self.capacity {
            if inner.closed {
                return throw_msg("send on closed channel");
            }
            let timed_out = match deadline {
                Some(d) => self.not_full.wait_until(&mut inner, d).timed_out(),
                None => {
                    self.not_full.wait(&mut inner);
                    false
                }
            };
            if timed_out && inner.queue.len() == self.capacity {
                return Ok(false);
            }
        }
        if inner.closed {
            return throw_msg("send on closed channel");
        }
        inner.queue.push_back(value);
        self.not_empty.notify_one();
        Ok(true)
    }

    /// Rendezvous send: deposit, signal, and park until a receiver has
    /// taken the value. The sequence numbers distinguish "my value was
    /// picked up" from "some later sender's value is in flight".
    fn send_rendezvous(
        &self,
        mut inner: MutexGuard<'_, ChannelInner>,
        value: Value,
        deadline: Option<Instant>,
    ) -> Exec<bool> {
        // Wait for the slot to be free of any previous exchange.
        while inner.slot.is_some() {
            if inner.closed {
                return throw_msg("send on closed channel");
            }
            let timed_out = match deadline {
                Some(d) => self.not_full.wait_until(&mut inner, d).timed_out(),
                None => {
                    self.not_full.wait(&mut inner);
                    false
                }
            };
            if timed_out && inner.slot.is_some() {
                return Ok(false);
            }
        }
        if inner.closed {
            return throw_msg("send on closed channel");
        }

        inner.deposit_seq += 1;
        let my_seq = inner.deposit_seq;
        inner.slot = Some(value);
        inner.sender_waiting = true;
        self.not_empty.notify_one();

        while inner.taken_seq < my_seq {
            if inner.closed {
                // Closed before any receiver arrived; reclaim our value.
                if inner.deposit_seq == my_seq && inner.slot.is_some() {
                    inner.slot = None;
                    inner.sender_waiting = false;
                }
                return throw_msg("send on closed channel");
            }
            let timed_out = match deadline {
                Some(d) => self.rendezvous.wait_until(&mut inner, d).timed_out(),
                None => {
                    self.rendezvous.wait(&mut inner);
                    false
                }
            };
            if timed_out && inner.taken_seq < my_seq {
                if inner.deposit_seq == my_seq && inner.slot.is_some() {
                    inner.slot = None;
                    inner.sender_waiting = false;
                    self.not_full.notify_one();
                }
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Blocking receive. Returns null once the channel is closed and
    /// drained.
    pub fn recv(&self) -> Value {
        self.recv_deadline(None).unwrap_or(Value::Null)
    }

    /// Receive with a timeout; returns None when the deadline passes.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Value> {
        self.recv_deadline(Some(Instant::now() + timeout))
    }

    fn recv_deadline(&self, deadline: Option<Instant>) -> Option<Value> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(value) = inner.take(self.capacity) {
                self.rendezvous.notify_all();
                self.not_full.notify_one();
                return Some(value);
            }
            if inner.closed {
                // Closed and drained.
                return Some(Value::Null);
            }
            let timed_out = match deadline {
                Some(d) => self.not_empty.wait_until(&mut inner, d).timed_out(),
                None => {
                    self.not_empty.wait(&mut inner);
                    false
                }
            };
            if timed_out {
                return None;
            }
        }
    }

    /// Non-blocking receive used by `select`.
    pub fn try_recv(&self) -> TryRecv {
        let mut inner = self.inner.lock();
        if let Some(value) = inner.take(self.capacity) {
            self.rendezvous.notify_all();
            self.not_full.notify_one();
            return TryRecv::Value(value);
        }
        if inner.closed {
            TryRecv::Closed
        } else {
            TryRecv::Empty
        }
    }

    /// Idempotent close; wakes all senders, receivers, and parked
    /// rendezvous partners.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        drop(inner);
        self.not_empty.notify_all();
        self.not_full.notify_all();
        self.rendezvous.notify_all();
    }
}

/// Poll every channel in array order; the first with data (or closed and
/// drained) wins. Sleeps ~1ms between passes; returns null on timeout.
///
/// The result is `{channel, value}`, with a null value for a closed and
/// drained channel.
pub fn select(channels: &[ChannelRef], timeout: Option<Duration>) -> Exec<Value> {
    let deadline = timeout.map(|t| Instant::now() + t);
    loop {
        for ch in channels {
            match ch.try_recv() {
                TryRecv::Value(value) => return Ok(select_result(ch, value)),
                TryRecv::Closed => return Ok(select_result(ch, Value::Null)),
                TryRecv::Empty => {}
            }
        }
        if let Some(d) = deadline {
            if Instant::now() >= d {
                return Ok(Value::Null);
            }
        }
        std::thread::sleep(SELECT_POLL_INTERVAL);
    }
}

fn select_result(channel: &ChannelRef, value: Value) -> Value {
    let mut obj = Object::new();
    obj.set("channel".to_string(), Value::Channel(channel.clone()));
    obj.set("value".to_string(), value);
    Value::object(obj)
}
