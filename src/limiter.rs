//! Call-rate limiters: debounce and throttle
//!
//! [`Debounce`] and [`Throttle`] are plain state machines driven by an
//! explicit `now`. [`Debounced`] and [`Throttled`] wrap a callback around
//! them; the debounced wrapper arms tokio timers for trailing calls.
//!
//! [`Throttled`] reads time through an injected [`Clock`]. [`Debounced`]
//! reads `tokio::time::Instant` directly because its timers live on the
//! tokio clock; paused tokio time is its test seam.

use crate::clock::{Clock, SystemClock};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Debounce state machine
///
/// Every call pushes the deadline to `now + wait`. In trailing mode the
/// callback runs once the deadline passes without another call. In
/// immediate (leading) mode the first call of a burst runs right away and
/// the rest of the burst is swallowed. A `wait` too large to add to the
/// current instant leaves the burst open forever.
#[derive(Debug, Clone)]
pub struct Debounce {
    wait: Duration,
    immediate: bool,
    last_call: Option<Instant>,
    burst_open: bool,
    deadline: Option<Instant>,
    leading_fired: bool,
}

impl Debounce {
    pub fn new(wait: Duration, immediate: bool) -> Self {
        Debounce {
            wait,
            immediate,
            last_call: None,
            burst_open: false,
            deadline: None,
            leading_fired: false,
        }
    }

    /// Register a call; returns true when it should run immediately
    pub fn call(&mut self, now: Instant) -> bool {
        let call_now = self.immediate && !self.burst_open;
        self.last_call = Some(now);
        self.burst_open = true;
        self.deadline = now.checked_add(self.wait);
        if call_now {
            self.leading_fired = true;
        }
        call_now
    }

    /// Close the burst if its deadline passed; returns true when the
    /// trailing invocation should run
    pub fn fire_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if self.burst_open && now >= deadline => {
                self.burst_open = false;
                self.deadline = None;
                self.leading_fired = false;
                !self.immediate
            }
            _ => false,
        }
    }

    /// Pending timer deadline; `None` when no burst is open or it never closes
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_open(&self) -> bool {
        self.burst_open
    }

    pub fn last_call(&self) -> Option<Instant> {
        self.last_call
    }

    pub fn leading_fired(&self) -> bool {
        self.leading_fired
    }
}

/// Throttle state machine
///
/// The first call opens a window of `limit`; calls inside the window are
/// dropped, the first call at or after its end is allowed and opens a new one.
/// A window whose end is not representable never closes.
#[derive(Debug, Clone)]
pub struct Throttle {
    limit: Duration,
    window_start: Option<Instant>,
}

impl Throttle {
    pub fn new(limit: Duration) -> Self {
        Throttle {
            limit,
            window_start: None,
        }
    }

    /// Register a call; returns true when it is allowed through
    pub fn call(&mut self, now: Instant) -> bool {
        match self.window_start {
            Some(start) if start.checked_add(self.limit).map_or(true, |end| now < end) => false,
            _ => {
                self.window_start = Some(now);
                true
            }
        }
    }
}

type Callback<A> = Arc<dyn Fn(A) + Send + Sync>;

struct DebounceShared<A> {
    machine: Debounce,
    pending_args: Option<A>,
    generation: u64,
}

/// Debounced callback
///
/// `call` must run inside a tokio runtime: trailing invocations are
/// delivered from a spawned timer task. A newer call supersedes the timer
/// armed by an older one.
///
/// Both the call time and the timers come from tokio's clock, so there is
/// no `with_clock` here: tests pause tokio time
/// (`#[tokio::test(start_paused = true)]`) instead of injecting a
/// [`Clock`]. A manual clock would disagree with the timer wheel about
/// when the deadline passed.
pub struct Debounced<A> {
    shared: Arc<Mutex<DebounceShared<A>>>,
    func: Callback<A>,
}

impl<A: Send + 'static> Debounced<A> {
    pub fn new<F>(func: F, wait: Duration, immediate: bool) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Debounced {
            shared: Arc::new(Mutex::new(DebounceShared {
                machine: Debounce::new(wait, immediate),
                pending_args: None,
                generation: 0,
            })),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: A) {
        let now = Instant::now();
        let (run_now, generation, deadline) = {
            let mut shared = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            let run_now = shared.machine.call(now);
            shared.generation += 1;
            let args = if run_now {
                Some(args)
            } else {
                shared.pending_args = Some(args);
                None
            };
            (args, shared.generation, shared.machine.deadline())
        };

        if let Some(args) = run_now {
            (self.func)(args);
        }

        // An unrepresentable deadline never fires
        let Some(deadline) = deadline else {
            return;
        };
        let shared = Arc::clone(&self.shared);
        let func = Arc::clone(&self.func);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let trailing = {
                let mut shared = shared.lock().unwrap_or_else(|e| e.into_inner());
                if shared.generation != generation {
                    return;
                }
                if shared.machine.fire_due(Instant::now()) {
                    shared.pending_args.take()
                } else {
                    shared.pending_args = None;
                    None
                }
            };
            if let Some(args) = trailing {
                func(args);
            }
        });
    }
}

/// Throttled callback
pub struct Throttled<A> {
    machine: Mutex<Throttle>,
    func: Callback<A>,
    clock: Arc<dyn Clock>,
}

impl<A> Throttled<A> {
    pub fn new<F>(func: F, limit: Duration) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self::with_clock(func, limit, Arc::new(SystemClock))
    }

    pub fn with_clock<F>(func: F, limit: Duration, clock: Arc<dyn Clock>) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Throttled {
            machine: Mutex::new(Throttle::new(limit)),
            func: Arc::new(func),
            clock,
        }
    }

    /// Invoke the callback unless a window is open; returns whether it ran
    pub fn call(&self, args: A) -> bool {
        let allowed = self
            .machine
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .call(self.clock.now());
        if allowed {
            (self.func)(args);
        }
        allowed
    }
}
