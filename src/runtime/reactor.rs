use core::cell::{Cell, RefCell};
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};
use slab::Slab;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Wake;
use std::time::Instant;

/// A unit of deferred work.
pub(crate) type Job = Box<dyn FnOnce()>;

/// A spawned future, erased to its driving shape.
pub(crate) type LocalTask = Pin<Box<dyn Future<Output = ()>>>;

thread_local! {
    static REACTOR: Reactor = Reactor::new();
}

/// The single-threaded scheduler behind every deferred value on this thread.
///
/// The reactor owns three kinds of pending work:
///
/// - a FIFO queue of jobs, used to run settlement callbacks once the current
///   call stack has unwound;
/// - timers, ordered by deadline and then by registration order;
/// - spawned futures, which are polled whenever their waker fires.
#[derive(Debug, Clone)]
pub struct Reactor {
    inner: Rc<InnerReactor>,
}

/// The private, internal `Reactor` implementation. Every field is borrowed
/// only for the duration of a queue operation, never while user code runs.
struct InnerReactor {
    jobs: RefCell<VecDeque<Job>>,
    timers: RefCell<BTreeMap<(Instant, u64), Job>>,
    next_timer: Cell<u64>,
    tasks: RefCell<Slab<Spawned>>,
    driving: Cell<bool>,
}

impl core::fmt::Debug for InnerReactor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InnerReactor")
            .field("jobs", &self.jobs.borrow().len())
            .field("timers", &self.timers.borrow().len())
            .field("tasks", &self.tasks.borrow().len())
            .field("driving", &self.driving.get())
            .finish()
    }
}

struct Spawned {
    future: Option<LocalTask>,
    waker: Arc<TaskWaker>,
}

struct TaskWaker {
    woken: AtomicBool,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.woken.store(true, Ordering::Relaxed);
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.woken.store(true, Ordering::Relaxed);
    }
}

impl Reactor {
    /// Return the `Reactor` for the current thread.
    pub fn current() -> Self {
        REACTOR.with(Clone::clone)
    }

    fn new() -> Self {
        Self {
            inner: Rc::new(InnerReactor {
                jobs: RefCell::new(VecDeque::new()),
                timers: RefCell::new(BTreeMap::new()),
                next_timer: Cell::new(0),
                tasks: RefCell::new(Slab::new()),
                driving: Cell::new(false),
            }),
        }
    }

    /// Queue `job` to run after the current call stack has unwound.
    ///
    /// Jobs run in the order they were scheduled.
    pub fn schedule(&self, job: impl FnOnce() + 'static) {
        self.inner.jobs.borrow_mut().push_back(Box::new(job));
    }

    /// Queue `job` to run once `deadline` has passed.
    pub(crate) fn schedule_at(&self, deadline: Instant, job: impl FnOnce() + 'static) {
        let seq = self.inner.next_timer.get();
        self.inner.next_timer.set(seq + 1);
        tracing::debug!(timer = seq, ?deadline, "register timer");
        self.inner
            .timers
            .borrow_mut()
            .insert((deadline, seq), Box::new(job));
    }

    /// Start driving `future` on this reactor.
    pub(crate) fn spawn(&self, future: LocalTask) {
        let waker = Arc::new(TaskWaker {
            // Freshly spawned tasks get their first poll on the next turn.
            woken: AtomicBool::new(true),
        });
        let key = self.inner.tasks.borrow_mut().insert(Spawned {
            future: Some(future),
            waker,
        });
        tracing::debug!(task = key, "spawn task");
    }

    /// Mark the current thread as driving the reactor, for the lifetime of
    /// the returned guard.
    ///
    /// # Panic
    /// Panics if the reactor is already being driven.
    pub(crate) fn enter(&self) -> DriveGuard {
        if self.inner.driving.replace(true) {
            panic!("cannot deferred::runtime::block_on inside an existing block_on!")
        }
        DriveGuard {
            reactor: self.clone(),
        }
    }

    /// Run a single unit of ready work: the oldest job, or else the first woken
    /// task. Returns `false` if nothing was ready.
    pub(crate) fn turn(&self) -> bool {
        let job = self.inner.jobs.borrow_mut().pop_front();
        if let Some(job) = job {
            job();
            return true;
        }
        self.poll_woken_task()
    }

    fn poll_woken_task(&self) -> bool {
        let next = {
            let mut tasks = self.inner.tasks.borrow_mut();
            // A task that is being polled further up the stack keeps its
            // wake-up until it has been put back.
            let next = tasks
                .iter_mut()
                .find(|(_, task)| task.future.is_some() && task.waker.woken.load(Ordering::Relaxed))
                .and_then(|(key, task)| {
                    task.waker.woken.store(false, Ordering::Relaxed);
                    let future = task.future.take()?;
                    Some((key, future, Arc::clone(&task.waker)))
                });
            next
        };

        let Some((key, mut future, waker)) = next else {
            return false;
        };

        let waker = Waker::from(waker);
        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                tracing::debug!(task = key, "task finished");
                self.inner.tasks.borrow_mut().remove(key);
            }
            Poll::Pending => {
                if let Some(task) = self.inner.tasks.borrow_mut().get_mut(key) {
                    task.future = Some(future);
                }
            }
        }
        true
    }

    /// Run ready jobs and woken tasks until none remain. Time does not advance.
    pub fn run_until_stalled(&self) {
        while self.turn() {}
    }

    /// Block the thread until the earliest timer is due, then run every timer
    /// whose deadline has passed. Returns `false` if no timer was registered.
    pub(crate) fn block_until_next_timer(&self) -> bool {
        let first = self
            .inner
            .timers
            .borrow()
            .first_key_value()
            .map(|((deadline, _), _)| *deadline);
        let Some(deadline) = first else {
            return false;
        };

        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }

        let now = Instant::now();
        loop {
            let due = {
                let mut timers = self.inner.timers.borrow_mut();
                match timers.first_entry() {
                    Some(entry) if entry.key().0 <= now => {
                        let ((_, seq), job) = entry.remove_entry();
                        Some((seq, job))
                    }
                    _ => None,
                }
            };
            match due {
                Some((seq, job)) => {
                    tracing::debug!(timer = seq, "fire timer");
                    job();
                }
                None => break,
            }
        }
        true
    }

    /// Drive the reactor until no jobs, woken tasks or timers remain.
    ///
    /// Spawned tasks that wait on something that can never happen are left
    /// in place.
    pub fn run(&self) {
        loop {
            self.run_until_stalled();
            if !self.block_until_next_timer() {
                break;
            }
        }
    }

    /// Whether any job, woken task or timer is still outstanding.
    pub fn is_idle(&self) -> bool {
        self.inner.jobs.borrow().is_empty()
            && self.inner.timers.borrow().is_empty()
            && !self
                .inner
                .tasks
                .borrow()
                .iter()
                .any(|(_, task)| task.waker.woken.load(Ordering::Relaxed))
    }
}

/// Clears the driving flag when `block_on` returns or unwinds.
pub(crate) struct DriveGuard {
    reactor: Reactor,
}

impl Drop for DriveGuard {
    fn drop(&mut self) {
        self.reactor.inner.driving.set(false);
    }
}
