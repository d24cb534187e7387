//! Scheduler state machine.
//!
//! All slot and backlog mutation happens here, one transition per event:
//! admission, slot settlement, flush-run settlement, and flush start. Each
//! transition runs under the queue's lock and returns the side effects
//! (slots to start, flush runs to spawn, waiters to wake, drain signal) for
//! the caller to apply once the lock is released. Reentrant submissions from
//! task continuations or drain callbacks therefore always observe a
//! consistent state and are simply the next transition.
//!
//! The state is generic over the job type so the transitions can be tested
//! without a runtime.

use std::collections::BTreeSet;

use futures::channel::oneshot;

use super::backlog::Backlog;
use super::notify::{DrainNotifier, DrainSignal, Drained};
use super::QueueError;

/// Identifier of an active slot. Allocated from a monotonically increasing
/// counter, so never shared by two live slots.
pub(crate) type SlotId = u64;

/// A job to run in a freshly allocated slot.
#[derive(Debug)]
pub(crate) struct Start<J> {
    pub slot: SlotId,
    pub job: J,
}

/// Side effects of a transition.
#[derive(Debug)]
#[must_use]
pub(crate) struct Effects<J> {
    /// New slots to spawn.
    pub starts: Vec<Start<J>>,
    /// Backlog entries released by a flush; they run outside any slot.
    pub flush_runs: Vec<J>,
    /// Flush awaitables to settle.
    pub flush_done: Vec<oneshot::Sender<()>>,
    /// Drain notification to fire.
    pub drain: Option<DrainSignal>,
}

impl<J> Effects<J> {
    pub const fn none() -> Self {
        Self {
            starts: Vec::new(),
            flush_runs: Vec::new(),
            flush_done: Vec::new(),
            drain: None,
        }
    }
}

/// Result of admitting a submission.
#[derive(Debug)]
pub(crate) enum Admission<J> {
    /// A slot was free; run the job in it now.
    Start(Start<J>),
    /// The job was placed in the backlog at the given position.
    Queued { position: usize },
}

/// What a slot does after its current job settled.
#[derive(Debug)]
pub(crate) enum Advance<J> {
    /// Keep the slot and run the next backlog entry in it.
    Continue(J),
    /// The slot is released.
    Retire(Effects<J>),
}

/// Bookkeeping for an outstanding flush.
#[derive(Debug)]
struct FlushState {
    /// Members of the wait set that have not settled yet.
    pending: usize,
    waiters: Vec<oneshot::Sender<()>>,
}

/// Slots, backlog and flush/drain bookkeeping.
#[derive(Debug)]
pub(crate) struct QueueState<J> {
    concurrency: usize,
    next_slot: SlotId,
    active: BTreeSet<SlotId>,
    backlog: Backlog<J>,
    flush: Option<FlushState>,
    notifier: DrainNotifier,
}

impl<J> QueueState<J> {
    pub fn new(concurrency: usize, notifier: DrainNotifier) -> Self {
        Self {
            concurrency: concurrency.max(1),
            next_slot: 1,
            active: BTreeSet::new(),
            backlog: Backlog::new(),
            flush: None,
            notifier,
        }
    }

    /// Start the job in a free slot, or place it in the backlog.
    ///
    /// While a flush is outstanding every admission goes to the backlog, so
    /// it waits for the flush to finish and runs under the normal limit.
    pub fn admit(&mut self, priority: i32, job: J) -> Admission<J> {
        if self.flush.is_none() && self.active.len() < self.concurrency {
            let slot = self.allocate_slot();
            return Admission::Start(Start { slot, job });
        }
        let position = self.backlog.insert(priority, job);
        Admission::Queued { position }
    }

    /// Transition for a slot whose job just settled.
    pub fn advance(&mut self, slot: SlotId) -> Advance<J> {
        if self.flush.is_some() {
            let mut effects = Effects::none();
            if self.active.remove(&slot) && self.release_flush_member() {
                self.finish_flush(&mut effects);
            }
            return Advance::Retire(effects);
        }

        if let Some(next) = self.backlog.pop_front() {
            return Advance::Continue(next.item);
        }

        let mut effects = Effects::none();
        if self.active.remove(&slot) && self.is_idle() {
            effects.drain = Some(self.notifier.take_signal());
        }
        Advance::Retire(effects)
    }

    /// Transition for a job released by a flush that just settled.
    pub fn settle_flush_run(&mut self) -> Effects<J> {
        let mut effects = Effects::none();
        if self.release_flush_member() {
            self.finish_flush(&mut effects);
        }
        effects
    }

    /// Release the whole backlog to run immediately, bypassing the limit.
    ///
    /// The flush settles once every active slot and every released entry has
    /// settled. Flushing while a flush is outstanding is a caller error; the
    /// entries backlogged since are folded into the outstanding flush and the
    /// new waiter settles with it.
    pub fn begin_flush(&mut self, waiter: oneshot::Sender<()>) -> Effects<J> {
        let runs: Vec<J> = self
            .backlog
            .take_all()
            .into_iter()
            .map(|entry| entry.item)
            .collect();
        let mut effects = Effects::none();

        match self.flush.as_mut() {
            Some(flush) => {
                tracing::warn!(
                    "flush requested while a flush is outstanding; folding {} entries into it",
                    runs.len()
                );
                flush.pending += runs.len();
                flush.waiters.push(waiter);
            }
            None => {
                let pending = self.active.len() + runs.len();
                if pending == 0 {
                    effects.flush_done.push(waiter);
                } else {
                    self.flush = Some(FlushState {
                        pending,
                        waiters: vec![waiter],
                    });
                }
            }
        }

        effects.flush_runs = runs;
        effects
    }

    /// Awaitable for the next drain.
    pub fn register_drain(&mut self) -> Result<Drained, QueueError> {
        if self.notifier.is_callback() {
            return Err(QueueError::InvalidState(
                "cannot be used as a completion awaitable once a callback is set".into(),
            ));
        }
        if self.is_idle() {
            return Ok(Drained::ready());
        }
        self.notifier.register().map(Drained::pending).ok_or_else(|| {
            QueueError::InvalidState("drain notifier does not accept waiters".into())
        })
    }

    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    pub const fn is_flushing(&self) -> bool {
        self.flush.is_some()
    }

    /// No active slot, no backlog entry and no outstanding flush.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.backlog.is_empty() && self.flush.is_none()
    }

    fn allocate_slot(&mut self) -> SlotId {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.active.insert(slot);
        slot
    }

    /// Count one member of the flush wait set as settled. Returns true when
    /// it was the last one.
    fn release_flush_member(&mut self) -> bool {
        match self.flush.as_mut() {
            Some(flush) => {
                flush.pending = flush.pending.saturating_sub(1);
                flush.pending == 0
            }
            None => false,
        }
    }

    /// Leave flushing mode: settle flush waiters, refill free slots from the
    /// backlog, and report a drain if nothing is left.
    fn finish_flush(&mut self, effects: &mut Effects<J>) {
        if let Some(flush) = self.flush.take() {
            effects.flush_done.extend(flush.waiters);
        }
        while self.active.len() < self.concurrency {
            let Some(entry) = self.backlog.pop_front() else {
                break;
            };
            let slot = self.allocate_slot();
            effects.starts.push(Start {
                slot,
                job: entry.item,
            });
        }
        if self.is_idle() {
            effects.drain = Some(self.notifier.take_signal());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn awaitable_state(concurrency: usize) -> QueueState<u32> {
        QueueState::new(concurrency, DrainNotifier::awaitable())
    }

    fn started(admission: Admission<u32>) -> Start<u32> {
        match admission {
            Admission::Start(start) => start,
            Admission::Queued { position } => panic!("expected start, queued at {position}"),
        }
    }

    fn queued(admission: Admission<u32>) -> usize {
        match admission {
            Admission::Queued { position } => position,
            Admission::Start(start) => panic!("expected queue, started slot {}", start.slot),
        }
    }

    #[test]
    fn test_admission_respects_concurrency() {
        let mut state = awaitable_state(2);
        let a = started(state.admit(0, 1));
        let b = started(state.admit(0, 2));
        assert_ne!(a.slot, b.slot);
        assert_eq!(queued(state.admit(0, 3)), 0);
        assert_eq!(state.active_count(), 2);
        assert_eq!(state.backlog_len(), 1);
    }

    #[test]
    fn test_advance_reuses_slot_for_backlog_head() {
        let mut state = awaitable_state(1);
        let first = started(state.admit(0, 1));
        state.admit(0, 2);
        state.admit(5, 3);

        assert!(matches!(state.advance(first.slot), Advance::Continue(3)));
        assert!(matches!(state.advance(first.slot), Advance::Continue(2)));
        assert_eq!(state.active_count(), 1);
        assert_eq!(state.backlog_len(), 0);

        match state.advance(first.slot) {
            Advance::Retire(effects) => assert!(effects.drain.is_some()),
            Advance::Continue(job) => panic!("unexpected job {job}"),
        }
        assert!(state.is_idle());
    }

    #[test]
    fn test_drain_only_when_last_slot_retires() {
        let mut state = awaitable_state(2);
        let a = started(state.admit(0, 1));
        let b = started(state.admit(0, 2));

        match state.advance(a.slot) {
            Advance::Retire(effects) => assert!(effects.drain.is_none()),
            Advance::Continue(_) => panic!("backlog was empty"),
        }
        match state.advance(b.slot) {
            Advance::Retire(effects) => assert!(effects.drain.is_some()),
            Advance::Continue(_) => panic!("backlog was empty"),
        }
    }

    #[test]
    fn test_slot_ids_are_not_reused_while_active() {
        let mut state = awaitable_state(3);
        let a = started(state.admit(0, 1));
        let b = started(state.admit(0, 2));
        let _ = state.advance(a.slot);
        let c = started(state.admit(0, 3));
        assert_ne!(b.slot, c.slot);
        assert!(c.slot > b.slot);
    }

    #[test]
    fn test_flush_releases_backlog_and_waits_for_active() {
        let mut state = awaitable_state(1);
        let running = started(state.admit(0, 1));
        state.admit(0, 2);
        state.admit(0, 3);

        let (tx, mut rx) = oneshot::channel();
        let effects = state.begin_flush(tx);
        assert_eq!(effects.flush_runs, vec![2, 3]);
        assert!(effects.flush_done.is_empty());
        assert!(state.is_flushing());
        assert_eq!(state.backlog_len(), 0);

        // Added during the flush: backlogged, not part of the wait set.
        assert_eq!(queued(state.admit(0, 4)), 0);

        let effects = state.settle_flush_run();
        assert!(effects.flush_done.is_empty());
        let effects = state.settle_flush_run();
        assert!(effects.flush_done.is_empty());

        let Advance::Retire(mut effects) = state.advance(running.slot) else {
            panic!("slot advancement is suppressed while flushing");
        };
        assert!(!state.is_flushing());
        assert_eq!(effects.flush_done.len(), 1);
        assert_eq!(effects.starts.len(), 1);
        assert_eq!(effects.starts[0].job, 4);
        assert!(effects.drain.is_none());

        for waiter in effects.flush_done.drain(..) {
            waiter.send(()).unwrap();
        }
        assert_eq!(rx.try_recv(), Ok(Some(())));
    }

    #[test]
    fn test_flush_of_idle_queue_settles_immediately() {
        let mut state = awaitable_state(1);
        let (tx, _rx) = oneshot::channel();
        let effects = state.begin_flush(tx);
        assert_eq!(effects.flush_done.len(), 1);
        assert!(effects.drain.is_none());
        assert!(!state.is_flushing());
    }

    #[test]
    fn test_flush_completion_reports_drain() {
        let mut state = awaitable_state(1);
        let running = started(state.admit(0, 1));
        state.admit(0, 2);

        let (tx, _rx) = oneshot::channel();
        let _ = state.begin_flush(tx);
        let _ = state.advance(running.slot);
        let effects = state.settle_flush_run();
        assert!(effects.drain.is_some());
        assert!(state.is_idle());
    }

    #[test]
    fn test_flush_while_flushing_folds_into_outstanding_flush() {
        let mut state = awaitable_state(1);
        let running = started(state.admit(0, 1));
        let (first_tx, _first_rx) = oneshot::channel();
        let _ = state.begin_flush(first_tx);
        state.admit(0, 2);

        let (second_tx, _second_rx) = oneshot::channel();
        let effects = state.begin_flush(second_tx);
        assert_eq!(effects.flush_runs, vec![2]);

        let _ = state.settle_flush_run();
        assert!(state.is_flushing());
        let Advance::Retire(effects) = state.advance(running.slot) else {
            panic!("slot advancement is suppressed while flushing");
        };
        assert_eq!(effects.flush_done.len(), 2);
        assert!(state.is_idle());
    }

    #[test]
    fn test_register_drain_in_callback_mode_fails() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&hits);
        let mut state: QueueState<u32> = QueueState::new(
            1,
            DrainNotifier::Callback(Arc::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let err = state.register_drain().unwrap_err();
        assert!(matches!(err, QueueError::InvalidState(_)));

        let slot = started(state.admit(0, 1)).slot;
        let Advance::Retire(effects) = state.advance(slot) else {
            panic!("backlog was empty");
        };
        effects.drain.expect("drain signal").fire();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_drain_waits_while_busy() {
        let mut state = awaitable_state(1);
        assert!(state.register_drain().is_ok());

        let slot = started(state.admit(0, 1)).slot;
        let drained = state.register_drain().unwrap();
        let Advance::Retire(effects) = state.advance(slot) else {
            panic!("backlog was empty");
        };
        effects.drain.expect("drain signal").fire();
        futures::executor::block_on(drained);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let state = awaitable_state(0);
        assert_eq!(state.concurrency(), 1);
    }
}
