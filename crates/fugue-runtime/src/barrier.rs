//! Reusable rendezvous barrier

use parking_lot::{Condvar, Mutex};

/// A reusable barrier for exactly P participants
///
/// Each call to [`wait`](Barrier::wait) blocks until all P participants have
/// called it; the last arrival resets the counter and wakes the others, so
/// the barrier is immediately reusable for the next phase.
///
/// There is no generation counter. That is sound only under the executor's
/// usage pattern: the start and end barriers strictly alternate, so no
/// participant can re-enter a barrier while another participant is still
/// leaving it.
pub struct Barrier {
    participants: usize,
    arrived: Mutex<usize>,
    cv: Condvar,
}

impl Barrier {
    /// Create a barrier for the given number of participants
    pub fn new(participants: usize) -> Self {
        assert!(participants >= 1, "barrier needs at least one participant");
        Self {
            participants,
            arrived: Mutex::new(0),
            cv: Condvar::new(),
        }
    }

    /// Number of participants the barrier synchronizes
    pub fn participants(&self) -> usize {
        self.participants
    }

    /// Block until all participants have arrived
    pub fn wait(&self) {
        let mut arrived = self.arrived.lock();
        *arrived += 1;
        if *arrived == self.participants {
            *arrived = 0;
            self.cv.notify_all();
        } else {
            while *arrived != 0 {
                self.cv.wait(&mut arrived);
            }
        }
    }
}
