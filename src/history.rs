use std::collections::VecDeque;

use bytes::Bytes;

/// Bounded, newest-first record of the messages that went through the hub.
///
/// Entries carry a monotonic sequence number starting at 1 that is never
/// reused, even after eviction, so a cursor can tell what existed when it was
/// created. Only the hub task ever touches the storage.
pub struct History {
    storage: VecDeque<(u64, Bytes)>,
    next_seq: u64,
    limit: usize,
    new_client_backlog: usize,
}

impl History {
    pub fn new(limit: usize, new_client_backlog: usize) -> Self {
        Self {
            storage: VecDeque::with_capacity(limit),
            next_seq: 1,
            limit,
            new_client_backlog,
        }
    }

    /// Pushes to the front, evicting the oldest entry once the ring would
    /// exceed its limit.
    pub fn append(&mut self, payload: Bytes) {
        self.storage.push_front((self.next_seq, payload));
        self.next_seq += 1;
        if self.storage.len() > self.limit {
            self.storage.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Sequence number of the most recent append, 0 before the first one.
    pub fn latest_seq(&self) -> u64 {
        self.next_seq - 1
    }

    /// A cursor pinned to the current front of the history.
    ///
    /// The cursor snapshots up to `new_client_backlog` payloads at creation
    /// time, so it observes everything appended so far and nothing appended
    /// after, no matter how long it is kept around.
    pub fn new_cursor(&self) -> HistoryCursor {
        let origin_seq = self.latest_seq();
        let entries = self
            .storage
            .iter()
            .filter(|(seq, _)| *seq <= origin_seq)
            .take(self.new_client_backlog)
            .map(|(_, payload)| payload.clone())
            .collect();
        HistoryCursor {
            origin_seq,
            remaining_backlog: self.new_client_backlog,
            entries,
        }
    }
}

/// A bounded replay handle over the history, yielding newest-first.
pub struct HistoryCursor {
    origin_seq: u64,
    remaining_backlog: usize,
    entries: VecDeque<Bytes>,
}

impl HistoryCursor {
    /// The newest sequence number this cursor can observe.
    pub fn origin_seq(&self) -> u64 {
        self.origin_seq
    }
}

impl Iterator for HistoryCursor {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.remaining_backlog == 0 {
            return None;
        }
        let payload = self.entries.pop_front()?;
        self.remaining_backlog -= 1;
        Some(payload)
    }
}
