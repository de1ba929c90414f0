use std::collections::VecDeque;

use crate::instructions::instructions::{FuClass, Tag};

/// One completed execution awaiting its broadcast slot.
pub(crate) struct CDBRequest {
    pub(crate) tag: Tag,
    pub(crate) rs_index: usize,
    pub(crate) fu_class: FuClass,
}

/// The common data bus. Executions finish into an unbounded FIFO; each cycle
/// at most `width` of them are broadcast, oldest first. An instruction that
/// finishes while the bus is saturated simply waits its turn.
pub(crate) struct ResultBus {
    width: u64,
    queue: VecDeque<CDBRequest>,
}

impl ResultBus {
    pub(crate) fn new(width: u64) -> ResultBus {
        ResultBus {
            width,
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn width(&self) -> u64 {
        self.width
    }

    pub(crate) fn enqueue(&mut self, request: CDBRequest) {
        self.queue.push_back(request);
    }

    pub(crate) fn dequeue(&mut self) -> Option<CDBRequest> {
        self.queue.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
