use std::fmt;
use std::fmt::Display;

use crate::instructions::instructions::{Instr, Tag, MAX_SOURCE_COUNT};

/// A single reservation station.
///
/// The validity flag and the per-operand pending-producer tags exist twice:
/// the `current` copy is what the stages observe this cycle, the `next` copy
/// is what wakeup and broadcast write into. A single commit step at the top
/// of state-update copies `next` into `current`, which gives wakeup and slot
/// release their one-cycle latency, the way the register they model would.
pub(crate) struct RS {
    pub(crate) instr: Instr,
    pub(crate) valid: bool,
    pub(crate) next_valid: bool,
    // Some(tag) = operand still waits on that producer's broadcast
    pub(crate) waits: [Option<Tag>; MAX_SOURCE_COUNT],
    pub(crate) next_waits: [Option<Tag>; MAX_SOURCE_COUNT],
    pub(crate) executed: bool,
}

impl RS {
    fn new() -> RS {
        RS {
            instr: Instr::new(0, None, None, [None, None]),
            valid: false,
            next_valid: false,
            waits: [None, None],
            next_waits: [None, None],
            executed: false,
        }
    }

    pub(crate) fn ready(&self) -> bool {
        self.valid && !self.executed && self.waits.iter().all(|wait| wait.is_none())
    }
}

impl Display for RS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RS [{}]", self.instr)?;

        for (index, wait) in self.waits.iter().enumerate() {
            if let Some(tag) = wait {
                write!(f, " src{}<-#{}", index, tag)?;
            }
        }

        if self.executed {
            write!(f, " executed")?;
        }

        Ok(())
    }
}

pub(crate) struct RSTable {
    pub(crate) capacity: usize,
    array: Vec<RS>,
}

impl RSTable {
    pub(crate) fn new(capacity: usize) -> RSTable {
        let mut array = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            array.push(RS::new());
        }

        RSTable { capacity, array }
    }

    pub(crate) fn get(&self, rs_index: usize) -> &RS {
        &self.array[rs_index]
    }

    pub(crate) fn get_mut(&mut self, rs_index: usize) -> &mut RS {
        &mut self.array[rs_index]
    }

    // Lowest-index free slot. Any free slot would do; the fixed scan order
    // keeps runs reproducible.
    pub(crate) fn first_free(&self) -> Option<usize> {
        self.array.iter().position(|rs| !rs.valid)
    }

    pub(crate) fn install(&mut self, rs_index: usize, instr: Instr, waits: [Option<Tag>; MAX_SOURCE_COUNT]) {
        let rs = &mut self.array[rs_index];
        debug_assert!(!rs.valid, "RSTable: can't install into an occupied slot");

        rs.instr = instr;
        rs.valid = true;
        rs.next_valid = true;
        rs.waits = waits;
        rs.next_waits = waits;
        rs.executed = false;
    }

    /// Applies last cycle's deferred wakeups and slot releases.
    pub(crate) fn commit_pending(&mut self) {
        for rs in &mut self.array {
            rs.valid = rs.next_valid;
            rs.waits = rs.next_waits;
        }
    }
}
