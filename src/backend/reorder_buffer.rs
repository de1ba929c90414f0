use std::collections::VecDeque;

use log::error;

use crate::instructions::instructions::{Instr, RegisterType, Tag};

pub(crate) struct ROBEntry {
    pub(crate) instr: Instr,
    pub(crate) completed: bool,
}

/// FIFO record of all in-flight instructions in program (tag) order. The ROB
/// is the single source of truth for "is there an uncompleted earlier writer
/// of register R". Entries are appended at dispatch, marked completed at
/// broadcast and removed from the head at commit; the buffer never reorders.
pub(crate) struct ROB {
    entries: VecDeque<ROBEntry>,
}

impl ROB {
    pub(crate) fn new() -> ROB {
        ROB { entries: VecDeque::new() }
    }

    pub(crate) fn append(&mut self, instr: Instr) {
        debug_assert!(self.entries.back().map_or(true, |e| e.instr.tag + 1 == instr.tag),
                      "ROB: tags must be appended consecutively");

        self.entries.push_back(ROBEntry { instr, completed: false });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // In-flight tags are consecutive and removal is head-only, so a tag's
    // position is its offset from the head tag.
    pub(crate) fn position_of(&self, tag: Tag) -> Option<usize> {
        let head_tag = self.entries.front()?.instr.tag;
        if tag < head_tag {
            return None;
        }

        let pos = (tag - head_tag) as usize;
        if pos < self.entries.len() {
            Some(pos)
        } else {
            None
        }
    }

    pub(crate) fn mark_completed(&mut self, tag: Tag) {
        match self.position_of(tag) {
            Some(pos) => self.entries[pos].completed = true,
            None => {
                error!("broadcast for tag {} which has no ROB entry", tag);
                panic!("ROB: broadcast for tag {} which has no ROB entry", tag);
            }
        }
    }

    pub(crate) fn head_completed(&self) -> bool {
        self.entries.front().map_or(false, |entry| entry.completed)
    }

    /// Removes the head entry. Only legal once the head is completed.
    pub(crate) fn commit_head(&mut self) -> ROBEntry {
        debug_assert!(self.head_completed(), "ROB: only a completed head may be committed");
        self.entries.pop_front().unwrap()
    }

    /// RAW hazard detection: scan backward from the entry immediately
    /// preceding `consumer` toward the head and return the tag of the
    /// nearest writer of `source` that has not yet completed. A completed
    /// nearest writer, or no writer at all, means no hazard. Only the
    /// nearest writer matters; renaming is implicit in taking the most
    /// recent one.
    pub(crate) fn nearest_pending_writer(&self,
                                         consumer: Tag,
                                         source: Option<RegisterType>) -> Option<Tag> {
        let source = source?;
        let pos = self.position_of(consumer)?;

        for entry in self.entries.range(..pos).rev() {
            if let Some(dest) = entry.instr.dest {
                if dest == source {
                    return if entry.completed {
                        None
                    } else {
                        Some(entry.instr.tag)
                    };
                }
            }
        }

        None
    }
}
