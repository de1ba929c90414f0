use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::backend::functional_unit::FuTable;
use crate::backend::reorder_buffer::ROB;
use crate::backend::reservation_station::RSTable;
use crate::backend::result_bus::{CDBRequest, ResultBus};
use crate::cpu::{CPUConfig, PerfCounters, Trace};
use crate::instructions::instructions::{Instr, Tag, DEFAULT_FU_CLASS, MAX_SOURCE_COUNT};
use crate::stats::StageTimeline;

/// The out-of-order engine: dispatch queue, reservation stations, reorder
/// buffer, functional-unit credits and the result bus, plus the four backend
/// stages that operate on them.
///
/// The driver runs the stages in reverse pipeline order within a cycle
/// (state-update, execute, schedule, dispatch), so each stage observes the
/// state its downstream stages already committed this cycle.
pub(crate) struct Backend {
    pub(crate) dispatch_queue: VecDeque<Instr>,
    pub(crate) rs_table: RSTable,
    pub(crate) rob: ROB,
    pub(crate) fu_table: FuTable,
    pub(crate) result_bus: ResultBus,
    next_tag: Tag,
    trace: Trace,
    perf_counters: Rc<RefCell<PerfCounters>>,
    timeline: Rc<RefCell<StageTimeline>>,
}

impl Backend {
    pub(crate) fn new(cpu_config: &CPUConfig,
                      perf_counters: Rc<RefCell<PerfCounters>>,
                      timeline: Rc<RefCell<StageTimeline>>) -> Backend {
        Backend {
            dispatch_queue: VecDeque::new(),
            rs_table: RSTable::new(cpu_config.rs_count()),
            rob: ROB::new(),
            fu_table: FuTable::new(cpu_config),
            result_bus: ResultBus::new(cpu_config.cdb_width),
            next_tag: 1,
            trace: cpu_config.trace.clone(),
            perf_counters,
            timeline,
        }
    }

    // The 1-based cycle currently being simulated.
    fn cycle(&self) -> u64 {
        self.perf_counters.borrow().cycle_cnt + 1
    }

    /// Writeback + commit. Applies last cycle's deferred slot state,
    /// broadcasts up to the bus width of finished executions, and retires
    /// completed ROB heads in program order.
    pub(crate) fn cycle_state_update(&mut self) {
        let cycle = self.cycle();

        self.rs_table.commit_pending();

        for _ in 0..self.result_bus.width() {
            let request = match self.result_bus.dequeue() {
                Some(request) => request,
                None => break,
            };

            {
                let rs = self.rs_table.get_mut(request.rs_index);
                debug_assert!(rs.valid && rs.executed && rs.instr.tag == request.tag,
                              "Backend: result bus request does not match its slot");

                // the slot is released next cycle
                rs.next_valid = false;
            }

            self.rob.mark_completed(request.tag);
            self.fu_table.release(request.fu_class);
            self.wakeup(request.tag);

            self.timeline.borrow_mut().record_state_update(request.tag, cycle);
            if self.trace.state_update {
                println!("Broadcast [#{}]", request.tag);
            }
        }

        let mut perf_counters = self.perf_counters.borrow_mut();
        while self.rob.head_completed() {
            let entry = self.rob.commit_head();
            perf_counters.retire_cnt += 1;

            if self.trace.retire {
                println!("Retired [{}]", entry.instr);
            }
        }
    }

    // Defer-clears every pending operand waiting on the completed producer.
    // The clear becomes visible next cycle through commit_pending.
    fn wakeup(&mut self, tag: Tag) {
        for rs_index in 0..self.rs_table.capacity {
            let rs = self.rs_table.get_mut(rs_index);
            if !rs.valid || rs.executed {
                continue;
            }

            for operand in 0..MAX_SOURCE_COUNT {
                if rs.waits[operand] == Some(tag) {
                    rs.next_waits[operand] = None;
                }
            }
        }
    }

    /// Starts execution of every ready reservation station that can acquire
    /// a credit of its class, oldest tag first so that credit contention
    /// favors program order. A slot that finds no free credit simply stays
    /// a candidate for later cycles.
    pub(crate) fn cycle_execute(&mut self) {
        let cycle = self.cycle();

        let mut candidates: Vec<(Tag, usize)> = (0..self.rs_table.capacity)
            .filter(|&rs_index| self.rs_table.get(rs_index).ready())
            .map(|rs_index| (self.rs_table.get(rs_index).instr.tag, rs_index))
            .collect();
        candidates.sort_unstable();

        for (tag, rs_index) in candidates {
            let instr = self.rs_table.get(rs_index).instr;
            let fu_class = instr.fu_class.unwrap_or(DEFAULT_FU_CLASS);

            if !self.fu_table.has_credit(fu_class) {
                continue;
            }

            self.fu_table.acquire(fu_class);
            self.rs_table.get_mut(rs_index).executed = true;
            self.result_bus.enqueue(CDBRequest { tag, rs_index, fu_class });

            self.perf_counters.borrow_mut().execute_cnt += 1;
            self.timeline.borrow_mut().record_execute(tag, cycle);
            if self.trace.execute {
                println!("Executing [{}]", instr);
            }
        }
    }

    /// Moves instructions from the dispatch queue into free reservation
    /// stations, resolving RAW hazards against the ROB. All-or-nothing per
    /// instruction; stops when slots or queued instructions run out.
    pub(crate) fn cycle_schedule(&mut self) {
        let cycle = self.cycle();

        while !self.dispatch_queue.is_empty() {
            let rs_index = match self.rs_table.first_free() {
                Some(rs_index) => rs_index,
                None => break,
            };

            let instr = self.dispatch_queue.pop_front().unwrap();

            let mut waits = [None; MAX_SOURCE_COUNT];
            for operand in 0..MAX_SOURCE_COUNT {
                waits[operand] = self.rob.nearest_pending_writer(instr.tag, instr.source[operand]);
            }

            self.rs_table.install(rs_index, instr, waits);

            self.perf_counters.borrow_mut().schedule_cnt += 1;
            self.timeline.borrow_mut().record_schedule(instr.tag, cycle);
            if self.trace.schedule {
                println!("Scheduled [{}]", instr);
            }
        }
    }

    /// Accepts the batch the frontend fetched last cycle: assigns tags in
    /// program order and enters every instruction into the dispatch queue
    /// and the ROB.
    pub(crate) fn cycle_dispatch(&mut self, batch: Vec<Instr>) {
        let cycle = self.cycle();
        let mut perf_counters = self.perf_counters.borrow_mut();
        let mut timeline = self.timeline.borrow_mut();

        for mut instr in batch {
            instr.tag = self.next_tag;
            self.next_tag += 1;

            self.rob.append(instr);
            self.dispatch_queue.push_back(instr);

            perf_counters.dispatch_cnt += 1;
            timeline.record_dispatch(instr.tag, cycle);
            if self.trace.dispatch {
                println!("Dispatched [{}]", instr);
            }
        }
    }

    // True once no in-flight work remains anywhere in the backend.
    pub(crate) fn is_drained(&self) -> bool {
        self.rob.is_empty() && self.dispatch_queue.is_empty() && self.result_bus.is_empty()
    }
}
