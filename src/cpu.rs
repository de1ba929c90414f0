use std::cell::RefCell;
use std::error::Error;
use std::fs::File;
use std::rc::Rc;

use log::info;
use serde::Deserialize;

use crate::backend::backend::Backend;
use crate::frontend::frontend::Frontend;
use crate::instructions::instructions::{Instr, Program};
use crate::stats::{SimStats, StageTimeline};

pub(crate) const DEFAULT_CDB_WIDTH: u64 = 8;
pub(crate) const DEFAULT_K0_COUNT: u64 = 1;
pub(crate) const DEFAULT_K1_COUNT: u64 = 2;
pub(crate) const DEFAULT_K2_COUNT: u64 = 3;
pub(crate) const DEFAULT_FETCH_WIDTH: u64 = 4;
pub(crate) const DEFAULT_RETIRE_TARGET: u64 = 100_000;

pub(crate) struct PerfCounters {
    pub(crate) dispatch_cnt: u64,
    pub(crate) schedule_cnt: u64,
    pub(crate) execute_cnt: u64,
    pub(crate) retire_cnt: u64,
    pub(crate) cycle_cnt: u64,
    pub(crate) disp_size_sum: u64,
    pub(crate) disp_size_max: u64,
}

impl PerfCounters {
    pub(crate) fn new() -> Self {
        Self {
            dispatch_cnt: 0,
            schedule_cnt: 0,
            execute_cnt: 0,
            retire_cnt: 0,
            cycle_cnt: 0,
            disp_size_sum: 0,
            disp_size_max: 0,
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub(crate) struct Trace {
    pub(crate) fetch: bool,
    pub(crate) dispatch: bool,
    pub(crate) schedule: bool,
    pub(crate) execute: bool,
    pub(crate) state_update: bool,
    pub(crate) retire: bool,
    pub(crate) cycle: bool,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            fetch: false,
            dispatch: false,
            schedule: false,
            execute: false,
            state_update: false,
            retire: false,
            cycle: false,
        }
    }
}

#[derive(Clone, Deserialize, Debug)]
pub(crate) struct CPUConfig {
    // the number of results broadcast on the common data bus per cycle (the R parameter)
    pub(crate) cdb_width: u64,
    // the number of functional units of class k0
    pub(crate) k0_count: u64,
    // the number of functional units of class k1
    pub(crate) k1_count: u64,
    // the number of functional units of class k2
    pub(crate) k2_count: u64,
    // the number of instructions fetched per attempt
    pub(crate) fetch_width: u64,
    // the simulation stops once this many instructions have retired
    pub(crate) retire_target: u64,
    // if processing of the individual stages should be traced (printed)
    pub(crate) trace: Trace,
}

impl CPUConfig {
    // the reservation station pool is provisioned at twice the total unit count
    pub(crate) fn rs_count(&self) -> usize {
        (2 * (self.k0_count + self.k1_count + self.k2_count)) as usize
    }
}

impl Default for CPUConfig {
    fn default() -> Self {
        Self {
            cdb_width: DEFAULT_CDB_WIDTH,
            k0_count: DEFAULT_K0_COUNT,
            k1_count: DEFAULT_K1_COUNT,
            k2_count: DEFAULT_K2_COUNT,
            fetch_width: DEFAULT_FETCH_WIDTH,
            retire_target: DEFAULT_RETIRE_TARGET,
            trace: Trace::default(),
        }
    }
}

pub(crate) fn load_cpu_config(file_path: &str) -> Result<CPUConfig, Box<dyn Error>> {
    let file = File::open(file_path)?;
    let config = serde_yaml::from_reader(file)?;
    Ok(config)
}

/// The simulated core: frontend, backend, and the per-cycle driver.
///
/// A cycle runs state-update, execute, schedule, dispatch, fetch, in that
/// order. Running the stages against the pipeline direction lets each stage
/// see the state its downstream stages produced in the same cycle, which is
/// how all five act "simultaneously" in the modeled hardware.
pub(crate) struct CPU {
    pub(crate) backend: Backend,
    frontend: Frontend,
    // pipeline register between fetch and dispatch; holds last cycle's batch
    batch_reg: Option<Vec<Instr>>,
    fetching: bool,
    retire_target: u64,
    trace: Trace,
    pub(crate) perf_counters: Rc<RefCell<PerfCounters>>,
    pub(crate) timeline: Rc<RefCell<StageTimeline>>,
}

impl CPU {
    pub(crate) fn new(cpu_config: &CPUConfig) -> CPU {
        let perf_counters = Rc::new(RefCell::new(PerfCounters::new()));
        let timeline = Rc::new(RefCell::new(StageTimeline::new()));

        let backend = Backend::new(
            cpu_config,
            Rc::clone(&perf_counters),
            Rc::clone(&timeline),
        );

        let frontend = Frontend::new(cpu_config);

        CPU {
            backend,
            frontend,
            batch_reg: None,
            fetching: false,
            retire_target: cpu_config.retire_target,
            trace: cpu_config.trace.clone(),
            perf_counters,
            timeline,
        }
    }

    pub(crate) fn init(&mut self, program: &Rc<Program>) {
        self.frontend.init(program);
        self.batch_reg = None;
        self.fetching = true;

        info!("simulating {} trace instructions", program.len());
    }

    pub(crate) fn run(&mut self, program: &Rc<Program>) {
        self.init(program);

        while !self.is_done() {
            self.step();
        }
    }

    /// Simulates one cycle.
    pub(crate) fn step(&mut self) {
        self.backend.cycle_state_update();
        self.backend.cycle_execute();
        self.backend.cycle_schedule();

        if let Some(batch) = self.batch_reg.take() {
            self.backend.cycle_dispatch(batch);
        }

        {
            let mut perf_counters = self.perf_counters.borrow_mut();
            let disp_size = self.backend.dispatch_queue.len() as u64;
            perf_counters.disp_size_sum += disp_size;
            if disp_size > perf_counters.disp_size_max {
                perf_counters.disp_size_max = disp_size;
            }
        }

        if self.fetching {
            match self.frontend.fetch() {
                Some(batch) => self.batch_reg = Some(batch),
                // drain mode: keep executing and committing, never fetch again
                None => self.fetching = false,
            }
        }

        let mut perf_counters = self.perf_counters.borrow_mut();
        perf_counters.cycle_cnt += 1;

        if self.trace.cycle {
            println!("[Cycle:{}][Dispatched={}][Scheduled={}][Fired={}][Retired={}]",
                     perf_counters.cycle_cnt,
                     perf_counters.dispatch_cnt,
                     perf_counters.schedule_cnt,
                     perf_counters.execute_cnt,
                     perf_counters.retire_cnt,
            );
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        if self.perf_counters.borrow().retire_cnt >= self.retire_target {
            return true;
        }

        !self.fetching && self.batch_reg.is_none() && self.backend.is_drained()
    }

    pub(crate) fn stats(&self) -> SimStats {
        SimStats::from_counters(&self.perf_counters.borrow())
    }
}
