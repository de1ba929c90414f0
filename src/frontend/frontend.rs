use std::rc::Rc;

use crate::cpu::{CPUConfig, Trace};
use crate::instructions::instructions::{Instr, Program};

/// The fetch stage. Pulls instructions from the loaded trace, a full batch
/// of `fetch_width` at a time. It never touches processor state; the driver
/// decides what to do with a batch.
pub(crate) struct Frontend {
    program_option: Option<Rc<Program>>,
    next_fetch: usize,
    fetch_width: u64,
    trace: Trace,
}

impl Frontend {
    pub(crate) fn new(cpu_config: &CPUConfig) -> Frontend {
        Frontend {
            program_option: None,
            next_fetch: 0,
            fetch_width: cpu_config.fetch_width,
            trace: cpu_config.trace.clone(),
        }
    }

    pub(crate) fn init(&mut self, program: &Rc<Program>) {
        self.program_option = Some(Rc::clone(program));
        self.next_fetch = 0;
    }

    /// Pulls the next `fetch_width` instructions. Returns None once the
    /// trace can't fill a whole batch; a batch cut short by end-of-trace is
    /// void and none of it reaches the pipeline.
    pub(crate) fn fetch(&mut self) -> Option<Vec<Instr>> {
        let program = self.program_option.as_ref()?;

        let mut batch = Vec::with_capacity(self.fetch_width as usize);
        for _ in 0..self.fetch_width {
            if self.next_fetch == program.len() {
                if self.trace.fetch {
                    println!("Fetch: end of trace");
                }
                return None;
            }

            let instr = program.get_instr(self.next_fetch);
            self.next_fetch += 1;

            if self.trace.fetch {
                println!("Fetched [{}]", instr);
            }
            batch.push(instr);
        }

        Some(batch)
    }
}
