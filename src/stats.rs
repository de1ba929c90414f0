use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::cpu::{CPUConfig, PerfCounters};
use crate::instructions::instructions::Tag;

/// The final throughput record handed to the report sink.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SimStats {
    pub(crate) retired_instruction: u64,
    pub(crate) cycle_count: u64,
    pub(crate) max_disp_size: u64,
    pub(crate) avg_disp_size: f32,
    pub(crate) avg_inst_fired: f32,
    pub(crate) avg_inst_retired: f32,
}

impl SimStats {
    pub(crate) fn from_counters(perf_counters: &PerfCounters) -> SimStats {
        let cycles = perf_counters.cycle_cnt;

        SimStats {
            retired_instruction: perf_counters.retire_cnt,
            cycle_count: cycles,
            max_disp_size: perf_counters.disp_size_max,
            avg_disp_size: perf_counters.disp_size_sum as f32 / cycles as f32,
            avg_inst_fired: perf_counters.execute_cnt as f32 / cycles as f32,
            avg_inst_retired: perf_counters.retire_cnt as f32 / cycles as f32,
        }
    }
}

/// The cycle each stage handled one instruction, keyed by tag.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct StageRow {
    pub(crate) tag: Tag,
    pub(crate) fetch: u64,
    pub(crate) dispatch: u64,
    pub(crate) schedule: u64,
    pub(crate) execute: u64,
    pub(crate) state_update: u64,
}

/// Per-instruction stage timeline. Rows are created at dispatch, in tag
/// order, so row `tag - 1` belongs to `tag`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StageTimeline {
    rows: Vec<StageRow>,
}

impl StageTimeline {
    pub(crate) fn new() -> StageTimeline {
        StageTimeline { rows: Vec::new() }
    }

    pub(crate) fn record_dispatch(&mut self, tag: Tag, cycle: u64) {
        debug_assert!(tag as usize == self.rows.len() + 1,
                      "StageTimeline: rows must be created in tag order");

        self.rows.push(StageRow {
            tag,
            // the batch sat in the pipeline register since last cycle
            fetch: cycle - 1,
            dispatch: cycle,
            schedule: 0,
            execute: 0,
            state_update: 0,
        });
    }

    pub(crate) fn record_schedule(&mut self, tag: Tag, cycle: u64) {
        self.row_mut(tag).schedule = cycle;
    }

    pub(crate) fn record_execute(&mut self, tag: Tag, cycle: u64) {
        self.row_mut(tag).execute = cycle;
    }

    pub(crate) fn record_state_update(&mut self, tag: Tag, cycle: u64) {
        self.row_mut(tag).state_update = cycle;
    }

    pub(crate) fn rows(&self) -> &[StageRow] {
        &self.rows
    }

    pub(crate) fn row(&self, tag: Tag) -> &StageRow {
        &self.rows[(tag - 1) as usize]
    }

    fn row_mut(&mut self, tag: Tag) -> &mut StageRow {
        &mut self.rows[(tag - 1) as usize]
    }
}

/// Writes the simulation report: the processor settings, the per-instruction
/// stage table and the throughput statistics.
pub(crate) fn write_report(path: &Path,
                           cpu_config: &CPUConfig,
                           stats: &SimStats,
                           timeline: &StageTimeline) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "Processor Settings")?;
    writeln!(out, "R: {}", cpu_config.cdb_width)?;
    writeln!(out, "k0: {}", cpu_config.k0_count)?;
    writeln!(out, "k1: {}", cpu_config.k1_count)?;
    writeln!(out, "k2: {}", cpu_config.k2_count)?;
    writeln!(out, "F: {}", cpu_config.fetch_width)?;
    writeln!(out)?;

    writeln!(out, "INST\tFETCH\tDISP\tSCHED\tEXEC\tSTATE")?;
    for row in timeline.rows() {
        writeln!(out, "{}\t{}\t{}\t{}\t{}\t{}",
                 row.tag, row.fetch, row.dispatch, row.schedule, row.execute, row.state_update)?;
    }
    writeln!(out)?;

    writeln!(out, "Processor stats:")?;
    writeln!(out, "Total instructions: {}", stats.retired_instruction)?;
    writeln!(out, "Avg Dispatch queue size: {:.6}", stats.avg_disp_size)?;
    writeln!(out, "Maximum Dispatch queue size: {}", stats.max_disp_size)?;
    writeln!(out, "Avg inst fired per cycle: {:.6}", stats.avg_inst_fired)?;
    writeln!(out, "Avg inst retired per cycle: {:.6}", stats.avg_inst_retired)?;
    writeln!(out, "Total run time (cycles): {}", stats.cycle_count)?;

    Ok(())
}
