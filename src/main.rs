use std::path::PathBuf;
use std::process::exit;
use std::rc::Rc;

use structopt::StructOpt;

use crate::cpu::{load_cpu_config, CPU};
use crate::loader::loader::{load, LoadError};
use crate::stats::write_report;

mod backend;
mod cpu;
#[cfg(test)]
mod cpu_tests;
mod frontend;
mod instructions;
mod loader;
mod stats;

#[derive(StructOpt, Debug)]
#[structopt(name = "OOO Pipeline Simulator")]
struct Opt {
    /// Path of the instruction trace to simulate
    #[structopt(short, long, parse(from_os_str))]
    file: PathBuf,

    /// Sets a custom config file
    #[structopt(short, long, parse(from_os_str), default_value = "cpu.yaml")]
    config: PathBuf,

    /// Path of the report written at simulation end
    #[structopt(short, long, parse(from_os_str), default_value = "pipeline.report")]
    report: PathBuf,
}

fn main() {
    let opt = Opt::from_args();

    let cpu_config_path = opt.config.to_str().unwrap();
    let cpu_config = match load_cpu_config(cpu_config_path) {
        Ok(config) => config,
        Err(error) => {
            println!("Failed to load {}. Cause: {}", cpu_config_path, error);
            exit(0);
        }
    };

    let path = opt.file.to_str().unwrap();
    println!("Loading {}", path);
    let load_result = load(path);
    let program = match load_result {
        Ok(p) => Rc::new(p),
        Err(err) => {
            println!("Loading trace '{}' failed.", path);
            match err {
                LoadError::IOError(msg) => {
                    println!("{}", msg);
                    exit(1);
                }

                LoadError::ParseError(msg) => {
                    println!("{}", msg);
                    exit(1);
                }
            }
        }
    };

    let mut cpu = CPU::new(&cpu_config);
    cpu.run(&program);

    let stats = cpu.stats();
    let timeline = cpu.timeline.borrow();
    if let Err(error) = write_report(&opt.report, &cpu_config, &stats, &timeline) {
        println!("Failed to write report {}. Cause: {}", opt.report.display(), error);
        exit(1);
    }

    println!("Simulation complete!");
    println!("Total instructions: {}", stats.retired_instruction);
    println!("Total run time (cycles): {}", stats.cycle_count);
    println!("Avg inst retired per cycle: {:.6}", stats.avg_inst_retired);
    println!("Report written to {}", opt.report.display());
}
