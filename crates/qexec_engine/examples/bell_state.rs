//! Bell state on both engines
//!
//! Usage:
//! ```bash
//! cargo run -p qexec_engine --example bell_state --release
//! ```

use qexec_core::CircuitBuilder;
use qexec_engine::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let circuit = CircuitBuilder::new(2).h(0).cnot(0, 1).measure_all().build()?;
    println!("Circuit:\n{}", circuit);

    for mode in [SimulatorMode::Statevector, SimulatorMode::DensityMatrix] {
        let config = RunConfig::for_mode(mode).with_shots(4096).with_seed(42);
        let executor = Executor::new(config)?;
        let report = executor.run(&circuit)?;

        println!("\n== {} ==", mode.name());
        println!("{}", report.summary());
        print!("{}", report.stats());

        if let Some(amps) = report.amplitudes() {
            println!("final state:");
            for a in amps {
                println!("{} {}", a.re, a.im);
            }
        }
        if let Some(rows) = report.state_rows() {
            println!("final density matrix:");
            for row in rows {
                let cells: Vec<String> = row.iter().map(|z| format!("{} {}", z.re, z.im)).collect();
                println!("{}", cells.join(" "));
            }
        }
    }

    Ok(())
}
