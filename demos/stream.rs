//! Streams a moving bar through a two-region network and prints the activity of both regions.
//!
//! Usage: `cargo run --example stream -- [settings.json] [steps]`
//! Set `RUST_LOG=debug` (or `trace`) to see the per-step diagnostics of every region.

use anyhow::Context;
use chtm_rs::core::{network::Network, report::format_levels, settings::Settings};

const INPUT_SIDE: usize = 8;
const CELLS_PER_REGION: [usize; 2] = [64, 16];

/// A bar of full intensity on column `t % side`, with a fading trail on the previous column.
fn moving_bar(t: usize) -> Vec<f32> {
    (0..INPUT_SIDE * INPUT_SIDE)
        .map(|i| {
            let column = i % INPUT_SIDE;
            if column == t % INPUT_SIDE {
                1.0
            } else if (column + 1) % INPUT_SIDE == t % INPUT_SIDE {
                0.4
            } else {
                0.0
            }
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => {
            let document = std::fs::read_to_string(&path)
                .with_context(|| format!("reading settings from {path}"))?;
            Settings::from_json(&document).with_context(|| format!("parsing {path}"))?
        }
        None => Settings::default(),
    };
    let steps: usize = match args.next() {
        Some(steps) => steps.parse().context("steps must be a number")?,
        None => 200,
    };

    println!(
        "Initializing network with {} inputs and regions of {:?} cells...",
        INPUT_SIDE * INPUT_SIDE,
        CELLS_PER_REGION
    );
    let mut network = Network::new(INPUT_SIDE * INPUT_SIDE, &CELLS_PER_REGION, settings)?;

    for t in 0..steps {
        let output = network.process(&moving_bar(t), true)?;
        if (t + 1) % 20 == 0 {
            println!("T{:>4}", network.t());
            for region in network.regions() {
                println!(
                    "  R{} {} radius {:.2}",
                    region.index(),
                    format_levels(&region.activations()),
                    region.inhibition_radius()
                );
            }
            println!("  out {}", format_levels(&output));
        }
    }

    println!("Processed {} steps.", network.t());
    Ok(())
}
