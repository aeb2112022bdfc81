//! Simulate a flow in the terminal.
//!
//! ```text
//! cargo run -p execflow-dialoguer --example simulate              # salon visit
//! cargo run -p execflow-dialoguer --example simulate inspection
//! cargo run -p execflow-dialoguer --example simulate flow.json    # API payload
//! ```
//!
//! Set `RUST_LOG=debug` to see navigation and inventory events.

use anyhow::Context;
use execflow::{Flow, InventoryKind, wire};
use execflow_dialoguer::{DialoguerError, DialoguerSimulator};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let flow = load(std::env::args().nth(1).as_deref())?;

    let simulator = DialoguerSimulator::new()
        .with_inventory(InventoryKind::Product, example_flows::sample_products())
        .with_inventory(InventoryKind::Supply, example_flows::sample_supplies());

    match simulator.run(flow) {
        Ok(Some(payload)) => {
            println!("\n=== Submitted ===");
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Ok(None) => println!("\nSimulation closed without submitting."),
        Err(DialoguerError::Cancelled) => println!("\nSimulation cancelled."),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn load(arg: Option<&str>) -> anyhow::Result<Flow> {
    match arg {
        None | Some("salon") => Ok(example_flows::salon_visit()),
        Some("inspection") => Ok(example_flows::quick_inspection()),
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {path}"))?;
            wire::deserialize_flow(&json).with_context(|| format!("failed to decode {path}"))
        }
    }
}
