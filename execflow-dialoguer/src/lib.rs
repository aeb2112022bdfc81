//! # execflow-dialoguer
//!
//! Dialoguer front end for execflow.
//!
//! This crate runs a flow simulation in the terminal using the `dialoguer`
//! library. Each step's questions are asked in order, then the user picks the
//! next move; advancing and submitting are only offered once every question of
//! the current step is answered.
//!
//! ## Example
//!
//! ```rust,ignore
//! use execflow::{InventoryItem, InventoryKind};
//! use execflow_dialoguer::DialoguerSimulator;
//!
//! fn main() -> anyhow::Result<()> {
//!     let flow = load_flow()?;
//!     let simulator = DialoguerSimulator::new()
//!         .with_currency("R$ ")
//!         .with_inventory(InventoryKind::Product, vec![InventoryItem::new("p1", "Shampoo")]);
//!     if let Some(payload) = simulator.run(flow)? {
//!         println!("{}", serde_json::to_string_pretty(&payload)?);
//!     }
//!     Ok(())
//! }
//! ```

mod backend;

pub use backend::{DialoguerError, DialoguerSimulator};
