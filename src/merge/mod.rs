//! Merge Module
//!
//! Background worker that drains the pending buffer into the ordered index.
//!
//! ## State Machine
//! ```text
//!            signal                     buffer empty
//!   Idle ───────────────▶ Draining ──────────────────▶ Idle
//!    │                       │
//!    │ shutdown              │ shutdown (checked between items)
//!    ▼                       ▼
//!  Terminated ◀──────────────┘
//! ```
//!
//! ## Trigger Protocol
//! - Writers `try_send` on a bounded channel after buffering a mutation
//! - A full channel drops the signal: a wake-up is already queued
//! - Once woken, the worker drains until the buffer is empty
//! - Shutdown is polled before every wait and between items, so a steady
//!   stream of writes cannot starve it

mod scheduler;

pub use scheduler::{MergeScheduler, MergeStats};
