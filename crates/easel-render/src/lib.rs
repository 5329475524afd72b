#![forbid(unsafe_code)]

//! Render orchestration over a shared character-cell buffer.
//!
//! Given read access to a console's state (buffer, viewport, cursor,
//! selection, title, IME overlays) and a set of pluggable paint backends,
//! this crate computes the minimal visible delta each frame and drives
//! every backend through the paint protocol to realize it.
//!
//! # Architecture
//!
//! - [`data::RenderData`]: the read-only capability trait the console
//!   side implements; everything the painter knows comes through it.
//! - [`backend::RenderBackend`]: the paint-protocol contract; any output
//!   target (GPU surface, raster window, text stream) implements this and
//!   nothing else.
//! - [`renderer::Renderer`]: the orchestrator. Owns the backends, exposes
//!   the trigger API, fans damage out, and runs the per-backend pipeline
//!   under the console lock. One backend's failure never reaches another.
//! - [`scheduler::PaintScheduler`]: single-slot coalescing notifier on a
//!   dedicated paint thread; any burst of triggers becomes one frame.
//! - [`tracker::DeltaTracker`]: previous-frame viewport and selection,
//!   for scroll deltas and selection invalidation unions.
//!
//! The flow: a mutator changes console state → calls a `trigger_*` method
//! → backends accumulate invalidation → the scheduler fires → the frame
//! pipeline repaints exactly the dirty intersection → `present` finalizes
//! each backend outside the lock.

pub mod attrs;
pub mod backend;
pub mod buffer;
pub mod cell;
pub mod data;
pub mod error;
pub mod headless;
mod painter;
pub mod renderer;
pub mod scheduler;
pub mod tracker;

pub use backend::RenderBackend;
pub use data::RenderData;
pub use error::{RenderError, Result};
pub use renderer::Renderer;
