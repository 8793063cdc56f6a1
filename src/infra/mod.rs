// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of the
// other layers:
//
//   checkpoint.rs — model snapshots, one folder per RunKey,
//                   weights via Burn's recorder + config JSON
//
//   metrics.rs    — per-epoch CSV log of one training run
//
//   results.rs    — the sweep's result tables, rewritten
//                   atomically after every run
//
//   curves.rs     — JSON log of per-epoch loss curves
//
//   chart.rs      — SVG chart of test error vs batch size
//
// Reference: Rust Book §9 (Error Handling with anyhow)

/// Model snapshot saving and loading
pub mod checkpoint;

/// Per-epoch metrics CSV logger
pub mod metrics;

/// Result table persistence
pub mod results;

/// Loss curve JSON log
pub mod curves;

/// Error-vs-batch-size chart rendering
pub mod chart;
