// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Each use case coordinates the other layers for one command:
//
//   sweep_use_case.rs        — `train`: the seed × batch size × norm sweep
//   reproduce_use_case.rs    — `reproduce`: re-evaluate saved snapshots
//   group_search_use_case.rs — `search-groups`: pick the GN group count
//   plot_use_case.rs         — `plot`: result table → SVG chart
//
// No tensor math here, only workflow. Every use case has an
// `execute` for the real data and GPU backend, and a `run`
// generic over data source and backend for tests.
//
// Reference: Clean Architecture pattern

/// The main experiment
pub mod sweep_use_case;

/// Snapshot re-evaluation
pub mod reproduce_use_case;

/// Group count search
pub mod group_search_use_case;

/// Chart rendering
pub mod plot_use_case;

#[cfg(test)]
mod test_support;
