// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing the experiment:
// which normalization a run uses, how a run is identified,
// what an input image looks like and what a result row holds.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

// Which normalization layer a model is built with
pub mod norm_kind;

// Identifier of a single sweep run (batch size, norm, seed)
pub mod run_key;

// A raw labelled image as read from the benchmark files
pub mod image;

// Result table rows written by the sweep and reproduce steps
pub mod records;

// Core abstractions (traits) that other layers implement
pub mod traits;
