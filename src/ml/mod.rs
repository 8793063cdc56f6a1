// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn-specific model code lives here:
//
//   group_norm.rs — the Group Normalization layer
//   norm.rs       — GN / BN wrapper so the ResNet is built once
//   model.rs      — ResNet-20 for CIFAR-10
//   schedule.rs   — linear LR scaling and step decay
//   trainer.rs    — SGD training loop with per-epoch validation
//   evaluator.rs  — loss / accuracy over a DataLoader
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Group Normalization layer
pub mod group_norm;

/// Normalization layer selection
pub mod norm;

/// ResNet-20 architecture
pub mod model;

/// Learning rate rules
pub mod schedule;

/// Training loop
pub mod trainer;

/// Evaluation helpers
pub mod evaluator;

/// Backend used for training on the GPU (falls back to whatever
/// adapter wgpu finds).
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Backend used for evaluation only.
pub type EvalBackend = burn::backend::Wgpu;

pub fn default_device() -> burn::backend::wgpu::WgpuDevice {
    burn::backend::wgpu::WgpuDevice::default()
}
