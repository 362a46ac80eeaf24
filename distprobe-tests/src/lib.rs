//! Test utilities for the distprobe workspace
//!
//! Provides a fake server distribution whose start scripts are driven by
//! files, a control plane that reads and writes those same files, and marker
//! file helpers for asserting on side effects of launched scripts.

pub mod helpers;

pub use helpers::fake_dist::FakeDistribution;
pub use helpers::file_control::FileControlPlane;
pub use helpers::marker_files::MarkerFileHelper;
