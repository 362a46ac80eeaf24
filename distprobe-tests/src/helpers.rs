pub mod fake_dist;
pub mod file_control;
pub mod marker_files;
