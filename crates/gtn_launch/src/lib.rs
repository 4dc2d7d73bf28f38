//! Launch profiles and training-engine handoff for resolved run configs.

pub mod engine;
pub mod exit;
pub mod launch;
pub mod profiles;

pub use engine::{DryRunEngine, ScriptEngine, TrainingEngine};
pub use exit::{diagnostic, exit_code_for_error, LaunchExitCode};
pub use launch::{load_profiles, merged_args, prepare, LaunchRequest, PreparedRun};
pub use profiles::{LaunchProfile, LaunchProfiles, ProfileError};
