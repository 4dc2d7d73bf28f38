//! Process exit codes for the `train` launcher.
//!
//! - 0: the run was handed to the training engine
//! - 1: profile, engine, or child-process failure
//! - 2: the run configuration was rejected

use std::process::ExitCode;

use run_config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LaunchExitCode {
    Success = 0,
    EngineFailure = 1,
    InvalidConfig = 2,
}

impl From<LaunchExitCode> for ExitCode {
    fn from(code: LaunchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<LaunchExitCode> for i32 {
    fn from(code: LaunchExitCode) -> Self {
        code as i32
    }
}

pub fn exit_code_for_error(err: &anyhow::Error) -> LaunchExitCode {
    if err.downcast_ref::<ConfigError>().is_some() {
        LaunchExitCode::InvalidConfig
    } else {
        LaunchExitCode::EngineFailure
    }
}

/// One-line stderr message; configuration errors lead with the field and kind.
pub fn diagnostic(err: &anyhow::Error) -> String {
    match err.downcast_ref::<ConfigError>() {
        Some(cfg_err) => format!("error: {}: {}: {cfg_err}", cfg_err.key(), cfg_err.kind()),
        None => format!("error: {err:#}"),
    }
}
