use std::path::PathBuf;

use run_config::{resolve_argv, RunConfig};

use crate::engine::ScriptEngine;
use crate::profiles::{LaunchProfile, LaunchProfiles};

/// What the launcher was asked to run.
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    pub profiles_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub program: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub run_args: Vec<String>,
}

/// A resolved run ready for handoff.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub profile: Option<String>,
    pub config: RunConfig,
    pub engine: ScriptEngine,
}

/// Load the profile file when one is required or present.
///
/// A missing file is only an error when a path or profile was asked for.
pub fn load_profiles(request: &LaunchRequest) -> anyhow::Result<LaunchProfiles> {
    let path = LaunchProfiles::locate(request.profiles_path.as_deref());
    let required = request.profiles_path.is_some() || request.profile.is_some();
    if !required && !path.exists() {
        tracing::debug!(path = %path.display(), "no launch profile file; using run arguments only");
        return Ok(LaunchProfiles::default());
    }
    Ok(LaunchProfiles::from_path(&path)?)
}

/// Profile args first, then the request's run args, so the command line wins.
pub fn merged_args(profile: Option<&LaunchProfile>, run_args: &[String]) -> Vec<String> {
    profile
        .map(|p| p.args.clone())
        .unwrap_or_default()
        .into_iter()
        .chain(run_args.iter().cloned())
        .collect()
}

pub fn prepare(request: &LaunchRequest) -> anyhow::Result<PreparedRun> {
    let profiles = load_profiles(request)?;
    let profile = profiles.select(request.profile.as_deref())?;
    if let Some(p) = profile {
        tracing::info!(profile = %p.name, script = %p.script.display(), "using launch profile");
    }

    let config = resolve_argv(merged_args(profile, &request.run_args))?;

    let mut engine = match (profile, &request.script) {
        (_, Some(script)) => profile
            .map(ScriptEngine::from_profile)
            .unwrap_or_else(|| ScriptEngine::new(profiles.default_program(), script))
            .with_script(script),
        (Some(p), None) => ScriptEngine::from_profile(p),
        (None, None) => anyhow::bail!("no training script; pass --script or select a --profile"),
    };
    if let Some(program) = &request.program {
        engine = engine.with_program(program);
    }

    Ok(PreparedRun {
        profile: profile.map(|p| p.name.clone()),
        config,
        engine,
    })
}
