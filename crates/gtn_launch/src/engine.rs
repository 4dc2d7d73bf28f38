//! Handoff of a resolved [`RunConfig`] to the external training engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use run_config::RunConfig;

use crate::profiles::LaunchProfile;

/// Consumer of a resolved run configuration.
pub trait TrainingEngine {
    fn launch(&self, config: &RunConfig) -> anyhow::Result<()>;
}

/// Runs a training script as a child process: `<program> <script> <flags...>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEngine {
    program: PathBuf,
    script: PathBuf,
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ScriptEngine {
    pub fn new(program: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            working_dir: None,
            env: BTreeMap::new(),
        }
    }

    pub fn from_profile(profile: &LaunchProfile) -> Self {
        Self {
            program: profile.program.clone(),
            script: profile.script.clone(),
            working_dir: profile.working_dir.clone(),
            env: profile.env.clone(),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = script.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Full argv of the child process.
    pub fn command_line(&self, config: &RunConfig) -> Vec<String> {
        let mut argv = vec![
            self.program.display().to_string(),
            self.script.display().to_string(),
        ];
        argv.extend(config.to_args());
        argv
    }

    /// Shell rendering of the child invocation, env assignments first.
    pub fn render(&self, config: &RunConfig) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(key, val)| format!("{key}=\"{val}\""))
            .collect();
        parts.extend(self.command_line(config).iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }

    fn command(&self, config: &RunConfig) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.script).args(config.to_args()).envs(&self.env);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl TrainingEngine for ScriptEngine {
    fn launch(&self, config: &RunConfig) -> anyhow::Result<()> {
        tracing::info!(
            run = %config.run_name(),
            command = %self.render(config),
            "launching training script"
        );
        let status = self
            .command(config)
            .status()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        if !status.success() {
            anyhow::bail!(
                "training script {} exited with {status}",
                self.script.display()
            );
        }
        tracing::info!(run = %config.run_name(), "training script finished");
        Ok(())
    }
}

/// Logs the command a [`ScriptEngine`] would run, without running it.
#[derive(Debug, Clone)]
pub struct DryRunEngine {
    inner: ScriptEngine,
}

impl DryRunEngine {
    pub fn new(inner: ScriptEngine) -> Self {
        Self { inner }
    }
}

impl TrainingEngine for DryRunEngine {
    fn launch(&self, config: &RunConfig) -> anyhow::Result<()> {
        tracing::info!(command = %self.inner.render(config), "dry run; training script not started");
        Ok(())
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,@%+".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
