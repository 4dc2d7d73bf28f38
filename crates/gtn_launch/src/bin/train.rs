use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use gtn_launch::{
    diagnostic, exit_code_for_error, load_profiles, prepare, DryRunEngine, LaunchExitCode,
    LaunchRequest, TrainingEngine,
};
use run_config::describe;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "train",
    about = "Resolve a graph-transform training run and hand it to the training script"
)]
struct TrainCli {
    /// Launch profile file (defaults to $GTN_LAUNCH_PROFILES, then ./launch-profiles.toml).
    #[arg(long)]
    profiles: Option<PathBuf>,
    /// Profile whose arguments are applied before the run arguments.
    #[arg(long, short = 'p')]
    profile: Option<String>,
    /// Interpreter used to run the training script (overrides the profile).
    #[arg(long)]
    program: Option<PathBuf>,
    /// Training entry-point script (overrides the profile).
    #[arg(long)]
    script: Option<PathBuf>,
    /// List the profiles in the profile file and exit.
    #[arg(long, default_value_t = false)]
    list_profiles: bool,
    /// Resolve and log the command without starting the training script.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Print the resolved configuration as JSON on stdout.
    #[arg(long, default_value_t = false)]
    print_json: bool,
    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Run arguments after `--`, e.g. `-- --dataset coco -a resnext50_32x4d_swsl -gtn`.
    #[arg(last = true, allow_hyphen_values = true)]
    run_args: Vec<String>,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: TrainCli) -> anyhow::Result<()> {
    let request = LaunchRequest {
        profiles_path: cli.profiles,
        profile: cli.profile,
        program: cli.program,
        script: cli.script,
        run_args: cli.run_args,
    };

    if cli.list_profiles {
        let profiles = load_profiles(&request)?;
        if profiles.is_empty() {
            eprintln!("no launch profiles defined");
        }
        for name in profiles.names() {
            let marker = if profiles.default_profile.as_deref() == Some(name) {
                " (default)"
            } else {
                ""
            };
            println!("{name}{marker}");
        }
        return Ok(());
    }

    let prepared = prepare(&request)?;
    tracing::info!(
        "resolved run configuration:\n{}",
        describe(&prepared.config).trim_end()
    );
    if cli.print_json {
        println!("{}", serde_json::to_string_pretty(&prepared.config)?);
    }

    if cli.dry_run {
        DryRunEngine::new(prepared.engine).launch(&prepared.config)
    } else {
        prepared.engine.launch(&prepared.config)
    }
}

fn main() -> ExitCode {
    let cli = TrainCli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => LaunchExitCode::Success.into(),
        Err(err) => {
            tracing::debug!(error = ?err, "launch failed");
            eprintln!("{}", diagnostic(&err));
            exit_code_for_error(&err).into()
        }
    }
}
