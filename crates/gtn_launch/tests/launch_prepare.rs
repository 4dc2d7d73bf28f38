use std::fs;
use std::path::{Path, PathBuf};

use gtn_launch::{
    diagnostic, exit_code_for_error, merged_args, prepare, LaunchExitCode, LaunchProfiles,
    LaunchRequest,
};

/// Temp tree with data, metadata, embedding and adjacency files plus a profile file.
fn workspace(root: &Path) -> PathBuf {
    for dir in ["data", "meta"] {
        fs::create_dir_all(root.join(dir)).expect("create dir");
    }
    for file in ["emb.pkl", "adj1.pkl", "adj2.pkl"] {
        fs::write(root.join(file), b"0").expect("write fixture file");
    }
    let p = |name: &str| root.join(name).display().to_string();
    let profiles = format!(
        r#"
[[profile]]
name = "coco"
script = "main_coco.py"
args = [
    "--data-dir", "{data}", "--metadata-dir", "{meta}", "--dataset", "coco",
    "--image-size", "448", "--batch-size", "80", "--lr", "0.03", "--workers", "8",
    "--embedding", "{emb}", "--adj-files", "{adj1}", "{adj2}",
    "-a", "resnext50_32x4d_swsl", "-gtn", "--device_ids", "0", "1", "-n", "coco-gtn",
]
"#,
        data = p("data"),
        meta = p("meta"),
        emb = p("emb.pkl"),
        adj1 = p("adj1.pkl"),
        adj2 = p("adj2.pkl"),
    );
    let path = root.join("launch-profiles.toml");
    fs::write(&path, profiles).expect("write profiles");
    path
}

fn request(profiles: PathBuf, run_args: &[&str]) -> LaunchRequest {
    LaunchRequest {
        profiles_path: Some(profiles),
        profile: Some("coco".into()),
        run_args: run_args.iter().map(|s| s.to_string()).collect(),
        ..LaunchRequest::default()
    }
}

#[test]
fn profile_resolves_and_selects_script() {
    let dir = tempfile::tempdir().expect("tempdir");
    let prepared = prepare(&request(workspace(dir.path()), &[])).expect("prepare");
    assert_eq!(prepared.profile.as_deref(), Some("coco"));
    assert_eq!(prepared.config.batch_size(), 80);
    assert_eq!(prepared.config.adjacency_paths().len(), 2);
    assert_eq!(prepared.engine.script(), Path::new("main_coco.py"));
}

#[test]
fn run_args_override_profile_args() {
    let dir = tempfile::tempdir().expect("tempdir");
    let req = request(
        workspace(dir.path()),
        &["-b", "16", "--device_ids", "2", "-n", "coco-small"],
    );
    let prepared = prepare(&req).expect("prepare");
    assert_eq!(prepared.config.batch_size(), 16);
    assert_eq!(prepared.config.device_ids(), &[2]);
    assert_eq!(prepared.config.run_name(), "coco-small");
}

#[test]
fn script_and_program_flags_override_profile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut req = request(workspace(dir.path()), &[]);
    req.script = Some("train_gtn.py".into());
    req.program = Some("python3".into());
    let prepared = prepare(&req).expect("prepare");
    assert_eq!(prepared.engine.script(), Path::new("train_gtn.py"));
    assert_eq!(prepared.engine.program(), Path::new("python3"));
}

#[test]
fn invalid_override_maps_to_config_exit_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let req = request(workspace(dir.path()), &["--adj-files"]);
    let err = prepare(&req).unwrap_err();
    assert_eq!(exit_code_for_error(&err), LaunchExitCode::InvalidConfig);
    assert_eq!(
        diagnostic(&err),
        "error: adjacency_paths: InvariantViolation: invariant failed for `adjacency_paths`: \
         graph transform branch requires at least one adjacency file"
    );
}

#[test]
fn unsupported_dataset_diagnostic_names_field_and_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let req = request(workspace(dir.path()), &["--dataset", "imagenet"]);
    let err = prepare(&req).unwrap_err();
    assert_eq!(exit_code_for_error(&err), LaunchExitCode::InvalidConfig);
    assert!(diagnostic(&err).starts_with("error: dataset: UnknownEnumValue: "));
}

#[test]
fn unknown_profile_is_an_engine_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut req = request(workspace(dir.path()), &[]);
    req.profile = Some("voc".into());
    let err = prepare(&req).unwrap_err();
    assert_eq!(exit_code_for_error(&err), LaunchExitCode::EngineFailure);
    assert!(diagnostic(&err).contains("unknown profile `voc`"));
}

#[test]
fn no_script_without_profile_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let profiles = LaunchProfiles::from_path(&workspace(dir.path())).expect("profiles");
    let run_args = profiles.profile("coco").expect("coco").args.clone();
    let req = LaunchRequest {
        run_args,
        ..LaunchRequest::default()
    };
    let err = prepare(&req).unwrap_err();
    assert_eq!(exit_code_for_error(&err), LaunchExitCode::EngineFailure);
    assert!(err.to_string().contains("no training script"));
}

#[test]
fn script_without_profile_uses_file_default_program() {
    let dir = tempfile::tempdir().expect("tempdir");
    let coco_profiles = workspace(dir.path());
    let run_args = LaunchProfiles::from_path(&coco_profiles)
        .expect("profiles")
        .profile("coco")
        .expect("coco")
        .args
        .clone();
    let body = fs::read_to_string(&coco_profiles).expect("read profiles");
    let path = dir.path().join("python3-profiles.toml");
    fs::write(&path, format!("[defaults]\nprogram = \"python3\"\n{body}")).expect("write");

    let req = LaunchRequest {
        profiles_path: Some(path),
        script: Some("main_coco.py".into()),
        run_args,
        ..LaunchRequest::default()
    };
    let prepared = prepare(&req).expect("prepare");
    assert!(prepared.profile.is_none());
    assert_eq!(prepared.engine.program(), Path::new("python3"));
    assert_eq!(prepared.engine.script(), Path::new("main_coco.py"));
}

#[test]
fn empty_request_fails_resolution() {
    let err = prepare(&LaunchRequest::default()).unwrap_err();
    assert_eq!(exit_code_for_error(&err), LaunchExitCode::InvalidConfig);
    assert!(diagnostic(&err).starts_with("error: data_dir: MissingField: "));
}

#[test]
fn merged_args_put_profile_first() {
    let dir = tempfile::tempdir().expect("tempdir");
    let profiles = LaunchProfiles::from_path(&workspace(dir.path())).expect("profiles");
    let coco = profiles.profile("coco").expect("coco");
    let merged = merged_args(Some(coco), &["-b".to_string(), "16".to_string()]);
    assert_eq!(&merged[..coco.args.len()], coco.args.as_slice());
    assert_eq!(&merged[coco.args.len()..], &["-b".to_string(), "16".to_string()]);
    assert_eq!(merged_args(None, &["-gtn".to_string()]), vec!["-gtn".to_string()]);
}

#[test]
fn exit_codes_are_stable() {
    assert_eq!(i32::from(LaunchExitCode::Success), 0);
    assert_eq!(i32::from(LaunchExitCode::EngineFailure), 1);
    assert_eq!(i32::from(LaunchExitCode::InvalidConfig), 2);
}
