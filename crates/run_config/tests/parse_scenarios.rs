use std::fs;
use std::path::{Path, PathBuf};

use run_config::{
    keys, parse, Architecture, ConfigError, ConfigErrorKind, Dataset, Method, RawArgs, RawValue,
};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("data")).expect("data dir");
        fs::create_dir_all(root.join("metadata")).expect("metadata dir");
        for file in ["embedding.pkl", "a.pkl", "b.pkl", "weights.pth"] {
            fs::write(root.join(file), b"x").expect("write fixture file");
        }
        Self { _dir: dir, root }
    }

    fn path(&self, name: &str) -> String {
        self.root.join(name).display().to_string()
    }

    /// The COCO training scenario: GTN branch on two adjacency orders, two devices.
    fn coco_args(&self) -> RawArgs {
        RawArgs::new()
            .with(keys::DATA_DIR, self.path("data"))
            .with(keys::METADATA_DIR, self.path("metadata"))
            .with(keys::DATASET, "coco")
            .with(keys::IMAGE_SIZE, "448")
            .with(keys::BATCH_SIZE, "80")
            .with(keys::LEARNING_RATE, "0.03")
            .with(keys::WORKERS, "8")
            .with(keys::EMBEDDING_PATH, self.path("embedding.pkl"))
            .with(
                keys::ADJACENCY_PATHS,
                vec![self.path("a.pkl"), self.path("b.pkl")],
            )
            .with(keys::USE_GRAPH_TRANSFORM, "true")
            .with(keys::ARCHITECTURE, "resnext50_32x4d_swsl")
            .with(keys::DEVICE_IDS, vec!["0", "1"])
            .with(keys::RUN_NAME, "coco-gtn")
    }
}

fn assert_invariant(err: ConfigError, key: &str) {
    assert_eq!(err.kind(), ConfigErrorKind::InvariantViolation, "{err}");
    assert_eq!(err.key(), key);
}

#[test]
fn coco_scenario_resolves() {
    let fx = Fixture::new();
    let cfg = parse(&fx.coco_args()).expect("valid config");

    assert_eq!(cfg.dataset(), Dataset::Coco);
    assert_eq!(cfg.image_size(), 448);
    assert_eq!(cfg.batch_size(), 80);
    assert_eq!(cfg.learning_rate(), 0.03);
    assert_eq!(cfg.workers(), 8);
    assert_eq!(
        cfg.adjacency_paths(),
        &[fx.root.join("a.pkl"), fx.root.join("b.pkl")]
    );
    assert!(cfg.use_graph_transform());
    assert!(!cfg.use_graph());
    assert_eq!(cfg.architecture(), Architecture::Resnext50Swsl);
    assert_eq!(cfg.device_ids(), &[0, 1]);
    assert_eq!(cfg.num_classes(), 80);
}

#[test]
fn defaults_apply_when_optional_keys_absent() {
    let fx = Fixture::new();
    let args = fx.coco_args().without(keys::WORKERS);
    let cfg = parse(&args).expect("valid config");

    assert_eq!(cfg.workers(), 0);
    assert_eq!(cfg.learning_rate_decay(), 0.1);
    assert_eq!(cfg.epoch_step(), 30);
    assert_eq!(cfg.adjacency_threshold(), 0.4);
    assert_eq!(cfg.method(), Method::GradCam);
    assert!(!cfg.tracking_enabled());
    assert!(!cfg.pretrained());
    assert!(cfg.pretrained_path().is_none());
    assert!(!cfg.large_feature_map());
    assert!(cfg.acol_drop_threshold().is_none());
    assert!(cfg.adl_drop_rate().is_none());
    assert!(cfg.adl_drop_threshold().is_none());
}

#[test]
fn parse_is_idempotent() {
    let fx = Fixture::new();
    let args = fx.coco_args();
    let first = parse(&args).expect("first parse");
    let second = parse(&args).expect("second parse");
    assert_eq!(first, second);
}

#[test]
fn empty_adjacency_with_graph_transform_is_rejected() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::ADJACENCY_PATHS, Vec::<String>::new());
    assert_invariant(parse(&args).unwrap_err(), keys::ADJACENCY_PATHS);
}

#[test]
fn empty_adjacency_with_label_graph_is_rejected() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .without(keys::ADJACENCY_PATHS)
        .without(keys::USE_GRAPH_TRANSFORM)
        .with(keys::USE_GRAPH, "true");
    assert_invariant(parse(&args).unwrap_err(), keys::ADJACENCY_PATHS);
}

#[test]
fn empty_adjacency_without_graph_features_is_accepted() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .without(keys::ADJACENCY_PATHS)
        .without(keys::USE_GRAPH_TRANSFORM);
    let cfg = parse(&args).expect("graph features off");
    assert!(cfg.adjacency_paths().is_empty());
}

#[test]
fn unsupported_dataset_is_unknown_enum_value() {
    let fx = Fixture::new();
    let args = fx.coco_args().with(keys::DATASET, "imagenet");
    let err = parse(&args).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::UnknownEnumValue);
    assert_eq!(err.key(), keys::DATASET);
    match err {
        ConfigError::UnknownEnumValue { raw, allowed, .. } => {
            assert_eq!(raw, "imagenet");
            assert_eq!(allowed, vec!["coco".to_string(), "voc".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unsupported_architecture_is_unknown_enum_value() {
    let fx = Fixture::new();
    let args = fx.coco_args().with(keys::ARCHITECTURE, "vgg16");
    let err = parse(&args).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::UnknownEnumValue);
    assert_eq!(err.key(), keys::ARCHITECTURE);
}

#[test]
fn architecture_alias_and_casing_are_accepted() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::ARCHITECTURE, "resnext50")
        .with(keys::DATASET, "VOC");
    let cfg = parse(&args).expect("alias accepted");
    assert_eq!(cfg.architecture(), Architecture::Resnext50);
    assert_eq!(cfg.dataset(), Dataset::Voc);
    assert_eq!(cfg.num_classes(), 20);
}

#[test]
fn duplicate_device_ids_are_rejected() {
    let fx = Fixture::new();
    let args = fx.coco_args().with(keys::DEVICE_IDS, vec!["0", "0"]);
    assert_invariant(parse(&args).unwrap_err(), keys::DEVICE_IDS);
}

#[test]
fn empty_device_list_is_rejected() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::DEVICE_IDS, Vec::<String>::new());
    assert_invariant(parse(&args).unwrap_err(), keys::DEVICE_IDS);
}

#[test]
fn single_device_id_is_a_one_element_list() {
    let fx = Fixture::new();
    let args = fx.coco_args().with(keys::DEVICE_IDS, "3");
    let cfg = parse(&args).expect("single device");
    assert_eq!(cfg.device_ids(), &[3]);
}

#[test]
fn missing_required_keys_are_named() {
    let fx = Fixture::new();
    for key in [
        keys::DATA_DIR,
        keys::METADATA_DIR,
        keys::DATASET,
        keys::IMAGE_SIZE,
        keys::BATCH_SIZE,
        keys::LEARNING_RATE,
        keys::EMBEDDING_PATH,
        keys::ARCHITECTURE,
        keys::DEVICE_IDS,
        keys::RUN_NAME,
    ] {
        let err = parse(&fx.coco_args().without(key)).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::MissingField, "{key}: {err}");
        assert_eq!(err.key(), key);
    }
}

#[test]
fn coercion_failures_name_key_and_raw_value() {
    let fx = Fixture::new();
    let cases = [
        (keys::IMAGE_SIZE, "large"),
        (keys::BATCH_SIZE, "-4"),
        (keys::LEARNING_RATE, "fast"),
        (keys::WORKERS, "2.5"),
        (keys::USE_GRAPH_TRANSFORM, "maybe"),
    ];
    for (key, value) in cases {
        let err = parse(&fx.coco_args().with(key, value)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Coercion {
                key: key.to_string(),
                raw: value.to_string(),
                expected: match key {
                    k if k == keys::LEARNING_RATE => "a number",
                    k if k == keys::USE_GRAPH_TRANSFORM => "a boolean",
                    _ => "a non-negative integer",
                },
            }
        );
    }
}

#[test]
fn non_numeric_device_id_is_a_coercion_error() {
    let fx = Fixture::new();
    let args = fx.coco_args().with(keys::DEVICE_IDS, vec!["0", "cuda:1"]);
    let err = parse(&args).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::CoercionError);
    assert_eq!(err.key(), keys::DEVICE_IDS);
}

#[test]
fn list_for_scalar_key_is_a_coercion_error() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::IMAGE_SIZE, RawValue::List(vec!["224".into(), "448".into()]));
    let err = parse(&args).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::CoercionError);
    assert_eq!(err.key(), keys::IMAGE_SIZE);
}

#[test]
fn unknown_key_is_rejected() {
    let fx = Fixture::new();
    let args = fx.coco_args().with("momentum", "0.9");
    let err = parse(&args).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownKey {
            key: "momentum".into()
        }
    );
}

#[test]
fn zero_sizes_violate_positivity() {
    let fx = Fixture::new();
    for key in [keys::IMAGE_SIZE, keys::BATCH_SIZE, keys::EPOCH_STEP] {
        let err = parse(&fx.coco_args().with(key, "0")).unwrap_err();
        assert_invariant(err, key);
    }
}

#[test]
fn zero_workers_means_synchronous_loading() {
    let fx = Fixture::new();
    let cfg = parse(&fx.coco_args().with(keys::WORKERS, "0")).expect("zero workers");
    assert_eq!(cfg.workers(), 0);
}

#[test]
fn rates_outside_their_ranges_are_rejected() {
    let fx = Fixture::new();
    let cases = [
        (keys::LEARNING_RATE, "0"),
        (keys::LEARNING_RATE, "NaN"),
        (keys::LEARNING_RATE_DECAY, "0"),
        (keys::LEARNING_RATE_DECAY, "1.5"),
        (keys::ADJACENCY_THRESHOLD, "-0.2"),
    ];
    for (key, value) in cases {
        assert_invariant(parse(&fx.coco_args().with(key, value)).unwrap_err(), key);
    }
    let cfg = parse(&fx.coco_args().with(keys::LEARNING_RATE_DECAY, "1")).expect("decay of 1");
    assert_eq!(cfg.learning_rate_decay(), 1.0);
}

#[test]
fn blank_run_name_is_rejected() {
    let fx = Fixture::new();
    assert_invariant(
        parse(&fx.coco_args().with(keys::RUN_NAME, "   ")).unwrap_err(),
        keys::RUN_NAME,
    );
}

#[test]
fn method_must_match_architecture() {
    let fx = Fixture::new();
    let args = fx.coco_args().with(keys::METHOD, "acol");
    assert_invariant(parse(&args).unwrap_err(), keys::METHOD);

    let args = fx
        .coco_args()
        .with(keys::ARCHITECTURE, "resnet101")
        .with(keys::METHOD, "addgraph_cam");
    let cfg = parse(&args).expect("resnet101 supports addgraph_cam");
    assert_eq!(cfg.method(), Method::AddGraphCam);
}

#[test]
fn graph_methods_need_adjacency_files() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .without(keys::USE_GRAPH_TRANSFORM)
        .without(keys::ADJACENCY_PATHS)
        .with(keys::METHOD, "graph_cam");
    assert_invariant(parse(&args).unwrap_err(), keys::ADJACENCY_PATHS);
}

#[test]
fn missing_paths_are_reported_last() {
    let fx = Fixture::new();
    let missing = fx.path("nope.pkl");
    let args = fx
        .coco_args()
        .with(keys::ADJACENCY_PATHS, vec![fx.path("a.pkl"), missing.clone()]);
    let err = parse(&args).unwrap_err();
    assert_eq!(
        err,
        ConfigError::PathNotFound {
            key: keys::ADJACENCY_PATHS.to_string(),
            path: PathBuf::from(&missing),
        }
    );

    // A structural error wins over a missing path.
    let args = fx
        .coco_args()
        .with(keys::DATA_DIR, fx.path("missing-data"))
        .with(keys::DEVICE_IDS, vec!["1", "1"]);
    assert_invariant(parse(&args).unwrap_err(), keys::DEVICE_IDS);
}

#[test]
fn each_path_field_is_checked() {
    let fx = Fixture::new();
    for key in [
        keys::DATA_DIR,
        keys::METADATA_DIR,
        keys::EMBEDDING_PATH,
        keys::PRETRAINED_PATH,
    ] {
        let args = fx
            .coco_args()
            .with(keys::PRETRAINED, "true")
            .with(key, fx.path("absent"));
        let err = parse(&args).unwrap_err();
        assert_eq!(err.kind(), ConfigErrorKind::PathNotFound, "{key}");
        assert_eq!(err.key(), key);
    }
}

#[test]
fn pretrained_weights_path_is_kept() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::PRETRAINED, "true")
        .with(keys::PRETRAINED_PATH, fx.path("weights.pth"));
    let cfg = parse(&args).expect("pretrained path exists");
    assert!(cfg.pretrained());
    assert_eq!(
        cfg.pretrained_path(),
        Some(Path::new(&fx.path("weights.pth")))
    );
}

#[test]
fn pretrained_path_needs_pretrained_loading() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::PRETRAINED_PATH, fx.path("weights.pth"));
    assert_invariant(parse(&args).unwrap_err(), keys::PRETRAINED_PATH);

    let cfg = parse(&fx.coco_args().with(keys::PRETRAINED, "true")).expect("download weights");
    assert!(cfg.pretrained());
    assert!(cfg.pretrained_path().is_none());
}

#[test]
fn acol_needs_its_drop_threshold() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::ARCHITECTURE, "resnet50")
        .with(keys::METHOD, "acol");
    assert_invariant(parse(&args).unwrap_err(), keys::ACOL_DROP_THRESHOLD);

    let cfg = parse(&args.with(keys::ACOL_DROP_THRESHOLD, "0.8")).expect("acol configured");
    assert_eq!(cfg.method(), Method::Acol);
    assert_eq!(cfg.acol_drop_threshold(), Some(0.8));
}

#[test]
fn adl_needs_rate_and_threshold() {
    let fx = Fixture::new();
    let args = fx
        .coco_args()
        .with(keys::ARCHITECTURE, "resnet50")
        .with(keys::METHOD, "adl");
    assert_invariant(parse(&args).unwrap_err(), keys::ADL_DROP_RATE);

    let args = args.with(keys::ADL_DROP_RATE, "0.75");
    assert_invariant(parse(&args).unwrap_err(), keys::ADL_DROP_THRESHOLD);

    let cfg = parse(&args.with(keys::ADL_DROP_THRESHOLD, "0.9")).expect("adl configured");
    assert_eq!(cfg.adl_drop_rate(), Some(0.75));
    assert_eq!(cfg.adl_drop_threshold(), Some(0.9));
}

#[test]
fn drop_parameters_lie_in_the_unit_interval() {
    let fx = Fixture::new();
    for key in [
        keys::ACOL_DROP_THRESHOLD,
        keys::ADL_DROP_RATE,
        keys::ADL_DROP_THRESHOLD,
    ] {
        for value in ["0", "1.5"] {
            assert_invariant(parse(&fx.coco_args().with(key, value)).unwrap_err(), key);
        }
    }
    let err = parse(&fx.coco_args().with(keys::ADL_DROP_RATE, "high")).unwrap_err();
    assert_eq!(err.kind(), ConfigErrorKind::CoercionError);
}

#[test]
fn large_feature_map_is_a_switch() {
    let fx = Fixture::new();
    let cfg = parse(&fx.coco_args().with(keys::LARGE_FEATURE_MAP, "true")).expect("switch on");
    assert!(cfg.large_feature_map());
}

#[test]
fn empty_string_is_not_a_boolean() {
    let fx = Fixture::new();
    let err = parse(&fx.coco_args().with(keys::USE_GRAPH_TRANSFORM, "")).unwrap_err();
    assert_eq!(
        err,
        ConfigError::Coercion {
            key: keys::USE_GRAPH_TRANSFORM.to_string(),
            raw: String::new(),
            expected: "a boolean",
        }
    );
}

#[test]
fn concurrent_parses_agree() {
    let fx = Fixture::new();
    let expected = parse(&fx.coco_args()).expect("baseline");
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let args = fx.coco_args();
                scope.spawn(move || parse(&args))
            })
            .collect();
        for handle in handles {
            let cfg = handle.join().expect("thread").expect("parse");
            assert_eq!(cfg, expected);
        }
    });
}
