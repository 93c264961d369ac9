//! Integration test: startup and its failure modes.
//!
//! A failed `init` must leave the plugin inert: `starting` is rejected
//! and ticks write nothing.

use std::io::Write;
use std::time::Duration;

use super::*;
use gps_common::config::ConfigSource;
use gps_common::consts::DEFAULT_NAMESPACE;
use gps_common::state::{ChainGroup, LoopState};
use gps_control_unit::control_loop::ControlLoop;
use gps_control_unit::error::{ChainResolutionError, ConfigurationError, InitError};
use tempfile::NamedTempFile;

fn source(body: &str) -> TomlConfigSource {
    TomlConfigSource::from_toml_str(&format!("[GPSSuperchickPlugin]\n{body}")).unwrap()
}

fn init(body: &str) -> Result<(), InitError> {
    ControlLoop::new().init(&source(body), DEFAULT_NAMESPACE, &robot())
}

#[test]
fn init_resolves_both_chains() {
    let mut plugin = PluginAdapter::new(robot());
    assert!(plugin.init(&params(50)));
    let lp = plugin.control();
    assert_eq!(lp.state(), LoopState::Ready);

    let chains = lp.chains().unwrap();
    assert_eq!(chains.get(ChainGroup::Active).joint_names(), ["a1", "a2"]);
    assert_eq!(chains.get(ChainGroup::Passive).joint_names(), ["p1"]);
    assert_eq!(chains.joint_count(), 3);
    assert_eq!(lp.sensor_count(), 1);
    assert_eq!(
        lp.position_controller(ChainGroup::Active).unwrap().target(),
        &[0.5, -0.25]
    );
}

#[test]
fn unreachable_tip_fails_init() {
    let err = init(
        r#"
base_group = "base_link"
head_name = "elbow"
right_name = "right"
"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        InitError::ChainResolution(ChainResolutionError::NoPath { .. })
    ));
}

#[test]
fn tip_above_root_fails_init() {
    // `world` lies above `base_link`; there is no downward path.
    let err = init(
        r#"
base_group = "base_link"
head_name = "world"
right_name = "right"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, InitError::ChainResolution(_)));
}

#[test]
fn missing_required_key_fails_init() {
    let err = init(
        r#"
base_group = "base_link"
head_name = "head"
"#,
    )
    .unwrap_err();
    match err {
        InitError::Configuration(ConfigurationError::MissingKey(key)) => {
            assert_eq!(key, "/GPSSuperchickPlugin/right_name");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn joint_name_list_must_match_chain() {
    let err = init(
        r#"
base_group = "base_link"
head_name = "head"
right_name = "right"
active_arm_joint_name_1 = "a2"
active_arm_joint_name_2 = "a1"
"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        InitError::ChainResolution(ChainResolutionError::JointNameMismatch { index: 0, .. })
    ));
}

/// `base_link ─shared─ l1 ─a─ head`, `l1 ─p─ right`
const BRANCHED_ROBOT_TOML: &str = r#"
[[joints]]
name = "shared"
parent = "base_link"
child = "l1"

[[joints]]
name = "a"
parent = "l1"
child = "head"

[[joints]]
name = "p"
parent = "l1"
child = "right"
"#;

#[test]
fn chains_sharing_a_joint_fail_init() {
    let robot = SimRobot::from_toml_str(BRANCHED_ROBOT_TOML).unwrap();
    let mut plugin = PluginAdapter::new(robot);
    let src = source(
        r#"
base_group = "base_link"
head_name = "head"
right_name = "right"
controller_step_length = 1
"#,
    );

    let err = ControlLoop::new()
        .init(&src, DEFAULT_NAMESPACE, plugin.robot())
        .unwrap_err();
    match err {
        InitError::ChainResolution(ChainResolutionError::OverlappingChains { joint }) => {
            assert_eq!(joint, "shared");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(!plugin.init(&src));
    plugin.starting();
    assert!(!step(&mut plugin).ran);
    let r = plugin.robot();
    for name in ["shared", "a", "p"] {
        assert_eq!(r.write_count(handle(r, name)), 0);
    }
}

#[test]
fn zero_step_length_is_rejected() {
    let err = init(
        r#"
base_group = "base_link"
head_name = "head"
right_name = "right"
controller_step_length = 0
"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        InitError::Configuration(ConfigurationError::InvalidValue { .. })
    ));
}

#[test]
fn failed_init_ignores_starting_and_update() {
    let mut plugin = PluginAdapter::new(robot());
    let bad = source(
        r#"
base_group = "base_link"
head_name = "nowhere"
right_name = "right"
"#,
    );
    assert!(!plugin.init(&bad));
    plugin.starting();
    for k in 1..=10 {
        let out = plugin.tick(Duration::from_millis(k));
        assert!(!out.ran);
    }
    assert_eq!(plugin.control().state(), LoopState::Uninitialized);
    let r = plugin.robot();
    for name in ["a1", "a2", "p1"] {
        assert_eq!(r.write_count(handle(r, name)), 0);
    }
}

#[test]
fn custom_namespace_is_honoured() {
    let src = TomlConfigSource::from_toml_str(
        r#"
[lab.rig]
base_group = "base_link"
head_name = "head"
right_name = "right"
controller_step_length = 3
"#,
    )
    .unwrap();
    assert_eq!(
        src.get_u64("/lab/rig/controller_step_length").unwrap(),
        Some(3)
    );

    let mut plugin = PluginAdapter::with_namespace(robot(), "/lab/rig");
    assert!(plugin.init(&src));
    assert_eq!(plugin.control().counter().unwrap().step_length(), 3);

    let mut default_ns = PluginAdapter::new(robot());
    assert!(!default_ns.init(&src));
}

#[test]
fn files_on_disk_drive_a_session() {
    let mut robot_file = NamedTempFile::new().unwrap();
    write!(robot_file, "{ROBOT_TOML}").unwrap();
    robot_file.flush().unwrap();

    let mut params_file = NamedTempFile::new().unwrap();
    write!(
        params_file,
        r#"
[GPSSuperchickPlugin]
base_group = "base_link"
head_name = "head"
right_name = "right"
controller_step_length = 2
"#
    )
    .unwrap();
    params_file.flush().unwrap();

    let robot = SimRobot::load(robot_file.path()).unwrap();
    assert_eq!(robot.name(), "test_rig");
    let src = TomlConfigSource::from_file(params_file.path()).unwrap();

    let mut plugin = PluginAdapter::new(robot);
    assert!(plugin.init(&src));
    plugin.starting();
    let steps: Vec<bool> = (0..4).map(|_| step(&mut plugin).control_step).collect();
    assert_eq!(steps, vec![false, true, false, true]);
    plugin.stopping();
    assert_eq!(plugin.control().state(), LoopState::Stopped);
}

#[test]
fn shipped_config_files_load() {
    use gps_control_unit::control::lin_gauss::LinearGaussianController;
    use std::path::Path;

    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config");
    let robot = SimRobot::load(&dir.join("robot.toml")).unwrap();
    let src = TomlConfigSource::from_file(&dir.join("plugin.toml")).unwrap();
    let trial = LinearGaussianController::load(&dir.join("trial_pd.toml")).unwrap();
    assert_eq!(trial.action_dim(), 3);

    let mut plugin = PluginAdapter::new(robot);
    assert!(plugin.init(&src));
    assert_eq!(
        plugin.control().chains().unwrap().get(ChainGroup::Active).len(),
        trial.action_dim()
    );
    plugin.control_mut().attach_trial_controller(Box::new(trial));
    plugin.starting();
    for _ in 0..500 {
        assert!(step(&mut plugin).ran);
    }
    assert!(efforts_finite(&plugin));
}

fn efforts_finite(plugin: &PluginAdapter<SimRobot>) -> bool {
    let r = plugin.robot();
    ["base_bladder", "neck_pitch", "head_roll", "right_bladder", "right_wrist"]
        .iter()
        .all(|n| r.commanded_effort(handle(r, n)).is_some_and(f64::is_finite))
}
