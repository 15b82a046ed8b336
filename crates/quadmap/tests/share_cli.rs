use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use params::ParameterGroup;
use renderer::fractal;
use session::SessionCodec;
use tempfile::TempDir;

fn quadmap(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quadmap"))
        .env("QUADMAP_CONFIG_DIR", config_dir)
        .env_remove("QUADMAP_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run quadmap")
}

fn first_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn decode(token: &str) -> (ParameterGroup, ParameterGroup, Option<f64>) {
    let snapshot = SessionCodec::default()
        .decode(token)
        .expect("share printed a readable token");
    let mut params = fractal::simulation_group().unwrap();
    let mut view = fractal::view_group().unwrap();
    let time = snapshot.apply(&mut [
        (fractal::SIMULATION_GROUP, &mut params),
        (fractal::VIEW_GROUP, &mut view),
    ]);
    (params, view, time)
}

#[test]
fn share_encodes_assignments() {
    let root = TempDir::new().unwrap();
    let output = quadmap(
        root.path(),
        &[
            "share",
            "--set",
            "params.iterations=20",
            "--set",
            "view.colormap=green",
            "--time",
            "3.5",
        ],
    );
    assert!(output.status.success(), "{output:?}");

    let (params, view, time) = decode(&first_line(&output));
    assert_eq!(params.integer(fractal::ITERATIONS), Some(20));
    assert_eq!(view.choice(fractal::COLORMAP), Some("green"));
    assert_eq!(time, Some(3.5));
}

#[test]
fn share_picks_up_config_defaults() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("quadmap.toml"),
        "version = 1\n[params]\nalpha = -3.0\n[session]\nshare_base = \"https://example.org/q/\"\n",
    )
    .unwrap();

    let output = quadmap(root.path(), &["share", "--no-time"]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let mut lines = stdout.lines();
    let token = lines.next().unwrap();
    assert_eq!(lines.next(), Some(format!("https://example.org/q/#{token}").as_str()));

    let (params, _, time) = decode(token);
    assert_eq!(params.number(fractal::ALPHA), Some(-3.0));
    assert_eq!(time, None);
}

#[test]
fn share_restores_a_session_before_editing() {
    let root = TempDir::new().unwrap();
    let first = quadmap(root.path(), &["share", "--set", "params.beta=7"]);
    let token = first_line(&first);

    let second = quadmap(
        root.path(),
        &["--session", &token, "share", "--set", "params.growth=1.5"],
    );
    assert!(second.status.success(), "{second:?}");
    let (params, _, _) = decode(&first_line(&second));
    assert_eq!(params.number(fractal::BETA), Some(7.0));
    assert_eq!(params.number(fractal::GROWTH), Some(1.5));
}

#[test]
fn invalid_assignment_fails() {
    let root = TempDir::new().unwrap();
    let output = quadmap(root.path(), &["share", "--set", "params.colormap=red"]);
    assert!(!output.status.success());
}

#[test]
fn invalid_config_fails() {
    let root = TempDir::new().unwrap();
    fs::write(root.path().join("quadmap.toml"), "version = 7\n").unwrap();
    let output = quadmap(root.path(), &["share"]);
    assert!(!output.status.success());
}

#[test]
fn where_reports_override_dir() {
    let root = TempDir::new().unwrap();
    let output = quadmap(root.path(), &["where"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(environment)"));
    assert!(stdout.contains("quadmap.toml"));
}
