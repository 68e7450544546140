//! End-to-end pipeline tests.
//!
//! Sources are zip archives served by a mock HTTP server; build commands
//! are shell stubs, so no network or toolchain is needed.

mod common;

use common::*;
use pkg_recipe::executor::StaticResolver;
use pkg_recipe::{Context, ExecuteError, Executor, PackageStore, Phase};

#[tokio::test]
async fn test_catui_end_to_end() {
    let server = serve_zip(&[("catui-0.1.3/package.json", "{}")]).await;
    let env = TestEnv::new();
    let recipe = fixture(CATUI_STUB, &server.uri());

    let resolver = StaticResolver::new()
        .with("msgstream", env.dep_root("msgstream"))
        .with("unixsocket", env.dep_root("unixsocket"))
        .with("cjson", env.dep_root("cjson"));
    let executor = Executor::new(Context::new(&env.work, &env.package)).with_resolver(resolver);

    let execution = executor.execute(&recipe).unwrap();

    assert_eq!(execution.phases, Phase::ALL);
    assert_eq!(files_under(&env.package), ["include/foo.h", "lib/libcatui.dylib"]);
    assert_eq!(execution.info.libs, ["catui"]);
    assert_eq!(Executor::describe_package_info(&recipe).libs, ["catui"]);

    let pc_dir = env.work.join("catui/pkgconfig");
    assert_eq!(
        execution.config_files,
        [
            pc_dir.join("msgstream.pc"),
            pc_dir.join("unixsocket.pc"),
            pc_dir.join("libcjson.pc"),
        ]
    );
    let cjson = std::fs::read_to_string(pc_dir.join("libcjson.pc")).unwrap();
    assert!(cjson.contains("Version: 1.7.16"));
}

#[tokio::test]
async fn test_zero_dependencies_writes_no_config() {
    let server = serve_zip(&[("plain-1.0.0/README", "plain")]).await;
    let env = TestEnv::new();
    let recipe = fixture(NO_DEPS, &server.uri());

    let executor = Executor::new(Context::new(&env.work, &env.package));
    let declared = executor.declare_dependencies(&recipe.deps);
    assert!(declared.is_empty());

    let execution = executor.execute(&recipe).unwrap();
    assert!(execution.config_files.is_empty());
    assert!(!execution.source_dir.join("pkgconfig").exists());
    assert_eq!(files_under(&env.package), ["include/plain.h"]);
}

#[tokio::test]
async fn test_rerun_reuses_downloaded_source() {
    let server = serve_zip(&[("plain-1.0.0/README", "plain")]).await;
    let env = TestEnv::new();
    let recipe = fixture(NO_DEPS, &server.uri());
    let executor = Executor::new(Context::new(&env.work, &env.package));

    let first = executor.execute(&recipe).unwrap();
    let second = executor.execute(&recipe).unwrap();

    assert_eq!(first.source_dir, second.source_dir);
    assert_eq!(second.phases, Phase::ALL);
    assert_eq!(files_under(&env.package), ["include/plain.h"]);
}

#[tokio::test]
async fn test_build_output_reaches_caller() {
    let server = serve_zip(&[("plain-1.0.0/README", "plain")]).await;
    let env = TestEnv::new();
    let mut recipe = fixture(NO_DEPS, &server.uri());
    recipe.build.commands.insert(0, "echo configuring {name} {version}".to_string());

    let executor = Executor::new(Context::new(&env.work, &env.package));
    let execution = executor.execute(&recipe).unwrap();

    assert_eq!(execution.build_output.len(), 2);
    assert_eq!(execution.build_output[0].stdout, "configuring plain 1.0.0\n");
}

#[tokio::test]
async fn test_failing_build_stops_pipeline() {
    let server = serve_zip(&[("broken-1.0.0/broken.h", "// never staged")]).await;
    let env = TestEnv::new();
    let recipe = fixture(FAILING_BUILD, &server.uri());

    let executor = Executor::new(Context::new(&env.work, &env.package));
    let err = executor.execute(&recipe).unwrap_err();

    assert_eq!(err.phase, Phase::Build);
    assert_eq!(err.completed, [Phase::Source, Phase::Config]);
    match &err.error {
        ExecuteError::BuildFailed {
            exit_code,
            stdout,
            stderr,
            ..
        } => {
            assert_eq!(*exit_code, Some(7));
            assert_eq!(stdout, "");
            assert_eq!(stderr, "undefined symbol\n");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!env.package.exists(), "package dir must stay untouched");
    assert!(err.error.to_string().contains("undefined symbol"));
    assert_eq!(err.to_string(), "build phase failed");
}

#[tokio::test]
async fn test_missing_artifact_keeps_partial_package() {
    let server = serve_zip(&[("halfbuilt-1.0.0/README", "")]).await;
    let env = TestEnv::new();
    let recipe = fixture(MISSING_LIB, &server.uri());

    let executor = Executor::new(Context::new(&env.work, &env.package));
    let err = executor.execute(&recipe).unwrap_err();

    assert_eq!(err.phase, Phase::Package);
    assert_eq!(err.completed, [Phase::Source, Phase::Config, Phase::Build]);
    assert!(matches!(
        err.error,
        ExecuteError::ArtifactMissing { ref pattern } if pattern == "libhalfbuilt.so"
    ));
    assert_eq!(files_under(&env.package), ["include/half.h"]);
}

#[tokio::test]
async fn test_unresolved_dependency_fails_config() {
    let server = serve_zip(&[("catui-0.1.3/package.json", "{}")]).await;
    let env = TestEnv::new();
    let recipe = fixture(CATUI_STUB, &server.uri());

    let executor = Executor::new(Context::new(&env.work, &env.package));
    let err = executor.execute(&recipe).unwrap_err();

    assert_eq!(err.phase, Phase::Config);
    assert_eq!(err.completed, [Phase::Source]);
    assert!(matches!(err.error, ExecuteError::UnresolvedDependency { .. }));
    assert!(!env.work.join("catui/build").exists(), "build must not run");
}

#[tokio::test]
async fn test_source_failure_runs_nothing() {
    let server = wiremock::MockServer::start().await;
    let env = TestEnv::new();
    let recipe = fixture(NO_DEPS, &server.uri());

    let executor = Executor::new(Context::new(&env.work, &env.package));
    let err = executor.execute(&recipe).unwrap_err();

    assert_eq!(err.phase, Phase::Source);
    assert!(err.completed.is_empty());
    assert!(matches!(err.error, ExecuteError::SourceUnavailable { .. }));
    assert!(!env.package.exists());
}

#[tokio::test]
async fn test_store_feeds_later_builds() {
    let env = TestEnv::new();
    let store = PackageStore::new(env.dir.path().join("store"));

    // Stage a msgstream package into the store.
    let dep_server = serve_zip(&[("msgstream-0.3.1/README", "")]).await;
    let dep = fixture(
        r#"
name = "msgstream"
version = "0.3.1"
[source]
archive = "{server}/msgstream-{version}.zip"
[build]
commands = ["mkdir -p include && touch include/msgstream.h"]
[[artifacts]]
pattern = "*.h"
from = "include"
kind = "include"
"#,
        &dep_server.uri(),
    );
    let dep_executor = Executor::new(Context::new(env.work.join("dep"), store.prepare(&dep).unwrap()));
    let execution = dep_executor.execute(&dep).unwrap();
    store.commit(&dep, &execution.info).unwrap();

    // A consumer resolves it through the store and sees its descriptor.
    let server = serve_zip(&[("consumer-1.0.0/README", "")]).await;
    let consumer = fixture(USES_PKG_CONFIG, &server.uri());
    let executor = Executor::new(Context::new(env.work.join("consumer"), &env.package))
        .with_resolver(store.clone());
    executor.execute(&consumer).unwrap();

    let pc = std::fs::read_to_string(env.package.join("lib/found.pc")).unwrap();
    let dep_root = store.package_root(&dep);
    assert!(pc.contains(&format!("prefix={}", dep_root.display())));
    assert!(pc.contains("Libs: -L${libdir} -lmsgstream"));
}
