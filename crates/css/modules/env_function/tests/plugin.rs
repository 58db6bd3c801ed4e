use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use css_env_function::{
    EnvFnError, EnvFunctionPlugin, ModuleLoader, PluginOptions, SourceDescriptor,
    load_environment_variables,
};
use futures::future::{BoxFuture, FutureExt as _, join_all};
use serde_json::{Value, json};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Serves module exports from memory, keyed by file name.
struct FakeLoader;

impl ModuleLoader for FakeLoader {
    fn load<'load>(&'load self, path: &'load Path) -> BoxFuture<'load, anyhow::Result<Value>> {
        async move {
            match path.file_name().and_then(|name| name.to_str()) {
                Some("theme.js") => Ok(json!({ "environmentVariables": { "--accent": "teal" } })),
                _ => Err(anyhow::anyhow!("module not found")),
            }
        }
        .boxed()
    }
}

#[tokio::test]
async fn later_sources_take_precedence() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("vars.json");
    fs::write(
        &file,
        r#"{ "environmentVariables": { "--a": "from-file", "--b": "file-only" } }"#,
    )
    .unwrap();

    let sources = vec![
        SourceDescriptor::inline([("--a", "first"), ("--c", "inline-only")]),
        SourceDescriptor::file(&file),
        SourceDescriptor::deferred(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok(SourceDescriptor::inline([("--a", "last")]))
        }),
    ];
    let vars = load_environment_variables(sources, None).await.unwrap();
    assert_eq!(vars.names(), vec!["--a", "--b", "--c"]);
    assert_eq!(vars.get("--a").unwrap().to_string(), "last");
    assert_eq!(vars.get("--b").unwrap().to_string(), "file-only");
}

#[tokio::test]
async fn malformed_json_fails_the_build() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("broken.json");
    fs::write(&file, "{ not json").unwrap();
    let error = load_environment_variables(vec![SourceDescriptor::file(&file)], None)
        .await
        .unwrap_err();
    assert!(matches!(error, EnvFnError::Json { ref path, .. } if *path == file));
}

#[tokio::test]
async fn missing_files_fail_the_build() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("absent.json");
    let error = load_environment_variables(vec![SourceDescriptor::file(&file)], None)
        .await
        .unwrap_err();
    assert!(matches!(error, EnvFnError::FileAccess { .. }));
}

#[tokio::test]
async fn unknown_formats_contribute_nothing() {
    init_logging();
    let sources = vec![
        SourceDescriptor::inline([("--a", "1px")]),
        SourceDescriptor::file_with_format("vars.yaml", "yaml"),
    ];
    let vars = load_environment_variables(sources, None).await.unwrap();
    assert_eq!(vars.len(), 1);
}

#[tokio::test]
async fn producers_are_resolved() {
    init_logging();
    let sources = vec![SourceDescriptor::producer(|| {
        SourceDescriptor::inline([("--produced", "yes")])
    })];
    let vars = load_environment_variables(sources, None).await.unwrap();
    assert!(vars.contains("--produced"));
}

#[tokio::test]
async fn module_sources_use_the_loader() {
    init_logging();
    let loader: Arc<dyn ModuleLoader> = Arc::new(FakeLoader);
    let vars = load_environment_variables(vec![SourceDescriptor::file("theme.js")], Some(loader))
        .await
        .unwrap();
    assert_eq!(vars.get("--accent").unwrap().to_string(), "teal");

    let loader: Arc<dyn ModuleLoader> = Arc::new(FakeLoader);
    let error = load_environment_variables(vec![SourceDescriptor::file("other.js")], Some(loader))
        .await
        .unwrap_err();
    assert!(matches!(error, EnvFnError::ModuleLoad { .. }));
}

#[tokio::test]
async fn module_sources_need_a_loader() {
    init_logging();
    let error = load_environment_variables(vec![SourceDescriptor::file("theme.js")], None)
        .await
        .unwrap_err();
    assert!(matches!(error, EnvFnError::ModuleLoad { .. }));
}

#[tokio::test]
async fn options_json_configures_the_plugin() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("vars.json");
    fs::write(&file, r#"{ "environment-variables": { "--gap": 12 } }"#).unwrap();
    let options = PluginOptions::from_json(&json!({
        "importFrom": [
            { "environmentVariables": { "--gap": "1px", "--color": "red" } },
            file.to_str().unwrap(),
        ]
    }))
    .unwrap();
    let plugin = EnvFunctionPlugin::new(options);
    assert_eq!(
        plugin
            .declaration_value("env(--gap) env(--color)")
            .await
            .unwrap()
            .as_deref(),
        Some("12 red")
    );
}

#[tokio::test]
async fn table_is_resolved_once_for_concurrent_callers() {
    init_logging();
    let resolutions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resolutions);
    let plugin = EnvFunctionPlugin::new(PluginOptions::new().with_source(
        SourceDescriptor::deferred(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(SourceDescriptor::inline([("--a", "red")]))
        }),
    ));

    let results = join_all((0..8).map(|_| plugin.declaration_value("env(--a)"))).await;
    for result in results {
        assert_eq!(result.unwrap().as_deref(), Some("red"));
    }
    assert_eq!(plugin.declaration_value("x env(--a)").await.unwrap().as_deref(), Some("x red"));
    assert_eq!(resolutions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn abandoned_first_caller_does_not_lose_the_sources() {
    init_logging();
    let resolutions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resolutions);
    let plugin = EnvFunctionPlugin::new(PluginOptions::new().with_source(
        SourceDescriptor::deferred(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(SourceDescriptor::inline([("--a", "red")]))
        }),
    ));

    let first = tokio::time::timeout(
        Duration::from_millis(5),
        plugin.declaration_value("env(--a)"),
    )
    .await;
    assert!(first.is_err());

    assert_eq!(
        plugin.declaration_value("env(--a)").await.unwrap().as_deref(),
        Some("red")
    );
    assert_eq!(plugin.variables().await.unwrap().len(), 1);
    assert_eq!(resolutions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn resolution_failures_are_cached() {
    init_logging();
    let plugin = EnvFunctionPlugin::new(PluginOptions::new().with_source(
        SourceDescriptor::deferred(async { Err(anyhow::anyhow!("source unavailable")) }),
    ));
    let first = plugin.declaration_value("env(--a)").await.unwrap_err();
    let second = plugin.at_rule_params("(width: env(--a))").await.unwrap_err();
    assert!(matches!(first, EnvFnError::Source { ref message } if message.contains("unavailable")));
    assert_eq!(first, second);
}

#[tokio::test]
async fn stylesheets_are_rewritten_in_place() {
    init_logging();
    let plugin = EnvFunctionPlugin::new(PluginOptions::new().with_source(
        SourceDescriptor::inline([("--bp", "640px"), ("--gap", "4px 8px")]),
    ));
    let css = "/* layout */\n\
               @media (min-width: env(--bp)) {\n  \
               .a { margin: env(--gap) !important; color: blue }\n\
               }\n\
               .b { padding: env(--unknown) env(--gap) }\n";
    let expected = "/* layout */\n\
                    @media (min-width: 640px) {\n  \
                    .a { margin: 4px 8px !important; color: blue }\n\
                    }\n\
                    .b { padding: env(--unknown) 4px 8px }\n";
    assert_eq!(plugin.process_stylesheet(css).await.unwrap(), expected);
}

#[tokio::test]
async fn stylesheets_without_references_are_untouched() {
    init_logging();
    let plugin = EnvFunctionPlugin::new(PluginOptions::new());
    let css = "a{color:red}\n@import url(\"x.css\");\n";
    assert_eq!(plugin.process_stylesheet(css).await.unwrap(), css);
}
