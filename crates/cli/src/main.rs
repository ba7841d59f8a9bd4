//! jadep - adds missing `deps` to Bazel Java rules.
//!
//! Given a Java file (or a rule label), jadep finds the rules that consume
//! it, extracts the class names the file references, resolves them to
//! candidate rules, and edits the BUILD file to add the chosen edges.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod report;
mod workspace;

use anyhow::{anyhow, Context};
use clap::Parser;
use regex::Regex;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use jadep_buildfile::{BuildEditor, BuildozerEditor};
use jadep_core::{ClassName, FutureValue, PkgLoaderConfig};
use jadep_engine::{
    create_rule, exclude_class_names, implicit_imports, java_naming_rules, missing_deps,
    rules_consuming_file, select_deps_to_add, SortingRanker, DEFAULT_NEW_RULE_KIND,
};
use jadep_extractor::{extract_top_level_class_name, referenced_classes};
use jadep_filter::{java_kinds, TestMirror};
use jadep_loader::{connect, CachingLoader, FilteringLoader, Loader};
use jadep_resolve::{read_dict_from_csv, Dict, DictResolver, FsResolver, ThirdPartyResolver};

#[derive(Parser)]
#[command(name = "jadep")]
#[command(about = "Adds missing dependencies to Bazel BUILD files for Java sources")]
#[command(version)]
struct Cli {
    /// Java files or absolute rule labels to process.
    #[arg(required = true)]
    targets: Vec<String>,

    /// Bazel workspace root; discovered from the working directory when
    /// omitted.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Directories under which Java files mirror their package names.
    #[arg(long, value_delimiter = ',', default_values_t = ["java".to_string(), "javatests".to_string()])]
    content_roots: Vec<String>,

    /// Print proposed dependencies without editing BUILD files.
    #[arg(long)]
    dry_run: bool,

    /// Resolve these class names instead of parsing files.
    #[arg(long = "classnames", value_delimiter = ',')]
    class_names: Vec<String>,

    /// Regexes of class names to ignore.
    #[arg(long, value_delimiter = ',')]
    blacklist: Vec<String>,

    /// File listing packages that must never be loaded, one per line.
    #[arg(long)]
    blacklisted_package_list: Option<PathBuf>,

    /// CSV file mapping built-in class names to the labels providing them.
    #[arg(long)]
    builtin_class_list: Option<PathBuf>,

    /// Path to the package-server executable.
    #[arg(long, default_value = "pkgloader")]
    pkgloader_executable: PathBuf,

    /// Where to reach the package server: unix://<path>, localhost:<port>,
    /// or a remote address. Defaults to a per-user Unix socket.
    #[arg(long)]
    pkgloader_bind_location: Option<String>,

    /// Deadline for a single load RPC, in seconds.
    #[arg(long, default_value_t = 10)]
    rpc_deadline_secs: u64,

    /// Workspace-relative bazel-deps third-party directory; enables the
    /// third-party graph resolver.
    #[arg(long)]
    thirdparty_dir: Option<String>,

    /// Path to the buildozer executable used to edit BUILD files.
    #[arg(long, default_value = "buildozer")]
    buildozer: String,

    /// Disable the convention that javatests/... sees java/... packages.
    #[arg(long)]
    no_test_mirror: bool,

    /// Verbose logging; repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (workspace_dir, rel_working_dir) = workspace::workspace(cli.workspace.as_deref())?;
    info!("Workspace: {}", workspace_dir.display());

    let blacklist: Vec<Regex> = cli
        .blacklist
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("invalid blacklist regex {p:?}")))
        .collect::<anyhow::Result<_>>()?;

    // Slow startup loads run in the background while we connect.
    let blacklisted_packages = read_lines_future(cli.blacklisted_package_list.clone());
    let builtin_dict = read_dict_future(cli.builtin_class_list.clone());
    let implicit = implicit_imports(&builtin_dict);

    let cancel = CancellationToken::new();
    let loader = new_loader(&cli, &workspace_dir, &blacklisted_packages, cancel.clone()).await?;

    let mut resolvers: Vec<Arc<dyn jadep_resolve::Resolver>> = vec![
        Arc::new(DictResolver::new(
            "Built-in JDK/Android",
            builtin_dict.clone(),
            Arc::clone(&loader),
        )),
        Arc::new(FsResolver::new(
            cli.content_roots.clone(),
            workspace_dir.clone(),
            Arc::clone(&loader),
        )),
    ];
    if let Some(thirdparty_dir) = &cli.thirdparty_dir {
        let resolver =
            ThirdPartyResolver::new(&workspace_dir, thirdparty_dir, Arc::clone(&loader)).await?;
        if resolver.missing_jars() > 0 {
            warn!("{} jar(s) could not be listed", resolver.missing_jars());
        }
        resolvers.push(Arc::new(resolver));
    }

    let config = jadep_engine::Config {
        workspace_dir: workspace_dir.clone(),
        loader: Arc::clone(&loader),
        resolvers,
        ranker: Arc::new(SortingRanker),
        test_mirror: if cli.no_test_mirror {
            TestMirror::disabled()
        } else {
            TestMirror::enabled()
        },
    };
    let editor = BuildozerEditor::new(workspace_dir.clone(), cli.buildozer.clone());

    let mut failed = false;
    for target in &cli.targets {
        if let Err(e) = process_target(&cli, &config, &editor, &rel_working_dir, target, &implicit, &blacklist).await
        {
            warn!("Error processing {target:?}: {e:#}");
            failed = true;
        }
    }
    if failed {
        return Err(anyhow!("at least one target failed"));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn process_target(
    cli: &Cli,
    config: &jadep_engine::Config,
    editor: &BuildozerEditor,
    rel_working_dir: &str,
    target: &str,
    implicit: &FutureValue<Vec<String>>,
    blacklist: &[Regex],
) -> anyhow::Result<()> {
    let rules_to_fix = rules_to_fix(config, editor, rel_working_dir, target).await?;
    if !rules_to_fix.is_empty() {
        let labels: Vec<String> = rules_to_fix.iter().map(|r| r.label().to_string()).collect();
        info!("Fixing: {}", labels.join(", "));
    }

    let class_names =
        class_names_to_resolve(cli, config, rel_working_dir, target, implicit, blacklist).await?;

    let missing = missing_deps(config, &rules_to_fix, &class_names).await?;
    report::report_unresolved_class_names(&missing.unresolved);
    println!();

    if cli.dry_run {
        report::report_missing_deps(&missing);
        return Ok(());
    }

    let mut stdin = std::io::BufReader::new(std::io::stdin());
    let deps_to_add = select_deps_to_add(&mut stdin, &missing)?;
    let rules_by_label: std::collections::HashMap<_, _> = rules_to_fix
        .iter()
        .map(|r| (r.label(), Arc::clone(r)))
        .collect();
    for (rule_label, labels) in deps_to_add {
        let Some(rule) = rules_by_label.get(&rule_label) else {
            continue;
        };
        editor
            .add_deps(rule, &labels)
            .await
            .with_context(|| format!("error adding missing deps to {rule_label}"))?;
    }
    Ok(())
}

/// The rules whose `deps` we should manipulate for `target`: the rule the
/// label names, or every editable rule that srcs the file. When nothing
/// srcs it, a new rule is created.
async fn rules_to_fix(
    config: &jadep_engine::Config,
    editor: &BuildozerEditor,
    rel_working_dir: &str,
    target: &str,
) -> anyhow::Result<Vec<Arc<jadep_core::Rule>>> {
    if let Ok(label) = jadep_core::Label::parse_absolute(target) {
        let (rules, _) =
            jadep_loader::load_rules(&*config.loader, std::slice::from_ref(&label)).await?;
        let rule = rules
            .get(&label)
            .cloned()
            .ok_or_else(|| anyhow!("rule not found: {label}"))?;
        return Ok(vec![rule]);
    }

    let file_name = workspace::workspace_relative(target, &config.workspace_dir, rel_working_dir)?;
    let existing = rules_consuming_file(config, &file_name).await?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    // Nothing consumes the file; create a rule for it.
    let new_rule = create_rule(&file_name, &java_naming_rules(), DEFAULT_NEW_RULE_KIND);
    editor.new_rule(&new_rule).await?;
    Ok(vec![Arc::new(new_rule)])
}

/// The class names to satisfy with BUILD dependencies: the --classnames
/// flag when given, otherwise whatever the files reference.
async fn class_names_to_resolve(
    cli: &Cli,
    config: &jadep_engine::Config,
    rel_working_dir: &str,
    target: &str,
    implicit: &FutureValue<Vec<String>>,
    blacklist: &[Regex],
) -> anyhow::Result<Vec<ClassName>> {
    if !cli.class_names.is_empty() {
        return Ok(cli
            .class_names
            .iter()
            .map(|c| {
                let parts: Vec<&str> = c.split('.').collect();
                match extract_top_level_class_name(&parts) {
                    Some((top_level, _)) => ClassName::new(top_level),
                    None => ClassName::new(c.clone()),
                }
            })
            .collect());
    }

    let files = workspace::files_to_parse(
        target,
        &config.workspace_dir,
        rel_working_dir,
        &*config.loader,
    )
    .await?;
    let implicit = implicit.get().await?;
    let stopwatch = std::time::Instant::now();
    let class_names = referenced_classes(&files, &implicit).await;
    info!(
        "Found {} classes in {} Java file(s) ({}ms)",
        class_names.len(),
        files.len(),
        stopwatch.elapsed().as_millis()
    );
    Ok(exclude_class_names(blacklist, class_names))
}

/// Builds the loader stack: RPC client → blacklist filter → single-flight
/// cache.
async fn new_loader(
    cli: &Cli,
    workspace_dir: &std::path::Path,
    blacklisted_packages: &FutureValue<Vec<String>>,
    cancel: CancellationToken,
) -> anyhow::Result<Arc<dyn Loader>> {
    let bind_location = match &cli.pkgloader_bind_location {
        Some(location) => location.clone(),
        None => default_bind_location()?,
    };
    if let Some(path) = bind_location.strip_prefix("unix://") {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pkg_loader_config = PkgLoaderConfig {
        executable: cli.pkgloader_executable.clone(),
        bind_location,
        rpc_deadline_secs: cli.rpc_deadline_secs,
        ..PkgLoaderConfig::default()
    };
    let rpc_loader = connect(
        &pkg_loader_config,
        workspace_dir.to_string_lossy().into_owned(),
        java_kinds().kinds_to_load_sorted(),
        cancel,
    )
    .await
    .context("error connecting to package-server")?;

    let blacklisted: HashSet<String> = blacklisted_packages
        .get()
        .await?
        .iter()
        .filter(|line| !line.is_empty())
        .cloned()
        .collect();
    let filtering = FilteringLoader::new(Arc::new(rpc_loader), blacklisted);
    Ok(Arc::new(CachingLoader::new(Arc::new(filtering))))
}

fn default_bind_location() -> anyhow::Result<String> {
    let home = dirs::home_dir().ok_or_else(|| {
        anyhow!("unable to determine home directory; pass --pkgloader-bind-location explicitly")
    })?;
    Ok(format!(
        "unix://{}",
        home.join(".jadep").join("pkgloader.socket").display()
    ))
}

/// Reads a file into lines in the background; missing files yield an
/// empty list with a warning.
fn read_lines_future(file_name: Option<PathBuf>) -> FutureValue<Vec<String>> {
    FutureValue::spawn(async move {
        let Some(file_name) = file_name else {
            return Vec::new();
        };
        match tokio::fs::read_to_string(&file_name).await {
            Ok(content) => content.lines().map(|l| l.to_string()).collect(),
            Err(e) => {
                warn!("Error while reading {:?}: {e}", file_name);
                Vec::new()
            }
        }
    })
}

/// Reads the built-in class dictionary in the background; missing files
/// yield an empty dictionary with a warning.
fn read_dict_future(file_name: Option<PathBuf>) -> FutureValue<Dict> {
    FutureValue::spawn(async move {
        let Some(file_name) = file_name else {
            return Dict::new();
        };
        let content = match tokio::fs::read(&file_name).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Error opening {:?}: {e}", file_name);
                return Dict::new();
            }
        };
        match read_dict_from_csv(content.as_slice()) {
            Ok(dict) => dict,
            Err(e) => {
                warn!("Error while reading {:?}: {e}", file_name);
                Dict::new()
            }
        }
    })
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}
