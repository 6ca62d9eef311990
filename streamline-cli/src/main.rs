use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};

use streamline_core::differ::{Diff, create_plan};
use streamline_core::graph::DependencyGraph;
use streamline_core::plan::Plan;
use streamline_core::Template;
use streamline_provider_aws::boot_script::BootScript;
use streamline_provider_aws::config::{DEFAULT_CONFIG_FILE, PRESETS};
use streamline_provider_aws::{
    Diagnostic, Severity, StackConfig, StackError, StreamlineStack, build_stack,
};

#[derive(Parser)]
#[command(name = "streamline")]
#[command(about = "Declare and synthesise the Streamline hosting stack", long_about = None)]
struct Cli {
    /// Path to the stack configuration
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Raise the log level (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Preset to start from
        #[arg(long, default_value = "streamline", value_parser = clap::builder::PossibleValuesParser::new(PRESETS))]
        preset: String,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Build the stack and run every consistency check
    Validate,
    /// Render the CloudFormation template
    Synth {
        /// Write the template to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare the template with a previously synthesised one
    Diff {
        /// Template to compare against
        #[arg(long)]
        against: PathBuf,
    },
    /// Show resource creation order and dependencies
    Graph,
    /// Print the instance boot script and what it does
    BootScript,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init { preset, force } => run_init(&cli.config, &preset, force),
        Commands::Validate => run_validate(&cli.config),
        Commands::Synth { out } => run_synth(&cli.config, out.as_deref()),
        Commands::Diff { against } => run_diff(&cli.config, &against),
        Commands::Graph => run_graph(&cli.config),
        Commands::BootScript => run_boot_script(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_stack(config_path: &Path) -> Result<StreamlineStack, String> {
    let config = StackConfig::load(config_path).map_err(|e| e.to_string())?;
    log::info!("Loaded {} from {}", config.stack_name, config_path.display());
    build_stack(&config).map_err(|e| e.to_string())
}

fn synth_stack(stack: &StreamlineStack) -> Result<Template, String> {
    stack.synth().map_err(|e| match e {
        StackError::Check(diagnostics) => {
            print_diagnostics(&diagnostics);
            format!("{} consistency check(s) failed", diagnostics.len())
        }
        other => other.to_string(),
    })
}

fn run_init(config_path: &Path, preset: &str, force: bool) -> Result<(), String> {
    if config_path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        ));
    }

    let config = StackConfig::preset(preset).map_err(|e| e.to_string())?;
    let yaml = config.to_yaml_string().map_err(|e| e.to_string())?;
    fs::write(config_path, yaml)
        .map_err(|e| format!("Failed to write {}: {}", config_path.display(), e))?;

    println!(
        "{}",
        format!("✓ Wrote {} from preset '{}'.", config_path.display(), preset)
            .green()
            .bold()
    );
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), String> {
    let stack = load_stack(config_path)?;

    println!("{}", "Validating...".cyan());

    let diagnostics = stack.check();
    print_diagnostics(&diagnostics);
    let errors = diagnostics.iter().filter(|d| d.is_error()).count();
    if errors > 0 {
        return Err(format!("{} consistency check(s) failed", errors));
    }

    let lowered = stack.to_stack().map_err(|e| e.to_string())?;
    let template = streamline_core::synth(&lowered, &streamline_provider_aws::AwsProvider)
        .map_err(|e| e.to_string())?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            template.resources.len()
        )
        .green()
        .bold()
    );

    for resource in lowered.resources() {
        println!("  • {} {}", resource.id.resource_type, resource.id.name);
    }

    Ok(())
}

fn run_synth(config_path: &Path, out: Option<&Path>) -> Result<(), String> {
    let stack = load_stack(config_path)?;
    let template = synth_stack(&stack)?;
    let json = template.to_json_string().map_err(|e| e.to_string())?;

    match out {
        Some(path) => {
            fs::write(path, &json)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            eprintln!(
                "{}",
                format!(
                    "✓ Wrote {} resources to {}.",
                    template.resources.len(),
                    path.display()
                )
                .green()
                .bold()
            );
        }
        None => print!("{}", json),
    }
    Ok(())
}

fn run_diff(config_path: &Path, against: &Path) -> Result<(), String> {
    let content = fs::read_to_string(against)
        .map_err(|e| format!("Failed to read {}: {}", against.display(), e))?;
    let current = Template::from_json_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", against.display(), e))?;

    let stack = load_stack(config_path)?;
    let desired = synth_stack(&stack)?;

    let plan = create_plan(&desired, &current);
    print_plan(&plan);

    if !plan.is_empty() {
        let rendered = desired.to_json_string().map_err(|e| e.to_string())?;
        print_diff(against, &content, &rendered);
    }
    Ok(())
}

fn run_graph(config_path: &Path) -> Result<(), String> {
    let stack = load_stack(config_path)?;
    let lowered = stack.to_stack().map_err(|e| e.to_string())?;
    let graph = DependencyGraph::from_resources(lowered.resources());

    let order = graph.topological_order().map_err(|cycle| {
        format!("Dependency cycle between: {}", cycle.join(", "))
    })?;

    println!("{}", "Creation order:".cyan().bold());
    println!();
    for (index, logical_id) in order.iter().enumerate() {
        let type_name = lowered
            .resource(logical_id)
            .map(|r| r.id.resource_type.as_str())
            .unwrap_or("unknown");
        println!(
            "{:>3}. {} {}",
            index + 1,
            logical_id.bold(),
            format!("({})", type_name).dimmed()
        );
        for dep in graph.dependencies_of(logical_id) {
            println!("       {} {}", "←".dimmed(), dep);
        }
    }

    println!();
    println!(
        "Roots: {}  Leaves: {}",
        graph.root_resources().len(),
        graph.leaf_resources().len()
    );
    Ok(())
}

fn run_boot_script(config_path: &Path) -> Result<(), String> {
    let stack = load_stack(config_path)?;

    print!("{}", stack.boot_script);
    if !stack.boot_script.ends_with('\n') {
        println!();
    }

    let report = BootScript::inspect(&stack.boot_script);
    println!();
    println!("{}", "Script report:".cyan().bold());
    for redirect in &report.redirects {
        println!("  • redirect {} → {}", redirect.from, redirect.to);
    }
    for launch in &report.launches {
        println!("  • launch {}", launch);
    }
    if report.uses_tmux {
        println!(
            "  {}",
            "• launched in a tmux session (not restarted on failure or reboot)".yellow()
        );
    }
    Ok(())
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        let label = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        println!(
            "{}[{}]: {}",
            label, diagnostic.subject, diagnostic.message
        );
    }
}

fn print_plan(plan: &Plan) {
    if plan.is_empty() {
        println!("{}", "No changes. Template is up-to-date.".green());
        return;
    }

    println!("{}", "Changes:".cyan().bold());
    println!();
    for change in plan.changes() {
        let line = change.to_string();
        let colored = match change {
            Diff::Create { .. } => line.green(),
            Diff::Update { .. } => line.yellow(),
            Diff::Delete { .. } => line.red(),
            Diff::NoChange(_) => line.normal(),
        };
        println!("  {}", colored);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

fn print_diff(file: &Path, original: &str, rendered: &str) {
    println!("\n{} {}:", "Diff against".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(original, rendered);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
        if change.missing_newline() {
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_preset(dir: &Path, preset: &str) -> PathBuf {
        let path = dir.join(DEFAULT_CONFIG_FILE);
        run_init(&path, preset, false).unwrap();
        path
    }

    #[test]
    fn init_writes_loadable_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_preset(dir.path(), "private");

        let loaded = StackConfig::load(&path).unwrap();
        assert_eq!(loaded, StackConfig::preset("private").unwrap());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_preset(dir.path(), "alb");

        let err = run_init(&path, "streamline", false).unwrap_err();
        assert!(err.contains("already exists"));

        run_init(&path, "streamline", true).unwrap();
        let loaded = StackConfig::load(&path).unwrap();
        assert_eq!(loaded, StackConfig::preset("streamline").unwrap());
    }

    #[test]
    fn init_rejects_unknown_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        assert!(run_init(&path, "nope", false).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn synth_writes_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_preset(dir.path(), "streamline");
        let out = dir.path().join("template.json");

        run_synth(&path, Some(&out)).unwrap();

        let written = fs::read_to_string(&out).unwrap();
        let rendered = synth_stack(&load_stack(&path).unwrap())
            .unwrap()
            .to_json_string()
            .unwrap();
        assert_eq!(written, rendered);
        assert!(!written.ends_with("\n\n"));

        let template = Template::from_json_str(&written).unwrap();
        assert_eq!(template.count_of_type("AWS::ElasticLoadBalancingV2::LoadBalancer"), 1);
        assert!(template.outputs.contains_key("LoadBalancerDnsName"));
    }

    #[test]
    fn diff_against_own_output_has_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_preset(dir.path(), "streamline");
        let out = dir.path().join("template.json");
        run_synth(&path, Some(&out)).unwrap();

        let current = Template::from_json_str(&fs::read_to_string(&out).unwrap()).unwrap();
        let desired = synth_stack(&load_stack(&path).unwrap()).unwrap();
        assert!(create_plan(&desired, &current).is_empty());

        run_diff(&path, &out).unwrap();
    }

    #[test]
    fn diff_after_config_change_reports_updates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_preset(dir.path(), "streamline");
        let out = dir.path().join("template.json");
        run_synth(&path, Some(&out)).unwrap();

        let mut config = StackConfig::load(&path).unwrap();
        config.instances.instance_type = "t3.small".to_string();
        fs::write(&path, config.to_yaml_string().unwrap()).unwrap();

        let current = Template::from_json_str(&fs::read_to_string(&out).unwrap()).unwrap();
        let desired = synth_stack(&load_stack(&path).unwrap()).unwrap();
        let plan = create_plan(&desired, &current);
        assert_eq!(plan.summary().update, 1);
        assert_eq!(plan.summary().create, 0);

        run_diff(&path, &out).unwrap();
    }

    #[test]
    fn diff_rejects_malformed_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_preset(dir.path(), "streamline");
        let out = dir.path().join("template.json");
        fs::write(&out, "not json").unwrap();

        let err = run_diff(&path, &out).unwrap_err();
        assert!(err.starts_with("Failed to parse"));
    }

    #[test]
    fn validate_and_graph_accept_every_preset() {
        for preset in PRESETS {
            let dir = tempfile::tempdir().unwrap();
            let path = write_preset(dir.path(), preset);
            run_validate(&path).unwrap();
            run_graph(&path).unwrap();
            run_boot_script(&path).unwrap();
        }
    }

    #[test]
    fn validate_reports_capacity_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            "instances:\n  capacity:\n    min: 2\n    desired: 5\n    max: 4\n",
        )
        .unwrap();

        let err = run_validate(&path).unwrap_err();
        assert!(err.contains("5"));
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_validate(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(err.contains("absent.yaml"));
    }
}
