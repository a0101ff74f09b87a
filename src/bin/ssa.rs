//! ssa - Server-side apply planning tool
//!
//! Offline companion to the apply engine: inspects manifests without talking
//! to a cluster.

use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use kube_ssa::drift::DriftDetector;
use kube_ssa::manager::{is_cluster_definition, sort_objects, ManagerConfig};
use kube_ssa::object::Object;
use kube_ssa::sanitize::Sanitizer;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ssa", version)]
#[command(about = "Inspect manifests the way the server-side apply engine sees them")]
struct Cli {
    /// Engine configuration file (YAML)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Output location. Use '-' for stdout
    #[arg(long, short = 'o', default_value = "-", global = true)]
    output: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a live object with a dry-run apply result
    Drift {
        #[arg(long)]
        live: PathBuf,
        #[arg(long)]
        dry_run: PathBuf,
    },
    /// Show the managed fields cleanup each live object would get
    Sanitize { file: PathBuf },
    /// Show the order and stages objects would be applied in
    Plan { file: PathBuf },
    /// Add owner labels to every object and print the result
    Label {
        file: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long)]
        namespace: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => ManagerConfig::from_yaml(&read(path)?)?,
        None => ManagerConfig::default(),
    };
    debug!(field_manager = %config.owner.field, "loaded configuration");

    let mut output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            fs::File::create(&cli.output)
                .map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?,
        )
    };

    match cli.command {
        Command::Drift { live, dry_run } => drift(&live, &dry_run, &mut output),
        Command::Sanitize { file } => sanitize(&config, &file, &mut output),
        Command::Plan { file } => plan(&file, &mut output),
        Command::Label {
            file,
            name,
            namespace,
        } => label(&config, &file, &name, &namespace, &mut output),
    }
}

fn read(path: &Path) -> Result<String, Box<dyn Error>> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read {:?}: {}", path, e).into())
}

fn read_objects(path: &Path) -> Result<Vec<Object>, Box<dyn Error>> {
    let objects = Object::read_all_yaml(&read(path)?)?;
    debug!(file = ?path, objects = objects.len(), "read manifests");
    Ok(objects)
}

fn drift(live: &Path, dry_run: &Path, output: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let live = Object::from_yaml(&read(live)?)?;
    let dry_run = Object::from_yaml(&read(dry_run)?)?;

    let detector = DriftDetector::new();
    if detector.has_drifted(&live, &dry_run) {
        writeln!(output, "{} has drifted:", live.object_ref())?;
        write!(output, "{}", detector.compare(&live, &dry_run))?;
    } else {
        writeln!(output, "{} is up to date", live.object_ref())?;
    }
    Ok(())
}

fn sanitize(
    config: &ManagerConfig,
    file: &Path,
    output: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
    let sanitizer = Sanitizer::new(
        config.owner.field.clone(),
        config.legacy_update_managers.clone(),
        config.legacy_apply_manager.clone(),
    );
    for object in read_objects(file)? {
        let patches = sanitizer.plan(&object)?;
        if patches.is_empty() {
            writeln!(output, "{}: clean", object.object_ref())?;
        } else {
            writeln!(output, "{}: {}", object.object_ref(), serde_json::to_string(&patches)?)?;
        }
    }
    Ok(())
}

fn plan(file: &Path, output: &mut dyn Write) -> Result<(), Box<dyn Error>> {
    let (mut stage_one, mut stage_two): (Vec<Object>, Vec<Object>) =
        read_objects(file)?.into_iter().partition(is_cluster_definition);
    sort_objects(&mut stage_one);
    sort_objects(&mut stage_two);

    for (stage, objects) in [(1, &stage_one), (2, &stage_two)] {
        if objects.is_empty() {
            continue;
        }
        writeln!(output, "Stage {}:", stage)?;
        for object in objects {
            writeln!(output, "  - {}", object.object_ref())?;
        }
    }
    Ok(())
}

fn label(
    config: &ManagerConfig,
    file: &Path,
    name: &str,
    namespace: &str,
    output: &mut dyn Write,
) -> Result<(), Box<dyn Error>> {
    let mut objects = read_objects(file)?;
    config.owner.set_labels(&mut objects, name, namespace);
    for object in &objects {
        writeln!(output, "---")?;
        write!(output, "{}", object.to_yaml()?)?;
    }
    Ok(())
}
