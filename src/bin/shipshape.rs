use anyhow::{bail, Context as _, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use serde::Deserialize;

use shipshape_engine::{self as engine, Settings};
use shipshape_filesystem::DiskFilesystem;
use shipshape_resource::{Report, Resource};

/// Verifies the resources declared in a manifest and, with `--apply`,
/// repairs the ones that differ
#[derive(Debug, Parser)]
struct CommandLineArgs {
    /// Path to the TOML manifest of declared resources
    manifest: Utf8PathBuf,

    /// Apply corrective changes instead of only reporting differences
    #[arg(long)]
    apply: bool,

    /// Increase verbosity (may be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Deserialization of a shipshape.toml manifest
#[derive(Debug, Default, Deserialize)]
struct Manifest {
    /// Enables backup copies for resources that request them
    #[serde(default)]
    paranoid: bool,

    /// Where backup copies are placed
    backup_directory: Option<Utf8PathBuf>,

    /// The declared resources, in application order
    #[serde(default, rename = "resource")]
    resources: Vec<Resource>,
}

impl Manifest {
    /// Load a manifest from the specified file
    fn load(path: impl AsRef<Utf8Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Reading manifest file {path:?}"))?;
        toml::from_str(&data).with_context(|| format!("Parsing manifest file {path:?}"))
    }
}

fn init_logger(verbosity: u8) {
    let env = env_logger::Env::new().filter("SHIPSHAPE_LOG");
    env_logger::Builder::from_env(env)
        .filter_level(match verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        })
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let CommandLineArgs {
        manifest,
        apply,
        verbose,
    } = CommandLineArgs::parse();

    init_logger(verbose);

    let manifest = Manifest::load(manifest)?;
    let mut settings = Settings {
        paranoid: manifest.paranoid,
        ..Settings::default()
    };
    if let Some(directory) = manifest.backup_directory {
        settings.backup_dir = directory;
    }

    let mut fs = DiskFilesystem::new();
    let mut out_of_sync = 0usize;
    let mut failed = 0usize;
    for resource in &manifest.resources {
        let report = engine::verify(&fs, resource);
        if report.matches {
            println!("ok       {} {}", resource.kind(), resource.name());
            continue;
        }
        print_report(resource, &report);
        if !apply {
            out_of_sync += 1;
            continue;
        }
        match engine::install(&mut fs, resource, &settings) {
            Ok(()) => println!("fixed    {} {}", resource.kind(), resource.name()),
            // The engine has already logged the details
            Err(_) => failed += 1,
        }
    }
    if failed > 0 {
        bail!(
            "{failed} of {} resources failed to install",
            manifest.resources.len()
        );
    }
    if out_of_sync > 0 {
        log::warn!("{out_of_sync} resources differ; rerun with --apply to fix them");
    }
    Ok(())
}

fn print_report(resource: &Resource, report: &Report) {
    let status = if report.exists { "differs" } else { "missing" };
    println!("{status:<8} {} {}", resource.kind(), resource.name());
    if let Some(owner) = &report.observed_owner {
        println!("         owner is {owner}");
    }
    if let Some(group) = &report.observed_group {
        println!("         group is {group}");
    }
    if let Some(perms) = &report.observed_perms {
        println!("         permissions are {perms}");
    }
    if let Some(target) = &report.observed_target {
        println!("         points to {target}");
    }
    if let Some(diff) = &report.content_diff {
        print!("{diff}");
    }
}
