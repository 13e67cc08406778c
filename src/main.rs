//! `collect-libs`: copy a built executable's shared libraries into a flat
//! directory for the AppImage step.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use appimage_libs::{
    AllowedPrefixes, CollectConfig, Collection, DependencyLister, LddLister, LibraryCollector,
    ReadelfLister, DEFAULT_PREFIXES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Ask the host dynamic linker (`ldd`)
    Ldd,
    /// Read NEEDED entries with `readelf -d` and resolve them under --sysroot
    Readelf,
}

#[derive(Debug, Parser)]
#[command(version, about = "Collect shared libraries for AppImage bundling")]
struct Cli {
    /// Built executable to inspect
    #[arg(long, default_value = "../../../app/main/build/release/chestnut")]
    target: PathBuf,

    /// Directory the libraries are copied into (created if missing)
    #[arg(long, default_value = "lib")]
    dest: PathBuf,

    /// Library-root prefix to accept; repeat for several
    #[arg(
        long = "prefix",
        value_name = "PREFIX",
        default_values_t = DEFAULT_PREFIXES.iter().map(|p| p.to_string())
    )]
    prefixes: Vec<String>,

    #[arg(long, value_enum, default_value_t = Method::Ldd)]
    method: Method,

    /// Inspection program (defaults to `ldd` or `readelf` per --method)
    #[arg(long, env = "COLLECT_LIBS_TOOL")]
    tool: Option<String>,

    /// Root to resolve library names against (readelf only)
    #[arg(long, default_value = "/")]
    sysroot: PathBuf,

    /// Fail if the inspection tool exits unsuccessfully
    #[arg(long)]
    strict: bool,
}

fn run<L: DependencyLister>(lister: L, config: &CollectConfig) -> Result<Collection> {
    let program = lister.program();
    let print_copied = |lib: &Path| println!("{}", lib.display());
    LibraryCollector::new(lister)
        .collect_with(config, print_copied)
        .with_context(|| {
            format!(
                "Failed to collect libraries of {} with {}",
                config.target.display(),
                program
            )
        })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = CollectConfig {
        target: cli.target,
        destination: cli.dest,
        allowed_prefixes: AllowedPrefixes::new(cli.prefixes).context("Invalid --prefix")?,
        strict: cli.strict,
    };

    let collection = match cli.method {
        Method::Ldd => {
            let lister = LddLister::new(cli.tool.unwrap_or_else(|| "ldd".to_string()));
            run(lister, &config)?
        }
        Method::Readelf => {
            let mut lister = ReadelfLister::new(cli.sysroot);
            if let Some(tool) = cli.tool {
                lister = lister.with_program(tool);
            }
            run(lister, &config)?
        }
    };

    if !collection.diagnostics.unresolved.is_empty() {
        log::warn!(
            "Unresolved libraries: {}",
            collection.diagnostics.unresolved.join(", ")
        );
    }

    Ok(())
}
