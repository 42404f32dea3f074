//! Command implementations for rowdelta CLI

use crate::cli::{Commands, ConfigCommand, HashChoice};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use anyhow::{bail, Context, Result};
use rowdelta_core::config::{self, Config, LOCAL_CONFIG_FILE};
use rowdelta_core::data::load_csv;
use rowdelta_core::export::{write_dataset, ExportOptions, ReconciliationWriter};
use rowdelta_core::reconcile::ReconcileProgress;
use rowdelta_core::{find_dimension_duplicates, Reconciler};
use std::path::{Path, PathBuf};

/// Options of one `compare` invocation
struct CompareRequest {
    old: PathBuf,
    new: PathBuf,
    observation_column: Option<String>,
    prefix: Option<String>,
    output_dir: Option<PathBuf>,
    test: bool,
    hash: Option<HashChoice>,
    case_sensitive: bool,
    include_unchanged: bool,
    no_overwrite: bool,
    dry_run: bool,
    json: bool,
    quiet: bool,
}

/// Execute a command
pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Compare {
            old,
            new,
            observation_column,
            prefix,
            output_dir,
            test,
            hash,
            case_sensitive,
            include_unchanged,
            no_overwrite,
            dry_run,
            json,
            quiet,
        } => compare_command(
            config_path,
            CompareRequest {
                old,
                new,
                observation_column,
                prefix,
                output_dir,
                test,
                hash,
                case_sensitive,
                include_unchanged,
                no_overwrite,
                dry_run,
                json,
                quiet,
            },
        ),
        Commands::Duplicates {
            file,
            observation_column,
            write,
            json,
        } => duplicates_command(config_path, &file, observation_column, write, json),
        Commands::Config { command } => config_command(config_path, &command),
    }
}

/// Resolve configuration, honouring an explicit --config file
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => {
            let mut config = config::load_config_file(path)?;
            config.reconcile.apply_env_overrides()?;
            Ok(config)
        }
        None => Ok(config::get_config()?),
    }
}

/// Reconcile two snapshot files and write the change files
fn compare_command(config_path: Option<&Path>, request: CompareRequest) -> Result<()> {
    let config = load_config(config_path)?;

    let mut options = config.reconcile.clone();
    if let Some(column) = request.observation_column {
        options.observation_column = Some(column);
    }
    if let Some(hash) = request.hash {
        options.hash_algorithm = hash.into();
    }
    if request.case_sensitive {
        options.case_normalization = false;
    }
    // Fail on a missing column before reading any data
    options.require_observation_column()?;

    let mut progress = ProgressReporter::new(!request.json && !request.quiet);

    progress.set_message(&format!("Loading {}...", request.old.display()));
    let old = load_csv(&request.old)
        .with_context(|| format!("Failed to load old dataset '{}'", request.old.display()))?;
    progress.set_message(&format!("Loading {}...", request.new.display()));
    let new = load_csv(&request.new)
        .with_context(|| format!("Failed to load new dataset '{}'", request.new.display()))?;

    let algorithm = options.hash_algorithm;
    let reconciler = Reconciler::new(options);
    let on_progress = |p: ReconcileProgress| progress.update(p);
    let callback: &dyn Fn(ReconcileProgress) = &on_progress;
    let result = reconciler.reconcile_with_progress(&old, &new, Some(callback))?;

    let output_dir = match request.output_dir {
        Some(dir) => dir,
        None if request.test => config.output.test_directory.clone(),
        None => config.output.directory.clone(),
    };
    let prefix = match request.prefix {
        Some(prefix) => prefix,
        None => default_prefix(&request.new)?,
    };
    let writer = ReconciliationWriter::new(output_dir, prefix).with_options(ExportOptions {
        force: config.output.overwrite && !request.no_overwrite,
        write_unchanged: config.output.write_unchanged || request.include_unchanged,
        ..ExportOptions::default()
    });

    let outputs = if request.dry_run {
        writer.planned_outputs(&result)
    } else {
        writer.write(&result)?
    };

    let summary = result.summary();
    progress.finish(&format!(
        "Reconciled {} rows: {} changes",
        summary.old_rows + summary.new_rows,
        result.total_changes()
    ));

    if request.json {
        println!(
            "{}",
            JsonFormatter::format_reconciliation(&result, algorithm, &outputs, request.dry_run)?
        );
    } else if request.quiet {
        PrettyPrinter::print_quiet(&result, &outputs);
    } else {
        PrettyPrinter::print_reconciliation(
            &result,
            &request.old,
            &request.new,
            &outputs,
            request.dry_run,
        );
    }

    Ok(())
}

/// Output prefix derived from the new snapshot's file name
fn default_prefix(new: &Path) -> Result<String> {
    match new.file_stem().and_then(|stem| stem.to_str()) {
        Some(stem) if !stem.is_empty() => Ok(stem.to_string()),
        _ => bail!(
            "Cannot derive an output prefix from '{}' (use --prefix)",
            new.display()
        ),
    }
}

/// Report, and optionally remove, rows repeating a dimension key
fn duplicates_command(
    config_path: Option<&Path>,
    file: &Path,
    observation_column: Option<String>,
    write: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let mut options = config.reconcile;
    if let Some(column) = observation_column {
        options.observation_column = Some(column);
    }

    let dataset =
        load_csv(file).with_context(|| format!("Failed to load '{}'", file.display()))?;
    let report = find_dimension_duplicates(&dataset, &options)?;

    let written = if write {
        let target = filtered_path(file)?;
        write_dataset(&target, &report.filtered)?;
        log::info!("Wrote filtered dataset to {}", target.display());
        Some(target)
    } else {
        None
    };

    if json {
        println!("{}", JsonFormatter::format_duplicates(&report)?);
    } else {
        PrettyPrinter::print_duplicates(&report, file, written.as_deref());
    }
    Ok(())
}

/// `<dir>/<stem>-filtered.csv` beside the input
fn filtered_path(file: &Path) -> Result<PathBuf> {
    let stem = file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("Invalid input file name '{}'", file.display()))?;
    Ok(file.with_file_name(format!("{stem}-filtered.csv")))
}

/// Configure rowdelta settings
fn config_command(config_path: Option<&Path>, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => show_current_config(config_path),
        ConfigCommand::Init { global, force } => init_config(*global, *force),
    }
}

fn show_current_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let source = match config_path {
        Some(path) => format!("--config {}", path.display()),
        None => config::get_config_resolution_info(&std::env::current_dir()?),
    };
    PrettyPrinter::print_config(&config, &source);
    Ok(())
}

fn init_config(global: bool, force: bool) -> Result<()> {
    let target = if global {
        config::global_config_path()
    } else {
        std::env::current_dir()?.join(LOCAL_CONFIG_FILE)
    };
    write_default_config(&target, force)?;
    println!("✅ Wrote default configuration to: {}", target.display());
    println!("Set reconcile.observation_column before running 'rowdelta compare'.");
    Ok(())
}

fn write_default_config(target: &Path, force: bool) -> Result<()> {
    if target.exists() && !force {
        bail!(
            "Config file '{}' already exists (use --force to overwrite)",
            target.display()
        );
    }
    config::save_config_to(&Config::default(), target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const OLD: &str = "Area,Sex,Value\nE1,Male,10\nE1,Female,11\nE2,Male,20\n";
    const NEW: &str = "Area,Sex,Value\nE1,Male,10\nE1,Female,12\nE3,Male,30\n";

    struct Fixture {
        temp_dir: TempDir,
        config: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let config = temp_dir.path().join(LOCAL_CONFIG_FILE);
            fs::write(
                &config,
                format!(
                    "[reconcile]\nobservation_column = \"Value\"\n\n[output]\ndirectory = \"{}\"\n",
                    temp_dir.path().join("outputs").to_string_lossy()
                ),
            )
            .unwrap();
            fs::write(temp_dir.path().join("old.csv"), OLD).unwrap();
            fs::write(temp_dir.path().join("new.csv"), NEW).unwrap();
            Self { temp_dir, config }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.temp_dir.path().join(name)
        }

        fn request(&self) -> CompareRequest {
            CompareRequest {
                old: self.path("old.csv"),
                new: self.path("new.csv"),
                observation_column: None,
                prefix: None,
                output_dir: None,
                test: false,
                hash: None,
                case_sensitive: false,
                include_unchanged: false,
                no_overwrite: false,
                dry_run: false,
                json: false,
                quiet: true,
            }
        }
    }

    #[test]
    fn test_compare_writes_outputs_with_new_stem_prefix() {
        let fixture = Fixture::new();
        compare_command(Some(&fixture.config), fixture.request()).unwrap();

        let outputs = fixture.path("outputs");
        assert_eq!(
            fs::read_to_string(outputs.join("new-corrections.csv")).unwrap(),
            "Area,Sex,Value\nE1,Female,12\n"
        );
        assert!(outputs.join("new-appends.csv").exists());
        assert!(outputs.join("new-deletes.csv").exists());
        assert!(!outputs.join("new-unchanged.csv").exists());
    }

    #[test]
    fn test_compare_dry_run_writes_nothing() {
        let fixture = Fixture::new();
        let request = CompareRequest {
            dry_run: true,
            ..fixture.request()
        };
        compare_command(Some(&fixture.config), request).unwrap();
        assert!(!fixture.path("outputs").exists());
    }

    #[test]
    fn test_compare_requires_observation_column() {
        let fixture = Fixture::new();
        fs::write(&fixture.config, "").unwrap();
        let err = compare_command(Some(&fixture.config), fixture.request()).unwrap_err();
        assert!(err.to_string().contains("observation column"));
    }

    #[test]
    fn test_compare_flag_overrides_config_column() {
        let fixture = Fixture::new();
        let request = CompareRequest {
            observation_column: Some("Sex".to_string()),
            prefix: Some("by-sex".to_string()),
            output_dir: Some(fixture.path("custom")),
            ..fixture.request()
        };
        compare_command(Some(&fixture.config), request).unwrap();
        assert!(fixture.path("custom/by-sex-appends.csv").exists());
    }

    #[test]
    fn test_duplicates_writes_filtered_file() {
        let fixture = Fixture::new();
        let input = fixture.path("dupes.csv");
        fs::write(&input, "Area,Value\nA,1\nA,2\nB,3\n").unwrap();

        duplicates_command(Some(&fixture.config), &input, None, true, true).unwrap();

        assert_eq!(
            fs::read_to_string(fixture.path("dupes-filtered.csv")).unwrap(),
            "Area,Value\nA,1\nB,3\n"
        );
    }

    #[test]
    fn test_write_default_config_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join(LOCAL_CONFIG_FILE);

        write_default_config(&target, false).unwrap();
        assert!(write_default_config(&target, false).is_err());
        write_default_config(&target, true).unwrap();

        let config = config::load_config_file(&target).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_prefix() {
        assert_eq!(
            default_prefix(Path::new("data/planning-2024.csv")).unwrap(),
            "planning-2024"
        );
        assert!(default_prefix(Path::new("")).is_err());
    }
}
