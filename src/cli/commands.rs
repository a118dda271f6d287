use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::services::AnalysisOptions;
use crate::application::{ColorMode, NodeColorizer, OutputFormat, TreeRenderer};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{self, Settings};
use crate::domain::{Direction, RoundingPolicy};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::expand_path;

/// Per-invocation overrides from `annotate` flags.
#[derive(Debug, Default)]
struct AnnotateArgs<'a> {
    node: Option<&'a str>,
    mode: Option<ColorMode>,
    ladderize: Option<Direction>,
    no_ladderize: bool,
    rounding: Option<RoundingPolicy>,
    precision: Option<u32>,
    format: OutputFormat,
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let paint = !cli.no_color;
    match &cli.command {
        Some(Commands::Annotate {
            tree,
            node,
            mode,
            ladderize,
            no_ladderize,
            rounding,
            precision,
            format,
        }) => {
            let container = container(cli)?;
            let args = AnnotateArgs {
                node: node.as_deref(),
                mode: *mode,
                ladderize: *ladderize,
                no_ladderize: *no_ladderize,
                rounding: *rounding,
                precision: *precision,
                format: *format,
            };
            _annotate(&container, tree, &args, paint)
        }
        Some(Commands::Leaves { tree }) => _leaves(&container(cli)?, tree),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => _config_show(cli),
            ConfigCommands::Path => _config_path(cli),
            ConfigCommands::Init { global, force } => _config_init(cli, *global, *force),
        },
        Some(Commands::Completion { shell }) => _completion(*shell),
        None => Ok(()),
    }
}

fn project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(expand_path(dir)),
        None => std::env::current_dir().map_err(|e| InfraError::io("resolve working directory", e).into()),
    }
}

fn container(cli: &Cli) -> CliResult<ServiceContainer> {
    let dir = project_dir(cli)?;
    let settings = Settings::load(Some(dir.as_path()))?;
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

#[instrument(skip(container, args))]
fn _annotate(container: &ServiceContainer, tree: &Path, args: &AnnotateArgs<'_>, paint: bool) -> CliResult<()> {
    let settings: &Settings = &container.settings;
    let mut options = AnalysisOptions::from(settings);
    if let Some(precision) = args.precision {
        options.precision = precision;
    }
    if let Some(rounding) = args.rounding {
        options.rounding = rounding;
    }
    if args.no_ladderize {
        options.ladderize = None;
    } else if args.ladderize.is_some() {
        options.ladderize = args.ladderize;
    }
    options.focus = args.node.map(str::to_string);

    if options.precision > crate::domain::biogeography::MAX_PRECISION {
        return Err(CliError::InvalidArgs(format!(
            "precision {} exceeds maximum {}",
            options.precision,
            crate::domain::biogeography::MAX_PRECISION
        )));
    }

    let analysis = container.analysis.analyze(&expand_path(tree), &options)?;

    let colorizer = NodeColorizer::from_settings(settings).with_mode(args.mode.unwrap_or(settings.mode));
    let renderer = TreeRenderer::new(&colorizer, paint);
    match args.format {
        OutputFormat::Tree => {
            let rendered = renderer.render_tree(&analysis.tree, analysis.focus)?;
            print!("{rendered}");
        }
        OutputFormat::Table => {
            let table = renderer.render_table(&analysis.tree, analysis.focus)?;
            print!("{table}");
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn _leaves(container: &ServiceContainer, tree: &Path) -> CliResult<()> {
    let records = container.analysis.leaves(&expand_path(tree))?;
    for record in records {
        output::info(&format!(
            "{}\t{}\t{}",
            record.label, record.leaf.display_name, record.leaf.location
        ));
    }
    Ok(())
}

fn _config_show(cli: &Cli) -> CliResult<()> {
    let settings = Settings::load(Some(project_dir(cli)?.as_path()))?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn _config_path(cli: &Cli) -> CliResult<()> {
    output::header("Config paths");
    match config::global_config_path() {
        Some(path) => output::action("global", &path.display()),
        None => output::warning("no home directory, global config disabled"),
    }
    output::action("local", &config::local_config_path(&project_dir(cli)?).display());
    Ok(())
}

#[instrument(skip(cli))]
fn _config_init(cli: &Cli, global: bool, force: bool) -> CliResult<()> {
    let path = if global {
        config::global_config_path()
            .ok_or_else(|| CliError::Usage("cannot determine global config directory".to_string()))?
    } else {
        config::local_config_path(&project_dir(cli)?)
    };

    let container = ServiceContainer::new(Settings::default());
    if container.fs.exists(&path) && !force {
        return Err(CliError::Usage(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    container
        .fs
        .ensure_parent(&path)
        .map_err(|e| InfraError::io(format!("create directory for {}", path.display()), e))?;
    container
        .fs
        .write(&path, &Settings::template())
        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
    output::action("Created", &path.display());
    Ok(())
}

fn _completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
