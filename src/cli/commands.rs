//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use tracing::{debug, instrument};

use crate::application::services::ValidationReport;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::AttackTree;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::layout::{self, NeverAbort};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Check { file }) => cmd_check(file),
        Some(Commands::Show { file }) => cmd_show(file),
        Some(Commands::Simplify { file, output }) => cmd_simplify(file, output.as_deref()),
        Some(Commands::Layout { file, fixed }) => cmd_layout(file, *fixed),
        Some(Commands::New {
            file,
            title,
            author,
            root_title,
            force,
        }) => cmd_new(file, title, author, root_title.as_deref(), *force),
        Some(Commands::Config { command }) => cmd_config(command, cli.dir.as_deref()),
        Some(Commands::Completion { shell }) => cmd_completion(*shell),
        None => Err(CliError::Usage(
            "no command given, see `atdraw --help`".to_string(),
        )),
    }
}

/// Directory whose local config applies to `file`.
fn document_dir(file: &Path) -> Option<&Path> {
    file.parent().filter(|p| !p.as_os_str().is_empty())
}

fn load_settings(dir: Option<&Path>) -> CliResult<Settings> {
    Ok(Settings::load(dir)?)
}

fn container_for(file: &Path) -> CliResult<ServiceContainer> {
    let settings = load_settings(document_dir(file))?;
    Ok(ServiceContainer::new(settings))
}

fn print_report(file: &Path, tree: &AttackTree, report: &ValidationReport) {
    output::header(&file.display());
    match &report.cycle {
        None => output::gate(true, "no cycles"),
        Some(id) => output::gate(false, &format!("cycle through {id}")),
    }
    let meta = if report.meta_complete {
        "title, author and root present"
    } else {
        "title, author or root missing"
    };
    output::gate(report.meta_complete, meta);
    if report.untitled.is_empty() {
        output::gate(true, "all nodes titled");
    } else {
        let ids: Vec<&str> = report.untitled.iter().map(|id| id.as_str()).collect();
        output::gate(false, &format!("untitled: {}", ids.join(", ")));
    }
    let form = if report.extended { "extended" } else { "simple" };
    output::detail(&format!("form: {form}"));
    for (kind, count) in tree.kind_counts() {
        output::detail(&format!("{kind}: {count}"));
    }
}

#[instrument]
fn cmd_check(file: &Path) -> CliResult<()> {
    let container = container_for(file)?;
    let service = container.document_service();
    let mut tree = service.load(file)?;

    let report = service.validate(&mut tree);
    print_report(file, &tree, &report);
    match report.first_error() {
        None => Ok(()),
        Some(err) => Err(ApplicationError::from(err).into()),
    }
}

#[instrument]
fn cmd_show(file: &Path) -> CliResult<()> {
    let container = container_for(file)?;
    let tree = container.document_service().load(file)?;

    if !tree.meta.title.is_empty() {
        output::header(&tree.meta.title);
    }
    for top in tree.top_level_nodes() {
        if let Some(rendered) = tree.to_termtree(top) {
            output::info(&rendered);
        }
    }
    Ok(())
}

#[instrument]
fn cmd_simplify(file: &Path, out: Option<&Path>) -> CliResult<()> {
    let container = container_for(file)?;
    let service = container.document_service();
    let mut tree = service.load(file)?;

    let clones = service.simplify(&mut tree)?;
    let target = out.unwrap_or(file);
    service.save(&mut tree, target)?;
    output::action(
        "Simplified",
        &format!("{} ({} nodes duplicated)", target.display(), clones),
    );
    Ok(())
}

#[instrument]
fn cmd_layout(file: &Path, fixed: bool) -> CliResult<()> {
    let mut settings = load_settings(document_dir(file))?;
    if fixed {
        settings.layout.fixed_positions = true;
    }
    let container = ServiceContainer::new(settings);
    let service = container.document_service();
    let mut tree = service.load(file)?;

    let report = service.layout(&mut tree, &NeverAbort)?;
    for (id, point) in layout::positions(&tree) {
        let kind = tree
            .node(&id)
            .map(|n| n.kind.label())
            .unwrap_or_default();
        output::info(&format!("{id} {kind} {} {}", point.x, point.y));
    }
    debug!("{:?}", report);
    if report.residual_overlap > 0 {
        output::warning(&format!(
            "{} node pairs still overlap after {} passes",
            report.residual_overlap, report.passes
        ));
    }
    Ok(())
}

#[instrument]
fn cmd_new(
    file: &Path,
    title: &str,
    author: &str,
    root_title: Option<&str>,
    force: bool,
) -> CliResult<()> {
    if file.exists() && !force {
        return Err(CliError::InvalidArgs(format!(
            "{} exists, use --force to overwrite",
            file.display()
        )));
    }
    let container = container_for(file)?;
    let service = container.document_service();
    let mut tree = service.new_document(title, author, root_title.unwrap_or(title))?;
    service.save(&mut tree, file)?;
    output::action("Created", &file.display());
    Ok(())
}

fn cmd_config(command: &ConfigCommands, dir: Option<&Path>) -> CliResult<()> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("resolve working directory", ".", e))?,
    };
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(Some(&dir))?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => print_path("global", &path),
                None => output::detail("global: (no config directory)"),
            }
            print_path("local", &local_config_path(&dir));
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(&dir)
            };
            init_config(&path)?;
            output::action("Created", &path.display());
        }
    }
    Ok(())
}

fn print_path(label: &str, path: &Path) {
    let state = if path.exists() { "" } else { " (not found)" };
    output::detail(&format!("{label}: {}{state}", path.display()));
}

fn init_config(path: &Path) -> CliResult<()> {
    if path.exists() {
        return Err(CliError::InvalidArgs(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| InfraError::io("create", parent, e))?;
    }
    std::fs::write(path, Settings::template())
        .map_err(|e| InfraError::io("write", path, e))?;
    Ok(())
}

fn cmd_completion(shell: Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
