//! Command dispatch: one function per subcommand

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::{build_registry, IoResultExt, MirrorSession, RecordDocument};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::Tagged;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree { document }) => cmd_tree(document),
        Some(Commands::Walk { document }) => cmd_walk(document),
        Some(Commands::Filter { document, traits }) => cmd_filter(document, traits),
        Some(Commands::Render { document }) => cmd_render(document),
        Some(Commands::Kinds { dir }) => cmd_kinds(dir.as_deref()),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show { dir } => cmd_config_show(dir.as_deref()),
            ConfigCommands::Template => {
                output::info(&Settings::template());
                Ok(())
            }
            ConfigCommands::Path => cmd_config_path(),
        },
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::InvalidArgs(
            "no command given, see --help".to_string(),
        )),
    }
}

/// Settings for a document: the local config lives next to it.
fn open_session(document: &Path) -> CliResult<MirrorSession> {
    let doc = RecordDocument::load(document)?;
    let settings = Settings::load(doc.dir())?;
    debug!(?settings, "effective settings");
    Ok(MirrorSession::from_document(&doc, &settings)?)
}

#[instrument]
fn cmd_tree(document: &Path) -> CliResult<()> {
    let mut session = open_session(document)?;
    for tree in session.trees() {
        output::info(&tree);
    }
    let stats = session.stats()?;
    output::action(
        "nodes",
        &format!(
            "{} (depth {}, {} leaves)",
            stats.nodes, stats.depth, stats.leaves
        ),
    );
    Ok(())
}

#[instrument]
fn cmd_walk(document: &Path) -> CliResult<()> {
    let mut session = open_session(document)?;
    for line in session.walk_lines()? {
        output::info(&line);
    }
    Ok(())
}

#[instrument]
fn cmd_filter(document: &Path, traits: &[String]) -> CliResult<()> {
    let mut session = open_session(document)?;
    let matches = session.filter_traits(traits)?;
    if matches.is_empty() {
        output::warning(&format!("no node carries {}", traits.join(", ")));
    }
    for line in matches {
        output::info(&line);
    }
    Ok(())
}

#[instrument]
fn cmd_render(document: &Path) -> CliResult<()> {
    let mut session = open_session(document)?;
    for line in session.render()? {
        output::info(&line);
    }
    Ok(())
}

#[instrument]
fn cmd_kinds(dir: Option<&Path>) -> CliResult<()> {
    let settings = Settings::load(dir)?;
    let registry = build_registry(&settings)?;
    output::header(&format!("{} ({})", registry.name(), registry.len()));
    for id in registry.ids() {
        let Some(class) = registry.get(&id) else {
            continue;
        };
        let traits: Vec<String> = class.traits().into_iter().collect();
        let base = class
            .base()
            .and_then(|b| b.tag())
            .map(|tag| format!(" extends {}", tag))
            .unwrap_or_default();
        output::action(&id, &format!("{}{} [{}]", class.describe(), base, traits.join(", ")));
    }
    Ok(())
}

#[instrument]
fn cmd_config_show(dir: Option<&Path>) -> CliResult<()> {
    let settings = Settings::load(dir)?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn cmd_config_path() -> CliResult<()> {
    match global_config_path() {
        Some(path) => output::action("global", &path.display()),
        None => output::warning("no config directory for this platform"),
    }
    let cwd = std::env::current_dir().with_path_context("resolve working directory", Path::new("."))?;
    output::action("local", &local_config_path(&cwd).display());
    output::detail("env: TREESYNC_MAX_SYNC_DEPTH, TREESYNC_DEFAULT_KIND");
    Ok(())
}
