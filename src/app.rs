// Declare modules
pub mod applier;
pub mod cli;
pub mod config;
pub mod formatter;
pub mod models;
pub mod parser;
pub mod repl;
pub mod scanner;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader};

use self::cli::{Cli, Command};
use self::config::resolve_project;
use self::formatter::BundleWriter;
use self::models::{DirectiveSet, Project};
use self::parser::{parse_with, ParseMode};
use self::repl::Session;
use self::scanner::Scanner;

fn mode(strict: bool) -> ParseMode {
    if strict {
        ParseMode::Strict
    } else {
        ParseMode::Lenient
    }
}

/// Initializes components and dispatches the chosen command.
pub fn run() -> Result<()> {
    let args = Cli::parse();

    // First run (or explicit init) goes through the interactive bootstrap
    let config_exists = args.config.exists();
    if args.command == Command::Init || !config_exists {
        let stdin = io::stdin();
        config::init(&args.config, &mut stdin.lock(), &mut io::stdout())?;
        if args.command == Command::Init {
            return Ok(());
        }
    }

    // Preset auto-detection uses the name of the project folder
    let config_path =
        std::path::absolute(&args.config).context("Failed to resolve config path")?;
    let project_name = config_path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str());

    let project = resolve_project(
        &config_path,
        args.preset.as_deref(),
        project_name,
        args.exclude,
    )?;

    match args.command {
        Command::Scan { gitignore } => scan(&project, gitignore),
        Command::Apply { from, strict } => {
            let directives = match from {
                Some(path) if path.as_os_str() == "-" => {
                    parse_with(io::stdin().lock(), mode(strict))?
                }
                Some(path) => read_bundle(&path, mode(strict))?,
                None => read_bundle(&project.output_file(), mode(strict))?,
            };
            apply(&directives, &project)
        }
        Command::Repl { strict } => {
            let mut session = Session::new(&project, mode(strict));
            session.run(io::stdin().lock(), &mut io::stdout())?;
            log::info!("Session closed after {} applied bundle(s).", session.applied());
            Ok(())
        }
        Command::Init => Ok(()),
    }
}

fn scan(project: &Project, gitignore: bool) -> Result<()> {
    let entries = Scanner::new(project.input_dir(), &project.config)?
        .git_ignore(gitignore)
        .scan()?;

    if entries.is_empty() {
        log::warn!("⚠️ No files found under {:?}.", project.input_dir());
    }

    let count = BundleWriter::write(&entries, &project.output_file())?;
    println!("✅ Bundled {} files.", count);
    Ok(())
}

fn read_bundle(path: &std::path::Path, mode: ParseMode) -> Result<DirectiveSet> {
    let file = File::open(path).with_context(|| format!("Failed to open bundle {:?}", path))?;
    Ok(parse_with(BufReader::new(file), mode)?)
}

fn apply(directives: &DirectiveSet, project: &Project) -> Result<()> {
    if directives.is_empty() {
        log::warn!("⚠️ Bundle holds no directives.");
    }
    let report = applier::apply(directives, project)?;
    println!(
        "✅ Applied {} files, removed {} paths, wiped {} entries.",
        report.written, report.removed, report.wiped
    );
    Ok(())
}
