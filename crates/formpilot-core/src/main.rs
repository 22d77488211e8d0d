//! `formpilot` command-line tool: replay command batches, check documents,
//! print tool schemas and inspect stored chat history

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use formpilot_core::{init_tracing, ChatStore, EditorConfig, FormId, JsonFileChatStore, Role};
use formpilot_document::{decode_all, tool_definitions, CommandInvocation, FormState};
use formpilot_engine::{ApplyContext, BatchSequencer};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Command::new("formpilot")
        .version(formpilot_core::VERSION)
        .about("Agent-driven form builder tooling")
        .arg(
            Arg::new("log")
                .long("log")
                .global(true)
                .default_value("warn")
                .help("Tracing filter when RUST_LOG is unset"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("apply")
                .about("Apply a batch of command invocations to a form state")
                .arg(path_arg("state", "Form state JSON"))
                .arg(path_arg("commands", "JSON array of {name, arguments} invocations"))
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Where to write the new state (stdout if omitted)"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Editor configuration TOML"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Check a form state's document invariants")
                .arg(path_arg("state", "Form state JSON")),
        )
        .subcommand(Command::new("tools").about("Print the agent tool definitions as JSON"))
        .subcommand(
            Command::new("history")
                .about("Show a form's stored chat history")
                .arg(path_arg("dir", "Chat store directory"))
                .arg(
                    Arg::new("form")
                        .long("form")
                        .required(true)
                        .help("Form id"),
                )
                .arg(
                    Arg::new("pending")
                        .long("pending")
                        .action(ArgAction::SetTrue)
                        .help("Only messages awaiting confirmation"),
                ),
        );

    let matches = cli.get_matches();
    if let Some(filter) = matches.get_one::<String>("log") {
        init_tracing(filter);
    }

    match matches.subcommand() {
        Some(("apply", args)) => apply(args),
        Some(("check", args)) => check(args),
        Some(("tools", _)) => {
            let tools = tool_definitions().context("building tool schemas")?;
            println!("{}", serde_json::to_string_pretty(&tools)?);
            Ok(())
        }
        Some(("history", args)) => history(args).await,
        _ => Ok(()),
    }
}

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("--{name} is required"))
}

fn read_state(path: &Path) -> Result<FormState> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn apply(args: &ArgMatches) -> Result<()> {
    let state = read_state(required_path(args, "state")?)?;
    if let Err(err) = state.document.check_invariants() {
        bail!("invalid document: {err}");
    }
    let commands_path = required_path(args, "commands")?;
    let raw = std::fs::read_to_string(commands_path)
        .with_context(|| format!("reading {}", commands_path.display()))?;
    let invocations: Vec<CommandInvocation> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", commands_path.display()))?;

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => EditorConfig::from_toml_file(path)?,
        None => EditorConfig::new(),
    };

    let (commands, rejected) = decode_all(&invocations);
    for (index, err) in &rejected {
        eprintln!("#{index}: rejected: {err}");
    }

    let ctx = ApplyContext::default().with_default_section_title(config.default_section_title);
    let outcome = BatchSequencer::new().apply_batch(&state, &commands, &ctx);
    for (command, result) in commands.iter().zip(&outcome.outcomes) {
        eprintln!("{}: {result}", command.kind());
    }
    eprintln!(
        "{} of {} commands applied",
        outcome.applied_count(),
        invocations.len()
    );

    let json = serde_json::to_string_pretty(&outcome.state)?;
    match args.get_one::<PathBuf>("out") {
        Some(out) => {
            std::fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn check(args: &ArgMatches) -> Result<()> {
    let state = read_state(required_path(args, "state")?)?;
    match state.document.check_invariants() {
        Ok(()) => {
            println!(
                "ok: {} sections, {} elements",
                state.document.sections().len(),
                state.document.element_count()
            );
            Ok(())
        }
        Err(err) => bail!("invalid document: {err}"),
    }
}

async fn history(args: &ArgMatches) -> Result<()> {
    let dir = required_path(args, "dir")?;
    let form = args
        .get_one::<String>("form")
        .context("--form is required")?;
    let pending_only = args.get_flag("pending");

    let store = JsonFileChatStore::open(dir).await?;
    let Some(session) = store.session_for(&FormId::new(form.as_str())).await? else {
        println!("no history for {form}");
        return Ok(());
    };
    for message in store.get_messages(&session.id).await? {
        let pending = message.role == Role::Assistant && message.has_commands() && !message.applied;
        if pending_only && !pending {
            continue;
        }
        let mark = if message.applied { "applied" } else if pending { "pending" } else { "" };
        println!(
            "{} {:<9} {:<7} {} ({} commands)",
            message.id,
            message.role,
            mark,
            message.text.lines().next().unwrap_or_default(),
            message.command_invocations.len()
        );
    }
    Ok(())
}
