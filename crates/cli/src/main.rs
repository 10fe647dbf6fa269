use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing_subscriber::EnvFilter;

mod commands;
mod manifest;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let matches = build_cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let manifest = manifest::load_manifest(config_path).context("load query manifest")?;

    match matches.subcommand() {
        Some(("list", _)) => print_json(&commands::list(&manifest)),
        Some(("run", sub)) => run_cmd(&manifest, sub).await,
        Some((other, _)) => anyhow::bail!("unsupported subcommand '{}'", other),
        None => anyhow::bail!("expected a subcommand"),
    }
}

/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn build_cli() -> Command {
    Command::new("fathom")
        .about("Run declarative REST and GraphQL queries")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .action(ArgAction::Set)
                .value_name("PATH")
                .help("Path to the query manifest (defaults to $FATHOM_CONFIG_PATH or the user config dir)"),
        )
        .subcommand(Command::new("list").about("List providers and queries declared in the manifest"))
        .subcommand(
            Command::new("run")
                .about("Execute queries and print their results as JSON")
                .arg(
                    Arg::new("queries")
                        .value_name("QUERY")
                        .num_args(0..)
                        .action(ArgAction::Append)
                        .help("Queries to run; all when omitted"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print prepared requests without sending them"),
                )
                .arg(
                    Arg::new("root-path")
                        .long("root-path")
                        .action(ArgAction::Set)
                        .value_name("PATH")
                        .help("Override the root property path for every query"),
                ),
        )
}

async fn run_cmd(manifest: &manifest::Manifest, sub: &ArgMatches) -> Result<()> {
    let selected = sub
        .get_many::<String>("queries")
        .map(|values| values.cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    let mut manager = commands::build_manager(manifest, &selected)?;

    if sub.get_flag("dry-run") {
        return print_json(&commands::dry_run(&manager)?);
    }

    let root_path = sub.get_one::<String>("root-path").map(String::as_str);
    let output = commands::run(&mut manager, manifest, root_path).await?;
    print_json(&output)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
