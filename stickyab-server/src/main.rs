use clap::{parser::ValueSource, ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use stickyab::{Catalog, StickyabError};
use stickyab_http::serve;
use stickyab_http::server::DEFAULT_BIND_ADDR;

#[derive(Parser)]
#[command(name = "stickyab")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Experiment catalog (JSON array or {"experiments": [...]})
    #[arg(long, env = "STICKYAB_CATALOG", default_value = "./experiments.json")]
    catalog: String,
    #[arg(long, env = "STICKYAB_BIND_ADDR")]
    bind_addr: Option<String>,
    #[arg(long, env = "STICKYAB_PORT")]
    port: Option<u16>,

    /// Bind to 127.0.0.1:0 (OS-assigned ephemeral port). Prints resolved address at startup.
    #[arg(long)]
    auto_port: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load and validate a catalog, then print a per-experiment summary
    Check {
        /// Catalog path; defaults to --catalog
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cmd = Cli::command();
    let matches = cmd.get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    match cli.command {
        Some(Command::Check { ref path }) => {
            let path = path.clone().unwrap_or_else(|| cli.catalog.clone());
            run_check(&path)
        }
        None => {
            let bind_addr = resolve_bind_addr(&cli, &matches)
                .map_err(|msg| std::io::Error::new(std::io::ErrorKind::InvalidInput, msg))?;
            std::env::set_var("STICKYAB_CATALOG", &cli.catalog);
            std::env::set_var("STICKYAB_BIND_ADDR", &bind_addr);
            serve().await
        }
    }
}

fn run_check(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    match Catalog::load(std::path::Path::new(path)) {
        Ok(catalog) => {
            print!("{}", summarize(path, &catalog));
            Ok(())
        }
        Err(e) => {
            eprintln!("ERROR: {}", StickyabError::from(e));
            std::process::exit(1);
        }
    }
}

fn summarize(path: &str, catalog: &Catalog) -> String {
    let mut out = format!("{}: {} experiments\n", path, catalog.len());
    for experiment in catalog.iter() {
        out.push_str(&format!(
            "  {} ({})  routes={}  weight={}  sections={}  variants={}\n",
            experiment.name,
            experiment.experiment_id,
            experiment.route_names.join(","),
            experiment.weight,
            experiment.sections,
            experiment.variants.len(),
        ));
    }
    out
}

fn resolve_bind_addr(cli: &Cli, matches: &ArgMatches) -> Result<String, String> {
    if cli.auto_port && is_set_on_command_line(matches, "bind_addr") {
        return Err("--auto-port cannot be used with --bind-addr".to_string());
    }

    if cli.auto_port && is_set_on_command_line(matches, "port") {
        return Err("--auto-port cannot be used with --port".to_string());
    }

    if is_set_on_command_line(matches, "bind_addr") {
        if let Some(bind_addr) = &cli.bind_addr {
            return Ok(bind_addr.clone());
        }
    }

    if cli.auto_port {
        return Ok("127.0.0.1:0".to_string());
    }

    if is_set_on_command_line(matches, "port") {
        if let Some(port) = cli.port {
            return Ok(format!("127.0.0.1:{port}"));
        }
    }

    if let Some(bind_addr) = &cli.bind_addr {
        return Ok(bind_addr.clone());
    }

    if let Some(port) = cli.port {
        return Ok(format!("127.0.0.1:{port}"));
    }

    Ok(DEFAULT_BIND_ADDR.to_string())
}

fn is_set_on_command_line(matches: &ArgMatches, arg: &str) -> bool {
    matches.value_source(arg) == Some(ValueSource::CommandLine)
}
