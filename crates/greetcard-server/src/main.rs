use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use greetcard_core::client::{ClaimForm, FileFlagStore, Notice};
use greetcard_server::{telemetry, ClaimClient, LogFormat, ServerConfig, Simulation};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_RECIPIENT: &str = "owner@example.com";

fn cli() -> Command {
    Command::new("greetcard")
        .version(greetcard_server::VERSION)
        .about("Greeting card claim service")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve")
                .about("Run the claim service")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .env("GREETCARD_CONFIG")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("listen")
                        .long("listen")
                        .value_parser(value_parser!(SocketAddr))
                        .help("Listen address, overrides the configuration"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Log claim mails instead of sending them"),
                ),
        )
        .subcommand(
            Command::new("claim")
                .about("Submit the one-time claim form")
                .arg(
                    Arg::new("server")
                        .long("server")
                        .default_value("http://127.0.0.1:3000")
                        .help("Base URL of the claim service"),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .default_value(DEFAULT_RECIPIENT)
                        .help("Recipient address"),
                )
                .arg(
                    Arg::new("subject")
                        .long("subject")
                        .required(true)
                        .help("Your contact address"),
                )
                .arg(
                    Arg::new("message")
                        .long("message")
                        .required(true)
                        .help("What you would like built"),
                )
                .arg(
                    Arg::new("state-dir")
                        .long("state-dir")
                        .default_value(".greetcard")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory holding the local submission flag"),
                )
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Skip the confirmation prompt"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the card on a virtual clock and print every effect")
                .arg(
                    Arg::new("toggles")
                        .long("toggles")
                        .default_value("2")
                        .value_parser(value_parser!(u32))
                        .help("Number of clicks"),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Milliseconds between clicks"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducible confetti"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("serve", args)) => serve(args).await,
        Some(("claim", args)) => claim(args).await,
        Some(("simulate", args)) => simulate(args),
        _ => Ok(()),
    }
}

async fn serve(args: &ArgMatches) -> anyhow::Result<()> {
    let path = args.get_one::<PathBuf>("config");
    let mut config = ServerConfig::load(path.map(PathBuf::as_path))
        .with_context(|| format!("loading configuration from {path:?}"))?;
    if let Some(listen) = args.get_one::<SocketAddr>("listen") {
        config.listen_addr = *listen;
    }
    if args.get_flag("dry-run") {
        config.relay.dry_run = true;
    }

    telemetry::init(config.log_format);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
        }
    };
    greetcard_server::serve(&config, |_| {}, shutdown).await?;
    Ok(())
}

async fn claim(args: &ArgMatches) -> anyhow::Result<()> {
    telemetry::init(LogFormat::Pretty);

    let server = arg(args, "server")?;
    let state_dir = args
        .get_one::<PathBuf>("state-dir")
        .context("missing --state-dir")?;

    let mut form = ClaimForm::mount(FileFlagStore::new(state_dir), arg(args, "to")?);
    if !form.should_show_form() {
        println!("You have already submitted a feature request.");
        return Ok(());
    }
    form.set_subject(arg(args, "subject")?);
    form.set_message(arg(args, "message")?);

    let prompt = form
        .request_submit()
        .context("form is not accepting submissions")?;
    if !args.get_flag("yes") && !confirmed(&prompt)? {
        form.cancel();
        println!("Cancelled.");
        return Ok(());
    }

    println!("{}", form.submit_label());
    if let Some(notice) = ClaimClient::new(server).submit_form(&mut form).await {
        println!("{}: {}", notice.title, notice.description);
    }
    Ok(())
}

fn confirmed(prompt: &Notice) -> anyhow::Result<bool> {
    print!("{}\n{} [y/N] ", prompt.title, prompt.description);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn simulate(args: &ArgMatches) -> anyhow::Result<()> {
    let simulation = Simulation {
        toggles: *args.get_one::<u32>("toggles").context("missing --toggles")?,
        interval: Duration::from_millis(
            *args
                .get_one::<u64>("interval-ms")
                .context("missing --interval-ms")?,
        ),
        seed: *args.get_one::<u64>("seed").context("missing --seed")?,
    };

    for step in simulation.run() {
        println!("{}", serde_json::to_string(&step)?);
    }
    Ok(())
}

fn arg<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}
