use anyhow::{Context, Result};
use clap::builder::PossibleValuesParser;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use upc_cli::{check, extract_kb, extract_upgrade, render_text, versions, CliConfig, OutputFormat, Overrides};
use upc_precheck::RULE_NAMES;

fn cli() -> Command {
    Command::new("upgrade-precheck")
        .version(upc_cli::VERSION)
        .about("Source-derived upgrade prechecks for TiDB clusters")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("knowledge")
                .long("knowledge")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Knowledge base root directory"),
        )
        .arg(
            Arg::new("bootstrap-dir")
                .long("bootstrap-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory of upgrade_logic.json documents replacing the bundled map"),
        )
        .arg(
            Arg::new("log-filter")
                .long("log-filter")
                .global(true)
                .help("Log filter directive, used when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("extract-kb")
                .about("Extract a knowledge base snapshot from a source checkout")
                .disable_version_flag(true)
                .arg(Arg::new("component").long("component").default_value("tidb").help("Component name"))
                .arg(Arg::new("version").long("version").required(true).help("Release of the checkout"))
                .arg(
                    Arg::new("source")
                        .long("source")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Source checkout root"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file; defaults to the knowledge base layout"),
                ),
        )
        .subcommand(
            Command::new("extract-upgrade")
                .about("Extract forced and default variable changes from the upgrade source")
                .arg(
                    Arg::new("source")
                        .long("source")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Source checkout root"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file; printed to stdout when omitted"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Run prechecks against a cluster snapshot")
                .arg(
                    Arg::new("snapshot")
                        .long("snapshot")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Snapshot JSON file"),
                )
                .arg(
                    Arg::new("catalog")
                        .long("catalog")
                        .value_parser(value_parser!(PathBuf))
                        .help("Change catalog document"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .default_value("json")
                        .value_parser(["json", "text"])
                        .help("Report format"),
                )
                .arg(
                    Arg::new("rule")
                        .long("rule")
                        .action(ArgAction::Append)
                        .value_parser(PossibleValuesParser::new(RULE_NAMES.iter().copied()))
                        .help("Run only this rule; repeatable"),
                ),
        )
        .subcommand(Command::new("versions").about("List the release to bootstrap revision map"))
}

fn overrides(matches: &ArgMatches) -> Overrides {
    Overrides {
        knowledge_dir: matches.get_one::<PathBuf>("knowledge").cloned(),
        catalog: matches
            .try_get_one::<PathBuf>("catalog")
            .ok()
            .flatten()
            .cloned(),
        bootstrap_dir: matches.get_one::<PathBuf>("bootstrap-dir").cloned(),
        log_filter: matches.get_one::<String>("log-filter").cloned(),
        enabled_rules: matches
            .try_get_many::<String>("rule")
            .ok()
            .flatten()
            .map(|rules| rules.cloned().collect())
            .unwrap_or_default(),
    }
}

fn init_tracing(config: &CliConfig, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(matches: &ArgMatches) -> Result<i32> {
    let Some((name, sub)) = matches.subcommand() else {
        return Ok(0);
    };
    let config = CliConfig::load_optional(sub.get_one::<PathBuf>("config").map(PathBuf::as_path))?
        .with_overrides(overrides(sub));
    init_tracing(&config, sub.get_flag("log-json"));

    match name {
        "extract-kb" => {
            let component = sub.get_one::<String>("component").map_or("tidb", String::as_str);
            let version = sub
                .get_one::<String>("version")
                .context("--version is required")?;
            let source = sub.get_one::<PathBuf>("source").context("--source is required")?;
            let out = sub.get_one::<PathBuf>("out").map(PathBuf::as_path);

            let (path, snapshot) = extract_kb(component, version, source, out, &config)?;
            println!(
                "Wrote {} ({} system variables, {} config defaults, bootstrap {})",
                path.display(),
                snapshot.system_variables.len(),
                snapshot.config_defaults.len(),
                snapshot.bootstrap_version
            );
        }
        "extract-upgrade" => {
            let source = sub.get_one::<PathBuf>("source").context("--source is required")?;
            let out = sub.get_one::<PathBuf>("out").map(PathBuf::as_path);

            let document = extract_upgrade(source, out, &config)?;
            match out {
                Some(path) => println!("Wrote {} changes to {}", document.len(), path.display()),
                None => println!("{}", document.to_json_pretty()?),
            }
        }
        "check" => {
            let snapshot = sub.get_one::<PathBuf>("snapshot").context("--snapshot is required")?;
            let format: OutputFormat = sub
                .get_one::<String>("format")
                .map_or("json", String::as_str)
                .parse()?;

            let report = check(snapshot, &config)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", report.to_json_pretty()?);
                    eprintln!("{}", report.summary_line());
                }
                OutputFormat::Text => print!("{}", render_text(&report)),
            }
            return Ok(i32::from(report.has_blocking()));
        }
        "versions" => {
            for (release, revision) in versions(&config)? {
                println!("{release}\t{revision}");
            }
        }
        _ => {}
    }
    Ok(0)
}

fn main() {
    let matches = cli().get_matches();
    match run(&matches) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn global_flags_become_overrides() {
        let matches = cli()
            .try_get_matches_from([
                "upgrade-precheck",
                "check",
                "--snapshot",
                "s.json",
                "--catalog",
                "c.json",
                "--knowledge",
                "kb",
                "--rule",
                "core.target-version-order",
            ])
            .unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        let o = overrides(sub);

        assert_eq!(o.catalog, Some(PathBuf::from("c.json")));
        assert_eq!(o.knowledge_dir, Some(PathBuf::from("kb")));
        assert_eq!(o.enabled_rules, vec!["core.target-version-order".to_string()]);
    }

    #[test]
    fn unknown_rule_rejected_by_parser() {
        let result = cli().try_get_matches_from([
            "upgrade-precheck",
            "check",
            "--snapshot",
            "s.json",
            "--rule",
            "core.nope",
        ]);
        assert!(result.is_err());
    }
}
