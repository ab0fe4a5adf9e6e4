// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("devsetup")
        .version(env!("CARGO_PKG_VERSION"))
        .author("devsetup Contributors")
        .about("Declarative workstation provisioning with parallel package installs")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .env("DEVSETUP_CONFIG")
                .default_value("packages.yaml")
                .global(true)
                .help("Package list (YAML)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("Increase log verbosity (-v info, -vv debug)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Hide progress bars"),
        )
        .subcommand(
            Command::new("install")
                .about("Install every package from the enabled categories")
                .arg(
                    Arg::new("dry_run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Show what would be installed without touching anything"),
                )
                .arg(
                    Arg::new("only")
                        .long("only")
                        .value_name("CATEGORY")
                        .help("Install a single category (even if disabled)"),
                )
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .value_parser(["library", "application"])
                        .help("Install a single kind of package"),
                )
                .arg(
                    Arg::new("max_jobs")
                        .short('j')
                        .long("max-jobs")
                        .value_name("N")
                        .help("Maximum concurrent installs"),
                )
                .arg(
                    Arg::new("retry_attempts")
                        .long("retry-attempts")
                        .value_name("N")
                        .help("Install attempts per package"),
                )
                .arg(
                    Arg::new("retry_delay")
                        .long("retry-delay")
                        .value_name("SECS")
                        .help("Seconds to wait before the first retry"),
                )
                .arg(
                    Arg::new("fail_fast")
                        .long("fail-fast")
                        .action(ArgAction::SetTrue)
                        .help("Stop starting new packages after the first failure"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the run report as JSON on stdout"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("List categories and their package counts")
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Include disabled categories"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Man pages go next to the manifest
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("devsetup.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
