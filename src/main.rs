use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction,
    ArgMatches, Command,
};
use std::{path::PathBuf, process::ExitCode};
use sxspack::api::{self, Overrides, SxsError};

fn qt_bin_arg() -> Arg {
    Arg::new("qt-bin")
        .long("qt-bin")
        .value_name("DIR")
        .help("Qt bin directory; skips the PATH lookup")
        .value_parser(value_parser!(PathBuf))
}

fn debug_dlls_arg() -> Arg {
    Arg::new("debug-dlls")
        .long("debug-dlls")
        .help("Also ship the debug build of every library")
        .action(ArgAction::SetTrue)
}

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> ExitCode {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Config file (defaults to ./sxspack.toml when present)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("deploy")
                .about("Recreates the private assembly folder, copies and patches the libraries")
                .arg(qt_bin_arg())
                .arg(debug_dlls_arg())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .value_name("DIR")
                        .help("Assembly folder to recreate")
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Lists the copies deploy would make, without touching the disk")
                .arg(qt_bin_arg())
                .arg(debug_dlls_arg()),
        )
        .subcommand(
            Command::new("locate")
                .about("Shows where the resource editor and the Qt bin directory were found")
                .arg(qt_bin_arg()),
        )
        .get_matches();

    let Some((command, args)) = matches.subcommand() else {
        unreachable!()
    };

    let level = if args.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let overrides = overrides(args);

    let result = match command {
        "deploy" => api::deploy(&overrides).map(|_| ()),
        "plan" => api::plan(&overrides).map(|_| ()),
        "locate" => api::locate(&overrides).map(|_| ()),
        _ => unreachable!(),
    };

    report(result)
}

fn overrides(args: &ArgMatches) -> Overrides {
    let flag = |name: &str| {
        args.try_get_one::<bool>(name)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    };
    let path = |name: &str| args.try_get_one::<PathBuf>(name).ok().flatten().cloned();

    Overrides {
        config: args.get_one::<PathBuf>("config").cloned(),
        qt_bin: path("qt-bin"),
        output: path("output"),
        debug_dlls: flag("debug-dlls"),
    }
}

fn report(result: Result<(), SxsError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{:?}", miette::Report::new(error));
            ExitCode::FAILURE
        }
    }
}
