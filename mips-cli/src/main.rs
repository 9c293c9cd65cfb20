#[macro_use]
extern crate clap;

use clap::{Arg, ArgGroup};
use mips_core::EngineConfig;
use std::path::Path;
use std::process;

#[derive(Debug)]
enum Error {
    Cli(mips_cli::CliError),
    Clap(clap::Error),
}

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = app_from_crate!()
        .arg(
            Arg::with_name("PROGRAM")
                .help("Runs an already-assembled .mex program")
                .index(1),
        )
        .arg(
            Arg::with_name("assembly")
                .short("a")
                .long("assembly")
                .takes_value(true)
                .value_name("ASSEMBLY")
                .help("Assembles and runs a MIPS32 Release-6 source file"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .value_name("MEX")
                .requires("assembly")
                .help("Assembles ASSEMBLY to a .mex file instead of running it"),
        )
        .arg(
            Arg::with_name("delay-slots")
                .long("delay-slots")
                .help("Executes a delay slot's instruction before its branch or jump commits"),
        )
        .arg(
            Arg::with_name("loop-limit")
                .long("loop-limit")
                .takes_value(true)
                .value_name("N")
                .default_value("100")
                .help("Re-fetches tolerated at the same address before the engine gives up on a runaway loop"),
        )
        .group(
            ArgGroup::with_name("input")
                .args(&["PROGRAM", "assembly"])
                .required(true),
        )
        .get_matches();

    let loop_limit = value_t!(matches.value_of("loop-limit"), u32).map_err(Error::Clap)?;
    let config = EngineConfig { delay_slots: matches.is_present("delay-slots"), loop_limit };

    if let Some(mex_out) = matches.value_of("output") {
        let asm = matches.value_of("assembly").unwrap();
        mips_cli::assemble_to_mex(Path::new(asm), Path::new(mex_out)).map_err(Error::Cli)?;
        return Ok(());
    }

    let (reason, exit_code) = match matches.value_of("PROGRAM") {
        Some(program) => mips_cli::run_mex(Path::new(program), config),
        None => mips_cli::run_source(Path::new(matches.value_of("assembly").unwrap()), config),
    }
    .map_err(Error::Cli)?;

    eprintln!("{}", reason);
    process::exit(exit_code.unwrap_or(0) as i32);
}
