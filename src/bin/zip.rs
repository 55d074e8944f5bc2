//! The archive-writer CLI: `zip ARCHIVE PATH...`.
//!
//! No option flags are defined; anything that looks like one is refused.
//! Every fatal condition prints one line on stderr and exits with 0xff.

use std::path::Path;
use std::process::ExitCode;

const USAGE: &str = "usage: zip ARCHIVE PATH...\n\
    Creates ARCHIVE (overwriting it) from the given files and directories.";

const FATAL: u8 = 0xff;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    for arg in &args {
        if arg.starts_with('-') {
            eprintln!("zip: unknown cmdline option: {}", arg);
            return ExitCode::from(FATAL);
        }
    }

    let Some((archive, inputs)) = args.split_first() else {
        eprintln!("{}", USAGE);
        return ExitCode::from(FATAL);
    };
    if inputs.is_empty() {
        eprintln!("{}", USAGE);
        return ExitCode::from(FATAL);
    }

    match run(archive, inputs) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("zip: {}", err);
            ExitCode::from(FATAL)
        }
    }
}

fn run(archive: &str, inputs: &[String]) -> Result<(), microzip::Error> {
    let entries = microzip::scan_inputs(inputs)?;
    microzip::write_archive(Path::new(archive), &entries)
}
