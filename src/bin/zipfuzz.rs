//! Differential fuzz harness: `zipfuzz [ITERATIONS]`.
//!
//! Each iteration reads the persisted seed, regenerates the scratch tree,
//! archives it with the sibling `zip` binary, extracts the archive with the
//! system `unzip`, and demands the two trees be identical. Success bumps and
//! persists the seed; any failure leaves the seed in place for reproduction
//! and exits 0xff.

use microzip::fuzz;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const SEED_FILE: &str = "seed.txt";
const SCRATCH_DIR: &str = "scratch";
const FATAL: u8 = 0xff;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let iterations = match args.as_slice() {
        [] => None,
        [count] => match count.parse::<u64>() {
            Ok(count) => Some(count),
            Err(_) => {
                eprintln!("usage: zipfuzz [ITERATIONS]");
                return ExitCode::from(FATAL);
            }
        },
        _ => {
            eprintln!("usage: zipfuzz [ITERATIONS]");
            return ExitCode::from(FATAL);
        }
    };

    match run(iterations) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("zipfuzz: {}", err);
            ExitCode::from(FATAL)
        }
    }
}

fn run(iterations: Option<u64>) -> Result<(), microzip::Error> {
    let zip_bin = fuzz::writer_binary()?;
    let seed_path = PathBuf::from(SEED_FILE);
    let scratch = PathBuf::from(SCRATCH_DIR);

    let mut completed = 0u64;
    while iterations.map_or(true, |limit| completed < limit) {
        let seed = fuzz::read_seed(&seed_path)?;
        run_iteration(seed, &zip_bin, &scratch)?;
        fuzz::write_seed(&seed_path, seed + 1)?;
        completed += 1;
    }
    Ok(())
}

fn run_iteration(seed: u64, zip_bin: &Path, scratch: &Path) -> Result<(), microzip::Error> {
    match fs::remove_dir_all(scratch) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(microzip::Error::from(err)),
    }

    let stage = scratch.join("stage");
    fs::create_dir_all(&stage)?;
    let stats = fuzz::generate_tree(&stage, seed)?;

    let archive = scratch.join("archive.zip");
    fuzz::run_tool(zip_bin, &[archive.as_os_str(), stage.as_os_str()])?;

    let unzipped = scratch.join("unzipped");
    fuzz::run_tool(
        "unzip",
        &[OsStr::new("-d"), unzipped.as_os_str(), archive.as_os_str()],
    )?;

    fuzz::compare_trees(&stage, &unzipped)?;

    println!(
        "seed {}: ok ({} files, {} directories, {} bytes)",
        seed, stats.files, stats.directories, stats.bytes
    );
    Ok(())
}
