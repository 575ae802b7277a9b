use anyhow::Context;
use clap::Parser as ClapParser;
use spicenet::parser::conv::Reconstruction;
use spicenet::parser::Parser;
use std::fs;
use std::path::{Path, PathBuf};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Each input converts independently: a bad file is reported and the
    // remaining files continue.
    let total = args.inputs.len();
    let mut failures = 0usize;
    for input in &args.inputs {
        match spice2ckt(input, args.out_dir.as_deref()) {
            Ok(out) => println!("{:?} -> {:?}", input, out),
            Err(err) => {
                failures += 1;
                eprintln!("conversion failed for {:?}: {:#}", input, err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {total} files failed to convert")
    }
    Ok(())
}

/// Arguments to [`spice2ckt`].
#[derive(ClapParser)]
#[command(
    version,
    about,
    long_about = "Convert one or more SPICE netlists to schematics (JSON)"
)]
pub struct Args {
    /// The input netlist files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// The directory where the schematic JSON files should be saved.
    ///
    /// Defaults to each input file's directory.
    #[arg(short, long)]
    out_dir: Option<PathBuf>,
}

/// Convert one netlist file to a schematic file, returning the output path.
pub fn spice2ckt(input: &Path, out_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let parsed = Parser::parse_file(input).with_context(|| "Failed to parse input netlist.")?;
    let Reconstruction {
        schematic,
        messages,
    } = parsed
        .to_graph()
        .with_context(|| "Failed to reconstruct a schematic.")?;
    for message in messages.iter() {
        eprintln!("{message}");
    }

    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "circuit".to_string());
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => match input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {:?}.", dir))?;
    let out = dir.join(format!("{stem}.json"));
    let json = serde_json::to_string_pretty(&schematic)
        .with_context(|| "Failed to encode the schematic as JSON.")?;
    fs::write(&out, json).with_context(|| format!("Failed to write schematic to {:?}.", out))?;
    Ok(out)
}
