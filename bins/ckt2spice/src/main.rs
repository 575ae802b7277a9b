use anyhow::Context;
use cirgraph::Schematic;
use clap::Parser as ClapParser;
use spicenet::export_netlist;
use std::fs;
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    println!("input schematic: {:?}", &args.schematic);
    let out = ckt2spice(args)?;
    println!("wrote {:?}", out);

    Ok(())
}

/// Arguments to [`ckt2spice`].
#[derive(ClapParser)]
#[command(
    version,
    about,
    long_about = "Convert a schematic (JSON) to a SPICE netlist"
)]
pub struct Args {
    /// The path to the input schematic JSON file.
    schematic: PathBuf,
    /// The path where the output netlist should be saved.
    ///
    /// The file and its parent directories will be created if necessary.
    /// If the file already exists, it will be overwritten.
    ///
    /// If unspecified, the filename is derived from the circuit's name.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// Convert the given schematic to a netlist file, returning the output path.
///
/// The netlist is produced in memory first; nothing is written unless the
/// whole conversion succeeds.
pub fn ckt2spice(args: Args) -> anyhow::Result<PathBuf> {
    let data = fs::read_to_string(&args.schematic)
        .with_context(|| format!("Failed to read schematic {:?}.", args.schematic))?;
    let sch: Schematic =
        serde_json::from_str(&data).with_context(|| "Failed to decode schematic JSON.")?;

    let issues = sch.validate();
    for issue in issues.iter() {
        eprintln!("{issue}");
    }
    if issues.has_error() {
        anyhow::bail!("One or more errors in the schematic identified; aborting.")
    }

    let netlist = export_netlist(&sch).with_context(|| "Failed to convert to a netlist.")?;

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(format!("{}.cir", sch.name())));
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {:?}.", parent))?;
    }
    fs::write(&out, netlist).with_context(|| format!("Failed to write netlist to {:?}.", out))?;
    Ok(out)
}
