use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};

use hmmforge::alphabet::Alphabet;
use hmmforge::build::{BuildArgs, BuildRequest, Builder};
use hmmforge::msa::Msa;

/// Environment variable holding extra score-matrix search directories.
const MATRIX_ENV: &str = "HMMFORGE_MXPATH";

#[derive(Parser)]
#[command(name = "hmmforge")]
#[command(version = "0.1.0")]
#[command(about = "Profile HMM construction and calibration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a calibrated model from a multiple sequence alignment
    Build(BuildCmd),

    /// Build a calibrated model from a single unaligned sequence
    Seqbuild(SeqbuildCmd),
}

#[derive(Args)]
struct BuildCmd {
    /// Aligned FASTA file
    msafile: PathBuf,

    /// Write the model here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Alphabet of the alignment
    #[arg(long, default_value = "amino")]
    alphabet: String,

    /// Also write the alignment rebuilt in model coordinates
    #[arg(long = "post-msa")]
    post_msa: Option<PathBuf>,

    /// Report pipeline progress on standard error
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(flatten)]
    build: BuildArgs,
}

#[derive(Args)]
struct SeqbuildCmd {
    /// FASTA file of unaligned sequences, one model per sequence
    seqfile: PathBuf,

    /// Write the models here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Alphabet of the sequences
    #[arg(long, default_value = "amino")]
    alphabet: String,

    /// Substitution matrix file (default: BLOSUM62 or +5/-4)
    #[arg(long)]
    mxfile: Option<PathBuf>,

    /// Gap open probability
    #[arg(long, default_value_t = 0.02)]
    popen: f64,

    /// Gap extend probability
    #[arg(long, default_value_t = 0.4)]
    pextend: f64,

    /// Report pipeline progress on standard error
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(flatten)]
    build: BuildArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Build(cmd) => run_build(cmd),
        Commands::Seqbuild(cmd) => run_seqbuild(cmd),
    }
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("cannot create {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn parse_alphabet(name: &str) -> Result<Alphabet> {
    Alphabet::from_name(name).ok_or_else(|| anyhow!("unknown alphabet {:?}", name))
}

fn run_build(cmd: BuildCmd) -> Result<()> {
    let alphabet = parse_alphabet(&cmd.alphabet)?;
    let msa = Msa::from_afa_path(&cmd.msafile, alphabet.clone())
        .with_context(|| format!("failed to read alignment {}", cmd.msafile.display()))?;
    if cmd.verbose {
        eprintln!(
            "read alignment {} ({} sequences, {} columns)",
            msa.name.as_deref().unwrap_or("(unnamed)"),
            msa.nseq(),
            msa.alen()
        );
    }

    let mut builder = Builder::new(alphabet, Some(&cmd.build))?;
    if cmd.verbose {
        eprintln!("building with seed {}", builder.seed());
    }
    let request = BuildRequest { post_msa: cmd.post_msa.is_some(), ..Default::default() };
    let out = builder.build(msa, &request)?;
    if cmd.verbose {
        let ev = out.hmm.evparams.as_ref();
        eprintln!(
            "built model {} (length {}, effective sequence number {:.2})",
            out.hmm.name.as_deref().unwrap_or("(unnamed)"),
            out.hmm.m,
            out.hmm.eff_nseq
        );
        if let Some(ev) = ev {
            eprintln!(
                "calibration: lambda {:.4}, Viterbi mu {:.2}, Forward tau {:.2}",
                ev.lambda, ev.vit_mu, ev.fwd_tau
            );
        }
    }

    let mut w = open_output(cmd.output.as_ref())?;
    out.hmm.write_summary(&mut w)?;

    if let (Some(path), Some(post_msa)) = (&cmd.post_msa, &out.post_msa) {
        let mut w = BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        );
        write_afa(&mut w, post_msa)?;
        if cmd.verbose {
            eprintln!("wrote rebuilt alignment to {}", path.display());
        }
    }
    Ok(())
}

fn run_seqbuild(cmd: SeqbuildCmd) -> Result<()> {
    let alphabet = parse_alphabet(&cmd.alphabet)?;

    let mut builder = Builder::new(alphabet.clone(), Some(&cmd.build))?;
    builder.set_score_system(cmd.mxfile.as_deref(), Some(MATRIX_ENV), cmd.popen, cmd.pextend)?;

    let reader = bio::io::fasta::Reader::from_file(&cmd.seqfile)
        .map_err(|e| anyhow!("failed to open {}: {}", cmd.seqfile.display(), e))?;
    let mut w = open_output(cmd.output.as_ref())?;
    let mut count = 0usize;
    for record in reader.records() {
        let record = record.map_err(|e| anyhow!("bad FASTA record: {}", e))?;
        let dsq = alphabet.digitize_seq(record.seq());
        let out = builder.build_single(&dsq, Some(record.id()), &BuildRequest::default())?;
        out.hmm.write_summary(&mut w)?;
        count += 1;
        if cmd.verbose {
            eprintln!("built model {} (length {})", record.id(), out.hmm.m);
        }
    }
    if count == 0 {
        return Err(anyhow!(
            "no sequences in {}",
            cmd.seqfile.display()
        ));
    }
    Ok(())
}

fn write_afa<W: Write>(w: &mut W, msa: &Msa) -> Result<()> {
    for (name, row) in msa.names.iter().zip(&msa.rows) {
        writeln!(w, ">{}", name)?;
        let text: String = row.iter().map(|&c| msa.alphabet.decode(c)).collect();
        writeln!(w, "{}", text)?;
    }
    Ok(())
}
