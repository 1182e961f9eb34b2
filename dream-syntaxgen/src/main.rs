#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "dream-syntaxgen",
    version,
    about = "Regenerate Dream editor syntax artifacts from the canonical token table"
)]
struct Cli {
    /// Token table to use instead of the embedded canonical one
    #[arg(long)]
    tokens: Option<PathBuf>,

    /// Root directory the artifacts are written under
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let tokens = match &cli.tokens {
        Some(path) => dream_tokens::load_tokens(path)?,
        None => dream_tokens::canonical_tokens(),
    };

    let paths = dream_syntaxgen::write_artifacts(&cli.out, &tokens)?;
    println!("wrote {}", paths.textmate.display());
    println!("wrote {}", paths.jflex.display());
    println!("wrote {}", paths.tokens_mirror.display());
    Ok(())
}
