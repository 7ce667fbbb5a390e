use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mailverify_lib::{ValidationMode, VerificationLevel};

#[derive(Parser)]
#[command(name = "mailverify-cli", version, about = "Email deliverability verification")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,

    /// fichier de configuration TOML
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// niveau de vérification: smtp|dns (prend le pas sur le fichier)
    #[arg(long, global = true)]
    pub level: Option<String>,

    /// enveloppe MAIL FROM utilisée pour la sonde SMTP
    #[arg(long = "from", global = true)]
    pub mail_from: Option<String>,

    /// format de sortie
    #[arg(long, value_enum, default_value_t = Format::Human, global = true)]
    pub format: Format,

    /// logs détaillés (équivaut à RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// exécute le pipeline complet (cache, syntaxe, MX, SMTP)
    #[cfg(all(feature = "with-mx", feature = "with-smtp-verify"))]
    Check {
        email: String,
        /// cache en mémoire uniquement
        #[arg(long)]
        no_cache: bool,
        /// répertoire du cache fichier (prend le pas sur le fichier)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
    /// vérifie uniquement la syntaxe
    Syntax {
        email: String,
        /// mode: strict|relaxed
        #[arg(long, default_value = "strict")]
        mode: String,
    },
    /// affiche les enregistrements MX d'un domaine
    #[cfg(feature = "with-mx")]
    Mx { domain: String },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Human,
    Json,
}

pub fn mode_from_str(s: &str) -> ValidationMode {
    match s {
        "relaxed" => ValidationMode::Relaxed,
        _ => ValidationMode::Strict,
    }
}

pub fn level_from_str(s: &str) -> VerificationLevel {
    VerificationLevel::from_config_value(s)
}
