mod args;
mod output;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use args::{Cli, Commands, mode_from_str};
use mailverify_lib::{EmailAddress, SyntaxChecker, VerifierConfig};

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "mailverify_lib=debug,mailverify=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<VerifierConfig> {
    let mut config = match &cli.config {
        Some(path) => VerifierConfig::from_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => VerifierConfig::default(),
    };
    if let Some(level) = cli.level.as_deref() {
        config.level = args::level_from_str(level);
    }
    if let Some(from) = cli.mail_from.as_deref() {
        config.verify_email = from.trim().to_string();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(&cli)?;

    // codes de sortie : 0 OK, 2 invalide, 1 fatal
    let valid = match &cli.cmd {
        #[cfg(all(feature = "with-mx", feature = "with-smtp-verify"))]
        Commands::Check {
            email,
            no_cache,
            cache_dir,
        } => {
            let mut config = config;
            if *no_cache {
                config.cache_dir = None;
            } else if let Some(dir) = cache_dir {
                config.cache_dir = Some(dir.clone());
            }
            let pipeline = mailverify_lib::Pipeline::from_config(config)
                .context("set up verification pipeline")?;
            let verification = pipeline.verify(email);
            output::print_verification(&verification, cli.format)?;
            verification.valid
        }
        Commands::Syntax { email, mode } => {
            let checker = SyntaxChecker::new(mode_from_str(mode))
                .require_known_tld(config.require_known_tld);
            let report = checker.validate(&EmailAddress::new(email));
            output::print_syntax(email, &report, cli.format)?;
            report.ok
        }
        #[cfg(feature = "with-mx")]
        Commands::Mx { domain } => {
            let resolver = mailverify_lib::SystemResolver::new(&config.dns)
                .context("initialise DNS resolver")?;
            let status = mailverify_lib::mx::resolve_with(&resolver, domain)
                .with_context(|| format!("MX lookup for {domain}"))?;
            output::print_mx(domain, &status, cli.format)?;
            !status.is_empty()
        }
    };

    if !valid {
        std::process::exit(2);
    }
    Ok(())
}
