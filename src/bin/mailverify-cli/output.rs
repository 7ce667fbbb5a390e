use anyhow::Result;
use mailverify_lib::SyntaxReport;
#[cfg(feature = "with-mx")]
use mailverify_lib::MxStatus;
#[cfg(all(feature = "with-mx", feature = "with-smtp-verify"))]
use mailverify_lib::Verification;

use crate::args::Format;

#[cfg(all(feature = "with-mx", feature = "with-smtp-verify"))]
pub fn print_verification(verification: &Verification, format: Format) -> Result<()> {
    match format {
        Format::Human => {
            if verification.valid {
                println!("[OK]      {} :: {}", verification.address, verification.outcome);
            } else {
                println!("[INVALID] {} :: {}", verification.address, verification.outcome);
            }
            if let Some(details) = verification.outcome.smtp_details() {
                if details.is_catch_all {
                    println!("          catch-all: server accepts any recipient");
                }
                for line in &details.transcript {
                    tracing::debug!("{line}");
                }
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(verification)?),
    }
    Ok(())
}

pub fn print_syntax(input: &str, report: &SyntaxReport, format: Format) -> Result<()> {
    match format {
        Format::Human => {
            if report.ok {
                println!("[OK]      {input}");
            } else {
                println!("[INVALID] {input} :: {}", report.reasons.join("; "));
            }
        }
        Format::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

#[cfg(feature = "with-mx")]
pub fn print_mx(domain: &str, status: &MxStatus, format: Format) -> Result<()> {
    match format {
        Format::Human => match status {
            MxStatus::Records(records) => {
                let summary = records
                    .iter()
                    .map(|r| format!("{}:{}", r.preference, r.exchange))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("{domain} :: records: {summary}");
            }
            MxStatus::NoRecords => println!("{domain} :: no MX records"),
        },
        Format::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "domain": domain,
                "records": status.records(),
            }))?
        ),
    }
    Ok(())
}
