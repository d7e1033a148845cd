use herald_core::config::{AppConfig, LoadOptions};
use herald_discord::handlers::builtin_descriptors;
use herald_discord::registry::CommandRegistry;
use herald_discord::verify::SignatureVerifier;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_verification_key(&config));
            checks.push(check_command_registry());
            checks.push(check_catalog_credentials(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "verification_key",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(check_command_registry());
            checks.push(DoctorCheck {
                name: "catalog_credentials",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_fail { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_fail {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_verification_key(config: &AppConfig) -> DoctorCheck {
    match SignatureVerifier::from_hex(&config.discord.public_key) {
        Ok(_) => DoctorCheck {
            name: "verification_key",
            status: CheckStatus::Pass,
            details: "discord.public_key parses as an Ed25519 verification key".to_string(),
        },
        Err(error) => DoctorCheck {
            name: "verification_key",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_command_registry() -> DoctorCheck {
    match CommandRegistry::from_descriptors(builtin_descriptors()) {
        Ok(registry) => DoctorCheck {
            name: "command_registry",
            status: CheckStatus::Pass,
            details: format!("{} commands registered without conflicts", registry.len()),
        },
        Err(error) => DoctorCheck {
            name: "command_registry",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_catalog_credentials(config: &AppConfig) -> DoctorCheck {
    if config.discord.bot_token.is_some() {
        DoctorCheck {
            name: "catalog_credentials",
            status: CheckStatus::Pass,
            details: "bot token present; catalog sync available".to_string(),
        }
    } else {
        // Serving interactions does not need the bot token, so absence is not
        // a failure.
        DoctorCheck {
            name: "catalog_credentials",
            status: CheckStatus::Skipped,
            details: "discord.bot_token not set; `sync-commands` will be unavailable".to_string(),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
