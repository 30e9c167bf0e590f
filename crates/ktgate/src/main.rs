#![forbid(unsafe_code)]

use std::io;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keytab_gate_core::context::ExecutionContext;
use keytab_gate_core::errors::GateError;
use keytab_gate_core::report::Report;
use keytab_gate_core::types::{GateStatus, KdcType};
use keytab_gate_engine::audit::audit_log::{self, JsonlAuditLog};
use keytab_gate_engine::gate::evaluator::KerberosKeytabGate;
use keytab_gate_engine::inventory::snapshot::load_inventory;
use keytab_gate_engine::settings::{GateSettings, DEFAULT_SETTINGS_PATH, LOG_ENV};

#[derive(Parser)]
#[command(
    name = "ktgate",
    version,
    about = "Kerberos keytab upgrade gate. Decides whether an upgrade may proceed."
)]
struct Cli {
    /// Settings file (defaults to .ktgate/settings.json when present).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Evaluate the gate for one cluster of an inventory snapshot.
    Evaluate {
        /// Path to the inventory snapshot .json.
        inventory: String,

        /// Target cluster name.
        #[arg(long, default_value = "")]
        cluster: String,

        /// Extra command parameter (key=value), repeatable.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Orchestrator request id, for logs and audit.
        #[arg(long)]
        request_id: Option<u64>,

        /// Orchestrator stage id, for logs and audit.
        #[arg(long)]
        stage_id: Option<u64>,

        /// Output the report as JSON.
        #[arg(long)]
        json: bool,

        /// Append the decision to this audit log.
        #[arg(long)]
        audit: Option<String>,
    },

    /// Inspect a gate audit log.
    Audit {
        /// Path to the audit .jsonl file.
        file: String,

        /// Verify the hash chain.
        #[arg(long)]
        verify: bool,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show how a raw kdc_type value is classified.
    KdcType {
        /// Raw kdc_type value, e.g. "mit-kdc".
        raw: String,
    },

    /// Write default settings to .ktgate/settings.json.
    Init,
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn init_logging(settings: &GateSettings) -> Result<()> {
    let directive = settings.effective_log_filter();
    let filter = EnvFilter::try_new(&directive).with_context(|| {
        format!("invalid log filter '{directive}' (settings log_filter or {LOG_ENV})")
    })?;
    let log_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter);
    tracing_subscriber::registry().with(log_layer).init();
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let settings = GateSettings::load(cli.config.as_deref())?;
    init_logging(&settings)?;
    debug!(?settings, "settings loaded");

    match cli.cmd {
        Cmd::Evaluate {
            inventory,
            cluster,
            params,
            request_id,
            stage_id,
            json,
            audit,
        } => {
            let mut ctx = ExecutionContext::new(cluster);
            ctx.command_params.extend(params);
            ctx.request_id = request_id;
            ctx.stage_id = stage_id;
            let audit_path = audit.or_else(|| settings.audit_log.clone());
            cmd_evaluate(&inventory, &ctx, json, audit_path.as_deref())
        }

        Cmd::Audit { file, verify, json } => cmd_audit(&file, verify, json),

        Cmd::KdcType { raw } => cmd_kdc_type(&raw),

        Cmd::Init => cmd_init(),
    }
}

fn cmd_evaluate(
    inventory_path: &str,
    ctx: &ExecutionContext,
    json_out: bool,
    audit_path: Option<&str>,
) -> Result<ExitCode> {
    let inventory = match load_inventory(inventory_path) {
        Ok(inventory) => inventory,
        Err(e) => {
            // The inventory stands in for the registry and config store.
            let err = GateError::UpstreamUnavailable(format!("{e:#}"));
            warn!(kind = err.kind(), "cannot load inventory: {err}");
            let report = Report::failed(String::new(), err.to_string(), serde_json::json!({}));
            return print_report(&report, json_out);
        }
    };
    let audit = audit_path.map(JsonlAuditLog::new);

    let mut gate = KerberosKeytabGate::new(&inventory, &inventory, &inventory);
    if let Some(sink) = &audit {
        gate = gate.with_audit(sink);
    }
    let report = gate.evaluate(ctx);
    print_report(&report, json_out)
}

fn print_report(report: &Report, json_out: bool) -> Result<ExitCode> {
    if json_out {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report.stdout);
        if !report.stderr.is_empty() {
            eprintln!("  error: {}", report.stderr);
        }
        eprintln!("  status: {}", report.status);
    }

    Ok(ExitCode::from(status_exit_code(report.status)))
}

fn status_exit_code(status: GateStatus) -> u8 {
    match status {
        GateStatus::Completed => 0,
        GateStatus::Failed => 1,
        GateStatus::Holding => 2,
    }
}

fn cmd_audit(file: &str, verify: bool, json_out: bool) -> Result<ExitCode> {
    if !verify {
        let counts = audit_log::summarize(file)?;
        if json_out {
            println!("{}", serde_json::to_string_pretty(&counts)?);
        } else {
            for (status, count) in &counts {
                println!("  {status:<10} {count}");
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    match audit_log::verify_chain(file) {
        Ok(entries) => {
            if json_out {
                println!(
                    "{}",
                    serde_json::json!({ "file": file, "valid": true, "entries": entries })
                );
            } else {
                eprintln!("  chain valid ({entries} entries)");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            if json_out {
                println!(
                    "{}",
                    serde_json::json!({ "file": file, "valid": false, "error": format!("{e:#}") })
                );
                return Ok(ExitCode::FAILURE);
            }
            bail!("audit chain invalid: {e:#}");
        }
    }
}

fn cmd_kdc_type(raw: &str) -> Result<ExitCode> {
    let kdc_type = KdcType::from_property(Some(raw));
    let out = serde_json::json!({
        "raw": raw,
        "kdc_type": kdc_type.to_string(),
        "property": kdc_type.as_property(),
        "recognized": kdc_type.is_recognized(),
        "requires_keytab_regeneration": !kdc_type.is_none(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(ExitCode::SUCCESS)
}

fn cmd_init() -> Result<ExitCode> {
    if std::path::Path::new(DEFAULT_SETTINGS_PATH).exists() {
        bail!("{DEFAULT_SETTINGS_PATH} already exists");
    }
    GateSettings::default()
        .save(DEFAULT_SETTINGS_PATH)
        .context("cannot initialize settings")?;
    eprintln!("created {DEFAULT_SETTINGS_PATH}");
    Ok(ExitCode::SUCCESS)
}
