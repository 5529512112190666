use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use jaspel_engine::authz::{authorize, GatedOperation, Role, StaticRoleProvider};
use jaspel_engine::domain::{
    ActorId, PatientId, ProcedureId, ProcedureType, StaffAssignment, StaffCategory, StaffId,
};
use jaspel_engine::notify::{NoopSink, NotificationSink, TracingSink};
use jaspel_engine::store::{InMemoryStore, ProcedureStore};
use jaspel_engine::validation::{DraftUpdate, NewProcedure, ValidationWorkflowOrchestrator};
use jaspel_engine::{allocate, init_telemetry, EngineConfig, Money, Percentage};

#[derive(Parser)]
#[command(name = "jaspel")]
#[command(about = "Procedure validation and medical service fee allocation")]
#[command(long_about = "Jaspel computes the service fee owed for a medical procedure and drives \
                       the procedure through its validation workflow. Configuration is read from \
                       jaspel.toml, .jaspelrc and JASPEL__SECTION__KEY environment variables.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the fee split for a tariff and staff assignment
    Allocate {
        /// Procedure tariff, e.g. 100000 or 100000.50
        #[arg(long)]
        tariff: Money,
        /// Flat fee paid when only non-paramedic staff is assigned
        #[arg(long, default_value = "0")]
        flat_fee: Money,
        /// Assign a doctor
        #[arg(long)]
        doctor: bool,
        /// Assign a paramedic
        #[arg(long)]
        paramedic: bool,
        /// Assign non-paramedic staff
        #[arg(long)]
        non_paramedic: bool,
        /// Override the configured percentage (0-100)
        #[arg(long)]
        percentage: Option<u32>,
    },
    /// Replay a JSON workflow script against a fresh engine
    Run {
        /// Path to the script file
        script: PathBuf,
        /// Use the configured SQLite database instead of memory
        #[arg(long)]
        database: bool,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Write the configuration to this file instead of stdout
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

/// Workflow script replayed by `jaspel run`.
#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    procedure_types: Vec<ScriptProcedureType>,
    steps: Vec<ScriptStep>,
}

#[derive(Debug, Deserialize)]
struct ScriptProcedureType {
    key: String,
    name: String,
    /// Decimal amount such as `"100000"` or `"100000.50"`
    tariff: String,
    #[serde(default)]
    non_paramedic_fee: Option<String>,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ScriptStep {
    actor: String,
    #[serde(default)]
    roles: Vec<Role>,
    #[serde(flatten)]
    action: StepAction,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum StepAction {
    Register {
        alias: String,
        procedure_type: String,
        #[serde(default)]
        staff: Vec<StaffCategory>,
    },
    Edit {
        procedure: String,
        #[serde(default)]
        staff: Option<Vec<StaffCategory>>,
        #[serde(default)]
        procedure_type: Option<String>,
    },
    Submit { procedure: String },
    Resubmit { procedure: String },
    Approve {
        procedure: String,
        #[serde(default)]
        reason: String,
    },
    Reject {
        procedure: String,
        #[serde(default)]
        reason: String,
    },
    RequestRevision {
        procedure: String,
        #[serde(default)]
        reason: String,
    },
    Reopen {
        procedure: String,
        #[serde(default)]
        reason: String,
    },
    Cancel { procedure: String },
    Show { procedure: String },
}

impl StepAction {
    fn gate(&self) -> Option<GatedOperation> {
        match self {
            StepAction::Register { .. } => Some(GatedOperation::Register),
            StepAction::Edit { .. } => Some(GatedOperation::Edit),
            StepAction::Submit { .. } | StepAction::Resubmit { .. } => Some(GatedOperation::Submit),
            StepAction::Approve { .. } => Some(GatedOperation::Approve),
            StepAction::Reject { .. } => Some(GatedOperation::Reject),
            StepAction::RequestRevision { .. } => Some(GatedOperation::RequestRevision),
            StepAction::Reopen { .. } => Some(GatedOperation::Reopen),
            StepAction::Cancel { .. } => Some(GatedOperation::Cancel),
            StepAction::Show { .. } => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: usize,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
}

fn staff_from(categories: &[StaffCategory]) -> StaffAssignment {
    categories
        .iter()
        .fold(StaffAssignment::none(), |staff, category| match category {
            StaffCategory::Doctor => staff.with_doctor(StaffId::new()),
            StaffCategory::Paramedic => staff.with_paramedic(StaffId::new()),
            StaffCategory::NonParamedic => staff.with_non_paramedic(StaffId::new()),
        })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    EngineConfig::load_env_file()?;
    let config = EngineConfig::load()?;
    init_telemetry(&config.observability)?;

    match cli.command {
        Commands::Allocate {
            tariff,
            flat_fee,
            doctor,
            paramedic,
            non_paramedic,
            percentage,
        } => allocate_command(&config, tariff, flat_fee, doctor, paramedic, non_paramedic, percentage),
        Commands::Run { script, database } => {
            tokio::runtime::Runtime::new()?.block_on(async { run_command(&config, &script, database).await })
        }
        Commands::Config { write } => config_command(&config, write),
    }
}

fn allocate_command(
    config: &EngineConfig,
    tariff: Money,
    flat_fee: Money,
    doctor: bool,
    paramedic: bool,
    non_paramedic: bool,
    percentage: Option<u32>,
) -> Result<()> {
    let percentage = match percentage {
        Some(p) => Percentage::new(p)?,
        None => config.policy()?.fee_percentage,
    };

    let mut categories = Vec::new();
    if doctor {
        categories.push(StaffCategory::Doctor);
    }
    if paramedic {
        categories.push(StaffCategory::Paramedic);
    }
    if non_paramedic {
        categories.push(StaffCategory::NonParamedic);
    }
    let staff = staff_from(&categories);

    let split = allocate(tariff, flat_fee, &staff, percentage)?;
    let output = json!({
        "tariff": tariff.to_string(),
        "percentage": percentage.value(),
        "recipient": split.recipient_category(),
        "doctor_fee": split.doctor_fee.to_string(),
        "paramedic_fee": split.paramedic_fee.to_string(),
        "non_paramedic_fee": split.non_paramedic_fee.to_string(),
        "allocated": split.allocated().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn config_command(config: &EngineConfig, write: Option<PathBuf>) -> Result<()> {
    config.policy()?;
    match write {
        Some(path) => {
            config.save_to_file(&path)?;
            println!("Configuration written to {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}

async fn open_store(config: &EngineConfig, database: bool) -> Result<Arc<dyn ProcedureStore>> {
    if !database {
        return Ok(Arc::new(InMemoryStore::new()));
    }

    #[cfg(feature = "database")]
    {
        let db = config.database.clone().unwrap_or_default();
        let store = jaspel_engine::store::SqliteStore::connect(&db.url, db.max_connections, db.auto_migrate).await?;
        info!(url = %db.url, "Using SQLite procedure store");
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "database"))]
    {
        let _ = config;
        bail!("--database requires a build with the `database` feature")
    }
}

async fn run_command(config: &EngineConfig, script_path: &PathBuf, database: bool) -> Result<()> {
    let raw = std::fs::read_to_string(script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let script: Script = serde_json::from_str(&raw).context("parsing workflow script")?;

    let store = open_store(config, database).await?;
    let sink: Arc<dyn NotificationSink> = if config.notifications.enabled {
        Arc::new(TracingSink)
    } else {
        Arc::new(NoopSink)
    };
    let orchestrator = ValidationWorkflowOrchestrator::new(Arc::clone(&store), config.policy()?).with_sink(sink);

    let mut types = HashMap::new();
    for entry in &script.procedure_types {
        let tariff: Money = entry.tariff.parse()?;
        let flat_fee: Money = match &entry.non_paramedic_fee {
            Some(raw) => raw.parse()?,
            None => Money::ZERO,
        };
        let mut procedure_type = ProcedureType::new(entry.name.clone(), tariff, flat_fee);
        procedure_type.active = entry.active;
        store.save_procedure_type(&procedure_type).await?;
        types.insert(entry.key.clone(), procedure_type.id);
    }

    let mut procedures: HashMap<String, ProcedureId> = HashMap::new();
    let mut failures = 0usize;

    for (index, step) in script.steps.iter().enumerate() {
        let step_no = index + 1;
        let roles = StaticRoleProvider::new(ActorId::new(step.actor.clone()), step.roles.iter().copied());

        let outcome = match step.action.gate() {
            Some(operation) => authorize(&roles, operation)
                .map_err(|e| json!({ "kind": "forbidden", "message": e.to_string() })),
            None => Ok(ActorId::new(step.actor.clone())),
        };

        let outcome = match outcome {
            Ok(actor) => run_step(&orchestrator, &types, &mut procedures, &step.action, &actor).await,
            Err(e) => Err(e),
        };

        let report = match outcome {
            Ok(result) => StepReport {
                step: step_no,
                ok: true,
                result: Some(result),
                error: None,
            },
            Err(error) => {
                failures += 1;
                warn!(step = step_no, error = %error, "Script step failed");
                StepReport {
                    step: step_no,
                    ok: false,
                    result: None,
                    error: Some(error),
                }
            }
        };
        println!("{}", serde_json::to_string(&report)?);
    }

    orchestrator.flush_notifications().await;
    let stats = orchestrator.metrics();
    println!("{}", serde_json::to_string(&json!({ "metrics": stats }))?);
    orchestrator.log_metrics();
    store.close().await;
    info!(steps = script.steps.len(), failures, "Script finished");
    Ok(())
}

fn lookup<T: Copy>(map: &HashMap<String, T>, key: &str, what: &str) -> Result<T, serde_json::Value> {
    map.get(key)
        .copied()
        .ok_or_else(|| json!({ "kind": "unknown_reference", "message": format!("unknown {what} '{key}'") }))
}

async fn run_step(
    orchestrator: &ValidationWorkflowOrchestrator,
    types: &HashMap<String, jaspel_engine::domain::ProcedureTypeId>,
    procedures: &mut HashMap<String, ProcedureId>,
    action: &StepAction,
    actor: &ActorId,
) -> Result<serde_json::Value, serde_json::Value> {
    let to_json = |e: jaspel_engine::WorkflowError| json!({ "kind": e.kind(), "message": e.to_string() });
    let value = |v: serde_json::Result<serde_json::Value>| {
        v.map_err(|e| json!({ "kind": "serialization", "message": e.to_string() }))
    };

    match action {
        StepAction::Register {
            alias,
            procedure_type,
            staff,
        } => {
            let type_id = lookup(types, procedure_type, "procedure type")?;
            let procedure = orchestrator
                .register_procedure(NewProcedure {
                    procedure_type_id: type_id,
                    patient_id: PatientId::new(),
                    performed_at: chrono::Utc::now(),
                    shift_id: None,
                    staff: staff_from(staff),
                    created_by: actor.clone(),
                })
                .await
                .map_err(to_json)?;
            procedures.insert(alias.clone(), procedure.id);
            value(serde_json::to_value(&procedure))
        }
        StepAction::Edit {
            procedure,
            staff,
            procedure_type,
        } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let procedure_type_id = match procedure_type {
                Some(key) => Some(lookup(types, key, "procedure type")?),
                None => None,
            };
            let update = DraftUpdate {
                staff: staff.as_deref().map(staff_from),
                procedure_type_id,
            };
            let updated = orchestrator.update_draft(id, update).await.map_err(to_json)?;
            value(serde_json::to_value(&updated))
        }
        StepAction::Submit { procedure } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let outcome = orchestrator.submit_for_validation(id).await.map_err(to_json)?;
            Ok(json!({ "status": outcome.status, "auto_approved": outcome.auto_approved }))
        }
        StepAction::Resubmit { procedure } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let outcome = orchestrator.resubmit(id).await.map_err(to_json)?;
            Ok(json!({ "status": outcome.status, "auto_approved": outcome.auto_approved }))
        }
        StepAction::Approve { procedure, reason } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let decision = orchestrator.approve(id, actor, reason).await.map_err(to_json)?;
            value(serde_json::to_value(&decision))
        }
        StepAction::Reject { procedure, reason } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let decision = orchestrator.reject(id, actor, reason).await.map_err(to_json)?;
            value(serde_json::to_value(&decision))
        }
        StepAction::RequestRevision { procedure, reason } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let decision = orchestrator.request_revision(id, actor, reason).await.map_err(to_json)?;
            value(serde_json::to_value(&decision))
        }
        StepAction::Reopen { procedure, reason } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let decision = orchestrator.reopen(id, actor, reason).await.map_err(to_json)?;
            value(serde_json::to_value(&decision))
        }
        StepAction::Cancel { procedure } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let cancelled = orchestrator.cancel(id, actor).await.map_err(to_json)?;
            value(serde_json::to_value(&cancelled))
        }
        StepAction::Show { procedure } => {
            let id = lookup(procedures, procedure, "procedure")?;
            let current = orchestrator.procedure(id).await.map_err(to_json)?;
            let decisions = orchestrator.decisions(id).await.map_err(to_json)?;
            Ok(json!({ "procedure": current, "decisions": decisions }))
        }
    }
}
