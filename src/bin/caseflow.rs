//! caseflow CLI — operator interface to the case workflow engine.

use caseflow::config::Config;
use caseflow::db::Db;
use caseflow::db::cases::CaseFilter;
use caseflow::engine::{CaseEngine, EngineConfig};
use caseflow::event::NoopSink;
use caseflow::model::*;
use caseflow::telemetry::{TelemetryConfig, init_telemetry};
use caseflow::tenancy::Scope;
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "caseflow", about = "Tenant-scoped case workflow engine")]
struct Cli {
    /// Tenant scope for the command. Omit for the system scope
    /// (maintenance paths only).
    #[arg(long, global = true)]
    tenant: Option<Uuid>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending database migrations
    Migrate,
    /// Case operations
    Case {
        #[command(subcommand)]
        action: CaseAction,
    },
    /// Seed or update a worker profile
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
}

#[derive(Subcommand)]
enum CaseAction {
    /// Create a draft case
    Create {
        /// Human-facing case number
        case_number: String,
        /// Client organization id
        organization: Uuid,
        /// Service category (matched against worker specializations)
        category: String,
        /// Priority (higher = more urgent)
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// Show a case
    Show { id: Uuid },
    /// List cases
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,
        /// Filter by assigned worker
        #[arg(long)]
        assignee: Option<Uuid>,
        /// Maximum cases to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Apply a status transition
    Transition {
        id: Uuid,
        /// Target status
        to: String,
        /// Acting role (client | agent | supervisor | admin)
        #[arg(long)]
        role: String,
        /// Acting user id
        #[arg(long)]
        actor: Uuid,
        /// Reason (required by some transitions)
        #[arg(long)]
        reason: Option<String>,
    },
    /// List transitions available to a role from the case's status
    Actions {
        id: Uuid,
        #[arg(long)]
        role: String,
    },
    /// Auto-assign the best-fit worker
    Assign { id: Uuid },
    /// Transfer the case to another worker
    Transfer {
        id: Uuid,
        #[arg(long)]
        from: Uuid,
        #[arg(long)]
        to: Uuid,
        #[arg(long)]
        reason: String,
        #[arg(long)]
        initiator: Uuid,
    },
    /// Show the transfer audit trail
    History { id: Uuid },
}

#[derive(Subcommand)]
enum WorkerAction {
    /// Insert or update a worker profile
    Upsert {
        id: Uuid,
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        tenant: Uuid,
        /// Comma-separated service categories
        #[arg(long)]
        specializations: String,
        #[arg(long, default_value_t = 20)]
        max_capacity: i32,
        #[arg(long, default_value_t = 0)]
        active_count: i32,
        #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
        available: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "caseflow".to_string(),
    })?;

    let db = Db::connect(config.database_url.expose_secret()).await?;
    let scope = match cli.tenant {
        Some(id) => Scope::tenant(TenantId(id)),
        None => Scope::System,
    };
    let engine = CaseEngine::with_config(
        db.clone(),
        Arc::new(NoopSink),
        EngineConfig {
            assign_lock_ttl_seconds: config.assign_lock_ttl_seconds,
        },
    );

    match cli.command {
        Command::Migrate => {
            db.migrate().await?;
            println!("migrations applied");
        }
        Command::Case { action } => cmd_case(&engine, &scope, action).await?,
        Command::Worker { action } => cmd_worker(&db, &scope, action).await?,
    }

    Ok(())
}

async fn cmd_case(engine: &CaseEngine, scope: &Scope, action: CaseAction) -> anyhow::Result<()> {
    match action {
        CaseAction::Create {
            case_number,
            organization,
            category,
            priority,
        } => {
            let case = engine
                .db()
                .create_case(
                    scope,
                    NewCase::new(case_number, OrgId(organization), category).priority(priority),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&case)?);
        }
        CaseAction::Show { id } => {
            let case = engine.db().get_case(scope, CaseId(id)).await?;
            println!("{}", serde_json::to_string_pretty(&case)?);
        }
        CaseAction::List {
            status,
            assignee,
            limit,
        } => {
            let filter = CaseFilter {
                status: status.map(|s| s.parse()).transpose()?,
                assigned_worker_id: assignee.map(WorkerId),
                limit: Some(limit),
            };
            let cases = engine.db().list_cases(scope, filter).await?;
            for case in cases {
                println!(
                    "{}  {:<14} {:<12} pri={:<3} assignee={}",
                    case.id,
                    case.case_number,
                    case.status.to_string(),
                    case.priority,
                    case.assigned_worker_id
                        .map(|w| w.to_string())
                        .unwrap_or_else(|| "-".into()),
                );
            }
        }
        CaseAction::Transition {
            id,
            to,
            role,
            actor,
            reason,
        } => {
            let case = engine
                .execute(
                    scope,
                    CaseId(id),
                    to.parse()?,
                    role.parse()?,
                    UserId(actor),
                    reason.as_deref(),
                )
                .await?;
            println!("case {} is now {}", case.id, case.status);
        }
        CaseAction::Actions { id, role } => {
            let actions = engine
                .available_actions(scope, CaseId(id), role.parse()?)
                .await?;
            for t in actions {
                println!(
                    "{} -> {}{}",
                    t.from,
                    t.to,
                    if t.requires_reason { "  (reason required)" } else { "" }
                );
            }
        }
        CaseAction::Assign { id } => match engine.auto_assign(scope, CaseId(id)).await? {
            Some(worker) => println!("assigned to worker {worker}"),
            None => println!("no assignment made"),
        },
        CaseAction::Transfer {
            id,
            from,
            to,
            reason,
            initiator,
        } => {
            let entry = engine
                .transfer(
                    scope,
                    CaseId(id),
                    WorkerId(from),
                    WorkerId(to),
                    &reason,
                    UserId(initiator),
                )
                .await?;
            println!("transferred: {}", serde_json::to_string_pretty(&entry)?);
        }
        CaseAction::History { id } => {
            let entries = engine.transfer_history(scope, CaseId(id)).await?;
            for e in entries {
                println!(
                    "{}  {} -> {}  by {}  ({})",
                    e.created_at.to_rfc3339(),
                    e.from_worker_id
                        .map(|w| w.to_string())
                        .unwrap_or_else(|| "-".into()),
                    e.to_worker_id,
                    e.initiated_by,
                    e.reason,
                );
            }
        }
    }
    Ok(())
}

async fn cmd_worker(db: &Db, scope: &Scope, action: WorkerAction) -> anyhow::Result<()> {
    match action {
        WorkerAction::Upsert {
            id,
            user,
            tenant,
            specializations,
            max_capacity,
            active_count,
            available,
        } => {
            let profile = WorkerProfile {
                id: WorkerId(id),
                user_id: UserId(user),
                tenant_id: TenantId(tenant),
                specializations: specializations
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_capacity,
                active_count,
                available,
                last_assigned_at: None,
            };
            db.upsert_worker(scope, &profile).await?;
            println!("worker {} upserted", profile.id);
        }
    }
    Ok(())
}
