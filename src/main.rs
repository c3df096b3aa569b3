use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use rbac_console::authz::paths;
use rbac_console::config::load_env;
use rbac_console::console::{
    ConsoleContext, PermissionCatalog, RoleDetail, RoleDirectory, UserDetail, UserDirectory,
    ViewStatus,
};
use rbac_console::models::{EntityId, LoginRequest, User, Verb};
use rbac_console::notifications::{drain, init_notification_bus, Notification};
use rbac_console::workflow::{AssignmentWorkflow, RemovalOutcome, SubmitOutcome};
use rbac_console::{
    can_perform, CandidateOption, ConsoleConfig, HttpGateway, InMemoryGateway, Session,
    SharedGateway,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "RBAC admin console", long_about = None)]
struct Cli {
    /// Run against a seeded in-memory backend instead of CONSOLE_BACKEND_URL
    #[arg(long, global = true)]
    demo: bool,
    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the signed-in user and their grants
    Whoami,
    /// Check whether the signed-in user may perform VERB on PATH
    Check {
        #[arg(long)]
        path: String,
        /// Defaults to GET
        #[arg(long)]
        verb: Option<String>,
    },
    #[command(subcommand)]
    Permissions(PermissionCommand),
    #[command(subcommand)]
    Roles(RoleCommand),
    #[command(subcommand)]
    Users(UserCommand),
}

#[derive(Subcommand, Debug)]
enum PermissionCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Create {
        #[arg(long, default_value = "GET")]
        verb: String,
        #[arg(long)]
        path: String,
    },
    Delete { id: EntityId },
}

#[derive(Subcommand, Debug)]
enum RoleCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Show { id: EntityId },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { id: EntityId },
    /// Permissions the role does not hold yet
    Candidates { id: EntityId },
    /// Add permissions to a role
    Assign {
        id: EntityId,
        #[arg(required = true)]
        permission_ids: Vec<EntityId>,
    },
    /// Remove one permission from a role
    Revoke { id: EntityId, permission_id: EntityId },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    List {
        #[arg(long)]
        search: Option<String>,
    },
    Show { id: EntityId },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Delete { id: EntityId },
    /// Roles the user does not hold yet
    Candidates { id: EntityId },
    /// Add roles to a user
    Assign {
        id: EntityId,
        #[arg(required = true)]
        role_ids: Vec<EntityId>,
    },
    /// Remove one role from a user
    Revoke { id: EntityId, role_id: EntityId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();
    let (bus, mut rx) = init_notification_bus();

    let (gateway, credentials): (SharedGateway, Option<LoginRequest>) = if cli.demo {
        (Arc::new(demo_gateway().await), None)
    } else {
        let config = ConsoleConfig::from_env()?;
        let credentials = match (&config.email, &config.password) {
            (Some(email), Some(password)) => Some(LoginRequest {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        };
        let gateway = HttpGateway::new(&config)?;
        tracing::info!(backend = %gateway.base_url(), "using remote backend");
        (Arc::new(gateway), credentials)
    };

    let mut session = Session::new(bus.clone());
    if !session.restore(gateway.as_ref()).await {
        if let Some(credentials) = &credentials {
            session.login(gateway.as_ref(), credentials).await;
        }
    }

    let ctx = ConsoleContext::new(gateway.clone(), bus);
    let result = run(cli, &ctx, &session).await;

    print_notifications(drain(&mut rx));
    result
}

async fn run(cli: Cli, ctx: &ConsoleContext, session: &Session) -> anyhow::Result<()> {
    let user = session.user();
    let yes = cli.yes;

    match cli.command {
        Commands::Whoami => match user {
            Some(user) => print_user(user),
            None => println!("not signed in"),
        },
        Commands::Check { path, verb } => {
            let allowed = can_perform(user, &path, verb.as_deref());
            println!(
                "{} {} {}",
                verb.as_deref().unwrap_or(Verb::Get.as_str()),
                path,
                if allowed { "allowed" } else { "denied" }
            );
        }
        Commands::Permissions(cmd) => run_permissions(cmd, ctx.clone(), user, yes).await?,
        Commands::Roles(cmd) => run_roles(cmd, ctx.clone(), user, yes).await?,
        Commands::Users(cmd) => run_users(cmd, ctx.clone(), user, yes).await?,
    }

    Ok(())
}

async fn run_permissions(
    cmd: PermissionCommand,
    ctx: ConsoleContext,
    user: Option<&User>,
    yes: bool,
) -> anyhow::Result<()> {
    let mut catalog = PermissionCatalog::new(ctx);

    match cmd {
        PermissionCommand::List { search } => {
            ensure_ready(catalog.refresh(user).await, paths::PERMISSIONS)?;
            catalog.set_search(search.unwrap_or_default());
            for permission in catalog.visible() {
                println!("{:>6}  {}", permission.id, permission.label());
            }
        }
        PermissionCommand::Create { verb, path } => {
            catalog.form.verb = verb.parse::<Verb>()?;
            catalog.form.path = path;
            if !catalog.create(user).await {
                print_form_errors(&catalog.form.errors);
            }
        }
        PermissionCommand::Delete { id } => {
            let Some(prompt) = catalog.request_delete(user, id) else {
                anyhow::bail!("not allowed to delete permissions");
            };
            if confirm(prompt, yes)? {
                catalog.confirm_delete(user).await;
            } else {
                catalog.dismiss_delete();
            }
        }
    }

    Ok(())
}

async fn run_roles(cmd: RoleCommand, ctx: ConsoleContext, user: Option<&User>, yes: bool) -> anyhow::Result<()> {
    match cmd {
        RoleCommand::List { search } => {
            let mut directory = RoleDirectory::new(ctx);
            ensure_ready(directory.refresh(user).await, paths::PAGES)?;
            directory.set_search(search.unwrap_or_default());
            for role in directory.visible() {
                println!("{:>6}  {}", role.id, role.name);
            }
        }
        RoleCommand::Show { id } => {
            let mut detail = RoleDetail::new(ctx, id);
            ensure_ready(detail.refresh(user).await, paths::ROLES)?;
            if let Some(role) = detail.role() {
                println!("{} {}", role.id, role.name);
                if let Some(description) = &role.description {
                    println!("  {}", description);
                }
                for permission in &role.permissions {
                    println!("  {:>6}  {}", permission.id, permission.label());
                }
                for member in role.member_labels() {
                    println!("  member  {}", member);
                }
            }
        }
        RoleCommand::Create { name, description } => {
            let mut directory = RoleDirectory::new(ctx);
            directory.form.name = name;
            directory.form.description = description.unwrap_or_default();
            if !directory.create(user).await {
                print_form_errors(&directory.form.errors);
            }
        }
        RoleCommand::Delete { id } => {
            let mut directory = RoleDirectory::new(ctx);
            let Some(prompt) = directory.request_delete(user, id) else {
                anyhow::bail!("not allowed to delete roles");
            };
            if confirm(prompt, yes)? {
                directory.confirm_delete(user).await;
            } else {
                directory.dismiss_delete();
            }
        }
        RoleCommand::Candidates { id } => {
            let mut detail = RoleDetail::new(ctx, id);
            ensure_ready(detail.load(user).await, paths::ROLES)?;
            print_candidates(&detail.candidates());
        }
        RoleCommand::Assign { id, permission_ids } => {
            let mut detail = RoleDetail::new(ctx, id);
            ensure_ready(detail.load(user).await, paths::ROLES)?;
            let chosen = choose(&detail.candidates(), &permission_ids);
            if stage(&mut detail.assignment, chosen, user, yes)? {
                report_submit(detail.confirm_assignment(user).await);
            }
        }
        RoleCommand::Revoke { id, permission_id } => {
            let mut detail = RoleDetail::new(ctx, id);
            let Some(prompt) = detail.request_removal(user, permission_id) else {
                anyhow::bail!("not allowed to remove permissions from roles");
            };
            if confirm(prompt, yes)? {
                report_removal(detail.confirm_removal(user).await);
            } else {
                detail.removal.dismiss();
            }
        }
    }

    Ok(())
}

async fn run_users(cmd: UserCommand, ctx: ConsoleContext, user: Option<&User>, yes: bool) -> anyhow::Result<()> {
    match cmd {
        UserCommand::List { search } => {
            let mut directory = UserDirectory::new(ctx);
            ensure_ready(directory.refresh(user).await, paths::PAGES)?;
            directory.set_search(search.unwrap_or_default());
            for listed in directory.visible() {
                println!("{:>6}  {}", listed.id, listed.display_key());
            }
        }
        UserCommand::Show { id } => {
            let mut detail = UserDetail::new(ctx, id);
            ensure_ready(detail.refresh(user).await, paths::USERS)?;
            if let Some(shown) = detail.user() {
                print_user(shown);
            }
        }
        UserCommand::Create {
            name,
            username,
            email,
            password,
        } => {
            let mut directory = UserDirectory::new(ctx);
            directory.form.name = name;
            directory.form.username = username;
            directory.form.email = email;
            directory.form.password = password;
            if !directory.create(user).await {
                print_form_errors(&directory.form.errors);
            }
        }
        UserCommand::Delete { id } => {
            let mut directory = UserDirectory::new(ctx);
            let Some(prompt) = directory.request_delete(user, id) else {
                anyhow::bail!("not allowed to delete users");
            };
            if confirm(prompt, yes)? {
                directory.confirm_delete(user).await;
            } else {
                directory.dismiss_delete();
            }
        }
        UserCommand::Candidates { id } => {
            let mut detail = UserDetail::new(ctx, id);
            ensure_ready(detail.load(user).await, paths::USERS)?;
            print_candidates(&detail.candidates());
        }
        UserCommand::Assign { id, role_ids } => {
            let mut detail = UserDetail::new(ctx, id);
            ensure_ready(detail.load(user).await, paths::USERS)?;
            let chosen = choose(&detail.candidates(), &role_ids);
            if stage(&mut detail.assignment, chosen, user, yes)? {
                report_submit(detail.confirm_assignment(user).await);
            }
        }
        UserCommand::Revoke { id, role_id } => {
            let mut detail = UserDetail::new(ctx, id);
            let Some(prompt) = detail.request_removal(user, role_id) else {
                anyhow::bail!("not allowed to remove roles from users");
            };
            if confirm(prompt, yes)? {
                report_removal(detail.confirm_removal(user).await);
            } else {
                detail.removal.dismiss();
            }
        }
    }

    Ok(())
}

fn ensure_ready(status: ViewStatus, path: &str) -> anyhow::Result<()> {
    match status {
        ViewStatus::Ready => Ok(()),
        ViewStatus::Unauthorized => anyhow::bail!("not allowed to view {}", path),
        ViewStatus::Failed => anyhow::bail!("failed to load {}", path),
    }
}

/// Candidates whose id was asked for. Ids that are not candidates are skipped.
fn choose(candidates: &[CandidateOption], ids: &[EntityId]) -> Vec<CandidateOption> {
    for id in ids {
        if !candidates.iter().any(|c| c.value == *id) {
            tracing::warn!(id, "not a candidate, skipping");
        }
    }
    candidates
        .iter()
        .filter(|c| ids.contains(&c.value))
        .cloned()
        .collect()
}

/// Selects `chosen` and walks the workflow up to the confirmation prompt.
/// Returns whether the operator confirmed.
fn stage(
    workflow: &mut AssignmentWorkflow,
    chosen: Vec<CandidateOption>,
    user: Option<&User>,
    yes: bool,
) -> anyhow::Result<bool> {
    workflow.select(chosen);
    let Some(prompt) = workflow.request_submit(user) else {
        return Ok(false);
    };
    let confirmed = confirm(prompt, yes)?;
    if !confirmed {
        workflow.dismiss();
    }
    Ok(confirmed)
}

fn confirm(prompt: &str, yes: bool) -> anyhow::Result<bool> {
    if yes {
        return Ok(true);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush().context("failed to flush stdout")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn report_submit(outcome: SubmitOutcome) {
    tracing::debug!(?outcome, "assignment finished");
}

fn report_removal(outcome: RemovalOutcome) {
    tracing::debug!(?outcome, "removal finished");
}

fn print_user(user: &User) {
    println!("{} {}", user.id, user.display_key());
    for role in &user.roles {
        println!("  role {:>6}  {}", role.id, role.name);
        for permission in &role.permissions {
            println!("        {:>6}  {}", permission.id, permission.label());
        }
    }
}

fn print_candidates(candidates: &[CandidateOption]) {
    if candidates.is_empty() {
        println!("nothing left to assign");
    }
    for candidate in candidates {
        println!("{:>6}  {}", candidate.value, candidate.label);
    }
}

fn print_form_errors(errors: &[rbac_console::errors::ValidationItem]) {
    for item in errors {
        eprintln!("invalid: {}", item);
    }
}

fn print_notifications(notifications: Vec<Notification>) {
    for notification in notifications {
        match &notification.detail {
            Some(detail) => println!("[{}] {} ({})", notification.kind.as_str(), notification.key, detail),
            None => println!("[{}] {}", notification.kind.as_str(), notification.key),
        }
    }
}

/// A backend seeded with an admin who holds every console grant, an editor who
/// can only read roles, and signed in as the admin.
async fn demo_gateway() -> InMemoryGateway {
    let gateway = InMemoryGateway::new();

    let mut admin_grants = Vec::new();
    for (verb, path) in [
        ("GET", paths::PERMISSIONS),
        ("POST", paths::PERMISSIONS),
        ("DELETE", paths::PERMISSIONS),
        ("GET", paths::PAGES),
        ("POST", paths::PAGES),
        ("GET", paths::ROLES),
        ("POST", paths::ROLES),
        ("DELETE", paths::ROLES),
        ("GET", paths::USERS),
        ("POST", paths::USERS),
        ("DELETE", paths::USERS),
    ] {
        admin_grants.push(gateway.seed_permission(verb, path).await.id);
    }
    let read_roles = admin_grants[5];

    let admin_role = gateway.seed_role("Admin", &admin_grants).await;
    let editor_role = gateway.seed_role("Editor", &[read_roles]).await;
    gateway.seed_role("Viewer", &[]).await;

    let admin = gateway.seed_user("admin@example.com", "admin", &[admin_role.id]).await;
    gateway.seed_user("editor@example.com", "editor", &[editor_role.id]).await;

    gateway.set_session(Some(admin.id)).await;
    gateway.clear_calls().await;
    gateway
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
