use std::{error::Error, io::Write};

use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{CreateCooperativeCmd, Engine, RegisterUserCmd, Role};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Parser, Debug)]
#[command(name = "coophub_admin")]
#[command(about = "Admin utilities for Coophub (bootstrap accounts, organizations, settings)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./coophub.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    ParentOrg(ParentOrg),
    Cooperative(Cooperative),
    Leader(Leader),
    Setting(Setting),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create an account; the password is prompted for.
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    /// SUPER_ADMIN, APEX, FINANCE, PARENT_ORGANIZATION, COOPERATIVE, LEADER or MEMBER.
    #[arg(long, default_value = "SUPER_ADMIN", value_parser = parse_role)]
    role: Role,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    nin: Option<String>,
    #[arg(long)]
    cooperative_id: Option<Uuid>,
}

#[derive(Args, Debug)]
struct ParentOrg {
    #[command(subcommand)]
    command: ParentOrgCommand,
}

#[derive(Subcommand, Debug)]
enum ParentOrgCommand {
    Create(ParentOrgCreateArgs),
}

#[derive(Args, Debug)]
struct ParentOrgCreateArgs {
    #[arg(long)]
    name: String,
    /// PARENT_ORGANIZATION account that receives the parent share.
    #[arg(long)]
    account_id: Option<Uuid>,
}

#[derive(Args, Debug)]
struct Cooperative {
    #[command(subcommand)]
    command: CooperativeCommand,
}

#[derive(Subcommand, Debug)]
enum CooperativeCommand {
    Create(CooperativeCreateArgs),
    List(CooperativeListArgs),
    Show(CooperativeShowArgs),
}

#[derive(Args, Debug)]
struct CooperativeCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    registration_number: Option<String>,
    #[arg(long)]
    parent_id: Option<Uuid>,
    /// COOPERATIVE account that receives the cooperative share.
    #[arg(long)]
    account_id: Option<Uuid>,
}

#[derive(Args, Debug)]
struct CooperativeListArgs {
    #[arg(long)]
    parent_id: Option<Uuid>,
}

#[derive(Args, Debug)]
struct CooperativeShowArgs {
    #[arg(long)]
    id: Uuid,
}

#[derive(Args, Debug)]
struct Leader {
    #[command(subcommand)]
    command: LeaderCommand,
}

#[derive(Subcommand, Debug)]
enum LeaderCommand {
    Assign(LeaderAssignArgs),
}

#[derive(Args, Debug)]
struct LeaderAssignArgs {
    #[arg(long)]
    user_id: Uuid,
    #[arg(long)]
    cooperative_id: Uuid,
}

#[derive(Args, Debug)]
struct Setting {
    #[command(subcommand)]
    command: SettingCommand,
}

#[derive(Subcommand, Debug)]
enum SettingCommand {
    List,
    Set(SettingSetArgs),
}

#[derive(Args, Debug)]
struct SettingSetArgs {
    /// Super admin recorded as the author of the change.
    #[arg(long)]
    actor_id: Uuid,
    #[arg(long)]
    key: String,
    #[arg(long)]
    value: String,
}

fn parse_role(raw: &str) -> Result<Role, String> {
    Role::try_from(raw.trim().to_ascii_uppercase().as_str()).map_err(|err| err.to_string())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn notice(message: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )?;
    Ok(())
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    for _ in 0..3 {
        let first = prompt_password("Password: ")?;
        if first.chars().count() < MIN_PASSWORD_LEN {
            notice(&format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters."
            ))?;
            continue;
        }

        let second = prompt_password("Confirm password: ")?;
        if first == second {
            return Ok(first);
        }
        notice("Passwords do not match. Try again.")?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            let password = prompt_password_twice()?;
            let mut cmd = RegisterUserCmd::new(args.name, args.email, password, args.role);
            cmd.phone = args.phone;
            cmd.nin = args.nin;
            cmd.cooperative_id = args.cooperative_id;

            let user = engine.register_user(cmd).await?;
            println!("created {} user: {} ({})", user.role, user.email, user.id);
        }
        Command::ParentOrg(ParentOrg {
            command: ParentOrgCommand::Create(args),
        }) => {
            let org = engine
                .create_parent_organization(&args.name, args.account_id)
                .await?;
            println!("created parent organization: {} ({})", org.name, org.id);
        }
        Command::Cooperative(Cooperative {
            command: CooperativeCommand::Create(args),
        }) => {
            let mut cmd = CreateCooperativeCmd::new(args.name);
            if let Some(number) = args.registration_number {
                cmd = cmd.registration_number(number);
            }
            if let Some(parent_id) = args.parent_id {
                cmd = cmd.parent_organization_id(parent_id);
            }
            if let Some(account_id) = args.account_id {
                cmd = cmd.account_user_id(account_id);
            }
            let coop = engine.create_cooperative(cmd).await?;
            println!("created cooperative: {} ({})", coop.name, coop.id);
        }
        Command::Cooperative(Cooperative {
            command: CooperativeCommand::List(args),
        }) => {
            for coop in engine.list_cooperatives(args.parent_id).await? {
                println!(
                    "{}\t{}\t{}",
                    coop.id,
                    coop.name,
                    coop.registration_number.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Cooperative(Cooperative {
            command: CooperativeCommand::Show(args),
        }) => {
            let coop = engine.cooperative(args.id).await?;
            let or_dash = |id: Option<Uuid>| id.map_or_else(|| "-".to_string(), |id| id.to_string());
            println!("id:                  {}", coop.id);
            println!("name:                {}", coop.name);
            println!(
                "registration number: {}",
                coop.registration_number.as_deref().unwrap_or("-")
            );
            println!("parent organization: {}", or_dash(coop.parent_organization_id));
            println!("account:             {}", or_dash(coop.user_id));
            println!("created:             {}", coop.created_at);
        }
        Command::Leader(Leader {
            command: LeaderCommand::Assign(args),
        }) => {
            engine
                .assign_leader(args.user_id, args.cooperative_id)
                .await?;
            println!(
                "assigned leader {} to cooperative {}",
                args.user_id, args.cooperative_id
            );
        }
        Command::Setting(Setting {
            command: SettingCommand::List,
        }) => {
            for setting in engine.list_settings().await? {
                let origin = if setting.stored { "stored" } else { "default" };
                println!("{}\t{}\t{origin}", setting.key, setting.value);
            }
        }
        Command::Setting(Setting {
            command: SettingCommand::Set(args),
        }) => {
            let setting = engine
                .update_setting(args.actor_id, &args.key, &args.value, chrono::Utc::now())
                .await?;
            println!("{} = {}", setting.key, setting.value);
        }
    }

    Ok(())
}
