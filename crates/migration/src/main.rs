//! Schema maintenance for the coophub database.
//!
//! ```text
//! migration [up [N] | down [N] | fresh | refresh | reset | status]
//! ```
//!
//! The connection string comes from `DATABASE_URL`.

use std::error::Error;

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const DEFAULT_DATABASE_URL: &str = "sqlite:./coophub.db?mode=rwc";
const USAGE: &str = "usage: migration [up [N] | down [N] | fresh | refresh | reset | status]";

#[derive(Debug, PartialEq, Eq)]
enum Action {
    /// Apply pending migrations, all of them when no step count is given.
    Up(Option<u32>),
    /// Roll back, by default only the newest migration.
    Down(u32),
    Fresh,
    Refresh,
    Reset,
    Status,
}

fn parse_steps(raw: Option<&str>) -> Result<Option<u32>, String> {
    raw.map(|value| {
        value
            .parse::<u32>()
            .ok()
            .filter(|steps| *steps > 0)
            .ok_or_else(|| format!("invalid step count: {value}"))
    })
    .transpose()
}

fn parse_action(args: &[String]) -> Result<Action, String> {
    let mut args = args.iter().map(String::as_str);
    let action = match args.next().unwrap_or("up") {
        "up" => Action::Up(parse_steps(args.next())?),
        "down" => Action::Down(parse_steps(args.next())?.unwrap_or(1)),
        "fresh" => Action::Fresh,
        "refresh" => Action::Refresh,
        "reset" => Action::Reset,
        "status" => Action::Status,
        other => return Err(format!("unknown command: {other}\n{USAGE}")),
    };
    if let Some(extra) = args.next() {
        return Err(format!("unexpected argument: {extra}\n{USAGE}"));
    }
    Ok(action)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let action = match parse_action(&args) {
        Ok(action) => action,
        Err(message) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
    };

    let db_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
    let db = Database::connect(&db_url).await?;

    match action {
        Action::Up(steps) => migration::Migrator::up(&db, steps).await?,
        Action::Down(steps) => migration::Migrator::down(&db, Some(steps)).await?,
        Action::Fresh => migration::Migrator::fresh(&db).await?,
        Action::Refresh => migration::Migrator::refresh(&db).await?,
        Action::Reset => migration::Migrator::reset(&db).await?,
        Action::Status => migration::Migrator::status(&db).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| ToString::to_string(arg)).collect()
    }

    #[test]
    fn no_arguments_apply_everything() {
        assert_eq!(parse_action(&[]), Ok(Action::Up(None)));
    }

    #[test]
    fn step_counts_are_parsed() {
        assert_eq!(parse_action(&args(&["up", "2"])), Ok(Action::Up(Some(2))));
        assert_eq!(parse_action(&args(&["down"])), Ok(Action::Down(1)));
        assert_eq!(parse_action(&args(&["down", "3"])), Ok(Action::Down(3)));
        assert!(parse_action(&args(&["down", "0"])).is_err());
        assert!(parse_action(&args(&["up", "many"])).is_err());
    }

    #[test]
    fn unknown_or_extra_arguments_are_rejected() {
        assert!(parse_action(&args(&["sideways"])).is_err());
        assert!(parse_action(&args(&["status", "now"])).is_err());
        assert_eq!(parse_action(&args(&["reset"])), Ok(Action::Reset));
    }
}
