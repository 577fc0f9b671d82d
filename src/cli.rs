use anyhow::{bail, Context, Result};

use crate::config::{self, MigrationConfig};

/// What the command line asked for.
#[derive(Debug)]
pub enum Invocation {
    Run(Box<MigrationConfig>),
    Help,
}

/// Ten positional arguments in the order the usage text lists them.
/// Fewer than two arguments or an explicit help flag prints usage instead.
pub fn parse(args: &[String]) -> Result<Invocation> {
    if args.len() <= 1 || matches!(args[0].as_str(), "/?" | "--help" | "-h") {
        return Ok(Invocation::Help);
    }
    if args.len() != 10 {
        bail!(
            "Expected 10 arguments, got {}. Run with --help for usage.",
            args.len()
        );
    }

    let sync_paths =
        parse_bool(&args[4]).context("SYNC_PATHS_FLAG must be 'true' or 'false'")?;
    let migrate_items =
        parse_bool(&args[5]).context("MIGRATE_WORK_ITEMS_FLAG must be 'true' or 'false'")?;

    Ok(Invocation::Run(Box::new(MigrationConfig {
        source_url: args[0].clone(),
        dest_url: args[1].clone(),
        query_id: args[2].clone(),
        query_name: args[3].clone(),
        sync_paths,
        migrate_items,
        source_project: args[6].clone(),
        dest_project: args[7].clone(),
        dest_user: args[8].clone(),
        dest_password: args[9].clone(),
        domain_suffix: config::domain_suffix(),
    })))
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => bail!("'{other}' is not a boolean"),
    }
}

pub fn print_help() {
    println!("worklift - one-shot work item migration between two collections\n");
    println!("USAGE:");
    println!("  worklift SOURCE_COLLECTION_URL DESTINATION_COLLECTION_URL QUERY_ID QUERY_NAME \\");
    println!("           SYNC_PATHS_FLAG MIGRATE_WORK_ITEMS_FLAG SOURCE_PROJECT DESTINATION_PROJECT \\");
    println!("           DESTINATION_USER DESTINATION_PASSWORD");
    println!();
    println!("NOTE: Be careful when setting SYNC_PATHS_FLAG to true. This will CREATE area and");
    println!("      iteration paths on the destination using the given credentials.");
    println!("NOTE: Be careful when setting MIGRATE_WORK_ITEMS_FLAG to true. This will CREATE");
    println!("      work items on the destination using the given credentials. Re-running the");
    println!("      same query creates duplicates; there is no resume.");
    println!();
    println!("EXAMPLE:");
    println!("  worklift \"http://fabrikam:8080/tfs/Contoso_Collection\" \\");
    println!("           \"https://fabrikam.visualstudio.com/DefaultCollection\" \\");
    println!("           \"c24845e9-b5dh-4a95-cl18-8224dadabf37\" \"Source Server Query Name\" \\");
    println!("           false true Contoso-Project Contoso someuser somepassword");
}

/// Block until q or Q is pressed, so a console window opened just for the
/// run does not vanish with the log still on screen. Skipped when no
/// terminal is attached.
pub fn wait_for_quit() {
    use crossterm::event::{read, Event, KeyCode, KeyEventKind};
    use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

    if enable_raw_mode().is_err() {
        return;
    }
    loop {
        match read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
                    break;
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    let _ = disable_raw_mode();
}
