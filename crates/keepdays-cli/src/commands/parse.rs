//! Parse and key command implementations.

use crate::cli::{KeyArgs, ParseArgs};
use crate::error::Result;
use crate::output::Formatter;
use chrono::Utc;
use keepdays_domain::{build_archive_key, ArchiveKey};

/// Execute the parse command.
pub fn execute_parse(args: ParseArgs, formatter: &Formatter) -> Result<()> {
    let archives = args
        .keys
        .iter()
        .map(|key| ArchiveKey::parse(key))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    println!("{}", formatter.format_parsed(&archives)?);
    Ok(())
}

/// Execute the key command.
pub fn execute_key(args: KeyArgs) -> Result<()> {
    println!("{}", archive_key_for(&args));
    Ok(())
}

fn archive_key_for(args: &KeyArgs) -> String {
    let timestamp = args.at.unwrap_or_else(|| Utc::now().naive_utc());
    build_archive_key(&args.filename, timestamp)
}
