//! Put command implementation.

use crate::cli::PutArgs;
use crate::error::Result;
use crate::output::Formatter;
use keepdays_janitor::JanitorConfig;
use keepdays_store::SqliteBucket;

/// Execute the put command.
///
/// Objects are registered as-is; keys that are not archive keys are accepted
/// and later reported by `reconcile`.
pub fn execute_put(
    args: PutArgs,
    config: &JanitorConfig,
    store: &mut SqliteBucket,
    formatter: &Formatter,
) -> Result<()> {
    let bucket = args.bucket.as_deref().unwrap_or(&config.archive_bucket);

    if args.remove {
        let mut removed = 0;
        for key in &args.keys {
            if store.remove_object(bucket, key)? {
                removed += 1;
            } else {
                println!("{}", formatter.warning(&format!("No such object: {}", key)));
            }
        }
        println!(
            "{}",
            formatter.success(&format!("Removed {} object(s) from {}", removed, bucket))
        );
        return Ok(());
    }

    let mut added = 0;
    for key in &args.keys {
        if store.put_object(bucket, key, args.size)? {
            added += 1;
        } else {
            println!("{}", formatter.info(&format!("Already registered: {}", key)));
        }
    }

    println!(
        "{}",
        formatter.success(&format!("Registered {} object(s) in {}", added, bucket))
    );
    Ok(())
}
