//! Sequence DDL generation.

use std::collections::BTreeMap;

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::orchestrator::Plan;
use crate::policy::{IdentifierPolicy, ObjectKind};
use crate::source::Catalog;

/// Emit one CREATE SEQUENCE per in-scope sequence, sorted by name.
///
/// The target sequence starts one past the source's last generated value so
/// migrated rows and new rows cannot collide.
pub(crate) fn generate(
    catalog: &mut dyn Catalog,
    policy: &IdentifierPolicy,
    plan: &Plan,
    out: &mut Dispatcher,
) -> Result<()> {
    let filter = plan
        .sequences
        .iter()
        .map(|s| format!("us.sequence_name = '{}'", s))
        .collect::<Vec<_>>()
        .join(" OR ");

    let sql = format!(
        "SELECT us.sequence_name, us.increment_by, us.last_number \
           FROM user_sequences us \
          WHERE {}",
        filter
    );

    let mut details = BTreeMap::new();
    let rows = catalog.query(&sql)?;
    for rec in rows.records() {
        details.insert(
            rec.text("sequence_name")?.to_string(),
            (rec.int("increment_by")?, rec.int("last_number")?),
        );
    }

    for (name, (increment, last_number)) in &details {
        let target = policy.resolve(ObjectKind::Sequence, name);
        out.dispatch(&format!(
            "CREATE SEQUENCE %%schema%%.{} INCREMENT {} START {};",
            target,
            increment,
            last_number + 1
        ))?;
    }

    Ok(())
}
