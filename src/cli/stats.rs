use anyhow::Result;

use neurolinker::analytics::decision_stats;
use neurolinker::storage::types::RecordId;
use neurolinker::storage::StorageBackend;

/// Display journal statistics in the terminal.
pub fn stats(storage: &dyn StorageBackend, owner: &RecordId, json: bool) -> Result<()> {
    let response = decision_stats(storage, owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Decision Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total decisions:     {}", response.total_decisions);
    println!("  Completed:           {}", response.completed);
    println!("  Pending:             {}", response.pending);
    println!("  Avg constraints:     {:.1}", response.avg_constraints);
    println!();

    println!("By Status:");
    for (status, count) in &response.by_status {
        println!("  {:<12} {}", status, count);
    }
    println!();

    println!("Categories:");
    for (category, count) in &response.categories {
        println!("  {:<22} {}", category, count);
    }
    println!();

    println!("Conversations:         {}", response.conversations);
    println!("  This week:           {}", response.conversations_this_week);
    println!("Learning level:        {}%", response.learning_level);

    if let Some(ref latest) = response.latest_decision {
        println!("Latest decision:       {latest}");
    }

    Ok(())
}
