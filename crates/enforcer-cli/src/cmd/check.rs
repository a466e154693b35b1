use crate::output::{print_json, print_table};
use anyhow::Context;
use enforcer_core::{plan_pass, Decision, ServicePlan, Settings};

/// Dry run: report what the next pass would change without changing it.
pub fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let client = super::connect(settings)?;
    let desired = settings.desired_policy();
    let rt = tokio::runtime::Runtime::new()?;

    let plans = rt
        .block_on(plan_pass(&client, &desired))
        .context("failed to list services")?;

    if json {
        return print_json(&plans);
    }
    if plans.is_empty() {
        println!("No services found.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = plans.iter().map(row).collect();
    print_table(&["SERVICE", "RESTART DELAY", "UPDATE DELAY", "STATUS"], &rows);

    let pending = plans.iter().filter(|p| p.decision.is_update()).count();
    println!("\n{pending} of {} service(s) need an update", plans.len());
    Ok(())
}

fn row(plan: &ServicePlan) -> Vec<String> {
    let status = match &plan.decision {
        Decision::AlreadyCorrect => "ok".to_string(),
        Decision::Update { drift, .. } if drift.is_empty() => "update".to_string(),
        Decision::Update { drift, .. } => format!("update (overrides {})", drift.len()),
    };
    vec![
        plan.name.clone(),
        delay(plan.restart_delay_ns),
        delay(plan.update_delay_ns),
        status,
    ]
}

fn delay(ns: u64) -> String {
    if ns == 0 {
        "unset".to_string()
    } else {
        format!("{:?}", std::time::Duration::from_nanos(ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_delay_is_labelled() {
        assert_eq!(delay(0), "unset");
        assert_eq!(delay(10_000_000_000), "10s");
        assert_eq!(delay(1_500_000_000), "1.5s");
    }
}
