//! Rule management commands

use anyhow::Result;
use tabled::{settings::Style, Table, Tabled};

use crate::client::{ApiClient, DeploymentOutcome, Envelope, RulePayload, ServiceStatus, TrafficRule};
use crate::output::{color_deployed, format_split, print_success, print_warning, OutputFormat};

/// Row for the rules table
#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Split")]
    split: String,
    #[tabled(rename = "Type")]
    rule_type: String,
    #[tabled(rename = "Created")]
    created_at: String,
    #[tabled(rename = "Deployed")]
    deployed_at: String,
}

impl From<&TrafficRule> for RuleRow {
    fn from(rule: &TrafficRule) -> Self {
        Self {
            id: truncate_id(&rule.id),
            service: rule.service_name.clone(),
            split: format_split(
                &rule.version1_name,
                rule.version1_weight,
                &rule.version2_name,
                rule.version2_weight,
            ),
            rule_type: rule.rule_type.clone(),
            created_at: rule.created_at.clone(),
            deployed_at: color_deployed(rule.deployed_at.as_deref()),
        }
    }
}

fn print_rules(rules: &[TrafficRule], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rules)?);
        }
        OutputFormat::Table => {
            if rules.is_empty() {
                print_warning("No traffic rules found");
                return Ok(());
            }
            let rows: Vec<RuleRow> = rules.iter().map(RuleRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }
    }
    Ok(())
}

/// List all rules
pub async fn list(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let response: Envelope<Vec<TrafficRule>> = client.get("api/rules").await?;
    print_rules(&response.into_data()?, format)
}

/// Show one rule
pub async fn get(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let response: Envelope<TrafficRule> = client.get(&format!("api/rules/{id}")).await?;
    print_rules(std::slice::from_ref(&response.into_data()?), format)
}

/// Create a rule
pub async fn create(client: &ApiClient, payload: RulePayload, format: OutputFormat) -> Result<()> {
    let response: Envelope<TrafficRule> = client.post("api/rules", &payload).await?;
    let rule = response.into_data()?;

    print_success(&format!(
        "Created rule {} for service {}",
        rule.id, rule.service_name
    ));
    print_rules(std::slice::from_ref(&rule), format)
}

/// Delete a rule
pub async fn delete(client: &ApiClient, id: &str) -> Result<()> {
    let response: Envelope<String> = client.delete(&format!("api/rules/{id}")).await?;
    response.into_data()?;
    print_success(&format!("Deleted rule {}", id));
    Ok(())
}

/// Deploy a rule into the mesh
pub async fn deploy(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let response: Envelope<DeploymentOutcome> = client
        .post(&format!("api/rules/{id}/deploy"), &serde_json::json!({}))
        .await?;
    let outcome = response.into_data()?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_success(&format!(
        "Snapshot written to {}",
        outcome.snapshot_path
    ));
    if outcome.cluster_applied {
        print_success("Routing objects applied to the cluster");
    } else {
        print_warning(&format!(
            "Not applied to the cluster ({}); the GitOps snapshot will deliver it",
            outcome
                .cluster_error
                .as_deref()
                .unwrap_or("unknown cluster state")
        ));
    }
    Ok(())
}

/// Show the live Kubernetes Service behind a rule
pub async fn status(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let response: Envelope<ServiceStatus> = client.get(&format!("api/rules/{id}/status")).await?;
    let status = response.into_data()?;

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    print_success(&format!(
        "Service {}/{} is present",
        status.namespace, status.name
    ));
    if let Some(ip) = &status.cluster_ip {
        println!("  cluster ip: {}", ip);
    }
    if !status.ports.is_empty() {
        let ports: Vec<String> = status.ports.iter().map(|p| p.to_string()).collect();
        println!("  ports: {}", ports.join(", "));
    }
    Ok(())
}

/// Shorten UUIDs for table display
fn truncate_id(id: &str) -> String {
    if id.len() > 8 {
        format!("{}…", &id[..8])
    } else {
        id.to_string()
    }
}
