//! Usage command handler.
//!
//! Reads the current month's ledger entry for a principal.

use chrono::Utc;
use clap::{Args, Subcommand};
use lectern_core::{config::AppConfig, AppResult};

use super::{print_json, usage_ledger};

/// Inspect the usage ledger
#[derive(Args, Debug)]
pub struct UsageCommand {
    #[command(subcommand)]
    pub action: UsageAction,
}

#[derive(Subcommand, Debug)]
pub enum UsageAction {
    /// Show this month's usage for a principal
    Show(UsageShowCommand),
}

impl UsageCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            UsageAction::Show(cmd) => cmd.execute(config).await,
        }
    }
}

/// Show usage for a principal
#[derive(Args, Debug)]
pub struct UsageShowCommand {
    /// Principal id, e.g. user:42 or session:abc
    #[arg(long)]
    pub principal: String,

    /// Principal holds a subscription
    #[arg(long)]
    pub premium: bool,

    /// Include the recent event log
    #[arg(long)]
    pub events: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl UsageShowCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing usage show for {}", self.principal);

        let ledger = usage_ledger(config)?;
        let now = Utc::now();
        let summary = ledger.summary(&self.principal, self.premium, now).await;
        let events = if self.events {
            ledger.events(&self.principal, now).await
        } else {
            Vec::new()
        };

        if self.json {
            let output = serde_json::json!({
                "summary": summary,
                "state": summary.effective_state(),
                "events": events,
            });
            return print_json(&output);
        }

        let quota = &summary.quota;
        println!("Principal: {} ({})", summary.principal_id, summary.month_key);
        println!("State:     {}", summary.effective_state());
        println!("Quota:     {}/{} platform generations", quota.used, quota.allowance());
        println!(
            "Budget:    ${:.4} of ${:.2} spent",
            summary.platform_budget.spent_usd, summary.platform_budget.limit_usd
        );
        println!(
            "Messages:  {} (${:.4} total)",
            summary.total_messages, summary.total_cost_usd
        );
        for (provider, usage) in &summary.by_provider {
            println!("  {:<12} {} messages, ${:.4}", provider, usage.messages, usage.cost_usd);
        }

        if self.events {
            println!("Recent events:");
            for event in &events {
                println!(
                    "  {} {} in={} out={} ${:.6}{}",
                    event.timestamp,
                    event.provider,
                    event.input_tokens,
                    event.output_tokens,
                    event.estimated_cost_usd,
                    if event.charged_to_platform { "" } else { " (own key)" }
                );
            }
        }
        Ok(())
    }
}
