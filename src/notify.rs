use async_trait::async_trait;
use tracing::info;

use crate::campaign::Campaign;
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveAction {
    Created,
    Updated,
}

impl SaveAction {
    pub fn label(&self) -> &'static str {
        match self {
            SaveAction::Created => "created",
            SaveAction::Updated => "updated",
        }
    }
}

/// Tells the marketing team about campaign saves. Delivery failures are the
/// caller's to swallow: a save must never fail because a notification did.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn campaign_saved(
        &self,
        action: SaveAction,
        campaign: &Campaign,
        user_email: &str,
    ) -> Result<(), Error>;
}

/// Renders the summary the team message carries.
pub fn format_campaign_message(
    action: SaveAction,
    campaign: &Campaign,
    user_email: &str,
) -> String {
    let channels = campaign
        .channels()
        .iter()
        .map(|channel| channel.label())
        .collect::<Vec<_>>()
        .join(", ");
    let channels = if channels.is_empty() {
        "None".to_string()
    } else {
        channels
    };

    let location = campaign.formatted_address.clone().unwrap_or_else(|| {
        format!(
            "{}, {} {}",
            campaign.campaign_address, campaign.campaign_postal_code, campaign.campaign_city
        )
    });

    let end_date = match campaign.campaign_end_date {
        Some(end) => end.to_string(),
        None => "Ongoing".to_string(),
    };

    let mut message = format!("*Campaign was {} by {}*\n\n", action.label(), user_email);
    message += &format!("*Campaign ID:* {}\n", campaign.id);
    message += &format!("*Partner:* {}\n", campaign.partner_name);
    message += &format!("*Agent:* {}\n", campaign.agent);
    message += &format!("*Agent Key:* {}\n", campaign.agent_key);
    message += &format!("*Location:* {}\n", location);
    message += &format!("*Radius:* {}m\n", campaign.campaign_radius);
    message += &format!("*Channels:* {}\n", channels);
    message += &format!("*Total Budget:* €{:.2}\n", campaign.total_budget());
    message += &format!("*Start Date:* {}\n", campaign.campaign_start_date);
    message += &format!("*End Date:* {}\n", end_date);
    message += &format!(
        "*Status:* {}\n",
        if campaign.active { "Active" } else { "Paused" }
    );

    message
}

/// Notifier that writes the rendered message to the log. Stands in for the
/// team's chat hook in environments without credentials for it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn campaign_saved(
        &self,
        action: SaveAction,
        campaign: &Campaign,
        user_email: &str,
    ) -> Result<(), Error> {
        info!(
            campaign_id = %campaign.id,
            "campaign {}:\n{}",
            action.label(),
            format_campaign_message(action, campaign, user_email)
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::campaign::test::campaign;

    use super::*;

    #[test]
    fn message_summarizes_the_campaign() {
        let campaign = campaign();
        let message = format_campaign_message(SaveAction::Created, &campaign, "anna@example.fi");

        assert!(message.starts_with("*Campaign was created by anna@example.fi*"));
        assert!(message.contains("*Channels:* Display\n"));
        assert!(message.contains("*Total Budget:* €3000.00\n"));
        assert!(message.contains("*Start Date:* 03/2024\n"));
        assert!(message.contains("*Status:* Active\n"));
        assert!(message.contains("Mannerheimintie 1, 00100 Helsinki"));
    }

    #[test]
    fn ongoing_campaign_reports_no_end_date() {
        let campaign = crate::campaign::Campaign {
            campaign_end_date: None,
            active: false,
            ..campaign()
        };
        let message = format_campaign_message(SaveAction::Updated, &campaign, "anna@example.fi");

        assert!(message.contains("*End Date:* Ongoing\n"));
        assert!(message.contains("*Status:* Paused\n"));
    }
}
