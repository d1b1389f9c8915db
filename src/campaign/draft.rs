//! An in-progress campaign submission. The draft is immutable: each group
//! of fields is replaced wholesale and derived values are recomputed, so a
//! draft can never hold a stale daily budget.

use serde::{Deserialize, Serialize};

use crate::violations::Violation;

use super::budget::{campaign_days, daily_budget};
use super::{BiddingStrategy, CampaignMonth, Channel, Coordinates};

pub const DEFAULT_MAX_CPM: f64 = 10.0;

/// Partner, location and schedule fields of a submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CampaignInfo {
    pub partner_id: String,
    pub partner_name: String,
    pub agent: String,
    pub agent_key: String,
    pub agency_id: String,
    pub campaign_address: String,
    pub campaign_postal_code: String,
    pub campaign_city: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub campaign_coordinates: Option<Coordinates>,
    pub campaign_radius: u32,
    pub campaign_start_date: CampaignMonth,
    #[serde(default)]
    pub campaign_end_date: Option<CampaignMonth>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Channel toggles, totals and bidding fields of a submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BudgetSelection {
    #[serde(default)]
    pub channel_meta: bool,
    #[serde(default)]
    pub channel_display: bool,
    #[serde(default)]
    pub channel_pdooh: bool,
    #[serde(default)]
    pub budget_meta: Option<f64>,
    #[serde(default)]
    pub budget_display: Option<f64>,
    #[serde(default)]
    pub budget_pdooh: Option<f64>,
    #[serde(default)]
    pub bidding_strategy: BiddingStrategy,
    #[serde(default = "default_max_cpm")]
    pub max_cpm_display: f64,
    #[serde(default = "default_max_cpm")]
    pub max_cpm_pdooh: f64,
}

fn default_max_cpm() -> f64 {
    DEFAULT_MAX_CPM
}

#[derive(Clone, Debug)]
pub struct CampaignDraft {
    info: CampaignInfo,
    apartment_keys: Vec<String>,
    budget: BudgetSelection,
    budget_meta_daily: f64,
    budget_display_daily: f64,
    budget_pdooh_daily: f64,
}

impl CampaignDraft {
    pub fn new(
        info: CampaignInfo,
        apartment_keys: Vec<String>,
        budget: BudgetSelection,
    ) -> CampaignDraft {
        // A disabled channel keeps no total; re-enabling starts blank.
        let budget = BudgetSelection {
            budget_meta: budget.budget_meta.filter(|_| budget.channel_meta),
            budget_display: budget.budget_display.filter(|_| budget.channel_display),
            budget_pdooh: budget.budget_pdooh.filter(|_| budget.channel_pdooh),
            ..budget
        };

        let days = campaign_days(info.campaign_start_date, info.campaign_end_date);
        let budget_meta_daily = daily_budget(budget.channel_meta, budget.budget_meta, days);
        let budget_display_daily =
            daily_budget(budget.channel_display, budget.budget_display, days);
        let budget_pdooh_daily = daily_budget(budget.channel_pdooh, budget.budget_pdooh, days);

        CampaignDraft {
            info,
            apartment_keys,
            budget,
            budget_meta_daily,
            budget_display_daily,
            budget_pdooh_daily,
        }
    }

    pub fn with_info(self, info: CampaignInfo) -> CampaignDraft {
        CampaignDraft::new(info, self.apartment_keys, self.budget)
    }

    pub fn with_apartments(self, apartment_keys: Vec<String>) -> CampaignDraft {
        CampaignDraft::new(self.info, apartment_keys, self.budget)
    }

    pub fn with_budget(self, budget: BudgetSelection) -> CampaignDraft {
        CampaignDraft::new(self.info, self.apartment_keys, budget)
    }

    pub fn info(&self) -> &CampaignInfo {
        &self.info
    }

    pub fn apartment_keys(&self) -> &[String] {
        &self.apartment_keys
    }

    pub fn budget(&self) -> &BudgetSelection {
        &self.budget
    }

    pub fn budget_meta_daily(&self) -> f64 {
        self.budget_meta_daily
    }

    pub fn budget_display_daily(&self) -> f64 {
        self.budget_display_daily
    }

    pub fn budget_pdooh_daily(&self) -> f64 {
        self.budget_pdooh_daily
    }

    /// Checks the whole draft and reports every violation at once, so a
    /// caller can surface the full list in a single response.
    pub fn validate(&self) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();

        let required = [
            ("partner_id", &self.info.partner_id),
            ("partner_name", &self.info.partner_name),
            ("agent", &self.info.agent),
            ("agent_key", &self.info.agent_key),
            ("agency_id", &self.info.agency_id),
            ("campaign_address", &self.info.campaign_address),
            ("campaign_postal_code", &self.info.campaign_postal_code),
            ("campaign_city", &self.info.campaign_city),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                violations.push(Violation::MissingRequiredField {
                    field: field.to_string(),
                });
            }
        }

        if self.info.campaign_radius == 0 {
            violations.push(Violation::RadiusNotPositive {
                radius: self.info.campaign_radius,
            });
        }

        if let Some(end) = self.info.campaign_end_date {
            if end < self.info.campaign_start_date {
                violations.push(Violation::EndsBeforeStart {
                    start: self.info.campaign_start_date,
                    end,
                });
            }
        }

        if self.apartment_keys.is_empty() {
            violations.push(Violation::NoApartmentsSelected);
        }

        let channels = [
            (Channel::Meta, self.budget.channel_meta, self.budget.budget_meta),
            (Channel::Display, self.budget.channel_display, self.budget.budget_display),
            (Channel::Pdooh, self.budget.channel_pdooh, self.budget.budget_pdooh),
        ];

        if channels.iter().all(|(_, enabled, _)| !enabled) {
            violations.push(Violation::NoChannelEnabled);
        }

        for (channel, enabled, total) in channels {
            if !enabled {
                continue;
            }
            match total {
                None => violations.push(Violation::MissingChannelBudget { channel }),
                Some(budget) if budget <= 0.0 => {
                    violations.push(Violation::NonPositiveChannelBudget { channel, budget })
                }
                Some(_) => {}
            }
        }

        if self.budget.channel_display && self.budget.max_cpm_display <= 0.0 {
            violations.push(Violation::NonPositiveMaxCpm {
                channel: Channel::Display,
                max_cpm: self.budget.max_cpm_display,
            });
        }
        if self.budget.channel_pdooh && self.budget.max_cpm_pdooh <= 0.0 {
            violations.push(Violation::NonPositiveMaxCpm {
                channel: Channel::Pdooh,
                max_cpm: self.budget.max_cpm_pdooh,
            });
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
pub mod test {
    use super::*;

    pub fn info() -> CampaignInfo {
        CampaignInfo {
            partner_id: "P-100".to_string(),
            partner_name: "Kiinteistömaailma Töölö".to_string(),
            agent: "Anna Agent".to_string(),
            agent_key: "agent-1".to_string(),
            agency_id: "agency-1".to_string(),
            campaign_address: "Mannerheimintie 1".to_string(),
            campaign_postal_code: "00100".to_string(),
            campaign_city: "Helsinki".to_string(),
            formatted_address: None,
            campaign_coordinates: Some(Coordinates { lat: 60.17, lng: 24.94 }),
            campaign_radius: 1500,
            campaign_start_date: CampaignMonth::new(2024, 3).unwrap(),
            campaign_end_date: Some(CampaignMonth::new(2024, 3).unwrap()),
            active: true,
        }
    }

    pub fn budget() -> BudgetSelection {
        BudgetSelection {
            channel_meta: false,
            channel_display: true,
            channel_pdooh: false,
            budget_meta: None,
            budget_display: Some(3000.0),
            budget_pdooh: None,
            bidding_strategy: BiddingStrategy::Even,
            max_cpm_display: DEFAULT_MAX_CPM,
            max_cpm_pdooh: DEFAULT_MAX_CPM,
        }
    }

    pub fn draft() -> CampaignDraft {
        CampaignDraft::new(info(), vec!["APT-1".to_string(), "APT-2".to_string()], budget())
    }
}

#[cfg(test)]
mod tests {
    use super::test::{budget, draft, info};
    use super::*;

    #[test]
    fn valid_draft_passes_validation() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn daily_budgets_follow_the_flight_length() {
        let draft = draft();
        // March has 31 days
        assert_eq!(draft.budget_display_daily(), 96.77);
        assert_eq!(draft.budget_meta_daily(), 0.0);
        assert_eq!(draft.budget_pdooh_daily(), 0.0);
    }

    #[test]
    fn replacing_the_schedule_recomputes_daily_budgets() {
        let ongoing = CampaignInfo {
            campaign_end_date: None,
            ..info()
        };
        let draft = draft().with_info(ongoing);
        // 3000 over the assumed 30-day ongoing flight
        assert_eq!(draft.budget_display_daily(), 100.0);
    }

    #[test]
    fn disabling_a_channel_clears_its_total() {
        let draft = draft().with_budget(BudgetSelection {
            channel_display: false,
            ..budget()
        });
        assert_eq!(draft.budget().budget_display, None);
        assert_eq!(draft.budget_display_daily(), 0.0);
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let bare = CampaignInfo {
            partner_id: "".to_string(),
            agent: "  ".to_string(),
            ..info()
        };
        let violations = draft().with_info(bare).validate().unwrap_err();
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::MissingRequiredField { field } if field == "partner_id"
        )));
        assert!(violations.iter().any(|v| matches!(
            v,
            Violation::MissingRequiredField { field } if field == "agent"
        )));
    }

    #[test]
    fn enabled_channel_requires_a_positive_total() {
        let violations = draft()
            .with_budget(BudgetSelection {
                budget_display: Some(0.0),
                ..budget()
            })
            .validate()
            .unwrap_err();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::NonPositiveChannelBudget { .. })));

        let violations = draft()
            .with_budget(BudgetSelection {
                budget_display: None,
                ..budget()
            })
            .validate()
            .unwrap_err();
        assert!(violations
            .iter()
            .any(|v| matches!(v, Violation::MissingChannelBudget { .. })));
    }

    #[test]
    fn no_channel_and_no_apartments_are_violations() {
        let violations = draft()
            .with_apartments(vec![])
            .with_budget(BudgetSelection {
                channel_display: false,
                ..budget()
            })
            .validate()
            .unwrap_err();
        assert!(violations.iter().any(|v| matches!(v, Violation::NoChannelEnabled)));
        assert!(violations.iter().any(|v| matches!(v, Violation::NoApartmentsSelected)));
    }

    #[test]
    fn end_month_before_start_month_is_a_violation() {
        let inverted = CampaignInfo {
            campaign_end_date: Some(CampaignMonth::new(2024, 1).unwrap()),
            ..info()
        };
        let violations = draft().with_info(inverted).validate().unwrap_err();
        assert!(violations.iter().any(|v| matches!(v, Violation::EndsBeforeStart { .. })));
    }
}
