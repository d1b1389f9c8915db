//! Spreads per-channel campaign budgets over the flight's calendar days.

use super::CampaignMonth;

/// Flight length assumed for ongoing campaigns with no end month.
pub const DEFAULT_ONGOING_DAYS: i64 = 30;

/// Number of days the campaign runs, from the first day of the start month
/// through the last day of the end month, inclusive. Ongoing campaigns are
/// planned as [`DEFAULT_ONGOING_DAYS`]. Never returns less than 1, even for
/// inverted ranges.
pub fn campaign_days(start: CampaignMonth, end: Option<CampaignMonth>) -> i64 {
    match end {
        None => DEFAULT_ONGOING_DAYS,
        Some(end) => {
            let days = (end.last_day() - start.first_day()).num_days() + 1;
            days.max(1)
        }
    }
}

/// Daily spend for one channel: the total divided evenly across the flight,
/// rounded to whole cents. Disabled channels and channels without a total
/// spend nothing per day.
pub fn daily_budget(enabled: bool, total: Option<f64>, days: i64) -> f64 {
    if !enabled {
        return 0.0;
    }
    let total = match total {
        Some(total) => total,
        None => return 0.0,
    };
    round_cents(total / days.max(1) as f64)
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(year: i32, month: u32) -> CampaignMonth {
        CampaignMonth::new(year, month).unwrap()
    }

    #[test]
    fn single_month_counts_every_calendar_day() {
        assert_eq!(campaign_days(month(2024, 3), Some(month(2024, 3))), 31);
        assert_eq!(campaign_days(month(2024, 2), Some(month(2024, 2))), 29);
        assert_eq!(campaign_days(month(2023, 2), Some(month(2023, 2))), 28);
    }

    #[test]
    fn multi_month_flight_spans_first_to_last_day() {
        // Jan 1 through Mar 31
        assert_eq!(campaign_days(month(2024, 1), Some(month(2024, 3))), 91);
        // across a year boundary
        assert_eq!(campaign_days(month(2023, 12), Some(month(2024, 1))), 62);
    }

    #[test]
    fn ongoing_campaign_plans_thirty_days() {
        assert_eq!(campaign_days(month(2024, 5), None), DEFAULT_ONGOING_DAYS);
        assert_eq!(daily_budget(true, Some(3000.0), campaign_days(month(2024, 5), None)), 100.0);
    }

    #[test]
    fn inverted_range_clamps_to_one_day() {
        let days = campaign_days(month(2024, 5), Some(month(2024, 2)));
        assert_eq!(days, 1);
        assert_eq!(daily_budget(true, Some(500.0), days), 500.0);
    }

    #[test]
    fn daily_budget_rounds_half_up_to_cents() {
        // 3000 / 31 = 96.774...
        assert_eq!(daily_budget(true, Some(3000.0), 31), 96.77);
        // 1000 / 3 = 333.333...
        assert_eq!(daily_budget(true, Some(1000.0), 3), 333.33);
        // 100.125 exactly halfway rounds up
        assert_eq!(daily_budget(true, Some(200.25), 2), 100.13);
    }

    #[test]
    fn disabled_or_empty_channels_spend_nothing() {
        assert_eq!(daily_budget(false, Some(3000.0), 31), 0.0);
        assert_eq!(daily_budget(true, None, 31), 0.0);
    }
}
