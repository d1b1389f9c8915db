use chrono::Utc;

use crate::agency::Agency;
use crate::campaign::{BiddingStrategy, Campaign, Coordinates, SyncStatus};
use crate::database::{Database, MongoDatabase};
use crate::error::Error;
use crate::user::{Role, User};

/// Drops the database and loads a small demo dataset. Only runs when
/// SEED_DEMO_DATA is set; never enable it against a production database.
pub async fn seed(db: &MongoDatabase) -> Result<(), Error> {
    db.drop().await?;

    let admin_id = "USR-16E77539-8873-4C8A-BCA3-2036010474AD".parse().unwrap();
    let partner_id = "USR-5EA81D0A-9788-4B8A-82D9-1A0D636B53CE".parse().unwrap();
    let campaign_id = "CMP-33957EB6-0EE7-487F-A087-E55C335BD63C".parse().unwrap();

    let now = Utc::now();

    let agencies = vec![
        Agency {
            agency_id: "agency-toolo".to_string(),
            name: "Kiinteistömaailma Töölö".to_string(),
            email: Some("toolo@example.fi".to_string()),
            created_at: now,
        },
        Agency {
            agency_id: "agency-kallio".to_string(),
            name: "Kiinteistömaailma Kallio".to_string(),
            email: None,
            created_at: now,
        },
    ];

    for agency in &agencies {
        db.agencies().insert_agency(agency).await?;
    }

    let admin = User {
        id: admin_id,
        email: "admin@example.fi".to_string(),
        name: "Demo Admin".to_string(),
        role: Role::Admin,
        agent_key: None,
        partner_name: None,
        agency_id: None,
        last_login: None,
        created_at: now,
    };

    let partner = User {
        id: partner_id,
        email: "anna@example.fi".to_string(),
        name: "Anna Agent".to_string(),
        role: Role::Partner,
        agent_key: Some("agent-1".to_string()),
        partner_name: Some("Kiinteistömaailma Töölö".to_string()),
        agency_id: Some("agency-toolo".to_string()),
        last_login: None,
        created_at: now,
    };

    db.users().insert_user(&admin).await?;
    db.users().insert_user(&partner).await?;

    let campaign = Campaign {
        id: campaign_id,
        user_id: partner.id,
        created_by: partner.email.clone(),
        partner_id: "P-100".to_string(),
        partner_name: "Kiinteistömaailma Töölö".to_string(),
        agent: partner.name.clone(),
        agent_key: "agent-1".to_string(),
        agency_id: "agency-toolo".to_string(),
        campaign_address: "Mannerheimintie 1".to_string(),
        campaign_postal_code: "00100".to_string(),
        campaign_city: "Helsinki".to_string(),
        formatted_address: Some("Mannerheimintie 1, 00100 Helsinki".to_string()),
        campaign_coordinates: Some(Coordinates { lat: 60.1699, lng: 24.9384 }),
        campaign_radius: 1500,
        campaign_start_date: "03/2024".parse().unwrap(),
        campaign_end_date: Some("04/2024".parse().unwrap()),
        channel_meta: false,
        channel_display: true,
        channel_pdooh: false,
        budget_meta: None,
        budget_display: Some(3000.0),
        budget_pdooh: None,
        budget_meta_daily: 0.0,
        budget_display_daily: 49.18,
        budget_pdooh_daily: 0.0,
        bidding_strategy: BiddingStrategy::Even,
        max_cpm_display: 10.0,
        max_cpm_pdooh: 10.0,
        active: true,
        bt_campaign_id: None,
        bt_sync_status: Some(SyncStatus::Pending),
        bt_sync_error: None,
        bt_last_sync: None,
        cr_ad_tags: None,
        cr_last_updated: None,
        created_at: now,
        updated_at: now,
    };

    db.campaigns().insert_campaign(&campaign).await?;

    let apartment_keys = vec!["DEMO-APT-1".to_string(), "DEMO-APT-2".to_string()];
    db.campaign_apartments()
        .replace_links(campaign_id, &apartment_keys, now)
        .await?;

    Ok(())
}
