use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;

pub use endpoints::*;

pub type CreativeId = TypedId<AdCreative>;

/// One generated display creative for a (campaign, apartment) pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdCreative {
    #[serde(rename = "_id")]
    pub id: CreativeId,
    pub campaign_id: CampaignId,
    pub apartment_key: String,
    /// Retargeting key shared by every size of the pair.
    pub target_id: String,
    pub name: String,
    pub size: String,
    pub hash: String,
    pub width: u32,
    pub height: u32,
    /// Set once the creative has been uploaded to the ad server.
    #[serde(default)]
    pub bt_creative_id: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl TypedIdMarker for AdCreative {
    fn tag() -> &'static str {
        "CRT"
    }
}

pub struct CreativeSize {
    pub width: u32,
    pub height: u32,
    /// Design hash in the creative platform; one published design per size.
    pub hash: &'static str,
}

/// The fixed set of design sizes generated for every advertised apartment.
pub const CREATIVE_SIZES: [CreativeSize; 5] = [
    CreativeSize { width: 300, height: 431, hash: "g3jo2pn" },
    CreativeSize { width: 300, height: 600, hash: "11jp13n" },
    CreativeSize { width: 620, height: 891, hash: "mqopyyq" },
    CreativeSize { width: 980, height: 400, hash: "58z5ylw" },
    CreativeSize { width: 1080, height: 1920, hash: "x8x7e3x" },
];

const EMBED_USER_ID: i64 = 762652;
const EMBED_NETWORK: &str = "BTT";
const EMBED_SCRIPT_URL: &str = "https://live-tag.creatopy.net/embed/embed.js";

/// Renders the self-contained embed page for a creative. The output depends
/// only on the creative's fields; the `Date.now()` cache-buster is evaluated
/// in the viewer's browser, not here.
pub fn render_embed_html(creative: &AdCreative) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{name}</title>
  <style>
    body {{ margin: 0; padding: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; background: #f0f0f0; }}
    .creative-container {{ width: {width}px; height: {height}px; background: white; overflow: hidden; }}
  </style>
</head>
<body>
  <div class="creative-container">
    <script type="text/javascript">
      var embedConfig = {{
        "hash": "{hash}",
        "width": {width},
        "height": {height},
        "t": Date.now(),
        "userId": {user_id},
        "network": "{network}",
        "type": "html5",
        "targetId": "{target_id}"
      }};
    </script>
    <script type="text/javascript" src="{script_url}"></script>
  </div>
</body>
</html>"#,
        name = creative.name,
        width = creative.width,
        height = creative.height,
        hash = creative.hash,
        user_id = EMBED_USER_ID,
        network = EMBED_NETWORK,
        target_id = creative.target_id,
        script_url = EMBED_SCRIPT_URL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creative() -> AdCreative {
        let campaign_id: CampaignId = "CMP-D9D52B35-7681-4A7D-B709-C6AC9195CF2A"
            .parse()
            .unwrap();
        let now = Utc::now();
        AdCreative {
            id: CreativeId::new(),
            campaign_id,
            apartment_key: "APT-1".to_string(),
            target_id: format!("{}-APT-1", campaign_id),
            name: "Kiinteistömaailma Töölö-APT-1-300x431".to_string(),
            size: "300x431".to_string(),
            hash: "g3jo2pn".to_string(),
            width: 300,
            height: 431,
            bt_creative_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn embed_html_is_deterministic() {
        let creative = creative();
        assert_eq!(render_embed_html(&creative), render_embed_html(&creative));
    }

    #[test]
    fn embed_html_carries_the_creative_fields() {
        let creative = creative();
        let html = render_embed_html(&creative);
        assert!(html.contains(r#""hash": "g3jo2pn""#));
        assert!(html.contains(r#""width": 300"#));
        assert!(html.contains(r#""height": 431"#));
        assert!(html.contains(&format!(r#""targetId": "{}""#, creative.target_id)));
        assert!(html.contains(r#""network": "BTT""#));
        // the cache-buster stays client-side
        assert!(html.contains(r#""t": Date.now()"#));
    }
}
