use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(format!(
                "Invalid priority '{}'. Valid options: low, medium, high",
                s
            )),
        }
    }
}

/// Page details scraped from a wish's link. Cosmetic only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
    /// Open Graph type: product, article, website, ...
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Who marked a wish as bought, and when (epoch milliseconds).
///
/// Both fields are stored flat on the wish entry; keeping them in one value
/// means an entry is either fully purchased or not purchased at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub purchased_by: String,
    pub purchase_date: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishItem {
    pub id: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UrlMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_error: Option<String>,
    #[serde(flatten)]
    pub purchase: Option<Purchase>,
}

impl WishItem {
    pub fn new(description: impl Into<String>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            url: None,
            priority: Priority::default(),
            created_at: now,
            updated_at: now,
            metadata: None,
            metadata_error: None,
            purchase: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, metadata: UrlMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_purchased(&self) -> bool {
        self.purchase.is_some()
    }

    pub fn purchased_by(&self) -> Option<&str> {
        self.purchase.as_ref().map(|p| p.purchased_by.as_str())
    }
}

impl fmt::Display for WishItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.priority, self.description)?;
        if let Some(url) = &self.url {
            write!(f, " <{}>", url)?;
        }
        if let Some(price) = self.metadata.as_ref().and_then(|m| m.price.as_ref()) {
            write!(f, " ({})", price)?;
        }
        if let Some(purchase) = &self.purchase {
            write!(f, " - bought by {}", purchase.purchased_by)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wish_item_new() {
        let item = WishItem::new("Scarf");
        assert_eq!(item.description, "Scarf");
        assert_eq!(item.priority, Priority::Medium);
        assert_eq!(item.created_at, item.updated_at);
        assert!(!item.is_purchased());
        assert!(Uuid::parse_str(&item.id).is_ok());
    }

    #[test]
    fn test_purchase_fields_are_flat_in_json() {
        let mut item = WishItem::new("Book").with_priority(Priority::High);
        item.purchase = Some(Purchase {
            purchased_by: "Bob".to_string(),
            purchase_date: 1_700_000_000_000,
        });

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["purchasedBy"], "Bob");
        assert_eq!(value["purchaseDate"], 1_700_000_000_000i64);
        assert_eq!(value["priority"], "high");
        assert!(value.get("purchase").is_none());
    }

    #[test]
    fn test_unpurchased_item_has_no_purchase_fields() {
        let value = serde_json::to_value(WishItem::new("Mug")).unwrap();
        assert!(value.get("purchasedBy").is_none());
        assert!(value.get("purchaseDate").is_none());
        assert!(value.get("url").is_none());
    }

    #[test]
    fn test_half_purchase_is_read_as_unpurchased() {
        let json = r#"{
            "id": "1700000000000",
            "description": "Socks",
            "priority": "low",
            "createdAt": 1,
            "updatedAt": 1,
            "purchasedBy": "Alice"
        }"#;

        let item: WishItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.priority, Priority::Low);
        assert!(item.purchase.is_none());
    }

    #[test]
    fn test_metadata_type_field_name() {
        let metadata = UrlMetadata {
            title: Some("Lamp".to_string()),
            site_name: Some("shop.example".to_string()),
            kind: Some("product".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["type"], "product");
        assert_eq!(value["siteName"], "shop.example");
        assert!(value.get("price").is_none());
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!(Priority::from_str("HIGH").unwrap(), Priority::High);
        assert!(Priority::from_str("urgent").is_err());
    }

    #[test]
    fn test_wish_display() {
        let mut item = WishItem::new("Board game").with_url("https://shop.example/game");
        item.purchase = Some(Purchase {
            purchased_by: "Carol".to_string(),
            purchase_date: 5,
        });

        let output = format!("{}", item);
        assert!(output.contains("[medium] Board game"));
        assert!(output.contains("<https://shop.example/game>"));
        assert!(output.contains("bought by Carol"));
    }
}
