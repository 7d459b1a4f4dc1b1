//! Customer models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a customer has bought from us yet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CustomerType {
    #[default]
    #[serde(rename = "potencial")]
    Potential,
    #[serde(rename = "existente")]
    Existing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub customer_type: CustomerType,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub first_purchase_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_type_uses_original_labels() {
        assert_eq!(
            serde_json::to_value(CustomerType::Potential).unwrap(),
            "potencial"
        );
        assert_eq!(
            serde_json::to_value(CustomerType::Existing).unwrap(),
            "existente"
        );
        assert_eq!(CustomerType::default(), CustomerType::Potential);
    }
}
