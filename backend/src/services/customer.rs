//! Customer records and first-sale promotion

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use shared::{validate_name, Customer, CustomerType, Sale};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::store::{self, collections, Query, SharedStore};

#[derive(Clone)]
pub struct CustomerService {
    store: SharedStore,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: String,
    #[serde(rename = "type")]
    pub customer_type: Option<CustomerType>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub customer_type: Option<CustomerType>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub address: Option<String>,
}

impl CustomerService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn create_customer(&self, input: CreateCustomerInput) -> AppResult<Customer> {
        input.validate()?;
        validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
            message_es: "El nombre no puede estar vacío".to_string(),
        })?;

        let customer = Customer {
            id: self.store.new_id(),
            name: input.name.trim().to_string(),
            customer_type: input.customer_type.unwrap_or_default(),
            contact_person: input.contact_person,
            phone: input.phone,
            email: input.email,
            address: input.address,
            first_purchase_date: None,
            created_at: Utc::now(),
        };
        store::insert(self.store.as_ref(), collections::CUSTOMERS, &customer.id, &customer).await?;

        tracing::info!(customer_id = %customer.id, customer_type = ?customer.customer_type, "Customer created");
        Ok(customer)
    }

    /// Overwrite the provided fields only
    pub async fn update_customer(&self, id: &str, input: UpdateCustomerInput) -> AppResult<Customer> {
        input.validate()?;

        let mut fields = Map::new();
        if let Some(name) = input.name {
            validate_name(&name).map_err(|msg| AppError::Validation {
                field: "name".to_string(),
                message: msg.to_string(),
                message_es: "El nombre no puede estar vacío".to_string(),
            })?;
            fields.insert("name".to_string(), Value::String(name.trim().to_string()));
        }
        if let Some(customer_type) = input.customer_type {
            fields.insert("type".to_string(), json!(customer_type));
        }
        for (key, value) in [
            ("contactPerson", input.contact_person),
            ("phone", input.phone),
            ("email", input.email),
            ("address", input.address),
        ] {
            if let Some(value) = value {
                fields.insert(key.to_string(), Value::String(value));
            }
        }

        if !fields.is_empty() {
            self.store.update(collections::CUSTOMERS, id, fields).await?;
            tracing::info!(customer_id = id, "Customer updated");
        }
        self.get_customer(id).await
    }

    pub async fn get_customer(&self, id: &str) -> AppResult<Customer> {
        store::fetch(self.store.as_ref(), collections::CUSTOMERS, id)
            .await?
            .ok_or_else(|| AppError::not_found("Customer", id))
    }

    pub async fn list_customers(&self, customer_type: Option<CustomerType>) -> AppResult<Vec<Customer>> {
        let query = match customer_type {
            Some(customer_type) => Query::new().filter("type", json!(customer_type)),
            None => Query::new(),
        };
        let mut customers: Vec<Customer> =
            store::list(self.store.as_ref(), collections::CUSTOMERS, &query).await?;
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    /// Promote a potential customer to existing on their first sale.
    ///
    /// Returns whether the customer changed. Missing customers and customers
    /// already `existente` are left alone, so replays are harmless.
    pub async fn promote_on_first_sale(&self, sale: &Sale) -> AppResult<bool> {
        let Some(customer_id) = sale.customer_id.as_deref() else {
            tracing::debug!(sale_id = %sale.id, "Sale has no customer id; nothing to promote");
            return Ok(false);
        };

        let mut tx = self.store.begin().await?;
        let customer: Option<Customer> =
            store::tx_fetch(tx.as_mut(), collections::CUSTOMERS, customer_id).await?;
        let Some(customer) = customer else {
            tracing::debug!(sale_id = %sale.id, customer_id, "Customer not found; nothing to promote");
            return Ok(false);
        };
        if customer.customer_type == CustomerType::Existing {
            return Ok(false);
        }

        tx.update(
            collections::CUSTOMERS,
            customer_id,
            store::patch(json!({
                "type": CustomerType::Existing,
                "firstPurchaseDate": sale.created_at,
            }))?,
        )?;
        tx.commit().await?;

        tracing::info!(customer_id, sale_id = %sale.id, "Customer promoted to existing");
        Ok(true)
    }
}
