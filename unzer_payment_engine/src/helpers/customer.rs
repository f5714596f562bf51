//! Maps the buyer details sent by the marketplace onto a gateway customer.
use thiserror::Error;
use unzer_tools::data_objects::{Address, CustomerData};

use crate::db_types::{MarketplaceAddress, MarketplaceCustomer};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustomerMappingError {
    #[error("The customer has no email address")]
    MissingEmail,
    #[error("The customer has no billing address")]
    MissingBillingAddress,
}

/// Builds the gateway customer. The email doubles as the merchant's customer id, so that returning buyers map onto
/// the same gateway customer. Without a shipping address, the billing address is used for both.
pub fn gateway_customer(customer: &MarketplaceCustomer) -> Result<CustomerData, CustomerMappingError> {
    let email = customer.email.clone().filter(|e| !e.trim().is_empty()).ok_or(CustomerMappingError::MissingEmail)?;
    let billing = customer.billing_address.as_ref().ok_or(CustomerMappingError::MissingBillingAddress)?;
    let shipping = customer.shipping_address.as_ref().unwrap_or(billing);
    let language = customer
        .locale
        .as_deref()
        .and_then(|l| l.split('-').next())
        .filter(|l| !l.is_empty())
        .map(String::from);
    Ok(CustomerData {
        id: None,
        lastname: billing.family_name.clone().unwrap_or_default(),
        firstname: billing.given_name.clone().unwrap_or_default(),
        customer_id: Some(email.clone()),
        email,
        phone: billing.phone.clone().filter(|p| !p.is_empty()),
        language,
        billing_address: Some(gateway_address(billing)),
        shipping_address: Some(gateway_address(shipping)),
    })
}

fn gateway_address(address: &MarketplaceAddress) -> Address {
    let name = [address.given_name.as_deref(), address.family_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    Address {
        name,
        street: address.line1.clone().unwrap_or_default(),
        state: address.state.clone().filter(|s| !s.is_empty()),
        zip: address.postal_code.clone().unwrap_or_default(),
        city: address.city.clone().unwrap_or_default(),
        country: address.country_code.clone().unwrap_or_default(),
    }
}
