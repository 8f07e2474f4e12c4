use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::value_objects::{DeliveryType, ShippingAddress};
use crate::domain::print_job::PrintOptions;
use crate::domain::Money;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJobRequest {
    pub file_id: Uuid,
    pub options: PrintOptions,
}

/// Place an order for already-uploaded files.
///
/// `total` is the price the client confirmed from a quote. It is stored as
/// given; the server does not re-price at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub address: Option<ShippingAddress>,
    pub print_jobs: Vec<PrintJobRequest>,
    pub total: Money,
    #[serde(default)]
    pub binding_groups: Option<Vec<Vec<Uuid>>>,
    #[serde(default)]
    pub razorpay_order_id: Option<String>,
}

impl PlaceOrder {
    /// Shape checks that need no storage access
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.print_jobs.is_empty() {
            return Err(OrderError::EmptyPrintJobs);
        }

        if self.total.is_sign_negative() && !self.total.is_zero() {
            return Err(OrderError::NegativeTotal);
        }

        match (&self.delivery_type, &self.address) {
            (DeliveryType::Delivery, None) => return Err(OrderError::MissingAddress),
            (_, Some(address)) => validate_address(address)?,
            (DeliveryType::Pickup, None) => {}
        }

        if let Some(id) = &self.razorpay_order_id {
            if id.trim().is_empty() {
                return Err(OrderError::BlankGatewayOrderId);
            }
        }

        if let Some(groups) = &self.binding_groups {
            let order_files: HashSet<Uuid> = self.print_jobs.iter().map(|j| j.file_id).collect();
            validate_binding_groups(groups, &order_files)?;
        }

        Ok(())
    }

    /// Empty binding group lists are treated as absent
    pub fn normalized_binding_groups(&self) -> Option<Vec<Vec<Uuid>>> {
        self.binding_groups
            .as_ref()
            .filter(|groups| !groups.is_empty())
            .cloned()
    }
}

fn validate_address(address: &ShippingAddress) -> Result<(), OrderError> {
    let required = [
        (&address.name, "name is required"),
        (&address.phone, "phone is required"),
        (&address.line1, "address line is required"),
        (&address.city, "city is required"),
        (&address.state, "state is required"),
        (&address.pincode, "pincode is required"),
    ];
    for (value, message) in required {
        if value.trim().is_empty() {
            return Err(OrderError::InvalidAddress(message));
        }
    }

    if !address.pincode.trim().chars().all(|c| c.is_ascii_digit()) {
        return Err(OrderError::InvalidAddress("pincode must be numeric"));
    }
    Ok(())
}

/// Every group non-empty, every file belongs to the order, no file in two groups
pub fn validate_binding_groups(
    groups: &[Vec<Uuid>],
    order_files: &HashSet<Uuid>,
) -> Result<(), OrderError> {
    let mut seen = HashSet::new();

    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(OrderError::InvalidBindingGroups(format!(
                "group {} is empty",
                index + 1
            )));
        }
        for file_id in group {
            if !order_files.contains(file_id) {
                return Err(OrderError::InvalidBindingGroups(format!(
                    "file {} is not part of this order",
                    file_id
                )));
            }
            if !seen.insert(*file_id) {
                return Err(OrderError::InvalidBindingGroups(format!(
                    "file {} appears in more than one group",
                    file_id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ColorMode, PaperQuality, PaperSize, PrintSide};
    use rust_decimal::Decimal;

    fn options() -> PrintOptions {
        PrintOptions {
            color: ColorMode::Color,
            paper_size: PaperSize::A4,
            paper_quality: PaperQuality::Gsm80,
            side: PrintSide::Single,
            binding: None,
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            name: "Asha".to_string(),
            phone: "9876543210".to_string(),
            line1: "12 MG Road".to_string(),
            line2: None,
            city: "Bengaluru".to_string(),
            state: "KA".to_string(),
            pincode: "560001".to_string(),
            country: "India".to_string(),
        }
    }

    fn command(files: &[Uuid]) -> PlaceOrder {
        PlaceOrder {
            delivery_type: DeliveryType::Delivery,
            address: Some(address()),
            print_jobs: files
                .iter()
                .map(|f| PrintJobRequest { file_id: *f, options: options() })
                .collect(),
            total: Decimal::new(24000, 2),
            binding_groups: None,
            razorpay_order_id: None,
        }
    }

    #[test]
    fn test_valid_command_passes() {
        assert_eq!(command(&[Uuid::new_v4()]).validate(), Ok(()));
    }

    #[test]
    fn test_empty_jobs_rejected() {
        assert_eq!(command(&[]).validate(), Err(OrderError::EmptyPrintJobs));
    }

    #[test]
    fn test_delivery_requires_address() {
        let mut cmd = command(&[Uuid::new_v4()]);
        cmd.address = None;
        assert_eq!(cmd.validate(), Err(OrderError::MissingAddress));

        cmd.delivery_type = DeliveryType::Pickup;
        assert_eq!(cmd.validate(), Ok(()));
    }

    #[test]
    fn test_non_numeric_pincode_rejected() {
        let mut cmd = command(&[Uuid::new_v4()]);
        cmd.address.as_mut().unwrap().pincode = "56O001".to_string();
        assert!(matches!(cmd.validate(), Err(OrderError::InvalidAddress(_))));
    }

    #[test]
    fn test_negative_total_rejected() {
        let mut cmd = command(&[Uuid::new_v4()]);
        cmd.total = Decimal::new(-1, 0);
        assert_eq!(cmd.validate(), Err(OrderError::NegativeTotal));
    }

    #[test]
    fn test_binding_group_with_foreign_file_rejected() {
        let file = Uuid::new_v4();
        let mut cmd = command(&[file]);
        cmd.binding_groups = Some(vec![vec![file, Uuid::new_v4()]]);
        assert!(matches!(cmd.validate(), Err(OrderError::InvalidBindingGroups(_))));
    }

    #[test]
    fn test_binding_group_overlap_rejected() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cmd = command(&[a, b]);
        cmd.binding_groups = Some(vec![vec![a, b], vec![b]]);
        assert!(matches!(cmd.validate(), Err(OrderError::InvalidBindingGroups(_))));
    }

    #[test]
    fn test_empty_binding_group_list_normalizes_to_none() {
        let mut cmd = command(&[Uuid::new_v4()]);
        cmd.binding_groups = Some(vec![]);
        assert_eq!(cmd.validate(), Ok(()));
        assert_eq!(cmd.normalized_binding_groups(), None);
    }

    #[test]
    fn test_blank_gateway_id_rejected() {
        let mut cmd = command(&[Uuid::new_v4()]);
        cmd.razorpay_order_id = Some("  ".to_string());
        assert_eq!(cmd.validate(), Err(OrderError::BlankGatewayOrderId));
    }
}
