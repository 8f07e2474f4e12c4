// ============================================================================
// Outbound Partner Clients
// ============================================================================
//
// - carrier:    courier contract used by the shipment service
// - shiprocket: REST implementation of the carrier contract
// - razorpay:   payment gateway order creation
//
// Every client puts a timeout on each request and checks the response body
// for an explicit success flag before trusting it.
//
// ============================================================================

pub mod carrier;
pub mod razorpay;
pub mod shiprocket;

pub use carrier::{CarrierClient, CarrierError};
pub use razorpay::{GatewayError, GatewayOrder, PaymentGateway, RazorpayClient};
pub use shiprocket::ShiprocketClient;
