use super::ledger::DepositLedger;
use super::locks::RecordLocks;
use super::settlement::PenaltySettlement;
use crate::config::GatewayConfig;
use crate::domain::money::Money;
use crate::domain::payment::{PaymentOrder, PaymentOrderStatus, PaymentPurpose};
use crate::domain::ports::{ClockRef, PaymentOrderStoreRef, RentalStoreRef};
use crate::error::{Result, SettlementError};
use crate::interfaces::vnpay;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

const SUCCESS_CODE: &str = "00";

/// A payment the customer is about to make through the gateway.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Merchant reference, sent as `vnp_TxnRef`.
    pub order_id: String,
    pub purpose: PaymentPurpose,
    pub amount: Money,
    pub ip_address: String,
    pub order_info: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub order: PaymentOrder,
    pub payment_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// Signature and amount checked, gateway reported success, effects applied.
    Confirmed(PaymentOrder),
    /// Signature and amount checked, gateway reported a failed payment.
    Declined(PaymentOrder),
    /// The order was already final; nothing changed.
    AlreadyProcessed(PaymentOrder),
}

/// Creates gateway orders and turns authenticated callbacks into ledger effects.
pub struct PaymentGateway {
    orders: PaymentOrderStoreRef,
    rentals: RentalStoreRef,
    ledger: Arc<DepositLedger>,
    settlement: Arc<PenaltySettlement>,
    config: GatewayConfig,
    clock: ClockRef,
    locks: RecordLocks<String>,
}

impl PaymentGateway {
    pub fn new(
        orders: PaymentOrderStoreRef,
        rentals: RentalStoreRef,
        ledger: Arc<DepositLedger>,
        settlement: Arc<PenaltySettlement>,
        config: GatewayConfig,
        clock: ClockRef,
    ) -> Self {
        Self {
            orders,
            rentals,
            ledger,
            settlement,
            config,
            clock,
            locks: RecordLocks::new(),
        }
    }

    pub async fn get_order(&self, order_id: &str) -> Result<PaymentOrder> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))
    }

    /// Records an Initiated order and returns the signed payment URL.
    pub async fn initiate(&self, request: PaymentRequest) -> Result<InitiatedPayment> {
        if request.order_id.trim().is_empty() {
            return Err(SettlementError::InvalidInput("order id must not be blank".into()));
        }
        if !request.amount.is_positive() {
            return Err(SettlementError::InvalidAmount(request.amount));
        }
        self.check_purpose(&request).await?;

        let _guard = self.locks.lock(&request.order_id).await;
        if self.orders.get(&request.order_id).await?.is_some() {
            return Err(SettlementError::DuplicateOrder(request.order_id));
        }

        let now = self.clock.now();
        let order_info = request
            .order_info
            .unwrap_or_else(|| default_order_info(&request.purpose));
        let params = payment_params(
            &self.config,
            &request.order_id,
            request.amount,
            &request.ip_address,
            &order_info,
            now,
        )?;
        let payment_url =
            vnpay::build_signed_url(&self.config.base_url, &self.config.hash_secret, &params)?;

        let order = PaymentOrder {
            order_id: request.order_id,
            purpose: request.purpose,
            amount: request.amount,
            ip_address: request.ip_address,
            status: PaymentOrderStatus::Initiated,
            created_at: now,
            completed_at: None,
            gateway_transaction_no: None,
            response_code: None,
            excess_amount: Money::ZERO,
        };
        self.orders.store(order.clone()).await?;
        info!(order = %order.order_id, amount = %order.amount, "payment order initiated");
        Ok(InitiatedPayment { order, payment_url })
    }

    async fn check_purpose(&self, request: &PaymentRequest) -> Result<()> {
        match request.purpose {
            PaymentPurpose::Deposit { rental_id } | PaymentPurpose::RentalCharge { rental_id } => {
                if self.rentals.get(rental_id).await?.is_none() {
                    return Err(SettlementError::RentalNotFound(rental_id));
                }
            }
            PaymentPurpose::Penalty { rental_penalty_id } => {
                let penalty = self.settlement.get(rental_penalty_id).await?;
                let outstanding = penalty.ensure_payable()?;
                if request.amount > outstanding {
                    return Err(SettlementError::OverPayment {
                        outstanding,
                        offered: request.amount,
                    });
                }
            }
        }
        Ok(())
    }

    /// Processes a gateway callback (IPN or return URL parameters).
    ///
    /// Nothing is trusted before the signature checks out, and a valid
    /// signature still needs the reported amount to match the order exactly.
    ///
    /// The ledger effect is keyed by the order id, so a callback whose order
    /// write failed can be delivered again without applying the effect twice.
    /// Money the purpose no longer needs is kept on the order as its excess.
    pub async fn handle_callback(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<CallbackOutcome> {
        if !vnpay::validate_callback(params, &self.config.hash_secret) {
            warn!(txn_ref = ?params.get("vnp_TxnRef"), "callback rejected: bad signature");
            return Err(SettlementError::InvalidSignature);
        }
        let order_id = required(params, "vnp_TxnRef")?;

        let _guard = self.locks.lock(&order_id.to_string()).await;
        let mut order = self.get_order(order_id).await?;
        if order.is_final() {
            info!(order = %order_id, status = ?order.status, "callback for finished order ignored");
            return Ok(CallbackOutcome::AlreadyProcessed(order));
        }

        let reported = parse_gateway_amount(required(params, "vnp_Amount")?)?;
        if reported != order.amount {
            warn!(
                order = %order_id,
                expected = %order.amount,
                %reported,
                "callback rejected: amount mismatch"
            );
            return Err(SettlementError::AmountMismatch {
                expected: order.amount,
                reported,
            });
        }

        let response_code = params.get("vnp_ResponseCode").cloned();
        let succeeded = response_code.as_deref() == Some(SUCCESS_CODE)
            && params
                .get("vnp_TransactionStatus")
                .is_none_or(|status| status == SUCCESS_CODE);

        order.response_code = response_code;
        order.gateway_transaction_no = params.get("vnp_TransactionNo").cloned();
        order.completed_at = Some(self.clock.now());

        if succeeded {
            order.excess_amount = self.apply_purpose(&order).await?;
            order.status = PaymentOrderStatus::Success;
            self.orders.store(order.clone()).await?;
            if order.excess_amount.is_positive() {
                warn!(
                    order = %order_id,
                    excess = %order.excess_amount,
                    "payment exceeded what was owed"
                );
            }
            info!(order = %order_id, amount = %order.amount, "payment confirmed");
            Ok(CallbackOutcome::Confirmed(order))
        } else {
            order.status = PaymentOrderStatus::Failed;
            self.orders.store(order.clone()).await?;
            info!(order = %order_id, code = ?order.response_code, "payment declined");
            Ok(CallbackOutcome::Declined(order))
        }
    }

    /// Applies a captured payment and returns the part nothing needed.
    async fn apply_purpose(&self, order: &PaymentOrder) -> Result<Money> {
        match order.purpose {
            PaymentPurpose::Deposit { rental_id } => {
                let rental = self
                    .rentals
                    .get(rental_id)
                    .await?
                    .ok_or(SettlementError::RentalNotFound(rental_id))?;
                let opened = self
                    .ledger
                    .open_for_order(rental_id, rental.customer, order.amount, &order.order_id)
                    .await;
                match opened {
                    Ok(_) => Ok(Money::ZERO),
                    Err(err @ SettlementError::DuplicateDeposit(_)) => {
                        warn!(
                            order = %order.order_id,
                            error = %err,
                            "deposit already held for rental"
                        );
                        Ok(order.amount)
                    }
                    Err(err) => Err(err),
                }
            }
            PaymentPurpose::Penalty { rental_penalty_id } => {
                self.settlement
                    .settle_from_gateway(rental_penalty_id, order.amount, &order.order_id)
                    .await
            }
            PaymentPurpose::RentalCharge { .. } => Ok(Money::ZERO),
        }
    }
}

/// The gateway's payment-request parameters, before signing.
pub fn payment_params(
    config: &GatewayConfig,
    order_id: &str,
    amount: Money,
    ip_address: &str,
    order_info: &str,
    now: DateTime<Utc>,
) -> Result<BTreeMap<String, String>> {
    let offset = FixedOffset::east_opt(config.utc_offset_hours * 3600).ok_or_else(|| {
        SettlementError::Config(format!("invalid utc offset: {}", config.utc_offset_hours))
    })?;
    let local = now.with_timezone(&offset);
    let expires = local + Duration::minutes(config.expire_minutes);

    Ok([
        ("vnp_Version", config.version.clone()),
        ("vnp_Command", config.command.clone()),
        ("vnp_TmnCode", config.tmn_code.clone()),
        ("vnp_Amount", gateway_amount(amount)),
        ("vnp_CreateDate", local.format("%Y%m%d%H%M%S").to_string()),
        ("vnp_ExpireDate", expires.format("%Y%m%d%H%M%S").to_string()),
        ("vnp_CurrCode", config.currency.clone()),
        ("vnp_IpAddr", ip_address.to_string()),
        ("vnp_Locale", config.locale.clone()),
        ("vnp_OrderInfo", order_info.to_string()),
        ("vnp_OrderType", config.order_type.clone()),
        ("vnp_ReturnUrl", config.return_url.clone()),
        ("vnp_TxnRef", order_id.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect())
}

fn default_order_info(purpose: &PaymentPurpose) -> String {
    match purpose {
        PaymentPurpose::Deposit { rental_id } => format!("Rental deposit {rental_id}"),
        PaymentPurpose::Penalty { rental_penalty_id } => format!("Penalty {rental_penalty_id}"),
        PaymentPurpose::RentalCharge { rental_id } => format!("Rental charge {rental_id}"),
    }
}

fn required<'a>(params: &'a BTreeMap<String, String>, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SettlementError::MalformedCallback(format!("missing {key}")))
}

/// The gateway carries amounts in hundredths, without a decimal point.
pub fn gateway_amount(amount: Money) -> String {
    (amount.value() * Decimal::ONE_HUNDRED).trunc().normalize().to_string()
}

fn parse_gateway_amount(raw: &str) -> Result<Money> {
    let hundredths: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| SettlementError::MalformedCallback(format!("bad vnp_Amount {raw:?}")))?;
    if hundredths.fract() != Decimal::ZERO {
        return Err(SettlementError::MalformedCallback(format!("bad vnp_Amount {raw:?}")));
    }
    Ok(Money::new(hundredths / Decimal::ONE_HUNDRED))
}

/// Response code the gateway expects in reply to an IPN call.
pub fn ipn_response_code(result: &Result<CallbackOutcome>) -> &'static str {
    match result {
        Ok(CallbackOutcome::Confirmed(_)) | Ok(CallbackOutcome::Declined(_)) => "00",
        Ok(CallbackOutcome::AlreadyProcessed(_)) => "02",
        Err(SettlementError::OrderNotFound(_)) => "01",
        Err(SettlementError::AmountMismatch { .. }) => "04",
        Err(SettlementError::InvalidSignature) => "97",
        Err(_) => "99",
    }
}
