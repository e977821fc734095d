use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::checkout::CheckoutError;
use crate::client::ClientError;
use crate::models::{
    CartSelection, CheckoutSummary, Currency, DiscountCode, DiscountRejection, EventId, OrderId,
    OrderRequest, PaymentStatus,
};
use crate::pricing::PricingInputs;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "agora-checkout",
    };

    success(payload, "Health check successful")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub event_id: EventId,
    #[serde(default)]
    pub cart: CartSelection,
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default)]
    pub display_currency: Option<Currency>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryPayload {
    #[serde(flatten)]
    summary: CheckoutSummary,
    applied_discount_code: Option<String>,
}

pub async fn checkout_summary(
    State(state): State<AppState>,
    Json(request): Json<SummaryRequest>,
) -> Result<Response, AppError> {
    let catalog = state.api.fetch_catalog(&request.event_id).await?;

    let (discount, rejection) = match request
        .discount_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
    {
        Some(code) => lookup_discount(&state, &request.event_id, code).await?,
        None => (None, None),
    };

    let inputs = PricingInputs::new(Arc::new(catalog), request.cart)
        .with_discount(discount.clone())
        .with_display_currency(request.display_currency);
    let summary = state.engine.summarize(&inputs).await?;

    tracing::debug!(
        event_id = %request.event_id,
        total = %summary.display_total,
        currency = %summary.display_currency,
        "Checkout summary computed"
    );

    let message = rejection
        .map(|reason| reason.to_string())
        .unwrap_or_else(|| "Checkout summary computed".to_string());
    let payload = SummaryPayload {
        summary,
        applied_discount_code: discount.map(|discount| discount.code),
    };
    Ok(success(payload, message))
}

/// Fetches and checks a discount code. A rejected code is reported, not applied.
async fn lookup_discount(
    state: &AppState,
    event_id: &EventId,
    code: &str,
) -> Result<(Option<DiscountCode>, Option<DiscountRejection>), AppError> {
    let found = state.api.fetch_discount(event_id, code).await?;
    let Some(discount) = found else {
        return Ok((None, Some(DiscountRejection::NotFound)));
    };
    match discount.check(Utc::now()) {
        Ok(()) => Ok((Some(discount), None)),
        Err(reason) => {
            tracing::info!(%event_id, code = %discount.code, %reason, "Discount code not applied");
            Ok((None, Some(reason)))
        }
    }
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<Response, AppError> {
    let cart = request.cart();
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart.into());
    }

    let catalog = state.api.fetch_catalog(&request.event_id).await?;
    for (id, quantity) in cart.lines() {
        let ticket_type = catalog
            .find(id)
            .ok_or_else(|| CheckoutError::UnknownTicketType(id.clone()))?;
        CartSelection::ensure_available(ticket_type, quantity).map_err(CheckoutError::from)?;
    }

    let normalized = OrderRequest::from_cart(
        request.event_id.clone(),
        &cart,
        request
            .discount_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string),
        request.payment_method_id.clone(),
    );

    let order = state
        .api
        .create_order(&normalized)
        .await
        .map_err(|e| match e {
            ClientError::Rejected { reason, .. } => AppError::OrderRejected(reason),
            other => other.into(),
        })?;

    Ok(created(order, "Order created"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentStatusPayload {
    order_id: OrderId,
    status: PaymentStatus,
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<Response, AppError> {
    let order_id = OrderId::new(order_id);
    let status = state.api.payment_status(&order_id).await?;

    Ok(success(
        PaymentStatusPayload { order_id, status },
        "Payment status retrieved",
    ))
}
