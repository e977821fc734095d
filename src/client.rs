//! Client for the external ticketing backend, which owns events, ticket
//! types, discount codes, orders and payments.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::{
    DiscountCode, EventCatalog, EventId, OrderId, OrderRequest, OrderResponse, PaymentStatus,
    TicketType,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Ticketing backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{reason}")]
    Rejected { status: u16, reason: String },

    #[error("Invalid ticketing backend URL '{0}'")]
    InvalidBaseUrl(String),
}

#[async_trait]
pub trait TicketingApi: Send + Sync {
    async fn fetch_catalog(&self, event_id: &EventId) -> Result<EventCatalog, ClientError>;

    /// Looks up a discount code for an event. `None` when the code does not exist.
    async fn fetch_discount(
        &self,
        event_id: &EventId,
        code: &str,
    ) -> Result<Option<DiscountCode>, ClientError>;

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderResponse, ClientError>;

    async fn payment_status(&self, order_id: &OrderId) -> Result<PaymentStatus, ClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct PaymentStatusBody {
    status: PaymentStatus,
}

#[derive(Clone)]
pub struct HttpTicketingClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpTicketingClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        let parsed = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(ClientError::InvalidBaseUrl(base_url))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: parsed,
            api_token,
        })
    }

    /// Appends `segments` to the base URL, each percent-encoded as a single path segment.
    ///
    /// `None` when a segment is empty, `.` or `..`: those cannot be sent as a
    /// segment without changing the path.
    fn endpoint(&self, segments: &[&str]) -> Option<Url> {
        if segments
            .iter()
            .any(|segment| matches!(*segment, "" | "." | ".."))
        {
            return None;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(segments);
        Some(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                resource: resource.to_string(),
            });
        }
        Err(Self::rejection(status, response).await)
    }

    async fn rejection(status: StatusCode, response: Response) -> ClientError {
        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message.or(body.error))
            .filter(|reason| !reason.trim().is_empty())
            .unwrap_or_else(|| {
                if text.trim().is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("Request rejected")
                        .to_string()
                } else {
                    text
                }
            });

        tracing::warn!(status = status.as_u16(), %reason, "Ticketing backend rejected request");
        ClientError::Rejected {
            status: status.as_u16(),
            reason,
        }
    }
}

#[async_trait]
impl TicketingApi for HttpTicketingClient {
    async fn fetch_catalog(&self, event_id: &EventId) -> Result<EventCatalog, ClientError> {
        let resource = format!("Event '{event_id}'");
        let url = self
            .endpoint(&["events", event_id.as_str(), "ticket-types"])
            .ok_or_else(|| ClientError::NotFound {
                resource: resource.clone(),
            })?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let ticket_types: Vec<TicketType> = Self::read(response, &resource).await?;

        tracing::debug!(%event_id, count = ticket_types.len(), "Fetched ticket types");
        Ok(EventCatalog::new(event_id.clone(), ticket_types))
    }

    async fn fetch_discount(
        &self,
        event_id: &EventId,
        code: &str,
    ) -> Result<Option<DiscountCode>, ClientError> {
        let code = code.trim();
        let Some(url) = self.endpoint(&["events", event_id.as_str(), "discount-codes", code]) else {
            return Ok(None);
        };
        let response = self.authorize(self.client.get(url)).send().await?;

        match Self::read::<DiscountCode>(response, "Discount code").await {
            Ok(discount) if discount.matches(code) => Ok(Some(discount)),
            Ok(discount) => {
                tracing::warn!(requested = %code, returned = %discount.code, "Backend returned a different discount code");
                Ok(None)
            }
            Err(ClientError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderResponse, ClientError> {
        let url = self.endpoint(&["orders"]).ok_or_else(|| ClientError::NotFound {
            resource: "Order endpoint".to_string(),
        })?;
        let response = self
            .authorize(self.client.post(url).json(request))
            .send()
            .await?;
        let order: OrderResponse = Self::read(response, "Order endpoint").await?;

        tracing::info!(order_id = %order.order_id, event_id = %request.event_id, "Order created");
        Ok(order)
    }

    async fn payment_status(&self, order_id: &OrderId) -> Result<PaymentStatus, ClientError> {
        let resource = format!("Order '{order_id}'");
        let url = self
            .endpoint(&["orders", order_id.as_str(), "payment"])
            .ok_or_else(|| ClientError::NotFound {
                resource: resource.clone(),
            })?;
        let response = self.authorize(self.client.get(url)).send().await?;
        let body: PaymentStatusBody = Self::read(response, &resource).await?;
        Ok(body.status)
    }
}
