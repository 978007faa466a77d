use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    config::GatewayConfig,
    dto::gateway::PayReadyRequest,
    error::{AppError, AppResult},
};

/// Wire format of the gateway's payment-ready request.
#[derive(Debug, Serialize, PartialEq)]
pub struct ReadyCall {
    pub cid: String,
    pub partner_order_id: String,
    pub partner_user_id: String,
    pub item_name: String,
    pub quantity: i32,
    pub total_amount: i64,
    pub tax_free_amount: i64,
    pub approval_url: String,
    pub cancel_url: String,
    pub fail_url: String,
}

/// Subset of the gateway's ready response the client needs: the transaction
/// token and the URL the customer must be redirected to.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadySession {
    pub tid: String,
    pub next_redirect_pc_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Build the outbound ready request. The three callback URLs are derived
    /// from the configured public base URL; the gateway redirects the
    /// customer there after the hosted payment page resolves.
    pub fn ready_call(&self, req: &PayReadyRequest) -> ReadyCall {
        let base = self.config.public_base_url.trim_end_matches('/');
        ReadyCall {
            cid: self.config.cid.clone(),
            partner_order_id: req.order_id.clone(),
            partner_user_id: req.orderer_name.clone(),
            item_name: req.item_name.clone(),
            quantity: req.quantity,
            total_amount: req.total_amount,
            tax_free_amount: 0,
            approval_url: format!("{base}/order/payment-success"),
            cancel_url: format!("{base}/order/payment-cancel"),
            fail_url: format!("{base}/order/payment-fail"),
        }
    }

    /// Request a payment session from the gateway. Timeouts and transport
    /// failures surface as a gateway error, which callers must treat as a
    /// failed attempt rather than success.
    pub async fn ready(&self, req: &PayReadyRequest) -> AppResult<ReadySession> {
        let url = format!(
            "{}/online/v1/payment/ready",
            self.config.base_url.trim_end_matches('/')
        );
        let call = self.ready_call(req);

        let response = self
            .http
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("SECRET_KEY {}", self.config.secret_key),
            )
            .json(&call)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    AppError::Gateway("ready request timed out".to_string())
                } else {
                    AppError::Gateway(format!("ready request failed: {err}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(AppError::Gateway(format!(
                "ready request rejected with status {}",
                response.status()
            )));
        }

        response
            .json::<ReadySession>()
            .await
            .map_err(|err| AppError::Gateway(format!("malformed ready response: {err}")))
    }
}
