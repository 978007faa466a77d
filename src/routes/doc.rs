use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartLine, CartList},
        gateway::PayReadyRequest,
        orders::{
            CancelOrderRequest, CreateOrderRequest, OrderCreated, OrderLineRequest, OrderList,
            OrderSummary, UpdateOrderStatusRequest,
        },
        payments::{PaymentAttemptRequest, PaymentOrderRequest, PaymentRecorded},
        stock::{StockHistory, StockInboundRequest},
    },
    gateway::ReadySession,
    models::{Book, Order, OrderLine, OrderStatus, Payment, PaymentStatus, StockDirection, StockEntry},
    response::{ApiResponse, Meta},
    routes::{admin, cart, gateway, health, orders, params, payments},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        orders::create_order,
        orders::update_order_status,
        orders::cancel_order,
        orders::cancel_completed_order,
        orders::list_orders,
        orders::get_order,
        payments::payment_attempt,
        payments::payment_complete,
        payments::payment_fail,
        gateway::pay_ready,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::stock_inbound,
        admin::stock_history
    ),
    components(
        schemas(
            Book,
            Order,
            OrderLine,
            OrderStatus,
            Payment,
            PaymentStatus,
            StockDirection,
            StockEntry,
            CreateOrderRequest,
            OrderLineRequest,
            OrderCreated,
            UpdateOrderStatusRequest,
            CancelOrderRequest,
            OrderList,
            OrderSummary,
            PaymentAttemptRequest,
            PaymentOrderRequest,
            PaymentRecorded,
            PayReadyRequest,
            ReadySession,
            StockInboundRequest,
            StockHistory,
            AddToCartRequest,
            CartLine,
            CartList,
            admin::StockHistoryQuery,
            params::Pagination,
            params::OrderListQuery,
            params::AdminOrderQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<OrderSummary>,
            ApiResponse<OrderCreated>,
            ApiResponse<PaymentRecorded>,
            ApiResponse<ReadySession>,
            ApiResponse<StockEntry>,
            ApiResponse<StockHistory>,
            ApiResponse<CartList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Payments", description = "Payment reconciliation endpoints"),
        (name = "Gateway", description = "Payment gateway proxy"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Admin", description = "Admin console endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
