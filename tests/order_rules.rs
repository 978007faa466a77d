use std::time::Duration;

use bookstore_order_api::{
    config::GatewayConfig,
    dto::gateway::PayReadyRequest,
    gateway::{GatewayClient, ReadySession},
    models::OrderStatus,
    services::order_service::{FLAT_SHIPPING_FEE, shipping_fee},
};

#[test]
fn happy_path_edges_are_legal() {
    use OrderStatus::*;
    assert!(Requested.can_transition_to(Completed));
    assert!(Completed.can_transition_to(Preparing));
    assert!(Preparing.can_transition_to(Shipping));
    assert!(Shipping.can_transition_to(Delivered));
}

#[test]
fn failure_and_cancel_edges_are_legal() {
    use OrderStatus::*;
    assert!(Requested.can_transition_to(Failed));
    assert!(Completed.can_transition_to(Cancelled));
}

#[test]
fn illegal_edges_are_rejected() {
    use OrderStatus::*;
    // skipping ahead
    assert!(!Requested.can_transition_to(Preparing));
    assert!(!Requested.can_transition_to(Shipping));
    assert!(!Requested.can_transition_to(Delivered));
    // moving backwards
    assert!(!Completed.can_transition_to(Requested));
    assert!(!Shipping.can_transition_to(Preparing));
    // self transitions
    assert!(!Preparing.can_transition_to(Preparing));
    assert!(!Completed.can_transition_to(Completed));
    // cancellation is only reachable from COMPLETED
    assert!(!Requested.can_transition_to(Cancelled));
    assert!(!Preparing.can_transition_to(Cancelled));
}

#[test]
fn terminal_states_have_no_outgoing_edges() {
    use OrderStatus::*;
    for terminal in [Delivered, Failed, Cancelled] {
        assert!(terminal.is_terminal());
        for next in [
            Requested, Completed, Preparing, Shipping, Delivered, Failed, Cancelled,
        ] {
            assert!(
                !terminal.can_transition_to(next),
                "{terminal} -> {next} must be illegal"
            );
        }
    }
}

#[test]
fn status_parses_and_displays_symmetrically() {
    for status in [
        OrderStatus::Requested,
        OrderStatus::Completed,
        OrderStatus::Preparing,
        OrderStatus::Shipping,
        OrderStatus::Delivered,
        OrderStatus::Failed,
        OrderStatus::Cancelled,
    ] {
        let parsed: OrderStatus = status.to_string().parse().expect("roundtrip");
        assert_eq!(parsed, status);
    }

    assert!("SHIPPED".parse::<OrderStatus>().is_err());
    assert!("".parse::<OrderStatus>().is_err());
}

#[test]
fn status_serializes_as_screaming_snake_case() {
    let json = serde_json::to_string(&OrderStatus::Requested).unwrap();
    assert_eq!(json, "\"REQUESTED\"");
}

#[test]
fn shipping_is_free_at_threshold() {
    assert_eq!(shipping_fee(19_999), FLAT_SHIPPING_FEE);
    assert_eq!(shipping_fee(20_000), 0);
    assert_eq!(shipping_fee(21_000), 0);
    assert_eq!(shipping_fee(0), FLAT_SHIPPING_FEE);
}

fn test_client() -> GatewayClient {
    GatewayClient::new(GatewayConfig {
        base_url: "https://gateway.example.com".into(),
        cid: "TC0ONETIME".into(),
        secret_key: "secret".into(),
        public_base_url: "https://shop.example.com/".into(),
        timeout: Duration::from_secs(1),
    })
    .expect("client")
}

#[test]
fn ready_call_carries_callback_urls() {
    let client = test_client();
    let call = client.ready_call(&PayReadyRequest {
        order_id: "O-20260808-0001".into(),
        orderer_name: "reader".into(),
        item_name: "Effective Java and 1 more".into(),
        quantity: 3,
        total_amount: 21_000,
    });

    assert_eq!(call.cid, "TC0ONETIME");
    assert_eq!(call.partner_order_id, "O-20260808-0001");
    assert_eq!(call.partner_user_id, "reader");
    assert_eq!(call.total_amount, 21_000);
    assert_eq!(call.tax_free_amount, 0);
    // trailing slash on the public base must not double up
    assert_eq!(
        call.approval_url,
        "https://shop.example.com/order/payment-success"
    );
    assert_eq!(
        call.cancel_url,
        "https://shop.example.com/order/payment-cancel"
    );
    assert_eq!(call.fail_url, "https://shop.example.com/order/payment-fail");
}

#[test]
fn ready_session_parses_gateway_response() {
    let body = r#"{
        "tid": "T1234567890",
        "next_redirect_pc_url": "https://gateway.example.com/redirect/pc",
        "created_at": "2026-08-08T12:00:00"
    }"#;
    let session: ReadySession = serde_json::from_str(body).expect("parse");
    assert_eq!(session.tid, "T1234567890");
    assert_eq!(
        session.next_redirect_pc_url,
        "https://gateway.example.com/redirect/pc"
    );
}
