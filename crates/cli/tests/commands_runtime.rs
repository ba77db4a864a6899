use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use partsdesk_cli::commands::inventory::InventoryQuery;
use partsdesk_cli::commands::queue::QueueQuery;
use partsdesk_cli::commands::requests::RequestsQuery;
use partsdesk_cli::commands::{
    config, dashboard, decide, history, inventory, queue, report, requests,
};
use partsdesk_core::config::LoadOptions;
use partsdesk_core::query::{SortDirection, SortField};
use partsdesk_core::{Decision, PortalConfig, PortalSnapshot, Priority, RequestStatus, UserId};
use partsdesk_gateway::{GatewayError, InMemoryGateway};
use serde_json::{json, Value};
use tempfile::TempDir;

fn snapshot() -> PortalSnapshot {
    serde_json::from_value(json!({
        "users": [
            {"id": 1, "username": "col_sharma", "email": "sharma@depot.example", "role": "ADMIN",
             "firstName": "Arjun", "lastName": "Sharma"},
            {"id": 2, "username": "maj_rao", "email": "rao@depot.example", "role": "manager"},
            {"id": 3, "username": "sgt_lee", "email": "lee@depot.example", "role": "USER"}
        ],
        "workshops": [
            {"id": 1, "name": "Base Workshop Alpha", "location": "North", "status": "Active"},
            {"id": 2, "name": "Forward Repair Bravo", "location": "East"}
        ],
        "part_requests": [
            {"id": 1, "partName": "Hydraulic Pump", "partNumber": "HP-220", "quantity": 2,
             "priority": "HIGH", "status": "PENDING", "workshopId": 1, "userId": 3,
             "requestDate": "2026-04-01T08:00:00Z", "requiredDate": "2031-01-01",
             "estimatedCost": "1250.50"},
            {"id": 2, "partName": "Track Link", "partNumber": "TL-9", "quantity": 8,
             "priority": "LOW", "status": "APPROVED", "workshopId": 1, "userId": 3,
             "requestDate": "2026-03-01T08:00:00Z", "estimatedCost": "80.00"},
            {"id": 3, "partName": "Fuel Filter", "partNumber": "FF-12", "quantity": 20,
             "priority": "CRITICAL", "status": "PENDING", "workshopId": 2, "userId": 3,
             "requestDate": "2026-04-03T08:00:00Z", "requiredDate": "2031-02-01"},
            {"id": 4, "partName": "Hydraulic Pump", "partNumber": "HP-220", "quantity": 1,
             "priority": "MEDIUM", "status": "REJECTED", "workshopId": 2, "userId": 3,
             "requestDate": "2026-02-01T08:00:00Z"}
        ],
        "approvals": [
            {"id": 10, "partRequestId": 2, "approverId": 2, "approverName": "maj_rao",
             "status": "APPROVED", "approvalDate": "2026-03-02T10:00:00Z"},
            {"id": 11, "partRequestId": 4, "approverId": 1, "approverName": "Arjun Sharma",
             "status": "REJECTED", "comments": "duplicate of #1",
             "approvalDate": "2026-02-03T10:00:00Z"}
        ],
        "roles": [{"id": 1, "name": "Admin"}]
    }))
    .expect("fixture snapshot")
}

fn gateway() -> InMemoryGateway {
    InMemoryGateway::new(snapshot())
}

fn config_as(user: i64) -> PortalConfig {
    let mut config = PortalConfig::default();
    config.gateway.acting_user_id = UserId(user);
    config
}

fn ids(rows: &Value) -> Vec<i64> {
    rows.as_array()
        .map(|rows| rows.iter().filter_map(|row| row["id"].as_i64()).collect())
        .unwrap_or_default()
}

#[test]
fn dashboard_counts_requests_workshops_and_users() {
    let result = dashboard::run(gateway(), &config_as(2));
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "dashboard");
    assert_eq!(payload["status"], "ok");
    let stats = &payload["data"]["stats"];
    assert_eq!(stats["total_requests"], 4);
    assert_eq!(stats["pending_approvals"], 2);
    assert_eq!(stats["approved_requests"], 1);
    assert_eq!(stats["rejected_requests"], 1);
    assert_eq!(stats["critical_requests"], 1);
    assert_eq!(stats["total_workshops"], 2);
    assert_eq!(stats["active_workshops"], 1);
    assert_eq!(stats["total_users"], 3);
    assert_eq!(ids(&payload["data"]["recent_requests"]), vec![3, 1, 2, 4]);
    assert_eq!(ids(&payload["data"]["recent_approvals"]), vec![10, 11]);
}

#[test]
fn requests_filter_and_sort() {
    let query = RequestsQuery {
        search: Some("hydraulic".to_string()),
        sort: Some(SortField::Quantity),
        ..RequestsQuery::default()
    };
    let result = requests::run(gateway(), &config_as(3), query);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(ids(&payload["data"]), vec![4, 1]);
    assert_eq!(payload["data"][1]["workshop_name"], "Base Workshop Alpha");

    let query = RequestsQuery {
        status: Some(RequestStatus::Pending),
        sort: Some(SortField::Id),
        direction: Some(SortDirection::Desc),
        ..RequestsQuery::default()
    };
    let payload = parse_payload(&requests::run(gateway(), &config_as(3), query).output);
    assert_eq!(ids(&payload["data"]), vec![3, 1]);
}

#[test]
fn queue_lists_pending_requests_for_managers() {
    let query = QueueQuery { sort: Some(SortField::Priority), ..QueueQuery::default() };
    let result = queue::run(gateway(), &config_as(2), query);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(ids(&payload["data"]["entries"]), vec![3, 1]);
    assert_eq!(payload["data"]["critical_count"], 1);
    assert_eq!(payload["data"]["urgent_count"], 0);

    let query = QueueQuery {
        sort: Some(SortField::Priority),
        toggle: true,
        priority: Some(Priority::High),
    };
    let payload = parse_payload(&queue::run(gateway(), &config_as(1), query).output);
    assert_eq!(ids(&payload["data"]["entries"]), vec![1]);
}

#[test]
fn queue_is_forbidden_for_plain_users() {
    let result = queue::run(gateway(), &config_as(3), QueueQuery::default());
    assert_eq!(result.exit_code, 5);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "permission");
    assert!(payload["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[test]
fn decide_approves_and_reports_audit_trail() {
    let gateway = gateway();
    let result = decide::run(gateway.clone(), &config_as(2), 1, Decision::Approved, None);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["approval"]["partRequestId"], 1);
    assert_eq!(payload["data"]["approval"]["status"], "APPROVED");
    let audit = payload["data"]["audit"].as_array().cloned().unwrap_or_default();
    assert!(audit.iter().any(|event| event["event_type"] == "approval.decision_applied"));

    let data = block_on(gateway.data());
    let request = data.part_requests.iter().find(|request| request.id.0 == 1).expect("request");
    assert_eq!(request.status, RequestStatus::Approved);
}

#[test]
fn decide_rejection_without_comments_never_reaches_backend() {
    let gateway = gateway();
    let comments = Some("  ".to_string());
    let result = decide::run(gateway.clone(), &config_as(2), 3, Decision::Rejected, comments);
    assert_eq!(result.exit_code, 5);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "validation");
    let data = block_on(gateway.data());
    assert!(data.approvals.iter().all(|approval| approval.part_request_id.0 != 3));
}

#[test]
fn decide_on_decided_request_is_a_conflict() {
    let result = decide::run(gateway(), &config_as(1), 2, Decision::Rejected, Some("late".into()));
    assert_eq!(result.exit_code, 5);
    assert_eq!(parse_payload(&result.output)["error_class"], "conflict");
}

#[test]
fn history_reports_cached_decisions_and_missing_records() {
    let payload = parse_payload(&history::run(gateway(), &config_as(2), 4).output);
    assert_eq!(payload["data"]["state"], "decided");
    assert_eq!(payload["data"]["approval"]["comments"], "duplicate of #1");

    let payload = parse_payload(&history::run(gateway(), &config_as(2), 1).output);
    assert_eq!(payload["data"]["state"], "pending");

    let mut orphaned = snapshot();
    orphaned.approvals.retain(|approval| approval.part_request_id.0 != 2);
    let result = history::run(InMemoryGateway::new(orphaned), &config_as(2), 2);
    assert_eq!(result.exit_code, 0, "{}", result.output);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["state"], "missing_record");
    assert!(payload["message"].as_str().unwrap_or_default().contains("no approval record"));
}

#[test]
fn backend_failures_exit_with_network_code() {
    let gateway = gateway();
    block_on(gateway.fail_next(GatewayError::Transport("connection refused".to_string())));

    let result = report::run(gateway, &config_as(1));
    assert_eq!(result.exit_code, 4);
    assert_eq!(parse_payload(&result.output)["error_class"], "network");
}

#[test]
fn unknown_acting_user_is_a_config_failure() {
    let result = dashboard::run(gateway(), &config_as(99));
    assert_eq!(result.exit_code, 2);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "config_validation");
    assert!(payload["message"].as_str().unwrap_or_default().contains("99"));
}

#[test]
fn report_summarizes_approval_rate_and_top_parts() {
    let result = report::run(gateway(), &config_as(2));
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["total_requests"], 4);
    assert_eq!(payload["data"]["top_parts"][0]["key"], "Hydraulic Pump");
    assert_eq!(payload["data"]["top_parts"][0]["total"], 2);
    assert!(payload["message"].as_str().unwrap_or_default().starts_with("approval rate 25"));
}

#[test]
fn inventory_reads_exported_stock_file() {
    let temp = TempDir::new().expect("tempdir");
    let file = temp.path().join("stock.json");
    fs::write(
        &file,
        json!([
            {"id": 1, "partName": "Hydraulic Seal", "partNumber": "HS-1", "category": "hydraulics",
             "currentStock": 2, "minimumStock": 5, "maximumStock": 50, "unitCost": "4.00"},
            {"id": 2, "partName": "Brake Pad", "partNumber": "BP-7", "category": "brakes",
             "currentStock": 10, "minimumStock": 5, "maximumStock": 50, "unitCost": "12.50"},
            {"id": 3, "partName": "Hydraulic Hose", "partNumber": "HH-3", "category": "hydraulics",
             "currentStock": 30, "minimumStock": 5, "maximumStock": 50, "unitCost": "9.00"}
        ])
        .to_string(),
    )
    .expect("write stock file");

    let query = InventoryQuery {
        file,
        category: Some("hydraulics".to_string()),
        ..InventoryQuery::default()
    };
    let result = inventory::run(&PortalConfig::default(), query);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    let summary = &payload["data"]["summary"];
    assert_eq!(summary["total_items"], 3);
    assert_eq!(summary["needs_restock"], 2);
    assert_eq!(summary["critical"], 1);
    assert_eq!(payload["data"]["categories"], json!(["hydraulics", "brakes"]));
    assert_eq!(ids(&payload["data"]["items"]), vec![1, 3]);
    assert_eq!(payload["data"]["items"][0]["stock_status"], "critical");
}

#[test]
fn inventory_reports_unreadable_files() {
    let temp = TempDir::new().expect("tempdir");
    let missing =
        InventoryQuery { file: temp.path().join("absent.json"), ..InventoryQuery::default() };
    let result = inventory::run(&PortalConfig::default(), missing);
    assert_eq!(result.exit_code, 6);
    assert_eq!(parse_payload(&result.output)["error_class"], "input_file");

    let garbled = temp.path().join("garbled.json");
    fs::write(&garbled, "{ not json").expect("write");
    let garbled = InventoryQuery { file: garbled, ..InventoryQuery::default() };
    let result = inventory::run(&PortalConfig::default(), garbled);
    assert_eq!(result.exit_code, 6);
}

#[test]
fn config_attributes_sources() {
    let temp = TempDir::new().expect("tempdir");
    let path = temp.path().join("partsdesk.toml");
    fs::write(&path, "[gateway]\ntimeout_secs = 30\n").expect("write config");

    with_env(&[("PARTSDESK_LOG_LEVEL", "debug")], || {
        let options = LoadOptions { config_path: Some(path.clone()), ..LoadOptions::default() };
        let result = config::run(options);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("- gateway.timeout_secs = 30 (source: file ("));
        assert!(message.contains("- logging.level = debug (source: env (PARTSDESK_LOG_LEVEL))"));
        assert!(
            message.contains("- gateway.base_url = http://localhost:8080/api (source: default)")
        );
        assert_eq!(payload["data"]["gateway"]["timeout_secs"], 30);
    });
}

#[test]
fn config_rejects_invalid_env() {
    with_env(&[("PARTSDESK_GATEWAY_TIMEOUT_SECS", "soon")], || {
        let result = config::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(future)
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PARTSDESK_GATEWAY_BASE_URL",
        "PARTSDESK_GATEWAY_TIMEOUT_SECS",
        "PARTSDESK_ACTING_USER_ID",
        "PARTSDESK_LOGGING_LEVEL",
        "PARTSDESK_LOG_LEVEL",
        "PARTSDESK_LOGGING_FORMAT",
        "PARTSDESK_LOG_FORMAT",
        "PARTSDESK_STOCK_LOW_RATIO",
        "PARTSDESK_STOCK_HIGH_RATIO",
    ];

    let previous: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();
    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
