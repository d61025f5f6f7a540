mod support;

use std::net::Ipv4Addr;

use hcloud_deploy::Cloudflare;
use hcloud_deploy::dns::{DnsProvider, record_label, zone_candidates};
use hcloud_deploy::error::DeployError;
use support::FakeRunner;

const ZONE: &str = r#"{"success": true, "result": [{"id": "zone-1", "name": "example.com"}]}"#;
const NO_RECORDS: &str = r#"{"success": true, "result": []}"#;
const ONE_RECORD: &str = r#"{"success": true, "result": [{"id": "rec-9", "type": "A"}]}"#;
const OK: &str = r#"{"success": true, "result": {}}"#;

#[test]
fn candidates_most_specific_first() {
    assert_eq!(
        zone_candidates("a.b.example.com"),
        ["a.b.example.com", "b.example.com", "example.com"]
    );
}

#[test]
fn candidates_of_apex() {
    assert_eq!(zone_candidates("example.com."), ["example.com"]);
    assert!(zone_candidates("localhost").is_empty());
}

#[test]
fn label_relative_to_zone() {
    assert_eq!(record_label("shop.example.co.uk", "example.co.uk"), "shop");
    assert_eq!(record_label("a.b.example.com", "example.com"), "a.b");
    assert_eq!(record_label("example.com", "example.com"), "@");
}

fn upsert(runner: &FakeRunner) -> Result<(), DeployError> {
    upsert_domain(runner, "shop.example.com")
}

fn upsert_domain(runner: &FakeRunner, domain: &str) -> Result<(), DeployError> {
    temp_env::with_var("CF_API_TOKEN", Some("cf-token"), || {
        Cloudflare::new(runner, domain).upsert_a_record(Ipv4Addr::new(203, 0, 113, 7))
    })
}

#[test]
fn creates_missing_record() {
    let runner = FakeRunner::new()
        .respond("/zones?name=shop.example.com", NO_RECORDS)
        .respond("/zones?name=example.com", ZONE)
        .respond("dns_records?type=A", NO_RECORDS)
        .respond("-X POST", OK);

    upsert(&runner).unwrap();

    assert_eq!(runner.count("-X POST"), 1);
    assert_eq!(runner.count("-X PUT"), 0);
    let post = runner.calls().into_iter().find(|c| c.line().contains("-X POST")).unwrap();
    assert!(post.line().contains("/zones/zone-1/dns_records"));
    assert!(post.line().contains(r#""content":"203.0.113.7""#));
}

#[test]
fn updates_existing_record() {
    let runner = FakeRunner::new()
        .respond("/zones?name=shop.example.com", NO_RECORDS)
        .respond("/zones?name=example.com", ZONE)
        .respond("dns_records?type=A", ONE_RECORD)
        .respond("-X PUT", OK);

    upsert(&runner).unwrap();

    assert_eq!(runner.count("-X PUT"), 1);
    assert_eq!(runner.count("/zones/zone-1/dns_records/rec-9"), 1);
    assert_eq!(runner.count("-X POST"), 0);
}

#[test]
fn token_travels_on_stdin() {
    let runner = FakeRunner::new()
        .respond("/zones?name=shop.example.com", NO_RECORDS)
        .respond("/zones?name=example.com", ZONE)
        .respond("dns_records?type=A", NO_RECORDS)
        .respond("-X POST", OK);

    upsert(&runner).unwrap();

    for call in runner.calls() {
        assert!(!call.line().contains("cf-token"));
        let stdin = String::from_utf8(call.stdin.unwrap()).unwrap();
        assert_eq!(stdin, "Authorization: Bearer cf-token\n");
    }
}

#[test]
fn zone_under_multi_label_suffix() {
    let runner = FakeRunner::new()
        .respond("/zones?name=shop.example.co.uk", NO_RECORDS)
        .respond("/zones?name=example.co.uk", ZONE)
        .respond("dns_records?type=A", NO_RECORDS)
        .respond("-X POST", OK);

    upsert_domain(&runner, "shop.example.co.uk").unwrap();

    assert_eq!(runner.count("/zones?name="), 2);
    assert_eq!(runner.count("/zones?name=co.uk"), 0);
    assert_eq!(runner.count("/zones/zone-1/dns_records"), 2);
}

#[test]
fn delegated_subzone_wins() {
    let runner = FakeRunner::new()
        .respond("/zones?name=shop.example.com", ZONE)
        .respond("dns_records?type=A", NO_RECORDS)
        .respond("-X POST", OK);

    upsert(&runner).unwrap();

    assert_eq!(runner.count("/zones?name="), 1);
}

#[test]
fn unknown_zone() {
    let runner = FakeRunner::new().respond("/zones?name=", NO_RECORDS);

    let err = upsert(&runner).unwrap_err();

    assert!(matches!(err, DeployError::DnsError(_)));
}

#[test]
fn api_failure_is_reported() {
    let runner = FakeRunner::new().respond(
        "/zones?name=",
        r#"{"success": false, "errors": [{"code": 9109, "message": "Invalid access token"}]}"#,
    );

    let err = upsert(&runner).unwrap_err();

    assert!(err.to_string().contains("Invalid access token"));
}

#[test]
fn token_required() {
    let runner = FakeRunner::new();
    let err = temp_env::with_var_unset("CF_API_TOKEN", || {
        Cloudflare::new(&runner, "shop.example.com").upsert_a_record(Ipv4Addr::LOCALHOST)
    })
    .unwrap_err();

    assert!(matches!(err, DeployError::EnvMissing(_)));
    assert!(runner.calls().is_empty());
}
