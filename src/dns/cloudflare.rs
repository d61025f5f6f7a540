use std::net::Ipv4Addr;

use tracing::debug;

use crate::cmd::Runner;
use crate::dns::{self, DnsProvider};
use crate::error::{DeployError, DeployResult};

const CF_API: &str = "https://api.cloudflare.com/client/v4";

/// Cloudflare DNS provider using the Cloudflare API via curl.
///
/// Requires `CF_API_TOKEN` with `Zone > DNS > Edit` permissions. The
/// token is sent to curl on stdin so it does not show up in the
/// process list.
pub struct Cloudflare<'a> {
    runner: &'a dyn Runner,
    domain: String,
}

impl<'a> Cloudflare<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn Runner, domain: &str) -> Self {
        Self {
            runner,
            domain: domain.to_string(),
        }
    }

    fn token() -> DeployResult<String> {
        std::env::var("CF_API_TOKEN").map_err(|_| {
            DeployError::EnvMissing(
                "CF_API_TOKEN not set. Create a token at: \
                 https://dash.cloudflare.com/profile/api-tokens"
                    .into(),
            )
        })
    }

    fn api_request(
        &self,
        token: &str,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> DeployResult<serde_json::Value> {
        let url = format!("{CF_API}{path}");
        let mut args = vec![
            "-s",
            "-X",
            method,
            "-H",
            "@-",
            "-H",
            "Content-Type: application/json",
        ];
        if let Some(b) = body {
            args.push("-d");
            args.push(b);
        }
        args.push(&url);

        let header = format!("Authorization: Bearer {token}\n");
        let response = self.runner.run_with_stdin("curl", &args, header.as_bytes())?;
        let parsed: serde_json::Value = serde_json::from_str(&response)?;

        if parsed["success"].as_bool() == Some(false) {
            return Err(DeployError::DnsError(format!(
                "{method} {path}: {}",
                parsed["errors"]
            )));
        }
        Ok(parsed)
    }

    /// The most specific zone on the account that hosts the domain.
    fn find_zone(&self, token: &str) -> DeployResult<(String, String)> {
        for zone in dns::zone_candidates(&self.domain) {
            let parsed = self.api_request(token, "GET", &format!("/zones?name={zone}"), None)?;
            if let Some(id) = first_id(&parsed) {
                return Ok((id, zone.to_string()));
            }
            debug!(zone, "not a zone on this account");
        }
        Err(DeployError::DnsError(format!(
            "no Cloudflare zone hosts '{}'",
            self.domain
        )))
    }

    fn find_existing_record(&self, token: &str, zone_id: &str) -> DeployResult<Option<String>> {
        let path = format!("/zones/{zone_id}/dns_records?type=A&name={}", self.domain);
        let parsed = self.api_request(token, "GET", &path, None)?;
        Ok(first_id(&parsed))
    }
}

fn first_id(response: &serde_json::Value) -> Option<String> {
    response["result"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|r| r["id"].as_str())
        .map(String::from)
}

impl DnsProvider for Cloudflare<'_> {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn upsert_a_record(&self, ip: Ipv4Addr) -> DeployResult<()> {
        let token = Self::token()?;
        eprintln!("Cloudflare DNS: {} -> {ip}", self.domain);

        let (zone_id, zone) = self.find_zone(&token)?;
        eprintln!(
            "  Zone: {zone}, record: {}",
            dns::record_label(&self.domain, &zone)
        );
        let existing = self.find_existing_record(&token, &zone_id)?;

        let body = serde_json::json!({
            "type": "A",
            "name": self.domain,
            "content": ip.to_string(),
            "ttl": 300,
            "proxied": false,
        })
        .to_string();

        if let Some(record_id) = existing {
            eprintln!("  Updating existing A record...");
            let path = format!("/zones/{zone_id}/dns_records/{record_id}");
            self.api_request(&token, "PUT", &path, Some(&body))?;
        } else {
            eprintln!("  Creating new A record...");
            let path = format!("/zones/{zone_id}/dns_records");
            self.api_request(&token, "POST", &path, Some(&body))?;
        }

        Ok(())
    }
}
