use std::net::Ipv4Addr;

/// Print a step header on stderr.
pub fn step(message: &str) {
    eprintln!();
    eprintln!("==> {message}");
}

/// Where the deployed application can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub app_url: String,
    pub dashboard_url: String,
    pub domain_url: Option<String>,
}

impl Summary {
    #[must_use]
    pub fn new(ip: Ipv4Addr, dashboard_port: u16, domain: &str) -> Self {
        Self {
            app_url: format!("http://{ip}"),
            dashboard_url: format!("http://{ip}:{dashboard_port}"),
            domain_url: (!domain.is_empty()).then(|| format!("http://{domain}")),
        }
    }

    /// Human-readable lines for the final report.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Deployment completed successfully!".to_string(),
            format!("Application should be available at: {}", self.app_url),
        ];
        if let Some(url) = &self.domain_url {
            lines.push(format!("Domain: {url}"));
        }
        lines.push(format!("Dashboard is available at: {}", self.dashboard_url));
        lines
    }
}

/// Print the final summary on stdout.
pub fn finished(summary: &Summary) {
    println!();
    for line in summary.lines() {
        println!("{line}");
    }
}
