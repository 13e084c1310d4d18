//! Playwright browser session
//!
//! A single Node process hosts the browser for the lifetime of a scenario.
//! Requests and responses are exchanged as JSON lines over the child's
//! stdin/stdout; each request carries an id that its response echoes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::Page;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// URL of the application under test; relative navigations resolve against it
    pub base_url: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub browser: Browser,
    pub headless: bool,

    /// `NODE_PATH` for resolving the `playwright` package
    pub node_path: Option<PathBuf>,

    /// Extra time allowed for the driver to answer beyond the action timeout
    pub response_grace_ms: u64,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            viewport_width: 1280,
            viewport_height: 720,
            browser: Browser::Chromium,
            headless: true,
            node_path: None,
            response_grace_ms: 5_000,
        }
    }
}

const DRIVER_SCRIPT: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

(async () => {
  const [browserName, headless, width, height] = process.argv.slice(2);
  const browser = await playwright[browserName].launch({ headless: headless === 'true' });
  const context = await browser.newContext({
    viewport: { width: Number(width), height: Number(height) }
  });
  const page = await context.newPage();
  const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
  const first = (selector) => page.locator(selector).first();

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let req;
    try { req = JSON.parse(line); } catch (e) { continue; }
    const { id, op, selector, value } = req;
    const timeout = req.timeout_ms;
    try {
      let result = null;
      switch (op) {
        case 'goto': await page.goto(value, { timeout }); break;
        case 'click': await first(selector).click({ timeout }); break;
        case 'fill': await first(selector).fill(value, { timeout }); break;
        case 'select_option': await page.selectOption(selector, { label: value }, { timeout }); break;
        case 'inner_text': result = await first(selector).innerText({ timeout }); break;
        case 'all_texts': result = await page.locator(selector).allTextContents(); break;
        case 'count': result = await page.locator(selector).count(); break;
        case 'is_visible': result = await first(selector).isVisible(); break;
        case 'wait_visible': await first(selector).waitFor({ state: 'visible', timeout }); break;
        case 'network_idle': await page.waitForLoadState('networkidle', { timeout }); break;
        case 'close':
          await browser.close();
          reply({ id, ok: true, value: null });
          process.exit(0);
        default: throw new Error(`unknown op ${op}`);
      }
      reply({ id, ok: true, value: result });
    } catch (error) {
      reply({ id, ok: false, error: error.message });
    }
  }
  await browser.close();
})().catch((error) => {
  process.stderr.write(String((error && error.stack) || error) + '\n');
  process.exit(1);
});
"#;

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    op: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a str>,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct DriverResponse {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Live browser page backed by the Node driver
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    base_url: String,
    grace: Duration,
    _script_dir: TempDir,
}

impl PlaywrightSession {
    /// Check if Playwright is installed
    pub fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Launch the driver and open one page
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let mut command = TokioCommand::new("node");
        command
            .arg(&script_path)
            .arg(config.browser.as_str())
            .arg(config.headless.to_string())
            .arg(config.viewport_width.to_string())
            .arg(config.viewport_height.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(node_path) = &config.node_path {
            command.env("NODE_PATH", node_path);
        }

        let mut child = command.spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("driver stdout unavailable".to_string()))?;

        info!(
            "Launched {} ({}) for {}",
            config.browser.as_str(),
            if config.headless { "headless" } else { "headed" },
            config.base_url
        );

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            grace: Duration::from_millis(config.response_grace_ms),
            _script_dir: script_dir,
        })
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    async fn request(
        &mut self,
        op: &str,
        selector: Option<&str>,
        value: Option<&str>,
        timeout: Duration,
    ) -> E2eResult<serde_json::Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = DriverRequest {
            id,
            op,
            selector,
            value,
            timeout_ms: timeout.as_millis() as u64,
        };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        debug!("-> {}", line.trim_end());

        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let deadline = timeout + self.grace;
        let what = format!("{} {}", op, selector.unwrap_or_default());

        loop {
            let next = tokio::time::timeout(deadline, self.stdout.next_line())
                .await
                .map_err(|_| E2eError::Timeout(what.clone()))??;
            let Some(line) = next else {
                return Err(E2eError::Playwright("driver exited".to_string()));
            };

            let response: DriverResponse = match serde_json::from_str(&line) {
                Ok(response) => response,
                Err(_) => {
                    debug!("driver: {}", line);
                    continue;
                }
            };
            if response.id != id {
                warn!("Discarding stale driver response {}", response.id);
                continue;
            }

            return if response.ok {
                Ok(response.value)
            } else {
                Err(E2eError::step(
                    what,
                    response.error.unwrap_or_else(|| "unknown driver error".to_string()),
                ))
            };
        }
    }

    /// Close the browser and wait for the driver to exit
    pub async fn close(mut self) -> E2eResult<()> {
        let grace = self.grace;
        if let Err(e) = self.request("close", None, None, grace).await {
            warn!("Driver did not close cleanly: {}", e);
        }
        let _ = tokio::time::timeout(grace, self.child.wait()).await;
        Ok(())
    }
}

fn as_text(value: serde_json::Value, what: &str) -> E2eResult<String> {
    match value {
        serde_json::Value::String(s) => Ok(s),
        other => Err(E2eError::data_shape(what, format!("expected text, got {}", other))),
    }
}

#[async_trait]
impl Page for PlaywrightSession {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        let url = self.resolve_url(url);
        let timeout = self.grace * 6;
        self.request("goto", None, Some(&url), timeout).await?;
        Ok(())
    }

    async fn click(&mut self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.request("click", Some(selector), None, timeout).await?;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str, timeout: Duration) -> E2eResult<()> {
        self.request("fill", Some(selector), Some(value), timeout).await?;
        Ok(())
    }

    async fn select_option(
        &mut self,
        selector: &str,
        label: &str,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.request("select_option", Some(selector), Some(label), timeout).await?;
        Ok(())
    }

    async fn inner_text(&mut self, selector: &str, timeout: Duration) -> E2eResult<String> {
        let value = self.request("inner_text", Some(selector), None, timeout).await?;
        as_text(value, selector)
    }

    async fn all_texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        let grace = self.grace;
        let value = self.request("all_texts", Some(selector), None, grace).await?;
        serde_json::from_value(value)
            .map_err(|e| E2eError::data_shape(selector, e.to_string()))
    }

    async fn count(&mut self, selector: &str) -> E2eResult<u64> {
        let grace = self.grace;
        let value = self.request("count", Some(selector), None, grace).await?;
        value
            .as_u64()
            .ok_or_else(|| {
                E2eError::data_shape(selector, format!("expected a count, got {}", value))
            })
    }

    async fn is_visible(&mut self, selector: &str) -> E2eResult<bool> {
        let grace = self.grace;
        let value = self.request("is_visible", Some(selector), None, grace).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn wait_visible(&mut self, selector: &str, timeout: Duration) -> E2eResult<()> {
        self.request("wait_visible", Some(selector), None, timeout).await?;
        Ok(())
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> E2eResult<()> {
        self.request("network_idle", None, None, timeout).await?;
        Ok(())
    }
}
