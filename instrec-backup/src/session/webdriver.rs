//! W3C WebDriver client
//!
//! Talks JSON over HTTP to a running driver (chromedriver, geckodriver, a
//! Selenium grid). Every response is wrapped in `{"value": ...}`; errors carry
//! `{"value": {"error": ..., "message": ...}}` with a non-2xx status.

use reqwest::Method;
use serde_json::{json, Value};
use std::time::Duration;

use super::{DriverError, DriverResult, ElementHandle, NavigableSession, Selector};
use crate::utils::poll::{poll_for, wait_until, DEFAULT_POLL_INTERVAL};

/// W3C element reference key
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const USER_AGENT: &str = concat!("instrec-backup/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the driver endpoint
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Driver base URL, e.g. `http://localhost:9515`
    pub server_url: String,
    /// Launch the browser without a window
    pub headless: bool,
    /// Interval for element presence polls
    pub poll_interval: Duration,
    /// Per-command HTTP timeout
    pub request_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9515".to_string(),
            headless: true,
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// A live WebDriver session
pub struct WebDriverSession {
    http: reqwest::Client,
    session_url: String,
    session_id: String,
    poll_interval: Duration,
}

impl WebDriverSession {
    /// Create a new browser session on the driver
    pub async fn connect(config: &WebDriverConfig) -> DriverResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DriverError::Network(e.to_string()))?;

        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--window-size=1920,1080".to_string(),
        ];
        if config.headless {
            args.push("--headless=new".to_string());
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let server = config.server_url.trim_end_matches('/');
        let value = send(&http, Method::POST, &format!("{}/session", server), Some(body)).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| DriverError::Parse("new session response without sessionId".into()))?
            .to_string();

        tracing::info!(session_id = %session_id, driver = %server, "WebDriver session created");

        Ok(Self {
            http,
            session_url: format!("{}/session/{}", server, session_id),
            session_id,
            poll_interval: config.poll_interval,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Delete the session, closing the browser
    pub async fn quit(self) -> DriverResult<()> {
        send(&self.http, Method::DELETE, &self.session_url, None).await?;
        tracing::info!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DriverResult<Value> {
        let url = format!("{}{}", self.session_url, path);
        send(&self.http, method, &url, body).await
    }

    async fn find_first(&self, selector: &Selector) -> DriverResult<ElementHandle> {
        let value = self
            .command(Method::POST, "/element", Some(locator(selector)))
            .await?;
        element_from_value(&value)
    }
}

#[async_trait::async_trait]
impl NavigableSession for WebDriverSession {
    async fn navigate_to(&self, url: &str) -> DriverResult<()> {
        tracing::debug!(url = %url, "Navigating");
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find_elements(&self, selector: &Selector) -> DriverResult<Vec<ElementHandle>> {
        let value = self
            .command(Method::POST, "/elements", Some(locator(selector)))
            .await?;

        value
            .as_array()
            .ok_or_else(|| DriverError::Parse("find elements response is not an array".into()))?
            .iter()
            .map(element_from_value)
            .collect()
    }

    async fn element_exists(&self, selector: &Selector, timeout: Duration) -> bool {
        wait_until(timeout, self.poll_interval, || async move {
            matches!(self.find_elements(selector).await, Ok(found) if !found.is_empty())
        })
        .await
    }

    async fn get_attribute(&self, selector: &Selector, name: &str) -> DriverResult<Option<String>> {
        let found = self.find_elements(selector).await?;
        match found.first() {
            Some(element) => self.element_attribute(element, name).await,
            None => Ok(None),
        }
    }

    async fn get_text(&self, selector: &Selector, timeout: Duration) -> DriverResult<Option<String>> {
        let element = poll_for(timeout, self.poll_interval, || async move {
            self.find_elements(selector)
                .await
                .ok()
                .and_then(|found| found.into_iter().next())
        })
        .await;

        match element {
            Some(element) => Ok(Some(self.element_text(&element).await?)),
            None => Ok(None),
        }
    }

    async fn input_text(&self, selector: &Selector, value: &str) -> DriverResult<()> {
        let element = self.find_first(selector).await?;
        self.command(Method::POST, &format!("/element/{}/clear", element.0), Some(json!({})))
            .await?;
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": value })),
        )
        .await?;
        Ok(())
    }

    async fn click_element(&self, selector: &Selector) -> DriverResult<()> {
        // Script click: the portal overlays some controls, which breaks native clicks
        let element = self.find_first(selector).await?;
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({
                "script": "arguments[0].click();",
                "args": [{ ELEMENT_KEY: element.0 }]
            })),
        )
        .await?;
        Ok(())
    }

    async fn select_option(&self, selector: &Selector, label: &str) -> DriverResult<()> {
        let select = self.find_first(selector).await?;
        let option_xpath = format!(".//option[normalize-space(.)={}]", xpath_literal(label));
        let value = self
            .command(
                Method::POST,
                &format!("/element/{}/element", select.0),
                Some(json!({ "using": "xpath", "value": option_xpath })),
            )
            .await?;
        let option = element_from_value(&value)?;

        self.command(Method::POST, &format!("/element/{}/click", option.0), Some(json!({})))
            .await?;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DriverError::Parse("current url is not a string".into()))
    }

    async fn element_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> DriverResult<Option<String>> {
        // Properties resolve relative hrefs; plain attributes are the fallback
        let property = self
            .command(Method::GET, &format!("/element/{}/property/{}", element.0, name), None)
            .await?;
        if let Some(value) = scalar_to_string(&property) {
            return Ok(Some(value));
        }

        let attribute = self
            .command(Method::GET, &format!("/element/{}/attribute/{}", element.0, name), None)
            .await?;
        Ok(scalar_to_string(&attribute))
    }

    async fn element_text(&self, element: &ElementHandle) -> DriverResult<String> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

/// Send one WebDriver command and unwrap the `value` envelope
async fn send(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> DriverResult<Value> {
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let response = request
        .send()
        .await
        .map_err(|e| DriverError::Network(e.to_string()))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .await
        .map_err(|e| DriverError::Parse(e.to_string()))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(value);
    }

    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Err(match error.as_str() {
        "no such element" => DriverError::NoSuchElement(message),
        "stale element reference" => DriverError::StaleElement(message),
        _ => DriverError::Protocol(error, message),
    })
}

fn locator(selector: &Selector) -> Value {
    match selector {
        Selector::Id(id) => json!({
            "using": "css selector",
            "value": format!("[id=\"{}\"]", id.replace('"', "\\\"")),
        }),
        Selector::XPath(xpath) => json!({ "using": "xpath", "value": xpath }),
        Selector::Css(css) => json!({ "using": "css selector", "value": css }),
    }
}

fn element_from_value(value: &Value) -> DriverResult<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| ElementHandle(id.to_string()))
        .ok_or_else(|| DriverError::Parse(format!("not an element reference: {}", value)))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Quote `text` as an XPath 1.0 string literal
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }

    let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}
