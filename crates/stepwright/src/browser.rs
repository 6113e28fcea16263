//! Chromium driver over the DevTools protocol (feature `browser`).
//!
//! [`ChromiumBrowser`] launches one Chromium process and hands out a fresh
//! [`ChromiumDriver`] (one tab) per scenario through [`DriverSource`].
//! Locators are resolved inside the page by an injected script that receives
//! the serialized [`Locator`]; pointer input goes through CDP so clicks and
//! hovers behave like a user's. Network responses are forwarded, with their
//! bodies, to the driver's broadcast channel once loading finishes.

use crate::driver::{ClickOptions, Driver, DriverConfig, ResponseEvent, RESPONSE_CHANNEL_CAPACITY};
use crate::fixture::DriverSource;
use crate::locator::Locator;
use crate::result::{StepwrightError, StepwrightResult};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::{GrantPermissionsParams, PermissionType};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::cdp::browser_protocol::page::{GetNavigationHistoryParams, NavigateToHistoryEntryParams};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

fn cdp_error(e: CdpError) -> StepwrightError {
    StepwrightError::driver(e.to_string())
}

// =============================================================================
// BROWSER
// =============================================================================

/// A launched Chromium process
#[derive(Debug)]
pub struct ChromiumBrowser {
    config: DriverConfig,
    inner: Arc<Mutex<CdpBrowser>>,
    handler: JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launch Chromium
    pub async fn launch(config: DriverConfig) -> StepwrightResult<Self> {
        let mut builder = CdpConfig::builder().viewport(Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
            ..Viewport::default()
        });
        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder.build().map_err(StepwrightError::driver)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(cdp_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        tracing::info!(headless = config.headless, "launched chromium");

        Ok(Self {
            config,
            inner: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Close the browser process
    pub async fn close(&self) -> StepwrightResult<()> {
        let mut browser = self.inner.lock().await;
        let _ = browser.close().await.map_err(cdp_error)?;
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl DriverSource for ChromiumBrowser {
    async fn open(&self) -> StepwrightResult<Arc<dyn Driver>> {
        let page = {
            let browser = self.inner.lock().await;
            browser.new_page("about:blank").await.map_err(cdp_error)?
        };
        Ok(Arc::new(ChromiumDriver::attach(page).await?))
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// One Chromium tab group
#[derive(Debug)]
pub struct ChromiumDriver {
    tabs: Mutex<Vec<CdpPage>>,
    responses: broadcast::Sender<ResponseEvent>,
    listener: JoinHandle<()>,
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

enum NetworkEvent {
    Response(Arc<EventResponseReceived>),
    Finished(Arc<EventLoadingFinished>),
    Failed(Arc<EventLoadingFailed>),
}

#[derive(Debug, Deserialize)]
struct ClickPoint {
    x: f64,
    y: f64,
}

impl ChromiumDriver {
    /// Wrap an open page
    pub async fn attach(page: CdpPage) -> StepwrightResult<Self> {
        let permissions = GrantPermissionsParams::new(vec![
            PermissionType::ClipboardReadWrite,
            PermissionType::ClipboardSanitizedWrite,
        ]);
        if let Err(e) = page.execute(permissions).await {
            tracing::debug!(error = %e, "clipboard permissions not granted");
        }

        let (responses, _) = broadcast::channel(RESPONSE_CHANNEL_CAPACITY);
        let listener = Self::forward_responses(&page, responses.clone()).await?;
        Ok(Self {
            tabs: Mutex::new(vec![page]),
            responses,
            listener,
        })
    }

    async fn forward_responses(
        page: &CdpPage,
        sender: broadcast::Sender<ResponseEvent>,
    ) -> StepwrightResult<JoinHandle<()>> {
        let received = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(cdp_error)?
            .map(NetworkEvent::Response);
        let finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(cdp_error)?
            .map(NetworkEvent::Finished);
        let failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(cdp_error)?
            .map(NetworkEvent::Failed);
        let mut events = Box::pin(futures::stream::select(
            received,
            futures::stream::select(finished, failed),
        ));
        let page = page.clone();

        Ok(tokio::spawn(async move {
            let mut pending: HashMap<RequestId, (String, u16)> = HashMap::new();
            while let Some(event) = events.next().await {
                match event {
                    NetworkEvent::Response(e) => {
                        let status = u16::try_from(e.response.status).unwrap_or_default();
                        let _ = pending.insert(e.request_id.clone(), (e.response.url.clone(), status));
                    }
                    NetworkEvent::Finished(e) => {
                        if let Some((url, status)) = pending.remove(&e.request_id) {
                            let body = response_body(&page, e.request_id.clone()).await;
                            let _ = sender.send(ResponseEvent::new(url, status, body));
                        }
                    }
                    NetworkEvent::Failed(e) => {
                        if let Some((url, status)) = pending.remove(&e.request_id) {
                            let _ = sender.send(ResponseEvent::new(url, status, ""));
                        }
                    }
                }
            }
        }))
    }

    async fn page(&self) -> StepwrightResult<CdpPage> {
        self.tabs
            .lock()
            .await
            .last()
            .cloned()
            .ok_or_else(|| StepwrightError::driver("Target page has been closed"))
    }

    async fn evaluate<T: DeserializeOwned>(&self, expression: String) -> StepwrightResult<T> {
        let page = self.page().await?;
        let encoded: String = page
            .evaluate_expression(format!("(async () => JSON.stringify(await ({expression})))()"))
            .await
            .map_err(cdp_error)?
            .into_value()
            .map_err(|e| StepwrightError::driver(format!("unexpected script result: {e}")))?;
        Ok(serde_json::from_str(&encoded)?)
    }

    async fn locate<T: DeserializeOwned>(&self, locator: &Locator, op: &str, arg: Value) -> StepwrightResult<T> {
        let expression = format!(
            "({LOCATOR_SCRIPT})({}, {}, {})",
            serde_json::to_string(locator)?,
            serde_json::to_string(op)?,
            arg
        );
        self.evaluate(expression).await
    }

    async fn require(&self, locator: &Locator, op: &str, arg: Value) -> StepwrightResult<()> {
        if self.locate::<bool>(locator, op, arg).await? {
            Ok(())
        } else {
            Err(StepwrightError::ElementNotFound {
                locator: locator.describe(),
            })
        }
    }

    async fn point(&self, locator: &Locator) -> StepwrightResult<Point> {
        let point: Option<ClickPoint> = self.locate(locator, "point", Value::Null).await?;
        point
            .map(|p| Point::new(p.x, p.y))
            .ok_or_else(|| StepwrightError::ElementNotFound {
                locator: locator.describe(),
            })
    }

    async fn traverse_history(&self, delta: i64) -> StepwrightResult<()> {
        let page = self.page().await?;
        let history = page
            .execute(GetNavigationHistoryParams::default())
            .await
            .map_err(cdp_error)?;
        let target = history.result.current_index + delta;
        let entry = usize::try_from(target)
            .ok()
            .and_then(|i| history.result.entries.get(i));
        if let Some(entry) = entry {
            let _ = page
                .execute(NavigateToHistoryEntryParams::new(entry.id))
                .await
                .map_err(cdp_error)?;
            let _ = page.wait_for_navigation().await.map_err(cdp_error)?;
        }
        Ok(())
    }
}

async fn response_body(page: &CdpPage, request_id: RequestId) -> String {
    match page.execute(GetResponseBodyParams::new(request_id)).await {
        Ok(response) if response.result.base64_encoded => base64::engine::general_purpose::STANDARD
            .decode(&response.result.body)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default(),
        Ok(response) => response.result.body.clone(),
        Err(_) => String::new(),
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn goto(&self, url: &str) -> StepwrightResult<()> {
        let page = self.page().await?;
        let _ = page.goto(url).await.map_err(|e| StepwrightError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    async fn go_back(&self) -> StepwrightResult<()> {
        self.traverse_history(-1).await
    }

    async fn go_forward(&self) -> StepwrightResult<()> {
        self.traverse_history(1).await
    }

    async fn close(&self) -> StepwrightResult<()> {
        let page = self.tabs.lock().await.pop();
        match page {
            Some(page) => page.close().await.map_err(cdp_error),
            None => Ok(()),
        }
    }

    async fn close_tab(&self, index: usize) -> StepwrightResult<()> {
        let page = {
            let mut tabs = self.tabs.lock().await;
            if index >= tabs.len() {
                return Err(StepwrightError::driver(format!(
                    "no tab at index {index}, {} open",
                    tabs.len()
                )));
            }
            tabs.remove(index)
        };
        page.close().await.map_err(cdp_error)
    }

    async fn current_url(&self) -> StepwrightResult<String> {
        let page = self.page().await?;
        Ok(page.url().await.map_err(cdp_error)?.unwrap_or_default())
    }

    async fn title(&self) -> StepwrightResult<String> {
        let page = self.page().await?;
        Ok(page.get_title().await.map_err(cdp_error)?.unwrap_or_default())
    }

    async fn count(&self, locator: &Locator) -> StepwrightResult<usize> {
        self.locate(locator, "count", Value::Null).await
    }

    async fn is_visible(&self, locator: &Locator) -> StepwrightResult<bool> {
        self.locate(locator, "visible", Value::Null).await
    }

    async fn text_contents(&self, locator: &Locator) -> StepwrightResult<Vec<String>> {
        self.locate(locator, "texts", Value::Null).await
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> StepwrightResult<Option<String>> {
        self.locate(locator, "attribute", json!(name)).await
    }

    async fn input_value(&self, locator: &Locator) -> StepwrightResult<String> {
        let value: Option<String> = self.locate(locator, "value", Value::Null).await?;
        value.ok_or_else(|| StepwrightError::ElementNotFound {
            locator: locator.describe(),
        })
    }

    async fn click(&self, locator: &Locator, _options: ClickOptions) -> StepwrightResult<()> {
        let point = self.point(locator).await?;
        let page = self.page().await?;
        let _ = page.click(point).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> StepwrightResult<()> {
        let point = self.point(locator).await?;
        let page = self.page().await?;
        let _ = page.move_mouse(point).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> StepwrightResult<()> {
        self.require(locator, "fill", json!(value)).await
    }

    async fn press(&self, locator: &Locator, key: &str) -> StepwrightResult<()> {
        self.require(locator, "focus", Value::Null).await?;
        let page = self.page().await?;
        let focused = page.find_element(":focus").await.map_err(cdp_error)?;
        let _ = focused.press_key(key).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn check(&self, locator: &Locator) -> StepwrightResult<()> {
        if self.locate::<bool>(locator, "checked", Value::Null).await? {
            return Ok(());
        }
        self.click(locator, ClickOptions::default()).await?;
        if self.locate::<bool>(locator, "checked", Value::Null).await? {
            Ok(())
        } else {
            Err(StepwrightError::assertion(format!(
                "clicking {} did not check it",
                locator.describe()
            )))
        }
    }

    async fn select_option(&self, locator: &Locator, option: &str) -> StepwrightResult<()> {
        self.require(locator, "select", json!(option)).await
    }

    async fn read_clipboard(&self) -> StepwrightResult<String> {
        self.evaluate("navigator.clipboard.readText()".to_string()).await
    }

    async fn write_clipboard(&self, text: &str) -> StepwrightResult<()> {
        let expression = format!("navigator.clipboard.writeText({}).then(() => true)", json!(text));
        let _: bool = self.evaluate(expression).await?;
        Ok(())
    }

    fn responses(&self) -> broadcast::Receiver<ResponseEvent> {
        self.responses.subscribe()
    }
}

/// In-page locator resolution and element operations.
/// Called as `(locator, op, arg)`; the result is JSON-encoded by the caller.
const LOCATOR_SCRIPT: &str = r#"(loc, op, arg) => {
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const textMatch = (actual, expected, exact) => {
    const a = norm(actual);
    const e = norm(expected);
    return exact ? a === e : a.toLowerCase().includes(e.toLowerCase());
  };
  const roleOf = (el) => {
    const explicit = el.getAttribute('role');
    if (explicit) return explicit;
    const tag = el.tagName.toLowerCase();
    if (tag === 'input') {
      const type = (el.getAttribute('type') || 'text').toLowerCase();
      if (type === 'checkbox' || type === 'radio') return type;
      if (['button', 'submit', 'reset'].includes(type)) return 'button';
      return 'textbox';
    }
    if (tag === 'a') return el.hasAttribute('href') ? 'link' : null;
    const implicit = {
      button: 'button', textarea: 'textbox', select: 'combobox', option: 'option',
      ul: 'list', ol: 'list', li: 'listitem', table: 'table', tr: 'row', td: 'cell',
      th: 'columnheader', h1: 'heading', h2: 'heading', h3: 'heading', h4: 'heading',
      h5: 'heading', h6: 'heading', img: 'img', dialog: 'dialog', nav: 'navigation',
    };
    return implicit[tag] || null;
  };
  const labelOf = (el) => {
    if (el.labels && el.labels.length) return el.labels[0].textContent;
    return el.getAttribute('aria-label');
  };
  const nameOf = (el) => {
    const labelledBy = el.getAttribute('aria-labelledby');
    if (labelledBy) {
      return labelledBy.split(/\s+/).map((id) => {
        const node = el.ownerDocument.getElementById(id);
        return node ? node.textContent : '';
      }).join(' ');
    }
    const label = labelOf(el);
    if (label) return label;
    if (el.tagName === 'INPUT' || el.tagName === 'TEXTAREA' || el.tagName === 'SELECT') {
      return el.getAttribute('title') || el.getAttribute('placeholder') || '';
    }
    return el.getAttribute('alt') || el.textContent;
  };
  const isVisible = (el) => {
    const style = el.ownerDocument.defaultView.getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };
  const matches = (el, s) => {
    switch (s.kind) {
      case 'role':
        return roleOf(el) === s.role && (s.name == null || textMatch(nameOf(el), s.name, s.exact));
      case 'label': {
        const label = labelOf(el);
        return !!label && textMatch(label, s.text, s.exact);
      }
      case 'placeholder':
        return el.hasAttribute('placeholder') && textMatch(el.getAttribute('placeholder'), s.text, s.exact);
      case 'text':
        return norm(el.textContent) !== '' && textMatch(el.textContent, s.text, s.exact);
      case 'test_id':
        return el.getAttribute('data-testid') === s.id;
      default:
        return false;
    }
  };
  const resolve = (l) => {
    let root = document;
    if (l.frame) {
      const frame = document.querySelector(l.frame);
      root = frame && frame.contentDocument;
      if (!root) return [];
    }
    const scopes = l.parent ? resolve(l.parent) : null;
    let found = l.selector.kind === 'css'
      ? Array.from(root.querySelectorAll(l.selector.css))
      : Array.from(root.querySelectorAll('*')).filter((el) => matches(el, l.selector));
    if (scopes) found = found.filter((el) => scopes.some((s) => s !== el && s.contains(el)));
    if (l.selector.kind === 'text') {
      found = found.filter((el) => !found.some((other) => other !== el && el.contains(other)));
    }
    if (l.has_text != null) found = found.filter((el) => textMatch(el.textContent, l.has_text, false));
    if (l.index != null) return found[l.index] ? [found[l.index]] : [];
    return found;
  };
  const fire = (el, type) => el.dispatchEvent(new Event(type, { bubbles: true }));

  const all = resolve(loc);
  const el = all[0];
  switch (op) {
    case 'count':
      return all.length;
    case 'visible':
      return !!el && isVisible(el);
    case 'texts':
      return all.map((e) => e.textContent || '');
    case 'attribute':
      return el ? el.getAttribute(arg) : null;
    case 'value':
      return el ? String(el.value ?? '') : null;
    case 'checked':
      return !!el && !!el.checked;
    case 'focus':
      if (!el) return false;
      el.focus();
      return true;
    case 'point': {
      if (!el) return null;
      el.scrollIntoView({ block: 'center', inline: 'center' });
      const rect = el.getBoundingClientRect();
      let x = rect.left + rect.width / 2;
      let y = rect.top + rect.height / 2;
      let win = el.ownerDocument.defaultView;
      while (win && win.frameElement) {
        const outer = win.frameElement.getBoundingClientRect();
        x += outer.left;
        y += outer.top;
        win = win.parent;
      }
      return { x, y };
    }
    case 'fill': {
      if (!el) return false;
      el.focus();
      const view = el.ownerDocument.defaultView;
      const proto = el.tagName === 'TEXTAREA' ? view.HTMLTextAreaElement.prototype : view.HTMLInputElement.prototype;
      const setter = Object.getOwnPropertyDescriptor(proto, 'value').set;
      setter.call(el, arg);
      fire(el, 'input');
      fire(el, 'change');
      return true;
    }
    case 'select': {
      if (!el || !el.options) return false;
      const option = Array.from(el.options).find((o) => o.value === arg || norm(o.label) === norm(arg));
      if (!option) return false;
      el.value = option.value;
      fire(el, 'input');
      fire(el, 'change');
      return true;
    }
    default:
      return null;
  }
}"#;
