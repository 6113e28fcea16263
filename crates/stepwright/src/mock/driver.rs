//! In-memory [`Driver`] for unit and scenario tests.

use super::dom::{ElementId, MockDocument};
use crate::driver::{ClickOptions, Driver, ResponseEvent, RESPONSE_CHANNEL_CAPACITY};
use crate::locator::{text_matches, Locator};
use crate::result::{StepwrightError, StepwrightResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// User interaction delivered to a [`MockHandler`] after the built-in effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// Element clicked
    Click,
    /// Pointer moved over element
    Hover,
    /// Value replaced
    Fill(String),
    /// Key pressed
    Press(String),
    /// Checkbox checked
    Check,
    /// Option selected
    Select(String),
}

/// Application behaviour hook: mutate the document in response to an event
pub type MockHandler = Arc<dyn Fn(&mut MockDocument, ElementId, &MockEvent) + Send + Sync>;

#[derive(Debug, Clone)]
struct Tab {
    history: Vec<String>,
    position: usize,
    document: MockDocument,
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<String, MockDocument>,
    tabs: Vec<Tab>,
    active: usize,
    clipboard: String,
    call_history: Vec<String>,
}

impl MockState {
    fn tab(&self) -> StepwrightResult<&Tab> {
        self.tabs.get(self.active).ok_or_else(closed)
    }

    fn tab_mut(&mut self) -> StepwrightResult<&mut Tab> {
        let active = self.active;
        self.tabs.get_mut(active).ok_or_else(closed)
    }

    fn load(&self, url: &str) -> MockDocument {
        self.routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| MockDocument::new(url, ""))
    }
}

fn closed() -> StepwrightError {
    StepwrightError::driver("Target page has been closed")
}

/// Mock driver for unit testing
pub struct MockDriver {
    state: Mutex<MockState>,
    handler: Option<MockHandler>,
    responses: broadcast::Sender<ResponseEvent>,
}

impl fmt::Debug for MockDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDriver")
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// New driver with one blank tab
    #[must_use]
    pub fn new() -> Self {
        let (responses, _) = broadcast::channel(RESPONSE_CHANNEL_CAPACITY);
        let state = MockState {
            tabs: vec![Tab {
                history: vec!["about:blank".to_string()],
                position: 0,
                document: MockDocument::new("about:blank", ""),
            }],
            ..MockState::default()
        };
        Self {
            state: Mutex::new(state),
            handler: None,
            responses,
        }
    }

    /// Install an application behaviour hook
    #[must_use]
    pub fn with_handler(
        mut self,
        handler: impl Fn(&mut MockDocument, ElementId, &MockEvent) + Send + Sync + 'static,
    ) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Serve `document` whenever `url` is visited
    #[must_use]
    pub fn with_route(self, url: impl Into<String>, document: MockDocument) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let _ = state.routes.insert(url.into(), document);
        }
        self
    }

    fn lock(&self) -> StepwrightResult<MutexGuard<'_, MockState>> {
        self.state
            .lock()
            .map_err(|_| StepwrightError::driver("mock driver state poisoned"))
    }

    fn record(&self, call: String) -> StepwrightResult<()> {
        self.lock()?.call_history.push(call);
        Ok(())
    }

    /// Replace the active tab's document
    pub fn set_document(&self, document: MockDocument) -> StepwrightResult<()> {
        self.lock()?.tab_mut()?.document = document;
        Ok(())
    }

    /// Snapshot of the active tab's document
    pub fn document(&self) -> StepwrightResult<MockDocument> {
        Ok(self.lock()?.tab()?.document.clone())
    }

    /// Open a new tab and make it active
    pub fn open_tab(&self, url: &str) -> StepwrightResult<()> {
        let mut state = self.lock()?;
        let document = state.load(url);
        state.tabs.push(Tab {
            history: vec![url.to_string()],
            position: 0,
            document,
        });
        state.active = state.tabs.len() - 1;
        Ok(())
    }

    /// Number of open tabs
    pub fn tab_count(&self) -> StepwrightResult<usize> {
        Ok(self.lock()?.tabs.len())
    }

    /// Publish a response to every subscriber
    pub fn emit_response(&self, event: ResponseEvent) {
        let _ = self.responses.send(event);
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|s| s.call_history.clone())
            .unwrap_or_default()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.history().iter().any(|c| c.starts_with(method))
    }

    fn with_doc<R>(
        &self,
        locator: &Locator,
        f: impl FnOnce(&MockDocument, Vec<ElementId>) -> StepwrightResult<R>,
    ) -> StepwrightResult<R> {
        let state = self.lock()?;
        let doc = frame_doc(&state.tab()?.document, locator.frame.as_deref())?;
        let ids = doc.resolve(locator)?;
        f(doc, ids)
    }

    /// Apply `effect` to the first match, then run the handler
    fn act(
        &self,
        locator: &Locator,
        event: MockEvent,
        effect: impl FnOnce(&mut MockDocument, ElementId) -> StepwrightResult<()>,
    ) -> StepwrightResult<()> {
        let mut state = self.lock()?;
        state
            .call_history
            .push(format!("{event:?}:{}", locator.describe()));
        let doc = frame_doc_mut(&mut state.tab_mut()?.document, locator.frame.as_deref())?;
        let id = doc
            .resolve(locator)?
            .first()
            .copied()
            .ok_or_else(|| StepwrightError::ElementNotFound {
                locator: locator.describe(),
            })?;
        effect(doc, id)?;
        if let Some(handler) = &self.handler {
            handler(doc, id, &event);
        }
        Ok(())
    }
}

fn frame_doc<'a>(doc: &'a MockDocument, frame: Option<&str>) -> StepwrightResult<&'a MockDocument> {
    let Some(css) = frame else {
        return Ok(doc);
    };
    doc.resolve(&Locator::css(css))?
        .into_iter()
        .find_map(|id| doc.get(id).and_then(|e| e.content.as_deref()))
        .ok_or_else(|| StepwrightError::ElementNotFound {
            locator: format!("frameLocator({css:?})"),
        })
}

fn frame_doc_mut<'a>(
    doc: &'a mut MockDocument,
    frame: Option<&str>,
) -> StepwrightResult<&'a mut MockDocument> {
    let Some(css) = frame else {
        return Ok(doc);
    };
    let id = doc
        .resolve(&Locator::css(css))?
        .into_iter()
        .find(|id| doc.get(*id).is_some_and(|e| e.content.is_some()))
        .ok_or_else(|| StepwrightError::ElementNotFound {
            locator: format!("frameLocator({css:?})"),
        })?;
    doc.get_mut(id)
        .and_then(|e| e.content.as_deref_mut())
        .ok_or_else(|| StepwrightError::ElementNotFound {
            locator: format!("frameLocator({css:?})"),
        })
}

fn require_first(locator: &Locator, ids: &[ElementId]) -> StepwrightResult<ElementId> {
    ids.first()
        .copied()
        .ok_or_else(|| StepwrightError::ElementNotFound {
            locator: locator.describe(),
        })
}

#[async_trait]
impl Driver for MockDriver {
    async fn goto(&self, url: &str) -> StepwrightResult<()> {
        let mut state = self.lock()?;
        state.call_history.push(format!("goto:{url}"));
        let document = state.load(url);
        let tab = state.tab_mut()?;
        tab.history.truncate(tab.position + 1);
        tab.history.push(url.to_string());
        tab.position = tab.history.len() - 1;
        tab.document = document;
        Ok(())
    }

    async fn go_back(&self) -> StepwrightResult<()> {
        let mut state = self.lock()?;
        state.call_history.push("go_back".to_string());
        let tab = state.tab()?;
        if tab.position == 0 {
            return Ok(());
        }
        let url = tab.history[tab.position - 1].clone();
        let document = state.load(&url);
        let tab = state.tab_mut()?;
        tab.position -= 1;
        tab.document = document;
        Ok(())
    }

    async fn go_forward(&self) -> StepwrightResult<()> {
        let mut state = self.lock()?;
        state.call_history.push("go_forward".to_string());
        let tab = state.tab()?;
        let Some(url) = tab.history.get(tab.position + 1).cloned() else {
            return Ok(());
        };
        let document = state.load(&url);
        let tab = state.tab_mut()?;
        tab.position += 1;
        tab.document = document;
        Ok(())
    }

    async fn close(&self) -> StepwrightResult<()> {
        let mut state = self.lock()?;
        state.call_history.push("close".to_string());
        let active = state.active;
        if active < state.tabs.len() {
            let _ = state.tabs.remove(active);
        }
        state.active = state.tabs.len().saturating_sub(1);
        Ok(())
    }

    async fn close_tab(&self, index: usize) -> StepwrightResult<()> {
        let mut state = self.lock()?;
        state.call_history.push(format!("close_tab:{index}"));
        if index >= state.tabs.len() {
            return Err(StepwrightError::driver(format!(
                "No tab at index {index} ({} open)",
                state.tabs.len()
            )));
        }
        let _ = state.tabs.remove(index);
        if state.active >= index && state.active > 0 {
            state.active -= 1;
        }
        Ok(())
    }

    async fn current_url(&self) -> StepwrightResult<String> {
        let state = self.lock()?;
        let tab = state.tab()?;
        Ok(tab.history[tab.position].clone())
    }

    async fn title(&self) -> StepwrightResult<String> {
        Ok(self.lock()?.tab()?.document.title.clone())
    }

    async fn count(&self, locator: &Locator) -> StepwrightResult<usize> {
        self.with_doc(locator, |_, ids| Ok(ids.len()))
    }

    async fn is_visible(&self, locator: &Locator) -> StepwrightResult<bool> {
        self.with_doc(locator, |doc, ids| {
            Ok(ids.first().is_some_and(|id| doc.is_visible(*id)))
        })
    }

    async fn text_contents(&self, locator: &Locator) -> StepwrightResult<Vec<String>> {
        self.with_doc(locator, |doc, ids| {
            Ok(ids.iter().map(|id| doc.text_content(*id)).collect())
        })
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> StepwrightResult<Option<String>> {
        self.with_doc(locator, |doc, ids| {
            let id = require_first(locator, &ids)?;
            Ok(doc
                .get(id)
                .and_then(|e| e.attribute(name))
                .map(str::to_string))
        })
    }

    async fn input_value(&self, locator: &Locator) -> StepwrightResult<String> {
        self.with_doc(locator, |doc, ids| {
            let id = require_first(locator, &ids)?;
            Ok(doc.get(id).map(|e| e.value.clone()).unwrap_or_default())
        })
    }

    async fn click(&self, locator: &Locator, options: ClickOptions) -> StepwrightResult<()> {
        let _ = options;
        self.act(locator, MockEvent::Click, |doc, id| {
            let (role, parent) = match doc.get(id) {
                Some(e) => (e.role(), doc.parent(id)),
                None => return Ok(()),
            };
            match role.as_deref() {
                Some("checkbox") => {
                    if let Some(e) = doc.get_mut(id) {
                        e.checked = !e.checked;
                    }
                }
                Some("option") => {
                    let value = option_value(doc, id);
                    if let Some(select) = parent.and_then(|p| doc.get_mut(p)) {
                        select.value = value;
                    }
                }
                _ => {}
            }
            Ok(())
        })
    }

    async fn hover(&self, locator: &Locator) -> StepwrightResult<()> {
        self.act(locator, MockEvent::Hover, |_, _| Ok(()))
    }

    async fn fill(&self, locator: &Locator, value: &str) -> StepwrightResult<()> {
        self.act(locator, MockEvent::Fill(value.to_string()), |doc, id| {
            let element = doc.get_mut(id).ok_or_else(closed)?;
            let editable = matches!(element.tag.as_str(), "input" | "textarea")
                || element.attribute("contenteditable").is_some();
            if !editable {
                return Err(StepwrightError::driver(format!(
                    "Element is not an <input>, <textarea> or [contenteditable] element: <{}>",
                    element.tag
                )));
            }
            element.value = value.to_string();
            Ok(())
        })
    }

    async fn press(&self, locator: &Locator, key: &str) -> StepwrightResult<()> {
        self.act(locator, MockEvent::Press(key.to_string()), |_, _| Ok(()))
    }

    async fn check(&self, locator: &Locator) -> StepwrightResult<()> {
        self.act(locator, MockEvent::Check, |doc, id| {
            let checkable = doc
                .get(id)
                .and_then(|e| e.role())
                .is_some_and(|r| r == "checkbox" || r == "radio");
            if !checkable {
                return Err(StepwrightError::driver("Not a checkbox or radio button"));
            }
            if let Some(e) = doc.get_mut(id) {
                e.checked = true;
            }
            Ok(())
        })
    }

    async fn select_option(&self, locator: &Locator, option: &str) -> StepwrightResult<()> {
        self.act(locator, MockEvent::Select(option.to_string()), |doc, id| {
            let chosen = doc.children(id).find(|child| {
                doc.get(*child).is_some_and(|e| {
                    e.tag == "option"
                        && (e.attribute("value") == Some(option)
                            || text_matches(&e.text, option, true))
                })
            });
            let Some(chosen) = chosen else {
                return Err(StepwrightError::driver(format!(
                    "No option {option:?} in select"
                )));
            };
            let value = option_value(doc, chosen);
            if let Some(select) = doc.get_mut(id) {
                select.value = value;
            }
            Ok(())
        })
    }

    async fn read_clipboard(&self) -> StepwrightResult<String> {
        Ok(self.lock()?.clipboard.clone())
    }

    async fn write_clipboard(&self, text: &str) -> StepwrightResult<()> {
        self.record(format!("write_clipboard:{text}"))?;
        text.clone_into(&mut self.lock()?.clipboard);
        Ok(())
    }

    fn responses(&self) -> broadcast::Receiver<ResponseEvent> {
        self.responses.subscribe()
    }
}

fn option_value(doc: &MockDocument, id: ElementId) -> String {
    doc.get(id)
        .map(|e| {
            e.attribute("value")
                .map_or_else(|| e.text.clone(), str::to_string)
        })
        .unwrap_or_default()
}
