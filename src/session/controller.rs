//! Per-session tab lifecycle management
//!
//! The controller guarantees that switching tabs yields a clean
//! conversational context: the message log is replaced with a fresh
//! greeting log and every cached backend resource is invalidated. Tab
//! inputs (URLs, uploaded documents) survive tab switches; only the log
//! and the resource cache reset.

use crate::backends::TabResource;
use crate::services::uploads::StoredDocument;
use crate::session::log::{MessageLog, Turn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// The closed set of tabs a session can be in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabId {
    /// Plain conversational chatbot
    Chat,
    /// QA over uploaded documents
    Document,
    /// QA over a set of web page URLs
    WebAccess,
    /// QA over live internet search results
    Internet,
    /// Natural-language QA against a SQL database
    Sql,
    /// Informational tab; accepts no queries
    About,
}

impl TabId {
    /// Convert the tab to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TabId::Chat => "chat",
            TabId::Document => "document",
            TabId::WebAccess => "web_access",
            TabId::Internet => "internet",
            TabId::Sql => "sql",
            TabId::About => "about",
        }
    }
}

/// Outcome of a tab selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabSwitch {
    /// First selection of the session; the greeting log is kept as-is
    Initial,
    /// Re-selection of the active tab; no side effects
    Unchanged,
    /// Tab changed; caches were invalidated and the log was reset
    Switched {
        /// The tab that was active before the switch
        previous: TabId,
    },
}

impl TabSwitch {
    /// Whether this selection replaced the message log
    pub fn reset_log(&self) -> bool {
        matches!(self, TabSwitch::Switched { .. })
    }
}

/// Tab-specific inputs supplied by the user over the session's lifetime
///
/// URLs are kept deduplicated in insertion order. Inputs are not cleared
/// on tab switches so the user does not have to re-enter them.
#[derive(Debug, Clone, Default)]
pub struct TabInputs {
    urls: Vec<String>,
    documents: Vec<StoredDocument>,
}

impl TabInputs {
    /// Add a URL to the set; returns false if it was already present
    pub fn add_url(&mut self, url: String) -> bool {
        if self.urls.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    /// Remove every URL from the set
    pub fn clear_urls(&mut self) {
        self.urls.clear();
    }

    /// The deduplicated URL set in insertion order
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// Register an uploaded document
    pub fn add_document(&mut self, document: StoredDocument) {
        self.documents.push(document);
    }

    /// All registered uploaded documents
    pub fn documents(&self) -> &[StoredDocument] {
        &self.documents
    }
}

/// Owns one session's active tab, message log, inputs, and per-tab
/// backend resource cache
#[derive(Debug)]
pub struct SessionController {
    id: String,
    active_tab: Option<TabId>,
    log: MessageLog,
    caches: HashMap<TabId, TabResource>,
    inputs: TabInputs,
}

impl SessionController {
    /// Create a controller with no active tab and a greeting-only log
    pub fn new(id: String) -> Self {
        Self {
            id,
            active_tab: None,
            log: MessageLog::with_greeting(),
            caches: HashMap::new(),
            inputs: TabInputs::default(),
        }
    }

    /// Session identifier this controller belongs to
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The currently active tab, if any was selected yet
    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    /// Record a tab selection, resetting conversation state if the tab
    /// changed
    ///
    /// The first selection records the tab and leaves the greeting log
    /// untouched. Re-selecting the active tab is a no-op. Selecting a
    /// different tab invalidates every cached backend resource, replaces
    /// the log with a fresh greeting log, and records the new tab.
    /// Resource release failures are logged and swallowed; resetting is
    /// never fatal.
    pub fn select_tab(&mut self, tab: TabId) -> TabSwitch {
        match self.active_tab {
            None => {
                debug!(session_id = %self.id, tab = tab.as_str(), "First tab selected");
                self.active_tab = Some(tab);
                TabSwitch::Initial
            }
            Some(current) if current == tab => TabSwitch::Unchanged,
            Some(previous) => {
                debug!(
                    session_id = %self.id,
                    from = previous.as_str(),
                    to = tab.as_str(),
                    "Tab changed, resetting conversation state"
                );
                if let Err(e) = self.clear_caches() {
                    warn!(
                        session_id = %self.id,
                        error = %e,
                        "Cache invalidation hit an inconsistency, continuing with a fresh log"
                    );
                }
                self.log = MessageLog::with_greeting();
                self.active_tab = Some(tab);
                TabSwitch::Switched { previous }
            }
        }
    }

    /// Release every cached backend resource
    fn clear_caches(&mut self) -> Result<(), crate::error::AppError> {
        let mut first_error = None;
        for (tab, resource) in self.caches.drain() {
            debug!(session_id = %self.id, tab = tab.as_str(), "Releasing cached resource");
            if let Err(e) = resource.release() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Replay the message log in order for rendering
    pub fn replay(&self) -> impl Iterator<Item = &Turn> {
        self.log.iter()
    }

    /// The message log owned by this session
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    /// Append a user turn to the log
    pub fn append_user(&mut self, content: String) {
        self.log.append_user(content);
    }

    /// Append an assistant turn to the log
    pub fn append_assistant(&mut self, content: String) {
        self.log.append_assistant(content);
    }

    /// The cached backend resource for a tab, if one was built since the
    /// last reset
    pub fn cached(&self, tab: TabId) -> Option<&TabResource> {
        self.caches.get(&tab)
    }

    /// Store a freshly built backend resource for a tab
    pub fn store_resource(&mut self, tab: TabId, resource: TabResource) {
        self.caches.insert(tab, resource);
    }

    /// Drop a single tab's cached resource (used when its inputs change)
    pub fn invalidate(&mut self, tab: TabId) {
        if let Some(resource) = self.caches.remove(&tab) {
            debug!(session_id = %self.id, tab = tab.as_str(), "Invalidating cached resource");
            if let Err(e) = resource.release() {
                warn!(session_id = %self.id, error = %e, "Resource release failed");
            }
        }
    }

    /// Tab-specific inputs supplied so far
    pub fn inputs(&self) -> &TabInputs {
        &self.inputs
    }

    /// Mutable access to the tab-specific inputs
    pub fn inputs_mut(&mut self) -> &mut TabInputs {
        &mut self.inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::corpus::{Corpus, SourceDoc};
    use crate::session::log::{Role, GREETING};
    use std::sync::Arc;

    fn corpus_resource(label: &str) -> TabResource {
        TabResource::Corpus(Arc::new(Corpus::build(vec![SourceDoc {
            label: label.to_string(),
            text: "some cached content".to_string(),
        }])))
    }

    #[test]
    fn test_first_selection_keeps_greeting_log() {
        let mut session = SessionController::new("s1".to_string());
        assert!(session.active_tab().is_none());

        let switch = session.select_tab(TabId::Chat);
        assert_eq!(switch, TabSwitch::Initial);
        assert_eq!(session.active_tab(), Some(TabId::Chat));
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.replay().next().unwrap().content, GREETING);
    }

    #[test]
    fn test_reselecting_active_tab_is_noop() {
        let mut session = SessionController::new("s1".to_string());
        session.select_tab(TabId::Chat);
        session.append_user("hello".to_string());
        session.append_assistant("hi".to_string());

        let before = session.log().clone();
        let switch = session.select_tab(TabId::Chat);
        assert_eq!(switch, TabSwitch::Unchanged);
        assert_eq!(session.log(), &before);
    }

    #[test]
    fn test_tab_change_resets_log_to_single_greeting() {
        let mut session = SessionController::new("s1".to_string());
        session.select_tab(TabId::Chat);
        session.append_user("hello".to_string());
        session.append_assistant("hi".to_string());
        assert_eq!(session.log().len(), 3);

        let switch = session.select_tab(TabId::Document);
        assert!(switch.reset_log());
        assert_eq!(session.log().len(), 1);
        let greeting = session.replay().next().unwrap();
        assert_eq!(greeting.role, Role::Assistant);
        assert_eq!(greeting.content, GREETING);
    }

    #[test]
    fn test_any_sequence_of_switches_leaves_single_greeting() {
        let mut session = SessionController::new("s1".to_string());
        let tabs = [
            TabId::Chat,
            TabId::Internet,
            TabId::Sql,
            TabId::WebAccess,
            TabId::About,
            TabId::Document,
        ];
        for tab in tabs {
            let switch = session.select_tab(tab);
            if switch.reset_log() {
                assert_eq!(session.log().len(), 1);
                assert_eq!(session.replay().next().unwrap().role, Role::Assistant);
            }
            session.append_user("a question".to_string());
        }
    }

    #[test]
    fn test_switch_away_and_back_discards_cached_resource() {
        let mut session = SessionController::new("s1".to_string());
        session.select_tab(TabId::Document);
        session.store_resource(TabId::Document, corpus_resource("report.txt"));
        assert!(session.cached(TabId::Document).is_some());

        session.select_tab(TabId::Chat);
        assert!(session.cached(TabId::Document).is_none());

        // Back on Document a fresh build is required
        session.select_tab(TabId::Document);
        assert!(session.cached(TabId::Document).is_none());
    }

    #[test]
    fn test_inputs_survive_tab_switches() {
        let mut session = SessionController::new("s1".to_string());
        session.select_tab(TabId::WebAccess);
        assert!(session
            .inputs_mut()
            .add_url("https://example.com/a".to_string()));
        assert!(!session
            .inputs_mut()
            .add_url("https://example.com/a".to_string()));

        session.select_tab(TabId::Chat);
        session.select_tab(TabId::WebAccess);
        assert_eq!(session.inputs().urls(), ["https://example.com/a"]);
    }

    #[test]
    fn test_invalidate_single_tab() {
        let mut session = SessionController::new("s1".to_string());
        session.select_tab(TabId::WebAccess);
        session.store_resource(TabId::WebAccess, corpus_resource("https://example.com"));

        session.inputs_mut().add_url("https://example.com/b".to_string());
        session.invalidate(TabId::WebAccess);
        assert!(session.cached(TabId::WebAccess).is_none());
        // Active tab and log untouched by input changes
        assert_eq!(session.active_tab(), Some(TabId::WebAccess));
        assert_eq!(session.log().len(), 1);
    }
}
