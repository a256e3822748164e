//! Event traces.
//!
//! A trace is a JSON Lines file, one host event per line. Blank lines and
//! lines starting with `#` are skipped.
//!
//! ```text
//! {"event": "tab_opened", "tabId": 1, "tab": {"url": "https://example.com/"}}
//! {"event": "measurement", "tabId": 1, "page": {"fontSizeDistribution": {"12": 900}, "textArea": 5000}}
//! {"event": "user_zoom", "tabId": 1, "zoom": 1.0}
//! {"event": "tab_replaced", "addedTabId": 2, "removedTabId": 1}
//! {"event": "restart"}
//! ```

use std::path::Path;

use anyhow::Context;
use autozoom_controller::HostTab;
use autozoom_core::{PageInfo, TabId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TraceEvent {
    TabOpened { tab_id: TabId, tab: HostTab },
    /// The content side measured the document shown in the tab.
    Measurement { tab_id: TabId, page: PageInfo },
    /// The user zoomed the tab.
    UserZoom { tab_id: TabId, zoom: f64 },
    Navigate { tab_id: TabId, url: String },
    TabRemoved { tab_id: TabId },
    TabReplaced {
        added_tab_id: TabId,
        removed_tab_id: TabId,
    },
    /// The host process restarted; tab ids are reset.
    Restart,
}

pub fn parse_trace(content: &str) -> anyhow::Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line)
            .with_context(|| format!("invalid trace event on line {}", index + 1))?;
        events.push(event);
    }
    Ok(events)
}

pub fn load_trace(path: &Path) -> anyhow::Result<Vec<TraceEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    parse_trace(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autozoom_core::ZoomMode;

    #[test]
    fn parses_every_event_kind() {
        let trace = r#"
# a short session
{"event": "tab_opened", "tabId": 1, "tab": {"url": "https://example.com/", "mode": "manual"}}
{"event": "measurement", "tabId": 1, "page": {"fontSizeDistribution": {"12": 900}, "textArea": 5000}}

{"event": "user_zoom", "tabId": 1, "zoom": 1.25}
{"event": "navigate", "tabId": 1, "url": "https://example.org/"}
{"event": "tab_replaced", "addedTabId": 2, "removedTabId": 1}
{"event": "tab_removed", "tabId": 2}
{"event": "restart"}
"#;
        let events = parse_trace(trace).unwrap();
        assert_eq!(events.len(), 7);

        match &events[0] {
            TraceEvent::TabOpened { tab_id, tab } => {
                assert_eq!(*tab_id, 1);
                assert_eq!(tab.mode, ZoomMode::Manual);
                assert_eq!(tab.default_zoom_factor, 1.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &events[1] {
            TraceEvent::Measurement { page, .. } => {
                assert_eq!(page.font_size_distribution.get(&12), Some(&900));
                assert_eq!(page.text_area, 5000.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            events[4],
            TraceEvent::TabReplaced {
                added_tab_id: 2,
                removed_tab_id: 1
            }
        );
        assert_eq!(events[6], TraceEvent::Restart);
    }

    #[test]
    fn reports_the_bad_line() {
        let trace = "{\"event\": \"restart\"}\n{\"event\": \"explode\"}\n";
        let err = parse_trace(trace).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.jsonl");
        std::fs::write(&path, "{\"event\": \"tab_removed\", \"tabId\": 4}\n").unwrap();
        assert_eq!(
            load_trace(&path).unwrap(),
            vec![TraceEvent::TabRemoved { tab_id: 4 }]
        );
        assert!(load_trace(&dir.path().join("missing.jsonl")).is_err());
    }
}
