//! Windows UI Automation backend
//!
//! `Primary` walks the UIA control view; `Alternate` walks the raw view, which
//! also exposes the static labels composited into status bars.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uiautomation::patterns::UIValuePattern;
use uiautomation::types::{TreeScope, UIProperty};
use uiautomation::variants::Variant;
use uiautomation::{UIAutomation, UIElement};

use crate::backend::UiBackend;
use crate::errors::RunError;
use crate::types::{BackendMode, ControlRef, ElementHandle, Key, WindowRef};

/// Thread-safe wrapper for the UIAutomation COM object
struct ThreadSafeWinUIAutomation(Arc<UIAutomation>);

// Safety: UIAutomation is thread-safe after COM is initialized for the multithreaded apartment
unsafe impl Send for ThreadSafeWinUIAutomation {}
unsafe impl Sync for ThreadSafeWinUIAutomation {}

/// Thread-safe wrapper for UIElement
#[derive(Clone)]
struct ThreadSafeWinUIElement(Arc<UIElement>);

// Safety: UIElement is thread-safe when wrapped properly
unsafe impl Send for ThreadSafeWinUIElement {}
unsafe impl Sync for ThreadSafeWinUIElement {}

fn platform_error(e: uiautomation::Error) -> RunError {
    RunError::Backend(format!("UIAutomation error: {e}"))
}

pub struct WindowsBackend {
    automation: ThreadSafeWinUIAutomation,
    // Elements handed out since the last top-level enumeration
    elements: Mutex<HashMap<ElementHandle, ThreadSafeWinUIElement>>,
    next_handle: AtomicU64,
}

impl WindowsBackend {
    pub fn new() -> Result<Self, RunError> {
        // `UIAutomation::new` initializes COM for the calling thread
        let automation = UIAutomation::new().map_err(platform_error)?;
        Ok(Self {
            automation: ThreadSafeWinUIAutomation(Arc::new(automation)),
            elements: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    /// Elements under `element` in `scope`, filtered by the view `mode` maps to
    fn find_in(
        &self,
        element: &UIElement,
        scope: TreeScope,
        mode: BackendMode,
    ) -> Result<Vec<UIElement>, RunError> {
        let automation = &self.automation.0;
        let found = match mode {
            BackendMode::Primary => {
                let condition = automation
                    .create_property_condition(UIProperty::IsControlElement, Variant::from(true), None)
                    .map_err(platform_error)?;
                element.find_all(scope, &condition)
            }
            BackendMode::Alternate => {
                let condition = automation.create_true_condition().map_err(platform_error)?;
                element.find_all(scope, &condition)
            }
        };
        found.map_err(platform_error)
    }

    fn register(&self, element: UIElement) -> ElementHandle {
        let handle = ElementHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.registry()
            .insert(handle, ThreadSafeWinUIElement(Arc::new(element)));
        handle
    }

    fn lookup(&self, handle: ElementHandle) -> Result<ThreadSafeWinUIElement, RunError> {
        self.registry()
            .get(&handle)
            .cloned()
            .ok_or_else(|| RunError::ElementNotFound(format!("stale element handle {}", handle.0)))
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<ElementHandle, ThreadSafeWinUIElement>> {
        // A poisoned map only holds element references; keep using it
        self.elements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl UiBackend for WindowsBackend {
    fn top_level_windows(&self, mode: BackendMode) -> Result<Vec<WindowRef>, RunError> {
        self.registry().clear();

        let root = self.automation.0.get_root_element().map_err(platform_error)?;
        let children = self.find_in(&root, TreeScope::Children, mode)?;

        let mut windows = Vec::with_capacity(children.len());
        for element in children {
            let Ok(pid) = element.get_process_id() else {
                continue;
            };
            let title = element.get_name().unwrap_or_default();
            windows.push(WindowRef {
                handle: self.register(element),
                title,
                pid,
            });
        }
        debug!(count = windows.len(), ?mode, "enumerated top-level windows");
        Ok(windows)
    }

    fn descendants(
        &self,
        mode: BackendMode,
        window: &WindowRef,
    ) -> Result<Vec<ControlRef>, RunError> {
        let element = self.lookup(window.handle)?;
        let found = self.find_in(&element.0, TreeScope::Descendants, mode)?;

        Ok(found
            .into_iter()
            .map(|child| {
                let class_name = child.get_classname().unwrap_or_default();
                let text = child.get_name().unwrap_or_default();
                ControlRef {
                    handle: self.register(child),
                    class_name,
                    text,
                }
            })
            .collect())
    }

    fn text(&self, _mode: BackendMode, control: &ControlRef) -> Result<String, RunError> {
        let element = self.lookup(control.handle)?;
        let name = element.0.get_name().map_err(platform_error)?;
        if !name.is_empty() {
            return Ok(name);
        }
        // Edits expose their content through the value pattern instead of the name
        match element.0.get_pattern::<UIValuePattern>() {
            Ok(value) => value.get_value().map_err(platform_error),
            Err(_) => Ok(name),
        }
    }

    fn set_text(
        &self,
        _mode: BackendMode,
        control: &ControlRef,
        text: &str,
    ) -> Result<(), RunError> {
        let element = self.lookup(control.handle)?;
        element
            .0
            .get_pattern::<UIValuePattern>()
            .map_err(|e| {
                RunError::Backend(format!(
                    "Control {:?} does not accept text: {e}",
                    control.class_name
                ))
            })?
            .set_value(text)
            .map_err(platform_error)
    }

    fn click(&self, _mode: BackendMode, control: &ControlRef) -> Result<(), RunError> {
        let element = self.lookup(control.handle)?;
        element.0.try_focus();
        element.0.click().map_err(platform_error)
    }

    fn send_keystroke(
        &self,
        _mode: BackendMode,
        control: &ControlRef,
        key: Key,
    ) -> Result<(), RunError> {
        let element = self.lookup(control.handle)?;
        element
            .0
            .send_keys(key.as_sequence(), 10)
            .map_err(platform_error)
    }
}
