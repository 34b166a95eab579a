//! Headless phone input widget
//!
//! Stand-in for the third-party `react-international-phone` component: it
//! renders the same markup, and opening its country selector inserts the
//! dropdown asynchronously after a short render delay, the way the real
//! widget does. The overlay never calls into it; tests and the demo drive it
//! through clicks on its toggle button.

use std::sync::Arc;
use std::time::Duration;

use dialcode_dom::{event_types, Document, ElementSpec, ListenerId, NodeId, Result};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::markup::{WidgetMarkup, ARIA_LABEL_ATTRIBUTE, TITLE_ATTRIBUTE};

/// A selectable country as the widget knows it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Country {
    /// ISO 3166-1 alpha-2, lowercase (as emitted in `data-country`)
    pub code: &'static str,
    /// The widget's built-in (English) name
    pub name: &'static str,
    pub dial_code: &'static str,
}

const fn country(code: &'static str, name: &'static str, dial_code: &'static str) -> Country {
    Country {
        code,
        name,
        dial_code,
    }
}

/// Countries rendered by default
pub const COUNTRIES: &[Country] = &[
    country("ar", "Argentina", "+54"),
    country("br", "Brazil", "+55"),
    country("ca", "Canada", "+1"),
    country("cn", "China", "+86"),
    country("de", "Germany", "+49"),
    country("es", "Spain", "+34"),
    country("fr", "France", "+33"),
    country("gb", "United Kingdom", "+44"),
    country("it", "Italy", "+39"),
    country("jp", "Japan", "+81"),
    country("mx", "Mexico", "+52"),
    country("pt", "Portugal", "+351"),
    country("us", "United States", "+1"),
];

/// Widget construction options
#[derive(Clone, Debug)]
pub struct WidgetConfig {
    pub markup: WidgetMarkup,
    pub countries: Vec<Country>,
    /// Time between a toggle click and the dropdown appearing.
    /// Zero renders synchronously inside the click.
    pub render_delay: Duration,
    /// Optional visible label rendered above the input
    pub label: Option<String>,
    pub placeholder: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            markup: WidgetMarkup::default(),
            countries: COUNTRIES.to_vec(),
            render_delay: Duration::from_millis(20),
            label: Some("Teléfono".to_string()),
            placeholder: "Ingrese número de teléfono".to_string(),
        }
    }
}

/// Change callback, invoked with the new value
pub type ChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

struct WidgetState {
    open: bool,
    dropdown: Option<NodeId>,
    render: Option<JoinHandle<()>>,
    on_change: Option<ChangeHandler>,
}

struct WidgetShared {
    document: Document,
    config: WidgetConfig,
    root: NodeId,
    button: NodeId,
    input: NodeId,
    runtime: Option<Handle>,
    state: Mutex<WidgetState>,
}

/// A mounted phone input
pub struct PhoneInputWidget {
    shared: Arc<WidgetShared>,
    listener: ListenerId,
}

impl PhoneInputWidget {
    /// Render the widget into `container`.
    ///
    /// A non-zero render delay needs a Tokio runtime; without one the
    /// dropdown renders synchronously.
    pub fn mount(document: &Document, container: NodeId, config: WidgetConfig) -> Result<Self> {
        let m = &config.markup;
        let mut spec = ElementSpec::new("div").class("phone-input");
        if let Some(label) = &config.label {
            spec = spec.child(ElementSpec::new("label").class("phone-input-label").text(label));
        }
        spec = spec.child(
            ElementSpec::new("div")
                .class(&m.input_container)
                .child(
                    ElementSpec::new("button")
                        .class(&m.selector_button)
                        .attr("type", "button")
                        .attr("aria-haspopup", "listbox"),
                )
                .child(
                    ElementSpec::new("input")
                        .class(&m.input)
                        .attr("type", "tel")
                        .attr("placeholder", &config.placeholder)
                        .attr("value", ""),
                ),
        );

        let root = document.create_tree(&spec);
        let button = document
            .query_selector(root, &m.button_selector())
            .ok_or(dialcode_dom::DomError::NodeNotFound(root))?;
        let input = document
            .query_selector(root, &dialcode_dom::Selector::class(m.input.as_str()))
            .ok_or(dialcode_dom::DomError::NodeNotFound(root))?;
        document.append_child(container, root)?;

        let shared = Arc::new(WidgetShared {
            document: document.clone(),
            config,
            root,
            button,
            input,
            runtime: Handle::try_current().ok(),
            state: Mutex::new(WidgetState {
                open: false,
                dropdown: None,
                render: None,
                on_change: None,
            }),
        });

        let weak = Arc::downgrade(&shared);
        let listener = document.add_event_listener(button, event_types::CLICK, move |_| {
            if let Some(shared) = weak.upgrade() {
                shared.toggle();
            }
        })?;

        Ok(Self { shared, listener })
    }

    /// The country selector toggle
    pub fn button(&self) -> NodeId {
        self.shared.button
    }

    /// The rendered dropdown, if open and rendered
    pub fn dropdown(&self) -> Option<NodeId> {
        self.shared.state.lock().dropdown
    }

    pub fn is_open(&self) -> bool {
        self.shared.state.lock().open
    }

    /// Click the toggle, as a user would
    pub fn toggle(&self) -> Result<()> {
        self.shared.document.click(self.shared.button)
    }

    pub fn value(&self) -> String {
        self.shared
            .document
            .attribute(self.shared.input, "value")
            .unwrap_or_default()
    }

    /// Replace the input value and notify the change handler
    pub fn set_value(&self, value: &str) -> Result<()> {
        self.shared.document.set_attribute(self.shared.input, "value", value)?;
        let handler = self.shared.state.lock().on_change.clone();
        if let Some(handler) = handler {
            handler(value);
        }
        Ok(())
    }

    pub fn on_change<F>(&self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.shared.state.lock().on_change = Some(Arc::new(handler));
    }

    /// Remove the widget from the document
    pub fn unmount(self) -> Result<()> {
        self.release();
        self.shared.document.remove(self.shared.root)
    }

    fn release(&self) {
        self.shared.close();
        self.shared.document.remove_event_listener(self.listener);
    }
}

/// A dropped widget stops reacting: its dropdown is closed, a pending render
/// is cancelled and the toggle listener is removed. Its markup stays.
impl Drop for PhoneInputWidget {
    fn drop(&mut self) {
        self.release();
    }
}

impl WidgetShared {
    fn toggle(self: &Arc<Self>) {
        let opening = {
            let mut state = self.state.lock();
            state.open = !state.open;
            state.open
        };
        if opening {
            self.open();
        } else {
            self.close();
        }
    }

    fn open(self: &Arc<Self>) {
        let delay = self.config.render_delay;
        match (&self.runtime, delay.is_zero()) {
            (Some(runtime), false) => {
                let weak = Arc::downgrade(self);
                let task = runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(shared) = weak.upgrade() {
                        shared.render_dropdown();
                    }
                });
                self.state.lock().render = Some(task);
            }
            _ => self.render_dropdown(),
        }
    }

    fn close(&self) {
        let (render, dropdown) = {
            let mut state = self.state.lock();
            state.open = false;
            (state.render.take(), state.dropdown.take())
        };
        if let Some(task) = render {
            task.abort();
        }
        if let Some(dropdown) = dropdown {
            let _ = self.document.remove(dropdown);
        }
    }

    fn render_dropdown(&self) {
        {
            let mut state = self.state.lock();
            state.render = None;
            if !state.open || state.dropdown.is_some() {
                return;
            }
        }

        let m = &self.config.markup;
        let items = self.config.countries.iter().map(|c| {
            ElementSpec::new("li")
                .class(&m.list_item)
                .attr(&m.country_attribute, c.code)
                .attr("role", "option")
                .attr(TITLE_ATTRIBUTE, c.name)
                .attr(ARIA_LABEL_ATTRIBUTE, format!("{} {}", c.name, c.dial_code))
                .child(ElementSpec::new("span").class(&m.country_name).text(c.name))
                .child(ElementSpec::new("span").class(&m.dial_code).text(c.dial_code))
        });
        let spec = ElementSpec::new("ul")
            .class(&m.dropdown)
            .attr("role", "listbox")
            .children(items);

        let dropdown = self.document.create_tree(&spec);
        self.state.lock().dropdown = Some(dropdown);
        if let Err(err) = self.document.append_child(self.root, dropdown) {
            trace!(%err, "widget unmounted before dropdown rendered");
            self.state.lock().dropdown = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup(config: WidgetConfig) -> (Document, NodeId, PhoneInputWidget) {
        let doc = Document::new();
        let container = doc.create_element("div");
        doc.append_child(doc.root(), container).unwrap();
        let widget = PhoneInputWidget::mount(&doc, container, config).unwrap();
        (doc, container, widget)
    }

    #[test]
    fn synchronous_render_without_delay() {
        let (doc, container, widget) = setup(WidgetConfig {
            render_delay: Duration::ZERO,
            ..Default::default()
        });
        let m = WidgetMarkup::default();

        widget.toggle().unwrap();
        let dropdown = widget.dropdown().unwrap();
        assert_eq!(doc.query_selector(container, &m.dropdown_selector()), Some(dropdown));
        assert_eq!(
            doc.query_selector_all(dropdown, &m.item_selector()).len(),
            COUNTRIES.len()
        );

        widget.toggle().unwrap();
        assert_eq!(widget.dropdown(), None);
        assert_eq!(doc.query_selector(container, &m.dropdown_selector()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_render() {
        let (_doc, _container, widget) = setup(WidgetConfig::default());
        widget.toggle().unwrap();
        assert!(widget.is_open());
        assert_eq!(widget.dropdown(), None);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(widget.dropdown().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_before_render_cancels_it() {
        let (_doc, _container, widget) = setup(WidgetConfig::default());
        widget.toggle().unwrap();
        widget.toggle().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(widget.dropdown(), None);
    }

    #[test]
    fn value_and_change_handler() {
        let (_doc, _container, widget) = setup(WidgetConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        widget.on_change(move |v| {
            assert_eq!(v, "+34 600 000 000");
            c.fetch_add(1, Ordering::SeqCst);
        });
        widget.set_value("+34 600 000 000").unwrap();
        assert_eq!(widget.value(), "+34 600 000 000");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_cancels_render_and_listener() {
        let (doc, container, widget) = setup(WidgetConfig::default());
        widget.toggle().unwrap();
        assert_eq!(doc.listener_count(), 1);

        drop(widget);
        assert_eq!(doc.listener_count(), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let m = WidgetMarkup::default();
        assert_eq!(doc.query_selector(container, &m.dropdown_selector()), None);
        assert!(doc.query_selector(container, &m.button_selector()).is_some());
    }

    #[test]
    fn unmount_removes_markup() {
        let (doc, container, widget) = setup(WidgetConfig::default());
        assert_eq!(doc.children(container).len(), 1);
        widget.unmount().unwrap();
        assert!(doc.children(container).is_empty());
        assert_eq!(doc.listener_count(), 0);
    }
}
