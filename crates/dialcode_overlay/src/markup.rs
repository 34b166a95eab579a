//! Class naming scheme of the phone widget
//!
//! The widget is third-party: its markup can't be changed, only located.
//! Every part the overlay touches is found through the names below.

use dialcode_dom::Selector;

/// Class prefix used by `react-international-phone`
pub const DEFAULT_CLASS_PREFIX: &str = "react-international-phone";

/// Tooltip attribute written on each country entry
pub const TITLE_ATTRIBUTE: &str = "title";

/// Accessible-label attribute written on each country entry
pub const ARIA_LABEL_ATTRIBUTE: &str = "aria-label";

/// Class and attribute names of the widget's rendered parts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetMarkup {
    /// Wrapper around the whole widget
    pub input_container: String,
    /// Toggle control that opens the country dropdown
    pub selector_button: String,
    /// The dropdown list
    pub dropdown: String,
    /// One country entry in the dropdown
    pub list_item: String,
    /// Child of an entry holding the display name
    pub country_name: String,
    /// Child of an entry holding the dial code (`+1`)
    pub dial_code: String,
    /// The phone number text input
    pub input: String,
    /// Attribute on each entry carrying its country code
    pub country_attribute: String,
}

impl WidgetMarkup {
    /// Derive every class name from a common prefix
    pub fn with_prefix(prefix: &str) -> Self {
        let dropdown = format!("{prefix}-country-selector-dropdown");
        Self {
            input_container: format!("{prefix}-input-container"),
            selector_button: format!("{prefix}-country-selector-button"),
            list_item: format!("{dropdown}__list-item"),
            country_name: format!("{dropdown}__list-item-country-name"),
            dial_code: format!("{dropdown}__list-item-dial-code"),
            dropdown,
            input: format!("{prefix}-input"),
            country_attribute: "data-country".to_string(),
        }
    }

    pub fn button_selector(&self) -> Selector {
        Selector::class(self.selector_button.as_str())
    }

    pub fn dropdown_selector(&self) -> Selector {
        Selector::class(self.dropdown.as_str())
    }

    /// Entries that carry a country code
    pub fn item_selector(&self) -> Selector {
        Selector::class(self.list_item.as_str()).and_attribute(self.country_attribute.as_str())
    }

    pub fn country_name_selector(&self) -> Selector {
        Selector::class(self.country_name.as_str())
    }

    pub fn dial_code_selector(&self) -> Selector {
        Selector::class(self.dial_code.as_str())
    }
}

impl Default for WidgetMarkup {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_CLASS_PREFIX)
    }
}
