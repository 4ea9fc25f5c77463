//! Typed chat events and the callback wire codec.
//!
//! Raw transport updates are decoded into [`Event`] at the boundary, so the
//! engine never branches on strings. Callback data keeps the compact wire
//! form (`buy_12`, `payment_upi_12`) the buttons were originally built with;
//! anything that fails to decode is dropped before it reaches the engine.

use crate::checkout::channel::MessageHandle;
use crate::entities::PaymentMethod;

/// Slash commands understood by the storefront.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Courses,
    Categories,
    Search,
    Purchases,
    Policy,
    Request,
    Cancel,
}

impl Command {
    /// Parses `/start`-style text, tolerating a trailing `@botname` suffix.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let command = text.trim().split_whitespace().next()?;
        let command = command.split('@').next()?;
        match command {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/courses" => Some(Self::Courses),
            "/categories" => Some(Self::Categories),
            "/search" => Some(Self::Search),
            "/purchases" => Some(Self::Purchases),
            "/policy" => Some(Self::Policy),
            "/request" => Some(Self::Request),
            "/cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Persistent reply-keyboard buttons. Pressing one arrives as plain text, so
/// each variant owns its exact label.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MenuButton {
    Courses,
    Categories,
    Search,
    Purchases,
    Policy,
    RequestCourse,
    Cancel,
}

impl MenuButton {
    pub const ALL: [Self; 6] = [
        Self::Courses,
        Self::Categories,
        Self::Search,
        Self::Purchases,
        Self::Policy,
        Self::RequestCourse,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Courses => "📚 Courses",
            Self::Categories => "🗂 Categories",
            Self::Search => "🔍 Search",
            Self::Purchases => "🛒 My Purchases",
            Self::Policy => "📜 Policy",
            Self::RequestCourse => "✉️ Request Course",
            Self::Cancel => "❌ Cancel",
        }
    }

    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "📚 Courses" => Some(Self::Courses),
            "🗂 Categories" => Some(Self::Categories),
            "🔍 Search" => Some(Self::Search),
            "🛒 My Purchases" => Some(Self::Purchases),
            "📜 Policy" => Some(Self::Policy),
            "✉️ Request Course" => Some(Self::RequestCourse),
            "❌ Cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Decoded inline-button press.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Show the detail card for a course (`course_<id>`)
    ViewCourse(i32),
    /// Start checkout for a course (`buy_<id>`)
    Buy(i32),
    /// Pick a payment method during checkout (`payment_<method>_<id>`)
    SelectPayment(PaymentMethod, i32),
    /// List the courses in a category (`cat_courses_<id>`)
    CategoryCourses(i32),
    /// Show the category menu (`show_cat_menu`)
    ShowCategoryMenu,
    /// Return to the course listing (`back_courses`)
    BackToCourses,
    /// Step back one screen (`back`)
    Back,
    /// Abandon the current flow (`cancel`)
    Cancel,
}

impl CallbackAction {
    /// Encodes the action into its callback-data wire form.
    #[must_use]
    pub fn encode(self) -> String {
        match self {
            Self::ViewCourse(id) => format!("course_{id}"),
            Self::Buy(id) => format!("buy_{id}"),
            Self::SelectPayment(method, id) => format!("payment_{}_{id}", method.as_str()),
            Self::CategoryCourses(id) => format!("cat_courses_{id}"),
            Self::ShowCategoryMenu => "show_cat_menu".to_string(),
            Self::BackToCourses => "back_courses".to_string(),
            Self::Back => "back".to_string(),
            Self::Cancel => "cancel".to_string(),
        }
    }

    /// Decodes callback data. Returns None for anything malformed so stale or
    /// forged button data dies at the boundary.
    #[must_use]
    pub fn decode(data: &str) -> Option<Self> {
        match data {
            "show_cat_menu" => return Some(Self::ShowCategoryMenu),
            "back_courses" => return Some(Self::BackToCourses),
            "back" => return Some(Self::Back),
            "cancel" => return Some(Self::Cancel),
            _ => {}
        }

        if let Some(rest) = data.strip_prefix("course_") {
            return rest.parse().ok().map(Self::ViewCourse);
        }
        if let Some(rest) = data.strip_prefix("buy_") {
            return rest.parse().ok().map(Self::Buy);
        }
        if let Some(rest) = data.strip_prefix("cat_courses_") {
            return rest.parse().ok().map(Self::CategoryCourses);
        }
        if let Some(rest) = data.strip_prefix("payment_") {
            // method names never contain '_', so split at the last one
            let (method, id) = rest.rsplit_once('_')?;
            return Some(Self::SelectPayment(
                PaymentMethod::parse(method)?,
                id.parse().ok()?,
            ));
        }
        None
    }
}

/// Reference to an image the transport can download (a provider file id).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRef(pub String);

/// One decoded update from the chat transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Command(Command),
    MenuButton(MenuButton),
    Text(String),
    Photo(ImageRef),
    /// An inline button press, with the handle of the message the button was
    /// attached to (when the transport can still see it) so navigation can
    /// edit screens in place.
    Callback(CallbackAction, Option<MessageHandle>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/search@course_store_bot"), Some(Command::Search));
        assert_eq!(Command::parse("  /cancel  "), Some(Command::Cancel));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("hello"), None);
    }

    #[test]
    fn test_menu_button_round_trip() {
        for button in MenuButton::ALL {
            assert_eq!(MenuButton::parse(button.label()), Some(button));
        }
        assert_eq!(MenuButton::parse("not a button"), None);
    }

    #[test]
    fn test_callback_wire_forms() {
        assert_eq!(CallbackAction::ViewCourse(7).encode(), "course_7");
        assert_eq!(
            CallbackAction::SelectPayment(PaymentMethod::Upi, 12).encode(),
            "payment_upi_12"
        );
        assert_eq!(CallbackAction::decode("buy_12"), Some(CallbackAction::Buy(12)));
        assert_eq!(
            CallbackAction::decode("payment_gift_3"),
            Some(CallbackAction::SelectPayment(PaymentMethod::Gift, 3))
        );
        assert_eq!(
            CallbackAction::decode("cat_courses_4"),
            Some(CallbackAction::CategoryCourses(4))
        );
        assert_eq!(CallbackAction::decode("show_cat_menu"), Some(CallbackAction::ShowCategoryMenu));
    }

    #[test]
    fn test_malformed_callbacks_rejected() {
        assert_eq!(CallbackAction::decode("buy_"), None);
        assert_eq!(CallbackAction::decode("buy_abc"), None);
        assert_eq!(CallbackAction::decode("payment_visa_3"), None);
        assert_eq!(CallbackAction::decode("payment_upi_"), None);
        assert_eq!(CallbackAction::decode("course_9999999999999999"), None);
        assert_eq!(CallbackAction::decode(""), None);
    }
}
