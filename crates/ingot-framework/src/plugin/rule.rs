//! Rule declarations: pattern → handler bindings with optional filters.

use ingot_core::EventFilter;
use regex::Regex;

/// Role required for a rule to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    /// Anyone.
    #[default]
    All,
    /// Configured master users only.
    Master,
    /// Group owner only.
    Owner,
    /// Group admins (and the owner).
    Admin,
}

/// A declarative pattern → handler binding.
///
/// Rules are declared by the plugin author and matched in declaration
/// order. The handler is addressed by name and dispatched through
/// [`Plugin::handle`](super::Plugin::handle).
///
/// ```rust,ignore
/// fn rules(&self) -> Vec<Rule> {
///     vec![
///         Rule::new(r"^#status$", "status"),
///         Rule::new(r"^#shutdown$", "shutdown").permission(Permission::Master),
///         Rule::new(r"^#heartbeat$", "heartbeat").quiet(),
///     ]
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    /// Compiled match pattern, tested against the normalized message text.
    pub pattern: Regex,
    /// Name of the handler this rule dispatches to.
    pub handler: String,
    /// Optional event-scope filter; `None` inherits the plugin's scope.
    pub event: Option<EventFilter>,
    /// Required role.
    pub permission: Permission,
    /// Whether matches of this rule are logged.
    pub log: bool,
}

impl Rule {
    /// Creates a rule binding `pattern` to the named handler.
    ///
    /// # Panics
    ///
    /// Panics when `pattern` is not a valid regex. Rule patterns are author
    /// literals; a bad one is a programming error caught at plugin load.
    pub fn new(pattern: &str, handler: impl Into<String>) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("valid rule pattern"),
            handler: handler.into(),
            event: None,
            permission: Permission::All,
            log: true,
        }
    }

    /// Restricts this rule to events matching the dotted filter expression.
    pub fn on(mut self, filter: &str) -> Self {
        self.event = Some(EventFilter::new(filter));
        self
    }

    /// Sets the required role.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    /// Disables match logging for this rule.
    pub fn quiet(mut self) -> Self {
        self.log = false;
        self
    }
}
