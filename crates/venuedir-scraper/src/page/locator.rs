use std::fmt;

/// Element-location strategy, kept as data so cascades can be declared as
/// lists and matched structurally by fakes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(String),
    XPath(String),
    /// ARIA role (explicit or implicit) with an accessible name, compared
    /// case-insensitively after whitespace normalisation.
    Role { role: String, name: String },
    /// Elements matching `tag` whose normalised text equals (or, when not
    /// `exact`, contains case-insensitively) `text`.
    Text { tag: String, text: String, exact: bool },
    /// `child` resolved relative to each match of `parent`.
    Within { parent: Box<Locator>, child: Box<Locator> },
}

impl Locator {
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    #[must_use]
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn text(tag: impl Into<String>, text: impl Into<String>, exact: bool) -> Self {
        Self::Text {
            tag: tag.into(),
            text: text.into(),
            exact,
        }
    }

    #[must_use]
    pub fn within(parent: Locator, child: Locator) -> Self {
        Self::Within {
            parent: Box::new(parent),
            child: Box::new(child),
        }
    }

    /// JavaScript expression evaluating to an `Array` of every element this
    /// locator matches under the node expression `root`, in document order.
    #[must_use]
    pub fn to_js_all(&self, root: &str) -> String {
        match self {
            Self::Css(selector) => {
                format!("Array.from({root}.querySelectorAll({}))", js_string(selector))
            }
            Self::XPath(expr) => format!(
                "((r) => {{ const s = document.evaluate({}, r, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < s.snapshotLength; i++) out.push(s.snapshotItem(i)); \
                 return out; }})({root})",
                js_string(expr)
            ),
            Self::Role { role, name } => format!(
                "Array.from({root}.querySelectorAll({})).filter((el) => \
                 (el.getAttribute('aria-label') || el.textContent || '')\
                 .replace(/\\s+/g, ' ').trim().toLowerCase() === {})",
                js_string(&role_selector(role)),
                js_string(&name.trim().to_lowercase())
            ),
            Self::Text { tag, text, exact } => {
                let test = if *exact {
                    format!("t === {}", js_string(text.trim()))
                } else {
                    format!(
                        "t.toLowerCase().includes({})",
                        js_string(&text.trim().to_lowercase())
                    )
                };
                format!(
                    "Array.from({root}.querySelectorAll({})).filter((el) => {{ \
                     const t = (el.textContent || '').replace(/\\s+/g, ' ').trim(); \
                     return {test}; }})",
                    js_string(tag)
                )
            }
            Self::Within { parent, child } => format!(
                "{}.flatMap((p) => {})",
                parent.to_js_all(root),
                child.to_js_all("p")
            ),
        }
    }

    /// JavaScript expression evaluating to the first match or `null`.
    #[must_use]
    pub fn to_js_first(&self, root: &str) -> String {
        format!("({}[0] || null)", self.to_js_all(root))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "css={selector}"),
            Self::XPath(expr) => write!(f, "xpath={expr}"),
            Self::Role { role, name } => write!(f, "role={role}[name={name:?}]"),
            Self::Text { tag, text, exact } => {
                let op = if *exact { "=" } else { "~=" };
                write!(f, "{tag}[text{op}{text:?}]")
            }
            Self::Within { parent, child } => write!(f, "{parent} >> {child}"),
        }
    }
}

/// CSS matching an ARIA role, including the native elements that carry it
/// implicitly.
fn role_selector(role: &str) -> String {
    let implicit = match role {
        "button" => "button, input[type=\"button\"], input[type=\"submit\"], ",
        "link" => "a[href], ",
        "heading" => "h1, h2, h3, h4, h5, h6, ",
        "listitem" => "li, ",
        "list" => "ul, ol, ",
        _ => "",
    };
    format!("{implicit}[role=\"{role}\"]")
}

fn js_string(value: &str) -> String {
    // JSON string literals are valid JavaScript string literals.
    serde_json::Value::String(value.to_string()).to_string()
}
