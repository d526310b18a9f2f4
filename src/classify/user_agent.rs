use woothee::parser::Parser;

const UNKNOWN: &str = "Unknown";
/// Placeholder woothee reports for fields it cannot determine
const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

/// What kind of client a user agent belongs to.
///
/// Resolved with a fixed precedence: bot, tablet, mobile, desktop, other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitorKind {
    Bot,
    Tablet,
    Mobile,
    Desktop,
    Other,
}

impl VisitorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorKind::Bot => "bot",
            VisitorKind::Tablet => "tablet",
            VisitorKind::Mobile => "mobile",
            VisitorKind::Desktop => "desktop",
            VisitorKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentFacts {
    pub kind: VisitorKind,
    pub browser: String,
    pub os: String,
}

impl UserAgentFacts {
    fn unknown() -> Self {
        Self {
            kind: VisitorKind::Other,
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.kind == VisitorKind::Bot
    }

    /// Device class of a non-bot visitor: mobile, tablet, desktop or other
    pub fn device_class(&self) -> &'static str {
        match self.kind {
            VisitorKind::Bot => VisitorKind::Other.as_str(),
            kind => kind.as_str(),
        }
    }
}

/// User-agent classifier backed by woothee
pub struct UserAgentClassifier {
    parser: Parser,
}

impl UserAgentClassifier {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    pub fn classify(&self, ua: &str) -> UserAgentFacts {
        if ua.trim().is_empty() {
            return UserAgentFacts::unknown();
        }
        let Some(result) = self.parser.parse(ua) else {
            return UserAgentFacts::unknown();
        };

        let kind = if result.category == "crawler" {
            VisitorKind::Bot
        } else if is_tablet(ua, result.os) {
            VisitorKind::Tablet
        } else if matches!(result.category, "smartphone" | "mobilephone") {
            VisitorKind::Mobile
        } else if result.category == "pc" {
            VisitorKind::Desktop
        } else {
            VisitorKind::Other
        };

        UserAgentFacts {
            kind,
            browser: known_or_unknown(result.name),
            os: known_or_unknown(result.os),
        }
    }
}

impl Default for UserAgentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// woothee files tablets under "smartphone"
fn is_tablet(ua: &str, os: &str) -> bool {
    os == "iPad" || ua.contains("Tablet") || (os == "Android" && !ua.contains("Mobile"))
}

fn known_or_unknown(value: &str) -> String {
    if value.is_empty() || value == WOOTHEE_UNKNOWN {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
    const GOOGLEBOT: &str =
        "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

    #[test]
    fn test_empty_user_agent_is_unknown() {
        let classifier = UserAgentClassifier::new();
        for ua in ["", "   "] {
            let facts = classifier.classify(ua);
            assert_eq!(facts.kind, VisitorKind::Other);
            assert_eq!(facts.browser, "Unknown");
            assert_eq!(facts.os, "Unknown");
            assert!(!facts.is_bot());
        }
    }

    #[test]
    fn test_desktop_browser() {
        let facts = UserAgentClassifier::new().classify(CHROME_WINDOWS);
        assert_eq!(facts.kind, VisitorKind::Desktop);
        assert_eq!(facts.browser, "Chrome");
        assert!(facts.os.starts_with("Windows"));
    }

    #[test]
    fn test_mobile_and_tablet() {
        let classifier = UserAgentClassifier::new();
        assert_eq!(classifier.classify(SAFARI_IPHONE).kind, VisitorKind::Mobile);
        assert_eq!(classifier.classify(SAFARI_IPAD).kind, VisitorKind::Tablet);
        assert_eq!(classifier.classify(SAFARI_IPAD).device_class(), "tablet");
    }

    #[test]
    fn test_crawler_is_bot() {
        let facts = UserAgentClassifier::new().classify(GOOGLEBOT);
        assert!(facts.is_bot());
        assert_eq!(facts.browser, "Googlebot");
    }

    #[test]
    fn test_unrecognised_agent_is_other() {
        let facts = UserAgentClassifier::new().classify("UA-A");
        assert_eq!(facts.kind, VisitorKind::Other);
        assert_eq!(facts.browser, "Unknown");
        assert!(!facts.is_bot());
    }
}
