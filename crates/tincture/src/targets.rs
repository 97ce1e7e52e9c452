//! Browser targets: per-engine minimum versions.

use serde::{Deserialize, Serialize};

use crate::error::CssError;

/// Pack a version as `major << 16 | minor << 8 | patch`.
pub const fn version(major: u8, minor: u8, patch: u8) -> u32 {
    (major as u32) << 16 | (minor as u32) << 8 | patch as u32
}

/// Format a packed version as `major[.minor[.patch]]`.
pub fn format_version(version: u32) -> String {
    let major = version >> 16;
    let minor = (version >> 8) & 0xff;
    let patch = version & 0xff;
    match (minor, patch) {
        (0, 0) => format!("{major}"),
        (_, 0) => format!("{major}.{minor}"),
        _ => format!("{major}.{minor}.{patch}"),
    }
}

/// Parse `major[.minor[.patch]]` into a packed version.
pub fn parse_version(text: &str) -> Option<u32> {
    let mut parts = text.split('.');
    let major = parts.next()?.parse::<u8>().ok()?;
    let minor = match parts.next() {
        Some(part) => part.parse::<u8>().ok()?,
        None => 0,
    };
    let patch = match parts.next() {
        Some(part) => part.parse::<u8>().ok()?,
        None => 0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(version(major, minor, patch))
}

/// A browser engine that can be targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Android,
    Chrome,
    Edge,
    Firefox,
    Ie,
    IosSafari,
    Opera,
    Safari,
    Samsung,
}

impl Browser {
    /// All engines, in declaration order.
    pub const ALL: [Browser; 9] = [
        Browser::Android,
        Browser::Chrome,
        Browser::Edge,
        Browser::Firefox,
        Browser::Ie,
        Browser::IosSafari,
        Browser::Opera,
        Browser::Safari,
        Browser::Samsung,
    ];

    /// The canonical query name.
    pub fn name(self) -> &'static str {
        match self {
            Browser::Android => "android",
            Browser::Chrome => "chrome",
            Browser::Edge => "edge",
            Browser::Firefox => "firefox",
            Browser::Ie => "ie",
            Browser::IosSafari => "ios_saf",
            Browser::Opera => "opera",
            Browser::Safari => "safari",
            Browser::Samsung => "samsung",
        }
    }

    /// Look up an engine by query name or alias, case-insensitively.
    pub fn from_name(name: &str) -> Option<Browser> {
        let browser = match name.to_ascii_lowercase().as_str() {
            "android" => Browser::Android,
            "chrome" => Browser::Chrome,
            "edge" => Browser::Edge,
            "firefox" | "ff" => Browser::Firefox,
            "ie" => Browser::Ie,
            "ios_saf" | "ios" | "ios_safari" => Browser::IosSafari,
            "opera" => Browser::Opera,
            "safari" => Browser::Safari,
            "samsung" => Browser::Samsung,
            _ => return None,
        };
        Some(browser)
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Minimum supported version per engine.
///
/// An engine left as `None` imposes no constraint. When every engine is
/// `None` nothing is rewritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Browsers {
    pub android: Option<u32>,
    pub chrome: Option<u32>,
    pub edge: Option<u32>,
    pub firefox: Option<u32>,
    pub ie: Option<u32>,
    pub ios_saf: Option<u32>,
    pub opera: Option<u32>,
    pub safari: Option<u32>,
    pub samsung: Option<u32>,
}

impl Browsers {
    /// The minimum version targeted for `browser`.
    pub fn get(&self, browser: Browser) -> Option<u32> {
        match browser {
            Browser::Android => self.android,
            Browser::Chrome => self.chrome,
            Browser::Edge => self.edge,
            Browser::Firefox => self.firefox,
            Browser::Ie => self.ie,
            Browser::IosSafari => self.ios_saf,
            Browser::Opera => self.opera,
            Browser::Safari => self.safari,
            Browser::Samsung => self.samsung,
        }
    }

    /// Set the minimum version for `browser`.
    pub fn set(&mut self, browser: Browser, version: Option<u32>) {
        let slot = match browser {
            Browser::Android => &mut self.android,
            Browser::Chrome => &mut self.chrome,
            Browser::Edge => &mut self.edge,
            Browser::Firefox => &mut self.firefox,
            Browser::Ie => &mut self.ie,
            Browser::IosSafari => &mut self.ios_saf,
            Browser::Opera => &mut self.opera,
            Browser::Safari => &mut self.safari,
            Browser::Samsung => &mut self.samsung,
        };
        *slot = version;
    }

    /// Builder-style [`Browsers::set`].
    pub fn with(mut self, browser: Browser, version: u32) -> Self {
        self.set(browser, Some(version));
        self
    }

    /// Whether no engine is targeted.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Targeted engines and their minimum versions.
    pub fn iter(&self) -> impl Iterator<Item = (Browser, u32)> + '_ {
        Browser::ALL
            .into_iter()
            .filter_map(|browser| self.get(browser).map(|v| (browser, v)))
    }

    /// Resolve a comma-separated query such as `chrome 90, safari >= 13.1`.
    ///
    /// When a browser appears more than once the lowest version wins.
    pub fn from_query(query: &str) -> Result<Browsers, CssError> {
        let mut browsers = Browsers::default();
        let mut any = false;

        for entry in query.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                return Err(CssError::target("empty query entry"));
            }
            let mut words = entry.split_whitespace();
            let name = words.next().unwrap_or_default();
            let browser = Browser::from_name(name)
                .ok_or_else(|| CssError::target(format!("unknown browser `{name}`")))?;

            let mut version_text = words
                .next()
                .ok_or_else(|| CssError::target(format!("missing version for `{name}`")))?;
            if version_text == ">=" {
                version_text = words
                    .next()
                    .ok_or_else(|| CssError::target(format!("missing version for `{name}`")))?;
            } else if let Some(rest) = version_text.strip_prefix(">=") {
                version_text = rest;
            }
            if let Some(extra) = words.next() {
                return Err(CssError::target(format!("unexpected `{extra}` in `{entry}`")));
            }
            let version = parse_version(version_text).ok_or_else(|| {
                CssError::target(format!("invalid version `{version_text}` for `{name}`"))
            })?;

            let lowest = match browsers.get(browser) {
                Some(existing) => existing.min(version),
                None => version,
            };
            browsers.set(browser, Some(lowest));
            any = true;
        }

        if !any {
            return Err(CssError::target("empty query"));
        }
        tracing::debug!(?browsers, "resolved targets");
        Ok(browsers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_version_packing() {
        assert_eq!(version(13, 1, 0), 13 << 16 | 1 << 8);
        assert!(version(13, 1, 0) > version(13, 0, 9));
        assert!(version(14, 0, 0) > version(13, 255, 255));
        assert_eq!(format_version(version(13, 1, 0)), "13.1");
        assert_eq!(format_version(version(90, 0, 0)), "90");
        assert_eq!(format_version(version(15, 4, 2)), "15.4.2");
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("4"), Some(version(4, 0, 0)));
        assert_eq!(parse_version("16.5"), Some(version(16, 5, 0)));
        assert_eq!(parse_version("1.2.3"), Some(version(1, 2, 3)));
        assert_eq!(parse_version("1.2.3.4"), None);
        assert_eq!(parse_version("x"), None);
        assert_eq!(parse_version("300"), None);
    }

    #[test]
    fn test_empty_matrix() {
        let browsers = Browsers::default();
        assert!(browsers.is_empty());
        assert_eq!(browsers.iter().count(), 0);
    }

    #[test]
    fn test_query() {
        let browsers = Browsers::from_query("chrome 90, safari >= 13.1, ff 78").unwrap();
        assert_eq!(browsers.chrome, Some(version(90, 0, 0)));
        assert_eq!(browsers.safari, Some(version(13, 1, 0)));
        assert_eq!(browsers.firefox, Some(version(78, 0, 0)));
        assert_eq!(browsers.ie, None);
    }

    #[test]
    fn test_query_keeps_lowest() {
        let browsers = Browsers::from_query("ios 15, ios_saf 12.2, ios_safari >=14").unwrap();
        assert_eq!(browsers.ios_saf, Some(version(12, 2, 0)));
    }

    #[test]
    fn test_query_errors() {
        for query in ["", "  ", "netscape 4", "chrome", "chrome x", "chrome 90 extra", "chrome 90,"] {
            let err = Browsers::from_query(query).unwrap_err();
            assert!(
                matches!(err.kind, ErrorKind::TargetResolution(_)),
                "{query:?} gave {err}"
            );
        }
    }
}
