//! Feature support tables.
//!
//! Each feature lists the first version of every engine that supports it.
//! An engine missing from a feature's table has no known support.

use crate::targets::{Browser, Browsers, version};
use crate::vendor_prefix::VendorPrefix;

/// A feature that may need rewriting for older engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Native style rule nesting.
    Nesting,
    /// `lab()` and `lch()`.
    LabColors,
    /// `oklab()` and `oklch()`.
    OklabColors,
    /// `#rrggbbaa` and `#rgba`.
    HexAlphaColors,
    /// The `inset` shorthand.
    InsetShorthand,
    /// `(width >= 600px)` in media queries.
    MediaRangeSyntax,
}

use Browser::*;

const NESTING: &[(Browser, u32)] = &[
    (Android, version(112, 0, 0)),
    (Chrome, version(112, 0, 0)),
    (Edge, version(112, 0, 0)),
    (Firefox, version(117, 0, 0)),
    (IosSafari, version(16, 5, 0)),
    (Opera, version(98, 0, 0)),
    (Safari, version(16, 5, 0)),
    (Samsung, version(23, 0, 0)),
];

const LAB_COLORS: &[(Browser, u32)] = &[
    (Android, version(111, 0, 0)),
    (Chrome, version(111, 0, 0)),
    (Edge, version(111, 0, 0)),
    (Firefox, version(113, 0, 0)),
    (IosSafari, version(15, 0, 0)),
    (Opera, version(97, 0, 0)),
    (Safari, version(15, 0, 0)),
    (Samsung, version(22, 0, 0)),
];

const OKLAB_COLORS: &[(Browser, u32)] = &[
    (Android, version(111, 0, 0)),
    (Chrome, version(111, 0, 0)),
    (Edge, version(111, 0, 0)),
    (Firefox, version(113, 0, 0)),
    (IosSafari, version(15, 4, 0)),
    (Opera, version(97, 0, 0)),
    (Safari, version(15, 4, 0)),
    (Samsung, version(22, 0, 0)),
];

const HEX_ALPHA_COLORS: &[(Browser, u32)] = &[
    (Android, version(62, 0, 0)),
    (Chrome, version(62, 0, 0)),
    (Edge, version(79, 0, 0)),
    (Firefox, version(49, 0, 0)),
    (IosSafari, version(9, 3, 0)),
    (Opera, version(49, 0, 0)),
    (Safari, version(10, 0, 0)),
    (Samsung, version(8, 0, 0)),
];

const INSET_SHORTHAND: &[(Browser, u32)] = &[
    (Android, version(87, 0, 0)),
    (Chrome, version(87, 0, 0)),
    (Edge, version(87, 0, 0)),
    (Firefox, version(66, 0, 0)),
    (IosSafari, version(14, 5, 0)),
    (Opera, version(73, 0, 0)),
    (Safari, version(14, 1, 0)),
    (Samsung, version(14, 0, 0)),
];

const MEDIA_RANGE_SYNTAX: &[(Browser, u32)] = &[
    (Android, version(104, 0, 0)),
    (Chrome, version(104, 0, 0)),
    (Edge, version(104, 0, 0)),
    (Firefox, version(63, 0, 0)),
    (IosSafari, version(16, 4, 0)),
    (Opera, version(91, 0, 0)),
    (Safari, version(16, 4, 0)),
    (Samsung, version(20, 0, 0)),
];

impl Feature {
    fn support(self) -> &'static [(Browser, u32)] {
        match self {
            Feature::Nesting => NESTING,
            Feature::LabColors => LAB_COLORS,
            Feature::OklabColors => OKLAB_COLORS,
            Feature::HexAlphaColors => HEX_ALPHA_COLORS,
            Feature::InsetShorthand => INSET_SHORTHAND,
            Feature::MediaRangeSyntax => MEDIA_RANGE_SYNTAX,
        }
    }

    /// Whether every targeted engine supports this feature.
    ///
    /// An empty target set is always compatible.
    pub fn is_compatible(self, targets: &Browsers) -> bool {
        let support = self.support();
        targets.iter().all(|(browser, target)| {
            support
                .iter()
                .find(|(b, _)| *b == browser)
                .is_some_and(|(_, min)| target >= *min)
        })
    }
}

/// Something that needs vendor prefixes in older engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefixed {
    UserSelect,
    Appearance,
    BackdropFilter,
    TextSizeAdjust,
    MaskImage,
    Hyphens,
    BoxDecorationBreak,
    /// The `sticky` value of `position`.
    Sticky,
    /// The `@keyframes` rule.
    Keyframes,
}

/// `prefix` is needed on `browser` below `unprefixed` (or always, if `None`).
struct PrefixRow {
    browser: Browser,
    prefix: VendorPrefix,
    unprefixed: Option<u32>,
}

const fn row(browser: Browser, prefix: VendorPrefix, unprefixed: Option<u32>) -> PrefixRow {
    PrefixRow {
        browser,
        prefix,
        unprefixed,
    }
}

const WEBKIT: VendorPrefix = VendorPrefix::WEBKIT;
const MOZ: VendorPrefix = VendorPrefix::MOZ;
const MS: VendorPrefix = VendorPrefix::MS;

const USER_SELECT: &[PrefixRow] = &[
    row(Android, WEBKIT, Some(version(54, 0, 0))),
    row(Chrome, WEBKIT, Some(version(54, 0, 0))),
    row(Edge, MS, Some(version(79, 0, 0))),
    row(Firefox, MOZ, Some(version(69, 0, 0))),
    row(Ie, MS, None),
    row(IosSafari, WEBKIT, None),
    row(Opera, WEBKIT, Some(version(41, 0, 0))),
    row(Safari, WEBKIT, None),
    row(Samsung, WEBKIT, Some(version(6, 2, 0))),
];

const APPEARANCE: &[PrefixRow] = &[
    row(Android, WEBKIT, Some(version(84, 0, 0))),
    row(Chrome, WEBKIT, Some(version(84, 0, 0))),
    row(Edge, WEBKIT, Some(version(84, 0, 0))),
    row(Firefox, MOZ, Some(version(80, 0, 0))),
    row(IosSafari, WEBKIT, Some(version(15, 4, 0))),
    row(Opera, WEBKIT, Some(version(70, 0, 0))),
    row(Safari, WEBKIT, Some(version(15, 4, 0))),
    row(Samsung, WEBKIT, Some(version(14, 0, 0))),
];

const BACKDROP_FILTER: &[PrefixRow] = &[
    row(IosSafari, WEBKIT, Some(version(18, 0, 0))),
    row(Safari, WEBKIT, Some(version(18, 0, 0))),
];

const TEXT_SIZE_ADJUST: &[PrefixRow] = &[
    row(Edge, MS, Some(version(79, 0, 0))),
    row(Firefox, MOZ, None),
    row(IosSafari, WEBKIT, None),
];

const MASK_IMAGE: &[PrefixRow] = &[
    row(Android, WEBKIT, Some(version(120, 0, 0))),
    row(Chrome, WEBKIT, Some(version(120, 0, 0))),
    row(Edge, WEBKIT, Some(version(120, 0, 0))),
    row(IosSafari, WEBKIT, Some(version(15, 4, 0))),
    row(Opera, WEBKIT, Some(version(106, 0, 0))),
    row(Safari, WEBKIT, Some(version(15, 4, 0))),
    row(Samsung, WEBKIT, Some(version(25, 0, 0))),
];

const HYPHENS: &[PrefixRow] = &[
    row(Edge, MS, Some(version(79, 0, 0))),
    row(Firefox, MOZ, Some(version(43, 0, 0))),
    row(Ie, MS, None),
    row(IosSafari, WEBKIT, Some(version(17, 0, 0))),
    row(Safari, WEBKIT, Some(version(17, 0, 0))),
];

const BOX_DECORATION_BREAK: &[PrefixRow] = &[
    row(Android, WEBKIT, Some(version(130, 0, 0))),
    row(Chrome, WEBKIT, Some(version(130, 0, 0))),
    row(Edge, WEBKIT, Some(version(130, 0, 0))),
    row(IosSafari, WEBKIT, None),
    row(Opera, WEBKIT, Some(version(116, 0, 0))),
    row(Safari, WEBKIT, None),
    row(Samsung, WEBKIT, None),
];

const STICKY: &[PrefixRow] = &[
    row(IosSafari, WEBKIT, Some(version(13, 0, 0))),
    row(Safari, WEBKIT, Some(version(13, 0, 0))),
];

const KEYFRAMES: &[PrefixRow] = &[
    row(Android, WEBKIT, Some(version(4, 4, 0))),
    row(Chrome, WEBKIT, Some(version(43, 0, 0))),
    row(Firefox, MOZ, Some(version(16, 0, 0))),
    row(IosSafari, WEBKIT, Some(version(9, 0, 0))),
    row(Opera, WEBKIT, Some(version(30, 0, 0))),
    row(Safari, WEBKIT, Some(version(9, 0, 0))),
];

impl Prefixed {
    /// The prefixable property with this unprefixed name, if any.
    pub fn from_property(name: &str) -> Option<Prefixed> {
        let prefixed = match name {
            "user-select" => Prefixed::UserSelect,
            "appearance" => Prefixed::Appearance,
            "backdrop-filter" => Prefixed::BackdropFilter,
            "text-size-adjust" => Prefixed::TextSizeAdjust,
            "mask-image" => Prefixed::MaskImage,
            "hyphens" => Prefixed::Hyphens,
            "box-decoration-break" => Prefixed::BoxDecorationBreak,
            _ => return None,
        };
        Some(prefixed)
    }

    fn rows(self) -> &'static [PrefixRow] {
        match self {
            Prefixed::UserSelect => USER_SELECT,
            Prefixed::Appearance => APPEARANCE,
            Prefixed::BackdropFilter => BACKDROP_FILTER,
            Prefixed::TextSizeAdjust => TEXT_SIZE_ADJUST,
            Prefixed::MaskImage => MASK_IMAGE,
            Prefixed::Hyphens => HYPHENS,
            Prefixed::BoxDecorationBreak => BOX_DECORATION_BREAK,
            Prefixed::Sticky => STICKY,
            Prefixed::Keyframes => KEYFRAMES,
        }
    }

    /// The prefixes the targeted engines need. Empty when none do.
    pub fn prefixes_for(self, targets: &Browsers) -> VendorPrefix {
        let mut prefixes = VendorPrefix::empty();
        for row in self.rows() {
            let Some(target) = targets.get(row.browser) else {
                continue;
            };
            let needed = match row.unprefixed {
                Some(unprefixed) => target < unprefixed,
                None => true,
            };
            if needed {
                prefixes |= row.prefix;
            }
        }
        prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_targets_compatible() {
        let targets = Browsers::default();
        assert!(Feature::Nesting.is_compatible(&targets));
        assert!(Feature::LabColors.is_compatible(&targets));
        assert!(Prefixed::UserSelect.prefixes_for(&targets).is_empty());
    }

    #[test]
    fn test_monotonic_at_boundary() {
        let at = Browsers::default().with(Browser::Chrome, version(112, 0, 0));
        let below = Browsers::default().with(Browser::Chrome, version(111, 9, 0));
        assert!(Feature::Nesting.is_compatible(&at));
        assert!(!Feature::Nesting.is_compatible(&below));
    }

    #[test]
    fn test_unknown_support_needs_rewrite() {
        let ie = Browsers::default().with(Browser::Ie, version(11, 0, 0));
        assert!(!Feature::Nesting.is_compatible(&ie));
        assert!(!Feature::HexAlphaColors.is_compatible(&ie));
    }

    #[test]
    fn test_any_engine_below_needs_rewrite() {
        let targets = Browsers::default()
            .with(Browser::Chrome, version(120, 0, 0))
            .with(Browser::Safari, version(4, 0, 0));
        assert!(!Feature::LabColors.is_compatible(&targets));
    }

    #[test]
    fn test_prefixes_for() {
        let targets = Browsers::default()
            .with(Browser::Safari, version(14, 0, 0))
            .with(Browser::Firefox, version(60, 0, 0))
            .with(Browser::Ie, version(11, 0, 0));
        assert_eq!(
            Prefixed::UserSelect.prefixes_for(&targets),
            VendorPrefix::WEBKIT | VendorPrefix::MOZ | VendorPrefix::MS
        );
        let modern = Browsers::default().with(Browser::Chrome, version(100, 0, 0));
        assert!(Prefixed::UserSelect.prefixes_for(&modern).is_empty());
        assert_eq!(
            Prefixed::BackdropFilter.prefixes_for(&targets),
            VendorPrefix::WEBKIT
        );
    }
}
