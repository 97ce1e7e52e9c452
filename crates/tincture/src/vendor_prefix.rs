//! Vendor prefixes.

use bitflags::bitflags;

bitflags! {
    /// A set of vendor prefixes.
    ///
    /// The empty set means "unprefixed".
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VendorPrefix: u8 {
        const WEBKIT = 0b0001;
        const MOZ    = 0b0010;
        const MS     = 0b0100;
        const O      = 0b1000;
    }
}

impl VendorPrefix {
    /// Split a leading vendor prefix off a name.
    ///
    /// `-webkit-user-select` gives `(WEBKIT, "user-select")`; names without a
    /// known prefix come back unchanged with the empty set.
    pub fn strip(name: &str) -> (VendorPrefix, &str) {
        for (prefix, text) in [
            (VendorPrefix::WEBKIT, "-webkit-"),
            (VendorPrefix::MOZ, "-moz-"),
            (VendorPrefix::MS, "-ms-"),
            (VendorPrefix::O, "-o-"),
        ] {
            let matches = name.len() > text.len()
                && name
                    .get(..text.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(text));
            if matches {
                return (prefix, &name[text.len()..]);
            }
        }
        (VendorPrefix::empty(), name)
    }

    /// The prefix text of a single-flag value; empty for the empty set.
    pub fn as_str(self) -> &'static str {
        if self == VendorPrefix::WEBKIT {
            "-webkit-"
        } else if self == VendorPrefix::MOZ {
            "-moz-"
        } else if self == VendorPrefix::MS {
            "-ms-"
        } else if self == VendorPrefix::O {
            "-o-"
        } else {
            ""
        }
    }

    /// The individual prefixes in this set, in output order.
    pub fn each(self) -> impl Iterator<Item = VendorPrefix> {
        [
            VendorPrefix::WEBKIT,
            VendorPrefix::MOZ,
            VendorPrefix::MS,
            VendorPrefix::O,
        ]
        .into_iter()
        .filter(move |p| self.contains(*p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip() {
        assert_eq!(
            VendorPrefix::strip("-webkit-user-select"),
            (VendorPrefix::WEBKIT, "user-select")
        );
        assert_eq!(
            VendorPrefix::strip("-MOZ-appearance"),
            (VendorPrefix::MOZ, "appearance")
        );
        assert_eq!(VendorPrefix::strip("-o-x"), (VendorPrefix::O, "x"));
        assert_eq!(
            VendorPrefix::strip("color"),
            (VendorPrefix::empty(), "color")
        );
        assert_eq!(
            VendorPrefix::strip("-webkit-"),
            (VendorPrefix::empty(), "-webkit-")
        );
    }

    #[test]
    fn test_each_order() {
        let all = VendorPrefix::MS | VendorPrefix::WEBKIT | VendorPrefix::MOZ;
        let order: Vec<_> = all.each().map(|p| p.as_str()).collect();
        assert_eq!(order, vec!["-webkit-", "-moz-", "-ms-"]);
    }
}
