//! Compatibility-flag bitset (C10, supplement): independent feature
//! bits plus a mutually-exclusive JS-dialect subfield, with a textual
//! parser/formatter modeled on a shell's `-X` style compat-flag table.

use crate::error::EngineError;

const BIT_262_3B: u32 = 1 << 0;
const BIT_SGMLCOM: u32 = 1 << 1;
const BIT_UTF_UNSAFE: u32 = 1 << 2;
const BIT_ERRATA: u32 = 1 << 3;

const JS_SHIFT: u32 = 8;
const JS_MASK: u32 = 0b111 << JS_SHIFT;

fn js_level(n: u32) -> u32 {
    n << JS_SHIFT
}

const JS11: u32 = js_level(1);
const JS12: u32 = js_level(2);
const JS13: u32 = js_level(3);
const JS14: u32 = js_level(4);
const JS15: u32 = js_level(5);

/// Independent bits plus a mutually-exclusive `js1x` subfield.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CompatFlags(u32);

impl CompatFlags {
    pub const EMPTY: CompatFlags = CompatFlags(0);

    pub const FLAG_262_3B: CompatFlags = CompatFlags(BIT_262_3B);
    pub const FLAG_SGMLCOM: CompatFlags = CompatFlags(BIT_SGMLCOM);
    pub const FLAG_UTF_UNSAFE: CompatFlags = CompatFlags(BIT_UTF_UNSAFE);
    pub const FLAG_ERRATA: CompatFlags = CompatFlags(BIT_ERRATA);

    pub const JS11: CompatFlags = CompatFlags(JS11);
    pub const JS12: CompatFlags = CompatFlags(JS12);
    pub const JS13: CompatFlags = CompatFlags(JS13);
    pub const JS14: CompatFlags = CompatFlags(JS14);
    pub const JS15: CompatFlags = CompatFlags(JS15);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn from_bits(bits: u32) -> Self {
        CompatFlags(bits)
    }

    pub fn contains(self, other: CompatFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, flag: CompatFlags) {
        if flag.0 & JS_MASK != 0 {
            self.0 = (self.0 & !JS_MASK) | (flag.0 & JS_MASK);
        } else {
            self.0 |= flag.0;
        }
    }

    pub fn clear(&mut self, flag: CompatFlags) {
        self.0 &= !flag.0;
    }

    pub fn js_level(self) -> u32 {
        (self.0 & JS_MASK) >> JS_SHIFT
    }

    /// `instanceof`'s fallback path is only defined from JS 1.4 on.
    pub fn at_least_js14(self) -> bool {
        self.js_level() >= 4
    }

    fn name_for(name: &str) -> Option<CompatFlags> {
        Some(match name {
            "262_3b" => Self::FLAG_262_3B,
            "sgmlcom" => Self::FLAG_SGMLCOM,
            "utf_unsafe" => Self::FLAG_UTF_UNSAFE,
            "errata" => Self::FLAG_ERRATA,
            "js11" => Self::JS11,
            "js12" => Self::JS12,
            "js13" => Self::JS13,
            "js14" => Self::JS14,
            "js15" => Self::JS15,
            _ => return None,
        })
    }

    fn flag_names() -> &'static [(&'static str, CompatFlags)] {
        &[
            ("262_3b", Self::FLAG_262_3B),
            ("sgmlcom", Self::FLAG_SGMLCOM),
            ("utf_unsafe", Self::FLAG_UTF_UNSAFE),
            ("errata", Self::FLAG_ERRATA),
        ]
    }

    fn js_name(self) -> Option<&'static str> {
        match self.js_level() {
            1 => Some("js11"),
            2 => Some("js12"),
            3 => Some("js13"),
            4 => Some("js14"),
            5 => Some("js15"),
            _ => None,
        }
    }

    /// Parses a whitespace-separated list of flag names, each
    /// optionally prefixed `no_`. Seeded from `current` if the first
    /// token is exactly `=`; otherwise seeded from `CompatFlags::EMPTY`.
    /// An unknown name is a typed `EngineError`, not a side-effecting
    /// print-and-abort.
    pub fn parse(current: CompatFlags, text: &str) -> Result<CompatFlags, EngineError> {
        let mut tokens = text.split_whitespace().peekable();
        let mut result = if tokens.peek() == Some(&"=") {
            tokens.next();
            current
        } else {
            CompatFlags::EMPTY
        };

        for token in tokens {
            let (negate, name) = match token.strip_prefix("no_") {
                Some(rest) => (true, rest),
                None => (false, token),
            };
            let flag = Self::name_for(name).ok_or_else(|| EngineError::UnknownCompatFlag(token.to_string()))?;
            if negate {
                result.clear(flag);
            } else {
                result.set(flag);
            }
        }
        Ok(result)
    }

    /// Always begins with `=`, followed by the set flag names, space
    /// separated.
    pub fn to_compat_string(self) -> String {
        let mut parts = vec!["=".to_string()];
        if let Some(js) = self.js_name() {
            parts.push(js.to_string());
        }
        for (name, flag) in Self::flag_names() {
            if self.contains(*flag) {
                parts.push(name.to_string());
            }
        }
        parts.join(" ")
    }
}

impl std::ops::BitOr for CompatFlags {
    type Output = CompatFlags;
    fn bitor(self, rhs: CompatFlags) -> CompatFlags {
        if rhs.0 & JS_MASK != 0 {
            CompatFlags((self.0 & !JS_MASK) | rhs.0)
        } else {
            CompatFlags(self.0 | rhs.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reseeds_from_current_and_toggles_flags() {
        let current = CompatFlags::FLAG_ERRATA | CompatFlags::JS12;
        let parsed = CompatFlags::parse(current, "= js14 sgmlcom no_errata").expect("parses");
        assert!(parsed.contains(CompatFlags::JS14));
        assert!(parsed.contains(CompatFlags::FLAG_SGMLCOM));
        assert!(!parsed.contains(CompatFlags::FLAG_ERRATA));
        assert_eq!(parsed.js_level(), 4);
    }

    #[test]
    fn parse_without_leading_equals_starts_from_empty() {
        let current = CompatFlags::FLAG_ERRATA;
        let parsed = CompatFlags::parse(current, "sgmlcom").expect("parses");
        assert!(parsed.contains(CompatFlags::FLAG_SGMLCOM));
        assert!(!parsed.contains(CompatFlags::FLAG_ERRATA));
    }

    #[test]
    fn unknown_flag_name_is_a_typed_error() {
        let result = CompatFlags::parse(CompatFlags::EMPTY, "bogus_flag");
        assert!(matches!(result, Err(EngineError::UnknownCompatFlag(name)) if name == "bogus_flag"));
    }

    #[test]
    fn to_compat_string_round_trips_through_parse() {
        let flags = CompatFlags::FLAG_UTF_UNSAFE | CompatFlags::JS13;
        let text = flags.to_compat_string();
        assert!(text.starts_with('='));
        let reparsed = CompatFlags::parse(CompatFlags::EMPTY, &text).expect("parses own output");
        assert_eq!(reparsed, flags);
    }

    #[test]
    fn js_levels_are_mutually_exclusive() {
        let mut flags = CompatFlags::JS11;
        flags.set(CompatFlags::JS15);
        assert_eq!(flags.js_level(), 5);
        assert!(!flags.contains(CompatFlags::JS11));
    }
}
