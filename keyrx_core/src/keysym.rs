//! Keysym values.
//!
//! A keysym is the symbol a key level produces (a letter, a control function,
//! etc). This crate does not attempt to carry the full historical X keysym
//! name table (thousands of entries, many obsolete) — that firmly belongs to
//! the excluded rules-resolution/include-path layer. It carries a small,
//! load-bearing subset of commonly used keysyms, plus the ability to
//! round-trip any other keysym through its raw numeric form (`0x<hex>`
//! literal), which is all the canonical serializer needs.

use alloc::format;
use alloc::string::String;

/// A single keysym value, stored as its raw X keysym code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keysym(pub u32);

impl Keysym {
    /// The "no symbol" keysym: an empty level slot, or an interpret that
    /// matches regardless of symbol.
    pub const NO_SYMBOL: Keysym = Keysym(0);

    pub fn is_no_symbol(self) -> bool {
        self == Keysym::NO_SYMBOL
    }

    /// Looks up a keysym by its canonical text name (`"Escape"`, `"a"`,
    /// `"Caps_Lock"`, ...), falling back to parsing a `0x`-prefixed literal.
    pub fn from_name(name: &str) -> Option<Keysym> {
        if let Some(hex) = name.strip_prefix("0x") {
            return u32::from_str_radix(hex, 16).ok().map(Keysym);
        }
        NAME_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, code)| Keysym(*code))
    }

    /// Renders the canonical text name for this keysym, falling back to a
    /// `0x<hex>` literal for anything not in the small named table.
    pub fn name(self) -> String {
        if let Some((name, _)) = NAME_TABLE.iter().find(|(_, code)| *code == self.0) {
            String::from(*name)
        } else {
            format!("0x{:x}", self.0)
        }
    }
}

impl From<u32> for Keysym {
    fn from(value: u32) -> Self {
        Keysym(value)
    }
}

/// A small, fixed table covering the keysyms in common use. Anything
/// outside this table still round-trips correctly via its raw hex form.
const NAME_TABLE: &[(&str, u32)] = &[
    ("NoSymbol", 0x0000_0000),
    ("space", 0x0020),
    ("Escape", 0xff1b),
    ("Tab", 0xff09),
    ("Return", 0xff0d),
    ("Caps_Lock", 0xffe5),
    ("Num_Lock", 0xff7f),
    ("Shift_L", 0xffe1),
    ("Shift_R", 0xffe2),
    ("Control_L", 0xffe3),
    ("Control_R", 0xffe4),
    ("Alt_L", 0xffe9),
    ("Alt_R", 0xffea),
    ("Multi_key", 0xff20),
    ("ISO_Next_Group", 0xfe08),
    ("a", 0x0061),
    ("b", 0x0062),
    ("e", 0x0065),
    ("h", 0x0068),
    ("l", 0x006c),
    ("o", 0x006f),
    ("q", 0x0071),
    ("A", 0x0041),
    ("B", 0x0042),
    ("E", 0x0045),
    ("H", 0x0048),
    ("L", 0x004c),
    ("O", 0x004f),
    ("Q", 0x0051),
    ("0", 0x0030),
    ("1", 0x0031),
    ("5", 0x0035),
    ("6", 0x0036),
    ("equal", 0x003d),
    ("plus", 0x002b),
    ("KP_0", 0xffb0),
    ("KP_1", 0xffb1),
    ("KP_Equal", 0xffbd),
];
