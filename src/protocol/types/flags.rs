//! Multi-valued wire fields held as bit sets
//!
//! Repeated enumeration elements (`authMethods`, `parkingRestriction`) are
//! folded into a [`FlagSet`]. Tokens outside the vocabulary set the type's
//! unknown sentinel bit, which [`FlagSet::expand`] never yields.

use std::fmt;
use std::marker::PhantomData;

use crate::protocol::codec::{text_element, FieldReader};
use crate::protocol::xml::XElement;

pub trait Flag: Copy + Eq + fmt::Debug + 'static {
    /// Every flag, in wire order. At most 32.
    const FLAGS: &'static [Self];
    /// Sentinel recorded for unrecognized tokens
    const UNKNOWN: Self;

    fn bit(self) -> u32 {
        let index = Self::FLAGS
            .iter()
            .position(|f| *f == self)
            .unwrap_or_default();
        1 << index
    }

    fn from_token(token: &str) -> Self;

    fn token(self) -> &'static str;
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagSet<F: Flag> {
    bits: u32,
    marker: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    pub fn empty() -> Self {
        Self::from_bits(0)
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            bits,
            marker: PhantomData,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn insert(&mut self, flag: F) {
        self.bits |= flag.bit();
    }

    pub fn with(mut self, flag: F) -> Self {
        self.insert(flag);
        self
    }

    pub fn contains(&self, flag: F) -> bool {
        self.bits & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn has_unknown(&self) -> bool {
        self.contains(F::UNKNOWN)
    }

    /// Set flags in declaration order, without the unknown sentinel.
    pub fn expand(&self) -> Vec<F> {
        F::FLAGS
            .iter()
            .copied()
            .filter(|f| *f != F::UNKNOWN && self.contains(*f))
            .collect()
    }

    /// OR of every member's bit.
    pub fn compress(flags: &[F]) -> Self {
        flags.iter().copied().collect()
    }

    pub(crate) fn read(fields: &FieldReader<'_>, field: &'static str) -> Self {
        fields
            .children(field)
            .iter()
            .map(|c| F::from_token(c.element().text().trim()))
            .collect()
    }

    pub(crate) fn write(&self, namespace: &str, field: &str) -> Vec<XElement> {
        self.expand()
            .into_iter()
            .map(|f| text_element(namespace, field, f.token()))
            .collect()
    }
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Flag> FromIterator<F> for FlagSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let mut set = Self::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl<F: Flag> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        set.entries(self.expand());
        if self.has_unknown() {
            set.entry(&F::UNKNOWN);
        }
        set.finish()
    }
}

/// Implements [`Flag`] for a `wire_enum!` type with an `Unknown` variant.
macro_rules! wire_flags {
    ($name:ident) => {
        impl $crate::protocol::types::flags::Flag for $name {
            const FLAGS: &'static [Self] = $name::ALL;
            const UNKNOWN: Self = $name::Unknown;

            fn from_token(token: &str) -> Self {
                token.parse().unwrap_or($name::Unknown)
            }

            fn token(self) -> &'static str {
                self.as_wire()
            }
        }
    };
}

pub(crate) use wire_flags;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::wire_enum;
    use crate::protocol::namespaces::OCHP;

    wire_enum! {
        enum Shape {
            Unknown => "Unknown",
            Round => "round",
            Square => "square",
            Flat => "flat",
        }
    }

    wire_flags!(Shape);

    #[test]
    fn expand_skips_unknown_sentinel() {
        let set = FlagSet::compress(&[Shape::Flat, Shape::Unknown, Shape::Round]);
        assert!(set.has_unknown());
        assert_eq!(set.expand(), vec![Shape::Round, Shape::Flat]);
        assert_eq!(set.bits(), 0b1011);
    }

    #[test]
    fn compress_is_or_of_members() {
        let set = FlagSet::compress(&[Shape::Square, Shape::Square]);
        assert_eq!(set, FlagSet::empty().with(Shape::Square));
        assert!(!set.contains(Shape::Round));
        assert!(FlagSet::<Shape>::compress(&[]).is_empty());
    }

    #[test]
    fn unrecognized_tokens_set_unknown_bit() {
        let el = XElement::parse_str(
            r#"<x xmlns="http://ochp.eu/1.4"><s>square</s><s>hexagon</s><t>round</t></x>"#,
        )
        .unwrap();
        let set: FlagSet<Shape> = FlagSet::read(&FieldReader::new(&el, OCHP), "s");
        assert_eq!(set.expand(), vec![Shape::Square]);
        assert!(set.has_unknown());

        let written = set.write(OCHP, "s");
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].text(), "square");
    }
}
