// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Classifier return types
//!
//! A return type is a tag drawn from a closed set plus an optional finite set of
//! allowed discrete values. `MIXED` and `MIXED_ARRAY` exist only as placeholders and
//! every operation rejects them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Tag of a classifier return type, in its canonical numeric order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTag {
    Discrete = 0,
    Real = 1,
    Mixed = 2,
    DiscreteArray = 3,
    RealArray = 4,
    MixedArray = 5,
    DiscreteGenerator = 6,
    RealGenerator = 7,
    MixedGenerator = 8,
}

/// Shape of what a classifier produces per example
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Scalar,
    Array,
    Generator,
}

impl TypeTag {
    pub const ALL: [TypeTag; 9] = [
        TypeTag::Discrete,
        TypeTag::Real,
        TypeTag::Mixed,
        TypeTag::DiscreteArray,
        TypeTag::RealArray,
        TypeTag::MixedArray,
        TypeTag::DiscreteGenerator,
        TypeTag::RealGenerator,
        TypeTag::MixedGenerator,
    ];

    /// Placeholder tags that must never appear in a computed type
    pub fn is_placeholder(self) -> bool {
        matches!(self, TypeTag::Mixed | TypeTag::MixedArray)
    }

    pub fn shape(self) -> Shape {
        match self {
            TypeTag::Discrete | TypeTag::Real | TypeTag::Mixed => Shape::Scalar,
            TypeTag::DiscreteArray | TypeTag::RealArray | TypeTag::MixedArray => Shape::Array,
            TypeTag::DiscreteGenerator | TypeTag::RealGenerator | TypeTag::MixedGenerator => Shape::Generator,
        }
    }

    pub fn is_discrete(self) -> bool {
        matches!(self, TypeTag::Discrete | TypeTag::DiscreteArray | TypeTag::DiscreteGenerator)
    }

    pub fn is_real(self) -> bool {
        matches!(self, TypeTag::Real | TypeTag::RealArray | TypeTag::RealGenerator)
    }

    /// True for tags whose classifiers emit features through sense statements
    pub fn senses(self) -> bool {
        self.shape() != Shape::Scalar
    }

    /// Generator tag of the same discreteness
    pub fn as_generator(self) -> TypeTag {
        if self.is_discrete() {
            TypeTag::DiscreteGenerator
        } else if self.is_real() {
            TypeTag::RealGenerator
        } else {
            TypeTag::MixedGenerator
        }
    }

    /// Keyword used in canonical renderings
    pub fn keyword(self) -> &'static str {
        match self {
            TypeTag::Discrete => "discrete",
            TypeTag::Real => "real",
            TypeTag::Mixed => "mixed",
            TypeTag::DiscreteArray => "discrete[]",
            TypeTag::RealArray => "real[]",
            TypeTag::MixedArray => "mixed[]",
            TypeTag::DiscreteGenerator => "discrete%",
            TypeTag::RealGenerator => "real%",
            TypeTag::MixedGenerator => "mixed%",
        }
    }
}

/// Errors raised by the type model; these indicate an internal inconsistency
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("No combination rule for {0:?} and {1:?}")]
    UntabulatedCombination(TypeTag, TypeTag),
}

/// Return type of a classifier expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassifierReturnType {
    pub tag: TypeTag,
    /// Allowed values of a discrete classifier; empty means unconstrained
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl ClassifierReturnType {
    pub fn new(tag: TypeTag) -> Self {
        Self { tag, values: Vec::new() }
    }

    pub fn discrete() -> Self {
        Self::new(TypeTag::Discrete)
    }

    pub fn real() -> Self {
        Self::new(TypeTag::Real)
    }

    /// Discrete type restricted to the given values
    pub fn discrete_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_values(TypeTag::Discrete, values)
    }

    pub fn with_values<I, S>(tag: TypeTag, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tag,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.tag.is_placeholder()
    }

    /// Whether a value of this type may be used where `wide` is expected
    pub fn is_containable_in(&self, wide: &ClassifierReturnType) -> bool {
        if self.tag.is_placeholder() || wide.tag.is_placeholder() {
            return false;
        }
        if self.tag == wide.tag {
            return wide.values.is_empty() || (!self.values.is_empty() && self.values.iter().all(|v| wide.values.contains(v)));
        }
        wide.tag == TypeTag::MixedGenerator && self.tag.shape() == Shape::Generator
    }

    /// Feature type each child of a generator of this type must produce
    ///
    /// `None` for mixed generators and for types that are not generators.
    pub fn element(&self) -> Option<ClassifierReturnType> {
        let tag = match self.tag {
            TypeTag::DiscreteGenerator => TypeTag::Discrete,
            TypeTag::RealGenerator => TypeTag::Real,
            _ => return None,
        };
        Some(ClassifierReturnType {
            tag,
            values: self.values.clone(),
        })
    }

    /// Whether a child of this type may feed a generator whose features are `element`
    ///
    /// The family must match. When both sides carry values, this type's values must
    /// be among the element's.
    pub fn fits_element(&self, element: &ClassifierReturnType) -> bool {
        if self.tag.is_placeholder() || self.tag.is_discrete() != element.tag.is_discrete() || self.tag.is_real() != element.tag.is_real() {
            return false;
        }
        element.values.is_empty() || self.values.is_empty() || self.values.iter().all(|v| element.values.contains(v))
    }

    /// Whether this type allows exactly `values`, ignoring order and repeats
    pub fn has_same_values(&self, values: &[String]) -> bool {
        let ours: BTreeSet<&String> = self.values.iter().collect();
        let theirs: BTreeSet<&String> = values.iter().collect();
        ours == theirs
    }

    /// Combine the types of two classifiers composed together
    pub fn combine(&self, other: &ClassifierReturnType) -> Result<TypeTag, TypeError> {
        combine_tags(self.tag, other.tag)
    }

    /// Type of a composite generator over the given children
    ///
    /// Values survive only when every child carries the same nonempty value set.
    pub fn composite<'a, I>(children: I) -> Result<Option<ClassifierReturnType>, TypeError>
    where
        I: IntoIterator<Item = &'a ClassifierReturnType>,
    {
        let mut children = children.into_iter();
        let Some(first) = children.next() else {
            return Ok(None);
        };
        let mut tag = combine_tags(first.tag, first.tag)?;
        let mut values = first.values.clone();
        for child in children {
            tag = combine_tags(tag, child.tag)?;
            if !child.has_same_values(&values) {
                values.clear();
            }
        }
        Ok(Some(ClassifierReturnType { tag, values }))
    }

    /// Type of the conjunction of two classifiers
    ///
    /// When both sides carry values the result carries their cross product,
    /// left values outermost.
    pub fn conjunction(left: &ClassifierReturnType, right: &ClassifierReturnType) -> Result<ClassifierReturnType, TypeError> {
        let tag = left.combine(right)?;
        let values = if left.values.is_empty() || right.values.is_empty() {
            Vec::new()
        } else {
            left.values.iter().flat_map(|l| right.values.iter().map(move |r| format!("{l}&{r}"))).collect()
        };
        Ok(ClassifierReturnType { tag, values })
    }
}

/// The ordered-pair combination table
pub fn combine_tags(a: TypeTag, b: TypeTag) -> Result<TypeTag, TypeError> {
    use TypeTag::*;

    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let combined = match (lo, hi) {
        (Discrete, Discrete) => Discrete,
        (Real, Real) => Real,
        (Discrete, DiscreteArray) | (DiscreteArray, DiscreteArray) => DiscreteArray,
        (Real, RealArray) | (RealArray, RealArray) => RealArray,
        (Discrete, DiscreteGenerator) | (DiscreteArray, DiscreteGenerator) | (DiscreteGenerator, DiscreteGenerator) => DiscreteGenerator,
        (Real, RealGenerator) | (RealArray, RealGenerator) | (RealGenerator, RealGenerator) => RealGenerator,
        (Discrete, Real)
        | (Discrete, RealArray)
        | (Discrete, RealGenerator)
        | (Real, DiscreteArray)
        | (Real, DiscreteGenerator)
        | (DiscreteArray, RealArray)
        | (DiscreteArray, RealGenerator)
        | (RealArray, DiscreteGenerator)
        | (DiscreteGenerator, RealGenerator) => MixedGenerator,
        (Discrete | Real | DiscreteArray | RealArray | DiscreteGenerator | RealGenerator | MixedGenerator, MixedGenerator) => MixedGenerator,
        _ => return Err(TypeError::UntabulatedCombination(lo, hi)),
    };
    Ok(combined)
}

impl fmt::Display for ClassifierReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag.keyword())?;
        if !self.values.is_empty() {
            let quoted: Vec<String> = self.values.iter().map(|v| format!("\"{v}\"")).collect();
            write!(f, "{{{}}}", quoted.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_tag() -> impl Strategy<Value = TypeTag> {
        prop::sample::select(TypeTag::ALL.iter().copied().filter(|t| !t.is_placeholder()).collect::<Vec<_>>())
    }

    fn any_type() -> impl Strategy<Value = ClassifierReturnType> {
        (valid_tag(), prop::collection::vec("[a-c]", 0..3)).prop_map(|(tag, values)| ClassifierReturnType { tag, values })
    }

    proptest! {
        #[test]
        fn test_combine_is_commutative(a in valid_tag(), b in valid_tag()) {
            prop_assert_eq!(combine_tags(a, b), combine_tags(b, a));
        }

        #[test]
        fn test_containment_is_reflexive(t in any_type()) {
            prop_assert!(t.is_containable_in(&t));
        }

        #[test]
        fn test_combine_never_yields_placeholder(a in valid_tag(), b in valid_tag()) {
            let combined = combine_tags(a, b).unwrap();
            prop_assert!(!combined.is_placeholder());
        }
    }

    #[test]
    fn test_every_valid_pair_is_tabulated() {
        for a in TypeTag::ALL.iter().filter(|t| !t.is_placeholder()) {
            for b in TypeTag::ALL.iter().filter(|t| !t.is_placeholder()) {
                assert!(combine_tags(*a, *b).is_ok(), "{a:?} x {b:?}");
            }
        }
    }

    #[test]
    fn test_placeholders_are_rejected() {
        assert_eq!(combine_tags(TypeTag::Mixed, TypeTag::Discrete), Err(TypeError::UntabulatedCombination(TypeTag::Discrete, TypeTag::Mixed)));
        assert!(combine_tags(TypeTag::MixedArray, TypeTag::MixedArray).is_err());
        assert!(!ClassifierReturnType::new(TypeTag::Mixed).is_containable_in(&ClassifierReturnType::new(TypeTag::Mixed)));
    }

    #[test]
    fn test_combination_table() {
        assert_eq!(combine_tags(TypeTag::Discrete, TypeTag::Discrete), Ok(TypeTag::Discrete));
        assert_eq!(combine_tags(TypeTag::DiscreteArray, TypeTag::Discrete), Ok(TypeTag::DiscreteArray));
        assert_eq!(combine_tags(TypeTag::RealGenerator, TypeTag::RealArray), Ok(TypeTag::RealGenerator));
        assert_eq!(combine_tags(TypeTag::Discrete, TypeTag::Real), Ok(TypeTag::MixedGenerator));
        assert_eq!(combine_tags(TypeTag::DiscreteGenerator, TypeTag::MixedGenerator), Ok(TypeTag::MixedGenerator));
    }

    #[test]
    fn test_containment() {
        let ab = ClassifierReturnType::discrete_of(["a", "b"]);
        let abc = ClassifierReturnType::discrete_of(["a", "b", "c"]);
        assert!(ab.is_containable_in(&ClassifierReturnType::discrete()));
        assert!(ab.is_containable_in(&abc));
        assert!(!abc.is_containable_in(&ab));
        assert!(!ClassifierReturnType::discrete().is_containable_in(&ab));

        let generator = ClassifierReturnType::new(TypeTag::DiscreteGenerator);
        assert!(!ClassifierReturnType::discrete().is_containable_in(&generator));
        assert!(!generator.is_containable_in(&ClassifierReturnType::discrete()));
        assert!(!ClassifierReturnType::new(TypeTag::DiscreteArray).is_containable_in(&generator));
        assert!(generator.is_containable_in(&ClassifierReturnType::new(TypeTag::MixedGenerator)));
    }

    #[test]
    fn test_composite_value_sets() {
        let ab = ClassifierReturnType::discrete_of(["a", "b"]);
        let x = ClassifierReturnType::discrete_of(["x"]);

        let same = ClassifierReturnType::composite([&ab, &ab]).unwrap().unwrap();
        assert_eq!(same, ClassifierReturnType::discrete_of(["a", "b"]));

        let ba = ClassifierReturnType::discrete_of(["b", "a"]);
        let reordered = ClassifierReturnType::composite([&ab, &ba]).unwrap().unwrap();
        assert_eq!(reordered, ClassifierReturnType::discrete_of(["a", "b"]));
        assert!(reordered.is_containable_in(&ba));

        let mixed = ClassifierReturnType::composite([&ab, &x]).unwrap().unwrap();
        assert_eq!(mixed, ClassifierReturnType::discrete());

        assert_eq!(ClassifierReturnType::composite([]).unwrap(), None);
    }

    #[test]
    fn test_generator_element_types() {
        let generator = ClassifierReturnType::with_values(TypeTag::DiscreteGenerator, ["a", "b"]);
        let element = generator.element().unwrap();
        assert_eq!(element, ClassifierReturnType::discrete_of(["a", "b"]));
        assert_eq!(ClassifierReturnType::new(TypeTag::MixedGenerator).element(), None);
        assert_eq!(ClassifierReturnType::discrete().element(), None);

        assert!(ClassifierReturnType::discrete_of(["b"]).fits_element(&element));
        assert!(ClassifierReturnType::new(TypeTag::DiscreteArray).fits_element(&element));
        assert!(!ClassifierReturnType::discrete_of(["z"]).fits_element(&element));
        assert!(!ClassifierReturnType::real().fits_element(&element));
    }

    #[test]
    fn test_conjunction_cross_product() {
        let left = ClassifierReturnType::discrete_of(["a", "b"]);
        let right = ClassifierReturnType::discrete_of(["x", "y"]);
        let joined = ClassifierReturnType::conjunction(&left, &right).unwrap();
        assert_eq!(joined.tag, TypeTag::Discrete);
        assert_eq!(joined.values, vec!["a&x", "a&y", "b&x", "b&y"]);

        let open = ClassifierReturnType::conjunction(&left, &ClassifierReturnType::discrete()).unwrap();
        assert!(open.values.is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(ClassifierReturnType::discrete_of(["a", "b"]).to_string(), "discrete{\"a\", \"b\"}");
        assert_eq!(ClassifierReturnType::new(TypeTag::RealGenerator).to_string(), "real%");
    }
}
