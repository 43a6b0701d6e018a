//! The schema proxy capability (§4.5, §6.2): an abstract accessor over
//! XSD types/attributes/elements. The core performs no XSD parsing —
//! this trait is the only integration point, and callers who have no
//! schema simply never construct a `SchemaProxy` implementation.

use crate::arena::TypedValue;
use crate::QName;

/// A primitive or user-derived XSD simple type, named by its expanded
/// QName (e.g. `xs:integer`, `xs:string`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XsdTypeName(pub QName);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occurrence {
    One,
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
}

/// Declared type of an element or attribute, as seen by the static
/// analyzer (§3.3 "schema proxy").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaType {
    pub name: XsdTypeName,
    pub occurrence: Occurrence,
    pub nillable: bool,
}

/// Capability set `{get_type, get_attribute, get_element, is_instance,
/// cast_as, iter_atomic_types, get_primitive_type, bind_parser}` from
/// §4.5. No default XSD-backed implementation ships with this crate;
/// embedding applications that have schema support wire it in here.
pub trait SchemaProxy {
    fn get_type(&self, name: &QName) -> Option<SchemaType>;
    fn get_attribute(&self, name: &QName) -> Option<SchemaType>;
    fn get_element(&self, name: &QName) -> Option<SchemaType>;

    fn is_instance(&self, value: &TypedValue, type_name: &XsdTypeName) -> bool;
    fn cast_as(&self, value: &TypedValue, type_name: &XsdTypeName) -> Result<TypedValue, String>;

    fn iter_atomic_types(&self) -> Vec<XsdTypeName>;
    fn get_primitive_type(&self, type_name: &XsdTypeName) -> Option<XsdTypeName>;

    /// Seed a parser's in-scope types / constructor functions from this
    /// schema (§4.5 "can register constructor functions for atomic
    /// types"). Implemented against a minimal callback rather than a
    /// concrete parser type so this crate stays decoupled from `xpath`.
    fn bind_parser(&self, register_type: &mut dyn FnMut(XsdTypeName));
}
