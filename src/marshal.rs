//! Table-driven mapping between XML elements and typed models.
//!
//! Each model field's XML shape follows from its Rust type alone:
//!
//! | Rust type            | Shape              | Wire form                        |
//! |----------------------|--------------------|----------------------------------|
//! | `Vec<T>`             | `RepeatedElement`  | zero or more `<field>` children  |
//! | `Option<Model>`      | `NestedModel`      | optional `<field>` subtree       |
//! | `Option<Scalar>`     | `OptionalElement`  | optional `<field>text</field>`   |
//! | `Scalar`             | `RequiredAttribute`| `field="text"`                   |
//!
//! `gpx_model!` turns a struct declaration into a static field table plus
//! the parse and build implementations that walk it.

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::error::{GpxError, Result, ValueError};
use crate::namespace::{GPX_NAMESPACE, NamespaceMap};
use crate::types::{Decimal, Degrees, DgpsStation, Fix, Latitude, Longitude};
use crate::xml::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    RequiredAttribute,
    OptionalElement,
    NestedModel,
    RepeatedElement,
}

impl FieldShape {
    /// Lists win over models, models over optionality.
    pub const fn classify(is_list: bool, is_model: bool, is_optional: bool) -> Self {
        if is_list {
            FieldShape::RepeatedElement
        } else if is_model {
            FieldShape::NestedModel
        } else if is_optional {
            FieldShape::OptionalElement
        } else {
            FieldShape::RequiredAttribute
        }
    }
}

/// One row of a model's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub shape: FieldShape,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, shape: FieldShape) -> Self {
        Self { name, shape }
    }
}

/// Text conversion for leaf values.
pub trait Scalar: Sized {
    /// Numeric leaves reject blank element text instead of reading it as absent.
    const NUMERIC: bool;

    fn parse_scalar(text: &str) -> std::result::Result<Self, ValueError>;

    fn format_scalar(&self) -> String;
}

/// A value that occupies one child element.
pub trait XmlItem: Sized {
    const IS_MODEL: bool;

    /// Reads one child element. `Ok(None)` means the element carried no value.
    fn read_item(element: &Element, owner: &'static str, field: &'static str)
    -> Result<Option<Self>>;

    /// Builds one child element, or nothing when there is nothing to write.
    fn write_item(&self, tag: &str, namespace: Option<&str>) -> Option<Element>;
}

/// A model field: knows its shape and how to move itself to and from XML.
pub trait Field: Sized {
    const SHAPE: FieldShape;

    fn parse_field(element: &Element, owner: &'static str, name: &'static str) -> Result<Self>;

    fn build_field(&self, element: &mut Element, name: &str);
}

/// A record with a static field table.
pub trait Model: Sized {
    /// Default element name.
    const TAG: &'static str;
    /// Rust type name, used in error messages.
    const TYPE_NAME: &'static str;
    const FIELDS: &'static [FieldDescriptor];

    fn from_xml(element: &Element) -> Result<Self>;

    /// Appends this model's attributes and children to `element`.
    fn build_into(&self, element: &mut Element);

    fn to_xml(&self) -> Element {
        self.to_xml_with(None, None)
    }

    /// Builds a fresh element named `tag` (default [`Model::TAG`]) in the
    /// default namespace of `namespaces` (default GPX 1.1), declaring every
    /// binding of `namespaces` on it.
    fn to_xml_with(&self, tag: Option<&str>, namespaces: Option<&NamespaceMap>) -> Element {
        let namespace = namespaces
            .and_then(NamespaceMap::default_namespace)
            .unwrap_or(GPX_NAMESPACE);
        let mut element = Element::new(Some(namespace), tag.unwrap_or(Self::TAG));
        if let Some(namespaces) = namespaces {
            for (prefix, uri) in namespaces.iter() {
                element.declare(prefix, uri);
            }
        }
        self.build_into(&mut element);
        element
    }
}

fn invalid(owner: &'static str, field: &'static str, source: ValueError) -> GpxError {
    GpxError::InvalidValue {
        element: owner,
        field,
        source,
    }
}

/// Reads a scalar from element text.
pub fn read_scalar<T: Scalar>(
    element: &Element,
    owner: &'static str,
    field: &'static str,
) -> Result<Option<T>> {
    let text = element.text();
    if text.is_empty() && !T::NUMERIC {
        return Ok(None);
    }
    T::parse_scalar(&text)
        .map(Some)
        .map_err(|e| invalid(owner, field, e))
}

pub fn write_scalar<T: Scalar>(value: &T, tag: &str, namespace: Option<&str>) -> Element {
    let mut element = Element::new(namespace, tag);
    element.set_text(&value.format_scalar());
    element
}

/// Reads a required attribute.
pub fn read_attribute<T: Scalar>(
    element: &Element,
    owner: &'static str,
    name: &'static str,
) -> Result<T> {
    let raw = element
        .attribute(name)
        .ok_or(GpxError::MissingRequiredAttribute {
            element: owner,
            attribute: name,
        })?;
    T::parse_scalar(raw).map_err(|e| invalid(owner, name, e))
}

impl<T: XmlItem> Field for Option<T> {
    const SHAPE: FieldShape = FieldShape::classify(false, T::IS_MODEL, true);

    fn parse_field(element: &Element, owner: &'static str, name: &'static str) -> Result<Self> {
        match element.find_child(element.namespace(), name) {
            Some(child) => T::read_item(child, owner, name),
            None => Ok(None),
        }
    }

    fn build_field(&self, element: &mut Element, name: &str) {
        if let Some(value) = self {
            if let Some(child) = value.write_item(name, element.namespace()) {
                element.push_element(child);
            }
        }
    }
}

impl<T: XmlItem> Field for Vec<T> {
    const SHAPE: FieldShape = FieldShape::classify(true, T::IS_MODEL, false);

    fn parse_field(element: &Element, owner: &'static str, name: &'static str) -> Result<Self> {
        let mut items = Vec::new();
        for child in element.children_named(element.namespace(), name) {
            if let Some(item) = T::read_item(child, owner, name)? {
                items.push(item);
            }
        }
        Ok(items)
    }

    fn build_field(&self, element: &mut Element, name: &str) {
        let namespace = element.namespace().map(str::to_string);
        for item in self {
            if let Some(child) = item.write_item(name, namespace.as_deref()) {
                element.push_element(child);
            }
        }
    }
}

/// Required nested model: `MissingRequiredElement` when the child is absent.
pub fn read_required_model<T: Model>(
    element: &Element,
    owner: &'static str,
    name: &'static str,
) -> Result<T> {
    let child = element
        .find_child(element.namespace(), name)
        .ok_or(GpxError::MissingRequiredElement {
            element: owner,
            child: name,
        })?;
    T::from_xml(child)
}

macro_rules! scalar_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl XmlItem for $ty {
                const IS_MODEL: bool = false;

                fn read_item(
                    element: &Element,
                    owner: &'static str,
                    field: &'static str,
                ) -> Result<Option<Self>> {
                    read_scalar(element, owner, field)
                }

                fn write_item(&self, tag: &str, namespace: Option<&str>) -> Option<Element> {
                    Some(write_scalar(self, tag, namespace))
                }
            }

            impl Field for $ty {
                const SHAPE: FieldShape = FieldShape::classify(false, false, false);

                fn parse_field(
                    element: &Element,
                    owner: &'static str,
                    name: &'static str,
                ) -> Result<Self> {
                    read_attribute(element, owner, name)
                }

                fn build_field(&self, element: &mut Element, name: &str) {
                    element.set_attribute(name, self.format_scalar());
                }
            }
        )*
    };
}

scalar_field!(
    String,
    u32,
    i32,
    Decimal,
    Latitude,
    Longitude,
    Degrees,
    Fix,
    DgpsStation,
    DateTime<FixedOffset>,
);

impl Scalar for String {
    const NUMERIC: bool = false;

    fn parse_scalar(text: &str) -> std::result::Result<Self, ValueError> {
        Ok(text.to_string())
    }

    fn format_scalar(&self) -> String {
        self.clone()
    }
}

macro_rules! integer_scalar {
    ($($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const NUMERIC: bool = true;

                fn parse_scalar(text: &str) -> std::result::Result<Self, ValueError> {
                    text.trim()
                        .parse()
                        .map_err(|_| ValueError::InvalidInteger(text.to_string()))
                }

                fn format_scalar(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_scalar!(u32, i32);

macro_rules! parsed_scalar {
    ($numeric:expr => $($ty:ty),*) => {
        $(
            impl Scalar for $ty {
                const NUMERIC: bool = $numeric;

                fn parse_scalar(text: &str) -> std::result::Result<Self, ValueError> {
                    text.parse()
                }

                fn format_scalar(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

parsed_scalar!(true => Decimal, Latitude, Longitude, Degrees, DgpsStation);
parsed_scalar!(false => Fix);

impl Scalar for DateTime<FixedOffset> {
    const NUMERIC: bool = false;

    fn parse_scalar(text: &str) -> std::result::Result<Self, ValueError> {
        parse_datetime(text)
    }

    fn format_scalar(&self) -> String {
        format_datetime(self)
    }
}

/// Parses an ISO 8601 timestamp that carries a zone designator.
pub fn parse_datetime(text: &str) -> std::result::Result<DateTime<FixedOffset>, ValueError> {
    DateTime::parse_from_rfc3339(text.trim())
        .map_err(|_| ValueError::InvalidDateTime(text.to_string()))
}

/// `Z` for UTC, milliseconds only when there is a sub-second part.
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    let precision = if dt.timestamp_subsec_nanos() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Millis
    };
    dt.to_rfc3339_opts(precision, true)
}

/// Declares a GPX model: the struct, its field table, and its
/// [`Model`], [`XmlItem`] and required-[`Field`] implementations.
///
/// Fields are written `pub name: Type = "xml-name",`. An optional
/// `extra { pub name: Type = init, }` block adds fields that are not part
/// of the XML table; `init` is called with the source element on parse.
/// An optional `finish(this, element) { ... }` block runs after the
/// fields are built.
macro_rules! gpx_model {
    (
        $(#[$meta:meta])*
        pub struct $name:ident as $tag:literal {
            $(
                $(#[$fmeta:meta])*
                pub $field:ident : $ty:ty = $xml:literal,
            )*
        }
        $(
            extra {
                $(
                    $(#[$xmeta:meta])*
                    pub $xfield:ident : $xty:ty = $xinit:expr,
                )*
            }
        )?
        $(
            finish($this:ident, $target:ident) $finish:block
        )?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            $(
                $(#[$fmeta])*
                pub $field: $ty,
            )*
            $($(
                $(#[$xmeta])*
                pub $xfield: $xty,
            )*)?
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                true $(&& self.$field == other.$field)*
            }
        }

        impl $crate::marshal::Model for $name {
            const TAG: &'static str = $tag;
            const TYPE_NAME: &'static str = stringify!($name);
            const FIELDS: &'static [$crate::marshal::FieldDescriptor] = &[
                $(
                    $crate::marshal::FieldDescriptor::new(
                        $xml,
                        <$ty as $crate::marshal::Field>::SHAPE,
                    ),
                )*
            ];

            fn from_xml(element: &$crate::xml::Element) -> $crate::error::Result<Self> {
                Ok(Self {
                    $(
                        $field: <$ty as $crate::marshal::Field>::parse_field(
                            element,
                            stringify!($name),
                            $xml,
                        )?,
                    )*
                    $($(
                        $xfield: ($xinit)(element),
                    )*)?
                })
            }

            #[allow(unused_variables)]
            fn build_into(&self, element: &mut $crate::xml::Element) {
                $(
                    $crate::marshal::Field::build_field(&self.$field, element, $xml);
                )*
                $(
                    let $this = self;
                    let $target = element;
                    $finish
                )?
            }
        }

        impl $crate::marshal::XmlItem for $name {
            const IS_MODEL: bool = true;

            fn read_item(
                element: &$crate::xml::Element,
                _owner: &'static str,
                _field: &'static str,
            ) -> $crate::error::Result<Option<Self>> {
                <Self as $crate::marshal::Model>::from_xml(element).map(Some)
            }

            fn write_item(
                &self,
                tag: &str,
                namespace: Option<&str>,
            ) -> Option<$crate::xml::Element> {
                let mut element = $crate::xml::Element::new(namespace, tag);
                <Self as $crate::marshal::Model>::build_into(self, &mut element);
                Some(element)
            }
        }

        impl $crate::marshal::Field for $name {
            const SHAPE: $crate::marshal::FieldShape =
                $crate::marshal::FieldShape::classify(false, true, false);

            fn parse_field(
                element: &$crate::xml::Element,
                owner: &'static str,
                name: &'static str,
            ) -> $crate::error::Result<Self> {
                $crate::marshal::read_required_model(element, owner, name)
            }

            fn build_field(&self, element: &mut $crate::xml::Element, name: &str) {
                if let Some(child) =
                    $crate::marshal::XmlItem::write_item(self, name, element.namespace())
                {
                    element.push_element(child);
                }
            }
        }
    };
}

pub(crate) use gpx_model;
