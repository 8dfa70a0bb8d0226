//! Type → schema conversion with a deduplicating registry.
//!
//! # Responsibilities
//! - Describe primitive, collection, map and struct types as [`Schema`] nodes
//! - Register each struct type once under a stable name
//! - Hand out `$ref` nodes on every later encounter
//!
//! # Design Decisions
//! - Struct identity is the `TypeId`; the name is reserved *before* fields
//!   are walked, so self- and mutually-recursive types terminate on a `$ref`
//! - Unknown kinds (`serde_json::Value`, `()`) fall back to `string`
//! - `Option`, `Vec`-like and map fields are never required

use std::any::{type_name, TypeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::docs::schema::Schema;

/// A type that can describe its own documentation schema.
///
/// Struct types usually implement this with [`describe_struct!`](crate::describe_struct).
pub trait Describe: 'static {
    fn describe(factory: &mut SchemaFactory) -> Schema;

    /// Whether a struct field of this type is listed as required.
    fn required() -> bool {
        true
    }
}

/// Converter state shared by every schema of one document.
#[derive(Debug, Default)]
pub struct SchemaFactory {
    seen: HashMap<TypeId, String>,
    names: HashMap<String, TypeId>,
    schemas: BTreeMap<String, Schema>,
}

impl SchemaFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema to use at an endpoint for a root value of type `T`.
    pub fn make_schema<T: Describe + ?Sized>(&mut self) -> Schema {
        T::describe(self)
    }

    /// Register struct type `T` under `preferred`, building its body with
    /// `build` only on the first encounter. Always returns a reference.
    pub fn register<T, F>(&mut self, preferred: &str, build: F) -> Schema
    where
        T: ?Sized + 'static,
        F: FnOnce(&mut SchemaFactory) -> Schema,
    {
        let id = TypeId::of::<T>();
        if let Some(name) = self.seen.get(&id) {
            return Schema::reference(name);
        }

        let name = self.unique_name::<T>(preferred);
        self.seen.insert(id, name.clone());
        self.names.insert(name.clone(), id);

        let schema = build(self);
        tracing::trace!(schema = %name, "Schema registered");
        self.schemas.insert(name.clone(), schema);

        Schema::reference(&name)
    }

    fn unique_name<T: ?Sized>(&self, preferred: &str) -> String {
        if !preferred.is_empty() && !self.names.contains_key(preferred) {
            return preferred.to_string();
        }
        // Two distinct types share a short name: fall back to the full path.
        let qualified: String = type_name::<T>()
            .replace("::", "_")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        let mut candidate = qualified.clone();
        let mut n = 2;
        while self.names.contains_key(&candidate) {
            candidate = format!("{}{}", qualified, n);
            n += 1;
        }
        candidate
    }

    /// Registered schema by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// The named-schema registry, for `components.schemas`.
    pub fn components(&self) -> &BTreeMap<String, Schema> {
        &self.schemas
    }

    pub fn into_components(self) -> BTreeMap<String, Schema> {
        self.schemas
    }
}

/// Per-field options used by [`ObjectBuilder::field`].
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    name: String,
    skip: bool,
    optional: bool,
    flatten: bool,
    description: Option<String>,
}

impl FieldSpec {
    /// Field serialized under its own name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Serialized under `wire` instead.
    pub fn rename(mut self, wire: &str) -> Self {
        self.name = wire.to_string();
        self
    }

    /// Never serialized.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// May be omitted from the wire form.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Embedded field: not emitted as a property of its own.
    pub fn flatten(mut self) -> Self {
        self.flatten = true;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Accumulates the properties of one object schema.
pub struct ObjectBuilder<'f> {
    factory: &'f mut SchemaFactory,
    properties: BTreeMap<String, Schema>,
    required: Vec<String>,
}

impl<'f> ObjectBuilder<'f> {
    pub fn new(factory: &'f mut SchemaFactory) -> Self {
        Self {
            factory,
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn field<T: Describe + ?Sized>(mut self, spec: FieldSpec) -> Self {
        if spec.skip || spec.flatten {
            return self;
        }

        let mut schema = T::describe(self.factory);
        if let Some(description) = spec.description {
            schema.description = Some(description);
        }

        if !spec.optional && T::required() {
            self.required.push(spec.name.clone());
        }
        self.properties.insert(spec.name, schema);
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            properties: self.properties,
            required: self.required,
            ..Schema::object()
        }
    }
}

/// Implement [`Describe`] for a named struct by listing its fields.
///
/// ```ignore
/// describe_struct!(Widget {
///     id: String,
///     #[rename = "displayName"] display_name: String,
///     #[optional] #[description = "Free text"] note: String,
///     #[skip] secret: String,
///     children: Vec<Widget>,
/// });
/// ```
///
/// `Widget as "PublicWidget" { .. }` registers the schema under another name.
#[macro_export]
macro_rules! describe_struct {
    ($ty:ident { $($fields:tt)* }) => {
        $crate::describe_struct!(@impl $ty, stringify!($ty), $($fields)*);
    };
    ($ty:ident as $name:literal { $($fields:tt)* }) => {
        $crate::describe_struct!(@impl $ty, $name, $($fields)*);
    };
    (@impl $ty:ident, $name:expr, $( $(#[$attr:ident $(= $val:literal)?])* $field:ident : $fty:ty ),* $(,)?) => {
        impl $crate::docs::Describe for $ty {
            fn describe(factory: &mut $crate::docs::SchemaFactory) -> $crate::docs::Schema {
                factory.register::<Self, _>($name, |factory| {
                    $crate::docs::ObjectBuilder::new(factory)
                        $(
                            .field::<$fty>(
                                $crate::docs::FieldSpec::new(stringify!($field))
                                    $( .$attr($($val)?) )*
                            )
                        )*
                        .build()
                })
            }
        }
    };
}

macro_rules! describe_primitive {
    ($schema:expr => $($ty:ty),+) => {
        $(
            impl Describe for $ty {
                fn describe(_: &mut SchemaFactory) -> Schema {
                    $schema
                }
            }
        )+
    };
}

describe_primitive!(Schema::string() => String, str, char, &'static str);
describe_primitive!(Schema::boolean() => bool);
describe_primitive!(Schema::integer() => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
describe_primitive!(Schema::number() => f32, f64);
describe_primitive!(Schema::string() => (), serde_json::Value);

impl<T: Describe> Describe for Option<T> {
    fn describe(factory: &mut SchemaFactory) -> Schema {
        T::describe(factory)
    }

    fn required() -> bool {
        false
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe(factory: &mut SchemaFactory) -> Schema {
        T::describe(factory)
    }

    fn required() -> bool {
        T::required()
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe(factory: &mut SchemaFactory) -> Schema {
        T::describe(factory)
    }

    fn required() -> bool {
        T::required()
    }
}

macro_rules! describe_sequence {
    ($($seq:ident),+) => {
        $(
            impl<T: Describe> Describe for $seq<T> {
                fn describe(factory: &mut SchemaFactory) -> Schema {
                    Schema::array(T::describe(factory))
                }

                fn required() -> bool {
                    false
                }
            }
        )+
    };
}

describe_sequence!(Vec, VecDeque, HashSet, BTreeSet);

impl<T: Describe> Describe for [T] {
    fn describe(factory: &mut SchemaFactory) -> Schema {
        Schema::array(T::describe(factory))
    }

    fn required() -> bool {
        false
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe(factory: &mut SchemaFactory) -> Schema {
        Schema::array(T::describe(factory))
    }
}

impl<K: 'static, V: Describe> Describe for HashMap<K, V> {
    fn describe(factory: &mut SchemaFactory) -> Schema {
        Schema::map(V::describe(factory))
    }

    fn required() -> bool {
        false
    }
}

impl<K: 'static, V: Describe> Describe for BTreeMap<K, V> {
    fn describe(factory: &mut SchemaFactory) -> Schema {
        Schema::map(V::describe(factory))
    }

    fn required() -> bool {
        false
    }
}

/// Checks that a type's documented schema agrees with its serde shape.
#[cfg(test)]
pub(crate) mod conformance {
    use super::{Describe, SchemaFactory};
    use std::collections::BTreeSet;

    /// Property names and required names of the registered schema of `T`.
    pub fn documented_fields<T: Describe>() -> (BTreeSet<String>, BTreeSet<String>) {
        let mut factory = SchemaFactory::new();
        let root = factory.make_schema::<T>();
        let name = root.reference_name().expect("struct types register a component");
        let schema = factory.schema(name).expect("referenced component exists");
        (
            schema.properties.keys().cloned().collect(),
            schema.required.iter().cloned().collect(),
        )
    }

    /// `full` must serialize every field; its keys must be exactly the
    /// documented properties, and every required property must appear.
    pub fn assert_documents<T: Describe + serde::Serialize>(full: &T) {
        let (properties, required) = documented_fields::<T>();
        let value = serde_json::to_value(full).expect("sample serializes");
        let keys: BTreeSet<String> = value
            .as_object()
            .expect("struct serializes as an object")
            .keys()
            .cloned()
            .collect();
        assert_eq!(properties, keys, "documented properties differ from serialized keys");
        assert!(required.is_subset(&keys), "required {:?} not all in {:?}", required, keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::schema::SchemaType;

    #[allow(dead_code)]
    struct Owner {
        name: String,
    }

    #[allow(dead_code)]
    struct Widget {
        id: String,
        display_name: String,
        note: String,
        secret: String,
        weight: f64,
        owner: Owner,
        backup_owner: Option<Owner>,
        tags: Vec<String>,
        labels: HashMap<String, u32>,
    }

    #[allow(dead_code)]
    struct Node {
        value: i64,
        next: Option<Box<Node>>,
        children: Vec<Node>,
    }

    #[allow(dead_code)]
    struct Ping {
        pong: Option<Box<Pong>>,
    }

    #[allow(dead_code)]
    struct Pong {
        ping: Box<Ping>,
    }

    crate::describe_struct!(Owner { name: String });

    crate::describe_struct!(Widget {
        id: String,
        #[rename = "displayName"] display_name: String,
        #[optional] #[description = "Free text"] note: String,
        #[skip] secret: String,
        weight: f64,
        owner: Owner,
        backup_owner: Option<Owner>,
        tags: Vec<String>,
        labels: HashMap<String, u32>,
    });

    crate::describe_struct!(Node {
        value: i64,
        next: Option<Box<Node>>,
        children: Vec<Node>,
    });

    crate::describe_struct!(Ping { pong: Option<Box<Pong>> });
    crate::describe_struct!(Pong { ping: Box<Ping> });

    mod shadow {
        #[allow(dead_code)]
        pub struct Owner {
            pub id: u32,
        }
        crate::describe_struct!(Owner { id: u32 });
    }

    #[test]
    fn struct_fields_follow_wire_rules() {
        let mut factory = SchemaFactory::new();
        let root = factory.make_schema::<Widget>();
        assert_eq!(root.reference_name(), Some("Widget"));

        let widget = factory.schema("Widget").unwrap();
        assert!(widget.properties.contains_key("displayName"));
        assert!(!widget.properties.contains_key("secret"));
        assert_eq!(widget.properties["note"].description.as_deref(), Some("Free text"));
        assert_eq!(widget.properties["weight"].kind, Some(SchemaType::Number));
        assert_eq!(widget.properties["labels"].additional_properties.as_deref(), Some(&Schema::integer()));
        assert_eq!(widget.required, vec!["id", "displayName", "weight", "owner"]);
    }

    #[test]
    fn repeated_type_registers_once() {
        let mut factory = SchemaFactory::new();
        factory.make_schema::<Widget>();
        let direct = factory.make_schema::<Owner>();

        let widget = factory.schema("Widget").unwrap();
        assert_eq!(widget.properties["owner"], direct);
        assert_eq!(widget.properties["backup_owner"], direct);
        assert_eq!(factory.components().len(), 2);
    }

    #[test]
    fn self_reference_closes_with_ref() {
        let mut factory = SchemaFactory::new();
        let root = factory.make_schema::<Node>();

        let node = factory.schema("Node").unwrap();
        assert_eq!(node.properties["next"], root);
        assert_eq!(node.properties["children"], Schema::array(root.clone()));
        assert_eq!(node.required, vec!["value"]);
        assert_eq!(factory.components().len(), 1);
    }

    #[test]
    fn mutual_recursion_terminates() {
        let mut factory = SchemaFactory::new();
        factory.make_schema::<Ping>();

        assert_eq!(factory.components().len(), 2);
        let pong = factory.schema("Pong").unwrap();
        assert_eq!(pong.properties["ping"].reference_name(), Some("Ping"));
        assert_eq!(pong.required, vec!["ping"]);
    }

    #[test]
    fn root_collection_wraps_reference() {
        let mut factory = SchemaFactory::new();
        let root = factory.make_schema::<Vec<Owner>>();
        assert_eq!(root.kind, Some(SchemaType::Array));
        assert_eq!(root.items.as_deref().and_then(Schema::reference_name), Some("Owner"));
    }

    #[test]
    fn name_collision_uses_qualified_path() {
        let mut factory = SchemaFactory::new();
        let first = factory.make_schema::<Owner>();
        let second = factory.make_schema::<shadow::Owner>();

        assert_eq!(first.reference_name(), Some("Owner"));
        let qualified = second.reference_name().unwrap();
        assert_ne!(qualified, "Owner");
        assert!(qualified.ends_with("shadow_Owner"));
        assert_eq!(factory.components().len(), 2);
    }

    #[test]
    fn unknown_kinds_fall_back_to_string() {
        let mut factory = SchemaFactory::new();
        assert_eq!(factory.make_schema::<serde_json::Value>(), Schema::string());
        assert!(factory.components().is_empty());
    }
}
