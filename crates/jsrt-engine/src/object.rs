//! Object protocol (C4): a polymorphic object with a capability
//! vtable. Capability slots are grouped into the `HostObject` trait,
//! an escape hatch for host-defined objects, plus a tagged
//! `ObjectBody` covering the built-in-adjacent kinds the substrate
//! itself needs to ship (plain property-bag objects and the
//! native-callable adapter from C9). Missing capability slots fall
//! back to documented defaults.

use std::collections::HashMap;

use crate::gc::{GcPtr, Tracer};
use crate::gc::Trace;
use crate::interpreter::Interpreter;
use crate::string_table::JsString;
use crate::trycontext::{Thrown, ThrownResult};
use crate::value::Value;

/// Property attribute bits: ReadOnly, DontEnum, DontDelete, Internal.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Attributes(u8);

impl Attributes {
    pub const NONE: Attributes = Attributes(0);
    pub const READONLY: Attributes = Attributes(1 << 0);
    pub const DONTENUM: Attributes = Attributes(1 << 1);
    pub const DONTDELETE: Attributes = Attributes(1 << 2);
    pub const INTERNAL: Attributes = Attributes(1 << 3);

    pub fn contains(&self, other: Attributes) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Attributes {
    type Output = Attributes;
    fn bitor(self, rhs: Attributes) -> Attributes {
        Attributes(self.0 | rhs.0)
    }
}

/// Hint passed to `defaultvalue`: which primitive conversion is
/// preferred when an object is coerced to a primitive.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Hint {
    Number,
    String,
    None,
}

/// Opaque host token tracked by the call dispatcher (C7) so a host
/// can observe cross-domain calls.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SecDomain(pub u64);

struct PropertySlot {
    value: Value,
    attrs: Attributes,
}

#[derive(Default)]
struct PropertyMap {
    // Keyed by code-unit content rather than by GcPtr identity: two
    // property names with equal content but different string
    // references must resolve to the same slot.
    entries: HashMap<Box<[u16]>, PropertySlot>,
    // Preserves insertion order for `enumerator()`.
    order: Vec<Box<[u16]>>,
}

impl PropertyMap {
    fn get(&self, key: &[u16]) -> Option<&PropertySlot> {
        self.entries.get(key)
    }

    fn set(&mut self, key: Box<[u16]>, value: Value, attrs: Attributes) {
        if !self.entries.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.entries.insert(key, PropertySlot { value, attrs });
    }

    fn remove(&mut self, key: &[u16]) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k.as_ref() != key);
            true
        } else {
            false
        }
    }

    fn contains(&self, key: &[u16]) -> bool {
        self.entries.contains_key(key)
    }
}

/// A host function adapted into a first-class callable object (C9
/// native-callable adapter). `arity` backs the object's `"length"`
/// property.
pub type NativeFn = fn(&mut Interpreter, Value, &[Value]) -> ThrownResult<Value>;

pub struct NativeFunctionData {
    pub func: NativeFn,
    pub arity: u32,
}

/// The escape hatch: host-defined objects implement whichever
/// capability hooks they need; unimplemented ones keep the trait's
/// documented default.
pub trait HostObject: Trace {
    fn get(&self, _interp: &mut Interpreter, _this: GcPtr<ObjectData>, _name: GcPtr<JsString>) -> Value {
        Value::Undefined
    }
    fn put(
        &self,
        _interp: &mut Interpreter,
        _this: GcPtr<ObjectData>,
        _name: GcPtr<JsString>,
        _value: Value,
        _attrs: Attributes,
    ) {
    }
    fn canput(&self, _interp: &mut Interpreter, _this: GcPtr<ObjectData>, _name: GcPtr<JsString>) -> bool {
        false
    }
    fn hasproperty(&self, _interp: &mut Interpreter, _this: GcPtr<ObjectData>, _name: GcPtr<JsString>) -> bool {
        false
    }
    fn delete(&self, _interp: &mut Interpreter, _this: GcPtr<ObjectData>, _name: GcPtr<JsString>) -> bool {
        true
    }
    fn defaultvalue(&self, _interp: &mut Interpreter, _this: GcPtr<ObjectData>, _hint: Hint) -> Value {
        Value::Undefined
    }
    fn construct(
        &self,
        interp: &mut Interpreter,
        _this: GcPtr<ObjectData>,
        _argv: &[Value],
    ) -> ThrownResult<Value> {
        Err(interp.type_error("not a constructor"))
    }
    fn call(
        &self,
        interp: &mut Interpreter,
        _this: GcPtr<ObjectData>,
        _this_arg: Value,
        _argv: &[Value],
    ) -> ThrownResult<Value> {
        Err(interp.type_error("not a function"))
    }
    fn hasinstance(&self, _interp: &mut Interpreter, _this: GcPtr<ObjectData>, _value: Value) -> Option<bool> {
        None
    }
    fn enumerator(&self) -> Option<Vec<Box<[u16]>>> {
        None
    }
    fn get_sec_domain(&self) -> Option<SecDomain> {
        None
    }
}

pub enum ObjectBody {
    /// A plain property bag: `get`/`put`/etc. consult only the
    /// object's own property table and its prototype chain.
    Plain,
    /// The C9 native-callable adapter.
    NativeFunction(NativeFunctionData),
    /// Host-defined capability set.
    Host(Box<dyn HostObject>),
}

impl Trace for ObjectBody {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        if let ObjectBody::Host(h) = self {
            h.trace(tracer);
        }
    }
}

pub struct ObjectData {
    class_name: GcPtr<JsString>,
    prototype: Option<GcPtr<ObjectData>>,
    properties: PropertyMap,
    body: ObjectBody,
}

impl Trace for ObjectData {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.visit(&self.class_name);
        if let Some(proto) = &self.prototype {
            tracer.visit(proto);
        }
        for slot in self.properties.entries.values() {
            slot.value.trace(tracer);
        }
        self.body.trace(tracer);
    }
}

impl ObjectData {
    pub fn new(class_name: GcPtr<JsString>, prototype: Option<GcPtr<ObjectData>>, body: ObjectBody) -> Self {
        Self {
            class_name,
            prototype,
            properties: PropertyMap::default(),
            body,
        }
    }

    pub fn class_name(&self) -> GcPtr<JsString> {
        self.class_name
    }

    pub fn class_name_utf8(&self) -> String {
        self.class_name.as_ref().to_utf8()
    }

    pub fn prototype(&self) -> Option<GcPtr<ObjectData>> {
        self.prototype
    }

    pub fn set_prototype(&mut self, prototype: Option<GcPtr<ObjectData>>) {
        self.prototype = prototype;
    }

    fn key_of(name: GcPtr<JsString>) -> Box<[u16]> {
        name.as_ref().units().to_vec().into_boxed_slice()
    }

    /// Own-property lookup only, no prototype walk and no body
    /// intercept — the building block `get`/`hasproperty` compose on
    /// top of.
    pub fn own_property(&self, name: GcPtr<JsString>) -> Option<Value> {
        self.properties.get(&Self::key_of(name)).map(|s| s.value)
    }

    pub fn define_own_property(&mut self, name: GcPtr<JsString>, value: Value, attrs: Attributes) {
        self.properties.set(Self::key_of(name), value, attrs);
    }

    // ---- capability dispatch ----

    pub fn get(this: GcPtr<ObjectData>, interp: &mut Interpreter, name: GcPtr<JsString>) -> Value {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            return h.get(interp, this, name);
        }
        if let ObjectBody::NativeFunction(nf) = &this.as_ref().body {
            if name.as_ref().units() == LENGTH_PROP {
                return Value::Number(nf.arity as f64);
            }
        }
        let key = Self::key_of(name);
        let mut cursor = Some(this);
        while let Some(obj) = cursor {
            if let Some(slot) = obj.as_ref().properties.get(&key) {
                return slot.value;
            }
            cursor = obj.as_ref().prototype;
        }
        Value::Undefined
    }

    pub fn put(this: GcPtr<ObjectData>, interp: &mut Interpreter, name: GcPtr<JsString>, value: Value, attrs: Attributes) {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            h.put(interp, this, name, value, attrs);
            return;
        }
        if !Self::canput(this, interp, name) {
            return;
        }
        let key = Self::key_of(name);
        // SAFETY: sole mutator of this object's property table while
        // holding the only outstanding reference during the call.
        unsafe { this.as_mut() }.properties.set(key, value, attrs);
    }

    pub fn canput(this: GcPtr<ObjectData>, interp: &mut Interpreter, name: GcPtr<JsString>) -> bool {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            return h.canput(interp, this, name);
        }
        let key = Self::key_of(name);
        match this.as_ref().properties.get(&key) {
            Some(slot) => !slot.attrs.contains(Attributes::READONLY),
            None => true,
        }
    }

    pub fn hasproperty(this: GcPtr<ObjectData>, interp: &mut Interpreter, name: GcPtr<JsString>) -> bool {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            return h.hasproperty(interp, this, name);
        }
        let key = Self::key_of(name);
        let mut cursor = Some(this);
        while let Some(obj) = cursor {
            if obj.as_ref().properties.contains(&key) {
                return true;
            }
            cursor = obj.as_ref().prototype;
        }
        false
    }

    pub fn delete(this: GcPtr<ObjectData>, interp: &mut Interpreter, name: GcPtr<JsString>) -> bool {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            return h.delete(interp, this, name);
        }
        let key = Self::key_of(name);
        let dont_delete = this
            .as_ref()
            .properties
            .get(&key)
            .map(|s| s.attrs.contains(Attributes::DONTDELETE))
            .unwrap_or(false);
        if dont_delete {
            return false;
        }
        unsafe { this.as_mut() }.properties.remove(&key);
        true
    }

    pub fn defaultvalue(this: GcPtr<ObjectData>, interp: &mut Interpreter, hint: Hint) -> Value {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            return h.defaultvalue(interp, this, hint);
        }
        Value::Undefined
    }

    pub fn construct(this: GcPtr<ObjectData>, interp: &mut Interpreter, argv: &[Value]) -> ThrownResult<Value> {
        match &this.as_ref().body {
            ObjectBody::Host(h) => h.construct(interp, this, argv),
            _ => Err(interp.type_error("not a constructor")),
        }
    }

    pub fn call(this: GcPtr<ObjectData>, interp: &mut Interpreter, this_arg: Value, argv: &[Value]) -> ThrownResult<Value> {
        match &this.as_ref().body {
            ObjectBody::NativeFunction(nf) => (nf.func)(interp, this_arg, argv),
            ObjectBody::Host(h) => h.call(interp, this, this_arg, argv),
            ObjectBody::Plain => Err(interp.type_error("not a function")),
        }
    }

    /// `instanceof` semantics: delegate to `hasinstance` if the
    /// constructor exposes it; otherwise, above
    /// JS 1.4 compatibility, walk `value`'s prototype chain looking
    /// for the constructor's `"prototype"` property; below that
    /// level, fail with `TypeError`.
    pub fn has_instance(constructor: GcPtr<ObjectData>, interp: &mut Interpreter, value: Value) -> ThrownResult<bool> {
        if let ObjectBody::Host(h) = &constructor.as_ref().body {
            if let Some(answer) = h.hasinstance(interp, constructor, value) {
                return Ok(answer);
            }
        }
        if !interp.compat_flags().at_least_js14() {
            return Err(interp.type_error("no [[HasInstance]]"));
        }
        let lhs = match value.as_object() {
            Some(o) => o,
            None => return Ok(false),
        };
        let proto_name = interp.intern_ascii(b"prototype");
        let proto_value = Self::get(constructor, interp, proto_name);
        let proto = match proto_value.as_object() {
            Some(o) => o,
            None => return Err(interp.type_error("prototype is not an object")),
        };
        let mut cursor = lhs.as_ref().prototype;
        while let Some(p) = cursor {
            if GcPtr::same_object(&p, &proto) {
                return Ok(true);
            }
            cursor = p.as_ref().prototype;
        }
        Ok(false)
    }

    pub fn enumerator(this: GcPtr<ObjectData>) -> Vec<Box<[u16]>> {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            if let Some(names) = h.enumerator() {
                return names;
            }
            return Vec::new();
        }
        this.as_ref()
            .properties
            .order
            .iter()
            .filter(|k| {
                !this
                    .as_ref()
                    .properties
                    .get(k)
                    .map(|s| s.attrs.contains(Attributes::DONTENUM))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Own enumerable properties as `(name, value)` pairs, in
    /// insertion order. Used by the diagnostics surface (C11) to
    /// render an object without re-deriving keys then re-looking them
    /// up through the public `get` path (which would also walk the
    /// prototype chain, unwanted for a debug dump of *own* state).
    pub fn own_enumerable_entries(this: GcPtr<ObjectData>) -> Vec<(Box<[u16]>, Value)> {
        if let ObjectBody::Host(_) = &this.as_ref().body {
            return Self::enumerator(this)
                .into_iter()
                .map(|name| (name, Value::Undefined))
                .collect();
        }
        this.as_ref()
            .properties
            .order
            .iter()
            .filter_map(|k| {
                let slot = this.as_ref().properties.get(k)?;
                if slot.attrs.contains(Attributes::DONTENUM) {
                    None
                } else {
                    Some((k.clone(), slot.value))
                }
            })
            .collect()
    }

    /// Inherits the caller's domain when no hook is present.
    pub fn get_sec_domain(this: GcPtr<ObjectData>, inherited: Option<SecDomain>) -> Option<SecDomain> {
        if let ObjectBody::Host(h) = &this.as_ref().body {
            if let Some(domain) = h.get_sec_domain() {
                return Some(domain);
            }
        }
        inherited
    }
}

const LENGTH_PROP: &[u16] = &[
    b'l' as u16, b'e' as u16, b'n' as u16, b'g' as u16, b't' as u16, b'h' as u16,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    fn fresh() -> Interpreter {
        Interpreter::new()
    }

    #[test]
    fn missing_get_defaults_to_undefined() {
        let mut interp = fresh();
        let obj = interp.new_plain_object(None);
        let name = interp.intern_ascii(b"nope");
        assert!(matches!(ObjectData::get(obj, &mut interp, name), Value::Undefined));
    }

    #[test]
    fn put_then_get_round_trips() {
        let mut interp = fresh();
        let obj = interp.new_plain_object(None);
        let name = interp.intern_ascii(b"x");
        ObjectData::put(obj, &mut interp, name, Value::Number(7.0), Attributes::NONE);
        match ObjectData::get(obj, &mut interp, name) {
            Value::Number(n) => assert_eq!(n, 7.0),
            _ => panic!("expected number"),
        }
    }

    #[test]
    fn readonly_put_is_rejected() {
        let mut interp = fresh();
        let obj = interp.new_plain_object(None);
        let name = interp.intern_ascii(b"frozen");
        ObjectData::put(obj, &mut interp, name, Value::Number(1.0), Attributes::READONLY);
        ObjectData::put(obj, &mut interp, name, Value::Number(2.0), Attributes::NONE);
        match ObjectData::get(obj, &mut interp, name) {
            Value::Number(n) => assert_eq!(n, 1.0),
            _ => panic!("expected number"),
        }
    }

    #[test]
    fn dontdelete_blocks_delete() {
        let mut interp = fresh();
        let obj = interp.new_plain_object(None);
        let name = interp.intern_ascii(b"perm");
        ObjectData::put(obj, &mut interp, name, Value::Boolean(true), Attributes::DONTDELETE);
        assert!(!ObjectData::delete(obj, &mut interp, name));
        assert!(ObjectData::hasproperty(obj, &mut interp, name));
    }

    #[test]
    fn property_lookup_walks_prototype_chain() {
        let mut interp = fresh();
        let proto = interp.new_plain_object(None);
        let name = interp.intern_ascii(b"inherited");
        ObjectData::put(proto, &mut interp, name, Value::Number(9.0), Attributes::NONE);
        let child = interp.new_plain_object(Some(proto));
        match ObjectData::get(child, &mut interp, name) {
            Value::Number(n) => assert_eq!(n, 9.0),
            _ => panic!("expected inherited number"),
        }
    }

    #[test]
    fn call_on_plain_object_is_type_error() {
        let mut interp = fresh();
        let obj = interp.new_plain_object(None);
        let result = ObjectData::call(obj, &mut interp, Value::Undefined, &[]);
        assert!(result.is_err());
    }

    #[test]
    fn construct_on_plain_object_is_type_error() {
        let mut interp = fresh();
        let obj = interp.new_plain_object(None);
        let result = ObjectData::construct(obj, &mut interp, &[]);
        assert!(result.is_err());
    }
}
