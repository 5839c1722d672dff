use std::collections::BTreeSet;

use crate::activation::{Backtrace, Frame};
use crate::error::RuntimeError;
use crate::lookup::{self, Hierarchy, LookupResult};
use crate::primitives::{self, PrimitiveDesc};
use crate::special::{self, Names, SpecialObjects};
use crate::stack::Stack;
use crate::{
    Closure, Heap, HeapCreateInfo, Number, ObjectId, Primitive, Protection,
    StreamHandle, Symbol, SymbolTable,
};

#[derive(Debug, Clone)]
pub struct RuntimeCreateInfo {
    pub heap: HeapCreateInfo,
    /// activations allowed before a send fails with `StackOverflow`
    pub max_call_depth: usize,
    /// install stdin/stdout/stderr on `Sys`
    pub standard_streams: bool,
}

impl Default for RuntimeCreateInfo {
    fn default() -> Self {
        Self {
            heap: HeapCreateInfo::default(),
            max_call_depth: 10_000,
            standard_streams: true,
        }
    }
}

/// An object graph plus the machinery to send messages through it.
///
/// Object handles are only meaningful for the runtime that produced them;
/// passing a foreign or `NONE` handle to an accessor panics.
pub struct Runtime {
    heap: Heap,
    symbols: SymbolTable,
    names: Names,
    special: SpecialObjects,
    frames: Stack<Frame>,
    depth: usize,
    max_call_depth: usize,
}

impl Runtime {
    pub fn new(info: RuntimeCreateInfo) -> Self {
        let mut heap = Heap::new(info.heap);
        let symbols = SymbolTable::new();
        let names = Names::new(&symbols);
        let special = special::bootstrap(
            &mut heap,
            &symbols,
            &names,
            info.standard_streams,
        );

        let mut vm = Self {
            heap,
            symbols,
            names,
            special,
            frames: Stack::new(),
            depth: 0,
            max_call_depth: info.max_call_depth,
        };
        primitives::install(&mut vm, &primitives::default_primitives());
        vm
    }

    #[inline]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[inline]
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    #[inline]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    #[inline]
    pub fn names(&self) -> &Names {
        &self.names
    }

    #[inline]
    pub fn special(&self) -> &SpecialObjects {
        &self.special
    }

    #[inline]
    pub fn intern(&self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    // object protocol

    /// A new object whose parent is `proto`, with no slots of its own and a
    /// copy of `proto`'s payload.
    pub fn clone_object(&mut self, proto: ObjectId) -> ObjectId {
        self.heap.clone_object(proto)
    }

    pub fn parent(&self, object: ObjectId) -> ObjectId {
        self.heap[object].parent
    }

    pub fn set_parent(&mut self, object: ObjectId, parent: ObjectId) {
        self.heap[object].parent = parent;
    }

    pub fn meta(&self, object: ObjectId) -> ObjectId {
        self.heap[object].meta
    }

    pub fn set_meta(&mut self, object: ObjectId, meta: ObjectId) {
        self.heap[object].meta = meta;
    }

    /// The slot stored directly on `object`, ignoring parents.
    pub fn get(&self, object: ObjectId, name: Symbol) -> Option<ObjectId> {
        self.heap[object].get(name)
    }

    /// Raw slot write. Protection is not checked.
    pub fn put(&mut self, object: ObjectId, name: Symbol, value: ObjectId) {
        self.heap[object].put(name, value);
    }

    /// Slot write that honours `Protection::ASSIGN`.
    pub fn assign(
        &mut self,
        object: ObjectId,
        name: Symbol,
        value: ObjectId,
    ) -> Result<(), RuntimeError> {
        if self.heap[object].is_protected(name, Protection::ASSIGN) {
            return Err(self.protected(object, name, Protection::ASSIGN));
        }
        self.put(object, name, value);
        Ok(())
    }

    /// Remove a direct slot, honouring `Protection::DELETE`.
    pub fn delete(
        &mut self,
        object: ObjectId,
        name: Symbol,
    ) -> Result<(), RuntimeError> {
        let obj = &self.heap[object];
        if !obj.has_slot(name) {
            return Err(RuntimeError::MissingSlot {
                object,
                slot: self.symbols.name(name),
            });
        }
        if obj.is_protected(name, Protection::DELETE) {
            return Err(self.protected(object, name, Protection::DELETE));
        }
        self.heap[object].remove(name);
        Ok(())
    }

    fn protected(
        &self,
        object: ObjectId,
        name: Symbol,
        protection: Protection,
    ) -> RuntimeError {
        RuntimeError::ProtectedSlot {
            object,
            slot: self.symbols.name(name),
            protection,
        }
    }

    pub fn add_protection(
        &mut self,
        object: ObjectId,
        name: Symbol,
        protection: Protection,
    ) -> bool {
        self.heap[object].add_protection(name, protection)
    }

    pub fn is_protected(
        &self,
        object: ObjectId,
        name: Symbol,
        protection: Protection,
    ) -> bool {
        self.heap[object].is_protected(name, protection)
    }

    pub fn has_any_protection(&self, object: ObjectId, name: Symbol) -> bool {
        self.heap[object].has_any_protection(name)
    }

    pub fn prim(&self, object: ObjectId) -> &Primitive {
        self.heap[object].prim()
    }

    pub fn set_prim(
        &mut self,
        object: ObjectId,
        primitive: Primitive,
    ) -> Primitive {
        self.heap[object].set_prim(primitive)
    }

    pub fn origin(&self, object: ObjectId, name: Symbol) -> Option<ObjectId> {
        lookup::origin(&self.heap, object, name)
    }

    pub fn hierarchy(&self, object: ObjectId) -> Hierarchy<'_> {
        lookup::hierarchy(&self.heap, object)
    }

    pub fn direct_keys(&self, object: ObjectId) -> BTreeSet<Symbol> {
        self.heap[object].direct_keys()
    }

    pub fn keys(&self, object: ObjectId) -> BTreeSet<Symbol> {
        lookup::keys(&self.heap, object)
    }

    // construction

    pub fn make_number(&mut self, number: Number) -> ObjectId {
        self.make(self.special.number, Primitive::Number(number))
    }

    pub fn make_text(&mut self, text: impl Into<String>) -> ObjectId {
        self.make(self.special.text, Primitive::Text(text.into()))
    }

    pub fn make_stream(&mut self, stream: StreamHandle) -> ObjectId {
        self.make(self.special.stream, Primitive::Stream(stream))
    }

    pub fn make_native(&mut self, desc: PrimitiveDesc) -> ObjectId {
        self.make(self.special.native, Primitive::Native(desc))
    }

    pub fn make_method(&mut self, closure: Closure) -> ObjectId {
        self.make(self.special.method, Primitive::Method(closure))
    }

    /// A method closed over `Global`.
    pub fn make_fn<F>(&mut self, name: &str, func: F) -> ObjectId
    where
        F: Fn(&mut Runtime, &Frame) -> Result<ObjectId, RuntimeError> + 'static,
    {
        let closure = Closure::from_fn(name, self.special.global, func);
        self.make_method(closure)
    }

    fn make(&mut self, proto: ObjectId, primitive: Primitive) -> ObjectId {
        let id = self.heap.clone_object(proto);
        self.heap[id].set_prim(primitive);
        id
    }

    pub fn boolean(&self, value: bool) -> ObjectId {
        if value {
            self.special.true_
        } else {
            self.special.false_
        }
    }

    /// Everything except `False` and `Nil` is true.
    pub fn is_truthy(&self, object: ObjectId) -> bool {
        object != self.special.false_ && object != self.special.nil
    }

    pub fn expect_number(
        &self,
        object: ObjectId,
    ) -> Result<Number, RuntimeError> {
        self.heap[object]
            .prim()
            .as_number()
            .ok_or(RuntimeError::TypeError {
                expected: "number",
                got: object,
            })
    }

    pub fn expect_text(&self, object: ObjectId) -> Result<&str, RuntimeError> {
        self.heap[object]
            .prim()
            .as_text()
            .ok_or(RuntimeError::TypeError {
                expected: "text",
                got: object,
            })
    }

    pub fn expect_stream(
        &self,
        object: ObjectId,
    ) -> Result<StreamHandle, RuntimeError> {
        self.heap[object]
            .prim()
            .as_stream()
            .cloned()
            .ok_or(RuntimeError::TypeError {
                expected: "stream",
                got: object,
            })
    }

    // dispatch

    /// Find the slot `selector` along the parent chain of `receiver`.
    pub fn resolve(
        &self,
        receiver: ObjectId,
        selector: Symbol,
    ) -> LookupResult {
        lookup::lookup(&self.heap, receiver, selector)
    }

    /// Find the slot `selector` along the meta chain of `receiver`.
    pub fn resolve_meta(
        &self,
        receiver: ObjectId,
        selector: Symbol,
    ) -> LookupResult {
        lookup::lookup_meta(&self.heap, receiver, selector)
    }

    /// Send `selector` to `receiver`, resolving through the parent chain.
    pub fn send(
        &mut self,
        receiver: ObjectId,
        selector: Symbol,
        args: &[ObjectId],
    ) -> Result<ObjectId, RuntimeError> {
        log::trace!("send '{}' to {receiver}", self.symbols.name(selector));
        let found = self.resolve(receiver, selector);
        self.dispatch(found, receiver, selector, args)
    }

    /// Send `selector` to `receiver`, resolving through the meta chain.
    pub fn send_meta(
        &mut self,
        receiver: ObjectId,
        selector: Symbol,
        args: &[ObjectId],
    ) -> Result<ObjectId, RuntimeError> {
        log::trace!(
            "send meta '{}' to {receiver}",
            self.symbols.name(selector)
        );
        let found = self.resolve_meta(receiver, selector);
        self.dispatch(found, receiver, selector, args)
    }

    pub fn send_named(
        &mut self,
        receiver: ObjectId,
        selector: &str,
        args: &[ObjectId],
    ) -> Result<ObjectId, RuntimeError> {
        let selector = self.intern(selector);
        self.send(receiver, selector, args)
    }

    fn dispatch(
        &mut self,
        found: LookupResult,
        receiver: ObjectId,
        selector: Symbol,
        args: &[ObjectId],
    ) -> Result<ObjectId, RuntimeError> {
        match found.value() {
            Some(target) => self.call(target, receiver, selector, args),
            None => {
                let selector = self.symbols.name(selector);
                log::warn!("{receiver} does not understand '{selector}'");
                Err(RuntimeError::MessageNotUnderstood { receiver, selector })
            }
        }
    }

    /// Activate `target` as if it had been found under `selector` on
    /// `receiver`. Methods are invoked, natives are called and any other
    /// object is simply returned.
    pub fn call(
        &mut self,
        target: ObjectId,
        receiver: ObjectId,
        selector: Symbol,
        args: &[ObjectId],
    ) -> Result<ObjectId, RuntimeError> {
        match self.heap[target].prim() {
            Primitive::Method(closure) => {
                let closure = closure.clone();
                self.invoke(target, closure, receiver, selector, args)
            }
            Primitive::Native(desc) => {
                let desc = *desc;
                log::trace!(
                    "native {} with {} argument(s)",
                    desc.name,
                    args.len()
                );
                (desc.func)(self, receiver, args)
            }
            _ => Ok(target),
        }
    }

    fn invoke(
        &mut self,
        method: ObjectId,
        closure: Closure,
        receiver: ObjectId,
        selector: Symbol,
        args: &[ObjectId],
    ) -> Result<ObjectId, RuntimeError> {
        if self.depth >= self.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.max_call_depth,
            });
        }

        let (current, caller) = match self.frames.top() {
            Some(frame) => (frame.dynamic, frame.lexical),
            None => (self.special.dynamic, self.special.global),
        };
        let dynamic = self.heap.clone_scope(current);
        for (index, &arg) in args.iter().enumerate() {
            let name = self.symbols.natural(index + 1);
            self.heap[dynamic].put(name, arg);
        }
        let names = self.names;
        let scope = &mut self.heap[dynamic];
        scope.put(names.self_, receiver);
        scope.put(names.again, method);
        scope.put(names.caller, caller);
        let fixed = Protection::ASSIGN | Protection::DELETE;
        scope.add_protection(names.self_, fixed);
        scope.add_protection(names.again, fixed);

        let frame = Frame {
            receiver,
            selector,
            method,
            lexical: closure.lexical,
            dynamic,
        };
        let pushed = self.frames.push(frame);
        let saved = std::mem::replace(&mut self.frames, pushed);
        self.depth += 1;
        log::trace!(
            "enter {} ({}) depth {}",
            closure.body.name(),
            self.symbols.name(selector),
            self.depth
        );

        let result =
            ensure_sufficient_stack(|| closure.body.evaluate(self, &frame));

        self.depth -= 1;
        self.frames = saved;
        log::trace!("leave {} depth {}", closure.body.name(), self.depth);
        result
    }

    /// Positional argument `n` (1-based) as seen from `frame`.
    pub fn argument(&self, frame: &Frame, n: usize) -> Option<ObjectId> {
        let name = self.symbols.lookup(&format!("${n}"))?;
        lookup::lookup(&self.heap, frame.dynamic, name).value()
    }

    // activations

    pub fn backtrace(&self) -> Backtrace {
        Backtrace::new(self.frames.clone())
    }

    /// The current activation stack. O(1); later sends never alter it.
    pub fn capture(&self) -> Stack<Frame> {
        self.frames.clone()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }
}

/// Runs `f`, first moving to a fresh stack segment if the native stack is
/// close to exhausted. Nested activations recurse through the host stack,
/// so only `max_call_depth` bounds them.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    const RED_ZONE: usize = 128 * 1024;
    const SEGMENT: usize = 1024 * 1024;
    stacker::maybe_grow(RED_ZONE, SEGMENT, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeCreateInfo::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeCreateInfo {
            standard_streams: false,
            ..RuntimeCreateInfo::default()
        })
    }

    #[test]
    fn data_slots_answer_themselves() {
        let mut vm = runtime();
        let answer = vm.make_number(Number::Int(42));
        let holder = vm.clone_object(vm.special().object);
        let name = vm.intern("answer");
        vm.put(holder, name, answer);

        assert_eq!(vm.send(holder, name, &[]).unwrap(), answer);
        assert_eq!(vm.depth(), 0);
    }

    #[test]
    fn values_and_scopes_stay_small() {
        let mut vm = runtime();
        let number = vm.make_number(Number::Int(1));
        let text = vm.make_text("t");
        assert_eq!(vm.heap()[number].slot_capacity(), 0);
        assert_eq!(vm.heap()[text].slot_capacity(), 0);

        let receiver = vm.clone_object(vm.special().object);
        let method = vm.make_fn("scope", |vm, frame| {
            let scope = &vm.heap()[frame.dynamic];
            assert_eq!(
                scope.slot_capacity(),
                crate::SCOPE_BUCKETS * crate::TREE_LEN
            );
            Ok(frame.dynamic)
        });
        let name = vm.intern("scope");
        vm.put(receiver, name, method);
        let scope = vm.send(receiver, name, &[]).unwrap();
        assert_ne!(scope, vm.special().dynamic);
    }

    #[test]
    fn activation_binds_scope_slots() {
        let mut vm = runtime();
        let receiver = vm.clone_object(vm.special().object);
        let arg = vm.make_text("x");
        let method = vm.make_fn("inspect", |vm, frame| {
            let names = *vm.names();
            assert_eq!(
                vm.get(frame.dynamic, names.self_),
                Some(frame.receiver)
            );
            assert_eq!(vm.get(frame.dynamic, names.again), Some(frame.method));
            assert_eq!(
                vm.get(frame.dynamic, names.caller),
                Some(vm.special().global)
            );
            assert!(vm.is_protected(
                frame.dynamic,
                names.self_,
                Protection::ASSIGN | Protection::DELETE
            ));
            assert_eq!(vm.parent(frame.dynamic), vm.special().dynamic);
            assert_eq!(vm.depth(), 1);
            Ok(vm.argument(frame, 1).unwrap_or(ObjectId::NONE))
        });
        let inspect = vm.intern("inspect");
        vm.put(receiver, inspect, method);

        assert_eq!(vm.send(receiver, inspect, &[arg]).unwrap(), arg);
        assert_eq!(vm.depth(), 0);
        assert!(vm.backtrace().is_empty());
    }

    #[test]
    fn assign_and_delete_honour_protection() {
        let mut vm = runtime();
        let obj = vm.clone_object(vm.special().object);
        let value = vm.special().nil;
        let name = vm.intern("fixed");
        let missing = vm.intern("missing");
        vm.put(obj, name, value);
        vm.add_protection(obj, name, Protection::ASSIGN);

        assert!(matches!(
            vm.assign(obj, name, obj),
            Err(RuntimeError::ProtectedSlot { protection, .. })
                if protection == Protection::ASSIGN
        ));
        assert_eq!(vm.get(obj, name), Some(value));

        vm.delete(obj, name).unwrap();
        assert_eq!(vm.get(obj, name), None);
        assert!(matches!(
            vm.delete(obj, missing),
            Err(RuntimeError::MissingSlot { .. })
        ));

        vm.assign(obj, name, obj).unwrap();
        vm.add_protection(obj, name, Protection::DELETE);
        let err = vm.delete(obj, name).unwrap_err();
        let expected = format!("slot 'fixed' of {obj} is protected");
        assert!(err.to_string().starts_with(&expected));
        assert_eq!(vm.get(obj, name), Some(obj));
    }

    #[test]
    fn truthiness() {
        let vm = runtime();
        let s = *vm.special();
        assert!(!vm.is_truthy(s.false_));
        assert!(!vm.is_truthy(s.nil));
        assert!(vm.is_truthy(s.true_));
        assert!(vm.is_truthy(s.object));
        assert_eq!(vm.boolean(true), s.true_);
    }
}
