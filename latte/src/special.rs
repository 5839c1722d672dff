use crate::{
    Heap, Number, ObjectId, Primitive, Protection, StreamHandle, Symbol,
    SymbolTable,
};

/// Slot names the runtime itself reads or writes.
#[derive(Debug, Clone, Copy)]
pub struct Names {
    pub self_: Symbol,
    pub again: Symbol,
    pub caller: Symbol,
    pub meta: Symbol,
    pub sys: Symbol,
    pub stdin: Symbol,
    pub stdout: Symbol,
    pub stderr: Symbol,
}

impl Names {
    pub fn new(symbols: &SymbolTable) -> Self {
        Self {
            self_: symbols.intern("self"),
            again: symbols.intern("again"),
            caller: symbols.intern("caller"),
            meta: symbols.intern("meta"),
            sys: symbols.intern("sys"),
            stdin: symbols.intern("stdin"),
            stdout: symbols.intern("stdout"),
            stderr: symbols.intern("stderr"),
        }
    }
}

/// Handles to the objects every runtime starts with.
#[derive(Debug, Clone, Copy)]
pub struct SpecialObjects {
    /// root of every parent chain; its own parent
    pub object: ObjectId,
    /// root of every meta chain; its own meta
    pub meta: ObjectId,
    pub global: ObjectId,
    /// the dynamic scope sends start from outside any activation
    pub dynamic: ObjectId,
    pub nil: ObjectId,
    pub boolean: ObjectId,
    pub true_: ObjectId,
    pub false_: ObjectId,
    pub number: ObjectId,
    pub text: ObjectId,
    pub stream: ObjectId,
    pub method: ObjectId,
    pub native: ObjectId,
    /// holds the native primitives
    pub kernel: ObjectId,
    pub sys: ObjectId,
}

/// Build the initial object graph.
///
/// `Object` and `Meta` are allocated as self-referential roots and then
/// patched so that `Object.meta = Meta` and `Meta.parent = Object`. Every
/// other special object is a clone of `Object` (or of `Boolean`).
pub fn bootstrap(
    heap: &mut Heap,
    symbols: &SymbolTable,
    names: &Names,
    standard_streams: bool,
) -> SpecialObjects {
    let object = heap.allocate_root();
    let meta = heap.allocate_root();
    heap[object].meta = meta;
    heap[meta].parent = object;

    let global = heap.clone_object(object);
    let dynamic = heap.clone_object(object);
    let nil = heap.clone_object(object);
    let boolean = heap.clone_object(object);
    let true_ = heap.clone_object(boolean);
    let false_ = heap.clone_object(boolean);
    let number = heap.clone_object(object);
    let text = heap.clone_object(object);
    let stream = heap.clone_object(object);
    let method = heap.clone_object(object);
    let native = heap.clone_object(object);
    let kernel = heap.clone_object(object);
    let sys = heap.clone_object(object);

    heap[number].set_prim(Primitive::Number(Number::Int(0)));
    heap[text].set_prim(Primitive::Text(String::new()));

    let specials = SpecialObjects {
        object,
        meta,
        global,
        dynamic,
        nil,
        boolean,
        true_,
        false_,
        number,
        text,
        stream,
        method,
        native,
        kernel,
        sys,
    };

    for (name, value) in [
        ("Object", object),
        ("Meta", meta),
        ("Global", global),
        ("Nil", nil),
        ("Boolean", boolean),
        ("True", true_),
        ("False", false_),
        ("Number", number),
        ("Text", text),
        ("Stream", stream),
        ("Method", method),
        ("Native", native),
        ("Kernel", kernel),
        ("Sys", sys),
    ] {
        heap[global].put(symbols.intern(name), value);
    }

    heap[meta].put(names.meta, meta);
    heap[meta].put(names.sys, sys);
    heap[meta].add_protection(names.meta, Protection::DELETE);
    heap[meta]
        .add_protection(names.sys, Protection::ASSIGN | Protection::DELETE);

    if standard_streams {
        for (name, handle) in [
            (names.stdin, StreamHandle::stdin()),
            (names.stdout, StreamHandle::stdout()),
            (names.stderr, StreamHandle::stderr()),
        ] {
            let id = heap.clone_object(stream);
            heap[id].set_prim(Primitive::Stream(handle));
            heap[sys].put(name, id);
        }
    }

    log::debug!(
        "bootstrapped {} special objects (standard streams: {})",
        heap.len(),
        standard_streams
    );
    specials
}
