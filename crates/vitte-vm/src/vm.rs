//! The dispatch loop: call frames, the value stack, globals, upvalue
//! capture/close, and class/instance/method machinery.

use tracing::trace;

use vitte_core::heap::{GcConfig, Heap, ObjRef};
use vitte_core::object::{Object, UpvalueState};
use vitte_core::table::Table;
use vitte_core::value::{values_equal, Value};
use vitte_core::OpCode;

use crate::error::RuntimeError;
use crate::natives::NATIVES;

const FRAMES_MAX: usize = 64;

#[derive(Debug, Clone, Copy)]
struct CallFrame {
    closure: ObjRef,
    ip: usize,
    base: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VmConfig {
    /// Print every instruction before it executes, the way `--trace` does
    /// for the reference VM's `DEBUG_TRACE_EXECUTION` build flag.
    pub trace: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

pub struct Vm {
    heap: Heap,
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    open_upvalues: Vec<ObjRef>,
    init_string: ObjRef,
    config: VmConfig,
    /// Everything `print` has written so far. `OP_PRINT` appends here
    /// rather than going straight to the process's real stdout, so a host
    /// (the CLI, a test) controls when and where it's flushed.
    pub stdout: String,
}

impl Vm {
    pub fn new(gc_config: GcConfig, config: VmConfig) -> Self {
        let mut heap = Heap::new(gc_config);
        let init_string = heap.intern("init");
        let mut vm = Vm {
            heap,
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            init_string,
            config,
            stdout: String::new(),
        };
        vm.define_natives();
        vm
    }

    fn define_natives(&mut self) {
        for &(name, arity, function) in NATIVES {
            let name_ref = self.heap.intern(name);
            let native_ref = self.heap.alloc_native(arity, function);
            let hash = self.heap.string_hash(name_ref);
            self.globals.set(name_ref, hash, Value::obj(native_ref));
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Compiles and runs `source` as a fresh top-level script.
    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let compiled = match vitte_compiler::compile(source, &mut self.heap) {
            Ok(f) => f,
            Err(errors) => {
                for e in errors {
                    eprintln!("{e}");
                }
                return InterpretResult::CompileError;
            }
        };

        let mut function = vitte_core::object::FunctionObj::new_script();
        function.arity = compiled.arity;
        function.upvalue_count = compiled.upvalue_count;
        function.chunk = compiled.chunk;
        let function_ref = self.heap.alloc_function(function);
        let closure_ref = self.heap.alloc_closure(function_ref, Vec::new());

        self.push(Value::obj(closure_ref));
        self.frames.push(CallFrame { closure: closure_ref, ip: 0, base: 0 });

        match self.run() {
            Ok(()) => InterpretResult::Ok,
            Err(e) => {
                eprintln!("{}", e.message);
                for line in &e.trace {
                    eprintln!("{line}");
                }
                self.stack.clear();
                self.frames.clear();
                InterpretResult::RuntimeError
            }
        }
    }

    // --- stack helpers ---------------------------------------------------

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow: compiler emitted unbalanced bytecode")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // --- chunk access ------------------------------------------------

    fn closure_function(&self, closure: ObjRef) -> ObjRef {
        match self.heap.get(closure) {
            Object::Closure(c) => c.function,
            _ => unreachable!("frame closure slot did not hold a closure"),
        }
    }

    fn current_function(&self) -> ObjRef {
        self.closure_function(self.frames.last().unwrap().closure)
    }

    fn code_len(&self, function: ObjRef) -> usize {
        match self.heap.get(function) {
            Object::Function(f) => f.chunk.code.len(),
            _ => unreachable!(),
        }
    }

    fn code_byte(&self, function: ObjRef, ip: usize) -> u8 {
        match self.heap.get(function) {
            Object::Function(f) => f.chunk.code[ip],
            _ => unreachable!(),
        }
    }

    fn constant_at(&self, function: ObjRef, index: u8) -> Value {
        match self.heap.get(function) {
            Object::Function(f) => f.chunk.consts[index as usize],
            _ => unreachable!(),
        }
    }

    fn line_at(&self, function: ObjRef, ip: usize) -> u32 {
        match self.heap.get(function) {
            Object::Function(f) => f.chunk.lines.line_for_offset(ip),
            _ => unreachable!(),
        }
    }

    fn read_byte(&mut self) -> u8 {
        let function = self.current_function();
        let frame = self.frames.last_mut().unwrap();
        let ip = frame.ip;
        frame.ip += 1;
        self.code_byte(function, ip)
    }

    fn read_u16(&mut self) -> u16 {
        let hi = self.read_byte() as u16;
        let lo = self.read_byte() as u16;
        (hi << 8) | lo
    }

    fn read_constant(&mut self) -> Value {
        let function = self.current_function();
        let index = self.read_byte();
        self.constant_at(function, index)
    }

    fn read_string(&mut self) -> ObjRef {
        self.read_constant().as_obj().expect("constant operand must be an interned string")
    }

    // --- error formatting -------------------------------------------------

    fn runtime_error(&self, message: impl Into<String>) -> RuntimeError {
        let mut trace = Vec::new();
        for frame in self.frames.iter().rev() {
            let function = self.closure_function(frame.closure);
            let line = self.line_at(function, frame.ip.saturating_sub(1));
            let name = match self.heap.get(function) {
                Object::Function(f) => f.name.map(|n| self.heap.as_str(n).to_string()).unwrap_or_else(|| "script".to_string()),
                _ => "script".to_string(),
            };
            trace.push(format!("[line {line}] in {name}"));
        }
        RuntimeError::new(message, trace)
    }

    // --- upvalues -----------------------------------------------------

    fn capture_upvalue(&mut self, stack_slot: usize) -> ObjRef {
        let position = self
            .open_upvalues
            .iter()
            .position(|&r| matches!(self.heap.get(r), Object::Upvalue(u) if matches!(u.state, UpvalueState::Open(s) if s == stack_slot)));
        if let Some(i) = position {
            return self.open_upvalues[i];
        }
        let created = self.heap.alloc_open_upvalue(stack_slot);
        self.open_upvalues.push(created);
        created
    }

    fn close_upvalues(&mut self, from_slot: usize) {
        let mut i = 0;
        while i < self.open_upvalues.len() {
            let r = self.open_upvalues[i];
            let slot = match self.heap.get(r) {
                Object::Upvalue(u) => match u.state {
                    UpvalueState::Open(s) => s,
                    UpvalueState::Closed(_) => {
                        i += 1;
                        continue;
                    }
                },
                _ => unreachable!(),
            };
            if slot >= from_slot {
                let value = self.stack[slot];
                if let Object::Upvalue(u) = self.heap.get_mut(r) {
                    u.state = UpvalueState::Closed(value);
                }
                self.open_upvalues.remove(i);
            } else {
                i += 1;
            }
        }
    }

    // --- calls ---------------------------------------------------------

    fn call_closure(&mut self, closure: ObjRef, arg_count: u8) -> Result<(), RuntimeError> {
        let function = self.closure_function(closure);
        let arity = match self.heap.get(function) {
            Object::Function(f) => f.arity,
            _ => unreachable!(),
        };
        if arg_count != arity {
            return Err(self.runtime_error(format!("Expected {arity} arguments but got {arg_count}.")));
        }
        if self.frames.len() >= FRAMES_MAX {
            return Err(self.runtime_error("Stack overflow."));
        }
        let base = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame { closure, ip: 0, base });
        Ok(())
    }

    fn call_value(&mut self, callee: Value, arg_count: u8) -> Result<(), RuntimeError> {
        let Some(r) = callee.as_obj() else {
            return Err(self.runtime_error("Can only call functions and classes."));
        };
        match self.heap.get(r) {
            Object::Closure(_) => self.call_closure(r, arg_count),
            Object::Native(n) => {
                let function = n.function;
                let start = self.stack.len() - arg_count as usize;
                let args: Vec<Value> = self.stack[start..].to_vec();
                match function(&args) {
                    Ok(result) => {
                        self.stack.truncate(start - 1);
                        self.push(result);
                        Ok(())
                    }
                    Err(message) => Err(self.runtime_error(message)),
                }
            }
            Object::Class(_) => {
                let instance = self.heap.alloc_instance(r);
                let start = self.stack.len() - arg_count as usize - 1;
                self.stack[start] = Value::obj(instance);
                let hash = self.heap.string_hash(self.init_string);
                let initializer = match self.heap.get(r) {
                    Object::Class(c) => c.methods.get(self.init_string, hash),
                    _ => unreachable!(),
                };
                match initializer {
                    Some(init) => self.call_closure(init.as_obj().unwrap(), arg_count),
                    None if arg_count != 0 => Err(self.runtime_error(format!("Expected 0 arguments but got {arg_count}."))),
                    None => Ok(()),
                }
            }
            Object::BoundMethod(b) => {
                let (receiver, method) = (b.receiver, b.method);
                let start = self.stack.len() - arg_count as usize - 1;
                self.stack[start] = receiver;
                self.call_closure(method, arg_count)
            }
            _ => Err(self.runtime_error("Can only call functions and classes.")),
        }
    }

    fn invoke_from_class(&mut self, class: ObjRef, name: ObjRef, arg_count: u8) -> Result<(), RuntimeError> {
        let hash = self.heap.string_hash(name);
        let method = match self.heap.get(class) {
            Object::Class(c) => c.methods.get(name, hash),
            _ => unreachable!(),
        };
        match method {
            Some(m) => self.call_closure(m.as_obj().unwrap(), arg_count),
            None => Err(self.runtime_error(format!("Undefined property '{}'.", self.heap.as_str(name)))),
        }
    }

    fn invoke(&mut self, name: ObjRef, arg_count: u8) -> Result<(), RuntimeError> {
        let receiver = self.peek(arg_count as usize);
        let Some(r) = receiver.as_obj() else {
            return Err(self.runtime_error("Only instances have methods."));
        };
        let hash = self.heap.string_hash(name);
        let (class, field) = match self.heap.get(r) {
            Object::Instance(inst) => (inst.class, inst.fields.get(name, hash)),
            _ => return Err(self.runtime_error("Only instances have methods.")),
        };
        if let Some(value) = field {
            let start = self.stack.len() - arg_count as usize - 1;
            self.stack[start] = value;
            self.call_value(value, arg_count)
        } else {
            self.invoke_from_class(class, name, arg_count)
        }
    }

    fn bind_method(&mut self, class: ObjRef, name: ObjRef) -> Result<(), RuntimeError> {
        let hash = self.heap.string_hash(name);
        let method = match self.heap.get(class) {
            Object::Class(c) => c.methods.get(name, hash),
            _ => unreachable!(),
        };
        let Some(method_value) = method else {
            return Err(self.runtime_error(format!("Undefined property '{}'.", self.heap.as_str(name))));
        };
        let receiver = self.pop();
        let bound = self.heap.alloc_bound_method(receiver, method_value.as_obj().unwrap());
        self.push(Value::obj(bound));
        Ok(())
    }

    // --- garbage collection --------------------------------------------

    fn mark_roots(&mut self) {
        for &v in &self.stack {
            self.heap.mark_value(v);
        }
        for frame in &self.frames {
            self.heap.mark_object(frame.closure);
        }
        for &u in &self.open_upvalues {
            self.heap.mark_object(u);
        }
        self.heap.mark_object(self.init_string);
        let globals = std::mem::replace(&mut self.globals, Table::new());
        self.heap.mark_table(&globals);
        self.globals = globals;
        for r in self.heap.extra_roots.clone() {
            self.heap.mark_object(r);
        }
    }

    fn collect_garbage(&mut self) {
        if !self.heap.should_collect() {
            return;
        }
        let before = self.heap.bytes_allocated();
        self.mark_roots();
        self.heap.trace_references();
        self.heap.sweep();
        trace!(target: "gc", before, after = self.heap.bytes_allocated(), "collected");
    }

    // --- the loop -----------------------------------------------------

    fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.config.trace {
                let function = self.current_function();
                let ip = self.frames.last().unwrap().ip;
                if ip < self.code_len(function) {
                    let stack: Vec<String> = self.stack.iter().map(|v| format!("[ {v:?} ]")).collect();
                    let line = match self.heap.get(function) {
                        Object::Function(f) => {
                            let (text, _) = vitte_core::bytecode::disasm::disassemble_instruction(&f.chunk, ip);
                            text
                        }
                        _ => String::new(),
                    };
                    eprintln!("{}{line}", stack.concat());
                }
            }

            let op_byte = self.read_byte();
            let op = OpCode::try_from(op_byte).map_err(|e| self.runtime_error(e.to_string()))?;

            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::nil()),
                OpCode::True => self.push(Value::bool(true)),
                OpCode::False => self.push(Value::bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().base;
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().base;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.string_hash(name);
                    match self.globals.get(name, hash) {
                        Some(v) => self.push(v),
                        None => return Err(self.runtime_error(format!("Undefined variable '{}'.", self.heap.as_str(name)))),
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.string_hash(name);
                    let value = self.peek(0);
                    self.globals.set(name, hash, value);
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.string_hash(name);
                    let value = self.peek(0);
                    if self.globals.set(name, hash, value) {
                        self.globals.delete(name, hash);
                        return Err(self.runtime_error(format!("Undefined variable '{}'.", self.heap.as_str(name))));
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue_ref = match self.heap.get(closure) {
                        Object::Closure(c) => c.upvalues[slot],
                        _ => unreachable!(),
                    };
                    let value = match self.heap.get(upvalue_ref) {
                        Object::Upvalue(u) => match u.state {
                            UpvalueState::Open(s) => self.stack[s],
                            UpvalueState::Closed(v) => v,
                        },
                        _ => unreachable!(),
                    };
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue_ref = match self.heap.get(closure) {
                        Object::Closure(c) => c.upvalues[slot],
                        _ => unreachable!(),
                    };
                    let value = self.peek(0);
                    let state = match self.heap.get(upvalue_ref) {
                        Object::Upvalue(u) => u.state,
                        _ => unreachable!(),
                    };
                    match state {
                        UpvalueState::Open(s) => self.stack[s] = value,
                        UpvalueState::Closed(_) => {
                            if let Object::Upvalue(u) = self.heap.get_mut(upvalue_ref) {
                                u.state = UpvalueState::Closed(value);
                            }
                        }
                    }
                }
                OpCode::GetProperty => {
                    let name = self.read_string();
                    let receiver = self.peek(0);
                    let Some(r) = receiver.as_obj() else {
                        return Err(self.runtime_error("Only instances have properties."));
                    };
                    let hash = self.heap.string_hash(name);
                    let (class, field) = match self.heap.get(r) {
                        Object::Instance(inst) => (inst.class, inst.fields.get(name, hash)),
                        _ => return Err(self.runtime_error("Only instances have properties.")),
                    };
                    if let Some(value) = field {
                        self.pop();
                        self.push(value);
                    } else {
                        self.bind_method(class, name)?;
                    }
                }
                OpCode::SetProperty => {
                    let name = self.read_string();
                    let receiver = self.peek(1);
                    let Some(r) = receiver.as_obj() else {
                        return Err(self.runtime_error("Only instances have fields."));
                    };
                    let value = self.peek(0);
                    let hash = self.heap.string_hash(name);
                    match self.heap.get_mut(r) {
                        Object::Instance(inst) => {
                            inst.fields.set(name, hash, value);
                        }
                        _ => return Err(self.runtime_error("Only instances have fields.")),
                    }
                    let value = self.pop();
                    self.pop();
                    self.push(value);
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop().as_obj().expect("superclass operand must be a class");
                    self.bind_method(superclass, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::bool(values_equal(a, b)));
                }
                OpCode::Greater => self.numeric_binary(|a, b| Value::bool(a > b))?,
                OpCode::Less => self.numeric_binary(|a, b| Value::bool(a < b))?,
                OpCode::Add => self.add()?,
                OpCode::Subtract => self.numeric_binary(|a, b| Value::number(a - b))?,
                OpCode::Multiply => self.numeric_binary(|a, b| Value::number(a * b))?,
                OpCode::Divide => self.numeric_binary(|a, b| Value::number(a / b))?,
                OpCode::Not => {
                    let v = self.pop();
                    self.push(Value::bool(v.is_falsey()));
                }
                OpCode::Negate => {
                    let v = self.peek(0);
                    let Some(n) = v.as_number() else {
                        return Err(self.runtime_error("Operand must be a number."));
                    };
                    self.pop();
                    self.push(Value::number(-n));
                }
                OpCode::Print => {
                    let value = self.pop();
                    let text = self.stringify(value);
                    self.stdout.push_str(&text);
                    self.stdout.push('\n');
                }
                OpCode::Jump => {
                    let offset = self.read_u16();
                    self.frames.last_mut().unwrap().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16();
                    if self.peek(0).is_falsey() {
                        self.frames.last_mut().unwrap().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16();
                    self.frames.last_mut().unwrap().ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte();
                    let callee = self.peek(arg_count as usize);
                    self.call_value(callee, arg_count)?;
                }
                OpCode::Invoke => {
                    let name = self.read_string();
                    let arg_count = self.read_byte();
                    self.invoke(name, arg_count)?;
                }
                OpCode::SuperInvoke => {
                    let name = self.read_string();
                    let arg_count = self.read_byte();
                    let superclass = self.pop().as_obj().expect("superclass operand must be a class");
                    self.invoke_from_class(superclass, name, arg_count)?;
                }
                OpCode::Closure => {
                    let value = self.read_constant();
                    let function_ref = value.as_obj().expect("closure constant must reference a function");
                    let upvalue_count = match self.heap.get(function_ref) {
                        Object::Function(f) => f.upvalue_count,
                        _ => unreachable!(),
                    };
                    let mut upvalues = Vec::with_capacity(upvalue_count as usize);
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte() != 0;
                        let index = self.read_byte() as usize;
                        if is_local {
                            let base = self.frames.last().unwrap().base;
                            upvalues.push(self.capture_upvalue(base + index));
                        } else {
                            let enclosing = self.frames.last().unwrap().closure;
                            let up = match self.heap.get(enclosing) {
                                Object::Closure(c) => c.upvalues[index],
                                _ => unreachable!(),
                            };
                            upvalues.push(up);
                        }
                    }
                    let closure = self.heap.alloc_closure(function_ref, upvalues);
                    self.push(Value::obj(closure));
                }
                OpCode::CloseUpvalue => {
                    self.close_upvalues(self.stack.len() - 1);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().unwrap();
                    self.close_upvalues(frame.base);
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(frame.base);
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string();
                    let class = self.heap.alloc_class(name);
                    self.push(Value::obj(class));
                }
                OpCode::Inherit => {
                    let superclass_val = self.peek(1);
                    let Some(superclass_ref) = superclass_val.as_obj() else {
                        return Err(self.runtime_error("Superclass must be a class."));
                    };
                    if !matches!(self.heap.get(superclass_ref), Object::Class(_)) {
                        return Err(self.runtime_error("Superclass must be a class."));
                    }
                    let subclass_val = self.peek(0);
                    let subclass_ref = subclass_val.as_obj().unwrap();
                    let super_methods = match self.heap.get(superclass_ref) {
                        Object::Class(c) => c.methods.snapshot(),
                        _ => unreachable!(),
                    };
                    let super_methods: Vec<(ObjRef, u32, Value)> =
                        super_methods.into_iter().map(|(k, v)| (k, self.heap.string_hash(k), v)).collect();
                    if let Object::Class(sub) = self.heap.get_mut(subclass_ref) {
                        for (key, hash, value) in super_methods {
                            sub.methods.set(key, hash, value);
                        }
                    }
                    self.pop();
                }
                OpCode::Method => {
                    let name = self.read_string();
                    let method = self.peek(0);
                    let class_val = self.peek(1);
                    let class_ref = class_val.as_obj().unwrap();
                    let hash = self.heap.string_hash(name);
                    if let Object::Class(class) = self.heap.get_mut(class_ref) {
                        class.methods.set(name, hash, method);
                    }
                    self.pop();
                }
            }

            self.collect_garbage();
        }
    }

    fn numeric_binary(&mut self, op: impl Fn(f64, f64) -> Value) -> Result<(), RuntimeError> {
        let b = self.peek(0).as_number();
        let a = self.peek(1).as_number();
        match (a, b) {
            (Some(a), Some(b)) => {
                self.pop();
                self.pop();
                self.push(op(a, b));
                Ok(())
            }
            _ => Err(self.runtime_error("Operands must be numbers.")),
        }
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        let b = self.peek(0);
        let a = self.peek(1);
        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            self.pop();
            self.pop();
            self.push(Value::number(x + y));
            return Ok(());
        }
        if let (Some(ra), Some(rb)) = (a.as_obj(), b.as_obj()) {
            if matches!(self.heap.get(ra), Object::Str(_)) && matches!(self.heap.get(rb), Object::Str(_)) {
                let sa = self.heap.as_str(ra).to_string();
                let sb = self.heap.as_str(rb).to_string();
                self.pop();
                self.pop();
                let combined = self.heap.intern(&(sa + &sb));
                self.push(Value::obj(combined));
                return Ok(());
            }
        }
        Err(self.runtime_error("Operands must be two numbers or two strings."))
    }

    fn stringify(&mut self, value: Value) -> String {
        if value.is_nil() {
            return "nil".to_string();
        }
        if let Some(b) = value.as_bool() {
            return b.to_string();
        }
        if let Some(n) = value.as_number() {
            return format_number(n);
        }
        let r = value.as_obj().unwrap();
        match self.heap.get(r) {
            Object::Str(_) => self.heap.as_str(r).to_string(),
            Object::Function(f) => match f.name {
                Some(n) => format!("<fn {}>", self.heap.as_str(n)),
                None => "<script>".to_string(),
            },
            Object::Closure(c) => {
                let function = c.function;
                match self.heap.get(function) {
                    Object::Function(f) => match f.name {
                        Some(n) => format!("<fn {}>", self.heap.as_str(n)),
                        None => "<script>".to_string(),
                    },
                    _ => unreachable!(),
                }
            }
            Object::Native(_) => "<native fn>".to_string(),
            Object::Class(c) => self.heap.as_str(c.name).to_string(),
            Object::Instance(inst) => {
                let class = inst.class;
                let name = match self.heap.get(class) {
                    Object::Class(c) => self.heap.as_str(c.name).to_string(),
                    _ => unreachable!(),
                };
                format!("{name} instance")
            }
            Object::BoundMethod(b) => {
                let method = b.method;
                let function = self.closure_function(method);
                match self.heap.get(function) {
                    Object::Function(f) => match f.name {
                        Some(n) => format!("<fn {}>", self.heap.as_str(n)),
                        None => "<script>".to_string(),
                    },
                    _ => unreachable!(),
                }
            }
            Object::Upvalue(_) => "<upvalue>".to_string(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{n}")
    } else {
        format!("{n}")
    }
}
