//! Pickle opcode interpreter.
//!
//! Memoized objects are stored once and referenced from the stack by id, so
//! mutations made after `MEMOIZE`/`PUT` (the normal order for containers) are
//! visible through every later `GET`. References are resolved into plain
//! [`Value`]s when the stream reaches `STOP`.

use super::{PickleError, Value, HIGHEST_PROTOCOL};
use std::collections::HashMap;

/// Maximum nesting depth (and reference chain length) followed while
/// resolving the object graph. Results dicts nest a handful of levels.
const MAX_DEPTH: usize = 64;

mod op {
    pub const MARK: u8 = b'(';
    pub const STOP: u8 = b'.';
    pub const POP: u8 = b'0';
    pub const POP_MARK: u8 = b'1';
    pub const DUP: u8 = b'2';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const BININT: u8 = b'J';
    pub const BININT1: u8 = b'K';
    pub const LONG: u8 = b'L';
    pub const BININT2: u8 = b'M';
    pub const NONE: u8 = b'N';
    pub const PERSID: u8 = b'P';
    pub const BINPERSID: u8 = b'Q';
    pub const REDUCE: u8 = b'R';
    pub const STRING: u8 = b'S';
    pub const BINSTRING: u8 = b'T';
    pub const SHORT_BINSTRING: u8 = b'U';
    pub const UNICODE: u8 = b'V';
    pub const BINUNICODE: u8 = b'X';
    pub const APPEND: u8 = b'a';
    pub const BUILD: u8 = b'b';
    pub const GLOBAL: u8 = b'c';
    pub const DICT: u8 = b'd';
    pub const EMPTY_DICT: u8 = b'}';
    pub const APPENDS: u8 = b'e';
    pub const GET: u8 = b'g';
    pub const BINGET: u8 = b'h';
    pub const INST: u8 = b'i';
    pub const LONG_BINGET: u8 = b'j';
    pub const LIST: u8 = b'l';
    pub const EMPTY_LIST: u8 = b']';
    pub const OBJ: u8 = b'o';
    pub const PUT: u8 = b'p';
    pub const BINPUT: u8 = b'q';
    pub const LONG_BINPUT: u8 = b'r';
    pub const SETITEM: u8 = b's';
    pub const TUPLE: u8 = b't';
    pub const EMPTY_TUPLE: u8 = b')';
    pub const SETITEMS: u8 = b'u';
    pub const BINFLOAT: u8 = b'G';

    // Protocol 2
    pub const PROTO: u8 = 0x80;
    pub const NEWOBJ: u8 = 0x81;
    pub const EXT1: u8 = 0x82;
    pub const EXT2: u8 = 0x83;
    pub const EXT4: u8 = 0x84;
    pub const TUPLE1: u8 = 0x85;
    pub const TUPLE2: u8 = 0x86;
    pub const TUPLE3: u8 = 0x87;
    pub const NEWTRUE: u8 = 0x88;
    pub const NEWFALSE: u8 = 0x89;
    pub const LONG1: u8 = 0x8a;
    pub const LONG4: u8 = 0x8b;

    // Protocol 3
    pub const BINBYTES: u8 = b'B';
    pub const SHORT_BINBYTES: u8 = b'C';

    // Protocol 4
    pub const SHORT_BINUNICODE: u8 = 0x8c;
    pub const BINUNICODE8: u8 = 0x8d;
    pub const BINBYTES8: u8 = 0x8e;
    pub const EMPTY_SET: u8 = 0x8f;
    pub const ADDITEMS: u8 = 0x90;
    pub const FROZENSET: u8 = 0x91;
    pub const NEWOBJ_EX: u8 = 0x92;
    pub const STACK_GLOBAL: u8 = 0x93;
    pub const MEMOIZE: u8 = 0x94;
    pub const FRAME: u8 = 0x95;

    // Protocol 5
    pub const BYTEARRAY8: u8 = 0x96;
    pub const NEXT_BUFFER: u8 = 0x97;
    pub const READONLY_BUFFER: u8 = 0x98;
}

/// Stack entry: a value under construction, or a reference into the memo.
#[derive(Debug, Clone)]
enum Node {
    Leaf(Value),
    List(Vec<Node>),
    Tuple(Vec<Node>),
    Set(Vec<Node>),
    Dict(Vec<(Node, Node)>),
    Object {
        class: Box<Node>,
        args: Vec<Node>,
        state: Option<Box<Node>>,
    },
    Ref(usize),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "scalar",
            Node::List(_) => "list",
            Node::Tuple(_) => "tuple",
            Node::Set(_) => "set",
            Node::Dict(_) => "dict",
            Node::Object { .. } => "object",
            Node::Ref(_) => "reference",
        }
    }
}

/// Pickle virtual machine over an in-memory byte stream.
pub struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    stack: Vec<Node>,
    marks: Vec<usize>,
    memo: HashMap<usize, Node>,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over a complete pickle stream.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
        }
    }

    /// Run the stream to `STOP` and return the top-level object.
    pub fn decode(mut self) -> Result<Value, PickleError> {
        loop {
            let offset = self.pos;
            let opcode = self.read_u8()?;

            match opcode {
                op::STOP => {
                    let top = self.pop(offset)?;
                    return self.resolve(top);
                }
                op::PROTO => {
                    let version = self.read_u8()?;
                    if version > HIGHEST_PROTOCOL {
                        return Err(PickleError::Protocol(version));
                    }
                }
                op::FRAME => {
                    // Frames only bound prefetching; the whole stream is in memory.
                    self.take(8)?;
                }

                // Stack manipulation
                op::MARK => self.marks.push(self.stack.len()),
                op::POP => {
                    if self.marks.last() == Some(&self.stack.len()) {
                        self.marks.pop();
                    } else {
                        self.pop(offset)?;
                    }
                }
                op::POP_MARK => {
                    self.pop_mark(offset)?;
                }
                op::DUP => {
                    let top = self.stack.last().cloned().ok_or(PickleError::StackUnderflow(offset))?;
                    self.stack.push(top);
                }

                // Scalars
                op::NONE => self.push_value(Value::None),
                op::NEWTRUE => self.push_value(Value::Bool(true)),
                op::NEWFALSE => self.push_value(Value::Bool(false)),
                op::INT => {
                    let text = self.read_text_line(offset)?;
                    let value = match text.as_str() {
                        "01" => Value::Bool(true),
                        "00" => Value::Bool(false),
                        other => parse_int_text(other)?,
                    };
                    self.push_value(value);
                }
                op::BININT => {
                    let n = i32::from_le_bytes(self.read_array()?);
                    self.push_value(Value::Int(i64::from(n)));
                }
                op::BININT1 => {
                    let n = self.read_u8()?;
                    self.push_value(Value::Int(i64::from(n)));
                }
                op::BININT2 => {
                    let n = u16::from_le_bytes(self.read_array()?);
                    self.push_value(Value::Int(i64::from(n)));
                }
                op::LONG => {
                    let text = self.read_text_line(offset)?;
                    let value = parse_int_text(text.trim_end_matches('L'))?;
                    self.push_value(value);
                }
                op::LONG1 => {
                    let len = usize::from(self.read_u8()?);
                    let bytes = self.take(len)?;
                    self.push_value(long_from_bytes(bytes));
                }
                op::LONG4 => {
                    let len = self.read_len_i32()?;
                    let bytes = self.take(len)?;
                    self.push_value(long_from_bytes(bytes));
                }
                op::FLOAT => {
                    let text = self.read_text_line(offset)?;
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| PickleError::Literal(text.clone()))?;
                    self.push_value(Value::Float(value));
                }
                op::BINFLOAT => {
                    let value = f64::from_be_bytes(self.read_array()?);
                    self.push_value(Value::Float(value));
                }

                // Strings and bytes
                op::STRING => {
                    let line = self.read_line()?;
                    let value = unquote_string(line)?;
                    self.push_value(Value::String(value));
                }
                op::BINSTRING => {
                    let len = self.read_len_i32()?;
                    let bytes = self.take(len)?;
                    self.push_value(Value::String(latin1(bytes)));
                }
                op::SHORT_BINSTRING => {
                    let len = usize::from(self.read_u8()?);
                    let bytes = self.take(len)?;
                    self.push_value(Value::String(latin1(bytes)));
                }
                op::UNICODE => {
                    let line = self.read_line()?;
                    let value = raw_unicode_unescape(line, offset)?;
                    self.push_value(Value::String(value));
                }
                op::SHORT_BINUNICODE => {
                    let len = usize::from(self.read_u8()?);
                    self.push_utf8(len, offset)?;
                }
                op::BINUNICODE => {
                    let len = self.read_len_u32()?;
                    self.push_utf8(len, offset)?;
                }
                op::BINUNICODE8 => {
                    let len = self.read_len_u64()?;
                    self.push_utf8(len, offset)?;
                }
                op::SHORT_BINBYTES => {
                    let len = usize::from(self.read_u8()?);
                    let bytes = self.take(len)?.to_vec();
                    self.push_value(Value::Bytes(bytes));
                }
                op::BINBYTES => {
                    let len = self.read_len_u32()?;
                    let bytes = self.take(len)?.to_vec();
                    self.push_value(Value::Bytes(bytes));
                }
                op::BINBYTES8 | op::BYTEARRAY8 => {
                    let len = self.read_len_u64()?;
                    let bytes = self.take(len)?.to_vec();
                    self.push_value(Value::Bytes(bytes));
                }

                // Containers
                op::EMPTY_LIST => self.stack.push(Node::List(Vec::new())),
                op::LIST => {
                    let items = self.pop_mark(offset)?;
                    self.stack.push(Node::List(items));
                }
                op::APPEND => {
                    let item = self.pop(offset)?;
                    self.extend_list(vec![item], offset)?;
                }
                op::APPENDS => {
                    let items = self.pop_mark(offset)?;
                    self.extend_list(items, offset)?;
                }
                op::EMPTY_TUPLE => self.stack.push(Node::Tuple(Vec::new())),
                op::TUPLE => {
                    let items = self.pop_mark(offset)?;
                    self.stack.push(Node::Tuple(items));
                }
                op::TUPLE1 | op::TUPLE2 | op::TUPLE3 => {
                    let n = usize::from(opcode - op::TUPLE1 + 1);
                    let items = self.pop_n(n, offset)?;
                    self.stack.push(Node::Tuple(items));
                }
                op::EMPTY_DICT => self.stack.push(Node::Dict(Vec::new())),
                op::DICT => {
                    let items = self.pop_mark(offset)?;
                    let pairs = into_pairs(items, offset)?;
                    self.stack.push(Node::Dict(pairs));
                }
                op::SETITEM => {
                    let value = self.pop(offset)?;
                    let key = self.pop(offset)?;
                    self.extend_dict(vec![(key, value)], offset)?;
                }
                op::SETITEMS => {
                    let items = self.pop_mark(offset)?;
                    let pairs = into_pairs(items, offset)?;
                    self.extend_dict(pairs, offset)?;
                }
                op::EMPTY_SET => self.stack.push(Node::Set(Vec::new())),
                op::ADDITEMS => {
                    let items = self.pop_mark(offset)?;
                    match self.top_target(offset)? {
                        Node::Set(set) => set.extend(items),
                        other => {
                            return Err(PickleError::Unsupported(format!(
                                "ADDITEMS on {}",
                                other.kind()
                            )))
                        }
                    }
                }
                op::FROZENSET => {
                    let items = self.pop_mark(offset)?;
                    self.stack.push(Node::Set(items));
                }

                // Memo
                op::PUT => {
                    let text = self.read_text_line(offset)?;
                    let id = parse_memo_key(&text)?;
                    self.memoize(id, offset)?;
                }
                op::BINPUT => {
                    let id = usize::from(self.read_u8()?);
                    self.memoize(id, offset)?;
                }
                op::LONG_BINPUT => {
                    let id = self.read_len_u32()?;
                    self.memoize(id, offset)?;
                }
                op::MEMOIZE => {
                    let id = self.memo.len();
                    self.memoize(id, offset)?;
                }
                op::GET => {
                    let text = self.read_text_line(offset)?;
                    let id = parse_memo_key(&text)?;
                    self.push_ref(id)?;
                }
                op::BINGET => {
                    let id = usize::from(self.read_u8()?);
                    self.push_ref(id)?;
                }
                op::LONG_BINGET => {
                    let id = self.read_len_u32()?;
                    self.push_ref(id)?;
                }

                // Objects
                op::GLOBAL => {
                    let module = self.read_text_line(offset)?;
                    let name = self.read_text_line(offset)?;
                    self.push_value(Value::Global { module, name });
                }
                op::STACK_GLOBAL => {
                    let name = self.pop(offset)?;
                    let module = self.pop(offset)?;
                    match (self.resolve(module)?, self.resolve(name)?) {
                        (Value::String(module), Value::String(name)) => {
                            self.push_value(Value::Global { module, name })
                        }
                        _ => {
                            return Err(PickleError::Unsupported(
                                "STACK_GLOBAL with non-string operands".to_string(),
                            ))
                        }
                    }
                }
                op::REDUCE => {
                    let args = self.pop(offset)?;
                    let callable = self.pop(offset)?;
                    let args = self.tuple_items(args)?;
                    let node = self.reduce(callable, args)?;
                    self.stack.push(node);
                }
                op::NEWOBJ => {
                    let args = self.pop(offset)?;
                    let class = self.pop(offset)?;
                    let args = self.tuple_items(args)?;
                    self.stack.push(Node::Object {
                        class: Box::new(class),
                        args,
                        state: None,
                    });
                }
                op::NEWOBJ_EX => {
                    let _kwargs = self.pop(offset)?;
                    let args = self.pop(offset)?;
                    let class = self.pop(offset)?;
                    let args = self.tuple_items(args)?;
                    self.stack.push(Node::Object {
                        class: Box::new(class),
                        args,
                        state: None,
                    });
                }
                op::INST => {
                    let module = self.read_text_line(offset)?;
                    let name = self.read_text_line(offset)?;
                    let args = self.pop_mark(offset)?;
                    self.stack.push(Node::Object {
                        class: Box::new(Node::Leaf(Value::Global { module, name })),
                        args,
                        state: None,
                    });
                }
                op::OBJ => {
                    let mut items = self.pop_mark(offset)?;
                    if items.is_empty() {
                        return Err(PickleError::StackUnderflow(offset));
                    }
                    let class = items.remove(0);
                    self.stack.push(Node::Object {
                        class: Box::new(class),
                        args: items,
                        state: None,
                    });
                }
                op::BUILD => {
                    let state = self.pop(offset)?;
                    match self.top_target(offset)? {
                        Node::Object { state: slot, .. } => *slot = Some(Box::new(state)),
                        other => {
                            return Err(PickleError::Unsupported(format!(
                                "BUILD on {}",
                                other.kind()
                            )))
                        }
                    }
                }

                // In-band buffers are already materialised as bytes.
                op::READONLY_BUFFER => {}
                op::NEXT_BUFFER => {
                    return Err(PickleError::Unsupported(
                        "out-of-band buffers".to_string(),
                    ))
                }
                op::PERSID | op::BINPERSID => {
                    return Err(PickleError::Unsupported("persistent ids".to_string()))
                }
                op::EXT1 | op::EXT2 | op::EXT4 => {
                    return Err(PickleError::Unsupported("extension registry".to_string()))
                }

                _ => return Err(PickleError::UnknownOpcode { opcode, offset }),
            }
        }
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    fn take(&mut self, n: usize) -> Result<&'a [u8], PickleError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.input.len())
            .ok_or(PickleError::Eof(self.input.len()))?;
        let input: &'a [u8] = self.input;
        let slice = &input[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, PickleError> {
        Ok(self.take(1)?[0])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PickleError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn read_len_i32(&mut self) -> Result<usize, PickleError> {
        let n = i32::from_le_bytes(self.read_array()?);
        usize::try_from(n).map_err(|_| PickleError::Literal(format!("negative length {}", n)))
    }

    fn read_len_u32(&mut self) -> Result<usize, PickleError> {
        let n = u32::from_le_bytes(self.read_array()?);
        usize::try_from(n).map_err(|_| PickleError::Unsupported(format!("length {}", n)))
    }

    fn read_len_u64(&mut self) -> Result<usize, PickleError> {
        let n = u64::from_le_bytes(self.read_array()?);
        usize::try_from(n).map_err(|_| PickleError::Unsupported(format!("length {}", n)))
    }

    /// Read up to the next newline, excluding it (and a trailing `\r`).
    fn read_line(&mut self) -> Result<&'a [u8], PickleError> {
        let rest = &self.input[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(PickleError::Eof(self.input.len()))?;
        let line = self.take(len)?;
        self.take(1)?;
        Ok(line.strip_suffix(b"\r").unwrap_or(line))
    }

    fn read_text_line(&mut self, offset: usize) -> Result<String, PickleError> {
        let line = self.read_line()?;
        String::from_utf8(line.to_vec()).map_err(|_| PickleError::Utf8(offset))
    }

    // ------------------------------------------------------------------
    // Stack
    // ------------------------------------------------------------------

    fn push_value(&mut self, value: Value) {
        self.stack.push(Node::Leaf(value));
    }

    fn push_utf8(&mut self, len: usize, offset: usize) -> Result<(), PickleError> {
        let bytes = self.take(len)?;
        let text = std::str::from_utf8(bytes).map_err(|_| PickleError::Utf8(offset))?;
        self.push_value(Value::String(text.to_string()));
        Ok(())
    }

    fn pop(&mut self, offset: usize) -> Result<Node, PickleError> {
        let floor = self.marks.last().copied().unwrap_or(0);
        if self.stack.len() <= floor {
            return Err(PickleError::StackUnderflow(offset));
        }
        self.stack.pop().ok_or(PickleError::StackUnderflow(offset))
    }

    fn pop_n(&mut self, n: usize, offset: usize) -> Result<Vec<Node>, PickleError> {
        let floor = self.marks.last().copied().unwrap_or(0);
        if self.stack.len() < floor + n {
            return Err(PickleError::StackUnderflow(offset));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn pop_mark(&mut self, offset: usize) -> Result<Vec<Node>, PickleError> {
        let mark = self.marks.pop().ok_or(PickleError::MissingMark(offset))?;
        Ok(self.stack.split_off(mark))
    }

    /// The container on top of the stack, following memo references.
    fn top_target(&mut self, offset: usize) -> Result<&mut Node, PickleError> {
        let top_ref = match self.stack.last() {
            None => return Err(PickleError::StackUnderflow(offset)),
            Some(Node::Ref(id)) => Some(*id),
            Some(_) => None,
        };
        let Some(mut id) = top_ref else {
            return self.stack.last_mut().ok_or(PickleError::StackUnderflow(offset));
        };

        let mut hops = 0;
        while let Some(Node::Ref(next)) = self.memo.get(&id) {
            id = *next;
            hops += 1;
            if hops > MAX_DEPTH {
                return Err(PickleError::Recursion);
            }
        }
        self.memo.get_mut(&id).ok_or(PickleError::MemoKey(id))
    }

    fn extend_list(&mut self, items: Vec<Node>, offset: usize) -> Result<(), PickleError> {
        match self.top_target(offset)? {
            Node::List(list) => {
                list.extend(items);
                Ok(())
            }
            other => Err(PickleError::Unsupported(format!("APPEND to {}", other.kind()))),
        }
    }

    fn extend_dict(&mut self, pairs: Vec<(Node, Node)>, offset: usize) -> Result<(), PickleError> {
        match self.top_target(offset)? {
            Node::Dict(dict) => {
                dict.extend(pairs);
                Ok(())
            }
            other => Err(PickleError::Unsupported(format!("SETITEM on {}", other.kind()))),
        }
    }

    // ------------------------------------------------------------------
    // Memo
    // ------------------------------------------------------------------

    fn memoize(&mut self, id: usize, offset: usize) -> Result<(), PickleError> {
        let top = self.stack.last_mut().ok_or(PickleError::StackUnderflow(offset))?;
        if matches!(top, Node::Ref(existing) if *existing == id) {
            return Ok(());
        }
        let node = std::mem::replace(top, Node::Ref(id));
        self.memo.insert(id, node);
        Ok(())
    }

    fn push_ref(&mut self, id: usize) -> Result<(), PickleError> {
        if !self.memo.contains_key(&id) {
            return Err(PickleError::MemoKey(id));
        }
        self.stack.push(Node::Ref(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------

    /// Items of an argument tuple, looking through memo references.
    fn tuple_items(&self, node: Node) -> Result<Vec<Node>, PickleError> {
        let mut node = node;
        let mut hops = 0;
        loop {
            match node {
                Node::Tuple(items) | Node::List(items) => return Ok(items),
                Node::Leaf(Value::None) => return Ok(Vec::new()),
                Node::Ref(id) => {
                    hops += 1;
                    if hops > MAX_DEPTH {
                        return Err(PickleError::Recursion);
                    }
                    node = self.memo.get(&id).cloned().ok_or(PickleError::MemoKey(id))?;
                }
                other => {
                    return Err(PickleError::Unsupported(format!(
                        "REDUCE arguments of type {}",
                        other.kind()
                    )))
                }
            }
        }
    }

    /// Global `(module, name)` a node refers to, if any.
    fn global_name(&self, node: &Node) -> Option<(String, String)> {
        let mut node = node;
        for _ in 0..MAX_DEPTH {
            match node {
                Node::Leaf(Value::Global { module, name }) => {
                    return Some((module.clone(), name.clone()))
                }
                Node::Ref(id) => node = self.memo.get(id)?,
                _ => return None,
            }
        }
        None
    }

    /// Apply a callable to its arguments.
    ///
    /// Dict constructors become real dicts so that later `SETITEMS` land in
    /// them; everything else is kept as an opaque object for later passes.
    fn reduce(&self, callable: Node, args: Vec<Node>) -> Result<Node, PickleError> {
        if let Some((module, name)) = self.global_name(&callable) {
            let is_dict = matches!(
                (module.as_str(), name.as_str()),
                ("collections", "OrderedDict") | ("builtins", "dict") | ("__builtin__", "dict")
            );
            if is_dict {
                let mut pairs = Vec::new();
                if let Some(first) = args.into_iter().next() {
                    for item in self.tuple_items(first)? {
                        let pair = self.tuple_items(item)?;
                        let [key, value]: [Node; 2] = pair.try_into().map_err(|_| {
                            PickleError::Unsupported("dict item that is not a pair".to_string())
                        })?;
                        pairs.push((key, value));
                    }
                }
                return Ok(Node::Dict(pairs));
            }
        }

        Ok(Node::Object {
            class: Box::new(callable),
            args,
            state: None,
        })
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn resolve(&self, node: Node) -> Result<Value, PickleError> {
        self.resolve_node(node, 0, &mut Vec::new())
    }

    /// `active` holds the memo ids being resolved on the current path; meeting
    /// one again means the graph is cyclic.
    fn resolve_node(
        &self,
        node: Node,
        depth: usize,
        active: &mut Vec<usize>,
    ) -> Result<Value, PickleError> {
        if depth > MAX_DEPTH {
            return Err(PickleError::Recursion);
        }
        let next = depth + 1;

        Ok(match node {
            Node::Leaf(value) => value,
            Node::List(items) => Value::List(self.resolve_all(items, next, active)?),
            Node::Tuple(items) => Value::Tuple(self.resolve_all(items, next, active)?),
            Node::Set(items) => Value::Set(self.resolve_all(items, next, active)?),
            Node::Dict(pairs) => {
                let mut resolved = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = self.resolve_node(key, next, active)?;
                    let value = self.resolve_node(value, next, active)?;
                    resolved.push((key, value));
                }
                Value::Dict(resolved)
            }
            Node::Object { class, args, state } => Value::Object {
                class: Box::new(self.resolve_node(*class, next, active)?),
                args: self.resolve_all(args, next, active)?,
                state: match state {
                    Some(state) => Some(Box::new(self.resolve_node(*state, next, active)?)),
                    None => None,
                },
            },
            Node::Ref(id) => {
                if active.contains(&id) {
                    return Err(PickleError::Recursion);
                }
                let target = self.memo.get(&id).cloned().ok_or(PickleError::MemoKey(id))?;
                active.push(id);
                let value = self.resolve_node(target, next, active);
                active.pop();
                value?
            }
        })
    }

    fn resolve_all(
        &self,
        items: Vec<Node>,
        depth: usize,
        active: &mut Vec<usize>,
    ) -> Result<Vec<Value>, PickleError> {
        items
            .into_iter()
            .map(|n| self.resolve_node(n, depth, active))
            .collect()
    }
}

fn into_pairs(items: Vec<Node>, offset: usize) -> Result<Vec<(Node, Node)>, PickleError> {
    if items.len() % 2 != 0 {
        return Err(PickleError::StackUnderflow(offset));
    }
    let mut pairs = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn parse_memo_key(text: &str) -> Result<usize, PickleError> {
    text.trim()
        .parse()
        .map_err(|_| PickleError::Literal(text.to_string()))
}

fn parse_int_text(text: &str) -> Result<Value, PickleError> {
    let text = text.trim();
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    let wide = text
        .parse::<i128>()
        .map_err(|_| PickleError::Literal(text.to_string()))?;
    Ok(Value::BigInt(wide.to_le_bytes().to_vec()))
}

/// Decode a little-endian two's complement integer (`LONG1`/`LONG4`).
fn long_from_bytes(bytes: &[u8]) -> Value {
    if bytes.len() > 8 {
        return Value::BigInt(bytes.to_vec());
    }
    let negative = bytes.last().is_some_and(|&b| b & 0x80 != 0);
    let mut buf = if negative { [0xff; 8] } else { [0; 8] };
    buf[..bytes.len()].copy_from_slice(bytes);
    Value::Int(i64::from_le_bytes(buf))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Decode a protocol-0 `STRING` literal: a quoted Python 2 `repr`.
fn unquote_string(line: &[u8]) -> Result<String, PickleError> {
    let literal = || PickleError::Literal(latin1(line));

    let quote = *line.first().ok_or_else(literal)?;
    if !(quote == b'\'' || quote == b'"') || line.len() < 2 || line[line.len() - 1] != quote {
        return Err(literal());
    }
    let body = &line[1..line.len() - 1];

    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let b = body[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let esc = *body.get(i).ok_or_else(literal)?;
        i += 1;
        match esc {
            b'\\' | b'\'' | b'"' => out.push(esc),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'x' => {
                let hex = body.get(i..i + 2).ok_or_else(literal)?;
                let hex = std::str::from_utf8(hex).map_err(|_| literal())?;
                out.push(u8::from_str_radix(hex, 16).map_err(|_| literal())?);
                i += 2;
            }
            b'0'..=b'7' => {
                let mut value = u32::from(esc - b'0');
                let mut digits = 1;
                while digits < 3 {
                    match body.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            i += 1;
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push(u8::try_from(value & 0xff).map_err(|_| literal())?);
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    Ok(latin1(&out))
}

/// Decode a protocol-0 `UNICODE` line (`raw-unicode-escape`).
fn raw_unicode_unescape(line: &[u8], offset: usize) -> Result<String, PickleError> {
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < line.len() {
        let b = line[i];
        let width = match (b, line.get(i + 1)) {
            (b'\\', Some(b'u')) => 4,
            (b'\\', Some(b'U')) => 8,
            _ => 0,
        };
        if width == 0 {
            out.push(char::from(b));
            i += 1;
            continue;
        }
        let hex = line
            .get(i + 2..i + 2 + width)
            .ok_or(PickleError::Utf8(offset))?;
        let code = std::str::from_utf8(hex)
            .ok()
            .and_then(|h| u32::from_str_radix(h, 16).ok())
            .and_then(char::from_u32)
            .ok_or(PickleError::Utf8(offset))?;
        out.push(code);
        i += 2 + width;
    }
    Ok(out)
}
