//! Call-site model over the PHP CST.
//!
//! Framework features all hang off string arguments of calls: `view('x')`,
//! `Settings::getParam('main', 'debug')`, `$this->request()->get('id')`.
//! This module turns a call node into a `CallSite` with resolved class names
//! and argument literals, and finds the argument under a cursor.

use hleb_lsp_types::{FileSymbols, TextSpan};
use tree_sitter::{Node, Tree};

use crate::position::{node_span, point_at};
use crate::symbols::{is_imported, node_text, resolve_class_name};

/// A class name as written, with its fully qualified resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRef {
    pub written: String,
    pub fqn: String,
    /// Resolved through a `use` import.
    pub imported: bool,
}

impl ClassRef {
    fn new(written: &str, symbols: &FileSymbols) -> Self {
        ClassRef {
            written: written.to_string(),
            fqn: resolve_class_name(written, symbols),
            imported: is_imported(written, symbols),
        }
    }

    /// Case-insensitive comparison with a fully qualified name (no leading `\`).
    pub fn is(&self, fqn: &str) -> bool {
        self.fqn.eq_ignore_ascii_case(fqn)
    }

    /// Written without namespace and not brought in by an import.
    pub fn is_bare(&self) -> bool {
        !self.imported && !self.written.contains('\\')
    }

    /// Last segment of the written name.
    pub fn short_name(&self) -> &str {
        self.written.rsplit('\\').next().unwrap_or(&self.written)
    }
}

/// What is being called.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    /// `view('index')`; the name without a leading `\`.
    Function(String),
    /// `Settings::getParam(...)`.
    StaticMethod { class: ClassRef, method: String },
    /// `$receiver->method(...)`.
    Method { receiver: Receiver, method: String },
}

/// Object expression an instance method is called on.
#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    /// `$this`, `$request` (name without `$`).
    Variable(String),
    /// `$this->container`.
    Property { object: Box<Receiver>, name: String },
    /// Result of another call: `$this->container->get(X::class)`.
    Call(Box<CallSite>),
    /// Anything else, kept as source text.
    Other(String),
}

/// Contents of a quoted string argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Text between the quotes.
    pub value: String,
    /// Range of the text between the quotes.
    pub content_range: TextSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// Source text of the argument expression (quotes included).
    pub text: String,
    /// Range of the argument expression.
    pub range: TextSpan,
    pub string: Option<StringLiteral>,
    /// Class of an `X::class` argument.
    pub class_constant: Option<ClassRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub callee: Callee,
    pub arguments: Vec<Argument>,
    /// Range of the whole call expression.
    pub range: TextSpan,
}

impl CallSite {
    /// Function name for plain function calls.
    pub fn function_name(&self) -> Option<&str> {
        match &self.callee {
            Callee::Function(name) => Some(name),
            _ => None,
        }
    }

    /// Method name for static and instance calls.
    pub fn method_name(&self) -> Option<&str> {
        match &self.callee {
            Callee::StaticMethod { method, .. } | Callee::Method { method, .. } => Some(method),
            Callee::Function(_) => None,
        }
    }

    /// Class and method of a static call.
    pub fn static_call(&self) -> Option<(&ClassRef, &str)> {
        match &self.callee {
            Callee::StaticMethod { class, method } => Some((class, method)),
            _ => None,
        }
    }

    /// Receiver of an instance call.
    pub fn receiver(&self) -> Option<&Receiver> {
        match &self.callee {
            Callee::Method { receiver, .. } => Some(receiver),
            _ => None,
        }
    }

    /// Whether this is a plain call of one of `names` (case-insensitive).
    pub fn is_function(&self, names: &[&str]) -> bool {
        self.function_name()
            .is_some_and(|n| names.iter().any(|m| m.eq_ignore_ascii_case(n)))
    }

    /// The innermost call of a fluent chain
    /// (`Route::get(..)` for `Route::get(..)->name('x')->where(..)`).
    pub fn chain_root(&self) -> &CallSite {
        let mut current = self;
        while let Some(Receiver::Call(inner)) = current.receiver() {
            current = inner.as_ref();
        }
        current
    }

    /// Calls of a fluent chain from the innermost to this one.
    pub fn chain(&self) -> Vec<&CallSite> {
        let mut calls = vec![self];
        let mut current = self;
        while let Some(Receiver::Call(inner)) = current.receiver() {
            calls.push(inner.as_ref());
            current = inner.as_ref();
        }
        calls.reverse();
        calls
    }

    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }
}

/// The call argument under a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentAt {
    pub call: CallSite,
    pub index: usize,
}

impl ArgumentAt {
    pub fn argument(&self) -> &Argument {
        &self.call.arguments[self.index]
    }
}

/// Build a `CallSite` for a call expression node.
pub fn call_site_from_node(node: Node, source: &str, symbols: &FileSymbols) -> Option<CallSite> {
    let arguments_node = node.child_by_field_name("arguments")?;
    let callee = match node.kind() {
        "function_call_expression" => {
            let function = node.child_by_field_name("function")?;
            match function.kind() {
                "name" | "qualified_name" => {
                    Callee::Function(node_text(function, source).trim_start_matches('\\').to_string())
                }
                _ => return None,
            }
        }
        "scoped_call_expression" => {
            let scope = node.child_by_field_name("scope")?;
            let name = node.child_by_field_name("name")?;
            Callee::StaticMethod {
                class: ClassRef::new(node_text(scope, source), symbols),
                method: node_text(name, source).to_string(),
            }
        }
        "member_call_expression" | "nullsafe_member_call_expression" => {
            let object = node.child_by_field_name("object")?;
            let name = node.child_by_field_name("name")?;
            Callee::Method {
                receiver: receiver_from_node(object, source, symbols),
                method: node_text(name, source).to_string(),
            }
        }
        _ => return None,
    };

    Some(CallSite {
        callee,
        arguments: collect_arguments(arguments_node, source, symbols),
        range: node_span(node, source),
    })
}

pub fn is_call_node(kind: &str) -> bool {
    matches!(
        kind,
        "function_call_expression"
            | "scoped_call_expression"
            | "member_call_expression"
            | "nullsafe_member_call_expression"
    )
}

fn receiver_from_node(node: Node, source: &str, symbols: &FileSymbols) -> Receiver {
    match node.kind() {
        "variable_name" => Receiver::Variable(
            node_text(node, source).trim_start_matches('$').to_string(),
        ),
        "member_access_expression" | "nullsafe_member_access_expression" => {
            let object = node.child_by_field_name("object");
            let name = node.child_by_field_name("name");
            match (object, name) {
                (Some(object), Some(name)) => Receiver::Property {
                    object: Box::new(receiver_from_node(object, source, symbols)),
                    name: node_text(name, source).to_string(),
                },
                _ => Receiver::Other(node_text(node, source).to_string()),
            }
        }
        "parenthesized_expression" => match node.named_child(0) {
            Some(inner) => receiver_from_node(inner, source, symbols),
            None => Receiver::Other(node_text(node, source).to_string()),
        },
        kind if is_call_node(kind) => match call_site_from_node(node, source, symbols) {
            Some(call) => Receiver::Call(Box::new(call)),
            None => Receiver::Other(node_text(node, source).to_string()),
        },
        _ => Receiver::Other(node_text(node, source).to_string()),
    }
}

fn collect_arguments(arguments: Node, source: &str, symbols: &FileSymbols) -> Vec<Argument> {
    let mut result = Vec::new();
    let mut cursor = arguments.walk();
    for child in arguments.named_children(&mut cursor) {
        if child.kind() != "argument" {
            continue;
        }
        // Named arguments carry the name first; the value is the last child.
        let Some(value) = child
            .named_child_count()
            .checked_sub(1)
            .and_then(|i| child.named_child(i))
        else {
            continue;
        };
        result.push(Argument {
            text: node_text(value, source).to_string(),
            range: node_span(value, source),
            string: string_literal(value, source),
            class_constant: class_constant(value, source, symbols),
        });
    }
    result
}

/// Contents of a `'...'` or `"..."` literal; heredocs and nowdocs are skipped.
pub fn string_literal(node: Node, source: &str) -> Option<StringLiteral> {
    if !matches!(node.kind(), "string" | "encapsed_string") {
        return None;
    }
    let text = node_text(node, source);
    let quote = text.chars().last()?;
    if !(quote == '\'' || quote == '"') || text.len() < 2 {
        return None;
    }
    let open = text.find(quote)?;
    if open + 1 > text.len() - 1 {
        return None;
    }
    let value = &text[open + 1..text.len() - 1];

    // Everything up to the opening quote and the closing quote are ASCII.
    let (start_line, start_col, end_line, end_col) = node_span(node, source);
    Some(StringLiteral {
        value: value.to_string(),
        content_range: (
            start_line,
            start_col + open as u32 + 1,
            end_line,
            end_col.saturating_sub(1),
        ),
    })
}

fn class_constant(node: Node, source: &str, symbols: &FileSymbols) -> Option<ClassRef> {
    if node.kind() != "class_constant_access_expression" {
        return None;
    }
    let (scope, constant) = node_text(node, source).rsplit_once("::")?;
    let scope = scope.trim();
    if !constant.trim().eq_ignore_ascii_case("class")
        || scope.starts_with('$')
        || matches!(scope, "self" | "static" | "parent")
    {
        return None;
    }
    Some(ClassRef::new(scope, symbols))
}

/// Find the call argument containing the LSP position `(line, col)`.
///
/// The innermost call wins for nested calls such as `view(hl_path('x'))`.
pub fn argument_at(
    tree: &Tree,
    source: &str,
    symbols: &FileSymbols,
    line: u32,
    col: u32,
) -> Option<ArgumentAt> {
    let point = point_at(source, line, col);
    let mut node = tree
        .root_node()
        .descendant_for_point_range(point, point)?;

    loop {
        if node.kind() == "argument" {
            let arguments = node.parent()?;
            let call = arguments.parent()?;
            if arguments.kind() == "arguments" && is_call_node(call.kind()) {
                let index = argument_index(arguments, node)?;
                let call = call_site_from_node(call, source, symbols)?;
                if index < call.arguments.len() {
                    return Some(ArgumentAt { call, index });
                }
                return None;
            }
        }
        node = node.parent()?;
    }
}

fn argument_index(arguments: Node, argument: Node) -> Option<usize> {
    let mut cursor = arguments.walk();
    let index = arguments
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "argument")
        .position(|c| c.id() == argument.id());
    index
}

/// Every call in the file, outer calls before the calls nested in them.
pub fn collect_call_sites(tree: &Tree, source: &str, symbols: &FileSymbols) -> Vec<CallSite> {
    let mut calls = Vec::new();
    collect_calls_recursive(tree.root_node(), source, symbols, &mut calls);
    calls
}

fn collect_calls_recursive(node: Node, source: &str, symbols: &FileSymbols, calls: &mut Vec<CallSite>) {
    if is_call_node(node.kind()) {
        if let Some(call) = call_site_from_node(node, source, symbols) {
            calls.push(call);
        }
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_calls_recursive(child, source, symbols, calls);
    }
}

/// The outermost call of every expression statement, in document order.
///
/// Route files are a sequence of such statements
/// (`Route::get(...)->name(...);`, `Route::toGroup()->prefix(...);`).
pub fn statement_calls(tree: &Tree, source: &str, symbols: &FileSymbols) -> Vec<CallSite> {
    let mut calls = Vec::new();
    collect_statements_recursive(tree.root_node(), source, symbols, &mut calls);
    calls
}

fn collect_statements_recursive(
    node: Node,
    source: &str,
    symbols: &FileSymbols,
    calls: &mut Vec<CallSite>,
) {
    if node.kind() == "expression_statement" {
        if let Some(expr) = node.named_child(0) {
            if is_call_node(expr.kind()) {
                if let Some(call) = call_site_from_node(expr, source, symbols) {
                    calls.push(call);
                }
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_statements_recursive(child, source, symbols, calls);
    }
}
